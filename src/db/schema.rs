//! Database schema and migrations for filelock.
//!
//! Migrations run in order; the schema_version table records which have
//! been applied.

/// Database migrations.
pub const MIGRATIONS: &[&str] = &[
    // v1: Owners (anonymous accounts identified by a bearer key)
    r#"
CREATE TABLE owners (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    username    TEXT NOT NULL UNIQUE,
    key_hash    TEXT,                    -- 128 hex chars of the 64-byte owner key
    created_at  TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX idx_owners_key_hash ON owners(key_hash);
"#,
    // v2: Folder tree, one root per owner
    r#"
CREATE TABLE folders (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL,
    parent_id   INTEGER REFERENCES folders(id),
    owner_id    INTEGER NOT NULL REFERENCES owners(id),
    is_visible  INTEGER NOT NULL DEFAULT 1,
    created_at  TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at  TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX idx_folders_parent_id ON folders(parent_id);
CREATE INDEX idx_folders_owner_id ON folders(owner_id);
CREATE UNIQUE INDEX idx_folders_one_root ON folders(owner_id) WHERE parent_id IS NULL;
"#,
    // v3: File records
    r#"
CREATE TABLE files (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL,
    stored_name TEXT NOT NULL UNIQUE,    -- UUID.ext inside the files directory
    size        INTEGER NOT NULL,
    file_type   TEXT NOT NULL DEFAULT '',
    folder_id   INTEGER NOT NULL REFERENCES folders(id),
    owner_id    INTEGER NOT NULL REFERENCES owners(id),
    created_at  TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at  TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX idx_files_folder_id ON files(folder_id);
CREATE INDEX idx_files_owner_id ON files(owner_id);
"#,
];
