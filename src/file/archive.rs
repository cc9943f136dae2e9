//! Zip export of a folder subtree.
//!
//! Entries are gathered from the database first, then the archive is written
//! on the blocking pool into an anonymous temporary file that the caller
//! streams out. Memory use does not grow with the size of the folder.

use std::collections::HashSet;
use std::fs::File;
use std::io::{self, Seek, SeekFrom};
use std::path::PathBuf;

use tracing::{info, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::db::Database;
use crate::{FilelockError, Result};

use super::folder::FolderRepository;
use super::metadata::FileRepository;
use super::storage::FileStorage;
use super::tree::ensure_readable;

/// A finished archive ready to be streamed.
#[derive(Debug)]
pub struct FolderArchive {
    /// Archive content, positioned at the start.
    pub file: tokio::fs::File,
    /// Suggested download name.
    pub filename: String,
    /// Archive size in bytes.
    pub size: u64,
    /// Number of files written.
    pub entries: usize,
    /// Entry paths skipped because their stored content was missing.
    pub skipped: Vec<String>,
}

#[derive(Debug)]
struct ArchiveEntry {
    path: String,
    source: PathBuf,
}

/// Exports a folder and everything under it as a zip archive.
pub struct ArchiveExporter<'a> {
    db: &'a Database,
    storage: &'a FileStorage,
}

impl<'a> ArchiveExporter<'a> {
    /// Create a new ArchiveExporter.
    pub fn new(db: &'a Database, storage: &'a FileStorage) -> Self {
        Self { db, storage }
    }

    /// Build an archive of `folder_id` with paths relative to its parent.
    pub async fn export(&self, owner_id: i64, folder_id: i64, has_key: bool) -> Result<FolderArchive> {
        let folder = FolderRepository::new(self.db.pool())
            .get_owned(folder_id, owner_id)
            .await?;
        ensure_readable(&folder, has_key)?;

        let entries = self.collect_entries(folder.id, &folder.name, has_key).await?;
        let (file, written, skipped) = tokio::task::spawn_blocking(move || write_archive(entries))
            .await
            .map_err(|e| FilelockError::Io(io::Error::other(e)))??;

        let size = file.metadata()?.len();
        info!(
            owner_id,
            folder_id,
            entries = written,
            skipped = skipped.len(),
            size,
            "Built folder archive"
        );

        Ok(FolderArchive {
            file: tokio::fs::File::from_std(file),
            filename: format!("{}.zip", folder.name),
            size,
            entries: written,
            skipped,
        })
    }

    /// Without the key, locked subfolders are left out as in a folder view.
    async fn collect_entries(
        &self,
        root_id: i64,
        root_name: &str,
        has_key: bool,
    ) -> Result<Vec<ArchiveEntry>> {
        let folders = FolderRepository::new(self.db.pool());
        let files = FileRepository::new(self.db.pool());

        let mut entries = Vec::new();
        let mut used = HashSet::new();
        let mut stack = vec![(root_id, root_name.to_string())];

        while let Some((folder_id, prefix)) = stack.pop() {
            for file in files.list_by_folder(folder_id).await? {
                entries.push(ArchiveEntry {
                    path: unique_path(&mut used, &format!("{prefix}/{}", file.name)),
                    source: self.storage.get_file_path(&file.stored_name),
                });
            }
            let children = folders
                .list_by_parent(folder_id)
                .await?
                .into_iter()
                .filter(|f| has_key || f.is_visible)
                .rev();
            for child in children {
                stack.push((child.id, format!("{prefix}/{}", child.name)));
            }
        }

        Ok(entries)
    }
}

/// Return `path`, or `name (n).ext` if an earlier entry already took it.
fn unique_path(used: &mut HashSet<String>, path: &str) -> String {
    if used.insert(path.to_string()) {
        return path.to_string();
    }

    let (dir, name) = path.rsplit_once('/').unwrap_or(("", path));
    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, format!(".{ext}")),
        _ => (name, String::new()),
    };

    let mut n = 1;
    loop {
        let candidate = if dir.is_empty() {
            format!("{stem} ({n}){ext}")
        } else {
            format!("{dir}/{stem} ({n}){ext}")
        };
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

fn zip_error(e: zip::result::ZipError) -> FilelockError {
    FilelockError::Io(io::Error::other(e))
}

fn write_archive(entries: Vec<ArchiveEntry>) -> Result<(File, usize, Vec<String>)> {
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .large_file(true);
    let mut zip = ZipWriter::new(tempfile::tempfile()?);

    let mut written = 0;
    let mut skipped = Vec::new();
    for entry in entries {
        let mut source = match File::open(&entry.source) {
            Ok(source) => source,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(entry = %entry.path, "Stored file missing, leaving it out of the archive");
                skipped.push(entry.path);
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        zip.start_file(entry.path.as_str(), options).map_err(zip_error)?;
        io::copy(&mut source, &mut zip)?;
        written += 1;
    }

    let mut file = zip.finish().map_err(zip_error)?;
    file.seek(SeekFrom::Start(0))?;
    Ok((file, written, skipped))
}
