//! API handlers for the web server.

pub mod file;
pub mod folder;
pub mod lock;
pub mod owner;
pub mod upload;

pub use file::*;
pub use folder::{
    create_folder, delete_folder, download_archive, rename_folder, upload_files, view_folder,
};
pub use lock::*;
pub use owner::*;
pub use upload::*;

/// Build a Content-Disposition value for a download.
///
/// Control characters are dropped so a stored name cannot inject headers.
/// Names that are not plain ASCII also get an RFC 5987 `filename*`.
pub(crate) fn content_disposition_header(filename: &str) -> String {
    let sanitized: String = filename
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| match c {
            '"' | '\\' => '_',
            _ => c,
        })
        .collect();

    if filename.is_ascii() && sanitized == filename {
        return format!("attachment; filename=\"{}\"", filename);
    }

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        sanitized,
        urlencoding::encode(filename)
    )
}
