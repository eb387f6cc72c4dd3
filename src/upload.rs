//! The uploaded document and helpers derived from its file name.

use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

/// Extensions offered by the upload control.
///
/// Informational only: the external converter decides what it can actually
/// read. Unknown extensions are still passed through.
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "pdf", "docx", "doc", "pptx", "ppt", "xlsx", "xls", "csv", "txt", "json", "xml", "html",
    "htm", "jpg", "jpeg", "png", "gif", "wav", "mp3", "epub",
];

/// Extensions for which a tabular data preview is generated.
pub const TABULAR_EXTENSIONS: &[&str] = &["xlsx", "xls", "csv"];

/// A file uploaded by the user, held in memory for the duration of a request.
///
/// `content` is reference-counted so it can be handed to blocking tasks
/// (preview parsing, in-process conversion) without copying.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub size_bytes: u64,
    pub mime_type: String,
    pub content: Arc<[u8]>,
}

impl UploadedFile {
    /// Build an upload; `size_bytes` is taken from the content.
    ///
    /// An empty `mime_type` is replaced by a guess from the extension.
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, content: Vec<u8>) -> Self {
        let name = name.into();
        let mut mime_type = mime_type.into();
        if mime_type.trim().is_empty() {
            mime_type = mime_for_name(&name).to_string();
        }
        Self {
            size_bytes: content.len() as u64,
            name,
            mime_type,
            content: content.into(),
        }
    }

    /// Read a local file into an upload (used by the CLI).
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let content = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        Ok(Self::new(name, "", content))
    }

    /// Lower-cased extension without the dot, if any.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.name)
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .filter(|e| !e.is_empty())
    }

    /// Extension exactly as the user supplied it (case preserved).
    pub fn raw_extension(&self) -> Option<String> {
        Path::new(&self.name)
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .filter(|e| !e.is_empty())
    }

    /// File name without its final extension.
    pub fn stem(&self) -> String {
        Path::new(&self.name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "document".to_string())
    }

    /// `<original-stem>.md`
    pub fn download_name(&self) -> String {
        format!("{}.md", self.stem())
    }

    pub fn has_recognized_extension(&self) -> bool {
        self.extension()
            .is_some_and(|e| SUPPORTED_EXTENSIONS.contains(&e.as_str()))
    }

    pub fn is_tabular(&self) -> bool {
        self.extension()
            .is_some_and(|e| TABULAR_EXTENSIONS.contains(&e.as_str()))
    }

    pub fn details(&self) -> FileDetails {
        FileDetails {
            name: self.name.clone(),
            size_bytes: self.size_bytes,
            size_display: format!("{:.2} KB", self.size_bytes as f64 / 1024.0),
            mime_type: self.mime_type.clone(),
        }
    }
}

/// The "File Details" block shown above every result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileDetails {
    pub name: String,
    pub size_bytes: u64,
    pub size_display: String,
    pub mime_type: String,
}

/// Best-effort MIME type for a file name, used when the client sent none.
pub fn mime_for_name(name: &str) -> &'static str {
    let ext = Path::new(name)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => "application/pdf",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "doc" => "application/msword",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "ppt" => "application/vnd.ms-powerpoint",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "xls" => "application/vnd.ms-excel",
        "csv" => "text/csv",
        "txt" => "text/plain",
        "md" => "text/markdown",
        "json" => "application/json",
        "xml" => "application/xml",
        "html" | "htm" => "text/html",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "wav" => "audio/wav",
        "mp3" => "audio/mpeg",
        "epub" => "application/epub+zip",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_names() {
        let u = UploadedFile::new("Quarterly Report.v2.PDF", "application/pdf", b"%PDF".to_vec());
        assert_eq!(u.extension().as_deref(), Some("pdf"));
        assert_eq!(u.raw_extension().as_deref(), Some("PDF"));
        assert_eq!(u.stem(), "Quarterly Report.v2");
        assert_eq!(u.download_name(), "Quarterly Report.v2.md");
        assert!(u.has_recognized_extension());
        assert!(!u.is_tabular());
    }

    #[test]
    fn no_extension() {
        let u = UploadedFile::new("README", "", b"hi".to_vec());
        assert_eq!(u.extension(), None);
        assert_eq!(u.download_name(), "README.md");
        assert!(!u.has_recognized_extension());
        assert_eq!(u.mime_type, "application/octet-stream");
    }

    #[test]
    fn tabular_detection_is_case_insensitive() {
        assert!(UploadedFile::new("data.CSV", "", b"a\n1".to_vec()).is_tabular());
        assert!(UploadedFile::new("book.xlsx", "", b"PK".to_vec()).is_tabular());
        assert!(UploadedFile::new("old.xls", "", b"x".to_vec()).is_tabular());
    }

    #[test]
    fn details_format_size_in_kb() {
        let u = UploadedFile::new("a.txt", "text/plain", vec![b'x'; 1536]);
        let d = u.details();
        assert_eq!(d.size_bytes, 1536);
        assert_eq!(d.size_display, "1.50 KB");
        assert_eq!(d.mime_type, "text/plain");
    }

    #[test]
    fn mime_guess_from_extension() {
        assert_eq!(mime_for_name("x.csv"), "text/csv");
        assert_eq!(mime_for_name("x.JPEG"), "image/jpeg");
        assert_eq!(mime_for_name("x.bin"), "application/octet-stream");
    }
}
