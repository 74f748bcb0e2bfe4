//! Loading documents from disk and uploads, and keeping raw copies

use chrono::Utc;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::types::{Document, FileType};

use super::parser::FileParser;

/// Reads supported files into [`Document`]s and manages the raw document directory
#[derive(Debug, Clone)]
pub struct DocumentLoader {
    documents_dir: PathBuf,
}

impl DocumentLoader {
    pub fn new(documents_dir: impl Into<PathBuf>) -> Self {
        Self {
            documents_dir: documents_dir.into(),
        }
    }

    /// Directory holding raw uploaded documents
    pub fn documents_dir(&self) -> &Path {
        &self.documents_dir
    }

    /// Parse in-memory file contents
    pub fn load_bytes(&self, filename: &str, data: &[u8]) -> Result<Document> {
        let parsed = FileParser::parse(filename, data)?;

        let mut doc = Document::new(filename, parsed.file_type, parsed.content);
        doc.total_pages = parsed.total_pages;

        tracing::info!(
            filename,
            document_id = %doc.id,
            file_type = doc.file_type.display_name(),
            chars = doc.char_len(),
            "Loaded document"
        );
        Ok(doc)
    }

    /// Read and parse a file from disk
    pub async fn load_path(&self, path: &Path) -> Result<Document> {
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| Error::file_parse(path.display().to_string(), "path has no file name"))?;

        if !FileType::from_filename(filename).is_supported() {
            let ext = path
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or_default()
                .to_lowercase();
            return Err(Error::UnsupportedFormat(ext));
        }

        let data = tokio::fs::read(path).await?;
        self.load_bytes(filename, &data)
    }

    /// Supported files under `dir`, recursively, in path order
    pub fn scan_directory(dir: &Path) -> Result<Vec<PathBuf>> {
        if !dir.is_dir() {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} is not a directory", dir.display()),
            )));
        }

        let mut files: Vec<PathBuf> = WalkDir::new(dir)
            .follow_links(true)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping unreadable directory entry");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| {
                entry
                    .file_name()
                    .to_str()
                    .map_or(false, |name| FileType::from_filename(name).is_supported())
            })
            .map(|entry| entry.into_path())
            .collect();

        files.sort();
        tracing::info!(dir = %dir.display(), files = files.len(), "Scanned directory");
        Ok(files)
    }

    /// Keep a raw copy of an uploaded file
    pub async fn save_upload(&self, filename: &str, data: &[u8]) -> Result<PathBuf> {
        let name = Path::new(filename)
            .file_name()
            .and_then(|n| n.to_str())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| Error::file_parse(filename, "invalid upload filename"))?;

        tokio::fs::create_dir_all(&self.documents_dir).await?;
        let path = self.documents_dir.join(name);
        tokio::fs::write(&path, data).await?;

        tracing::debug!(path = %path.display(), bytes = data.len(), "Saved upload");
        Ok(path)
    }

    /// Filename for pasted text: `{title}_{YYYYmmdd_HHMMSS}.txt`
    pub fn text_filename(title: &str) -> Result<String> {
        let safe_title = safe_title(title);
        if safe_title.is_empty() {
            return Err(Error::file_parse(title, "title has no usable characters"));
        }
        Ok(format!("{}_{}.txt", safe_title, Utc::now().format("%Y%m%d_%H%M%S")))
    }

    /// Remove the stored raw copy of a document, if one exists
    pub async fn remove_stored(&self, filename: &str) -> Result<bool> {
        let Some(name) = Path::new(filename).file_name() else {
            return Ok(false);
        };
        let path = self.documents_dir.join(name);

        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "Removed stored document");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

/// Keep alphanumerics, spaces, hyphens and underscores; spaces become underscores
fn safe_title(title: &str) -> String {
    title
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect::<String>()
        .trim()
        .replace(' ', "_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_safe_title() {
        assert_eq!(safe_title(" Leave Policy: 2024! "), "Leave_Policy_2024");
        assert_eq!(safe_title("a/b\\c"), "abc");
        assert_eq!(safe_title("???"), "");
    }

    #[tokio::test]
    async fn test_load_path_and_scan() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("policy.txt"),
            "Employees receive 15 vacation days per year.",
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.md"), "# Notes").unwrap();
        std::fs::write(dir.path().join("image.png"), [0u8, 1, 2]).unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub").join("faq.txt"), "Q and A").unwrap();

        let files = DocumentLoader::scan_directory(dir.path()).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["notes.md", "policy.txt", "faq.txt"]);

        let loader = DocumentLoader::new(dir.path());
        let doc = loader.load_path(&dir.path().join("policy.txt")).await.unwrap();
        assert_eq!(doc.id, "policy.txt");
        assert_eq!(doc.file_type, FileType::Txt);
        assert!(doc.content.contains("15 vacation days"));

        let err = loader.load_path(&dir.path().join("image.png")).await.unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(_)));
    }

    #[tokio::test]
    async fn test_save_and_remove_text() {
        let dir = TempDir::new().unwrap();
        let loader = DocumentLoader::new(dir.path().join("raw"));

        let filename = DocumentLoader::text_filename("Leave Policy").unwrap();
        assert!(filename.starts_with("Leave_Policy_"));
        assert!(filename.ends_with(".txt"));
        assert!(DocumentLoader::text_filename("???").is_err());

        loader.save_upload(&filename, b"15 days").await.unwrap();
        assert_eq!(
            std::fs::read_to_string(dir.path().join("raw").join(&filename)).unwrap(),
            "15 days"
        );

        assert!(loader.remove_stored(&filename).await.unwrap());
        assert!(!loader.remove_stored(&filename).await.unwrap());
    }

    #[tokio::test]
    async fn test_save_upload_strips_directories() {
        let dir = TempDir::new().unwrap();
        let loader = DocumentLoader::new(dir.path());
        let path = loader.save_upload("../../etc/handbook.txt", b"text").await.unwrap();
        assert_eq!(path, dir.path().join("handbook.txt"));
    }

    #[test]
    fn test_scan_missing_directory() {
        assert!(DocumentLoader::scan_directory(Path::new("/definitely/not/here")).is_err());
    }
}
