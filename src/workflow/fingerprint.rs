//! Uploaded files and their cheap identity.
//!
//! A fingerprint is `(name, size, last-modified)` read straight off the file
//! handle. Content is never hashed: a file replaced in place with the same
//! name, size and mtime is indistinguishable from the original.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::errors::WorkflowError;

/// Content-insensitive identity of an uploaded file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fingerprint {
    pub name: String,
    pub byte_size: u64,
    pub last_modified_ms: i64,
}

/// Where an upload's bytes live.
#[derive(Debug, Clone)]
enum FileSource {
    Memory(Vec<u8>),
    Path(PathBuf),
}

/// A file handed to the Identify stage.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    name: String,
    size: u64,
    last_modified_ms: i64,
    source: FileSource,
}

impl UploadedFile {
    /// An upload whose contents are already in memory.
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>, last_modified_ms: i64) -> Self {
        Self {
            name: name.into(),
            size: bytes.len() as u64,
            last_modified_ms,
            source: FileSource::Memory(bytes),
        }
    }

    /// An upload backed by a file on disk. Only metadata is read here.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, WorkflowError> {
        let path = path.as_ref();
        let read_err = |reason: String| WorkflowError::FileRead {
            path: path.display().to_string(),
            reason,
        };

        let meta = tokio::fs::metadata(path)
            .await
            .map_err(|e| read_err(e.to_string()))?;
        if !meta.is_file() {
            return Err(read_err("not a regular file".into()));
        }
        let modified = meta.modified().map_err(|e| read_err(e.to_string()))?;
        let last_modified_ms = chrono::DateTime::<chrono::Utc>::from(modified).timestamp_millis();

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Ok(Self {
            name,
            size: meta.len(),
            last_modified_ms,
            source: FileSource::Path(path.to_path_buf()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn last_modified_ms(&self) -> i64 {
        self.last_modified_ms
    }

    /// Read the file's bytes.
    pub async fn bytes(&self) -> std::io::Result<Vec<u8>> {
        match &self.source {
            FileSource::Memory(bytes) => Ok(bytes.clone()),
            FileSource::Path(path) => tokio::fs::read(path).await,
        }
    }

    /// Read the file as UTF-8 text.
    pub async fn text(&self) -> std::io::Result<String> {
        let bytes = self.bytes().await?;
        String::from_utf8(bytes)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}

/// Derive the fingerprint of an upload. Pure and total.
pub fn fingerprint(file: &UploadedFile) -> Fingerprint {
    Fingerprint {
        name: file.name.clone(),
        byte_size: file.size,
        last_modified_ms: file.last_modified_ms,
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_reads_handle_attributes() {
        let file = UploadedFile::from_bytes("a.csv", vec![b'x'; 100], 1000);
        assert_eq!(
            fingerprint(&file),
            Fingerprint {
                name: "a.csv".into(),
                byte_size: 100,
                last_modified_ms: 1000,
            }
        );
    }

    #[test]
    fn test_fingerprint_ignores_content() {
        let a = UploadedFile::from_bytes("a.csv", b"A,B\n1,2".to_vec(), 1000);
        let b = UploadedFile::from_bytes("a.csv", b"A,B\n9,9".to_vec(), 1000);
        assert_eq!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn test_fingerprint_differs_on_any_field() {
        let base = fingerprint(&UploadedFile::from_bytes("a.csv", vec![0; 3], 1000));
        let renamed = fingerprint(&UploadedFile::from_bytes("b.csv", vec![0; 3], 1000));
        let resized = fingerprint(&UploadedFile::from_bytes("a.csv", vec![0; 4], 1000));
        let touched = fingerprint(&UploadedFile::from_bytes("a.csv", vec![0; 3], 1001));
        assert_ne!(base, renamed);
        assert_ne!(base, resized);
        assert_ne!(base, touched);
    }

    #[tokio::test]
    async fn test_text_rejects_invalid_utf8() {
        let file = UploadedFile::from_bytes("bin.csv", vec![0xff, 0xfe, 0x00], 1);
        assert!(file.text().await.is_err());
        assert_eq!(file.bytes().await.unwrap(), vec![0xff, 0xfe, 0x00]);
    }

    #[tokio::test]
    async fn test_from_path_reads_metadata_and_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custody.csv");
        std::fs::write(&path, "A,B\n3,4").unwrap();

        let file = UploadedFile::from_path(&path).await.unwrap();
        assert_eq!(file.name(), "custody.csv");
        assert_eq!(file.size(), 7);
        assert!(file.last_modified_ms() > 0);
        assert_eq!(file.text().await.unwrap(), "A,B\n3,4");
    }

    #[tokio::test]
    async fn test_from_path_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = UploadedFile::from_path(dir.path().join("missing.csv")).await;
        assert!(matches!(result, Err(WorkflowError::FileRead { .. })));
    }

    #[tokio::test]
    async fn test_from_path_directory_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let result = UploadedFile::from_path(dir.path()).await;
        assert!(matches!(result, Err(WorkflowError::FileRead { .. })));
    }
}
