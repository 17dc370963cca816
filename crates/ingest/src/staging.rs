use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::IngestError;
use crate::reader::FileReader;

/// An uploaded document written to the staging directory.
///
/// The backing file is removed when the value is dropped, whichever way the
/// caller leaves its scope.
pub struct StagedUpload {
    file: NamedTempFile,
    filename: String,
}

impl StagedUpload {
    pub fn stage(dir: &Path, filename: &str, bytes: &[u8]) -> Result<Self, IngestError> {
        std::fs::create_dir_all(dir)
            .map_err(|e| IngestError::Staging(format!("{}: {}", dir.display(), e)))?;

        // Only the extension of the client-supplied name reaches the filesystem
        let suffix = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e))
            .unwrap_or_default();

        let mut file = tempfile::Builder::new()
            .prefix("upload_")
            .suffix(&suffix)
            .tempfile_in(dir)
            .map_err(|e| IngestError::Staging(e.to_string()))?;

        file.write_all(bytes)
            .and_then(|_| file.flush())
            .map_err(|e| IngestError::Staging(e.to_string()))?;

        debug!(path = %file.path().display(), filename, bytes = bytes.len(), "Staged upload");

        Ok(Self {
            file,
            filename: filename.to_string(),
        })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Load the staged document as text.
    pub async fn read_text(&self) -> Result<String, IngestError> {
        let bytes = tokio::fs::read(self.path()).await?;
        FileReader::decode(&bytes, &self.filename)
    }
}
