//! Document sinks
//!
//! Where finished documents go. The file sink never leaves a partial file
//! behind: bytes land in a hidden temp file that is renamed into place.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::report::ComposedDocument;
use crate::types::{ReportError, Result};

/// Location and identity of a stored document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredDocument {
    pub location: String,
    pub byte_size: usize,
    pub digest: String,
}

#[async_trait]
pub trait DocumentSink: Send + Sync {
    /// Store `document` under `name`, replacing any previous document of that name
    async fn store(&self, name: &str, document: &ComposedDocument) -> Result<StoredDocument>;
}

/// Writes documents into one directory
#[derive(Debug, Clone)]
pub struct FileSink {
    dir: PathBuf,
}

impl FileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn target(&self, name: &str) -> Result<PathBuf> {
        let is_plain_name = !name.is_empty()
            && Path::new(name).file_name().and_then(|n| n.to_str()) == Some(name);
        if !is_plain_name {
            return Err(ReportError::Storage(format!(
                "Invalid document name '{}': expected a file name without directories",
                name
            )));
        }
        Ok(self.dir.join(name))
    }
}

#[async_trait]
impl DocumentSink for FileSink {
    async fn store(&self, name: &str, document: &ComposedDocument) -> Result<StoredDocument> {
        let target = self.target(name)?;
        tokio::fs::create_dir_all(&self.dir).await?;

        let temp = self
            .dir
            .join(format!(".{}.{}.partial", name, uuid::Uuid::new_v4().simple()));
        debug!(path = %temp.display(), "Writing document to temp file");

        if let Err(e) = tokio::fs::write(&temp, document.bytes()).await {
            discard(&temp).await;
            return Err(e.into());
        }
        if let Err(e) = tokio::fs::rename(&temp, &target).await {
            discard(&temp).await;
            return Err(ReportError::Storage(format!(
                "Failed to move document into {}: {}",
                target.display(),
                e
            )));
        }

        info!(
            "Stored {} ({} bytes)",
            target.display(),
            document.byte_size()
        );
        Ok(StoredDocument {
            location: target.display().to_string(),
            byte_size: document.byte_size(),
            digest: document.digest().to_string(),
        })
    }
}

async fn discard(temp: &Path) {
    if let Err(e) = tokio::fs::remove_file(temp).await
        && e.kind() != std::io::ErrorKind::NotFound
    {
        warn!(path = %temp.display(), "Failed to remove temp file: {}", e);
    }
}
