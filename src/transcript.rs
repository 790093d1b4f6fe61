//! On-disk persistence of the grading conversation.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::client::ClientError;
use crate::model::Transcript;

/// Number of messages after the system prompt restored by [`TranscriptStore::load`].
pub const MAX_RESTORED_MESSAGES: usize = 20;

/// JSON file holding one conversation transcript.
#[derive(Debug, Clone)]
pub struct TranscriptStore {
    path: PathBuf,
}

impl TranscriptStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the whole transcript, replacing any previous one.
    pub async fn save(&self, transcript: &Transcript) -> Result<(), ClientError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let json = serde_json::to_vec_pretty(transcript)?;
        tokio::fs::write(&self.path, json).await?;
        debug!(path = %self.path.display(), messages = transcript.len(), "saved transcript");
        Ok(())
    }

    /// Restore the saved transcript.
    ///
    /// Only the system prompt and the last [`MAX_RESTORED_MESSAGES`] messages
    /// are kept. A file that cannot be parsed is deleted and treated as absent.
    pub async fn load(&self) -> Result<Option<Transcript>, ClientError> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_slice::<Transcript>(&raw) {
            Ok(transcript) => Ok(Some(transcript.truncated(MAX_RESTORED_MESSAGES))),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "discarding corrupt transcript");
                self.clear().await?;
                Ok(None)
            }
        }
    }

    /// Delete the saved transcript. A missing file is not an error.
    pub async fn clear(&self) -> Result<(), ClientError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
