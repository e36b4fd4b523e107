use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::Session;
use crate::error::AppError;

/// JSON-file persistence for the reusable session cookie set.
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `Ok(None)` when nothing has been saved yet.
    pub async fn load(&self) -> Result<Option<Session>, AppError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("No stored session at {}", self.path.display());
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let session: Session = serde_json::from_slice(&bytes)?;
        tracing::debug!(
            "Loaded session with {} cookies saved at {}",
            session.cookies.len(),
            session.saved_at
        );
        Ok(Some(session))
    }

    /// Replaces any previously stored session. Writes to a sibling temp file first
    /// so a reader never observes a half-written cookie set.
    pub async fn save(&self, session: &Session) -> Result<(), AppError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let json = serde_json::to_vec_pretty(session)?;
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}
