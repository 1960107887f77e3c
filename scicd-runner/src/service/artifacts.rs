//! Artifact transport
//!
//! Moves the files under a local directory to a remote location. No real
//! transport exists yet; [`LoggingTransport`] records the intent only.

use async_trait::async_trait;
use tracing::info;

/// Uploads build output
#[async_trait]
pub trait ArtifactTransport: Send + Sync {
    /// Moves all files under `local_dir` to the location addressed by
    /// `remote_dir`
    async fn upload(&self, local_dir: &str, remote_dir: &str) -> anyhow::Result<()>;
}

/// Transport that only logs what it would upload
#[derive(Debug, Default)]
pub struct LoggingTransport;

impl LoggingTransport {
    pub fn new() -> Self {
        Self
    }
}

/// The line logged for an upload
pub fn upload_intent(local_dir: &str, remote_dir: &str) -> String {
    format!("Uploading files in {} to {}", local_dir, remote_dir)
}

#[async_trait]
impl ArtifactTransport for LoggingTransport {
    async fn upload(&self, local_dir: &str, remote_dir: &str) -> anyhow::Result<()> {
        info!("{}", upload_intent(local_dir, remote_dir));
        Ok(())
    }
}
