//! File channel: appends notification payloads as JSON lines.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

use crate::types::NotificationEvent;

use super::channel::{Channel, DeliveryError};

/// Appends one JSON line per notification to a local file.
///
/// Useful as an audit log and as the simplest real channel for exercising
/// the dispatch path end to end.
#[derive(Debug, Clone)]
pub struct FileChannel {
    path: PathBuf,
    name: String,
}

impl FileChannel {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileChannel {
            path: path.into(),
            name: "file".to_string(),
        }
    }

    /// Overrides the channel name (e.g. when several file channels exist).
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

#[async_trait]
impl Channel for FileChannel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, event: &NotificationEvent) -> Result<(), DeliveryError> {
        let mut line = serde_json::to_vec(&event.payload())?;
        line.push(b'\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }
}
