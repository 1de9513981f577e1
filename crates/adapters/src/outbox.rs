//! Outbox post repository for dry-run mode.
//!
//! Reads go to the wrapped repository; replies are appended to a JSONL file
//! instead of being posted.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use alt_text_bot_domain::{Post, PostError, PostRepository};
use async_trait::async_trait;
use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum OutboxError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Append-only JSONL writer shared by all workers
#[derive(Debug, Clone)]
pub struct OutboxWriter {
    path: PathBuf,
    file: Arc<Mutex<tokio::fs::File>>,
}

impl OutboxWriter {
    pub async fn new(path: PathBuf) -> Result<Self, OutboxError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        Ok(Self {
            path,
            file: Arc::new(Mutex::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn append(&self, entry: &OutboxEntry<'_>) -> Result<(), OutboxError> {
        let line = serde_json::to_string(entry)?;
        let mut file = self.file.lock().await;
        file.write_all(line.as_bytes()).await?;
        file.write_all(b"\n").await?;
        file.flush().await?;
        Ok(())
    }
}

#[derive(Serialize)]
struct OutboxEntry<'a> {
    id: &'a str,
    in_reply_to: &'a str,
    text: &'a str,
    created_at: String,
}

/// Decorator that records replies in the outbox instead of posting them
pub struct OutboxPostRepository {
    inner: Arc<dyn PostRepository>,
    writer: OutboxWriter,
}

impl OutboxPostRepository {
    pub fn new(inner: Arc<dyn PostRepository>, writer: OutboxWriter) -> Self {
        Self { inner, writer }
    }
}

#[async_trait]
impl PostRepository for OutboxPostRepository {
    async fn get_post(&self, id: &str) -> Result<Post, PostError> {
        self.inner.get_post(id).await
    }

    async fn reply_to_post(&self, id: &str, text: &str) -> Result<Post, PostError> {
        let reply_id = format!("outbox-{}", Uuid::new_v4());
        let created_at = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .map_err(|e| PostError::Api(format!("Outbox write failed: {}", e)))?;

        let entry = OutboxEntry {
            id: &reply_id,
            in_reply_to: id,
            text,
            created_at,
        };

        self.writer
            .append(&entry)
            .await
            .map_err(|error| PostError::Api(format!("Outbox write failed: {}", error)))?;

        tracing::info!(
            in_reply_to = %id,
            outbox = %self.writer.path().display(),
            "[DRY RUN] Reply written to outbox"
        );

        Ok(Post {
            id: reply_id,
            text: text.to_string(),
            parent_id: Some(id.to_string()),
            ..Default::default()
        })
    }
}
