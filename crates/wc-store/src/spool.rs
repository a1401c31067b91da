//! File-backed queue and topic client.
//!
//! Every queue or topic is one JSON-lines file under the spool directory;
//! appends are serialized so each file preserves send order.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::sink::{QueueClient, TopicClient};

/// One spooled message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpoolRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    pub body: String,
}

pub struct Spool {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl Spool {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// File backing the named queue or topic.
    pub fn path_for(&self, name: &str) -> PathBuf {
        let file: String = name
            .chars()
            .map(|c| if c == '/' || c == '\\' { '_' } else { c })
            .collect();
        self.dir.join(file)
    }

    /// Read every record spooled for `name`, oldest first.
    pub async fn read(&self, name: &str) -> wc_core::Result<Vec<SpoolRecord>> {
        read_records(&self.path_for(name)).await
    }

    async fn append(&self, name: &str, record: &SpoolRecord) -> wc_core::Result<()> {
        let mut line = serde_json::to_string(record).map_err(|e| wc_core::Error::notify(name, e))?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| wc_core::Error::notify(name, e))?;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path_for(name))
            .await
            .map_err(|e| wc_core::Error::notify(name, e))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| wc_core::Error::notify(name, e))?;
        file.flush().await.map_err(|e| wc_core::Error::notify(name, e))?;
        Ok(())
    }
}

async fn read_records(path: &Path) -> wc_core::Result<Vec<SpoolRecord>> {
    let name = path.display().to_string();
    let contents = match tokio::fs::read_to_string(path).await {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(wc_core::Error::notify(name, e)),
    };
    contents
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| serde_json::from_str(l).map_err(|e| wc_core::Error::notify(&name, e)))
        .collect()
}

#[async_trait]
impl QueueClient for Spool {
    async fn send(&self, queue: &str, body: &str, group: &str) -> wc_core::Result<()> {
        self.append(
            queue,
            &SpoolRecord {
                group: Some(group.to_string()),
                body: body.to_string(),
            },
        )
        .await
    }
}

#[async_trait]
impl TopicClient for Spool {
    async fn publish(&self, topic: &str, message: &str) -> wc_core::Result<()> {
        self.append(
            topic,
            &SpoolRecord {
                group: None,
                body: message.to_string(),
            },
        )
        .await
    }
}
