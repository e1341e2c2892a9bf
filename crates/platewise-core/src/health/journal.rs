//! JSON-lines journal acting as the health data store for the CLI host.

use super::sink::HealthDataSink;
use crate::error::Fault;
use crate::types::{HealthRecord, TimeRange};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Health sink persisting one JSON record per line.
///
/// Inserts append; deletes rewrite the file through a temp file + rename, so
/// each call is atomic on its own.
pub struct JournalHealthSink {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JournalHealthSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Vec<HealthRecord>, Fault> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_fault(e)),
        };

        let mut records = Vec::new();
        for (n, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<HealthRecord>(line) {
                Ok(record) => records.push(record),
                Err(e) => tracing::warn!(
                    journal = %self.path.display(),
                    line = n + 1,
                    "Skipping unreadable journal line: {e}"
                ),
            }
        }
        Ok(records)
    }
}

fn io_fault(err: std::io::Error) -> Fault {
    if err.kind() == ErrorKind::PermissionDenied {
        Fault::PermissionDenied(err.to_string())
    } else {
        Fault::Io(err)
    }
}

fn encode(record: &HealthRecord) -> Result<String, Fault> {
    serde_json::to_string(record).map_err(|e| Fault::Other(format!("encode record: {e}")))
}

#[async_trait]
impl HealthDataSink for JournalHealthSink {
    async fn insert(&self, record: &HealthRecord) -> Result<String, Fault> {
        let _guard = self.lock.lock().await;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_fault)?;
        }

        let id = uuid::Uuid::new_v4().to_string();
        let stored = HealthRecord {
            id: Some(id.clone()),
            ..record.clone()
        };
        let mut line = encode(&stored)?;
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(io_fault)?;
        file.write_all(line.as_bytes()).await.map_err(io_fault)?;
        file.flush().await.map_err(io_fault)?;

        Ok(id)
    }

    async fn delete(&self, id: &str) -> Result<(), Fault> {
        let _guard = self.lock.lock().await;

        let records = self.load().await?;
        let before = records.len();
        let kept: Vec<_> = records
            .into_iter()
            .filter(|r| r.id.as_deref() != Some(id))
            .collect();
        if kept.len() == before {
            return Ok(());
        }

        let mut content = String::new();
        for record in &kept {
            content.push_str(&encode(record)?);
            content.push('\n');
        }
        let tmp = self.path.with_extension("jsonl.tmp");
        tokio::fs::write(&tmp, content).await.map_err(io_fault)?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(io_fault)?;
        Ok(())
    }

    async fn query(&self, range: TimeRange) -> Result<Vec<HealthRecord>, Fault> {
        let _guard = self.lock.lock().await;
        let mut records: Vec<_> = self
            .load()
            .await?
            .into_iter()
            .filter(|r| range.contains(r.start_time))
            .collect();
        records.sort_by_key(|r| r.start_time);
        Ok(records)
    }
}
