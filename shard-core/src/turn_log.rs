//! Append-only turn log.
//!
//! One JSON record per turn attempt sequence, one line each. The file is
//! opened, appended, and closed per write; records are never read back,
//! rotated, or truncated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use thiserror::Error;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// Errors from the turn logger.
#[derive(Debug, Error)]
pub enum LogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// One logged turn attempt sequence. Written once, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnRecord {
    pub timestamp: DateTime<Utc>,
    pub session: Uuid,
    pub model: String,
    pub turn: u32,
    pub user_input: String,
    pub prompt: String,

    /// Raw model text from whichever attempt came last.
    pub raw_output: String,

    /// The validated object, or null when both attempts failed.
    pub parsed_output: Option<Value>,

    pub valid: bool,
    pub errors: Vec<String>,

    /// Generation calls made: 1 or 2.
    pub attempts: u8,

    /// True when the second attempt rescued an invalid first one.
    pub recovered: bool,
}

/// Appends turn records to a line-delimited JSON file.
#[derive(Debug, Clone)]
pub struct TurnLogger {
    path: PathBuf,
    session: Uuid,
}

impl TurnLogger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            session: Uuid::new_v4(),
        }
    }

    /// Session id stamped into every record.
    pub fn session(&self) -> Uuid {
        self.session
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Append one record. Opens and closes the file per call; OS append
    /// semantics are the only locking discipline needed.
    pub async fn append(&self, record: &TurnRecord) -> Result<(), LogError> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}
