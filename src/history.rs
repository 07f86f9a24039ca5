// src/history.rs
use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::{AdvisorError, AdvisorResult};

/// One successful prediction: the body as submitted and the merged model output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PredictionRecord {
    // Older history files carry only `input` and `output`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recorded_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub input: JsonValue,
    #[serde(default)]
    pub output: JsonValue,
}

impl PredictionRecord {
    pub fn new(input: JsonValue, output: JsonValue) -> Self {
        Self {
            id: Some(Uuid::new_v4()),
            recorded_at: Some(Utc::now()),
            input,
            output,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HistoryDocument {
    #[serde(default)]
    pub predictions: Vec<PredictionRecord>,
}

/// Append-only list of prediction records kept in a single JSON file.
///
/// Records are never modified once written. Appends inside this process are
/// serialised, and each one replaces the file atomically so a reader sees
/// either the old or the new document.
pub struct PredictionHistory {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl PredictionHistory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        info!("Prediction history file: {}", path.display());
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The whole document; a missing file is an empty history.
    pub async fn read_all(&self) -> AdvisorResult<HistoryDocument> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || read_document(&path))
            .await
            .map_err(|e| AdvisorError::History(format!("history reader panicked: {}", e)))?
    }

    pub async fn latest(&self) -> AdvisorResult<Option<PredictionRecord>> {
        let mut document = self.read_all().await?;
        Ok(document.predictions.pop())
    }

    pub async fn append(&self, record: PredictionRecord) -> AdvisorResult<usize> {
        let _guard = self.write_lock.lock().await;
        let path = self.path.clone();
        let count = tokio::task::spawn_blocking(move || {
            let mut document = read_document(&path)?;
            document.predictions.push(record);
            write_document(&path, &document)?;
            Ok::<usize, AdvisorError>(document.predictions.len())
        })
        .await
        .map_err(|e| AdvisorError::History(format!("history writer panicked: {}", e)))??;
        debug!("Prediction history now holds {} records", count);
        Ok(count)
    }
}

fn read_document(path: &Path) -> AdvisorResult<HistoryDocument> {
    if !path.exists() {
        return Ok(HistoryDocument::default());
    }
    let raw = std::fs::read_to_string(path)
        .map_err(|e| AdvisorError::History(format!("failed to read {}: {}", path.display(), e)))?;
    if raw.trim().is_empty() {
        return Ok(HistoryDocument::default());
    }
    serde_json::from_str(&raw)
        .map_err(|e| AdvisorError::History(format!("failed to parse {}: {}", path.display(), e)))
}

fn write_document(path: &Path, document: &HistoryDocument) -> AdvisorResult<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let to_history_error =
        |e: std::io::Error| AdvisorError::History(format!("failed to write {}: {}", path.display(), e));

    let mut staged = tempfile::NamedTempFile::new_in(dir).map_err(to_history_error)?;
    serde_json::to_writer_pretty(&mut staged, document)
        .map_err(|e| AdvisorError::History(format!("failed to serialize history: {}", e)))?;
    staged.flush().map_err(to_history_error)?;
    staged
        .persist(path)
        .map_err(|e| to_history_error(e.error))?;
    Ok(())
}
