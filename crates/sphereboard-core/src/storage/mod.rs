//! Persistence gateway for boards.
//!
//! A board is stored as a full snapshot of its element list; saving replaces
//! the previous snapshot.

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use crate::elements::Element;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Board not found: {0}")]
    NotFound(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Storage error: {0}")]
    Other(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Boxed future for async storage operations.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Stored contents of a board.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoardSnapshot {
    pub elements: Vec<Element>,
}

#[derive(Deserialize)]
struct RawSnapshot {
    #[serde(default)]
    elements: Vec<serde_json::Value>,
}

impl BoardSnapshot {
    pub fn new(elements: Vec<Element>) -> Self {
        Self { elements }
    }

    /// Parse a stored snapshot, skipping elements that do not decode.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let raw: RawSnapshot = serde_json::from_str(json)?;
        Ok(Self::from_values(raw.elements))
    }

    /// Decode raw element values one by one, skipping the ones that fail.
    pub fn from_values(values: Vec<serde_json::Value>) -> Self {
        let total = values.len();
        let elements: Vec<Element> = values
            .into_iter()
            .filter_map(|value| match Element::from_value(value) {
                Ok(element) => Some(element),
                Err(e) => {
                    log::warn!("skipping stored element: {}", e);
                    None
                }
            })
            .collect();
        if elements.len() != total {
            log::warn!("{} of {} stored elements skipped", total - elements.len(), total);
        }
        Self { elements }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Trait for board storage backends.
pub trait BoardStorage: Send + Sync {
    /// Replace the stored snapshot of a board.
    fn save(&self, id: &str, board: &BoardSnapshot) -> BoxFuture<'_, StorageResult<()>>;

    /// Load a board.
    fn load(&self, id: &str) -> BoxFuture<'_, StorageResult<BoardSnapshot>>;

    /// Delete a board.
    fn delete(&self, id: &str) -> BoxFuture<'_, StorageResult<()>>;

    /// List all board ids.
    fn list(&self) -> BoxFuture<'_, StorageResult<Vec<String>>>;

    /// Check if a board exists.
    fn exists(&self, id: &str) -> BoxFuture<'_, StorageResult<bool>>;

    /// Load a board, creating an empty one on first access.
    fn load_or_create<'a>(&'a self, id: &'a str) -> BoxFuture<'a, StorageResult<BoardSnapshot>> {
        Box::pin(async move {
            match self.load(id).await {
                Err(StorageError::NotFound(_)) => {
                    log::info!("creating empty board {}", id);
                    let empty = BoardSnapshot::default();
                    self.save(id, &empty).await?;
                    Ok(empty)
                }
                other => other,
            }
        })
    }
}
