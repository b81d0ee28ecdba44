//! In-memory storage implementation.

use super::{BoardSnapshot, BoardStorage, BoxFuture, StorageError, StorageResult};
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory storage for tests and throwaway servers.
#[derive(Default)]
pub struct MemoryStorage {
    boards: RwLock<HashMap<String, BoardSnapshot>>,
}

impl MemoryStorage {
    /// Create a new empty memory storage.
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_error(e: impl std::fmt::Display) -> StorageError {
    StorageError::Other(format!("Lock error: {}", e))
}

impl BoardStorage for MemoryStorage {
    fn save(&self, id: &str, board: &BoardSnapshot) -> BoxFuture<'_, StorageResult<()>> {
        let id = id.to_string();
        let board = board.clone();
        Box::pin(async move {
            let mut boards = self.boards.write().map_err(lock_error)?;
            boards.insert(id, board);
            Ok(())
        })
    }

    fn load(&self, id: &str) -> BoxFuture<'_, StorageResult<BoardSnapshot>> {
        let id = id.to_string();
        Box::pin(async move {
            let boards = self.boards.read().map_err(lock_error)?;
            boards.get(&id).cloned().ok_or(StorageError::NotFound(id))
        })
    }

    fn delete(&self, id: &str) -> BoxFuture<'_, StorageResult<()>> {
        let id = id.to_string();
        Box::pin(async move {
            let mut boards = self.boards.write().map_err(lock_error)?;
            boards.remove(&id);
            Ok(())
        })
    }

    fn list(&self) -> BoxFuture<'_, StorageResult<Vec<String>>> {
        Box::pin(async move {
            let boards = self.boards.read().map_err(lock_error)?;
            Ok(boards.keys().cloned().collect())
        })
    }

    fn exists(&self, id: &str) -> BoxFuture<'_, StorageResult<bool>> {
        let id = id.to_string();
        Box::pin(async move {
            let boards = self.boards.read().map_err(lock_error)?;
            Ok(boards.contains_key(&id))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::{BoxShape, Element, Note};
    use pollster::block_on;

    fn sample() -> BoardSnapshot {
        BoardSnapshot::new(vec![
            Element::Rect(BoxShape::new(0.0, 0.0, 100.0, 50.0, "#2563eb")),
            Element::Note(Note {
                id: "n1".into(),
                x: 10.0,
                y: 20.0,
                w: 220.0,
                h: None,
                text: "hello".into(),
            }),
        ])
    }

    #[test]
    fn test_save_and_load() {
        let storage = MemoryStorage::new();
        let board = sample();

        block_on(storage.save("team", &board)).unwrap();
        let loaded = block_on(storage.load("team")).unwrap();
        assert_eq!(loaded, board);
    }

    #[test]
    fn test_save_replaces() {
        let storage = MemoryStorage::new();
        block_on(storage.save("team", &sample())).unwrap();
        block_on(storage.save("team", &BoardSnapshot::default())).unwrap();
        assert!(block_on(storage.load("team")).unwrap().elements.is_empty());
    }

    #[test]
    fn test_not_found() {
        let storage = MemoryStorage::new();
        let result = block_on(storage.load("nonexistent"));
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[test]
    fn test_delete_and_list() {
        let storage = MemoryStorage::new();
        block_on(storage.save("a", &sample())).unwrap();
        block_on(storage.save("b", &sample())).unwrap();
        block_on(storage.delete("a")).unwrap();

        assert!(!block_on(storage.exists("a")).unwrap());
        assert_eq!(block_on(storage.list()).unwrap(), vec!["b".to_string()]);
    }
}
