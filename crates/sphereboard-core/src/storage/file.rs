//! File-based board storage.

use super::{BoardSnapshot, BoardStorage, BoxFuture, StorageError, StorageResult};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use std::fs;
use std::path::{Path, PathBuf};

/// Bytes escaped in board file names. `%` and `_` are escaped too, so distinct
/// ids never share a file.
const FILE_NAME_ESCAPES: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-');

/// Stores each board as `<percent-encoded id>.json` in a directory.
pub struct FileStorage {
    base_path: PathBuf,
}

impl FileStorage {
    /// Create a file storage rooted at `base_path`, creating the directory if needed.
    pub fn new(base_path: PathBuf) -> StorageResult<Self> {
        if !base_path.exists() {
            fs::create_dir_all(&base_path).map_err(|e| {
                StorageError::Io(format!("Failed to create storage directory: {}", e))
            })?;
        }
        Ok(Self { base_path })
    }

    /// Default board directory: `<local data dir>/sphereboard/boards`.
    pub fn default_path() -> StorageResult<PathBuf> {
        let base = dirs::data_local_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| StorageError::Io("Could not determine home directory".to_string()))?;
        Ok(base.join("sphereboard").join("boards"))
    }

    /// File storage in the default location.
    pub fn default_location() -> StorageResult<Self> {
        Self::new(Self::default_path()?)
    }

    fn board_path(&self, id: &str) -> PathBuf {
        let file_stem = utf8_percent_encode(id, FILE_NAME_ESCAPES);
        self.base_path.join(format!("{}.json", file_stem))
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }
}

impl BoardStorage for FileStorage {
    fn save(&self, id: &str, board: &BoardSnapshot) -> BoxFuture<'_, StorageResult<()>> {
        let path = self.board_path(id);
        let json = board.to_json();
        Box::pin(async move {
            let json = json.map_err(|e| StorageError::Serialization(e.to_string()))?;
            // Write then rename so readers never see a half-written board.
            let tmp = path.with_extension("json.tmp");
            fs::write(&tmp, json).map_err(|e| {
                StorageError::Io(format!("Failed to write {}: {}", tmp.display(), e))
            })?;
            fs::rename(&tmp, &path).map_err(|e| {
                StorageError::Io(format!("Failed to replace {}: {}", path.display(), e))
            })
        })
    }

    fn load(&self, id: &str) -> BoxFuture<'_, StorageResult<BoardSnapshot>> {
        let path = self.board_path(id);
        let id = id.to_string();
        Box::pin(async move {
            if !path.exists() {
                return Err(StorageError::NotFound(id));
            }
            let json = fs::read_to_string(&path).map_err(|e| {
                StorageError::Io(format!("Failed to read {}: {}", path.display(), e))
            })?;
            BoardSnapshot::from_json(&json).map_err(|e| {
                StorageError::Serialization(format!("Failed to parse {}: {}", path.display(), e))
            })
        })
    }

    fn delete(&self, id: &str) -> BoxFuture<'_, StorageResult<()>> {
        let path = self.board_path(id);
        Box::pin(async move {
            if path.exists() {
                fs::remove_file(&path).map_err(|e| {
                    StorageError::Io(format!("Failed to delete {}: {}", path.display(), e))
                })?;
            }
            Ok(())
        })
    }

    fn list(&self) -> BoxFuture<'_, StorageResult<Vec<String>>> {
        let base = self.base_path.clone();
        Box::pin(async move {
            if !base.exists() {
                return Ok(vec![]);
            }
            let entries = fs::read_dir(&base)
                .map_err(|e| StorageError::Io(format!("Failed to read directory: {}", e)))?;

            let ids = entries
                .flatten()
                .map(|entry| entry.path())
                .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
                .filter_map(|path| {
                    let stem = path.file_stem()?.to_str()?;
                    percent_decode_str(stem).decode_utf8().ok().map(|id| id.into_owned())
                })
                .collect();
            Ok(ids)
        })
    }

    fn exists(&self, id: &str) -> BoxFuture<'_, StorageResult<bool>> {
        let path = self.board_path(id);
        Box::pin(async move { Ok(path.exists()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::{Anchor, Arrow, BoxShape, Element, ElementId, Endpoint, Stroke, TextBox};
    use kurbo::Point;
    use pollster::block_on;
    use tempfile::tempdir;

    fn storage() -> (tempfile::TempDir, FileStorage) {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("boards")).unwrap();
        (dir, storage)
    }

    fn every_kind() -> BoardSnapshot {
        let rect = BoxShape::new(0.0, 0.0, 160.0, 80.0, "#2563eb");
        let rect_id = rect.id.clone();
        BoardSnapshot::new(vec![
            Element::Stroke(Stroke {
                id: ElementId::new(),
                color: "#ef4444".into(),
                width: 4.0,
                points: vec![Point::new(1.0, 2.0), Point::new(3.5, 4.25)],
            }),
            Element::Rect(rect),
            Element::Diamond(BoxShape::new(200.0, 0.0, 60.0, 60.0, "#10b981")),
            Element::Arrow(Arrow {
                id: ElementId::new(),
                from: Endpoint::bound(rect_id, Anchor::East, Point::new(160.0, 40.0)),
                to: Endpoint::Free(Point::new(300.0, 40.0)),
                color: "#111827".into(),
            }),
            Element::Text(TextBox {
                id: ElementId::new(),
                x: 5.0,
                y: 300.0,
                w: 260.0,
                text: "line one\nline two".into(),
                color: "#111827".into(),
                font_size: 18.0,
            }),
        ])
    }

    #[test]
    fn test_file_storage_round_trip() {
        let (_dir, storage) = storage();
        let board = every_kind();

        block_on(storage.save("team-board", &board)).unwrap();
        let loaded = block_on(storage.load("team-board")).unwrap();
        assert_eq!(loaded, board);
    }

    #[test]
    fn test_file_storage_not_found() {
        let (_dir, storage) = storage();
        let result = block_on(storage.load("nonexistent"));
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[test]
    fn test_file_storage_corrupt_file() {
        let (_dir, storage) = storage();
        fs::write(storage.base_path().join("bad.json"), "{oops").unwrap();
        let result = block_on(storage.load("bad"));
        assert!(matches!(result, Err(StorageError::Serialization(_))));
    }

    #[test]
    fn test_file_storage_list_and_delete() {
        let (_dir, storage) = storage();
        block_on(storage.save("one", &BoardSnapshot::default())).unwrap();
        block_on(storage.save("two", &BoardSnapshot::default())).unwrap();

        let mut list = block_on(storage.list()).unwrap();
        list.sort();
        assert_eq!(list, vec!["one".to_string(), "two".to_string()]);

        block_on(storage.delete("one")).unwrap();
        assert!(!block_on(storage.exists("one")).unwrap());
    }

    #[test]
    fn test_file_storage_escapes_id() {
        let (_dir, storage) = storage();
        block_on(storage.save("../escape/attempt", &every_kind())).unwrap();
        assert!(
            storage
                .base_path()
                .join("%2E%2E%2Fescape%2Fattempt.json")
                .exists()
        );
        let loaded = block_on(storage.load("../escape/attempt")).unwrap();
        assert_eq!(loaded.elements.len(), 5);
        assert_eq!(block_on(storage.list()).unwrap(), vec!["../escape/attempt".to_string()]);
    }

    #[test]
    fn test_file_storage_keeps_similar_ids_apart() {
        let (_dir, storage) = storage();
        let rect = BoardSnapshot::new(vec![Element::Rect(BoxShape::new(
            0.0, 0.0, 100.0, 100.0, "#2563eb",
        ))]);
        block_on(storage.save("team_a", &BoardSnapshot::default())).unwrap();
        assert!(!block_on(storage.exists("team.a")).unwrap());
        assert!(!block_on(storage.exists("team/a")).unwrap());

        block_on(storage.save("team.a", &rect)).unwrap();
        assert!(block_on(storage.load("team_a")).unwrap().elements.is_empty());
        assert_eq!(block_on(storage.load("team.a")).unwrap(), rect);

        let mut list = block_on(storage.list()).unwrap();
        list.sort();
        assert_eq!(list, vec!["team.a".to_string(), "team_a".to_string()]);
    }
}
