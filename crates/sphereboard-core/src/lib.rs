//! Sphereboard Core Library
//!
//! Element model, geometry, interaction and collaboration logic for the
//! Sphereboard shared whiteboard. Nothing here draws or touches a window.

pub mod camera;
pub mod collaboration;
pub mod color;
pub mod controller;
pub mod elements;
pub mod geometry;
pub mod input;
pub mod layout;
pub mod presence;
pub mod scene;
pub mod selection;
pub mod session;
pub mod storage;
pub mod sync;
pub mod text_edit;
pub mod tools;

pub use camera::Camera;
pub use collaboration::CollaborationBridge;
pub use controller::{InteractionController, InteractionMode, SceneChange};
pub use elements::{Anchor, Element, ElementError, ElementId, Endpoint};
pub use geometry::{HitMode, hit_test};
pub use input::{InputState, Key, Modifiers, MouseButton, PointerEvent};
pub use presence::{CursorTable, RemoteCursor};
pub use scene::Scene;
pub use session::{BoardSession, SaveNotice, SessionConfig};
pub use storage::{BoardSnapshot, BoardStorage, FileStorage, MemoryStorage, StorageError};
pub use sync::{ClientMessage, ConnectionState, RelaySocket, ServerMessage, SyncError, SyncEvent};
pub use tools::{ToolKind, ToolSettings};
