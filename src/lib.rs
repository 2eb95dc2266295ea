//! easel — a layered raster image editor core.
//!
//! The crate models a document as a stack of RGBA layers composited bottom
//! to top, with snapshot-based undo history and a set of pointer-driven
//! tools (brush, eraser, selections, magic wand, clone stamp, transform).
//! [`session::EditorSession`] is the usual entry point for embedders; the
//! `easel` binary exposes a headless compositor over the same core.

pub mod blend;
pub mod cli;
pub mod document;
pub mod error;
pub mod geom;
pub mod history;
pub mod io;
pub mod layer;
pub mod logger;
pub mod selection;
pub mod session;
pub mod tools;

pub use blend::BlendMode;
pub use document::Document;
pub use error::EaselError;
pub use geom::{Point, Rect};
pub use history::{HistoryManager, HistoryState, MAX_HISTORY_STATES};
pub use layer::{Layer, LayerGroup};
pub use selection::Region;
pub use session::EditorSession;
pub use tools::{Key, Modifiers, PointerButton, PointerEvent, ToolKind, ToolSet};
