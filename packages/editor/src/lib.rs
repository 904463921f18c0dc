//! # Tenniarb Editor
//!
//! Document model and transactional editing engine for Tenniarb diagrams.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ parser: .tn text ⇄ TennNode                 │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ editor: Document + Store                    │
//! │  - Model arena (elements, items, links)     │
//! │  - Reversible operations, undo/redo         │
//! │  - Ordered notification dispatcher          │
//! │  - Property mapping and persistence         │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ evaluators / listeners: read ModelEvents    │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tenniarb_editor::{DiagramItem, Document, ModelProperties};
//!
//! let mut doc = Document::load("platform.tn")?;
//! let store = doc.store_mut();
//! let root = store.model().root();
//! let main = store.model().child_named(root, "Platform").unwrap();
//!
//! // Adds both endpoints and the link as one undoable step
//! store.add_link(main, DiagramItem::new("Client"), DiagramItem::new("Server"), ModelProperties::new())?;
//! store.undo()?;
//!
//! doc.save()?;
//! ```

mod config;
mod dispatcher;
mod document;
mod errors;
mod event;
mod ids;
mod mapping;
mod model;
mod operations;
mod persistence;
mod properties;
mod store;
mod undo_stack;

pub use config::{EditorConfig, DEFAULT_CONFIG_NAME};
pub use dispatcher::{Dispatcher, Evaluator};
pub use document::Document;
pub use errors::EditorError;
pub use event::{ChangeKind, Direction, ModelEvent, ModelEventKind};
pub use ids::{ElementId, ItemId};
pub use model::{DiagramItem, Element, ElementTree, ItemKind, Model};
pub use operations::{
    AddElement, AddItem, ComplexUpdateElement, ComplexUpdateItem, CompositeOperation,
    ElementOperation, MoveElement, OperationError, RemoveElement, RemoveItem, ReorderItem,
    UpdateElementName, UpdateName, UpdatePosition,
};
pub use persistence::{item_ref_indices, parse_tenn, to_tenn, to_tenn_str};
pub use properties::ModelProperties;
pub use store::{LinkEnd, ModelListener, Refresh, Store};
pub use undo_stack::{HistoryEntry, UndoStack};

// Re-export the AST for property fragments
pub use tenniarb_parser::{NodeKind, TennNode};
