use crate::ids::{ElementId, ItemId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tenniarb_parser::TennNode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelEventKind {
    Structure,
    Layout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeKind {
    Append,
    Remove,
    Update,
}

/// Which way an operation was just run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Apply,
    Undo,
}

impl Direction {
    /// Change reported by an operation that adds an entity when applied
    pub fn added(self) -> ChangeKind {
        match self {
            Direction::Apply => ChangeKind::Append,
            Direction::Undo => ChangeKind::Remove,
        }
    }

    /// Change reported by an operation that removes an entity when applied
    pub fn removed(self) -> ChangeKind {
        match self {
            Direction::Apply => ChangeKind::Remove,
            Direction::Undo => ChangeKind::Append,
        }
    }
}

/// Structural effect of one executed, undone or redone operation.
///
/// Events are immutable once built. Appended and updated entities come with a
/// property snapshot taken right after the change, so consumers on other
/// threads never need the live model.
#[derive(Debug, Clone)]
pub struct ModelEvent {
    pub kind: ModelEventKind,
    /// Element whose listeners are notified
    pub element: ElementId,
    pub items: HashMap<ItemId, ChangeKind>,
    pub elements: HashMap<ElementId, ChangeKind>,
    pub item_snapshots: HashMap<ItemId, TennNode>,
    pub element_snapshots: HashMap<ElementId, TennNode>,
    /// Position of the event in the store's notification order
    pub sequence: u64,
}

impl ModelEvent {
    pub fn new(kind: ModelEventKind, element: ElementId) -> Self {
        Self {
            kind,
            element,
            items: HashMap::new(),
            elements: HashMap::new(),
            item_snapshots: HashMap::new(),
            element_snapshots: HashMap::new(),
            sequence: 0,
        }
    }

    pub fn item(&self, id: ItemId) -> Option<ChangeKind> {
        self.items.get(&id).copied()
    }

    pub fn element_change(&self, id: ElementId) -> Option<ChangeKind> {
        self.elements.get(&id).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.elements.is_empty()
    }
}
