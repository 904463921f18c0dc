//! # Undo/Redo Stack
//!
//! Tracks executed operations so the store can walk the history both ways.
//!
//! ## Design
//!
//! - Entries are the operations themselves; removed entities live inside them
//! - Undo pops an entry, the store undoes it, and the entry moves to redo
//! - Redo re-applies the entry and moves it back to undo
//! - Recording a new operation clears the redo stack
//! - Batches collect several operations into one [`CompositeOperation`] entry
//!
//! The stack never touches the model itself. Running an entry is up to the
//! caller, which can then decide where the entry goes if running it fails.

use crate::ids::ElementId;
use crate::operations::{CompositeOperation, ElementOperation};

pub type HistoryEntry = Box<dyn ElementOperation>;

#[derive(Debug)]
pub struct UndoStack {
    /// Applied entries, most recent last
    undo_stack: Vec<HistoryEntry>,

    /// Undone entries, most recent last
    redo_stack: Vec<HistoryEntry>,

    /// Maximum number of undo levels (0 = unlimited)
    max_levels: usize,

    current_batch: Option<CompositeOperation>,

    /// Nesting depth of `begin_batch` calls
    batch_depth: usize,
}

impl UndoStack {
    /// Undo stack with the default of 100 levels
    pub fn new() -> Self {
        Self::with_max_levels(100)
    }

    pub fn with_max_levels(max_levels: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_levels,
            current_batch: None,
            batch_depth: 0,
        }
    }

    pub fn max_levels(&self) -> usize {
        self.max_levels
    }

    /// Record an operation that was just applied
    pub fn record(&mut self, operation: HistoryEntry) {
        match &mut self.current_batch {
            Some(batch) => batch.push_boxed(operation),
            None => self.push_entry(operation),
        }
    }

    /// Start grouping recorded operations into one entry. Batches nest; the
    /// entry is pushed when the outermost batch ends.
    pub fn begin_batch(&mut self, notifier: ElementId) {
        if self.batch_depth == 0 {
            self.current_batch = Some(CompositeOperation::new(notifier));
        }
        self.batch_depth += 1;
    }

    pub fn end_batch(&mut self) {
        if self.batch_depth == 0 {
            return;
        }
        self.batch_depth -= 1;
        if self.batch_depth > 0 {
            return;
        }
        if let Some(batch) = self.current_batch.take() {
            if !batch.is_empty() {
                self.push_entry(Box::new(batch));
            }
        }
    }

    pub fn is_batching(&self) -> bool {
        self.batch_depth > 0
    }

    fn push_entry(&mut self, entry: HistoryEntry) {
        self.undo_stack.push(entry);

        if self.max_levels > 0 && self.undo_stack.len() > self.max_levels {
            self.undo_stack.remove(0);
        }

        self.redo_stack.clear();
    }

    /// Most recent applied entry
    pub fn take_undo(&mut self) -> Option<HistoryEntry> {
        self.undo_stack.pop()
    }

    /// Most recently undone entry
    pub fn take_redo(&mut self) -> Option<HistoryEntry> {
        self.redo_stack.pop()
    }

    /// Store an entry that was just undone
    pub fn push_undone(&mut self, entry: HistoryEntry) {
        self.redo_stack.push(entry);
    }

    /// Store an entry that was just re-applied, keeping the redo stack
    pub fn push_redone(&mut self, entry: HistoryEntry) {
        self.undo_stack.push(entry);
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_levels(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_levels(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.current_batch = None;
        self.batch_depth = 0;
    }

    /// Name of the next entry to undo
    pub fn undo_description(&self) -> Option<String> {
        self.undo_stack.last().map(|entry| entry.name())
    }

    /// Name of the next entry to redo
    pub fn redo_description(&self) -> Option<String> {
        self.redo_stack.last().map(|entry| entry.name())
    }
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new()
    }
}
