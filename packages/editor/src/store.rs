//! # Store
//!
//! Owns the [`Model`] and is the only way to change it.
//!
//! ## Execution
//!
//! ```text
//! execute(op) ──► apply ──► ModelEvent ──► history
//!                                │
//!                                ▼
//!                 dispatcher (evaluators, FIFO)
//!                                │
//!                                ▼
//! process_notifications() ──► modified flag ──► listeners ──► refresh
//! ```
//!
//! The mutation itself is synchronous: when `execute` returns, the model is in
//! its post-operation state. Evaluation happens on the dispatcher; the last
//! hop (modified flag, listeners, refresh callback) happens on the document
//! thread when it drains completions, strictly in application order.
//!
//! `Store` is `!Send`. It holds non-`Send` listeners and refresh callbacks,
//! so all mutation stays on the thread that created it.
//!
//! ```compile_fail
//! fn assert_send<T: Send>() {}
//! assert_send::<tenniarb_editor::Store>();
//! ```

use crate::config::EditorConfig;
use crate::dispatcher::{Dispatcher, Evaluator};
use crate::event::{ChangeKind, Direction, ModelEvent};
use crate::ids::{ElementId, ItemId};
use crate::model::{DiagramItem, ElementTree, Model};
use crate::operations::{
    AddElement, AddItem, ComplexUpdateElement, ComplexUpdateItem, CompositeOperation,
    ElementOperation, MoveElement, OperationError, RemoveElement, RemoveItem, ReorderItem,
    UpdateElementName, UpdateName, UpdatePosition,
};
use crate::properties::ModelProperties;
use crate::undo_stack::{HistoryEntry, UndoStack};
use std::collections::{HashSet, VecDeque};
use tenniarb_parser::TennNode;

/// Document-thread observer of applied changes
pub trait ModelListener {
    fn notify_changes(&mut self, event: &ModelEvent);
}

impl<F> ModelListener for F
where
    F: FnMut(&ModelEvent),
{
    fn notify_changes(&mut self, event: &ModelEvent) {
        self(event)
    }
}

/// Callback run on the document thread after an operation was delivered
pub type Refresh = Box<dyn FnOnce()>;

/// One end of a link created with [`Store::add_link`]
#[derive(Debug, Clone)]
pub enum LinkEnd {
    Existing(ItemId),
    /// Added to the container together with the link
    New(DiagramItem),
}

impl From<ItemId> for LinkEnd {
    fn from(id: ItemId) -> Self {
        LinkEnd::Existing(id)
    }
}

impl From<DiagramItem> for LinkEnd {
    fn from(item: DiagramItem) -> Self {
        LinkEnd::New(item)
    }
}

pub struct Store {
    model: Model,
    history: UndoStack,
    dispatcher: Dispatcher,
    listeners: Vec<Box<dyn ModelListener>>,
    /// Refresh callbacks waiting for their event, in sequence order
    refreshes: VecDeque<(u64, Option<Refresh>)>,
    sequence: u64,
    modified: bool,
    config: EditorConfig,
}

impl Store {
    pub fn new(model: Model) -> Self {
        Self::with_config(model, EditorConfig::default())
    }

    pub fn with_config(model: Model, config: EditorConfig) -> Self {
        Self {
            model,
            history: UndoStack::with_max_levels(config.max_undo_levels),
            dispatcher: Dispatcher::new(config.background_evaluation),
            listeners: Vec::new(),
            refreshes: VecDeque::new(),
            sequence: 0,
            modified: false,
            config,
        }
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn mark_saved(&mut self) {
        self.modified = false;
    }

    /// Sequence number of the last event built
    pub fn last_sequence(&self) -> u64 {
        self.sequence
    }

    pub fn add_listener(&mut self, listener: impl ModelListener + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn add_evaluator(&mut self, evaluator: impl Evaluator + 'static) {
        self.dispatcher.register(Box::new(evaluator));
    }

    // ---- execution ----

    pub fn execute(&mut self, operation: impl ElementOperation + 'static) -> Result<(), OperationError> {
        self.run_new(Box::new(operation), None)
    }

    /// Execute and call `refresh` once the change has been delivered
    pub fn execute_with_refresh(
        &mut self,
        operation: impl ElementOperation + 'static,
        refresh: impl FnOnce() + 'static,
    ) -> Result<(), OperationError> {
        self.run_new(Box::new(operation), Some(Box::new(refresh)))
    }

    fn run_new(&mut self, mut operation: HistoryEntry, refresh: Option<Refresh>) -> Result<(), OperationError> {
        self.run(&mut *operation, Direction::Apply, refresh)?;
        self.history.record(operation);
        Ok(())
    }

    fn run(
        &mut self,
        operation: &mut dyn ElementOperation,
        direction: Direction,
        refresh: Option<Refresh>,
    ) -> Result<(), OperationError> {
        let result = match direction {
            Direction::Apply => operation.apply(&mut self.model),
            Direction::Undo => operation.undo(&mut self.model),
        };
        if let Err(err) = result {
            tracing::warn!("{:?} of {} failed: {}", direction, operation.name(), err);
            return Err(err);
        }
        tracing::debug!(operation = %operation.name(), ?direction, "operation done");

        let mut event = ModelEvent::new(operation.event_kind(), operation.notifier());
        operation.collect(direction, &mut event);
        self.snapshot(&mut event);
        self.sequence += 1;
        event.sequence = self.sequence;

        self.refreshes.push_back((event.sequence, refresh));
        self.dispatcher.submit(event);

        if !self.dispatcher.is_background() {
            self.process_notifications();
        }
        Ok(())
    }

    /// Property snapshots of everything appended or updated
    fn snapshot(&self, event: &mut ModelEvent) {
        for (id, _) in event.items.iter().filter(|(_, kind)| **kind != ChangeKind::Remove) {
            if let Some(item) = self.model.item(*id) {
                event.item_snapshots.insert(*id, item.to_tenn_as_props());
            }
        }
        for (id, _) in event.elements.iter().filter(|(_, kind)| **kind != ChangeKind::Remove) {
            if let Some(element) = self.model.element(*id) {
                event.element_snapshots.insert(*id, element.to_tenn_as_props());
            }
        }
    }

    /// Deliver every evaluated event that is ready. Returns how many were
    /// delivered.
    pub fn process_notifications(&mut self) -> usize {
        let mut delivered = 0;
        while let Some(event) = self.dispatcher.try_completed() {
            self.deliver(event);
            delivered += 1;
        }
        delivered
    }

    /// Wait for all outstanding events and deliver them
    pub fn flush(&mut self) -> usize {
        let mut delivered = 0;
        while let Some(event) = self.dispatcher.wait_completed() {
            self.deliver(event);
            delivered += 1;
        }
        delivered
    }

    fn deliver(&mut self, event: ModelEvent) {
        self.modified = true;
        for listener in self.listeners.iter_mut() {
            listener.notify_changes(&event);
        }
        // Refreshes of events lost by the dispatcher still run, in order.
        while let Some((sequence, _)) = self.refreshes.front() {
            if *sequence > event.sequence {
                break;
            }
            if let Some((_, Some(refresh))) = self.refreshes.pop_front() {
                refresh();
            }
        }
    }

    // ---- history ----

    pub fn undo(&mut self) -> Result<bool, OperationError> {
        self.close_batches();
        let Some(mut entry) = self.history.take_undo() else {
            return Ok(false);
        };
        match self.run(&mut *entry, Direction::Undo, None) {
            Ok(()) => {
                self.history.push_undone(entry);
                Ok(true)
            }
            Err(err) => {
                self.history.push_redone(entry);
                Err(err)
            }
        }
    }

    pub fn redo(&mut self) -> Result<bool, OperationError> {
        self.close_batches();
        let Some(mut entry) = self.history.take_redo() else {
            return Ok(false);
        };
        match self.run(&mut *entry, Direction::Apply, None) {
            Ok(()) => {
                self.history.push_redone(entry);
                Ok(true)
            }
            Err(err) => {
                self.history.push_undone(entry);
                Err(err)
            }
        }
    }

    fn close_batches(&mut self) {
        if self.history.is_batching() {
            tracing::warn!("history navigation closes the open batch");
        }
        while self.history.is_batching() {
            self.history.end_batch();
        }
    }

    /// Group the following executes into one history entry
    pub fn begin_batch(&mut self) {
        let root = self.model.root();
        self.history.begin_batch(root);
    }

    pub fn end_batch(&mut self) {
        self.history.end_batch();
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn undo_levels(&self) -> usize {
        self.history.undo_levels()
    }

    pub fn redo_levels(&self) -> usize {
        self.history.redo_levels()
    }

    pub fn undo_name(&self) -> Option<String> {
        self.history.undo_description()
    }

    pub fn redo_name(&self) -> Option<String> {
        self.history.redo_description()
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    // ---- mutations ----

    pub fn update_name(&mut self, item: ItemId, name: impl Into<String>) -> Result<(), OperationError> {
        let op = UpdateName::new(&self.model, item, name)?;
        self.execute(op)
    }

    pub fn update_element_name(
        &mut self,
        element: ElementId,
        name: impl Into<String>,
    ) -> Result<(), OperationError> {
        let op = UpdateElementName::new(&self.model, element, name)?;
        self.execute(op)
    }

    pub fn update_position(&mut self, item: ItemId, x: f64, y: f64) -> Result<(), OperationError> {
        let op = UpdatePosition::new(&self.model, item, x, y)?;
        self.execute(op)
    }

    /// Replace the whole property fragment of an item
    pub fn set_item_properties(&mut self, item: ItemId, props: TennNode) -> Result<(), OperationError> {
        let op = ComplexUpdateItem::new(&self.model, item, props)?;
        self.execute(op)
    }

    /// Replace the whole property fragment of an element
    pub fn set_element_properties(
        &mut self,
        element: ElementId,
        props: TennNode,
    ) -> Result<(), OperationError> {
        let op = ComplexUpdateElement::new(&self.model, element, props)?;
        self.execute(op)
    }

    pub fn add_element(
        &mut self,
        parent: ElementId,
        element: impl Into<ElementTree>,
        index: Option<usize>,
    ) -> Result<ElementId, OperationError> {
        let op = AddElement::new(parent, element, index);
        let id = op.child();
        self.execute(op)?;
        Ok(id)
    }

    pub fn add_elements(
        &mut self,
        parent: ElementId,
        elements: impl IntoIterator<Item = ElementTree>,
    ) -> Result<Vec<ElementId>, OperationError> {
        let mut composite = CompositeOperation::new(parent);
        let mut ids = Vec::new();
        for element in elements {
            let op = AddElement::new(parent, element, None);
            ids.push(op.child());
            composite.push(op);
        }
        self.execute(composite)?;
        Ok(ids)
    }

    pub fn remove_element(&mut self, element: ElementId) -> Result<(), OperationError> {
        let op = RemoveElement::new(&self.model, element)?;
        self.execute(op)
    }

    pub fn move_element(
        &mut self,
        element: ElementId,
        new_parent: ElementId,
        index: Option<usize>,
    ) -> Result<(), OperationError> {
        self.execute(MoveElement::new(element, new_parent, index))
    }

    pub fn add_item(
        &mut self,
        container: ElementId,
        item: DiagramItem,
        index: Option<usize>,
    ) -> Result<ItemId, OperationError> {
        let op = AddItem::new(container, item, index);
        let id = op.item();
        self.execute(op)?;
        Ok(id)
    }

    pub fn add_items(
        &mut self,
        container: ElementId,
        items: impl IntoIterator<Item = DiagramItem>,
    ) -> Result<Vec<ItemId>, OperationError> {
        let mut composite = CompositeOperation::new(container);
        let mut ids = Vec::new();
        for item in items {
            let op = AddItem::new(container, item, None);
            ids.push(op.item());
            composite.push(op);
        }
        self.execute(composite)?;
        Ok(ids)
    }

    /// Add a link, adding new endpoint items first. All of it is one history
    /// entry.
    pub fn add_link(
        &mut self,
        container: ElementId,
        source: impl Into<LinkEnd>,
        target: impl Into<LinkEnd>,
        properties: ModelProperties,
    ) -> Result<ItemId, OperationError> {
        let mut composite = CompositeOperation::new(container);
        let mut endpoint = |end: LinkEnd| match end {
            LinkEnd::Existing(id) => id,
            LinkEnd::New(item) => {
                let op = AddItem::new(container, item, None);
                let id = op.item();
                composite.push(op);
                id
            }
        };
        let source = endpoint(source.into());
        let target = endpoint(target.into());

        let link = DiagramItem::link(source, target).with_properties(properties);
        let op = AddItem::new(container, link, None);
        let id = op.item();
        composite.push(op);

        self.execute(composite)?;
        Ok(id)
    }

    /// Remove an item and the links that reference it
    pub fn remove_item(&mut self, container: ElementId, item: ItemId) -> Result<(), OperationError> {
        self.remove_items(container, [item])
    }

    /// Remove items and every link referencing one of them. Each entity is
    /// removed once, links before their endpoints.
    pub fn remove_items(
        &mut self,
        container: ElementId,
        items: impl IntoIterator<Item = ItemId>,
    ) -> Result<(), OperationError> {
        let mut seen = HashSet::new();
        let mut composite = CompositeOperation::new(container);
        for item in items {
            for related in self.model.related_items(container, item) {
                if seen.insert(related) {
                    composite.push(RemoveItem::new(&self.model, container, related)?);
                }
            }
        }
        self.execute(composite)
    }

    pub fn reorder_item(&mut self, item: ItemId, index: usize) -> Result<(), OperationError> {
        let op = ReorderItem::new(&self.model, item, index)?;
        self.execute(op)
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("modified", &self.modified)
            .field("sequence", &self.sequence)
            .field("history", &self.history)
            .field("dispatcher", &self.dispatcher)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Element;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn store() -> (Store, ElementId) {
        let mut store = Store::with_config(Model::new(), EditorConfig::inline());
        let root = store.model().root();
        let id = store.add_element(root, Element::new("Main"), None).unwrap();
        store.clear_history();
        store.mark_saved();
        (store, id)
    }

    #[test]
    fn test_execute_records_and_notifies() {
        let (mut store, main) = store();
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        store.add_listener(move |e: &ModelEvent| sink.borrow_mut().push(e.clone()));

        let item = store.add_item(main, DiagramItem::new("A"), None).unwrap();
        assert!(store.is_modified());
        assert_eq!(store.undo_levels(), 1);

        let events = events.borrow();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].element, main);
        assert_eq!(events[0].item(item), Some(ChangeKind::Append));
        assert!(events[0].item_snapshots.contains_key(&item));
    }

    #[test]
    fn test_failed_execute_is_not_recorded() {
        let (mut store, main) = store();
        let events = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&events);
        store.add_listener(move |_: &ModelEvent| *sink.borrow_mut() += 1);

        let err = store
            .add_item(main, DiagramItem::new("A"), Some(5))
            .unwrap_err();
        assert_eq!(err, OperationError::IndexOutOfRange { index: 5, len: 0 });
        assert!(!store.can_undo());
        assert!(!store.is_modified());
        assert_eq!(*events.borrow(), 0);
    }

    #[test]
    fn test_undo_redo_reports_inverse_changes() {
        let (mut store, main) = store();
        let kinds = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&kinds);
        let item = store.add_item(main, DiagramItem::new("A"), None).unwrap();
        store.add_listener(move |e: &ModelEvent| sink.borrow_mut().push(e.item(item)));

        assert!(store.undo().unwrap());
        assert!(!store.model().contains_item(item));
        assert!(store.redo().unwrap());
        assert!(store.model().contains_item(item));
        assert!(!store.redo().unwrap());

        assert_eq!(
            *kinds.borrow(),
            vec![Some(ChangeKind::Remove), Some(ChangeKind::Append)]
        );
    }

    #[test]
    fn test_refresh_runs_after_listeners() {
        let (mut store, main) = store();
        let order = Rc::new(RefCell::new(Vec::new()));
        let listener_log = Rc::clone(&order);
        store.add_listener(move |e: &ModelEvent| {
            listener_log.borrow_mut().push(format!("listener {}", e.sequence))
        });

        let item = store.add_item(main, DiagramItem::new("A"), None).unwrap();
        let refresh_log = Rc::clone(&order);
        let op = UpdatePosition::new(store.model(), item, 1.0, 2.0).unwrap();
        store
            .execute_with_refresh(op, move || refresh_log.borrow_mut().push("refresh".to_string()))
            .unwrap();

        assert_eq!(
            *order.borrow(),
            vec!["listener 2".to_string(), "listener 3".to_string(), "refresh".to_string()]
        );
    }

    #[test]
    fn test_remove_item_takes_links() {
        let (mut store, main) = store();
        let a = store.add_item(main, DiagramItem::new("A"), None).unwrap();
        let b = store.add_item(main, DiagramItem::new("B"), None).unwrap();
        store.add_link(main, a, b, ModelProperties::new()).unwrap();
        store.add_link(main, b, a, ModelProperties::new()).unwrap();

        store.remove_items(main, [a, b]).unwrap();
        assert_eq!(store.model().get_element(main).unwrap().items().len(), 0);
        assert_eq!(
            store.undo_name().as_deref(),
            Some("RemoveItem,RemoveItem,RemoveItem,RemoveItem")
        );

        store.undo().unwrap();
        let names: Vec<_> = store
            .model()
            .items_of(main)
            .map(|i| (i.name.clone(), i.is_link()))
            .collect();
        assert_eq!(
            names,
            vec![
                ("A".to_string(), false),
                ("B".to_string(), false),
                (String::new(), true),
                (String::new(), true),
            ]
        );
    }

    #[test]
    fn test_batch_undoes_together() {
        let (mut store, main) = store();
        store.begin_batch();
        let a = store.add_item(main, DiagramItem::new("A"), None).unwrap();
        store.update_position(a, 3.0, 4.0).unwrap();
        store.update_name(a, "Renamed").unwrap();
        store.end_batch();

        assert_eq!(store.undo_levels(), 1);
        store.undo().unwrap();
        assert!(!store.model().contains_item(a));
        store.redo().unwrap();
        let item = store.model().item(a).unwrap();
        assert_eq!((item.name.as_str(), item.x, item.y), ("Renamed", 3.0, 4.0));
    }

    #[test]
    fn test_update_position_is_layout() {
        let (mut store, main) = store();
        let a = store.add_item(main, DiagramItem::new("A"), None).unwrap();
        let kinds = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&kinds);
        store.add_listener(move |e: &ModelEvent| sink.borrow_mut().push(e.kind));
        store.update_position(a, 1.0, 1.0).unwrap();
        store.update_name(a, "B").unwrap();
        assert_eq!(
            *kinds.borrow(),
            vec![crate::event::ModelEventKind::Layout, crate::event::ModelEventKind::Structure]
        );
    }

    #[test]
    fn test_move_and_reorder() {
        let (mut store, main) = store();
        let root = store.model().root();
        let other = store.add_element(root, Element::new("Other"), None).unwrap();
        store.move_element(other, main, None).unwrap();
        assert_eq!(store.model().get_element(other).unwrap().parent(), Some(main));

        let ids = store
            .add_items(main, [DiagramItem::new("A"), DiagramItem::new("B")])
            .unwrap();
        store.reorder_item(ids[1], 0).unwrap();
        assert_eq!(store.model().get_element(main).unwrap().items(), &[ids[1], ids[0]]);

        store.undo().unwrap();
        store.undo().unwrap();
        store.undo().unwrap();
        assert_eq!(store.model().get_element(other).unwrap().parent(), Some(root));
    }

    #[test]
    fn test_background_flush_delivers_in_order() {
        let mut store = Store::new(Model::new());
        let root = store.model().root();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        store.add_listener(move |e: &ModelEvent| sink.borrow_mut().push(e.sequence));

        for i in 0..20 {
            store.add_element(root, Element::new(format!("e{}", i)), None).unwrap();
        }
        assert_eq!(store.flush(), 20);
        assert_eq!(*seen.borrow(), (1..=20).collect::<Vec<u64>>());
        assert!(store.is_modified());
    }
}
