//! # Element Operations
//!
//! Reversible units of change on a [`Model`].
//!
//! Every operation captures enough state when it is built (old and new
//! values) or when it is applied (the detached entity and the index it was
//! removed from) to invert itself exactly. Operations carry no direction
//! flag: the store's history decides whether an entry is applied or undone,
//! and passes that [`Direction`] to [`ElementOperation::collect`].

use crate::event::{ChangeKind, Direction, ModelEvent, ModelEventKind};
use crate::ids::{ElementId, ItemId};
use crate::model::{DiagramItem, ElementTree, Model};
use tenniarb_parser::TennNode;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum OperationError {
    #[error("Element not found: {0}")]
    ElementNotFound(ElementId),

    #[error("Item not found: {0}")]
    ItemNotFound(ItemId),

    #[error("Item {item} is not inside element {container}")]
    NotInContainer { item: ItemId, container: ElementId },

    #[error("Link {link} endpoint {endpoint} is not an item of the link's container")]
    LinkEndpointOutside { link: ItemId, endpoint: ItemId },

    #[error("Link {link} endpoint {endpoint} is itself a link")]
    LinkEndpointIsLink { link: ItemId, endpoint: ItemId },

    #[error("Nothing detached to attach for {0}")]
    NothingToAttach(String),

    #[error("Entity {0} is already part of the model")]
    AlreadyAttached(String),

    #[error("Index {index} out of range (length {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("The root element cannot be removed or moved")]
    RootElement,

    #[error("Moving {0} would create a cycle")]
    CycleDetected(ElementId),
}

/// A reversible change to the model
pub trait ElementOperation {
    /// Short name for logs and history descriptions
    fn name(&self) -> String;

    fn apply(&mut self, model: &mut Model) -> Result<(), OperationError>;

    fn undo(&mut self, model: &mut Model) -> Result<(), OperationError>;

    /// Element whose listeners are told about the change
    fn notifier(&self) -> ElementId;

    fn event_kind(&self) -> ModelEventKind {
        ModelEventKind::Structure
    }

    /// Record the affected entities after running in `direction`
    fn collect(&self, direction: Direction, event: &mut ModelEvent);
}

impl std::fmt::Debug for dyn ElementOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ElementOperation({})", self.name())
    }
}

/// Ordered group applied front to back and undone back to front.
///
/// A failing child rolls back the children that already ran, so the model is
/// left as it was before the composite started.
pub struct CompositeOperation {
    notifier: ElementId,
    operations: Vec<Box<dyn ElementOperation>>,
}

impl std::fmt::Debug for CompositeOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeOperation")
            .field("notifier", &self.notifier)
            .field("operations", &self.names())
            .finish()
    }
}

impl CompositeOperation {
    pub fn new(notifier: ElementId) -> Self {
        Self {
            notifier,
            operations: Vec::new(),
        }
    }

    pub fn with(mut self, operation: impl ElementOperation + 'static) -> Self {
        self.push(operation);
        self
    }

    pub fn push(&mut self, operation: impl ElementOperation + 'static) {
        self.operations.push(Box::new(operation));
    }

    pub fn push_boxed(&mut self, operation: Box<dyn ElementOperation>) {
        self.operations.push(operation);
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.operations.iter().map(|op| op.name()).collect()
    }
}

impl ElementOperation for CompositeOperation {
    fn name(&self) -> String {
        self.names().join(",")
    }

    fn apply(&mut self, model: &mut Model) -> Result<(), OperationError> {
        for i in 0..self.operations.len() {
            if let Err(err) = self.operations[i].apply(model) {
                for done in self.operations[..i].iter_mut().rev() {
                    if let Err(rollback) = done.undo(model) {
                        tracing::warn!("rollback of {} failed: {}", done.name(), rollback);
                    }
                }
                return Err(err);
            }
        }
        Ok(())
    }

    fn undo(&mut self, model: &mut Model) -> Result<(), OperationError> {
        let len = self.operations.len();
        for i in (0..len).rev() {
            if let Err(err) = self.operations[i].undo(model) {
                for done in self.operations[i + 1..].iter_mut() {
                    if let Err(rollback) = done.apply(model) {
                        tracing::warn!("re-apply of {} failed: {}", done.name(), rollback);
                    }
                }
                return Err(err);
            }
        }
        Ok(())
    }

    fn notifier(&self) -> ElementId {
        self.notifier
    }

    /// Common kind of the children, `Structure` when they differ
    fn event_kind(&self) -> ModelEventKind {
        let mut kinds = self.operations.iter().map(|op| op.event_kind());
        match kinds.next() {
            Some(first) if kinds.all(|k| k == first) => first,
            _ => ModelEventKind::Structure,
        }
    }

    fn collect(&self, direction: Direction, event: &mut ModelEvent) {
        for op in &self.operations {
            op.collect(direction, event);
        }
    }
}

pub struct UpdatePosition {
    container: ElementId,
    item: ItemId,
    old: (f64, f64),
    new: (f64, f64),
}

impl UpdatePosition {
    pub fn new(model: &Model, item: ItemId, x: f64, y: f64) -> Result<Self, OperationError> {
        let current = model.get_item(item)?;
        let container = current.parent().ok_or(OperationError::ItemNotFound(item))?;
        Ok(Self {
            container,
            item,
            old: (current.x, current.y),
            new: (x, y),
        })
    }

    fn set(&self, model: &mut Model, (x, y): (f64, f64)) -> Result<(), OperationError> {
        let item = model.get_item_mut(self.item)?;
        item.x = x;
        item.y = y;
        Ok(())
    }
}

impl ElementOperation for UpdatePosition {
    fn name(&self) -> String {
        format!(
            "UpdatePosition {} ({}, {}) -> ({}, {})",
            self.item, self.old.0, self.old.1, self.new.0, self.new.1
        )
    }

    fn apply(&mut self, model: &mut Model) -> Result<(), OperationError> {
        self.set(model, self.new)
    }

    fn undo(&mut self, model: &mut Model) -> Result<(), OperationError> {
        self.set(model, self.old)
    }

    fn notifier(&self) -> ElementId {
        self.container
    }

    fn event_kind(&self) -> ModelEventKind {
        ModelEventKind::Layout
    }

    fn collect(&self, _: Direction, event: &mut ModelEvent) {
        event.items.insert(self.item, ChangeKind::Update);
    }
}

pub struct UpdateName {
    container: ElementId,
    item: ItemId,
    old: String,
    new: String,
}

impl UpdateName {
    pub fn new(model: &Model, item: ItemId, name: impl Into<String>) -> Result<Self, OperationError> {
        let current = model.get_item(item)?;
        Ok(Self {
            container: current.parent().ok_or(OperationError::ItemNotFound(item))?,
            item,
            old: current.name.clone(),
            new: name.into(),
        })
    }
}

impl ElementOperation for UpdateName {
    fn name(&self) -> String {
        "UpdateName".to_string()
    }

    fn apply(&mut self, model: &mut Model) -> Result<(), OperationError> {
        model.get_item_mut(self.item)?.name = self.new.clone();
        Ok(())
    }

    fn undo(&mut self, model: &mut Model) -> Result<(), OperationError> {
        model.get_item_mut(self.item)?.name = self.old.clone();
        Ok(())
    }

    fn notifier(&self) -> ElementId {
        self.container
    }

    fn collect(&self, _: Direction, event: &mut ModelEvent) {
        event.items.insert(self.item, ChangeKind::Update);
    }
}

pub struct UpdateElementName {
    element: ElementId,
    old: String,
    new: String,
}

impl UpdateElementName {
    pub fn new(model: &Model, element: ElementId, name: impl Into<String>) -> Result<Self, OperationError> {
        Ok(Self {
            element,
            old: model.get_element(element)?.name.clone(),
            new: name.into(),
        })
    }
}

impl ElementOperation for UpdateElementName {
    fn name(&self) -> String {
        "UpdateElementName".to_string()
    }

    fn apply(&mut self, model: &mut Model) -> Result<(), OperationError> {
        model.get_element_mut(self.element)?.name = self.new.clone();
        Ok(())
    }

    fn undo(&mut self, model: &mut Model) -> Result<(), OperationError> {
        model.get_element_mut(self.element)?.name = self.old.clone();
        Ok(())
    }

    fn notifier(&self) -> ElementId {
        self.element
    }

    fn collect(&self, _: Direction, event: &mut ModelEvent) {
        event
            .elements
            .insert(self.element, ChangeKind::Update);
    }
}

/// Replace an item's whole property fragment
pub struct ComplexUpdateItem {
    container: ElementId,
    item: ItemId,
    old: TennNode,
    new: TennNode,
}

impl ComplexUpdateItem {
    pub fn new(model: &Model, item: ItemId, props: TennNode) -> Result<Self, OperationError> {
        let current = model.get_item(item)?;
        Ok(Self {
            container: current.parent().ok_or(OperationError::ItemNotFound(item))?,
            item,
            old: current.to_tenn_as_props(),
            new: props,
        })
    }
}

impl ElementOperation for ComplexUpdateItem {
    fn name(&self) -> String {
        "UpdateItem".to_string()
    }

    fn apply(&mut self, model: &mut Model) -> Result<(), OperationError> {
        model.get_item_mut(self.item)?.from_tenn_props(&self.new);
        Ok(())
    }

    fn undo(&mut self, model: &mut Model) -> Result<(), OperationError> {
        model.get_item_mut(self.item)?.from_tenn_props(&self.old);
        Ok(())
    }

    fn notifier(&self) -> ElementId {
        self.container
    }

    fn collect(&self, _: Direction, event: &mut ModelEvent) {
        event.items.insert(self.item, ChangeKind::Update);
    }
}

/// Replace an element's name, description and properties
pub struct ComplexUpdateElement {
    element: ElementId,
    old: TennNode,
    new: TennNode,
}

impl ComplexUpdateElement {
    pub fn new(model: &Model, element: ElementId, props: TennNode) -> Result<Self, OperationError> {
        Ok(Self {
            element,
            old: model.get_element(element)?.to_tenn_as_props(),
            new: props,
        })
    }
}

impl ElementOperation for ComplexUpdateElement {
    fn name(&self) -> String {
        "UpdateElement".to_string()
    }

    fn apply(&mut self, model: &mut Model) -> Result<(), OperationError> {
        model.get_element_mut(self.element)?.from_tenn_props(&self.new);
        Ok(())
    }

    fn undo(&mut self, model: &mut Model) -> Result<(), OperationError> {
        model.get_element_mut(self.element)?.from_tenn_props(&self.old);
        Ok(())
    }

    fn notifier(&self) -> ElementId {
        self.element
    }

    fn collect(&self, _: Direction, event: &mut ModelEvent) {
        event
            .elements
            .insert(self.element, ChangeKind::Update);
    }
}

pub struct AddElement {
    parent: ElementId,
    child: ElementId,
    index: Option<usize>,
    detached: Option<ElementTree>,
}

impl AddElement {
    pub fn new(parent: ElementId, child: impl Into<ElementTree>, index: Option<usize>) -> Self {
        let tree = child.into();
        Self {
            parent,
            child: tree.id(),
            index,
            detached: Some(tree),
        }
    }

    pub fn child(&self) -> ElementId {
        self.child
    }
}

impl ElementOperation for AddElement {
    fn name(&self) -> String {
        "AddElement".to_string()
    }

    fn apply(&mut self, model: &mut Model) -> Result<(), OperationError> {
        let tree = self
            .detached
            .take()
            .ok_or_else(|| OperationError::NothingToAttach(self.child.to_string()))?;
        if let Err(err) = model.attach_element(self.parent, tree.clone(), self.index) {
            self.detached = Some(tree);
            return Err(err);
        }
        Ok(())
    }

    fn undo(&mut self, model: &mut Model) -> Result<(), OperationError> {
        let (tree, _) = model.detach_element(self.child)?;
        self.detached = Some(tree);
        Ok(())
    }

    fn notifier(&self) -> ElementId {
        self.parent
    }

    fn collect(&self, direction: Direction, event: &mut ModelEvent) {
        event.elements.insert(self.child, direction.added());
    }
}

pub struct RemoveElement {
    parent: ElementId,
    child: ElementId,
    removed: Option<(ElementTree, usize)>,
}

impl RemoveElement {
    pub fn new(model: &Model, child: ElementId) -> Result<Self, OperationError> {
        let (parent, _) = model.index_of_element(child)?;
        Ok(Self {
            parent,
            child,
            removed: None,
        })
    }
}

impl ElementOperation for RemoveElement {
    fn name(&self) -> String {
        "RemoveElement".to_string()
    }

    fn apply(&mut self, model: &mut Model) -> Result<(), OperationError> {
        self.removed = Some(model.detach_element(self.child)?);
        Ok(())
    }

    fn undo(&mut self, model: &mut Model) -> Result<(), OperationError> {
        let (tree, index) = self
            .removed
            .take()
            .ok_or_else(|| OperationError::NothingToAttach(self.child.to_string()))?;
        if let Err(err) = model.attach_element(self.parent, tree.clone(), Some(index)) {
            self.removed = Some((tree, index));
            return Err(err);
        }
        Ok(())
    }

    fn notifier(&self) -> ElementId {
        self.parent
    }

    fn collect(&self, direction: Direction, event: &mut ModelEvent) {
        event.elements.insert(self.child, direction.removed());
    }
}

pub struct AddItem {
    container: ElementId,
    item: ItemId,
    index: Option<usize>,
    detached: Option<DiagramItem>,
}

impl AddItem {
    pub fn new(container: ElementId, item: DiagramItem, index: Option<usize>) -> Self {
        Self {
            container,
            item: item.id(),
            index,
            detached: Some(item),
        }
    }

    pub fn item(&self) -> ItemId {
        self.item
    }
}

impl ElementOperation for AddItem {
    fn name(&self) -> String {
        "AddItem".to_string()
    }

    fn apply(&mut self, model: &mut Model) -> Result<(), OperationError> {
        let item = self
            .detached
            .take()
            .ok_or_else(|| OperationError::NothingToAttach(self.item.to_string()))?;
        if let Err(err) = model.attach_item(self.container, item.clone(), self.index) {
            self.detached = Some(item);
            return Err(err);
        }
        Ok(())
    }

    fn undo(&mut self, model: &mut Model) -> Result<(), OperationError> {
        let (item, _) = model.detach_item(self.item)?;
        self.detached = Some(item);
        Ok(())
    }

    fn notifier(&self) -> ElementId {
        self.container
    }

    fn collect(&self, direction: Direction, event: &mut ModelEvent) {
        event.items.insert(self.item, direction.added());
    }
}

pub struct RemoveItem {
    container: ElementId,
    item: ItemId,
    removed: Option<(DiagramItem, usize)>,
}

impl RemoveItem {
    pub fn new(model: &Model, container: ElementId, item: ItemId) -> Result<Self, OperationError> {
        let (parent, _) = model.index_of_item(item)?;
        if parent != container {
            return Err(OperationError::NotInContainer { item, container });
        }
        Ok(Self {
            container,
            item,
            removed: None,
        })
    }
}

impl ElementOperation for RemoveItem {
    fn name(&self) -> String {
        "RemoveItem".to_string()
    }

    fn apply(&mut self, model: &mut Model) -> Result<(), OperationError> {
        self.removed = Some(model.detach_item(self.item)?);
        Ok(())
    }

    fn undo(&mut self, model: &mut Model) -> Result<(), OperationError> {
        let (item, index) = self
            .removed
            .take()
            .ok_or_else(|| OperationError::NothingToAttach(self.item.to_string()))?;
        if let Err(err) = model.attach_item(self.container, item.clone(), Some(index)) {
            self.removed = Some((item, index));
            return Err(err);
        }
        Ok(())
    }

    fn notifier(&self) -> ElementId {
        self.container
    }

    fn collect(&self, direction: Direction, event: &mut ModelEvent) {
        event.items.insert(self.item, direction.removed());
    }
}

/// Relocate an element, possibly under a different parent
pub struct MoveElement {
    element: ElementId,
    new_parent: ElementId,
    index: Option<usize>,
    previous: Option<(ElementId, usize)>,
}

impl MoveElement {
    pub fn new(element: ElementId, new_parent: ElementId, index: Option<usize>) -> Self {
        Self {
            element,
            new_parent,
            index,
            previous: None,
        }
    }
}

impl ElementOperation for MoveElement {
    fn name(&self) -> String {
        "MoveElement".to_string()
    }

    fn apply(&mut self, model: &mut Model) -> Result<(), OperationError> {
        self.previous = Some(model.move_element(self.element, self.new_parent, self.index)?);
        Ok(())
    }

    fn undo(&mut self, model: &mut Model) -> Result<(), OperationError> {
        let (parent, index) = self
            .previous
            .ok_or_else(|| OperationError::NothingToAttach(self.element.to_string()))?;
        model.move_element(self.element, parent, Some(index))?;
        Ok(())
    }

    fn notifier(&self) -> ElementId {
        self.element
    }

    fn collect(&self, _: Direction, event: &mut ModelEvent) {
        event
            .elements
            .insert(self.element, ChangeKind::Update);
    }
}

/// Move an item to another position in its container
pub struct ReorderItem {
    container: ElementId,
    item: ItemId,
    index: usize,
    previous: Option<usize>,
}

impl ReorderItem {
    pub fn new(model: &Model, item: ItemId, index: usize) -> Result<Self, OperationError> {
        let (container, _) = model.index_of_item(item)?;
        Ok(Self {
            container,
            item,
            index,
            previous: None,
        })
    }
}

impl ElementOperation for ReorderItem {
    fn name(&self) -> String {
        "ReorderItem".to_string()
    }

    fn apply(&mut self, model: &mut Model) -> Result<(), OperationError> {
        self.previous = Some(model.reorder_item(self.item, self.index)?);
        Ok(())
    }

    fn undo(&mut self, model: &mut Model) -> Result<(), OperationError> {
        let previous = self
            .previous
            .ok_or_else(|| OperationError::NothingToAttach(self.item.to_string()))?;
        model.reorder_item(self.item, previous)?;
        Ok(())
    }

    fn notifier(&self) -> ElementId {
        self.container
    }

    fn collect(&self, _: Direction, event: &mut ModelEvent) {
        event.items.insert(self.item, ChangeKind::Update);
    }
}
