//! # Document Model
//!
//! Arena of elements and diagram items addressed by [`ElementId`] and
//! [`ItemId`].
//!
//! Ownership is expressed by the id lists: an element owns the ids in its
//! `elements` and `items` lists, and every owned entity points back at its
//! owner through `parent`. Links refer to their endpoints by id only; both
//! endpoints must be items of the same container as the link.
//!
//! Detached subtrees leave the arena as an [`ElementTree`] (or a bare
//! [`DiagramItem`]) and are held by whoever detached them until they are
//! attached again.

use crate::ids::{ElementId, ItemId};
use crate::operations::OperationError;
use crate::properties::ModelProperties;
use std::collections::HashMap;

/// A container: child elements, items and a property bag
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    id: ElementId,
    pub name: String,
    pub description: String,
    pub properties: ModelProperties,
    parent: Option<ElementId>,
    elements: Vec<ElementId>,
    items: Vec<ItemId>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: ElementId::next(),
            name: name.into(),
            description: String::new(),
            properties: ModelProperties::new(),
            parent: None,
            elements: Vec::new(),
            items: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_properties(mut self, properties: ModelProperties) -> Self {
        self.properties = properties;
        self
    }

    pub fn id(&self) -> ElementId {
        self.id
    }

    pub fn parent(&self) -> Option<ElementId> {
        self.parent
    }

    pub fn elements(&self) -> &[ElementId] {
        &self.elements
    }

    pub fn items(&self) -> &[ItemId] {
        &self.items
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Item,
    Link { source: ItemId, target: ItemId },
}

/// A node or a link inside an element
#[derive(Debug, Clone, PartialEq)]
pub struct DiagramItem {
    id: ItemId,
    kind: ItemKind,
    /// Node name, or the label of a link
    pub name: String,
    pub description: String,
    pub x: f64,
    pub y: f64,
    pub properties: ModelProperties,
    parent: Option<ElementId>,
}

impl DiagramItem {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_kind(ItemKind::Item, name.into())
    }

    pub fn link(source: ItemId, target: ItemId) -> Self {
        Self::with_kind(ItemKind::Link { source, target }, String::new())
    }

    fn with_kind(kind: ItemKind, name: String) -> Self {
        Self {
            id: ItemId::next(),
            kind,
            name,
            description: String::new(),
            x: 0.0,
            y: 0.0,
            properties: ModelProperties::new(),
            parent: None,
        }
    }

    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    pub fn with_properties(mut self, properties: ModelProperties) -> Self {
        self.properties = properties;
        self
    }

    pub fn id(&self) -> ItemId {
        self.id
    }

    pub fn kind(&self) -> ItemKind {
        self.kind
    }

    pub fn parent(&self) -> Option<ElementId> {
        self.parent
    }

    pub fn is_link(&self) -> bool {
        matches!(self.kind, ItemKind::Link { .. })
    }

    pub fn endpoints(&self) -> Option<(ItemId, ItemId)> {
        match self.kind {
            ItemKind::Link { source, target } => Some((source, target)),
            ItemKind::Item => None,
        }
    }

    /// Whether this is a link with `item` at either end
    pub fn references(&self, item: ItemId) -> bool {
        self.endpoints()
            .is_some_and(|(source, target)| source == item || target == item)
    }
}

/// A detached element together with everything it owns
#[derive(Debug, Clone)]
pub struct ElementTree {
    root: ElementId,
    elements: HashMap<ElementId, Element>,
    items: HashMap<ItemId, DiagramItem>,
}

impl ElementTree {
    pub fn id(&self) -> ElementId {
        self.root
    }

    pub fn root(&self) -> &Element {
        &self.elements[&self.root]
    }

    pub fn root_mut(&mut self) -> &mut Element {
        self.elements
            .get_mut(&self.root)
            .unwrap_or_else(|| unreachable!("tree root is always present"))
    }

    /// Append an item to the root element
    pub fn with_item(mut self, mut item: DiagramItem) -> Self {
        item.parent = Some(self.root);
        self.root_mut().items.push(item.id);
        self.items.insert(item.id, item);
        self
    }

    /// Append a subtree under the root element
    pub fn with_child(mut self, child: impl Into<ElementTree>) -> Self {
        let mut child = child.into();
        let root = self.root;
        child.root_mut().parent = Some(root);
        self.root_mut().elements.push(child.root);
        self.elements.extend(child.elements);
        self.items.extend(child.items);
        self
    }

    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }
}

impl From<Element> for ElementTree {
    fn from(mut element: Element) -> Self {
        element.parent = None;
        element.elements.clear();
        element.items.clear();
        let root = element.id;
        Self {
            root,
            elements: HashMap::from([(root, element)]),
            items: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Model {
    root: ElementId,
    elements: HashMap<ElementId, Element>,
    items: HashMap<ItemId, DiagramItem>,
}

impl Default for Model {
    fn default() -> Self {
        Self::new()
    }
}

impl Model {
    pub fn new() -> Self {
        let root = Element::new("");
        let id = root.id;
        Self {
            root: id,
            elements: HashMap::from([(id, root)]),
            items: HashMap::new(),
        }
    }

    pub fn root(&self) -> ElementId {
        self.root
    }

    pub fn root_element(&self) -> &Element {
        &self.elements[&self.root]
    }

    pub fn root_element_mut(&mut self) -> &mut Element {
        let root = self.root;
        self.elements
            .get_mut(&root)
            .unwrap_or_else(|| unreachable!("model root is always present"))
    }

    pub fn element(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(&id)
    }

    pub fn item(&self, id: ItemId) -> Option<&DiagramItem> {
        self.items.get(&id)
    }

    pub fn get_element(&self, id: ElementId) -> Result<&Element, OperationError> {
        self.elements
            .get(&id)
            .ok_or(OperationError::ElementNotFound(id))
    }

    pub fn get_element_mut(&mut self, id: ElementId) -> Result<&mut Element, OperationError> {
        self.elements
            .get_mut(&id)
            .ok_or(OperationError::ElementNotFound(id))
    }

    pub fn get_item(&self, id: ItemId) -> Result<&DiagramItem, OperationError> {
        self.items.get(&id).ok_or(OperationError::ItemNotFound(id))
    }

    pub fn get_item_mut(&mut self, id: ItemId) -> Result<&mut DiagramItem, OperationError> {
        self.items
            .get_mut(&id)
            .ok_or(OperationError::ItemNotFound(id))
    }

    pub fn contains_element(&self, id: ElementId) -> bool {
        self.elements.contains_key(&id)
    }

    pub fn contains_item(&self, id: ItemId) -> bool {
        self.items.contains_key(&id)
    }

    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Child elements of `id` in order
    pub fn children(&self, id: ElementId) -> impl Iterator<Item = &Element> {
        self.elements
            .get(&id)
            .map(|e| e.elements.as_slice())
            .unwrap_or(&[])
            .iter()
            .filter_map(|child| self.elements.get(child))
    }

    /// Items and links of `id` in order
    pub fn items_of(&self, id: ElementId) -> impl Iterator<Item = &DiagramItem> {
        self.elements
            .get(&id)
            .map(|e| e.items.as_slice())
            .unwrap_or(&[])
            .iter()
            .filter_map(|item| self.items.get(item))
    }

    /// First child element named `name`
    pub fn child_named(&self, parent: ElementId, name: &str) -> Option<ElementId> {
        self.children(parent).find(|e| e.name == name).map(|e| e.id)
    }

    /// First non-link item named `name`
    pub fn item_named(&self, container: ElementId, name: &str) -> Option<ItemId> {
        self.items_of(container)
            .find(|i| !i.is_link() && i.name == name)
            .map(|i| i.id)
    }

    /// Links of `container` that reference `item`, followed by `item` itself
    pub fn related_items(&self, container: ElementId, item: ItemId) -> Vec<ItemId> {
        let mut related: Vec<ItemId> = self
            .items_of(container)
            .filter(|i| i.references(item))
            .map(|i| i.id)
            .collect();
        related.push(item);
        related
    }

    /// Whether `ancestor` is `id` or one of its ancestors
    pub fn is_ancestor(&self, ancestor: ElementId, id: ElementId) -> bool {
        let mut current = Some(id);
        while let Some(element) = current {
            if element == ancestor {
                return true;
            }
            current = self.elements.get(&element).and_then(|e| e.parent);
        }
        false
    }

    pub fn index_of_element(&self, id: ElementId) -> Result<(ElementId, usize), OperationError> {
        let parent = self
            .get_element(id)?
            .parent
            .ok_or(OperationError::RootElement)?;
        let index = self
            .get_element(parent)?
            .elements
            .iter()
            .position(|e| *e == id)
            .ok_or(OperationError::ElementNotFound(id))?;
        Ok((parent, index))
    }

    pub fn index_of_item(&self, id: ItemId) -> Result<(ElementId, usize), OperationError> {
        let parent = self
            .get_item(id)?
            .parent
            .ok_or(OperationError::ItemNotFound(id))?;
        let index = self
            .get_element(parent)?
            .items
            .iter()
            .position(|i| *i == id)
            .ok_or(OperationError::ItemNotFound(id))?;
        Ok((parent, index))
    }

    /// Insert a detached subtree under `parent`, at `index` or at the end
    pub fn attach_element(
        &mut self,
        parent: ElementId,
        mut tree: ElementTree,
        index: Option<usize>,
    ) -> Result<(), OperationError> {
        let len = self.get_element(parent)?.elements.len();
        let index = checked_index(index, len)?;
        if let Some(id) = tree.elements.keys().find(|id| self.elements.contains_key(id)) {
            return Err(OperationError::AlreadyAttached(id.to_string()));
        }
        if let Some(id) = tree.items.keys().find(|id| self.items.contains_key(id)) {
            return Err(OperationError::AlreadyAttached(id.to_string()));
        }

        let root = tree.root;
        tree.root_mut().parent = Some(parent);
        self.elements.extend(tree.elements);
        self.items.extend(tree.items);
        self.get_element_mut(parent)?.elements.insert(index, root);
        Ok(())
    }

    /// Remove an element and everything below it. Returns the subtree and the
    /// index it had in its parent.
    pub fn detach_element(&mut self, id: ElementId) -> Result<(ElementTree, usize), OperationError> {
        let (parent, index) = self.index_of_element(id)?;
        self.get_element_mut(parent)?.elements.remove(index);

        let mut tree = ElementTree {
            root: id,
            elements: HashMap::new(),
            items: HashMap::new(),
        };
        let mut pending = vec![id];
        while let Some(next) = pending.pop() {
            let Some(element) = self.elements.remove(&next) else {
                continue;
            };
            for item in &element.items {
                if let Some(item) = self.items.remove(item) {
                    tree.items.insert(item.id, item);
                }
            }
            pending.extend(element.elements.iter().copied());
            tree.elements.insert(next, element);
        }
        tree.root_mut().parent = None;
        Ok((tree, index))
    }

    /// Insert a detached item into `container`. Link endpoints must already be
    /// node items of the same container.
    pub fn attach_item(
        &mut self,
        container: ElementId,
        mut item: DiagramItem,
        index: Option<usize>,
    ) -> Result<(), OperationError> {
        let len = self.get_element(container)?.items.len();
        let index = checked_index(index, len)?;
        if self.items.contains_key(&item.id) {
            return Err(OperationError::AlreadyAttached(item.id.to_string()));
        }
        if let Some((source, target)) = item.endpoints() {
            for endpoint in [source, target] {
                let Some(existing) = self
                    .items
                    .get(&endpoint)
                    .filter(|i| i.parent == Some(container))
                else {
                    return Err(OperationError::LinkEndpointOutside {
                        link: item.id,
                        endpoint,
                    });
                };
                if existing.is_link() {
                    return Err(OperationError::LinkEndpointIsLink {
                        link: item.id,
                        endpoint,
                    });
                }
            }
        }

        item.parent = Some(container);
        let id = item.id;
        self.items.insert(id, item);
        self.get_element_mut(container)?.items.insert(index, id);
        Ok(())
    }

    /// Remove an item. Returns it with the index it had in its container.
    pub fn detach_item(&mut self, id: ItemId) -> Result<(DiagramItem, usize), OperationError> {
        let (container, index) = self.index_of_item(id)?;
        self.get_element_mut(container)?.items.remove(index);
        let mut item = self
            .items
            .remove(&id)
            .ok_or(OperationError::ItemNotFound(id))?;
        item.parent = None;
        Ok((item, index))
    }

    /// Move an element under `new_parent`. Returns the previous parent and
    /// index.
    pub fn move_element(
        &mut self,
        id: ElementId,
        new_parent: ElementId,
        index: Option<usize>,
    ) -> Result<(ElementId, usize), OperationError> {
        self.get_element(new_parent)?;
        if self.is_ancestor(id, new_parent) {
            return Err(OperationError::CycleDetected(id));
        }
        let (old_parent, old_index) = self.index_of_element(id)?;
        let len = self.get_element(new_parent)?.elements.len();
        let len = if old_parent == new_parent { len - 1 } else { len };
        let index = checked_index(index, len)?;

        self.get_element_mut(old_parent)?.elements.remove(old_index);
        self.get_element_mut(new_parent)?.elements.insert(index, id);
        self.get_element_mut(id)?.parent = Some(new_parent);
        Ok((old_parent, old_index))
    }

    /// Move an item to `index` within its container. Returns the old index.
    pub fn reorder_item(&mut self, id: ItemId, index: usize) -> Result<usize, OperationError> {
        let (container, old_index) = self.index_of_item(id)?;
        let items = &mut self.get_element_mut(container)?.items;
        if index >= items.len() {
            return Err(OperationError::IndexOutOfRange {
                index,
                len: items.len(),
            });
        }
        items.remove(old_index);
        items.insert(index, id);
        Ok(old_index)
    }
}

fn checked_index(index: Option<usize>, len: usize) -> Result<usize, OperationError> {
    match index {
        None => Ok(len),
        Some(index) if index <= len => Ok(index),
        Some(index) => Err(OperationError::IndexOutOfRange { index, len }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model_with_items() -> (Model, ElementId, ItemId, ItemId, ItemId) {
        let mut model = Model::new();
        let element = Element::new("Main");
        let id = element.id();
        model.attach_element(model.root(), element.into(), None).unwrap();

        let a = DiagramItem::new("A");
        let b = DiagramItem::new("B");
        let (a_id, b_id) = (a.id(), b.id());
        model.attach_item(id, a, None).unwrap();
        model.attach_item(id, b, None).unwrap();
        let link = DiagramItem::link(a_id, b_id);
        let link_id = link.id();
        model.attach_item(id, link, None).unwrap();
        (model, id, a_id, b_id, link_id)
    }

    #[test]
    fn test_attach_and_lookup() {
        let (model, id, a, _, link) = model_with_items();
        assert_eq!(model.get_element(id).unwrap().items().len(), 3);
        assert_eq!(model.item_named(id, "A"), Some(a));
        assert_eq!(model.item(link).unwrap().parent(), Some(id));
        assert_eq!(model.child_named(model.root(), "Main"), Some(id));
    }

    #[test]
    fn test_link_endpoints_must_share_container() {
        let (mut model, _, a, _, _) = model_with_items();
        let other = Element::new("Other");
        let other_id = other.id();
        model.attach_element(model.root(), other.into(), None).unwrap();

        let c = DiagramItem::new("C");
        let c_id = c.id();
        model.attach_item(other_id, c, None).unwrap();

        let err = model
            .attach_item(other_id, DiagramItem::link(c_id, a), None)
            .unwrap_err();
        assert!(matches!(err, OperationError::LinkEndpointOutside { endpoint, .. } if endpoint == a));
    }

    #[test]
    fn test_link_cannot_target_a_link() {
        let (mut model, id, a, _, link) = model_with_items();
        let err = model
            .attach_item(id, DiagramItem::link(a, link), None)
            .unwrap_err();
        assert!(matches!(err, OperationError::LinkEndpointIsLink { endpoint, .. } if endpoint == link));
        assert_eq!(model.items_of(id).count(), 3);
    }

    #[test]
    fn test_related_items() {
        let (model, id, a, b, link) = model_with_items();
        assert_eq!(model.related_items(id, a), vec![link, a]);
        assert_eq!(model.related_items(id, b), vec![link, b]);
        assert_eq!(model.related_items(id, link), vec![link]);
    }

    #[test]
    fn test_detach_and_reattach_subtree() {
        let (mut model, id, _, _, _) = model_with_items();
        let nested = Element::new("Nested");
        let nested_id = nested.id();
        model.attach_element(id, nested.into(), None).unwrap();

        let (tree, index) = model.detach_element(id).unwrap();
        assert_eq!(index, 0);
        assert_eq!(tree.element_count(), 2);
        assert_eq!(tree.item_count(), 3);
        assert!(!model.contains_element(nested_id));
        assert_eq!(model.item_count(), 0);

        model.attach_element(model.root(), tree, Some(0)).unwrap();
        assert!(model.contains_element(nested_id));
        assert_eq!(model.get_element(nested_id).unwrap().parent(), Some(id));
        assert_eq!(model.item_count(), 3);
    }

    #[test]
    fn test_root_cannot_be_detached() {
        let mut model = Model::new();
        let root = model.root();
        assert_eq!(model.detach_element(root).unwrap_err(), OperationError::RootElement);
    }

    #[test]
    fn test_index_out_of_range() {
        let mut model = Model::new();
        let err = model
            .attach_element(model.root(), Element::new("x").into(), Some(3))
            .unwrap_err();
        assert_eq!(err, OperationError::IndexOutOfRange { index: 3, len: 0 });
    }

    #[test]
    fn test_move_element_rejects_cycles() {
        let mut model = Model::new();
        let outer = Element::new("outer");
        let inner = Element::new("inner");
        let (outer_id, inner_id) = (outer.id(), inner.id());
        model.attach_element(model.root(), outer.into(), None).unwrap();
        model.attach_element(outer_id, inner.into(), None).unwrap();

        assert_eq!(
            model.move_element(outer_id, inner_id, None).unwrap_err(),
            OperationError::CycleDetected(outer_id)
        );
        let (old_parent, old_index) = model.move_element(inner_id, model.root(), Some(0)).unwrap();
        assert_eq!((old_parent, old_index), (outer_id, 0));
        assert_eq!(model.root_element().elements(), &[inner_id, outer_id]);
    }

    #[test]
    fn test_tree_builder() {
        let tree = ElementTree::from(Element::new("group"))
            .with_item(DiagramItem::new("x"))
            .with_child(Element::new("sub"));
        assert_eq!(tree.element_count(), 2);
        assert_eq!(tree.root().items().len(), 1);
        assert_eq!(tree.root().elements().len(), 1);
    }
}
