//! # Document Persistence
//!
//! Maps a whole [`Model`] to Tenn statements and back.
//!
//! ```text
//! element "Name" {
//!     description "..."
//!     <element properties>
//!     item "A" { pos 10.0 20.0; <item properties> }
//!     link "A" "B" { source-index 1; label "uses"; <link properties> }
//!     element "Nested" { ... }
//! }
//! ```
//!
//! Links name their endpoints. When several items of one element share a
//! name, the n-th occurrence (counting from zero) is addressed by writing
//! `source-index n` / `target-index n` in the link block.

use crate::ids::{ElementId, ItemId};
use crate::mapping::{self, keys, LinkIndices};
use crate::model::{DiagramItem, Element, ElementTree, ItemKind, Model};
use std::collections::HashMap;
use tenniarb_parser::{NodeKind, TennNode};

/// Occurrence index of every node item among the items sharing its name
pub fn item_ref_indices<'a>(items: impl IntoIterator<Item = &'a DiagramItem>) -> HashMap<ItemId, usize> {
    let mut seen: HashMap<&str, usize> = HashMap::new();
    let mut indices = HashMap::new();
    for item in items {
        if item.is_link() {
            continue;
        }
        let count = seen.entry(item.name.as_str()).or_insert(0);
        indices.insert(item.id(), *count);
        *count += 1;
    }
    indices
}

pub fn to_tenn(model: &Model) -> TennNode {
    let mut out = TennNode::new(NodeKind::Statements, None);
    out.extend(model.root_element().properties.iter().cloned());
    for element in model.children(model.root()) {
        out.add(element_command(model, element));
    }
    out
}

pub fn to_tenn_str(model: &Model) -> String {
    to_tenn(model).to_str(0, false)
}

fn element_command(model: &Model, element: &Element) -> TennNode {
    let mut block = TennNode::block([]);
    if !element.description.is_empty() {
        block.add(TennNode::command(
            keys::DESCRIPTION,
            [TennNode::string(&element.description)],
        ));
    }
    block.extend(element.properties.iter().cloned());

    let indices = item_ref_indices(model.items_of(element.id()));
    for item in model.items_of(element.id()) {
        match item.kind() {
            ItemKind::Item => block.add(item_command(item)),
            ItemKind::Link { source, target } => {
                block.add(link_command(model, item, source, target, &indices))
            }
        }
    }

    for child in model.children(element.id()) {
        block.add(element_command(model, child));
    }

    TennNode::command(keys::ELEMENT, [TennNode::string(&element.name), block])
}

fn item_command(item: &DiagramItem) -> TennNode {
    let mut command = TennNode::command(keys::ITEM, [TennNode::string(&item.name)]);
    let mut block = TennNode::block([]);
    mapping::write_item_data(item, &mut block, false);
    if !block.is_empty() {
        command.add(block);
    }
    command
}

fn link_command(
    model: &Model,
    link: &DiagramItem,
    source: ItemId,
    target: ItemId,
    indices: &HashMap<ItemId, usize>,
) -> TennNode {
    let name_of = |id: ItemId| model.item(id).map(|i| i.name.clone()).unwrap_or_default();
    let mut command = TennNode::command(
        keys::LINK,
        [TennNode::string(name_of(source)), TennNode::string(name_of(target))],
    );

    let mut block = TennNode::block([]);
    for (key, endpoint) in [(keys::SOURCE_INDEX, source), (keys::TARGET_INDEX, target)] {
        // Written even when zero if the link carries a property of the same
        // name, so that the index is the first one read back.
        let index = indices.get(&endpoint).copied().unwrap_or(0);
        if index != 0 || link.properties.get(key).is_some() {
            let index = i64::try_from(index).unwrap_or(i64::MAX);
            block.add(TennNode::command(key, [TennNode::int(index)]));
        }
    }
    mapping::write_link_data(link, &mut block, false);
    if !block.is_empty() {
        command.add(block);
    }
    command
}

/// Build a model from parsed statements. `element` and `model` commands
/// become child elements of the root; everything else is kept in the root's
/// property bag.
pub fn parse_tenn(node: &TennNode) -> Model {
    let mut model = Model::new();
    let root = model.root();

    let commands: Vec<&TennNode> = match node.kind() {
        NodeKind::Statements => node.children().iter().collect(),
        _ => vec![node],
    };
    for command in commands {
        if !read_element(&mut model, root, command) {
            model.root_element_mut().properties.append(command.clone());
        }
    }
    model
}

fn is_element_command(command: &TennNode) -> bool {
    command.kind() == NodeKind::Command
        && command.len() >= 2
        && matches!(command.ident_at(&[0]), Some(keys::ELEMENT) | Some(keys::MODEL))
}

/// Children of the block argument at `index`, empty when there is none
fn block_commands(command: &TennNode, index: usize) -> impl Iterator<Item = (&str, &TennNode)> {
    command
        .block_children(index)
        .iter()
        .filter(|c| c.is_named_element())
        .filter_map(|c| c.ident_at(&[0]).map(|name| (name, c)))
}

/// An item or a link waiting for its endpoints, in source order
enum Entry<'a> {
    Item(DiagramItem),
    Link(&'a TennNode),
}

/// Attach the element described by `command` under `parent`. Returns false
/// when the command does not describe an element.
fn read_element(model: &mut Model, parent: ElementId, command: &TennNode) -> bool {
    if !is_element_command(command) {
        return false;
    }

    let element = Element::new(command.ident_at(&[1]).unwrap_or_default());
    let id = element.id();
    if let Err(err) = model.attach_element(parent, ElementTree::from(element), None) {
        tracing::warn!("cannot attach element: {}", err);
        return false;
    }

    let mut entries = Vec::new();
    let mut nested = Vec::new();
    let mut description = None;
    let mut properties = Vec::new();

    for (name, child) in block_commands(command, 2) {
        match name {
            keys::ITEM => entries.push(Entry::Item(read_item(child))),
            keys::LINK if child.len() >= 2 => entries.push(Entry::Link(child)),
            keys::ELEMENT if is_element_command(child) => nested.push(child),
            _ if mapping::is_description(name) => {
                description = Some(child.ident_at(&[1]).unwrap_or_default().to_string());
            }
            _ => properties.push(child.clone()),
        }
    }

    if let Ok(element) = model.get_element_mut(id) {
        if let Some(description) = description {
            element.description = description;
        }
        for property in properties {
            element.properties.append(property);
        }
    }

    attach_entries(model, id, entries);

    for child in nested {
        read_element(model, id, child);
    }
    true
}

fn read_item(command: &TennNode) -> DiagramItem {
    let mut item = DiagramItem::new(command.ident_at(&[1]).unwrap_or_default());
    for (name, child) in block_commands(command, 2) {
        mapping::read_item_command(&mut item, name, child);
    }
    item
}

fn attach_entries(model: &mut Model, container: ElementId, entries: Vec<Entry<'_>>) {
    let mut refs: HashMap<(String, usize), ItemId> = HashMap::new();
    let mut counts: HashMap<String, usize> = HashMap::new();
    for entry in &entries {
        if let Entry::Item(item) = entry {
            let count = counts.entry(item.name.clone()).or_insert(0);
            refs.insert((item.name.clone(), *count), item.id());
            *count += 1;
        }
    }

    let mut links = Vec::new();
    let mut position = 0;
    for entry in entries {
        match entry {
            Entry::Item(item) => {
                if let Err(err) = model.attach_item(container, item, None) {
                    tracing::warn!("cannot attach item: {}", err);
                    continue;
                }
            }
            Entry::Link(command) => match read_link(command, &refs) {
                Some(link) => links.push((position, link)),
                None => {
                    tracing::warn!(
                        "dropping link {:?} -> {:?}: endpoint not found",
                        command.ident_at(&[1]).unwrap_or_default(),
                        command.ident_at(&[2]).unwrap_or_default()
                    );
                    continue;
                }
            },
        }
        position += 1;
    }

    // Endpoints are all attached now, so links can go back to their places.
    for (position, link) in links {
        if let Err(err) = model.attach_item(container, link, Some(position)) {
            tracing::warn!("cannot attach link: {}", err);
        }
    }
}

fn read_link(command: &TennNode, refs: &HashMap<(String, usize), ItemId>) -> Option<DiagramItem> {
    let mut indices = LinkIndices::default();
    let mut data = DiagramItem::new("");
    for (name, child) in block_commands(command, 3) {
        mapping::read_link_command(&mut data, name, child, &mut indices);
    }

    let endpoint = |arg: usize, index: usize| {
        let name = command.ident_at(&[arg])?.to_string();
        refs.get(&(name, index)).copied()
    };
    let source = endpoint(1, indices.source.unwrap_or(0))?;
    let target = endpoint(2, indices.target.unwrap_or(0))?;

    let mut link = DiagramItem::link(source, target).at(data.x, data.y);
    link.name = data.name;
    link.description = data.description;
    link.properties = data.properties;
    Some(link)
}
