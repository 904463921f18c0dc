//! Conversion between entities and their property fragments.
//!
//! `to_tenn_as_props` renders the editable attributes of an entity as a
//! `Statements` list of commands; `from_tenn_props` resets the entity and
//! reads such a list back, dispatching each command to a known attribute or
//! into the generic property bag. Identity is never part of a fragment.

use crate::model::{DiagramItem, Element, ItemKind};
use tenniarb_parser::{NodeKind, TennNode};

pub(crate) mod keys {
    pub const ITEM: &str = "item";
    pub const LINK: &str = "link";
    pub const ELEMENT: &str = "element";
    pub const MODEL: &str = "model";
    pub const NAME: &str = "name";
    pub const DESCRIPTION: &str = "description";
    /// Spelling used by older documents
    pub const LEGACY_DESCRIPTION: &str = "desription";
    pub const LABEL: &str = "label";
    pub const POS: &str = "pos";
    pub const SOURCE_INDEX: &str = "source-index";
    pub const TARGET_INDEX: &str = "target-index";
}

pub(crate) fn is_description(name: &str) -> bool {
    name == keys::DESCRIPTION || name == keys::LEGACY_DESCRIPTION
}

fn string_command(name: &str, value: &str) -> TennNode {
    TennNode::command(name, [TennNode::string(value)])
}

fn pos_command(x: f64, y: f64) -> TennNode {
    TennNode::command(keys::POS, [TennNode::float(x), TennNode::float(y)])
}

/// `pos x y` with exactly two numeric arguments
fn parse_pos(command: &TennNode) -> Option<(f64, f64)> {
    if command.len() != 3 {
        return None;
    }
    Some((command.float_at(&[1])?, command.float_at(&[2])?))
}

/// Position (always when `add_pos`, otherwise only when non-zero) and
/// properties of a node item
pub(crate) fn write_item_data(item: &DiagramItem, out: &mut TennNode, add_pos: bool) {
    if !item.description.is_empty() {
        out.add(string_command(keys::DESCRIPTION, &item.description));
    }
    if add_pos || item.x != 0.0 || item.y != 0.0 {
        out.add(pos_command(item.x, item.y));
    }
    out.extend(item.properties.iter().cloned());
}

/// Description, label, position and properties of a link
pub(crate) fn write_link_data(item: &DiagramItem, out: &mut TennNode, add_pos: bool) {
    if !item.description.is_empty() {
        out.add(string_command(keys::DESCRIPTION, &item.description));
    }
    if !item.name.is_empty() {
        out.add(string_command(keys::LABEL, &item.name));
    }
    if add_pos || item.x != 0.0 || item.y != 0.0 {
        out.add(pos_command(item.x, item.y));
    }
    out.extend(item.properties.iter().cloned());
}

pub(crate) fn read_item_command(item: &mut DiagramItem, name: &str, command: &TennNode) {
    match name {
        keys::POS => match parse_pos(command) {
            Some((x, y)) => {
                item.x = x;
                item.y = y;
            }
            None => item.properties.append(command.clone()),
        },
        _ if is_description(name) => {
            item.description = command.ident_at(&[1]).unwrap_or_default().to_string();
        }
        _ => item.properties.append(command.clone()),
    }
}

/// Endpoint occurrence indices found while reading a link block. The first
/// command for each endpoint is the index; repeats are ordinary properties.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct LinkIndices {
    pub source: Option<usize>,
    pub target: Option<usize>,
}

pub(crate) fn read_link_command(
    link: &mut DiagramItem,
    name: &str,
    command: &TennNode,
    indices: &mut LinkIndices,
) {
    let slot = match name {
        keys::SOURCE_INDEX => &mut indices.source,
        keys::TARGET_INDEX => &mut indices.target,
        _ => return read_link_data_command(link, name, command),
    };
    let index = command
        .int_at(&[1])
        .and_then(|i| usize::try_from(i).ok());
    match index {
        Some(i) if slot.is_none() => *slot = Some(i),
        _ => link.properties.append(command.clone()),
    }
}

/// Label and item attributes. Endpoint indices only mean something inside a
/// whole document, so here they stay in the property bag.
fn read_link_data_command(link: &mut DiagramItem, name: &str, command: &TennNode) {
    match name {
        keys::LABEL => link.name = command.ident_at(&[1]).unwrap_or_default().to_string(),
        _ => read_item_command(link, name, command),
    }
}

impl Element {
    /// `name`, description and properties
    pub fn to_tenn_as_props(&self) -> TennNode {
        let mut out = TennNode::new(NodeKind::Statements, None);
        out.add(string_command(keys::NAME, &self.name));
        if !self.description.is_empty() {
            out.add(string_command(keys::DESCRIPTION, &self.description));
        }
        out.extend(self.properties.iter().cloned());
        out
    }

    /// Replace description and properties, and the name when one is given.
    /// Structural commands (`item`, `link`, `element`) are not properties and
    /// are skipped.
    pub fn from_tenn_props(&mut self, node: &TennNode) {
        self.properties.clear();
        self.description.clear();
        for (name, command) in node.commands() {
            match name {
                keys::NAME => {
                    if let Some(value) = command.ident_at(&[1]) {
                        self.name = value.to_string();
                    }
                }
                _ if is_description(name) => {
                    self.description = command.ident_at(&[1]).unwrap_or_default().to_string();
                }
                keys::ITEM | keys::LINK | keys::ELEMENT => {
                    tracing::warn!(
                        "ignoring structural command '{}' in properties of element '{}'",
                        name,
                        self.name
                    );
                }
                _ => self.properties.append(command.clone()),
            }
        }
    }
}

impl DiagramItem {
    pub fn to_tenn_as_props(&self) -> TennNode {
        let mut out = TennNode::new(NodeKind::Statements, None);
        match self.kind() {
            ItemKind::Item => {
                if !self.name.is_empty() {
                    out.add(string_command(keys::NAME, &self.name));
                }
                write_item_data(self, &mut out, true);
            }
            ItemKind::Link { .. } => write_link_data(self, &mut out, true),
        }
        out
    }

    /// Reset position, description and properties, then read `node`. A node
    /// keeps its name unless `name` is given; a link's label is always reset.
    pub fn from_tenn_props(&mut self, node: &TennNode) {
        self.properties.clear();
        self.description.clear();
        self.x = 0.0;
        self.y = 0.0;
        match self.kind() {
            ItemKind::Item => {
                for (name, command) in node.commands() {
                    if name == keys::NAME {
                        if let Some(value) = command.ident_at(&[1]) {
                            self.name = value.to_string();
                        }
                    } else {
                        read_item_command(self, name, command);
                    }
                }
            }
            ItemKind::Link { .. } => {
                self.name.clear();
                for (name, command) in node.commands() {
                    read_link_data_command(self, name, command);
                }
            }
        }
    }
}
