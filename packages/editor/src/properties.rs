use tenniarb_parser::{NodeKind, TennNode};

/// Property bag of an element or item.
///
/// Stored as a `BlockExpr`, so lookups by command name go through the block's
/// name index and the bag prints and parses back without loss.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelProperties {
    node: TennNode,
}

impl Default for ModelProperties {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelProperties {
    pub fn new() -> Self {
        Self {
            node: TennNode::block([]),
        }
    }

    pub fn from_nodes(nodes: impl IntoIterator<Item = TennNode>) -> Self {
        Self {
            node: TennNode::block(nodes),
        }
    }

    /// Command named `name`, the last one when the name repeats
    pub fn get(&self, name: &str) -> Option<&TennNode> {
        self.node.get_named(name)
    }

    /// Replace the command with the same name, or append it
    pub fn set(&mut self, command: TennNode) {
        self.node.set_named(command);
    }

    pub fn append(&mut self, node: TennNode) {
        self.node.add(node);
    }

    pub fn remove(&mut self, name: &str) -> bool {
        self.node.remove_named(name)
    }

    pub fn clear(&mut self) {
        self.node.clear();
    }

    pub fn len(&self) -> usize {
        self.node.len()
    }

    pub fn is_empty(&self) -> bool {
        self.node.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TennNode> {
        self.node.children().iter()
    }

    pub fn as_node(&self) -> &TennNode {
        &self.node
    }

    pub fn value_string(&self, name: &str, default: &str) -> String {
        self.node.value_string(name, default)
    }

    pub fn value_int(&self, name: &str, default: i64) -> i64 {
        self.node.value_int(name, default)
    }

    pub fn value_bool(&self, name: &str, default: bool) -> bool {
        self.node.value_bool(name, default)
    }
}

impl From<TennNode> for ModelProperties {
    fn from(node: TennNode) -> Self {
        match node.kind() {
            NodeKind::BlockExpr => Self { node },
            NodeKind::Statements => Self::from_nodes(node.into_children()),
            _ => Self::from_nodes([node]),
        }
    }
}

impl<'a> IntoIterator for &'a ModelProperties {
    type Item = &'a TennNode;
    type IntoIter = std::slice::Iter<'a, TennNode>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tenniarb_parser::parse;

    #[test]
    fn test_get_set_remove() {
        let mut props = ModelProperties::new();
        props.set(TennNode::command("color", [TennNode::ident("red")]));
        props.set(TennNode::command("width", [TennNode::int(2)]));
        props.set(TennNode::command("color", [TennNode::ident("blue")]));

        assert_eq!(props.len(), 2);
        assert_eq!(props.value_string("color", ""), "blue");
        assert_eq!(props.value_int("width", 0), 2);

        assert!(props.remove("color"));
        assert!(props.get("color").is_none());
    }

    #[test]
    fn test_from_statements() {
        let node = parse("color red\nshadow true").unwrap();
        let props = ModelProperties::from(node);
        assert_eq!(props.as_node().kind(), NodeKind::BlockExpr);
        assert!(props.value_bool("shadow", false));
    }

    #[test]
    fn test_round_trips_through_text() {
        let props = ModelProperties::from_nodes([
            TennNode::command("title", [TennNode::string("A \"quoted\" title")]),
            TennNode::command("script", [TennNode::expression_block(" x + 1 ")]),
        ]);
        let text = TennNode::command("props", [props.as_node().clone()]).to_string();
        let parsed = parse(&text).unwrap();
        let block = parsed.children()[0].children()[1].clone();
        assert_eq!(ModelProperties::from(block), props);
    }
}
