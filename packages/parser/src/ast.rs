//! Tenn syntax tree.
//!
//! Every node is a [`TennNode`]: a kind, an optional source token carrying the
//! literal text, and an ordered child list. A `Command` holds its name and its
//! arguments as children; `Statements` and `BlockExpr` hold commands.
//!
//! `BlockExpr` nodes additionally keep a name index over their children so
//! properties stored in a block can be found by command name. The index maps
//! the text of each child's first element to the position of the most
//! recently added child with that name, and is kept in sync by every method
//! that changes the child list.

use crate::token::{Token, TokenKind};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Empty,
    Ident,
    CharLit,
    IntLit,
    FloatLit,
    StringLit,
    MarkdownLit,
    Command,
    Statements,
    BlockExpr,
    Expression,
    ExpressionBlock,
    Image,
}

impl NodeKind {
    /// Kinds whose token literal is a usable value
    pub fn is_literal(self) -> bool {
        matches!(
            self,
            NodeKind::Ident
                | NodeKind::StringLit
                | NodeKind::IntLit
                | NodeKind::FloatLit
                | NodeKind::CharLit
                | NodeKind::ExpressionBlock
                | NodeKind::Expression
                | NodeKind::MarkdownLit
                | NodeKind::Image
        )
    }
}

#[derive(Debug, Clone)]
pub struct TennNode {
    kind: NodeKind,
    token: Option<Token>,
    children: Vec<TennNode>,
    named: HashMap<String, usize>,
}

impl TennNode {
    pub fn new(kind: NodeKind, token: Option<Token>) -> Self {
        Self {
            kind,
            token,
            children: Vec::new(),
            named: HashMap::new(),
        }
    }

    fn literal(kind: NodeKind, token_kind: TokenKind, literal: impl Into<String>) -> Self {
        Self::new(kind, Some(Token::new(token_kind, literal)))
    }

    pub fn ident(name: impl Into<String>) -> Self {
        Self::literal(NodeKind::Ident, TokenKind::Symbol, name)
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::literal(NodeKind::StringLit, TokenKind::StringLit, value)
    }

    pub fn markdown(value: impl Into<String>) -> Self {
        Self::literal(NodeKind::MarkdownLit, TokenKind::MarkdownLit, value)
    }

    pub fn image(base64: impl Into<String>) -> Self {
        Self::literal(NodeKind::Image, TokenKind::ImageData, base64)
    }

    pub fn expression(source: impl Into<String>) -> Self {
        Self::literal(NodeKind::Expression, TokenKind::Expression, source)
    }

    pub fn expression_block(source: impl Into<String>) -> Self {
        Self::literal(NodeKind::ExpressionBlock, TokenKind::ExpressionBlock, source)
    }

    pub fn int(value: i64) -> Self {
        Self::literal(NodeKind::IntLit, TokenKind::IntLit, value.to_string())
    }

    /// Whole values keep a `.0` suffix so they read back as floats
    pub fn float(value: f64) -> Self {
        let mut text = value.to_string();
        if value.is_finite() && !text.contains('.') {
            text.push_str(".0");
        }
        Self::literal(NodeKind::FloatLit, TokenKind::FloatLit, text)
    }

    pub fn command(name: impl Into<String>, args: impl IntoIterator<Item = TennNode>) -> Self {
        let mut node = Self::new(NodeKind::Command, None);
        node.add(Self::ident(name));
        node.extend(args);
        node
    }

    pub fn block(children: impl IntoIterator<Item = TennNode>) -> Self {
        let mut node = Self::new(NodeKind::BlockExpr, None);
        node.extend(children);
        node
    }

    pub fn statements(children: impl IntoIterator<Item = TennNode>) -> Self {
        let mut node = Self::new(NodeKind::Statements, None);
        node.extend(children);
        node
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn token(&self) -> Option<&Token> {
        self.token.as_ref()
    }

    pub fn children(&self) -> &[TennNode] {
        &self.children
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn add(&mut self, node: TennNode) {
        if self.kind == NodeKind::BlockExpr {
            if let Some(name) = node.ident_at(&[0]) {
                self.named.insert(name.to_string(), self.children.len());
            }
        }
        self.children.push(node);
    }

    pub fn extend(&mut self, nodes: impl IntoIterator<Item = TennNode>) {
        for node in nodes {
            self.add(node);
        }
    }

    /// Named child of a block, the most recently added one on duplicates
    pub fn get_named(&self, name: &str) -> Option<&TennNode> {
        if self.kind != NodeKind::BlockExpr {
            return None;
        }
        self.named.get(name).map(|&index| &self.children[index])
    }

    /// Remove every child named `name`. Returns whether anything was removed.
    pub fn remove_named(&mut self, name: &str) -> bool {
        let before = self.children.len();
        self.children.retain(|c| c.ident_at(&[0]) != Some(name));
        let removed = before != self.children.len();
        if removed {
            self.rebuild_index();
        }
        removed
    }

    /// Replace the named child in place, dropping older duplicates, or
    /// append it when the name is absent.
    pub fn set_named(&mut self, node: TennNode) {
        let name = node.ident_at(&[0]).map(str::to_string);
        let index = name.as_deref().and_then(|n| self.named.get(n).copied());
        match (name, index) {
            (Some(name), Some(index)) => {
                self.children[index] = node;
                let mut position = 0;
                self.children.retain(|c| {
                    let keep = position == index || c.ident_at(&[0]) != Some(name.as_str());
                    position += 1;
                    keep
                });
                self.rebuild_index();
            }
            _ => self.add(node),
        }
    }

    pub fn remove_child(&mut self, index: usize) -> Option<TennNode> {
        if index >= self.children.len() {
            return None;
        }
        let node = self.children.remove(index);
        self.rebuild_index();
        Some(node)
    }

    pub fn clear(&mut self) {
        self.children.clear();
        self.named.clear();
    }

    /// Replace all children with deep copies of `other`'s children
    pub fn replace(&mut self, other: &TennNode) {
        self.clear();
        self.extend(other.children.iter().cloned());
    }

    fn rebuild_index(&mut self) {
        self.named.clear();
        if self.kind != NodeKind::BlockExpr {
            return;
        }
        for (index, child) in self.children.iter().enumerate() {
            if let Some(name) = child.ident_at(&[0]) {
                self.named.insert(name.to_string(), index);
            }
        }
    }

    /// Consume the node, returning its children
    pub fn into_children(self) -> Vec<TennNode> {
        self.children
    }

    pub fn traverse<F: FnMut(&TennNode)>(&self, visitor: &mut F) {
        visitor(self);
        for child in &self.children {
            child.traverse(visitor);
        }
    }

    pub fn child(&self, path: &[usize]) -> Option<&TennNode> {
        let mut node = self;
        for &index in path {
            node = node.children.get(index)?;
        }
        Some(node)
    }

    pub fn ident_text(&self) -> Option<&str> {
        if self.kind.is_literal() {
            self.token.as_ref().map(|t| t.literal.as_str())
        } else {
            None
        }
    }

    pub fn ident_at(&self, path: &[usize]) -> Option<&str> {
        self.child(path)?.ident_text()
    }

    pub fn int_at(&self, path: &[usize]) -> Option<i64> {
        self.ident_at(path)?.trim().parse().ok()
    }

    pub fn float_at(&self, path: &[usize]) -> Option<f64> {
        self.ident_at(path)?.trim().parse().ok()
    }

    /// A command whose first child is an identifier
    pub fn is_named_element(&self) -> bool {
        self.kind == NodeKind::Command
            && self.children.first().map(|c| c.kind) == Some(NodeKind::Ident)
    }

    /// Children of the child at `index`, empty when absent
    pub fn block_children(&self, index: usize) -> &[TennNode] {
        self.children
            .get(index)
            .map(|c| c.children.as_slice())
            .unwrap_or(&[])
    }

    /// `(name, command)` pairs of a block or statement list
    pub fn commands(&self) -> impl Iterator<Item = (&str, &TennNode)> {
        let container = matches!(self.kind, NodeKind::Statements | NodeKind::BlockExpr);
        self.children
            .iter()
            .filter(move |_| container)
            .filter(|c| c.is_named_element())
            .filter_map(|c| c.ident_at(&[0]).map(|name| (name, c)))
    }

    pub fn value_str(&self, name: &str) -> Option<&str> {
        let command = self.get_named(name)?;
        if command.len() > 1 {
            command.ident_at(&[1]).map(str::trim)
        } else {
            None
        }
    }

    pub fn value_string(&self, name: &str, default: &str) -> String {
        self.value_str(name).unwrap_or(default).to_string()
    }

    pub fn value_int(&self, name: &str, default: i64) -> i64 {
        self.value_str(name)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    pub fn value_bool(&self, name: &str, default: bool) -> bool {
        self.value_str(name)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }
}

/// Structural equality: kinds, literal text of literal nodes and children.
/// Source positions and the tokens of container nodes are ignored.
impl PartialEq for TennNode {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.ident_text() == other.ident_text()
            && self.children == other.children
    }
}

impl fmt::Display for TennNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_str(0, false))
    }
}
