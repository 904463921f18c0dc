//! Renders a [`TennNode`] back to Tenn source.
//!
//! Output is deterministic: commands sit on their own lines, arguments are
//! separated by single spaces, and block contents are indented by four spaces
//! per level. Comments and original whitespace are not preserved.

use crate::ast::{NodeKind, TennNode};

const INDENT: &str = "    ";

impl TennNode {
    /// Print at the given indent level. With `clean` set, string literals are
    /// written bare, without quotes or escapes.
    pub fn to_str(&self, indent: usize, clean: bool) -> String {
        let mut printer = Printer {
            out: String::new(),
            clean,
            last: Last::Other,
        };
        printer.write(self, indent);
        printer.out
    }
}

/// Tail of the output as the lexer's string concatenation sees it
#[derive(Clone, Copy)]
enum Last {
    Other,
    Str(char),
    StrPlus(char),
}

struct Printer {
    out: String,
    clean: bool,
    last: Last,
}

impl Printer {
    fn write(&mut self, node: &TennNode, indent: usize) {
        if node.kind() == NodeKind::Command {
            push_indent(&mut self.out, indent);
        }

        if let Some(token) = node.token() {
            let text = token.literal.as_str();
            match node.kind() {
                NodeKind::Ident => {
                    self.out.push_str(text);
                    self.last = match self.last {
                        Last::Str(quote) if text == "+" => Last::StrPlus(quote),
                        _ => Last::Other,
                    };
                }
                NodeKind::CharLit | NodeKind::IntLit | NodeKind::FloatLit => {
                    self.emit(text)
                }
                NodeKind::StringLit if self.clean => self.emit(text),
                NodeKind::StringLit => self.string(text),
                NodeKind::Expression => self.wrap("$(", text, ")"),
                NodeKind::ExpressionBlock => self.wrap("${", text, "}"),
                NodeKind::MarkdownLit => self.wrap("%{", text, "}"),
                NodeKind::Image => self.wrap("@(", text, ")"),
                _ => {}
            }
        }

        let mut child_indent = indent;
        if node.kind() == NodeKind::BlockExpr {
            self.emit("{\n");
            child_indent += 1;
        }

        let line_per_child = matches!(node.kind(), NodeKind::BlockExpr | NodeKind::Statements);
        for (i, child) in node.children().iter().enumerate() {
            if i > 0 {
                self.out.push(if line_per_child { '\n' } else { ' ' });
            }
            self.write(child, child_indent);
        }

        if node.kind() == NodeKind::BlockExpr {
            if !node.is_empty() {
                self.out.push('\n');
            }
            push_indent(&mut self.out, indent);
            self.emit("}");
        }
    }

    fn emit(&mut self, text: &str) {
        self.out.push_str(text);
        self.last = Last::Other;
    }

    /// A string right after `"..." +` takes the other quote, so reading the
    /// output back does not concatenate the two literals.
    fn string(&mut self, text: &str) {
        let quote = match self.last {
            Last::StrPlus('"') => '\'',
            _ => '"',
        };
        let mut escaped = String::with_capacity(text.len());
        for c in text.chars() {
            if c == quote {
                escaped.push('\\');
            }
            escaped.push(c);
        }
        self.out.push(quote);
        self.out.push_str(&escaped);
        self.out.push(quote);
        self.last = Last::Str(quote);
    }

    fn wrap(&mut self, open: &str, text: &str, close: &str) {
        self.out.push_str(open);
        self.out.push_str(text);
        self.out.push_str(close);
        self.last = Last::Other;
    }
}

fn push_indent(out: &mut String, level: usize) {
    for _ in 0..level {
        out.push_str(INDENT);
    }
}

/// Print a tree at indent zero with quoted strings
pub fn print(node: &TennNode) -> String {
    node.to_str(0, false)
}
