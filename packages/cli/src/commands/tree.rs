use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::fmt::{self, Write};
use std::path::PathBuf;
use tenniarb_editor::{Document, EditorConfig, ElementId, ItemKind, Model};

#[derive(Args, Debug)]
pub struct TreeArgs {
    /// Input .tn file
    pub input: PathBuf,
}

pub fn tree(args: TreeArgs, config: EditorConfig) -> Result<()> {
    let doc = Document::load_with_config(&args.input, config)?;
    print!("{}", render_tree(doc.store().model())?);
    Ok(())
}

/// Indented outline of elements, items and links
pub fn render_tree(model: &Model) -> Result<String, fmt::Error> {
    let mut out = String::new();
    for element in model.children(model.root()) {
        render_element(model, element.id(), 0, &mut out)?;
    }
    Ok(out)
}

fn render_element(model: &Model, id: ElementId, depth: usize, out: &mut String) -> fmt::Result {
    let Some(element) = model.element(id) else {
        return Ok(());
    };
    let pad = "  ".repeat(depth);
    writeln!(out, "{}{} {}", pad, "element".blue().bold(), element.name)?;

    for item in model.items_of(id) {
        match item.kind() {
            ItemKind::Item => {
                writeln!(
                    out,
                    "{}  {} {} ({}, {})",
                    pad,
                    "item".green(),
                    item.name,
                    item.x,
                    item.y
                )?;
            }
            ItemKind::Link { source, target } => {
                let name = |id| model.item(id).map(|i| i.name.as_str()).unwrap_or("?");
                let label = if item.name.is_empty() {
                    String::new()
                } else {
                    format!(" [{}]", item.name)
                };
                writeln!(
                    out,
                    "{}  {} {} -> {}{}",
                    pad,
                    "link".yellow(),
                    name(source),
                    name(target),
                    label
                )?;
            }
        }
    }

    for &child in element.elements() {
        render_element(model, child, depth + 1, out)?;
    }
    Ok(())
}
