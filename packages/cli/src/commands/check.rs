use super::find_tn_files;
use anyhow::Result;
use clap::{Args, ValueEnum};
use colored::Colorize;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tenniarb_parser::{format_errors, ParseError, Parser};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Input .tn file or directory (defaults to the configured source directory)
    pub input: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

/// Diagnostics of one file
#[derive(Debug, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    pub errors: Vec<ParseError>,
}

pub fn check_file(path: &Path) -> Result<(FileReport, String)> {
    let bytes = fs::read(path)?;
    let source = String::from_utf8_lossy(&bytes).into_owned();
    let mut parser = Parser::new();
    parser.parse_bytes(&bytes);
    let errors = parser.take_errors().errors;
    Ok((
        FileReport {
            path: path.to_path_buf(),
            errors,
        },
        source,
    ))
}

pub fn check(args: CheckArgs, src_dir: &Path) -> Result<()> {
    let input = args.input.clone().unwrap_or_else(|| src_dir.to_path_buf());
    let files = find_tn_files(&input)?;

    let mut reports = Vec::new();
    for file in &files {
        let (report, source) = check_file(file)?;
        if args.format == OutputFormat::Text {
            print_text(&report, &source);
        }
        reports.push(report);
    }

    let total_errors: usize = reports.iter().map(|r| r.errors.len()).sum();

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&reports)?),
        OutputFormat::Text => {
            println!();
            println!(
                "✨ {} Check complete!",
                if total_errors > 0 {
                    "Done".red().bold()
                } else {
                    "Done".green().bold()
                }
            );
            println!("   Files checked: {}", files.len());
            if total_errors > 0 {
                println!("   {} {}", "Errors:".red(), total_errors);
            } else {
                println!("   {} No issues found!", "✓".green());
            }
        }
    }

    if total_errors > 0 {
        std::process::exit(1);
    }
    Ok(())
}

fn print_text(report: &FileReport, source: &str) {
    if report.errors.is_empty() {
        println!("{} {}", "✓".green(), report.path.display());
        return;
    }
    println!("{} {}", "✗".red(), report.path.display());
    let errors = tenniarb_parser::ParseErrors {
        errors: report.errors.clone(),
    };
    eprint!("{}", format_errors(source, &report.path.to_string_lossy(), &errors));
}
