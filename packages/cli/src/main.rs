mod commands;
mod config;

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{check, fmt, tree, CheckArgs, FmtArgs, TreeArgs};
use config::Config;
use tracing_subscriber::EnvFilter;

/// Tenniarb CLI - format, check and inspect Tenn diagram documents
#[derive(Parser, Debug)]
#[command(name = "tenniarb")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log debug output (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rewrite .tn files in canonical form
    Fmt(FmtArgs),

    /// Report parse errors in .tn files
    Check(CheckArgs),

    /// Print the element/item/link outline of a document
    Tree(TreeArgs),
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir().context("Cannot get current directory")?;
    let config = Config::load(&cwd)?;
    let src_dir = config.get_src_dir(&cwd);

    match cli.command {
        Command::Fmt(args) => fmt(args, &src_dir),
        Command::Check(args) => check(args, &src_dir),
        Command::Tree(args) => tree(args, config.tool_editor_config()),
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(err) = run(cli) {
        eprintln!();
        eprintln!("{} {:#}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
