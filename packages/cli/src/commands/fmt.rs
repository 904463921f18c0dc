use super::find_tn_files;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};
use tenniarb_parser::{format_errors, ParseErrors, Parser};

#[derive(Args, Debug)]
pub struct FmtArgs {
    /// Input .tn file or directory (defaults to the configured source directory)
    pub input: Option<PathBuf>,

    /// Only report files that are not formatted
    #[arg(long)]
    pub check: bool,

    /// Print to stdout with string literals unquoted. Files are left
    /// untouched since the output does not read back to the same document.
    #[arg(long, conflicts_with = "check")]
    pub clean: bool,
}

#[derive(Debug, PartialEq, Eq)]
enum FileStatus {
    Unchanged,
    Reformatted,
    Printed,
    Failed,
}

/// Canonical text of `source`, or the parse errors that prevent formatting
pub fn format_source(source: &str, clean: bool) -> Result<String, ParseErrors> {
    let mut parser = Parser::new();
    let node = parser.parse(source);
    if parser.has_errors() {
        return Err(parser.take_errors());
    }
    let mut printed = node.to_str(0, clean);
    if !printed.is_empty() {
        printed.push('\n');
    }
    Ok(printed)
}

pub fn fmt(args: FmtArgs, src_dir: &Path) -> Result<()> {
    let input = args.input.clone().unwrap_or_else(|| src_dir.to_path_buf());
    let files = find_tn_files(&input)?;

    let mut reformatted = 0;
    let mut failed = 0;
    for file in &files {
        match fmt_file(file, &args)? {
            FileStatus::Unchanged | FileStatus::Printed => {}
            FileStatus::Reformatted => reformatted += 1,
            FileStatus::Failed => failed += 1,
        }
    }

    if args.clean {
        if failed > 0 {
            std::process::exit(1);
        }
        return Ok(());
    }

    let verb = if args.check { "would reformat" } else { "reformatted" };
    println!(
        "{} {} of {} files {}",
        if failed > 0 { "✗".red() } else { "✓".green() },
        reformatted,
        files.len(),
        verb
    );
    if failed > 0 {
        println!("   {} {} files with parse errors", "Skipped:".red(), failed);
    }

    if failed > 0 || (args.check && reformatted > 0) {
        std::process::exit(1);
    }
    Ok(())
}

fn fmt_file(file: &Path, args: &FmtArgs) -> Result<FileStatus> {
    let source = fs::read_to_string(file)?;
    let formatted = match format_source(&source, args.clean) {
        Ok(formatted) => formatted,
        Err(errors) => {
            eprintln!("{} {}", "✗".red(), file.display());
            eprint!("{}", format_errors(&source, &file.to_string_lossy(), &errors));
            return Ok(FileStatus::Failed);
        }
    };

    if args.clean {
        print!("{}", formatted);
        return Ok(FileStatus::Printed);
    }

    if formatted == source {
        tracing::debug!(file = %file.display(), "already formatted");
        return Ok(FileStatus::Unchanged);
    }

    if args.check {
        println!("{} {}", "would reformat".yellow(), file.display());
    } else {
        fs::write(file, &formatted)?;
        println!("{} {}", "reformatted".green(), file.display());
    }
    Ok(FileStatus::Reformatted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tenniarb_parser::{parse, ErrorCode};

    #[test]
    fn test_format_source_is_canonical() {
        let source = "element \"A\" {   item  \"x\" ;  item \"y\" {pos 1 2}\n}";
        let formatted = format_source(source, false).unwrap();
        assert_eq!(
            formatted,
            "element \"A\" {\n    item \"x\"\n    item \"y\" {\n        pos 1 2\n    }\n}\n"
        );
        assert_eq!(format_source(&formatted, false).unwrap(), formatted);
    }

    #[test]
    fn test_format_empty_source() {
        assert_eq!(format_source("", false).unwrap(), "");
    }

    #[test]
    fn test_format_refuses_parse_errors() {
        let errors = format_source("name \"abc", false).unwrap_err();
        assert!(errors.has_code(ErrorCode::EndOfFileDuringStringRead));
    }

    #[test]
    fn test_fmt_file_rewrites_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.tn");
        fs::write(&path, "item \"x\"   {pos 1 2}").unwrap();
        let args = FmtArgs {
            input: None,
            check: false,
            clean: false,
        };

        assert_eq!(fmt_file(&path, &args).unwrap(), FileStatus::Reformatted);
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "item \"x\" {\n    pos 1 2\n}\n"
        );
        assert_eq!(fmt_file(&path, &args).unwrap(), FileStatus::Unchanged);
    }

    #[test]
    fn test_fmt_file_rewrite_reads_back_to_same_tree() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.tn");
        let source = "name \"a b\"\nlabel 'x {' + \"y\"\nitem \"A\" {pos 1 2}";
        fs::write(&path, source).unwrap();
        let args = FmtArgs {
            input: None,
            check: false,
            clean: false,
        };

        assert_eq!(fmt_file(&path, &args).unwrap(), FileStatus::Reformatted);
        let rewritten = fs::read_to_string(&path).unwrap();
        assert_eq!(parse(&rewritten).unwrap(), parse(source).unwrap());
    }

    #[test]
    fn test_fmt_file_clean_leaves_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.tn");
        let source = "name \"a b\"\nlabel \"x {\"";
        fs::write(&path, source).unwrap();
        let args = FmtArgs {
            input: None,
            check: false,
            clean: true,
        };

        assert_eq!(fmt_file(&path, &args).unwrap(), FileStatus::Printed);
        assert_eq!(fs::read_to_string(&path).unwrap(), source);
    }

    #[test]
    fn test_clean_conflicts_with_check() {
        use clap::Parser as _;

        #[derive(clap::Parser)]
        struct Wrapper {
            #[command(flatten)]
            args: FmtArgs,
        }

        assert!(Wrapper::try_parse_from(["fmt", "--clean", "--check"]).is_err());
        assert!(Wrapper::try_parse_from(["fmt", "--clean"]).is_ok());
    }

    #[test]
    fn test_fmt_file_check_does_not_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.tn");
        fs::write(&path, "a   b").unwrap();
        let args = FmtArgs {
            input: None,
            check: true,
            clean: false,
        };

        assert_eq!(fmt_file(&path, &args).unwrap(), FileStatus::Reformatted);
        assert_eq!(fs::read_to_string(&path).unwrap(), "a   b");
    }
}
