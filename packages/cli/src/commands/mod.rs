pub mod check;
pub mod fmt;
pub mod tree;

pub use check::{check, CheckArgs};
pub use fmt::{fmt, FmtArgs};
pub use tree::{tree, TreeArgs};

use anyhow::Result;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const EXTENSION: &str = "tn";

/// The file itself, or every .tn file below a directory
pub fn find_tn_files(input: &Path) -> Result<Vec<PathBuf>> {
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }
    if !input.is_dir() {
        return Err(anyhow::anyhow!("Input path does not exist: {}", input.display()));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(input)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if path.is_file() && path.extension().is_some_and(|e| e == EXTENSION) {
            files.push(path.to_path_buf());
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_tn_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("b.tn"), "").unwrap();
        std::fs::write(dir.path().join("nested/a.tn"), "").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "").unwrap();

        let files = find_tn_files(dir.path()).unwrap();
        assert_eq!(
            files,
            vec![dir.path().join("b.tn"), dir.path().join("nested/a.tn")]
        );
        assert_eq!(find_tn_files(&files[0]).unwrap(), vec![files[0].clone()]);
        assert!(find_tn_files(&dir.path().join("missing")).is_err());
    }
}
