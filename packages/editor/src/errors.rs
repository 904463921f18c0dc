//! Error types for the editor

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Parse error: {0}")]
    Parse(#[from] tenniarb_parser::ParseErrors),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Operation error: {0}")]
    Operation(#[from] crate::operations::OperationError),

    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("Document is not file-backed")]
    NotFileBacked,
}
