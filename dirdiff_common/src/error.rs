use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DirDiffError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A directory tree could not be read. Always fatal.
    #[error("Path error: {}: {reason}", .path.display())]
    Path { path: PathBuf, reason: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Comparison error: {0}")]
    Comparison(String),
}

impl DirDiffError {
    pub fn path(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        DirDiffError::Path {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DirDiffError>;

#[derive(Error, Debug)]
pub enum VfsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Path not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Not a directory: {0}")]
    NotADirectory(String),

    #[error("Not a file: {0}")]
    NotAFile(String),
}

impl VfsError {
    /// Path the backend failed on, when it reported one.
    pub fn path(&self) -> Option<&str> {
        match self {
            VfsError::Io(_) => None,
            VfsError::NotFound(path)
            | VfsError::PermissionDenied(path)
            | VfsError::NotADirectory(path)
            | VfsError::NotAFile(path) => Some(path),
        }
    }
}

/// One file of a same-size pair could not be read while comparing content.
///
/// Only the pair is affected; the engine turns this into a
/// `ComparisonError` record and keeps going.
#[derive(Error, Debug)]
#[error("Cannot compare {} with {}: {source}", .left.display(), .right.display())]
pub struct ContentReadError {
    pub left: PathBuf,
    pub right: PathBuf,
    #[source]
    pub source: VfsError,
}
