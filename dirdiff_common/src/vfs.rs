use crate::VfsError;
use std::ffi::OsString;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// One child of a listed directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VfsEntry {
    pub path: PathBuf,
    pub name: OsString,
    pub is_dir: bool,
    pub size: u64,
    pub modified: Option<SystemTime>,
}

/// Metadata for a file or directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileMetadata {
    pub size: u64,
    pub modified: Option<SystemTime>,
    pub is_dir: bool,
}

/// Virtual File System trait for abstracting filesystem operations
///
/// Both the tree reader and the content comparison go through this trait,
/// so a comparison never touches `std::fs` directly.
pub trait Vfs: Send + Sync {
    /// Uniquely identifies the VFS instance (e.g., "local")
    fn instance_id(&self) -> &str;

    /// Returns the metadata for a specific path
    fn metadata(&self, path: &Path) -> Result<FileMetadata, VfsError>;

    /// Lists the immediate children of a directory, in listing order
    fn read_dir(&self, path: &Path) -> Result<Vec<VfsEntry>, VfsError>;

    /// Opens a file for reading
    fn open_file(&self, path: &Path) -> Result<Box<dyn Read + Send>, VfsError>;

    /// Checks if a path exists
    fn exists(&self, path: &Path) -> bool {
        self.metadata(path).is_ok()
    }
}
