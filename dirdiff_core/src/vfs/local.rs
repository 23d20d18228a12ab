use dirdiff_common::{FileMetadata, Vfs, VfsEntry, VfsError};
use std::fs;
use std::io::{self, Read};
use std::path::Path;

/// Local filesystem VFS implementation
///
/// Metadata follows symbolic links, so a link to a directory is listed and
/// descended like the directory itself.
#[derive(Debug, Default)]
pub struct LocalVfs;

impl LocalVfs {
    pub fn new() -> Self {
        Self
    }
}

fn map_io(err: io::Error, path: &Path) -> VfsError {
    match err.kind() {
        io::ErrorKind::NotFound => VfsError::NotFound(path.display().to_string()),
        io::ErrorKind::PermissionDenied => VfsError::PermissionDenied(path.display().to_string()),
        _ => VfsError::Io(err),
    }
}

impl Vfs for LocalVfs {
    fn instance_id(&self) -> &str {
        "local"
    }

    fn metadata(&self, path: &Path) -> Result<FileMetadata, VfsError> {
        let meta = fs::metadata(path).map_err(|e| map_io(e, path))?;

        Ok(FileMetadata {
            size: meta.len(),
            modified: meta.modified().ok(),
            is_dir: meta.is_dir(),
        })
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<VfsEntry>, VfsError> {
        let meta = fs::metadata(path).map_err(|e| map_io(e, path))?;
        if !meta.is_dir() {
            return Err(VfsError::NotADirectory(path.display().to_string()));
        }

        let mut entries = Vec::new();
        for entry in fs::read_dir(path).map_err(|e| map_io(e, path))? {
            let entry = entry.map_err(|e| map_io(e, path))?;
            let entry_path = entry.path();
            let meta = fs::metadata(&entry_path).map_err(|e| map_io(e, &entry_path))?;

            entries.push(VfsEntry {
                name: entry.file_name(),
                path: entry_path,
                is_dir: meta.is_dir(),
                size: meta.len(),
                modified: meta.modified().ok(),
            });
        }

        Ok(entries)
    }

    fn open_file(&self, path: &Path) -> Result<Box<dyn Read + Send>, VfsError> {
        let meta = fs::metadata(path).map_err(|e| map_io(e, path))?;
        if meta.is_dir() {
            return Err(VfsError::NotAFile(path.display().to_string()));
        }

        let file = fs::File::open(path).map_err(|e| map_io(e, path))?;
        Ok(Box::new(file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_local_vfs_metadata() {
        let temp = TempDir::new().unwrap();
        let test_file = temp.path().join("test.txt");
        fs::write(&test_file, b"hello").unwrap();

        let vfs = LocalVfs::new();
        let meta = vfs.metadata(&test_file).unwrap();

        assert_eq!(meta.size, 5);
        assert!(!meta.is_dir);
        assert!(meta.modified.is_some());
        assert_eq!(vfs.instance_id(), "local");
    }

    #[test]
    fn test_local_vfs_read_dir() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("file1.txt"), b"a").unwrap();
        fs::write(temp.path().join("file2.txt"), b"bb").unwrap();
        fs::create_dir(temp.path().join("nested")).unwrap();

        let vfs = LocalVfs::new();
        let mut entries = vfs.read_dir(temp.path()).unwrap();
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].name, "file1.txt");
        assert_eq!(entries[0].path, temp.path().join("file1.txt"));
        assert!(!entries[0].is_dir);
        assert_eq!(entries[1].size, 2);
        assert!(entries[2].is_dir);
    }

    #[test]
    fn test_local_vfs_read_dir_missing() {
        let temp = TempDir::new().unwrap();
        let vfs = LocalVfs::new();

        let err = vfs.read_dir(&temp.path().join("absent")).unwrap_err();
        assert!(matches!(err, VfsError::NotFound(_)));
    }

    #[test]
    fn test_local_vfs_read_dir_on_file() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("plain.txt");
        fs::write(&file, b"x").unwrap();

        let err = LocalVfs::new().read_dir(&file).unwrap_err();
        assert!(matches!(err, VfsError::NotADirectory(_)));
    }

    #[test]
    fn test_local_vfs_open_and_read() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("readable.txt");
        fs::write(&file, b"read me").unwrap();

        let vfs = LocalVfs::new();
        let mut reader = vfs.open_file(&file).unwrap();

        let mut content = String::new();
        reader.read_to_string(&mut content).unwrap();
        assert_eq!(content, "read me");
        assert!(vfs.exists(&file));
    }

    #[test]
    fn test_local_vfs_open_directory_fails() {
        let temp = TempDir::new().unwrap();
        let err = LocalVfs::new().open_file(temp.path()).err().unwrap();
        assert!(matches!(err, VfsError::NotAFile(_)));
    }
}
