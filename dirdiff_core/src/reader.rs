use dirdiff_common::{AppConfig, DirDiffError, FileEntry, FolderEntry, Vfs, VfsError};
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

/// Builds an in-memory [`FolderEntry`] tree from a directory
pub struct TreeReader {
    vfs: Arc<dyn Vfs>,
    custom_ignore: Option<Gitignore>,
}

impl TreeReader {
    pub fn new(config: &AppConfig, vfs: Arc<dyn Vfs>) -> Self {
        Self {
            vfs,
            custom_ignore: Self::build_custom_ignore(config),
        }
    }

    /// Build a Gitignore from custom ignore patterns in config
    fn build_custom_ignore(config: &AppConfig) -> Option<Gitignore> {
        if config.ignore_patterns.is_empty() {
            return None;
        }

        let mut builder = GitignoreBuilder::new("");
        for pattern in &config.ignore_patterns {
            if let Err(err) = builder.add_line(None, pattern) {
                debug!("Failed to add ignore pattern '{}': {}", pattern, err);
            } else {
                debug!("Added custom ignore pattern: {}", pattern);
            }
        }

        match builder.build() {
            Ok(ignore) => Some(ignore),
            Err(e) => {
                debug!("Failed to build custom ignore: {}", e);
                None
            }
        }
    }

    /// Read a whole tree. Any unreadable directory or entry fails the read.
    pub fn read(&self, root: &Path) -> Result<FolderEntry, DirDiffError> {
        let root = absolute_root(root)?;

        let metadata = self
            .vfs
            .metadata(&root)
            .map_err(|e| DirDiffError::path(&root, e))?;
        if !metadata.is_dir {
            return Err(DirDiffError::path(&root, "not a directory"));
        }

        let tree = self.read_folder(&root, Path::new(""))?;
        info!(
            "Read {} files from {} ({})",
            tree.total_files(),
            tree.path.display(),
            self.vfs.instance_id()
        );
        Ok(tree)
    }

    /// Read both roots concurrently, keeping each side's outcome.
    pub fn read_pair(
        &self,
        left: &Path,
        right: &Path,
    ) -> (Result<FolderEntry, DirDiffError>, Result<FolderEntry, DirDiffError>) {
        rayon::join(|| self.read(left), || self.read(right))
    }

    fn read_folder(&self, path: &Path, relative: &Path) -> Result<FolderEntry, DirDiffError> {
        let entries = self
            .vfs
            .read_dir(path)
            .map_err(|e| listing_error(path, e))?;

        let mut folder = FolderEntry::new(path);

        for entry in entries.iter().filter(|e| !e.is_dir) {
            if self.is_ignored(&relative.join(&entry.name), false) {
                continue;
            }
            folder.add_file(FileEntry::new(
                &entry.path,
                Some(entry.size),
                entry.modified.map(whole_seconds),
            ));
        }

        for entry in entries.iter().filter(|e| e.is_dir) {
            let child_relative = relative.join(&entry.name);
            if self.is_ignored(&child_relative, true) {
                continue;
            }
            folder.add_folder(self.read_folder(&entry.path, &child_relative)?);
        }

        debug!(
            "Read {:?}: {} files, {} folders",
            path,
            folder.file_count(),
            folder.folders.len()
        );
        Ok(folder)
    }

    fn is_ignored(&self, relative: &Path, is_dir: bool) -> bool {
        self.custom_ignore
            .as_ref()
            .map_or(false, |ignore| ignore.matched(relative, is_dir).is_ignore())
    }
}

/// Names the entry the backend failed on, or the listed directory otherwise.
fn listing_error(dir: &Path, err: VfsError) -> DirDiffError {
    let failed = err.path().map_or_else(|| dir.to_path_buf(), PathBuf::from);
    DirDiffError::path(failed, err)
}

fn absolute_root(root: &Path) -> Result<PathBuf, DirDiffError> {
    if root.is_absolute() {
        return Ok(root.to_path_buf());
    }
    let cwd = std::env::current_dir().map_err(|e| DirDiffError::path(root, e))?;
    Ok(cwd.join(root))
}

/// Modification times are compared at one-second resolution.
fn whole_seconds(time: SystemTime) -> SystemTime {
    match time.duration_since(UNIX_EPOCH) {
        Ok(since) => UNIX_EPOCH + Duration::from_secs(since.as_secs()),
        Err(_) => time,
    }
}
