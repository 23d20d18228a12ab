use crate::content::ContentComparator;
use dirdiff_common::{
    ContentMode, ContentReadError, DiffKind, DiffRecord, DirDiffError, FileEntry, FolderEntry,
    FolderSection, PairOrdering, Vfs,
};
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::ffi::OsStr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Aligns two directory trees by name and classifies every entry
pub struct ComparisonEngine {
    vfs: Arc<dyn Vfs>,
    content: ContentComparator,
    cancel: Option<Arc<AtomicBool>>,
}

impl ComparisonEngine {
    pub fn new(vfs: Arc<dyn Vfs>) -> Self {
        Self {
            content: ContentComparator::new(Arc::clone(&vfs), ContentMode::default()),
            vfs,
            cancel: None,
        }
    }

    pub fn with_content_mode(mut self, mode: ContentMode) -> Self {
        self.content = ContentComparator::new(Arc::clone(&self.vfs), mode);
        self
    }

    /// Checked between folder pairs; see [`Comparison`].
    pub fn with_cancel(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Lazily compare two trees, one [`FolderSection`] per visited folder pair.
    ///
    /// Sections come depth-first in left-folder order, followed by the
    /// folders that only exist on the right. Pass `None` for `right` to report
    /// the whole left tree as unmatched.
    pub fn compare<'a>(
        &'a self,
        left: &'a FolderEntry,
        right: Option<&'a FolderEntry>,
    ) -> Comparison<'a> {
        info!(
            "Comparing {} with {}",
            left.path.display(),
            right.map_or_else(|| "<nothing>".to_string(), |r| r.path.display().to_string())
        );

        Comparison {
            engine: self,
            pending: vec![PendingPair {
                relative: PathBuf::new(),
                left: Some(left),
                right,
            }],
            finished: false,
        }
    }

    /// Classify a pair of files that share a name.
    pub fn classify(
        &self,
        left: &FileEntry,
        right: &FileEntry,
    ) -> Result<DiffKind, ContentReadError> {
        if left.size != right.size {
            return Ok(DiffKind::DifferentInfo);
        }

        let same_content = self.content.same_content(&left.path, &right.path)?;
        let same_mtime = left.modified == right.modified;

        Ok(match (same_content, same_mtime) {
            (true, true) => DiffKind::ExactMatch,
            (true, false) => DiffKind::SameContentDifferentMtime,
            (false, true) => DiffKind::ContentDiffersSameMtime,
            (false, false) => DiffKind::ContentDiffersDifferentMtime,
        })
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .map_or(false, |flag| flag.load(Ordering::Relaxed))
    }

    /// Produce the section of one folder pair plus the child pairs to visit.
    fn visit<'a>(&self, pair: &PendingPair<'a>) -> (FolderSection, Vec<PendingPair<'a>>) {
        let left_files = pair.left.map_or(&[][..], |f| f.files.as_slice());
        let right_files = pair.right.map_or(&[][..], |f| f.files.as_slice());
        let left_folders = pair.left.map_or(&[][..], |f| f.folders.as_slice());
        let right_folders = pair.right.map_or(&[][..], |f| f.folders.as_slice());

        let mut items = Vec::with_capacity(left_files.len() + right_files.len());

        let right_by_name: HashMap<&OsStr, &FileEntry> =
            right_files.iter().map(|f| (f.name.as_os_str(), f)).collect();
        let mut matched: HashSet<&OsStr> = HashSet::new();

        for file in left_files {
            let relative = pair.relative.join(&file.name);
            match right_by_name.get(file.name.as_os_str()) {
                Some(&other) if matched.insert(other.name.as_os_str()) => {
                    items.push(Pending::Pair(relative, file, other))
                }
                _ => items.push(Pending::Done(unmatched(
                    DiffKind::UnmatchedLeft,
                    relative,
                    file.clone(),
                    false,
                ))),
            }
        }

        for file in right_files.iter().filter(|f| !matched.contains(f.name.as_os_str())) {
            items.push(Pending::Done(unmatched(
                DiffKind::UnmatchedRight,
                pair.relative.join(&file.name),
                file.clone(),
                false,
            )));
        }

        let right_folders_by_name: HashMap<&OsStr, &FolderEntry> =
            right_folders.iter().map(|f| (f.name.as_os_str(), f)).collect();
        let mut matched_folders: HashSet<&OsStr> = HashSet::new();
        let mut children = Vec::with_capacity(left_folders.len() + right_folders.len());

        for folder in left_folders {
            let relative = pair.relative.join(&folder.name);
            let other = right_folders_by_name
                .get(folder.name.as_os_str())
                .copied()
                .filter(|other| matched_folders.insert(other.name.as_os_str()));
            if other.is_none() {
                items.push(Pending::Done(unmatched(
                    DiffKind::UnmatchedLeft,
                    relative.clone(),
                    folder_marker(folder),
                    true,
                )));
            }
            children.push(PendingPair {
                relative,
                left: Some(folder),
                right: other,
            });
        }

        for folder in right_folders
            .iter()
            .filter(|f| !matched_folders.contains(f.name.as_os_str()))
        {
            let relative = pair.relative.join(&folder.name);
            items.push(Pending::Done(unmatched(
                DiffKind::UnmatchedRight,
                relative.clone(),
                folder_marker(folder),
                true,
            )));
            children.push(PendingPair {
                relative,
                left: None,
                right: Some(folder),
            });
        }

        let records: Vec<DiffRecord> = items
            .into_par_iter()
            .map(|item| match item {
                Pending::Done(record) => record,
                Pending::Pair(relative, left, right) => self.matched_record(relative, left, right),
            })
            .collect();

        debug!(
            "Section {:?}: {} records, {} child folders",
            pair.relative,
            records.len(),
            children.len()
        );

        let section = FolderSection {
            relative_path: pair.relative.clone(),
            left: pair.left.map(|f| f.path.clone()),
            right: pair.right.map(|f| f.path.clone()),
            records,
        };
        (section, children)
    }

    fn matched_record(
        &self,
        relative_path: PathBuf,
        left: &FileEntry,
        right: &FileEntry,
    ) -> DiffRecord {
        let (kind, error) = match self.classify(left, right) {
            Ok(kind) => (kind, None),
            Err(err) => {
                warn!("{}", err);
                (DiffKind::ComparisonError, Some(err.to_string()))
            }
        };

        DiffRecord {
            kind,
            relative_path,
            is_dir: false,
            left: Some(left.clone()),
            right: Some(right.clone()),
            ordering: Some(PairOrdering::of(left, right)),
            error,
        }
    }
}

/// A record for an entry present on one side only.
fn unmatched(kind: DiffKind, relative_path: PathBuf, entry: FileEntry, is_dir: bool) -> DiffRecord {
    let (left, right) = match kind {
        DiffKind::UnmatchedLeft => (Some(entry), None),
        _ => (None, Some(entry)),
    };
    DiffRecord {
        kind,
        relative_path,
        is_dir,
        left,
        right,
        ordering: None,
        error: None,
    }
}

/// Folders are reported through a [`FileEntry`] with no size or time.
fn folder_marker(folder: &FolderEntry) -> FileEntry {
    FileEntry::new(&folder.path, None, None)
}

enum Pending<'a> {
    Done(DiffRecord),
    Pair(PathBuf, &'a FileEntry, &'a FileEntry),
}

struct PendingPair<'a> {
    relative: PathBuf,
    left: Option<&'a FolderEntry>,
    right: Option<&'a FolderEntry>,
}

/// One-pass iterator over the sections of a comparison.
///
/// Content is compared when a section is produced, not up front. If the
/// engine's cancel flag is set, the next call yields a single
/// `DirDiffError::Comparison` and the iterator ends.
pub struct Comparison<'a> {
    engine: &'a ComparisonEngine,
    pending: Vec<PendingPair<'a>>,
    finished: bool,
}

impl<'a> Iterator for Comparison<'a> {
    type Item = Result<FolderSection, DirDiffError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let pair = match self.pending.pop() {
            Some(pair) => pair,
            None => {
                self.finished = true;
                return None;
            }
        };

        if self.engine.is_cancelled() {
            self.finished = true;
            self.pending.clear();
            return Some(Err(DirDiffError::Comparison("Comparison cancelled".to_string())));
        }

        let (section, children) = self.engine.visit(&pair);
        self.pending.extend(children.into_iter().rev());
        Some(Ok(section))
    }
}
