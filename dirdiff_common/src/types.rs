use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::SystemTime;

/// Strips trailing separators and `.` components without touching the filesystem.
fn clean_path(path: &Path) -> PathBuf {
    path.components().collect()
}

/// Last path segment, or the whole path for roots such as `/`.
fn entry_name(path: &Path) -> OsString {
    path.file_name()
        .map(OsStr::to_os_string)
        .unwrap_or_else(|| path.as_os_str().to_os_string())
}

/// A file found while reading a directory tree.
///
/// Equality ignores `path`: entries from two different roots are compared by
/// name, size and modification time only. Names are kept as raw OS strings
/// so that two names are equal only when their bytes are.
#[derive(Debug, Clone)]
pub struct FileEntry {
    pub path: PathBuf,
    pub name: OsString,
    /// `None` when the size is unknown.
    pub size: Option<u64>,
    pub modified: Option<SystemTime>,
}

impl FileEntry {
    pub fn new(path: impl AsRef<Path>, size: Option<u64>, modified: Option<SystemTime>) -> Self {
        let path = clean_path(path.as_ref());
        let name = entry_name(&path);
        Self {
            path,
            name,
            size,
            modified,
        }
    }
}

impl PartialEq for FileEntry {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.size == other.size && self.modified == other.modified
    }
}

impl Eq for FileEntry {}

/// A directory and everything read below it.
#[derive(Debug, Clone)]
pub struct FolderEntry {
    pub path: PathBuf,
    pub name: OsString,
    pub files: Vec<FileEntry>,
    pub folders: Vec<FolderEntry>,
}

impl FolderEntry {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = clean_path(path.as_ref());
        let name = entry_name(&path);
        Self {
            path,
            name,
            files: Vec::new(),
            folders: Vec::new(),
        }
    }

    pub fn add_file(&mut self, file: FileEntry) {
        self.files.push(file);
    }

    pub fn add_folder(&mut self, folder: FolderEntry) {
        self.folders.push(folder);
    }

    /// Number of files directly inside this folder
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Number of files in the whole subtree
    pub fn total_files(&self) -> usize {
        self.walk().map(FolderEntry::file_count).sum()
    }

    pub fn find_file(&self, name: impl AsRef<OsStr>) -> Option<&FileEntry> {
        let name = name.as_ref();
        self.files.iter().find(|file| file.name.as_os_str() == name)
    }

    pub fn find_folder(&self, name: impl AsRef<OsStr>) -> Option<&FolderEntry> {
        let name = name.as_ref();
        self.folders.iter().find(|folder| folder.name.as_os_str() == name)
    }

    /// Pre-order walk over this folder and all folders below it, in read order.
    pub fn walk(&self) -> Walk<'_> {
        Walk { stack: vec![self] }
    }

    /// One-directional containment check.
    ///
    /// True when both paths match and every file and folder of `self` has an
    /// equivalent in `other`. Extra entries on the `other` side are not
    /// noticed, so `a.equivalent_to(&b)` does not imply `b.equivalent_to(&a)`.
    pub fn equivalent_to(&self, other: &FolderEntry) -> bool {
        if self.path != other.path {
            return false;
        }
        let files_covered = self.files.iter().all(|file| other.files.contains(file));
        files_covered
            && self.folders.iter().all(|folder| {
                other
                    .folders
                    .iter()
                    .any(|candidate| folder.equivalent_to(candidate))
            })
    }
}

/// Iterator returned by [`FolderEntry::walk`].
pub struct Walk<'a> {
    stack: Vec<&'a FolderEntry>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = &'a FolderEntry;

    fn next(&mut self) -> Option<Self::Item> {
        let folder = self.stack.pop()?;
        self.stack.extend(folder.folders.iter().rev());
        Some(folder)
    }
}

/// Classification of one aligned (or unaligned) entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiffKind {
    /// Present on the left side only
    UnmatchedLeft,
    /// Present on the right side only
    UnmatchedRight,
    /// Sizes differ, content was not compared
    DifferentInfo,
    /// Same size, same content, same modification time
    ExactMatch,
    SameContentDifferentMtime,
    /// Same size and modification time but the bytes differ
    ContentDiffersSameMtime,
    ContentDiffersDifferentMtime,
    /// Content could not be read on one of the sides
    ComparisonError,
}

impl DiffKind {
    pub const ALL: [DiffKind; 8] = [
        DiffKind::UnmatchedLeft,
        DiffKind::UnmatchedRight,
        DiffKind::DifferentInfo,
        DiffKind::ExactMatch,
        DiffKind::SameContentDifferentMtime,
        DiffKind::ContentDiffersSameMtime,
        DiffKind::ContentDiffersDifferentMtime,
        DiffKind::ComparisonError,
    ];

    /// Whether a record of this kind is shown without `show_all_files`.
    pub fn is_difference(self) -> bool {
        !matches!(self, DiffKind::ExactMatch | DiffKind::SameContentDifferentMtime)
    }
}

/// Left-versus-right orderings of a matched file pair, for display only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairOrdering {
    pub size: Ordering,
    pub modified: Ordering,
}

impl PairOrdering {
    pub fn of(left: &FileEntry, right: &FileEntry) -> Self {
        Self {
            size: left.size.cmp(&right.size),
            modified: left.modified.cmp(&right.modified),
        }
    }
}

/// One line of the comparison result.
#[derive(Debug, Clone, PartialEq)]
pub struct DiffRecord {
    pub kind: DiffKind,
    /// Path below the compared roots
    pub relative_path: PathBuf,
    pub is_dir: bool,
    /// For folder records only `path` and `name` are filled in.
    pub left: Option<FileEntry>,
    pub right: Option<FileEntry>,
    /// Set for matched file pairs
    pub ordering: Option<PairOrdering>,
    /// Set for `ComparisonError` records
    pub error: Option<String>,
}

/// Records produced for one visited folder pair.
#[derive(Debug, Clone, PartialEq)]
pub struct FolderSection {
    pub relative_path: PathBuf,
    pub left: Option<PathBuf>,
    pub right: Option<PathBuf>,
    pub records: Vec<DiffRecord>,
}

impl FolderSection {
    pub fn has_records(&self) -> bool {
        !self.records.is_empty()
    }

    pub fn visible_records<'a>(
        &'a self,
        filter: DisplayFilter,
    ) -> impl Iterator<Item = &'a DiffRecord> + 'a {
        self.records.iter().filter(move |record| filter.allows(record))
    }
}

/// Decides which records reach the reporter. Never affects classification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DisplayFilter {
    pub show_all_files: bool,
}

impl DisplayFilter {
    pub fn allows(&self, record: &DiffRecord) -> bool {
        self.show_all_files || record.kind.is_difference()
    }
}

/// How the content of two same-size files is compared
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentMode {
    /// Stream both files and compare byte by byte
    #[default]
    Bytes,
    /// Compare BLAKE3 digests of the full content
    Blake3,
}

impl FromStr for ContentMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bytes" => Ok(ContentMode::Bytes),
            "blake3" => Ok(ContentMode::Blake3),
            other => Err(format!("unknown content mode '{other}' (expected bytes or blake3)")),
        }
    }
}

pub const DEFAULT_COLUMN_SEPARATOR: &str = "   ";

fn default_column_separator() -> String {
    DEFAULT_COLUMN_SEPARATOR.to_string()
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Ignore patterns (e.g., "*.o", "node_modules/")
    #[serde(default)]
    pub ignore_patterns: Vec<String>,

    /// Also report equal files and files differing only by mtime
    #[serde(default)]
    pub show_all_files: bool,

    /// Print both trees before the comparison
    #[serde(default)]
    pub show_dir_trees: bool,

    #[serde(default = "default_column_separator")]
    pub column_separator: String,

    #[serde(default)]
    pub content_mode: ContentMode,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ignore_patterns: Vec::new(),
            show_all_files: false,
            show_dir_trees: false,
            column_separator: default_column_separator(),
            content_mode: ContentMode::default(),
        }
    }
}

impl AppConfig {
    pub fn display_filter(&self) -> DisplayFilter {
        DisplayFilter {
            show_all_files: self.show_all_files,
        }
    }
}
