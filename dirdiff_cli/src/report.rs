use chrono::{DateTime, Local};
use dirdiff_common::{DiffKind, DiffRecord, DisplayFilter, FileEntry, FolderEntry, FolderSection};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::io::{self, Write};
use std::time::SystemTime;

const DATE_FORMAT: &str = "%a %b %e %H:%M:%S %Y";
const NOT_AVAILABLE: &str = "NA";
const FLAG_WIDTH: usize = 3;
const TREE_INDENT: &str = "    ";

pub const LEGEND: &str = "\
Legend:
< > means there was no matching file found on the other folder.
<~> means the file info is different (i.e. mismatched file size).
<=> means the files are equal by file info and by content.
<!> means the files have the same size and modification date but their content differs.
<@> means the files have equal content but different modification dates.
<*> means the files differ in content and modification date.
<?> means the files could not be compared; the reason follows the row.";

pub fn marker(kind: DiffKind) -> &'static str {
    match kind {
        DiffKind::UnmatchedLeft | DiffKind::UnmatchedRight => "< >",
        DiffKind::DifferentInfo => "<~>",
        DiffKind::ExactMatch => "<=>",
        DiffKind::ContentDiffersSameMtime => "<!>",
        DiffKind::SameContentDifferentMtime => "<@>",
        DiffKind::ContentDiffersDifferentMtime => "<*>",
        DiffKind::ComparisonError => "<?>",
    }
}

pub fn format_size(size: Option<u64>) -> String {
    size.map_or_else(|| NOT_AVAILABLE.to_string(), |s| s.to_string())
}

pub fn format_time(time: Option<SystemTime>) -> String {
    time.map_or_else(
        || NOT_AVAILABLE.to_string(),
        |t| DateTime::<Local>::from(t).format(DATE_FORMAT).to_string(),
    )
}

fn flag(ordering: Option<Ordering>, greater: Ordering) -> &'static str {
    match ordering {
        Some(o) if o == greater => "(+)",
        Some(Ordering::Equal) | None => "   ",
        Some(_) => "(-)",
    }
}

fn width(s: &str) -> usize {
    s.chars().count()
}

/// Widest path, size and date strings over every entry of the given trees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ColumnWidths {
    pub path: usize,
    pub size: usize,
    pub date: usize,
}

impl ColumnWidths {
    pub fn measure(trees: &[&FolderEntry]) -> Self {
        let mut widths = Self {
            path: 0,
            size: width(NOT_AVAILABLE),
            date: width(NOT_AVAILABLE),
        };

        for folder in trees.iter().flat_map(|tree| tree.walk()) {
            widths.path = widths.path.max(width(&folder_label(folder)));
            for file in &folder.files {
                widths.path = widths.path.max(width(&file.path.display().to_string()));
                widths.size = widths.size.max(width(&format_size(file.size)));
                widths.date = widths.date.max(width(&format_time(file.modified)));
            }
        }

        widths
    }
}

fn folder_label(folder: &FolderEntry) -> String {
    format!("{}/", folder.path.display())
}

/// Renders the text report. Column widths are fixed up front.
pub struct TextReporter {
    widths: ColumnWidths,
    separator: String,
    filter: DisplayFilter,
}

impl TextReporter {
    pub fn new(widths: ColumnWidths, separator: impl Into<String>, filter: DisplayFilter) -> Self {
        Self {
            widths,
            separator: separator.into(),
            filter,
        }
    }

    fn cell_width(&self) -> usize {
        let sep = width(&self.separator);
        self.widths.path + sep + self.widths.size + FLAG_WIDTH + sep + self.widths.date + FLAG_WIDTH
    }

    pub fn write_legend(&self, out: &mut impl Write) -> io::Result<()> {
        writeln!(out, "{LEGEND}")?;
        writeln!(out)
    }

    /// Indented listing of a whole tree, files before subfolders.
    pub fn write_tree(&self, out: &mut impl Write, tree: &FolderEntry) -> io::Result<()> {
        writeln!(out, "{}", folder_label(tree))?;
        self.write_tree_level(out, tree, 1)?;
        writeln!(out)
    }

    fn write_tree_level(
        &self,
        out: &mut impl Write,
        folder: &FolderEntry,
        depth: usize,
    ) -> io::Result<()> {
        let indent = TREE_INDENT.repeat(depth);
        for file in &folder.files {
            writeln!(
                out,
                "{indent}{}{sep}{:>size$}{sep}{}",
                file.name.to_string_lossy(),
                format_size(file.size),
                format_time(file.modified),
                sep = self.separator,
                size = self.widths.size,
            )?;
        }
        for sub in &folder.folders {
            writeln!(out, "{indent}{}/", sub.name.to_string_lossy())?;
            self.write_tree_level(out, sub, depth + 1)?;
        }
        Ok(())
    }

    /// Write the header and visible records of one section.
    ///
    /// Returns the number of record lines written; nothing is written when
    /// no record passes the display filter.
    pub fn write_section(
        &self,
        out: &mut impl Write,
        section: &FolderSection,
    ) -> io::Result<usize> {
        let lines: Vec<String> = section
            .visible_records(self.filter)
            .map(|record| self.format_record(record))
            .collect();
        if lines.is_empty() {
            return Ok(0);
        }

        for line in self.header(section) {
            writeln!(out, "{line}")?;
        }
        for line in &lines {
            writeln!(out, "{line}")?;
        }
        Ok(lines.len())
    }

    fn header(&self, section: &FolderSection) -> [String; 3] {
        let rule = "-".repeat(self.cell_width());
        let blank_marker = " ".repeat(FLAG_WIDTH);
        let side = |path: &Option<std::path::PathBuf>| {
            path.as_ref()
                .map(|p| format!("$ {}", p.display()))
                .unwrap_or_default()
        };
        let title = format!(
            "{:<cell$}{sep}{blank_marker}{sep}{}",
            side(&section.left),
            side(&section.right),
            cell = self.cell_width(),
            sep = self.separator,
        );
        let rules = format!("{rule}{sep}{blank_marker}{sep}{rule}", sep = self.separator);
        [rules.clone(), title.trim_end().to_string(), rules]
    }

    pub fn format_record(&self, record: &DiffRecord) -> String {
        let size_order = record.ordering.map(|o| o.size);
        let date_order = record.ordering.map(|o| o.modified);

        let left = self.cell(record.left.as_ref(), record.is_dir, size_order, date_order);
        // Orderings are left-versus-right, so the right cell flips them.
        let right = self.cell(
            record.right.as_ref(),
            record.is_dir,
            size_order.map(Ordering::reverse),
            date_order.map(Ordering::reverse),
        );

        let mut line = format!(
            "{left}{sep}{}{sep}{right}",
            marker(record.kind),
            sep = self.separator
        )
        .trim_end()
        .to_string();

        if let Some(error) = &record.error {
            line.push_str(&self.separator);
            line.push_str(error);
        }
        line
    }

    fn cell(
        &self,
        entry: Option<&FileEntry>,
        is_dir: bool,
        size_order: Option<Ordering>,
        date_order: Option<Ordering>,
    ) -> String {
        let Some(entry) = entry else {
            return " ".repeat(self.cell_width());
        };

        let (path, size, date) = if is_dir {
            (format!("{}/", entry.path.display()), String::new(), String::new())
        } else {
            (
                entry.path.display().to_string(),
                format_size(entry.size),
                format_time(entry.modified),
            )
        };

        format!(
            "{path:<pw$}{sep}{size:>sw$}{}{sep}{date:<dw$}{}",
            flag(size_order, Ordering::Greater),
            flag(date_order, Ordering::Greater),
            pw = self.widths.path,
            sw = self.widths.size,
            dw = self.widths.date,
            sep = self.separator,
        )
    }
}

/// Record counts per kind, over every record regardless of the display filter.
#[derive(Debug, Default, Clone)]
pub struct Summary {
    counts: HashMap<DiffKind, usize>,
    total: usize,
}

impl Summary {
    pub fn add(&mut self, section: &FolderSection) {
        for record in &section.records {
            *self.counts.entry(record.kind).or_insert(0) += 1;
            self.total += 1;
        }
    }

    pub fn count(&self, kind: DiffKind) -> usize {
        self.counts.get(&kind).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn differences(&self) -> usize {
        DiffKind::ALL
            .iter()
            .filter(|kind| kind.is_difference())
            .map(|&kind| self.count(kind))
            .sum()
    }

    pub fn write(&self, out: &mut impl Write) -> io::Result<()> {
        writeln!(out, "\n{}", "=".repeat(80))?;
        writeln!(out, "Summary:")?;
        writeln!(out, "  Total entries:             {}", self.total)?;
        for kind in DiffKind::ALL {
            writeln!(out, "  {:<27}{}", format!("{}:", summary_label(kind)), self.count(kind))?;
        }
        writeln!(out, "{}", "=".repeat(80))
    }
}

fn summary_label(kind: DiffKind) -> &'static str {
    match kind {
        DiffKind::UnmatchedLeft => "Left only",
        DiffKind::UnmatchedRight => "Right only",
        DiffKind::DifferentInfo => "Different info",
        DiffKind::ExactMatch => "Exact match",
        DiffKind::SameContentDifferentMtime => "Same content, other date",
        DiffKind::ContentDiffersSameMtime => "Content differs, same date",
        DiffKind::ContentDiffersDifferentMtime => "Content and date differ",
        DiffKind::ComparisonError => "Comparison errors",
    }
}
