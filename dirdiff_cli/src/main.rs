mod report;

use anyhow::{Context, Result};
use clap::Parser;
use dirdiff_common::{
    load_config, AppConfig, ContentMode, DiffKind, DiffRecord, FileEntry, FolderSection, Vfs,
};
use dirdiff_core::{ComparisonEngine, LocalVfs, TreeReader};
use report::{ColumnWidths, Summary, TextReporter};
use serde::Serialize;
use std::ffi::OsString;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "dirdiff")]
#[command(author = "dirdiff Contributors")]
#[command(version = "0.1.0")]
#[command(
    about = "Recursively compare two directory trees by name, size, date and content",
    long_about = None
)]
struct Cli {
    /// Left directory path (also -p1)
    #[arg(long = "path1", value_name = "DIR")]
    path1: PathBuf,

    /// Right directory path (also -p2)
    #[arg(long = "path2", value_name = "DIR")]
    path2: PathBuf,

    /// Also list equal files and files differing only by date
    #[arg(short = 'a', long)]
    show_all_files: bool,

    /// Print the full tree of both directories before the comparison
    #[arg(short = 't', long)]
    show_dir_trees: bool,

    /// String placed between output columns
    #[arg(short = 's', long, allow_hyphen_values = true)]
    column_separator: Option<String>,

    /// Ignore patterns (can be specified multiple times)
    #[arg(short, long)]
    ignore: Vec<String>,

    /// How same-size files are compared: bytes or blake3
    #[arg(long)]
    content_mode: Option<ContentMode>,

    /// Output results as JSON
    #[arg(long)]
    json: bool,

    /// Only read dirdiff.toml from the directory of the executable
    #[arg(long)]
    portable: bool,
}

/// Rewrite the two-letter short flags into their long forms for clap.
fn normalize_args<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    let mut passthrough = false;
    args.into_iter()
        .map(|arg| {
            if passthrough {
                return arg;
            }
            if arg == "--" {
                passthrough = true;
                return arg;
            }
            match arg.to_str() {
                Some("-p1") => OsString::from("--path1"),
                Some("-p2") => OsString::from("--path2"),
                Some(s) if s.starts_with("-p1=") => OsString::from(format!("--path1={}", &s[4..])),
                Some(s) if s.starts_with("-p2=") => OsString::from(format!("--path2={}", &s[4..])),
                _ => arg,
            }
        })
        .collect()
}

fn main() {
    // Initialize tracing to stderr (so the report can go cleanly to stdout)
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse_from(normalize_args(std::env::args_os()));

    if let Err(e) = run(cli) {
        error!("Comparison failed: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let loaded = load_config(cli.portable).context("Failed to load configuration")?;
    if loaded.exists {
        info!(
            "Using {} config {}",
            if loaded.portable { "portable" } else { "user" },
            loaded.path.display()
        );
    } else {
        debug!("No config at {}, using defaults", loaded.path.display());
    }
    let config = apply_overrides(loaded.config, &cli);

    let vfs: Arc<dyn Vfs> = Arc::new(LocalVfs::new());
    let reader = TreeReader::new(&config, Arc::clone(&vfs));

    let (left, right) = reader.read_pair(&cli.path1, &cli.path2);
    let left = left.with_context(|| format!("Cannot read left directory {}", cli.path1.display()))?;
    let right =
        right.with_context(|| format!("Cannot read right directory {}", cli.path2.display()))?;

    let engine = ComparisonEngine::new(vfs).with_content_mode(config.content_mode);
    let comparison = engine.compare(&left, Some(&right));

    let stdout = io::stdout();
    let mut out = stdout.lock();

    if cli.json {
        let sections = comparison
            .collect::<Result<Vec<_>, _>>()
            .context("Comparison did not complete")?;
        let report = build_json_report(&left.path, &right.path, &sections, &config);
        let output = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
        writeln!(out, "{output}")?;
        return Ok(());
    }

    let widths = ColumnWidths::measure(&[&left, &right]);
    let reporter = TextReporter::new(
        widths,
        config.column_separator.clone(),
        config.display_filter(),
    );

    if config.show_dir_trees {
        reporter.write_tree(&mut out, &left)?;
        reporter.write_tree(&mut out, &right)?;
    }
    reporter.write_legend(&mut out)?;

    let mut summary = Summary::default();
    for section in comparison {
        let section = section.context("Comparison did not complete")?;
        reporter.write_section(&mut out, &section)?;
        summary.add(&section);
    }
    summary.write(&mut out)?;

    info!(
        "Compared {} entries, {} differences",
        summary.total(),
        summary.differences()
    );
    Ok(())
}

/// Command-line flags only ever enable or extend the loaded configuration.
fn apply_overrides(mut config: AppConfig, cli: &Cli) -> AppConfig {
    config.show_all_files |= cli.show_all_files;
    config.show_dir_trees |= cli.show_dir_trees;
    config.ignore_patterns.extend(cli.ignore.iter().cloned());
    if let Some(separator) = &cli.column_separator {
        config.column_separator = separator.clone();
    }
    if let Some(mode) = cli.content_mode {
        config.content_mode = mode;
    }
    config
}

#[derive(Serialize)]
struct JsonReport {
    left: String,
    right: String,
    summary: JsonSummary,
    sections: Vec<JsonSection>,
}

#[derive(Serialize, Default)]
struct JsonSummary {
    total: usize,
    unmatched_left: usize,
    unmatched_right: usize,
    different_info: usize,
    exact_match: usize,
    same_content_different_mtime: usize,
    content_differs_same_mtime: usize,
    content_differs_different_mtime: usize,
    comparison_error: usize,
}

#[derive(Serialize)]
struct JsonSection {
    path: String,
    left: Option<String>,
    right: Option<String>,
    entries: Vec<JsonEntry>,
}

#[derive(Serialize)]
struct JsonEntry {
    path: String,
    kind: DiffKind,
    is_dir: bool,
    left: Option<JsonFileSide>,
    right: Option<JsonFileSide>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Serialize)]
struct JsonFileSide {
    path: String,
    size: Option<u64>,
    modified_unix: Option<u64>,
}

fn build_json_report(
    left: &Path,
    right: &Path,
    sections: &[FolderSection],
    config: &AppConfig,
) -> JsonReport {
    let filter = config.display_filter();
    let mut summary = Summary::default();

    let sections = sections
        .iter()
        .inspect(|section| summary.add(section))
        .filter_map(|section| {
            let entries: Vec<JsonEntry> = section.visible_records(filter).map(json_entry).collect();
            if entries.is_empty() {
                return None;
            }
            Some(JsonSection {
                path: section.relative_path.to_string_lossy().to_string(),
                left: section.left.as_ref().map(|p| p.to_string_lossy().to_string()),
                right: section.right.as_ref().map(|p| p.to_string_lossy().to_string()),
                entries,
            })
        })
        .collect();

    JsonReport {
        left: left.to_string_lossy().to_string(),
        right: right.to_string_lossy().to_string(),
        summary: json_summary(&summary),
        sections,
    }
}

fn json_summary(summary: &Summary) -> JsonSummary {
    JsonSummary {
        total: summary.total(),
        unmatched_left: summary.count(DiffKind::UnmatchedLeft),
        unmatched_right: summary.count(DiffKind::UnmatchedRight),
        different_info: summary.count(DiffKind::DifferentInfo),
        exact_match: summary.count(DiffKind::ExactMatch),
        same_content_different_mtime: summary.count(DiffKind::SameContentDifferentMtime),
        content_differs_same_mtime: summary.count(DiffKind::ContentDiffersSameMtime),
        content_differs_different_mtime: summary.count(DiffKind::ContentDiffersDifferentMtime),
        comparison_error: summary.count(DiffKind::ComparisonError),
    }
}

fn json_entry(record: &DiffRecord) -> JsonEntry {
    JsonEntry {
        path: record.relative_path.to_string_lossy().to_string(),
        kind: record.kind,
        is_dir: record.is_dir,
        left: record.left.as_ref().map(json_side),
        right: record.right.as_ref().map(json_side),
        error: record.error.clone(),
    }
}

fn json_side(entry: &FileEntry) -> JsonFileSide {
    JsonFileSide {
        path: entry.path.to_string_lossy().to_string(),
        size: entry.size,
        modified_unix: entry.modified.and_then(system_time_to_unix),
    }
}

fn system_time_to_unix(time: SystemTime) -> Option<u64> {
    time.duration_since(UNIX_EPOCH).ok().map(|d| d.as_secs())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dirdiff_common::PairOrdering;
    use std::time::Duration;

    fn os(args: &[&str]) -> Vec<OsString> {
        args.iter().map(OsString::from).collect()
    }

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(normalize_args(os(args))).unwrap()
    }

    #[test]
    fn test_normalize_short_path_flags() {
        let args = normalize_args(os(&["dirdiff", "-p1", "/a", "-p2=/b", "-a"]));
        assert_eq!(args, os(&["dirdiff", "--path1", "/a", "--path2=/b", "-a"]));
    }

    #[test]
    fn test_normalize_stops_at_double_dash() {
        let args = normalize_args(os(&["dirdiff", "--", "-p1"]));
        assert_eq!(args, os(&["dirdiff", "--", "-p1"]));
    }

    #[test]
    fn test_parse_short_and_long_forms() {
        let cli = parse(&["dirdiff", "-p1", "/left", "--path2", "/right", "-a", "-t", "-s", " | "]);
        assert_eq!(cli.path1, PathBuf::from("/left"));
        assert_eq!(cli.path2, PathBuf::from("/right"));
        assert!(cli.show_all_files);
        assert!(cli.show_dir_trees);
        assert_eq!(cli.column_separator.as_deref(), Some(" | "));
        assert!(!cli.json);
        assert!(!cli.portable);

        let portable = parse(&["dirdiff", "-p1", "/l", "-p2", "/r", "--portable"]);
        assert!(portable.portable);
    }

    #[test]
    fn test_parse_requires_both_paths() {
        assert!(Cli::try_parse_from(normalize_args(os(&["dirdiff", "-p1", "/left"]))).is_err());
    }

    #[test]
    fn test_parse_content_mode() {
        let cli = parse(&["dirdiff", "-p1", "/l", "-p2", "/r", "--content-mode", "blake3"]);
        assert_eq!(cli.content_mode, Some(ContentMode::Blake3));
        assert!(Cli::try_parse_from(normalize_args(os(&[
            "dirdiff", "-p1", "/l", "-p2", "/r", "--content-mode", "md5"
        ])))
        .is_err());
    }

    #[test]
    fn test_flags_extend_config() {
        let cli = parse(&["dirdiff", "-p1", "/l", "-p2", "/r", "-i", "*.tmp", "-a"]);
        let config = AppConfig {
            ignore_patterns: vec!["*.o".to_string()],
            show_dir_trees: true,
            ..AppConfig::default()
        };

        let config = apply_overrides(config, &cli);
        assert_eq!(config.ignore_patterns, vec!["*.o", "*.tmp"]);
        assert!(config.show_all_files);
        assert!(config.show_dir_trees);
        assert_eq!(config.column_separator, "   ");
        assert_eq!(config.content_mode, ContentMode::Bytes);
    }

    #[test]
    fn test_system_time_to_unix() {
        let time = UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        assert_eq!(system_time_to_unix(time), Some(1_700_000_000));
    }

    fn sample_sections() -> Vec<FolderSection> {
        let at = Some(UNIX_EPOCH + Duration::from_secs(100));
        let left = FileEntry::new("/l/same.txt", Some(4), at);
        let right = FileEntry::new("/r/same.txt", Some(4), at);
        vec![
            FolderSection {
                relative_path: PathBuf::new(),
                left: Some(PathBuf::from("/l")),
                right: Some(PathBuf::from("/r")),
                records: vec![
                    DiffRecord {
                        kind: DiffKind::ExactMatch,
                        relative_path: PathBuf::from("same.txt"),
                        is_dir: false,
                        ordering: Some(PairOrdering::of(&left, &right)),
                        left: Some(left),
                        right: Some(right),
                        error: None,
                    },
                    DiffRecord {
                        kind: DiffKind::UnmatchedLeft,
                        relative_path: PathBuf::from("sub"),
                        is_dir: true,
                        left: Some(FileEntry::new("/l/sub", None, None)),
                        right: None,
                        ordering: None,
                        error: None,
                    },
                ],
            },
            FolderSection {
                relative_path: PathBuf::from("sub"),
                left: Some(PathBuf::from("/l/sub")),
                right: None,
                records: vec![],
            },
        ]
    }

    #[test]
    fn test_build_json_report_filters_entries_not_summary() {
        let report = build_json_report(
            Path::new("/l"),
            Path::new("/r"),
            &sample_sections(),
            &AppConfig::default(),
        );

        assert_eq!(report.summary.total, 2);
        assert_eq!(report.summary.exact_match, 1);
        assert_eq!(report.summary.unmatched_left, 1);
        assert_eq!(report.sections.len(), 1);
        assert_eq!(report.sections[0].entries.len(), 1);
        assert_eq!(report.sections[0].entries[0].path, "sub");
        assert!(report.sections[0].entries[0].is_dir);
    }

    #[test]
    fn test_build_json_report_show_all() {
        let config = AppConfig {
            show_all_files: true,
            ..AppConfig::default()
        };
        let report =
            build_json_report(Path::new("/l"), Path::new("/r"), &sample_sections(), &config);

        let entries = &report.sections[0].entries;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].kind, DiffKind::ExactMatch);
        let left = entries[0].left.as_ref().unwrap();
        assert_eq!(left.size, Some(4));
        assert_eq!(left.modified_unix, Some(100));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["sections"][0]["entries"][0]["kind"], "EXACT_MATCH");
        assert!(json["sections"][0]["entries"][0].get("error").is_none());
    }
}
