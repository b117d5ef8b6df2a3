//! Corpus loading: directory of report PDFs → [`RecordSet`].
//!
//! Per-document failures are absorbed: a document that cannot be extracted
//! is logged and skipped, and the load continues. Only corpus-wide failure —
//! a required field missing from every record — surfaces, as raw text of the
//! first document for diagnostic display instead of the primary view.

use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::CorpusConfig;
use crate::extract;
use crate::models::RecordSet;
use crate::progress::{ProgressEvent, ProgressReporter};
use crate::record::build_record;

/// Corpus access failure. Reported to the user; halts only the load step,
/// never the process.
#[derive(Debug)]
pub enum CorpusError {
    MissingDirectory(PathBuf),
    Empty(PathBuf),
    BadGlob(String),
}

impl std::fmt::Display for CorpusError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CorpusError::MissingDirectory(dir) => {
                write!(f, "corpus directory not found: {}", dir.display())
            }
            CorpusError::Empty(dir) => {
                write!(f, "no documents found in corpus directory: {}", dir.display())
            }
            CorpusError::BadGlob(pattern) => write!(f, "invalid include glob: {}", pattern),
        }
    }
}

impl std::error::Error for CorpusError {}

/// Result of a corpus load: the record set, plus the first document's raw
/// text when a required field is invalid corpus-wide.
#[derive(Debug)]
pub struct CorpusLoad {
    pub records: RecordSet,
    pub diagnostic: Option<String>,
}

/// Load every matching document under the corpus directory.
pub fn load_corpus(
    config: &CorpusConfig,
    reporter: &dyn ProgressReporter,
) -> Result<CorpusLoad, CorpusError> {
    let dir = &config.dir;
    if !dir.is_dir() {
        return Err(CorpusError::MissingDirectory(dir.clone()));
    }

    reporter.report(ProgressEvent::Discovering);
    let paths = discover_documents(dir, &config.include_globs)?;
    if paths.is_empty() {
        return Err(CorpusError::Empty(dir.clone()));
    }

    let total = paths.len() as u64;
    let mut records = Vec::new();
    let mut first_text: Option<String> = None;

    for (i, path) in paths.iter().enumerate() {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        reporter.report(ProgressEvent::Loading {
            filename: filename.clone(),
            n: i as u64 + 1,
            total,
        });

        let text = match std::fs::read(path).map_err(|e| e.to_string()).and_then(|bytes| {
            extract::extract_text(&bytes).map_err(|e| e.to_string())
        }) {
            Ok(text) => text,
            Err(err) => {
                eprintln!("warning: skipping '{}': {}", filename, err);
                continue;
            }
        };

        if first_text.is_none() {
            first_text = Some(text.clone());
        }
        records.push(build_record(&text, &filename));
    }

    let records = RecordSet::new(records);
    let diagnostic = if records.validity.all_valid() {
        None
    } else {
        first_text
    };

    Ok(CorpusLoad {
        records,
        diagnostic,
    })
}

/// Enumerate the documents a load would process, without extracting them.
/// Backs `atlas load --dry-run`.
pub fn list_documents(config: &CorpusConfig) -> Result<Vec<PathBuf>, CorpusError> {
    if !config.dir.is_dir() {
        return Err(CorpusError::MissingDirectory(config.dir.clone()));
    }
    discover_documents(&config.dir, &config.include_globs)
}

/// Enumerate documents matching the include globs, in deterministic
/// filename order.
fn discover_documents(dir: &Path, include_globs: &[String]) -> Result<Vec<PathBuf>, CorpusError> {
    let include = build_globset(include_globs)?;
    let mut paths = Vec::new();
    for entry in WalkDir::new(dir).into_iter().flatten() {
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let relative = path.strip_prefix(dir).unwrap_or(path);
        if include.is_match(relative.to_string_lossy().as_ref()) {
            paths.push(path.to_path_buf());
        }
    }
    paths.sort();
    Ok(paths)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet, CorpusError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|_| CorpusError::BadGlob(pattern.clone()))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| CorpusError::BadGlob(e.to_string()))
}
