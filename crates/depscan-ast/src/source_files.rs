//! Source enumeration and the substring pre-filter
//!
//! The pre-filter is a raw text search for `name(`. It only narrows the set
//! of files handed to wrapper inference; a hit inside a comment or a string
//! is rejected later by the AST stage.

use anyhow::Result;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

pub const GO_EXTENSION: &str = "go";

fn is_hidden(entry: &walkdir::DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with('.'))
}

/// Every `.go` file below `dir`, sorted by path
pub fn list_source_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_hidden(e))
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) if err.depth() == 0 => {
                return Err(anyhow::Error::new(err).context(format!("Error walking {:?}", dir)));
            }
            Err(err) => {
                warn!("Skipping unreadable path under {:?}: {}", dir, err);
                continue;
            }
        };

        let path = entry.path();
        if entry.file_type().is_file()
            && path.extension().and_then(|s| s.to_str()) == Some(GO_EXTENSION)
        {
            files.push(path.to_path_buf());
        }
    }

    debug!("Found {} Go file(s) under {:?}", files.len(), dir);
    Ok(files)
}

/// Whether `content` contains a call-looking occurrence of `name`
pub fn mentions_call(content: &str, name: &str) -> bool {
    content.contains(&format!("{}(", name))
}

/// Map each candidate function name to the files mentioning `name(`
///
/// A file is recorded under every name it mentions. Names with no hits are
/// absent from the map.
pub fn files_containing_calls(dir: &Path, names: &[String]) -> Result<BTreeMap<String, Vec<PathBuf>>> {
    let mut occurrences: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();

    for file in list_source_files(dir)? {
        let content = match fs::read_to_string(&file) {
            Ok(content) => content,
            Err(err) => {
                warn!("Error reading file {:?}: {}", file, err);
                continue;
            }
        };

        for name in names {
            if mentions_call(&content, name) {
                occurrences.entry(name.clone()).or_default().push(file.clone());
            }
        }
    }

    Ok(occurrences)
}
