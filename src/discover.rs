//! Find the HTML files of a build.

use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::error::{Error, Result};

/// `*` and `?` stay within one path component; `**` crosses them.
const SEGMENT_MATCH: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Compile exclude patterns. A leading `!` is accepted and ignored.
pub fn exclude_patterns(exclude: &[String]) -> Result<Vec<Pattern>> {
    exclude
        .iter()
        .map(|p| {
            let p = p.strip_prefix('!').unwrap_or(p);
            Pattern::new(p).map_err(|e| Error::config(format!("invalid exclude pattern {p:?}: {e}")))
        })
        .collect()
}

/// Every `*.html` file below `build_dir`, in a stable order, minus the ones
/// matching an exclude pattern.
pub fn find_html_files(build_dir: &Path, exclude: &[Pattern]) -> Vec<PathBuf> {
    info!(
        "Excluding {} {}",
        exclude.len(),
        if exclude.len() == 1 { "file" } else { "files" }
    );

    let mut files = Vec::new();
    for entry in WalkDir::new(build_dir).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "Skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().is_none_or(|ext| ext != "html") {
            continue;
        }
        if exclude
            .iter()
            .any(|p| p.matches_path_with(path, SEGMENT_MATCH))
        {
            continue;
        }
        files.push(path.to_path_buf());
    }

    info!(
        "Found {} HTML {}",
        files.len(),
        if files.len() == 1 { "file" } else { "files" }
    );

    files
}
