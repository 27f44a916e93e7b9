//! Render header records into the `_headers` file format and append them.

use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::csp::{Directive, PolicyMap, build_csp_header};
use crate::error::{Error, Result};
use crate::extract::HeaderRecord;

pub const HEADERS_FILE: &str = "_headers";

/// A fixed block appended after the generated ones.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ExtraHeader {
    pub path: String,
    pub csp: String,
}

/// Outcome of one best-effort write.
#[derive(Debug)]
pub struct WriteOutcome {
    pub path: PathBuf,
    pub result: Result<()>,
}

impl WriteOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Render one block:
///
/// ```text
/// /blog/*
///   Content-Security-Policy: style-src 'sha256-…';
/// ```
pub fn render_block(web_path: &str, csp: &str) -> String {
    format!("{web_path}\n  Content-Security-Policy: {csp}")
}

/// Render every record (in the given order) followed by the extra blocks.
pub fn render_headers(
    records: &[HeaderRecord],
    policies: &PolicyMap,
    disabled: &HashSet<Directive>,
    extra: &[ExtraHeader],
) -> String {
    records
        .iter()
        .map(|record| {
            render_block(
                &record.web_path,
                &build_csp_header(policies, disabled, &record.csp),
            )
        })
        .chain(extra.iter().map(|e| render_block(&e.path, &e.csp)))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn headers_path(build_dir: &Path) -> PathBuf {
    build_dir.join(HEADERS_FILE)
}

/// Append `content` to the headers file, creating it when missing.
///
/// Existing content that does not end in a newline is separated from the
/// new blocks by one. The appended text always ends in a newline. Empty
/// content leaves the file as it is.
pub fn append_headers(path: &Path, content: &str) -> WriteOutcome {
    WriteOutcome {
        path: path.to_path_buf(),
        result: try_append(path, content),
    }
}

fn try_append(path: &Path, content: &str) -> Result<()> {
    if content.is_empty() {
        return Ok(());
    }
    let needs_separator = match std::fs::read(path) {
        Ok(existing) => existing.last().is_some_and(|&b| b != b'\n'),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
        Err(e) => return Err(Error::io(path, e)),
    };

    let mut text = String::with_capacity(content.len() + 2);
    if needs_separator {
        text.push('\n');
    }
    text.push_str(content);
    if !text.ends_with('\n') {
        text.push('\n');
    }

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| Error::io(path, e))?;
    file.write_all(text.as_bytes())
        .map_err(|e| Error::io(path, e))
}
