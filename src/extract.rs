//! Per-document CSP extraction: nonce injection, inline style hashing and
//! path classification.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::csp::{CspObject, Directive, hash_values};
use crate::error::Result;
use crate::html::{Document, NONCE_SELECTORS, inject_nonce};
use crate::path::classify;

/// CSP contribution of one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderRecord {
    pub web_path: String,
    pub csp: CspObject,
    pub is_global: bool,
}

/// Result of processing one document: its header record and the rewritten
/// markup that should replace the file on disk.
#[derive(Debug)]
pub struct ProcessedDocument {
    pub path: PathBuf,
    pub record: HeaderRecord,
    pub html: String,
}

/// Processes documents of one build directory.
#[derive(Debug, Clone)]
pub struct FileProcessor {
    build_dir: PathBuf,
    disabled_generated: HashSet<Directive>,
}

impl FileProcessor {
    pub fn new(build_dir: impl Into<PathBuf>, disabled_generated: HashSet<Directive>) -> Self {
        Self {
            build_dir: build_dir.into(),
            disabled_generated,
        }
    }

    fn should_generate(&self, directive: Directive) -> bool {
        !self.disabled_generated.contains(&directive)
    }

    pub fn process(&self, path: &Path, raw: &str) -> Result<ProcessedDocument> {
        let mut document = Document::parse(raw);

        for selector in NONCE_SELECTORS {
            inject_nonce(&mut document, selector)?;
        }

        let style_src = if self.should_generate(Directive::StyleSrc) {
            let elements = document.inner_contents("style")?;
            let attributes = document.attribute_values("[style]", "style")?;
            hash_values(elements.iter().chain(attributes.iter()))
        } else {
            Vec::new()
        };

        let web_path = classify(path, &self.build_dir)?;

        let mut csp = CspObject::new();
        // Scripts are covered by the nonce only; no hashes are generated.
        csp.set(Directive::ScriptSrc, Vec::new());
        csp.set(Directive::StyleSrc, style_src);

        debug!(
            path = %path.display(),
            web_path = %web_path.path,
            global = web_path.is_global,
            style_hashes = csp.get(Directive::StyleSrc).len(),
            "Processed document"
        );

        Ok(ProcessedDocument {
            path: path.to_path_buf(),
            record: HeaderRecord {
                web_path: web_path.path,
                csp,
                is_global: web_path.is_global,
            },
            html: document.into_string(),
        })
    }
}
