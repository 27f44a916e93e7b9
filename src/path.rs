//! Map a built file to the web path its CSP header applies to.

use std::path::{Component, Path};

use crate::error::{Error, Result};

const INDEX_FILE: &str = "index.html";

/// Where a header applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebPath {
    /// Slash-rooted; a trailing `*` marks a prefix match.
    pub path: String,
    /// Global paths are shared by every page in a directory.
    pub is_global: bool,
}

/// Classify `path` relative to `build_dir`.
///
/// `build/index.html` -> `/` (local), `build/a/index.html` -> `/a/` (local),
/// `build/a/b.html` -> `/a/*` (global), `build/404.html` -> `/*` (global).
pub fn classify(path: &Path, build_dir: &Path) -> Result<WebPath> {
    let relative = strip_build_dir(path, build_dir)?;

    let mut dirs: Vec<String> = Vec::new();
    let mut file_name = None;
    let mut components = relative.components().peekable();
    while let Some(component) = components.next() {
        match component {
            Component::Normal(name) => {
                let name = name.to_string_lossy().into_owned();
                if components.peek().is_some() {
                    dirs.push(name);
                } else {
                    file_name = Some(name);
                }
            }
            Component::CurDir => {}
            _ => return Err(outside(path, build_dir)),
        }
    }
    let Some(file_name) = file_name else {
        return Err(outside(path, build_dir));
    };

    let mut prefix = String::from("/");
    for dir in &dirs {
        prefix.push_str(dir);
        prefix.push('/');
    }

    if file_name == INDEX_FILE {
        Ok(WebPath {
            path: prefix,
            is_global: false,
        })
    } else {
        prefix.push('*');
        Ok(WebPath {
            path: prefix,
            is_global: true,
        })
    }
}

/// Path of `path` below `build_dir`, compared component-wise so a trailing
/// slash or `./` on either side makes no difference.
pub fn strip_build_dir<'a>(path: &'a Path, build_dir: &Path) -> Result<&'a Path> {
    let root: Vec<Component> = build_dir
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();

    let mut rest = path.components();
    let mut matched = 0;
    while matched < root.len() {
        match rest.next() {
            Some(Component::CurDir) => continue,
            Some(c) if c == root[matched] => matched += 1,
            _ => return Err(outside(path, build_dir)),
        }
    }
    Ok(rest.as_path())
}

fn outside(path: &Path, build_dir: &Path) -> Error {
    Error::OutsideBuildRoot {
        path: path.to_path_buf(),
        root: build_dir.to_path_buf(),
    }
}
