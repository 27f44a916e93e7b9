use std::fmt;
use std::path::PathBuf;

#[derive(Debug)]
pub enum Error {
    /// Missing or invalid configuration. Fatal for the run.
    Config(String),
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The HTML rewriter gave up on a document.
    Markup(String),
    OutsideBuildRoot {
        path: PathBuf,
        root: PathBuf,
    },
    /// Route registration against the remote API failed.
    Remote(String),
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn markup(e: impl fmt::Display) -> Self {
        Self::Markup(e.to_string())
    }

    pub fn remote(e: impl fmt::Display) -> Self {
        Self::Remote(e.to_string())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(msg) => write!(f, "config error: {msg}"),
            Error::Io { path, source } => write!(f, "{}: {source}", path.display()),
            Error::Markup(msg) => write!(f, "markup error: {msg}"),
            Error::OutsideBuildRoot { path, root } => write!(
                f,
                "{} is not inside build directory {}",
                path.display(),
                root.display()
            ),
            Error::Remote(msg) => write!(f, "route registration error: {msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
