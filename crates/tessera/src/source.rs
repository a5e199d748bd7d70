//! Template file sources.
//!
//! The compiler never touches the filesystem directly; it asks a
//! [`TemplateSource`] for the files of one extension inside a directory and
//! for the contents of each path it was handed back. Two sources ship with
//! the crate:
//!
//! - [`DirSource`]: the local read/write filesystem, rooted at a directory.
//!   Edits on disk are picked up by the next rebuild, which makes it the
//!   natural companion of `always_reload` during development.
//! - [`EmbeddedSource`]: a read-only, in-memory set of `(path, content)`
//!   entries, typically produced with `include_str!` so release binaries
//!   carry their templates.
//!
//! Paths handed out by a source are relative, `/`-separated, and only
//! meaningful to the same source.
//!
//! # Example
//!
//! ```rust
//! use tessera::{EmbeddedSource, TemplateSource};
//!
//! let source = EmbeddedSource::from_entries(&[
//!     ("layouts/application.html", "{% block layout %}{% include 'page' %}{% endblock %}"),
//!     ("pages/home.html", "{% block page %}Home{% endblock %}"),
//! ]);
//!
//! assert_eq!(source.list("pages", ".html").unwrap(), vec!["pages/home.html"]);
//! ```

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

/// Error raised by a [`TemplateSource`].
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The requested directory does not exist.
    #[error("template directory not found: {}", .path.display())]
    DirectoryNotFound {
        /// The missing directory.
        path: PathBuf,
    },

    /// The requested file does not exist.
    #[error("template file not found: {}", .path.display())]
    FileNotFound {
        /// The missing file.
        path: PathBuf,
    },

    /// Any other I/O failure.
    #[error("reading {}: {source}", .path.display())]
    Io {
        /// The path being accessed.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: io::Error,
    },
}

/// A provider of template files.
///
/// Implementations must be shareable across threads because rebuilds may be
/// triggered from any render call.
pub trait TemplateSource: Send + Sync {
    /// Lists files directly inside `dir` whose name ends with `extension`.
    ///
    /// The listing is not recursive and is returned sorted.
    fn list(&self, dir: &str, extension: &str) -> Result<Vec<String>, SourceError>;

    /// Reads the full contents of a path previously returned by [`list`](Self::list).
    fn read(&self, path: &str) -> Result<String, SourceError>;
}

/// Template files on the local filesystem.
#[derive(Debug, Clone)]
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    /// Creates a source rooted at `root`. Directory names passed to
    /// [`TemplateSource::list`] are resolved relative to it.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl TemplateSource for DirSource {
    fn list(&self, dir: &str, extension: &str) -> Result<Vec<String>, SourceError> {
        let path = self.root.join(dir);
        if !path.is_dir() {
            return Err(SourceError::DirectoryNotFound { path });
        }

        let entries = std::fs::read_dir(&path).map_err(|source| SourceError::Io {
            path: path.clone(),
            source,
        })?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| SourceError::Io {
                path: path.clone(),
                source,
            })?;
            let file_type = entry.file_type().map_err(|source| SourceError::Io {
                path: entry.path(),
                source,
            })?;
            if !file_type.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.ends_with(extension) {
                files.push(join(dir, &name));
            }
        }
        files.sort();
        Ok(files)
    }

    fn read(&self, path: &str) -> Result<String, SourceError> {
        let full = self.root.join(path);
        std::fs::read_to_string(&full).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => SourceError::FileNotFound { path: full },
            _ => SourceError::Io { path: full, source },
        })
    }
}

/// Read-only templates compiled into the binary.
///
/// A packaged source cannot represent an empty directory, so listing a
/// directory without entries yields an empty list rather than an error.
#[derive(Debug, Clone, Default)]
pub struct EmbeddedSource {
    files: BTreeMap<String, String>,
}

impl EmbeddedSource {
    /// Creates an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a source from `(path, content)` pairs.
    ///
    /// Paths are normalized to `/` separators without a leading `./` or `/`.
    pub fn from_entries(entries: &[(&str, &str)]) -> Self {
        let mut source = Self::new();
        for (path, content) in entries {
            source = source.with_file(*path, *content);
        }
        source
    }

    /// Adds (or replaces) one file.
    pub fn with_file(mut self, path: impl AsRef<str>, content: impl Into<String>) -> Self {
        self.files.insert(normalize(path.as_ref()), content.into());
        self
    }

    /// Number of embedded files.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Returns true if nothing is embedded.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl TemplateSource for EmbeddedSource {
    fn list(&self, dir: &str, extension: &str) -> Result<Vec<String>, SourceError> {
        let dir = normalize(dir);
        let prefix = if dir.is_empty() {
            String::new()
        } else {
            format!("{}/", dir)
        };
        // BTreeMap iteration keeps the result sorted.
        Ok(self
            .files
            .keys()
            .filter(|path| {
                path.strip_prefix(&prefix)
                    .is_some_and(|rest| !rest.contains('/') && rest.ends_with(extension))
            })
            .cloned()
            .collect())
    }

    fn read(&self, path: &str) -> Result<String, SourceError> {
        self.files
            .get(&normalize(path))
            .cloned()
            .ok_or_else(|| SourceError::FileNotFound {
                path: PathBuf::from(path),
            })
    }
}

fn join(dir: &str, name: &str) -> String {
    let dir = normalize(dir);
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", dir, name)
    }
}

fn normalize(path: &str) -> String {
    let path = path.replace('\\', "/");
    let trimmed = path.trim_start_matches("./").trim_matches('/');
    trimmed.to_string()
}
