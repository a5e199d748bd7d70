//! Error types for building and rendering composed templates.
//!
//! This module provides [`Error`], the single error type returned by every
//! fallible operation in the crate, and [`ErrorKind`], a coarse classifier
//! that groups variants by how callers are expected to react:
//!
//! | Kind | Raised by | Recoverable |
//! |------|-----------|-------------|
//! | [`ErrorKind::Configuration`] | engine setup | no, halt startup |
//! | [`ErrorKind::Build`] | registry (re)build | previous registry stays live |
//! | [`ErrorKind::NotFound`] | render | yes |
//! | [`ErrorKind::InvalidName`] | dynamic block dispatch | yes |
//! | [`ErrorKind::Execution`] | render | yes |
//!
//! Errors coming from the underlying template engine are kept as sources so
//! the full minijinja diagnostic (file, line, detail) is still reachable.

use std::fmt;
use std::path::PathBuf;

use crate::source::SourceError;

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Setup mistake (duplicate helper name, unreadable config).
    Configuration,
    /// A registry build failed.
    Build,
    /// The requested composite key is not in the registry.
    NotFound,
    /// A dynamically dispatched block name was rejected.
    InvalidName,
    /// Evaluating a compiled unit against data failed.
    Execution,
}

/// Why a block name was rejected by the dynamic dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidNameReason {
    /// The name does not start with `_`.
    MissingPrefix,
    /// The name is longer than the allowed maximum.
    TooLong {
        /// Length of the rejected name in bytes.
        len: usize,
        /// The allowed maximum.
        max: usize,
    },
}

impl fmt::Display for InvalidNameReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidNameReason::MissingPrefix => write!(f, "block name needs to start with _"),
            InvalidNameReason::TooLong { len, max } => write!(
                f,
                "block name is {} characters long, must not exceed {}",
                len, max
            ),
        }
    }
}

/// Error type for template composition and rendering.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A caller-supplied function uses a reserved helper name.
    #[error("function name {name:?} is already in use in the function table")]
    DuplicateHelper {
        /// The conflicting name.
        name: String,
    },

    /// Configuration could not be parsed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Listing or reading template files failed.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// The layouts directory contains no template files.
    #[error("you need at least one layout")]
    NoLayouts,

    /// A block file does not define the block its filename promises.
    #[error(
        "block file {} must define {expected:?} but the filename doesn't match a definition within the file (found: {found:?})",
        .file.display()
    )]
    BlockNameMismatch {
        /// The offending file.
        file: PathBuf,
        /// The definition name derived from the filename.
        expected: String,
        /// Definition names actually found in the file.
        found: Vec<String>,
    },

    /// Two block files resolve to the same registry key.
    #[error("block already defined as key {key:?} (while compiling {})", .file.display())]
    DuplicateBlock {
        /// The duplicated key.
        key: String,
        /// The file that tried to register it a second time.
        file: PathBuf,
    },

    /// A template file failed to parse.
    #[error("{file}: {source}")]
    Syntax {
        /// The file (or unit) being compiled.
        file: String,
        /// The underlying parse error.
        #[source]
        source: minijinja::Error,
    },

    /// The composite key is not present in the registry.
    #[error("template: name not found -> {key}")]
    NotFound {
        /// The exact key that was looked up.
        key: String,
    },

    /// The dynamic dispatcher rejected a block name.
    #[error("invalid block name {name:?}: {reason}")]
    InvalidBlockName {
        /// The rejected name.
        name: String,
        /// Why it was rejected.
        reason: InvalidNameReason,
    },

    /// A compiled unit failed while executing against data.
    #[error("executing {key}: {source}")]
    Execution {
        /// The registry key of the unit being executed.
        key: String,
        /// The underlying evaluation error.
        #[source]
        source: minijinja::Error,
    },
}

impl Error {
    /// Returns the taxonomy bucket this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::DuplicateHelper { .. } | Error::InvalidConfig(_) => ErrorKind::Configuration,
            Error::Source(_)
            | Error::NoLayouts
            | Error::BlockNameMismatch { .. }
            | Error::DuplicateBlock { .. }
            | Error::Syntax { .. } => ErrorKind::Build,
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::InvalidBlockName { .. } => ErrorKind::InvalidName,
            Error::Execution { .. } => ErrorKind::Execution,
        }
    }

    pub(crate) fn not_found(key: impl Into<String>) -> Self {
        Error::NotFound { key: key.into() }
    }

    pub(crate) fn syntax(file: impl Into<String>, source: minijinja::Error) -> Self {
        Error::Syntax {
            file: file.into(),
            source,
        }
    }

    pub(crate) fn execution(key: impl Into<String>, source: minijinja::Error) -> Self {
        Error::Execution {
            key: key.into(),
            source,
        }
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::InvalidConfig(err.to_string())
    }
}

// Errors surfacing from inside template evaluation (e.g. `d_block`) have to
// travel through minijinja, so they are wrapped and kept as the source.
impl From<Error> for minijinja::Error {
    fn from(err: Error) -> Self {
        let kind = match err.kind() {
            ErrorKind::NotFound => minijinja::ErrorKind::TemplateNotFound,
            _ => minijinja::ErrorKind::InvalidOperation,
        };
        minijinja::Error::new(kind, err.to_string()).with_source(err)
    }
}
