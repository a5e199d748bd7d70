//! Compiled template registry.
//!
//! A [`Registry`] maps composite keys to [`CompiledUnit`]s. It is produced
//! in one piece by the compiler and never modified afterwards; a rebuild
//! creates a new registry which replaces the old one wholesale.
//!
//! # Composite Keys
//!
//! | Key | Contents of the unit | Entry point |
//! |-----|----------------------|-------------|
//! | `"<layout>:<page>"` | all blocks, the page, the layout | `layout` |
//! | `":<page>"` | all blocks, the page | `page` |
//! | `"_<block>"` | that block file only | `_<block>` |
//!
//! # Example
//!
//! ```rust
//! use tessera::{EmbeddedSource, Templates};
//!
//! let templates = Templates::new(EmbeddedSource::from_entries(&[
//!     ("layouts/application.html", "{% block layout %}[{% include 'page' %}]{% endblock %}"),
//!     ("pages/home.html", "{% block page %}home{% endblock %}"),
//!     ("blocks/header.html", "{% block _header %}header{% endblock %}"),
//! ])).unwrap();
//! templates.parse_templates().unwrap();
//!
//! let registry = templates.registry();
//! assert_eq!(registry.keys(), vec![":home", "_header", "application:home"]);
//! ```

use std::collections::HashMap;
use std::io;
use std::path::PathBuf;

use minijinja::{Environment, Value};

use super::definitions::Definition;
use crate::error::{Error, InvalidNameReason};
use crate::trusted::{TrustedKind, TrustedValue};

/// Longest block name accepted by the dynamic dispatcher.
pub const MAX_BLOCK_NAME_LEN: usize = 255;

/// Which directory a template file came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateKind {
    /// Document shell wrapping pages.
    Layout,
    /// Body content of one screen.
    Page,
    /// Reusable partial.
    Block,
}

/// A template file read during a build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateFile {
    /// Path as handed out by the source (e.g. `"blocks/header.html"`).
    pub path: PathBuf,
    /// Layout, page or block.
    pub kind: TemplateKind,
    /// Filename without extension (e.g. `"header"`).
    pub name: String,
    /// Top-level definitions found in the file.
    pub definitions: Vec<Definition>,
}

impl TemplateFile {
    /// Creates a file descriptor, deriving the logical name from `path`.
    pub fn new(
        path: impl Into<PathBuf>,
        kind: TemplateKind,
        extension: &str,
        definitions: Vec<Definition>,
    ) -> Self {
        let path = path.into();
        let name = logical_name(&path, extension);
        Self {
            path,
            kind,
            name,
            definitions,
        }
    }

    /// The registry key a block file is expected to occupy: its name with
    /// a leading `_`, added if the filename lacks one.
    pub fn block_key(&self) -> String {
        if self.name.starts_with('_') {
            self.name.clone()
        } else {
            format!("_{}", self.name)
        }
    }

    /// Returns true if the file defines `name` at top level.
    pub fn defines(&self, name: &str) -> bool {
        self.definitions.iter().any(|d| d.name == name)
    }

    /// Names of all top-level definitions, in file order.
    pub fn definition_names(&self) -> Vec<String> {
        self.definitions.iter().map(|d| d.name.clone()).collect()
    }
}

/// Strips directories and the template extension from a path.
fn logical_name(path: &std::path::Path, extension: &str) -> String {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    match file_name.strip_suffix(extension) {
        Some(stem) if !extension.is_empty() => stem.to_string(),
        _ => path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or(file_name),
    }
}

/// One executable unit: a minijinja environment holding every definition
/// of the files it was compiled from, plus the shared function table.
pub struct CompiledUnit {
    key: String,
    env: Environment<'static>,
    entry_points: Vec<String>,
}

impl std::fmt::Debug for CompiledUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledUnit")
            .field("key", &self.key)
            .field("entry_points", &self.entry_points)
            .finish()
    }
}

impl CompiledUnit {
    pub(crate) fn new(
        key: impl Into<String>,
        env: Environment<'static>,
        entry_points: Vec<String>,
    ) -> Self {
        Self {
            key: key.into(),
            env,
            entry_points,
        }
    }

    /// The registry key of this unit.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Names of every definition compiled into this unit.
    pub fn entry_points(&self) -> &[String] {
        &self.entry_points
    }

    /// Executes entry point `entry` with `data`, writing into `out`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Execution`] if the entry point is missing or
    /// evaluation fails.
    pub fn execute<W: io::Write>(&self, entry: &str, data: &Value, out: W) -> Result<(), Error> {
        let template = self
            .env
            .get_template(entry)
            .map_err(|e| Error::execution(&self.key, e))?;
        template
            .render_captured_to(data, out)
            .map_err(|e| Error::execution(&self.key, e))?;
        Ok(())
    }

    /// Executes entry point `entry` with `data` into a new string.
    pub fn execute_to_string(&self, entry: &str, data: &Value) -> Result<String, Error> {
        let template = self
            .env
            .get_template(entry)
            .map_err(|e| Error::execution(&self.key, e))?;
        template
            .render(data)
            .map_err(|e| Error::execution(&self.key, e))
    }
}

/// Immutable mapping from composite key to compiled unit.
#[derive(Debug, Default)]
pub struct Registry {
    units: HashMap<String, CompiledUnit>,
}

impl Registry {
    /// Creates a registry with no units.
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, unit: CompiledUnit) {
        self.units.insert(unit.key.clone(), unit);
    }

    /// Returns the unit stored under `key`, if any.
    pub fn get(&self, key: &str) -> Option<&CompiledUnit> {
        self.units.get(key)
    }

    /// Returns the unit stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] carrying `key` verbatim.
    pub fn lookup(&self, key: &str) -> Result<&CompiledUnit, Error> {
        self.units.get(key).ok_or_else(|| Error::not_found(key))
    }

    /// Returns true if `key` is registered.
    pub fn contains(&self, key: &str) -> bool {
        self.units.contains_key(key)
    }

    /// All registered keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.units.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Number of compiled units.
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Returns true if the registry holds no units.
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Renders a standalone block and marks the output as trusted HTML.
    ///
    /// The output is the escaped result of a full template execution, so
    /// escaping it again would double-escape.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidBlockName`] if `name` lacks the `_` prefix or is
    ///   longer than [`MAX_BLOCK_NAME_LEN`]
    /// - [`Error::NotFound`] if no such block is registered
    /// - [`Error::Execution`] if the block fails to render
    pub fn render_block_as_html(&self, name: &str, data: &Value) -> Result<TrustedValue, Error> {
        if !name.starts_with('_') {
            return Err(Error::InvalidBlockName {
                name: name.to_string(),
                reason: InvalidNameReason::MissingPrefix,
            });
        }
        if name.len() > MAX_BLOCK_NAME_LEN {
            return Err(Error::InvalidBlockName {
                name: name.to_string(),
                reason: InvalidNameReason::TooLong {
                    len: name.len(),
                    max: MAX_BLOCK_NAME_LEN,
                },
            });
        }
        let unit = self.lookup(name)?;
        let html = unit.execute_to_string(name, data)?;
        Ok(TrustedValue::assume_trusted(TrustedKind::Html, html))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(key: &str, templates: &[(&str, &str)]) -> CompiledUnit {
        let mut env = Environment::new();
        env.set_auto_escape_callback(|_| minijinja::AutoEscape::Html);
        for (name, source) in templates {
            env.add_template_owned(name.to_string(), source.to_string())
                .unwrap();
        }
        let entries = templates.iter().map(|(n, _)| n.to_string()).collect();
        CompiledUnit::new(key, env, entries)
    }

    fn registry() -> Registry {
        let mut registry = Registry::empty();
        registry.insert(unit("_card", &[("_card", "<b>{{ title }}</b>")]));
        registry.insert(unit(
            ":home",
            &[("_card", "card"), ("page", "Home {% include '_card' %}")],
        ));
        registry
    }

    #[test]
    fn test_logical_name() {
        let file = TemplateFile::new("blocks/header.html", TemplateKind::Block, ".html", vec![]);
        assert_eq!(file.name, "header");
        assert_eq!(file.block_key(), "_header");

        let file = TemplateFile::new("blocks/_nav.html", TemplateKind::Block, ".html", vec![]);
        assert_eq!(file.block_key(), "_nav");

        let file = TemplateFile::new("pages/home.tpl", TemplateKind::Page, ".html", vec![]);
        assert_eq!(file.name, "home");
    }

    #[test]
    fn test_lookup_miss_carries_key() {
        let registry = registry();
        match registry.lookup("application:nope") {
            Err(Error::NotFound { key }) => assert_eq!(key, "application:nope"),
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_keys_sorted() {
        assert_eq!(registry().keys(), vec![":home", "_card"]);
    }

    #[test]
    fn test_execute_page_entry() {
        let registry = registry();
        let unit = registry.lookup(":home").unwrap();
        let out = unit.execute_to_string("page", &Value::from(())).unwrap();
        assert_eq!(out, "Home card");
    }

    #[test]
    fn test_execute_into_writer() {
        let registry = registry();
        let mut buf = Vec::new();
        registry
            .lookup(":home")
            .unwrap()
            .execute("page", &Value::from(()), &mut buf)
            .unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "Home card");
    }

    #[test]
    fn test_missing_entry_is_execution_error() {
        let registry = registry();
        let err = registry
            .lookup(":home")
            .unwrap()
            .execute_to_string("layout", &Value::from(()))
            .unwrap_err();
        assert!(matches!(err, Error::Execution { .. }));
    }

    #[test]
    fn test_render_block_as_html_escapes_once() {
        let registry = registry();
        let data = Value::from_serialize(serde_json::json!({"title": "<i>"}));
        let html = registry.render_block_as_html("_card", &data).unwrap();
        assert_eq!(html.kind(), TrustedKind::Html);
        assert_eq!(html.as_str(), "<b>&lt;i&gt;</b>");
    }

    #[test]
    fn test_render_block_as_html_rejects_bad_names() {
        let registry = registry();
        let none = Value::from(());

        let err = registry.render_block_as_html("card", &none).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidBlockName {
                reason: InvalidNameReason::MissingPrefix,
                ..
            }
        ));

        let long = format!("_{}", "a".repeat(MAX_BLOCK_NAME_LEN));
        let err = registry.render_block_as_html(&long, &none).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidBlockName {
                reason: InvalidNameReason::TooLong { len: 256, .. },
                ..
            }
        ));

        let err = registry.render_block_as_html("_", &none).unwrap_err();
        assert!(matches!(err, Error::NotFound { ref key } if key == "_"));
    }
}
