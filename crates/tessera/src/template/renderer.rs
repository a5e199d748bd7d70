//! The template engine.
//!
//! [`Templates`] owns a template source, the configuration and the current
//! [`Registry`]. Renders resolve a name to a composite key, look the unit up
//! in a snapshot of the registry and execute it.
//!
//! # Example
//!
//! ```rust
//! use tessera::{EmbeddedSource, RenderContext, Templates};
//! use serde_json::json;
//!
//! let templates = Templates::new(EmbeddedSource::from_entries(&[
//!     ("layouts/application.html", "{% block layout %}<main>{% include 'page' %}</main>{% endblock %}"),
//!     ("layouts/bare.html", "{% block layout %}{% include 'page' %}{% endblock %}"),
//!     ("pages/hello.html", "{% block page %}Hello {{ name }}{% endblock %}"),
//! ])).unwrap();
//! templates.parse_templates().unwrap();
//!
//! let out = templates.execute_template_as_string(None, "hello", &json!({"name": "<you>"})).unwrap();
//! assert_eq!(out, "<main>Hello &lt;you&gt;</main>");
//!
//! let ctx = RenderContext::new().with_layout("bare");
//! let out = templates.execute_template_as_string(Some(&ctx), "hello", &json!({"name": "x"})).unwrap();
//! assert_eq!(out, "Hello x");
//! ```
//!
//! # Reloading
//!
//! With `always_reload` set, each render first rebuilds the registry so that
//! edits on disk show up immediately. Rebuilds are serialized. A render that
//! finds a rebuild already running uses the registry that is live at that
//! moment instead of waiting. A failed rebuild keeps the previous registry.
//!
//! In static mode renders only take a brief read lock to clone the registry
//! handle.

use std::collections::BTreeMap;
use std::io;
use std::sync::{Arc, Mutex, PoisonError, RwLock, TryLockError};

use minijinja::functions::Function;
use minijinja::value::{FunctionArgs, FunctionResult};
use minijinja::Value;
use serde::Serialize;

use super::compiler::Compiler;
use super::functions::FunctionTable;
use super::registry::Registry;
use super::resolve::resolve;
use crate::config::TemplatesConfig;
use crate::context::RenderContext;
use crate::error::Error;
use crate::source::TemplateSource;
use crate::trusted::TrustedValue;

/// Builder for [`Templates`].
pub struct TemplatesBuilder {
    source: Box<dyn TemplateSource>,
    config: TemplatesConfig,
    functions: BTreeMap<String, Value>,
}

impl TemplatesBuilder {
    /// Replaces the configuration.
    pub fn config(mut self, config: TemplatesConfig) -> Self {
        self.config = config;
        self
    }

    /// Adds a function callable from every template.
    ///
    /// ```rust
    /// use tessera::{EmbeddedSource, Templates};
    ///
    /// let templates = Templates::builder(EmbeddedSource::new())
    ///     .function("shout", |s: String| s.to_uppercase())
    ///     .build()
    ///     .unwrap();
    /// ```
    pub fn function<F, Rv, Args>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Function<Rv, Args>,
        Rv: FunctionResult,
        Args: for<'a> FunctionArgs<'a>,
    {
        self.functions.insert(name.into(), Value::from_function(f));
        self
    }

    /// Adds a constant value visible in every template.
    pub fn global(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.functions.insert(name.into(), value.into());
        self
    }

    /// Creates the engine. Templates are not read until
    /// [`Templates::parse_templates`] (or a reloading render) runs.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateHelper`] if helpers are enabled and a
    /// registered function uses a helper name.
    pub fn build(self) -> Result<Templates, Error> {
        let functions = FunctionTable::new(self.functions, &self.config)?;
        Ok(Templates {
            config: self.config,
            source: self.source,
            functions,
            registry: RwLock::new(Arc::new(Registry::empty())),
            rebuild_lock: Mutex::new(()),
        })
    }
}

/// Composed template engine.
pub struct Templates {
    config: TemplatesConfig,
    source: Box<dyn TemplateSource>,
    functions: FunctionTable,
    registry: RwLock<Arc<Registry>>,
    rebuild_lock: Mutex<()>,
}

impl std::fmt::Debug for Templates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Templates")
            .field("config", &self.config)
            .field("registry", &self.registry())
            .finish_non_exhaustive()
    }
}

impl Templates {
    /// Starts building an engine over `source`.
    pub fn builder(source: impl TemplateSource + 'static) -> TemplatesBuilder {
        TemplatesBuilder {
            source: Box::new(source),
            config: TemplatesConfig::default(),
            functions: BTreeMap::new(),
        }
    }

    /// Creates an engine with the default configuration and no caller
    /// functions.
    pub fn new(source: impl TemplateSource + 'static) -> Result<Self, Error> {
        Self::builder(source).build()
    }

    /// The engine configuration.
    pub fn config(&self) -> &TemplatesConfig {
        &self.config
    }

    /// A handle to the registry that is live right now.
    pub fn registry(&self) -> Arc<Registry> {
        self.registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Builds a new registry from the source and installs it.
    ///
    /// Blocks while another rebuild is running. On failure the previous
    /// registry stays live.
    ///
    /// # Errors
    ///
    /// Any build error: missing directories, [`Error::NoLayouts`],
    /// [`Error::BlockNameMismatch`], [`Error::DuplicateBlock`] or
    /// [`Error::Syntax`].
    pub fn parse_templates(&self) -> Result<(), Error> {
        let _guard = self
            .rebuild_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        self.rebuild()
    }

    /// Like [`parse_templates`](Self::parse_templates), but logs and panics
    /// on failure. Meant for application startup.
    pub fn must_parse_templates(&self) {
        if let Err(err) = self.parse_templates() {
            tracing::error!(error = %err, "failed to parse templates");
            panic!("failed to parse templates: {}", err);
        }
    }

    // Callers must hold `rebuild_lock`.
    fn rebuild(&self) -> Result<(), Error> {
        let registry = Compiler {
            config: &self.config,
            source: self.source.as_ref(),
            functions: &self.functions,
        }
        .build()?;
        tracing::debug!(units = registry.len(), "template registry rebuilt");
        *self
            .registry
            .write()
            .unwrap_or_else(PoisonError::into_inner) = registry;
        Ok(())
    }

    fn reload_for_render(&self) -> Result<(), Error> {
        if !self.config.always_reload {
            return Ok(());
        }
        let _guard = match self.rebuild_lock.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => {
                tracing::trace!("rebuild in progress, rendering with current registry");
                return Ok(());
            }
        };
        self.rebuild()
    }

    /// Renders `name` with `data` into `out`.
    ///
    /// The name is resolved as follows:
    ///
    /// - `_block` renders a standalone block
    /// - `:page` renders a page without layout
    /// - `layout:page` renders a page inside the given layout
    /// - `page` renders a page inside the context's layout, or the default
    ///
    /// # Errors
    ///
    /// - a rebuild error, when `always_reload` is set
    /// - [`Error::NotFound`] with the computed key
    /// - [`Error::Execution`] if rendering fails
    pub fn execute_template<W, S>(
        &self,
        out: W,
        ctx: Option<&RenderContext>,
        name: &str,
        data: &S,
    ) -> Result<(), Error>
    where
        W: io::Write,
        S: Serialize + ?Sized,
    {
        self.reload_for_render()?;
        let registry = self.registry();
        let resolved = resolve(
            name,
            ctx.and_then(|c| c.layout()),
            &self.config.default_layout,
        );
        tracing::trace!(name, key = %resolved.key, entry = %resolved.entry, "rendering template");
        let unit = registry.lookup(&resolved.key)?;
        unit.execute(&resolved.entry, &Value::from_serialize(data), out)
    }

    /// Renders `name` into a string. See [`execute_template`](Self::execute_template).
    pub fn execute_template_as_string<S>(
        &self,
        ctx: Option<&RenderContext>,
        name: &str,
        data: &S,
    ) -> Result<String, Error>
    where
        S: Serialize + ?Sized,
    {
        let mut buf = Vec::new();
        self.execute_template(&mut buf, ctx, name, data)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// Renders a standalone block (`_name`) and returns it as trusted HTML,
    /// ready to embed into another render without double escaping.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidBlockName`], [`Error::NotFound`] or
    /// [`Error::Execution`].
    pub fn render_block_as_html<S>(&self, name: &str, data: &S) -> Result<TrustedValue, Error>
    where
        S: Serialize + ?Sized,
    {
        self.registry()
            .render_block_as_html(name, &Value::from_serialize(data))
    }

    /// Sorted keys of the live registry.
    pub fn parsed_templates(&self) -> Vec<String> {
        self.registry().keys()
    }

    /// Returns a handler that renders `name` with fixed `data`.
    ///
    /// Failures are logged, not returned.
    pub fn render_handler<S>(
        self: &Arc<Self>,
        name: impl Into<String>,
        data: &S,
    ) -> impl Fn(&mut dyn io::Write, Option<&RenderContext>) + Send + Sync + 'static
    where
        S: Serialize + ?Sized,
    {
        let templates = Arc::clone(self);
        let name = name.into();
        let data = Value::from_serialize(data);
        move |out: &mut dyn io::Write, ctx: Option<&RenderContext>| {
            templates.handle(out, ctx, &name, &data);
        }
    }

    /// Returns a handler that renders `name` with the data attached to the
    /// render context, or `none` when there is none.
    ///
    /// Failures are logged, not returned.
    pub fn render_handler_from_context(
        self: &Arc<Self>,
        name: impl Into<String>,
    ) -> impl Fn(&mut dyn io::Write, Option<&RenderContext>) + Send + Sync + 'static {
        let templates = Arc::clone(self);
        let name = name.into();
        move |out: &mut dyn io::Write, ctx: Option<&RenderContext>| {
            let data = ctx
                .and_then(|c| c.data())
                .cloned()
                .unwrap_or_else(|| Value::from(()));
            templates.handle(out, ctx, &name, &data);
        }
    }

    fn handle(&self, out: &mut dyn io::Write, ctx: Option<&RenderContext>, name: &str, data: &Value) {
        if let Err(err) = self.execute_template(out, ctx, name, data) {
            tracing::error!(error = %err, template_name = name, "failed to execute template");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::EmbeddedSource;
    use serde_json::json;

    fn source() -> EmbeddedSource {
        EmbeddedSource::from_entries(&[
            (
                "layouts/application.html",
                "{% block layout %}[app]{% include 'page' %}{% endblock %}",
            ),
            ("pages/home.html", "{% block page %}home {{ n }}{% endblock %}"),
        ])
    }

    #[test]
    fn test_unparsed_engine_has_no_templates() {
        let templates = Templates::new(source()).unwrap();
        assert!(templates.parsed_templates().is_empty());
        let err = templates
            .execute_template_as_string(None, "home", &json!({}))
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[test]
    fn test_execute_template() {
        let templates = Templates::new(source()).unwrap();
        templates.parse_templates().unwrap();
        let out = templates
            .execute_template_as_string(None, "home", &json!({"n": 1}))
            .unwrap();
        assert_eq!(out, "[app]home 1");
    }

    #[test]
    fn test_render_skips_rebuild_while_one_is_running() {
        let dir = tempfile::TempDir::new().unwrap();
        let write = |path: &str, content: &str| {
            let full = dir.path().join(path);
            std::fs::create_dir_all(full.parent().unwrap()).unwrap();
            std::fs::write(full, content).unwrap();
        };
        write(
            "layouts/application.html",
            "{% block layout %}{% include 'page' %}{% endblock %}",
        );
        write("pages/home.html", "{% block page %}old{% endblock %}");
        std::fs::create_dir(dir.path().join("blocks")).unwrap();

        let templates = Templates::builder(crate::source::DirSource::new(dir.path()))
            .config(TemplatesConfig::new().with_always_reload(true))
            .build()
            .unwrap();
        templates.parse_templates().unwrap();
        write("pages/home.html", "{% block page %}new{% endblock %}");

        let guard = templates.rebuild_lock.lock().unwrap();
        let out = templates
            .execute_template_as_string(None, "home", &json!({}))
            .unwrap();
        assert_eq!(out, "old");
        drop(guard);

        let out = templates
            .execute_template_as_string(None, "home", &json!({}))
            .unwrap();
        assert_eq!(out, "new");
    }

    #[test]
    fn test_duplicate_helper_fails_build() {
        let err = Templates::builder(source())
            .global("d_block", 1)
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateHelper { .. }));
    }

    #[test]
    fn test_caller_function() {
        let source = source().with_file(
            "pages/shout.html",
            "{% block page %}{{ shout('hi') }}{% endblock %}",
        );
        let templates = Templates::builder(source)
            .function("shout", |s: String| s.to_uppercase())
            .build()
            .unwrap();
        templates.parse_templates().unwrap();
        let out = templates
            .execute_template_as_string(None, ":shout", &json!(null))
            .unwrap();
        assert_eq!(out, "HI");
    }

    #[test]
    fn test_render_handler_writes_output() {
        let templates = Arc::new(Templates::new(source()).unwrap());
        templates.parse_templates().unwrap();
        let handler = templates.render_handler("home", &json!({"n": 2}));

        let mut buf: Vec<u8> = Vec::new();
        let out: &mut dyn io::Write = &mut buf;
        handler(out, None);
        assert_eq!(String::from_utf8(buf).unwrap(), "[app]home 2");
    }

    #[test]
    fn test_render_handler_from_context() {
        let templates = Arc::new(Templates::new(source()).unwrap());
        templates.parse_templates().unwrap();
        let handler = templates.render_handler_from_context(":home");

        let ctx = RenderContext::new().with_serialized_data(&json!({"n": 9}));
        let mut buf: Vec<u8> = Vec::new();
        let out: &mut dyn io::Write = &mut buf;
        handler(out, Some(&ctx));
        assert_eq!(String::from_utf8(buf).unwrap(), "home 9");
    }

    #[test]
    #[should_panic(expected = "failed to parse templates")]
    fn test_must_parse_templates_panics() {
        let templates = Templates::new(EmbeddedSource::new()).unwrap();
        templates.must_parse_templates();
    }
}
