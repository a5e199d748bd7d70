//! # Tessera - Composed HTML Templates
//!
//! `tessera` renders server-side HTML from three kinds of template files:
//! layouts (document shells), pages (per-screen content) and blocks
//! (reusable partials). Every layout × page combination is precompiled into
//! its own unit so a render is a single lookup plus one execution.
//!
//! ## Core Concepts
//!
//! - [`Templates`]: the engine; builds the registry and renders by name
//! - [`TemplateSource`]: where template files come from ([`DirSource`],
//!   [`EmbeddedSource`])
//! - [`TemplatesConfig`]: directories, default layout, reload and escaping
//! - [`RenderContext`]: per-request layout override
//! - [`TrustedValue`]: content that bypasses auto-escaping
//!
//! ## Quick Start
//!
//! ```rust
//! use tessera::{EmbeddedSource, Templates};
//! use serde_json::json;
//!
//! let source = EmbeddedSource::from_entries(&[
//!     ("layouts/application.html", r#"{% block layout %}<html>{% include "page" %}</html>{% endblock %}"#),
//!     ("pages/profile.html", r#"{% block page %}{{ d_block("_avatar", user) }}{% endblock %}"#),
//!     ("blocks/avatar.html", r#"{% block _avatar %}<img alt="{{ name }}">{% endblock %}"#),
//! ]);
//!
//! let templates = Templates::new(source).unwrap();
//! templates.parse_templates().unwrap();
//!
//! let html = templates
//!     .execute_template_as_string(None, "profile", &json!({"user": {"name": "Ada & co"}}))
//!     .unwrap();
//! assert_eq!(html, r#"<html><img alt="Ada &amp; co"></html>"#);
//! ```
//!
//! ## Template Helpers
//!
//! Unless `add_helpers` is turned off, every template can call:
//!
//! - `d_block(name, data)`: render the block `name`, chosen at runtime
//! - `locals(k1, v1, ...)` and `references(k1, v1, ...)`: build argument maps
//! - `trusted_html(v)` and the other `trusted_*` converters: emit `v`
//!   without escaping; `*_ctx` variants also write an audit log entry
//!
//! ## Logging
//!
//! The crate logs through [`tracing`]. Install any subscriber to see build
//! progress (`debug`/`trace`), trusted-content audits (`info`) and handler
//! failures (`error`).

pub mod config;
pub mod context;
mod error;
pub mod prelude;
pub mod source;
pub mod template;
pub mod trusted;
pub mod util;

pub use config::{TemplatesConfig, DEFAULT_EXTENSION, DEFAULT_LAYOUT};
pub use context::{RenderContext, REQUESTED_WITH_AJAX};
pub use error::{Error, ErrorKind, InvalidNameReason};
pub use source::{DirSource, EmbeddedSource, SourceError, TemplateSource};
pub use template::{
    helper_names, CompiledUnit, NameShape, Reference, Registry, ResolvedName, Templates,
    TemplatesBuilder,
};
pub use trusted::{
    trusted, trusted_html, trusted_identifier, trusted_resource_url, trusted_script,
    trusted_style, trusted_stylesheet, trusted_url, TrustedKind, TrustedValue,
};
