//! Template composition: compiling layouts, pages and blocks into units and
//! rendering them.
//!
//! ## Template Files
//!
//! Templates live in three directories of a [`TemplateSource`](crate::TemplateSource):
//!
//! | Directory | Defines | Example |
//! |-----------|---------|---------|
//! | `layouts/` | `layout` | `{% block layout %}<body>{% include 'page' %}</body>{% endblock %}` |
//! | `pages/` | `page` | `{% block page %}<h1>{{ title }}</h1>{% endblock %}` |
//! | `blocks/` | `_<filename>` | `{% block _card %}<div>{{ text }}</div>{% endblock %}` |
//!
//! Only top-level `{% block %}` definitions are kept (see [`definitions`]).
//! Inside a unit every definition can include the others by name, so pages
//! include blocks with `{% include '_card' %}` and layouts include the page
//! with `{% include 'page' %}`.
//!
//! ## Rendering
//!
//! | Name | Renders |
//! |------|---------|
//! | `home` | page `home` in the context or default layout |
//! | `special:home` | page `home` in layout `special` |
//! | `:home` | page `home` without layout |
//! | `_card` | block `card` alone |
//!
//! ## Key Types
//!
//! - [`Templates`]: the engine
//! - [`Registry`]: an immutable set of compiled units
//! - [`resolve`](resolve::resolve): name to key mapping

pub mod definitions;
mod compiler;
mod functions;
pub mod helpers;
pub mod registry;
mod renderer;
pub mod resolve;

pub use functions::{helper_names, D_BLOCK, D_BLOCK_CTX, LOCALS, REFERENCES};
pub use helpers::{locals, references, Reference};
pub use registry::{CompiledUnit, Registry, TemplateFile, TemplateKind, MAX_BLOCK_NAME_LEN};
pub use renderer::{Templates, TemplatesBuilder};
pub use resolve::{resolve, NameShape, ResolvedName};
