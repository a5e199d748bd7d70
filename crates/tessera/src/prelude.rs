//! Convenient imports for applications.
//!
//! ```rust
//! use tessera::prelude::*;
//!
//! let templates = Templates::builder(EmbeddedSource::new())
//!     .config(TemplatesConfig::new().with_always_reload(true))
//!     .build()
//!     .unwrap();
//! assert!(templates.config().always_reload);
//! ```

pub use crate::config::TemplatesConfig;
pub use crate::context::RenderContext;
pub use crate::error::Error;
pub use crate::source::{DirSource, EmbeddedSource, TemplateSource};
pub use crate::template::Templates;
pub use crate::trusted::{TrustedKind, TrustedValue};
