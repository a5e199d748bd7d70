//! Engine configuration.
//!
//! [`TemplatesConfig`] carries every knob of the engine. It can be built in
//! code with the `with_*` setters or loaded from YAML:
//!
//! ```rust
//! use tessera::TemplatesConfig;
//!
//! let config = TemplatesConfig::from_yaml(r#"
//! default_layout: site
//! extension: .jinja
//! always_reload: true
//! "#).unwrap();
//!
//! assert_eq!(config.default_layout, "site");
//! assert_eq!(config.pages_dir, "pages");
//! ```

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Default layout used when a render name carries none.
pub const DEFAULT_LAYOUT: &str = "application";

/// Default template file extension.
pub const DEFAULT_EXTENSION: &str = ".html";

/// Settings for a [`Templates`](crate::Templates) engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplatesConfig {
    /// Layout used for bare page names when no contextual override is set.
    pub default_layout: String,

    /// Extension (including the dot) of template files.
    pub extension: String,

    /// Directory holding layouts, relative to the source root.
    pub layouts_dir: String,

    /// Directory holding pages, relative to the source root.
    pub pages_dir: String,

    /// Directory holding blocks, relative to the source root.
    pub blocks_dir: String,

    /// Rebuild the registry before every render (development mode).
    pub always_reload: bool,

    /// Inject `d_block`, `locals`, `references` and the `trusted_*` helpers.
    pub add_helpers: bool,

    /// Turn off HTML auto-escaping; trusted converters become pass-through.
    pub disable_escaping: bool,

    /// Silence the audit log of the `*_ctx` trusted helpers.
    pub disable_trusted_log: bool,
}

impl Default for TemplatesConfig {
    fn default() -> Self {
        Self {
            default_layout: DEFAULT_LAYOUT.to_string(),
            extension: DEFAULT_EXTENSION.to_string(),
            layouts_dir: "layouts".to_string(),
            pages_dir: "pages".to_string(),
            blocks_dir: "blocks".to_string(),
            always_reload: false,
            add_helpers: true,
            disable_escaping: false,
            disable_trusted_log: false,
        }
    }
}

impl TemplatesConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a configuration from YAML. Missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the YAML is malformed or has
    /// values of the wrong type.
    pub fn from_yaml(yaml: &str) -> Result<Self, Error> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Sets the default layout.
    pub fn with_default_layout(mut self, layout: impl Into<String>) -> Self {
        self.default_layout = layout.into();
        self
    }

    /// Sets the template file extension.
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// Sets the layouts, pages and blocks directories.
    pub fn with_dirs(
        mut self,
        layouts: impl Into<String>,
        pages: impl Into<String>,
        blocks: impl Into<String>,
    ) -> Self {
        self.layouts_dir = layouts.into();
        self.pages_dir = pages.into();
        self.blocks_dir = blocks.into();
        self
    }

    /// Enables or disables rebuild-before-render.
    pub fn with_always_reload(mut self, always_reload: bool) -> Self {
        self.always_reload = always_reload;
        self
    }

    /// Enables or disables helper injection.
    pub fn with_helpers(mut self, add_helpers: bool) -> Self {
        self.add_helpers = add_helpers;
        self
    }

    /// Enables or disables prototyping mode (no auto-escaping).
    pub fn with_escaping_disabled(mut self, disable: bool) -> Self {
        self.disable_escaping = disable;
        self
    }

    /// Enables or disables the trusted-helper audit log.
    pub fn with_trusted_log_disabled(mut self, disable: bool) -> Self {
        self.disable_trusted_log = disable;
        self
    }
}
