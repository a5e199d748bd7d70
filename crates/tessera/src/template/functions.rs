//! The function table shared by every compiled unit.
//!
//! Caller functions and, unless disabled, the built-in helpers are installed
//! as globals into each unit's environment:
//!
//! | Helper | Purpose |
//! |--------|---------|
//! | `d_block(name, data)` | render a block chosen at runtime |
//! | `d_block_ctx(name, data)` | same, with a debug log entry |
//! | `locals(k, v, ...)` | build a map from pairs |
//! | `references(k, v, ...)` | build a map of shared references |
//! | `trusted_<kind>(v)` | mark content as trusted |
//! | `trusted_<kind>_ctx(v)` | same, with an audit log entry |

use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock, Weak};

use minijinja::{Environment, ErrorKind, State, Value};

use super::helpers;
use super::registry::Registry;
use crate::config::TemplatesConfig;
use crate::error::Error;
use crate::trusted::{self, TrustedKind};
use crate::util::{truncate_preview, PREVIEW_LEN};

/// Dynamic block dispatch helper.
pub const D_BLOCK: &str = "d_block";
/// Dynamic block dispatch helper that also logs the call.
pub const D_BLOCK_CTX: &str = "d_block_ctx";
/// Map-from-pairs helper.
pub const LOCALS: &str = "locals";
/// Map-of-references helper.
pub const REFERENCES: &str = "references";

/// Every reserved helper name, in registration order.
pub fn helper_names() -> Vec<&'static str> {
    let mut names = vec![D_BLOCK, D_BLOCK_CTX, LOCALS, REFERENCES];
    names.extend(TrustedKind::ALL.iter().map(|k| k.helper_name()));
    names.extend(TrustedKind::ALL.iter().map(|k| k.ctx_helper_name()));
    names
}

/// Late binding from a unit's helpers to the registry that owns the unit.
///
/// Units are compiled before their registry exists, so `d_block` captures
/// this slot and the compiler fills it once the registry is complete. The
/// link is weak, so a retired registry is freed once its last render ends.
#[derive(Debug, Clone, Default)]
pub(crate) struct RegistryBinding(Arc<OnceLock<Weak<Registry>>>);

impl RegistryBinding {
    pub(crate) fn bind(&self, registry: &Arc<Registry>) {
        let _ = self.0.set(Arc::downgrade(registry));
    }

    fn registry(&self) -> Result<Arc<Registry>, minijinja::Error> {
        self.0.get().and_then(Weak::upgrade).ok_or_else(|| {
            minijinja::Error::new(
                ErrorKind::InvalidOperation,
                "template registry is not available",
            )
        })
    }
}

/// Caller functions plus the helper settings derived from the config.
#[derive(Debug, Clone)]
pub(crate) struct FunctionTable {
    functions: BTreeMap<String, Value>,
    helpers: Option<HelperSettings>,
}

#[derive(Debug, Clone, Copy)]
struct HelperSettings {
    passthrough: bool,
    audit_log: bool,
}

impl FunctionTable {
    /// Validates caller functions against the reserved helper names.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateHelper`] if helpers are enabled and a caller
    /// function uses one of their names.
    pub(crate) fn new(
        functions: BTreeMap<String, Value>,
        config: &TemplatesConfig,
    ) -> Result<Self, Error> {
        if !config.add_helpers {
            return Ok(Self {
                functions,
                helpers: None,
            });
        }

        for name in helper_names() {
            if functions.contains_key(name) {
                tracing::error!(name, "function name is already in use in the function table");
                return Err(Error::DuplicateHelper {
                    name: name.to_string(),
                });
            }
        }

        Ok(Self {
            functions,
            helpers: Some(HelperSettings {
                passthrough: config.disable_escaping,
                audit_log: !config.disable_trusted_log,
            }),
        })
    }

    /// Installs every function into `env`. `d_block` renders from the
    /// registry `binding` will point to.
    pub(crate) fn install(&self, env: &mut Environment<'static>, binding: &RegistryBinding) {
        for (name, function) in &self.functions {
            env.add_global(name.clone(), function.clone());
        }

        let Some(settings) = self.helpers else {
            return;
        };

        env.add_global(D_BLOCK, d_block(binding.clone()));
        env.add_global(D_BLOCK_CTX, d_block_ctx(binding.clone()));
        env.add_global(LOCALS, Value::from_function(helpers::locals));
        env.add_global(REFERENCES, Value::from_function(helpers::references));
        for kind in TrustedKind::ALL {
            env.add_global(
                kind.helper_name(),
                trusted::converter(kind, settings.passthrough),
            );
            env.add_global(
                kind.ctx_helper_name(),
                trusted::ctx_converter(kind, settings.passthrough, settings.audit_log),
            );
        }
    }
}

fn dispatch(binding: &RegistryBinding, name: &str, data: Option<Value>) -> Result<Value, minijinja::Error> {
    let registry = binding.registry()?;
    let data = data.unwrap_or_else(|| Value::from(()));
    let html = registry.render_block_as_html(name, &data)?;
    Ok(html.into())
}

fn d_block(binding: RegistryBinding) -> Value {
    Value::from_function(move |name: String, data: Option<Value>| {
        dispatch(&binding, &name, data)
    })
}

fn d_block_ctx(binding: RegistryBinding) -> Value {
    Value::from_function(move |state: &State, name: String, data: Option<Value>| {
        let result = dispatch(&binding, &name, data);
        match &result {
            Ok(html) => tracing::debug!(
                template = state.name(),
                block = %name,
                output = %truncate_preview(&html.to_string(), PREVIEW_LEN),
                "d_block_ctx rendered block"
            ),
            Err(err) => tracing::debug!(
                template = state.name(),
                block = %name,
                error = %err,
                "d_block_ctx failed"
            ),
        }
        result
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_helper_names_complete() {
        let names = helper_names();
        assert_eq!(names.len(), 18);
        assert!(names.contains(&"d_block"));
        assert!(names.contains(&"trusted_resource_url_ctx"));
    }

    #[test]
    fn test_duplicate_helper_rejected() {
        let mut functions = BTreeMap::new();
        functions.insert("locals".to_string(), Value::from(1));
        let err = FunctionTable::new(functions, &TemplatesConfig::default()).unwrap_err();
        assert!(matches!(err, Error::DuplicateHelper { ref name } if name == "locals"));
    }

    #[test]
    fn test_duplicate_allowed_without_helpers() {
        let mut functions = BTreeMap::new();
        functions.insert("locals".to_string(), Value::from(1));
        let config = TemplatesConfig::default().with_helpers(false);
        assert!(FunctionTable::new(functions, &config).is_ok());
    }

    #[test]
    fn test_install_without_helpers_only_adds_caller_functions() {
        let mut functions = BTreeMap::new();
        functions.insert("site".to_string(), Value::from("tessera"));
        let config = TemplatesConfig::default().with_helpers(false);
        let table = FunctionTable::new(functions, &config).unwrap();

        let mut env = Environment::new();
        table.install(&mut env, &RegistryBinding::default());
        let out = env
            .render_str(
                "{{ site }}|{% if d_block is defined %}yes{% else %}no{% endif %}",
                (),
            )
            .unwrap();
        assert_eq!(out, "tessera|no");
    }

    #[test]
    fn test_unbound_registry_is_an_error() {
        let table = FunctionTable::new(BTreeMap::new(), &TemplatesConfig::default()).unwrap();
        let mut env = Environment::new();
        table.install(&mut env, &RegistryBinding::default());
        let err = env.render_str("{{ d_block('_x') }}", ()).unwrap_err();
        assert!(err.to_string().contains("not available"));
    }
}
