//! Registry construction.
//!
//! A build reads every layout, page and block file once, then compiles:
//!
//! 1. one unit per layout × page pair (all blocks, the page, the layout)
//! 2. one unit per page (all blocks, the page)
//! 3. one unit per block file (that block only)
//!
//! A build either produces a complete [`Registry`] or fails; nothing is
//! installed on failure.

use std::sync::Arc;

use minijinja::{AutoEscape, Environment};

use super::definitions;
use super::functions::{FunctionTable, RegistryBinding};
use super::registry::{CompiledUnit, Registry, TemplateFile, TemplateKind};
use crate::config::TemplatesConfig;
use crate::error::Error;
use crate::source::TemplateSource;

pub(crate) struct Compiler<'a> {
    pub(crate) config: &'a TemplatesConfig,
    pub(crate) source: &'a dyn TemplateSource,
    pub(crate) functions: &'a FunctionTable,
}

impl Compiler<'_> {
    /// Runs a full build.
    pub(crate) fn build(&self) -> Result<Arc<Registry>, Error> {
        let layouts = self.load(TemplateKind::Layout, &self.config.layouts_dir)?;
        if layouts.is_empty() {
            return Err(Error::NoLayouts);
        }
        let pages = self.load(TemplateKind::Page, &self.config.pages_dir)?;
        let blocks = self.load(TemplateKind::Block, &self.config.blocks_dir)?;

        let binding = RegistryBinding::default();
        let mut registry = Registry::empty();

        for layout in &layouts {
            for page in &pages {
                let key = format!("{}:{}", layout.name, page.name);
                let files = blocks.iter().chain([page, layout]);
                registry.insert(self.compile(key, &binding, files)?);
            }
        }

        for page in &pages {
            let key = format!(":{}", page.name);
            let files = blocks.iter().chain([page]);
            registry.insert(self.compile(key, &binding, files)?);
        }

        for block in &blocks {
            let key = block.block_key();
            if registry.contains(&key) {
                return Err(Error::DuplicateBlock {
                    key,
                    file: block.path.clone(),
                });
            }
            if !block.defines(&key) {
                return Err(Error::BlockNameMismatch {
                    file: block.path.clone(),
                    expected: key,
                    found: block.definition_names(),
                });
            }
            registry.insert(self.compile(key, &binding, [block])?);
        }

        let registry = Arc::new(registry);
        binding.bind(&registry);
        Ok(registry)
    }

    fn load(&self, kind: TemplateKind, dir: &str) -> Result<Vec<TemplateFile>, Error> {
        let paths = self.source.list(dir, &self.config.extension)?;
        let mut files = Vec::with_capacity(paths.len());
        for path in paths {
            let content = self.source.read(&path)?;
            let found = definitions::scan(&content).map_err(|e| Error::syntax(path.as_str(), e))?;
            let file = TemplateFile::new(path, kind, &self.config.extension, found);
            tracing::trace!(
                path = %file.path.display(),
                kind = ?file.kind,
                definitions = file.definitions.len(),
                "read template file"
            );
            files.push(file);
        }
        Ok(files)
    }

    fn compile<'f>(
        &self,
        key: String,
        binding: &RegistryBinding,
        files: impl IntoIterator<Item = &'f TemplateFile>,
    ) -> Result<CompiledUnit, Error> {
        let mut env = self.environment(binding);
        let mut entry_points = Vec::new();
        for file in files {
            for definition in &file.definitions {
                env.add_template_owned(definition.name.clone(), definition.body.clone())
                    .map_err(|e| Error::syntax(file.path.display().to_string(), e))?;
                entry_points.push(definition.name.clone());
            }
        }
        Ok(CompiledUnit::new(key, env, entry_points))
    }

    fn environment(&self, binding: &RegistryBinding) -> Environment<'static> {
        let mut env = Environment::new();
        let escape = if self.config.disable_escaping {
            AutoEscape::None
        } else {
            AutoEscape::Html
        };
        env.set_auto_escape_callback(move |_name| escape.clone());
        self.functions.install(&mut env, binding);
        env
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::EmbeddedSource;
    use std::collections::BTreeMap;

    fn build(source: &EmbeddedSource) -> Result<Arc<Registry>, Error> {
        let config = TemplatesConfig::default();
        let functions = FunctionTable::new(BTreeMap::new(), &config)?;
        Compiler {
            config: &config,
            source,
            functions: &functions,
        }
        .build()
    }

    fn site() -> EmbeddedSource {
        EmbeddedSource::from_entries(&[
            (
                "layouts/application.html",
                "{% block layout %}<app>{% include 'page' %}</app>{% endblock %}",
            ),
            (
                "layouts/special.html",
                "{% block layout %}<special>{% include 'page' %}</special>{% endblock %}",
            ),
            (
                "pages/home.html",
                "{% block page %}{% include '_header' %}home{% endblock %}",
            ),
            ("blocks/header.html", "{% block _header %}H{% endblock %}"),
        ])
    }

    #[test]
    fn test_registry_keys() {
        let registry = build(&site()).unwrap();
        assert_eq!(
            registry.keys(),
            vec![":home", "_header", "application:home", "special:home"]
        );
    }

    #[test]
    fn test_units_contain_expected_definitions() {
        let registry = build(&site()).unwrap();
        assert_eq!(
            registry.lookup("special:home").unwrap().entry_points(),
            ["_header", "page", "layout"]
        );
        assert_eq!(
            registry.lookup(":home").unwrap().entry_points(),
            ["_header", "page"]
        );
        assert_eq!(
            registry.lookup("_header").unwrap().entry_points(),
            ["_header"]
        );
    }

    #[test]
    fn test_no_layouts() {
        let source = EmbeddedSource::from_entries(&[
            ("pages/home.html", "{% block page %}x{% endblock %}"),
            ("blocks/a.html", "{% block _a %}a{% endblock %}"),
        ]);
        assert!(matches!(build(&source), Err(Error::NoLayouts)));
    }

    #[test]
    fn test_layouts_only() {
        let source = EmbeddedSource::from_entries(&[(
            "layouts/application.html",
            "{% block layout %}x{% endblock %}",
        )]);
        assert!(build(&source).unwrap().is_empty());
    }

    #[test]
    fn test_block_name_mismatch() {
        let source = site().with_file("blocks/mismatch.html", "{% block _actual %}x{% endblock %}");
        match build(&source) {
            Err(Error::BlockNameMismatch {
                expected, found, ..
            }) => {
                assert_eq!(expected, "_mismatch");
                assert_eq!(found, vec!["_actual"]);
            }
            other => panic!("expected BlockNameMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_block_definition_is_accepted() {
        let source = site().with_file("blocks/spacer.html", "{% block _spacer %}{% endblock %}");
        let registry = build(&source).unwrap();
        let out = registry
            .lookup("_spacer")
            .unwrap()
            .execute_to_string("_spacer", &minijinja::Value::from(()))
            .unwrap();
        assert_eq!(out, "");
    }

    #[test]
    fn test_duplicate_block() {
        let source = site().with_file("blocks/_header.html", "{% block _header %}y{% endblock %}");
        match build(&source) {
            Err(Error::DuplicateBlock { key, file }) => {
                assert_eq!(key, "_header");
                assert_eq!(file.to_str(), Some("blocks/header.html"));
            }
            other => panic!("expected DuplicateBlock, got {:?}", other),
        }
    }

    #[test]
    fn test_syntax_error_names_file() {
        let source = site().with_file("pages/broken.html", "{% block page %}{{ oops {% endblock %}");
        let err = build(&source).unwrap_err();
        assert!(matches!(err, Error::Syntax { .. }));
        assert!(err.to_string().contains("pages/broken.html"));
    }

    #[test]
    fn test_escaping_follows_config() {
        let source = EmbeddedSource::from_entries(&[
            ("layouts/application.html", "{% block layout %}{% include 'page' %}{% endblock %}"),
            ("pages/home.html", "{% block page %}{{ v }}{% endblock %}"),
        ]);
        let data = minijinja::Value::from_serialize(serde_json::json!({"v": "<b>"}));

        let registry = build(&source).unwrap();
        let out = registry
            .lookup("application:home")
            .unwrap()
            .execute_to_string("layout", &data)
            .unwrap();
        assert_eq!(out, "&lt;b&gt;");

        let config = TemplatesConfig::default().with_escaping_disabled(true);
        let functions = FunctionTable::new(BTreeMap::new(), &config).unwrap();
        let registry = Compiler {
            config: &config,
            source: &source,
            functions: &functions,
        }
        .build()
        .unwrap();
        let out = registry
            .lookup("application:home")
            .unwrap()
            .execute_to_string("layout", &data)
            .unwrap();
        assert_eq!(out, "<b>");
    }
}
