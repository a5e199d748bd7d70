//! Mapping from a requested name to a registry key and entry point.
//!
//! | Requested name | Shape | Key | Entry point |
//! |----------------|-------|-----|-------------|
//! | `_card` | [`NameShape::Block`] | `_card` | `_card` |
//! | `:home` | [`NameShape::PageOnly`] | `:home` | `page` |
//! | `special:home` | [`NameShape::ExplicitLayout`] | `special:home` | `layout` |
//! | `home` | [`NameShape::ImplicitLayout`] | `<layout>:home` | `layout` |
//!
//! For the implicit shape the layout is the contextual override if one is
//! set, else the configured default. An empty name is treated as
//! [`EMPTY_NAME_FALLBACK`].

/// Entry point of units built for a layout.
pub const LAYOUT_ENTRY: &str = "layout";

/// Entry point of page-only units.
pub const PAGE_ENTRY: &str = "page";

/// Page rendered when the requested name is empty.
pub const EMPTY_NAME_FALLBACK: &str = "error";

/// The shape of a requested name, checked in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameShape {
    /// Starts with `_`: a standalone block.
    Block,
    /// Starts with `:`: a page without layout.
    PageOnly,
    /// Contains `:` elsewhere: layout and page given.
    ExplicitLayout,
    /// Anything else: a page inside the current layout.
    ImplicitLayout,
}

/// Outcome of resolving a requested name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedName {
    /// Which rule matched.
    pub shape: NameShape,
    /// Registry key to look up.
    pub key: String,
    /// Definition to execute inside the unit.
    pub entry: String,
}

/// Resolves `name` against the optional contextual layout override and the
/// default layout.
pub fn resolve(name: &str, layout_override: Option<&str>, default_layout: &str) -> ResolvedName {
    let name = if name.is_empty() {
        EMPTY_NAME_FALLBACK
    } else {
        name
    };

    if name.starts_with('_') {
        ResolvedName {
            shape: NameShape::Block,
            key: name.to_string(),
            entry: name.to_string(),
        }
    } else if name.starts_with(':') {
        ResolvedName {
            shape: NameShape::PageOnly,
            key: name.to_string(),
            entry: PAGE_ENTRY.to_string(),
        }
    } else if name.contains(':') {
        ResolvedName {
            shape: NameShape::ExplicitLayout,
            key: name.to_string(),
            entry: LAYOUT_ENTRY.to_string(),
        }
    } else {
        let layout = layout_override.unwrap_or(default_layout);
        ResolvedName {
            shape: NameShape::ImplicitLayout,
            key: format!("{}:{}", layout, name),
            entry: LAYOUT_ENTRY.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_block() {
        let r = resolve("_header", Some("special"), "application");
        assert_eq!(r.shape, NameShape::Block);
        assert_eq!(r.key, "_header");
        assert_eq!(r.entry, "_header");
    }

    #[test]
    fn test_block_containing_colon_is_still_block() {
        let r = resolve("_a:b", None, "application");
        assert_eq!(r.shape, NameShape::Block);
        assert_eq!(r.key, "_a:b");
    }

    #[test]
    fn test_page_only() {
        let r = resolve(":home", Some("special"), "application");
        assert_eq!(r.shape, NameShape::PageOnly);
        assert_eq!(r.key, ":home");
        assert_eq!(r.entry, "page");
    }

    #[test]
    fn test_explicit_layout_ignores_override() {
        let r = resolve("special:home", Some("other"), "application");
        assert_eq!(r.shape, NameShape::ExplicitLayout);
        assert_eq!(r.key, "special:home");
        assert_eq!(r.entry, "layout");
    }

    #[test]
    fn test_implicit_uses_default() {
        let r = resolve("home", None, "application");
        assert_eq!(r.key, "application:home");
        assert_eq!(r.entry, "layout");
    }

    #[test]
    fn test_implicit_prefers_override() {
        let r = resolve("home", Some("special"), "application");
        assert_eq!(r.key, "special:home");
    }

    #[test]
    fn test_empty_name_falls_back_to_error_page() {
        let r = resolve("", None, "application");
        assert_eq!(r.shape, NameShape::ImplicitLayout);
        assert_eq!(r.key, "application:error");
    }

    proptest! {
        #[test]
        fn prop_block_names_resolve_to_themselves(
            name in "_[a-z0-9_:]{0,20}",
            layout in proptest::option::of("[a-z]{1,8}"),
        ) {
            let r = resolve(&name, layout.as_deref(), "application");
            prop_assert_eq!(r.shape, NameShape::Block);
            prop_assert_eq!(&r.key, &name);
            prop_assert_eq!(&r.entry, &name);
        }

        #[test]
        fn prop_implicit_key_uses_override_then_default(
            page in "[a-z][a-z0-9_]{0,20}",
            layout in proptest::option::of("[a-z]{1,8}"),
            default in "[a-z]{1,8}",
        ) {
            let r = resolve(&page, layout.as_deref(), &default);
            let expected = format!("{}:{}", layout.as_deref().unwrap_or(&default), page);
            prop_assert_eq!(r.shape, NameShape::ImplicitLayout);
            prop_assert_eq!(r.key, expected);
            prop_assert_eq!(r.entry, LAYOUT_ENTRY);
        }

        #[test]
        fn prop_explicit_names_are_keys_verbatim(
            layout in "[a-z][a-z0-9]{0,8}",
            page in "[a-z0-9]{1,8}",
            over in proptest::option::of("[a-z]{1,8}"),
        ) {
            let name = format!("{}:{}", layout, page);
            let r = resolve(&name, over.as_deref(), "application");
            prop_assert_eq!(r.shape, NameShape::ExplicitLayout);
            prop_assert_eq!(r.key, name);
        }
    }
}
