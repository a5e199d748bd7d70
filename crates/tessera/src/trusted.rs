//! Trusted values: strings that bypass auto-escaping.
//!
//! A [`TrustedValue`] carries content that the application vouches for, tagged
//! with the [`TrustedKind`] of context it is meant for. When a trusted value
//! reaches template output it is emitted verbatim instead of being escaped.
//!
//! The only constructor is [`TrustedValue::assume_trusted`]. Its name is the
//! audit point: every place that marks content as safe can be found by
//! searching for it. Templates reach it through the `trusted_*` helpers.
//!
//! ```rust
//! use tessera::{trusted_html, TrustedKind};
//! use minijinja::Value;
//!
//! let html = trusted_html(&Value::from("<b>bold</b>"));
//! assert_eq!(html.kind(), TrustedKind::Html);
//! assert_eq!(html.as_str(), "<b>bold</b>");
//! ```
//!
//! minijinja only knows HTML escaping, so every kind is emitted as a safe
//! string. The kind tag stays on the Rust side for callers that inspect it.

use std::fmt;

use minijinja::{State, Value};

use crate::util::{truncate_preview, PREVIEW_LEN};

/// The output context a trusted value is meant for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrustedKind {
    /// HTML markup.
    Html,
    /// JavaScript source.
    Script,
    /// A CSS declaration (`style` attribute content).
    Style,
    /// A full CSS stylesheet.
    StyleSheet,
    /// A URL used in navigation.
    Url,
    /// A URL that loads code or other resources.
    ResourceUrl,
    /// An HTML identifier (id or name attribute).
    Identifier,
}

impl TrustedKind {
    /// Every kind, in helper registration order.
    pub const ALL: [TrustedKind; 7] = [
        TrustedKind::Html,
        TrustedKind::Script,
        TrustedKind::Style,
        TrustedKind::StyleSheet,
        TrustedKind::Url,
        TrustedKind::ResourceUrl,
        TrustedKind::Identifier,
    ];

    /// Name of the plain template helper for this kind.
    pub fn helper_name(self) -> &'static str {
        match self {
            TrustedKind::Html => "trusted_html",
            TrustedKind::Script => "trusted_script",
            TrustedKind::Style => "trusted_style",
            TrustedKind::StyleSheet => "trusted_stylesheet",
            TrustedKind::Url => "trusted_url",
            TrustedKind::ResourceUrl => "trusted_resource_url",
            TrustedKind::Identifier => "trusted_identifier",
        }
    }

    /// Name of the logging template helper for this kind.
    pub fn ctx_helper_name(self) -> &'static str {
        match self {
            TrustedKind::Html => "trusted_html_ctx",
            TrustedKind::Script => "trusted_script_ctx",
            TrustedKind::Style => "trusted_style_ctx",
            TrustedKind::StyleSheet => "trusted_stylesheet_ctx",
            TrustedKind::Url => "trusted_url_ctx",
            TrustedKind::ResourceUrl => "trusted_resource_url_ctx",
            TrustedKind::Identifier => "trusted_identifier_ctx",
        }
    }
}

/// Content that is emitted without escaping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustedValue {
    kind: TrustedKind,
    content: String,
}

impl TrustedValue {
    /// Marks `content` as safe for `kind`.
    ///
    /// The caller is responsible for the content being safe in that
    /// context. Never pass user-controlled input here.
    pub fn assume_trusted(kind: TrustedKind, content: impl Into<String>) -> Self {
        Self {
            kind,
            content: content.into(),
        }
    }

    /// The context this value is meant for.
    pub fn kind(&self) -> TrustedKind {
        self.kind
    }

    /// The raw content.
    pub fn as_str(&self) -> &str {
        &self.content
    }

    /// Consumes the value, returning the raw content.
    pub fn into_string(self) -> String {
        self.content
    }
}

impl fmt::Display for TrustedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.content)
    }
}

impl From<TrustedValue> for Value {
    fn from(value: TrustedValue) -> Self {
        Value::from_safe_string(value.content)
    }
}

/// Converts any value to a trusted value of `kind`.
///
/// `none` and `undefined` become empty content; everything else uses its
/// display form.
pub fn trusted(kind: TrustedKind, value: &Value) -> TrustedValue {
    if value.is_none() || value.is_undefined() {
        TrustedValue::assume_trusted(kind, String::new())
    } else {
        TrustedValue::assume_trusted(kind, value.to_string())
    }
}

/// Marks `value` as trusted HTML.
pub fn trusted_html(value: &Value) -> TrustedValue {
    trusted(TrustedKind::Html, value)
}

/// Marks `value` as trusted JavaScript.
pub fn trusted_script(value: &Value) -> TrustedValue {
    trusted(TrustedKind::Script, value)
}

/// Marks `value` as a trusted CSS declaration.
pub fn trusted_style(value: &Value) -> TrustedValue {
    trusted(TrustedKind::Style, value)
}

/// Marks `value` as a trusted stylesheet.
pub fn trusted_stylesheet(value: &Value) -> TrustedValue {
    trusted(TrustedKind::StyleSheet, value)
}

/// Marks `value` as a trusted URL.
pub fn trusted_url(value: &Value) -> TrustedValue {
    trusted(TrustedKind::Url, value)
}

/// Marks `value` as a trusted resource URL.
pub fn trusted_resource_url(value: &Value) -> TrustedValue {
    trusted(TrustedKind::ResourceUrl, value)
}

/// Marks `value` as a trusted identifier.
pub fn trusted_identifier(value: &Value) -> TrustedValue {
    trusted(TrustedKind::Identifier, value)
}

/// Builds the template-facing converter for `kind`.
///
/// With `passthrough` (escaping disabled) the argument is returned as is.
pub(crate) fn converter(kind: TrustedKind, passthrough: bool) -> Value {
    Value::from_function(move |value: Value| -> Value {
        if passthrough {
            value
        } else {
            trusted(kind, &value).into()
        }
    })
}

/// Builds the logging converter for `kind`, which also records the calling
/// template and a preview of the content.
pub(crate) fn ctx_converter(kind: TrustedKind, passthrough: bool, log: bool) -> Value {
    Value::from_function(move |state: &State, value: Value| -> Value {
        if log {
            let content = if value.is_none() || value.is_undefined() {
                String::new()
            } else {
                value.to_string()
            };
            tracing::info!(
                helper = kind.ctx_helper_name(),
                template = state.name(),
                content = %truncate_preview(&content, PREVIEW_LEN),
                "{} called",
                kind.ctx_helper_name()
            );
        }
        if passthrough {
            value
        } else {
            trusted(kind, &value).into()
        }
    })
}
