//! Request-scoped render context.
//!
//! A [`RenderContext`] travels with a single render call and carries what
//! the surrounding application decided before rendering:
//!
//! - an optional layout override, used for bare page names
//! - optional data, for handlers that take their data from the request
//!
//! The engine never stores a context. Concurrent renders with different
//! contexts cannot observe each other.
//!
//! # Example
//!
//! ```rust
//! use tessera::RenderContext;
//!
//! // Partial-page requests get a minimal layout.
//! let ctx = RenderContext::for_requested_with(Some("XMLHttpRequest"), "application", "ajax");
//! assert_eq!(ctx.layout(), Some("ajax"));
//!
//! let ctx = RenderContext::for_requested_with(None, "application", "ajax");
//! assert_eq!(ctx.layout(), Some("application"));
//! ```

use minijinja::Value;

/// `X-Requested-With` value sent by script-initiated requests.
pub const REQUESTED_WITH_AJAX: &str = "XMLHttpRequest";

/// Per-render information supplied by the caller.
#[derive(Debug, Clone, Default)]
pub struct RenderContext {
    layout: Option<String>,
    data: Option<Value>,
}

impl RenderContext {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the layout used for bare page names.
    pub fn with_layout(mut self, layout: impl Into<String>) -> Self {
        self.layout = Some(layout.into());
        self
    }

    /// Attaches data for [`Templates::render_handler_from_context`](crate::Templates::render_handler_from_context).
    pub fn with_data(mut self, data: impl Into<Value>) -> Self {
        self.data = Some(data.into());
        self
    }

    /// Attaches any serializable value as data.
    pub fn with_serialized_data<S: serde::Serialize>(self, data: &S) -> Self {
        self.with_data(Value::from_serialize(data))
    }

    /// The layout override, if any.
    pub fn layout(&self) -> Option<&str> {
        self.layout.as_deref()
    }

    /// The attached data, if any.
    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    /// Chooses a layout from an `X-Requested-With` header value: `other`
    /// for script-initiated requests, `default` otherwise.
    pub fn for_requested_with(header: Option<&str>, default: &str, other: &str) -> Self {
        let layout = match header {
            Some(value) if value == REQUESTED_WITH_AJAX => other,
            _ => default,
        };
        Self::new().with_layout(layout)
    }
}
