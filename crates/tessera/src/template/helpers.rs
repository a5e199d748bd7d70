//! Structured-data helpers for passing arguments to blocks.
//!
//! - `locals("title", "Hi", "count", 2)` builds a map from key/value pairs.
//! - `references(...)` does the same but wraps every value in a shared
//!   [`Reference`], so a block can update a value the caller sees later in
//!   the same render.
//!
//! ```jinja
//! {% set args = references("count", 0) %}
//! {{ d_block("_counter", args) }}
//! {{ args.count.get() }}
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use minijinja::value::{from_args, Object, ObjectRepr, Rest};
use minijinja::{Error, ErrorKind, State, Value};

/// A shared, mutable cell holding one template value.
///
/// Attribute and item lookups are forwarded to the wrapped value, and the
/// reference renders as the wrapped value. Methods:
///
/// - `get()` returns the wrapped value
/// - `set(v)` replaces it
#[derive(Debug)]
pub struct Reference {
    value: Mutex<Value>,
}

impl Reference {
    /// Wraps `value`.
    pub fn new(value: Value) -> Self {
        Self {
            value: Mutex::new(value),
        }
    }

    /// Returns a clone of the wrapped value.
    pub fn get(&self) -> Value {
        self.value
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replaces the wrapped value.
    pub fn set(&self, value: Value) {
        *self.value.lock().unwrap_or_else(PoisonError::into_inner) = value;
    }
}

impl Object for Reference {
    fn repr(self: &Arc<Self>) -> ObjectRepr {
        ObjectRepr::Plain
    }

    fn get_value(self: &Arc<Self>, key: &Value) -> Option<Value> {
        self.get().get_item(key).ok().filter(|v| !v.is_undefined())
    }

    fn call_method(
        self: &Arc<Self>,
        _state: &State,
        name: &str,
        args: &[Value],
    ) -> Result<Value, Error> {
        match name {
            "get" => {
                let () = from_args(args)?;
                Ok(self.get())
            }
            "set" => {
                let (value,): (Value,) = from_args(args)?;
                self.set(value);
                Ok(Value::from(()))
            }
            _ => Err(Error::new(
                ErrorKind::UnknownMethod,
                format!("reference has no method named {}", name),
            )),
        }
    }

    fn render(self: &Arc<Self>, f: &mut fmt::Formatter<'_>) -> fmt::Result
    where
        Self: Sized + 'static,
    {
        fmt::Display::fmt(&self.get(), f)
    }
}

/// Builds a map from alternating keys and values.
///
/// Keys use their display form.
///
/// # Errors
///
/// Fails with [`ErrorKind::InvalidOperation`] on an odd number of arguments.
pub fn locals(args: Rest<Value>) -> Result<Value, Error> {
    Ok(Value::from(pairs("locals", &args, |value| value)?))
}

/// Like [`locals`], but every value is wrapped in a [`Reference`].
///
/// Values that already are references are stored as is, and `none` stays
/// `none`.
pub fn references(args: Rest<Value>) -> Result<Value, Error> {
    Ok(Value::from(pairs("references", &args, as_reference)?))
}

fn as_reference(value: Value) -> Value {
    if value.is_none() || value.downcast_object_ref::<Reference>().is_some() {
        value
    } else {
        Value::from_object(Reference::new(value))
    }
}

fn pairs(
    helper: &str,
    args: &[Value],
    wrap: impl Fn(Value) -> Value,
) -> Result<BTreeMap<String, Value>, Error> {
    if args.len() % 2 != 0 {
        return Err(Error::new(
            ErrorKind::InvalidOperation,
            format!(
                "{} expects key/value pairs, got {} arguments",
                helper,
                args.len()
            ),
        ));
    }
    Ok(args
        .chunks(2)
        .map(|pair| (pair[0].to_string(), wrap(pair[1].clone())))
        .collect())
}
