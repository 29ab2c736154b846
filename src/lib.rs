//! # stackerr - Structured errors with spliced stack traces
//!
//! One full stack capture per failure, cheap two-position annotations for
//! every wrap on the way up, and a reconstructor that splices the
//! annotations back into the positions they were recorded at:
//!
//! ```text
//! 	src/db.rs:142(myapp::db::fetch_user)
//! no such user
//! 	src/api.rs:89(myapp::api::handle_request)
//! loading profile
//! 		{"user_id":42}
//! 	src/main.rs:23(myapp::main)
//! ```
//!
//! ## Quick start
//!
//! Create root errors with [`StackError::new`], annotate propagating Results
//! with [`.stack()`](ResultStackExt::stack):
//!
//! ```rust
//! use stackerr::{ResultStackExt, StackError, fields};
//!
//! fn read_config() -> Result<String, std::io::Error> {
//!     Err(std::io::Error::new(std::io::ErrorKind::NotFound, "missing"))
//! }
//!
//! fn load() -> Result<String, StackError> {
//!     let text = read_config().stack_with(
//!         fields! { "path" => "app.toml" },
//!         "loading config",
//!     )?;
//!     Ok(text)
//! }
//!
//! let err = load().unwrap_err();
//! assert_eq!(err.to_string(), "loading config {\"path\":\"app.toml\"}: missing");
//! ```
//!
//! `Display` gives the concise chain; `{:#}` and `Debug` give the full trace
//! with resolved frames. [`to_json`] produces the same two shapes as JSON.
//!
//! ## One capture per failure
//!
//! The first wrap of an error with no capture anywhere in its chain records
//! a full stack and becomes the anchor. Every wrap above an anchor records
//! only two positions, its own call site and that site's caller, which is
//! what lets the reconstructor place the annotation inside the anchor's
//! capture later. Wrapping is cheap in the steady state; the expensive walk
//! happens once, at the failure point.
//!
//! ## Merging independent failures
//!
//! Cleanup paths often produce a second error that must not shadow the
//! first. [`merge!`] keeps them as siblings:
//!
//! ```rust
//! use stackerr::{StackError, merge};
//!
//! let primary = StackError::new("write failed");
//! let cleanup = StackError::new("close failed");
//!
//! let err = merge!(Some(primary), Some(cleanup)).unwrap();
//! assert!(err.is_join());
//! assert_eq!(err.causes().len(), 2);
//! ```
//!
//! Merging onto an existing merge appends instead of nesting, so a loop of
//! fallible cleanups accumulates a flat list of siblings.
//!
//! ## Foreign errors
//!
//! Anything implementing `Error + Send + Sync` can sit at a leaf. Its
//! concrete type name is recorded at the wrap, so trace output can still
//! name it, and [`StackError::find_source`] can fish it back out:
//!
//! ```rust
//! use stackerr::StackError;
//!
//! let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
//! let err = StackError::wrap(io, "opening socket");
//!
//! let found = err.find_source::<std::io::Error>().unwrap();
//! assert_eq!(found.kind(), std::io::ErrorKind::PermissionDenied);
//! ```

#![deny(unsafe_code)]

mod capture;
mod error;
mod ext;
pub mod format;
pub mod prelude;
pub mod unpack;

pub use capture::{Capture, Delta, Location, MAX_FRAMES, Pc, capture_delta, capture_stack};
pub use error::{Cause, Chain, StackError, find_anchor};
pub use ext::ResultStackExt;
pub use format::{
    FormatOptions, JsonFormat, StringFormat, default_field_format, default_location_format,
    to_custom_json, to_custom_text, to_json, to_text,
};
pub use serde_json::Value;
pub use unpack::{External, Hierarchy, Link, unpack};

/// Structured fields attached to an error or a wrap annotation.
///
/// Keys are ordered, so rendered output is deterministic.
pub type Fields = serde_json::Map<String, Value>;

// ============================================================================
// macros
// ============================================================================

/// Merge optional errors into one, keeping each as a sibling cause.
///
/// `None` entries drop out. With no live error the result is `None`; with
/// one it is a plain wrap; with more it is a join. Merging onto an existing
/// join appends to it instead of nesting.
///
/// ```rust
/// use stackerr::{StackError, merge};
///
/// let a = Some(StackError::new("first"));
/// let b: Option<StackError> = None;
/// let c = Some(StackError::new("third"));
///
/// let err = merge!(a, b, c).unwrap();
/// assert_eq!(err.causes().len(), 2);
/// ```
#[macro_export]
macro_rules! merge {
    ($($err:expr),+ $(,)?) => {
        $crate::StackError::merge_depth(0, [$( ($err).map(::core::convert::Into::into) ),+])
    };
}

/// Build a [`Fields`] map from `key => value` pairs.
///
/// Values go through [`Value::from`], so anything `serde_json` can represent
/// works:
///
/// ```rust
/// use stackerr::fields;
///
/// let f = fields! { "user_id" => 42, "retry" => true };
/// assert_eq!(f.len(), 2);
/// ```
#[macro_export]
macro_rules! fields {
    () => { $crate::Fields::new() };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut fields = $crate::Fields::new();
        $( fields.insert(($key).into(), $crate::Value::from($value)); )+
        fields
    }};
}

#[cfg(test)]
mod tests;
