//! Convenient re-exports for common usage.
//!
//! ```rust
//! use stackerr::prelude::*;
//!
//! fn parse(input: &str) -> Result<u32, StackError> {
//!     input
//!         .trim()
//!         .parse::<u32>()
//!         .stack_with(fields! { "input" => input }, "parsing port")
//! }
//!
//! let err = parse("not a number").unwrap_err();
//! assert!(err.to_string().starts_with("parsing port"));
//! ```

pub use crate::{Cause, Fields, ResultStackExt, StackError, to_json, to_text};
pub use crate::{fields, merge};
