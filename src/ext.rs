//! Extension traits for annotating Results in place.
//!
//! `result.stack("context")` reads better at call sites than wrapping the
//! error by hand, and keeps the annotation on the line that failed.

use std::borrow::Cow;

use crate::Fields;
use crate::error::{Cause, StackError};

/// Annotation combinators for `Result`.
pub trait ResultStackExt<T> {
    /// Wrap the error with a message, annotating this call site.
    fn stack(self, message: impl Into<Cow<'static, str>>) -> Result<T, StackError>;

    /// Wrap the error with structured fields and a message.
    fn stack_with(
        self,
        fields: Fields,
        message: impl Into<Cow<'static, str>>,
    ) -> Result<T, StackError>;
}

impl<T, E: Into<Cause>> ResultStackExt<T> for Result<T, E> {
    // Explicit match rather than map_err: a closure would put its own frame
    // between this call site and the recorded annotation positions.
    #[inline(never)]
    fn stack(self, message: impl Into<Cow<'static, str>>) -> Result<T, StackError> {
        match self {
            Ok(value) => Ok(value),
            Err(err) => Err(StackError::wrap_depth(1, err, None, message)),
        }
    }

    #[inline(never)]
    fn stack_with(
        self,
        fields: Fields,
        message: impl Into<Cow<'static, str>>,
    ) -> Result<T, StackError> {
        match self {
            Ok(value) => Ok(value),
            Err(err) => Err(StackError::wrap_depth(1, err, Some(fields), message)),
        }
    }
}
