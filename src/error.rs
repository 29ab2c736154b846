//! The error value itself: [`StackError`], its three variants, and [`Cause`],
//! the type-erased cause slot that remembers the concrete type it erased.

use std::borrow::Cow;
use std::error::Error;
use std::fmt;

use crate::Fields;
use crate::capture::{Capture, Delta, capture_delta, capture_stack};

// ============================================================================
// Cause - type-erased cause with remembered type name
// ============================================================================

/// A type-erased error kept as the cause of a [`StackError`].
///
/// Erasure records the concrete type's name so trace renderers can still say
/// what kind of error sits at a leaf. `Cause` deliberately does not implement
/// [`Error`] itself; it is a storage slot, reached through [`Error::source`]
/// on the owning [`StackError`].
pub struct Cause {
    type_name: &'static str,
    inner: Box<dyn Error + Send + Sync + 'static>,
}

impl<E: Error + Send + Sync + 'static> From<E> for Cause {
    fn from(err: E) -> Cause {
        Cause {
            type_name: std::any::type_name::<E>(),
            inner: Box::new(err),
        }
    }
}

impl Cause {
    /// Wrap an already-boxed error. The concrete type is unknown at this
    /// point, so no type name is recorded.
    pub fn from_boxed(err: Box<dyn Error + Send + Sync + 'static>) -> Cause {
        Cause {
            type_name: "",
            inner: err,
        }
    }

    /// The name of the concrete type erased into this cause, if known.
    pub fn type_name(&self) -> Option<&'static str> {
        (!self.type_name.is_empty()).then_some(self.type_name)
    }

    /// Borrow the cause as a plain error trait object.
    #[inline]
    pub fn as_dyn(&self) -> &(dyn Error + 'static) {
        &*self.inner
    }

    /// Reclaim the inner error as a join-variant [`StackError`], or give the
    /// cause back unchanged when it is anything else.
    pub(crate) fn into_join(self) -> Result<StackError, Cause> {
        let type_name = self.type_name;
        match self.inner.downcast::<StackError>() {
            Ok(err) if err.is_join() => Ok(*err),
            Ok(err) => Err(Cause {
                type_name,
                inner: err,
            }),
            Err(inner) => Err(Cause { type_name, inner }),
        }
    }
}

impl fmt::Debug for Cause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.inner, f)
    }
}

// ============================================================================
// StackError - the error value
// ============================================================================

pub(crate) enum Variant {
    /// Full stack capture at the point of failure, plus its own annotation.
    /// May carry a foreign cause when an unanchored error was adopted.
    Root {
        capture: Capture,
        delta: Delta,
        cause: Option<Cause>,
    },
    /// A lightweight annotation layered over an already-anchored cause.
    Wrap { delta: Delta, cause: Cause },
    /// Several independent causes merged under one capture.
    Join { capture: Capture, causes: Vec<Cause> },
}

/// A structured error carrying stack captures, wrap annotations, and one or
/// more causes.
///
/// Built through [`StackError::new`], [`StackError::wrap`], and
/// [`StackError::merge`] (or the [`merge!`](crate::merge) macro and the
/// [`ResultStackExt`](crate::ResultStackExt) combinators). `Display` renders
/// the concise message chain; `Debug` and `{:#}` render the full trace.
pub struct StackError {
    pub(crate) variant: Variant,
}

impl StackError {
    // ------------------------------------------------------------------
    // construction
    // ------------------------------------------------------------------

    /// Create a root error with a message, capturing the full stack here.
    #[inline(never)]
    pub fn new(message: impl Into<Cow<'static, str>>) -> StackError {
        StackError::new_depth(1, None, message)
    }

    /// Create a root error with structured fields and a message.
    #[inline(never)]
    pub fn new_with(fields: Fields, message: impl Into<Cow<'static, str>>) -> StackError {
        StackError::new_depth(1, Some(fields), message)
    }

    /// Create a root error, hiding `skip` additional caller-side frames.
    ///
    /// For wrappers that construct errors on behalf of their own callers:
    /// pass the number of frames between your caller and this call.
    #[inline(never)]
    pub fn new_depth(
        skip: usize,
        fields: Option<Fields>,
        message: impl Into<Cow<'static, str>>,
    ) -> StackError {
        StackError::root_depth(skip + 1, fields, message.into(), None)
    }

    #[inline(never)]
    fn root_depth(
        skip: usize,
        fields: Option<Fields>,
        message: Cow<'static, str>,
        cause: Option<Cause>,
    ) -> StackError {
        let capture = capture_stack(skip + 1);
        let mut delta = Delta::from_capture(&capture);
        delta.fields = fields;
        delta.message = message;
        StackError {
            variant: Variant::Root {
                capture,
                delta,
                cause,
            },
        }
    }

    /// Wrap a cause with a message.
    ///
    /// When the cause already carries a stack capture somewhere in its chain,
    /// only a lightweight two-position annotation is recorded here. Otherwise
    /// the cause is adopted under a fresh root capture, keeping the message
    /// and fields.
    #[inline(never)]
    pub fn wrap(cause: impl Into<Cause>, message: impl Into<Cow<'static, str>>) -> StackError {
        StackError::wrap_depth(1, cause, None, message)
    }

    /// Wrap a cause with structured fields and a message.
    #[inline(never)]
    pub fn wrap_with(
        cause: impl Into<Cause>,
        fields: Fields,
        message: impl Into<Cow<'static, str>>,
    ) -> StackError {
        StackError::wrap_depth(1, cause, Some(fields), message)
    }

    /// Wrap a cause, hiding `skip` additional caller-side frames.
    #[inline(never)]
    pub fn wrap_depth(
        skip: usize,
        cause: impl Into<Cause>,
        fields: Option<Fields>,
        message: impl Into<Cow<'static, str>>,
    ) -> StackError {
        let cause = cause.into();
        let message = message.into();
        if find_anchor(cause.as_dyn()).is_some() {
            let mut delta = capture_delta(skip + 1);
            delta.fields = fields;
            delta.message = message;
            StackError {
                variant: Variant::Wrap { delta, cause },
            }
        } else {
            StackError::root_depth(skip + 1, fields, message, Some(cause))
        }
    }

    /// Merge several optional causes into one error.
    ///
    /// `None` entries are dropped. No live cause yields `None`; exactly one
    /// yields a plain wrap of it; two or more yield a join. When the first
    /// live cause is itself a join it absorbs the rest instead of nesting,
    /// so repeated merging accumulates siblings at one level.
    #[inline(never)]
    pub fn merge(causes: impl IntoIterator<Item = Option<Cause>>) -> Option<StackError> {
        StackError::merge_depth(1, causes)
    }

    /// Merge causes, hiding `skip` additional caller-side frames.
    #[inline(never)]
    pub fn merge_depth(
        skip: usize,
        causes: impl IntoIterator<Item = Option<Cause>>,
    ) -> Option<StackError> {
        let mut live: Vec<Cause> = causes.into_iter().flatten().collect();
        match live.len() {
            0 => None,
            // No closure here, it would sit as an extra frame between this
            // call and the recorded positions.
            1 => match live.pop() {
                Some(cause) => Some(StackError::wrap_depth(skip + 1, cause, None, "")),
                None => None,
            },
            _ => {
                let first = live.remove(0);
                match first.into_join() {
                    Ok(mut join) => {
                        if let Variant::Join { causes, .. } = &mut join.variant {
                            causes.extend(live);
                        }
                        Some(join)
                    }
                    Err(first) => {
                        let capture = capture_stack(skip + 1);
                        let mut causes = Vec::with_capacity(live.len() + 1);
                        causes.push(first);
                        causes.extend(live);
                        Some(StackError {
                            variant: Variant::Join { capture, causes },
                        })
                    }
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // accessors
    // ------------------------------------------------------------------

    /// The full stack capture, when this variant holds one.
    pub fn capture(&self) -> Option<&Capture> {
        match &self.variant {
            Variant::Root { capture, .. } | Variant::Join { capture, .. } => Some(capture),
            Variant::Wrap { .. } => None,
        }
    }

    /// The wrap annotation, when this variant holds one.
    pub fn delta(&self) -> Option<&Delta> {
        match &self.variant {
            Variant::Root { delta, .. } | Variant::Wrap { delta, .. } => Some(delta),
            Variant::Join { .. } => None,
        }
    }

    /// The causes of this error, in order. Empty for a causeless root.
    pub fn causes(&self) -> &[Cause] {
        match &self.variant {
            Variant::Root { cause, .. } => cause.as_slice(),
            Variant::Wrap { cause, .. } => std::slice::from_ref(cause),
            Variant::Join { causes, .. } => causes,
        }
    }

    pub fn is_root(&self) -> bool {
        matches!(self.variant, Variant::Root { .. })
    }

    pub fn is_wrap(&self) -> bool {
        matches!(self.variant, Variant::Wrap { .. })
    }

    pub fn is_join(&self) -> bool {
        matches!(self.variant, Variant::Join { .. })
    }

    // ------------------------------------------------------------------
    // inspection
    // ------------------------------------------------------------------

    /// Depth-first iterator over this error and every transitive cause,
    /// foreign errors included. Join branches are visited in order.
    pub fn chain(&self) -> Chain<'_> {
        Chain {
            stack: vec![self as &(dyn Error + 'static)],
        }
    }

    /// Find the first error of type `T` anywhere in the cause tree.
    pub fn find_source<T: Error + 'static>(&self) -> Option<&T> {
        self.chain().find_map(|err| err.downcast_ref::<T>())
    }
}

impl fmt::Display for StackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&crate::format::to_text(self, f.alternate()))
    }
}

impl fmt::Debug for StackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&crate::format::to_text(self, true))
    }
}

impl Error for StackError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.causes().first().map(Cause::as_dyn)
    }
}

// ============================================================================
// Chain - depth-first cause traversal
// ============================================================================

/// Iterator returned by [`StackError::chain`].
pub struct Chain<'a> {
    stack: Vec<&'a (dyn Error + 'static)>,
}

impl<'a> Iterator for Chain<'a> {
    type Item = &'a (dyn Error + 'static);

    fn next(&mut self) -> Option<Self::Item> {
        let err = self.stack.pop()?;
        if let Some(stack_err) = err.downcast_ref::<StackError>() {
            for cause in stack_err.causes().iter().rev() {
                self.stack.push(cause.as_dyn());
            }
        } else if let Some(source) = err.source() {
            self.stack.push(source);
        }
        Some(err)
    }
}

// ============================================================================
// anchor traversal
// ============================================================================

/// Find the nearest error in the chain that carries a full stack capture.
///
/// Walks [`Error::source`] links, so it passes through foreign wrapper errors
/// on the way. Returns `None` when no capture-bearing error exists.
pub fn find_anchor<'a>(err: &'a (dyn Error + 'static)) -> Option<&'a StackError> {
    let mut cursor = Some(err);
    while let Some(err) = cursor {
        if let Some(stack_err) = err.downcast_ref::<StackError>()
            && stack_err.capture().is_some_and(|c| !c.is_empty())
        {
            return Some(stack_err);
        }
        cursor = err.source();
    }
    None
}

/// Find the next annotation-bearing ancestor strictly below `err`.
///
/// Unlike [`find_anchor`] this stops at the first non-conforming link: a
/// foreign error or a join ends the walk, because annotations past either
/// belong to a different splice context.
pub(crate) fn next_annotated<'a>(err: &'a (dyn Error + 'static)) -> Option<&'a StackError> {
    let mut cursor = err.source();
    while let Some(err) = cursor {
        let stack_err = err.downcast_ref::<StackError>()?;
        if stack_err.is_join() {
            return None;
        }
        if stack_err.delta().is_some() {
            return Some(stack_err);
        }
        cursor = err.source();
    }
    None
}
