//! Stack capture primitives and the location resolver.
//!
//! This module provides the two capture shapes the error variants are built
//! from: a [`Capture`] (a full call-stack snapshot) and a [`Delta`] (exactly
//! two adjacent stack positions plus an optional message and fields). Both
//! store raw [`Pc`] handles; resolution to file/line/function happens lazily,
//! only when a trace is rendered.

use std::borrow::Cow;
use std::ffi::c_void;

use crate::Fields;

/// Maximum number of frames kept in a full capture. Deeper stacks are
/// silently truncated.
pub const MAX_FRAMES: usize = 64;

/// Hard bound on raw frames walked while looking for the capture entry point.
const MAX_RAW_FRAMES: usize = 256;

// ============================================================================
// Pc - opaque stack position handle
// ============================================================================

/// An opaque stack-position handle.
///
/// `Pc` values are compared only for equality (they identify a physical stack
/// frame within one program run) and are resolved to a [`Location`] only
/// through [`Location::resolve`]. They are never dereferenced directly, and a
/// [`Pc::NULL`] resolves to the empty location rather than failing.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Pc(pub(crate) usize);

impl Pc {
    /// The null position. Resolves to an empty [`Location`].
    pub const NULL: Pc = Pc(0);

    /// Whether this is the null position.
    #[inline]
    pub fn is_null(self) -> bool {
        self.0 == 0
    }
}

// ============================================================================
// Location - resolved call frame
// ============================================================================

/// A resolved call frame: source file, line number, and function name.
///
/// Derived from a [`Pc`] on demand. All fields are empty when the position is
/// null or cannot be resolved (missing debug info); rendering tolerates both.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct Location {
    pub file: String,
    pub line: u32,
    pub func: String,
}

impl Location {
    /// Resolve a raw stack position to a source location.
    ///
    /// A null position yields the empty location. Stored positions are return
    /// addresses, so resolution happens one byte before the recorded address
    /// to land inside the call instruction.
    pub fn resolve(pc: Pc) -> Location {
        if pc.is_null() {
            return Location::default();
        }
        let mut loc = Location::default();
        backtrace::resolve((pc.0 - 1) as *mut c_void, |symbol| {
            if let Some(name) = symbol.name() {
                loc.func = trim_symbol(&name.to_string());
            }
            if let Some(file) = symbol.filename() {
                loc.file = file.display().to_string();
            }
            if let Some(line) = symbol.lineno() {
                loc.line = line;
            }
        });
        loc
    }
}

/// Strip the trailing `::h<hash>` a demangled Rust symbol carries.
fn trim_symbol(name: &str) -> String {
    match name.rfind("::h") {
        Some(i) if name[i + 3..].chars().all(|c| c.is_ascii_hexdigit()) => name[..i].to_string(),
        _ => name.to_string(),
    }
}

// ============================================================================
// Raw frame walk
// ============================================================================

struct RawFrame {
    ip: usize,
    symbol: usize,
}

fn walk_raw() -> Vec<RawFrame> {
    let mut raw = Vec::with_capacity(MAX_RAW_FRAMES);
    backtrace::trace(|frame| {
        raw.push(RawFrame {
            ip: frame.ip() as usize,
            symbol: frame.symbol_address() as usize,
        });
        raw.len() < MAX_RAW_FRAMES
    });
    raw
}

/// Index of the first frame past the capture entry point.
///
/// The entry point is found by its function address; if the platform reports
/// unusable symbol addresses, fall back to matching the demangled name.
/// Returns 0 when neither works, keeping the walk intact rather than losing it.
fn strip_prefix(raw: &[RawFrame], marker: usize, marker_name: &str) -> usize {
    if let Some(i) = raw.iter().position(|f| f.symbol == marker) {
        return i + 1;
    }
    let named = raw.iter().take(24).position(|f| {
        let mut hit = false;
        backtrace::resolve((f.ip.saturating_sub(1)) as *mut c_void, |symbol| {
            if let Some(name) = symbol.name() {
                hit |= name.to_string().contains(marker_name);
            }
        });
        hit
    });
    match named {
        Some(i) => i + 1,
        None => 0,
    }
}

// ============================================================================
// Capture - full call-stack snapshot
// ============================================================================

/// A full call-stack snapshot, innermost-first: index 0 is the point of
/// capture, increasing index moves toward the program's entry point.
/// Immutable once created.
#[derive(Debug)]
pub struct Capture {
    pcs: Vec<Pc>,
}

impl Capture {
    /// The raw positions, innermost-first.
    #[inline]
    pub fn pcs(&self) -> &[Pc] {
        &self.pcs
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.pcs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pcs.is_empty()
    }
}

/// Record the current call stack, hiding `skip` caller-side frames.
///
/// `skip = 0` starts at the immediate caller of this function. Every wrapper
/// layer built on top passes `skip + 1` to hide its own frame; this is a
/// caller-supplied contract, never auto-detected. Depth is bounded at
/// [`MAX_FRAMES`]; deeper stacks are silently truncated.
#[inline(never)]
pub fn capture_stack(skip: usize) -> Capture {
    let marker = (capture_stack as fn(usize) -> Capture) as usize;
    let raw = walk_raw();
    let start = strip_prefix(&raw, marker, "capture_stack") + skip;
    let pcs = raw
        .into_iter()
        .skip(start)
        .take(MAX_FRAMES)
        .map(|f| Pc(f.ip))
        .collect();
    Capture { pcs }
}

// ============================================================================
// Delta - two adjacent stack positions plus annotation payload
// ============================================================================

/// A lightweight wrap annotation: the annotation's own call site, that site's
/// caller, and the optional message/fields payload attached to the wrap.
/// Immutable once created.
#[derive(Debug)]
pub struct Delta {
    pub(crate) caller: Pc,
    pub(crate) caller_caller: Pc,
    pub(crate) fields: Option<Fields>,
    pub(crate) message: Cow<'static, str>,
}

impl Delta {
    /// Derive the two positions from an existing capture's first two entries,
    /// avoiding a second stack walk. Missing entries degrade to [`Pc::NULL`].
    pub fn from_capture(capture: &Capture) -> Delta {
        Delta {
            caller: capture.pcs().first().copied().unwrap_or(Pc::NULL),
            caller_caller: capture.pcs().get(1).copied().unwrap_or(Pc::NULL),
            fields: None,
            message: Cow::Borrowed(""),
        }
    }

    /// The annotation's own call site.
    #[inline]
    pub fn caller(&self) -> Pc {
        self.caller
    }

    /// The call site of the annotation site's caller. This is the position
    /// the hierarchy reconstructor correlates against full captures.
    #[inline]
    pub fn caller_caller(&self) -> Pc {
        self.caller_caller
    }

    /// The message attached to this annotation, possibly empty.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The structured fields attached to this annotation, if any.
    #[inline]
    pub fn fields(&self) -> Option<&Fields> {
        self.fields.as_ref()
    }

    /// Whether this annotation carries nothing worth rendering as a link.
    pub(crate) fn is_blank(&self) -> bool {
        self.message.is_empty() && self.fields.as_ref().is_none_or(|f| f.is_empty())
    }
}

/// Record the two innermost caller-side positions, hiding `skip` frames.
///
/// Same skip contract as [`capture_stack`], but only the annotation site and
/// its caller are kept. Message and fields are attached by the caller.
#[inline(never)]
pub fn capture_delta(skip: usize) -> Delta {
    let marker = (capture_delta as fn(usize) -> Delta) as usize;
    let raw = walk_raw();
    let start = strip_prefix(&raw, marker, "capture_delta") + skip;
    Delta {
        caller: raw.get(start).map(|f| Pc(f.ip)).unwrap_or(Pc::NULL),
        caller_caller: raw.get(start + 1).map(|f| Pc(f.ip)).unwrap_or(Pc::NULL),
        fields: None,
        message: Cow::Borrowed(""),
    }
}
