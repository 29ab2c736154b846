//! Hierarchy reconstruction.
//!
//! [`unpack`] turns an arbitrary error chain into a [`Hierarchy`]: resolved
//! stack frames with wrap annotations spliced back into the positions they
//! were recorded at, recursing into merged causes as branches. The renderers
//! in [`crate::format`] consume this structure; it is public so callers can
//! build their own output formats on top of it.

use std::error::Error;

use crate::Fields;
use crate::capture::{Location, Pc};
use crate::error::{StackError, find_anchor, next_annotated};

/// One wrap annotation placed at its resolved call site.
#[derive(Debug)]
pub struct Link<'a> {
    pub message: &'a str,
    pub fields: Option<&'a Fields>,
    pub location: Location,
}

/// A foreign error sitting at a leaf of the hierarchy, with the concrete
/// type name recorded when the error was erased, if any.
#[derive(Debug)]
pub struct External<'a> {
    pub error: &'a (dyn Error + 'static),
    pub type_name: Option<&'static str>,
}

/// One level of a reconstructed error hierarchy.
///
/// `frames` run from the program's entry point toward the point of failure.
/// `links` are the annotations spliced into this level, outermost first.
/// A level has either branches (one per merged cause) or, at a leaf with no
/// capture of its own, an external error.
#[derive(Debug, Default)]
pub struct Hierarchy<'a> {
    pub external: Option<External<'a>>,
    pub frames: Vec<Location>,
    pub links: Vec<Link<'a>>,
    pub branches: Vec<Hierarchy<'a>>,
}

impl<'a> Hierarchy<'a> {
    /// Append a frame, collapsing adjacent duplicates. Inlining and wrap
    /// splicing can both produce the same location twice in a row.
    fn push_frame(&mut self, location: Location) {
        if self.frames.last() == Some(&location) {
            return;
        }
        self.frames.push(location);
    }
}

/// Reconstruct the hierarchy of an error chain.
///
/// Works on any error: chains with no capture anywhere come back as a bare
/// external leaf. Frame resolution happens here, once per call.
pub fn unpack<'a>(err: &'a (dyn Error + 'static)) -> Hierarchy<'a> {
    unpack_inner(err, None, Pc::NULL)
}

fn unpack_inner<'a>(
    err: &'a (dyn Error + 'static),
    type_name: Option<&'static str>,
    floor: Pc,
) -> Hierarchy<'a> {
    let Some(anchor) = find_anchor(err) else {
        return Hierarchy {
            external: Some(External { error: err, type_name }),
            ..Hierarchy::default()
        };
    };

    // Anchors found by find_anchor always hold a non-empty capture.
    let callers = anchor.capture().map(|c| c.pcs()).unwrap_or_default();

    // Frames at or above the floor belong to the parent level and were
    // already emitted there. A null floor means this is the top level.
    let start = if floor.is_null() {
        callers.len().checked_sub(1)
    } else {
        callers
            .iter()
            .rposition(|&pc| pc == floor)
            .and_then(|i| i.checked_sub(1))
    };

    // Annotations only splice when the walk entered through them; an entry
    // point that is itself a join or a foreign error has none to offer.
    let mut cursor = err
        .downcast_ref::<StackError>()
        .filter(|e| e.delta().is_some());

    let mut hierarchy = Hierarchy::default();
    if let Some(start) = start {
        for i in (0..=start).rev() {
            while let Some(cur) = cursor {
                let Some(delta) = cur.delta() else { break };
                if i + 1 >= callers.len() || callers[i + 1] != delta.caller_caller() {
                    break;
                }
                let location = Location::resolve(delta.caller());
                if !delta.is_blank() {
                    hierarchy.links.push(Link {
                        message: delta.message(),
                        fields: delta.fields().filter(|f| !f.is_empty()),
                        location: location.clone(),
                    });
                }
                hierarchy.push_frame(location);
                cursor = next_annotated(cur);
            }
            hierarchy.push_frame(Location::resolve(callers[i]));
        }
    }

    let floor_next = callers.get(1).copied().unwrap_or(Pc::NULL);
    for cause in anchor.causes() {
        hierarchy
            .branches
            .push(unpack_inner(cause.as_dyn(), cause.type_name(), floor_next));
    }

    // A single branch is the same failure seen one level deeper; fold it in
    // so linear chains read as one trace.
    if hierarchy.branches.len() == 1
        && let Some(child) = hierarchy.branches.pop()
    {
        hierarchy.frames.extend(child.frames);
        hierarchy.links.extend(child.links);
        hierarchy.external = child.external;
        hierarchy.branches = child.branches;
    }

    hierarchy
}
