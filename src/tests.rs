//! Unit tests for capture primitives, construction, and traversal.
//!
//! These tests live under `src/` to retain access to `pub(crate)` items like
//! `next_annotated`.

use std::error::Error;
use std::io;

use crate::capture::{Location, MAX_FRAMES, Pc, capture_delta, capture_stack};
use crate::error::{find_anchor, next_annotated};
use crate::{Cause, StackError};

// ============================================================================
// capture primitives
// ============================================================================

#[test]
fn capture_is_non_empty() {
    let capture = capture_stack(0);
    assert!(!capture.is_empty());
}

#[inline(never)]
fn deep(n: usize) -> crate::Capture {
    if n == 0 {
        capture_stack(0)
    } else {
        std::hint::black_box(deep(n - 1))
    }
}

#[test]
fn capture_truncates_deep_stacks() {
    let capture = deep(100);
    assert_eq!(capture.len(), MAX_FRAMES);
}

#[test]
fn delta_from_capture_takes_first_two() {
    let capture = capture_stack(0);
    let delta = crate::Delta::from_capture(&capture);
    assert_eq!(delta.caller(), capture.pcs()[0]);
    assert_eq!(delta.caller_caller(), capture.pcs()[1]);
}

#[test]
fn delta_capture_records_two_positions() {
    let delta = capture_delta(0);
    assert!(!delta.caller().is_null());
    assert!(!delta.caller_caller().is_null());
    assert_ne!(delta.caller(), delta.caller_caller());
}

#[test]
fn null_position_resolves_to_empty_location() {
    assert_eq!(Location::resolve(Pc::NULL), Location::default());
}

#[test]
fn positions_resolve_to_this_file() {
    let capture = capture_stack(0);
    let location = Location::resolve(capture.pcs()[0]);
    assert!(location.file.ends_with("tests.rs"), "{location:?}");
    assert!(location.line > 0);
    assert!(!location.func.contains("::h"), "{location:?}");
}

// ============================================================================
// construction
// ============================================================================

#[test]
fn new_is_root_with_capture_and_message() {
    let err = StackError::new("boom");
    assert!(err.is_root());
    assert!(err.capture().is_some_and(|c| !c.is_empty()));
    assert_eq!(err.delta().map(|d| d.message()), Some("boom"));
    assert!(err.causes().is_empty());
}

#[test]
fn wrap_over_anchored_cause_is_lightweight() {
    let root = StackError::new("boom");
    let err = StackError::wrap(root, "ctx");
    assert!(err.is_wrap());
    assert!(err.capture().is_none());
    assert_eq!(err.causes().len(), 1);
}

#[test]
fn wrap_without_anchor_upgrades_to_root() {
    let io = io::Error::other("io down");
    let err = StackError::wrap_with(io, fields! { "attempt" => 1 }, "first try");
    assert!(err.is_root());
    assert!(err.capture().is_some_and(|c| !c.is_empty()));
    let delta = err.delta().unwrap();
    assert_eq!(delta.message(), "first try");
    assert!(delta.fields().is_some_and(|f| f.contains_key("attempt")));
    assert_eq!(err.causes().len(), 1);
}

#[test]
fn merge_of_nothing_is_none() {
    let none: Option<StackError> = None;
    assert!(merge!(none).is_none());
    assert!(StackError::merge(std::iter::empty::<Option<Cause>>()).is_none());
}

#[test]
fn merge_of_one_is_a_plain_wrap() {
    let err = merge!(Some(StackError::new("boom"))).unwrap();
    assert!(err.is_wrap());
    assert_eq!(err.causes().len(), 1);
}

#[test]
fn merge_of_two_is_a_join() {
    let err = merge!(Some(StackError::new("a")), Some(StackError::new("b"))).unwrap();
    assert!(err.is_join());
    assert!(err.capture().is_some_and(|c| !c.is_empty()));
    assert_eq!(err.causes().len(), 2);
}

#[test]
fn merge_onto_a_join_appends() {
    let join = merge!(Some(StackError::new("a")), Some(StackError::new("b"))).unwrap();
    let original_pcs: Vec<Pc> = join.capture().unwrap().pcs().to_vec();

    let err = merge!(Some(join), Some(StackError::new("c"))).unwrap();
    assert!(err.is_join());
    assert_eq!(err.causes().len(), 3);
    // Appending keeps the first merge's capture.
    assert_eq!(err.capture().unwrap().pcs(), original_pcs);
}

#[test]
fn merge_skips_dead_entries() {
    let err = merge!(
        None::<StackError>,
        Some(StackError::new("live")),
        None::<StackError>
    )
    .unwrap();
    assert!(err.is_wrap());
}

// ============================================================================
// traversal
// ============================================================================

#[derive(Debug, thiserror::Error)]
#[error("adapter failed")]
struct Adapter {
    #[source]
    inner: StackError,
}

#[derive(Debug, thiserror::Error)]
#[error("record {0} missing")]
struct Missing(u32);

#[test]
fn anchor_is_found_through_foreign_wrappers() {
    let adapter = Adapter {
        inner: StackError::new("boom"),
    };
    let anchor = find_anchor(&adapter).unwrap();
    assert_eq!(anchor.delta().map(|d| d.message()), Some("boom"));
}

#[test]
fn anchor_absent_without_any_capture() {
    let io = io::Error::other("io down");
    assert!(find_anchor(&io).is_none());
}

#[test]
fn next_annotated_hops_one_link() {
    let root = StackError::new("boom");
    let mid = StackError::wrap(root, "mid");
    let top = StackError::wrap(mid, "top");
    let next = next_annotated(&top).unwrap();
    assert_eq!(next.delta().map(|d| d.message()), Some("mid"));
}

#[test]
fn next_annotated_stops_at_joins() {
    let join = merge!(Some(StackError::new("a")), Some(StackError::new("b"))).unwrap();
    let top = StackError::wrap(join, "top");
    assert!(next_annotated(&top).is_none());
}

#[test]
fn chain_walks_the_whole_tree() {
    let err = StackError::wrap(StackError::wrap(Missing(7), "db"), "api");
    assert_eq!(err.chain().count(), 3);
    let found = err.find_source::<Missing>().unwrap();
    assert_eq!(found.0, 7);
}

#[test]
fn chain_visits_join_branches_in_order() {
    let err = merge!(Some(StackError::new("a")), Some(StackError::new("b"))).unwrap();
    let messages: Vec<String> = err
        .chain()
        .skip(1)
        .filter_map(|e| e.downcast_ref::<StackError>())
        .filter_map(|e| e.delta().map(|d| d.message().to_string()))
        .collect();
    assert_eq!(messages, ["a", "b"]);
}

#[test]
fn source_is_the_first_cause() {
    let err = merge!(Some(StackError::new("a")), Some(StackError::new("b"))).unwrap();
    let source = err.source().unwrap();
    let first = source.downcast_ref::<StackError>().unwrap();
    assert_eq!(first.delta().map(|d| d.message()), Some("a"));
}

// ============================================================================
// causes and erasure
// ============================================================================

#[test]
fn erasure_remembers_the_concrete_type() {
    let cause = Cause::from(Missing(1));
    assert!(cause.type_name().is_some_and(|n| n.contains("Missing")));
}

#[test]
fn boxed_erasure_has_no_type_name() {
    let boxed: Box<dyn Error + Send + Sync> = Box::new(Missing(1));
    assert!(Cause::from_boxed(boxed).type_name().is_none());
}

// ============================================================================
// macros
// ============================================================================

#[test]
fn fields_macro_builds_ordered_map() {
    let fields = fields! { "b" => 2, "a" => 1 };
    assert_eq!(fields.len(), 2);
    assert_eq!(fields["a"], 1);
    let empty = fields!();
    assert!(empty.is_empty());
}
