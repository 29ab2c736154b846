//! Hierarchy reconstruction over real call chains.
//!
//! Helper functions are `#[inline(never)]` so every recorded position maps to
//! a distinct physical frame.

use stackerr::{ResultStackExt, StackError, fields, merge, unpack};

#[inline(never)]
fn origin() -> StackError {
    StackError::new("boom")
}

#[inline(never)]
fn step1() -> StackError {
    StackError::wrap(origin(), "step1 failed")
}

#[inline(never)]
fn step2() -> StackError {
    StackError::wrap(step1(), "step2 failed")
}

#[test]
fn linear_chain_splices_every_annotation() {
    let err = step2();
    let hierarchy = unpack(&err);

    let messages: Vec<&str> = hierarchy.links.iter().map(|l| l.message).collect();
    assert_eq!(messages, ["step2 failed", "step1 failed", "boom"]);
    assert!(hierarchy.external.is_none());
    assert!(hierarchy.branches.is_empty());
    assert!(!hierarchy.frames.is_empty());
}

#[test]
fn frames_run_from_entry_point_to_failure() {
    let err = step2();
    let hierarchy = unpack(&err);

    let pos = |name: &str| {
        hierarchy
            .frames
            .iter()
            .position(|f| f.func.contains(name))
            .unwrap_or_else(|| panic!("no frame for {name}: {:?}", hierarchy.frames))
    };
    assert!(pos("step2") < pos("step1"));
    assert!(pos("step1") < pos("origin"));
}

#[test]
fn join_produces_one_branch_per_cause() {
    let err = merge!(
        Some(StackError::new("a failed")),
        Some(StackError::new("b failed")),
        Some(StackError::new("c failed"))
    )
    .unwrap();
    let hierarchy = unpack(&err);

    assert!(hierarchy.links.is_empty());
    let first_messages: Vec<Option<&str>> = hierarchy
        .branches
        .iter()
        .map(|b| b.links.first().map(|l| l.message))
        .collect();
    assert_eq!(
        first_messages,
        [Some("a failed"), Some("b failed"), Some("c failed")]
    );
}

#[test]
fn repeated_merging_stays_flat() {
    let inner = merge!(Some(StackError::new("a")), Some(StackError::new("b"))).unwrap();
    let err = merge!(Some(inner), Some(StackError::new("c"))).unwrap();
    let hierarchy = unpack(&err);
    assert_eq!(hierarchy.branches.len(), 3);
}

#[test]
fn blank_wrap_adds_no_link() {
    let err = merge!(Some(StackError::new("boom"))).unwrap();
    let hierarchy = unpack(&err);
    let messages: Vec<&str> = hierarchy.links.iter().map(|l| l.message).collect();
    assert_eq!(messages, ["boom"]);
}

#[test]
fn foreign_leaf_becomes_external_with_type() {
    let io = std::io::Error::other("io down");
    let err = StackError::wrap(io, "adopting");
    let hierarchy = unpack(&err);

    assert!(hierarchy.branches.is_empty());
    let external = hierarchy.external.as_ref().unwrap();
    assert_eq!(external.error.to_string(), "io down");
    assert!(external.type_name.is_some_and(|n| n.contains("io::Error")));
}

#[test]
fn link_fields_survive_reconstruction() {
    let root = StackError::new("boom");
    let err = StackError::wrap_with(root, fields! { "k" => "v" }, "ctx");
    let hierarchy = unpack(&err);

    let link = hierarchy.links.iter().find(|l| l.message == "ctx").unwrap();
    assert!(link.fields.is_some_and(|f| f["k"] == "v"));
}

#[test]
fn adjacent_duplicate_frames_collapse() {
    let err = StackError::wrap(StackError::wrap(StackError::new("boom"), "in"), "out");
    let hierarchy = unpack(&err);
    for pair in hierarchy.frames.windows(2) {
        assert_ne!(pair[0], pair[1]);
    }
}

#[derive(Debug, PartialEq, thiserror::Error)]
#[error("sentinel {0}")]
struct Sentinel(u32);

#[test]
fn membership_survives_wrapping_and_merging() {
    let left = StackError::wrap(Sentinel(1), "left");
    let right = StackError::wrap(Sentinel(2), "right");
    let err = merge!(Some(left), Some(right)).unwrap();

    assert_eq!(err.find_source::<Sentinel>(), Some(&Sentinel(1)));
    let all: Vec<u32> = err
        .chain()
        .filter_map(|e| e.downcast_ref::<Sentinel>())
        .map(|s| s.0)
        .collect();
    assert_eq!(all, [1, 2]);
}

#[inline(never)]
fn parse_port(input: &str) -> Result<u16, StackError> {
    input
        .parse::<u16>()
        .stack_with(fields! { "input" => input }, "parsing port")
}

#[test]
fn result_combinators_anchor_at_the_call_site() {
    let err = parse_port("nope").unwrap_err();
    assert!(err.is_root());

    let hierarchy = unpack(&err);
    let link = hierarchy
        .links
        .iter()
        .find(|l| l.message == "parsing port")
        .unwrap();
    assert!(link.location.func.contains("parse_port"), "{link:?}");
    assert!(hierarchy.external.is_some());
}
