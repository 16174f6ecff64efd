//! Structural properties of stripping.
//!
//! Verifies that:
//! - Output outside removed spans is byte-for-byte the input
//! - The position map points every output byte at an equal input byte
//! - Collected spans are ordered and disjoint
//! - The patcher refuses overlapping spans

mod common;

use attrstrip_core::patch::apply;
use attrstrip_core::{
    PatchError, StripOptions, TargetAttributes, collect_spans, parse_document,
};
use common::production_pipeline;

const COMPONENT: &str = r#"<script lang="ts">
  export let user: { name: string };
</script>

<svelte:head>
  <title>Profile · {user.name}</title>
</svelte:head>

<section data-testid="profile" class="card">
  <h1 data-testid="name" title='Ünïcødé'>{user.name}</h1>
  {#if user.name.length > 0}
    <p data-testid="greeting">Hello, <b data-testid="bold">{user.name}</b>!</p>
  {:else}
    <p>Nobody here (data-testid)</p>
  {/if}
  <img src="/a.png" alt="" data-testid="avatar">
</section>
"#;

fn targets() -> TargetAttributes {
    ["data-testid"].into_iter().collect()
}

#[test]
fn position_map_points_at_equal_bytes() {
    let pipeline = production_pipeline(StripOptions::default());
    let outcome = pipeline.process(COMPONENT, Some("Profile.svelte"), true).unwrap();
    let edit = outcome.edit().expect("processed");
    let map = edit.map.as_ref().expect("map requested with a filename");

    assert!(edit.is_modified());
    assert_eq!(map.generated_len(), edit.code.len());
    for (generated, byte) in edit.code.bytes().enumerate() {
        let original = map.original_offset(generated).expect("every output byte is mapped");
        assert_eq!(COMPONENT.as_bytes()[original], byte);
    }
}

#[test]
fn output_is_input_minus_spans() {
    let doc = parse_document(COMPONENT, None).unwrap();
    let spans = collect_spans(&doc, &targets());
    assert_eq!(spans.len(), 5);

    let mut expected = String::new();
    let mut cursor = 0;
    for span in &spans {
        expected.push_str(&COMPONENT[cursor..span.start]);
        cursor = span.end;
    }
    expected.push_str(&COMPONENT[cursor..]);

    let edit = apply(COMPONENT, &spans, false).unwrap();
    assert_eq!(edit.code, expected);
    assert!(!edit.code.contains("data-testid=\""));
    assert!(edit.code.contains("(data-testid)"));
}

#[test]
fn spans_are_strictly_increasing_and_disjoint() {
    let doc = parse_document(COMPONENT, None).unwrap();
    let spans = collect_spans(&doc, &targets());
    for pair in spans.windows(2) {
        assert!(pair[0].start < pair[1].start, "{:?} then {:?}", pair[0], pair[1]);
        assert!(pair[0].end <= pair[1].start, "{:?} overlaps {:?}", pair[0], pair[1]);
    }
}

#[test]
fn stripping_twice_changes_nothing_more() {
    let pipeline = production_pipeline(StripOptions::default());
    let once = common::strip_with(&pipeline, COMPONENT);
    let twice = common::strip_with(&pipeline, &once);
    assert_eq!(once, twice);
}

#[test]
fn overlapping_spans_are_rejected() {
    let err = apply(COMPONENT, &[5..20, 10..30], false).unwrap_err();
    assert!(matches!(err, PatchError::Overlapping { .. }));
}

#[test]
fn source_map_resolves_back_to_original_lines() {
    let pipeline = production_pipeline(StripOptions::default());
    let outcome = pipeline.process(COMPONENT, Some("Profile.svelte"), true).unwrap();
    let edit = outcome.edit().expect("processed");
    let map = edit.map.as_ref().expect("map requested");

    let sm = map.to_source_map(Some("Profile.svelte"), "Profile.svelte", COMPONENT);

    // `class="card"` keeps its line (8, zero-based) but moves left by the
    // width of ` data-testid="profile"`.
    let line = edit.code.lines().nth(8).expect("section line");
    let col = line.find("class").expect("class attribute") as u32;
    let token = sm.lookup_token(8, col).expect("token");
    assert_eq!(token.get_src_line(), 8);
    assert_eq!(token.get_src_col(), col + r#" data-testid="profile""#.len() as u32);
}
