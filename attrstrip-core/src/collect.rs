//! Finding the attributes to remove.

use crate::ast::{Document, NodeKind};
use crate::config::TargetAttributes;
use crate::span::Span;

/// An attribute selected for removal.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct AttributeMatch<'a> {
    pub name: &'a str,
    pub span: Span,
}

/// All attributes in `document` whose name is in `targets`, in source order.
///
/// Only plain attributes match; directives and spreads never do, and names
/// compare exactly (`data-testid2` and `Data-Testid` are not `data-testid`).
pub fn collect_matches<'a>(
    document: &'a Document,
    targets: &TargetAttributes,
) -> Vec<AttributeMatch<'a>> {
    let mut matches = Vec::new();
    document.walk(|node| {
        if node.kind != NodeKind::Attribute {
            return;
        }
        if let Some(name) = node.name
            && targets.contains(name)
        {
            matches.push(AttributeMatch {
                name,
                span: node.span.clone(),
            });
        }
    });
    matches
}

/// Spans of [`collect_matches`], ready for [`crate::patch::apply`].
pub fn collect_spans(document: &Document, targets: &TargetAttributes) -> Vec<Span> {
    collect_matches(document, targets)
        .into_iter()
        .map(|m| m.span)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_document;

    fn targets(names: &[&str]) -> TargetAttributes {
        names.iter().copied().collect()
    }

    fn spans(src: &str, names: &[&str]) -> Vec<Span> {
        let doc = parse_document(src, None).expect("should parse");
        collect_spans(&doc, &targets(names))
    }

    #[test]
    fn collects_matching_attribute() {
        let src = r#"<div data-testid="x" class="y">hi</div>"#;
        assert_eq!(spans(src, &["data-testid"]), vec![4..20]);
    }

    #[test]
    fn exact_name_only() {
        let src = r#"<a data-testid="1" data-foo="2" data-testid2="3">x</a>"#;
        let found = spans(src, &["data-testid"]);
        assert_eq!(found.len(), 1);
        assert_eq!(&src[found[0].clone()], r#" data-testid="1""#);
    }

    #[test]
    fn case_sensitive() {
        assert!(spans(r#"<b Data-Testid="x">y</b>"#, &["data-testid"]).is_empty());
    }

    #[test]
    fn ignores_text_comments_and_expressions() {
        let src = "<p>data-testid</p><!-- data-testid=\"x\" -->{'data-testid'}";
        assert!(spans(src, &["data-testid"]).is_empty());
    }

    #[test]
    fn ignores_directives_named_like_targets() {
        let src = r#"<input bind:value={v} on:input={f}>"#;
        assert!(spans(src, &["bind:value", "value"]).is_empty());
    }

    #[test]
    fn namespaced_attribute_matches_by_full_name() {
        let src = r##"<svg><use xlink:href="#icon" data-testid="i" /></svg>"##;
        let found = spans(src, &["xlink:href"]);
        assert_eq!(found.len(), 1);
        assert_eq!(&src[found[0].clone()], r##" xlink:href="#icon""##);
    }

    #[test]
    fn shorthand_attribute_matches_by_name() {
        let src = "<div {hidden} {...rest}></div>";
        assert_eq!(spans(src, &["hidden"]), vec![4..13]);
    }

    #[test]
    fn nested_matches_are_strictly_increasing_and_disjoint() {
        let src = r#"
<main data-testid="root">
  <ul data-testid="list" class="l">
    {#each items as item}
      <li data-testid="item" data-cy="x">{item}</li>
    {/each}
  </ul>
  <footer data-cy="f" />
</main>"#;
        let found = spans(src, &["data-testid", "data-cy"]);
        assert_eq!(found.len(), 5);
        for pair in found.windows(2) {
            assert!(pair[0].start < pair[1].start);
            assert!(pair[0].end <= pair[1].start);
        }

        let doc = parse_document(src, None).expect("should parse");
        let names: Vec<&str> = collect_matches(&doc, &targets(&["data-testid", "data-cy"]))
            .iter()
            .map(|m| m.name)
            .collect();
        assert_eq!(
            names,
            vec!["data-testid", "data-testid", "data-testid", "data-cy", "data-cy"]
        );
    }
}
