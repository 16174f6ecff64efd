//! Syntax tree for component markup.
//!
//! The tree only models what attribute stripping needs: elements with their
//! attributes, plus leaf nodes for everything in between. Every node carries
//! the byte span it was parsed from.

use crate::span::{Span, Spanned};

#[derive(Debug, Clone, Default)]
pub struct Document {
    pub nodes: Vec<Spanned<Node>>,
}

#[derive(Debug, Clone)]
pub enum Node {
    /// Literal text between tags.
    Text(String),

    /// `<!-- ... -->`
    Comment(String),

    /// `<!doctype html>` and other `<!...>` declarations.
    Doctype(String),

    /// `{ ... }` expression or block tag, without the outer braces.
    Expression(String),

    Element(Element),
}

#[derive(Debug, Clone)]
pub struct Element {
    pub name: String,
    /// Attributes in source order. Each span starts at the whitespace that
    /// separates the attribute from the preceding token.
    pub attributes: Vec<Spanned<Attribute>>,
    pub children: Vec<Spanned<Node>>,
    /// Written as `<name ... />`.
    pub self_closing: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attribute {
    /// `name`, `name="value"`, `name='value'`, `name=value`, `name={expr}`
    Plain { name: String, value: AttributeValue },

    /// `{name}`, shorthand for `name={name}`.
    Shorthand(String),

    /// `on:click={...}`, `bind:value`, `class:active` and friends.
    Directive { name: String, value: AttributeValue },

    /// `{...props}`
    Spread(String),

    /// Any other `{ ... }` in attribute position.
    Expression(String),
}

impl Attribute {
    pub fn kind(&self) -> NodeKind {
        match self {
            Attribute::Plain { .. } | Attribute::Shorthand(_) => NodeKind::Attribute,
            Attribute::Directive { .. } => NodeKind::Directive,
            Attribute::Spread(_) => NodeKind::Spread,
            Attribute::Expression(_) => NodeKind::Expression,
        }
    }

    /// The attribute name, if this form has one.
    pub fn name(&self) -> Option<&str> {
        match self {
            Attribute::Plain { name, .. }
            | Attribute::Directive { name, .. }
            | Attribute::Shorthand(name) => Some(name),
            Attribute::Spread(_) | Attribute::Expression(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
    /// Bare attribute, e.g. `disabled`.
    None,
    /// `"..."` or `'...'`, without the quotes.
    Quoted(String),
    Unquoted(String),
    /// `{...}`, without the braces.
    Expression(String),
}

/// Structural kind of a node, as seen by a tree walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Element,
    Text,
    Comment,
    Doctype,
    Expression,
    Attribute,
    Directive,
    Spread,
}

/// A borrowed view of one node visited during [`Document::walk`].
#[derive(Debug, Clone, Copy)]
pub struct NodeRef<'a> {
    pub kind: NodeKind,
    /// Element name or attribute name.
    pub name: Option<&'a str>,
    pub span: &'a Span,
}

impl Document {
    /// Visit every node depth-first, pre-order: an element, then its
    /// attributes in source order, then its children. Nodes are therefore
    /// visited in increasing start offset.
    pub fn walk<'a>(&'a self, mut visit: impl FnMut(NodeRef<'a>)) {
        walk_nodes(&self.nodes, &mut visit);
    }
}

fn walk_nodes<'a, F>(nodes: &'a [Spanned<Node>], visit: &mut F)
where
    F: FnMut(NodeRef<'a>),
{
    for (node, span) in nodes {
        match node {
            Node::Element(element) => {
                visit(NodeRef {
                    kind: NodeKind::Element,
                    name: Some(&element.name),
                    span,
                });
                for (attr, attr_span) in &element.attributes {
                    visit(NodeRef {
                        kind: attr.kind(),
                        name: attr.name(),
                        span: attr_span,
                    });
                }
                walk_nodes(&element.children, visit);
            }
            Node::Text(_) => visit(leaf(NodeKind::Text, span)),
            Node::Comment(_) => visit(leaf(NodeKind::Comment, span)),
            Node::Doctype(_) => visit(leaf(NodeKind::Doctype, span)),
            Node::Expression(_) => visit(leaf(NodeKind::Expression, span)),
        }
    }
}

fn leaf(kind: NodeKind, span: &Span) -> NodeRef<'_> {
    NodeRef {
        kind,
        name: None,
        span,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attr(name: &str, span: Span) -> Spanned<Attribute> {
        (
            Attribute::Plain {
                name: name.to_string(),
                value: AttributeValue::None,
            },
            span,
        )
    }

    #[test]
    fn walk_visits_element_then_attributes_then_children() {
        let doc = Document {
            nodes: vec![(
                Node::Element(Element {
                    name: "div".into(),
                    attributes: vec![attr("a", 4..6), attr("b", 6..8)],
                    children: vec![(Node::Text("hi".into()), 9..11)],
                    self_closing: false,
                }),
                0..17,
            )],
        };

        let mut seen = Vec::new();
        doc.walk(|node| seen.push((node.kind, node.name.map(str::to_string), node.span.start)));

        assert_eq!(
            seen,
            vec![
                (NodeKind::Element, Some("div".to_string()), 0),
                (NodeKind::Attribute, Some("a".to_string()), 4),
                (NodeKind::Attribute, Some("b".to_string()), 6),
                (NodeKind::Text, None, 9),
            ]
        );
    }

    #[test]
    fn directive_and_spread_are_not_plain_attributes() {
        let directive = Attribute::Directive {
            name: "on:click".into(),
            value: AttributeValue::Expression("go".into()),
        };
        assert_eq!(directive.kind(), NodeKind::Directive);
        assert_eq!(directive.name(), Some("on:click"));

        let spread = Attribute::Spread("props".into());
        assert_eq!(spread.kind(), NodeKind::Spread);
        assert_eq!(spread.name(), None);

        assert_eq!(Attribute::Shorthand("id".into()).kind(), NodeKind::Attribute);
    }
}
