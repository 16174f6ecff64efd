//! Component markup parser.
//!
//! Parsing happens in two steps: a chumsky lexer turns the source into a flat
//! list of spanned tokens (tags, text, comments, expression tags), then a
//! small stack machine assembles those tokens into a [`Document`] tree and
//! checks that start and end tags pair up.

use chumsky::prelude::*;
use chumsky::span::SimpleSpan;

use crate::ast::{Attribute, AttributeValue, Document, Element, Node};
use crate::span::{Span, Spanned};

type Extra<'src> = extra::Err<Rich<'src, char>>;

/// Elements that never have content or an end tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

const DIRECTIVE_PREFIXES: &[&str] = &[
    "on", "bind", "class", "style", "use", "transition", "in", "out", "animate", "let",
];

/// Name used in error messages when the caller supplies no filename.
const ANONYMOUS_SOURCE: &str = "<input>";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("{source_name}:{offset}: {message}")]
    Syntax {
        source_name: String,
        offset: usize,
        message: String,
    },

    #[error("{source_name}:{offset}: <{name}> is never closed")]
    UnclosedElement {
        source_name: String,
        name: String,
        offset: usize,
    },

    #[error("{source_name}:{offset}: expected </{expected}> but found </{found}>")]
    MismatchedEndTag {
        source_name: String,
        expected: String,
        found: String,
        offset: usize,
    },

    #[error("{source_name}:{offset}: </{name}> has no matching start tag")]
    UnexpectedEndTag {
        source_name: String,
        name: String,
        offset: usize,
    },
}

impl ParseError {
    /// Byte offset the error was reported at.
    pub fn offset(&self) -> usize {
        match self {
            ParseError::Syntax { offset, .. }
            | ParseError::UnclosedElement { offset, .. }
            | ParseError::MismatchedEndTag { offset, .. }
            | ParseError::UnexpectedEndTag { offset, .. } => *offset,
        }
    }
}

/// Turns markup text into a [`Document`].
///
/// Implementations must report spans as byte offsets into `source` and must
/// report attribute spans in source order within each element.
pub trait MarkupParser: Send + Sync {
    fn parse(&self, source: &str, filename: Option<&str>) -> Result<Document, ParseError>;
}

/// The built-in parser for HTML-like component markup.
#[derive(Debug, Clone, Copy, Default)]
pub struct ComponentParser;

impl MarkupParser for ComponentParser {
    fn parse(&self, source: &str, filename: Option<&str>) -> Result<Document, ParseError> {
        parse_document(source, filename)
    }
}

/// Parse component markup into a tree.
///
/// Attribute spans include the whitespace that precedes the attribute, so
/// removing an attribute's span never leaves a doubled space behind.
pub fn parse_document(src: &str, filename: Option<&str>) -> Result<Document, ParseError> {
    let source_name = filename.unwrap_or(ANONYMOUS_SOURCE);

    let tokens = lexer()
        .parse(src)
        .into_result()
        .map_err(|errs| syntax_error(source_name, errs))?;

    build_tree(tokens, source_name)
}

fn syntax_error(source_name: &str, errors: Vec<Rich<'_, char>>) -> ParseError {
    match errors.into_iter().min_by_key(|e| e.span().start) {
        Some(err) => ParseError::Syntax {
            source_name: source_name.to_string(),
            offset: err.span().start,
            message: err.to_string(),
        },
        None => ParseError::Syntax {
            source_name: source_name.to_string(),
            offset: 0,
            message: "invalid markup".to_string(),
        },
    }
}

// ============================================================================
// Lexer
// ============================================================================

#[derive(Debug, Clone)]
enum Token<'src> {
    Text(&'src str),
    Comment(&'src str),
    Doctype(&'src str),
    Expression(&'src str),
    StartTag {
        name: &'src str,
        attributes: Vec<Spanned<Attribute>>,
        self_closing: bool,
    },
    EndTag(&'src str),
    /// `<script>`, `<style>` and friends, whose content is not markup.
    RawText {
        name: &'static str,
        attributes: Vec<Spanned<Attribute>>,
        content: Spanned<&'src str>,
    },
}

fn to_range(span: SimpleSpan<usize>) -> Span {
    span.start..span.end
}

/// Strip the outer `{` `}` from a matched brace group.
fn inner(braced: &str) -> &str {
    &braced[1..braced.len() - 1]
}

fn is_tag_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.')
}

fn is_attribute_name_char(c: char) -> bool {
    !c.is_whitespace() && !matches!(c, '=' | '>' | '/' | '<' | '"' | '\'' | '{' | '}')
}

fn is_unquoted_value_char(c: char) -> bool {
    !c.is_whitespace() && !matches!(c, '"' | '\'' | '=' | '<' | '>' | '`')
}

/// `on:click`, `bind:value` and the other prefixed forms. Namespaced names
/// such as `xlink:href` are ordinary attributes.
fn is_directive(name: &str) -> bool {
    name.split_once(':')
        .is_some_and(|(prefix, _)| DIRECTIVE_PREFIXES.contains(&prefix))
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == '$' => {
            chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
        }
        _ => false,
    }
}

/// Classify the contents of a `{ ... }` found in attribute position.
fn braced_attribute(content: &str) -> Attribute {
    let trimmed = content.trim();
    if let Some(rest) = trimmed.strip_prefix("...") {
        Attribute::Spread(rest.trim().to_string())
    } else if is_identifier(trimmed) {
        Attribute::Shorthand(trimmed.to_string())
    } else {
        Attribute::Expression(content.to_string())
    }
}

/// A quoted string inside an expression; backslash escapes the next char.
fn quoted<'src>(quote: char) -> impl Parser<'src, &'src str, (), Extra<'src>> + Clone {
    let escaped = just('\\').then(any()).ignored();
    let plain = any()
        .filter(move |c: &char| *c != quote && *c != '\\')
        .ignored();

    just(quote)
        .then(escaped.or(plain).repeated())
        .then(just(quote))
        .ignored()
}

/// A quoted attribute value. There are no escapes, but `{ ... }` groups are
/// opaque, so `class="a {on ? "b" : "c"}"` is one value.
fn attribute_string<'src, B>(
    quote: char,
    braces: B,
) -> impl Parser<'src, &'src str, &'src str, Extra<'src>> + Clone
where
    B: Parser<'src, &'src str, (), Extra<'src>> + Clone,
{
    let plain = any()
        .filter(move |c: &char| *c != quote && *c != '{')
        .ignored();

    just(quote)
        .ignore_then(choice((braces, plain)).repeated().to_slice())
        .then_ignore(just(quote))
}

fn raw_text<'src, A>(
    name: &'static str,
    close: &'static str,
    attributes: A,
) -> impl Parser<'src, &'src str, Token<'src>, Extra<'src>> + Clone
where
    A: Parser<'src, &'src str, Vec<Spanned<Attribute>>, Extra<'src>> + Clone,
{
    let whitespace = any().filter(|c: &char| c.is_whitespace()).repeated();

    just('<')
        .then(just(name))
        // `<scripts>` is an ordinary element, `<script/>` is self-closing
        .then(one_of(" \t\r\n>").rewind())
        .ignore_then(attributes)
        .then_ignore(whitespace)
        .then_ignore(just('>'))
        .then(
            any()
                .and_is(just(close).not())
                .repeated()
                .to_slice()
                .map_with(|content, e| (content, to_range(e.span()))),
        )
        .then_ignore(just(close))
        .map(move |(attributes, content)| Token::RawText {
            name,
            attributes,
            content,
        })
}

fn lexer<'src>() -> impl Parser<'src, &'src str, Vec<Spanned<Token<'src>>>, Extra<'src>> {
    let whitespace = any().filter(|c: &char| c.is_whitespace()).repeated();

    // `{ ... }` with nested braces; quoted strings are opaque so a `}` inside
    // a string literal does not close the group.
    let braces = recursive(|braces| {
        choice((
            quoted('"'),
            quoted('\''),
            quoted('`'),
            braces,
            none_of("{}\"'`").ignored(),
        ))
        .repeated()
        .delimited_by(just('{'), just('}'))
        .ignored()
    });

    // Attributes

    let attr_name = any()
        .filter(|c: &char| is_attribute_name_char(*c))
        .repeated()
        .at_least(1)
        .to_slice();

    let value = choice((
        attribute_string('"', braces.clone())
            .map(|s: &str| AttributeValue::Quoted(s.to_string())),
        attribute_string('\'', braces.clone())
            .map(|s: &str| AttributeValue::Quoted(s.to_string())),
        braces
            .clone()
            .to_slice()
            .map(|s: &str| AttributeValue::Expression(inner(s).to_string())),
        any()
            .filter(|c: &char| is_unquoted_value_char(*c))
            .repeated()
            .at_least(1)
            .to_slice()
            .map(|s: &str| AttributeValue::Unquoted(s.to_string())),
    ));

    let assignment = whitespace
        .clone()
        .ignore_then(just('='))
        .ignore_then(whitespace.clone())
        .ignore_then(value);

    let named = attr_name
        .then(assignment.or_not())
        .map(|(name, value): (&str, Option<AttributeValue>)| {
            let name = name.to_string();
            let value = value.unwrap_or(AttributeValue::None);
            if is_directive(&name) {
                Attribute::Directive { name, value }
            } else {
                Attribute::Plain { name, value }
            }
        });

    let braced = braces
        .clone()
        .to_slice()
        .map(|s: &str| braced_attribute(inner(s)));

    // The span starts at the separating whitespace.
    let attribute = any()
        .filter(|c: &char| c.is_whitespace())
        .repeated()
        .at_least(1)
        .ignore_then(choice((braced, named)))
        .map_with(|attr, e| (attr, to_range(e.span())));

    let attributes = attribute.repeated().collect::<Vec<_>>();

    // Tags

    let tag_name = any()
        .filter(|c: &char| c.is_ascii_alphabetic())
        .then(any().filter(|c: &char| is_tag_name_char(*c)).repeated())
        .to_slice();

    let start_tag = just('<')
        .ignore_then(tag_name.clone())
        .then(attributes.clone())
        .then_ignore(whitespace.clone())
        .then(choice((just("/>").to(true), just(">").to(false))))
        .map(|((name, attributes), self_closing)| Token::StartTag {
            name,
            attributes,
            self_closing,
        });

    let end_tag = just("</")
        .ignore_then(tag_name)
        .then_ignore(whitespace.clone())
        .then_ignore(just('>'))
        .map(Token::EndTag);

    let comment = just("<!--")
        .ignore_then(any().and_is(just("-->").not()).repeated().to_slice())
        .then_ignore(just("-->"))
        .map(Token::Comment);

    let doctype = just("<!")
        .ignore_then(none_of(">").repeated().to_slice())
        .then_ignore(just('>'))
        .map(Token::Doctype);

    let expression = braces
        .to_slice()
        .map(|s: &str| Token::Expression(inner(s)));

    let text = none_of("<{")
        .repeated()
        .at_least(1)
        .to_slice()
        .map(Token::Text);

    choice((
        comment,
        doctype,
        raw_text("script", "</script>", attributes.clone()),
        raw_text("style", "</style>", attributes.clone()),
        raw_text("textarea", "</textarea>", attributes.clone()),
        raw_text("title", "</title>", attributes),
        end_tag,
        start_tag,
        expression,
        text,
    ))
    .map_with(|token, e| (token, to_range(e.span())))
    .repeated()
    .collect::<Vec<_>>()
    .then_ignore(end())
}

// ============================================================================
// Tree builder
// ============================================================================

struct OpenElement {
    name: String,
    attributes: Vec<Spanned<Attribute>>,
    start: usize,
    children: Vec<Spanned<Node>>,
}

impl OpenElement {
    fn close(self, end: usize) -> Spanned<Node> {
        let element = Element {
            name: self.name,
            attributes: self.attributes,
            children: self.children,
            self_closing: false,
        };
        (Node::Element(element), self.start..end)
    }
}

fn is_void(name: &str) -> bool {
    VOID_ELEMENTS.contains(&name)
}

/// Whether an open `current` element ends implicitly when a `next` start
/// tag appears directly inside it, as in `<li>one<li>two`.
fn closes_before(current: &str, next: &str) -> bool {
    let closed_by: &[&str] = match current {
        "li" => &["li"],
        "dt" | "dd" => &["dt", "dd"],
        "p" => &[
            "address", "article", "aside", "blockquote", "div", "dl", "fieldset", "footer",
            "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hgroup", "hr", "main",
            "menu", "nav", "ol", "p", "pre", "section", "table", "ul",
        ],
        "rt" | "rp" => &["rt", "rp"],
        "optgroup" => &["optgroup"],
        "option" => &["option", "optgroup"],
        "thead" | "tbody" => &["tbody", "tfoot"],
        "tfoot" => &["tbody"],
        "tr" => &["tr", "tbody"],
        "td" | "th" => &["td", "th", "tr"],
        _ => return false,
    };
    closed_by.contains(&next)
}

struct TreeBuilder {
    root: Vec<Spanned<Node>>,
    stack: Vec<OpenElement>,
}

impl TreeBuilder {
    fn push(&mut self, node: Spanned<Node>) {
        match self.stack.last_mut() {
            Some(open) => open.children.push(node),
            None => self.root.push(node),
        }
    }

    /// Close the innermost open element if `next` cannot live inside it.
    fn start_element(&mut self, next: &str, at: usize) {
        let implied = self
            .stack
            .last()
            .is_some_and(|open| closes_before(&open.name, next));
        if implied && let Some(open) = self.stack.pop() {
            let node = open.close(at);
            self.push(node);
        }
    }

    /// Close `name` and every element still open inside it. Those inner
    /// elements end where the end tag starts.
    fn end_element(
        &mut self,
        name: &str,
        span: &Span,
        source_name: &str,
    ) -> Result<(), ParseError> {
        let Some(depth) = self.stack.iter().rposition(|open| open.name == name) else {
            return Err(match self.stack.last() {
                Some(open) => ParseError::MismatchedEndTag {
                    source_name: source_name.to_string(),
                    expected: open.name.clone(),
                    found: name.to_string(),
                    offset: span.start,
                },
                None => ParseError::UnexpectedEndTag {
                    source_name: source_name.to_string(),
                    name: name.to_string(),
                    offset: span.start,
                },
            });
        };

        while self.stack.len() > depth + 1 {
            if let Some(inner) = self.stack.pop() {
                let node = inner.close(span.start);
                self.push(node);
            }
        }
        if let Some(open) = self.stack.pop() {
            let node = open.close(span.end);
            self.push(node);
        }
        Ok(())
    }
}

fn build_tree(tokens: Vec<Spanned<Token<'_>>>, source_name: &str) -> Result<Document, ParseError> {
    let mut tree = TreeBuilder {
        root: Vec::new(),
        stack: Vec::new(),
    };

    for (token, span) in tokens {
        match token {
            Token::Text(text) => tree.push((Node::Text(text.to_string()), span)),
            Token::Comment(text) => tree.push((Node::Comment(text.to_string()), span)),
            Token::Doctype(text) => tree.push((Node::Doctype(text.to_string()), span)),
            Token::Expression(text) => tree.push((Node::Expression(text.to_string()), span)),
            Token::StartTag {
                name,
                attributes,
                self_closing,
            } => {
                tree.start_element(name, span.start);
                if self_closing || is_void(name) {
                    let element = Element {
                        name: name.to_string(),
                        attributes,
                        children: Vec::new(),
                        self_closing,
                    };
                    tree.push((Node::Element(element), span));
                } else {
                    tree.stack.push(OpenElement {
                        name: name.to_string(),
                        attributes,
                        start: span.start,
                        children: Vec::new(),
                    });
                }
            }
            Token::EndTag(name) => tree.end_element(name, &span, source_name)?,
            Token::RawText {
                name,
                attributes,
                content: (content, content_span),
            } => {
                tree.start_element(name, span.start);
                let children = if content.is_empty() {
                    Vec::new()
                } else {
                    vec![(Node::Text(content.to_string()), content_span)]
                };
                let element = Element {
                    name: name.to_string(),
                    attributes,
                    children,
                    self_closing: false,
                };
                tree.push((Node::Element(element), span));
            }
        }
    }

    if let Some(open) = tree.stack.pop() {
        return Err(ParseError::UnclosedElement {
            source_name: source_name.to_string(),
            name: open.name,
            offset: open.start,
        });
    }

    Ok(Document { nodes: tree.root })
}
