//! Format string compilation
//!
//! A format string is plain text with escape tokens: `/` followed by one
//! character. `//` is a literal slash, every other token is resolved in the
//! template's [`Scope`]. Composite tokens pull in their own nested template,
//! compiled from that composite's format string.

use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;
use sbar_types::{Field, FieldSet};

use crate::formats::FormatConfig;
use crate::registry::Scope;

/// Escape character introducing a token
pub const ESCAPE: char = '/';

static TOKEN_PATTERN: Lazy<Regex> = Lazy::new(|| {
    let pattern = format!("(?s){}(.)", regex::escape(&ESCAPE.to_string()));
    Regex::new(&pattern).expect("Invalid regex")
});

/// One piece of a compiled template
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Text copied verbatim
    Literal(String),
    /// A single value
    Leaf(Field),
    /// Expanded once per discovered entity using the nested template
    Composite { field: Field, template: Box<Template> },
}

impl Segment {
    pub fn field(&self) -> Option<Field> {
        match self {
            Segment::Literal(_) => None,
            Segment::Leaf(field) | Segment::Composite { field, .. } => Some(*field),
        }
    }
}

/// Compiled format string.
///
/// Segments always start and end with a literal (possibly empty) and
/// literals alternate with field references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    scope: Scope,
    segments: Vec<Segment>,
    dropped: Vec<char>,
}

impl Template {
    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Tokens that had no field in this template's scope
    pub fn dropped_tokens(&self) -> &[char] {
        &self.dropped
    }

    /// Every field referenced by this template and its nested templates
    pub fn fields(&self) -> FieldSet {
        self.segments.iter().fold(FieldSet::NONE, |set, segment| match segment {
            Segment::Literal(_) => set,
            Segment::Leaf(field) => set | *field,
            Segment::Composite { field, template } => set | *field | template.fields(),
        })
    }

    /// Number of field references at this level
    pub fn field_count(&self) -> usize {
        self.segments.iter().filter(|s| s.field().is_some()).count()
    }
}

/// Accumulates segments while keeping the literal/field alternation
struct TemplateBuilder {
    segments: Vec<Segment>,
}

impl TemplateBuilder {
    fn new() -> Self {
        Self {
            segments: vec![Segment::Literal(String::new())],
        }
    }

    fn push_literal(&mut self, text: &str) {
        if let Some(Segment::Literal(last)) = self.segments.last_mut() {
            last.push_str(text);
        } else {
            self.segments.push(Segment::Literal(text.to_string()));
        }
    }

    fn push_field(&mut self, segment: Segment) {
        if !matches!(self.segments.last(), Some(Segment::Literal(_))) {
            self.segments.push(Segment::Literal(String::new()));
        }
        self.segments.push(segment);
    }

    fn finish(mut self, scope: Scope, dropped: Vec<char>) -> Template {
        if !matches!(self.segments.last(), Some(Segment::Literal(_))) {
            self.segments.push(Segment::Literal(String::new()));
        }
        Template {
            scope,
            segments: self.segments,
            dropped,
        }
    }
}

/// Compile `format` in `scope`, resolving tokens with `resolve`.
///
/// Never fails: a token `resolve` rejects is dropped with a warning and the
/// text around it joins the surrounding literal.
pub fn compile<F>(scope: Scope, format: &str, mut resolve: F) -> Template
where
    F: FnMut(char) -> Option<Segment>,
{
    let mut builder = TemplateBuilder::new();
    let mut dropped = Vec::new();
    let mut last_end = 0;

    for captures in TOKEN_PATTERN.captures_iter(format) {
        let (Some(whole), Some(token)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        builder.push_literal(&format[last_end..whole.start()]);
        last_end = whole.end();

        let token_str = token.as_str();
        let Some(token) = token_str.chars().next() else {
            continue;
        };
        if token == ESCAPE {
            builder.push_literal(token_str);
            continue;
        }
        match resolve(token) {
            Some(segment) => builder.push_field(segment),
            None => {
                warn!(
                    "Dropping unknown token '{}{}' in {} format",
                    ESCAPE, token, scope
                );
                dropped.push(token);
            }
        }
    }
    builder.push_literal(&format[last_end..]);

    builder.finish(scope, dropped)
}

/// Compile the format for `scope` from `formats`, recursively compiling the
/// nested template of every composite token.
pub fn compile_scope(scope: Scope, formats: &FormatConfig) -> Template {
    compile(scope, formats.format_for(scope), |token| {
        let field = scope.lookup(token)?;
        Some(match Scope::for_composite(field) {
            Some(nested) if nested.depth() > scope.depth() => Segment::Composite {
                field,
                template: Box::new(compile_scope(nested, formats)),
            },
            _ => Segment::Leaf(field),
        })
    })
}
