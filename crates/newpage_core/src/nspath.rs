use std::borrow::Cow;
use std::fmt::{self, Write as _};

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local};
use serde::Serialize;

use crate::host::RenderContext;
use crate::ids::{Token, clean_tokens, get_ns};

/// Marks where the name typed into the form goes.
pub const INPUT_TOKEN: &str = "@INPUT@";
pub const PAGE_TOKEN: &str = "@PAGE@";
pub const NS_TOKEN: &str = "@NS@";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "text", rename_all = "lowercase")]
pub enum PathSegment {
    Literal(String),
    /// Filled client-side with the user's input at submit time.
    Input,
}

/// A cleaned target path that may still contain input slots.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct NamespacePath {
    segments: Vec<PathSegment>,
}

impl NamespacePath {
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn has_input(&self) -> bool {
        self.segments
            .iter()
            .any(|segment| matches!(segment, PathSegment::Input))
    }

    /// The deepest namespace fully known before any input slot. A path without
    /// input slots is a namespace in its own right.
    pub fn known_namespace(&self) -> String {
        let mut prefix = String::new();
        for segment in &self.segments {
            match segment {
                PathSegment::Literal(text) => prefix.push_str(text),
                PathSegment::Input => return get_ns(&prefix).to_string(),
            }
        }
        prefix
    }

    fn from_tokens(tokens: Vec<Token>) -> Self {
        let mut segments = Vec::new();
        let mut literal = String::new();
        for token in tokens {
            match token {
                Token::Char(ch) => literal.push(ch),
                Token::Opaque => {
                    if !literal.is_empty() {
                        segments.push(PathSegment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(PathSegment::Input);
                }
            }
        }
        if !literal.is_empty() {
            segments.push(PathSegment::Literal(literal));
        }
        Self { segments }
    }
}

impl fmt::Display for NamespacePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            match segment {
                PathSegment::Literal(text) => f.write_str(text)?,
                PathSegment::Input => f.write_str(INPUT_TOKEN)?,
            }
        }
        Ok(())
    }
}

/// Append the input slot unless the template already has one or the page name
/// comes from the template itself.
pub fn with_input_slot(template: &str, autopage: bool) -> Cow<'_, str> {
    if template.contains(INPUT_TOKEN) || autopage {
        Cow::Borrowed(template)
    } else {
        Cow::Owned(format!("{template}:{INPUT_TOKEN}"))
    }
}

/// Expand a namespace template from a directive into a cleaned target path.
pub fn resolve_namespace(template: &str, ctx: &RenderContext, autopage: bool) -> NamespacePath {
    let template = with_input_slot(template, autopage);
    let dated = format_date(&template, &ctx.now);

    let page_ns = ctx.namespace();
    let pieces: Vec<&str> = dated.split(INPUT_TOKEN).collect();
    let last = pieces.len() - 1;

    let mut tokens = Vec::new();
    for (index, piece) in pieces.iter().enumerate() {
        if index > 0 {
            tokens.push(Token::Opaque);
        }
        let mut text = piece
            .replace('/', ":")
            .replace(PAGE_TOKEN, &ctx.page_id)
            .replace(NS_TOKEN, page_ns);
        if index == 0 {
            if let Some(rest) = text.strip_prefix(".:") {
                text = format!("{page_ns}:{rest}");
            } else if text == "." && last == 0 {
                text = format!("{page_ns}:");
            }
        }
        tokens.extend(text.chars().map(Token::Char));
    }

    let path = NamespacePath::from_tokens(clean_tokens(tokens));
    tracing::debug!(template = %template, path = %path, "resolved namespace path");
    path
}

/// Substitute strftime-style directives. Text with malformed directives is
/// left as written.
pub fn format_date(template: &str, now: &DateTime<Local>) -> String {
    if !template.contains('%') {
        return template.to_string();
    }
    let items: Vec<Item<'_>> = StrftimeItems::new(template).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        return template.to_string();
    }
    let mut out = String::new();
    if write!(out, "{}", now.format_with_items(items.iter())).is_err() {
        return template.to_string();
    }
    out
}
