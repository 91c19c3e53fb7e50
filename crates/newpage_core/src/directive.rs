use std::ops::Range;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::options::{Options, parse_options};

pub const DIRECTIVE_PREFIX: &str = "{{NEWPAGE";
pub const DIRECTIVE_SUFFIX: &str = "}}";

/// A `{{NEWPAGE...}}` occurrence parsed into its parts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedDirective {
    /// Namespace template, possibly containing `@INPUT@`, `@PAGE@`, `@NS@` and
    /// date directives.
    pub namespace: String,
    /// Template references, each optionally `id|Label`.
    pub templates: Vec<String>,
    /// Comma-separated variable names forwarded to the template filler.
    pub template_vars: String,
    pub options: Options,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectiveMatch {
    pub range: Range<usize>,
    pub directive: ParsedDirective,
}

fn directive_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\{\{NEWPAGE[^}]*\}\}").expect("valid directive regex"))
}

fn namespace_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r">(.*?)(?:#|\?|$)").expect("valid namespace regex"))
}

fn templates_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"#(.*?)(?:#(.*?))?(?:\?|$)").expect("valid templates regex")
    })
}

fn options_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\?(.*?)(?:#|$)").expect("valid options regex"))
}

/// Locate every directive in a page's markup.
pub fn find_directives(text: &str, defaults: &Options) -> Vec<DirectiveMatch> {
    directive_pattern()
        .find_iter(text)
        .map(|found| DirectiveMatch {
            range: found.range(),
            directive: parse_directive(found.as_str(), defaults),
        })
        .collect()
}

/// Parse one matched directive. Missing parts keep their empty defaults, so
/// this never fails.
pub fn parse_directive(matched: &str, defaults: &Options) -> ParsedDirective {
    let body = matched.strip_prefix(DIRECTIVE_PREFIX).unwrap_or(matched);
    let body = body.strip_suffix(DIRECTIVE_SUFFIX).unwrap_or(body);

    let mut directive = ParsedDirective {
        namespace: String::new(),
        templates: Vec::new(),
        template_vars: String::new(),
        options: defaults.clone(),
    };

    if let Some(captures) = namespace_pattern().captures(body) {
        directive.namespace = captures[1].trim().to_string();
    }

    if let Some(captures) = templates_pattern().captures(body) {
        directive.templates = captures[1]
            .split(',')
            .map(|template| template.trim().to_string())
            .collect();
        directive.template_vars = captures
            .get(2)
            .map(|vars| vars.as_str().trim().to_string())
            .unwrap_or_default();
    }

    if let Some(captures) = options_pattern().captures(body) {
        parse_options(&captures[1], &mut directive.options);
    }

    tracing::debug!(
        namespace = %directive.namespace,
        templates = directive.templates.len(),
        "parsed directive"
    );
    directive
}
