use anyhow::Result;

use crate::form::escape_html;
use crate::host::{Host, NamespaceIndex, RenderContext};
use crate::nspath::resolve_namespace;
use crate::options::Options;

/// Namespace selector markup, or the reason there is none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamespaceInput {
    Markup { html: String, cacheable: bool },
    /// The user may not create pages in any offered namespace.
    NoOptions,
}

/// Split a `;`-separated exclude list. Patterns are matched case-insensitively.
pub fn exclude_patterns(exclude: &str) -> Vec<String> {
    if exclude.is_empty() {
        return Vec::new();
    }
    exclude
        .to_lowercase()
        .split(';')
        .map(str::to_string)
        .collect()
}

/// Namespaces below `root` in index order, minus those starting with any
/// exclude pattern.
pub fn list_namespaces(index: &dyn NamespaceIndex, root: &str, exclude: &str) -> Result<Vec<String>> {
    let excludes = exclude_patterns(exclude);
    let namespaces = index
        .namespaces(root)?
        .into_iter()
        .filter(|namespace| {
            !excludes
                .iter()
                .any(|pattern| !pattern.is_empty() && namespace.starts_with(pattern.as_str()))
        })
        .collect();
    Ok(namespaces)
}

/// Build the `np_cat` field for a directive targeting `dest_ns`.
pub fn render_namespace_input(
    dest_ns: &str,
    options: &Options,
    ctx: &RenderContext,
    host: &Host<'_>,
) -> NamespaceInput {
    let parsed = resolve_namespace(dest_ns, ctx, options.autopage);
    let can_create = host.acl.can_create(&parsed.known_namespace());

    if options.hide && !dest_ns.is_empty() {
        if !can_create {
            tracing::debug!(namespace = %parsed, "hidden namespace not creatable");
            return NamespaceInput::NoOptions;
        }
        return NamespaceInput::Markup {
            html: format!(
                r#"<input type="hidden" name="np_cat" id="np_cat" value="{}"/>"#,
                escape_html(&parsed.to_string())
            ),
            cacheable: true,
        };
    }

    let current_ns = ctx.namespace();
    let mut html = String::from(r#"<select class="edit" id="np_cat" name="np_cat" tabindex="1">"#);
    let mut some_option = false;

    if options.show_root && can_create {
        let (value, label) = if dest_ns.is_empty() {
            ("", host.lang.get_or_literal("namespaceRoot"))
        } else {
            (dest_ns, dest_ns)
        };
        html.push_str(&format!(
            r#"<option {}value="{}">{}</option>"#,
            selected_attr(current_ns == value),
            escape_html(value),
            escape_html(label)
        ));
        some_option = true;
    }

    let namespaces = match list_namespaces(host.index, dest_ns, &options.exclude) {
        Ok(namespaces) => namespaces,
        Err(error) => {
            tracing::warn!(namespace = dest_ns, error = %format!("{error:#}"), "namespace listing failed");
            Vec::new()
        }
    };

    let tree = render_namespace_options(dest_ns, &namespaces, |ns| host.acl.can_create(ns), current_ns);
    let cacheable = tree.is_empty();
    if !tree.is_empty() {
        html.push_str(&tree);
        some_option = true;
    }
    html.push_str("</select>");

    if some_option {
        NamespaceInput::Markup { html, cacheable }
    } else {
        NamespaceInput::NoOptions
    }
}

/// Render `namespaces` (depth-first order) as indented `<option>`s.
///
/// The top of the ancestor stack is always the last printed ancestor of the
/// entry being processed. Ancestors that were not printed yet are emitted as
/// disabled options so every entry appears under its full path.
pub fn render_namespace_options<F>(
    dest_ns: &str,
    namespaces: &[String],
    can_create: F,
    current_ns: &str,
) -> String
where
    F: Fn(&str) -> bool,
{
    let mut html = String::new();
    let mut ancestor_stack: Vec<String> = Vec::new();
    if !dest_ns.is_empty() {
        ancestor_stack.push(dest_ns.to_string());
    }

    for ns in namespaces {
        if !can_create(ns) {
            continue;
        }

        while let Some(top) = ancestor_stack.last() {
            if ns.starts_with(&format!("{top}:")) {
                break;
            }
            ancestor_stack.pop();
        }

        let parts: Vec<&str> = ns.split(':').collect();
        let first_unprinted_depth = match ancestor_stack.last() {
            Some(top) => 2 + top.matches(':').count(),
            None => 1,
        };
        for depth in first_unprinted_depth..=parts.len() {
            let namespace = parts[..depth].join(":");
            let indent = "&nbsp;&nbsp;".repeat(namespace.matches(':').count());
            let label = escape_html(parts[depth - 1]);
            let state = if depth == parts.len() {
                format!(r#"value="{}""#, escape_html(&namespace))
            } else {
                "disabled".to_string()
            };
            html.push_str(&format!(
                "<option {}{state}>{indent}{label}</option>",
                selected_attr(current_ns == namespace)
            ));
            ancestor_stack.push(namespace);
        }
    }
    html
}

fn selected_attr(selected: bool) -> &'static str {
    if selected { "selected " } else { "" }
}
