use serde::Serialize;

use crate::directive::{ParsedDirective, find_directives};
use crate::host::{Host, RenderContext};
use crate::namespaces::{NamespaceInput, render_namespace_input};
use crate::options::Options;
use crate::templates::build_template_input;

/// Output of a render. `cacheable` is false when the markup depends on the
/// reader's permissions or on the namespaces currently in the wiki.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rendered {
    pub html: String,
    pub cacheable: bool,
}

/// Render the new-page form for one directive.
pub fn render_directive(directive: &ParsedDirective, ctx: &RenderContext, host: &Host<'_>) -> Rendered {
    let options = &directive.options;

    let (namespace_input, cacheable) =
        match render_namespace_input(&directive.namespace, options, ctx, host) {
            NamespaceInput::Markup { html, cacheable } => (html, cacheable),
            NamespaceInput::NoOptions => {
                tracing::debug!(page = %ctx.page_id, "no creatable namespace for directive");
                let html = if options.hide_acl {
                    String::new()
                } else {
                    escape_html(host.lang.get_or_literal("nooption"))
                };
                return Rendered {
                    html,
                    cacheable: true,
                };
            }
        };

    let template_input = build_template_input(&directive.templates, ctx, host.resolver);
    let title_type = if options.autopage { "hidden" } else { "text" };
    let label = host.lang.get_or_literal(&options.label);

    let html = [
        r#"<div class="addnewpage"><p>"#.to_string(),
        format!(
            r#"<form name="addnewpage" method="get" action="{}" accept-charset="{}">"#,
            escape_html(&host.target.action),
            escape_html(&host.target.charset)
        ),
        namespace_input,
        format!(
            r#"<input class="edit" type="{title_type}" name="title" size="20" maxlength="255" tabindex="2" placeholder="{}"/>"#,
            escape_html(host.lang.get_or_literal("name"))
        ),
        template_input,
        format!(
            r#"<input type="hidden" name="newpagevars" value="{}"/>"#,
            escape_html(&directive.template_vars)
        ),
        r#"<input type="hidden" name="do" value="edit" />"#.to_string(),
        r#"<input type="hidden" name="id" />"#.to_string(),
        format!(
            r#"<input class="button" type="submit" value="{}" tabindex="4" />"#,
            escape_html(label)
        ),
        "</form></p></div>".to_string(),
    ]
    .concat();

    Rendered { html, cacheable }
}

/// Replace every directive in a page's markup with its rendered form.
pub fn render_page(text: &str, defaults: &Options, ctx: &RenderContext, host: &Host<'_>) -> Rendered {
    let mut html = String::with_capacity(text.len());
    let mut cacheable = true;
    let mut cursor = 0;

    for found in find_directives(text, defaults) {
        html.push_str(&text[cursor..found.range.start]);
        let rendered = render_directive(&found.directive, ctx, host);
        html.push_str(&rendered.html);
        cacheable &= rendered.cacheable;
        cursor = found.range.end;
    }
    html.push_str(&text[cursor..]);

    Rendered { html, cacheable }
}

pub fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};

    use super::{Rendered, escape_html, render_directive, render_page};
    use crate::directive::parse_directive;
    use crate::host::testing::{DenyList, FixedIndex, context};
    use crate::host::{FormTarget, Host, Lang, StartPageResolver};
    use crate::options::Options;

    struct Fixture {
        index: FixedIndex,
        acl: DenyList,
        resolver: StartPageResolver,
        lang: Lang,
        target: FormTarget,
    }

    impl Fixture {
        fn new(namespaces: Vec<&'static str>, denied: &[&'static str]) -> Self {
            Self {
                index: FixedIndex(namespaces),
                acl: DenyList(denied.iter().copied().collect::<BTreeSet<_>>()),
                resolver: StartPageResolver::default(),
                lang: Lang::default(),
                target: FormTarget::default(),
            }
        }

        fn host(&self) -> Host<'_> {
            Host {
                acl: &self.acl,
                index: &self.index,
                resolver: &self.resolver,
                lang: &self.lang,
                target: &self.target,
            }
        }

        fn render(&self, markup: &str, page: &str) -> Rendered {
            let directive = parse_directive(markup, &Options::default());
            render_directive(&directive, &context(page), &self.host())
        }
    }

    #[test]
    fn hidden_namespace_form_has_all_fields() {
        let fixture = Fixture::new(vec![], &[]);
        let rendered = fixture.render("{{NEWPAGE>blog#tpl:post#title,date}}", "home");
        assert!(rendered.cacheable);
        assert_eq!(
            rendered.html,
            concat!(
                r#"<div class="addnewpage"><p>"#,
                r#"<form name="addnewpage" method="get" action="/doku.php" accept-charset="utf-8">"#,
                r#"<input type="hidden" name="np_cat" id="np_cat" value="blog:@INPUT@"/>"#,
                r#"<input class="edit" type="text" name="title" size="20" maxlength="255" tabindex="2" placeholder="Page name"/>"#,
                r#"<input type="hidden" name="newpagetemplate" value="tpl:post" />"#,
                r#"<input type="hidden" name="newpagevars" value="title,date"/>"#,
                r#"<input type="hidden" name="do" value="edit" />"#,
                r#"<input type="hidden" name="id" />"#,
                r#"<input class="button" type="submit" value="Add page" tabindex="4" />"#,
                "</form></p></div>"
            )
        );
    }

    #[test]
    fn autopage_hides_title_input() {
        let fixture = Fixture::new(vec![], &[]);
        let rendered = fixture.render("{{NEWPAGE>journal:%Y?autopage}}", "home");
        assert!(rendered.html.contains(r#"value="journal:2024"/>"#));
        assert!(rendered.html.contains(r#"<input class="edit" type="hidden" name="title""#));
    }

    #[test]
    fn selector_form_is_not_cacheable() {
        let fixture = Fixture::new(vec!["docs", "docs:api"], &[]);
        let rendered = fixture.render("{{NEWPAGE}}", "docs:intro");
        assert!(!rendered.cacheable);
        assert!(rendered.html.contains(r#"<select class="edit" id="np_cat""#));
        assert!(rendered.html.contains(r#"<option selected value="docs">docs</option>"#));
    }

    #[test]
    fn label_uses_translation_or_literal_text() {
        let mut fixture = Fixture::new(vec![], &[]);
        fixture.lang = Lang::with_overrides(&BTreeMap::from([(
            "create".to_string(),
            "Create it".to_string(),
        )]));
        let rendered = fixture.render("{{NEWPAGE>a?label=create}}", "home");
        assert!(rendered.html.contains(r#"value="Create it" tabindex="4""#));
        let rendered = fixture.render("{{NEWPAGE>a?label=Go \"now\"}}", "home");
        assert!(rendered.html.contains(r#"value="Go &quot;now&quot;" tabindex="4""#));
    }

    #[test]
    fn missing_permission_shows_message_unless_hideacl() {
        let fixture = Fixture::new(vec![], &["blog"]);
        let rendered = fixture.render("{{NEWPAGE>blog}}", "home");
        assert_eq!(rendered.html, "You are not allowed to create pages here.");
        assert!(rendered.cacheable);

        let rendered = fixture.render("{{NEWPAGE>blog?hideacl}}", "home");
        assert_eq!(rendered.html, "");
    }

    #[test]
    fn render_page_replaces_each_directive() {
        let fixture = Fixture::new(vec!["docs"], &[]);
        let text = "Before {{NEWPAGE>blog}} between {{NEWPAGE}} after";
        let rendered = render_page(text, &Options::default(), &context("home"), &fixture.host());
        assert!(rendered.html.starts_with("Before <div class=\"addnewpage\">"));
        assert!(rendered.html.contains("</div> between <div"));
        assert!(rendered.html.ends_with("</div> after"));
        assert_eq!(rendered.html.matches("<form").count(), 2);
        assert!(!rendered.cacheable);
    }

    #[test]
    fn render_page_without_directives_is_unchanged() {
        let fixture = Fixture::new(vec![], &[]);
        let rendered = render_page("plain text", &Options::default(), &context("home"), &fixture.host());
        assert_eq!(
            rendered,
            Rendered {
                html: "plain text".to_string(),
                cacheable: true,
            }
        );
    }

    #[test]
    fn escape_html_covers_quotes() {
        assert_eq!(escape_html(r#"<a href="x">'&'</a>"#), "&lt;a href=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/a&gt;");
    }
}
