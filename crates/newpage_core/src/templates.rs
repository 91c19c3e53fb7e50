use crate::form::escape_html;
use crate::host::{PageResolver, RenderContext};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateRef {
    pub raw_id: String,
    pub label: Option<String>,
}

impl TemplateRef {
    /// Split `id|Label` on the first pipe.
    pub fn parse(entry: &str) -> Self {
        match entry.split_once('|') {
            Some((raw_id, label)) => Self {
                raw_id: raw_id.to_string(),
                label: Some(label.to_string()),
            },
            None => Self {
                raw_id: entry.to_string(),
                label: None,
            },
        }
    }

    pub fn resolve(&self, ctx: &RenderContext, resolver: &dyn PageResolver) -> ResolvedTemplate {
        let id = resolver.resolve_page(&self.raw_id, &ctx.page_id);
        let label = self.label.clone().unwrap_or_else(|| id.clone());
        ResolvedTemplate { id, label }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTemplate {
    pub id: String,
    pub label: String,
}

/// The `newpagetemplate` field: nothing, a hidden field, or a select list.
pub fn build_template_input(
    templates: &[String],
    ctx: &RenderContext,
    resolver: &dyn PageResolver,
) -> String {
    let refs: Vec<TemplateRef> = templates
        .iter()
        .filter(|template| !template.trim().is_empty())
        .map(|template| TemplateRef::parse(template))
        .collect();

    match refs.as_slice() {
        [] => String::new(),
        [single] => {
            let template = single.resolve(ctx, resolver);
            format!(
                r#"<input type="hidden" name="newpagetemplate" value="{}" />"#,
                escape_html(&template.id)
            )
        }
        many => {
            let mut html = String::from(r#"<select name="newpagetemplate" tabindex="3">"#);
            for (position, entry) in many.iter().enumerate() {
                let template = entry.resolve(ctx, resolver);
                let selected = if position == 0 {
                    r#" selected="selected""#
                } else {
                    ""
                };
                html.push_str(&format!(
                    r#"<option{selected} value="{}">{}</option>"#,
                    escape_html(&template.id),
                    escape_html(&template.label)
                ));
            }
            html.push_str("</select>");
            html
        }
    }
}
