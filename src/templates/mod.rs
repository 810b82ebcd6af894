//! Built-in spacetraveling theme templates using the Tera template engine
//!
//! All templates are embedded in the binary.

use anyhow::Result;
use serde::Serialize;
use std::collections::HashMap;
use tera::{Context, Tera};

/// Template renderer with the embedded theme
pub struct TemplateRenderer {
    tera: Tera,
}

impl TemplateRenderer {
    /// Create a new renderer with all templates loaded
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();

        // Escaping is explicit through the `text` and `attr` filters, so that
        // paths and pre-rendered rich text pass through untouched
        tera.autoescape_on(vec![]);

        tera.add_raw_templates(vec![
            ("layout.html", include_str!("spacetraveling/layout.html")),
            ("index.html", include_str!("spacetraveling/index.html")),
            ("post.html", include_str!("spacetraveling/post.html")),
            ("loading.html", include_str!("spacetraveling/loading.html")),
            ("not_found.html", include_str!("spacetraveling/not_found.html")),
            (
                "partials/header.html",
                include_str!("spacetraveling/partials/header.html"),
            ),
        ])?;

        tera.register_filter("text", text_filter);
        tera.register_filter("attr", attr_filter);

        Ok(Self { tera })
    }

    /// Render a template with given context
    pub fn render(&self, template_name: &str, context: &Context) -> Result<String> {
        Ok(self.tera.render(template_name, context)?)
    }
}

/// Tera filter: escape for an HTML text node
fn text_filter(
    value: &tera::Value,
    _args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let s = tera::try_get_value!("text", "value", String, value);
    Ok(tera::Value::String(
        html_escape::encode_text(&s).into_owned(),
    ))
}

/// Tera filter: escape for a double-quoted attribute value
fn attr_filter(
    value: &tera::Value,
    _args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let s = tera::try_get_value!("attr", "value", String, value);
    Ok(tera::Value::String(
        html_escape::encode_double_quoted_attribute(&s).into_owned(),
    ))
}

/// Data structures for template context

#[derive(Debug, Clone, Serialize)]
pub struct ConfigData {
    pub title: String,
    pub description: String,
    pub root: String,
    pub lang: String,
    pub version: String,
}

/// A post in the listing, also the item shape of the "load more" endpoint
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostSummaryData {
    pub key: String,
    pub path: String,
    pub title: String,
    pub subtitle: String,
    pub author: String,
    /// Localized publication date, or the unpublished placeholder
    pub date: String,
    /// Machine-readable publication date
    pub datetime: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostViewData {
    pub key: String,
    pub title: String,
    pub banner_url: String,
    pub author: String,
    pub date: String,
    pub datetime: Option<String>,
    pub reading_minutes: usize,
    pub sections: Vec<SectionData>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SectionData {
    pub heading: String,
    pub html: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> Context {
        let mut context = Context::new();
        context.insert(
            "config",
            &ConfigData {
                title: "spacetraveling".to_string(),
                description: "Um blog sobre desenvolvimento".to_string(),
                root: "/".to_string(),
                lang: "pt-BR".to_string(),
                version: "test".to_string(),
            },
        );
        context.insert("i18n", &crate::i18n::Locale::PtBr.messages());
        context
    }

    #[test]
    fn test_loading_template() {
        let renderer = TemplateRenderer::new().unwrap();
        let mut context = context();
        context.insert("refresh_secs", &1);
        let html = renderer.render("loading.html", &context).unwrap();
        assert!(html.contains("Carregando..."));
        assert!(html.contains(r#"http-equiv="refresh""#));
        assert!(html.contains(r#"<meta name="description" content="Um blog sobre desenvolvimento">"#));
        assert!(!html.contains("canonical"));
    }

    #[test]
    fn test_text_is_escaped() {
        let renderer = TemplateRenderer::new().unwrap();
        let mut context = context();
        context.insert("posts", &vec![PostSummaryData {
            key: "a".to_string(),
            path: "/post/a".to_string(),
            title: "<script>".to_string(),
            subtitle: String::new(),
            author: "Ana & Bia".to_string(),
            date: "15 mar 2021".to_string(),
            datetime: None,
        }]);
        context.insert("next_page", &Option::<String>::None);
        context.insert("api_path", "/api/posts");
        let html = renderer.render("index.html", &context).unwrap();
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("Ana &amp; Bia"));
        assert!(html.contains(r#"href="/post/a""#));
        assert!(!html.contains(r#"id="load-more""#));
    }
}
