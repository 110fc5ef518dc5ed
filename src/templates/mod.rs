//! Built-in theme templates using the Tera template engine
//!
//! Templates are embedded in the binary so a site needs nothing but its
//! posts and an optional `_config.yml`.

use anyhow::Result;
use serde::Serialize;
use std::collections::HashMap;
use tera::{Context, Tera};

use crate::helpers;

/// Stylesheet written to `css/style.css`
pub const STYLESHEET: &str = include_str!("theme/style.css");

/// Template renderer with the embedded theme
pub struct TemplateRenderer {
    tera: Tera,
}

impl TemplateRenderer {
    /// Create a new renderer with all theme templates loaded
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();

        // Post bodies are pre-rendered HTML; templates escape explicitly
        tera.autoescape_on(vec![]);

        tera.add_raw_templates(vec![
            ("layout.html", include_str!("theme/layout.html")),
            ("index.html", include_str!("theme/index.html")),
            ("post.html", include_str!("theme/post.html")),
            ("term.html", include_str!("theme/term.html")),
            ("terms.html", include_str!("theme/terms.html")),
            ("archive.html", include_str!("theme/archive.html")),
            ("macros.html", include_str!("theme/macros.html")),
            (
                "partials/pager.html",
                include_str!("theme/partials/pager.html"),
            ),
        ])?;

        tera.register_filter("strip_html", strip_html_filter);
        tera.register_filter("truncate_chars", truncate_chars_filter);

        Ok(Self { tera })
    }

    /// Render a template with given context
    pub fn render(&self, template_name: &str, context: &Context) -> Result<String> {
        Ok(self.tera.render(template_name, context)?)
    }
}

/// Tera filter: strip HTML tags
fn strip_html_filter(
    value: &tera::Value,
    _args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let s = tera::try_get_value!("strip_html", "value", String, value);
    Ok(tera::Value::String(helpers::strip_html(&s)))
}

/// Tera filter: truncate by character count
fn truncate_chars_filter(
    value: &tera::Value,
    args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let s = tera::try_get_value!("truncate_chars", "value", String, value);
    let length = match args.get("length") {
        Some(val) => tera::try_get_value!("truncate_chars", "length", usize, val),
        None => 160,
    };
    let omission = match args.get("omission") {
        Some(val) => tera::try_get_value!("truncate_chars", "omission", String, val),
        None => "…".to_string(),
    };
    Ok(tera::Value::String(helpers::truncate_chars(
        &s, length, &omission,
    )))
}

/// Site-wide values available to every template
#[derive(Debug, Clone, Serialize)]
pub struct SiteData {
    pub title: String,
    pub description: String,
    pub url: String,
    pub root: String,
    pub language: String,
    pub post_count: usize,
    pub categories: Vec<TermLink>,
    pub tags: Vec<TermLink>,
    pub links: NavLinks,
}

/// Section URLs for the header
#[derive(Debug, Clone, Serialize)]
pub struct NavLinks {
    pub home: String,
    pub archives: String,
    pub categories: String,
    pub tags: String,
    pub feed: String,
    pub stylesheet: String,
}

/// A category or tag with its URL and count
#[derive(Debug, Clone, Serialize)]
pub struct TermLink {
    pub name: String,
    pub slug: String,
    pub path: String,
    pub count: usize,
}

/// Post data exposed to templates
#[derive(Debug, Clone, Serialize)]
pub struct PostData {
    pub title: String,
    pub slug: String,
    pub path: String,
    pub permalink: String,
    pub excerpt: Option<String>,
    pub date: String,
    pub date_iso: String,
    pub updated: Option<String>,
    pub reading_time: String,
    pub author: Option<String>,
    pub category: TermLink,
    pub tags: Vec<TermLink>,
    pub featured: bool,
    pub content: String,
}

/// Pagination state of a listing page
#[derive(Debug, Clone, Serialize)]
pub struct PaginationData {
    pub current: usize,
    pub total: usize,
    pub prev_link: Option<String>,
    pub next_link: Option<String>,
}

/// Neighbour link on a post page
#[derive(Debug, Clone, Serialize)]
pub struct NavPost {
    pub title: String,
    pub path: String,
}

/// Posts of one archive year
#[derive(Debug, Clone, Serialize)]
pub struct ArchiveYearData {
    pub year: i32,
    pub posts: Vec<PostData>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_templates_load() {
        assert!(TemplateRenderer::new().is_ok());
    }

    #[test]
    fn test_truncate_filter() {
        let mut args = HashMap::new();
        args.insert("length".to_string(), tera::Value::from(4));
        args.insert("omission".to_string(), tera::Value::from("..."));
        let out = truncate_chars_filter(&tera::Value::from("kubectl apply"), &args).unwrap();
        assert_eq!(out, tera::Value::from("kube..."));
    }
}
