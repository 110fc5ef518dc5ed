//! Create a new post

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use serde_yaml::{Mapping, Value};
use std::fs;
use std::path::PathBuf;

use crate::content::NamedRef;
use crate::Site;

/// Values for a new post's front matter
#[derive(Debug, Clone, Default)]
pub struct NewPost {
    pub title: String,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub author: Option<String>,
}

/// Write `<content_dir>/<slug>.md` with every front-matter field filled in
pub fn create_post(site: &Site, post: &NewPost) -> Result<PathBuf> {
    let config = &site.config;
    let slug = slug::slugify(&post.title);
    if slug.is_empty() {
        anyhow::bail!("Title {:?} has no characters usable in a file name", post.title);
    }

    let file_path = site.content_dir.join(format!("{}.md", slug));
    if file_path.exists() {
        anyhow::bail!("File already exists: {:?}", file_path);
    }

    let now = Utc::now()
        .with_timezone(&config.tz())
        .to_rfc3339_opts(SecondsFormat::Secs, true);

    let category = NamedRef::new(
        post.category
            .as_deref()
            .unwrap_or(&config.default_category),
    );
    let author = NamedRef::new(post.author.as_deref().unwrap_or(&config.author));

    let mut fm = Mapping::new();
    fm.insert("title".into(), post.title.clone().into());
    fm.insert("excerpt".into(), "".into());
    fm.insert("category".into(), named(&category));
    fm.insert("date".into(), now.clone().into());
    fm.insert("publishedAt".into(), now.clone().into());
    fm.insert("updatedAt".into(), now.into());
    fm.insert("readingTime".into(), "1 min read".into());
    fm.insert("author".into(), named(&author));
    fm.insert(
        "tags".into(),
        Value::Sequence(post.tags.iter().map(|t| Value::from(t.as_str())).collect()),
    );
    fm.insert("featured".into(), false.into());

    let content = format!(
        "---\n{}---\n\nWrite the introduction here.\n",
        serde_yaml::to_string(&fm)?
    );

    fs::create_dir_all(&site.content_dir)?;
    fs::write(&file_path, content)
        .with_context(|| format!("Failed to write {}", file_path.display()))?;

    tracing::info!("Created: {:?}", file_path);
    Ok(file_path)
}

fn named(named: &NamedRef) -> Value {
    let mut map = Mapping::new();
    map.insert("name".into(), named.name.clone().into());
    map.insert("slug".into(), named.slug().into());
    Value::Mapping(map)
}
