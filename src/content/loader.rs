//! Content loader - reads post files from the content directory

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::post::reading_time;
use super::split::{split_documents, Segment};
use super::{Category, FrontMatter, MarkdownRenderer, Post};
use crate::helpers::{full_url_for, url_for};
use crate::Site;

/// A post file as read from disk
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Full path
    pub path: PathBuf,
    /// Path relative to the content directory, `/`-separated
    pub relative: String,
    /// File contents
    pub text: String,
}

impl SourceFile {
    /// File name without extension
    pub fn stem(&self) -> &str {
        self.path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("untitled")
    }
}

/// Loads content from the content directory
pub struct ContentLoader<'a> {
    site: &'a Site,
    renderer: MarkdownRenderer,
}

impl<'a> ContentLoader<'a> {
    /// Create a new content loader
    pub fn new(site: &'a Site) -> Self {
        let highlight = &site.config.highlight;
        let renderer = MarkdownRenderer::with_options(&highlight.theme, highlight.line_number);
        Self { site, renderer }
    }

    /// Read every Markdown file under the content directory, in path order
    pub fn sources(&self) -> Result<Vec<SourceFile>> {
        let content_dir = &self.site.content_dir;
        if !content_dir.exists() {
            tracing::warn!("Content directory {:?} does not exist", content_dir);
            return Ok(Vec::new());
        }

        let mut sources = Vec::new();

        for entry in WalkDir::new(content_dir)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !path.is_file() || !is_markdown_file(path) {
                continue;
            }

            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let relative = path
                .strip_prefix(content_dir)
                .unwrap_or(path)
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");

            sources.push(SourceFile {
                path: path.to_path_buf(),
                relative,
                text,
            });
        }

        Ok(sources)
    }

    /// Load all posts, newest first
    pub fn load_posts(&self) -> Result<Vec<Post>> {
        let mut posts = Vec::new();
        let mut slugs = HashSet::new();
        let now = Utc::now();

        for source in self.sources()? {
            for segment in split_documents(&source.text) {
                if segment.is_blank() {
                    tracing::debug!(
                        "Skipping empty fragment #{} in {}",
                        segment.index,
                        source.relative
                    );
                    continue;
                }

                match self.load_post(&source, &segment, &mut slugs) {
                    Ok(post) if !self.site.config.future && post.date > now => {
                        tracing::info!("Skipping future post {:?}", post.title);
                    }
                    Ok(post) => posts.push(post),
                    Err(e) => {
                        tracing::warn!(
                            "Failed to load post #{} of {}: {}",
                            segment.index,
                            source.relative,
                            e
                        );
                    }
                }
            }
        }

        // Sort by date descending (newest first)
        posts.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.slug.cmp(&b.slug)));

        Ok(posts)
    }

    /// Build one post from a document of a source file
    fn load_post(
        &self,
        source: &SourceFile,
        segment: &Segment<'_>,
        slugs: &mut HashSet<String>,
    ) -> Result<Post> {
        let config = &self.site.config;
        let tz = config.tz();
        let (fm, _, body) = FrontMatter::parse(segment.text)?;

        let date = match fm.parse_published(tz) {
            Some(date) => date,
            None => file_modified(&source.path).unwrap_or_else(Utc::now),
        };

        let title = fm
            .title
            .clone()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| source.stem().to_string());

        let slug = unique_slug(base_slug(source, segment.index, &title, slugs), slugs);

        let category = fm
            .category
            .as_ref()
            .map(Category::from)
            .filter(|c| !c.slug.is_empty())
            .unwrap_or_else(|| Category::new(&config.default_category));

        let reading = fm
            .reading_time
            .clone()
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| {
                reading_time(MarkdownRenderer::word_count(body), config.words_per_minute)
            });

        let path = url_for(config, &format!("{}/{}/", config.post_dir, slug));
        let permalink = full_url_for(config, &format!("{}/{}/", config.post_dir, slug));

        let mut post = Post::new(title, date, source.relative.clone());
        post.slug = slug;
        post.excerpt = fm.excerpt.clone();
        post.category = category;
        post.updated = fm.parse_updated(tz);
        post.author = fm.author.clone();
        post.reading_time = reading;
        post.tags = fm.tags.clone();
        post.featured = fm.featured.unwrap_or(false);
        post.raw = body.to_string();
        post.content = self.renderer.render(body)?;
        post.code_languages = MarkdownRenderer::code_blocks(body)
            .into_iter()
            .filter_map(|b| b.lang)
            .collect();
        post.doc_index = segment.index;
        post.full_source = source.path.clone();
        post.path = path;
        post.permalink = permalink;
        post.extra = fm.extra;

        Ok(post)
    }
}

/// File stem for the first document, the title for bundled ones
///
/// A bundled post whose title is empty or already taken falls back to
/// `<stem>-<index>`.
fn base_slug(source: &SourceFile, index: usize, title: &str, used: &HashSet<String>) -> String {
    let stem = slug::slugify(source.stem());
    if index == 0 {
        return stem;
    }
    match slug::slugify(title) {
        s if s.is_empty() || used.contains(&s) => format!("{}-{}", stem, index),
        s => s,
    }
}

/// Append a counter until the slug is unused
fn unique_slug(base: String, used: &mut HashSet<String>) -> String {
    let base = if base.is_empty() {
        "untitled".to_string()
    } else {
        base
    };

    let mut candidate = base.clone();
    let mut n = 2;
    while used.contains(&candidate) {
        candidate = format!("{}-{}", base, n);
        n += 1;
    }
    used.insert(candidate.clone());
    candidate
}

fn file_modified(path: &Path) -> Option<DateTime<Utc>> {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .map(DateTime::<Utc>::from)
}

/// Check if a file is a markdown file
pub fn is_markdown_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e == "md" || e == "markdown")
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) {
        let path = dir.join("content/posts").join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn site(dir: &TempDir) -> Site {
        Site::with_config(dir.path(), SiteConfig::default())
    }

    #[test]
    fn test_load_single_post() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "docker-volumes.md",
            "---\ntitle: Docker Volumes\ncategory:\n  name: Docker\n  slug: docker\npublishedAt: 2024-02-01T08:00:00Z\ntags: [docker, storage]\n---\n\nSome text.\n\n```bash\ndocker volume ls\n```\n",
        );

        let site = site(&dir);
        let posts = ContentLoader::new(&site).load_posts().unwrap();
        assert_eq!(posts.len(), 1);

        let post = &posts[0];
        assert_eq!(post.slug, "docker-volumes");
        assert_eq!(post.path, "/posts/docker-volumes/");
        assert_eq!(post.permalink, "http://example.com/posts/docker-volumes/");
        assert_eq!(post.category.slug, "docker");
        assert_eq!(post.code_languages, vec!["bash"]);
        assert_eq!(post.reading_time, "1 min read");
        assert!(post.content.contains("Some text."));
    }

    #[test]
    fn test_load_multi_post_file() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "bundle.md",
            "---\ntitle: First\ndate: 2024-01-01\n---\nOne\n<|RELATED_DOC_SEP-magic-1|>\n---\ntitle: Git Rebase Basics\ndate: 2024-01-02\n---\nTwo\n<|RELATED_DOC_SEP-magic-2|>\n",
        );

        let site = site(&dir);
        let posts = ContentLoader::new(&site).load_posts().unwrap();
        assert_eq!(posts.len(), 2);
        // newest first
        assert_eq!(posts[0].slug, "git-rebase-basics");
        assert_eq!(posts[0].doc_index, 1);
        assert_eq!(posts[1].slug, "bundle");
        assert_eq!(posts[1].category.slug, "uncategorized");
    }

    #[test]
    fn test_broken_document_is_skipped() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "good.md", "---\ntitle: Good\n---\nok\n");
        write(dir.path(), "bad.md", "no front matter here\n");

        let site = site(&dir);
        let posts = ContentLoader::new(&site).load_posts().unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].title, "Good");
    }

    #[test]
    fn test_future_posts_hidden_when_disabled() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "later.md",
            "---\ntitle: Later\npublishedAt: 2999-01-01T00:00:00Z\n---\n",
        );

        let config = SiteConfig {
            future: false,
            ..Default::default()
        };
        let site = Site::with_config(dir.path(), config);
        assert!(ContentLoader::new(&site).load_posts().unwrap().is_empty());
    }

    #[test]
    fn test_sources_are_relative_and_sorted() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "b.md", "---\ntitle: B\n---\n");
        write(dir.path(), "nested/a.md", "---\ntitle: A\n---\n");
        write(dir.path(), "notes.txt", "ignored");

        let site = site(&dir);
        let sources = ContentLoader::new(&site).sources().unwrap();
        let names: Vec<_> = sources.iter().map(|s| s.relative.as_str()).collect();
        assert_eq!(names, vec!["b.md", "nested/a.md"]);
    }

    #[test]
    fn test_unique_slug() {
        let mut used = HashSet::new();
        assert_eq!(unique_slug("k8s".to_string(), &mut used), "k8s");
        assert_eq!(unique_slug("k8s".to_string(), &mut used), "k8s-2");
        assert_eq!(unique_slug(String::new(), &mut used), "untitled");
    }

    #[test]
    fn test_bundled_slug_falls_back_to_stem_index() {
        let source = SourceFile {
            path: PathBuf::from("content/posts/notes.md"),
            relative: "notes.md".to_string(),
            text: String::new(),
        };
        let mut used = HashSet::new();
        used.insert("helm-charts".to_string());

        assert_eq!(base_slug(&source, 0, "Anything", &used), "notes");
        assert_eq!(base_slug(&source, 1, "Helm Charts", &used), "notes-1");
        assert_eq!(base_slug(&source, 2, "???", &used), "notes-2");
        assert_eq!(base_slug(&source, 3, "Argo CD", &used), "argo-cd");
    }
}
