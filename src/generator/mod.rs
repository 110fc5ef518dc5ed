//! Generator module - writes the static site using the built-in Tera templates

use anyhow::{Context as _, Result};
use std::fs;
use std::path::Path;

use tera::Context;
use walkdir::WalkDir;

use crate::content::taxonomy::Term;
use crate::content::{Post, Taxonomy};
use crate::helpers::{
    absolutize_links, escape_xml, full_url_for, strip_html, strip_invalid_xml_chars, url_for,
};
use crate::templates::{
    ArchiveYearData, NavLinks, NavPost, PaginationData, PostData, SiteData, TemplateRenderer,
    TermLink, STYLESHEET,
};
use crate::Site;

/// Static site generator using Tera templates
pub struct Generator {
    site: Site,
    renderer: TemplateRenderer,
}

impl Generator {
    /// Create a new generator
    pub fn new(site: &Site) -> Result<Self> {
        let renderer = TemplateRenderer::new()?;

        Ok(Self {
            site: site.clone(),
            renderer,
        })
    }

    /// Generate the entire site
    pub fn generate(&self, posts: &[Post]) -> Result<()> {
        let public_dir = &self.site.public_dir;
        fs::create_dir_all(public_dir)
            .with_context(|| format!("Failed to create {}", public_dir.display()))?;

        self.write_file("css/style.css", STYLESHEET)?;
        self.copy_static_assets()?;

        // Sort posts by date (newest first)
        let mut sorted_posts: Vec<_> = posts.to_vec();
        sorted_posts.sort_by(|a, b| b.date.cmp(&a.date));

        let taxonomy = Taxonomy::build(&sorted_posts);
        let site_data = self.build_site_data(&sorted_posts, &taxonomy);
        let post_data: Vec<PostData> = sorted_posts.iter().map(|p| self.post_data(p)).collect();

        self.generate_index_pages(&post_data, &site_data)?;
        self.generate_post_pages(&sorted_posts, &post_data, &site_data)?;
        self.generate_term_pages(
            "Category",
            &self.site.config.category_dir,
            taxonomy.categories(),
            &post_data,
            &site_data,
        )?;
        self.generate_term_pages(
            "Tag",
            &self.site.config.tag_dir,
            taxonomy.tags(),
            &post_data,
            &site_data,
        )?;
        self.generate_archive_page(&taxonomy, &post_data, &site_data)?;
        self.generate_atom_feed(&sorted_posts)?;
        self.generate_search_index(&sorted_posts)?;

        Ok(())
    }

    /// Build site data for templates
    fn build_site_data(&self, posts: &[Post], taxonomy: &Taxonomy) -> SiteData {
        let config = &self.site.config;

        SiteData {
            title: config.title.clone(),
            description: config.description.clone(),
            url: config.url.clone(),
            root: config.root.clone(),
            language: config.language.clone(),
            post_count: posts.len(),
            categories: taxonomy
                .categories()
                .map(|t| self.term_link(&config.category_dir, t))
                .collect(),
            tags: taxonomy
                .tags()
                .map(|t| self.term_link(&config.tag_dir, t))
                .collect(),
            links: NavLinks {
                home: url_for(config, ""),
                archives: url_for(config, &format!("{}/", config.archive_dir)),
                categories: url_for(config, &format!("{}/", config.category_dir)),
                tags: url_for(config, &format!("{}/", config.tag_dir)),
                feed: url_for(config, "atom.xml"),
                stylesheet: url_for(config, "css/style.css"),
            },
        }
    }

    fn term_link(&self, dir: &str, term: &Term) -> TermLink {
        TermLink {
            name: term.name.clone(),
            slug: term.slug.clone(),
            path: url_for(&self.site.config, &format!("{}/{}/", dir, term.slug)),
            count: term.count(),
        }
    }

    fn post_data(&self, post: &Post) -> PostData {
        let config = &self.site.config;
        let tz = config.tz();

        PostData {
            title: post.title.clone(),
            slug: post.slug.clone(),
            path: post.path.clone(),
            permalink: post.permalink.clone(),
            excerpt: post.excerpt.clone(),
            date: post.date.with_timezone(&tz).format("%Y-%m-%d").to_string(),
            date_iso: post.date.to_rfc3339(),
            updated: post
                .updated
                .map(|u| u.with_timezone(&tz).format("%Y-%m-%d").to_string()),
            reading_time: post.reading_time.clone(),
            author: post.author.as_ref().map(|a| a.name.clone()),
            category: TermLink {
                name: post.category.name.clone(),
                slug: post.category.slug.clone(),
                path: url_for(
                    config,
                    &format!("{}/{}/", config.category_dir, post.category.slug),
                ),
                count: 0,
            },
            tags: post
                .tags
                .iter()
                .map(|t| slug::slugify(t))
                .zip(post.tags.iter())
                .filter(|(slug, _)| !slug.is_empty())
                .map(|(slug, name)| TermLink {
                    name: name.trim().to_string(),
                    path: url_for(config, &format!("{}/{}/", config.tag_dir, slug)),
                    slug,
                    count: 0,
                })
                .collect(),
            featured: post.featured,
            content: post.content.clone(),
        }
    }

    fn base_context(&self, site_data: &SiteData) -> Context {
        let mut context = Context::new();
        context.insert("site", site_data);
        context
    }

    /// Generate listing pages with pagination
    fn generate_index_pages(&self, posts: &[PostData], site_data: &SiteData) -> Result<()> {
        let config = &self.site.config;
        let per_page = if config.per_page == 0 {
            posts.len().max(1)
        } else {
            config.per_page
        };
        let total_pages = posts.len().div_ceil(per_page).max(1);

        let page_dir = |n: usize| -> String {
            if n == 1 {
                String::new()
            } else {
                format!("{}/{}/", config.pagination_dir, n)
            }
        };

        for page_num in 1..=total_pages {
            let start = (page_num - 1) * per_page;
            let end = (start + per_page).min(posts.len());

            let pagination = PaginationData {
                current: page_num,
                total: total_pages,
                prev_link: (page_num > 1).then(|| url_for(config, &page_dir(page_num - 1))),
                next_link: (page_num < total_pages)
                    .then(|| url_for(config, &page_dir(page_num + 1))),
            };

            let mut context = self.base_context(site_data);
            context.insert("page_posts", &posts[start..end]);
            context.insert("pagination", &pagination);

            let html = self.renderer.render("index.html", &context)?;
            self.write_page(&page_dir(page_num), &html)?;
        }

        tracing::debug!("Generated {} listing page(s)", total_pages);
        Ok(())
    }

    /// Generate individual post pages
    fn generate_post_pages(
        &self,
        posts: &[Post],
        post_data: &[PostData],
        site_data: &SiteData,
    ) -> Result<()> {
        let config = &self.site.config;
        let nav = |p: &Post| NavPost {
            title: p.title.clone(),
            path: p.path.clone(),
        };

        for (post, data) in posts.iter().zip(post_data) {
            let mut context = self.base_context(site_data);
            context.insert("post", data);
            context.insert("prev_post", &post.prev(posts).map(nav));
            context.insert("next_post", &post.next(posts).map(nav));

            let html = self.renderer.render("post.html", &context)?;
            self.write_page(&format!("{}/{}/", config.post_dir, post.slug), &html)?;
        }

        tracing::info!("Generated {} post pages", posts.len());
        Ok(())
    }

    /// Generate one page per category or tag plus an overview page
    fn generate_term_pages<'t>(
        &self,
        kind: &str,
        dir: &str,
        terms: impl Iterator<Item = &'t Term>,
        posts: &[PostData],
        site_data: &SiteData,
    ) -> Result<()> {
        let mut links = Vec::new();

        for term in terms {
            let link = self.term_link(dir, term);
            let term_posts: Vec<&PostData> = term.posts.iter().map(|&i| &posts[i]).collect();

            let mut context = self.base_context(site_data);
            context.insert("term_kind", kind);
            context.insert("term", &link);
            context.insert("term_posts", &term_posts);

            let html = self.renderer.render("term.html", &context)?;
            self.write_page(&format!("{}/{}/", dir, term.slug), &html)?;
            links.push(link);
        }

        let heading = match kind {
            "Category" => "Categories".to_string(),
            other => format!("{}s", other),
        };
        let mut context = self.base_context(site_data);
        context.insert("heading", &heading);
        context.insert("terms", &links);
        let html = self.renderer.render("terms.html", &context)?;
        self.write_page(&format!("{}/", dir), &html)?;

        tracing::info!("Generated {} {} pages", links.len(), kind.to_lowercase());
        Ok(())
    }

    /// Generate archive page
    fn generate_archive_page(
        &self,
        taxonomy: &Taxonomy,
        posts: &[PostData],
        site_data: &SiteData,
    ) -> Result<()> {
        let archive_years: Vec<ArchiveYearData> = taxonomy
            .archives()
            .iter()
            .map(|year| ArchiveYearData {
                year: year.year,
                posts: year.posts.iter().map(|&i| posts[i].clone()).collect(),
            })
            .collect();

        let mut context = self.base_context(site_data);
        context.insert("archive_years", &archive_years);

        let html = self.renderer.render("archive.html", &context)?;
        self.write_page(&format!("{}/", self.site.config.archive_dir), &html)?;
        tracing::info!("Generated archive page");

        Ok(())
    }

    /// Generate Atom feed
    fn generate_atom_feed(&self, posts: &[Post]) -> Result<()> {
        let config = &self.site.config;
        let home = full_url_for(config, "");
        let feed_updated = posts
            .iter()
            .map(Post::modified)
            .max()
            .unwrap_or_else(chrono::Utc::now);

        let mut feed = String::new();
        feed.push_str(r#"<?xml version="1.0" encoding="utf-8"?>"#);
        feed.push('\n');
        feed.push_str(r#"<feed xmlns="http://www.w3.org/2005/Atom">"#);
        feed.push('\n');
        feed.push_str(&format!("  <title>{}</title>\n", escape_xml(&config.title)));
        if !config.description.is_empty() {
            feed.push_str(&format!(
                "  <subtitle>{}</subtitle>\n",
                escape_xml(&config.description)
            ));
        }
        feed.push_str(&format!(
            "  <link href=\"{}\" rel=\"self\"/>\n",
            full_url_for(config, "atom.xml")
        ));
        feed.push_str(&format!("  <link href=\"{}\"/>\n", home));
        feed.push_str(&format!(
            "  <updated>{}</updated>\n",
            feed_updated.to_rfc3339()
        ));
        feed.push_str(&format!("  <id>{}</id>\n", home));
        if !config.author.is_empty() {
            feed.push_str(&format!(
                "  <author><name>{}</name></author>\n",
                escape_xml(&config.author)
            ));
        }

        for post in posts.iter().take(config.feed_limit) {
            feed.push_str("  <entry>\n");
            feed.push_str(&format!("    <title>{}</title>\n", escape_xml(&post.title)));
            feed.push_str(&format!("    <link href=\"{}\"/>\n", post.permalink));
            feed.push_str(&format!("    <id>{}</id>\n", post.permalink));
            feed.push_str(&format!(
                "    <published>{}</published>\n",
                post.date.to_rfc3339()
            ));
            feed.push_str(&format!(
                "    <updated>{}</updated>\n",
                post.modified().to_rfc3339()
            ));
            if let Some(author) = &post.author {
                feed.push_str(&format!(
                    "    <author><name>{}</name></author>\n",
                    escape_xml(&author.name)
                ));
            }
            feed.push_str(&format!(
                "    <category term=\"{}\" label=\"{}\"/>\n",
                escape_xml(&post.category.slug),
                escape_xml(&post.category.name)
            ));
            if let Some(excerpt) = &post.excerpt {
                feed.push_str(&format!(
                    "    <summary>{}</summary>\n",
                    escape_xml(&strip_invalid_xml_chars(excerpt))
                ));
            }
            let content = absolutize_links(&post.content, &config.url);
            let content = strip_invalid_xml_chars(&content).replace("]]>", "]]]]><![CDATA[>");
            feed.push_str(&format!(
                "    <content type=\"html\"><![CDATA[{}]]></content>\n",
                content
            ));
            feed.push_str("  </entry>\n");
        }

        feed.push_str("</feed>\n");

        self.write_file("atom.xml", &feed)?;
        tracing::info!("Generated atom.xml");

        Ok(())
    }

    /// Generate search data (JSON)
    fn generate_search_index(&self, posts: &[Post]) -> Result<()> {
        let search_data: Vec<serde_json::Value> = posts
            .iter()
            .map(|p| {
                serde_json::json!({
                    "title": p.title,
                    "url": p.path,
                    "excerpt": p.excerpt,
                    "category": p.category.name,
                    "tags": p.tags,
                    "date": p.date.to_rfc3339(),
                    "content": strip_html(&p.content),
                })
            })
            .collect();

        let json = serde_json::to_string_pretty(&search_data)?;
        self.write_file("search.json", &json)?;
        tracing::info!("Generated search.json");

        Ok(())
    }

    /// Copy files under the static directory into the public directory
    fn copy_static_assets(&self) -> Result<()> {
        let static_dir = self.site.base_dir.join(&self.site.config.static_dir);
        if !static_dir.is_dir() {
            return Ok(());
        }

        for entry in WalkDir::new(&static_dir)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            let relative = path.strip_prefix(&static_dir)?;
            let dest = self.site.public_dir.join(relative);
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(path, &dest)
                .with_context(|| format!("Failed to copy {}", path.display()))?;
        }

        Ok(())
    }

    /// Write `<dir>/index.html` under the public directory
    fn write_page(&self, dir: &str, html: &str) -> Result<()> {
        let dir = dir.trim_matches('/');
        let relative = if dir.is_empty() {
            "index.html".to_string()
        } else {
            format!("{}/index.html", dir)
        };
        self.write_file(&relative, html)
    }

    fn write_file(&self, relative: &str, content: &str) -> Result<()> {
        let output_path = self.site.public_dir.join(Path::new(relative));
        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create dir {}", parent.display()))?;
        }
        fs::write(&output_path, content)
            .with_context(|| format!("Failed to write {}", output_path.display()))?;
        tracing::debug!("Generated: {:?}", output_path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use crate::content::ContentLoader;
    use tempfile::TempDir;

    fn write_post(dir: &Path, name: &str, content: &str) {
        let path = dir.join("content/posts").join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn post_source(title: &str, date: &str, category: &str, tags: &[&str]) -> String {
        format!(
            "---\ntitle: {}\nexcerpt: About {}\ncategory:\n  name: {}\n  slug: {}\npublishedAt: {}\nauthor:\n  name: Jane Ops\n  slug: jane-ops\ntags: [{}]\n---\n\nBody of {} with a [link](/tags/).\n",
            title,
            title,
            category,
            slug::slugify(category),
            date,
            tags.join(", "),
            title
        )
    }

    fn build(dir: &TempDir, config: SiteConfig) -> Site {
        write_post(
            dir.path(),
            "terraform-state.md",
            &post_source("Terraform State", "2024-03-01T00:00:00Z", "Terraform", &["terraform", "aws"]),
        );
        write_post(
            dir.path(),
            "docker-layers.md",
            &post_source("Docker Layers", "2023-07-01T00:00:00Z", "Docker", &["docker"]),
        );
        write_post(
            dir.path(),
            "git-bisect.md",
            &post_source("Git Bisect & You", "2024-05-01T00:00:00Z", "Git", &["git"]),
        );

        let site = Site::with_config(dir.path(), config);
        let posts = ContentLoader::new(&site).load_posts().unwrap();
        Generator::new(&site).unwrap().generate(&posts).unwrap();
        site
    }

    #[test]
    fn test_generate_site_layout() {
        let dir = TempDir::new().unwrap();
        let site = build(&dir, SiteConfig::default());
        let public = &site.public_dir;

        for page in [
            "index.html",
            "posts/terraform-state/index.html",
            "posts/git-bisect/index.html",
            "categories/index.html",
            "categories/docker/index.html",
            "tags/index.html",
            "tags/aws/index.html",
            "archives/index.html",
            "atom.xml",
            "search.json",
            "css/style.css",
        ] {
            assert!(public.join(page).exists(), "missing {}", page);
        }

        let index = fs::read_to_string(public.join("index.html")).unwrap();
        // newest first
        let git = index.find("Git Bisect &amp; You").unwrap();
        let docker = index.find("Docker Layers").unwrap();
        assert!(git < docker);
    }

    #[test]
    fn test_pagination() {
        let dir = TempDir::new().unwrap();
        let config = SiteConfig {
            per_page: 2,
            ..Default::default()
        };
        let site = build(&dir, config);

        let second = fs::read_to_string(site.public_dir.join("page/2/index.html")).unwrap();
        assert!(second.contains("Docker Layers"));
        assert!(second.contains("Page 2 of 2"));
        assert!(!site.public_dir.join("page/3/index.html").exists());
    }

    #[test]
    fn test_post_navigation() {
        let dir = TempDir::new().unwrap();
        let site = build(&dir, SiteConfig::default());
        let page =
            fs::read_to_string(site.public_dir.join("posts/terraform-state/index.html")).unwrap();
        assert!(page.contains(r#"href="/posts/docker-layers/""#));
        assert!(page.contains(r#"href="/posts/git-bisect/""#));
        assert!(page.contains("Body of Terraform State"));
    }

    #[test]
    fn test_feed_and_search() {
        let dir = TempDir::new().unwrap();
        let config = SiteConfig {
            url: "https://blog.example.org".to_string(),
            feed_limit: 2,
            ..Default::default()
        };
        let site = build(&dir, config);

        let feed = fs::read_to_string(site.public_dir.join("atom.xml")).unwrap();
        assert_eq!(feed.matches("<entry>").count(), 2);
        assert!(feed.contains("<title>Git Bisect &amp; You</title>"));
        assert!(feed.contains(r#"href="https://blog.example.org/tags/""#));
        assert!(feed.contains("<updated>2024-05-01T00:00:00+00:00</updated>"));

        let search = fs::read_to_string(site.public_dir.join("search.json")).unwrap();
        let entries: Vec<serde_json::Value> = serde_json::from_str(&search).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0]["url"], "/posts/git-bisect/");
        assert_eq!(entries[2]["category"], "Docker");
    }

    #[test]
    fn test_static_assets_are_copied() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("static/img")).unwrap();
        fs::write(dir.path().join("static/img/logo.svg"), "<svg/>").unwrap();
        let site = build(&dir, SiteConfig::default());
        assert!(site.public_dir.join("img/logo.svg").exists());
    }

    #[test]
    fn test_declared_category_slugs_stay_inside_public() {
        let dir = TempDir::new().unwrap();
        write_post(
            dir.path(),
            "escape.md",
            "---\ntitle: Escape\ncategory:\n  name: Ops\n  slug: ../../escaped\npublishedAt: 2024-01-01T00:00:00Z\n---\nBody\n",
        );
        write_post(
            dir.path(),
            "marks.md",
            "---\ntitle: Marks\ncategory: '???'\npublishedAt: 2024-01-02T00:00:00Z\n---\nBody\n",
        );

        let site = Site::with_config(dir.path(), SiteConfig::default());
        let posts = ContentLoader::new(&site).load_posts().unwrap();
        Generator::new(&site).unwrap().generate(&posts).unwrap();

        assert!(!dir.path().join("escaped").exists());
        assert!(site.public_dir.join("categories/escaped/index.html").exists());
        assert!(site
            .public_dir
            .join("categories/uncategorized/index.html")
            .exists());

        let overview = fs::read_to_string(site.public_dir.join("categories/index.html")).unwrap();
        assert!(overview.contains("<h1>Categories</h1>"));
        assert!(!overview.contains("/categories//"));
    }
}
