//! List site content

use anyhow::Result;
use std::fmt::Write;

use crate::content::{ContentLoader, Taxonomy};
use crate::Site;

/// Print one kind of listing
pub fn run(site: &Site, content_type: &str) -> Result<()> {
    print!("{}", render(site, content_type)?);
    Ok(())
}

/// Build the listing text for `post`, `tag`, `category` or `archive`
pub fn render(site: &Site, content_type: &str) -> Result<String> {
    let posts = ContentLoader::new(site).load_posts()?;
    let taxonomy = Taxonomy::build(&posts);
    let tz = site.config.tz();
    let mut out = String::new();

    match content_type {
        "post" | "posts" => {
            writeln!(out, "Posts ({}):", posts.len())?;
            for post in &posts {
                writeln!(
                    out,
                    "  {} - {} [{}#{}]",
                    post.date.with_timezone(&tz).format("%Y-%m-%d"),
                    post.title,
                    post.source,
                    post.doc_index
                )?;
            }
        }
        "tag" | "tags" => {
            let tags = taxonomy.tag_counts();
            writeln!(out, "Tags ({}):", tags.len())?;
            for tag in tags {
                writeln!(out, "  {} ({})", tag.name, tag.count)?;
            }
        }
        "category" | "categories" => {
            let categories = taxonomy.category_counts();
            writeln!(out, "Categories ({}):", categories.len())?;
            for category in categories {
                writeln!(
                    out,
                    "  {} [{}] ({})",
                    category.name, category.slug, category.count
                )?;
            }
        }
        "archive" | "archives" => {
            writeln!(out, "Archives ({} years):", taxonomy.archives().len())?;
            for year in taxonomy.archives() {
                writeln!(out, "  {} ({})", year.year, year.posts.len())?;
                for &i in &year.posts {
                    writeln!(out, "    {}", posts[i].title)?;
                }
            }
        }
        _ => {
            anyhow::bail!(
                "Unknown type: {}. Available: post, tag, category, archive",
                content_type
            );
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn site() -> (TempDir, Site) {
        let dir = TempDir::new().unwrap();
        let posts = dir.path().join("content/posts");
        fs::create_dir_all(&posts).unwrap();
        fs::write(
            posts.join("bundle.md"),
            "---\ntitle: First\ncategory:\n  name: CI/CD\n  slug: ci-cd\npublishedAt: 2023-04-01T00:00:00Z\ntags: [jenkins, ci]\n---\nOne\n<|RELATED_DOC_SEP|>\n---\ntitle: Second\ncategory:\n  name: CI/CD\n  slug: ci-cd\npublishedAt: 2024-04-01T00:00:00Z\ntags: [ci]\n---\nTwo\n",
        )
        .unwrap();
        let site = Site::new(dir.path()).unwrap();
        (dir, site)
    }

    #[test]
    fn test_list_posts() {
        let (_dir, site) = site();
        let out = render(&site, "post").unwrap();
        assert!(out.starts_with("Posts (2):"));
        assert!(out.contains("2024-04-01 - Second [bundle.md#1]"));
    }

    #[test]
    fn test_list_taxonomies() {
        let (_dir, site) = site();
        let tags = render(&site, "tags").unwrap();
        assert!(tags.contains("Tags (2):\n  ci (2)\n  jenkins (1)"));

        let categories = render(&site, "category").unwrap();
        assert!(categories.contains("CI/CD [ci-cd] (2)"));

        let archives = render(&site, "archive").unwrap();
        assert!(archives.contains("  2024 (1)\n    Second"));
    }

    #[test]
    fn test_list_unknown_type() {
        let (_dir, site) = site();
        assert!(render(&site, "route").is_err());
    }
}
