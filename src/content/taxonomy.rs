//! Category, tag and archive indexes over a post list

use chrono::Datelike;
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::BTreeMap;

use super::{Category, Post, Tag};

/// Posts grouped under one category or tag
#[derive(Debug, Clone, Serialize)]
pub struct Term {
    pub name: String,
    pub slug: String,
    /// Indices into the post list the taxonomy was built from
    pub posts: Vec<usize>,
}

impl Term {
    pub fn count(&self) -> usize {
        self.posts.len()
    }
}

/// Posts published in one year
#[derive(Debug, Clone, Serialize)]
pub struct ArchiveYear {
    pub year: i32,
    pub posts: Vec<usize>,
}

/// Indexes of a post list
#[derive(Debug, Clone, Default)]
pub struct Taxonomy {
    categories: IndexMap<String, Term>,
    tags: IndexMap<String, Term>,
    archives: Vec<ArchiveYear>,
}

impl Taxonomy {
    /// Index posts by category slug, tag slug and year
    ///
    /// Terms are sorted by slug. Spellings that slugify the same merge, and
    /// the first spelling seen names the term.
    pub fn build(posts: &[Post]) -> Self {
        let mut categories: IndexMap<String, Term> = IndexMap::new();
        let mut tags: IndexMap<String, Term> = IndexMap::new();
        let mut years: BTreeMap<i32, Vec<usize>> = BTreeMap::new();

        for (i, post) in posts.iter().enumerate() {
            add(&mut categories, &post.category.name, &post.category.slug, i);

            for tag in &post.tags {
                let slug = slug::slugify(tag);
                // Skip empty tags
                if slug.is_empty() {
                    continue;
                }
                add(&mut tags, tag.trim(), &slug, i);
            }

            years.entry(post.date.year()).or_default().push(i);
        }

        categories.sort_keys();
        tags.sort_keys();

        let archives = years
            .into_iter()
            .rev()
            .map(|(year, posts)| ArchiveYear { year, posts })
            .collect();

        Self {
            categories,
            tags,
            archives,
        }
    }

    pub fn categories(&self) -> impl Iterator<Item = &Term> {
        self.categories.values()
    }

    pub fn tags(&self) -> impl Iterator<Item = &Term> {
        self.tags.values()
    }

    pub fn archives(&self) -> &[ArchiveYear] {
        &self.archives
    }

    pub fn category(&self, slug: &str) -> Option<&Term> {
        self.categories.get(slug)
    }

    pub fn tag(&self, slug: &str) -> Option<&Term> {
        self.tags.get(slug)
    }

    /// Categories with their post counts
    pub fn category_counts(&self) -> Vec<Category> {
        self.categories()
            .map(|t| Category {
                name: t.name.clone(),
                slug: t.slug.clone(),
                count: t.count(),
            })
            .collect()
    }

    /// Tags with their post counts, most used first
    pub fn tag_counts(&self) -> Vec<Tag> {
        let mut tags: Vec<Tag> = self
            .tags()
            .map(|t| Tag {
                name: t.name.clone(),
                slug: t.slug.clone(),
                count: t.count(),
            })
            .collect();
        tags.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.slug.cmp(&b.slug)));
        tags
    }
}

fn add(terms: &mut IndexMap<String, Term>, name: &str, slug: &str, post: usize) {
    let term = terms.entry(slug.to_string()).or_insert_with(|| Term {
        name: name.to_string(),
        slug: slug.to_string(),
        posts: Vec::new(),
    });
    // A post listing the same tag twice counts once
    if term.posts.last() != Some(&post) {
        term.posts.push(post);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn post(title: &str, year: i32, category: &str, tags: &[&str]) -> Post {
        let date = Utc.with_ymd_and_hms(year, 6, 1, 0, 0, 0).unwrap();
        let mut post = Post::new(title.to_string(), date, format!("{}.md", title));
        post.category = Category::new(category);
        post.tags = tags.iter().map(|t| t.to_string()).collect();
        post
    }

    #[test]
    fn test_build_taxonomy() {
        let posts = vec![
            post("a", 2024, "Kubernetes", &["k8s", "Helm"]),
            post("b", 2023, "Docker", &["docker", "k8s"]),
            post("c", 2023, "Kubernetes", &["helm", "  "]),
        ];
        let taxonomy = Taxonomy::build(&posts);

        let categories = taxonomy.category_counts();
        assert_eq!(categories.len(), 2);
        assert_eq!(categories[0].slug, "docker");
        assert_eq!(taxonomy.category("kubernetes").unwrap().posts, vec![0, 2]);

        // "Helm" and "helm" merge; first spelling wins
        let helm = taxonomy.tag("helm").unwrap();
        assert_eq!(helm.name, "Helm");
        assert_eq!(helm.count(), 2);

        let tags = taxonomy.tag_counts();
        assert_eq!(tags.len(), 3);
        assert_eq!(tags[0].slug, "helm");
        assert_eq!(tags[1].slug, "k8s");

        let years: Vec<i32> = taxonomy.archives().iter().map(|a| a.year).collect();
        assert_eq!(years, vec![2024, 2023]);
        assert_eq!(taxonomy.archives()[1].posts, vec![1, 2]);
    }

    #[test]
    fn test_duplicate_tag_on_one_post_counts_once() {
        let posts = vec![post("a", 2024, "Git", &["git", "Git"])];
        let taxonomy = Taxonomy::build(&posts);
        assert_eq!(taxonomy.tag("git").unwrap().count(), 1);
    }
}
