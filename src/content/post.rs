//! Post and taxonomy models

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::NamedRef;
use crate::config::DEFAULT_CATEGORY;

/// A blog post
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    /// Post title
    pub title: String,

    /// URL-friendly name
    pub slug: String,

    /// Short summary from front matter
    pub excerpt: Option<String>,

    /// Topical grouping
    pub category: Category,

    /// Post author
    pub author: Option<NamedRef>,

    /// Publication date
    pub date: DateTime<Utc>,

    /// Last updated date
    pub updated: Option<DateTime<Utc>>,

    /// Reading time label ("7 min read")
    pub reading_time: String,

    /// Post tags
    pub tags: Vec<String>,

    /// Highlighted on the listing
    pub featured: bool,

    /// Raw markdown body
    pub raw: String,

    /// Rendered HTML content
    pub content: String,

    /// Language hints of fenced code blocks, in order
    pub code_languages: Vec<String>,

    /// Source file path (relative to the content directory)
    pub source: String,

    /// Position within a multi-post file
    pub doc_index: usize,

    /// Full source file path
    pub full_source: PathBuf,

    /// URL path (with root)
    pub path: String,

    /// Full permalink URL
    pub permalink: String,

    /// Custom front-matter fields
    #[serde(flatten)]
    pub extra: IndexMap<String, serde_yaml::Value>,
}

impl Post {
    /// Create a new post with minimal required fields
    pub fn new(title: String, date: DateTime<Utc>, source: String) -> Self {
        let slug = slug::slugify(&title);
        Self {
            title,
            slug,
            excerpt: None,
            category: Category::new(DEFAULT_CATEGORY),
            author: None,
            date,
            updated: None,
            reading_time: String::new(),
            tags: Vec::new(),
            featured: false,
            raw: String::new(),
            content: String::new(),
            code_languages: Vec::new(),
            source: source.clone(),
            doc_index: 0,
            full_source: PathBuf::from(&source),
            path: String::new(),
            permalink: String::new(),
            extra: IndexMap::new(),
        }
    }

    /// Unique key of the post within the corpus
    pub fn key(&self) -> (&str, usize) {
        (&self.source, self.doc_index)
    }

    /// The post published before this one in a newest-first list
    pub fn prev<'a>(&self, posts: &'a [Post]) -> Option<&'a Post> {
        let pos = posts.iter().position(|p| p.key() == self.key())?;
        posts.get(pos + 1)
    }

    /// The post published after this one in a newest-first list
    pub fn next<'a>(&self, posts: &'a [Post]) -> Option<&'a Post> {
        let pos = posts.iter().position(|p| p.key() == self.key())?;
        pos.checked_sub(1).map(|i| &posts[i])
    }

    /// Last time the post changed
    pub fn modified(&self) -> DateTime<Utc> {
        self.updated.unwrap_or(self.date)
    }
}

/// Reading time label for a word count, at least one minute
pub fn reading_time(words: usize, words_per_minute: usize) -> String {
    let minutes = words.div_ceil(words_per_minute.max(1)).max(1);
    format!("{} min read", minutes)
}

/// A category a post belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    pub slug: String,
    pub count: usize,
}

impl Category {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            slug: slug::slugify(name),
            count: 0,
        }
    }
}

impl From<&NamedRef> for Category {
    fn from(named: &NamedRef) -> Self {
        let slug = named.slug();
        let name = match named.name.trim() {
            "" => slug.clone(),
            name => name.to_string(),
        };
        Self {
            name,
            slug,
            count: 0,
        }
    }
}

/// A tag with its post count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    pub slug: String,
    pub count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn post(source: &str, day: u32) -> Post {
        let date = Utc.with_ymd_and_hms(2024, 5, day, 0, 0, 0).unwrap();
        Post::new(format!("Post {}", day), date, source.to_string())
    }

    #[test]
    fn test_prev_next() {
        let posts = vec![post("c.md", 3), post("b.md", 2), post("a.md", 1)];
        assert_eq!(posts[1].prev(&posts).unwrap().source, "a.md");
        assert_eq!(posts[1].next(&posts).unwrap().source, "c.md");
        assert!(posts[0].next(&posts).is_none());
        assert!(posts[2].prev(&posts).is_none());
        assert!(post("z.md", 4).prev(&posts).is_none());
    }

    #[test]
    fn test_modified_falls_back_to_date() {
        let date = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let mut post = Post::new("Post".to_string(), date, "a.md".to_string());
        assert_eq!(post.modified(), date);
        assert_eq!(
            post.category.slug,
            crate::config::SiteConfig::default().default_category
        );

        let updated = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        post.updated = Some(updated);
        assert_eq!(post.modified(), updated);
    }

    #[test]
    fn test_reading_time() {
        assert_eq!(reading_time(0, 200), "1 min read");
        assert_eq!(reading_time(200, 200), "1 min read");
        assert_eq!(reading_time(201, 200), "2 min read");
        assert_eq!(reading_time(10, 0), "10 min read");
    }

    #[test]
    fn test_category_from_named_ref() {
        let named = NamedRef {
            name: "AWS & Cloud".to_string(),
            slug: None,
        };
        let category = Category::from(&named);
        assert_eq!(category.slug, "aws-cloud");
    }

    #[test]
    fn test_category_slug_is_sanitized() {
        let escaping = NamedRef {
            name: "Ops".to_string(),
            slug: Some("../../escaped".to_string()),
        };
        assert_eq!(Category::from(&escaping).slug, "escaped");

        let nameless = NamedRef {
            name: String::new(),
            slug: Some("git".to_string()),
        };
        let category = Category::from(&nameless);
        assert_eq!(category.name, "git");

        let empty = NamedRef {
            name: "???".to_string(),
            slug: None,
        };
        assert_eq!(Category::from(&empty).slug, "");
    }
}
