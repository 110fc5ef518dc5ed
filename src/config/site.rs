//! Site configuration (_config.yml)

use anyhow::Result;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Site
    pub title: String,
    pub description: String,
    pub author: String,
    pub language: String,
    pub timezone: String,

    // URL
    pub url: String,
    pub root: String,

    // Directory
    pub content_dir: String,
    pub public_dir: String,
    pub static_dir: String,
    pub post_dir: String,
    pub tag_dir: String,
    pub category_dir: String,
    pub archive_dir: String,

    // Writing
    pub default_category: String,
    pub words_per_minute: usize,
    pub future: bool,
    #[serde(default)]
    pub highlight: HighlightConfig,

    // Listing & feed
    pub per_page: usize,
    pub pagination_dir: String,
    pub feed_limit: usize,

    #[serde(default)]
    pub lint: LintConfig,

    // Store any additional fields
    #[serde(flatten)]
    pub extra: HashMap<String, serde_yaml::Value>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "DevOps Notes".to_string(),
            description: String::new(),
            author: String::new(),
            language: "en".to_string(),
            timezone: "UTC".to_string(),

            url: "http://example.com".to_string(),
            root: "/".to_string(),

            content_dir: "content/posts".to_string(),
            public_dir: "public".to_string(),
            static_dir: "static".to_string(),
            post_dir: "posts".to_string(),
            tag_dir: "tags".to_string(),
            category_dir: "categories".to_string(),
            archive_dir: "archives".to_string(),

            default_category: DEFAULT_CATEGORY.to_string(),
            words_per_minute: 200,
            future: true,
            highlight: HighlightConfig::default(),

            per_page: 10,
            pagination_dir: "page".to_string(),
            feed_limit: 20,

            lint: LintConfig::default(),
            extra: HashMap::new(),
        }
    }
}

impl SiteConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: SiteConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Time zone for timestamps written without an offset
    pub fn tz(&self) -> Tz {
        match self.timezone.trim() {
            "" => Tz::UTC,
            name => name.parse::<Tz>().unwrap_or_else(|_| {
                tracing::warn!("Unknown timezone {:?}, falling back to UTC", name);
                Tz::UTC
            }),
        }
    }
}

/// Syntax highlighting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightConfig {
    pub theme: String,
    pub line_number: bool,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            theme: "base16-ocean.dark".to_string(),
            line_number: true,
        }
    }
}

/// Content lint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LintConfig {
    /// Language tags accepted on fenced code blocks
    pub languages: Vec<String>,
    /// Front-matter keys every post must carry
    pub required: Vec<String>,
    /// Glob patterns, relative to the content directory, of files to skip
    pub ignore: Vec<String>,
    /// Rule ids to turn off
    pub disable: Vec<String>,
}

/// Category of posts that declare none
pub const DEFAULT_CATEGORY: &str = "uncategorized";

const DEFAULT_LANGUAGES: &[&str] = &[
    "bash",
    "sh",
    "shell",
    "console",
    "hcl",
    "terraform",
    "yaml",
    "yml",
    "json",
    "python",
    "javascript",
    "js",
    "typescript",
    "ts",
    "dockerfile",
    "docker",
    "go",
    "java",
    "ini",
    "toml",
    "text",
    "plaintext",
    "sql",
    "groovy",
    "makefile",
    "nginx",
    "xml",
    "diff",
    "powershell",
    "ruby",
    "rust",
];

const DEFAULT_REQUIRED: &[&str] = &["title", "category", "date", "author", "tags"];

impl Default for LintConfig {
    fn default() -> Self {
        Self {
            languages: DEFAULT_LANGUAGES.iter().map(|s| s.to_string()).collect(),
            required: DEFAULT_REQUIRED.iter().map(|s| s.to_string()).collect(),
            ignore: Vec::new(),
            disable: Vec::new(),
        }
    }
}
