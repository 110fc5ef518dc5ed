//! Front-matter parsing

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use indexmap::IndexMap;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml::{Mapping, Value};
use thiserror::Error;

/// Why a document's front matter could not be read
#[derive(Error, Debug)]
pub enum FrontMatterError {
    #[error("document does not open with a `---` front-matter block")]
    Missing,

    #[error("front-matter block is never closed with `---`")]
    Unterminated,

    #[error("front matter is not a YAML mapping")]
    NotAMapping,

    #[error("invalid YAML front matter: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Custom deserializer that handles both a single string and a list of strings
fn string_or_vec<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::{self, SeqAccess, Visitor};
    use std::fmt;

    struct StringOrVec;

    impl<'de> Visitor<'de> for StringOrVec {
        type Value = Vec<String>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a string or a list of strings")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(vec![value.to_string()])
        }

        fn visit_string<E>(self, value: String) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(vec![value])
        }

        fn visit_seq<S>(self, mut seq: S) -> Result<Self::Value, S::Error>
        where
            S: SeqAccess<'de>,
        {
            let mut vec = Vec::new();
            while let Some(item) = seq.next_element::<String>()? {
                vec.push(item);
            }
            Ok(vec)
        }

        fn visit_none<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Vec::new())
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Vec::new())
        }
    }

    deserializer.deserialize_any(StringOrVec)
}

/// Accepts `readingTime: 5` as well as `readingTime: "5 min read"`
fn scalar_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::{self, Visitor};
    use std::fmt;

    struct Scalar;

    impl<'de> Visitor<'de> for Scalar {
        type Value = Option<String>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a string or a number")
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
            Ok(Some(value.to_string()))
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> Result<Self::Value, E> {
            Ok(Some(value.to_string()))
        }

        fn visit_i64<E: de::Error>(self, value: i64) -> Result<Self::Value, E> {
            Ok(Some(value.to_string()))
        }

        fn visit_f64<E: de::Error>(self, value: f64) -> Result<Self::Value, E> {
            Ok(Some(value.to_string()))
        }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }
    }

    deserializer.deserialize_any(Scalar)
}

/// A `{ name, slug }` pair, as used by `category` and `author`
///
/// A bare string is accepted and taken as the name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "NamedRefRepr")]
pub struct NamedRef {
    pub name: String,
    pub slug: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NamedRefRepr {
    Name(String),
    Full {
        #[serde(default)]
        name: String,
        #[serde(default)]
        slug: Option<String>,
    },
}

impl From<NamedRefRepr> for NamedRef {
    fn from(repr: NamedRefRepr) -> Self {
        match repr {
            NamedRefRepr::Name(name) => Self { name, slug: None },
            NamedRefRepr::Full { name, slug } => Self { name, slug },
        }
    }
}

impl NamedRef {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            slug: Some(slug::slugify(name)),
        }
    }

    /// URL-safe slug: the declared one run through `slugify`, else one
    /// derived from the name. Empty when neither yields anything.
    pub fn slug(&self) -> String {
        match self.slug.as_deref().map(slug::slugify) {
            Some(s) if !s.is_empty() => s,
            _ => slug::slugify(&self.name),
        }
    }
}

/// Front-matter data of a single post
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FrontMatter {
    pub title: Option<String>,
    pub excerpt: Option<String>,
    pub category: Option<NamedRef>,
    pub date: Option<String>,
    #[serde(rename = "publishedAt")]
    pub published_at: Option<String>,
    #[serde(rename = "updatedAt")]
    pub updated_at: Option<String>,
    #[serde(rename = "readingTime", deserialize_with = "scalar_string")]
    pub reading_time: Option<String>,
    pub author: Option<NamedRef>,
    #[serde(deserialize_with = "string_or_vec")]
    pub tags: Vec<String>,
    pub featured: Option<bool>,

    /// Additional custom fields, in file order
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

/// The untyped front-matter mapping
///
/// Kept next to [`FrontMatter`] so checks can tell a missing key from one
/// that is present but empty.
#[derive(Debug, Clone, Default)]
pub struct RawFields(Mapping);

impl RawFields {
    /// Look up a key, descending into mappings on `.` (`category.slug`)
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let mut current = self.0.get(parts.next()?)?;
        for part in parts {
            current = current.as_mapping()?.get(part)?;
        }
        Some(current)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    /// Present and not null, blank, or an empty collection
    pub fn is_filled(&self, path: &str) -> bool {
        match self.get(path) {
            None | Some(Value::Null) => false,
            Some(Value::String(s)) => !s.trim().is_empty(),
            Some(Value::Sequence(seq)) => !seq.is_empty(),
            Some(Value::Mapping(map)) => !map.is_empty(),
            Some(_) => true,
        }
    }

    /// The value as text, if it is a scalar
    pub fn get_str(&self, path: &str) -> Option<String> {
        match self.get(path)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().filter_map(|k| k.as_str())
    }
}

/// Cut a document into its YAML block and the Markdown body
///
/// The document must open with a `---` line. The block ends at the next
/// line that is exactly `---` or `...`.
pub fn split_front_matter(doc: &str) -> Result<(&str, &str), FrontMatterError> {
    let doc = doc.trim_start();
    let (first, rest) = doc.split_once('\n').unwrap_or((doc, ""));
    if first.trim_end() != "---" {
        return Err(FrontMatterError::Missing);
    }

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        let content = line.trim_end();
        if content == "---" || content == "..." {
            let yaml = &rest[..offset];
            let body = &rest[offset + line.len()..];
            return Ok((yaml, body.trim_start_matches(['\n', '\r'])));
        }
        offset += line.len();
    }

    Err(FrontMatterError::Unterminated)
}

impl FrontMatter {
    /// Parse front matter from a document
    /// Returns (front_matter, raw_fields, body)
    pub fn parse(doc: &str) -> Result<(Self, RawFields, &str), FrontMatterError> {
        let (yaml, body) = split_front_matter(doc)?;

        let value: Value = if yaml.trim().is_empty() {
            Value::Null
        } else {
            serde_yaml::from_str(yaml)?
        };

        let mapping = match value {
            Value::Mapping(mapping) => mapping,
            Value::Null => Mapping::new(),
            _ => return Err(FrontMatterError::NotAMapping),
        };

        let fm: FrontMatter = serde_yaml::from_value(Value::Mapping(mapping.clone()))?;
        Ok((fm, RawFields(mapping), body))
    }

    /// Publication time: `publishedAt`, falling back to `date`
    pub fn parse_published(&self, tz: Tz) -> Option<DateTime<Utc>> {
        self.published_at
            .as_deref()
            .and_then(|s| parse_timestamp(s, tz))
            .or_else(|| self.date.as_deref().and_then(|s| parse_timestamp(s, tz)))
    }

    /// Last edit time from `updatedAt`
    pub fn parse_updated(&self, tz: Tz) -> Option<DateTime<Utc>> {
        self.updated_at
            .as_deref()
            .and_then(|s| parse_timestamp(s, tz))
    }
}

/// Parse a timestamp in the formats posts use
///
/// Values without an offset are read as local time in `tz`.
pub fn parse_timestamp(s: &str, tz: Tz) -> Option<DateTime<Utc>> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    // chrono's `%z` does not take a literal `Z`
    let zoned = match s.strip_suffix('Z') {
        Some(rest) => format!("{}+00:00", rest),
        None => s.to_string(),
    };
    let offset_formats = [
        "%Y-%m-%dT%H:%M:%S%.f%:z",
        "%Y-%m-%dT%H:%M:%S%.f%z",
        "%Y-%m-%dT%H:%M%:z",
        "%Y-%m-%dT%H:%M%z",
        "%Y-%m-%d %H:%M:%S%.f%z",
    ];
    for fmt in offset_formats {
        if let Ok(dt) = DateTime::parse_from_str(&zoned, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    let naive_formats = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y/%m/%d %H:%M:%S",
        "%Y/%m/%d %H:%M",
    ];
    for fmt in naive_formats {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return localize(naive, tz);
        }
    }

    for fmt in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return localize(d.and_hms_opt(0, 0, 0)?, tz);
        }
    }

    None
}

fn localize(naive: NaiveDateTime, tz: Tz) -> Option<DateTime<Utc>> {
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

lazy_static! {
    static ref ISO_8601: Regex = Regex::new(
        r"^\d{4}-\d{2}-\d{2}(T\d{2}:\d{2}(:\d{2}(\.\d+)?)?(Z|[+-]\d{2}:?\d{2})?)?$"
    )
    .unwrap();
}

/// Strict ISO-8601 check: calendar date, optional `T` time, optional zone
pub fn is_iso8601(s: &str) -> bool {
    let s = s.trim();
    ISO_8601.is_match(s) && parse_timestamp(s, Tz::UTC).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    const POST: &str = r#"---
title: "Terraform State Locking with DynamoDB"
excerpt: Stop two applies from clobbering each other.
category:
  name: Terraform
  slug: terraform
date: 2024-03-02T09:00:00Z
publishedAt: 2024-03-02T09:00:00Z
updatedAt: 2024-04-10T12:30:00Z
readingTime: 7 min read
author:
  name: Jane Ops
  slug: jane-ops
tags:
  - terraform
  - aws
  - dynamodb
featured: true
series: state
---

Run `terraform init` first.
"#;

    #[test]
    fn test_parse_full_schema() {
        let (fm, raw, body) = FrontMatter::parse(POST).unwrap();
        assert_eq!(
            fm.title.as_deref(),
            Some("Terraform State Locking with DynamoDB")
        );
        assert_eq!(fm.category.as_ref().unwrap().slug(), "terraform");
        assert_eq!(fm.author.as_ref().unwrap().name, "Jane Ops");
        assert_eq!(fm.tags, vec!["terraform", "aws", "dynamodb"]);
        assert_eq!(fm.reading_time.as_deref(), Some("7 min read"));
        assert_eq!(fm.featured, Some(true));
        assert_eq!(fm.extra.get("series").and_then(|v| v.as_str()), Some("state"));
        assert!(raw.contains("category.slug"));
        assert!(body.starts_with("Run `terraform init`"));
    }

    #[test]
    fn test_dates_resolve() {
        let (fm, _, _) = FrontMatter::parse(POST).unwrap();
        let published = fm.parse_published(Tz::UTC).unwrap();
        let updated = fm.parse_updated(Tz::UTC).unwrap();
        assert!(updated > published);
        assert_eq!(published.format("%Y-%m-%d").to_string(), "2024-03-02");
    }

    #[test]
    fn test_single_string_tags_and_bare_category() {
        let doc = "---\ntitle: Quick Tip\ncategory: Git\ntags: git\nreadingTime: 3\n---\nbody";
        let (fm, _, _) = FrontMatter::parse(doc).unwrap();
        assert_eq!(fm.tags, vec!["git"]);
        let category = fm.category.unwrap();
        assert_eq!(category.name, "Git");
        assert_eq!(category.slug, None);
        assert_eq!(category.slug(), "git");
        assert_eq!(fm.reading_time.as_deref(), Some("3"));
    }

    #[test]
    fn test_missing_front_matter() {
        let err = FrontMatter::parse("# Just a heading\n").unwrap_err();
        assert!(matches!(err, FrontMatterError::Missing));
    }

    #[test]
    fn test_unterminated_front_matter() {
        let err = FrontMatter::parse("---\ntitle: Oops\n\nBody").unwrap_err();
        assert!(matches!(err, FrontMatterError::Unterminated));
    }

    #[test]
    fn test_scalar_front_matter_is_rejected() {
        let err = FrontMatter::parse("---\njust words\n---\n").unwrap_err();
        assert!(matches!(err, FrontMatterError::NotAMapping));
    }

    #[test]
    fn test_invalid_yaml() {
        let err = FrontMatter::parse("---\ntitle: [unclosed\n---\n").unwrap_err();
        assert!(matches!(err, FrontMatterError::Yaml(_)));
    }

    #[test]
    fn test_horizontal_rule_in_body_is_not_a_terminator() {
        let doc = "---\ntitle: Rules\n---\nIntro\n\n---\n\nMore";
        let (_, _, body) = FrontMatter::parse(doc).unwrap();
        assert!(body.contains("Intro"));
        assert!(body.contains("More"));
    }

    #[test]
    fn test_raw_fields_filled() {
        let doc = "---\ntitle: ''\ntags: []\nauthor:\n  name: Jane\n---\n";
        let (_, raw, _) = FrontMatter::parse(doc).unwrap();
        assert!(raw.contains("title"));
        assert!(!raw.is_filled("title"));
        assert!(!raw.is_filled("tags"));
        assert!(raw.is_filled("author.name"));
        assert!(!raw.contains("author.slug"));
    }

    #[test]
    fn test_parse_timestamp_with_zone() {
        let berlin: Tz = "Europe/Berlin".parse().unwrap();
        let local = parse_timestamp("2024-01-15 10:30:00", berlin).unwrap();
        assert_eq!(local.format("%H:%M").to_string(), "09:30");
        let explicit = parse_timestamp("2024-01-15T10:30:00+02:00", berlin).unwrap();
        assert_eq!(explicit.format("%H:%M").to_string(), "08:30");
        assert!(parse_timestamp("last tuesday", berlin).is_none());
    }

    #[test]
    fn test_parse_timestamp_minute_precision_with_zone() {
        let berlin: Tz = "Europe/Berlin".parse().unwrap();
        let utc = parse_timestamp("2024-01-15T10:30Z", berlin).unwrap();
        assert_eq!(utc.to_rfc3339(), "2024-01-15T10:30:00+00:00");
        let india = parse_timestamp("2024-01-15T10:30+05:30", berlin).unwrap();
        assert_eq!(india.to_rfc3339(), "2024-01-15T05:00:00+00:00");
        let compact = parse_timestamp("2024-01-15T10:30+0530", berlin).unwrap();
        assert_eq!(compact, india);
    }

    #[test]
    fn test_is_iso8601() {
        assert!(is_iso8601("2024-01-15"));
        assert!(is_iso8601("2024-01-15T10:30"));
        assert!(is_iso8601("2024-01-15T10:30:00.000Z"));
        assert!(is_iso8601("2024-01-15T10:30:00+05:30"));
        assert!(is_iso8601("2024-01-15T10:30Z"));
        assert!(is_iso8601("2024-01-15T10:30+05:30"));
        assert!(is_iso8601("2024-01-15T10:30:00Z"));
        assert!(!is_iso8601("2024/01/15"));
        assert!(!is_iso8601("2024-13-01"));
        assert!(!is_iso8601("15 Jan 2024"));
    }
}
