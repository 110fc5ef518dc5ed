//! Rule implementations

use std::collections::HashMap;

use super::{Diagnostic, Linter, Rule};
use crate::content::split::{has_separator, split_documents, Segment};
use crate::content::{
    is_iso8601, parse_timestamp, FrontMatter, FrontMatterError, MarkdownRenderer, NamedRef,
    RawFields, SourceFile,
};

const TIMESTAMP_KEYS: [&str; 3] = ["date", "publishedAt", "updatedAt"];

/// Where a title was first seen
struct TitleSite {
    file: String,
    doc_index: usize,
    line: usize,
}

/// Accumulates findings while walking the corpus
pub(super) struct Context<'a> {
    linter: &'a Linter,
    files: usize,
    documents: usize,
    diagnostics: Vec<Diagnostic>,
    titles: HashMap<String, TitleSite>,
}

/// One parsed document being checked
struct Doc<'s> {
    file: &'s str,
    segment: &'s Segment<'s>,
    yaml: &'s str,
}

impl Doc<'_> {
    /// File line of a front-matter key, `a.b` for nested keys
    fn key_line(&self, path: &str) -> usize {
        locate_key(self.yaml, path)
            .map(|i| self.segment.line + 1 + i)
            .unwrap_or(self.segment.line)
    }
}

impl<'a> Context<'a> {
    pub(super) fn new(linter: &'a Linter) -> Self {
        Self {
            linter,
            files: 0,
            documents: 0,
            diagnostics: Vec::new(),
            titles: HashMap::new(),
        }
    }

    pub(super) fn finish(self) -> (usize, usize, Vec<Diagnostic>) {
        (self.files, self.documents, self.diagnostics)
    }

    fn report(&mut self, rule: Rule, file: &str, doc_index: usize, line: usize, message: String) {
        self.diagnostics.push(Diagnostic {
            rule,
            severity: rule.severity(),
            file: file.to_string(),
            doc_index,
            line,
            message,
        });
    }

    pub(super) fn check_file(&mut self, source: &SourceFile) {
        self.files += 1;
        self.check_file_name(source);

        let segments = split_documents(&source.text);
        let bundled = has_separator(&source.text);

        for segment in &segments {
            if segment.is_blank() {
                if bundled {
                    self.report(
                        Rule::MultiPost,
                        &source.relative,
                        segment.index,
                        segment.line,
                        format!("empty fragment #{} around a separator", segment.index),
                    );
                } else {
                    self.report(
                        Rule::FrontMatter,
                        &source.relative,
                        0,
                        1,
                        "file is empty".to_string(),
                    );
                }
                continue;
            }

            match FrontMatter::parse(segment.text) {
                Ok((fm, raw, body)) => {
                    self.documents += 1;
                    // parse succeeded, so the split does too
                    let yaml = crate::content::split_front_matter(segment.text)
                        .map(|(yaml, _)| yaml)
                        .unwrap_or_default();
                    let doc = Doc {
                        file: &source.relative,
                        segment,
                        yaml,
                    };
                    self.check_document(&doc, &fm, &raw, body);
                }
                Err(FrontMatterError::Missing) if bundled => self.report(
                    Rule::MultiPost,
                    &source.relative,
                    segment.index,
                    segment.line,
                    format!(
                        "fragment #{} has no front matter; leftover text after a separator",
                        segment.index
                    ),
                ),
                Err(e) => {
                    let line = match &e {
                        FrontMatterError::Yaml(err) => err
                            .location()
                            .map(|loc| segment.line + loc.line())
                            .unwrap_or(segment.line + 1),
                        _ => segment.line,
                    };
                    self.report(
                        Rule::FrontMatter,
                        &source.relative,
                        segment.index,
                        line,
                        e.to_string(),
                    );
                }
            }
        }
    }

    fn check_file_name(&mut self, source: &SourceFile) {
        let stem = source.stem();
        let expected = slug::slugify(stem);
        if stem != expected {
            self.report(
                Rule::FileName,
                &source.relative,
                0,
                1,
                format!("file name `{}` is not a kebab-case slug (`{}`)", stem, expected),
            );
        }
    }

    fn check_document(&mut self, doc: &Doc<'_>, fm: &FrontMatter, raw: &RawFields, body: &str) {
        self.check_required(doc, raw);
        self.check_slug(doc, Rule::CategorySlug, "category", fm.category.as_ref());
        self.check_slug(doc, Rule::AuthorSlug, "author", fm.author.as_ref());
        self.check_timestamps(doc, raw);
        self.check_title(doc, fm);
        self.check_code_languages(doc, body);
    }

    fn check_required(&mut self, doc: &Doc<'_>, raw: &RawFields) {
        let linter = self.linter;
        for key in &linter.required {
            if !raw.contains(key) {
                self.report(
                    Rule::RequiredKeys,
                    doc.file,
                    doc.segment.index,
                    doc.segment.line,
                    format!("missing required key `{}`", key),
                );
                continue;
            }
            if !raw.is_filled(key) {
                self.report(
                    Rule::RequiredKeys,
                    doc.file,
                    doc.segment.index,
                    doc.key_line(key),
                    format!("required key `{}` is empty", key),
                );
                continue;
            }

            // name/slug pairs must carry both halves
            if key == "category" || key == "author" {
                for part in ["name", "slug"] {
                    let path = format!("{}.{}", key, part);
                    if !raw.is_filled(&path) {
                        self.report(
                            Rule::RequiredKeys,
                            doc.file,
                            doc.segment.index,
                            doc.key_line(key),
                            format!("`{}` is missing `{}`", key, part),
                        );
                    }
                }
            }
        }
    }

    fn check_slug(&mut self, doc: &Doc<'_>, rule: Rule, key: &str, named: Option<&NamedRef>) {
        let Some(named) = named else {
            return;
        };
        let Some(declared) = named.slug.as_deref() else {
            return;
        };
        // a missing name is reported by required-keys
        if named.name.trim().is_empty() {
            return;
        }

        let expected = slug::slugify(&named.name);
        if declared != expected {
            self.report(
                rule,
                doc.file,
                doc.segment.index,
                doc.key_line(&format!("{}.slug", key)),
                format!(
                    "`{}.slug` is `{}` but `{}` slugifies to `{}`",
                    key, declared, named.name, expected
                ),
            );
        }
    }

    fn check_timestamps(&mut self, doc: &Doc<'_>, raw: &RawFields) {
        for key in TIMESTAMP_KEYS {
            if !raw.contains(key) {
                continue;
            }
            let value = raw.get_str(key).unwrap_or_default();
            if !is_iso8601(&value) {
                self.report(
                    Rule::Timestamps,
                    doc.file,
                    doc.segment.index,
                    doc.key_line(key),
                    format!("`{}` is not an ISO-8601 timestamp: `{}`", key, value),
                );
            }
        }

        let tz = self.linter.tz;
        let parsed = |key: &str| {
            raw.get_str(key)
                .filter(|v| is_iso8601(v))
                .and_then(|v| parse_timestamp(&v, tz))
        };
        if let (Some(published), Some(updated)) = (parsed("publishedAt"), parsed("updatedAt")) {
            if updated < published {
                self.report(
                    Rule::Timestamps,
                    doc.file,
                    doc.segment.index,
                    doc.key_line("updatedAt"),
                    format!(
                        "`updatedAt` ({}) is before `publishedAt` ({})",
                        updated.to_rfc3339(),
                        published.to_rfc3339()
                    ),
                );
            }
        }
    }

    fn check_title(&mut self, doc: &Doc<'_>, fm: &FrontMatter) {
        let Some(title) = fm.title.as_deref() else {
            return;
        };
        let key = title.trim().to_lowercase();
        if key.is_empty() {
            return;
        }

        let line = doc.key_line("title");
        match self.titles.get(&key) {
            Some(first) => {
                let message = format!(
                    "title `{}` is already used by {} (post #{}, line {})",
                    title.trim(),
                    first.file,
                    first.doc_index,
                    first.line
                );
                self.report(Rule::UniqueTitle, doc.file, doc.segment.index, line, message);
            }
            None => {
                self.titles.insert(
                    key,
                    TitleSite {
                        file: doc.file.to_string(),
                        doc_index: doc.segment.index,
                        line,
                    },
                );
            }
        }
    }

    fn check_code_languages(&mut self, doc: &Doc<'_>, body: &str) {
        // body is a suffix of the segment text
        let text = doc.segment.text;
        let body_start = text.len() - body.len();
        let body_line = doc.segment.line + text[..body_start].matches('\n').count();

        for block in MarkdownRenderer::code_blocks(body) {
            if !block.fenced {
                continue;
            }
            let line = body_line + block.line - 1;
            match block.lang {
                None => self.report(
                    Rule::CodeLanguage,
                    doc.file,
                    doc.segment.index,
                    line,
                    "fenced code block has no language tag".to_string(),
                ),
                Some(lang) if !self.linter.languages.contains(&lang.to_lowercase()) => self
                    .report(
                        Rule::CodeLanguage,
                        doc.file,
                        doc.segment.index,
                        line,
                        format!("code block language `{}` is not in the allow-list", lang),
                    ),
                Some(_) => {}
            }
        }
    }
}

/// 0-based line of a key inside a YAML block, following `a.b` into nested
/// mappings by indentation
fn locate_key(yaml: &str, path: &str) -> Option<usize> {
    let mut start = 0;
    let mut min_indent = 0;
    let lines: Vec<&str> = yaml.lines().collect();

    for (depth, part) in path.split('.').enumerate() {
        let prefix = format!("{}:", part);
        let (i, indent) = lines
            .iter()
            .enumerate()
            .skip(start)
            .map(|(i, line)| (i, line.len() - line.trim_start().len(), line.trim_start()))
            .take_while(|(i, indent, text)| {
                *i == start || min_indent == 0 || text.is_empty() || *indent >= min_indent
            })
            .find(|(_, indent, text)| {
                let nested_ok = if depth == 0 {
                    *indent == 0
                } else {
                    *indent >= min_indent
                };
                nested_ok && text.starts_with(&prefix)
            })
            .map(|(i, indent, _)| (i, indent))?;
        start = i + 1;
        min_indent = indent + 1;
    }

    Some(start - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locate_key() {
        let yaml = "title: x\ncategory:\n  name: Git\n  slug: git\nauthor:\n  name: Jo\n  slug: jo\n";
        assert_eq!(locate_key(yaml, "title"), Some(0));
        assert_eq!(locate_key(yaml, "category.slug"), Some(3));
        assert_eq!(locate_key(yaml, "author.slug"), Some(6));
        assert_eq!(locate_key(yaml, "missing"), None);
    }

    #[test]
    fn test_locate_key_stays_inside_parent() {
        let yaml = "category:\n  name: Git\nauthor:\n  slug: jo\n";
        assert_eq!(locate_key(yaml, "category.slug"), None);
    }
}
