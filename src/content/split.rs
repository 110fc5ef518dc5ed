//! Splitting of files that bundle several posts
//!
//! Aggregated files join independent posts with a literal marker such as
//! `<|RELATED_DOC_SEP-magic-3f2a|>`. Each piece is a full post with its own
//! front matter.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref SEPARATOR: Regex = Regex::new(r"<\|RELATED_DOC_SEP[^|\n]*\|>").unwrap();
}

/// One document cut out of a source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment<'a> {
    /// Position of the document in its file, starting at 0
    pub index: usize,
    /// 1-based line of the file where the document text starts
    pub line: usize,
    /// Document text with leading whitespace removed
    pub text: &'a str,
}

impl Segment<'_> {
    /// True when nothing but whitespace is left between two markers
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Whether the file contains at least one separator marker
pub fn has_separator(source: &str) -> bool {
    SEPARATOR.is_match(source)
}

/// Split a file on every separator marker
pub fn split_documents(source: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut start = 0;

    let bounds = SEPARATOR
        .find_iter(source)
        .map(|m| (m.start(), m.end()))
        .chain(std::iter::once((source.len(), source.len())));

    for (index, (end, next)) in bounds.enumerate() {
        let raw = &source[start..end];
        let text = raw.trim_start();
        let skipped = &raw[..raw.len() - text.len()];
        let line = line_of(source, start) + skipped.matches('\n').count();

        segments.push(Segment { index, line, text });
        start = next;
    }

    segments
}

fn line_of(source: &str, offset: usize) -> usize {
    source[..offset].matches('\n').count() + 1
}
