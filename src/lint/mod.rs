//! Content lint
//!
//! Checks the raw post files against the corpus conventions: front matter
//! present and well-formed, required keys filled, slugs derived from
//! names, ISO-8601 timestamps in order, clean multi-post splits, unique
//! titles and known code-fence languages.

mod rules;

use chrono_tz::Tz;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::config::LintConfig;
use crate::content::SourceFile;

/// How bad a finding is
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => f.write_str("error"),
            Severity::Warning => f.write_str("warning"),
        }
    }
}

/// Lint rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Rule {
    FrontMatter,
    RequiredKeys,
    CategorySlug,
    AuthorSlug,
    Timestamps,
    MultiPost,
    UniqueTitle,
    CodeLanguage,
    FileName,
}

impl Rule {
    pub const ALL: [Rule; 9] = [
        Rule::FrontMatter,
        Rule::RequiredKeys,
        Rule::CategorySlug,
        Rule::AuthorSlug,
        Rule::Timestamps,
        Rule::MultiPost,
        Rule::UniqueTitle,
        Rule::CodeLanguage,
        Rule::FileName,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Rule::FrontMatter => "front-matter",
            Rule::RequiredKeys => "required-keys",
            Rule::CategorySlug => "category-slug",
            Rule::AuthorSlug => "author-slug",
            Rule::Timestamps => "timestamps",
            Rule::MultiPost => "multi-post",
            Rule::UniqueTitle => "unique-title",
            Rule::CodeLanguage => "code-language",
            Rule::FileName => "file-name",
        }
    }

    pub fn severity(self) -> Severity {
        match self {
            Rule::AuthorSlug | Rule::FileName => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Rule {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Rule::ALL
            .into_iter()
            .find(|rule| rule.id() == s)
            .ok_or_else(|| anyhow::anyhow!("unknown lint rule: {}", s))
    }
}

/// One lint finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub rule: Rule,
    pub severity: Severity,
    /// File path relative to the content directory
    pub file: String,
    /// Document position in a multi-post file
    pub doc_index: usize,
    /// 1-based line in the file
    pub line: usize,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: {}[{}] {}",
            self.file, self.line, self.severity, self.rule, self.message
        )
    }
}

/// Result of linting a corpus
#[derive(Debug, Clone, Default, Serialize)]
pub struct LintReport {
    /// Files checked
    pub files: usize,
    /// Documents found after splitting
    pub documents: usize,
    pub diagnostics: Vec<Diagnostic>,
}

impl LintReport {
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
    }

    /// No errors (warnings allowed)
    pub fn is_clean(&self) -> bool {
        self.errors().next().is_none()
    }

    /// Findings of one rule
    pub fn by_rule(&self, rule: Rule) -> Vec<&Diagnostic> {
        self.diagnostics.iter().filter(|d| d.rule == rule).collect()
    }

    /// Human-readable report, one finding per line plus a summary
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        for diagnostic in &self.diagnostics {
            out.push_str(&diagnostic.to_string());
            out.push('\n');
        }
        out.push_str(&format!(
            "{} file(s), {} post(s): {} error(s), {} warning(s)\n",
            self.files,
            self.documents,
            self.errors().count(),
            self.warnings().count()
        ));
        out
    }
}

/// Runs every enabled rule over a set of source files
pub struct Linter {
    languages: HashSet<String>,
    required: Vec<String>,
    ignore: Vec<glob::Pattern>,
    disabled: HashSet<Rule>,
    tz: Tz,
}

impl Linter {
    pub fn new(config: &LintConfig, tz: Tz) -> Self {
        let ignore = config
            .ignore
            .iter()
            .filter_map(|p| match glob::Pattern::new(p) {
                Ok(pattern) => Some(pattern),
                Err(e) => {
                    tracing::warn!("Ignoring bad lint.ignore pattern {:?}: {}", p, e);
                    None
                }
            })
            .collect();

        let disabled = config
            .disable
            .iter()
            .filter_map(|id| match id.parse::<Rule>() {
                Ok(rule) => Some(rule),
                Err(e) => {
                    tracing::warn!("{}", e);
                    None
                }
            })
            .collect();

        Self {
            languages: config
                .languages
                .iter()
                .map(|l| l.trim().to_lowercase())
                .collect(),
            required: config.required.clone(),
            ignore,
            disabled,
            tz,
        }
    }

    fn is_ignored(&self, source: &SourceFile) -> bool {
        self.ignore.iter().any(|p| p.matches(&source.relative))
    }

    /// Lint every file and collect the findings
    pub fn lint(&self, sources: &[SourceFile]) -> LintReport {
        let mut ctx = rules::Context::new(self);

        for source in sources {
            if self.is_ignored(source) {
                tracing::debug!("Skipping ignored file {}", source.relative);
                continue;
            }
            ctx.check_file(source);
        }

        let (files, documents, mut diagnostics) = ctx.finish();
        diagnostics.retain(|d| !self.disabled.contains(&d.rule));
        diagnostics.sort_by(|a, b| {
            (&a.file, a.doc_index, a.line, a.rule.id()).cmp(&(
                &b.file,
                b.doc_index,
                b.line,
                b.rule.id(),
            ))
        });

        LintReport {
            files,
            documents,
            diagnostics,
        }
    }
}
