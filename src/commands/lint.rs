//! Check the post corpus

use anyhow::Result;
use clap::ValueEnum;

use crate::content::ContentLoader;
use crate::lint::{LintReport, Linter};
use crate::Site;

/// Report format for `postkit lint`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Lint every post file of the site
pub fn check(site: &Site) -> Result<LintReport> {
    let sources = ContentLoader::new(site).sources()?;
    tracing::debug!("Linting {} files", sources.len());

    let linter = Linter::new(&site.config.lint, site.config.tz());
    Ok(linter.lint(&sources))
}

/// Render the report; `Ok(false)` means the run should fail
pub fn run(site: &Site, format: OutputFormat, strict: bool) -> Result<bool> {
    let report = check(site)?;

    match format {
        OutputFormat::Text => print!("{}", report.render_text()),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    Ok(passes(&report, strict))
}

/// Errors always fail; warnings fail only in strict mode
pub fn passes(report: &LintReport, strict: bool) -> bool {
    report.is_clean() && !(strict && report.warnings().next().is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const POST: &str = "---\ntitle: Rotating IAM Keys\ncategory:\n  name: AWS\n  slug: aws\ndate: 2024-02-10T09:00:00Z\nauthor:\n  name: Jane Ops\n  slug: jane\ntags: [aws, iam]\n---\n\n```bash\naws iam list-access-keys\n```\n";

    #[test]
    fn test_check_and_strict_mode() {
        let dir = TempDir::new().unwrap();
        let posts = dir.path().join("content/posts");
        fs::create_dir_all(&posts).unwrap();
        fs::write(posts.join("rotating-iam-keys.md"), POST).unwrap();

        let site = Site::new(dir.path()).unwrap();
        let report = check(&site).unwrap();

        assert_eq!(report.files, 1);
        assert_eq!(report.documents, 1);
        // author slug `jane` is only a warning
        assert!(report.is_clean());
        assert_eq!(report.warnings().count(), 1);
        assert!(passes(&report, false));
        assert!(!passes(&report, true));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["diagnostics"][0]["rule"], "author-slug");
        assert_eq!(json["diagnostics"][0]["severity"], "warning");
    }
}
