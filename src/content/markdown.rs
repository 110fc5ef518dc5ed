//! Markdown rendering with syntax highlighting

use anyhow::Result;
use pulldown_cmark::{html, CodeBlockKind, CowStr, Event, Options, Parser, Tag, TagEnd};
use syntect::highlighting::ThemeSet;
use syntect::html::highlighted_html_for_string;
use syntect::parsing::SyntaxSet;

/// A code block found in a post body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    /// Language hint of a fenced block, `None` if untagged or indented
    pub lang: Option<String>,
    /// Whether the block was fenced (``` or ~~~)
    pub fenced: bool,
    /// 1-based line within the body where the block starts
    pub line: usize,
}

/// Markdown renderer with syntax highlighting
pub struct MarkdownRenderer {
    syntax_set: SyntaxSet,
    theme_set: ThemeSet,
    theme_name: String,
    line_numbers: bool,
}

impl MarkdownRenderer {
    /// Create a new markdown renderer
    pub fn new() -> Self {
        Self::with_options("base16-ocean.dark", true)
    }

    /// Create with custom settings
    pub fn with_options(theme: &str, line_numbers: bool) -> Self {
        Self {
            syntax_set: SyntaxSet::load_defaults_newlines(),
            theme_set: ThemeSet::load_defaults(),
            theme_name: theme.to_string(),
            line_numbers,
        }
    }

    fn options() -> Options {
        // No YAML metadata blocks: front matter is cut off before rendering
        Options::ENABLE_TABLES
            | Options::ENABLE_FOOTNOTES
            | Options::ENABLE_STRIKETHROUGH
            | Options::ENABLE_TASKLISTS
            | Options::ENABLE_SMART_PUNCTUATION
            | Options::ENABLE_HEADING_ATTRIBUTES
            | Options::ENABLE_GFM
    }

    /// Render markdown to HTML
    pub fn render(&self, markdown: &str) -> Result<String> {
        let parser = Parser::new_ext(markdown, Self::options());

        let mut events: Vec<Event> = Vec::new();
        let mut in_code_block = false;
        let mut code_block_lang: Option<String> = None;
        let mut code_block_content = String::new();

        for event in parser {
            match event {
                Event::Start(Tag::CodeBlock(kind)) => {
                    in_code_block = true;
                    code_block_lang = match kind {
                        CodeBlockKind::Fenced(info) => info_lang(&info),
                        CodeBlockKind::Indented => None,
                    };
                    code_block_content.clear();
                }
                Event::End(TagEnd::CodeBlock) => {
                    let highlighted =
                        self.highlight_code(&code_block_content, code_block_lang.as_deref());
                    events.push(Event::Html(CowStr::from(highlighted)));
                    in_code_block = false;
                    code_block_lang = None;
                }
                Event::Text(text) if in_code_block => {
                    code_block_content.push_str(&text);
                }
                _ if in_code_block => {}
                _ => events.push(event),
            }
        }

        let mut html_output = String::new();
        html::push_html(&mut html_output, events.into_iter());

        Ok(html_output)
    }

    /// List every code block with its language hint and position
    pub fn code_blocks(markdown: &str) -> Vec<CodeBlock> {
        Parser::new_ext(markdown, Self::options())
            .into_offset_iter()
            .filter_map(|(event, range)| match event {
                Event::Start(Tag::CodeBlock(kind)) => {
                    let line = markdown[..range.start].matches('\n').count() + 1;
                    Some(match kind {
                        CodeBlockKind::Fenced(info) => CodeBlock {
                            lang: info_lang(&info),
                            fenced: true,
                            line,
                        },
                        CodeBlockKind::Indented => CodeBlock {
                            lang: None,
                            fenced: false,
                            line,
                        },
                    })
                }
                _ => None,
            })
            .collect()
    }

    /// Count words of prose and code
    pub fn word_count(markdown: &str) -> usize {
        Parser::new_ext(markdown, Self::options())
            .map(|event| match event {
                Event::Text(text) | Event::Code(text) => text.split_whitespace().count(),
                _ => 0,
            })
            .sum()
    }

    /// Highlight a code block
    fn highlight_code(&self, code: &str, lang: Option<&str>) -> String {
        let lang = lang.unwrap_or("text");

        // Try to find syntax for the language
        let syntax = self
            .syntax_set
            .find_syntax_by_token(lang)
            .or_else(|| self.syntax_set.find_syntax_by_extension(lang))
            .unwrap_or_else(|| self.syntax_set.find_syntax_plain_text());

        let theme = self
            .theme_set
            .themes
            .get(&self.theme_name)
            .or_else(|| self.theme_set.themes.values().next());

        let highlighted = theme.and_then(|theme| {
            highlighted_html_for_string(code, &self.syntax_set, syntax, theme).ok()
        });

        let class = html_escape(lang);
        match highlighted {
            Some(highlighted) if self.line_numbers => self.add_line_numbers(&highlighted, &class),
            Some(highlighted) => format!(
                r#"<figure class="highlight {}">{}</figure>"#,
                class, highlighted
            ),
            None => format!(
                r#"<pre><code class="language-{}">{}</code></pre>"#,
                class,
                html_escape(code)
            ),
        }
    }

    /// Add line numbers to highlighted code; `class` is already escaped
    fn add_line_numbers(&self, code: &str, class: &str) -> String {
        let lines: Vec<&str> = code.lines().collect();

        let gutter = (1..=lines.len())
            .map(|n| format!(r#"<span class="line-number">{}</span>"#, n))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            r#"<figure class="highlight {}"><table><tr><td class="gutter"><pre>{}</pre></td><td class="code">{}</td></tr></table></figure>"#,
            class,
            gutter,
            lines.join("\n")
        )
    }
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// First word of a fence info string (`bash title="x"` -> `bash`)
fn info_lang(info: &str) -> Option<String> {
    info.split(|c: char| c.is_whitespace() || c == ',' || c == '{')
        .next()
        .map(str::trim)
        .filter(|lang| !lang.is_empty())
        .map(str::to_string)
}

/// Simple HTML escaping
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_basic_markdown() {
        let renderer = MarkdownRenderer::new();
        let html = renderer
            .render("# Docker Volumes\n\nData outlives containers.")
            .unwrap();
        assert!(html.contains("<h1>Docker Volumes</h1>"));
        assert!(html.contains("<p>Data outlives containers.</p>"));
    }

    #[test]
    fn test_render_code_block() {
        let renderer = MarkdownRenderer::new();
        let html = renderer
            .render("```hcl\nresource \"aws_s3_bucket\" \"logs\" {}\n```")
            .unwrap();
        assert!(html.contains("highlight hcl"));
        assert!(html.contains("line-number"));
    }

    #[test]
    fn test_untagged_fence_is_rendered_as_text() {
        let renderer = MarkdownRenderer::with_options("base16-ocean.dark", false);
        let html = renderer.render("```\ngit push origin main\n```").unwrap();
        assert!(html.contains("highlight text"));
        assert!(html.contains("origin"));
    }

    #[test]
    fn test_fence_language_is_escaped_in_class() {
        let md = "```bash\"><img\necho hi\n```";
        for line_numbers in [true, false] {
            let renderer = MarkdownRenderer::with_options("base16-ocean.dark", line_numbers);
            let html = renderer.render(md).unwrap();
            assert!(!html.contains("\"><img"));
            assert!(html.contains("highlight bash&quot;&gt;&lt;img"));
        }
    }

    #[test]
    fn test_code_blocks_positions() {
        let md = "Intro\n\n```bash title=\"deploy\"\necho hi\n```\n\n```\nplain\n```\n\n    indented\n";
        let blocks = MarkdownRenderer::code_blocks(md);
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[0].lang.as_deref(), Some("bash"));
        assert_eq!(blocks[0].line, 3);
        assert_eq!(blocks[1].lang, None);
        assert!(blocks[1].fenced);
        assert!(!blocks[2].fenced);
    }

    #[test]
    fn test_word_count() {
        let md = "Three words here.\n\n```bash\nkubectl get pods\n```\n";
        assert_eq!(MarkdownRenderer::word_count(md), 6);
    }
}
