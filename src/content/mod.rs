//! Content module - handles post files, front matter and rendering

mod frontmatter;
pub mod loader;
mod markdown;
mod post;
pub mod split;
pub mod taxonomy;

pub use frontmatter::{
    is_iso8601, parse_timestamp, split_front_matter, FrontMatter, FrontMatterError, NamedRef,
    RawFields,
};
pub use loader::{ContentLoader, SourceFile};
pub use markdown::{CodeBlock, MarkdownRenderer};
pub use post::{Category, Post, Tag};
pub use split::{split_documents, Segment};
pub use taxonomy::Taxonomy;
