//! Configuration module

mod site;

pub use site::HighlightConfig;
pub use site::DEFAULT_CATEGORY;
pub use site::LintConfig;
pub use site::SiteConfig;
