//! URL helper functions

use lazy_static::lazy_static;
use regex::{Captures, Regex};

use crate::config::SiteConfig;

lazy_static! {
    // `//host/...` is protocol-relative and left alone
    static ref ROOT_RELATIVE_ATTR: Regex = Regex::new(r#"\b(href|src)=(["'])/([^/])"#).unwrap();
}

/// Generate a URL with the root path
///
/// # Examples
/// ```ignore
/// url_for(&config, "tags/docker/") // -> "/blog/tags/docker/"
/// ```
pub fn url_for(config: &SiteConfig, path: &str) -> String {
    let root = config.root.trim_end_matches('/');
    let path = path.trim_start_matches('/');

    if path.is_empty() {
        format!("{}/", root)
    } else {
        format!("{}/{}", root, path)
    }
}

/// Generate a full URL including the domain
///
/// # Examples
/// ```ignore
/// full_url_for(&config, "posts/git-rebase/") // -> "https://example.com/blog/posts/git-rebase/"
/// ```
pub fn full_url_for(config: &SiteConfig, path: &str) -> String {
    let base = config.url.trim_end_matches('/');
    format!("{}{}", base, url_for(config, path))
}

/// Make root-relative `href`/`src` attributes absolute
pub fn absolutize_links(content: &str, base_url: &str) -> String {
    let base_url = base_url.trim_end_matches('/');
    ROOT_RELATIVE_ATTR
        .replace_all(content, |caps: &Captures| {
            format!("{}={}{}/{}", &caps[1], &caps[2], base_url, &caps[3])
        })
        .into_owned()
}
