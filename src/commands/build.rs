//! Generate static files

use anyhow::Result;
use notify::Watcher;
use std::path::Path;
use std::sync::mpsc::channel;
use std::time::{Duration, Instant};

use crate::content::ContentLoader;
use crate::generator::Generator;
use crate::{Site, CONFIG_FILE};

/// Load every post and regenerate the whole site
pub fn run(site: &Site) -> Result<()> {
    let start = Instant::now();

    let posts = ContentLoader::new(site).load_posts()?;
    tracing::info!("Loaded {} posts", posts.len());

    Generator::new(site)?.generate(&posts)?;

    tracing::info!("Generated in {:.2}s", start.elapsed().as_secs_f64());
    Ok(())
}

/// Re-open the site so config edits take effect, then build it
pub fn rebuild(base_dir: &Path) -> Result<Site> {
    let site = Site::new(base_dir)?;
    run(&site)?;
    Ok(site)
}

/// Watch the content directory and config, rebuilding on change
pub async fn watch(site: &Site) -> Result<()> {
    let (tx, rx) = channel();

    let mut watcher = notify::recommended_watcher(move |res| {
        if let Ok(event) = res {
            let _ = tx.send(event);
        }
    })?;

    if site.content_dir.exists() {
        watcher.watch(&site.content_dir, notify::RecursiveMode::Recursive)?;
    }

    let static_dir = site.base_dir.join(&site.config.static_dir);
    if static_dir.exists() {
        watcher.watch(&static_dir, notify::RecursiveMode::Recursive)?;
    }

    let config_path = site.base_dir.join(CONFIG_FILE);
    if config_path.exists() {
        watcher.watch(&config_path, notify::RecursiveMode::NonRecursive)?;
    }

    tracing::info!("Watching for changes. Press Ctrl+C to stop.");

    let mut last_rebuild = Instant::now();

    loop {
        match rx.recv_timeout(Duration::from_millis(100)) {
            Ok(_event) => {
                // Editors emit bursts of events per save
                if last_rebuild.elapsed() > Duration::from_millis(500) {
                    tracing::info!("File changed, regenerating...");
                    if let Err(e) = rebuild(&site.base_dir) {
                        tracing::error!("Generation failed: {}", e);
                    }
                    last_rebuild = Instant::now();
                }
            }
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) => {}
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_rebuild_picks_up_config() {
        let dir = TempDir::new().unwrap();
        let posts = dir.path().join("content/posts");
        fs::create_dir_all(&posts).unwrap();
        fs::write(
            posts.join("hello.md"),
            "---\ntitle: Hello\ndate: 2024-01-01T00:00:00Z\n---\n\nHi\n",
        )
        .unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "post_dir: articles\n").unwrap();

        let site = rebuild(dir.path()).unwrap();
        assert_eq!(site.config.post_dir, "articles");
        assert!(site.public_dir.join("articles/hello/index.html").exists());
    }
}
