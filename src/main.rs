//! CLI entry point for postkit

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use postkit::commands::lint::OutputFormat;
use postkit::commands::new::NewPost;
use postkit::Site;

#[derive(Parser)]
#[command(name = "postkit")]
#[command(version)]
#[command(about = "Lint and publish a corpus of Markdown blog posts", long_about = None)]
struct Cli {
    /// Set the site directory (defaults to current directory)
    #[arg(short, long, global = true)]
    cwd: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check every post against the content rules
    Lint {
        /// Report format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Fail on warnings too
        #[arg(long)]
        strict: bool,
    },

    /// List site information
    List {
        /// Type of content to list (post, tag, category, archive)
        #[arg(default_value = "post")]
        r#type: String,
    },

    /// Generate static files
    #[command(alias = "b")]
    Build {
        /// Watch for file changes
        #[arg(short, long)]
        watch: bool,
    },

    /// Create a new post
    New {
        /// Title of the new post
        title: String,

        /// Category name
        #[arg(long)]
        category: Option<String>,

        /// Tag, repeatable
        #[arg(short, long = "tag")]
        tags: Vec<String>,

        /// Author name
        #[arg(short, long)]
        author: Option<String>,
    },

    /// Remove the public folder
    Clean,

    /// Build and serve the site locally
    #[command(alias = "s")]
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "4000")]
        port: u16,

        /// IP address to bind to
        #[arg(short, long, default_value = "localhost")]
        ip: String,

        /// Serve without watching for changes
        #[arg(long)]
        r#static: bool,
    },

    /// Display version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.debug {
        "postkit=debug,info"
    } else {
        "postkit=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let base_dir = match cli.cwd {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };

    match cli.command {
        Commands::Lint { format, strict } => {
            let site = Site::new(&base_dir)?;
            if !postkit::commands::lint::run(&site, format, strict)? {
                std::process::exit(1);
            }
        }

        Commands::List { r#type } => {
            let site = Site::new(&base_dir)?;
            postkit::commands::list::run(&site, &r#type)?;
        }

        Commands::Build { watch } => {
            let site = Site::new(&base_dir)?;
            tracing::info!("Generating static files...");
            site.build()?;

            if watch {
                postkit::commands::build::watch(&site).await?;
            }
        }

        Commands::New {
            title,
            category,
            tags,
            author,
        } => {
            let site = Site::new(&base_dir)?;
            let path = postkit::commands::new::create_post(
                &site,
                &NewPost {
                    title,
                    category,
                    tags,
                    author,
                },
            )?;
            println!("Created: {}", path.display());
        }

        Commands::Clean => {
            let site = Site::new(&base_dir)?;
            site.clean()?;
        }

        Commands::Serve { port, ip, r#static } => {
            let site = Site::new(&base_dir)?;
            tracing::info!("Generating static files...");
            site.build()?;

            postkit::server::start(&site, &ip, port, !r#static).await?;
        }

        Commands::Version => {
            println!("postkit version {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
