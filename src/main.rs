//! CLI entry point for medium-rs

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "medium-rs")]
#[command(version)]
#[command(about = "A Medium-style blog front end for posts stored in Sanity", long_about = None)]
struct Cli {
    /// Set the base directory (defaults to current directory)
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
    /// Initialize a new site
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        folder: PathBuf,
    },

    /// Export every page to the public folder
    #[command(alias = "g")]
    Generate {
        /// Rewrite every page, ignoring the build manifest
        #[arg(short, long)]
        force: bool,
    },

    /// Start the server
    #[command(alias = "s")]
    Server {
        /// Port to listen on
        #[arg(short, long, default_value = "4000")]
        port: u16,

        /// IP address to bind to
        #[arg(short, long, default_value = "localhost")]
        ip: String,

        /// Open browser automatically
        #[arg(short, long)]
        open: bool,
    },

    /// Clean the public folder and build manifest
    Clean,

    /// List site content
    List {
        /// Type of content to list (post, slug)
        #[arg(default_value = "post")]
        r#type: String,
    },

    /// Display version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.debug {
        "medium_rs=debug,info"
    } else {
        "medium_rs=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine base directory
    let base_dir = match cli.cwd {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to read the current directory")?,
    };

    match cli.command {
        Commands::Init { folder } => {
            let target_dir = if folder.is_absolute() {
                folder
            } else {
                base_dir.join(folder)
            };
            tracing::info!("Initializing site in {:?}", target_dir);
            medium_rs::commands::init::init_site(&target_dir)?;
            println!("Initialized site in {:?}", target_dir);
        }

        Commands::Generate { force } => {
            let blog = medium_rs::Blog::new(&base_dir)?;
            tracing::info!("Generating static files...");
            blog.generate(force).await?;
            println!("Generated successfully!");
        }

        Commands::Server { port, ip, open } => {
            let blog = medium_rs::Blog::new(&base_dir)?;
            tracing::info!("Starting server at http://{}:{}", ip, port);
            medium_rs::server::start(&blog, &ip, port, open).await?;
        }

        Commands::Clean => {
            let blog = medium_rs::Blog::new(&base_dir)?;
            tracing::info!("Cleaning public folder...");
            blog.clean()?;
            println!("Cleaned successfully!");
        }

        Commands::List { r#type } => {
            let blog = medium_rs::Blog::new(&base_dir)?;
            medium_rs::commands::list::run(&blog, &r#type).await?;
        }

        Commands::Version => {
            println!("medium-rs version {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
