//! CLI entry point for spacetraveling

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use spacetraveling::generator::Generator;
use spacetraveling::Blog;

#[derive(Parser)]
#[command(name = "spacetraveling")]
#[command(version)]
#[command(about = "A blog front-end for the Prismic content API", long_about = None)]
struct Cli {
    /// Set the base directory (defaults to current directory)
    #[arg(short, long, global = true)]
    cwd: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    /// Content API endpoint
    #[arg(long, global = true, env = "PRISMIC_API_ENDPOINT")]
    endpoint: Option<String>,

    /// Content API access token
    #[arg(long, global = true, env = "PRISMIC_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate static files
    #[command(alias = "g")]
    Generate,

    /// Start the server
    #[command(alias = "s")]
    Server {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// IP address to bind to
        #[arg(short, long, default_value = "localhost")]
        ip: String,

        /// Serve without generating first
        #[arg(long)]
        no_generate: bool,
    },

    /// List posts
    List {
        /// Follow the cursor through every page
        #[arg(short, long)]
        all: bool,
    },

    /// Clean the public folder
    Clean,

    /// Display version information
    Version,
}

impl Cli {
    fn blog(&self, base_dir: &Path) -> Result<Blog> {
        let mut blog = Blog::new(base_dir)?;
        if let Some(endpoint) = &self.endpoint {
            blog.config.source.endpoint = Some(endpoint.clone());
        }
        if let Some(token) = &self.access_token {
            blog.config.source.access_token = Some(token.clone());
        }
        Ok(blog)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.debug {
        "spacetraveling=debug,info"
    } else {
        "spacetraveling=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine base directory
    let base_dir = match &cli.cwd {
        Some(dir) => dir.clone(),
        None => std::env::current_dir()?,
    };

    match &cli.command {
        Commands::Generate => {
            let blog = cli.blog(&base_dir)?;
            tracing::info!("Generating static files...");
            blog.generate().await?;
            println!("Generated successfully!");
        }

        Commands::Server {
            port,
            ip,
            no_generate,
        } => {
            let blog = cli.blog(&base_dir)?;

            if !no_generate {
                tracing::info!("Generating static files...");
                blog.generate().await?;
            }

            let generator = Generator::new(&blog, blog.source()?)?;
            tracing::info!("Starting server at http://{}:{}", ip, port);
            spacetraveling::server::start(generator, ip, *port).await?;
        }

        Commands::List { all } => {
            let blog = cli.blog(&base_dir)?;
            spacetraveling::commands::list::run(&blog, *all).await?;
        }

        Commands::Clean => {
            let blog = cli.blog(&base_dir)?;
            tracing::info!("Cleaning public folder...");
            blog.clean()?;
            println!("Cleaned successfully!");
        }

        Commands::Version => {
            println!("spacetraveling version {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
