use anyhow::Result;
use clap::{Parser, Subcommand};
use cmr_chat::{chat, client, mcp, Config};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("CMR_CHAT_GIT_HASH"),
    ")"
);

#[derive(Parser)]
#[command(name = "cmr-chat")]
#[command(author, version = VERSION, about = "Chat about NASA Earth-science datasets through an MCP tool server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (default: the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the MCP tool server exposing get_collections
    Mcp {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to
        #[arg(long)]
        host: Option<String>,
    },

    /// Start the streaming chat backend
    Serve {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// MCP endpoint to call tools on
        #[arg(long)]
        mcp_url: Option<String>,

        /// LLM provider to use (openai, local, scripted)
        #[arg(long)]
        provider: Option<String>,

        /// Model to use
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Interactive terminal chat against a running chat backend
    Chat {
        /// Initial message to send
        message: Option<String>,

        /// Chat endpoint (default: the configured chat host and port)
        #[arg(short, long)]
        endpoint: Option<String>,
    },

    /// Run one CMR collection search and print the result
    Search {
        /// Free-text keyword (empty searches everything)
        keyword: Option<String>,

        /// Print the JSON text instead of the rendered tree
        #[arg(long)]
        raw: bool,
    },

    /// Render a JSON document from a file or stdin
    Render {
        /// JSON file (default: stdin)
        file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "cmr_chat=debug,tower_http=debug"
    } else {
        "cmr_chat=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    match cli.command {
        Commands::Mcp { port, host } => {
            if let Some(port) = port {
                config.mcp.port = port;
            }
            if let Some(host) = host {
                config.mcp.host = host;
            }
            tracing::info!(
                "Starting MCP server on {}:{}{}",
                config.mcp.host,
                config.mcp.port,
                config.mcp.path
            );
            mcp::run_mcp_server(&config.mcp, &config.cmr).await?;
        }
        Commands::Serve {
            port,
            host,
            mcp_url,
            provider,
            model,
        } => {
            if let Some(port) = port {
                config.chat.port = port;
            }
            if let Some(host) = host {
                config.chat.host = host;
            }
            if let Some(mcp_url) = mcp_url {
                config.chat.mcp_url = mcp_url;
            }
            if let Some(provider) = provider {
                config.llm.provider = provider;
            }
            if let Some(model) = model {
                config.llm.model = model;
            }
            tracing::info!(
                "Starting chat server on {}:{}",
                config.chat.host,
                config.chat.port
            );
            chat::run_chat_server(&config).await?;
        }
        Commands::Chat { message, endpoint } => {
            let endpoint = endpoint.unwrap_or_else(|| config.chat.endpoint());
            tracing::debug!("Starting terminal chat against {}", endpoint);
            client::cli::run_chat(&config, &endpoint, message).await?;
        }
        Commands::Search { keyword, raw } => {
            client::cli::run_search(&config, keyword.as_deref(), raw).await?;
        }
        Commands::Render { file } => {
            client::cli::run_render(file.as_deref()).await?;
        }
    }

    Ok(())
}
