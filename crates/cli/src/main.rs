//! agentbridge CLI: the main entry point.
//!
//! Commands:
//! - `serve`: Start the HTTP gateway
//! - `mcp-server`: Run the bundled MCP server
//! - `ask`: Run one orchestration and print the JSON result
//! - `tools`: Print the flattened tool catalog
//! - `resources`: Print the resource catalog

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

mod commands;

#[derive(Parser)]
#[command(
    name = "agentbridge",
    about = "agentbridge: let a language model drive MCP tools and resources",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the config file (defaults to ~/.agentbridge/config.toml)
    #[arg(short, long, global = true, env = "AGENTBRIDGE_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway
    Serve {
        /// Override the bind address
        #[arg(long)]
        host: Option<String>,

        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,

        /// Override the MCP server URL
        #[arg(long)]
        mcp_url: Option<String>,
    },

    /// Run the bundled MCP server
    McpServer {
        /// Override the bind address (http only)
        #[arg(long)]
        host: Option<String>,

        /// Override the port (http only)
        #[arg(short, long)]
        port: Option<u16>,

        /// Serve streamable HTTP or newline-delimited JSON-RPC on stdin/stdout
        #[arg(long, value_enum, default_value_t = ServeTransport::Http)]
        transport: ServeTransport,
    },

    /// Run one orchestration from the terminal
    Ask {
        /// The user prompt
        prompt: String,

        /// System message prepended to the conversation
        #[arg(short, long)]
        system: Option<String>,

        /// Iteration budget (defaults to agent.default_max_iterations)
        #[arg(short, long)]
        max_iterations: Option<u32>,

        /// Do not advertise resources or honour the read trigger
        #[arg(long)]
        no_resources: bool,

        /// Use the bundled server in-process instead of the configured transport
        #[arg(long)]
        embedded: bool,
    },

    /// Print the flattened tool catalog
    Tools {
        /// Use the bundled server in-process
        #[arg(long)]
        embedded: bool,
    },

    /// Print the resource catalog
    Resources {
        /// Use the bundled server in-process
        #[arg(long)]
        embedded: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ServeTransport {
    #[value(alias = "sse")]
    Http,
    Stdio,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr so JSON output on stdout stays clean.
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Serve {
            host,
            port,
            mcp_url,
        } => commands::serve::run(config_path, host, port, mcp_url).await?,
        Commands::McpServer {
            host,
            port,
            transport,
        } => commands::mcp_server::run(config_path, host, port, transport).await?,
        Commands::Ask {
            prompt,
            system,
            max_iterations,
            no_resources,
            embedded,
        } => {
            commands::ask::run(
                config_path,
                commands::ask::AskArgs {
                    prompt,
                    system,
                    max_iterations,
                    resources: !no_resources,
                    embedded,
                },
            )
            .await?
        }
        Commands::Tools { embedded } => commands::catalog::tools(config_path, embedded).await?,
        Commands::Resources { embedded } => {
            commands::catalog::resources(config_path, embedded).await?
        }
    }

    Ok(())
}
