//! gitscribe CLI — the main entry point.
//!
//! Commands:
//! - `serve`   — Start the HTTP gateway (web client, SSE, v1 API)
//! - `ask`     — Run the agent once on a prompt
//! - `status`  — Show the effective configuration
//! - `doctor`  — Check credentials and connectivity
//! - `prompt`  — Print the rendered system instruction

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "gitscribe",
    about = "gitscribe — manage GitHub repository files through a conversational agent",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Config file to use instead of ~/.gitscribe/config.toml
    #[arg(short, long, global = true, env = "GITSCRIBE_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Run the agent on one prompt and print the answer
    Ask {
        /// What the agent should do
        prompt: String,

        /// Print progress events while the agent works
        #[arg(short, long)]
        stream: bool,
    },

    /// Show the effective configuration
    Status,

    /// Diagnose credentials and connectivity
    Doctor,

    /// Print the system instruction sent to the model
    Prompt,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    if cli.log_json {
        builder.json().init();
    } else {
        builder.init();
    }

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Serve { port } => commands::serve::run(config_path, port).await?,
        Commands::Ask { prompt, stream } => commands::ask::run(config_path, prompt, stream).await?,
        Commands::Status => commands::status::run(config_path).await?,
        Commands::Doctor => commands::doctor::run(config_path).await?,
        Commands::Prompt => commands::prompt::run(config_path).await?,
    }

    Ok(())
}
