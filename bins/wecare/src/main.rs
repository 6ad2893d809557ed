//! WeCare CLI - command-line host for the WeCare API client
//!
//! Signs in, inspects the session and issues raw API calls through the same
//! session, CSRF and recovery layer the web front ends use.

use clap::{Parser, Subcommand};
use owo_colors::OwoColorize;
use std::path::PathBuf;
use std::process::ExitCode;
use wecare_api_client::ApiError;

mod commands;
mod context;

use commands::{auth, request, status};
use context::{Context, GlobalArgs};

/// Command-line host for the WeCare API
#[derive(Parser)]
#[command(name = "wecare")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (text, json)
    #[arg(short, long, global = true, default_value = "text")]
    format: String,

    /// Path to a configuration file (default: .wecare.toml, then the user config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// API base URL, overriding config file and environment
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Directory holding the persisted session
    #[arg(long, global = true)]
    storage_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and persist the session
    Login {
        /// Account email
        email: String,

        /// Account password
        #[arg(short, long, env = "WECARE_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Forget the persisted session
    Logout,

    /// Show the signed-in user
    Whoami,

    /// GET an endpoint and print the JSON response
    Get {
        /// Endpoint path, e.g. /patients
        endpoint: String,
    },

    /// POST a JSON body to an endpoint
    Post {
        /// Endpoint path, e.g. /rides
        endpoint: String,

        /// JSON request body
        #[arg(short, long, default_value = "{}")]
        data: String,
    },

    /// DELETE an endpoint
    Delete {
        /// Endpoint path, e.g. /teams/3
        endpoint: String,
    },

    /// Show configuration and session state
    Status,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("wecare=debug,wecare_api_client=debug,wecare_core=debug")
            .with_writer(std::io::stderr)
            .init();
    }

    let globals = GlobalArgs {
        config: cli.config,
        base_url: cli.base_url,
        storage_dir: cli.storage_dir,
        format: cli.format,
    };

    let result = match Context::build(globals) {
        Ok(ctx) => match cli.command {
            Commands::Login { email, password } => auth::login(&ctx, &email, &password).await,
            Commands::Logout => auth::logout(&ctx),
            Commands::Whoami => auth::whoami(&ctx).await,
            Commands::Get { endpoint } => request::get(&ctx, &endpoint).await,
            Commands::Post { endpoint, data } => request::post(&ctx, &endpoint, &data).await,
            Commands::Delete { endpoint } => request::delete(&ctx, &endpoint).await,
            Commands::Status => status::run(&ctx).await,
        },
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            if let Some(api) = e.downcast_ref::<ApiError>().filter(|a| a.is_auth_failure()) {
                eprintln!("  {}", api.user_message().dimmed());
            }
            ExitCode::FAILURE
        }
    }
}
