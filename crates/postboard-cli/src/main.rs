//! postboard - command-line client for the postboard social API.
//!
//! Logs in and out, issues authenticated API requests through the token
//! refresh pipeline, and shows how the client router resolves a path for
//! the current login state.

mod app;

use std::io;
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use app::{format_navigation, login_summary, App};

/// Log file name prefix inside `--log-dir`
const LOG_FILE: &str = "postboard.log";

#[derive(Parser, Debug)]
#[command(name = "postboard", version, about = "Command-line client for postboard")]
struct Cli {
    /// Also write logs to a daily-rolling file in this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Log in and store the issued tokens
    Login {
        /// Username (defaults to the last one used)
        #[arg(short, long)]
        username: Option<String>,
        /// Keep tokens across restarts
        #[arg(short, long)]
        remember: bool,
    },
    /// Forget all stored tokens
    Logout,
    /// Show login state and where each credential is stored
    Status,
    /// Send a request through the authenticated client
    Request {
        /// HTTP method, e.g. GET or POST
        method: String,
        /// Path relative to the API base URL
        path: String,
        /// JSON request body
        #[arg(short, long)]
        data: Option<String>,
        /// Do not retry after a silent token refresh
        #[arg(long)]
        no_retry: bool,
    },
    /// Resolve a client route for the current login state
    Route {
        /// Location, e.g. /posts/5/edit
        location: String,
    },
}

/// Initialize the tracing subscriber for logging
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();
    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _guard = init_tracing(cli.log_dir.as_deref());
    info!("postboard starting");

    let mut app = App::new()?;

    match cli.command {
        Command::Login { username, remember } => {
            app.login(username, remember).await?;
            println!("{}", login_summary(remember));
        }
        Command::Logout => {
            app.logout();
            println!("Logged out");
        }
        Command::Status => {
            print!("{}", app.status());
        }
        Command::Request {
            method,
            path,
            data,
            no_retry,
        } => {
            let body = app.request(&method, &path, data.as_deref(), !no_retry).await?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        Command::Route { location } => {
            let nav = app.open(&location)?;
            print!("{}", format_navigation(&nav));
        }
    }

    Ok(())
}
