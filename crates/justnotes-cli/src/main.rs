//! justnotes CLI - a terminal front end for the notes workspace
//!
//! One-shot commands for scripting plus an interactive shell that drives the
//! same synchronization controller as every other client.

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod auth;
mod cli;
mod commands;
mod config_profiles;
mod error;


use cli::{Cli, Commands};
use error::CliError;

const DEFAULT_LOG_DIRECTIVE: &str = "justnotes=info";

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let profile = cli.profile.as_deref();

    match cli.command {
        Commands::List { json } => commands::list::run_list(json, profile).await,
        Commands::New { content } => commands::new::run_new(&content, profile).await,
        Commands::Edit { id, content } => commands::edit::run_edit(&id, &content, profile).await,
        Commands::Delete { id, yes } => commands::delete::run_delete(&id, yes, profile).await,
        Commands::Shell { demo } => commands::shell::run_shell(demo, profile).await,
        Commands::Config { command } => commands::config::run_config(command, profile),
        Commands::Auth { command } => commands::auth_cmd::run_auth(command, profile).await,
    }
}

fn init_tracing() {
    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = DEFAULT_LOG_DIRECTIVE.parse() {
        filter = filter.add_directive(directive);
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
