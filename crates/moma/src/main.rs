// SPDX-FileCopyrightText: 2026 Moma Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! moma - chat forwarder between a web chat UI and an Amazon Bedrock agent.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use moma_config::{ConfigError, MomaConfig};

/// moma - forwards chat UI conversations to a Bedrock agent.
#[derive(Parser, Debug)]
#[command(name = "moma", version, about, long_about = None)]
struct Cli {
    /// Configuration file to use instead of the standard search path.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP gateway.
    Serve,
    /// Inspect the configuration.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Validate the configuration and exit.
    Check,
    /// Print the effective configuration with secrets redacted.
    Show,
}

fn load(path: Option<&PathBuf>) -> Result<MomaConfig, Vec<ConfigError>> {
    match path {
        Some(path) => moma_config::load_and_validate_path(path),
        None => moma_config::load_and_validate(),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load(cli.config.as_ref()) {
        Ok(config) => config,
        Err(errors) => {
            moma_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Some(Commands::Serve) | None => serve::run_serve(config).await,
        Some(Commands::Config {
            action: ConfigAction::Check,
        }) => {
            println!("moma: configuration is valid");
            Ok(())
        }
        Some(Commands::Config {
            action: ConfigAction::Show,
        }) => serve::render_config(&config).map(|rendered| print!("{rendered}")),
    };

    if let Err(e) = result {
        eprintln!("moma: {e}");
        std::process::exit(1);
    }
}
