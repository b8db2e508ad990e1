use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "taskwatch", version, about = "Desktop reminders for urgent tasks")]
struct Cli {
    /// Config file to use instead of ~/.config/taskwatch/config.toml
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll the task source and print reminders until stopped
    Watch {
        /// Run a single poll cycle and exit
        #[arg(long)]
        once: bool,
    },
    /// Classify the current tasks once, without showing reminders
    Check {
        /// Read tasks from this JSON file instead of the configured source
        #[arg(long, value_name = "PATH")]
        tasks_file: Option<PathBuf>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// API token for the task service
    Auth {
        #[command(subcommand)]
        action: commands::auth::AuthAction,
    },
}

fn init_tracing() {
    // stdout carries command output; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing();

    let config = cli.config.as_deref();
    let result = match cli.command {
        Commands::Watch { once } => commands::watch::run(config, once),
        Commands::Check { tasks_file, json } => {
            commands::check::run(config, tasks_file.as_deref(), json)
        }
        Commands::Config { action } => commands::config::run(config, action),
        Commands::Auth { action } => commands::auth::run(config, action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
