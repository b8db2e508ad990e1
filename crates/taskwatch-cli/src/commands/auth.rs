use clap::Subcommand;
use std::io::BufRead;
use std::path::Path;
use taskwatch_core::{check_connection, credentials, SourceKind, TaskSource};

use super::load_config;

#[derive(Subcommand)]
pub enum AuthAction {
    /// Store the task service API token in the OS keyring
    Login {
        /// API token; read from stdin when omitted
        #[arg(long)]
        token: Option<String>,
    },
    /// Remove the stored token
    Logout,
    /// Show where the token comes from
    Status,
    /// Fetch tasks once to confirm the configured source is reachable
    Test,
}

pub fn run(config: Option<&Path>, action: AuthAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        AuthAction::Login { token } => {
            let token = match token {
                Some(token) => token,
                None => {
                    let mut line = String::new();
                    std::io::stdin().lock().read_line(&mut line)?;
                    line
                }
            };
            if token.trim().is_empty() {
                return Err("token is empty".into());
            }
            credentials::store_api_token(&token)?;
            println!("token stored");
        }
        AuthAction::Logout => {
            credentials::clear_api_token()?;
            println!("token removed");
        }
        AuthAction::Status => {
            let from_env = std::env::var(credentials::API_TOKEN_ENV)
                .map(|v| !v.trim().is_empty())
                .unwrap_or(false);
            if from_env {
                println!("token set ({})", credentials::API_TOKEN_ENV);
            } else if credentials::api_token()?.is_some() {
                println!("token set (keyring)");
            } else {
                println!("no token");
            }
        }
        AuthAction::Test => {
            let cfg = load_config(config)?;
            let token = match cfg.source.kind {
                SourceKind::Http => credentials::api_token()?,
                SourceKind::File => None,
            };
            let source = cfg.task_source(token)?;
            let count = check_connection(source.as_ref())?;
            println!("connected ({}): {count} tasks", source.name());
        }
    }
    Ok(())
}
