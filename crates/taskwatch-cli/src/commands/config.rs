use clap::Subcommand;
use std::path::Path;
use taskwatch_core::Config;

use super::{config_path, load_config};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Get a config value
    Get {
        /// Dot-separated key (e.g. "limits.global_cap", "source.kind")
        key: String,
    },
    /// Set a config value
    Set {
        /// Dot-separated key
        key: String,
        /// New value; lists take JSON, e.g. '["Done", "Closed"]'
        value: String,
    },
    /// List all config values
    List {
        /// Print JSON instead of `key = value` lines
        #[arg(long)]
        json: bool,
    },
    /// Reset config to defaults
    Reset,
    /// Print the config file location
    Path,
}

pub fn run(config: Option<&Path>, action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Get { key } => {
            let cfg = load_config(config)?;
            match cfg.get(&key) {
                Some(value) => println!("{value}"),
                None => return Err(format!("unknown config key: {key}").into()),
            }
        }
        ConfigAction::Set { key, value } => {
            let path = config_path(config)?;
            let mut cfg = Config::load_from(&path)?;
            cfg.set(&key, &value)?;
            cfg.save_to(&path)?;
            println!("ok");
        }
        ConfigAction::List { json } => {
            let cfg = load_config(config)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&cfg)?);
            } else {
                for key in cfg.keys() {
                    let value = cfg.get(&key).unwrap_or_default();
                    println!("{key} = {value}");
                }
            }
        }
        ConfigAction::Reset => {
            let path = config_path(config)?;
            Config::default().save_to(&path)?;
            println!("config reset to defaults");
        }
        ConfigAction::Path => {
            println!("{}", config_path(config)?.display());
        }
    }
    Ok(())
}
