pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "feedbridge")]
#[command(about = "Run site bridges and inspect the items they produce", long_about = None)]
pub struct Cli {
    /// Path to the config file (default: ~/.config/feedbridge/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a bridge and print its identity and items as JSON
    Run {
        /// Bridge name, e.g. AO3 or UberNewsroom
        bridge: String,

        /// Bridge parameter as key=value (repeatable)
        #[arg(short, long = "param", value_parser = parse_param)]
        params: Vec<(String, String)>,
    },
    /// List bridges with their contexts and parameters
    List,
    /// List the cache backends this build knows about
    Caches,
    /// Remove expired entries from the configured cache backend
    Prune,
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", raw))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing parameter name in '{}'", raw));
    }
    Ok((key.to_string(), value.to_string()))
}
