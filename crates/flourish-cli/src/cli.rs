use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "flourish")]
#[command(about = "Score time spent on productive sites and grow a garden from it")]
#[command(version)]
pub struct Cli {
    /// JSON file holding the persisted state
    #[arg(long, global = true, default_value = "flourish-state.json")]
    pub state: PathBuf,

    /// Optional TOML config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the full state as JSON
    State,
    /// Add a site to the productive list
    AddProductive { site: String },
    /// Remove a site from the productive list
    RemoveProductive { site: String },
    /// Add a site to the unproductive list
    AddUnproductive { site: String },
    /// Remove a site from the unproductive list
    RemoveUnproductive { site: String },
    /// Show or hide the score overlay
    Overlay {
        #[arg(value_enum)]
        toggle: Toggle,
    },
    /// Reset the score and clear the garden
    Reset,
    /// Play a sequence of tab visits through the scorer
    Simulate {
        /// `<url>[=<ticks>]`, repeatable; ticks default to 1
        #[arg(long = "visit", value_parser = parse_visit, required = true)]
        visits: Vec<Visit>,

        /// Override the tick interval in milliseconds
        #[arg(long)]
        interval_ms: Option<u64>,

        /// Seed for the garden's random growth
        #[arg(long)]
        seed: Option<u64>,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Toggle {
    On,
    Off,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Visit {
    pub url: String,
    pub ticks: u32,
}

/// `https://example.com=3` → 3 ticks; a trailing `=x` that is not a number
/// stays part of the URL.
pub fn parse_visit(input: &str) -> Result<Visit, String> {
    let input = input.trim();
    if input.is_empty() {
        return Err("visit must not be empty".to_string());
    }
    let split = input
        .rsplit_once('=')
        .and_then(|(url, ticks)| ticks.parse::<u32>().ok().map(|ticks| (url, ticks)));
    match split {
        Some((_, 0)) => Err(format!("visit '{input}' needs at least one tick")),
        Some((url, ticks)) => Ok(Visit { url: url.to_string(), ticks }),
        None => Ok(Visit { url: input.to_string(), ticks: 1 }),
    }
}
