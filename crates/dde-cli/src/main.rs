use std::error::Error;

use clap::{Parser, Subcommand};
use commands::{
    aggregate::{self, AggregateArgs},
    profile::{self, ProfileArgs},
};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser, Debug)]
#[command(name = "dde", about = "Replicate-log aggregation for directed evolution experiments")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Aggregate every run directory under a data directory into consolidated tables.
    Aggregate(AggregateArgs),
    /// Write the default aggregation profile as YAML.
    Profile(ProfileArgs),
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<(), Box<dyn Error>> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Command::Aggregate(args) => aggregate::run(&args),
        Command::Profile(args) => profile::run(&args),
    }
}
