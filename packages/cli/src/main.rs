mod commands;
mod config;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{inspect, replay, verify, InspectArgs, ReplayArgs, VerifyArgs};
use config::Config;

/// Elicast CLI - inspect and replay interactive screencast logs
#[derive(Parser, Debug)]
#[command(name = "elicast")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log engine internals (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Summarize a log: operation counts, regions, segments
    Inspect(InspectArgs),

    /// Print the document at a timestamp
    Replay(ReplayArgs),

    /// Check that a log replays consistently
    Verify(VerifyArgs),
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?.display().to_string();
    let config = Config::load(&cwd)?;

    match cli.command {
        Command::Inspect(args) => inspect(args, &config, &cwd),
        Command::Replay(args) => replay(args, &config, &cwd),
        Command::Verify(args) => verify(args, &config, &cwd),
    }
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run(cli) {
        eprintln!();
        eprintln!("{} {:#}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
