//! CycleSleuth: restore cycle-time analyser.
//!
//! Thin binary entry point. All logic lives in the `cyclesleuth-core`
//! and `cyclesleuth-cli` crates.
use clap::Parser;
use cyclesleuth_cli::Cli;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout carries only the JSON summary.
    tracing_subscriber::fmt()
        .with_max_level(cli.log_level())
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("CycleSleuth starting");
    cyclesleuth_cli::run_cli(cli)
}
