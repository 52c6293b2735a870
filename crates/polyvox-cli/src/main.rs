//! Polyvox CLI - command-line host for the polyvox polyphonic synthesizer.

mod commands;
mod keymap;
mod score;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "polyvox")]
#[command(author, version, about = "Polyvox polyphonic synthesizer", long_about = None)]
struct Cli {
    /// Config file path or name (defaults to the user config file)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a score through an audio output device
    Play(commands::play::PlayArgs),

    /// Render a score offline to a WAV file
    Render(commands::render::RenderArgs),

    /// Render a score offline and report its spectral peaks
    Spectrum(commands::spectrum::SpectrumArgs),

    /// List audio output devices
    Devices(commands::devices::DevicesArgs),

    /// Show or create the configuration file
    Config(commands::config::ConfigArgs),
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()),
        )
        .with_writer(std::io::stderr)
        .init();
    tracing_log::LogTracer::init().ok();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = cli.config.as_deref();
    match cli.command {
        Commands::Play(args) => commands::play::run(args, config),
        Commands::Render(args) => commands::render::run(args, config),
        Commands::Spectrum(args) => commands::spectrum::run(args, config),
        Commands::Devices(args) => commands::devices::run(args),
        Commands::Config(args) => commands::config::run(args, config),
    }
}
