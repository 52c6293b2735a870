//! Configuration file command.

use std::path::PathBuf;

use clap::{Args, Subcommand};
use polyvox_config::{Config, user_config_file};

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print the effective configuration as TOML
    Show,

    /// Write a default configuration file
    Init {
        /// Target file (defaults to the user config file)
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the user config file path
    Path,
}

pub fn run(args: ConfigArgs, config_name: Option<&str>) -> anyhow::Result<()> {
    match args.command {
        ConfigCommand::Show => {
            let (config, path) = Config::resolve(config_name)?;
            match path {
                Some(path) => println!("# Loaded from {}", path.display()),
                None => println!("# Built-in defaults"),
            }
            // Surface invalid values here rather than at play time
            if let Err(e) = config.to_settings() {
                tracing::warn!(error = %e, "configuration does not produce valid engine settings");
            }
            print!("{}", config.to_toml()?);
        }

        ConfigCommand::Init { path, force } => {
            let path = path.unwrap_or_else(user_config_file);
            if path.exists() && !force {
                anyhow::bail!(
                    "{} already exists. Use --force to overwrite.",
                    path.display()
                );
            }
            Config::default().save(&path)?;
            println!("Wrote default configuration to {}", path.display());
        }

        ConfigCommand::Path => {
            println!("{}", user_config_file().display());
        }
    }

    Ok(())
}
