//! Audio device listing command.

use clap::{Args, Subcommand};
use polyvox_io::{default_output_device, list_devices};

#[derive(Args)]
pub struct DevicesArgs {
    #[command(subcommand)]
    command: Option<DevicesCommand>,
}

#[derive(Subcommand)]
enum DevicesCommand {
    /// List all output devices
    List,

    /// Show the default output device
    Info,
}

pub fn run(args: DevicesArgs) -> anyhow::Result<()> {
    match args.command.unwrap_or(DevicesCommand::List) {
        DevicesCommand::List => {
            let devices = list_devices()?;
            let outputs: Vec<_> = devices.iter().filter(|d| d.is_output).collect();

            if outputs.is_empty() {
                println!("No audio output devices found.");
                return Ok(());
            }

            println!("Available Output Devices");
            println!("========================\n");

            for (idx, device) in outputs.iter().enumerate() {
                let also_input = if device.is_input { " (also input)" } else { "" };
                println!(
                    "  [{}] {} ({} Hz, {} ch){}",
                    idx, device.name, device.default_sample_rate, device.channels, also_input
                );
            }
            println!();
            println!("Total: {} output(s)", outputs.len());
            println!();
            println!("Tip: Use a partial name with --device:");
            println!("  polyvox play --device \"{}\" --keys yxcv", outputs[0].name);
        }

        DevicesCommand::Info => match default_output_device()? {
            Some(device) => {
                println!("Default Output Device");
                println!("=====================\n");
                println!("  Name:        {}", device.name);
                println!("  Sample rate: {} Hz", device.default_sample_rate);
                println!("  Channels:    {}", device.channels);
            }
            None => println!("No default output device."),
        },
    }

    Ok(())
}
