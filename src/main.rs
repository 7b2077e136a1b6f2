//! stm95 - M95 SPI EEPROM programmer
//!
//! Reads, writes and inspects ST M95-family serial EEPROMs through a
//! selectable transport (in-memory emulator or Linux spidev).

mod cli;
mod commands;
mod programmers;

use clap::Parser;
use cli::{Cli, Commands, TargetArgs};
use stm95_core::PollPolicy;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    match cli.command {
        Commands::Read {
            target,
            output,
            address,
            length,
        } => programmers::with_programmer(
            &target.programmer,
            poll_policy(&target),
            commands::ReadCommand {
                output,
                address,
                length,
                cs: target.cs,
            },
        ),
        Commands::Write {
            target,
            input,
            address,
            no_verify,
        } => programmers::with_programmer(
            &target.programmer,
            poll_policy(&target),
            commands::WriteCommand {
                input,
                address,
                verify: !no_verify,
                cs: target.cs,
            },
        ),
        Commands::Status { target } => programmers::with_programmer(
            &target.programmer,
            poll_policy(&target),
            commands::StatusCommand { cs: target.cs },
        ),
        Commands::WriteStatus { target, value } => programmers::with_programmer(
            &target.programmer,
            poll_policy(&target),
            commands::WriteStatusCommand {
                value,
                cs: target.cs,
            },
        ),
        Commands::ListProgrammers => {
            commands::list_programmers();
            Ok(())
        }
    }
}

/// Busy-poll policy from the command line flags
fn poll_policy(target: &TargetArgs) -> PollPolicy {
    PollPolicy {
        max_polls: target.max_polls,
        delay_us: target.poll_delay_us,
    }
}
