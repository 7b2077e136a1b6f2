//! CLI argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Parse a string as a hex or decimal u32
pub fn parse_hex_u32(s: &str) -> Result<u32, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u32>().map_err(|e| format!("Invalid number: {}", e))
    }
}

/// Parse a status register value (hex or decimal, 0-255)
fn parse_hex_u8(s: &str) -> Result<u8, String> {
    let value = parse_hex_u32(s)?;
    u8::try_from(value).map_err(|_| format!("Value out of range for a register: {}", s))
}

#[derive(Parser)]
#[command(name = "stm95")]
#[command(author, version, about = "M95 SPI EEPROM programmer", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Device selection and write-completion options shared across commands
#[derive(clap::Args, Debug, Clone)]
pub struct TargetArgs {
    /// Programmer to use, with options (e.g. "dummy:size=65536" or
    /// "linux_spi:bus=0,spispeed=1000")
    #[arg(short, long)]
    pub programmer: String,

    /// Chip-select index of the EEPROM
    #[arg(long, default_value_t = 0)]
    pub cs: usize,

    /// Give up after this many status reads while a write is in progress
    /// (at least one is made; default: wait forever)
    #[arg(long)]
    pub max_polls: Option<u32>,

    /// Delay between status reads in microseconds
    #[arg(long, default_value_t = 0)]
    pub poll_delay_us: u32,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Read EEPROM contents to file
    Read {
        #[command(flatten)]
        target: TargetArgs,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Start address (hex, e.g., 0x100)
        #[arg(short, long, default_value = "0", value_parser = parse_hex_u32)]
        address: u32,

        /// Number of bytes to read (hex or decimal)
        #[arg(short, long, value_parser = parse_hex_u32)]
        length: u32,
    },

    /// Write file to EEPROM
    Write {
        #[command(flatten)]
        target: TargetArgs,

        /// Input file path
        #[arg(short, long)]
        input: PathBuf,

        /// Start address (hex, e.g., 0x100)
        #[arg(short, long, default_value = "0", value_parser = parse_hex_u32)]
        address: u32,

        /// Skip reading the data back after writing
        #[arg(long)]
        no_verify: bool,
    },

    /// Show the status register
    Status {
        #[command(flatten)]
        target: TargetArgs,
    },

    /// Write the status register (sets the write enable latch first)
    WriteStatus {
        #[command(flatten)]
        target: TargetArgs,

        /// New register value (hex or decimal)
        #[arg(value_parser = parse_hex_u8)]
        value: u8,
    },

    /// List supported programmers
    ListProgrammers,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_parse_hex_u32() {
        assert_eq!(parse_hex_u32("0x1ABCD"), Ok(0x1ABCD));
        assert_eq!(parse_hex_u32("0X10"), Ok(0x10));
        assert_eq!(parse_hex_u32("4096"), Ok(4096));
        assert!(parse_hex_u32("0xZZ").is_err());
        assert!(parse_hex_u32("ten").is_err());
    }

    #[test]
    fn test_parse_hex_u8() {
        assert_eq!(parse_hex_u8("0x8C"), Ok(0x8C));
        assert!(parse_hex_u8("0x100").is_err());
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_read_arguments() {
        let cli = Cli::try_parse_from([
            "stm95", "read", "-p", "dummy", "--cs", "1", "-a", "0x40", "-l", "128", "-o", "out.bin",
        ])
        .unwrap();
        match cli.command {
            Commands::Read {
                target,
                address,
                length,
                ..
            } => {
                assert_eq!(target.programmer, "dummy");
                assert_eq!(target.cs, 1);
                assert_eq!(target.max_polls, None);
                assert_eq!(address, 0x40);
                assert_eq!(length, 128);
            }
            _ => panic!("expected read command"),
        }
    }
}
