//! stm95-linux-spi - Linux spidev transport
//!
//! This crate drives M95 EEPROMs through the `/dev/spidevX.Y` character
//! devices exposed by the Linux SPI subsystem.
//!
//! # Overview
//!
//! The Linux SPI driver exposes SPI controllers through character devices
//! at `/dev/spidevX.Y` where X is the bus number and Y is the chip select.
//! A transport configured with `bus=X` opens the device matching each
//! chip-select index it is asked to assert; one configured with `dev=`
//! always uses that file.
//!
//! # Example
//!
//! ```no_run
//! use stm95_core::Eeprom;
//! use stm95_linux_spi::{LinuxSpi, LinuxSpiConfig};
//!
//! let config = LinuxSpiConfig::for_bus(0).with_speed(1_000_000);
//! let mut eeprom = Eeprom::new(LinuxSpi::open(config)?);
//!
//! let mut buf = [0u8; 16];
//! eeprom.read(0x0000, &mut buf, 0)?;
//! println!("{:02X?}", buf);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Usage with stm95 CLI
//!
//! ```bash
//! # Read the status register of the part on /dev/spidev0.1
//! stm95 status -p linux_spi:bus=0 --cs 1
//!
//! # Specify SPI speed in kHz and mode
//! stm95 read -p linux_spi:dev=/dev/spidev0.0,spispeed=4000,mode=3 -l 256 -o dump.bin
//! ```
//!
//! # System Requirements
//!
//! - Linux kernel with spidev support enabled (`CONFIG_SPI_SPIDEV`)
//! - Read/write access to `/dev/spidevX.Y` device
//! - May require adding user to `spi` group or using udev rules

pub mod device;
pub mod error;

// Re-exports
pub use device::{mode, parse_options, LinuxSpi, LinuxSpiConfig};
pub use error::{LinuxSpiError, Result};

/// Open a Linux SPI transport from programmer options
///
/// This is a convenience function for use in the CLI programmer dispatch.
///
/// # Example Options
///
/// - `dev=/dev/spidev0.0` - device path used for every chip-select
/// - `bus=0` - chip-select `n` maps to `/dev/spidev0.n`
/// - `spispeed=4000` - Optional: speed in kHz (default: 2000)
/// - `mode=0` - Optional: SPI mode 0-3 (default: 0)
pub fn open_linux_spi(
    options: &[(&str, &str)],
) -> std::result::Result<LinuxSpi, Box<dyn std::error::Error>> {
    let config = parse_options(options)?;
    let spi = LinuxSpi::open(config)?;
    Ok(spi)
}
