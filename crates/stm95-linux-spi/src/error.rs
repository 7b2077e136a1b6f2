//! Error types for Linux SPI operations

use thiserror::Error;

/// Linux SPI specific errors
#[derive(Debug, Error)]
pub enum LinuxSpiError {
    /// Failed to open device
    #[error("Failed to open {path}: {source}")]
    OpenFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to set SPI mode
    #[error("Failed to set SPI mode to {mode}: {source}")]
    SetModeFailed {
        mode: u8,
        #[source]
        source: std::io::Error,
    },

    /// Failed to set bits per word
    #[error("Failed to set bits per word to {bits}: {source}")]
    SetBitsPerWordFailed {
        bits: u8,
        #[source]
        source: std::io::Error,
    },

    /// Failed to set clock speed
    #[error("Failed to set clock speed to {speed} Hz: {source}")]
    SetSpeedFailed {
        speed: u32,
        #[source]
        source: std::io::Error,
    },

    /// SPI transfer failed
    #[error("SPI transfer failed: {0}")]
    TransferFailed(#[source] std::io::Error),

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Neither a device nor a bus was configured
    #[error("No device specified. Use dev=/dev/spidevX.Y or bus=X")]
    NoDevice,

    /// Transfer attempted with no chip-select asserted
    #[error("No chip-select asserted")]
    NotSelected,

    /// Chip-select asserted while another is active
    #[error("Chip-select {0} is already asserted")]
    AlreadySelected(usize),

    /// Release of a chip-select that is not the active one
    #[error("Chip-select {requested} released while {active} is active")]
    WrongChipSelect { active: usize, requested: usize },

    /// Traffic after the read phase of a frame
    #[error("spidev cannot continue a frame after its read phase")]
    FrameClosed,

    /// A frame larger than the kernel transfer buffer
    #[error("Frame of {len} bytes exceeds the {max} byte spidev buffer")]
    FrameTooLarge { len: usize, max: usize },
}

/// Result type for Linux SPI operations
pub type Result<T> = std::result::Result<T, LinuxSpiError>;
