//! Programmer registration and dispatch
//!
//! This module provides a centralized registry for all programmers, with support
//! for feature-gated inclusion. A programmer string has the form
//! `name[:key=value,...]`; the named backend is opened, wrapped in an
//! [`Eeprom`] and handed to an [`EepromTask`].

use std::collections::HashMap;
#[cfg(feature = "dummy")]
use std::path::PathBuf;

use stm95_core::{Eeprom, PollPolicy, Transport};
use thiserror::Error;

/// Errors from programmer string parsing and backend selection
#[derive(Debug, Error)]
pub enum ProgrammerError {
    /// An option without `=`
    #[error("Invalid parameter format: '{0}' (expected key=value)")]
    InvalidFormat(String),

    /// An option with a value the backend cannot use
    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: String, value: String },

    /// No compiled-in programmer has this name
    #[error("Unknown programmer: {0}")]
    Unknown(String),
}

/// Work to run against an opened EEPROM
///
/// Backends have different transport types, so the work is expressed as a
/// generic method rather than a closure.
pub trait EepromTask {
    /// Run the task
    fn run<T: Transport>(self, eeprom: &mut Eeprom<T>) -> Result<(), Box<dyn std::error::Error>>;
}

/// Parsed programmer parameters
pub struct ProgrammerParams {
    /// Programmer name as given
    pub name: String,
    /// Key-value parameters
    pub params: HashMap<String, String>,
}

impl ProgrammerParams {
    /// Parameters as borrowed pairs, in the form backend `parse_options` take
    #[allow(dead_code)]
    pub fn pairs(&self) -> Vec<(&str, &str)> {
        self.params
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect()
    }
}

/// Parse a programmer string into name and parameters
///
/// Format: "name" or "name:key1=value1,key2=value2"
pub fn parse_programmer_params(s: &str) -> Result<ProgrammerParams, ProgrammerError> {
    let (name, opts_str) = s.split_once(':').unwrap_or((s, ""));

    let mut params = HashMap::new();
    if !opts_str.is_empty() {
        for opt in opts_str.split(',') {
            if let Some((key, value)) = opt.split_once('=') {
                params.insert(key.to_string(), value.to_string());
            } else {
                return Err(ProgrammerError::InvalidFormat(opt.to_string()));
            }
        }
    }

    Ok(ProgrammerParams {
        name: name.to_string(),
        params,
    })
}

/// Information about a programmer
pub struct ProgrammerInfo {
    /// Primary name (used for matching)
    pub name: &'static str,
    /// Alternative names/aliases
    pub aliases: &'static [&'static str],
    /// Short description
    pub description: &'static str,
}

/// Get information about all available programmers (enabled at compile time)
#[allow(unused_mut, clippy::vec_init_then_push)]
pub fn available_programmers() -> Vec<ProgrammerInfo> {
    let mut programmers = Vec::new();

    #[cfg(feature = "dummy")]
    programmers.push(ProgrammerInfo {
        name: "dummy",
        aliases: &[],
        description: "In-memory M95 emulator (size=<bytes>,busy=<polls>,image=<file>,cs=<n>)",
    });

    #[cfg(feature = "linux-spi")]
    programmers.push(ProgrammerInfo {
        name: "linux_spi",
        aliases: &["linux-spi", "spidev"],
        description: "Linux spidev (bus=<n> or dev=/dev/spidevX.Y,spispeed=<kHz>,mode=<0-3>)",
    });

    programmers
}

/// Generate a short list of programmer names for CLI help
pub fn programmer_names_short() -> String {
    let programmers = available_programmers();
    if programmers.is_empty() {
        return "none (recompile with features)".to_string();
    }
    let names: Vec<&str> = programmers.iter().map(|p| p.name).collect();
    names.join(", ")
}

/// Resolve a name or alias to the canonical programmer name
pub fn find_programmer(name: &str) -> Option<&'static str> {
    available_programmers()
        .into_iter()
        .find(|p| p.name == name || p.aliases.contains(&name))
        .map(|p| p.name)
}

/// Open the programmer named by `programmer` and run `task` against it
pub fn with_programmer<A: EepromTask>(
    programmer: &str,
    poll: PollPolicy,
    task: A,
) -> Result<(), Box<dyn std::error::Error>> {
    let params = parse_programmer_params(programmer)?;

    let canonical = find_programmer(&params.name).ok_or_else(|| {
        format!(
            "{}\nAvailable programmers: {}\nUse 'stm95 list-programmers' for more details",
            ProgrammerError::Unknown(params.name.clone()),
            programmer_names_short()
        )
    })?;

    match canonical {
        #[cfg(feature = "dummy")]
        "dummy" => run_dummy(&params, poll, task),

        #[cfg(feature = "linux-spi")]
        "linux_spi" => {
            log::info!("Opening Linux SPI programmer...");
            let spi = stm95_linux_spi::open_linux_spi(&params.pairs()).map_err(|e| {
                format!(
                    "Failed to open Linux SPI device: {}\n\
                     Make sure the device exists and you have read/write permissions.\n\
                     You may need to: sudo usermod -aG spi $USER",
                    e
                )
            })?;
            let mut eeprom = Eeprom::new(spi).with_poll_policy(poll);
            task.run(&mut eeprom)
        }

        _ => {
            let _ = (poll, task);
            Err(ProgrammerError::Unknown(params.name.clone()).into())
        }
    }
}

/// Parsed `dummy` programmer options
#[cfg(feature = "dummy")]
#[derive(Debug, Default)]
pub struct DummyOptions {
    /// Emulator configuration
    pub config: stm95_dummy::DummyConfig,
    /// Backing file loaded at start and written back after a modifying run
    pub image: Option<PathBuf>,
}

/// Parse a hex or decimal option value
#[cfg(feature = "dummy")]
fn parse_value<T: TryFrom<u64>>(key: &str, value: &str) -> Result<T, ProgrammerError> {
    let invalid = || ProgrammerError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    };
    let raw = if let Some(hex) = value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16).map_err(|_| invalid())?
    } else {
        value.parse::<u64>().map_err(|_| invalid())?
    };
    T::try_from(raw).map_err(|_| invalid())
}

/// Parse options for the `dummy` programmer
///
/// Without `size=`, an existing image file sets the array size. The bus
/// trace is turned off since nothing in the CLI reads it.
#[cfg(feature = "dummy")]
pub fn parse_dummy_options(
    params: &HashMap<String, String>,
) -> Result<DummyOptions, ProgrammerError> {
    let mut options = DummyOptions::default();
    options.config.trace = false;
    let mut size_given = false;

    for (key, value) in params {
        match key.as_str() {
            "size" => {
                let size: usize = parse_value(key, value)?;
                if size == 0 {
                    return Err(ProgrammerError::InvalidValue {
                        key: key.clone(),
                        value: value.clone(),
                    });
                }
                options.config.size = size;
                size_given = true;
            }
            "busy" => options.config.busy_polls = parse_value(key, value)?,
            "cs" => options.config.chip_select = parse_value(key, value)?,
            "image" => options.image = Some(PathBuf::from(value)),
            _ => log::warn!("dummy: Unknown option: {}={}", key, value),
        }
    }

    if !size_given {
        if let Some(len) = options
            .image
            .as_ref()
            .and_then(|path| std::fs::metadata(path).ok())
            .map(|meta| meta.len() as usize)
            .filter(|len| *len > 0)
        {
            options.config.size = len;
        }
    }

    Ok(options)
}

#[cfg(feature = "dummy")]
fn run_dummy<A: EepromTask>(
    params: &ProgrammerParams,
    poll: PollPolicy,
    task: A,
) -> Result<(), Box<dyn std::error::Error>> {
    use stm95_dummy::DummyEeprom;

    let options = parse_dummy_options(&params.params)?;

    let mut device = match &options.image {
        Some(path) if path.exists() => {
            let image = std::fs::read(path)?;
            log::info!("dummy: Loaded {} bytes from {}", image.len(), path.display());
            DummyEeprom::with_data(options.config.clone(), &image)
        }
        _ => DummyEeprom::new(options.config.clone()),
    };
    log::info!(
        "dummy: {} byte EEPROM on chip-select {}",
        options.config.size,
        options.config.chip_select
    );

    let result = {
        let mut eeprom = Eeprom::new(&mut device).with_poll_policy(poll);
        task.run(&mut eeprom)
    };

    if let Some(path) = &options.image {
        if device.write_cycles() > 0 {
            std::fs::write(path, device.data())?;
            log::info!("dummy: Saved image to {}", path.display());
        }
    }

    result
}
