//! Linux SPI device implementation
//!
//! This module provides the `LinuxSpi` struct that implements the
//! `Transport` trait using Linux's spidev interface.
//!
//! spidev drives chip-select itself, once per `SPI_IOC_MESSAGE`. To map the
//! engine's explicit assert/deassert calls onto that model, bytes written
//! while a chip-select is asserted are buffered. A read sends the buffered
//! bytes and the read as one message; a deassert sends whatever is still
//! buffered. Once the read phase of a frame has gone out the line has been
//! released by the kernel, so further traffic in the same frame is refused.

use crate::error::{LinuxSpiError, Result};

use stm95_core::Transport;

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::os::unix::io::AsRawFd;

/// Path to kernel spidev buffer size parameter
const BUF_SIZE_SYSFS: &str = "/sys/module/spidev/parameters/bufsiz";

/// Default SPI clock speed in Hz (2 MHz)
const DEFAULT_SPEED_HZ: u32 = 2_000_000;

/// SPI mode constants
pub mod mode {
    /// SPI mode 0: CPOL=0, CPHA=0
    pub const MODE_0: u8 = 0;
    /// SPI mode 1: CPOL=0, CPHA=1
    pub const MODE_1: u8 = 1;
    /// SPI mode 2: CPOL=1, CPHA=0
    pub const MODE_2: u8 = 2;
    /// SPI mode 3: CPOL=1, CPHA=1
    pub const MODE_3: u8 = 3;
}

/// Linux spidev ioctl constants
mod ioctl {
    use nix::ioctl_write_ptr;

    // SPI ioctl magic number
    const SPI_IOC_MAGIC: u8 = b'k';

    // SPI ioctl type numbers
    const SPI_IOC_TYPE_MODE: u8 = 1;
    const SPI_IOC_TYPE_BITS_PER_WORD: u8 = 3;
    const SPI_IOC_TYPE_MAX_SPEED_HZ: u8 = 4;

    ioctl_write_ptr!(spi_ioc_wr_mode, SPI_IOC_MAGIC, SPI_IOC_TYPE_MODE, u8);
    ioctl_write_ptr!(
        spi_ioc_wr_bits_per_word,
        SPI_IOC_MAGIC,
        SPI_IOC_TYPE_BITS_PER_WORD,
        u8
    );
    ioctl_write_ptr!(
        spi_ioc_wr_max_speed_hz,
        SPI_IOC_MAGIC,
        SPI_IOC_TYPE_MAX_SPEED_HZ,
        u32
    );

    /// Size of spi_ioc_transfer struct
    pub const SPI_IOC_TRANSFER_SIZE: usize = 32;

    /// Calculate ioctl number for SPI_IOC_MESSAGE(n)
    ///
    /// `_IOW(SPI_IOC_MAGIC, 0, char[n * sizeof(struct spi_ioc_transfer)])`
    pub fn spi_ioc_message(n: u8) -> libc::c_ulong {
        let size = (n as usize) * SPI_IOC_TRANSFER_SIZE;
        ((1u32 << 30) | ((size as u32) << 16) | ((SPI_IOC_MAGIC as u32) << 8)) as libc::c_ulong
    }
}

/// SPI transfer structure for ioctl
/// This must match the kernel's struct spi_ioc_transfer layout
#[repr(C)]
#[derive(Debug, Default, Clone)]
struct SpiIocTransfer {
    tx_buf: u64,          // __u64 tx_buf
    rx_buf: u64,          // __u64 rx_buf
    len: u32,             // __u32 len
    speed_hz: u32,        // __u32 speed_hz
    delay_usecs: u16,     // __u16 delay_usecs
    bits_per_word: u8,    // __u8 bits_per_word
    cs_change: u8,        // __u8 cs_change
    tx_nbits: u8,         // __u8 tx_nbits
    rx_nbits: u8,         // __u8 rx_nbits
    word_delay_usecs: u8, // __u8 word_delay_usecs
    _pad: u8,             // padding
}

impl SpiIocTransfer {
    fn tx(data: &[u8], speed_hz: u32) -> Self {
        Self {
            tx_buf: data.as_ptr() as u64,
            len: data.len() as u32,
            speed_hz,
            bits_per_word: 8,
            ..Default::default()
        }
    }

    fn rx(buf: &mut [u8], speed_hz: u32) -> Self {
        Self {
            rx_buf: buf.as_mut_ptr() as u64,
            len: buf.len() as u32,
            speed_hz,
            bits_per_word: 8,
            ..Default::default()
        }
    }
}

/// Configuration for opening Linux SPI devices
#[derive(Debug, Clone)]
pub struct LinuxSpiConfig {
    /// Fixed device path (e.g., "/dev/spidev0.0"), used for every chip-select
    pub device: Option<String>,
    /// Bus number; chip-select `n` opens `/dev/spidev<bus>.<n>`
    pub bus: Option<u32>,
    /// SPI clock speed in Hz (default: 2 MHz)
    pub speed_hz: u32,
    /// SPI mode (0-3, default: 0)
    pub mode: u8,
}

impl Default for LinuxSpiConfig {
    fn default() -> Self {
        Self {
            device: None,
            bus: None,
            speed_hz: DEFAULT_SPEED_HZ,
            mode: mode::MODE_0,
        }
    }
}

impl LinuxSpiConfig {
    /// Create a configuration bound to a single device path
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: Some(device.into()),
            ..Default::default()
        }
    }

    /// Create a configuration that picks the device by chip-select index
    pub fn for_bus(bus: u32) -> Self {
        Self {
            bus: Some(bus),
            ..Default::default()
        }
    }

    /// Set the SPI clock speed in Hz
    pub fn with_speed(mut self, speed_hz: u32) -> Self {
        self.speed_hz = speed_hz;
        self
    }

    /// Set the SPI mode (0-3)
    pub fn with_mode(mut self, mode: u8) -> Self {
        self.mode = mode;
        self
    }

    /// Device path serving chip-select `cs`
    pub fn device_path(&self, cs: usize) -> Result<String> {
        match (&self.device, self.bus) {
            (Some(device), _) => Ok(device.clone()),
            (None, Some(bus)) => Ok(format!("/dev/spidev{}.{}", bus, cs)),
            (None, None) => Err(LinuxSpiError::NoDevice),
        }
    }
}

/// Bytes of the frame currently on the bus
#[derive(Debug, Default)]
struct Frame {
    cs: usize,
    tx: Vec<u8>,
    closed: bool,
}

/// Linux SPI transport using the spidev interface
///
/// Device files are opened and configured on first use of each
/// chip-select index.
pub struct LinuxSpi {
    config: LinuxSpiConfig,
    /// Open spidev handles by chip-select index
    files: HashMap<usize, File>,
    /// Maximum kernel buffer size
    max_kernel_buf_size: usize,
    frame: Option<Frame>,
}

impl LinuxSpi {
    /// Create a transport with the given configuration
    ///
    /// No device is opened until the first chip-select is asserted.
    pub fn open(config: LinuxSpiConfig) -> Result<Self> {
        if config.device.is_none() && config.bus.is_none() {
            return Err(LinuxSpiError::NoDevice);
        }

        let max_kernel_buf_size = get_max_kernel_buf_size();
        log::debug!(
            "linux_spi: Max kernel buffer size: {} bytes",
            max_kernel_buf_size
        );

        Ok(Self {
            config,
            files: HashMap::new(),
            max_kernel_buf_size,
            frame: None,
        })
    }

    /// Open and configure the device file for `cs`
    fn configure(config: &LinuxSpiConfig, cs: usize) -> Result<File> {
        let path = config.device_path(cs)?;
        log::debug!("linux_spi: Opening device {} for cs {}", path, cs);

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| LinuxSpiError::OpenFailed {
                path: path.clone(),
                source: e,
            })?;

        let fd = file.as_raw_fd();

        let mode = config.mode;
        unsafe {
            ioctl::spi_ioc_wr_mode(fd, &mode).map_err(|e| LinuxSpiError::SetModeFailed {
                mode,
                source: std::io::Error::from_raw_os_error(e as i32),
            })?;
        }

        // Set bits per word (always 8)
        let bits: u8 = 8;
        unsafe {
            ioctl::spi_ioc_wr_bits_per_word(fd, &bits).map_err(|e| {
                LinuxSpiError::SetBitsPerWordFailed {
                    bits,
                    source: std::io::Error::from_raw_os_error(e as i32),
                }
            })?;
        }

        let speed = config.speed_hz;
        unsafe {
            ioctl::spi_ioc_wr_max_speed_hz(fd, &speed).map_err(|e| {
                LinuxSpiError::SetSpeedFailed {
                    speed,
                    source: std::io::Error::from_raw_os_error(e as i32),
                }
            })?;
        }

        log::info!(
            "linux_spi: Opened {} (mode={}, speed={} kHz)",
            path,
            mode,
            speed / 1000
        );

        Ok(file)
    }

    /// Send one SPI_IOC_MESSAGE: the buffered bytes, then an optional read
    fn transfer(&mut self, cs: usize, write_data: &[u8], read_buf: &mut [u8]) -> Result<()> {
        let len = write_data.len() + read_buf.len();
        if len == 0 {
            return Ok(());
        }
        if len > self.max_kernel_buf_size {
            return Err(LinuxSpiError::FrameTooLarge {
                len,
                max: self.max_kernel_buf_size,
            });
        }

        let fd = self
            .files
            .get(&cs)
            .map(|f| f.as_raw_fd())
            .ok_or(LinuxSpiError::NotSelected)?;
        let speed_hz = self.config.speed_hz;

        let mut transfers = Vec::with_capacity(2);
        if !write_data.is_empty() {
            transfers.push(SpiIocTransfer::tx(write_data, speed_hz));
        }
        if !read_buf.is_empty() {
            transfers.push(SpiIocTransfer::rx(read_buf, speed_hz));
        }

        let ioctl_num = ioctl::spi_ioc_message(transfers.len() as u8);
        let ret = unsafe { libc::ioctl(fd, ioctl_num, transfers.as_ptr()) };

        if ret < 0 {
            return Err(LinuxSpiError::TransferFailed(
                std::io::Error::last_os_error(),
            ));
        }

        Ok(())
    }

    fn open_frame(&mut self) -> Result<&mut Frame> {
        match self.frame.as_mut() {
            None => Err(LinuxSpiError::NotSelected),
            Some(frame) if frame.closed => Err(LinuxSpiError::FrameClosed),
            Some(frame) => Ok(frame),
        }
    }
}

impl Transport for LinuxSpi {
    type Error = LinuxSpiError;

    fn read(&mut self, buf: &mut [u8]) -> Result<()> {
        let frame = self.open_frame()?;
        frame.closed = true;
        let cs = frame.cs;
        let tx = std::mem::take(&mut frame.tx);
        self.transfer(cs, &tx, buf)
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        let frame = self.open_frame()?;
        frame.tx.extend_from_slice(data);
        Ok(())
    }

    fn enable(&mut self, cs: usize) -> Result<()> {
        if let Some(frame) = &self.frame {
            return Err(LinuxSpiError::AlreadySelected(frame.cs));
        }
        if !self.files.contains_key(&cs) {
            let file = Self::configure(&self.config, cs)?;
            self.files.insert(cs, file);
        }
        self.frame = Some(Frame {
            cs,
            ..Default::default()
        });
        Ok(())
    }

    fn disable(&mut self, cs: usize) -> Result<()> {
        let frame = match self.frame.take() {
            None => return Err(LinuxSpiError::NotSelected),
            Some(frame) if frame.cs != cs => {
                let active = frame.cs;
                self.frame = Some(frame);
                return Err(LinuxSpiError::WrongChipSelect {
                    active,
                    requested: cs,
                });
            }
            Some(frame) => frame,
        };

        self.transfer(cs, &frame.tx, &mut [])
    }

    fn delay_us(&mut self, us: u32) {
        std::thread::sleep(std::time::Duration::from_micros(us as u64));
    }
}

/// Read the maximum kernel buffer size from sysfs, or use page size as fallback
fn get_max_kernel_buf_size() -> usize {
    if let Ok(content) = std::fs::read_to_string(BUF_SIZE_SYSFS) {
        if let Ok(size) = content.trim().parse::<usize>() {
            if size > 0 {
                log::debug!("linux_spi: Using buffer size {} from sysfs", size);
                return size;
            }
        }
        log::warn!("linux_spi: Invalid buffer size in {}", BUF_SIZE_SYSFS);
    } else {
        log::debug!("linux_spi: Cannot read {}, using page size", BUF_SIZE_SYSFS);
    }

    // Fall back to page size
    let page_size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) } as usize;
    log::debug!("linux_spi: Using page size {} as buffer size", page_size);
    page_size
}

/// Parse programmer options from a list of key-value pairs
pub fn parse_options(options: &[(&str, &str)]) -> std::result::Result<LinuxSpiConfig, String> {
    let mut config = LinuxSpiConfig::default();

    for (key, value) in options {
        match *key {
            "dev" => {
                config.device = Some(value.to_string());
            }
            "bus" => {
                let bus: u32 = value
                    .parse()
                    .map_err(|_| format!("Invalid bus value: {}", value))?;
                config.bus = Some(bus);
            }
            "spispeed" => {
                // Parse speed in kHz
                let speed_khz: u32 = value
                    .parse()
                    .map_err(|_| format!("Invalid spispeed value: {}", value))?;
                config.speed_hz = speed_khz
                    .checked_mul(1000)
                    .ok_or_else(|| format!("Invalid spispeed value: {}", value))?;
            }
            "mode" => {
                let mode: u8 = value
                    .parse()
                    .map_err(|_| format!("Invalid mode value: {}", value))?;
                if mode > 3 {
                    return Err(format!("Invalid SPI mode: {} (must be 0-3)", mode));
                }
                config.mode = mode;
            }
            _ => {
                log::warn!("linux_spi: Unknown option: {}={}", key, value);
            }
        }
    }

    if config.device.is_none() && config.bus.is_none() {
        return Err("No device specified. Use dev=/dev/spidevX.Y or bus=X".to_string());
    }

    Ok(config)
}
