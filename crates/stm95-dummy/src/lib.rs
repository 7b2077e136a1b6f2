//! stm95-dummy - In-memory M95 EEPROM emulator for testing
//!
//! This crate provides a [`Transport`] that emulates an M95 serial EEPROM
//! at the bus level. Bytes written while chip-select is asserted form a
//! frame; instructions execute when chip-select is released, as on the real
//! part. It's useful for testing and development without real hardware.
//!
//! Beyond the memory array the emulator models the write enable latch, a
//! write cycle that keeps WIP set for a configurable number of status reads,
//! and fault injection for exercising error paths.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

use alloc::vec;
use alloc::vec::Vec;
use core::fmt;

use stm95_core::spi::{opcodes, Address, Command, Status};
use stm95_core::Transport;

/// Configuration for the dummy EEPROM
#[derive(Debug, Clone)]
pub struct DummyConfig {
    /// Memory array size in bytes
    pub size: usize,
    /// Chip-select index the device answers on
    pub chip_select: usize,
    /// Number of status reads that report WIP after each write cycle starts
    pub busy_polls: u32,
    /// Record every transport call in [`DummyEeprom::trace`]
    pub trace: bool,
}

impl Default for DummyConfig {
    fn default() -> Self {
        Self {
            size: 256 * 1024, // M95M02
            chip_select: 0,
            busy_polls: 2,
            trace: true,
        }
    }
}

/// Injected faults
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Faults {
    /// Fail the n-th (0-based) call to `write`
    pub fail_write: Option<usize>,
    /// Fail every chip-select assert
    pub fail_select: bool,
    /// Report WIP forever
    pub stuck_busy: bool,
}

/// Errors reported by the emulated bus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DummyError {
    /// Data transfer without an asserted chip-select
    NotSelected,
    /// Chip-select asserted while another one is still active
    AlreadySelected(usize),
    /// Deassert of a chip-select that is not the active one
    WrongChipSelect {
        /// The asserted line
        active: usize,
        /// The line the caller tried to release
        requested: usize,
    },
    /// A fault configured through [`Faults`]
    Injected,
}

impl fmt::Display for DummyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotSelected => write!(f, "transfer without chip-select"),
            Self::AlreadySelected(cs) => write!(f, "chip-select {} is already asserted", cs),
            Self::WrongChipSelect { active, requested } => write!(
                f,
                "deassert of chip-select {} while {} is active",
                requested, active
            ),
            Self::Injected => write!(f, "injected fault"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for DummyError {}

/// One transport call as seen by the emulator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusEvent {
    /// Chip-select asserted
    Select(usize),
    /// Chip-select released
    Deselect(usize),
    /// Bytes written
    Write(Vec<u8>),
    /// Number of bytes read
    Read(usize),
}

/// Dummy M95 EEPROM
///
/// Emulates an EEPROM in memory for testing purposes. Unlike flash, any
/// byte can be rewritten without an erase.
pub struct DummyEeprom {
    config: DummyConfig,
    data: Vec<u8>,
    /// WEL, BP0, BP1, SRWD; WIP is derived from `busy_remaining`
    status: Status,
    busy_remaining: u32,
    selected: Option<usize>,
    frame: Vec<u8>,
    read_pos: usize,
    trace: Vec<BusEvent>,
    writes: usize,
    write_cycles: usize,
    faults: Faults,
}

impl DummyEeprom {
    /// Create a new dummy EEPROM with the given configuration
    ///
    /// The array starts out as 0xFF, the delivery state of the part.
    pub fn new(config: DummyConfig) -> Self {
        let data = vec![0xFF; config.size];
        Self {
            config,
            data,
            status: Status::empty(),
            busy_remaining: 0,
            selected: None,
            frame: Vec::new(),
            read_pos: 0,
            trace: Vec::new(),
            writes: 0,
            write_cycles: 0,
            faults: Faults::default(),
        }
    }

    /// Create a new dummy EEPROM with default configuration (M95M02)
    pub fn new_default() -> Self {
        Self::new(DummyConfig::default())
    }

    /// Create a dummy EEPROM with pre-filled data
    pub fn with_data(config: DummyConfig, initial_data: &[u8]) -> Self {
        let mut eeprom = Self::new(config);
        let len = core::cmp::min(initial_data.len(), eeprom.data.len());
        eeprom.data[..len].copy_from_slice(&initial_data[..len]);
        eeprom
    }

    /// Get a reference to the memory array
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Get a mutable reference to the memory array
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Get the configuration
    pub fn config(&self) -> &DummyConfig {
        &self.config
    }

    /// Every transport call since creation
    ///
    /// Empty when [`DummyConfig::trace`] is off.
    pub fn trace(&self) -> &[BusEvent] {
        &self.trace
    }

    fn record(&mut self, event: impl FnOnce() -> BusEvent) {
        if self.config.trace {
            self.trace.push(event());
        }
    }

    /// Set the faults to inject from now on
    ///
    /// `fail_write` counts `write` calls since creation.
    pub fn set_faults(&mut self, faults: Faults) {
        self.faults = faults;
    }

    /// Number of write cycles (WRITE or WRSR) the device has started
    pub fn write_cycles(&self) -> usize {
        self.write_cycles
    }

    /// Current status register, as the next RDSR would report it
    pub fn status(&self) -> Status {
        let mut status = self.status;
        if self.is_busy() {
            status |= Status::WIP;
        }
        status
    }

    /// Whether chip-select is currently asserted
    pub fn is_selected(&self) -> bool {
        self.selected.is_some()
    }

    fn is_busy(&self) -> bool {
        self.faults.stuck_busy || self.busy_remaining > 0
    }

    fn addressed(&self) -> bool {
        self.selected == Some(self.config.chip_select)
    }

    fn frame_address(&self) -> Option<usize> {
        if self.frame.len() < 4 {
            return None;
        }
        let addr = Address::from_be_bytes([self.frame[1], self.frame[2], self.frame[3]]);
        Some(addr.value() as usize)
    }

    fn start_write_cycle(&mut self) {
        self.status.remove(Status::WEL);
        self.busy_remaining = self.config.busy_polls;
        self.write_cycles += 1;
    }

    fn handle_read(&mut self, buf: &mut [u8]) {
        let Some(base) = self.frame_address() else {
            buf.fill(0xFF);
            return;
        };

        // Reads are rejected during a write cycle; an empty array has nothing
        // to drive
        if self.is_busy() || self.data.is_empty() {
            buf.fill(0xFF);
            return;
        }

        let size = self.data.len();
        for (i, byte) in buf.iter_mut().enumerate() {
            *byte = self.data[(base + self.read_pos + i) % size];
        }
        self.read_pos += buf.len();
    }

    fn handle_read_status(&mut self, buf: &mut [u8]) {
        // The register is shifted out repeatedly while clocked
        buf.fill(self.status().bits());
        if self.busy_remaining > 0 {
            self.busy_remaining -= 1;
        }
    }

    fn handle_write(&mut self) {
        if !self.status.contains(Status::WEL) {
            log::debug!("dummy: WRITE ignored, write enable latch is clear");
            return;
        }
        let Some(addr) = self.frame_address() else {
            return;
        };

        let size = self.data.len();
        let payload = &self.frame[4..];
        if size > 0 {
            for (i, &byte) in payload.iter().enumerate() {
                self.data[(addr + i) % size] = byte;
            }
        }

        if payload.is_empty() {
            self.status.remove(Status::WEL);
        } else {
            self.start_write_cycle();
        }
    }

    fn handle_write_status(&mut self) {
        if !self.status.contains(Status::WEL) {
            log::debug!("dummy: WRSR ignored, write enable latch is clear");
            return;
        }
        if let Some(&value) = self.frame.get(1) {
            let value = Status::from_bits_truncate(value) & Status::WRITABLE;
            self.status = (self.status - Status::WRITABLE) | value;
            self.start_write_cycle();
        }
    }

    /// Execute the instruction framed by the chip-select cycle just ended
    fn execute(&mut self) {
        let Some(&opcode) = self.frame.first() else {
            return;
        };

        // Only RDSR is accepted while a write cycle is running
        if self.is_busy() && opcode != opcodes::RDSR {
            log::debug!("dummy: opcode 0x{:02X} ignored while busy", opcode);
            return;
        }

        match Command::from_opcode(opcode) {
            Some(Command::WriteEnable) => self.status.insert(Status::WEL),
            Some(Command::WriteDisable) => self.status.remove(Status::WEL),
            Some(Command::Write) => self.handle_write(),
            Some(Command::WriteStatus) => self.handle_write_status(),
            Some(Command::Read) | Some(Command::ReadStatus) => {}
            None => log::debug!("dummy: unsupported opcode 0x{:02X}", opcode),
        }
    }
}

impl Transport for DummyEeprom {
    type Error = DummyError;

    fn read(&mut self, buf: &mut [u8]) -> Result<(), DummyError> {
        self.record(|| BusEvent::Read(buf.len()));

        if self.selected.is_none() {
            return Err(DummyError::NotSelected);
        }
        if !self.addressed() {
            // Nobody drives MISO
            buf.fill(0xFF);
            return Ok(());
        }

        match self.frame.first().copied() {
            Some(opcodes::READ) => self.handle_read(buf),
            Some(opcodes::RDSR) => self.handle_read_status(buf),
            _ => buf.fill(0xFF),
        }
        Ok(())
    }

    fn write(&mut self, data: &[u8]) -> Result<(), DummyError> {
        let n = self.writes;
        self.writes += 1;
        self.record(|| BusEvent::Write(data.to_vec()));

        if self.faults.fail_write == Some(n) {
            return Err(DummyError::Injected);
        }
        if self.selected.is_none() {
            return Err(DummyError::NotSelected);
        }
        if self.addressed() {
            self.frame.extend_from_slice(data);
        }
        Ok(())
    }

    fn enable(&mut self, cs: usize) -> Result<(), DummyError> {
        self.record(|| BusEvent::Select(cs));

        if self.faults.fail_select {
            return Err(DummyError::Injected);
        }
        if let Some(active) = self.selected {
            return Err(DummyError::AlreadySelected(active));
        }
        self.selected = Some(cs);
        self.frame.clear();
        self.read_pos = 0;
        Ok(())
    }

    fn disable(&mut self, cs: usize) -> Result<(), DummyError> {
        self.record(|| BusEvent::Deselect(cs));

        match self.selected {
            None => return Err(DummyError::NotSelected),
            Some(active) if active != cs => {
                return Err(DummyError::WrongChipSelect {
                    active,
                    requested: cs,
                })
            }
            Some(_) => {}
        }

        if self.addressed() {
            self.execute();
        }
        self.selected = None;
        Ok(())
    }
}
