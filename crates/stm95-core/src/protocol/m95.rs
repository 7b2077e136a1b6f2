//! M95 protocol implementation
//!
//! This module implements the M95 serial EEPROM command sequences on top
//! of a [`Transport`].
//!
//! Every transaction is framed by [`select`], which deasserts chip-select
//! on every exit path once it has been asserted. Writes follow the device's
//! latch protocol:
//!
//! ```text
//! WREN | WRITE addr data... | WRDI | RDSR* until WIP == 0
//! ```
//!
//! A failure at any step short-circuits the rest of the sequence. If the
//! WRITE header fails the write enable latch is left set; the next WRDI (or
//! the next completed write) clears it.

use core::fmt::Debug;

use super::PollPolicy;
use crate::error::{Error, Result};
use crate::spi::{self, Address, Command, Status, MAX_BURST_SIZE};
use crate::transport::Transport;

/// Map a transport error to [`Error::Transfer`], logging the transport error
fn io<E: Debug>(step: &'static str) -> impl FnOnce(E) -> Error {
    move |e| {
        log::debug!("stm95: {} failed: {:?}", step, e);
        Error::Transfer
    }
}

/// Run `body` with chip-select `cs` asserted
///
/// Chip-select is deasserted whether or not `body` succeeds. If asserting
/// fails, `body` is not run and no deassert is issued.
pub fn select<T, R, F>(transport: &mut T, cs: usize, body: F) -> Result<R>
where
    T: Transport + ?Sized,
    F: FnOnce(&mut T) -> Result<R>,
{
    transport.enable(cs).map_err(io("chip-select assert"))?;
    let result = body(transport);
    let released = transport.disable(cs).map_err(io("chip-select deassert"));
    let value = result?;
    released?;
    Ok(value)
}

/// Send a single-byte command
fn simple<T: Transport + ?Sized>(transport: &mut T, command: Command, cs: usize) -> Result<()> {
    log::trace!("stm95: {:?} (cs {})", command, cs);
    select(transport, cs, |t| {
        t.write(&[command.opcode()]).map_err(io("command"))
    })
}

/// Read `buf.len()` bytes starting at `address`
pub fn read<T: Transport + ?Sized>(
    transport: &mut T,
    address: Address,
    buf: &mut [u8],
    cs: usize,
) -> Result<()> {
    let header = spi::header(Command::Read, address);
    log::trace!("stm95: read {} bytes at {} (cs {})", buf.len(), address, cs);

    select(transport, cs, |t| {
        t.write(&header).map_err(io("read header"))?;
        t.read(buf).map_err(io("read data"))
    })
}

/// Send the Write Enable command
pub fn write_enable<T: Transport + ?Sized>(transport: &mut T, cs: usize) -> Result<()> {
    simple(transport, Command::WriteEnable, cs)
}

/// Send the Write Disable command
pub fn write_disable<T: Transport + ?Sized>(transport: &mut T, cs: usize) -> Result<()> {
    simple(transport, Command::WriteDisable, cs)
}

/// Read the raw status register
pub fn read_register<T: Transport + ?Sized>(transport: &mut T, cs: usize) -> Result<u8> {
    let mut value = [0u8; 1];
    select(transport, cs, |t| {
        t.write(&[Command::ReadStatus.opcode()])
            .map_err(io("status command"))?;
        t.read(&mut value).map_err(io("status read"))
    })?;
    Ok(value[0])
}

/// Read the status register
pub fn read_status<T: Transport + ?Sized>(transport: &mut T, cs: usize) -> Result<Status> {
    read_register(transport, cs).map(Status::from_bits_retain)
}

/// Write the status register
///
/// The device ignores WRSR unless the write enable latch is set; issuing
/// WREN first is left to the caller.
pub fn write_register<T: Transport + ?Sized>(
    transport: &mut T,
    value: u8,
    cs: usize,
) -> Result<()> {
    log::trace!("stm95: write status 0x{:02X} (cs {})", value, cs);
    select(transport, cs, |t| {
        t.write(&[Command::WriteStatus.opcode(), value])
            .map_err(io("status write"))
    })
}

/// Check if a write cycle is in progress
pub fn is_busy<T: Transport + ?Sized>(transport: &mut T, cs: usize) -> Result<bool> {
    Ok(read_status(transport, cs)?.is_busy())
}

/// Wait for the WIP (Write In Progress) bit to clear
///
/// Each poll is a complete RDSR transaction. The loop ends on the first
/// status value with bit 0 clear. With [`PollPolicy::UNBOUNDED`] there is no
/// limit on the number of polls; a bounded policy always allows the first.
pub fn wait_ready<T: Transport + ?Sized>(
    transport: &mut T,
    cs: usize,
    policy: PollPolicy,
) -> Result<()> {
    let mut polls: u32 = 0;

    loop {
        let status = read_status(transport, cs)?;
        polls = polls.saturating_add(1);

        if !status.is_busy() {
            log::trace!("stm95: write complete after {} polls", polls);
            return Ok(());
        }

        if let Some(max) = policy.max_polls {
            if polls >= max {
                log::warn!("stm95: WIP still set after {} polls (cs {})", polls, cs);
                return Err(Error::Timeout);
            }
        }

        if policy.delay_us > 0 {
            transport.delay_us(policy.delay_us);
        }
    }
}

/// Write one burst of data at `address`
///
/// The payload should not exceed [`MAX_BURST_SIZE`]; use [`write_safe`] for
/// longer buffers.
pub fn write<T: Transport + ?Sized>(
    transport: &mut T,
    address: Address,
    data: &[u8],
    cs: usize,
    policy: PollPolicy,
) -> Result<()> {
    if data.len() > MAX_BURST_SIZE {
        log::warn!(
            "stm95: {} byte write exceeds the {} byte burst limit",
            data.len(),
            MAX_BURST_SIZE
        );
    }

    write_enable(transport, cs)?;

    let header = spi::header(Command::Write, address);
    log::trace!("stm95: write {} bytes at {} (cs {})", data.len(), address, cs);

    select(transport, cs, |t| {
        t.write(&header).map_err(io("write header"))?;
        t.write(data).map_err(io("write data"))
    })?;

    write_disable(transport, cs)?;
    wait_ready(transport, cs, policy)
}

/// Write any amount of data, split into bursts
///
/// Bursts of [`MAX_BURST_SIZE`] bytes are written in order, the last one
/// holding the remainder. The first failing burst stops the sequence;
/// bursts already written stay written.
pub fn write_safe<T: Transport + ?Sized>(
    transport: &mut T,
    address: Address,
    data: &[u8],
    cs: usize,
    policy: PollPolicy,
) -> Result<()> {
    for (i, chunk) in data.chunks(MAX_BURST_SIZE).enumerate() {
        let chunk_addr = address.offset(i * MAX_BURST_SIZE);
        write(transport, chunk_addr, chunk, cs, policy)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spi::opcodes;
    use std::collections::VecDeque;
    use std::vec;
    use std::vec::Vec;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Event {
        Enable(usize),
        Disable(usize),
        Write(Vec<u8>),
        Read(usize),
    }

    /// A mock bus that records every transport call
    ///
    /// RDSR reads pop from `statuses` first and fall back to the stored
    /// status register. Everything else reads back as `fill`.
    #[derive(Default)]
    struct MockBus {
        events: Vec<Event>,
        statuses: VecDeque<u8>,
        status_reg: u8,
        stuck_busy: bool,
        last_opcode: Option<u8>,
        fill: u8,
        writes: usize,
        fail_write: Option<usize>,
        fail_enable: bool,
        disables: usize,
        fail_disable: Option<usize>,
        delays: Vec<u32>,
    }

    impl MockBus {
        fn new() -> Self {
            Self::default()
        }

        fn with_statuses(statuses: &[u8]) -> Self {
            Self {
                statuses: statuses.iter().copied().collect(),
                ..Self::default()
            }
        }

        /// Fail the n-th (0-based) call to `write`
        fn failing_write(n: usize) -> Self {
            Self {
                fail_write: Some(n),
                ..Self::default()
            }
        }

        fn count(&self, f: impl Fn(&Event) -> bool) -> usize {
            self.events.iter().filter(|e| f(e)).count()
        }

        fn command_writes(&self, opcode: u8) -> Vec<Vec<u8>> {
            self.events
                .iter()
                .filter_map(|e| match e {
                    Event::Write(bytes) if bytes.first() == Some(&opcode) => Some(bytes.clone()),
                    _ => None,
                })
                .collect()
        }
    }

    impl Transport for MockBus {
        type Error = &'static str;

        fn read(&mut self, buf: &mut [u8]) -> core::result::Result<(), Self::Error> {
            self.events.push(Event::Read(buf.len()));
            if self.last_opcode == Some(opcodes::RDSR) {
                let status = if self.stuck_busy {
                    0x01
                } else {
                    self.statuses.pop_front().unwrap_or(self.status_reg)
                };
                buf.fill(status);
            } else {
                buf.fill(self.fill);
            }
            Ok(())
        }

        fn write(&mut self, data: &[u8]) -> core::result::Result<(), Self::Error> {
            let n = self.writes;
            self.writes += 1;
            self.events.push(Event::Write(data.to_vec()));
            if self.fail_write == Some(n) {
                return Err("injected write failure");
            }
            if self.last_opcode.is_none() {
                self.last_opcode = data.first().copied();
            }
            if data.first() == Some(&opcodes::WRSR) && data.len() == 2 {
                self.status_reg = data[1];
            }
            Ok(())
        }

        fn enable(&mut self, cs: usize) -> core::result::Result<(), Self::Error> {
            self.events.push(Event::Enable(cs));
            if self.fail_enable {
                return Err("injected chip-select failure");
            }
            self.last_opcode = None;
            Ok(())
        }

        fn disable(&mut self, cs: usize) -> core::result::Result<(), Self::Error> {
            let n = self.disables;
            self.disables += 1;
            self.events.push(Event::Disable(cs));
            if self.fail_disable == Some(n) {
                return Err("injected chip-select release failure");
            }
            Ok(())
        }

        fn delay_us(&mut self, us: u32) {
            self.delays.push(us);
        }
    }

    #[test]
    fn test_read_frames_header_and_data() {
        let mut bus = MockBus::new();
        bus.fill = 0x5A;
        let mut buf = [0u8; 4];

        read(&mut bus, Address::new(0x01ABCD), &mut buf, 0).unwrap();

        assert_eq!(buf, [0x5A; 4]);
        assert_eq!(
            bus.events,
            vec![
                Event::Enable(0),
                Event::Write(vec![opcodes::READ, 0x01, 0xAB, 0xCD]),
                Event::Read(4),
                Event::Disable(0),
            ]
        );
    }

    #[test]
    fn test_read_header_failure_skips_data_phase() {
        let mut bus = MockBus::failing_write(0);
        let mut buf = [0u8; 8];

        assert_eq!(
            read(&mut bus, Address::new(0x10), &mut buf, 1),
            Err(Error::Transfer)
        );
        assert_eq!(bus.count(|e| matches!(e, Event::Enable(_))), 1);
        assert_eq!(bus.count(|e| matches!(e, Event::Disable(_))), 1);
        assert_eq!(bus.count(|e| matches!(e, Event::Read(_))), 0);
        assert_eq!(bus.events.last(), Some(&Event::Disable(1)));
    }

    #[test]
    fn test_chip_select_assert_failure() {
        let mut bus = MockBus::new();
        bus.fail_enable = true;
        let mut buf = [0u8; 2];

        assert_eq!(
            read(&mut bus, Address::new(0), &mut buf, 0),
            Err(Error::Transfer)
        );
        assert_eq!(bus.events, vec![Event::Enable(0)]);
    }

    #[test]
    fn test_chip_select_release_failure() {
        let mut bus = MockBus::new();
        bus.fail_disable = Some(0);

        let result = select(&mut bus, 0, |t| t.write(&[0xAA]).map_err(io("body")));

        assert_eq!(result, Err(Error::Transfer));
        assert_eq!(
            bus.events,
            vec![
                Event::Enable(0),
                Event::Write(vec![0xAA]),
                Event::Disable(0),
            ]
        );
    }

    #[test]
    fn test_body_error_wins_over_release_failure() {
        let mut bus = MockBus::new();
        bus.fail_disable = Some(0);

        let result: Result<()> = select(&mut bus, 0, |_| Err(Error::Timeout));

        assert_eq!(result, Err(Error::Timeout));
        assert_eq!(bus.events.last(), Some(&Event::Disable(0)));
    }

    #[test]
    fn test_write_release_failure_stops_sequence() {
        // disable #0 ends WREN, disable #1 ends WRITE
        let mut bus = MockBus::new();
        bus.fail_disable = Some(1);

        assert_eq!(
            write(&mut bus, Address::new(0x40), &[1, 2], 0, PollPolicy::UNBOUNDED),
            Err(Error::Transfer)
        );
        assert_eq!(bus.command_writes(opcodes::WRITE).len(), 1);
        assert!(bus.command_writes(opcodes::WRDI).is_empty());
        assert!(bus.command_writes(opcodes::RDSR).is_empty());
        assert_eq!(bus.events.last(), Some(&Event::Disable(0)));
    }

    #[test]
    fn test_chip_select_index_passed_through() {
        let mut bus = MockBus::new();
        write_enable(&mut bus, 7).unwrap();
        assert_eq!(
            bus.events,
            vec![
                Event::Enable(7),
                Event::Write(vec![opcodes::WREN]),
                Event::Disable(7),
            ]
        );
    }

    #[test]
    fn test_write_sequence() {
        let mut bus = MockBus::new();
        let data = [0xDE, 0xAD];

        write(&mut bus, Address::new(0x000102), &data, 0, PollPolicy::UNBOUNDED).unwrap();

        assert_eq!(
            bus.events,
            vec![
                Event::Enable(0),
                Event::Write(vec![opcodes::WREN]),
                Event::Disable(0),
                Event::Enable(0),
                Event::Write(vec![opcodes::WRITE, 0x00, 0x01, 0x02]),
                Event::Write(vec![0xDE, 0xAD]),
                Event::Disable(0),
                Event::Enable(0),
                Event::Write(vec![opcodes::WRDI]),
                Event::Disable(0),
                Event::Enable(0),
                Event::Write(vec![opcodes::RDSR]),
                Event::Read(1),
                Event::Disable(0),
            ]
        );
    }

    #[test]
    fn test_write_latch_enable_failure_aborts() {
        let mut bus = MockBus::failing_write(0);

        assert_eq!(
            write(&mut bus, Address::new(0), &[1], 0, PollPolicy::UNBOUNDED),
            Err(Error::Transfer)
        );
        assert!(bus.command_writes(opcodes::WRITE).is_empty());
        assert_eq!(bus.count(|e| matches!(e, Event::Enable(_))), 1);
        assert_eq!(bus.count(|e| matches!(e, Event::Disable(_))), 1);
    }

    #[test]
    fn test_write_header_failure_leaves_latch_set() {
        // write #0 is WREN, write #1 is the WRITE header
        let mut bus = MockBus::failing_write(1);

        assert_eq!(
            write(&mut bus, Address::new(0x40), &[1, 2, 3], 0, PollPolicy::UNBOUNDED),
            Err(Error::Transfer)
        );
        assert!(bus.command_writes(opcodes::WRDI).is_empty());
        assert!(bus.command_writes(opcodes::RDSR).is_empty());
        assert_eq!(bus.events.last(), Some(&Event::Disable(0)));
        assert_eq!(
            bus.count(|e| matches!(e, Event::Enable(_))),
            bus.count(|e| matches!(e, Event::Disable(_)))
        );
    }

    #[test]
    fn test_write_payload_failure_deasserts() {
        // write #2 is the payload
        let mut bus = MockBus::failing_write(2);

        assert_eq!(
            write(&mut bus, Address::new(0x40), &[1, 2, 3], 0, PollPolicy::UNBOUNDED),
            Err(Error::Transfer)
        );
        assert_eq!(bus.events.last(), Some(&Event::Disable(0)));
        assert!(bus.command_writes(opcodes::WRDI).is_empty());
    }

    #[test]
    fn test_wait_ready_stops_on_first_clear_status() {
        let mut bus = MockBus::with_statuses(&[0x01, 0x01, 0x00, 0x01]);

        wait_ready(&mut bus, 0, PollPolicy::UNBOUNDED).unwrap();

        assert_eq!(bus.command_writes(opcodes::RDSR).len(), 3);
        assert_eq!(bus.statuses.len(), 1);
    }

    #[test]
    fn test_wait_ready_ignores_other_status_bits() {
        let mut bus = MockBus::with_statuses(&[0x03, 0x8E]);
        wait_ready(&mut bus, 0, PollPolicy::UNBOUNDED).unwrap();
        assert_eq!(bus.command_writes(opcodes::RDSR).len(), 2);
    }

    #[test]
    fn test_wait_ready_bounded_times_out() {
        let mut bus = MockBus::new();
        bus.stuck_busy = true;

        assert_eq!(
            wait_ready(&mut bus, 0, PollPolicy::bounded(5).with_delay_us(100)),
            Err(Error::Timeout)
        );
        assert_eq!(bus.command_writes(opcodes::RDSR).len(), 5);
        assert_eq!(bus.delays, vec![100; 4]);
    }

    #[test]
    fn test_wait_ready_zero_bound_reads_once() {
        let mut bus = MockBus::new();
        bus.stuck_busy = true;
        assert_eq!(
            wait_ready(&mut bus, 0, PollPolicy::bounded(0)),
            Err(Error::Timeout)
        );
        assert_eq!(bus.command_writes(opcodes::RDSR).len(), 1);

        let mut bus = MockBus::new();
        wait_ready(&mut bus, 0, PollPolicy::bounded(0)).unwrap();
        assert_eq!(bus.command_writes(opcodes::RDSR).len(), 1);
    }

    #[test]
    fn test_wait_ready_unbounded_has_no_delay() {
        let mut bus = MockBus::with_statuses(&[0x01, 0x01, 0x01, 0x00]);
        wait_ready(&mut bus, 0, PollPolicy::UNBOUNDED).unwrap();
        assert!(bus.delays.is_empty());
    }

    #[test]
    fn test_write_safe_single_burst() {
        let mut bus = MockBus::new();
        let data = [0xA5u8; MAX_BURST_SIZE];

        write_safe(&mut bus, Address::new(0x100), &data, 0, PollPolicy::UNBOUNDED).unwrap();

        assert_eq!(bus.command_writes(opcodes::WRITE).len(), 1);
        assert_eq!(bus.command_writes(opcodes::WREN).len(), 1);
    }

    #[test]
    fn test_write_safe_splits_at_burst_limit() {
        let mut bus = MockBus::new();
        let data: Vec<u8> = (0..=MAX_BURST_SIZE as u8).collect();

        write_safe(&mut bus, Address::new(0x100), &data, 0, PollPolicy::UNBOUNDED).unwrap();

        let headers = bus.command_writes(opcodes::WRITE);
        assert_eq!(
            headers,
            vec![vec![opcodes::WRITE, 0x00, 0x01, 0x00], vec![opcodes::WRITE, 0x00, 0x01, 0x3E]]
        );

        // Payloads follow their headers
        let payloads: Vec<&Vec<u8>> = bus
            .events
            .windows(2)
            .filter_map(|w| match (&w[0], &w[1]) {
                (Event::Write(h), Event::Write(p)) if h[0] == opcodes::WRITE && h.len() == 4 => {
                    Some(p)
                }
                _ => None,
            })
            .collect();
        assert_eq!(payloads.len(), 2);
        assert_eq!(payloads[0].len(), MAX_BURST_SIZE);
        assert_eq!(payloads[1], &vec![MAX_BURST_SIZE as u8]);
    }

    #[test]
    fn test_write_safe_empty_is_noop() {
        let mut bus = MockBus::new();
        write_safe(&mut bus, Address::new(0), &[], 0, PollPolicy::UNBOUNDED).unwrap();
        assert!(bus.events.is_empty());
    }

    #[test]
    fn test_write_safe_stops_at_first_failed_burst() {
        // Each burst costs 5 writes: WREN, header, payload, WRDI, RDSR.
        // Fail the header of the third burst.
        let mut bus = MockBus::failing_write(11);
        let data = [0u8; MAX_BURST_SIZE * 4];

        assert_eq!(
            write_safe(&mut bus, Address::new(0), &data, 0, PollPolicy::UNBOUNDED),
            Err(Error::Transfer)
        );
        assert_eq!(bus.command_writes(opcodes::WRITE).len(), 3);
        assert_eq!(bus.command_writes(opcodes::WRDI).len(), 2);
    }

    #[test]
    fn test_register_round_trip() {
        let mut bus = MockBus::new();
        bus.status_reg = 0x8C;

        write_register(&mut bus, 0x00, 0).unwrap();
        assert_eq!(read_register(&mut bus, 0).unwrap(), 0x00);
        assert_eq!(
            bus.events[..3],
            [
                Event::Enable(0),
                Event::Write(vec![opcodes::WRSR, 0x00]),
                Event::Disable(0),
            ]
        );
    }

    #[test]
    fn test_is_busy() {
        let mut bus = MockBus::with_statuses(&[0x01, 0x02]);
        assert!(is_busy(&mut bus, 0).unwrap());
        assert!(!is_busy(&mut bus, 0).unwrap());
    }
}
