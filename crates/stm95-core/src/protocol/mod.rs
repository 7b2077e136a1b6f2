//! Protocol implementations
//!
//! This module contains the M95 command sequences and the busy-poll policy
//! that bounds how long a write may wait for completion.

pub mod m95;

pub use m95::*;

/// How the engine waits for the write-in-progress bit to clear
///
/// The default is an unbounded spin with no delay between status reads. A
/// device that never clears WIP will then block the caller forever; set
/// `max_polls` to turn that into [`crate::Error::Timeout`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollPolicy {
    /// Maximum number of status reads, `None` for no limit
    ///
    /// The status is always read at least once, so `Some(0)` acts as
    /// `Some(1)`.
    pub max_polls: Option<u32>,
    /// Delay between status reads in microseconds
    pub delay_us: u32,
}

impl PollPolicy {
    /// Spin on the status register until WIP clears
    pub const UNBOUNDED: Self = Self {
        max_polls: None,
        delay_us: 0,
    };

    /// Give up after `max_polls` status reads (at least one)
    pub const fn bounded(max_polls: u32) -> Self {
        Self {
            max_polls: Some(max_polls),
            delay_us: 0,
        }
    }

    /// Set the delay between status reads
    pub const fn with_delay_us(mut self, delay_us: u32) -> Self {
        self.delay_us = delay_us;
        self
    }
}
