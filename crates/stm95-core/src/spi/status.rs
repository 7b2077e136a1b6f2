//! Status register layout

use bitflags::bitflags;

bitflags! {
    /// M95 status register
    ///
    /// Only [`Status::WIP`] drives engine behaviour; the other bits are
    /// named so tools can display them.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Status: u8 {
        /// Write In Progress - the device is committing a write cycle
        const WIP  = 1 << 0;
        /// Write Enable Latch
        const WEL  = 1 << 1;
        /// Block Protect bit 0
        const BP0  = 1 << 2;
        /// Block Protect bit 1
        const BP1  = 1 << 3;
        /// Status Register Write Disable
        const SRWD = 1 << 7;

        /// Bits the host may change through WRSR
        const WRITABLE = Self::BP0.bits() | Self::BP1.bits() | Self::SRWD.bits();
    }
}

impl Status {
    /// Returns true while a write cycle is in progress
    pub fn is_busy(&self) -> bool {
        self.contains(Self::WIP)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_busy_is_bit_zero_only() {
        assert!(Status::from_bits_retain(0x01).is_busy());
        assert!(Status::from_bits_retain(0xFF).is_busy());
        assert!(!Status::from_bits_retain(0xFE).is_busy());
        assert!(!Status::from_bits_retain(0x00).is_busy());
    }
}
