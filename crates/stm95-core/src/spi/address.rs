//! 24-bit memory array address

use core::fmt;

/// Mask of the bits the device decodes
pub const ADDRESS_MASK: u32 = 0x00FF_FFFF;

/// Memory array address
///
/// The device decodes 24 address bits; the top byte of a `u32` is dropped
/// on construction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(u32);

impl Address {
    /// Create an address from a raw value, ignoring bits 24..32
    pub const fn new(raw: u32) -> Self {
        Self(raw & ADDRESS_MASK)
    }

    /// Raw 24-bit value
    pub const fn value(self) -> u32 {
        self.0
    }

    /// Big-endian encoding as sent after the opcode
    pub const fn to_be_bytes(self) -> [u8; 3] {
        [(self.0 >> 16) as u8, (self.0 >> 8) as u8, self.0 as u8]
    }

    /// Decode a big-endian 3-byte address
    pub const fn from_be_bytes(bytes: [u8; 3]) -> Self {
        Self(((bytes[0] as u32) << 16) | ((bytes[1] as u32) << 8) | bytes[2] as u32)
    }

    /// Address `offset` bytes further on, wrapping inside the 24-bit space
    pub const fn offset(self, offset: usize) -> Self {
        Self::new(self.0.wrapping_add(offset as u32))
    }
}

impl From<u32> for Address {
    fn from(raw: u32) -> Self {
        Self::new(raw)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:06X}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode() {
        assert_eq!(Address::new(0x01ABCD).to_be_bytes(), [0x01, 0xAB, 0xCD]);
        assert_eq!(Address::new(0).to_be_bytes(), [0, 0, 0]);
    }

    #[test]
    fn test_top_byte_ignored() {
        assert_eq!(Address::new(0xAB01_0203), Address::new(0x01_0203));
        assert_eq!(Address::new(0xFFFF_FFFF).value(), 0x00FF_FFFF);
    }

    #[test]
    fn test_offset_wraps() {
        assert_eq!(Address::new(0x10).offset(62).value(), 0x4E);
        assert_eq!(Address::new(0xFF_FFFF).offset(1).value(), 0);
    }

    #[test]
    fn test_decode() {
        assert_eq!(Address::from_be_bytes([0x12, 0x34, 0x56]).value(), 0x123456);
    }
}
