//! M95 serial EEPROM opcodes
//!
//! The instruction set shared by the ST M95xxx family. Identification-page
//! and lock instructions are not part of this set.

/// Write Enable - sets the write enable latch
pub const WREN: u8 = 0x06;
/// Write Disable - resets the write enable latch
pub const WRDI: u8 = 0x04;
/// Read Status Register
pub const RDSR: u8 = 0x05;
/// Write Status Register
pub const WRSR: u8 = 0x01;
/// Read from memory array (3-byte address)
pub const READ: u8 = 0x03;
/// Write to memory array (3-byte address)
pub const WRITE: u8 = 0x02;

/// Closed set of commands issued by the protocol engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Command {
    /// Set the write enable latch
    WriteEnable = WREN,
    /// Reset the write enable latch
    WriteDisable = WRDI,
    /// Read the status register
    ReadStatus = RDSR,
    /// Write the status register
    WriteStatus = WRSR,
    /// Read from the memory array
    Read = READ,
    /// Write to the memory array
    Write = WRITE,
}

impl Command {
    /// Get the opcode byte sent on the wire
    pub const fn opcode(self) -> u8 {
        self as u8
    }

    /// Whether the command is followed by a 24-bit address
    pub const fn has_address(self) -> bool {
        matches!(self, Self::Read | Self::Write)
    }

    /// Decode an opcode byte
    pub const fn from_opcode(opcode: u8) -> Option<Self> {
        match opcode {
            WREN => Some(Self::WriteEnable),
            WRDI => Some(Self::WriteDisable),
            RDSR => Some(Self::ReadStatus),
            WRSR => Some(Self::WriteStatus),
            READ => Some(Self::Read),
            WRITE => Some(Self::Write),
            _ => None,
        }
    }
}

impl From<Command> for u8 {
    fn from(cmd: Command) -> u8 {
        cmd.opcode()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcode_values() {
        assert_eq!(Command::WriteEnable.opcode(), 0b0000_0110);
        assert_eq!(Command::WriteDisable.opcode(), 0b0000_0100);
        assert_eq!(Command::ReadStatus.opcode(), 0b0000_0101);
        assert_eq!(Command::WriteStatus.opcode(), 0b0000_0001);
        assert_eq!(Command::Read.opcode(), 0b0000_0011);
        assert_eq!(Command::Write.opcode(), 0b0000_0010);
    }

    #[test]
    fn test_from_opcode() {
        assert_eq!(Command::from_opcode(0x03), Some(Command::Read));
        assert_eq!(Command::from_opcode(0x06), Some(Command::WriteEnable));
        // RDID is not part of the engine's command set
        assert_eq!(Command::from_opcode(0x83), None);
    }

    #[test]
    fn test_has_address() {
        assert!(Command::Read.has_address());
        assert!(Command::Write.has_address());
        assert!(!Command::ReadStatus.has_address());
        assert!(!Command::WriteEnable.has_address());
    }
}
