//! Status register commands

use crate::programmers::EepromTask;
use stm95_core::{Eeprom, Status, Transport};

/// Print the status register and its decoded bits
pub struct StatusCommand {
    pub cs: usize,
}

impl EepromTask for StatusCommand {
    fn run<T: Transport>(self, eeprom: &mut Eeprom<T>) -> Result<(), Box<dyn std::error::Error>> {
        let status = eeprom.read_status(self.cs)?;
        print!("{}", describe(status));
        Ok(())
    }
}

/// Set the write enable latch, write the status register and wait for the
/// write cycle to finish
pub struct WriteStatusCommand {
    pub value: u8,
    pub cs: usize,
}

impl EepromTask for WriteStatusCommand {
    fn run<T: Transport>(self, eeprom: &mut Eeprom<T>) -> Result<(), Box<dyn std::error::Error>> {
        let ignored = Status::from_bits_retain(self.value) - Status::WRITABLE;
        if !ignored.is_empty() {
            log::warn!(
                "Bits 0x{:02X} are read-only and will not change",
                ignored.bits()
            );
        }

        eeprom.write_latch_enable(self.cs)?;
        eeprom.write_register(self.value, self.cs)?;
        eeprom.wait_write_complete(self.cs)?;

        let status = eeprom.read_status(self.cs)?;
        println!("Status register written");
        print!("{}", describe(status));
        Ok(())
    }
}

fn flag(status: Status, bit: Status) -> u8 {
    u8::from(status.contains(bit))
}

/// Render the register the way `status` prints it
fn describe(status: Status) -> String {
    let mut out = String::new();
    out.push_str(&format!("Status register: 0x{:02X}\n", status.bits()));
    out.push_str(&format!(
        "  SRWD={} BP1={} BP0={} WEL={} WIP={}\n",
        flag(status, Status::SRWD),
        flag(status, Status::BP1),
        flag(status, Status::BP0),
        flag(status, Status::WEL),
        flag(status, Status::WIP)
    ));
    let protection = match (status.contains(Status::BP1), status.contains(Status::BP0)) {
        (false, false) => "none",
        (false, true) => "upper quarter",
        (true, false) => "upper half",
        (true, true) => "whole array",
    };
    out.push_str(&format!("  Write protection: {}\n", protection));
    if status.is_busy() {
        out.push_str("  Write in progress\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe() {
        let text = describe(Status::from_bits_retain(0x8E));
        assert!(text.contains("0x8E"));
        assert!(text.contains("SRWD=1 BP1=1 BP0=1 WEL=1 WIP=0"));
        assert!(text.contains("whole array"));
        assert!(!text.contains("in progress"));

        let text = describe(Status::WIP);
        assert!(text.contains("Write in progress"));
        assert!(text.contains("Write protection: none"));
    }

    #[cfg(feature = "dummy")]
    #[test]
    fn test_write_status_sets_protection() {
        use stm95_dummy::DummyEeprom;

        let mut device = DummyEeprom::new_default();
        {
            let mut eeprom = Eeprom::new(&mut device);
            WriteStatusCommand { value: 0x0C, cs: 0 }
                .run(&mut eeprom)
                .unwrap();
        }
        assert_eq!(device.status().bits(), 0x0C);
        assert_eq!(device.write_cycles(), 1);
    }
}
