//! Write command implementation

use super::read::read_with_progress;
use crate::programmers::EepromTask;
use stm95_core::{Eeprom, Transport, MAX_BURST_SIZE};
use std::path::PathBuf;

/// Bytes handed to `write_safe` per progress update
///
/// A multiple of the burst size, so the bursts on the wire are the same as
/// for one `write_safe` over the whole buffer.
const WRITE_CHUNK_SIZE: usize = MAX_BURST_SIZE * 16;

/// Write a file to the EEPROM and optionally read it back
pub struct WriteCommand {
    pub input: PathBuf,
    pub address: u32,
    pub verify: bool,
    pub cs: usize,
}

impl EepromTask for WriteCommand {
    fn run<T: Transport>(self, eeprom: &mut Eeprom<T>) -> Result<(), Box<dyn std::error::Error>> {
        let data = std::fs::read(&self.input)?;
        println!("Read {} bytes from {:?}", data.len(), self.input);

        if data.is_empty() {
            println!("Nothing to write");
            return Ok(());
        }

        write_with_progress(eeprom, self.address, &data, self.cs)?;

        if self.verify {
            verify(eeprom, self.address, &data, self.cs)?;
            println!("Verification passed!");
        }

        Ok(())
    }
}

/// Write `data` at `address` in burst-sized transactions with a progress bar
pub fn write_with_progress<T: Transport>(
    eeprom: &mut Eeprom<T>,
    address: u32,
    data: &[u8],
    cs: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let pb = super::progress_bar(data.len() as u64, "Writing");

    let mut offset = 0usize;
    for chunk in data.chunks(WRITE_CHUNK_SIZE) {
        eeprom
            .write_safe(address.wrapping_add(offset as u32), chunk, cs)
            .map_err(|e| format!("Write failed at offset 0x{:06X}: {}", offset, e))?;
        offset += chunk.len();
        pb.set_position(offset as u64);
    }

    pb.finish_with_message("Write complete");
    Ok(())
}

/// Read back `expected.len()` bytes at `address` and compare
pub fn verify<T: Transport>(
    eeprom: &mut Eeprom<T>,
    address: u32,
    expected: &[u8],
    cs: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let actual = read_with_progress(eeprom, address, expected.len(), cs, "Verifying")?;

    if let Some(pos) = actual.iter().zip(expected).position(|(a, e)| a != e) {
        return Err(format!(
            "Verification failed at address 0x{:06X}: expected 0x{:02X}, got 0x{:02X}",
            address.wrapping_add(pos as u32),
            expected[pos],
            actual[pos]
        )
        .into());
    }

    Ok(())
}
