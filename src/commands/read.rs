//! Read command implementation

use crate::programmers::EepromTask;
use stm95_core::{Eeprom, Transport};
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

/// Chunk size for reading
///
/// Small enough that header and data fit one default spidev transfer.
pub(crate) const READ_CHUNK_SIZE: usize = 2048;

/// Read a range of the EEPROM into a file
pub struct ReadCommand {
    pub output: PathBuf,
    pub address: u32,
    pub length: u32,
    pub cs: usize,
}

impl EepromTask for ReadCommand {
    fn run<T: Transport>(self, eeprom: &mut Eeprom<T>) -> Result<(), Box<dyn std::error::Error>> {
        let length = self.length as usize;
        let data = read_with_progress(eeprom, self.address, length, self.cs, "Reading")?;

        let mut file = File::create(&self.output)?;
        file.write_all(&data)?;

        println!("Wrote {} bytes to {:?}", data.len(), self.output);

        Ok(())
    }
}

/// Read `length` bytes starting at `address` with a progress bar
pub fn read_with_progress<T: Transport>(
    eeprom: &mut Eeprom<T>,
    address: u32,
    length: usize,
    cs: usize,
    phase: &str,
) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let mut data = vec![0u8; length];

    let pb = super::progress_bar(length as u64, phase);

    let mut offset = 0usize;
    for chunk in data.chunks_mut(READ_CHUNK_SIZE) {
        eeprom.read(address.wrapping_add(offset as u32), chunk, cs)?;
        offset += chunk.len();
        pb.set_position(offset as u64);
    }

    pb.finish_with_message("Read complete");
    Ok(data)
}
