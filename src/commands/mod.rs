//! CLI command implementations
//!
//! Each command that talks to a device is an [`EepromTask`] so it can run
//! against whichever transport the programmer string selects.
//!
//! [`EepromTask`]: crate::programmers::EepromTask

mod list;
mod read;
mod status;
mod write;

pub use list::list_programmers;
pub use read::ReadCommand;
pub use status::{StatusCommand, WriteStatusCommand};
pub use write::WriteCommand;

use indicatif::{ProgressBar, ProgressStyle};

/// Create a byte progress bar labelled with `phase`
fn progress_bar(total: u64, phase: &str) -> ProgressBar {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(&format!(
                "{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{bytes}}/{{total_bytes}} ({{bytes_per_sec}}, {{eta}}) {}",
                phase
            ))
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    pb
}
