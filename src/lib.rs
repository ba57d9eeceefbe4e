//! # matrix1000
//!
//! `matrix1000` speaks the System Exclusive dialect of the Oberheim Matrix 1000:
//! nybble-packed patch and master parameter dumps, data requests, bank
//! handling and device detection.

use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

use log::{debug, warn};

pub mod bank;
pub mod error;
pub mod message;
pub mod nibble;
pub mod patch;
pub mod request;
pub mod settings;

pub use bank::{BankDumpAssembler, BankDumpConfig, BankDumpState};
pub use error::{Error, Result};
pub use message::{classify, MessageKind};
pub use patch::{BankNumber, Patch, ProgramNumber};
pub use settings::{GlobalSettings, SettingId, SettingValue};

/// System Exclusive message initiator.
pub const INITIATOR: u8 = 0xf0;

/// System Exclusive message terminator.
pub const TERMINATOR: u8 = 0xf7;

/// Universal non-real-time SysEx message indicator.
pub const NON_REAL_TIME: u8 = 0x7e;

/// Oberheim manufacturer ID.
pub const MANUFACTURER_ID: u8 = 0x10;

/// Device family shared by the Matrix 6 and the Matrix 1000.
pub const DEVICE_FAMILY_ID: u8 = 0x06;

pub const SINGLE_PATCH_DATA: u8 = 0x01;
pub const MASTER_PARAMETER_DATA: u8 = 0x03;
pub const REQUEST_DATA: u8 = 0x04;
pub const SET_BANK: u8 = 0x0a;
pub const PARAMETER_EDIT: u8 = 0x0b;
pub const BANK_UNLOCK: u8 = 0x0c;
pub const SINGLE_PATCH_TO_EDIT_BUFFER: u8 = 0x0d;
pub const STORE_EDIT_BUFFER: u8 = 0x0e;

pub const NUMBER_OF_BANKS: usize = 10;
pub const PATCHES_PER_BANK: usize = 100;
pub const TOTAL_PATCHES: usize = NUMBER_OF_BANKS * PATCHES_PER_BANK;

/// Unpacked size of one patch.
pub const PATCH_SIZE: usize = 134;

/// Unpacked size of the master parameter block.
pub const SETTINGS_SIZE: usize = 172;

/// The Matrix 1000 is slow to answer a device inquiry. Wait at least this long
/// before evaluating the answer or sending the next inquiry.
pub const DEVICE_DETECT_SLEEP: Duration = Duration::from_millis(200);

/// Returns the number of System Exclusive messages in this buffer,
/// based on the count of terminator bytes.
pub fn message_count(data: &[u8]) -> usize {
    data.iter().filter(|&n| *n == TERMINATOR).count()
}

/// Splits the buffer by the terminator byte, including it.
pub fn split_messages(data: &[u8]) -> Vec<Vec<u8>> {
    data.split_inclusive(|&n| n == TERMINATOR)
        .map(|part| part.to_vec())
        .collect()
}

/// Returns the payload between the initiator and the terminator.
pub fn strip_framing(data: &[u8]) -> Result<&[u8]> {
    match data {
        [INITIATOR, payload @ .., TERMINATOR] => Ok(payload),
        _ => Err(Error::NotSysEx),
    }
}

/// Reads a whole file, logging instead of failing if it cannot be read.
pub fn read_file(name: impl AsRef<Path>) -> Option<Vec<u8>> {
    let path = name.as_ref();
    match fs::read(path) {
        Ok(data) => {
            debug!("read {} bytes from {}", data.len(), path.display());
            Some(data)
        }
        Err(e) => {
            warn!("unable to read {}: {}", path.display(), e);
            None
        }
    }
}

/// An outgoing System Exclusive message. Holds the payload only;
/// the framing is added by [`SysEx::to_bytes`].
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct SysEx {
    payload: Vec<u8>,
}

impl SysEx {
    pub fn new(payload: Vec<u8>) -> Self {
        SysEx { payload }
    }

    /// Starts a message with the Oberheim Matrix header.
    pub(crate) fn matrix(body: &[u8]) -> Self {
        let mut payload = vec![MANUFACTURER_ID, DEVICE_FAMILY_ID];
        payload.extend_from_slice(body);
        SysEx { payload }
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Converts the message into bytes for MIDI messaging.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut result = Vec::with_capacity(self.payload.len() + 2);
        result.push(INITIATOR);
        result.extend(&self.payload);
        result.push(TERMINATOR);
        result
    }
}

impl fmt::Display for SysEx {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "F0 {} F7", format_hex(&self.payload))
    }
}

/// Formats bytes as space separated uppercase hex.
pub fn format_hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| hex::encode_upper([*b]))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_count() {
        let data = vec![0xF0, 0x10, 0x06, 0xF7, 0xF0, 0x7E, 0x00, 0x06, 0x01, 0xF7];
        assert_eq!(message_count(&data), 2);
    }

    #[test]
    fn test_split_messages() {
        let data = vec![0xF0, 0x10, 0x06, 0xF7, 0xF0, 0x7E, 0x00, 0x06, 0x01, 0xF7];
        let parts = split_messages(&data);
        assert_eq!(parts, vec![
            vec![0xF0, 0x10, 0x06, 0xF7],
            vec![0xF0, 0x7E, 0x00, 0x06, 0x01, 0xF7],
        ]);
    }

    #[test]
    fn test_strip_framing() {
        assert_eq!(strip_framing(&[0xF0, 0x10, 0x06, 0xF7]), Ok(&[0x10, 0x06][..]));
        assert_eq!(strip_framing(&[0xF0, 0xF7]), Ok(&[][..]));
        assert_eq!(strip_framing(&[0x10, 0x06, 0xF7]), Err(Error::NotSysEx));
        assert_eq!(strip_framing(&[0xF0, 0x10, 0x06]), Err(Error::NotSysEx));
        assert_eq!(strip_framing(&[0xF0]), Err(Error::NotSysEx));
    }

    #[test]
    fn test_sysex_to_bytes() {
        let message = SysEx::matrix(&[BANK_UNLOCK]);
        assert_eq!(message.to_bytes(), vec![0xF0, 0x10, 0x06, 0x0C, 0xF7]);
    }

    #[test]
    fn test_sysex_display() {
        let message = SysEx::matrix(&[SET_BANK, 0x03]);
        assert_eq!(message.to_string(), "F0 10 06 0A 03 F7");
    }

    #[test]
    fn test_bank_layout() {
        assert_eq!(TOTAL_PATCHES, 1000);
    }
}
