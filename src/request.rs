//! Outgoing requests and commands.
//!
//! Every constructor checks its numeric arguments and fails before
//! producing a message with out-of-range data.

use log::debug;

use crate::error::{Error, Result};
use crate::nibble;
use crate::patch::{BankNumber, Patch, ProgramNumber};
use crate::{
    SysEx, BANK_UNLOCK, NON_REAL_TIME, PATCHES_PER_BANK, REQUEST_DATA, SET_BANK,
    SINGLE_PATCH_DATA, SINGLE_PATCH_TO_EDIT_BUFFER, STORE_EDIT_BUFFER,
};

const MIDI_CHANNELS: usize = 16;

/// What a Request Data (04H) message asks for.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum RequestKind {
    /// All patches of the current bank, plus the master parameters.
    BankAndMaster,
    /// One patch of the current bank.
    SinglePatch(u8),
    Master,
    EditBuffer,
}

impl RequestKind {
    fn code(&self) -> u8 {
        match self {
            RequestKind::BankAndMaster => 0x00,
            RequestKind::SinglePatch(_) => 0x01,
            RequestKind::Master => 0x03,
            RequestKind::EditBuffer => 0x04,
        }
    }
}

/// F0H 10H 06H 04H <type> <number> F7H
pub fn request_data(kind: RequestKind) -> Result<SysEx> {
    let number = match kind {
        RequestKind::SinglePatch(slot) if slot as usize >= PATCHES_PER_BANK => {
            return Err(Error::OutOfRange { what: "slot", value: slot as usize, limit: PATCHES_PER_BANK });
        }
        RequestKind::SinglePatch(slot) => slot,
        _ => 0,
    };
    Ok(SysEx::matrix(&[REQUEST_DATA, kind.code(), number]))
}

pub fn bank_select(bank: usize) -> Result<SysEx> {
    let bank = BankNumber::new(bank)?;
    Ok(SysEx::matrix(&[SET_BANK, bank.value()]))
}

pub fn bank_unlock() -> SysEx {
    SysEx::matrix(&[BANK_UNLOCK])
}

/// Stores the edit buffer into a program slot, with group mode off.
pub fn store_edit_buffer(program: usize) -> Result<SysEx> {
    let (bank, slot) = ProgramNumber::new(program)?.to_bank_and_slot();
    Ok(SysEx::matrix(&[STORE_EDIT_BUFFER, slot, bank.value(), 0x00]))
}

/// Universal identity request addressed to one channel.
pub fn device_inquiry(channel: usize) -> Result<SysEx> {
    if channel >= MIDI_CHANNELS {
        return Err(Error::OutOfRange { what: "channel", value: channel, limit: MIDI_CHANNELS });
    }
    Ok(SysEx::new(vec![NON_REAL_TIME, channel as u8, 0x06, 0x01]))
}

pub fn request_edit_buffer() -> Result<SysEx> {
    request_data(RequestKind::EditBuffer)
}

pub fn request_master_settings() -> Result<SysEx> {
    request_data(RequestKind::Master)
}

/// Selects and unlocks the bank, then asks for the program.
pub fn request_program(program: usize) -> Result<Vec<SysEx>> {
    let (bank, slot) = ProgramNumber::new(program)?.to_bank_and_slot();
    debug!("requesting program {:03} (bank {}, slot {})", program, bank.value(), slot);
    Ok(vec![
        bank_select(bank.value() as usize)?,
        bank_unlock(),
        request_data(RequestKind::SinglePatch(slot))?,
    ])
}

/// The device answers with one program dump per slot of the bank.
pub fn request_bank(bank: usize) -> Result<Vec<SysEx>> {
    Ok(vec![bank_select(bank)?, request_data(RequestKind::BankAndMaster)?])
}

/// Sends a patch into the edit buffer without storing it.
pub fn edit_buffer_upload(patch: &Patch) -> SysEx {
    let mut body = vec![SINGLE_PATCH_TO_EDIT_BUFFER, 0x00];
    body.extend(nibble::pack(patch.data()));
    SysEx::matrix(&body)
}

/// Program dump for the slot of `program` in the current bank.
pub fn program_dump(patch: &Patch, program: ProgramNumber) -> SysEx {
    let mut body = vec![SINGLE_PATCH_DATA, program.slot()];
    body.extend(nibble::pack(patch.data()));
    SysEx::matrix(&body)
}
