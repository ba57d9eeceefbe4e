//! Program addressing and the patch entity.

use std::fmt;

use lazy_static::lazy_static;
use log::debug;
use regex::Regex;

use crate::error::{Error, Result};
use crate::message::{is_edit_buffer_dump, program_dump_slot};
use crate::nibble;
use crate::{NUMBER_OF_BANKS, PATCHES_PER_BANK, PATCH_SIZE, TOTAL_PATCHES};

/// Number of name characters at the start of the patch data.
pub const NAME_LENGTH: usize = 8;

/// Substitution character produced by ASCII conversion for unmappable input.
pub const SUBSTITUTION_MARKER: u8 = 0x1a;

lazy_static! {
    static ref DEFAULT_NAME: Regex = Regex::new(r"(?i)BNK[0-9]: [0-9][0-9]").unwrap();
}

/// One of the ten banks, zero-based.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct BankNumber(u8);

impl BankNumber {
    pub fn new(bank: usize) -> Result<Self> {
        if bank < NUMBER_OF_BANKS {
            Ok(BankNumber(bank as u8))
        } else {
            Err(Error::OutOfRange { what: "bank", value: bank, limit: NUMBER_OF_BANKS })
        }
    }

    pub fn value(&self) -> u8 {
        self.0
    }

    /// Range of programs in this bank, e.g. "100 - 199".
    pub fn friendly_name(&self) -> String {
        let first = self.0 as usize * PATCHES_PER_BANK;
        format!("{:03} - {:03}", first, first + PATCHES_PER_BANK - 1)
    }
}

impl fmt::Display for BankNumber {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.friendly_name())
    }
}

/// Zero-based program number, 000 to 999.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct ProgramNumber(u16);

impl ProgramNumber {
    pub fn new(number: usize) -> Result<Self> {
        if number < TOTAL_PATCHES {
            Ok(ProgramNumber(number as u16))
        } else {
            Err(Error::OutOfRange { what: "program number", value: number, limit: TOTAL_PATCHES })
        }
    }

    pub fn from_bank_and_slot(bank: BankNumber, slot: usize) -> Result<Self> {
        if slot >= PATCHES_PER_BANK {
            return Err(Error::OutOfRange { what: "slot", value: slot, limit: PATCHES_PER_BANK });
        }
        ProgramNumber::new(bank.0 as usize * PATCHES_PER_BANK + slot)
    }

    pub fn value(&self) -> usize {
        self.0 as usize
    }

    pub fn bank(&self) -> BankNumber {
        BankNumber((self.value() / PATCHES_PER_BANK) as u8)
    }

    pub fn slot(&self) -> u8 {
        (self.value() % PATCHES_PER_BANK) as u8
    }

    pub fn to_bank_and_slot(&self) -> (BankNumber, u8) {
        (self.bank(), self.slot())
    }
}

impl fmt::Display for ProgramNumber {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:03}", self.0)
    }
}

/// Converts text to 7-bit ASCII, replacing every character without an
/// ASCII equivalent by [`SUBSTITUTION_MARKER`].
pub fn to_ascii_with_marker(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| if c.is_ascii() { c as u8 } else { SUBSTITUTION_MARKER })
        .collect()
}

/// Reads the patch name from the first eight data bytes.
///
/// Some old factory banks store letters as their 1-based position in the
/// alphabet; those are mapped back to 'A'...
pub fn decode_name(data: &[u8]) -> String {
    data.iter()
        .take(NAME_LENGTH)
        .map(|&b| if b < 0x20 { (b + b'A' - 1) as char } else { b as char })
        .collect()
}

/// Produces the eight name bytes for ASCII input. The device only keeps
/// six bits per character, so lowercase is folded into the uppercase range.
pub fn encode_name(ascii: &[u8]) -> [u8; NAME_LENGTH] {
    let mut result = [b' '; NAME_LENGTH];
    for (target, &b) in result.iter_mut().zip(ascii) {
        *target = match b {
            SUBSTITUTION_MARKER => b'@',
            b if b > 0x5f => b - 0x20,
            b if b < 0x20 => b'_',
            b => b,
        };
    }
    result
}

/// True for the placeholder names of factory-blank programs, like "BNK3: 17".
pub fn is_default_name(name: &str) -> bool {
    DEFAULT_NAME.is_match(name)
}

/// A single Matrix 1000 voice.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Patch {
    data: Vec<u8>,
    number: Option<ProgramNumber>,
}

impl Patch {
    /// Wraps unpacked patch data, which must be exactly [`PATCH_SIZE`] bytes.
    pub fn new(data: Vec<u8>) -> Result<Self> {
        if data.len() != PATCH_SIZE {
            return Err(Error::MalformedLength { len: data.len(), reason: "patch data must be 134 bytes" });
        }
        Ok(Patch { data, number: None })
    }

    /// Decodes an edit buffer dump payload (framing already stripped).
    pub fn from_edit_buffer(payload: &[u8]) -> Result<Self> {
        if !is_edit_buffer_dump(payload) {
            return Err(Error::UnrecognizedMessage);
        }
        Patch::new(nibble::unpack(&payload[4..])?)
    }

    /// Decodes a single program dump. The message only carries the slot, so
    /// the bank the program was requested from must be supplied.
    pub fn from_program_dump(payload: &[u8], bank: BankNumber) -> Result<Self> {
        let slot = program_dump_slot(payload).ok_or(Error::UnrecognizedMessage)?;
        let mut patch = Patch::new(nibble::unpack(&payload[4..])?)?;
        patch.number = Some(ProgramNumber::from_bank_and_slot(bank, slot as usize)?);
        debug!("decoded program {} '{}'", patch.number.map_or(0, |n| n.value()), patch.name());
        Ok(patch)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn name(&self) -> String {
        decode_name(&self.data)
    }

    /// Sets the name from arbitrary text; characters without an ASCII
    /// equivalent show up as '@'.
    pub fn set_name(&mut self, name: &str) {
        let encoded = encode_name(&to_ascii_with_marker(name));
        self.data[..NAME_LENGTH].copy_from_slice(&encoded);
    }

    pub fn is_default_name(&self) -> bool {
        is_default_name(&self.name())
    }

    pub fn program_number(&self) -> Option<ProgramNumber> {
        self.number
    }

    pub fn set_program_number(&mut self, number: ProgramNumber) {
        self.number = Some(number);
    }

    /// Patch data with the name blanked out. The device clears the name
    /// when a patch is sent to it, so only this part identifies the sound.
    pub fn voice_relevant_data(&self) -> Vec<u8> {
        let mut result = self.data.clone();
        result[..NAME_LENGTH].fill(0);
        result
    }

    /// Digest of the voice-relevant data, for duplicate detection.
    pub fn fingerprint(&self) -> String {
        format!("{:x}", md5::compute(self.voice_relevant_data()))
    }
}
