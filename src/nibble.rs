//! Nybble packing used by the Matrix 1000 for all bulk data.
//!
//! Every data byte travels as two MIDI data bytes, low nybble first,
//! and the stream is closed by a checksum: the sum of the unpacked bytes
//! masked to seven bits.

use bit::BitIndex;
use log::{debug, warn};

use crate::error::{Error, Result};

fn low_nybble(b: u8) -> u8 {
    b.bit_range(0..4)
}

fn high_nybble(b: u8) -> u8 {
    b.bit_range(4..8)
}

fn byte_from_nybbles(low: u8, high: u8) -> u8 {
    low | high << 4
}

/// Computes the seven-bit checksum the device expects after a data block.
pub fn checksum(data: &[u8]) -> u8 {
    let sum = data.iter().fold(0u32, |acc, &b| acc + b as u32);
    (sum & 0x7f) as u8
}

/// Splits every byte into two nybbles (low first) and appends the checksum.
pub fn pack(data: &[u8]) -> Vec<u8> {
    let mut result = Vec::with_capacity(data.len() * 2 + 1);
    for &b in data {
        result.push(low_nybble(b));
        result.push(high_nybble(b));
    }
    result.push(checksum(data));
    result
}

/// Reassembles bytes from a nybble stream and verifies the trailing checksum.
///
/// The wire data must consist of an even number of nybbles plus exactly one
/// checksum byte. On a checksum mismatch nothing is returned.
pub fn unpack(wire: &[u8]) -> Result<Vec<u8>> {
    let (&expected, nybbles) = wire.split_last().ok_or(Error::MalformedLength {
        len: 0,
        reason: "empty data block",
    })?;
    if nybbles.len() % 2 != 0 {
        return Err(Error::MalformedLength {
            len: wire.len(),
            reason: "nybble data plus checksum must have odd length",
        });
    }

    if let Some(index) = nybbles.iter().position(|&b| b > 0x0f) {
        warn!("discarding data block: byte {} is {:#04x}, not a nybble", index, nybbles[index]);
        return Err(Error::InvalidNybble { index, value: nybbles[index] });
    }

    let result: Vec<u8> = nybbles
        .chunks_exact(2)
        .map(|pair| byte_from_nybbles(pair[0], pair[1]))
        .collect();
    debug!("unpacked {} bytes from {} wire bytes", result.len(), wire.len());

    let actual = checksum(&result);
    if actual != expected {
        warn!("discarding data block: checksum {:#04x} != {:#04x}", actual, expected);
        return Err(Error::ChecksumMismatch { expected, actual });
    }
    Ok(result)
}
