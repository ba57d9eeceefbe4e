use thiserror::Error;

/// Errors reported by the codec, classifier and request builders.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("checksum mismatch: message says {expected:#04x}, data sums to {actual:#04x}")]
    ChecksumMismatch { expected: u8, actual: u8 },

    #[error("malformed length: {len} bytes ({reason})")]
    MalformedLength { len: usize, reason: &'static str },

    #[error("data byte {index} is {value:#04x}, not a nybble")]
    InvalidNybble { index: usize, value: u8 },

    #[error("not a recognized Matrix 1000 message")]
    UnrecognizedMessage,

    #[error("{what} {value} is out of range (must be below {limit})")]
    OutOfRange { what: &'static str, value: usize, limit: usize },

    #[error("incomplete bank dump: received {received} of {expected} programs")]
    IncompleteBankDump { received: usize, expected: usize },

    #[error("{setting}: raw value {value} has no matching choice")]
    UnmappedChoice { setting: &'static str, value: i32 },

    #[error("{setting}: {value} is outside {min}..={max}")]
    SettingOutOfRange { setting: &'static str, value: i32, min: i32, max: i32 },

    #[error("missing System Exclusive framing")]
    NotSysEx,
}

pub type Result<T> = std::result::Result<T, Error>;
