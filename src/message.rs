//! Classification of incoming System Exclusive payloads.
//!
//! All functions expect the payload with the `F0`/`F7` framing removed.

use std::fmt;

use log::debug;

use crate::{
    DEVICE_FAMILY_ID, MANUFACTURER_ID, MASTER_PARAMETER_DATA, NON_REAL_TIME, PATCHES_PER_BANK,
    SINGLE_PATCH_DATA,
};

/// Universal sub-ID for general information messages.
const GENERAL_INFORMATION: u8 = 0x06;
const IDENTITY_REPLY: u8 = 0x02;

const IDENTITY_REPLY_LENGTH: usize = 13;

/// What an incoming payload turned out to be.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum MessageKind {
    Unrecognized,
    /// Matrix header, but no known message shape.
    OwnSysEx,
    EditBufferDump,
    SingleProgramDump { slot: u8 },
    MasterSettingsDump,
    DeviceInquiryResponse { channel: u8 },
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MessageKind::Unrecognized => write!(f, "Unrecognized"),
            MessageKind::OwnSysEx => write!(f, "Matrix 1000 message"),
            MessageKind::EditBufferDump => write!(f, "Edit buffer dump"),
            MessageKind::SingleProgramDump { slot } => write!(f, "Program dump, slot {:02}", slot),
            MessageKind::MasterSettingsDump => write!(f, "Master parameter dump"),
            MessageKind::DeviceInquiryResponse { channel } => {
                write!(f, "Device inquiry response, channel {}", channel + 1)
            }
        }
    }
}

pub fn is_own_sysex(payload: &[u8]) -> bool {
    payload.len() > 1 && payload[0] == MANUFACTURER_ID && payload[1] == DEVICE_FAMILY_ID
}

/// Edit buffer dumps are patch data messages with number 0.
pub fn is_edit_buffer_dump(payload: &[u8]) -> bool {
    is_own_sysex(payload)
        && payload.len() > 3
        && payload[2] == SINGLE_PATCH_DATA
        && payload[3] == 0x00
}

/// Returns the slot of a single program dump, if this is one.
pub fn program_dump_slot(payload: &[u8]) -> Option<u8> {
    if is_own_sysex(payload)
        && payload.len() > 3
        && payload[2] == SINGLE_PATCH_DATA
        && (payload[3] as usize) < PATCHES_PER_BANK
    {
        Some(payload[3])
    } else {
        None
    }
}

pub fn is_single_program_dump(payload: &[u8]) -> bool {
    program_dump_slot(payload).is_some()
}

/// The device answers a bank request with one program dump per slot,
/// so every program dump may be part of a bank dump.
pub fn is_bank_dump_fragment(payload: &[u8]) -> bool {
    is_single_program_dump(payload)
}

pub fn is_master_settings_dump(payload: &[u8]) -> bool {
    is_own_sysex(payload) && payload.len() > 2 && payload[2] == MASTER_PARAMETER_DATA
}

/// Returns the channel reported in an identity reply from a Matrix 1000.
/// Bytes 9 to 12 hold the firmware revision and are not checked.
pub fn device_inquiry_response(payload: &[u8]) -> Option<u8> {
    if payload.len() == IDENTITY_REPLY_LENGTH
        && payload[0] == NON_REAL_TIME
        && payload[2] == GENERAL_INFORMATION
        && payload[3] == IDENTITY_REPLY
        && payload[4] == MANUFACTURER_ID
        && payload[5] == DEVICE_FAMILY_ID
        && payload[6] == 0x00
        && payload[8] == 0x00
    {
        Some(payload[1])
    } else {
        None
    }
}

/// Maps any payload to exactly one kind. A patch data message numbered 0
/// is reported as an edit buffer dump.
pub fn classify(payload: &[u8]) -> MessageKind {
    let kind = if let Some(channel) = device_inquiry_response(payload) {
        MessageKind::DeviceInquiryResponse { channel }
    } else if is_edit_buffer_dump(payload) {
        MessageKind::EditBufferDump
    } else if let Some(slot) = program_dump_slot(payload) {
        MessageKind::SingleProgramDump { slot }
    } else if is_master_settings_dump(payload) {
        MessageKind::MasterSettingsDump
    } else if is_own_sysex(payload) {
        MessageKind::OwnSysEx
    } else {
        MessageKind::Unrecognized
    };
    debug!("classified {} byte payload as {:?}", payload.len(), kind);
    kind
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn identity_reply(channel: u8) -> Vec<u8> {
        vec![0x7E, channel, 0x06, 0x02, 0x10, 0x06, 0x00, 0x02, 0x00, 0x01, 0x01, 0x00, 0x00]
    }

    #[test]
    fn test_own_sysex() {
        assert!(is_own_sysex(&[0x10, 0x06]));
        assert!(!is_own_sysex(&[0x10]));
        assert!(!is_own_sysex(&[0x10, 0x07, 0x01]));
        assert_eq!(classify(&[0x10, 0x06, 0x0C]), MessageKind::OwnSysEx);
    }

    #[test]
    fn test_edit_buffer_dump() {
        let payload = [0x10, 0x06, 0x01, 0x00, 0x00];
        assert!(is_edit_buffer_dump(&payload));
        assert!(is_single_program_dump(&payload));
        assert_eq!(classify(&payload), MessageKind::EditBufferDump);
    }

    #[test]
    fn test_single_program_dump() {
        let payload = [0x10, 0x06, 0x01, 0x63, 0x00];
        assert_eq!(program_dump_slot(&payload), Some(99));
        assert!(is_bank_dump_fragment(&payload));
        assert!(!is_edit_buffer_dump(&payload));
        assert_eq!(classify(&payload), MessageKind::SingleProgramDump { slot: 99 });
    }

    #[test]
    fn test_program_number_out_of_bank() {
        let payload = [0x10, 0x06, 0x01, 0x64, 0x00];
        assert!(!is_single_program_dump(&payload));
        assert_eq!(classify(&payload), MessageKind::OwnSysEx);
    }

    #[test]
    fn test_header_only_patch_message() {
        assert_eq!(classify(&[0x10, 0x06, 0x01]), MessageKind::OwnSysEx);
    }

    #[test]
    fn test_master_settings_dump() {
        assert_eq!(classify(&[0x10, 0x06, 0x03, 0x00]), MessageKind::MasterSettingsDump);
    }

    #[test]
    fn test_device_inquiry_response() {
        assert_eq!(device_inquiry_response(&identity_reply(5)), Some(5));
        assert_eq!(classify(&identity_reply(5)), MessageKind::DeviceInquiryResponse { channel: 5 });
    }

    #[test]
    fn test_device_inquiry_response_other_device() {
        let mut reply = identity_reply(0);
        reply[4] = 0x42;
        assert_eq!(device_inquiry_response(&reply), None);

        let mut reply = identity_reply(0);
        reply.push(0x00);
        assert_eq!(device_inquiry_response(&reply), None);

        let mut reply = identity_reply(0);
        reply[8] = 0x01;
        assert_eq!(device_inquiry_response(&reply), None);
    }

    #[test]
    fn test_firmware_bytes_ignored() {
        let mut reply = identity_reply(2);
        reply[9..13].copy_from_slice(&[0x7F, 0x7F, 0x7F, 0x7F]);
        assert_eq!(device_inquiry_response(&reply), Some(2));
    }

    #[test]
    fn test_unrecognized() {
        assert_eq!(classify(&[]), MessageKind::Unrecognized);
        assert_eq!(classify(&[0x43, 0x00, 0x09]), MessageKind::Unrecognized);
    }

    proptest! {
        #[test]
        fn patch_messages_classify_exclusively(
            header in prop_oneof![Just(vec![0x10u8, 0x06]), proptest::collection::vec(0u8..0x80, 0..3)],
            body in proptest::collection::vec(0u8..0x80, 0..8),
        ) {
            let mut payload = header;
            payload.extend(body);
            let edit_buffer = is_edit_buffer_dump(&payload);
            let program = is_single_program_dump(&payload) && !edit_buffer;
            let own_other = is_own_sysex(&payload) && !edit_buffer && !program;
            let unrecognized = !is_own_sysex(&payload);
            let holding = [edit_buffer, program, own_other, unrecognized]
                .iter()
                .filter(|&&b| b)
                .count();
            prop_assert_eq!(holding, 1);

            let kind = classify(&payload);
            if edit_buffer {
                prop_assert_eq!(kind, MessageKind::EditBufferDump);
            }
            if program {
                let is_program_kind = matches!(kind, MessageKind::SingleProgramDump { .. });
                prop_assert!(is_program_kind);
            }
            if unrecognized && device_inquiry_response(&payload).is_none() {
                prop_assert_eq!(kind, MessageKind::Unrecognized);
            }
        }
    }
}
