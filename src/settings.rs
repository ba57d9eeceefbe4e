//! Master parameters ("global settings").
//!
//! The device sends its master parameters as a 172 byte block. Each setting
//! lives in one byte at a fixed offset; the table below describes them.
//! The per-patch group enable bits are not part of the table.

use std::collections::HashMap;
use std::fmt;

use lazy_static::lazy_static;
use log::{debug, warn};

use crate::error::{Error, Result};
use crate::message::is_master_settings_dump;
use crate::nibble;
use crate::SETTINGS_SIZE;

/// Stable identifier of a master parameter.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum SettingId {
    MasterTranspose,
    MasterTune,
    MidiBasicChannel,
    MidiOmniMode,
    MidiControllers,
    MidiPatchChanges,
    MidiPedal1Controller,
    MidiPedal2Controller,
    MidiPedal3Controller,
    MidiPedal4Controller,
    MidiEcho,
    MidiMonoMode,
    BankLock,
    VibratoWaveform,
    VibratoSpeed,
    VibratoAmplitude,
    VibratoSpeedModSource,
    VibratoSpeedModAmount,
    VibratoAmpModSource,
    VibratoAmpModAmount,
    BendRange,
    NumberOfUnits,
    CurrentUnitNumber,
    GroupMode,
    Unison,
    VolumeInvert,
    MemoryProtect,
}

/// How the byte of a setting is interpreted.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum ParameterKind {
    /// Any non-zero byte is on; some flags only use the top bit.
    Bool,
    /// `twos_complement` marks the two tuning fields stored as signed bytes.
    Int { min: i32, max: i32, twos_complement: bool },
    Lookup { choices: &'static [(i32, &'static str)] },
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct SettingDefinition {
    pub id: SettingId,
    pub offset: usize,
    pub name: &'static str,
    pub group: &'static str,
    pub kind: ParameterKind,
    /// Added to the raw byte for display, e.g. to make channels one-based.
    pub display_offset: i32,
}

/// A decoded setting value.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum SettingValue {
    Bool(bool),
    Integer(i32),
    Lookup { value: i32, label: &'static str },
}

impl SettingValue {
    pub fn as_int(&self) -> i32 {
        match self {
            SettingValue::Bool(b) => *b as i32,
            SettingValue::Integer(v) => *v,
            SettingValue::Lookup { value, .. } => *value,
        }
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SettingValue::Bool(b) => write!(f, "{}", if *b { "On" } else { "Off" }),
            SettingValue::Integer(v) => write!(f, "{}", v),
            SettingValue::Lookup { label, .. } => write!(f, "{}", label),
        }
    }
}

const VIBRATO_WAVEFORMS: &[(i32, &str)] = &[
    (0, "Triangle"),
    (1, "Saw up"),
    (2, "Saw Down"),
    (3, "Square"),
    (4, "Random"),
    (5, "Noise"),
];

const VIBRATO_MOD_SOURCES: &[(i32, &str)] = &[(0, "Off"), (1, "Lever 2"), (2, "Pedal 1")];

const fn setting(id: SettingId, offset: usize, name: &'static str, group: &'static str, kind: ParameterKind) -> SettingDefinition {
    SettingDefinition { id, offset, name, group, kind, display_offset: 0 }
}

const fn int(min: i32, max: i32) -> ParameterKind {
    ParameterKind::Int { min, max, twos_complement: false }
}

const fn signed(min: i32, max: i32) -> ParameterKind {
    ParameterKind::Int { min, max, twos_complement: true }
}

const fn lookup(choices: &'static [(i32, &'static str)]) -> ParameterKind {
    ParameterKind::Lookup { choices }
}

const BOOL: ParameterKind = ParameterKind::Bool;

use SettingId::*;

/// All master parameters, in display order.
pub static SETTINGS: [SettingDefinition; 27] = [
    setting(MasterTranspose, 34, "Master Transpose", "Tuning", signed(-24, 24)),
    setting(MasterTune, 8, "Master Tune", "Tuning", signed(-32, 32)),
    SettingDefinition {
        display_offset: 1,
        ..setting(MidiBasicChannel, 11, "MIDI Basic Channel", "MIDI", int(1, 16))
    },
    setting(MidiOmniMode, 12, "MIDI OMNI Mode Enable", "MIDI", BOOL),
    setting(MidiControllers, 13, "MIDI Controllers enable", "MIDI", BOOL),
    setting(MidiPatchChanges, 14, "MIDI Patch Changes Enable", "MIDI", BOOL),
    setting(MidiPedal1Controller, 17, "MIDI Pedal 1 Controller", "MIDI", int(0, 121)),
    setting(MidiPedal2Controller, 18, "MIDI Pedal 2 Controller", "MIDI", int(0, 121)),
    setting(MidiPedal3Controller, 19, "MIDI Pedal 3 Controller", "MIDI", int(0, 121)),
    setting(MidiPedal4Controller, 20, "MIDI Pedal 4 Controller", "MIDI", int(0, 121)),
    setting(MidiEcho, 32, "MIDI Echo Enable", "MIDI", BOOL),
    setting(MidiMonoMode, 35, "MIDI Mono Mode (Guitar)", "MIDI", int(0, 9)),
    setting(BankLock, 165, "Bank Lock Enable", "MIDI", BOOL),
    setting(VibratoWaveform, 4, "Vibrato Waveform", "Global Vibrato", lookup(VIBRATO_WAVEFORMS)),
    setting(VibratoSpeed, 1, "Vibrato Speed", "Global Vibrato", int(0, 63)),
    setting(VibratoAmplitude, 5, "Vibrato Amplitude", "Global Vibrato", int(0, 63)),
    setting(VibratoSpeedModSource, 2, "Vibrato Speed Mod Source", "Global Vibrato", lookup(VIBRATO_MOD_SOURCES)),
    setting(VibratoSpeedModAmount, 3, "Vibrato Speed Mod Amount", "Global Vibrato", int(0, 63)),
    setting(VibratoAmpModSource, 6, "Vibrato Amp Mod Source", "Global Vibrato", lookup(VIBRATO_MOD_SOURCES)),
    setting(VibratoAmpModAmount, 7, "Vibrato Amp Mod Amount", "Global Vibrato", int(0, 63)),
    setting(BendRange, 164, "Bend Range", "Controls", int(1, 24)),
    setting(NumberOfUnits, 166, "Number of Units", "Group Mode", int(1, 6)),
    setting(CurrentUnitNumber, 167, "Current Unit Number", "Group Mode", int(0, 7)),
    setting(GroupMode, 168, "Group Mode Enable", "Group Mode", BOOL),
    setting(Unison, 169, "Unison Enable", "General", BOOL),
    setting(VolumeInvert, 170, "Volume Invert Enable", "General", BOOL),
    setting(MemoryProtect, 171, "Memory Protect Enable", "General", BOOL),
];

lazy_static! {
    static ref SETTINGS_BY_ID: HashMap<SettingId, &'static SettingDefinition> =
        SETTINGS.iter().map(|d| (d.id, d)).collect();
}

/// Looks up the table row of a setting.
pub fn definition(id: SettingId) -> &'static SettingDefinition {
    SETTINGS_BY_ID[&id]
}

impl SettingDefinition {
    /// Interprets this setting's byte of a settings block.
    pub fn decode(&self, block: &[u8]) -> Result<SettingValue> {
        let byte = block.get(self.offset).ok_or(Error::MalformedLength {
            len: block.len(),
            reason: "settings block too short for this field",
        })?;
        let mut raw = *byte as i32 + self.display_offset;
        match self.kind {
            ParameterKind::Bool => Ok(SettingValue::Bool(raw != 0)),
            ParameterKind::Int { min, max, twos_complement } => {
                if twos_complement && raw > 127 {
                    raw = raw as u8 as i8 as i32;
                }
                if raw < min || raw > max {
                    warn!("{}: value {} outside {}..={}, clamping", self.name, raw, min, max);
                }
                Ok(SettingValue::Integer(raw.clamp(min, max)))
            }
            ParameterKind::Lookup { choices } => choices
                .iter()
                .find(|(value, _)| *value == raw)
                .map(|&(value, label)| SettingValue::Lookup { value, label })
                .ok_or(Error::UnmappedChoice { setting: self.name, value: raw }),
        }
    }

    /// Produces the raw byte for a display value.
    pub fn encode(&self, value: i32) -> Result<u8> {
        let out_of_range = |min, max| Error::SettingOutOfRange { setting: self.name, value, min, max };
        match self.kind {
            ParameterKind::Bool => {
                if !(0..=1).contains(&value) {
                    return Err(out_of_range(0, 1));
                }
            }
            ParameterKind::Int { min, max, .. } => {
                if value < min || value > max {
                    return Err(out_of_range(min, max));
                }
            }
            ParameterKind::Lookup { choices } => {
                if !choices.iter().any(|(v, _)| *v == value) {
                    return Err(Error::UnmappedChoice { setting: self.name, value });
                }
            }
        }
        // Negative values only occur for the two's complement fields.
        Ok((value - self.display_offset) as i8 as u8)
    }
}

/// A setting decoded from a block. A single field may fail to decode
/// without affecting the others.
#[derive(Clone, PartialEq, Debug)]
pub struct DecodedSetting {
    pub definition: &'static SettingDefinition,
    pub value: Result<SettingValue>,
}

/// Decodes all settings from an unpacked block, which must be exactly
/// [`SETTINGS_SIZE`] bytes long.
pub fn decode(block: &[u8]) -> Result<Vec<DecodedSetting>> {
    if block.len() != SETTINGS_SIZE {
        warn!("ignoring global settings data: block size is {} bytes, not {}", block.len(), SETTINGS_SIZE);
        return Err(Error::MalformedLength { len: block.len(), reason: "settings block must be 172 bytes" });
    }
    Ok(SETTINGS
        .iter()
        .map(|definition| DecodedSetting { definition, value: definition.decode(block) })
        .collect())
}

/// The unpacked master parameter block.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct GlobalSettings {
    data: Vec<u8>,
}

impl GlobalSettings {
    pub fn new(data: Vec<u8>) -> Result<Self> {
        if data.len() != SETTINGS_SIZE {
            return Err(Error::MalformedLength { len: data.len(), reason: "settings block must be 172 bytes" });
        }
        Ok(GlobalSettings { data })
    }

    /// Unpacks nybble data with checksum, as stored in a settings data file.
    pub fn from_packed(wire: &[u8]) -> Result<Self> {
        GlobalSettings::new(nibble::unpack(wire)?)
    }

    /// Decodes a master parameter dump payload (framing stripped).
    pub fn from_dump(payload: &[u8]) -> Result<Self> {
        if !is_master_settings_dump(payload) {
            return Err(Error::UnrecognizedMessage);
        }
        debug!("master parameter dump with {} bytes of packed data", payload.len() - 3);
        GlobalSettings::from_packed(&payload[3..])
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Packs the block for sending it back to the device.
    pub fn to_packed(&self) -> Vec<u8> {
        nibble::pack(&self.data)
    }

    pub fn decode(&self) -> Vec<DecodedSetting> {
        decode(&self.data).unwrap_or_default()
    }

    pub fn get(&self, id: SettingId) -> Result<SettingValue> {
        definition(id).decode(&self.data)
    }

    /// Writes a display value into the block.
    pub fn set(&mut self, id: SettingId, value: i32) -> Result<()> {
        let definition = definition(id);
        self.data[definition.offset] = definition.encode(value)?;
        Ok(())
    }
}
