//! Collecting a bank dump.
//!
//! The Matrix 1000 has no bank dump message. After a bank request it sends
//! one program dump per slot, and the bank is complete once every slot has
//! been seen at least once.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::message::program_dump_slot;
use crate::patch::{BankNumber, Patch};
use crate::PATCHES_PER_BANK;

fn default_timeout_ms() -> u64 {
    10_000
}

/// Settings for a bank dump session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankDumpConfig {
    /// Time allowed for all program dumps of a bank to arrive.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl BankDumpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for BankDumpConfig {
    fn default() -> Self {
        BankDumpConfig { timeout_ms: default_timeout_ms() }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum BankDumpState {
    Idle,
    Collecting,
    Complete,
    Abandoned,
}

/// Accumulates the program dumps that answer a bank request.
///
/// Only one bank request may be in flight at a time, and messages must be
/// fed from a single dispatcher.
#[derive(Debug)]
pub struct BankDumpAssembler {
    config: BankDumpConfig,
    state: BankDumpState,
    bank: Option<BankNumber>,
    started: Option<Instant>,
    patches: BTreeMap<u8, Patch>,
}

impl BankDumpAssembler {
    pub fn new(config: BankDumpConfig) -> Self {
        BankDumpAssembler {
            config,
            state: BankDumpState::Idle,
            bank: None,
            started: None,
            patches: BTreeMap::new(),
        }
    }

    /// Begins a new session for `bank`, discarding anything collected before.
    pub fn start(&mut self, bank: BankNumber, now: Instant) {
        debug!("collecting bank {}", bank);
        self.state = BankDumpState::Collecting;
        self.bank = Some(bank);
        self.started = Some(now);
        self.patches.clear();
    }

    /// Feeds one incoming payload. Returns true if it was taken as part of
    /// the bank. Repeated dumps of a slot replace the earlier one and do not
    /// count twice; dumps whose data fails to decode are not counted.
    pub fn on_message(&mut self, payload: &[u8], now: Instant) -> bool {
        if self.poll(now) != BankDumpState::Collecting {
            return false;
        }
        let (Some(slot), Some(bank)) = (program_dump_slot(payload), self.bank) else {
            return false;
        };
        match Patch::from_program_dump(payload, bank) {
            Ok(patch) => {
                if self.patches.insert(slot, patch).is_some() {
                    debug!("slot {:02} received again", slot);
                }
            }
            Err(e) => {
                warn!("dropping program dump for slot {:02}: {}", slot, e);
                return false;
            }
        }
        if self.patches.len() == PATCHES_PER_BANK {
            info!("bank {} complete", bank);
            self.state = BankDumpState::Complete;
        }
        true
    }

    /// Checks the session timeout and returns the current state.
    pub fn poll(&mut self, now: Instant) -> BankDumpState {
        if self.state == BankDumpState::Collecting {
            if let Some(started) = self.started {
                if now.saturating_duration_since(started) >= self.config.timeout() {
                    warn!(
                        "bank dump timed out after {} ms with {} of {} programs",
                        self.config.timeout_ms,
                        self.patches.len(),
                        PATCHES_PER_BANK
                    );
                    self.state = BankDumpState::Abandoned;
                }
            }
        }
        self.state
    }

    pub fn cancel(&mut self) {
        if self.state == BankDumpState::Collecting {
            debug!("bank dump cancelled");
            self.state = BankDumpState::Abandoned;
        }
    }

    pub fn state(&self) -> BankDumpState {
        self.state
    }

    pub fn is_complete(&self) -> bool {
        self.state == BankDumpState::Complete
    }

    /// Number of distinct slots received so far.
    pub fn received(&self) -> usize {
        self.patches.len()
    }

    /// Slots still missing, for re-requesting single programs.
    pub fn missing_slots(&self) -> Vec<u8> {
        (0..PATCHES_PER_BANK as u8)
            .filter(|slot| !self.patches.contains_key(slot))
            .collect()
    }

    /// Ends the session. Yields the patches in slot order if the bank is
    /// complete; in any case the assembler is idle afterwards.
    pub fn finish(&mut self) -> Result<Vec<Patch>> {
        let received = self.patches.len();
        let complete = self.is_complete();
        let patches = std::mem::take(&mut self.patches);
        self.state = BankDumpState::Idle;
        self.bank = None;
        self.started = None;
        if complete {
            Ok(patches.into_values().collect())
        } else {
            Err(Error::IncompleteBankDump { received, expected: PATCHES_PER_BANK })
        }
    }
}

impl Default for BankDumpAssembler {
    fn default() -> Self {
        BankDumpAssembler::new(BankDumpConfig::default())
    }
}

/// Decoding a bank from one message cannot work with this device.
///
/// # Panics
///
/// Always. Bank requests are answered with individual program dumps,
/// which go through [`BankDumpAssembler`].
pub fn patches_from_bank_message(_payload: &[u8]) -> Vec<Patch> {
    panic!("the Matrix 1000 sends banks as individual program dumps; use BankDumpAssembler")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nibble;
    use crate::{DEVICE_FAMILY_ID, MANUFACTURER_ID, PATCH_SIZE, SINGLE_PATCH_DATA};

    fn program_dump(slot: u8) -> Vec<u8> {
        let mut data = vec![0u8; PATCH_SIZE];
        data[..8].copy_from_slice(format!("PROG{:02}  ", slot).as_bytes());
        data[8] = slot;
        let mut payload = vec![MANUFACTURER_ID, DEVICE_FAMILY_ID, SINGLE_PATCH_DATA, slot];
        payload.extend(nibble::pack(&data));
        payload
    }

    fn started(bank: usize) -> (BankDumpAssembler, Instant) {
        let now = Instant::now();
        let mut assembler = BankDumpAssembler::default();
        assembler.start(BankNumber::new(bank).unwrap(), now);
        (assembler, now)
    }

    #[test]
    fn test_complete_in_any_order() {
        let (mut assembler, now) = started(2);
        let mut slots: Vec<u8> = (0..100).collect();
        slots.reverse();
        slots.swap(10, 60);
        for slot in slots {
            assert!(assembler.on_message(&program_dump(slot), now));
        }
        assert!(assembler.is_complete());

        let patches = assembler.finish().unwrap();
        assert_eq!(patches.len(), 100);
        assert_eq!(patches[0].program_number().unwrap().value(), 200);
        assert_eq!(patches[99].name(), "PROG99  ");
        assert_eq!(assembler.state(), BankDumpState::Idle);
    }

    #[test]
    fn test_duplicates_do_not_block_completion() {
        let (mut assembler, now) = started(0);
        assembler.on_message(&program_dump(5), now);
        assembler.on_message(&program_dump(5), now);
        assert_eq!(assembler.received(), 1);
        for slot in (0..100).filter(|&s| s != 5) {
            assembler.on_message(&program_dump(slot), now);
        }
        assert!(assembler.is_complete());
    }

    #[test]
    fn test_duplicates_do_not_complete_early() {
        let (mut assembler, now) = started(0);
        for slot in 0..99 {
            assembler.on_message(&program_dump(slot), now);
        }
        assembler.on_message(&program_dump(98), now);
        assert!(!assembler.is_complete());
        assert_eq!(assembler.missing_slots(), vec![99]);
        assert_eq!(
            assembler.finish(),
            Err(Error::IncompleteBankDump { received: 99, expected: 100 })
        );
    }

    #[test]
    fn test_other_messages_ignored() {
        let (mut assembler, now) = started(0);
        assert!(!assembler.on_message(&[0x10, 0x06, 0x0C], now));
        assert!(!assembler.on_message(&[0x7E, 0x00, 0x06, 0x02], now));
        assert_eq!(assembler.received(), 0);
    }

    #[test]
    fn test_bad_checksum_not_counted() {
        let (mut assembler, now) = started(0);
        let mut payload = program_dump(3);
        let last = payload.len() - 1;
        payload[last] ^= 0x01;
        assert!(!assembler.on_message(&payload, now));
        assert_eq!(assembler.missing_slots().len(), 100);
    }

    #[test]
    fn test_idle_ignores_messages() {
        let mut assembler = BankDumpAssembler::default();
        assert!(!assembler.on_message(&program_dump(0), Instant::now()));
        assert_eq!(assembler.state(), BankDumpState::Idle);
    }

    #[test]
    fn test_timeout_abandons() {
        let (mut assembler, now) = started(1);
        assembler.on_message(&program_dump(0), now);
        let later = now + Duration::from_millis(10_000);
        assert_eq!(assembler.poll(later), BankDumpState::Abandoned);
        assert!(!assembler.on_message(&program_dump(1), later));
        assert_eq!(
            assembler.finish(),
            Err(Error::IncompleteBankDump { received: 1, expected: 100 })
        );
    }

    #[test]
    fn test_cancel() {
        let (mut assembler, now) = started(1);
        assembler.cancel();
        assert_eq!(assembler.state(), BankDumpState::Abandoned);
        assert!(!assembler.on_message(&program_dump(1), now));
    }

    #[test]
    fn test_restart_clears() {
        let (mut assembler, now) = started(1);
        assembler.on_message(&program_dump(1), now);
        assembler.start(BankNumber::new(2).unwrap(), now);
        assert_eq!(assembler.received(), 0);
    }

    #[test]
    fn test_config_defaults() {
        let config: BankDumpConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, BankDumpConfig::default());
        let config: BankDumpConfig = serde_json::from_str(r#"{"timeout_ms": 2500}"#).unwrap();
        assert_eq!(config.timeout(), Duration::from_millis(2500));
    }

    #[test]
    #[should_panic]
    fn test_bank_message_path_panics() {
        patches_from_bank_message(&program_dump(0));
    }
}
