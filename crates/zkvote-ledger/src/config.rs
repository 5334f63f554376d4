//! Ledger configuration

use std::{fs, path::Path};

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use zkvote_runtime::Result;

/// Who may vote, who may be scored, and how many prizes there are
///
/// # Examples
///
/// ```
/// use zkvote_ledger::LedgerConfig;
///
/// let config: LedgerConfig = serde_json::from_str(r#"{
///     "admin": "0x0000000000000000000000000000000000000001",
///     "judges": ["0x1111111111111111111111111111111111111111"],
///     "participants": ["0x2222222222222222222222222222222222222222"]
/// }"#).unwrap();
/// assert_eq!(config.winner_slots, 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    pub admin: Address,
    pub judges: Vec<Address>,
    pub participants: Vec<Address>,
    #[serde(default = "default_winner_slots")]
    pub winner_slots: usize,
}

fn default_winner_slots() -> usize {
    3
}

impl LedgerConfig {
    pub fn new(admin: Address, judges: Vec<Address>, participants: Vec<Address>) -> Self {
        Self { admin, judges, participants, winner_slots: default_winner_slots() }
    }

    pub fn with_winner_slots(mut self, winner_slots: usize) -> Self {
        self.winner_slots = winner_slots;
        self
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn is_judge(&self, address: &Address) -> bool {
        self.judges.contains(address)
    }

    pub fn is_participant(&self, address: &Address) -> bool {
        self.participants.contains(address)
    }

    /// Ballots expected if every judge scores every participant
    pub fn expected_ballots(&self) -> u64 {
        (self.judges.len() * self.participants.len()) as u64
    }
}
