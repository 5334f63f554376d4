//! Ledger contract interface
//!
//! One method per contract entry point:
//!
//! ```text
//! commitVote(bytes32 commitment)
//! revealVote(address participant, uint256 points, uint256 nonce, bytes proof)
//! getVotingStats() view returns (uint256, uint256, uint256)
//! getParticipantScore(address) view returns (uint256, uint256, bool, uint256)
//! getWinners() view returns (address[])
//! isCommitPhase() view returns (bool)
//! isRevealPhase() view returns (bool)
//! ```
//!
//! State-changing calls return a transaction hash immediately. The change is
//! durable only once [`VotingLedger::wait_for_receipt`] succeeds for it.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use alloy_primitives::{Address, B256};
use serde::{Deserialize, Serialize};

use crate::commitment::parse_address;
use crate::error::Result;
use crate::types::{ParticipantScore, VotingStats};

pub type TxHash = B256;

/// Identity that signs ledger transactions
pub trait Signer {
    fn address(&self) -> Address;
}

/// A signer identified only by its account address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LocalSigner {
    address: Address,
}

impl LocalSigner {
    pub fn new(address: Address) -> Self {
        Self { address }
    }
}

impl FromStr for LocalSigner {
    type Err = crate::error::ZkVoteError;

    fn from_str(s: &str) -> Result<Self> {
        parse_address(s).map(Self::new)
    }
}

impl Signer for LocalSigner {
    fn address(&self) -> Address {
        self.address
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TxKind {
    Commit,
    Reveal,
}

impl fmt::Display for TxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Commit => write!(f, "commitVote"),
            Self::Reveal => write!(f, "revealVote"),
        }
    }
}

/// Arguments of `revealVote`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevealCall {
    pub participant: Address,
    pub points: u64,
    pub nonce: B256,
    /// Serialized [`crate::ZkProof`]
    pub proof: Vec<u8>,
}

/// A confirmed state change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub tx_hash: TxHash,
    pub kind: TxKind,
    pub from: Address,
    /// Ledger-wide ordinal of the accepted transaction
    pub sequence: u64,
}

/// Strongly-typed surface of the voting contract
pub trait VotingLedger {
    fn commit_vote(&self, from: Address, commitment: B256) -> Result<TxHash>;

    fn reveal_vote(&self, from: Address, call: RevealCall) -> Result<TxHash>;

    /// Block until the transaction is final, returning the ledger's
    /// rejection if it was refused.
    fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<Receipt>;

    fn voting_stats(&self) -> Result<VotingStats>;

    /// Zeroed score for a participant without revealed votes.
    fn participant_score(&self, participant: Address) -> Result<ParticipantScore>;

    fn winners(&self) -> Result<Vec<Address>>;

    fn is_commit_phase(&self) -> Result<bool>;

    fn is_reveal_phase(&self) -> Result<bool>;
}

macro_rules! forward_ledger {
    ($ty:ty) => {
        impl<L: VotingLedger + ?Sized> VotingLedger for $ty {
            fn commit_vote(&self, from: Address, commitment: B256) -> Result<TxHash> {
                (**self).commit_vote(from, commitment)
            }

            fn reveal_vote(&self, from: Address, call: RevealCall) -> Result<TxHash> {
                (**self).reveal_vote(from, call)
            }

            fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<Receipt> {
                (**self).wait_for_receipt(tx_hash)
            }

            fn voting_stats(&self) -> Result<VotingStats> {
                (**self).voting_stats()
            }

            fn participant_score(&self, participant: Address) -> Result<ParticipantScore> {
                (**self).participant_score(participant)
            }

            fn winners(&self) -> Result<Vec<Address>> {
                (**self).winners()
            }

            fn is_commit_phase(&self) -> Result<bool> {
                (**self).is_commit_phase()
            }

            fn is_reveal_phase(&self) -> Result<bool> {
                (**self).is_reveal_phase()
            }
        }
    };
}

forward_ledger!(&L);
forward_ledger!(Arc<L>);

/// Handle to a submitted transaction
///
/// Dropping it without calling [`PendingTransaction::wait`] abandons the
/// caller's interest; it does not cancel the submission.
#[must_use = "a submitted transaction is not durable until it is awaited"]
pub struct PendingTransaction<'a, L: VotingLedger + ?Sized> {
    ledger: &'a L,
    tx_hash: TxHash,
    kind: TxKind,
}

impl<'a, L: VotingLedger + ?Sized> PendingTransaction<'a, L> {
    pub fn new(ledger: &'a L, tx_hash: TxHash, kind: TxKind) -> Self {
        Self { ledger, tx_hash, kind }
    }

    pub fn tx_hash(&self) -> TxHash {
        self.tx_hash
    }

    pub fn kind(&self) -> TxKind {
        self.kind
    }

    pub fn wait(self) -> Result<Receipt> {
        self.ledger.wait_for_receipt(self.tx_hash)
    }
}

impl<L: VotingLedger + ?Sized> fmt::Debug for PendingTransaction<'_, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingTransaction")
            .field("tx_hash", &self.tx_hash)
            .field("kind", &self.kind)
            .finish()
    }
}
