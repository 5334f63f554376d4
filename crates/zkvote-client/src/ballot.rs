//! Per-vote bookkeeping on the judge's side
//!
//! A [`JudgeBallot`] holds everything a judge must keep between the two
//! phases: the vote (including the secret nonce), its commitment and the
//! receipts of the confirmed ledger transactions. It serializes to JSON so
//! it can be stored until the reveal phase opens.

use std::fmt;

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use zkvote_runtime::{
    check_vote_data, commit, generate_nonce, EncodedVote, Receipt, Result, VoteCommitment,
    VoteData, ZkVoteError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BallotStatus {
    /// Commitment computed locally, nothing confirmed on the ledger
    Drafted,
    Committed,
    Revealed,
}

impl fmt::Display for BallotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Drafted => write!(f, "drafted"),
            Self::Committed => write!(f, "committed"),
            Self::Revealed => write!(f, "revealed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JudgeBallot {
    vote: VoteData,
    judge: Address,
    participant: Address,
    commitment: VoteCommitment,
    status: BallotStatus,
    commit_receipt: Option<Receipt>,
    reveal_receipt: Option<Receipt>,
}

impl JudgeBallot {
    /// Validate `vote` and compute its commitment.
    pub fn new(vote: VoteData) -> Result<Self> {
        check_vote_data(&vote)?;
        let encoded = EncodedVote::from_vote(&vote)?;
        let commitment = commit(&vote)?;

        Ok(Self {
            judge: encoded.judge,
            participant: encoded.participant,
            vote,
            commitment,
            status: BallotStatus::Drafted,
            commit_receipt: None,
            reveal_receipt: None,
        })
    }

    /// Draft a ballot with a freshly generated nonce.
    pub fn draft(judge: Address, participant: Address, points: i64) -> Result<Self> {
        Self::new(VoteData::new(
            judge.to_checksum(None),
            participant.to_checksum(None),
            points,
            generate_nonce(),
        ))
    }

    pub fn vote(&self) -> &VoteData {
        &self.vote
    }

    pub fn judge(&self) -> Address {
        self.judge
    }

    pub fn participant(&self) -> Address {
        self.participant
    }

    pub fn commitment(&self) -> &VoteCommitment {
        &self.commitment
    }

    pub fn status(&self) -> BallotStatus {
        self.status
    }

    pub fn commit_receipt(&self) -> Option<&Receipt> {
        self.commit_receipt.as_ref()
    }

    pub fn reveal_receipt(&self) -> Option<&Receipt> {
        self.reveal_receipt.as_ref()
    }

    pub(crate) fn expect_status(&self, expected: BallotStatus) -> Result<()> {
        if self.status == expected {
            Ok(())
        } else {
            Err(ZkVoteError::invalid_vote_data(format!(
                "ballot is {}, expected {}",
                self.status, expected
            )))
        }
    }

    pub(crate) fn mark_committed(&mut self, receipt: Receipt) {
        self.status = BallotStatus::Committed;
        self.commit_receipt = Some(receipt);
    }

    pub(crate) fn mark_revealed(&mut self, receipt: Receipt) {
        self.status = BallotStatus::Revealed;
        self.reveal_receipt = Some(receipt);
    }
}
