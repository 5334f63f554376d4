//! Commitment engine
//!
//! `keccak256(judge[20] || participant[20] || points[32] || nonce[32])`, the
//! same bytes Solidity produces for
//! `abi.encodePacked(address, address, uint256, uint256)`. Every field has a
//! fixed width, so distinct tuples never share an encoding. Changing widths
//! or order breaks verifiers and must come with a new version.
//!
//! The engine does not validate: an out-of-range score still hashes. Only
//! values that cannot be encoded at all (negative points, non-hex input)
//! fail.

use std::time::{SystemTime, UNIX_EPOCH};

use alloy_primitives::{keccak256, Address, B256};
use tracing::debug;

use crate::error::{Result, ZkVoteError};
use crate::types::{VoteCommitment, VoteData};

/// Byte length of the packed encoding
pub const PACKED_LEN: usize = 20 + 20 + 32 + 32;

/// A vote with every field in its fixed-width wire form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EncodedVote {
    pub judge: Address,
    pub participant: Address,
    pub points: u64,
    pub nonce: B256,
}

impl EncodedVote {
    pub fn from_vote(vote: &VoteData) -> Result<Self> {
        let points = u64::try_from(vote.points).map_err(|_| {
            ZkVoteError::encoding(format!("points {} is not a uint256", vote.points))
        })?;

        Ok(Self {
            judge: parse_address(&vote.judge)?,
            participant: parse_address(&vote.participant)?,
            points,
            nonce: parse_uint256(&vote.nonce)?,
        })
    }

    pub fn pack(&self) -> [u8; PACKED_LEN] {
        let mut out = [0u8; PACKED_LEN];
        out[..20].copy_from_slice(self.judge.as_slice());
        out[20..40].copy_from_slice(self.participant.as_slice());
        out[64..72].copy_from_slice(&self.points.to_be_bytes());
        out[72..].copy_from_slice(self.nonce.as_slice());
        out
    }

    pub fn commitment(&self) -> B256 {
        keccak256(self.pack())
    }
}

/// Commit to a vote, stamping the local wall clock.
pub fn commit(vote: &VoteData) -> Result<VoteCommitment> {
    let commitment = commitment_hash(vote)?;
    let timestamp = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0);
    debug!(%commitment, timestamp, "vote commitment generated");

    Ok(VoteCommitment { commitment, timestamp })
}

/// The bare commitment hash of a vote.
pub fn commitment_hash(vote: &VoteData) -> Result<B256> {
    EncodedVote::from_vote(vote).map(|encoded| encoded.commitment())
}

pub(crate) fn parse_address(s: &str) -> Result<Address> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    if digits.len() != 40 {
        return Err(ZkVoteError::encoding(format!("address {:?} is not 20 bytes", s)));
    }
    let bytes =
        hex::decode(digits).map_err(|e| ZkVoteError::encoding(format!("address {:?}: {}", s, e)))?;
    Ok(Address::from_slice(&bytes))
}

/// Parse a hex `uint256`, left-padding short values.
pub(crate) fn parse_uint256(s: &str) -> Result<B256> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    if digits.is_empty() || digits.len() > 64 {
        return Err(ZkVoteError::encoding(format!("nonce {:?} is not a uint256", s)));
    }
    let padded = format!("{:0>64}", digits);
    let bytes =
        hex::decode(padded).map_err(|e| ZkVoteError::encoding(format!("nonce {:?}: {}", s, e)))?;
    Ok(B256::from_slice(&bytes))
}
