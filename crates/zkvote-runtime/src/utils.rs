//! Nonce generation and vote validation

use alloy_primitives::{Address, B256};
use rand::{rngs::OsRng, RngCore};

use crate::commitment;
use crate::error::{Result, ZkVoteError};
use crate::types::{VoteData, MAX_POINTS, MIN_POINTS};

/// Length of a nonce string: `0x` + 64 hex characters
pub const NONCE_HEX_LEN: usize = 66;

/// Fresh 256-bit nonce from the operating system RNG, as `0x` + 64 hex chars.
pub fn generate_nonce() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    format!("0x{}", hex::encode(bytes))
}

/// `true` when the vote may be committed and proven.
pub fn validate_vote_data(vote: &VoteData) -> bool {
    check_vote_data(vote).is_ok()
}

/// Like [`validate_vote_data`], reporting the first problem found.
pub fn check_vote_data(vote: &VoteData) -> Result<()> {
    if !is_valid_address(&vote.judge) {
        return Err(ZkVoteError::invalid_vote_data(format!(
            "malformed judge address {:?}",
            vote.judge
        )));
    }
    if !is_valid_address(&vote.participant) {
        return Err(ZkVoteError::invalid_vote_data(format!(
            "malformed participant address {:?}",
            vote.participant
        )));
    }
    if !(MIN_POINTS..=MAX_POINTS).contains(&vote.points) {
        return Err(ZkVoteError::invalid_vote_data(format!(
            "points {} outside [{}, {}]",
            vote.points, MIN_POINTS, MAX_POINTS
        )));
    }
    if !is_valid_nonce(&vote.nonce) {
        return Err(ZkVoteError::invalid_vote_data(
            "nonce must be 0x followed by 64 hex characters",
        ));
    }
    Ok(())
}

/// Account identifier check: `0x` + 40 hex digits, and a valid EIP-55
/// checksum whenever the input mixes upper and lower case.
pub fn is_valid_address(s: &str) -> bool {
    let Some(digits) = s.strip_prefix("0x") else {
        return false;
    };
    if digits.len() != 40 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return false;
    }

    let has_lower = digits.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = digits.chars().any(|c| c.is_ascii_uppercase());
    if !(has_lower && has_upper) {
        return true;
    }

    match hex::decode(digits) {
        Ok(bytes) => Address::from_slice(&bytes).to_checksum(None) == s,
        Err(_) => false,
    }
}

pub fn is_valid_nonce(s: &str) -> bool {
    s.len() == NONCE_HEX_LEN
        && s.starts_with("0x")
        && s[2..].chars().all(|c| c.is_ascii_hexdigit())
}

/// The commitment engine's hash, for re-deriving a commitment before submitting.
pub fn calculate_commitment(vote: &VoteData) -> Result<B256> {
    commitment::commitment_hash(vote)
}
