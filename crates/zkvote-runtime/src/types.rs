//! Core types for commit-reveal judge voting
//!
//! `VoteData` is the judge's private ballot as entered (raw strings, so that
//! malformed input can be reported rather than rejected by the type system).
//! Everything derived from it is strongly typed.

use std::{fs, path::Path, path::PathBuf};

use alloy_primitives::{Address, B256};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ZkVoteError};

/// Lowest score a judge may award
pub const MIN_POINTS: i64 = 0;
/// Highest score a judge may award; the circuit enforces the same bound
pub const MAX_POINTS: i64 = 100;

/// One judge's assessment of one participant
///
/// # Examples
///
/// ```
/// use zkvote_runtime::VoteData;
///
/// let vote = VoteData::new(
///     "0x1111111111111111111111111111111111111111",
///     "0x2222222222222222222222222222222222222222",
///     85,
///     format!("0x{}", "ab".repeat(32)),
/// );
/// assert_eq!(vote.points, 85);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VoteData {
    pub judge: String,
    pub participant: String,
    pub points: i64,
    /// `0x` + 64 hex characters; secret until reveal
    pub nonce: String,
}

impl VoteData {
    pub fn new(
        judge: impl Into<String>,
        participant: impl Into<String>,
        points: i64,
        nonce: impl Into<String>,
    ) -> Self {
        Self { judge: judge.into(), participant: participant.into(), points, nonce: nonce.into() }
    }
}

/// The public, pre-reveal artifact of a vote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteCommitment {
    pub commitment: B256,
    /// Client-side bookkeeping only (unix seconds)
    pub timestamp: u64,
}

impl VoteCommitment {
    /// `0x`-prefixed lower-case hex, 66 characters
    pub fn to_hex(&self) -> String {
        hex_b256(&self.commitment)
    }
}

/// Values disclosed to a verifier alongside the proof
///
/// Ordered as `[commitment, points, judge, binding]`. `binding` is the
/// in-circuit Poseidon commitment, stored as the field element's canonical
/// little-endian representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublicSignals {
    pub commitment: B256,
    pub points: u64,
    pub judge: Address,
    pub binding: B256,
}

impl PublicSignals {
    pub const LEN: usize = 4;

    /// String rendering in signal order
    pub fn to_vec(&self) -> Vec<String> {
        vec![
            hex_b256(&self.commitment),
            self.points.to_string(),
            format!("0x{}", hex::encode(self.judge.as_slice())),
            hex_b256(&self.binding),
        ]
    }

    pub fn from_slice(signals: &[String]) -> Result<Self> {
        if signals.len() != Self::LEN {
            return Err(ZkVoteError::invalid_proof(format!(
                "expected {} public signals, got {}",
                Self::LEN,
                signals.len()
            )));
        }

        let points = signals[1]
            .parse::<u64>()
            .map_err(|e| ZkVoteError::invalid_proof(format!("points signal: {}", e)))?;

        Ok(Self {
            commitment: parse_b256(&signals[0])?,
            points,
            judge: Address::from_slice(&parse_fixed::<20>(&signals[2])?),
            binding: parse_b256(&signals[3])?,
        })
    }
}

fn parse_fixed<const N: usize>(s: &str) -> Result<[u8; N]> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(digits)
        .map_err(|e| ZkVoteError::invalid_proof(format!("signal {:?}: {}", s, e)))?;
    bytes.try_into().map_err(|_| ZkVoteError::invalid_proof(format!("signal {:?}: bad width", s)))
}

fn parse_b256(s: &str) -> Result<B256> {
    parse_fixed::<32>(s).map(B256::from)
}

pub(crate) fn hex_b256(value: &B256) -> String {
    format!("0x{}", hex::encode(value.as_slice()))
}

/// Reveal-time proof artifact
///
/// `proof` is opaque at this layer; its internal structure belongs to the
/// proving backend that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZkProof {
    pub proof: Vec<u8>,
    pub public_signals: PublicSignals,
}

const PAYLOAD_VERSION: u8 = 1;
const PAYLOAD_HEADER_LEN: usize = 1 + 32 + 8 + 20 + 32 + 4;

impl ZkProof {
    pub fn new(proof: Vec<u8>, public_signals: PublicSignals) -> Self {
        Self { proof, public_signals }
    }

    pub fn size(&self) -> usize {
        self.proof.len()
    }

    /// Reveal payload layout:
    /// `version(1) | commitment(32) | points(8, BE) | judge(20) | binding(32) | len(4, BE) | proof`
    pub fn to_bytes(&self) -> Vec<u8> {
        let signals = &self.public_signals;
        let mut out = Vec::with_capacity(PAYLOAD_HEADER_LEN + self.proof.len());
        out.push(PAYLOAD_VERSION);
        out.extend_from_slice(signals.commitment.as_slice());
        out.extend_from_slice(&signals.points.to_be_bytes());
        out.extend_from_slice(signals.judge.as_slice());
        out.extend_from_slice(signals.binding.as_slice());
        out.extend_from_slice(&(self.proof.len() as u32).to_be_bytes());
        out.extend_from_slice(&self.proof);
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < PAYLOAD_HEADER_LEN {
            return Err(ZkVoteError::invalid_proof("reveal payload truncated"));
        }
        if bytes[0] != PAYLOAD_VERSION {
            return Err(ZkVoteError::invalid_proof(format!(
                "unsupported reveal payload version {}",
                bytes[0]
            )));
        }

        let (commitment, rest) = bytes[1..].split_at(32);
        let (points, rest) = rest.split_at(8);
        let (judge, rest) = rest.split_at(20);
        let (binding, rest) = rest.split_at(32);
        let (len, proof) = rest.split_at(4);

        let mut len_bytes = [0u8; 4];
        len_bytes.copy_from_slice(len);
        if u32::from_be_bytes(len_bytes) as usize != proof.len() {
            return Err(ZkVoteError::invalid_proof("reveal payload length mismatch"));
        }
        let mut points_bytes = [0u8; 8];
        points_bytes.copy_from_slice(points);

        Ok(Self {
            proof: proof.to_vec(),
            public_signals: PublicSignals {
                commitment: B256::from_slice(commitment),
                points: u64::from_be_bytes(points_bytes),
                judge: Address::from_slice(judge),
                binding: B256::from_slice(binding),
            },
        })
    }
}

/// Voting protocol phase, owned by the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    Commit,
    Reveal,
    Finalized,
}

/// Aggregate of revealed, verified votes for one participant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantScore {
    pub participant: Address,
    pub total_points: u64,
    pub vote_count: u64,
    pub is_winner: bool,
    /// 1-based rank, 0 when the participant has no revealed votes
    pub position: u64,
}

impl ParticipantScore {
    pub fn empty(participant: Address) -> Self {
        Self { participant, total_points: 0, vote_count: 0, is_winner: false, position: 0 }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotingStats {
    pub committed: u64,
    pub revealed: u64,
    pub total: u64,
}

/// Prover parameters
///
/// Largest circuit size parameter the prover accepts
pub const MAX_K: u32 = 24;

/// The circuit has `2^k` rows; `cache_dir` holds the generated IPA parameters.
///
/// # Examples
///
/// ```
/// use zkvote_runtime::ProverConfig;
///
/// let config = ProverConfig::default();
/// assert_eq!(config.k(), 9);
/// assert_eq!(config.num_rows(), 512);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProverConfig {
    #[serde(default = "ProverConfig::default_k")]
    k: u32,
    #[serde(default = "ProverConfig::default_cache_dir")]
    cache_dir: PathBuf,
}

impl Default for ProverConfig {
    fn default() -> Self {
        Self { k: Self::default_k(), cache_dir: Self::default_cache_dir() }
    }
}

impl ProverConfig {
    pub fn new(k: u32, cache_dir: impl Into<PathBuf>) -> Self {
        Self { k, cache_dir: cache_dir.into() }
    }

    fn default_k() -> u32 {
        9
    }

    fn default_cache_dir() -> PathBuf {
        PathBuf::from(".zkvote_cache")
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn k(&self) -> u32 {
        self.k
    }

    /// Returns the number of rows in the circuit (2^k), saturating at `usize::MAX`
    pub fn num_rows(&self) -> usize {
        1usize.checked_shl(self.k).unwrap_or(usize::MAX)
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn with_k(mut self, k: u32) -> Self {
        self.k = k;
        self
    }

    pub fn with_cache_dir(mut self, cache_dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = cache_dir.into();
        self
    }
}
