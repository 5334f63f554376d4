//! Error types for the zkvote toolkit

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for zkvote operations
pub type Result<T> = std::result::Result<T, ZkVoteError>;

/// Main error type for zkvote operations
///
/// The four protocol-level kinds (`InvalidVoteData`, `ProofGenerationFailed`,
/// `LedgerRejected`, `NetworkError`) are kept as distinct variants so callers
/// can render phase-specific guidance without parsing messages.
#[derive(Debug, Error)]
pub enum ZkVoteError {
    /// Local validation failure; never sent to the ledger
    #[error("Invalid vote data: {0}")]
    InvalidVoteData(String),

    /// The prover could not produce a proof for this vote
    #[error("Proof generation failed ({kind}): {detail}")]
    ProofGenerationFailed { kind: ProofFailureKind, detail: String },

    /// The ledger refused the call
    #[error("Ledger rejected: {0}")]
    LedgerRejected(Rejection),

    /// Transient transport failure talking to the ledger
    #[error("Network error: {0}")]
    NetworkError(String),

    /// A vote field could not be encoded for hashing
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Malformed or unsupported proof blob
    #[error("Invalid proof: {0}")]
    InvalidProof(String),

    /// Serialization or deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ZkVoteError {
    pub fn invalid_vote_data(msg: impl Into<String>) -> Self {
        Self::InvalidVoteData(msg.into())
    }

    pub fn unsatisfied(detail: impl Into<String>) -> Self {
        Self::ProofGenerationFailed { kind: ProofFailureKind::Unsatisfied, detail: detail.into() }
    }

    pub fn prover_fault(detail: impl Into<String>) -> Self {
        Self::ProofGenerationFailed { kind: ProofFailureKind::Backend, detail: detail.into() }
    }

    pub fn rejected(reason: RejectionReason, message: impl Into<String>) -> Self {
        Self::LedgerRejected(Rejection::new(reason, message))
    }

    pub fn network(msg: impl Into<String>) -> Self {
        Self::NetworkError(msg.into())
    }

    pub fn encoding(msg: impl Into<String>) -> Self {
        Self::Encoding(msg.into())
    }

    pub fn invalid_proof(msg: impl Into<String>) -> Self {
        Self::InvalidProof(msg.into())
    }

    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    /// Only transport failures are worth retrying unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::NetworkError(_))
    }

    /// The ledger's rejection reason, if this is a ledger rejection.
    pub fn rejection_reason(&self) -> Option<RejectionReason> {
        match self {
            Self::LedgerRejected(rejection) => Some(rejection.reason),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ZkVoteError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Distinguishes bad input that slipped past validation from a prover fault
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProofFailureKind {
    /// The witness does not satisfy the circuit
    Unsatisfied,
    /// Key generation, synthesis or transcript failure
    Backend,
}

impl fmt::Display for ProofFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unsatisfied => write!(f, "unsatisfied witness"),
            Self::Backend => write!(f, "prover backend"),
        }
    }
}

/// Why the ledger refused a call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RejectionReason {
    WrongPhase,
    DuplicateCommitment,
    MissingCommitment,
    AlreadyRevealed,
    CommitmentMismatch,
    ProofVerificationFailed,
    UnknownJudge,
    UnknownParticipant,
    Unauthorized,
    UnknownTransaction,
    Other,
}

/// A ledger rejection with its reason string, surfaced verbatim
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    pub reason: RejectionReason,
    pub message: String,
}

impl Rejection {
    pub fn new(reason: RejectionReason, message: impl Into<String>) -> Self {
        Self { reason, message: message.into() }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.reason, self.message)
    }
}
