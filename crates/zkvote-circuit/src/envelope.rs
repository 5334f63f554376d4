//! Versioned proof envelope
//!
//! The bytes carried in `ZkProof::proof`. The transcript inside is owned by
//! the backend named in the envelope; nothing outside this crate looks at it.

use serde::{Deserialize, Serialize};
use zkvote_runtime::{Result, ZkVoteError};

pub const ENVELOPE_VERSION: u8 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProofBackend {
    /// halo2 PLONK with IPA commitments over the Pasta cycle, Blake2b transcript
    Halo2IpaPasta,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofEnvelope {
    pub version: u8,
    pub backend: ProofBackend,
    pub k: u32,
    pub transcript: Vec<u8>,
}

impl ProofEnvelope {
    pub fn new(backend: ProofBackend, k: u32, transcript: Vec<u8>) -> Self {
        Self { version: ENVELOPE_VERSION, backend, k, transcript }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| ZkVoteError::serialization(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let envelope: Self = bincode::deserialize(bytes)
            .map_err(|e| ZkVoteError::invalid_proof(format!("undecodable envelope: {}", e)))?;

        if envelope.version != ENVELOPE_VERSION {
            return Err(ZkVoteError::invalid_proof(format!(
                "unsupported envelope version {}",
                envelope.version
            )));
        }
        if envelope.transcript.is_empty() {
            return Err(ZkVoteError::invalid_proof("empty transcript"));
        }

        Ok(envelope)
    }
}
