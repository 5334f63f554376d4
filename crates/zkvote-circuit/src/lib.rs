//! zkvote circuit
//!
//! The score circuit, its keys, and the proof backend used at reveal time.

pub mod circuit;
pub mod envelope;
pub mod keys;
pub mod prover;

pub use circuit::{ScoreChip, ScoreCircuit, ScoreConfig, ScoreWitness, RANGE_BITS};
pub use envelope::{ProofBackend, ProofEnvelope};
pub use keys::{vk_fingerprint, CircuitKeys, CircuitShape, KeyManager, KeyMetadata};
pub use prover::{
    public_signals, Halo2Backend, VoteProver, VoteVerifier, CIRCUIT_NAME, SCORE_SHAPE,
};
