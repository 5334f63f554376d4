//! Proof generation and verification through the Halo2 backend

use std::sync::OnceLock;

use zkvote_circuit::{Halo2Backend, ProofEnvelope, VoteProver, VoteVerifier};
use zkvote_runtime::{
    commit, generate_nonce, EncodedVote, ProofFailureKind, ProverConfig, VoteData, ZkVoteError,
};

const JUDGE: &str = "0x1111111111111111111111111111111111111111";
const PARTICIPANT: &str = "0x1234567890123456789012345678901234567890";

fn backend() -> &'static Halo2Backend {
    static BACKEND: OnceLock<Halo2Backend> = OnceLock::new();
    BACKEND.get_or_init(|| {
        let cache = tempfile::tempdir().unwrap();
        Halo2Backend::setup(&ProverConfig::new(9, cache.path())).unwrap()
    })
}

fn vote(points: i64) -> VoteData {
    VoteData::new(JUDGE, PARTICIPANT, points, generate_nonce())
}

#[test]
fn test_end_to_end_commit_prove_verify() {
    let vote = vote(85);
    let commitment = commit(&vote).unwrap();

    let proof = backend().prove_valid_vote(&vote).unwrap();
    assert_eq!(proof.public_signals.commitment, commitment.commitment);
    assert_eq!(proof.public_signals.to_vec()[0], commitment.to_hex());

    assert!(backend().verify(&proof).unwrap());
}

#[test]
fn test_altered_points_signal_rejected() {
    let proof = backend().prove_valid_vote(&vote(85)).unwrap();

    let mut tampered = proof.clone();
    tampered.public_signals.points = 90;

    assert!(!backend().verify(&tampered).unwrap());
}

#[test]
fn test_altered_judge_signal_rejected() {
    let proof = backend().prove_valid_vote(&vote(85)).unwrap();

    let mut tampered = proof.clone();
    tampered.public_signals.judge = zkvote_runtime::Address::from([0x99; 20]);

    assert!(!backend().verify(&tampered).unwrap());
}

#[test]
fn test_invalid_vote_fails_fast() {
    let err = backend().prove_valid_vote(&vote(150)).unwrap_err();
    assert!(matches!(err, ZkVoteError::InvalidVoteData(_)));

    let err = backend().prove_valid_vote(&VoteData::new(JUDGE, "0x1234", 85, generate_nonce()));
    assert!(matches!(err, Err(ZkVoteError::InvalidVoteData(_))));
}

#[test]
fn test_out_of_range_witness_is_unsatisfied() {
    let encoded = EncodedVote::from_vote(&vote(150)).unwrap();

    let err = backend().prove_encoded(&encoded).unwrap_err();
    assert!(matches!(
        err,
        ZkVoteError::ProofGenerationFailed { kind: ProofFailureKind::Unsatisfied, .. }
    ));
}

#[test]
fn test_verify_disclosed_checks_every_field() {
    let vote = vote(85);
    let encoded = EncodedVote::from_vote(&vote).unwrap();
    let proof = backend().prove_valid_vote(&vote).unwrap();

    assert!(backend().verify_disclosed(&proof, &encoded).unwrap());

    let mut other_points = encoded;
    other_points.points = 90;
    assert!(!backend().verify_disclosed(&proof, &other_points).unwrap());

    let mut other_nonce = encoded;
    other_nonce.nonce = zkvote_runtime::B256::from([0x01; 32]);
    assert!(!backend().verify_disclosed(&proof, &other_nonce).unwrap());
}

#[test]
fn test_corrupted_transcript_rejected() {
    let mut proof = backend().prove_valid_vote(&vote(42)).unwrap();

    let mut envelope = ProofEnvelope::from_bytes(&proof.proof).unwrap();
    let mid = envelope.transcript.len() / 2;
    envelope.transcript[mid] ^= 0x01;
    proof.proof = envelope.to_bytes().unwrap();

    // A flipped byte either fails to decode as a point or fails the check.
    assert!(!backend().verify(&proof).unwrap_or(false));
}

#[test]
fn test_envelope_k_mismatch_is_invalid_proof() {
    let mut proof = backend().prove_valid_vote(&vote(10)).unwrap();

    let mut envelope = ProofEnvelope::from_bytes(&proof.proof).unwrap();
    envelope.k += 1;
    proof.proof = envelope.to_bytes().unwrap();

    assert!(matches!(backend().verify(&proof), Err(ZkVoteError::InvalidProof(_))));
}

#[test]
fn test_reveal_payload_survives_serialization() {
    let proof = backend().prove_valid_vote(&vote(100)).unwrap();
    let decoded = zkvote_runtime::ZkProof::from_bytes(&proof.to_bytes()).unwrap();

    assert_eq!(decoded, proof);
    assert!(backend().verify(&decoded).unwrap());
}

#[test]
fn test_separate_backends_share_a_cache() {
    let cache = tempfile::tempdir().unwrap();
    let prover = Halo2Backend::setup(&ProverConfig::new(9, cache.path())).unwrap();
    let verifier = Halo2Backend::setup(&ProverConfig::new(9, cache.path())).unwrap();

    assert_eq!(prover.metadata().vk_fingerprint, verifier.metadata().vk_fingerprint);

    let proof = prover.prove_valid_vote(&vote(42)).unwrap();
    assert!(verifier.verify(&proof).unwrap());
}

#[test]
fn test_commitment_signal_only_checked_against_disclosed_vote() {
    let vote = vote(73);
    let mut proof = backend().prove_valid_vote(&vote).unwrap();
    proof.public_signals.commitment = zkvote_runtime::B256::repeat_byte(0x42);

    // the circuit attests binding, points and judge, not the keccak commitment
    assert!(backend().verify(&proof).unwrap());

    let disclosed = EncodedVote::from_vote(&vote).unwrap();
    assert!(!backend().verify_disclosed(&proof, &disclosed).unwrap());
}

#[test]
fn test_setup_rejects_oversized_k() {
    let cache = tempfile::tempdir().unwrap();
    let result = Halo2Backend::setup(&ProverConfig::new(zkvote_runtime::MAX_K + 1, cache.path()));

    assert!(matches!(result, Err(ZkVoteError::ProofGenerationFailed { .. })));
    assert!(!cache.path().join("params_k25.bin").exists());
}
