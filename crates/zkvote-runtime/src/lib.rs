//! zkvote runtime
//!
//! Shared types, error handling, the commitment engine and the ledger
//! contract interface for commit-reveal judge voting.

pub mod commitment;
pub mod error;
pub mod ledger;
pub mod types;
pub mod utils;

pub use alloy_primitives::{Address, B256};

pub use commitment::{commit, commitment_hash, EncodedVote};
pub use error::{ProofFailureKind, Rejection, RejectionReason, Result, ZkVoteError};
pub use ledger::{
    LocalSigner, PendingTransaction, Receipt, RevealCall, Signer, TxHash, TxKind, VotingLedger,
};
pub use types::{
    ParticipantScore, Phase, ProverConfig, PublicSignals, VoteCommitment, VoteData, VotingStats,
    ZkProof, MAX_K, MAX_POINTS, MIN_POINTS,
};
pub use utils::{calculate_commitment, check_vote_data, generate_nonce, validate_vote_data};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_participant_score_empty() {
        let score = ParticipantScore::empty(Address::ZERO);
        assert_eq!(score.total_points, 0);
        assert_eq!(score.vote_count, 0);
        assert_eq!(score.position, 0);
        assert!(!score.is_winner);
    }

    #[test]
    fn test_voting_stats_default() {
        assert_eq!(VotingStats::default(), VotingStats { committed: 0, revealed: 0, total: 0 });
    }

    #[test]
    fn test_prover_config_builders() {
        let config = ProverConfig::default().with_k(11).with_cache_dir("/tmp/keys");
        assert_eq!(config.k(), 11);
        assert_eq!(config.num_rows(), 2048);
        assert_eq!(config.cache_dir(), std::path::Path::new("/tmp/keys"));
    }

    #[test]
    fn test_local_signer_from_str() {
        let signer: LocalSigner = "0x1111111111111111111111111111111111111111".parse().unwrap();
        assert_eq!(signer.address(), Address::from([0x11; 20]));
        assert!("nope".parse::<LocalSigner>().is_err());
    }
}
