//! Voting client
//!
//! Drives the two-phase protocol against a [`VotingLedger`]. Phase is
//! never cached: every `is_*_phase` call goes to the ledger, and the ledger
//! alone decides whether a submission is acceptable.

use alloy_primitives::{Address, B256};
use tracing::{debug, info, warn};
use zkvote_circuit::VoteProver;
use zkvote_runtime::{
    check_vote_data, commit, EncodedVote, ParticipantScore, PendingTransaction, Receipt,
    Result, RevealCall, Signer, TxKind, VoteCommitment, VoteData, VotingLedger, VotingStats,
    ZkProof, ZkVoteError,
};

use crate::ballot::{BallotStatus, JudgeBallot};

pub struct ZkVotingClient<L, P> {
    ledger: L,
    prover: P,
}

impl<L: VotingLedger, P: VoteProver> ZkVotingClient<L, P> {
    pub fn new(ledger: L, prover: P) -> Self {
        Self { ledger, prover }
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn prover(&self) -> &P {
        &self.prover
    }

    /// Local only; no ledger call.
    pub fn generate_vote_commitment(&self, vote: &VoteData) -> Result<VoteCommitment> {
        commit(vote)
    }

    /// Prove that `vote` is in range and bound to its commitment.
    ///
    /// Invalid vote data fails before the prover is touched.
    pub fn generate_zk_proof(&self, vote: &VoteData) -> Result<ZkProof> {
        check_vote_data(vote)?;
        let proof = self.prover.prove_valid_vote(vote)?;
        debug!(size = proof.size(), "proof generated");
        Ok(proof)
    }

    pub fn commit_vote<S: Signer + ?Sized>(
        &self,
        signer: &S,
        commitment: B256,
    ) -> Result<PendingTransaction<'_, L>> {
        let from = signer.address();
        let tx_hash = self.ledger.commit_vote(from, commitment)?;
        info!(%from, %tx_hash, "commitment submitted");

        Ok(PendingTransaction::new(&self.ledger, tx_hash, TxKind::Commit))
    }

    pub fn reveal_vote<S: Signer + ?Sized>(
        &self,
        signer: &S,
        vote: &VoteData,
        proof: &ZkProof,
    ) -> Result<PendingTransaction<'_, L>> {
        check_vote_data(vote)?;
        let encoded = EncodedVote::from_vote(vote)
            .map_err(|e| ZkVoteError::invalid_vote_data(e.to_string()))?;
        if proof.public_signals.points != encoded.points {
            warn!(
                revealed = encoded.points,
                proven = proof.public_signals.points,
                "revealing points that differ from the proof"
            );
        }

        let from = signer.address();
        let call = RevealCall {
            participant: encoded.participant,
            points: encoded.points,
            nonce: encoded.nonce,
            proof: proof.to_bytes(),
        };
        let tx_hash = self.ledger.reveal_vote(from, call)?;
        info!(%from, participant = %encoded.participant, %tx_hash, "reveal submitted");

        Ok(PendingTransaction::new(&self.ledger, tx_hash, TxKind::Reveal))
    }

    pub fn get_voting_stats(&self) -> Result<VotingStats> {
        self.ledger.voting_stats()
    }

    pub fn get_participant_score(&self, participant: Address) -> Result<ParticipantScore> {
        self.ledger.participant_score(participant)
    }

    pub fn get_winners(&self) -> Result<Vec<Address>> {
        self.ledger.winners()
    }

    pub fn is_commit_phase(&self) -> Result<bool> {
        self.ledger.is_commit_phase()
    }

    pub fn is_reveal_phase(&self) -> Result<bool> {
        self.ledger.is_reveal_phase()
    }

    /// Commit a drafted ballot and wait for the ledger to confirm it.
    ///
    /// The ballot stays `Drafted` unless the commitment is confirmed.
    pub fn commit_ballot<S: Signer + ?Sized>(
        &self,
        signer: &S,
        ballot: &mut JudgeBallot,
    ) -> Result<Receipt> {
        ballot.expect_status(BallotStatus::Drafted)?;
        ensure_judge(signer, ballot)?;

        let receipt = self.commit_vote(signer, ballot.commitment().commitment)?.wait()?;
        ballot.mark_committed(receipt);
        Ok(receipt)
    }

    /// Prove, reveal and wait for confirmation of a committed ballot.
    ///
    /// The ballot stays `Committed` unless the reveal is confirmed.
    pub fn reveal_ballot<S: Signer + ?Sized>(
        &self,
        signer: &S,
        ballot: &mut JudgeBallot,
    ) -> Result<Receipt> {
        ballot.expect_status(BallotStatus::Committed)?;
        ensure_judge(signer, ballot)?;

        let proof = self.generate_zk_proof(ballot.vote())?;
        let receipt = self.reveal_vote(signer, ballot.vote(), &proof)?.wait()?;
        ballot.mark_revealed(receipt);
        Ok(receipt)
    }
}

fn ensure_judge<S: Signer + ?Sized>(signer: &S, ballot: &JudgeBallot) -> Result<()> {
    let from = signer.address();
    if from == ballot.judge() {
        Ok(())
    } else {
        Err(ZkVoteError::invalid_vote_data(format!(
            "signer {} is not the ballot's judge {}",
            from,
            ballot.judge()
        )))
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use zkvote_runtime::{LocalSigner, PublicSignals};

    /// Records submissions and confirms everything
    #[derive(Default)]
    struct RecordingLedger {
        commits: RefCell<Vec<(Address, B256)>>,
        reveals: RefCell<Vec<(Address, RevealCall)>>,
    }

    impl VotingLedger for RecordingLedger {
        fn commit_vote(&self, from: Address, commitment: B256) -> Result<B256> {
            self.commits.borrow_mut().push((from, commitment));
            Ok(B256::repeat_byte(1))
        }

        fn reveal_vote(&self, from: Address, call: RevealCall) -> Result<B256> {
            self.reveals.borrow_mut().push((from, call));
            Ok(B256::repeat_byte(2))
        }

        fn wait_for_receipt(&self, tx_hash: B256) -> Result<Receipt> {
            let kind =
                if tx_hash == B256::repeat_byte(1) { TxKind::Commit } else { TxKind::Reveal };
            Ok(Receipt { tx_hash, kind, from: Address::ZERO, sequence: 0 })
        }

        fn voting_stats(&self) -> Result<VotingStats> {
            Ok(VotingStats::default())
        }

        fn participant_score(&self, participant: Address) -> Result<ParticipantScore> {
            Ok(ParticipantScore::empty(participant))
        }

        fn winners(&self) -> Result<Vec<Address>> {
            Ok(Vec::new())
        }

        fn is_commit_phase(&self) -> Result<bool> {
            Ok(true)
        }

        fn is_reveal_phase(&self) -> Result<bool> {
            Ok(false)
        }
    }

    /// Fails the test if it is ever asked for a proof
    struct UnreachableProver;

    impl VoteProver for UnreachableProver {
        fn prove_valid_vote(&self, _vote: &VoteData) -> Result<ZkProof> {
            panic!("prover must not run on invalid vote data");
        }
    }

    /// Echoes the vote's signals with an empty transcript
    struct EchoProver;

    impl VoteProver for EchoProver {
        fn prove_valid_vote(&self, vote: &VoteData) -> Result<ZkProof> {
            let encoded = EncodedVote::from_vote(vote)?;
            Ok(ZkProof::new(
                vec![0xaa],
                PublicSignals {
                    commitment: encoded.commitment(),
                    points: encoded.points,
                    judge: encoded.judge,
                    binding: B256::ZERO,
                },
            ))
        }
    }

    fn vote(points: i64) -> VoteData {
        VoteData::new(
            "0x1111111111111111111111111111111111111111",
            "0x2222222222222222222222222222222222222222",
            points,
            format!("0x{}", "ab".repeat(32)),
        )
    }

    #[test]
    fn test_invalid_vote_never_reaches_prover() {
        let client = ZkVotingClient::new(RecordingLedger::default(), UnreachableProver);
        for points in [-1, 101, 150] {
            let err = client.generate_zk_proof(&vote(points)).unwrap_err();
            assert!(matches!(err, ZkVoteError::InvalidVoteData(_)));
        }
    }

    #[test]
    fn test_invalid_reveal_never_reaches_ledger() {
        let client = ZkVotingClient::new(RecordingLedger::default(), EchoProver);
        let proof = client.generate_zk_proof(&vote(50)).unwrap();
        let signer = LocalSigner::new(Address::from([0x11; 20]));

        let err = client.reveal_vote(&signer, &vote(101), &proof).unwrap_err();
        assert!(matches!(err, ZkVoteError::InvalidVoteData(_)));
        assert!(client.ledger().reveals.borrow().is_empty());
    }

    #[test]
    fn test_reveal_call_carries_disclosed_vote() {
        let client = ZkVotingClient::new(RecordingLedger::default(), EchoProver);
        let vote = vote(85);
        let proof = client.generate_zk_proof(&vote).unwrap();
        let signer = LocalSigner::new(Address::from([0x11; 20]));

        let pending = client.reveal_vote(&signer, &vote, &proof).unwrap();
        assert_eq!(pending.kind(), TxKind::Reveal);
        pending.wait().unwrap();

        let reveals = client.ledger().reveals.borrow();
        let (from, call) = &reveals[0];
        assert_eq!(*from, Address::from([0x11; 20]));
        assert_eq!(call.participant, Address::from([0x22; 20]));
        assert_eq!(call.points, 85);
        assert_eq!(call.nonce, B256::repeat_byte(0xab));
        assert_eq!(ZkProof::from_bytes(&call.proof).unwrap(), proof);
    }

    #[test]
    fn test_commit_uses_signer_identity() {
        let client = ZkVotingClient::new(RecordingLedger::default(), EchoProver);
        let commitment = client.generate_vote_commitment(&vote(85)).unwrap();
        let signer = LocalSigner::new(Address::from([0x11; 20]));

        let receipt = client.commit_vote(&signer, commitment.commitment).unwrap().wait().unwrap();
        assert_eq!(receipt.kind, TxKind::Commit);
        assert_eq!(
            client.ledger().commits.borrow().as_slice(),
            &[(Address::from([0x11; 20]), commitment.commitment)]
        );
    }

    #[test]
    fn test_ballot_requires_its_judge() {
        let client = ZkVotingClient::new(RecordingLedger::default(), EchoProver);
        let mut ballot = JudgeBallot::new(vote(85)).unwrap();
        let stranger = LocalSigner::new(Address::from([0x99; 20]));

        assert!(client.commit_ballot(&stranger, &mut ballot).is_err());
        assert_eq!(ballot.status(), BallotStatus::Drafted);
        assert!(client.ledger().commits.borrow().is_empty());
    }

    #[test]
    fn test_ballot_cannot_reveal_before_commit() {
        let client = ZkVotingClient::new(RecordingLedger::default(), EchoProver);
        let mut ballot = JudgeBallot::new(vote(85)).unwrap();
        let signer = LocalSigner::new(ballot.judge());

        assert!(client.reveal_ballot(&signer, &mut ballot).is_err());
        client.commit_ballot(&signer, &mut ballot).unwrap();
        client.reveal_ballot(&signer, &mut ballot).unwrap();
        assert_eq!(ballot.status(), BallotStatus::Revealed);
        assert!(client.commit_ballot(&signer, &mut ballot).is_err());
    }
}
