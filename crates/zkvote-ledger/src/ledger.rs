//! In-memory ledger
//!
//! Submissions are checked against the current phase and queued. The full
//! protocol rules run when the transaction is confirmed through
//! `wait_for_receipt`, one confirmation at a time behind the state lock, so
//! a duplicate raced in before the first confirms is rejected at its own
//! confirmation.
//!
//! Closing a phase resolves every call still queued for it as `WrongPhase`,
//! so the queue only holds calls for the open phase. Resolved outcomes are
//! kept for the ledger's lifetime to make receipts repeatable.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use alloy_primitives::{keccak256, Address, B256};
use tracing::{debug, info, warn};
use zkvote_circuit::VoteVerifier;
use zkvote_runtime::{
    EncodedVote, ParticipantScore, Phase, Receipt, Rejection, RejectionReason, Result, RevealCall,
    TxHash, TxKind, VotingLedger, VotingStats, ZkProof, ZkVoteError,
};

use crate::config::LedgerConfig;
use crate::tally::Scoreboard;

#[derive(Debug, Clone)]
enum QueuedCall {
    Commit { from: Address, commitment: B256 },
    Reveal { from: Address, call: RevealCall },
}

#[derive(Debug, Default)]
struct JudgeCommitments {
    /// commitment -> revealed
    entries: HashMap<B256, bool>,
}

#[derive(Debug)]
struct LedgerState {
    phase: Phase,
    submissions: u64,
    sequence: u64,
    queued: HashMap<TxHash, QueuedCall>,
    resolved: HashMap<TxHash, std::result::Result<Receipt, Rejection>>,
    commitments: HashMap<Address, JudgeCommitments>,
    revealed_pairs: HashSet<(Address, Address)>,
    scoreboard: Scoreboard,
}

impl LedgerState {
    fn new() -> Self {
        Self {
            phase: Phase::Commit,
            submissions: 0,
            sequence: 0,
            queued: HashMap::new(),
            resolved: HashMap::new(),
            commitments: HashMap::new(),
            revealed_pairs: HashSet::new(),
            scoreboard: Scoreboard::default(),
        }
    }

    fn committed_count(&self) -> u64 {
        self.commitments.values().map(|judge| judge.entries.len() as u64).sum()
    }

    fn revealed_count(&self) -> u64 {
        self.revealed_pairs.len() as u64
    }
}

fn reject(reason: RejectionReason, message: impl Into<String>) -> Rejection {
    Rejection::new(reason, message)
}

pub struct InMemoryLedger {
    config: LedgerConfig,
    verifier: Arc<dyn VoteVerifier + Send + Sync>,
    state: Mutex<LedgerState>,
}

impl InMemoryLedger {
    pub fn new(config: LedgerConfig, verifier: Arc<dyn VoteVerifier + Send + Sync>) -> Self {
        info!(
            judges = config.judges.len(),
            participants = config.participants.len(),
            winner_slots = config.winner_slots,
            "ledger opened in commit phase"
        );
        Self { config, verifier, state: Mutex::new(LedgerState::new()) }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn phase(&self) -> Result<Phase> {
        Ok(self.state()?.phase)
    }

    /// Close the commit phase. Admin only.
    pub fn open_reveal(&self, from: Address) -> Result<()> {
        self.transition(from, Phase::Commit, Phase::Reveal)
    }

    /// Close the reveal phase and freeze the results. Admin only.
    pub fn finalize(&self, from: Address) -> Result<()> {
        self.transition(from, Phase::Reveal, Phase::Finalized)
    }

    fn transition(&self, from: Address, expected: Phase, next: Phase) -> Result<()> {
        if from != self.config.admin {
            return Err(ZkVoteError::rejected(
                RejectionReason::Unauthorized,
                format!("{} is not the ledger admin", from),
            ));
        }

        let mut state = self.state()?;
        if state.phase != expected {
            return Err(ZkVoteError::rejected(
                RejectionReason::WrongPhase,
                format!("cannot move to {:?} from {:?}", next, state.phase),
            ));
        }

        state.phase = next;
        let stale: Vec<TxHash> = state.queued.drain().map(|(tx_hash, _)| tx_hash).collect();
        for tx_hash in &stale {
            let rejection = reject(
                RejectionReason::WrongPhase,
                format!("{:?} phase closed before confirmation", expected),
            );
            state.resolved.insert(*tx_hash, Err(rejection));
        }

        info!(
            phase = ?next,
            committed = state.committed_count(),
            revealed = state.revealed_count(),
            dropped = stale.len(),
            "phase advanced"
        );
        Ok(())
    }

    fn state(&self) -> Result<MutexGuard<'_, LedgerState>> {
        self.state
            .lock()
            .map_err(|_| ZkVoteError::rejected(RejectionReason::Other, "ledger state poisoned"))
    }

    fn submit(&self, call: QueuedCall) -> Result<TxHash> {
        let mut state = self.state()?;

        let (kind, from, required) = match &call {
            QueuedCall::Commit { from, .. } => (TxKind::Commit, *from, Phase::Commit),
            QueuedCall::Reveal { from, .. } => (TxKind::Reveal, *from, Phase::Reveal),
        };
        if state.phase != required {
            warn!(%kind, %from, phase = ?state.phase, "submission outside its phase");
            return Err(ZkVoteError::LedgerRejected(reject(
                RejectionReason::WrongPhase,
                format!("{} is only accepted during the {:?} phase", kind, required),
            )));
        }
        if !self.config.is_judge(&from) {
            return Err(ZkVoteError::LedgerRejected(reject(
                RejectionReason::UnknownJudge,
                format!("{} is not a registered judge", from),
            )));
        }

        state.submissions += 1;
        let tx_hash = tx_hash(kind, &from, state.submissions, &call);
        state.queued.insert(tx_hash, call);

        debug!(%kind, %from, %tx_hash, "transaction queued");
        Ok(tx_hash)
    }

    fn apply(
        &self,
        state: &mut LedgerState,
        call: &QueuedCall,
    ) -> std::result::Result<TxKind, Rejection> {
        match call {
            QueuedCall::Commit { from, commitment } => {
                self.apply_commit(state, *from, *commitment)?;
                Ok(TxKind::Commit)
            }
            QueuedCall::Reveal { from, call } => {
                self.apply_reveal(state, *from, call)?;
                Ok(TxKind::Reveal)
            }
        }
    }

    fn apply_commit(
        &self,
        state: &mut LedgerState,
        from: Address,
        commitment: B256,
    ) -> std::result::Result<(), Rejection> {
        if state.phase != Phase::Commit {
            return Err(reject(RejectionReason::WrongPhase, "commit phase is closed"));
        }

        let slots = self.config.participants.len();
        let judge = state.commitments.entry(from).or_default();
        if judge.entries.contains_key(&commitment) {
            return Err(reject(
                RejectionReason::DuplicateCommitment,
                format!("commitment {} already recorded for {}", commitment, from),
            ));
        }
        // A commitment does not name its participant, so a judge gets one
        // slot per registered participant.
        if judge.entries.len() >= slots {
            return Err(reject(
                RejectionReason::DuplicateCommitment,
                format!("{} already committed {} votes, one per participant", from, slots),
            ));
        }
        judge.entries.insert(commitment, false);
        Ok(())
    }

    fn apply_reveal(
        &self,
        state: &mut LedgerState,
        from: Address,
        call: &RevealCall,
    ) -> std::result::Result<(), Rejection> {
        if state.phase != Phase::Reveal {
            return Err(reject(RejectionReason::WrongPhase, "reveal phase is not open"));
        }
        if !self.config.is_participant(&call.participant) {
            return Err(reject(
                RejectionReason::UnknownParticipant,
                format!("{} is not a registered participant", call.participant),
            ));
        }
        if state.revealed_pairs.contains(&(from, call.participant)) {
            return Err(reject(
                RejectionReason::AlreadyRevealed,
                format!("{} already revealed a vote for {}", from, call.participant),
            ));
        }

        let vote = EncodedVote {
            judge: from,
            participant: call.participant,
            points: call.points,
            nonce: call.nonce,
        };
        let commitment = vote.commitment();

        let Some(judge) = state.commitments.get(&from) else {
            return Err(reject(
                RejectionReason::MissingCommitment,
                format!("{} made no commitment during the commit phase", from),
            ));
        };
        match judge.entries.get(&commitment) {
            None if judge.entries.values().all(|revealed| *revealed) => {
                return Err(reject(
                    RejectionReason::MissingCommitment,
                    format!("{} has no unrevealed commitment", from),
                ));
            }
            None => {
                return Err(reject(
                    RejectionReason::CommitmentMismatch,
                    format!(
                        "revealed vote re-derives to {}, which was never committed",
                        commitment
                    ),
                ));
            }
            Some(true) => {
                return Err(reject(
                    RejectionReason::AlreadyRevealed,
                    format!("commitment {} was already revealed", commitment),
                ));
            }
            Some(false) => {}
        }

        let proof = ZkProof::from_bytes(&call.proof)
            .map_err(|e| reject(RejectionReason::ProofVerificationFailed, e.to_string()))?;
        if proof.public_signals.commitment != commitment {
            return Err(reject(
                RejectionReason::CommitmentMismatch,
                "proof is bound to a different commitment",
            ));
        }
        match self.verifier.verify_disclosed(&proof, &vote) {
            Ok(true) => {}
            Ok(false) => {
                return Err(reject(
                    RejectionReason::ProofVerificationFailed,
                    "proof does not certify the revealed vote",
                ))
            }
            Err(e) => return Err(reject(RejectionReason::ProofVerificationFailed, e.to_string())),
        }

        if let Some(judge) = state.commitments.get_mut(&from) {
            judge.entries.insert(commitment, true);
        }
        state.revealed_pairs.insert((from, call.participant));
        let sequence = state.sequence + 1;
        state.scoreboard.record(call.participant, call.points, sequence);
        Ok(())
    }

    fn winner_slots(&self, state: &LedgerState) -> Option<usize> {
        (state.phase == Phase::Finalized).then_some(self.config.winner_slots)
    }
}

fn tx_hash(kind: TxKind, from: &Address, submission: u64, call: &QueuedCall) -> TxHash {
    let mut preimage = Vec::with_capacity(1 + 20 + 8 + 32);
    preimage.push(match kind {
        TxKind::Commit => 0u8,
        TxKind::Reveal => 1u8,
    });
    preimage.extend_from_slice(from.as_slice());
    preimage.extend_from_slice(&submission.to_be_bytes());
    match call {
        QueuedCall::Commit { commitment, .. } => preimage.extend_from_slice(commitment.as_slice()),
        QueuedCall::Reveal { call, .. } => {
            preimage.extend_from_slice(call.participant.as_slice());
            preimage.extend_from_slice(&call.points.to_be_bytes());
            preimage.extend_from_slice(call.nonce.as_slice());
            preimage.extend_from_slice(&call.proof);
        }
    }
    keccak256(preimage)
}

impl VotingLedger for InMemoryLedger {
    fn commit_vote(&self, from: Address, commitment: B256) -> Result<TxHash> {
        self.submit(QueuedCall::Commit { from, commitment })
    }

    fn reveal_vote(&self, from: Address, call: RevealCall) -> Result<TxHash> {
        self.submit(QueuedCall::Reveal { from, call })
    }

    fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<Receipt> {
        let mut state = self.state()?;

        if let Some(resolved) = state.resolved.get(&tx_hash) {
            return resolved.clone().map_err(ZkVoteError::LedgerRejected);
        }

        let Some(call) = state.queued.remove(&tx_hash) else {
            return Err(ZkVoteError::rejected(
                RejectionReason::UnknownTransaction,
                format!("no transaction {}", tx_hash),
            ));
        };
        let from = match &call {
            QueuedCall::Commit { from, .. } | QueuedCall::Reveal { from, .. } => *from,
        };

        let outcome = self.apply(&mut state, &call).map(|kind| {
            state.sequence += 1;
            Receipt { tx_hash, kind, from, sequence: state.sequence }
        });

        match &outcome {
            Ok(receipt) => {
                info!(
                    kind = %receipt.kind,
                    %from,
                    sequence = receipt.sequence,
                    "transaction accepted"
                )
            }
            Err(rejection) => warn!(%from, %rejection, "transaction rejected"),
        }

        state.resolved.insert(tx_hash, outcome.clone());
        outcome.map_err(ZkVoteError::LedgerRejected)
    }

    fn voting_stats(&self) -> Result<VotingStats> {
        let state = self.state()?;
        Ok(VotingStats {
            committed: state.committed_count(),
            revealed: state.revealed_count(),
            total: self.config.expected_ballots(),
        })
    }

    fn participant_score(&self, participant: Address) -> Result<ParticipantScore> {
        let state = self.state()?;
        Ok(state.scoreboard.score(participant, self.winner_slots(&state)))
    }

    fn winners(&self) -> Result<Vec<Address>> {
        let state = self.state()?;
        let Some(slots) = self.winner_slots(&state) else {
            return Ok(Vec::new());
        };
        Ok(state.scoreboard.ranking().into_iter().take(slots).collect())
    }

    fn is_commit_phase(&self) -> Result<bool> {
        Ok(self.state()?.phase == Phase::Commit)
    }

    fn is_reveal_phase(&self) -> Result<bool> {
        Ok(self.state()?.phase == Phase::Reveal)
    }
}
