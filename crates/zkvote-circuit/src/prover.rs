//! Native prover and verifier for the score circuit
//!
//! [`VoteProver`] and [`VoteVerifier`] are the capability seams; the ledger
//! and the voting client only see these traits. [`Halo2Backend`] implements
//! both with halo2 IPA over Pasta.

use halo2_proofs::{
    dev::MockProver,
    plonk::{create_proof, verify_proof, ProvingKey, SingleVerifier, VerifyingKey},
    poly::commitment::Params,
    transcript::{Blake2bRead, Blake2bWrite, Challenge255},
};
use halo2curves::pasta::{EqAffine, Fp};
use rand::rngs::OsRng;
use std::sync::Arc;
use tracing::{debug, info, warn};
use zkvote_runtime::{
    check_vote_data, EncodedVote, ProverConfig, PublicSignals, Result, VoteData, ZkProof,
    ZkVoteError, MAX_K,
};

use crate::circuit::{
    address_to_field, b256_to_field, field_to_b256, ScoreCircuit, ScoreWitness, BINDING_INPUTS,
};
use crate::envelope::{ProofBackend, ProofEnvelope};
use crate::keys::{CircuitShape, KeyManager, KeyMetadata};

pub const CIRCUIT_NAME: &str = "judge_score";

/// Builds reveal-time proofs for votes
pub trait VoteProver {
    /// Fails with `InvalidVoteData` before any witness generation when the
    /// vote does not validate.
    fn prove_valid_vote(&self, vote: &VoteData) -> Result<ZkProof>;
}

/// Checks proofs using only the proof blob and its public signals
pub trait VoteVerifier {
    /// `Ok(false)` for a well-formed proof that does not verify; `Err` for a
    /// blob that cannot be interpreted.
    ///
    /// Only the binding, points and judge signals are attested. The keccak
    /// commitment (signal 0) is carried along unchecked; use
    /// [`verify_disclosed`](Self::verify_disclosed) to bind it to a vote.
    fn verify(&self, proof: &ZkProof) -> Result<bool>;

    /// Whether `proof` certifies exactly this disclosed vote: the signals
    /// must re-derive from `vote` and the proof must verify.
    fn verify_disclosed(&self, proof: &ZkProof, vote: &EncodedVote) -> Result<bool>;
}

impl<P: VoteProver + ?Sized> VoteProver for &P {
    fn prove_valid_vote(&self, vote: &VoteData) -> Result<ZkProof> {
        (**self).prove_valid_vote(vote)
    }
}

impl<P: VoteProver + ?Sized> VoteProver for Arc<P> {
    fn prove_valid_vote(&self, vote: &VoteData) -> Result<ZkProof> {
        (**self).prove_valid_vote(vote)
    }
}

/// Public signals for a vote, as the circuit will expose them
pub fn public_signals(vote: &EncodedVote) -> PublicSignals {
    let witness = ScoreWitness::from_vote(vote);
    PublicSignals {
        commitment: vote.commitment(),
        points: vote.points,
        judge: vote.judge,
        binding: field_to_b256(&witness.binding()),
    }
}

/// Shape recorded in the key cache for the score circuit
pub const SCORE_SHAPE: CircuitShape =
    CircuitShape { name: CIRCUIT_NAME, public_inputs: 3, private_witnesses: BINDING_INPUTS };

pub struct Halo2Backend {
    k: u32,
    params: Params<EqAffine>,
    proving_key: ProvingKey<EqAffine>,
    verifying_key: VerifyingKey<EqAffine>,
    metadata: KeyMetadata,
}

impl Halo2Backend {
    /// Load (or generate) parameters from the cache and derive both keys.
    pub fn setup(config: &ProverConfig) -> Result<Self> {
        let k = config.k();
        if k > MAX_K {
            return Err(ZkVoteError::prover_fault(format!(
                "k={} exceeds the supported maximum of {}",
                k, MAX_K
            )));
        }
        let keys = KeyManager::new(config.cache_dir())
            .and_then(|manager| {
                let params = manager.params(k)?;
                let keys = manager.keys(&params, &ScoreCircuit::default(), SCORE_SHAPE)?;
                Ok((params, keys))
            })
            .map_err(|e| ZkVoteError::prover_fault(format!("{:#}", e)));
        let (params, keys) = keys?;

        Ok(Self {
            k,
            params,
            proving_key: keys.proving_key,
            verifying_key: keys.verifying_key,
            metadata: keys.metadata,
        })
    }

    pub fn k(&self) -> u32 {
        self.k
    }

    /// Cache metadata of the keys in use, including the verifying key fingerprint.
    pub fn metadata(&self) -> &KeyMetadata {
        &self.metadata
    }

    /// Prove an already-encoded vote without running the validator.
    ///
    /// The witness is checked against the circuit first, so a vote that
    /// slipped past validation fails as `Unsatisfied` instead of yielding a
    /// proof that will never verify.
    pub fn prove_encoded(&self, vote: &EncodedVote) -> Result<ZkProof> {
        let witness = ScoreWitness::from_vote(vote);
        let circuit = ScoreCircuit::new(&witness);
        let instances = witness.instances();

        let mock = MockProver::run(self.k, &circuit, vec![instances.clone()])
            .map_err(|e| ZkVoteError::prover_fault(format!("synthesis failed: {:?}", e)))?;
        if let Err(failures) = mock.verify() {
            warn!(failures = failures.len(), "score witness does not satisfy the circuit");
            return Err(ZkVoteError::unsatisfied(format!(
                "{} constraint(s) violated, first: {}",
                failures.len(),
                failures.first().map(|f| f.to_string()).unwrap_or_default()
            )));
        }

        debug!(k = self.k, "creating score proof");
        let mut transcript = Blake2bWrite::<_, EqAffine, Challenge255<_>>::init(vec![]);
        let instance_columns: &[&[Fp]] = &[instances.as_slice()];

        create_proof(
            &self.params,
            &self.proving_key,
            std::slice::from_ref(&circuit),
            &[instance_columns],
            OsRng,
            &mut transcript,
        )
        .map_err(|e| ZkVoteError::prover_fault(format!("create_proof: {:?}", e)))?;

        let envelope =
            ProofEnvelope::new(ProofBackend::Halo2IpaPasta, self.k, transcript.finalize());
        let proof = ZkProof::new(envelope.to_bytes()?, public_signals(vote));

        info!(size = proof.size(), "score proof generated");
        Ok(proof)
    }
}

impl VoteProver for Halo2Backend {
    fn prove_valid_vote(&self, vote: &VoteData) -> Result<ZkProof> {
        check_vote_data(vote)?;
        let encoded = EncodedVote::from_vote(vote)
            .map_err(|e| ZkVoteError::invalid_vote_data(e.to_string()))?;

        self.prove_encoded(&encoded)
    }
}

impl VoteVerifier for Halo2Backend {
    fn verify(&self, proof: &ZkProof) -> Result<bool> {
        let envelope = ProofEnvelope::from_bytes(&proof.proof)?;
        if envelope.backend != ProofBackend::Halo2IpaPasta {
            return Err(ZkVoteError::invalid_proof(format!(
                "unsupported backend {:?}",
                envelope.backend
            )));
        }
        if envelope.k != self.k {
            return Err(ZkVoteError::invalid_proof(format!(
                "proof built for k={}, verifier uses k={}",
                envelope.k, self.k
            )));
        }

        let signals = &proof.public_signals;
        let Some(binding) = b256_to_field(&signals.binding) else {
            return Err(ZkVoteError::invalid_proof("binding signal is not a field element"));
        };
        let instances = vec![binding, Fp::from(signals.points), address_to_field(&signals.judge)];
        let instance_columns: &[&[Fp]] = &[instances.as_slice()];

        let mut transcript =
            Blake2bRead::<_, EqAffine, Challenge255<_>>::init(envelope.transcript.as_slice());
        let strategy = SingleVerifier::new(&self.params);

        match verify_proof(
            &self.params,
            &self.verifying_key,
            strategy,
            &[instance_columns],
            &mut transcript,
        ) {
            Ok(_) => Ok(true),
            Err(e) => {
                debug!(error = ?e, "score proof rejected");
                Ok(false)
            }
        }
    }

    fn verify_disclosed(&self, proof: &ZkProof, vote: &EncodedVote) -> Result<bool> {
        if proof.public_signals != public_signals(vote) {
            return Ok(false);
        }
        self.verify(proof)
    }
}
