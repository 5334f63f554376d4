//! Parameter and key cache
//!
//! IPA parameters are expensive to sample, so each `k` is generated once and
//! stored as `params_k{k}.bin`. halo2_proofs 0.3 cannot serialize keys; they
//! are re-derived from the cached parameters instead. Keygen is
//! deterministic, so a prover and a verifier sharing a cache agree on the
//! verifying key, and the key's fingerprint is recorded next to the
//! parameters to notice a cache written for a different circuit.

use alloy_primitives::{keccak256, B256};
use anyhow::{Context, Result};
use halo2_proofs::{
    plonk::{keygen_pk, keygen_vk, Circuit, ProvingKey, VerifyingKey},
    poly::commitment::Params,
};
use halo2curves::pasta::{EqAffine, Fp};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, info, warn};

/// Static description of a circuit whose keys are cached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitShape {
    pub name: &'static str,
    pub public_inputs: usize,
    pub private_witnesses: usize,
}

/// What the cache remembers about a derived key pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyMetadata {
    pub circuit_name: String,
    pub k: u32,
    pub num_public_inputs: usize,
    pub num_private_witnesses: usize,
    /// keccak256 of the pinned verifying key
    pub vk_fingerprint: B256,
}

pub struct CircuitKeys {
    pub proving_key: ProvingKey<EqAffine>,
    pub verifying_key: VerifyingKey<EqAffine>,
    pub metadata: KeyMetadata,
}

pub fn vk_fingerprint(vk: &VerifyingKey<EqAffine>) -> B256 {
    keccak256(format!("{:?}", vk.pinned()).as_bytes())
}

pub struct KeyManager {
    cache_dir: PathBuf,
}

impl KeyManager {
    pub fn new<P: AsRef<Path>>(cache_dir: P) -> Result<Self> {
        let cache_dir = cache_dir.as_ref().to_path_buf();
        fs::create_dir_all(&cache_dir)
            .context(format!("Failed to create key cache at {:?}", cache_dir))?;

        Ok(Self { cache_dir })
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    fn params_file(&self, k: u32) -> PathBuf {
        self.cache_dir.join(format!("params_k{}.bin", k))
    }

    fn metadata_file(&self, circuit_name: &str, k: u32) -> PathBuf {
        self.cache_dir.join(format!("{}_k{}_metadata.json", circuit_name, k))
    }

    /// Cached parameters for `k`, sampling and persisting them on a miss.
    pub fn params(&self, k: u32) -> Result<Params<EqAffine>> {
        let path = self.params_file(k);
        if path.exists() {
            debug!(k, path = ?path, "params cache hit");
            let mut file =
                fs::File::open(&path).context(format!("Failed to open params at {:?}", path))?;
            return Params::<EqAffine>::read(&mut file)
                .context(format!("Corrupt params file at {:?}", path));
        }

        info!(k, "sampling IPA parameters");
        let params = Params::<EqAffine>::new(k);

        let mut file =
            fs::File::create(&path).context(format!("Failed to create params at {:?}", path))?;
        params.write(&mut file).context("Failed to write params")?;
        info!(path = ?path, "params cached");

        Ok(params)
    }

    /// Derive both keys for `circuit`, which must be witness-free.
    pub fn keys<C: Circuit<Fp>>(
        &self,
        params: &Params<EqAffine>,
        circuit: &C,
        shape: CircuitShape,
    ) -> Result<CircuitKeys> {
        let k = params.k();
        info!(circuit = shape.name, k, "deriving proving and verifying keys");

        let verifying_key = keygen_vk(params, circuit).context("Failed to derive verifying key")?;
        let metadata = KeyMetadata {
            circuit_name: shape.name.to_string(),
            k,
            num_public_inputs: shape.public_inputs,
            num_private_witnesses: shape.private_witnesses,
            vk_fingerprint: vk_fingerprint(&verifying_key),
        };

        match self.metadata(shape.name, k) {
            Ok(cached) if cached.vk_fingerprint != metadata.vk_fingerprint => warn!(
                circuit = shape.name,
                cached = %cached.vk_fingerprint,
                derived = %metadata.vk_fingerprint,
                "verifying key differs from the cached one; \
                 proofs made against the old key will not verify"
            ),
            Ok(_) => debug!(circuit = shape.name, "verifying key matches cache"),
            Err(_) => {}
        }
        self.write_metadata(&metadata)?;

        let proving_key = keygen_pk(params, verifying_key.clone(), circuit)
            .context("Failed to derive proving key")?;

        Ok(CircuitKeys { proving_key, verifying_key, metadata })
    }

    fn write_metadata(&self, metadata: &KeyMetadata) -> Result<()> {
        let path = self.metadata_file(&metadata.circuit_name, metadata.k);
        let json = serde_json::to_string_pretty(metadata).context("Failed to encode key metadata")?;
        fs::write(&path, json).context(format!("Failed to write key metadata at {:?}", path))?;

        debug!(path = ?path, "key metadata written");
        Ok(())
    }

    /// Metadata recorded the last time keys were derived for this circuit and `k`.
    pub fn metadata(&self, circuit_name: &str, k: u32) -> Result<KeyMetadata> {
        let path = self.metadata_file(circuit_name, k);
        let content = fs::read_to_string(&path)
            .context(format!("No key metadata at {:?}", path))?;

        serde_json::from_str(&content).context("Failed to decode key metadata")
    }
}
