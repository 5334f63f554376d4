//! zkvote CLI
//!
//! Commit to judge scores, prove and verify reveals, and play whole voting
//! rounds locally. Results go to stdout; logs go to stderr (`RUST_LOG`).

mod scenario;

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;
use zkvote_circuit::{
    Halo2Backend, KeyManager, VoteProver, VoteVerifier, CIRCUIT_NAME, RANGE_BITS,
};
use zkvote_client::JudgeBallot;
use zkvote_runtime::{
    generate_nonce, EncodedVote, ProverConfig, VoteData, ZkProof, MAX_K, MAX_POINTS, MIN_POINTS,
};

#[derive(Parser)]
#[command(name = "zkvote")]
#[command(about = "Commit-reveal judge voting with zero-knowledge score proofs", long_about = None)]
struct Cli {
    #[command(flatten)]
    prover: ProverArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ProverArgs {
    /// Prover configuration JSON; flags below override it
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Circuit parameter k (size = 2^k)
    #[arg(short, long, global = true)]
    k: Option<u32>,

    /// Cache directory for parameters and key metadata
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,
}

impl ProverArgs {
    fn resolve(&self) -> Result<ProverConfig> {
        let mut config = match &self.config {
            Some(path) => ProverConfig::from_json_file(path)
                .context(format!("Failed to load prover config: {:?}", path))?,
            None => ProverConfig::default(),
        };
        if let Some(k) = self.k {
            config = config.with_k(k);
        }
        anyhow::ensure!(
            config.k() <= MAX_K,
            "k={} is too large; the prover supports k <= {}",
            config.k(),
            MAX_K
        );
        if let Some(cache_dir) = &self.cache_dir {
            config = config.with_cache_dir(cache_dir);
        }
        Ok(config)
    }

    fn backend(&self) -> Result<Halo2Backend> {
        let config = self.resolve()?;
        info!(k = config.k(), cache_dir = ?config.cache_dir(), "setting up prover");
        Halo2Backend::setup(&config).context("Failed to set up the score prover")
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Print a fresh 256-bit nonce
    Nonce,

    /// Draft a ballot and print its commitment
    Commit {
        #[arg(long)]
        judge: String,

        #[arg(long)]
        participant: String,

        #[arg(long)]
        points: i64,

        /// Nonce to commit with; a fresh one is generated when omitted
        #[arg(long)]
        nonce: Option<String>,

        /// Where to keep the ballot (it holds the secret nonce)
        #[arg(short, long, default_value = "ballot.json")]
        output: PathBuf,
    },

    /// Prove a drafted ballot and write the reveal payload
    Prove {
        #[arg(short, long, default_value = "ballot.json")]
        ballot: PathBuf,

        /// Output file for the reveal payload
        #[arg(short, long, default_value = "proof.bin")]
        output: PathBuf,
    },

    /// Verify a reveal payload
    Verify {
        #[arg(short, long, default_value = "proof.bin")]
        proof: PathBuf,

        /// Also check the payload against this ballot's disclosed vote
        #[arg(short, long)]
        ballot: Option<PathBuf>,
    },

    /// Show information about the score circuit
    Info,

    /// Play a whole voting round from a scenario file on a local ledger
    Simulate {
        scenario: PathBuf,
    },
}

fn load_ballot(path: &Path) -> Result<JudgeBallot> {
    let content =
        fs::read_to_string(path).context(format!("Failed to read ballot file: {:?}", path))?;

    serde_json::from_str(&content).context("Failed to parse ballot JSON")
}

fn commit_ballot(
    judge: String,
    participant: String,
    points: i64,
    nonce: Option<String>,
    output: &Path,
) -> Result<()> {
    let nonce = nonce.unwrap_or_else(generate_nonce);
    let ballot = JudgeBallot::new(VoteData::new(judge, participant, points, nonce))
        .context("Vote rejected")?;

    let json = serde_json::to_string_pretty(&ballot)?;
    fs::write(output, json).context(format!("Failed to write ballot to {:?}", output))?;
    info!(output = ?output, "ballot saved; keep it private until the reveal phase");

    println!("{}", ballot.commitment().to_hex());
    Ok(())
}

fn prove_ballot(backend: &Halo2Backend, ballot_path: &Path, output: &Path) -> Result<()> {
    let ballot = load_ballot(ballot_path)?;
    let proof = backend.prove_valid_vote(ballot.vote()).context("Failed to prove ballot")?;

    let payload = proof.to_bytes();
    fs::write(output, &payload).context(format!("Failed to write proof to {:?}", output))?;

    println!("✅ Proof generated successfully!");
    println!("   Size: {} bytes", payload.len());
    println!("   Output: {:?}", output);
    for (name, value) in ["commitment", "points", "judge", "binding"]
        .iter()
        .zip(proof.public_signals.to_vec())
    {
        println!("   {}: {}", name, value);
    }
    Ok(())
}

fn verify_payload(
    backend: &Halo2Backend,
    proof_path: &Path,
    ballot_path: Option<&Path>,
) -> Result<()> {
    let payload =
        fs::read(proof_path).context(format!("Failed to read proof file: {:?}", proof_path))?;
    let proof = ZkProof::from_bytes(&payload).context("Malformed reveal payload")?;

    let (is_valid, commitment_checked) = match ballot_path {
        Some(path) => {
            let ballot = load_ballot(path)?;
            let vote = EncodedVote::from_vote(ballot.vote())?;
            (backend.verify_disclosed(&proof, &vote)?, true)
        }
        None => (backend.verify(&proof)?, false),
    };

    if is_valid && commitment_checked {
        println!("✅ Proof is VALID!");
        Ok(())
    } else if is_valid {
        println!("✅ Proof is VALID for points {}", proof.public_signals.points);
        println!("   Commitment not checked; pass --ballot to bind it to a vote");
        Ok(())
    } else {
        println!("❌ Proof is INVALID!");
        anyhow::bail!("Proof verification failed");
    }
}

fn show_circuit_info(config: &ProverConfig) {
    println!("📋 Circuit: {}", CIRCUIT_NAME);
    println!(
        "   Statement: {} <= points <= {}, bound to the vote by Poseidon",
        MIN_POINTS, MAX_POINTS
    );
    println!("   Range check: {} bits for points and for {} - points", RANGE_BITS, MAX_POINTS);
    println!("   Private witnesses: participant, nonce (two 128-bit limbs)");
    println!("   Public signals: [commitment, points, judge, binding]");
    println!("   k: {} ({} rows)", config.k(), config.num_rows());
    println!("   Cache: {:?}", config.cache_dir());

    let cached = KeyManager::new(config.cache_dir())
        .and_then(|manager| manager.metadata(CIRCUIT_NAME, config.k()));
    match cached {
        Ok(metadata) => println!("   Verifying key: {}", metadata.vk_fingerprint),
        Err(_) => println!("   Verifying key: not derived yet"),
    }
}

fn simulate(backend: Halo2Backend, path: &Path) -> Result<()> {
    let scenario = scenario::load(path)?;
    let outcome = scenario::run(&scenario, Arc::new(backend))?;

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Nonce => println!("{}", generate_nonce()),
        Commands::Commit { judge, participant, points, nonce, output } => {
            commit_ballot(judge, participant, points, nonce, &output)?
        }
        Commands::Prove { ballot, output } => {
            prove_ballot(&cli.prover.backend()?, &ballot, &output)?
        }
        Commands::Verify { proof, ballot } => {
            verify_payload(&cli.prover.backend()?, &proof, ballot.as_deref())?
        }
        Commands::Info => show_circuit_info(&cli.prover.resolve()?),
        Commands::Simulate { scenario } => simulate(cli.prover.backend()?, &scenario)?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const JUDGE: &str = "0x1111111111111111111111111111111111111111";
    const PARTICIPANT: &str = "0x1234567890123456789012345678901234567890";

    #[test]
    fn test_cli_parses_global_prover_flags() {
        let cli = Cli::try_parse_from(["zkvote", "info", "--k", "11", "--cache-dir", "/tmp/zk"])
            .unwrap();
        let config = cli.prover.resolve().unwrap();

        assert_eq!(config.k(), 11);
        assert_eq!(config.cache_dir(), Path::new("/tmp/zk"));
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["zkvote", "prove"]).unwrap();
        let config = cli.prover.resolve().unwrap();
        assert_eq!(config, ProverConfig::default());

        match cli.command {
            Commands::Prove { ballot, output } => {
                assert_eq!(ballot, PathBuf::from("ballot.json"));
                assert_eq!(output, PathBuf::from("proof.bin"));
            }
            _ => panic!("expected prove"),
        }
    }

    #[test]
    fn test_config_file_is_overridden_by_flags() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"k": 10, "cache_dir": "/tmp/from-file"}}"#).unwrap();
        let path = file.path().to_str().unwrap();

        let cli = Cli::try_parse_from(["zkvote", "--config", path, "--k", "12", "info"]).unwrap();
        let config = cli.prover.resolve().unwrap();

        assert_eq!(config.k(), 12);
        assert_eq!(config.cache_dir(), Path::new("/tmp/from-file"));
    }

    #[test]
    fn test_oversized_k_rejected() {
        let cli = Cli::try_parse_from(["zkvote", "info", "--k", "64"]).unwrap();
        assert!(cli.prover.resolve().is_err());

        let at_limit = MAX_K.to_string();
        let cli = Cli::try_parse_from(["zkvote", "info", "--k", at_limit.as_str()]).unwrap();
        assert_eq!(cli.prover.resolve().unwrap().k(), MAX_K);
    }

    #[test]
    fn test_oversized_k_in_config_file_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"k": 40}}"#).unwrap();
        let path = file.path().to_str().unwrap();

        let cli = Cli::try_parse_from(["zkvote", "--config", path, "info"]).unwrap();
        assert!(cli.prover.resolve().is_err());
    }

    #[test]
    fn test_missing_config_file_fails() {
        let args = ["zkvote", "--config", "/nonexistent/prover.json", "info"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert!(cli.prover.resolve().is_err());
    }

    #[test]
    fn test_commit_writes_ballot() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("ballot.json");
        let nonce = format!("0x{}", "ab".repeat(32));

        commit_ballot(
            JUDGE.to_string(),
            PARTICIPANT.to_string(),
            85,
            Some(nonce.clone()),
            &output,
        )
        .unwrap();

        let ballot = load_ballot(&output).unwrap();
        assert_eq!(ballot.vote().nonce, nonce);
        assert_eq!(ballot.vote().points, 85);
        assert_eq!(
            ballot.commitment().to_hex(),
            "0x7744480b62ca64fa00be23b04b5d5fcd012d01bd4d90d800841c40f4ebce0cd8"
        );
    }

    #[test]
    fn test_commit_rejects_out_of_range_points() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("ballot.json");

        let result = commit_ballot(
            JUDGE.to_string(),
            PARTICIPANT.to_string(),
            101,
            None,
            &output,
        );
        assert!(result.is_err());
        assert!(!output.exists());
    }

    #[test]
    fn test_load_ballot_invalid_json() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "not valid json").unwrap();

        assert!(load_ballot(file.path()).is_err());
    }

    #[test]
    fn test_load_ballot_missing_file() {
        assert!(load_ballot(Path::new("/nonexistent/ballot.json")).is_err());
    }

    #[test]
    fn test_verify_binds_commitment_only_with_ballot() {
        let dir = tempfile::tempdir().unwrap();
        let config = ProverConfig::new(9, dir.path().join("cache"));
        let backend = Halo2Backend::setup(&config).unwrap();
        let ballot = dir.path().join("ballot.json");
        let payload = dir.path().join("proof.bin");

        commit_ballot(JUDGE.to_string(), PARTICIPANT.to_string(), 64, None, &ballot).unwrap();
        prove_ballot(&backend, &ballot, &payload).unwrap();
        verify_payload(&backend, &payload, Some(&ballot)).unwrap();

        let mut proof = ZkProof::from_bytes(&fs::read(&payload).unwrap()).unwrap();
        proof.public_signals.commitment = zkvote_runtime::B256::repeat_byte(0x42);
        fs::write(&payload, proof.to_bytes()).unwrap();

        verify_payload(&backend, &payload, None).unwrap();
        assert!(verify_payload(&backend, &payload, Some(&ballot)).is_err());
    }

    #[test]
    fn test_show_circuit_info() {
        let dir = tempfile::tempdir().unwrap();
        show_circuit_info(&ProverConfig::default().with_cache_dir(dir.path()));
    }
}
