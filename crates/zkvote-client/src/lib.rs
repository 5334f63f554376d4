//! zkvote client
//!
//! The judge-facing side of commit-reveal voting: commitments, proofs,
//! ledger submissions and local ballot bookkeeping.
//!
//! ```no_run
//! use zkvote_circuit::Halo2Backend;
//! use zkvote_client::{JudgeBallot, ZkVotingClient};
//! use zkvote_ledger::{InMemoryLedger, LedgerConfig};
//! use zkvote_runtime::{Address, LocalSigner, ProverConfig};
//!
//! # fn main() -> zkvote_runtime::Result<()> {
//! let judge = Address::repeat_byte(0x11);
//! let participant = Address::repeat_byte(0x22);
//! let backend = std::sync::Arc::new(Halo2Backend::setup(&ProverConfig::default())?);
//! let ledger = InMemoryLedger::new(
//!     LedgerConfig::new(Address::repeat_byte(0xad), vec![judge], vec![participant]),
//!     backend.clone(),
//! );
//! let client = ZkVotingClient::new(&ledger, backend);
//!
//! let signer = LocalSigner::new(judge);
//! let mut ballot = JudgeBallot::draft(judge, participant, 85)?;
//! client.commit_ballot(&signer, &mut ballot)?;
//! # Ok(())
//! # }
//! ```

pub mod ballot;
pub mod client;

pub use ballot::{BallotStatus, JudgeBallot};
pub use client::ZkVotingClient;
