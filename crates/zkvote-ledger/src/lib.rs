//! zkvote ledger
//!
//! A reference implementation of the voting contract: phase machine,
//! commitment storage, reveal verification and winner aggregation.

pub mod config;
pub mod ledger;
pub mod tally;

pub use config::LedgerConfig;
pub use ledger::InMemoryLedger;
pub use tally::{Scoreboard, Tally};
