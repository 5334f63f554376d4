//! Local voting rounds
//!
//! A scenario file names the ledger configuration and the votes each judge
//! casts. [`run`] plays the whole round on an [`InMemoryLedger`]: every
//! ballot is committed, the admin opens the reveal phase, every committed
//! ballot is proven and revealed, and the admin finalizes.

use std::{fs, path::Path, sync::Arc};

use alloy_primitives::Address;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use zkvote_circuit::Halo2Backend;
use zkvote_client::{JudgeBallot, ZkVotingClient};
use zkvote_ledger::{InMemoryLedger, LedgerConfig};
use zkvote_runtime::{LocalSigner, ParticipantScore, VotingStats};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub ledger: LedgerConfig,
    pub votes: Vec<ScenarioVote>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioVote {
    pub judge: Address,
    pub participant: Address,
    pub points: i64,
}

/// A vote that did not make it through the round
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dropped {
    pub judge: Address,
    pub participant: Address,
    pub stage: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Outcome {
    pub stats: VotingStats,
    pub scores: Vec<ParticipantScore>,
    pub winners: Vec<Address>,
    pub dropped: Vec<Dropped>,
}

pub fn load(path: &Path) -> Result<Scenario> {
    let content =
        fs::read_to_string(path).context(format!("Failed to read scenario file: {:?}", path))?;

    serde_json::from_str(&content).context("Failed to parse scenario JSON")
}

pub fn run(scenario: &Scenario, backend: Arc<Halo2Backend>) -> Result<Outcome> {
    let admin = scenario.ledger.admin;
    let ledger = InMemoryLedger::new(scenario.ledger.clone(), backend.clone());
    let client = ZkVotingClient::new(&ledger, backend);
    let mut dropped = Vec::new();

    let mut drop_vote = |vote: &ScenarioVote, stage: &str, error: String| {
        warn!(judge = %vote.judge, participant = %vote.participant, stage, %error, "vote dropped");
        dropped.push(Dropped {
            judge: vote.judge,
            participant: vote.participant,
            stage: stage.to_string(),
            error,
        });
    };

    let mut committed = Vec::new();
    for vote in &scenario.votes {
        let mut ballot = match JudgeBallot::draft(vote.judge, vote.participant, vote.points) {
            Ok(ballot) => ballot,
            Err(e) => {
                drop_vote(vote, "draft", e.to_string());
                continue;
            }
        };
        match client.commit_ballot(&LocalSigner::new(vote.judge), &mut ballot) {
            Ok(_) => committed.push((vote, ballot)),
            Err(e) => drop_vote(vote, "commit", e.to_string()),
        }
    }
    info!(committed = committed.len(), "commit phase complete");

    ledger.open_reveal(admin).context("Failed to open the reveal phase")?;

    for (vote, ballot) in &mut committed {
        if let Err(e) = client.reveal_ballot(&LocalSigner::new(vote.judge), ballot) {
            drop_vote(vote, "reveal", e.to_string());
        }
    }

    ledger.finalize(admin).context("Failed to finalize the round")?;

    let mut scores = scenario
        .ledger
        .participants
        .iter()
        .map(|participant| client.get_participant_score(*participant))
        .collect::<zkvote_runtime::Result<Vec<_>>>()?;
    scores.sort_by_key(|score| (score.position == 0, score.position));

    Ok(Outcome {
        stats: client.get_voting_stats()?,
        scores,
        winners: client.get_winners()?,
        dropped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;
    use zkvote_runtime::ProverConfig;

    const SCENARIO: &str = r#"{
        "ledger": {
            "admin": "0xadadadadadadadadadadadadadadadadadadadad",
            "judges": [
                "0x1111111111111111111111111111111111111111",
                "0x1212121212121212121212121212121212121212"
            ],
            "participants": [
                "0x2121212121212121212121212121212121212121",
                "0x2222222222222222222222222222222222222222"
            ],
            "winner_slots": 1
        },
        "votes": [
            { "judge": "0x1111111111111111111111111111111111111111",
              "participant": "0x2121212121212121212121212121212121212121", "points": 90 },
            { "judge": "0x1212121212121212121212121212121212121212",
              "participant": "0x2222222222222222222222222222222222222222", "points": 95 },
            { "judge": "0x1212121212121212121212121212121212121212",
              "participant": "0x2121212121212121212121212121212121212121", "points": 40 },
            { "judge": "0x1111111111111111111111111111111111111111",
              "participant": "0x2222222222222222222222222222222222222222", "points": 120 }
        ]
    }"#;

    #[test]
    fn test_load_scenario_valid() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", SCENARIO).unwrap();

        let scenario = load(file.path()).unwrap();
        assert_eq!(scenario.ledger.judges.len(), 2);
        assert_eq!(scenario.ledger.winner_slots, 1);
        assert_eq!(scenario.votes.len(), 4);
        assert_eq!(scenario.votes[3].points, 120);
    }

    #[test]
    fn test_load_scenario_invalid_json() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"ledger": 3}}"#).unwrap();

        assert!(load(file.path()).is_err());
    }

    #[test]
    fn test_load_scenario_missing_file() {
        assert!(load(Path::new("/nonexistent/scenario.json")).is_err());
    }

    #[test]
    fn test_run_scenario() {
        let scenario: Scenario = serde_json::from_str(SCENARIO).unwrap();
        let cache = tempfile::tempdir().unwrap();
        let backend = Arc::new(Halo2Backend::setup(&ProverConfig::new(9, cache.path())).unwrap());

        let outcome = run(&scenario, backend).unwrap();

        // 130 for 0x21.. beats 95 for 0x22..; the 120-point vote never leaves the judge
        let first = Address::from([0x21; 20]);
        let second = Address::from([0x22; 20]);
        assert_eq!(outcome.winners, vec![first]);
        assert_eq!(outcome.scores[0].participant, first);
        assert_eq!(outcome.scores[0].total_points, 130);
        assert_eq!(outcome.scores[1].participant, second);
        assert_eq!(outcome.scores[1].total_points, 95);
        let stats = &outcome.stats;
        assert_eq!((stats.committed, stats.revealed, stats.total), (3, 3, 4));

        assert_eq!(outcome.dropped.len(), 1);
        assert_eq!(outcome.dropped[0].stage, "draft");
    }
}
