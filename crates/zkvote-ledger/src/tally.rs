//! Score aggregation and ranking
//!
//! Ranking order: total points descending, then the sequence number of the
//! participant's first accepted reveal ascending, then address bytes
//! ascending. Sequence numbers are unique, so the last key only matters for
//! hand-built tallies.

use std::collections::HashMap;

use alloy_primitives::Address;
use zkvote_runtime::ParticipantScore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tally {
    pub total_points: u64,
    pub vote_count: u64,
    pub first_reveal: u64,
}

impl Tally {
    pub fn new(points: u64, sequence: u64) -> Self {
        Self { total_points: points, vote_count: 1, first_reveal: sequence }
    }

    pub fn add(&mut self, points: u64) {
        self.total_points += points;
        self.vote_count += 1;
    }
}

#[derive(Debug, Clone, Default)]
pub struct Scoreboard {
    tallies: HashMap<Address, Tally>,
}

impl Scoreboard {
    pub fn record(&mut self, participant: Address, points: u64, sequence: u64) {
        self.tallies
            .entry(participant)
            .and_modify(|tally| tally.add(points))
            .or_insert_with(|| Tally::new(points, sequence));
    }

    pub fn tally(&self, participant: &Address) -> Option<&Tally> {
        self.tallies.get(participant)
    }

    /// Participants with at least one revealed vote, best first
    pub fn ranking(&self) -> Vec<Address> {
        let mut entries: Vec<(&Address, &Tally)> = self.tallies.iter().collect();
        entries.sort_by(|(addr_a, a), (addr_b, b)| {
            b.total_points
                .cmp(&a.total_points)
                .then(a.first_reveal.cmp(&b.first_reveal))
                .then(addr_a.cmp(addr_b))
        });
        entries.into_iter().map(|(address, _)| *address).collect()
    }

    /// `is_winner` is only set when `winner_slots` is given, i.e. once the
    /// results are final.
    pub fn score(&self, participant: Address, winner_slots: Option<usize>) -> ParticipantScore {
        let Some(tally) = self.tallies.get(&participant) else {
            return ParticipantScore::empty(participant);
        };

        let position = self
            .ranking()
            .iter()
            .position(|address| *address == participant)
            .map(|index| index as u64 + 1)
            .unwrap_or(0);

        ParticipantScore {
            participant,
            total_points: tally.total_points,
            vote_count: tally.vote_count,
            is_winner: winner_slots.is_some_and(|slots| position > 0 && position <= slots as u64),
            position,
        }
    }
}
