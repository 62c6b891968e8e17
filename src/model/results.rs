use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::election::{CandidateId, ElectionId, Seat};

/// The running tally for one candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateTally {
    pub seat: Seat,
    pub candidate_id: CandidateId,
    pub name: String,
    pub votes: u64,
}

/// A results snapshot for one election.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectionResults {
    pub election_id: ElectionId,
    pub tallies: Vec<CandidateTally>,
    pub total_votes: u64,
    pub updated_at: DateTime<Utc>,
}

impl ElectionResults {
    /// Tallies for one seat, highest first, ties broken by name.
    pub fn standings(&self, seat: &Seat) -> Vec<&CandidateTally> {
        let mut standings = self
            .tallies
            .iter()
            .filter(|t| &t.seat == seat)
            .collect::<Vec<_>>();
        standings.sort_by(|a, b| b.votes.cmp(&a.votes).then_with(|| a.name.cmp(&b.name)));
        standings
    }
}

/// An inbound message on the live results channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ResultsMessage {
    /// A complete snapshot that replaces whatever is cached.
    FullUpdate { results: ElectionResults },
    /// Cached results are stale; re-fetch from the source.
    Refresh,
}
