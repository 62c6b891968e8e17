use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

use super::election::{Ballot, CandidateId, Seat};

/// Wire value of [`Choice::Abstain`]; never valid as a candidate id.
pub(crate) const ABSTAIN: &str = "abstain";

/// What the voter picked for one seat.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum Choice {
    Candidate(CandidateId),
    /// An explicit "no choice", distinct from not having chosen yet.
    Abstain,
}

impl Choice {
    pub fn candidate(&self) -> Option<&CandidateId> {
        match self {
            Self::Candidate(id) => Some(id),
            Self::Abstain => None,
        }
    }

    pub fn is_abstain(&self) -> bool {
        matches!(self, Self::Abstain)
    }
}

impl From<Choice> for String {
    fn from(choice: Choice) -> Self {
        match choice {
            Choice::Candidate(id) => id.to_string(),
            Choice::Abstain => ABSTAIN.to_string(),
        }
    }
}

impl From<String> for Choice {
    fn from(raw: String) -> Self {
        if raw == ABSTAIN {
            Self::Abstain
        } else {
            Self::Candidate(raw.into())
        }
    }
}

/// Seat to choice mapping. Edits never mutate in place; each one returns a
/// fresh `Selections` and the caller swaps it in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selections {
    choices: BTreeMap<Seat, Choice>,
}

impl Selections {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a copy with `seat` set to `choice`, replacing any prior choice.
    /// The seat must be on `ballot`, and a candidate choice must stand for it.
    pub fn with_choice(&self, ballot: &Ballot, seat: &Seat, choice: Choice) -> Result<Self> {
        if !ballot.has_seat(seat) {
            return Err(Error::UnknownSeat(seat.clone()));
        }
        if let Choice::Candidate(ref candidate) = choice {
            if ballot.candidate(seat, candidate).is_none() {
                return Err(Error::UnknownCandidate {
                    seat: seat.clone(),
                    candidate: candidate.clone(),
                });
            }
        }

        let mut choices = self.choices.clone();
        choices.insert(seat.clone(), choice);
        Ok(Self { choices })
    }

    pub fn get(&self, seat: &Seat) -> Option<&Choice> {
        self.choices.get(seat)
    }

    pub fn len(&self) -> usize {
        self.choices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.choices.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Seat, &Choice)> {
        self.choices.iter()
    }

    /// Seats on `ballot` without a choice, in ballot order.
    pub fn missing(&self, ballot: &Ballot) -> Vec<Seat> {
        ballot
            .seats()
            .filter(|seat| !self.choices.contains_key(*seat))
            .cloned()
            .collect()
    }

    /// True iff every seat on `ballot` has a choice. Abstaining counts.
    pub fn is_complete(&self, ballot: &Ballot) -> bool {
        ballot.seats().all(|seat| self.choices.contains_key(seat))
    }

    /// The single non-abstain choice to cast.
    ///
    /// One cast carries one choice: a selection abstaining everywhere has
    /// nothing to cast, and one with choices on several seats is refused.
    pub fn submission_choice(&self) -> Result<(&Seat, &CandidateId)> {
        let mut chosen = self
            .choices
            .iter()
            .filter_map(|(seat, choice)| choice.candidate().map(|id| (seat, id)));
        let first = chosen.next().ok_or(Error::NothingToSubmit)?;
        let extra = chosen.count();
        if extra > 0 {
            return Err(Error::MultipleChoices(extra + 1));
        }
        Ok(first)
    }
}
