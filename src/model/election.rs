use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::selection::ABSTAIN;
use super::string_id;

string_id!(
    /// Opaque election identifier, as issued by the authoritative source.
    ElectionId
);

string_id!(
    /// A votable position within an election.
    Seat
);

string_id!(
    /// Opaque candidate identifier, unique within its seat.
    CandidateId
);

/// An immutable snapshot of one candidate, as returned by the ballot source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateRef {
    pub id: CandidateId,
    pub seat: Seat,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub party: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
}

/// Candidate data as it appears on the wire, before being attached to a seat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateDesc {
    pub id: CandidateId,
    pub name: String,
    #[serde(default)]
    pub party: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
}

/// One seat and its candidates, as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BallotSeat {
    pub seat: Seat,
    pub candidates: Vec<CandidateDesc>,
}

/// Reasons a raw ballot structure can be refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BallotShapeError {
    #[error("ballot has no seats")]
    NoSeats,
    #[error("seat '{0}' has no candidates")]
    EmptySeat(Seat),
    #[error("seat '{0}' appears more than once")]
    DuplicateSeat(Seat),
    #[error("candidate '{candidate}' appears twice under seat '{seat}'")]
    DuplicateCandidate { seat: Seat, candidate: CandidateId },
    /// The id would be read back as an abstention.
    #[error("seat '{seat}' has a candidate with the reserved id '{candidate}'")]
    ReservedCandidateId { seat: Seat, candidate: CandidateId },
}

/// The frozen seat and candidate structure of one election, in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Ballot {
    seats: Vec<(Seat, Vec<CandidateRef>)>,
}

impl Ballot {
    /// Validate and freeze a raw ballot.
    pub fn from_seats(raw: Vec<BallotSeat>) -> Result<Self, BallotShapeError> {
        if raw.is_empty() {
            return Err(BallotShapeError::NoSeats);
        }

        let mut seats: Vec<(Seat, Vec<CandidateRef>)> = Vec::with_capacity(raw.len());
        for BallotSeat { seat, candidates } in raw {
            if candidates.is_empty() {
                return Err(BallotShapeError::EmptySeat(seat));
            }
            if seats.iter().any(|(existing, _)| existing == &seat) {
                return Err(BallotShapeError::DuplicateSeat(seat));
            }
            let mut refs: Vec<CandidateRef> = Vec::with_capacity(candidates.len());
            for desc in candidates {
                if desc.id.as_str() == ABSTAIN {
                    return Err(BallotShapeError::ReservedCandidateId {
                        seat,
                        candidate: desc.id,
                    });
                }
                if refs.iter().any(|c| c.id == desc.id) {
                    return Err(BallotShapeError::DuplicateCandidate {
                        seat,
                        candidate: desc.id,
                    });
                }
                refs.push(CandidateRef {
                    id: desc.id,
                    seat: seat.clone(),
                    name: desc.name,
                    party: desc.party,
                    bio: desc.bio,
                });
            }
            seats.push((seat, refs));
        }

        Ok(Self { seats })
    }

    pub fn is_empty(&self) -> bool {
        self.seats.is_empty()
    }

    /// Seats in ballot order.
    pub fn seats(&self) -> impl Iterator<Item = &Seat> {
        self.seats.iter().map(|(seat, _)| seat)
    }

    pub fn has_seat(&self, seat: &Seat) -> bool {
        self.candidates(seat).is_some()
    }

    /// Candidates standing for the given seat, if it is on the ballot.
    pub fn candidates(&self, seat: &Seat) -> Option<&[CandidateRef]> {
        self.seats
            .iter()
            .find(|(s, _)| s == seat)
            .map(|(_, candidates)| candidates.as_slice())
    }

    pub fn candidate(&self, seat: &Seat, candidate: &CandidateId) -> Option<&CandidateRef> {
        self.candidates(seat)?.iter().find(|c| &c.id == candidate)
    }
}
