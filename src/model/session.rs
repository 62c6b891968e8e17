use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::error::{Error, ErrorKind, Result};
use crate::logging::SessionId;

use super::election::{Ballot, CandidateId, ElectionId, Seat};
use super::receipt::{CastVote, VoteReceipt, WalletAddress};
use super::selection::{Choice, Selections};

/// Where a voter is in the voting flow.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    SelectingElection,
    Gating,
    BallotLoaded,
    Selecting,
    Reviewing,
    Submitting,
    Submitted,
    Failed,
}

impl Display for Phase {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Outcomes of the gate checks. `None` means not checked yet.
///
/// A check settles once per gate run; only an explicit retry of the whole
/// gate clears them.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GateResults {
    wallet_connected: Option<bool>,
    eligible: Option<bool>,
    already_voted: Option<bool>,
}

impl GateResults {
    pub fn wallet_connected(&self) -> Option<bool> {
        self.wallet_connected
    }

    pub fn eligible(&self) -> Option<bool> {
        self.eligible
    }

    pub fn already_voted(&self) -> Option<bool> {
        self.already_voted
    }

    /// True iff every check has run and allows the voter through.
    pub fn passed(&self) -> bool {
        self.wallet_connected == Some(true)
            && self.eligible == Some(true)
            && self.already_voted == Some(false)
    }
}

fn settle(slot: &mut Option<bool>, value: bool) {
    if slot.is_none() {
        *slot = Some(value);
    }
}

/// The last failure recorded on a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionFailure {
    pub kind: ErrorKind,
    /// Voter-facing text; see [`Error::user_message`].
    pub message: String,
    /// Internal description, for logs and diagnostics only.
    pub detail: String,
}

impl From<&Error> for SessionFailure {
    fn from(err: &Error) -> Self {
        Self {
            kind: err.kind(),
            message: err.user_message().to_string(),
            detail: err.to_string(),
        }
    }
}

/// One voter's interaction with one election. Lives only in memory.
#[derive(Debug)]
pub struct VotingSession {
    id: SessionId,
    election_id: Option<ElectionId>,
    phase: Phase,
    gate: GateResults,
    wallet: Option<WalletAddress>,
    ballot: Ballot,
    selections: Selections,
    receipt: Option<VoteReceipt>,
    error: Option<SessionFailure>,
    submission_attempted: bool,
}

impl VotingSession {
    /// A fresh session waiting for the voter to pick an election.
    pub fn new() -> Self {
        Self {
            id: SessionId::next(),
            election_id: None,
            phase: Phase::SelectingElection,
            gate: GateResults::default(),
            wallet: None,
            ballot: Ballot::default(),
            selections: Selections::new(),
            receipt: None,
            error: None,
            submission_attempted: false,
        }
    }

    /// A fresh session with the election already chosen.
    pub fn for_election(election_id: ElectionId) -> Self {
        let mut session = Self::new();
        session.election_id = Some(election_id);
        session.phase = Phase::Gating;
        debug!("session{} created for election {}", session.id, session.election_label());
        session
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn election_id(&self) -> Option<&ElectionId> {
        self.election_id.as_ref()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn gate_results(&self) -> &GateResults {
        &self.gate
    }

    pub fn wallet(&self) -> Option<&WalletAddress> {
        self.wallet.as_ref()
    }

    pub fn ballot(&self) -> &Ballot {
        &self.ballot
    }

    pub fn selections(&self) -> &Selections {
        &self.selections
    }

    pub fn receipt(&self) -> Option<&VoteReceipt> {
        self.receipt.as_ref()
    }

    pub fn error(&self) -> Option<&SessionFailure> {
        self.error.as_ref()
    }

    pub fn submission_attempted(&self) -> bool {
        self.submission_attempted
    }

    pub fn is_complete(&self) -> bool {
        !self.ballot.is_empty() && self.selections.is_complete(&self.ballot)
    }

    fn election_label(&self) -> &str {
        self.election_id.as_ref().map(ElectionId::as_str).unwrap_or("<none>")
    }

    fn expect_phase(&self, expected: Phase) -> Result<()> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(Error::InvalidPhase {
                expected,
                actual: self.phase,
            })
        }
    }

    /// Move to `to`. Any forward move clears the recorded error.
    fn transition(&mut self, to: Phase) {
        debug!("session{} {} -> {}", self.id, self.phase, to);
        if to != Phase::Failed {
            self.error = None;
        }
        self.phase = to;
    }

    pub(crate) fn choose_election(&mut self, election_id: ElectionId) -> Result<()> {
        self.expect_phase(Phase::SelectingElection)?;
        self.election_id = Some(election_id);
        self.transition(Phase::Gating);
        Ok(())
    }

    /// Prepare for a full gate run. From `Failed` this is an explicit retry,
    /// which is only allowed while no cast has ever been issued.
    pub(crate) fn begin_gate(&mut self) -> Result<&ElectionId> {
        let retrying = match self.phase {
            Phase::Gating => false,
            Phase::Failed if !self.submission_attempted => true,
            actual => {
                return Err(Error::InvalidPhase {
                    expected: Phase::Gating,
                    actual,
                })
            }
        };
        if retrying {
            info!("session{} retrying gate", self.id);
            self.gate = GateResults::default();
            self.wallet = None;
            self.ballot = Ballot::default();
            self.selections = Selections::new();
            self.transition(Phase::Gating);
        }
        self.election_id.as_ref().ok_or(Error::InvalidPhase {
            expected: Phase::Gating,
            actual: Phase::SelectingElection,
        })
    }

    pub(crate) fn record_wallet(&mut self, wallet: Option<WalletAddress>) {
        settle(&mut self.gate.wallet_connected, wallet.is_some());
        if self.wallet.is_none() {
            self.wallet = wallet;
        }
    }

    pub(crate) fn record_eligible(&mut self, eligible: bool) {
        settle(&mut self.gate.eligible, eligible);
    }

    pub(crate) fn record_already_voted(&mut self, already_voted: bool) {
        settle(&mut self.gate.already_voted, already_voted);
    }

    /// Freeze the ballot. Only reachable once every gate check has passed.
    pub(crate) fn ballot_loaded(&mut self, ballot: Ballot) -> Result<()> {
        self.expect_phase(Phase::Gating)?;
        if !self.gate.passed() {
            return Err(Error::InvalidPhase {
                expected: Phase::Gating,
                actual: self.phase,
            });
        }
        self.ballot = ballot;
        self.selections = Selections::new();
        self.transition(Phase::BallotLoaded);
        Ok(())
    }

    pub(crate) fn begin_selection(&mut self) -> Result<()> {
        self.expect_phase(Phase::BallotLoaded)?;
        self.transition(Phase::Selecting);
        Ok(())
    }

    pub(crate) fn select(&mut self, seat: &Seat, candidate: CandidateId) -> Result<()> {
        self.set_choice(seat, Choice::Candidate(candidate))
    }

    pub(crate) fn abstain(&mut self, seat: &Seat) -> Result<()> {
        self.set_choice(seat, Choice::Abstain)
    }

    fn set_choice(&mut self, seat: &Seat, choice: Choice) -> Result<()> {
        self.expect_phase(Phase::Selecting)?;
        self.selections = self.selections.with_choice(&self.ballot, seat, choice)?;
        Ok(())
    }

    pub(crate) fn review(&mut self) -> Result<()> {
        self.expect_phase(Phase::Selecting)?;
        let missing = self.selections.missing(&self.ballot);
        if !missing.is_empty() {
            return Err(Error::IncompleteBallot { missing });
        }
        if let Err(err @ Error::MultipleChoices(_)) = self.selections.submission_choice() {
            return Err(err);
        }
        self.transition(Phase::Reviewing);
        Ok(())
    }

    pub(crate) fn edit(&mut self) -> Result<()> {
        self.expect_phase(Phase::Reviewing)?;
        self.transition(Phase::Selecting);
        Ok(())
    }

    /// Claim this session's one submission and build the cast to issue.
    /// Every refusal here happens before any side effect.
    pub(crate) fn begin_submission(&mut self) -> Result<CastVote> {
        self.expect_phase(Phase::Reviewing)?;
        if self.submission_attempted {
            return Err(Error::InvalidPhase {
                expected: Phase::Reviewing,
                actual: Phase::Submitting,
            });
        }
        if !self.is_complete() {
            return Err(Error::IncompleteBallot {
                missing: self.selections.missing(&self.ballot),
            });
        }
        let (seat, candidate) = self.selections.submission_choice()?;
        let cast = match (&self.election_id, &self.wallet) {
            (Some(election_id), Some(voter)) => CastVote {
                election_id: election_id.clone(),
                seat: seat.clone(),
                candidate_id: candidate.clone(),
                voter: voter.clone(),
            },
            _ => {
                return Err(Error::InvalidPhase {
                    expected: Phase::Gating,
                    actual: self.phase,
                })
            }
        };

        self.submission_attempted = true;
        self.transition(Phase::Submitting);
        Ok(cast)
    }

    /// Store the receipt. Write-once.
    pub(crate) fn submission_confirmed(&mut self, receipt: VoteReceipt) -> Result<()> {
        self.expect_phase(Phase::Submitting)?;
        if self.receipt.is_some() {
            return Err(Error::InvalidPhase {
                expected: Phase::Submitting,
                actual: Phase::Submitted,
            });
        }
        self.receipt = Some(receipt);
        self.transition(Phase::Submitted);
        Ok(())
    }

    /// Record a boundary failure. A submitted session never goes back.
    pub(crate) fn fail(&mut self, err: &Error) {
        if self.phase == Phase::Submitted {
            warn!("session{} ignoring failure after submission: {err}", self.id);
            return;
        }
        warn!("session{} failed in {}: {err}", self.id, self.phase);
        self.error = Some(SessionFailure::from(err));
        self.transition(Phase::Failed);
    }
}

impl Default for VotingSession {
    fn default() -> Self {
        Self::new()
    }
}
