use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{
    election::{CandidateId, Seat},
    session::Phase,
};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("No wallet available: {0}")]
    WalletUnavailable(String),
    #[error("Request was rejected by the user")]
    UserRejected,
    #[error("Wallet is not eligible to vote: {0}")]
    NotEligible(String),
    #[error("Wallet has already voted in this election")]
    AlreadyVoted,
    #[error("Ballot unavailable: {0}")]
    BallotUnavailable(String),
    #[error("Candidate '{candidate}' is not standing for seat '{seat}'")]
    UnknownCandidate { seat: Seat, candidate: CandidateId },
    #[error("Seat '{0}' is not on the ballot")]
    UnknownSeat(Seat),
    #[error("No selection for seats: {}", join_seats(.missing))]
    IncompleteBallot { missing: Vec<Seat> },
    #[error("Vote submission failed: {0}")]
    SubmissionError(String),
    #[error("No vote found matching the given receipt")]
    VerificationNotFound,
    #[error("Operation requires phase {expected} but session is {actual}")]
    InvalidPhase { expected: Phase, actual: Phase },
    #[error("Every seat is abstained; there is no vote to cast")]
    NothingToSubmit,
    #[error("Only one seat may carry a choice per submission, found {0}")]
    MultipleChoices(usize),
    #[error("Malformed receipt hash: {0}")]
    MalformedHash(String),
    #[error("Transport error: {0}")]
    Transport(String),
    #[error(transparent)]
    Config(#[from] figment::Error),
}

fn join_seats(seats: &[Seat]) -> String {
    seats.iter().map(Seat::as_str).collect::<Vec<_>>().join(", ")
}

/// A plain discriminant for [`Error`], for matching without the payload.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    WalletUnavailable,
    UserRejected,
    NotEligible,
    AlreadyVoted,
    BallotUnavailable,
    UnknownCandidate,
    UnknownSeat,
    IncompleteBallot,
    SubmissionError,
    VerificationNotFound,
    InvalidPhase,
    NothingToSubmit,
    MultipleChoices,
    MalformedHash,
    Transport,
    Config,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::WalletUnavailable(_) => ErrorKind::WalletUnavailable,
            Self::UserRejected => ErrorKind::UserRejected,
            Self::NotEligible(_) => ErrorKind::NotEligible,
            Self::AlreadyVoted => ErrorKind::AlreadyVoted,
            Self::BallotUnavailable(_) => ErrorKind::BallotUnavailable,
            Self::UnknownCandidate { .. } => ErrorKind::UnknownCandidate,
            Self::UnknownSeat(_) => ErrorKind::UnknownSeat,
            Self::IncompleteBallot { .. } => ErrorKind::IncompleteBallot,
            Self::SubmissionError(_) => ErrorKind::SubmissionError,
            Self::VerificationNotFound => ErrorKind::VerificationNotFound,
            Self::InvalidPhase { .. } => ErrorKind::InvalidPhase,
            Self::NothingToSubmit => ErrorKind::NothingToSubmit,
            Self::MultipleChoices(_) => ErrorKind::MultipleChoices,
            Self::MalformedHash(_) => ErrorKind::MalformedHash,
            Self::Transport(_) => ErrorKind::Transport,
            Self::Config(_) => ErrorKind::Config,
        }
    }

    /// The message to show a voter. Never contains raw transport detail.
    pub fn user_message(&self) -> &'static str {
        match self.kind() {
            ErrorKind::WalletUnavailable => {
                "No wallet was found. Please install or unlock your wallet and try again."
            }
            ErrorKind::UserRejected => {
                "The request was cancelled in your wallet. Start again when you are ready."
            }
            ErrorKind::NotEligible => {
                "This wallet is not registered to vote. Please complete registration and verification first."
            }
            ErrorKind::AlreadyVoted => "You have already voted in this election.",
            ErrorKind::BallotUnavailable => {
                "The ballot for this election could not be loaded. Please try again later."
            }
            ErrorKind::UnknownCandidate | ErrorKind::UnknownSeat => {
                "That choice is not on this ballot."
            }
            ErrorKind::IncompleteBallot => {
                "Please make a choice, or abstain, for every seat before reviewing."
            }
            ErrorKind::SubmissionError => {
                "Your vote could not be submitted. Please check your connection and start again."
            }
            ErrorKind::VerificationNotFound => "No vote matching this receipt was found.",
            ErrorKind::InvalidPhase => "That action is not available at this step.",
            ErrorKind::NothingToSubmit => {
                "You have abstained on every seat, so there is no vote to submit."
            }
            ErrorKind::MultipleChoices => "Only one choice can be submitted per vote.",
            ErrorKind::MalformedHash => "That does not look like a valid receipt or transaction hash.",
            ErrorKind::Transport => "Network error. Please try again.",
            ErrorKind::Config => "The voting client is misconfigured.",
        }
    }
}
