//! The external systems a voting session talks to. Nothing here holds vote
//! state; every answer comes from the far side of one of these traits.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::model::{
    election::{BallotSeat, ElectionId},
    receipt::{CastConfirmation, CastVote, WalletAddress},
    results::{ElectionResults, ResultsMessage},
    verification::{ReceiptHash, VerificationDetails},
};

pub mod http;

pub use http::HttpElectionSource;

/// Failures reported by a boundary implementation, before the controller
/// decides what they mean for the session.
#[derive(Debug, Error)]
pub enum BoundaryError {
    /// No provider or account could be reached.
    #[error("Unavailable: {0}")]
    Unavailable(String),
    /// The human declined a prompt.
    #[error("Rejected by user")]
    Rejected,
    #[error("Not found")]
    NotFound,
    #[error("Timed out")]
    Timeout,
    #[error("Malformed response: {0}")]
    Malformed(String),
    #[error("Invalid backend URL: {0}")]
    InvalidUrl(String),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("Transport error: {0}")]
    Transport(String),
}

impl BoundaryError {
    /// Whether an idempotent read may be attempted again.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout | Self::Transport(_) => true,
            Self::Http(err) => {
                err.is_timeout()
                    || err.is_connect()
                    || err.status().map_or(true, |s| s.is_server_error())
            }
            Self::Unavailable(_)
            | Self::Rejected
            | Self::NotFound
            | Self::Malformed(_)
            | Self::InvalidUrl(_) => false,
        }
    }
}

pub type BoundaryResult<T> = std::result::Result<T, BoundaryError>;

/// Credentials passed explicitly with every source call, instead of living
/// in shared global state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignerContext {
    /// The connected wallet, once known.
    pub address: Option<WalletAddress>,
    /// Bearer token for the REST backend, if the voter is signed in.
    pub auth_token: Option<String>,
}

impl SignerContext {
    pub fn new(auth_token: Option<String>) -> Self {
        Self {
            address: None,
            auth_token,
        }
    }

    pub fn with_address(&self, address: WalletAddress) -> Self {
        Self {
            address: Some(address),
            auth_token: self.auth_token.clone(),
        }
    }
}

/// The local signing provider, e.g. a browser wallet extension.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Obtain the active account. May prompt the user.
    async fn connect(&self) -> BoundaryResult<WalletAddress>;

    /// Sign the cast as a transaction and send it to the ledger. May prompt the user.
    async fn sign_and_send(&self, cast: &CastVote) -> BoundaryResult<CastConfirmation>;
}

/// The single source of truth for eligibility, vote status, ballots and receipts.
#[async_trait]
pub trait ElectionSource: Send + Sync {
    async fn is_eligible(
        &self,
        address: &WalletAddress,
        signer: &SignerContext,
    ) -> BoundaryResult<bool>;

    async fn has_voted(
        &self,
        election_id: &ElectionId,
        address: &WalletAddress,
        signer: &SignerContext,
    ) -> BoundaryResult<bool>;

    async fn get_ballot(
        &self,
        election_id: &ElectionId,
        signer: &SignerContext,
    ) -> BoundaryResult<Vec<BallotSeat>>;

    async fn cast_vote(
        &self,
        cast: &CastVote,
        signer: &SignerContext,
    ) -> BoundaryResult<CastConfirmation>;

    /// `Ok(None)` when no vote matches; distinct from a transport failure.
    async fn verify_receipt(&self, hash: &ReceiptHash)
        -> BoundaryResult<Option<VerificationDetails>>;

    async fn get_results(&self, election_id: &ElectionId) -> BoundaryResult<ElectionResults>;
}

/// Inbound half of a live results channel. A transport error on the stream
/// is delivered in-band; the stream ending means the channel closed.
pub type ResultsStream = mpsc::Receiver<BoundaryResult<ResultsMessage>>;

/// A push channel for one election's results.
#[async_trait]
pub trait ResultsChannel: Send + Sync {
    /// Complete the handshake and hand back the message stream.
    async fn open(&self, election_id: &ElectionId) -> BoundaryResult<ResultsStream>;
}
