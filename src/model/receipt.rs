use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::election::{CandidateId, ElectionId, Seat};
use super::string_id;

string_id!(
    /// An account address handed out by the wallet provider.
    WalletAddress
);

/// The single vote-cast operation issued for a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CastVote {
    pub election_id: ElectionId,
    pub seat: Seat,
    pub candidate_id: CandidateId,
    pub voter: WalletAddress,
}

/// What the ledger reports back for a confirmed cast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CastConfirmation {
    pub transaction_ref: String,
    pub block_ref: String,
    /// Gas or equivalent cost charged for the transaction.
    #[serde(default)]
    pub resource_used: u64,
}

/// Identifiers echoed back into the receipt so the voter can tell what it covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectionSnapshot {
    pub election_id: ElectionId,
    pub seat: Seat,
    pub candidate_id: CandidateId,
}

/// Proof of a successful cast. Only the submission executor builds these, and
/// nothing hands out a mutable reference once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteReceipt {
    transaction_ref: String,
    block_ref: String,
    resource_used: u64,
    election_snapshot: ElectionSnapshot,
    wallet_address: WalletAddress,
    submitted_at: DateTime<Utc>,
}

impl VoteReceipt {
    pub(crate) fn new(
        cast: CastVote,
        confirmation: CastConfirmation,
        submitted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            transaction_ref: confirmation.transaction_ref,
            block_ref: confirmation.block_ref,
            resource_used: confirmation.resource_used,
            election_snapshot: ElectionSnapshot {
                election_id: cast.election_id,
                seat: cast.seat,
                candidate_id: cast.candidate_id,
            },
            wallet_address: cast.voter,
            submitted_at,
        }
    }

    pub fn transaction_ref(&self) -> &str {
        &self.transaction_ref
    }

    pub fn block_ref(&self) -> &str {
        &self.block_ref
    }

    pub fn resource_used(&self) -> u64 {
        self.resource_used
    }

    pub fn election_snapshot(&self) -> &ElectionSnapshot {
        &self.election_snapshot
    }

    pub fn wallet_address(&self) -> &WalletAddress {
        &self.wallet_address
    }

    /// Client clock at confirmation time; the ledger's own timestamp is
    /// what verification reports.
    pub fn submitted_at(&self) -> DateTime<Utc> {
        self.submitted_at
    }
}
