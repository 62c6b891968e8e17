use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

use super::receipt::VoteReceipt;

/// A transaction reference to look up. Hex hashes are normalised to `0x`
/// followed by lowercase hex; references from a receipt that are not hex are
/// kept exactly as the ledger issued them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ReceiptHash(String);

impl ReceiptHash {
    /// Accepts a bare or `0x`-prefixed hex hash in any case, or a whole
    /// receipt as JSON, in which case its transaction reference is used.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.starts_with('{') {
            let receipt: VoteReceipt = serde_json::from_str(input)
                .map_err(|e| Error::MalformedHash(format!("unreadable receipt: {e}")))?;
            return Self::try_from(&receipt);
        }
        Self::parse_hex(input)
    }

    fn parse_hex(input: &str) -> Result<Self> {
        let digits = input
            .strip_prefix("0x")
            .or_else(|| input.strip_prefix("0X"))
            .unwrap_or(input);
        if digits.is_empty() {
            return Err(Error::MalformedHash("empty hash".to_string()));
        }
        if let Some(bad) = digits.chars().find(|c| !c.is_ascii_hexdigit()) {
            return Err(Error::MalformedHash(format!("unexpected character {bad:?}")));
        }

        Ok(Self(format!("0x{}", digits.to_ascii_lowercase())))
    }

    /// A reference issued by the ledger. Hex is normalised; anything else is
    /// used verbatim.
    fn from_reference(reference: &str) -> Result<Self> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(Error::MalformedHash(
                "receipt has no transaction reference".to_string(),
            ));
        }
        Ok(Self::parse_hex(reference).unwrap_or_else(|_| Self(reference.to_string())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&VoteReceipt> for ReceiptHash {
    type Error = Error;

    fn try_from(receipt: &VoteReceipt) -> Result<Self> {
        Self::from_reference(receipt.transaction_ref())
    }
}

impl FromStr for ReceiptHash {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ReceiptHash {
    type Error = Error;

    fn try_from(raw: String) -> Result<Self> {
        Self::from_reference(&raw)
    }
}

impl From<ReceiptHash> for String {
    fn from(hash: ReceiptHash) -> Self {
        hash.0
    }
}

impl Display for ReceiptHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Provenance of a vote, as recorded by the authoritative source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationDetails {
    pub election_title: String,
    pub timestamp: DateTime<Utc>,
    pub block_ref: String,
    pub transaction_ref: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    pub is_valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<VerificationDetails>,
}

impl VerificationResult {
    pub fn found(details: VerificationDetails) -> Self {
        Self {
            is_valid: true,
            details: Some(details),
        }
    }

    pub fn not_found() -> Self {
        Self {
            is_valid: false,
            details: None,
        }
    }

    /// The details, or [`Error::VerificationNotFound`] if there is no match.
    pub fn into_details(self) -> Result<VerificationDetails> {
        match self.details {
            Some(details) if self.is_valid => Ok(details),
            _ => Err(Error::VerificationNotFound),
        }
    }
}
