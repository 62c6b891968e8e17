use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::config::Config;
use crate::model::{
    election::{BallotSeat, ElectionId},
    receipt::{CastConfirmation, CastVote, WalletAddress},
    results::ElectionResults,
    verification::{ReceiptHash, VerificationDetails},
};

use super::{BoundaryError, BoundaryResult, ElectionSource, SignerContext};

/// The REST backend, acting as the authoritative election source.
#[derive(Debug, Clone)]
pub struct HttpElectionSource {
    client: Client,
    base_url: Url,
}

impl HttpElectionSource {
    pub fn new(config: &Config) -> BoundaryResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Self::with_client(client, config.api_base_url())
    }

    pub fn with_client(client: Client, base_url: &str) -> BoundaryResult<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| BoundaryError::InvalidUrl(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(BoundaryError::InvalidUrl(base_url.to_string()));
        }
        Ok(Self { client, base_url })
    }

    /// The base URL with `segments` appended, each percent-encoded as a
    /// single path segment.
    fn endpoint(&self, segments: &[&str]) -> BoundaryResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| BoundaryError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn get(
        &self,
        segments: &[&str],
        signer: Option<&SignerContext>,
    ) -> BoundaryResult<RequestBuilder> {
        Ok(authorize(self.client.get(self.endpoint(segments)?), signer))
    }
}

fn authorize(request: RequestBuilder, signer: Option<&SignerContext>) -> RequestBuilder {
    match signer.and_then(|s| s.auth_token.as_deref()) {
        Some(token) => request.bearer_auth(token),
        None => request,
    }
}

/// Map the status, then decode the JSON body.
async fn decode<T: DeserializeOwned>(response: Response) -> BoundaryResult<T> {
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Err(BoundaryError::NotFound);
    }
    let response = response.error_for_status()?;
    let body = response.bytes().await?;
    serde_json::from_slice(&body)
        .map_err(|e| BoundaryError::Malformed(format!("{status} response: {e}")))
}

#[derive(Deserialize)]
struct EligibilityResponse {
    eligible: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VotedResponse {
    has_voted: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CastRequest<'a> {
    seat: &'a str,
    candidate_id: &'a str,
    voter: &'a str,
}

/// The receipt lookup as it comes off the wire; fields are only present for a match.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VerificationRecord {
    is_valid: bool,
    election_title: Option<String>,
    timestamp: Option<DateTime<Utc>>,
    block_ref: Option<String>,
    transaction_ref: Option<String>,
}

impl VerificationRecord {
    fn into_details(self) -> BoundaryResult<Option<VerificationDetails>> {
        if !self.is_valid {
            return Ok(None);
        }
        match (
            self.election_title,
            self.timestamp,
            self.block_ref,
            self.transaction_ref,
        ) {
            (Some(election_title), Some(timestamp), Some(block_ref), Some(transaction_ref)) => {
                Ok(Some(VerificationDetails {
                    election_title,
                    timestamp,
                    block_ref,
                    transaction_ref,
                }))
            }
            _ => Err(BoundaryError::Malformed(
                "valid receipt without provenance".to_string(),
            )),
        }
    }
}

#[async_trait]
impl ElectionSource for HttpElectionSource {
    async fn is_eligible(
        &self,
        address: &WalletAddress,
        signer: &SignerContext,
    ) -> BoundaryResult<bool> {
        let request = self.get(&["voters", address.as_str(), "eligibility"], Some(signer))?;
        let response = request.send().await?;
        Ok(decode::<EligibilityResponse>(response).await?.eligible)
    }

    async fn has_voted(
        &self,
        election_id: &ElectionId,
        address: &WalletAddress,
        signer: &SignerContext,
    ) -> BoundaryResult<bool> {
        let segments = ["elections", election_id.as_str(), "voters", address.as_str(), "voted"];
        let response = self.get(&segments, Some(signer))?.send().await?;
        Ok(decode::<VotedResponse>(response).await?.has_voted)
    }

    async fn get_ballot(
        &self,
        election_id: &ElectionId,
        signer: &SignerContext,
    ) -> BoundaryResult<Vec<BallotSeat>> {
        let request = self.get(&["elections", election_id.as_str(), "ballot"], Some(signer))?;
        decode(request.send().await?).await
    }

    async fn cast_vote(
        &self,
        cast: &CastVote,
        signer: &SignerContext,
    ) -> BoundaryResult<CastConfirmation> {
        let url = self.endpoint(&["elections", cast.election_id.as_str(), "votes"])?;
        let body = CastRequest {
            seat: cast.seat.as_str(),
            candidate_id: cast.candidate_id.as_str(),
            voter: cast.voter.as_str(),
        };
        let response = authorize(self.client.post(url), Some(signer))
            .json(&body)
            .send()
            .await?;
        decode(response).await
    }

    async fn verify_receipt(
        &self,
        hash: &ReceiptHash,
    ) -> BoundaryResult<Option<VerificationDetails>> {
        let response = self.get(&["receipts", hash.as_str()], None)?.send().await?;
        match decode::<VerificationRecord>(response).await {
            Ok(record) => record.into_details(),
            Err(BoundaryError::NotFound) => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn get_results(&self, election_id: &ElectionId) -> BoundaryResult<ElectionResults> {
        let request = self.get(&["elections", election_id.as_str(), "results"], None)?;
        decode(request.send().await?).await
    }
}
