use crate::boundary::{ElectionSource, SignerContext};
use crate::error::{Error, Result};
use crate::model::election::{Ballot, ElectionId};
use crate::retry::{describe, RetryPolicy};

/// Fetch and freeze the seat and candidate structure for an election.
pub(crate) async fn load<S>(
    election_id: &ElectionId,
    source: &S,
    signer: &SignerContext,
    retry: RetryPolicy,
) -> Result<Ballot>
where
    S: ElectionSource + ?Sized,
{
    let raw = retry
        .run("ballot load", || source.get_ballot(election_id, signer))
        .await
        .map_err(|e| Error::BallotUnavailable(describe(&e)))?;
    let ballot = Ballot::from_seats(raw).map_err(|e| Error::BallotUnavailable(e.to_string()))?;
    debug!(
        "loaded ballot for election {election_id} with {} seat(s)",
        ballot.seats().count()
    );
    Ok(ballot)
}
