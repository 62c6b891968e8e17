use crate::boundary::{BoundaryError, ElectionSource, SignerContext, WalletProvider};
use crate::error::{Error, Result};
use crate::model::{election::ElectionId, receipt::WalletAddress, session::VotingSession};
use crate::retry::{describe, RetryPolicy};

/// Run the pre-ballot checks in their fixed order: connect the wallet,
/// check eligibility, then check for a prior vote. The first failure stops
/// the run; later checks are never issued.
pub(crate) async fn run<W, S>(
    session: &mut VotingSession,
    election_id: &ElectionId,
    wallet: &W,
    source: &S,
    signer: &SignerContext,
    retry: RetryPolicy,
) -> Result<WalletAddress>
where
    W: WalletProvider + ?Sized,
    S: ElectionSource + ?Sized,
{
    let id = session.id();

    // Connect. Not retried: it prompts a human.
    let address = match wallet.connect().await {
        Ok(address) => {
            session.record_wallet(Some(address.clone()));
            address
        }
        Err(err) => {
            session.record_wallet(None);
            return Err(match err {
                BoundaryError::Rejected => Error::UserRejected,
                other => Error::WalletUnavailable(describe(&other)),
            });
        }
    };
    info!("session{id} wallet connected as {address}");
    let signer = signer.with_address(address.clone());

    // Eligibility, keyed by address.
    let eligible = retry
        .run("eligibility check", || source.is_eligible(&address, &signer))
        .await
        .map_err(|e| Error::NotEligible(describe(&e)))?;
    session.record_eligible(eligible);
    if !eligible {
        return Err(Error::NotEligible(format!(
            "{address} is not registered for voting"
        )));
    }

    // Prior vote in this election.
    let already_voted = retry
        .run("vote status check", || {
            source.has_voted(election_id, &address, &signer)
        })
        .await
        .map_err(|e| Error::Transport(format!("vote status check: {}", describe(&e))))?;
    session.record_already_voted(already_voted);
    if already_voted {
        return Err(Error::AlreadyVoted);
    }

    info!("session{id} passed gate for election {election_id}");
    Ok(address)
}
