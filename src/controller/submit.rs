use chrono::Utc;

use crate::boundary::{BoundaryError, ElectionSource, SignerContext, WalletProvider};
use crate::config::CastRoute;
use crate::error::{Error, Result};
use crate::model::{receipt::VoteReceipt, session::VotingSession};
use crate::retry::describe;

/// Issue this session's one cast and record the receipt.
///
/// Never retried: a second attempt after an unclear outcome risks a double
/// vote, so any failure ends the session and the voter starts again from
/// the gate, which re-checks vote status.
pub(crate) async fn submit<W, S>(
    session: &mut VotingSession,
    wallet: &W,
    source: &S,
    signer: &SignerContext,
    route: CastRoute,
) -> Result<VoteReceipt>
where
    W: WalletProvider + ?Sized,
    S: ElectionSource + ?Sized,
{
    let id = session.id();
    let cast = session.begin_submission()?;
    info!(
        "session{id} casting for seat '{}' in election {} via {:?}",
        cast.seat, cast.election_id, route
    );

    let outcome = match route {
        CastRoute::Wallet => wallet.sign_and_send(&cast).await,
        CastRoute::Backend => {
            let signer = signer.with_address(cast.voter.clone());
            source.cast_vote(&cast, &signer).await
        }
    };

    let confirmation = match outcome {
        Ok(confirmation) => confirmation,
        Err(err) => {
            let err = match err {
                BoundaryError::Rejected => Error::UserRejected,
                other => {
                    error!("session{id} cast failed: {other}");
                    Error::SubmissionError(describe(&other))
                }
            };
            session.fail(&err);
            return Err(err);
        }
    };

    let receipt = VoteReceipt::new(cast, confirmation, Utc::now());
    session.submission_confirmed(receipt.clone())?;
    info!(
        "session{id} vote recorded in transaction {} (block {})",
        receipt.transaction_ref(),
        receipt.block_ref()
    );
    Ok(receipt)
}
