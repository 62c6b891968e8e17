use crate::boundary::ElectionSource;
use crate::error::{Error, Result};
use crate::model::{
    receipt::VoteReceipt,
    verification::{ReceiptHash, VerificationResult},
};
use crate::retry::{describe, RetryPolicy};

/// Ask the source whether a vote matching `hash_or_receipt` exists. The input
/// is a hex hash or a receipt serialised as JSON.
///
/// Depends only on what the source holds, so the same input always gives the
/// same answer while the ledger is unchanged. A miss is `is_valid: false`, not
/// an error; only malformed input and transport failures are errors.
pub async fn verify<S>(
    source: &S,
    hash_or_receipt: &str,
    retry: RetryPolicy,
) -> Result<VerificationResult>
where
    S: ElectionSource + ?Sized,
{
    let hash = ReceiptHash::parse(hash_or_receipt)?;
    lookup(source, &hash, retry).await
}

/// [`verify`] for a receipt already in hand.
pub async fn verify_receipt<S>(
    source: &S,
    receipt: &VoteReceipt,
    retry: RetryPolicy,
) -> Result<VerificationResult>
where
    S: ElectionSource + ?Sized,
{
    let hash = ReceiptHash::try_from(receipt)?;
    lookup(source, &hash, retry).await
}

async fn lookup<S>(source: &S, hash: &ReceiptHash, retry: RetryPolicy) -> Result<VerificationResult>
where
    S: ElectionSource + ?Sized,
{
    let found = retry
        .run("receipt verification", || source.verify_receipt(hash))
        .await
        .map_err(|e| Error::Transport(describe(&e)))?;

    Ok(match found {
        Some(details) => {
            info!("receipt {hash} verified in block {}", details.block_ref);
            VerificationResult::found(details)
        }
        None => {
            info!("no vote found for receipt {hash}");
            VerificationResult::not_found()
        }
    })
}
