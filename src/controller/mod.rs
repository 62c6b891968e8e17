use std::sync::Arc;

use crate::boundary::{ElectionSource, SignerContext, WalletProvider};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::{
    election::{CandidateId, ElectionId, Seat},
    receipt::VoteReceipt,
    session::{Phase, VotingSession},
    verification::VerificationResult,
};
use crate::verify;

mod gate;
mod loader;
mod submit;

/// Drives one [`VotingSession`] against a wallet and an election source.
///
/// Every step that talks to the outside world is an `async` call the caller
/// awaits before doing anything else; `&mut self` keeps them sequential.
pub struct SessionController<W: ?Sized, S: ?Sized> {
    wallet: Arc<W>,
    source: Arc<S>,
    signer: SignerContext,
    config: Config,
    session: VotingSession,
}

impl<W, S> SessionController<W, S>
where
    W: WalletProvider + ?Sized,
    S: ElectionSource + ?Sized,
{
    pub fn new(wallet: Arc<W>, source: Arc<S>, signer: SignerContext, config: Config) -> Self {
        Self {
            wallet,
            source,
            signer,
            config,
            session: VotingSession::new(),
        }
    }

    pub fn session(&self) -> &VotingSession {
        &self.session
    }

    pub fn phase(&self) -> Phase {
        self.session.phase()
    }

    pub fn receipt(&self) -> Option<&VoteReceipt> {
        self.session.receipt()
    }

    pub fn choose_election(&mut self, election_id: ElectionId) -> Result<()> {
        self.session.choose_election(election_id)
    }

    /// Run the gate and, if it passes, load the ballot. Leaves the session
    /// in `Selecting` on success and `Failed` on any boundary failure.
    ///
    /// May be called again from `Failed` to retry, as long as no cast has
    /// been issued on this session.
    pub async fn run_gate(&mut self) -> Result<()> {
        let election_id = self.session.begin_gate()?.clone();
        let retry = self.config.read_retry();

        let gate = gate::run(
            &mut self.session,
            &election_id,
            self.wallet.as_ref(),
            self.source.as_ref(),
            &self.signer,
            retry,
        )
        .await;
        let outcome = match gate {
            Ok(_) => loader::load(&election_id, self.source.as_ref(), &self.signer, retry).await,
            Err(err) => Err(err),
        };

        match outcome {
            Ok(ballot) => {
                self.session.ballot_loaded(ballot)?;
                self.session.begin_selection()
            }
            Err(err) => {
                self.session.fail(&err);
                Err(err)
            }
        }
    }

    pub fn select(&mut self, seat: &Seat, candidate: CandidateId) -> Result<()> {
        self.session.select(seat, candidate)
    }

    pub fn abstain(&mut self, seat: &Seat) -> Result<()> {
        self.session.abstain(seat)
    }

    pub fn is_complete(&self) -> bool {
        self.session.is_complete()
    }

    pub fn review(&mut self) -> Result<()> {
        self.session.review()
    }

    /// Go back from review to change selections.
    pub fn edit(&mut self) -> Result<()> {
        self.session.edit()
    }

    /// Cast the reviewed selection. At most one cast is ever issued per
    /// session; later calls are refused without touching the boundary.
    pub async fn submit(&mut self) -> Result<VoteReceipt> {
        submit::submit(
            &mut self.session,
            self.wallet.as_ref(),
            self.source.as_ref(),
            &self.signer,
            self.config.cast_route(),
        )
        .await
    }

    /// Throw the session away and start a new one for the same election.
    /// This is the only way to try again after a cast has been attempted.
    pub fn restart(&mut self) -> Result<()> {
        let election_id = self
            .session
            .election_id()
            .cloned()
            .ok_or(Error::InvalidPhase {
                expected: Phase::Gating,
                actual: self.session.phase(),
            })?;
        info!(
            "session{} discarded, restarting election {election_id}",
            self.session.id()
        );
        self.session = VotingSession::for_election(election_id);
        Ok(())
    }

    /// Look up a receipt or hash with the source. Independent of session state.
    pub async fn verify(&self, hash_or_receipt: &str) -> Result<VerificationResult> {
        verify::verify(
            self.source.as_ref(),
            hash_or_receipt,
            self.config.read_retry(),
        )
        .await
    }

    /// Look up a receipt this or any earlier session produced.
    pub async fn verify_receipt(&self, receipt: &VoteReceipt) -> Result<VerificationResult> {
        verify::verify_receipt(self.source.as_ref(), receipt, self.config.read_retry()).await
    }
}

#[cfg(test)]
mod tests {
    use crate::config::CastRoute;
    use crate::error::ErrorKind;
    use crate::model::selection::Choice;
    use crate::testing::{Call, Fixture};

    use super::*;

    #[session_test]
    async fn happy_path(fixture: Fixture) {
        let mut controller = fixture.controller();
        controller.choose_election("e1".into()).unwrap();
        controller.run_gate().await.unwrap();
        assert_eq!(controller.phase(), Phase::Selecting);

        controller.select(&"President".into(), "c1".into()).unwrap();
        controller.review().unwrap();
        let receipt = controller.submit().await.unwrap();

        assert_eq!(controller.phase(), Phase::Submitted);
        assert_eq!(receipt.transaction_ref(), "0xabc");
        assert_eq!(receipt.election_snapshot().candidate_id.as_str(), "c1");
        assert_eq!(receipt.wallet_address().as_str(), "0xvoter");
        assert_eq!(controller.receipt(), Some(&receipt));
        assert_eq!(
            fixture.calls(),
            vec![
                Call::Connect,
                Call::IsEligible("0xvoter".into()),
                Call::HasVoted("e1".into(), "0xvoter".into()),
                Call::GetBallot("e1".into()),
                Call::CastVote("c1".into()),
            ]
        );
    }

    #[session_test(already_voted)]
    async fn already_voted_never_loads_ballot(fixture: Fixture) {
        let mut controller = fixture.controller();
        controller.choose_election("e1".into()).unwrap();
        let err = controller.run_gate().await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::AlreadyVoted);
        assert_eq!(controller.phase(), Phase::Failed);
        assert_eq!(
            controller.session().error().unwrap().kind,
            ErrorKind::AlreadyVoted
        );
        assert!(controller.session().ballot().is_empty());
        assert!(!fixture.calls().contains(&Call::GetBallot("e1".into())));
    }

    #[session_test(ineligible)]
    async fn ineligible_never_checks_vote_status(fixture: Fixture) {
        let mut controller = fixture.controller();
        controller.choose_election("e1".into()).unwrap();
        let err = controller.run_gate().await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NotEligible);
        assert_eq!(controller.session().gate_results().eligible(), Some(false));
        assert_eq!(controller.session().gate_results().already_voted(), None);
        assert_eq!(
            fixture.calls(),
            vec![Call::Connect, Call::IsEligible("0xvoter".into())]
        );
    }

    #[session_test(no_wallet)]
    async fn missing_wallet_stops_everything(fixture: Fixture) {
        let mut controller = fixture.controller();
        controller.choose_election("e1".into()).unwrap();
        let err = controller.run_gate().await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::WalletUnavailable);
        assert_eq!(
            controller.session().gate_results().wallet_connected(),
            Some(false)
        );
        assert_eq!(fixture.calls(), vec![Call::Connect]);
    }

    #[session_test(rejecting_wallet)]
    async fn declined_connection_is_distinct(fixture: Fixture) {
        let mut controller = fixture.controller();
        controller.choose_election("e1".into()).unwrap();
        let err = controller.run_gate().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UserRejected);
    }

    #[session_test(ineligible)]
    async fn gate_can_be_retried_in_full(fixture: Fixture) {
        let mut controller = fixture.controller();
        controller.choose_election("e1".into()).unwrap();
        controller.run_gate().await.unwrap_err();

        fixture.source.set_eligible(true);
        controller.run_gate().await.unwrap();
        assert_eq!(controller.phase(), Phase::Selecting);
        assert!(controller.session().error().is_none());
        assert_eq!(
            fixture
                .calls()
                .iter()
                .filter(|c| **c == Call::Connect)
                .count(),
            2
        );
    }

    #[session_test(two_seats)]
    async fn review_waits_for_every_seat(fixture: Fixture) {
        let mut controller = fixture.controller();
        controller.choose_election("e1".into()).unwrap();
        controller.run_gate().await.unwrap();

        controller.select(&"A".into(), "a1".into()).unwrap();
        assert!(!controller.is_complete());
        let err = controller.review().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IncompleteBallot);
        assert_eq!(controller.phase(), Phase::Selecting);

        controller.abstain(&"B".into()).unwrap();
        assert!(controller.is_complete());
        controller.review().unwrap();
        assert_eq!(controller.phase(), Phase::Reviewing);
    }

    #[session_test(two_seats)]
    async fn one_choice_per_submission(fixture: Fixture) {
        let mut controller = fixture.controller();
        controller.choose_election("e1".into()).unwrap();
        controller.run_gate().await.unwrap();

        controller.select(&"A".into(), "a1".into()).unwrap();
        controller.select(&"B".into(), "b1".into()).unwrap();
        let err = controller.review().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MultipleChoices);
        assert_eq!(controller.phase(), Phase::Selecting);

        controller.abstain(&"B".into()).unwrap();
        controller.review().unwrap();
        let receipt = controller.submit().await.unwrap();
        assert_eq!(receipt.election_snapshot().seat.as_str(), "A");
    }

    #[session_test]
    async fn unknown_candidate_is_refused(fixture: Fixture) {
        let mut controller = fixture.controller();
        controller.choose_election("e1".into()).unwrap();
        controller.run_gate().await.unwrap();

        let err = controller
            .select(&"President".into(), "c9".into())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownCandidate);
        assert!(controller.session().selections().is_empty());
    }

    #[session_test(senate_only)]
    async fn all_abstain_never_casts(fixture: Fixture) {
        let mut controller = fixture.controller();
        controller.choose_election("e1".into()).unwrap();
        controller.run_gate().await.unwrap();

        controller.abstain(&"Senate".into()).unwrap();
        assert!(controller.is_complete());
        assert_eq!(
            controller.session().selections().get(&"Senate".into()),
            Some(&Choice::Abstain)
        );
        controller.review().unwrap();

        let err = controller.submit().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NothingToSubmit);
        assert_eq!(controller.phase(), Phase::Reviewing);
        assert_eq!(fixture.cast_count(), 0);
    }

    #[session_test]
    async fn submit_happens_at_most_once(fixture: Fixture) {
        let mut controller = fixture.controller();
        controller.choose_election("e1".into()).unwrap();
        controller.run_gate().await.unwrap();
        controller.select(&"President".into(), "c1".into()).unwrap();
        controller.review().unwrap();

        let receipt = controller.submit().await.unwrap();
        for _ in 0..3 {
            let err = controller.submit().await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidPhase);
        }

        assert_eq!(fixture.cast_count(), 1);
        assert_eq!(controller.receipt(), Some(&receipt));
    }

    #[session_test(failing_cast)]
    async fn failed_cast_is_terminal(fixture: Fixture) {
        let mut controller = fixture.controller();
        controller.choose_election("e1".into()).unwrap();
        controller.run_gate().await.unwrap();
        controller.select(&"President".into(), "c1".into()).unwrap();
        controller.review().unwrap();

        let err = controller.submit().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SubmissionError);
        assert_eq!(controller.phase(), Phase::Failed);
        assert!(controller.receipt().is_none());

        // No resume: the gate will not re-run on this session, and submit is refused.
        assert_eq!(
            controller.run_gate().await.unwrap_err().kind(),
            ErrorKind::InvalidPhase
        );
        assert_eq!(
            controller.submit().await.unwrap_err().kind(),
            ErrorKind::InvalidPhase
        );
        assert_eq!(fixture.cast_count(), 1);

        // A fresh session re-checks vote status from the top.
        fixture.source.set_voted("e1", "0xvoter", true);
        controller.restart().unwrap();
        let err = controller.run_gate().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyVoted);
        assert_eq!(fixture.cast_count(), 1);
    }

    #[session_test]
    async fn wallet_route_signs_with_wallet(fixture: Fixture) {
        let mut controller = fixture.controller_with(|config| config.with_cast_route(CastRoute::Wallet));
        controller.choose_election("e1".into()).unwrap();
        controller.run_gate().await.unwrap();
        controller.select(&"President".into(), "c2".into()).unwrap();
        controller.review().unwrap();
        let receipt = controller.submit().await.unwrap();

        assert_eq!(receipt.transaction_ref(), "0xwallet");
        assert!(fixture.calls().contains(&Call::SignAndSend("c2".into())));
        assert!(!fixture.calls().iter().any(|c| matches!(c, Call::CastVote(_))));
    }

    #[session_test]
    async fn own_receipt_verifies_after_submission(fixture: Fixture) {
        let mut controller = fixture.controller_with(|config| config.with_cast_route(CastRoute::Wallet));
        controller.choose_election("e1".into()).unwrap();
        controller.run_gate().await.unwrap();
        controller.select(&"President".into(), "c1".into()).unwrap();
        controller.review().unwrap();
        let receipt = controller.submit().await.unwrap();
        fixture.source.record_receipt(receipt.transaction_ref());

        // "0xwallet" is not hex, so the reference is looked up verbatim.
        let saved = serde_json::to_string(&receipt).unwrap();
        let from_saved = controller.verify(&saved).await.unwrap();
        assert!(from_saved.is_valid);
        assert_eq!(controller.verify_receipt(&receipt).await.unwrap(), from_saved);
        assert_eq!(from_saved.into_details().unwrap().transaction_ref, "0xwallet");
    }

    #[session_test]
    async fn verification_ignores_session_state(fixture: Fixture) {
        let controller = fixture.controller();
        assert_eq!(controller.phase(), Phase::SelectingElection);

        let miss = controller.verify("deadbeef").await.unwrap();
        assert!(!miss.is_valid);

        let hit = controller.verify("0xABC").await.unwrap();
        assert!(hit.is_valid);
        assert_eq!(controller.verify("0xabc").await.unwrap(), hit);
    }
}
