//! In-memory stand-ins for the wallet, the election source and the results
//! channel. Every boundary call is appended to a shared log.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use tokio::sync::mpsc;

use crate::boundary::{
    BoundaryError, BoundaryResult, ElectionSource, ResultsChannel, ResultsStream, SignerContext,
    WalletProvider,
};
use crate::config::Config;
use crate::controller::SessionController;
use crate::model::{
    election::{BallotSeat, CandidateId, ElectionId},
    receipt::{CastConfirmation, CastVote, WalletAddress},
    results::{ElectionResults, ResultsMessage},
    verification::{ReceiptHash, VerificationDetails},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Connect,
    SignAndSend(CandidateId),
    IsEligible(WalletAddress),
    HasVoted(ElectionId, WalletAddress),
    GetBallot(ElectionId),
    CastVote(CandidateId),
    VerifyReceipt(ReceiptHash),
    GetResults(ElectionId),
}

type CallLog = Arc<Mutex<Vec<Call>>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap()
}

/// How the fake wallet answers a connection request.
#[derive(Debug, Clone)]
pub enum WalletBehaviour {
    Connects(WalletAddress),
    Missing,
    Rejects,
}

pub struct FakeWallet {
    behaviour: WalletBehaviour,
    calls: CallLog,
}

#[async_trait]
impl WalletProvider for FakeWallet {
    async fn connect(&self) -> BoundaryResult<WalletAddress> {
        lock(&self.calls).push(Call::Connect);
        match &self.behaviour {
            WalletBehaviour::Connects(address) => Ok(address.clone()),
            WalletBehaviour::Missing => Err(BoundaryError::Unavailable(
                "no injected provider".to_string(),
            )),
            WalletBehaviour::Rejects => Err(BoundaryError::Rejected),
        }
    }

    async fn sign_and_send(&self, cast: &CastVote) -> BoundaryResult<CastConfirmation> {
        lock(&self.calls).push(Call::SignAndSend(cast.candidate_id.clone()));
        Ok(CastConfirmation {
            transaction_ref: "0xwallet".to_string(),
            block_ref: "2048".to_string(),
            resource_used: 52000,
        })
    }
}

struct SourceState {
    eligible: bool,
    voted: HashSet<(ElectionId, WalletAddress)>,
    ballot: Vec<BallotSeat>,
    cast_fails: bool,
    results: ElectionResults,
    receipts: HashSet<String>,
    failing_reads: u32,
}

pub struct FakeSource {
    state: Mutex<SourceState>,
    calls: CallLog,
}

impl FakeSource {
    pub fn set_eligible(&self, eligible: bool) {
        lock(&self.state).eligible = eligible;
    }

    pub fn set_voted(&self, election_id: &str, address: &str, voted: bool) {
        let key: (ElectionId, WalletAddress) = (election_id.into(), address.into());
        let mut state = lock(&self.state);
        if voted {
            state.voted.insert(key);
        } else {
            state.voted.remove(&key);
        }
    }

    /// Make a transaction reference known to `verify_receipt`.
    pub fn record_receipt(&self, transaction_ref: &str) {
        lock(&self.state).receipts.insert(transaction_ref.to_string());
    }

    pub fn set_results(&self, results: ElectionResults) {
        lock(&self.state).results = results;
    }

    /// Make the next `n` reads fail with a transient transport error.
    pub fn fail_next_reads(&self, n: u32) {
        lock(&self.state).failing_reads = n;
    }

    pub fn results_fetches(&self) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|c| matches!(c, Call::GetResults(_)))
            .count()
    }

    fn read(&self, call: Call) -> BoundaryResult<MutexGuard<'_, SourceState>> {
        lock(&self.calls).push(call);
        let mut state = lock(&self.state);
        if state.failing_reads > 0 {
            state.failing_reads -= 1;
            return Err(BoundaryError::Transport("connection reset".to_string()));
        }
        Ok(state)
    }
}

#[async_trait]
impl ElectionSource for FakeSource {
    async fn is_eligible(
        &self,
        address: &WalletAddress,
        _signer: &SignerContext,
    ) -> BoundaryResult<bool> {
        Ok(self.read(Call::IsEligible(address.clone()))?.eligible)
    }

    async fn has_voted(
        &self,
        election_id: &ElectionId,
        address: &WalletAddress,
        signer: &SignerContext,
    ) -> BoundaryResult<bool> {
        assert_eq!(signer.address.as_ref(), Some(address));
        let state = self.read(Call::HasVoted(election_id.clone(), address.clone()))?;
        Ok(state.voted.contains(&(election_id.clone(), address.clone())))
    }

    async fn get_ballot(
        &self,
        election_id: &ElectionId,
        _signer: &SignerContext,
    ) -> BoundaryResult<Vec<BallotSeat>> {
        Ok(self.read(Call::GetBallot(election_id.clone()))?.ballot.clone())
    }

    async fn cast_vote(
        &self,
        cast: &CastVote,
        signer: &SignerContext,
    ) -> BoundaryResult<CastConfirmation> {
        lock(&self.calls).push(Call::CastVote(cast.candidate_id.clone()));
        assert_eq!(signer.address.as_ref(), Some(&cast.voter));
        let mut state = lock(&self.state);
        if state.cast_fails {
            return Err(BoundaryError::Transport("execution reverted".to_string()));
        }
        state
            .voted
            .insert((cast.election_id.clone(), cast.voter.clone()));
        Ok(CastConfirmation::example())
    }

    async fn verify_receipt(
        &self,
        hash: &ReceiptHash,
    ) -> BoundaryResult<Option<VerificationDetails>> {
        let state = self.read(Call::VerifyReceipt(hash.clone()))?;
        Ok(state.receipts.contains(hash.as_str()).then(|| VerificationDetails {
            election_title: "General Election".to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 11, 5, 9, 30, 0).unwrap(),
            block_ref: "1024".to_string(),
            transaction_ref: hash.to_string(),
        }))
    }

    async fn get_results(&self, election_id: &ElectionId) -> BoundaryResult<ElectionResults> {
        Ok(self.read(Call::GetResults(election_id.clone()))?.results.clone())
    }
}

/// A results channel whose handshake either succeeds at once or never completes.
pub struct FakeChannel {
    stream: Mutex<Option<ResultsStream>>,
}

impl FakeChannel {
    /// A channel that opens immediately; the sender feeds it.
    pub fn connected() -> (Self, mpsc::Sender<BoundaryResult<ResultsMessage>>) {
        let (sender, receiver) = mpsc::channel(8);
        (
            Self {
                stream: Mutex::new(Some(receiver)),
            },
            sender,
        )
    }

    /// A channel whose handshake hangs forever.
    pub fn stalled() -> Self {
        Self {
            stream: Mutex::new(None),
        }
    }
}

#[async_trait]
impl ResultsChannel for FakeChannel {
    async fn open(&self, _election_id: &ElectionId) -> BoundaryResult<ResultsStream> {
        let stream = lock(&self.stream).take();
        match stream {
            Some(stream) => Ok(stream),
            None => std::future::pending().await,
        }
    }
}

/// Everything a session test needs, wired to one shared call log.
pub struct Fixture {
    pub wallet: Arc<FakeWallet>,
    pub source: Arc<FakeSource>,
    calls: CallLog,
}

impl Fixture {
    fn build(
        wallet: WalletBehaviour,
        eligible: bool,
        voted: bool,
        ballot: Vec<BallotSeat>,
        cast_fails: bool,
    ) -> Self {
        let calls = CallLog::default();
        let mut voted_set: HashSet<(ElectionId, WalletAddress)> = HashSet::new();
        if voted {
            voted_set.insert(("e1".into(), "0xvoter".into()));
        }
        let source = FakeSource {
            state: Mutex::new(SourceState {
                eligible,
                voted: voted_set,
                ballot,
                cast_fails,
                results: ElectionResults::example("e1", &[("President", "c1", 3), ("President", "c2", 5)]),
                receipts: HashSet::from(["0xabc".to_string()]),
                failing_reads: 0,
            }),
            calls: calls.clone(),
        };
        Self {
            wallet: Arc::new(FakeWallet {
                behaviour: wallet,
                calls: calls.clone(),
            }),
            source: Arc::new(source),
            calls,
        }
    }

    fn president() -> Vec<BallotSeat> {
        vec![BallotSeat::example("President", &["c1", "c2"])]
    }

    fn connects() -> WalletBehaviour {
        WalletBehaviour::Connects("0xvoter".into())
    }

    pub fn happy_path() -> Self {
        Self::build(Self::connects(), true, false, Self::president(), false)
    }

    pub fn ineligible() -> Self {
        Self::build(Self::connects(), false, false, Self::president(), false)
    }

    pub fn already_voted() -> Self {
        Self::build(Self::connects(), true, true, Self::president(), false)
    }

    pub fn no_wallet() -> Self {
        Self::build(WalletBehaviour::Missing, true, false, Self::president(), false)
    }

    pub fn rejecting_wallet() -> Self {
        Self::build(WalletBehaviour::Rejects, true, false, Self::president(), false)
    }

    pub fn failing_cast() -> Self {
        Self::build(Self::connects(), true, false, Self::president(), true)
    }

    pub fn senate_only() -> Self {
        let ballot = vec![BallotSeat::example("Senate", &["s1", "s2"])];
        Self::build(Self::connects(), true, false, ballot, false)
    }

    pub fn two_seats() -> Self {
        let ballot = vec![
            BallotSeat::example("A", &["a1", "a2"]),
            BallotSeat::example("B", &["b1"]),
        ];
        Self::build(Self::connects(), true, false, ballot, false)
    }

    /// Test configuration: fast retries, backend cast route.
    pub fn config() -> Config {
        Config::default().with_read_retry(2, Duration::from_millis(1))
    }

    pub fn controller(&self) -> SessionController<FakeWallet, FakeSource> {
        self.controller_with(|config| config)
    }

    pub fn controller_with(
        &self,
        configure: impl FnOnce(Config) -> Config,
    ) -> SessionController<FakeWallet, FakeSource> {
        SessionController::new(
            self.wallet.clone(),
            self.source.clone(),
            SignerContext::new(Some("test-token".to_string())),
            configure(Self::config()),
        )
    }

    pub fn calls(&self) -> Vec<Call> {
        lock(&self.calls).clone()
    }

    pub fn cast_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::CastVote(_) | Call::SignAndSend(_)))
            .count()
    }
}

/// Poll `condition` until it holds, panicking after five seconds.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not met within 5s"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
