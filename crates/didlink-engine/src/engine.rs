//! # Attestation Engine
//!
//! Orchestrates fetch, link and re-verify for the current session and drives
//! the [`AttestationLifecycle`].
//!
//! ## Serialization
//!
//! Operations run one at a time behind a fair async mutex, so triggers that
//! arrive while one is in flight are queued in order and the last completed
//! fetch wins. Snapshot state lives behind a `parking_lot` lock that is never
//! held across an `.await`.
//!
//! ## Session generations
//!
//! Every session start or end bumps a generation counter. An operation
//! captures the generation when it begins and applies its result only if the
//! generation is unchanged; otherwise the result is discarded and the
//! operation returns [`EngineError::SessionChanged`].
//!
//! Generation changes are also broadcast on a `watch` channel. Every await
//! inside an operation races against it, so a session change releases the
//! operation lock at once instead of waiting on the old session's calls.
//!
//! ## Failure handling
//!
//! Store and signer failures move the engine to `Error(kind)` and are
//! returned to the caller. `NotFound` is not a failure. A malformed record is
//! logged and treated as no record. A store call that exceeds
//! [`EngineConfig::store_timeout`] (30 s unless configured) is a retryable
//! transport failure.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use didlink_core::{AttestationRecord, Identity, WalletAddress};
use didlink_crypto::build_message;
use didlink_store::{AttestationStore, StoreError};
use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::watch;

use crate::error::EngineError;
use crate::signer::WalletSigner;
use crate::sources::{collect_active_wallets, ActiveWalletSource};
use crate::state::{AttestationLifecycle, EngineState, ErrorKind, TransitionRecord};
use crate::verify::{reconcile, VerificationResult};
use crate::view::StatusView;

/// Engine tuning.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Upper bound on each store call. `None` waits until the call returns
    /// or the session changes.
    pub store_timeout: Option<Duration>,
}

impl EngineConfig {
    pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(30);
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            store_timeout: Some(Self::DEFAULT_STORE_TIMEOUT),
        }
    }
}

/// Point-in-time copy of what the engine knows.
#[derive(Debug, Clone, Serialize)]
pub struct EngineSnapshot {
    pub state: EngineState,
    pub identity: Option<Identity>,
    pub record: Option<AttestationRecord>,
    pub result: Option<VerificationResult>,
}

impl EngineSnapshot {
    pub fn view(&self) -> StatusView {
        StatusView::project(&self.state, self.result.as_ref())
    }
}

#[derive(Debug, Default)]
struct Inner {
    session: Option<Identity>,
    generation: u64,
    lifecycle: AttestationLifecycle,
    record: Option<AttestationRecord>,
    result: Option<VerificationResult>,
}

impl Inner {
    fn clear(&mut self) {
        self.record = None;
        self.result = None;
    }
}

/// The attestation lifecycle engine for one session at a time.
pub struct AttestationEngine<S> {
    store: S,
    sources: Vec<Arc<dyn ActiveWalletSource>>,
    config: EngineConfig,
    op_lock: tokio::sync::Mutex<()>,
    inner: RwLock<Inner>,
    generations: watch::Sender<u64>,
}

impl<S> std::fmt::Debug for AttestationEngine<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("AttestationEngine")
            .field("state", &inner.lifecycle.state())
            .field("session", &inner.session)
            .field("generation", &inner.generation)
            .field("sources", &self.sources.len())
            .finish()
    }
}

impl<S: AttestationStore> AttestationEngine<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            sources: Vec::new(),
            config: EngineConfig::default(),
            op_lock: tokio::sync::Mutex::new(()),
            inner: RwLock::new(Inner::default()),
            generations: watch::Sender::new(0),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Add an active wallet source.
    pub fn with_source(mut self, source: Arc<dyn ActiveWalletSource>) -> Self {
        self.sources.push(source);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn state(&self) -> EngineState {
        self.inner.read().lifecycle.state()
    }

    pub fn identity(&self) -> Option<Identity> {
        self.inner.read().session.clone()
    }

    /// The most recent verification result, if a record is held.
    pub fn last_result(&self) -> Option<VerificationResult> {
        self.inner.read().result.clone()
    }

    pub fn transitions(&self) -> Vec<TransitionRecord> {
        self.inner.read().lifecycle.transitions().to_vec()
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        let inner = self.inner.read();
        EngineSnapshot {
            state: inner.lifecycle.state(),
            identity: inner.session.clone(),
            record: inner.record.clone(),
            result: inner.result.clone(),
        }
    }

    pub fn view(&self) -> StatusView {
        self.snapshot().view()
    }

    // ── Session ──────────────────────────────────────────────────────

    /// Begin a session for `identity` and fetch its attestation.
    ///
    /// Any operation still in flight for an earlier session is discarded
    /// when it completes.
    pub async fn start_session(&self, identity: Identity) -> Result<EngineState, EngineError> {
        {
            let mut inner = self.inner.write();
            inner.generation += 1;
            inner.clear();
            inner
                .lifecycle
                .transition(EngineState::NoSession, "session replaced")?;
            tracing::info!(did = %identity, generation = inner.generation, "session started");
            inner.session = Some(identity);
            self.generations.send_replace(inner.generation);
        }
        self.refresh().await
    }

    /// End the session. Does not wait for in-flight operations; they are
    /// cancelled at their next await.
    pub fn end_session(&self) {
        let mut inner = self.inner.write();
        inner.generation += 1;
        self.generations.send_replace(inner.generation);
        inner.clear();
        if let Some(identity) = inner.session.take() {
            tracing::info!(did = %identity, "session ended");
        }
        // NoSession is reachable from every state.
        let _ = inner
            .lifecycle
            .transition(EngineState::NoSession, "session ended");
    }

    // ── Operations ───────────────────────────────────────────────────

    /// Fetch the attestation and reconcile it with the active wallets.
    pub async fn refresh(&self) -> Result<EngineState, EngineError> {
        let _guard = self.op_lock.lock().await;
        let (identity, generation) = self.current_session()?;
        self.apply(generation, "refresh", |inner| {
            inner.lifecycle.transition(EngineState::Loading, "refresh")
        })?;
        self.load(&identity, generation).await
    }

    /// Store `signature` as the identity's attestation for `address`, then
    /// re-fetch and verify it.
    ///
    /// The signature is not checked before writing; the stored record is
    /// verified only after it has been read back.
    pub async fn link(
        &self,
        address: WalletAddress,
        signature: &str,
    ) -> Result<EngineState, EngineError> {
        let _guard = self.op_lock.lock().await;
        let (identity, generation) = self.current_session()?;
        self.begin_link(generation, &address)?;
        self.write_and_reload(&identity, generation, &address, signature)
            .await
    }

    /// Ask `signer` to sign the binding message for its own address, then
    /// link as in [`link`](Self::link).
    pub async fn link_with_signer(
        &self,
        signer: &dyn WalletSigner,
    ) -> Result<EngineState, EngineError> {
        let _guard = self.op_lock.lock().await;
        let (identity, generation) = self.current_session()?;
        let address = signer.address();
        self.begin_link(generation, &address)?;

        let message = build_message(&identity, &address);
        let signature = match self
            .within_session(generation, "link", signer.sign_message(&message))
            .await?
        {
            Ok(signature) => signature,
            Err(e) => {
                tracing::warn!(did = %identity, address = %address, error = %e, "wallet did not sign");
                return self.fail(generation, "link", e.into());
            }
        };
        self.write_and_reload(&identity, generation, &address, &signature)
            .await
    }

    /// Re-check the held record against a fresh active wallet set.
    ///
    /// Also the entry point when the active wallets change. Without a held
    /// record this is a refresh.
    pub async fn re_verify(&self) -> Result<EngineState, EngineError> {
        let _guard = self.op_lock.lock().await;
        let (identity, generation) = self.current_session()?;

        let held = {
            let inner = self.inner.read();
            inner
                .record
                .clone()
                .filter(|_| inner.lifecycle.state().has_record())
        };
        let Some(record) = held else {
            self.apply(generation, "re-verify", |inner| {
                inner
                    .lifecycle
                    .transition(EngineState::Loading, "re-verify without record")
            })?;
            return self.load(&identity, generation).await;
        };

        let wallets = self
            .within_session(
                generation,
                "re-verify",
                collect_active_wallets(&identity, &self.sources),
            )
            .await?;
        let result = reconcile(&identity, &record, &wallets);
        self.apply(generation, "re-verify", |inner| {
            Self::settle(inner, &result)?;
            inner.result = Some(result.clone());
            Ok(inner.lifecycle.state())
        })
    }

    /// Leave `Error` by fetching again.
    pub async fn retry(&self) -> Result<EngineState, EngineError> {
        let state = self.state();
        if state.error_kind().is_none() {
            return Err(EngineError::InvalidTransition {
                from: state.to_string(),
                to: EngineState::Loading.to_string(),
            });
        }
        self.refresh().await
    }

    // ── Internals ────────────────────────────────────────────────────

    fn current_session(&self) -> Result<(Identity, u64), EngineError> {
        let inner = self.inner.read();
        inner
            .session
            .clone()
            .map(|identity| (identity, inner.generation))
            .ok_or(EngineError::NoSession)
    }

    /// Run `f` against the snapshot if the session is still `generation`.
    fn apply<T>(
        &self,
        generation: u64,
        operation: &str,
        f: impl FnOnce(&mut Inner) -> Result<T, EngineError>,
    ) -> Result<T, EngineError> {
        let mut inner = self.inner.write();
        if inner.generation != generation || inner.session.is_none() {
            tracing::warn!(
                operation,
                started = generation,
                current = inner.generation,
                "session changed; discarding result"
            );
            return Err(EngineError::SessionChanged {
                operation: operation.to_string(),
            });
        }
        f(&mut inner)
    }

    /// Move to `Error(kind)` and return `error`.
    fn fail<T>(&self, generation: u64, operation: &str, error: EngineError) -> Result<T, EngineError> {
        let kind = match &error {
            EngineError::Store(e) => ErrorKind::from_store(e),
            EngineError::Signer(e) => ErrorKind::from_signer(e),
            _ => ErrorKind::Store,
        };
        self.apply(generation, operation, |inner| {
            inner.clear();
            inner
                .lifecycle
                .transition(EngineState::Error(kind), &error.to_string())?;
            Ok(())
        })?;
        Err(error)
    }

    fn begin_link(&self, generation: u64, address: &WalletAddress) -> Result<(), EngineError> {
        self.apply(generation, "link", |inner| {
            inner.lifecycle.transition(
                EngineState::LinkInProgress,
                &format!("link requested for {address}"),
            )
        })
    }

    /// Apply a verification result to the lifecycle.
    fn settle(inner: &mut Inner, result: &VerificationResult) -> Result<(), EngineError> {
        match (inner.lifecycle.state(), result.is_authentic()) {
            (EngineState::RecordUnverified, true) => inner.lifecycle.mark_verified(result),
            (EngineState::RecordVerified, false) => inner
                .lifecycle
                .transition(EngineState::RecordUnverified, "signature no longer verifies"),
            _ => Ok(()),
        }
    }

    /// Await `fut` unless the session moves past `generation` first.
    async fn within_session<F: Future>(
        &self,
        generation: u64,
        operation: &str,
        fut: F,
    ) -> Result<F::Output, EngineError> {
        let mut generations = self.generations.subscribe();
        tokio::select! {
            biased;
            _ = generations.wait_for(|current| *current != generation) => {
                tracing::warn!(operation, started = generation, "session changed; cancelling in-flight call");
                Err(EngineError::SessionChanged {
                    operation: operation.to_string(),
                })
            }
            output = fut => Ok(output),
        }
    }

    /// A store call bounded by the configured timeout and the session.
    async fn timed<T>(
        &self,
        generation: u64,
        operation: &str,
        endpoint: &str,
        call: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<Result<T, StoreError>, EngineError> {
        let bounded = async {
            match self.config.store_timeout {
                Some(limit) => tokio::time::timeout(limit, call).await.unwrap_or_else(|_| {
                    Err(StoreError::Transport {
                        endpoint: endpoint.to_string(),
                        reason: format!("timed out after {limit:?}"),
                        retryable: true,
                    })
                }),
                None => call.await,
            }
        };
        self.within_session(generation, operation, bounded).await
    }

    async fn write_and_reload(
        &self,
        identity: &Identity,
        generation: u64,
        address: &WalletAddress,
        signature: &str,
    ) -> Result<EngineState, EngineError> {
        let locator = match self
            .timed(
                generation,
                "link",
                "putRecord",
                self.store.put(identity, address, signature),
            )
            .await?
        {
            Ok(locator) => locator,
            Err(e) => return self.fail(generation, "link", e.into()),
        };
        tracing::info!(did = %identity, address = %address, locator = %locator, "attestation written");

        self.apply(generation, "link", |inner| {
            inner
                .lifecycle
                .transition(EngineState::Loading, "link completed")
        })?;
        self.load(identity, generation).await
    }

    /// Fetch and reconcile. The lifecycle must already be `Loading`.
    async fn load(&self, identity: &Identity, generation: u64) -> Result<EngineState, EngineError> {
        let record = match self
            .timed(generation, "refresh", "getRecord", self.store.get(identity))
            .await?
        {
            Ok(record) => Some(record),
            Err(StoreError::NotFound { .. }) => None,
            Err(StoreError::MalformedRecord { locator, reason }) => {
                tracing::warn!(did = %identity, locator = %locator, reason = %reason, "malformed attestation record; treating as absent");
                None
            }
            Err(e) => return self.fail(generation, "refresh", e.into()),
        };

        let result = match &record {
            Some(record) => {
                let wallets = self
                    .within_session(
                        generation,
                        "refresh",
                        collect_active_wallets(identity, &self.sources),
                    )
                    .await?;
                Some(reconcile(identity, record, &wallets))
            }
            None => None,
        };

        self.apply(generation, "refresh", |inner| {
            match &result {
                None => inner
                    .lifecycle
                    .transition(EngineState::NoRecord, "no attestation record")?,
                Some(result) => {
                    inner
                        .lifecycle
                        .transition(EngineState::RecordUnverified, "attestation record fetched")?;
                    Self::settle(inner, result)?;
                }
            }
            inner.record = record;
            inner.result = result.clone();
            Ok(inner.lifecycle.state())
        })
    }
}
