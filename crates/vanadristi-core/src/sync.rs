//! Data synchronization between the API and the views.
//!
//! [`QueryClient`] ties an [`ApiClient`] to a [`QueryCache`]:
//!
//! - [`QueryClient::fetch`] serves fresh cached values and fetches the rest,
//!   with at most one request in flight per key
//! - [`QueryClient::observe`] keeps a [`QueryState`] up to date in the
//!   background, refetching on invalidation and on the query's interval
//! - [`QueryClient::mutate`] performs a write and invalidates the affected
//!   keys by prefix when it succeeds
//!
//! # Example
//!
//! ```no_run
//! use vanadristi_core::{ClientConfig, QueryClient};
//! use vanadristi_core::mutations::DeletePlant;
//! use vanadristi_core::queries::GetPlants;
//!
//! # async fn example() -> Result<(), vanadristi_core::Error> {
//! let client = QueryClient::from_config(&ClientConfig::default())?;
//!
//! let plants = client.fetch(&GetPlants).await?;
//! if let Some(first) = plants.first() {
//!     client.mutate(&DeletePlant, &first.id).await?;
//! }
//!
//! // The list was invalidated, so this goes back to the server.
//! let plants = client.fetch(&GetPlants).await?;
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info, warn};

use crate::cache::{CacheEvent, QueryCache, QueryKey};
use crate::client::ApiClient;
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::mutation::Mutation;
use crate::query::Query;
use crate::retry::with_retry;

/// An error as shown to a view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryError {
    pub message: String,
    /// HTTP status, when the server answered.
    pub status: Option<u16>,
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl From<&Error> for QueryError {
    fn from(error: &Error) -> Self {
        let message = match error {
            Error::Api { message, .. } => message.clone(),
            other => other.to_string(),
        };
        Self {
            message,
            status: error.status(),
        }
    }
}

/// What a view renders for a query.
#[derive(Debug)]
pub enum QueryState<T> {
    /// Disabled; nothing will be fetched.
    Idle,
    /// First fetch in progress.
    Loading,
    Success(Arc<T>),
    Error(QueryError),
}

impl<T> Clone for QueryState<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Idle => Self::Idle,
            Self::Loading => Self::Loading,
            Self::Success(value) => Self::Success(Arc::clone(value)),
            Self::Error(error) => Self::Error(error.clone()),
        }
    }
}

impl<T> QueryState<T> {
    fn from_result(result: Result<Arc<T>>) -> Self {
        match result {
            Ok(value) => Self::Success(value),
            Err(e) => Self::Error(QueryError::from(&e)),
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    pub fn data(&self) -> Option<&Arc<T>> {
        match self {
            Self::Success(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&QueryError> {
        match self {
            Self::Error(error) => Some(error),
            _ => None,
        }
    }
}

/// Ticker firing every `period`, first after one full period.
///
/// `None` when the period is zero or too long to schedule; such a query is
/// only refetched on invalidation.
fn refetch_ticker(period: Duration) -> Option<Interval> {
    if period.is_zero() {
        return None;
    }
    let Some(start) = Instant::now().checked_add(period) else {
        warn!("Refetch interval {:?} is too long, ignoring it", period);
        return None;
    };
    let mut ticker = tokio::time::interval_at(start, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    Some(ticker)
}

/// Sweep the cache every half `gc_time` until the guard is dropped.
///
/// Outside a Tokio runtime nothing is spawned and the cache is only swept
/// by explicit [`QueryCache::collect_garbage`] calls.
fn spawn_gc_sweeper(cache: QueryCache) -> Option<DropGuard> {
    let Ok(runtime) = tokio::runtime::Handle::try_current() else {
        debug!("No runtime, cache garbage collection is manual");
        return None;
    };
    let period = (cache.config().gc_time / 2).max(MIN_GC_SWEEP);
    let mut ticker = refetch_ticker(period)?;
    let token = CancellationToken::new();
    let cancelled = token.clone();

    runtime.spawn(async move {
        loop {
            tokio::select! {
                _ = cancelled.cancelled() => break,
                _ = ticker.tick() => {
                    let evicted = cache.collect_garbage().await;
                    if evicted > 0 {
                        debug!("Garbage collection evicted {} cache entries", evicted);
                    }
                }
            }
        }
    });
    Some(token.drop_guard())
}

const MIN_GC_SWEEP: Duration = Duration::from_secs(1);

/// Cached access to the API.
///
/// Clones share the cache. A background sweep evicts entries nobody read
/// within `gc_time`; it stops when the last clone is dropped.
#[derive(Debug, Clone)]
pub struct QueryClient {
    api: ApiClient,
    cache: QueryCache,
    _gc: Option<Arc<DropGuard>>,
}

impl QueryClient {
    /// Must be called inside a Tokio runtime for garbage collection to run.
    pub fn new(api: ApiClient, cache: QueryCache) -> Self {
        let gc = spawn_gc_sweeper(cache.clone()).map(Arc::new);
        Self { api, cache, _gc: gc }
    }

    /// Build the API client and an empty cache from one config.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let api = ApiClient::from_config(config)?;
        Ok(Self::new(api, QueryCache::new(config.cache)))
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    /// Get a query's value, from the cache when fresh.
    ///
    /// Concurrent calls for the same key share one request: later callers
    /// wait for the first and read what it stored.
    pub async fn fetch<Q: Query>(&self, query: &Q) -> Result<Arc<Q::Output>> {
        let key = query.key();
        if !query.enabled() {
            return Err(Error::QueryDisabled { key });
        }

        if let Some(value) = self.cache.get::<Q::Output>(&key).await {
            debug!("Cache hit for {}", key);
            return Ok(value);
        }

        let seen = self.cache.fetched_at(&key).await;
        let lock = self.cache.fetch_lock(&key).await;
        let _guard = lock.lock().await;

        // Someone else may have fetched while we waited.
        if let Some(value) = self.cache.get::<Q::Output>(&key).await {
            return Ok(value);
        }
        if self.cache.fetched_at(&key).await != seen
            && let Some(value) = self.cache.peek::<Q::Output>(&key).await
        {
            return Ok(value);
        }

        debug!("Cache miss for {}", key);
        self.fetch_locked(query, key).await
    }

    /// Fetch from the server even if the cache is fresh.
    pub async fn refetch<Q: Query>(&self, query: &Q) -> Result<Arc<Q::Output>> {
        let key = query.key();
        if !query.enabled() {
            return Err(Error::QueryDisabled { key });
        }

        let lock = self.cache.fetch_lock(&key).await;
        let _guard = lock.lock().await;
        self.fetch_locked(query, key).await
    }

    async fn fetch_locked<Q: Query>(&self, query: &Q, key: QueryKey) -> Result<Arc<Q::Output>> {
        let name = key.to_string();
        match with_retry(&query.retry(), &name, || query.fetch(&self.api)).await {
            Ok(value) => {
                let value = Arc::new(value);
                self.cache.insert(key.clone(), Arc::clone(&value)).await;
                self.cache.emit(CacheEvent::Fetched { key });
                Ok(value)
            }
            Err(e) => {
                warn!("Fetching {} failed: {}", name, e);
                self.cache.emit(CacheEvent::FetchFailed {
                    key,
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Fetch a query and fold the outcome into a [`QueryState`].
    pub async fn query_state<Q: Query>(&self, query: &Q) -> QueryState<Q::Output> {
        if !query.enabled() {
            return QueryState::Idle;
        }
        QueryState::from_result(self.fetch(query).await)
    }

    /// Keep a query's state current in the background.
    ///
    /// The returned observer starts in [`QueryState::Loading`] and is
    /// updated after the first fetch, after each invalidation of the query's
    /// key and on every refetch interval. A disabled query stays
    /// [`QueryState::Idle`]. Dropping the observer stops the task.
    pub fn observe<Q: Query + 'static>(&self, query: Q) -> QueryObserver<Q::Output> {
        let token = CancellationToken::new();

        if !query.enabled() {
            let (_, rx) = watch::channel(QueryState::Idle);
            return QueryObserver {
                rx,
                _guard: token.drop_guard(),
            };
        }

        let (tx, rx) = watch::channel(QueryState::Loading);
        // Subscribe before spawning so no invalidation is missed.
        let mut events = self.cache.subscribe();
        let client = self.clone();
        let cancelled = token.clone();

        tokio::spawn(async move {
            let key = query.key();
            tx.send_replace(QueryState::from_result(client.fetch(&query).await));

            let mut ticker = query.refetch_interval().and_then(refetch_ticker);

            loop {
                let refresh = tokio::select! {
                    _ = cancelled.cancelled() => break,
                    _ = async {
                        match ticker.as_mut() {
                            Some(ticker) => {
                                ticker.tick().await;
                            }
                            None => std::future::pending::<()>().await,
                        }
                    } => {
                        debug!("Refetch interval elapsed for {}", key);
                        client.refetch(&query).await
                    }
                    event = events.recv() => match event {
                        Ok(event) if event.invalidates(&key) => {
                            debug!("{} invalidated, refetching", key);
                            client.fetch(&query).await
                        }
                        Ok(_) => continue,
                        Err(RecvError::Lagged(skipped)) => {
                            debug!("Observer of {} lagged by {} events", key, skipped);
                            client.refetch(&query).await
                        }
                        Err(RecvError::Closed) => break,
                    },
                };
                tx.send_replace(QueryState::from_result(refresh));
            }
            debug!("Observer of {} stopped", key);
        });

        QueryObserver {
            rx,
            _guard: token.drop_guard(),
        }
    }

    /// Run a mutation once.
    ///
    /// On success every key from [`Mutation::invalidates`] is invalidated
    /// by prefix. On failure the cache is left alone.
    pub async fn mutate<M: Mutation>(&self, mutation: &M, input: &M::Input) -> Result<M::Output> {
        match mutation.execute(&self.api, input).await {
            Ok(output) => {
                for key in mutation.invalidates(input) {
                    self.cache.invalidate_prefix(&key).await;
                }
                info!("{} succeeded", mutation.name());
                Ok(output)
            }
            Err(e) => {
                warn!("{} failed: {}", mutation.name(), e);
                Err(e)
            }
        }
    }

    /// Wrap a mutation in a stateful [`MutationHandle`].
    pub fn mutation<M: Mutation>(&self, mutation: M) -> MutationHandle<M> {
        MutationHandle {
            inner: Arc::new(HandleInner {
                client: self.clone(),
                mutation,
                state: watch::Sender::new(MutationState::Idle),
                generation: AtomicU64::new(0),
            }),
        }
    }
}

/// Live view of a query maintained by a background task.
///
/// The task is cancelled when the observer is dropped.
#[derive(Debug)]
pub struct QueryObserver<T> {
    rx: watch::Receiver<QueryState<T>>,
    _guard: DropGuard,
}

impl<T> QueryObserver<T> {
    /// Current state.
    pub fn state(&self) -> QueryState<T> {
        self.rx.borrow().clone()
    }

    /// Wait for the next state change.
    ///
    /// Returns `false` once the background task has ended.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }

    /// Wait until `predicate` holds and return that state.
    pub async fn wait_for(&mut self, predicate: impl FnMut(&QueryState<T>) -> bool) -> Option<QueryState<T>> {
        self.rx.wait_for(predicate).await.ok().map(|state| state.clone())
    }
}

/// Progress of a [`MutationHandle`].
#[derive(Debug)]
pub enum MutationState<T> {
    Idle,
    Pending,
    Success(Arc<T>),
    Error(QueryError),
}

impl<T> Clone for MutationState<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Idle => Self::Idle,
            Self::Pending => Self::Pending,
            Self::Success(value) => Self::Success(Arc::clone(value)),
            Self::Error(error) => Self::Error(error.clone()),
        }
    }
}

impl<T> MutationState<T> {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

struct HandleInner<M: Mutation> {
    client: QueryClient,
    mutation: M,
    state: watch::Sender<MutationState<M::Output>>,
    generation: AtomicU64,
}

/// A mutation with tracked state, one submission at a time.
pub struct MutationHandle<M: Mutation> {
    inner: Arc<HandleInner<M>>,
}

impl<M: Mutation> Clone for MutationHandle<M> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<M: Mutation> fmt::Debug for MutationHandle<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutationHandle")
            .field("mutation", &self.inner.mutation.name())
            .field("pending", &self.is_pending())
            .finish()
    }
}

impl<M: Mutation> MutationHandle<M> {
    /// Current state.
    pub fn state(&self) -> MutationState<M::Output> {
        self.inner.state.borrow().clone()
    }

    /// Watch state changes.
    pub fn subscribe(&self) -> watch::Receiver<MutationState<M::Output>> {
        self.inner.state.subscribe()
    }

    pub fn is_pending(&self) -> bool {
        self.inner.state.borrow().is_pending()
    }

    /// Back to [`MutationState::Idle`]. A request still in flight finishes
    /// but no longer updates the state.
    pub fn reset(&self) {
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        self.inner.state.send_replace(MutationState::Idle);
    }

    /// Submit the mutation.
    ///
    /// Fails with [`Error::SubmissionInFlight`] without sending anything if
    /// a previous submission is still pending.
    pub async fn mutate(&self, input: &M::Input) -> Result<Arc<M::Output>> {
        let mut started = false;
        self.inner.state.send_if_modified(|state| {
            if state.is_pending() {
                return false;
            }
            *state = MutationState::Pending;
            started = true;
            true
        });
        if !started {
            debug!("{} already pending", self.inner.mutation.name());
            return Err(Error::SubmissionInFlight);
        }
        let generation = self.inner.generation.load(Ordering::SeqCst);

        let result = self
            .inner
            .client
            .mutate(&self.inner.mutation, input)
            .await
            .map(Arc::new);

        if self.inner.generation.load(Ordering::SeqCst) == generation {
            self.inner.state.send_replace(match &result {
                Ok(output) => MutationState::Success(Arc::clone(output)),
                Err(e) => MutationState::Error(QueryError::from(e)),
            });
        }
        result
    }

    /// Submit and report the outcome through callbacks.
    pub async fn mutate_with(
        &self,
        input: &M::Input,
        on_success: impl FnOnce(&M::Output),
        on_error: impl FnOnce(&QueryError),
    ) -> MutationState<M::Output> {
        match self.mutate(input).await {
            Ok(output) => {
                on_success(&output);
                MutationState::Success(output)
            }
            Err(e) => {
                let error = QueryError::from(&e);
                on_error(&error);
                MutationState::Error(error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_error_from_api_error() {
        let error = QueryError::from(&Error::api(404, "Plant not found"));
        assert_eq!(error.message, "Plant not found");
        assert_eq!(error.status, Some(404));
        assert_eq!(error.to_string(), "Plant not found");
    }

    #[test]
    fn test_query_error_from_other_error() {
        let error = QueryError::from(&Error::SubmissionInFlight);
        assert_eq!(error.status, None);
        assert!(error.message.contains("in progress"));
    }

    #[test]
    fn test_query_state_accessors() {
        let state = QueryState::Success(Arc::new(5));
        assert_eq!(**state.data().unwrap(), 5);
        assert!(state.error().is_none());
        assert!(QueryState::<u8>::Loading.is_loading());
        assert!(MutationState::<u8>::Pending.is_pending());
    }

    #[tokio::test]
    async fn test_disabled_query_is_rejected_without_request() {
        // Nothing listens on this port; a request would fail differently.
        let client = QueryClient::new(
            ApiClient::new("http://127.0.0.1:9").unwrap(),
            QueryCache::default(),
        );
        let err = client
            .fetch(&crate::queries::GetPlant::new(""))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::QueryDisabled { .. }));

        let state = client
            .query_state(&crate::queries::GetSensorTrends::new(""))
            .await;
        assert!(matches!(state, QueryState::Idle));

        let observer = client.observe(crate::queries::GetAiAnalysis::new(""));
        assert!(matches!(observer.state(), QueryState::Idle));
    }

    #[tokio::test]
    async fn test_refetch_ticker_skips_unschedulable_periods() {
        assert!(refetch_ticker(Duration::ZERO).is_none());
        assert!(refetch_ticker(Duration::MAX).is_none());
        assert!(refetch_ticker(Duration::from_secs(u64::MAX)).is_none());
        assert!(refetch_ticker(Duration::from_secs(60)).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_observer_survives_huge_refetch_interval() {
        let client = QueryClient::new(
            ApiClient::new("http://127.0.0.1:9").unwrap(),
            QueryCache::default(),
        );
        let mut observer = client.observe(
            crate::queries::GetPlants.with_refetch_interval(Duration::from_secs(u64::MAX)),
        );
        // The first fetch fails against the closed port.
        assert!(observer.changed().await);
        assert!(observer.state().error().is_some());

        // A dead task would drop the sender and end `changed` at once.
        let next = tokio::time::timeout(Duration::from_secs(5), observer.changed()).await;
        assert!(next.is_err(), "observer task stopped");
    }

    #[test]
    fn test_no_gc_sweeper_outside_runtime() {
        let client = QueryClient::new(
            ApiClient::new("http://127.0.0.1:9").unwrap(),
            QueryCache::default(),
        );
        assert!(client._gc.is_none());
    }
}
