//! The remote data coordinator: cached reads, invalidating writes, and the
//! session bookkeeping that goes with them.
//!
//! Reads go through [Coordinator::query]. Concurrent reads of the same key
//! share a single request, fresh results are served from the [QueryCache],
//! and transient failures are retried according to the [RetryPolicy].
//!
//! Writes go through [Coordinator::mutate]. A write is sent exactly once, and
//! when it succeeds every cache partition it is declared to affect is
//! invalidated so the next read refetches.

mod cache;
mod key;
mod mutation;
mod retry;
mod session;

pub use cache::{CacheSnapshot, EntryState, QueryCache};
pub use key::{Domain, QueryKey};
pub use mutation::{Mutation, MutationKind};
pub use retry::RetryPolicy;
pub use session::{Credentials, Session};

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use tokio::sync::broadcast;

use crate::{
    Error,
    alert::{Alert, Notifier},
    backend::{ApiRequest, Backend},
    config::CoordinatorConfig,
    coordinator::cache::{InFlight, Lookup},
    logging::{log_request, log_response},
    tokens::TokenStore,
};

const EVENT_CAPACITY: usize = 64;

/// A change to the cache that a presentation layer may want to react to.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheEvent {
    /// A read completed and its result was stored.
    Updated(QueryKey),
    /// A write succeeded and these partitions were marked stale.
    Invalidated(Vec<Domain>),
    /// Every entry was dropped, e.g. on log out.
    Cleared,
}

/// Mediates every read and write between the client and the backend.
///
/// Cloning a coordinator is cheap and every clone shares the same cache,
/// backend and session state.
#[derive(Clone)]
pub struct Coordinator {
    backend: Arc<dyn Backend>,
    tokens: Arc<dyn TokenStore>,
    notifier: Arc<dyn Notifier>,
    cache: Arc<QueryCache>,
    config: CoordinatorConfig,
    /// Set once the redirect to the log in page has been requested, cleared by
    /// the next successful log in.
    redirected: Arc<AtomicBool>,
    events: broadcast::Sender<CacheEvent>,
}

impl Coordinator {
    /// Create a coordinator with an empty cache.
    pub fn new(
        backend: Arc<dyn Backend>,
        tokens: Arc<dyn TokenStore>,
        notifier: Arc<dyn Notifier>,
        config: CoordinatorConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            backend,
            tokens,
            notifier,
            cache: Arc::new(QueryCache::init(config.stale_time)),
            config,
            redirected: Arc::new(AtomicBool::new(false)),
            events,
        }
    }

    /// Read `entity` filtered by `params`, from the cache when fresh.
    ///
    /// `entity` is a cache entity key such as "budgets" or "budgets:7:progress";
    /// its segments form the request path. `params` must serialize to an object
    /// or to nothing, see [QueryKey::with_params].
    ///
    /// Read failures are returned to the caller without a notification.
    ///
    /// # Errors
    ///
    /// Returns the classified error once retries are exhausted, or
    /// [Error::Decode] if the data does not have the shape of `T`.
    pub async fn query<T, P>(&self, entity: &str, params: &P) -> Result<T, Error>
    where
        T: DeserializeOwned,
        P: Serialize + ?Sized,
    {
        let key = QueryKey::with_params(entity, params)?;
        let value = self.fetch_value(key, false).await?;

        decode(value)
    }

    /// Like [Coordinator::query], but always issues a new request. Any request
    /// already in flight for the key is superseded.
    ///
    /// # Errors
    ///
    /// See [Coordinator::query].
    pub async fn refetch<T, P>(&self, entity: &str, params: &P) -> Result<T, Error>
    where
        T: DeserializeOwned,
        P: Serialize + ?Sized,
    {
        let key = QueryKey::with_params(entity, params)?;
        let value = self.fetch_value(key, true).await?;

        decode(value)
    }

    async fn fetch_value(&self, key: QueryKey, force: bool) -> Result<Value, Error> {
        match self.cache.lookup(&key, force) {
            Lookup::Hit(value) => {
                tracing::debug!("Cache hit for {key}");
                Ok(value)
            }
            Lookup::Pending(in_flight) => self.wait_for(&key, in_flight).await,
            Lookup::Issued(in_flight, outcome) => {
                // The request runs on its own task so the entry settles even
                // when every reader has gone away.
                let coordinator = self.clone();
                let request_key = key.clone();
                let generation = in_flight.generation;
                tokio::spawn(async move {
                    let result = coordinator.run_query(&request_key, generation).await;
                    outcome.send_replace(Some(result));
                });

                self.wait_for(&key, in_flight).await
            }
        }
    }

    async fn wait_for(&self, key: &QueryKey, mut in_flight: InFlight) -> Result<Value, Error> {
        // Fails only if the request task ended without publishing.
        let outcome = in_flight
            .result
            .wait_for(Option::is_some)
            .await
            .map(|outcome| outcome.clone())
            .ok()
            .flatten();

        match outcome {
            Some(result) => result,
            None => {
                let error = Error::Network(format!("The request for {key} ended without a response"));
                tracing::error!("{error}");
                self.cache.complete(key, in_flight.generation, &Err(error.clone()));

                Err(error)
            }
        }
    }

    async fn run_query(&self, key: &QueryKey, generation: u64) -> Result<Value, Error> {
        let request = ApiRequest::get(key.path()).query(key.query_pairs());
        let result = self.send_with_retry(&request).await;

        if matches!(result, Err(Error::Unauthorized)) {
            self.handle_unauthorized();
        }

        if self.cache.complete(key, generation, &result) {
            let _ = self.events.send(CacheEvent::Updated(key.clone()));
        } else {
            tracing::debug!("Discarding response for superseded request {key}");
        }

        result
    }

    async fn send_once(&self, request: &ApiRequest) -> Result<Value, Error> {
        log_request(request);

        let response = self.backend.send(request.clone()).await?;
        log_response(request, &response);

        response.into_data()
    }

    async fn send_with_retry(&self, request: &ApiRequest) -> Result<Value, Error> {
        let policy = self.config.retry;
        let mut retries = 0;

        loop {
            let error = match self.send_once(request).await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            if !policy.should_retry(&error, retries) {
                return Err(error);
            }

            let delay = match &error {
                Error::RateLimited {
                    retry_after: Some(retry_after),
                    ..
                } => (*retry_after).min(policy.max_delay),
                _ => policy.delay_for(retries),
            };

            retries += 1;
            tracing::warn!(
                "Request {} {} failed ({error}), retry {retries} of {} in {delay:?}",
                request.method,
                request.path,
                policy.max_retries
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// Send a write exactly once.
    ///
    /// On success the partitions the write affects are invalidated and a
    /// confirmation is shown. On failure the cache is left as is and a single
    /// error notification carries the backend's message, or a generic one.
    ///
    /// # Errors
    ///
    /// Returns the classified error from the backend, or [Error::Decode] if
    /// the write succeeded but its result does not have the shape of `T`.
    pub async fn mutate<T>(&self, mutation: Mutation) -> Result<T, Error>
    where
        T: DeserializeOwned,
    {
        let Mutation { kind, request } = mutation;

        match self.send_once(&request).await {
            Ok(value) => {
                let domains = kind.affects();
                let count = self.cache.invalidate(domains);
                tracing::info!("{kind:?} succeeded, invalidated {count} cached queries");
                let _ = self.events.send(CacheEvent::Invalidated(domains.to_vec()));

                self.notifier.notify(Alert::success(kind.success_message()));

                decode(value)
            }
            Err(error) => {
                if matches!(error, Error::Unauthorized) {
                    self.handle_unauthorized();
                }

                self.notifier.notify(Alert::error(
                    &error.user_message(kind.failure_message()),
                    &error.to_string(),
                ));

                Err(error)
            }
        }
    }

    /// Forget the session: clear the stored credentials, drop cached identity
    /// data and ask for the redirect to the log in page, once.
    fn handle_unauthorized(&self) {
        tracing::warn!("The backend rejected the session");

        if let Err(error) = self.tokens.clear_credentials() {
            tracing::error!("Could not clear credentials: {error}");
        }
        self.cache.remove_domain(Domain::Auth);

        if !self.redirected.swap(true, Ordering::SeqCst) {
            self.notifier.redirect_to_login();
        }
    }

    /// The current view of a cached read, `None` if it was never made.
    ///
    /// # Errors
    ///
    /// Returns [Error::Encode] if `params` is not object-like.
    pub fn snapshot<P>(&self, entity: &str, params: &P) -> Result<Option<CacheSnapshot>, Error>
    where
        P: Serialize + ?Sized,
    {
        let key = QueryKey::with_params(entity, params)?;

        Ok(self.cache.get(&key))
    }

    /// Receive [CacheEvent]s from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.events.subscribe()
    }

    /// The cache shared by this coordinator and its clones.
    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, Error> {
    serde_json::from_value(value).map_err(|error| Error::Decode(error.to_string()))
}

#[cfg(test)]
mod query_tests {
    use std::{sync::Arc, time::Duration};

    use serde::Serialize;
    use serde_json::{Value, json};

    use crate::{
        Error,
        backend::ApiResponse,
        coordinator::{CacheEvent, EntryState, QueryKey},
        test_utils::{ScriptedBackend, coordinator_with},
    };

    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct PeriodFirst {
        period: &'static str,
        category_id: i64,
    }

    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct CategoryFirst {
        category_id: i64,
        period: &'static str,
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_reads_with_reordered_params_share_one_request() {
        let backend = Arc::new(ScriptedBackend::new(|_, _| {
            (Duration::from_millis(50), Ok(ApiResponse::ok(json!([]))))
        }));
        let (coordinator, _, _) = coordinator_with(backend.clone());

        let (first, second) = tokio::join!(
            coordinator.query::<Value, _>(
                "budgets",
                &PeriodFirst {
                    period: "monthly",
                    category_id: 3
                }
            ),
            coordinator.query::<Value, _>(
                "budgets",
                &CategoryFirst {
                    category_id: 3,
                    period: "monthly"
                }
            ),
        );

        assert_eq!(first, Ok(json!([])));
        assert_eq!(second, Ok(json!([])));
        assert_eq!(backend.call_count(), 1);

        let request = &backend.requests()[0];
        assert_eq!(request.path, "/budgets");
        assert_eq!(
            request.query,
            vec![
                ("categoryId".to_owned(), "3".to_owned()),
                ("period".to_owned(), "monthly".to_owned())
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn fresh_reads_are_served_from_cache_until_stale() {
        let backend = Arc::new(ScriptedBackend::always(ApiResponse::ok(json!({"id": 1}))));
        let (coordinator, _, _) = coordinator_with(backend.clone());

        coordinator.query::<Value, _>("goals", &()).await.unwrap();
        tokio::time::advance(Duration::from_secs(4 * 60)).await;
        coordinator.query::<Value, _>("goals", &()).await.unwrap();
        assert_eq!(backend.call_count(), 1);

        tokio::time::advance(Duration::from_secs(2 * 60)).await;
        coordinator.query::<Value, _>("goals", &()).await.unwrap();
        assert_eq!(backend.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn superseded_response_is_discarded() {
        let backend = Arc::new(ScriptedBackend::new(|call, _| match call {
            0 => (Duration::from_millis(100), Ok(ApiResponse::ok(json!("A")))),
            _ => (Duration::from_millis(10), Ok(ApiResponse::ok(json!("B")))),
        }));
        let (coordinator, _, _) = coordinator_with(backend.clone());

        let (first, second) = tokio::join!(
            coordinator.query::<String, _>("budgets", &()),
            coordinator.refetch::<String, _>("budgets", &()),
        );

        // Each caller sees its own response, but only B is cached.
        assert_eq!(first, Ok("A".to_owned()));
        assert_eq!(second, Ok("B".to_owned()));

        let snapshot = coordinator.snapshot("budgets", &()).unwrap().unwrap();
        assert_eq!(snapshot.data, Some(json!("B")));
        assert_eq!(snapshot.state, EntryState::Fresh);
        assert_eq!(backend.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_are_retried() {
        let backend = Arc::new(ScriptedBackend::new(|call, _| match call {
            0 | 1 => (Duration::ZERO, Ok(ApiResponse::error(503, "Unavailable"))),
            _ => (Duration::ZERO, Ok(ApiResponse::ok(json!([1, 2])))),
        }));
        let (coordinator, notifier, _) = coordinator_with(backend.clone());

        let got = coordinator.query::<Vec<i64>, _>("accounts", &()).await;

        assert_eq!(got, Ok(vec![1, 2]));
        assert_eq!(backend.call_count(), 3);
        assert!(notifier.alerts().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn retries_are_bounded() {
        let backend = Arc::new(ScriptedBackend::always(ApiResponse::error(500, "Broken")));
        let (coordinator, _, _) = coordinator_with(backend.clone());

        let got = coordinator.query::<Value, _>("accounts", &()).await;

        assert_eq!(
            got,
            Err(Error::Server {
                status: 500,
                message: Some("Broken".to_owned())
            })
        );
        assert_eq!(backend.call_count(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn client_errors_are_not_retried_or_notified() {
        let backend = Arc::new(ScriptedBackend::always(ApiResponse::error(
            404,
            "Budget not found",
        )));
        let (coordinator, notifier, _) = coordinator_with(backend.clone());

        let got = coordinator.query::<Value, _>("budgets:9", &()).await;

        assert_eq!(got, Err(Error::NotFound(Some("Budget not found".to_owned()))));
        assert_eq!(backend.call_count(), 1);
        assert!(notifier.alerts().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_refetch_keeps_previous_data() {
        let backend = Arc::new(ScriptedBackend::new(|call, _| match call {
            0 => (Duration::ZERO, Ok(ApiResponse::ok(json!(["kept"])))),
            _ => (Duration::ZERO, Ok(ApiResponse::error(400, "Bad request"))),
        }));
        let (coordinator, _, _) = coordinator_with(backend.clone());

        coordinator.query::<Value, _>("goals", &()).await.unwrap();
        let got = coordinator.refetch::<Value, _>("goals", &()).await;

        assert!(got.is_err());
        let snapshot = coordinator.snapshot("goals", &()).unwrap().unwrap();
        assert_eq!(snapshot.state, EntryState::Error);
        assert_eq!(snapshot.data, Some(json!(["kept"])));
    }

    #[tokio::test(start_paused = true)]
    async fn completed_reads_are_broadcast() {
        let backend = Arc::new(ScriptedBackend::always(ApiResponse::ok(json!([]))));
        let (coordinator, _, _) = coordinator_with(backend);
        let mut events = coordinator.subscribe();

        coordinator.query::<Value, _>("goals", &()).await.unwrap();

        assert_eq!(
            events.recv().await.unwrap(),
            CacheEvent::Updated(QueryKey::new("goals"))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn aborted_reader_does_not_strand_the_request() {
        let backend = Arc::new(ScriptedBackend::new(|_, _| {
            (Duration::from_millis(100), Ok(ApiResponse::ok(json!(["budget"]))))
        }));
        let (coordinator, _, _) = coordinator_with(backend.clone());

        let reader = coordinator.clone();
        let task = tokio::spawn(async move { reader.query::<Value, _>("budgets", &()).await });
        tokio::time::sleep(Duration::from_millis(10)).await;
        task.abort();
        tokio::time::sleep(Duration::from_millis(200)).await;

        let snapshot = coordinator.snapshot("budgets", &()).unwrap().unwrap();
        assert_eq!(snapshot.state, EntryState::Fresh);
        assert_eq!(snapshot.data, Some(json!(["budget"])));

        let got = coordinator.query::<Value, _>("budgets", &()).await;
        assert_eq!(got, Ok(json!(["budget"])));
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn reader_joining_after_abort_shares_the_request() {
        let backend = Arc::new(ScriptedBackend::new(|_, _| {
            (Duration::from_millis(100), Ok(ApiResponse::ok(json!(1))))
        }));
        let (coordinator, _, _) = coordinator_with(backend.clone());

        let reader = coordinator.clone();
        let task = tokio::spawn(async move { reader.query::<Value, _>("goals", &()).await });
        tokio::time::sleep(Duration::from_millis(10)).await;
        task.abort();

        let got = coordinator.query::<Value, _>("goals", &()).await;

        assert_eq!(got, Ok(json!(1)));
        assert_eq!(backend.call_count(), 1);
    }
}
