use std::any::Any;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cached::{Cached, TimedCache};
use tokio::task::JoinHandle;
use tracing::debug;

use super::context::SessionContext;
use super::guard::AuthGuard;
use crate::client::{ApiError, RequestAuth};

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("session closed before authentication resolved")]
    SessionClosed,
}

/// Identifies one cached query result, e.g. `clinicAnalytics/dashboard`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct QueryKey(String);

impl QueryKey {
    pub fn new<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let parts: Vec<String> = parts.into_iter().map(|p| p.as_ref().to_string()).collect();
        QueryKey(parts.join("/"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

type CachedValue = Arc<dyn Any + Send + Sync>;

/// Response cache shared by all queries of a session; entries go stale after a fixed lifespan.
///
/// Owned by [`SessionContext`], which clears it whenever the user or the
/// active tenant changes.
#[derive(Clone)]
pub struct QueryClient {
    cache: Arc<Mutex<TimedCache<String, CachedValue>>>,
}

impl QueryClient {
    pub fn new(stale_after: Duration) -> Self {
        Self {
            cache: Arc::new(Mutex::new(TimedCache::with_lifespan(stale_after.as_secs()))),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, TimedCache<String, CachedValue>> {
        // The cache holds no invariants a panic could break
        self.cache.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn get<T: Clone + 'static>(&self, key: &QueryKey) -> Option<T> {
        self.lock()
            .cache_get(key.as_str())
            .and_then(|value| value.downcast_ref::<T>().cloned())
    }

    pub fn set<T: Send + Sync + 'static>(&self, key: &QueryKey, value: T) {
        self.lock().cache_set(key.as_str().to_string(), Arc::new(value));
    }

    pub fn invalidate(&self, key: &QueryKey) {
        self.lock().cache_remove(key.as_str());
    }

    pub fn clear(&self) {
        self.lock().cache_clear();
    }
}

/// A data fetch that only runs while the session allows API calls.
///
/// Credentials come from [`SessionContext::request_auth`] right before each
/// request, so an expired access token is renewed (or the session signed out)
/// first. Results are cached under the query key.
pub struct ProtectedQuery<T, F> {
    key: QueryKey,
    context: Arc<SessionContext>,
    guard: AuthGuard,
    fetcher: F,
    enabled: bool,
    _output: PhantomData<fn() -> T>,
}

impl<T, F, Fut> ProtectedQuery<T, F>
where
    T: Clone + Send + Sync + 'static,
    F: Fn(RequestAuth) -> Fut + Send + Sync,
    Fut: Future<Output = Result<T, ApiError>> + Send,
{
    pub fn new(key: QueryKey, context: Arc<SessionContext>, fetcher: F) -> Self {
        Self {
            key,
            guard: context.guard(),
            context,
            fetcher,
            enabled: true,
            _output: PhantomData,
        }
    }

    /// An extra condition on top of the auth guard (e.g. "a patient is selected").
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled && self.guard.can_make_api_calls()
    }

    /// Fetch now if allowed. `Ok(None)` means the query is currently disabled.
    pub async fn fetch(&self) -> Result<Option<T>, QueryError> {
        if !self.enabled || !self.guard.can_make_api_calls() {
            return Ok(None);
        }
        let Some(auth) = self.context.request_auth().await else {
            debug!("Query {} skipped, session is gone", self.key);
            return Ok(None);
        };
        let queries = self.context.queries();
        if let Some(hit) = queries.get::<T>(&self.key) {
            debug!("Query {} served from cache", self.key);
            return Ok(Some(hit));
        }

        debug!("Query {} fetching", self.key);
        let value = (self.fetcher)(auth).await?;
        queries.set(&self.key, value.clone());
        Ok(Some(value))
    }

    /// Wait for the guard to open, then fetch once.
    pub async fn run(&mut self) -> Result<Option<T>, QueryError> {
        if !self.enabled {
            return Ok(None);
        }
        loop {
            self.guard.ready().await?;
            // The guard may close again between the wakeup and the fetch; wait again if so
            if let Some(value) = self.fetch().await? {
                return Ok(Some(value));
            }
        }
    }

    pub fn spawn(mut self) -> JoinHandle<Result<Option<T>, QueryError>>
    where
        F: 'static,
        Fut: 'static,
    {
        tokio::spawn(async move { self.run().await })
    }
}
