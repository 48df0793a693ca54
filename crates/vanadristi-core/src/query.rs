//! Query trait.
//!
//! A query is a cached read: it names its cache key and knows how to fetch
//! its value from the API. [`crate::QueryClient`] decides when to call
//! [`Query::fetch`].

use std::time::Duration;

use async_trait::async_trait;

use crate::cache::QueryKey;
use crate::client::ApiClient;
use crate::error::Result;
use crate::retry::RetryConfig;

/// A cached read of server data.
///
/// # Example
///
/// ```
/// use async_trait::async_trait;
/// use vanadristi_core::{ApiClient, Query, QueryKey, Result};
///
/// struct PlantCount;
///
/// #[async_trait]
/// impl Query for PlantCount {
///     type Output = usize;
///
///     fn key(&self) -> QueryKey {
///         QueryKey::new(["plants", "count"])
///     }
///
///     async fn fetch(&self, client: &ApiClient) -> Result<usize> {
///         Ok(client.list_plants().await?.len())
///     }
/// }
/// ```
#[async_trait]
pub trait Query: Send + Sync {
    /// Value stored in the cache.
    type Output: Send + Sync + 'static;

    /// Cache key.
    fn key(&self) -> QueryKey;

    /// A disabled query is never fetched.
    fn enabled(&self) -> bool {
        true
    }

    /// Retries applied to [`fetch`](Self::fetch).
    fn retry(&self) -> RetryConfig {
        RetryConfig::none()
    }

    /// How often observers refetch, if at all.
    fn refetch_interval(&self) -> Option<Duration> {
        None
    }

    /// Request the value from the server.
    async fn fetch(&self, client: &ApiClient) -> Result<Self::Output>;

    /// Refetch this query periodically while observed.
    fn with_refetch_interval(self, interval: Duration) -> Refetching<Self>
    where
        Self: Sized,
    {
        Refetching {
            inner: self,
            interval,
        }
    }
}

/// A query with a refetch interval. See [`Query::with_refetch_interval`].
#[derive(Debug, Clone)]
pub struct Refetching<Q> {
    inner: Q,
    interval: Duration,
}

impl<Q> Refetching<Q> {
    /// The wrapped query.
    pub fn inner(&self) -> &Q {
        &self.inner
    }
}

#[async_trait]
impl<Q: Query> Query for Refetching<Q> {
    type Output = Q::Output;

    fn key(&self) -> QueryKey {
        self.inner.key()
    }

    fn enabled(&self) -> bool {
        self.inner.enabled()
    }

    fn retry(&self) -> RetryConfig {
        self.inner.retry()
    }

    fn refetch_interval(&self) -> Option<Duration> {
        Some(self.interval)
    }

    async fn fetch(&self, client: &ApiClient) -> Result<Self::Output> {
        self.inner.fetch(client).await
    }
}
