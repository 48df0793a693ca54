//! Mutation trait.

use async_trait::async_trait;

use crate::cache::QueryKey;
use crate::client::ApiClient;
use crate::error::Result;

/// A server write.
///
/// After a successful [`execute`](Self::execute), [`crate::QueryClient`]
/// invalidates every key returned by [`invalidates`](Self::invalidates),
/// matching by prefix. Mutations are never retried.
#[async_trait]
pub trait Mutation: Send + Sync {
    type Input: Send + Sync;
    type Output: Send + Sync + 'static;

    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Cache prefixes made stale by a successful write.
    fn invalidates(&self, input: &Self::Input) -> Vec<QueryKey>;

    /// Perform the request.
    async fn execute(&self, client: &ApiClient, input: &Self::Input) -> Result<Self::Output>;
}
