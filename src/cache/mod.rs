//! TTL caches for market data
//!
//! One `CacheStore` instance per data category, owned by the service that
//! uses it. `with_cache` wraps any async producer with cache-or-compute
//! behavior without needing annotation syntax.

pub mod config;
pub mod manager;

pub use config::CacheConfig;
pub use manager::{CacheMetrics, CacheStore};

use futures::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;

/// Wrap `f` so that each call first consults `cache` under `key_fn(&arg)`
///
/// The returned function behaves like `f`, except fresh cached values are
/// returned without calling `f`, and successful results are stored.
pub fn with_cache<A, V, E, K, F, Fut>(
    cache: Arc<CacheStore<V>>,
    key_fn: K,
    f: F,
) -> impl Fn(A) -> BoxFuture<'static, Result<V, E>>
where
    A: Send + 'static,
    V: Clone + Send + 'static,
    E: Send + 'static,
    K: Fn(&A) -> String,
    F: Fn(A) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<V, E>> + Send + 'static,
{
    move |arg: A| {
        let key = key_fn(&arg);
        let cache = cache.clone();
        let f = f.clone();
        Box::pin(async move { cache.get_or_set(&key, move || f(arg)).await })
    }
}

/// Order-independent key for a set of ids: sorted, deduplicated, comma-joined
pub fn token_set_key<S: AsRef<str>>(ids: &[S]) -> String {
    let mut sorted: Vec<&str> = ids.iter().map(|id| id.as_ref()).collect();
    sorted.sort_unstable();
    sorted.dedup();
    sorted.join(",")
}
