//! Where the query cache gets its data from.

use crate::domain::series::MarketSeriesResponse;
use crate::error::FetchError;
use crate::shared::SeriesRequest;

use futures_util::future::{BoxFuture, FutureExt};
use std::future::Future;
use std::sync::Arc;

pub type FetchResult = Result<Arc<MarketSeriesResponse>, FetchError>;

/// A fetcher the cache can call for any request.
///
/// The returned future must be `'static` so the cache can run it on its own
/// task, detached from whichever caller triggered it.
pub trait SeriesSource: Send + Sync + 'static {
    fn fetch(&self, request: SeriesRequest) -> BoxFuture<'static, FetchResult>;
}

#[cfg(feature = "http")]
impl SeriesSource for crate::http::MarketHttp {
    fn fetch(&self, request: SeriesRequest) -> BoxFuture<'static, FetchResult> {
        let http = self.clone();
        async move { http.fetch(&request).await }.boxed()
    }
}

#[cfg(feature = "http")]
impl SeriesSource for crate::http::ProxyHttp {
    fn fetch(&self, request: SeriesRequest) -> BoxFuture<'static, FetchResult> {
        let http = self.clone();
        async move { http.fetch(&request).await }.boxed()
    }
}

/// Adapter turning a closure into a [`SeriesSource`].
pub struct FnSource<F>(F);

pub fn source_fn<F, Fut>(f: F) -> FnSource<F>
where
    F: Fn(SeriesRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = FetchResult> + Send + 'static,
{
    FnSource(f)
}

impl<F, Fut> SeriesSource for FnSource<F>
where
    F: Fn(SeriesRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = FetchResult> + Send + 'static,
{
    fn fetch(&self, request: SeriesRequest) -> BoxFuture<'static, FetchResult> {
        (self.0)(request).boxed()
    }
}
