use async_trait::async_trait;
use crate::application::errors::FetchError;

/// Fetcher trait - single-attempt retrieval of a URL's body
///
/// Implementations never retry and never panic; any transport error,
/// timeout or non-2xx status comes back as a `FetchError`.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}
