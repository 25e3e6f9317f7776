mod http;

pub use http::HttpClassifier;

use crate::verdict::Verdict;

/// Marker the verdict service expects in front of video-platform search
/// queries, which it judges under a different policy than web searches.
pub const VIDEO_SEARCH_PREFIX: &str = "[YOUTUBE_SEARCH] ";

/// Opaque boundary to the remote verdict service.
///
/// Only SAFE and BLOCK are authoritative. Every failure mode — transport
/// error, timeout, non-2xx status, malformed payload — maps to `Unknown`;
/// nothing here may surface as an error that aborts navigation handling.
#[async_trait::async_trait]
pub trait RemoteClassifier: Send + Sync {
    async fn classify_search(&self, query: &str) -> Verdict;

    async fn classify_site(
        &self,
        domain: &str,
        url: &str,
        title: Option<&str>,
        last_search_query: Option<&str>,
    ) -> Verdict;

    /// Startup connectivity probe. The result is only logged; a failing
    /// probe removes the remote tier, it never disables the pipeline.
    async fn health(&self) -> bool;
}
