use std::sync::Arc;

/// The hot-path engine for checking text against the keyword rules.
///
/// Both modes return the matched term on a hit and `None` when inconclusive.
/// There is deliberately no way to express "safe" here: absence of a match
/// means UNKNOWN, and only the remote classifier or a prior cache entry may
/// assert SAFE.
pub trait TextMatcher: Send + Sync {
    /// Flat mode: any keyword appearing as a substring of the normalized
    /// text is a hit. Used for URLs and search queries.
    fn check_flat(&self, text: &str) -> Option<String>;

    /// Gated mode: a content-root term and an intent term must co-occur,
    /// or a combo phrase must match standalone. Used for page-body text,
    /// where a bare topical mention is not enough to block.
    fn check_gated(&self, text: &str) -> Option<String>;
}

/// The control plane for rebuilding the matcher (config reload / API refresh).
#[async_trait::async_trait]
pub trait MatcherSource: Send + Sync {
    async fn rebuild(&self) -> Arc<dyn TextMatcher>;
}
