use serde::Deserialize;

/// Which navigation-lifecycle hook produced the event. All three funnel into
/// the same handler; the distinction only matters for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NavTransition {
    Before,
    Commit,
    History,
}

fn default_transition() -> NavTransition {
    NavTransition::Before
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationEvent {
    pub tab_id: i64,
    pub frame_id: u32,
    pub url: String,
    #[serde(default = "default_transition")]
    pub transition: NavTransition,
}

/// Text signals already extracted from a rendered page by the content-side
/// collaborator. No DOM parsing happens here.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSignals {
    pub tab_id: i64,
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub meta_description: Option<String>,
    #[serde(default)]
    pub text: String,
}

/// Outcome of handling one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Entry guards rejected the event; nothing was classified or written.
    Ignored,
    Allowed,
    Redirected,
}
