use super::RemoteClassifier;
use crate::config::ClassifierConfig;
use crate::verdict::Verdict;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WebsiteRequest<'a> {
    domain: &'a str,
    url: &'a str,
    title: &'a str,
    last_search_query: &'a str,
}

#[derive(Deserialize)]
struct ClassifyResponse {
    classification: String,
}

/// HTTP client for the remote verdict service.
pub struct HttpClassifier {
    client: Client,
    base_url: String,
}

impl HttpClassifier {
    pub fn new(config: &ClassifierConfig) -> Self {
        let client = Client::builder()
            .user_agent("navguard/0.3")
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .unwrap();
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn post_classify<B: Serialize>(&self, endpoint: &str, body: &B) -> Verdict {
        let url = format!("{}/{}", self.base_url, endpoint);
        let response = match self.client.post(&url).json(body).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!("Classifier request to {} failed: {}", endpoint, e);
                return Verdict::Unknown;
            }
        };

        if !response.status().is_success() {
            warn!(
                "Classifier {} returned status {}",
                endpoint,
                response.status()
            );
            return Verdict::Unknown;
        }

        match response.json::<ClassifyResponse>().await {
            Ok(body) => match body.classification.as_str() {
                "SAFE" => Verdict::Safe,
                "BLOCK" => Verdict::Block,
                other => {
                    warn!("Classifier {} returned unknown label {:?}", endpoint, other);
                    Verdict::Unknown
                }
            },
            Err(e) => {
                warn!("Classifier {} response was malformed: {}", endpoint, e);
                Verdict::Unknown
            }
        }
    }
}

#[async_trait::async_trait]
impl RemoteClassifier for HttpClassifier {
    async fn classify_search(&self, query: &str) -> Verdict {
        debug!("Classifying search query: {:?}", query);
        self.post_classify("classify-search", &SearchRequest { query })
            .await
    }

    async fn classify_site(
        &self,
        domain: &str,
        url: &str,
        title: Option<&str>,
        last_search_query: Option<&str>,
    ) -> Verdict {
        debug!("Classifying website: {}", domain);
        self.post_classify(
            "classify-website",
            &WebsiteRequest {
                domain,
                url,
                title: title.unwrap_or(""),
                last_search_query: last_search_query.unwrap_or(""),
            },
        )
        .await
    }

    async fn health(&self) -> bool {
        let url = format!("{}/health", self.base_url);
        match self.client.get(&url).send().await {
            Ok(r) => r.status().is_success(),
            Err(_) => false,
        }
    }
}
