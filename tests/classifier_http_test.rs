use navguard::classifier::{HttpClassifier, RemoteClassifier};
use navguard::config::ClassifierConfig;
use navguard::verdict::Verdict;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn classifier_for(server: &MockServer, timeout_ms: u64) -> HttpClassifier {
    HttpClassifier::new(&ClassifierConfig {
        base_url: server.uri(),
        timeout_ms,
    })
}

#[tokio::test]
async fn search_verdicts_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/classify-search"))
        .and(body_json(serde_json::json!({ "query": "crochet patterns" })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "classification": "SAFE"
            })),
        )
        .mount(&server)
        .await;

    let classifier = classifier_for(&server, 1000);
    assert_eq!(
        classifier.classify_search("crochet patterns").await,
        Verdict::Safe
    );
}

#[tokio::test]
async fn website_request_carries_context_fields() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/classify-website"))
        .and(body_json(serde_json::json!({
            "domain": "example-news.com",
            "url": "https://example-news.com/article",
            "title": "An article",
            "lastSearchQuery": "crochet patterns"
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "classification": "BLOCK"
            })),
        )
        .mount(&server)
        .await;

    let classifier = classifier_for(&server, 1000);
    let verdict = classifier
        .classify_site(
            "example-news.com",
            "https://example-news.com/article",
            Some("An article"),
            Some("crochet patterns"),
        )
        .await;
    assert_eq!(verdict, Verdict::Block);
}

#[tokio::test]
async fn absent_context_is_sent_as_empty_strings() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/classify-website"))
        .and(body_json(serde_json::json!({
            "domain": "example-news.com",
            "url": "https://example-news.com/",
            "title": "",
            "lastSearchQuery": ""
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "classification": "SAFE"
            })),
        )
        .mount(&server)
        .await;

    let classifier = classifier_for(&server, 1000);
    let verdict = classifier
        .classify_site("example-news.com", "https://example-news.com/", None, None)
        .await;
    assert_eq!(verdict, Verdict::Safe);
}

#[tokio::test]
async fn server_errors_map_to_unknown() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/classify-search"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let classifier = classifier_for(&server, 1000);
    assert_eq!(classifier.classify_search("anything").await, Verdict::Unknown);
}

#[tokio::test]
async fn malformed_and_unexpected_payloads_map_to_unknown() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/classify-search"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/classify-website"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "classification": "MAYBE"
            })),
        )
        .mount(&server)
        .await;

    let classifier = classifier_for(&server, 1000);
    assert_eq!(classifier.classify_search("q").await, Verdict::Unknown);
    assert_eq!(
        classifier.classify_site("d.com", "https://d.com/", None, None).await,
        Verdict::Unknown
    );
}

#[tokio::test]
async fn slow_responses_time_out_to_unknown() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/classify-search"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "classification": "BLOCK" }))
                .set_delay(std::time::Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let classifier = classifier_for(&server, 50);
    assert_eq!(classifier.classify_search("q").await, Verdict::Unknown);
}

#[tokio::test]
async fn health_probe_reflects_service_state() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let classifier = classifier_for(&server, 1000);
    assert!(classifier.health().await);

    let unreachable = HttpClassifier::new(&ClassifierConfig {
        base_url: "http://127.0.0.1:1".to_string(),
        timeout_ms: 200,
    });
    assert!(!unreachable.health().await);
}
