// Integration tests for `BetaSeriesClient` using wiremock.
#![allow(clippy::unwrap_used)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use pretty_assertions::assert_eq;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use betaseries_api::{
    AuthFailure, Authenticator, BetaSeriesClient, ClientConfig, ConflictTag, Error,
    PayloadSource, RequestDescriptor, ResourceType,
};

// ── Helpers ─────────────────────────────────────────────────────────

/// Hands out a fixed token and counts how often it was asked.
struct CountingAuthenticator {
    calls: AtomicUsize,
    token: String,
    delay: Duration,
}

impl CountingAuthenticator {
    fn new(token: &str) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            token: token.into(),
            delay: Duration::ZERO,
        })
    }

    fn slow(token: &str, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            token: token.into(),
            delay,
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Authenticator for CountingAuthenticator {
    fn authenticate(&self) -> BoxFuture<'_, Result<SecretString, AuthFailure>> {
        async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            Ok(SecretString::from(self.token.clone()))
        }
        .boxed()
    }
}

fn config(server: &MockServer) -> ClientConfig {
    ClientConfig::new(Url::parse(&server.uri()).unwrap(), "test-key")
        .with_token(SecretString::from("stale".to_owned()))
}

async fn setup(auth: Arc<CountingAuthenticator>) -> (MockServer, BetaSeriesClient) {
    let server = MockServer::start().await;
    let client = BetaSeriesClient::with_client(reqwest::Client::new(), config(&server), auth);
    (server, client)
}

fn expired_token() -> ResponseTemplate {
    ResponseTemplate::new(400).set_body_json(json!({
        "errors": [{ "code": 2001, "text": "Invalid token." }]
    }))
}

fn show_body(id: u64) -> serde_json::Value {
    json!({ "show": { "id": id, "title": "Severance" }, "errors": [] })
}

// ── Cache short-circuit ─────────────────────────────────────────────

#[tokio::test]
async fn test_cached_read_skips_transport() {
    let auth = CountingAuthenticator::new("fresh");
    let (server, client) = setup(Arc::clone(&auth)).await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    client
        .cache()
        .set(ResourceType::Shows, "42", json!({ "id": 42, "title": "Severance" }));

    let payload = client
        .dispatch(&RequestDescriptor::read(ResourceType::Shows, "display").param("id", 42))
        .await
        .unwrap();

    assert_eq!(payload.source, PayloadSource::Cache);
    assert_eq!(payload.resource("show").unwrap()["title"], "Severance");
    assert_eq!(client.request_count(), 0);
}

#[tokio::test]
async fn test_bypass_cache_hits_network() {
    let auth = CountingAuthenticator::new("fresh");
    let (server, client) = setup(auth).await;

    Mock::given(method("GET"))
        .and(path("/shows/display"))
        .and(query_param("id", "42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(show_body(42)))
        .expect(1)
        .mount(&server)
        .await;

    client
        .cache()
        .set(ResourceType::Shows, "42", json!({ "id": 42, "title": "Old" }));

    let payload = client
        .dispatch(
            &RequestDescriptor::read(ResourceType::Shows, "display")
                .param("id", 42)
                .bypass_cache(true),
        )
        .await
        .unwrap();

    assert_eq!(payload.source, PayloadSource::Network);
    assert_eq!(payload.resource("show").unwrap()["title"], "Severance");
    assert_eq!(client.request_count(), 1);
}

#[tokio::test]
async fn test_cache_miss_dispatches_with_headers() {
    let auth = CountingAuthenticator::new("fresh");
    let (server, client) = setup(Arc::clone(&auth)).await;

    Mock::given(method("GET"))
        .and(path("/shows/display"))
        .and(query_param("id", "42"))
        .and(header("Accept", "application/json"))
        .and(header("X-BetaSeries-Version", "3.0"))
        .and(header("X-BetaSeries-Token", "stale"))
        .and(header("X-BetaSeries-Key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(show_body(42)))
        .expect(1)
        .mount(&server)
        .await;

    let payload = client
        .dispatch(&RequestDescriptor::read(ResourceType::Shows, "display").param("id", 42))
        .await
        .unwrap();

    assert_eq!(payload.body["show"]["id"], 42);
    assert_eq!(client.request_count(), 1);
    assert_eq!(auth.calls(), 0);
}

#[tokio::test]
async fn test_query_values_are_escaped() {
    let (server, client) = setup(CountingAuthenticator::new("fresh")).await;

    Mock::given(method("GET"))
        .and(path("/shows/search"))
        .and(query_param("title", "Better Call Saul & co"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "shows": [], "errors": [] })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let payload = client
        .get("shows", "search", &[("title", "Better Call Saul & co")])
        .await
        .unwrap();
    assert_eq!(payload.body["shows"], json!([]));

    let requests = server.received_requests().await.unwrap();
    let query = requests[0].url.query().unwrap();
    assert!(!query.contains(' '), "raw space in {query}");
    assert!(query.contains("%26"), "unescaped ampersand in {query}");
}

#[tokio::test]
async fn test_dispatch_does_not_populate_cache() {
    let auth = CountingAuthenticator::new("fresh");
    let (server, client) = setup(auth).await;

    Mock::given(method("GET"))
        .and(path("/shows/display"))
        .respond_with(ResponseTemplate::new(200).set_body_json(show_body(42)))
        .expect(2)
        .mount(&server)
        .await;

    let req = RequestDescriptor::read(ResourceType::Shows, "display").param("id", 42);
    client.dispatch(&req).await.unwrap();
    client.dispatch(&req).await.unwrap();

    assert!(!client.cache().has(ResourceType::Shows, "42"));
    assert_eq!(client.request_count(), 2);
}

// ── Mutations ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_create_sends_form_body() {
    let auth = CountingAuthenticator::new("fresh");
    let (server, client) = setup(auth).await;

    Mock::given(method("POST"))
        .and(path("/episodes/watched"))
        .and(body_string_contains("id=9001"))
        .and(body_string_contains("bulk=true"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "episode": { "id": 9001 }, "errors": [] })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let payload = client
        .dispatch(
            &RequestDescriptor::create(ResourceType::Episodes, "watched")
                .param("id", 9001)
                .param("bulk", true),
        )
        .await
        .unwrap();

    assert_eq!(payload.body["episode"]["id"], 9001);
}

#[tokio::test]
async fn test_delete_uses_delete_verb() {
    let auth = CountingAuthenticator::new("fresh");
    let (server, client) = setup(auth).await;

    Mock::given(method("DELETE"))
        .and(path("/shows/show"))
        .and(body_string_contains("id=42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(show_body(42)))
        .expect(1)
        .mount(&server)
        .await;

    client
        .dispatch(&RequestDescriptor::delete(ResourceType::Shows, "show").param("id", 42))
        .await
        .unwrap();
}

// ── Error classification ────────────────────────────────────────────

#[tokio::test]
async fn test_unknown_resource_fails_before_io() {
    let auth = CountingAuthenticator::new("fresh");
    let (server, client) = setup(Arc::clone(&auth)).await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = client
        .dispatch(&RequestDescriptor::read("bogus", "display"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::UnknownResource { ref resource } if resource == "bogus"));
    assert!(!err.is_failure());
    assert_eq!(client.request_count(), 0);
    assert_eq!(auth.calls(), 0);
}

#[tokio::test]
async fn test_already_applied_is_conflict_without_reauth() {
    let auth = CountingAuthenticator::new("fresh");
    let (server, client) = setup(Arc::clone(&auth)).await;

    Mock::given(method("POST"))
        .and(path("/shows/show"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "errors": [{ "code": 2005, "text": "Show already added." }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = client
        .dispatch(&RequestDescriptor::create(ResourceType::Shows, "show").param("id", 42))
        .await
        .unwrap_err();

    assert_eq!(err.conflict_tag(), Some(ConflictTag::AlreadyApplied));
    assert!(!err.is_failure());
    assert_eq!(auth.calls(), 0);
}

#[tokio::test]
async fn test_already_watched_is_conflict() {
    let auth = CountingAuthenticator::new("fresh");
    let (server, client) = setup(auth).await;

    Mock::given(method("POST"))
        .and(path("/episodes/watched"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "errors": [{
                "code": 0,
                "text": "L'utilisateur a déjà marqué cet épisode comme vu."
            }]
        })))
        .mount(&server)
        .await;

    let err = client
        .dispatch(&RequestDescriptor::create(ResourceType::Episodes, "watched").param("id", 7))
        .await
        .unwrap_err();

    assert_eq!(err.conflict_tag(), Some(ConflictTag::AlreadyWatched));
}

#[tokio::test]
async fn test_other_api_error_is_failure_with_detail() {
    let auth = CountingAuthenticator::new("fresh");
    let (server, client) = setup(auth).await;

    Mock::given(method("GET"))
        .and(path("/shows/display"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errors": [{ "code": 4001, "text": "Show not found." }]
        })))
        .mount(&server)
        .await;

    let err = client
        .dispatch(&RequestDescriptor::read(ResourceType::Shows, "display").param("id", 1))
        .await
        .unwrap_err();

    match err {
        Error::Api { code, text, detail } => {
            assert_eq!(code, 4001);
            assert_eq!(text, "Show not found.");
            assert!(detail.contains("4001"));
        }
        other => panic!("expected Api error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_non_2xx_without_errors_is_http_failure() {
    let auth = CountingAuthenticator::new("fresh");
    let (server, client) = setup(auth).await;

    Mock::given(method("GET"))
        .and(path("/shows/display"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let err = client
        .dispatch(&RequestDescriptor::read(ResourceType::Shows, "display").param("id", 1))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Http { status: 503, .. }));
    assert!(err.is_transient());
}

// ── Credential refresh ──────────────────────────────────────────────

#[tokio::test]
async fn test_expired_token_reauthenticates_and_retries_once() {
    let auth = CountingAuthenticator::new("fresh");
    let seen = Arc::new(Mutex::new(Vec::new()));
    let server = MockServer::start().await;
    let client = {
        let seen = Arc::clone(&seen);
        BetaSeriesClient::with_client(reqwest::Client::new(), config(&server), auth.clone())
            .on_credential_refresh(move |token| {
                seen.lock().unwrap().push(token.expose_secret().to_owned());
            })
    };

    Mock::given(method("GET"))
        .and(path("/shows/display"))
        .and(header("X-BetaSeries-Token", "stale"))
        .respond_with(expired_token())
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/shows/display"))
        .and(header("X-BetaSeries-Token", "fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(show_body(42)))
        .expect(1)
        .mount(&server)
        .await;

    let payload = client
        .dispatch(&RequestDescriptor::read(ResourceType::Shows, "display").param("id", 42))
        .await
        .unwrap();

    assert_eq!(payload.body["show"]["id"], 42);
    assert_eq!(auth.calls(), 1);
    assert_eq!(client.request_count(), 2);
    assert_eq!(client.token_generation(), 1);
    assert_eq!(*seen.lock().unwrap(), vec!["fresh".to_owned()]);
}

#[tokio::test]
async fn test_expired_token_twice_is_failure() {
    let auth = CountingAuthenticator::new("still-bad");
    let (server, client) = setup(Arc::clone(&auth)).await;

    Mock::given(method("GET"))
        .and(path("/shows/display"))
        .respond_with(expired_token())
        .expect(2)
        .mount(&server)
        .await;

    let err = client
        .dispatch(&RequestDescriptor::read(ResourceType::Shows, "display").param("id", 42))
        .await
        .unwrap_err();

    assert_eq!(err.api_error_code(), Some(2001));
    assert!(err.is_failure());
    assert_eq!(auth.calls(), 1);
    assert_eq!(client.request_count(), 2);
}

#[tokio::test]
async fn test_concurrent_expiry_triggers_one_flow() {
    let auth = CountingAuthenticator::slow("fresh", Duration::from_millis(50));
    let (server, client) = setup(Arc::clone(&auth)).await;

    Mock::given(method("GET"))
        .and(header("X-BetaSeries-Token", "stale"))
        .respond_with(expired_token())
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/shows/display"))
        .and(header("X-BetaSeries-Token", "fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(show_body(1)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/movies/movie"))
        .and(header("X-BetaSeries-Token", "fresh"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "movie": { "id": 2 }, "errors": [] })),
        )
        .mount(&server)
        .await;

    let show = RequestDescriptor::read(ResourceType::Shows, "display").param("id", 1);
    let movie = RequestDescriptor::read(ResourceType::Movies, "movie").param("id", 2);
    let (a, b) = tokio::join!(client.dispatch(&show), client.dispatch(&movie));

    assert_eq!(a.unwrap().body["show"]["id"], 1);
    assert_eq!(b.unwrap().body["movie"]["id"], 2);
    assert_eq!(auth.calls(), 1);
    assert_eq!(client.token_generation(), 1);
}

#[tokio::test]
async fn test_late_expiry_reuses_already_refreshed_credential() {
    let auth = CountingAuthenticator::new("fresh");
    let (server, client) = setup(Arc::clone(&auth)).await;

    Mock::given(method("GET"))
        .and(path("/shows/display"))
        .and(header("X-BetaSeries-Token", "stale"))
        .respond_with(expired_token())
        .mount(&server)
        .await;
    // The movie rejection lands after the show request already refreshed.
    Mock::given(method("GET"))
        .and(path("/movies/movie"))
        .and(header("X-BetaSeries-Token", "stale"))
        .respond_with(expired_token().set_delay(Duration::from_millis(200)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/shows/display"))
        .and(header("X-BetaSeries-Token", "fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(show_body(1)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/movies/movie"))
        .and(header("X-BetaSeries-Token", "fresh"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "movie": { "id": 2 }, "errors": [] })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let show = RequestDescriptor::read(ResourceType::Shows, "display").param("id", 1);
    let movie = RequestDescriptor::read(ResourceType::Movies, "movie").param("id", 2);
    let (a, b) = tokio::join!(client.dispatch(&show), client.dispatch(&movie));

    assert_eq!(a.unwrap().body["show"]["id"], 1);
    assert_eq!(b.unwrap().body["movie"]["id"], 2);
    assert_eq!(auth.calls(), 1);
    assert_eq!(client.token_generation(), 1);
    assert_eq!(client.request_count(), 4);
}

#[tokio::test]
async fn test_reauth_failure_surfaces_as_authentication_error() {
    struct Refusing;
    impl Authenticator for Refusing {
        fn authenticate(&self) -> BoxFuture<'_, Result<SecretString, AuthFailure>> {
            async { Err(AuthFailure::Rejected("access_denied".into())) }.boxed()
        }
    }

    let server = MockServer::start().await;
    let client =
        BetaSeriesClient::with_client(reqwest::Client::new(), config(&server), Arc::new(Refusing));

    Mock::given(method("GET"))
        .respond_with(expired_token())
        .expect(1)
        .mount(&server)
        .await;

    let err = client
        .dispatch(&RequestDescriptor::read(ResourceType::Shows, "display").param("id", 42))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Authentication { ref message } if message.contains("access_denied")));
    assert_eq!(client.token_generation(), 0);
}

// ── Freshness pre-check ─────────────────────────────────────────────

#[tokio::test]
async fn test_inactive_session_reauthenticates_before_dispatch() {
    let auth = CountingAuthenticator::new("fresh");
    let server = MockServer::start().await;
    let client = BetaSeriesClient::with_client(
        reqwest::Client::new(),
        config(&server).with_identified_user(true),
        auth.clone(),
    );

    Mock::given(method("GET"))
        .and(path("/members/is_active"))
        .and(header("X-BetaSeries-Token", "stale"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/shows/display"))
        .and(header("X-BetaSeries-Token", "fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(show_body(42)))
        .expect(1)
        .mount(&server)
        .await;

    client
        .dispatch(&RequestDescriptor::read(ResourceType::Shows, "display").param("id", 42))
        .await
        .unwrap();

    assert_eq!(auth.calls(), 1);
    assert_eq!(client.request_count(), 1);
}

#[tokio::test]
async fn test_active_session_skips_reauth() {
    let auth = CountingAuthenticator::new("fresh");
    let server = MockServer::start().await;
    let client = BetaSeriesClient::with_client(
        reqwest::Client::new(),
        config(&server).with_identified_user(true),
        auth.clone(),
    );

    Mock::given(method("GET"))
        .and(path("/members/is_active"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "errors": [] })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/shows/display"))
        .and(header("X-BetaSeries-Token", "stale"))
        .respond_with(ResponseTemplate::new(200).set_body_json(show_body(42)))
        .expect(1)
        .mount(&server)
        .await;

    client
        .dispatch(&RequestDescriptor::read(ResourceType::Shows, "display").param("id", 42))
        .await
        .unwrap();

    assert_eq!(auth.calls(), 0);
}

#[tokio::test]
async fn test_anonymous_caller_skips_freshness_check() {
    let auth = CountingAuthenticator::new("fresh");
    let (server, client) = setup(auth).await;

    Mock::given(method("GET"))
        .and(path("/members/is_active"))
        .respond_with(ResponseTemplate::new(401))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/shows/display"))
        .respond_with(ResponseTemplate::new(200).set_body_json(show_body(42)))
        .expect(1)
        .mount(&server)
        .await;

    client
        .dispatch(&RequestDescriptor::read(ResourceType::Shows, "display").param("id", 42))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_request_counter_is_observable() {
    let auth = CountingAuthenticator::new("fresh");
    let (server, client) = setup(auth).await;
    let mut counter = client.subscribe_request_count();

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(show_body(1)))
        .mount(&server)
        .await;

    client
        .dispatch(&RequestDescriptor::read(ResourceType::Shows, "display").param("id", 1))
        .await
        .unwrap();

    assert!(counter.has_changed().unwrap());
    assert_eq!(*counter.borrow_and_update(), 1);
}
