mod common;

use common::{auth_manager, blocking, token_body, CLIENT_ID, CLIENT_SECRET};
use reddit_exporter::reddit::{
    AuthError, CachedToken, FileTokenStore, MemoryTokenStore, TokenStore, INSTALLED_CLIENT_GRANT,
};
use reddit_exporter::store::StoreError;
use std::sync::Arc;
use time::{Duration, OffsetDateTime};
use wiremock::matchers::{basic_auth, body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN_PATH: &str = "/api/v1/access_token";

fn cached(token: &str, expires_in: Duration) -> CachedToken {
    CachedToken {
        token: token.to_string(),
        expires_at: OffsetDateTime::now_utc() + expires_in,
    }
}

struct ReadOnlyStore;

impl TokenStore for ReadOnlyStore {
    fn get_token(&self) -> Result<Option<CachedToken>, StoreError> {
        Ok(None)
    }

    fn save_token(&self, _token: &CachedToken) -> Result<(), StoreError> {
        Err(StoreError::Write {
            path: "token".into(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
        })
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn valid_cached_token_makes_no_http_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("new", 86400)))
        .expect(0)
        .mount(&server)
        .await;

    let uri = server.uri();
    let token = blocking(move || {
        let store = Arc::new(MemoryTokenStore::with_token(cached("cached", Duration::hours(5))));
        auth_manager(&uri, store).auth()
    })
    .await
    .unwrap();
    assert_eq!(token, "cached");
}

#[tokio::test(flavor = "multi_thread")]
async fn expiring_token_is_exchanged_exactly_once() {
    let server = MockServer::start().await;
    let grant = format!(
        "grant_type={}",
        INSTALLED_CLIENT_GRANT
            .replace(':', "%3A")
            .replace('/', "%2F")
    );
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(basic_auth(CLIENT_ID, CLIENT_SECRET))
        .and(body_string_contains(grant.as_str()))
        .and(body_string_contains("device_id=test-device-0123456789"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("fresh", 86400)))
        .expect(1)
        .mount(&server)
        .await;

    let uri = server.uri();
    let (token, stored) = blocking(move || {
        let store = Arc::new(MemoryTokenStore::with_token(cached(
            "stale",
            Duration::minutes(10),
        )));
        let manager = auth_manager(&uri, store.clone());
        let token = manager.auth().unwrap();
        // The stored token is now fresh, so a second call is served from the store.
        let again = manager.auth().unwrap();
        assert_eq!(again, token);
        (token, store.get_token().unwrap())
    })
    .await;

    assert_eq!(token, "fresh");
    let stored = stored.unwrap();
    assert_eq!(stored.token, "fresh");
    assert!(stored.expires_at > OffsetDateTime::now_utc() + Duration::hours(23));
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_token_is_exchanged_and_persisted_to_file() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("from-file", 3600 * 24)))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let token_path = dir.path().join("secrets").join("token");
    let uri = server.uri();
    let path_for_task = token_path.clone();
    let token = blocking(move || {
        let store = Arc::new(FileTokenStore::new(path_for_task));
        auth_manager(&uri, store).auth()
    })
    .await
    .unwrap();
    assert_eq!(token, "from-file");

    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&token_path).unwrap()).unwrap();
    assert_eq!(raw["token"], "from-file");
    assert!(raw["expires"].is_string());
}

#[tokio::test(flavor = "multi_thread")]
async fn bad_status_reports_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_string(r#"{"error": 401}"#))
        .expect(1)
        .mount(&server)
        .await;

    let uri = server.uri();
    let err = blocking(move || auth_manager(&uri, Arc::new(MemoryTokenStore::new())).auth())
        .await
        .unwrap_err();
    match &err {
        AuthError::HttpStatus { status, body } => {
            assert_eq!(*status, 401);
            assert!(body.contains("error"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains(r#"{"error": 401}"#));
}

#[tokio::test(flavor = "multi_thread")]
async fn non_200_success_status_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(202).set_body_json(token_body("accepted", 86400)))
        .expect(1)
        .mount(&server)
        .await;

    let uri = server.uri();
    let err = blocking(move || auth_manager(&uri, Arc::new(MemoryTokenStore::new())).auth())
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::HttpStatus { status: 202, .. }));
}

#[tokio::test(flavor = "multi_thread")]
async fn malformed_response_reports_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let uri = server.uri();
    let err = blocking(move || auth_manager(&uri, Arc::new(MemoryTokenStore::new())).auth())
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::MalformedResponse { ref body, .. } if body == "<html>oops</html>"));
}

#[tokio::test(flavor = "multi_thread")]
async fn empty_token_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("", 3600)))
        .mount(&server)
        .await;

    let uri = server.uri();
    let err = blocking(move || auth_manager(&uri, Arc::new(MemoryTokenStore::new())).auth())
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::EmptyToken { .. }));
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_store_write_fails_auth() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("unsaved", 3600)))
        .expect(1)
        .mount(&server)
        .await;

    let uri = server.uri();
    let err = blocking(move || auth_manager(&uri, Arc::new(ReadOnlyStore)).auth())
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::StoreWrite { .. }));
}

#[tokio::test(flavor = "multi_thread")]
async fn force_auth_ignores_valid_cache() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("forced", 86400)))
        .expect(1)
        .mount(&server)
        .await;

    let uri = server.uri();
    let token = blocking(move || {
        let store = Arc::new(MemoryTokenStore::with_token(cached("cached", Duration::hours(5))));
        auth_manager(&uri, store).force_auth()
    })
    .await
    .unwrap();
    assert_eq!(token, "forced");
}
