//! End-to-end profile resolution against a mock identity + compute server.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use serde_json::{Value, json};
use stratus_config::{
    CacheSettings, ClientRequest, CloudProfile, ConfigError, LegacyClientOptions,
};
use stratus_session::{AccessInfo, AuthCapability, ServiceCatalog};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Password-style capability that authenticates against `/v3/auth/tokens`.
#[derive(Debug)]
struct MockPasswordAuth {
    auth_url: String,
    calls: AtomicU32,
}

#[async_trait]
impl AuthCapability for MockPasswordAuth {
    async fn access(&self, http: &reqwest::Client) -> stratus_session::Result<AccessInfo> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let response = http
            .post(format!("{}/auth/tokens", self.auth_url))
            .json(&json!({"auth": {"identity": {"methods": ["password"]}}}))
            .send()
            .await?
            .error_for_status()?;

        let token = response
            .headers()
            .get("X-Subject-Token")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| stratus_session::Error::Auth("missing subject token".to_string()))?
            .to_string();
        let body: Value = response.json().await?;
        let catalog = ServiceCatalog::from_json(&body["token"]["catalog"].to_string())?;

        Ok(AccessInfo { token, catalog })
    }

    fn auth_url(&self) -> Option<String> {
        Some(self.auth_url.clone())
    }
}

async fn mock_cloud() -> MockServer {
    let server = MockServer::start().await;
    let catalog = json!([
        {
            "type": "compute",
            "name": "nova",
            "endpoints": [
                {"interface": "public", "region": "RegionOne", "url": format!("{}/compute/v2.1", server.uri())},
                {"interface": "internal", "region": "RegionOne", "url": "http://internal.invalid/v2.1"}
            ]
        },
        {
            "type": "object-store",
            "name": "swift",
            "endpoints": [
                {"interface": "public", "region": "RegionOne", "url": format!("{}/swift/v1/AUTH_demo", server.uri())}
            ]
        }
    ]);

    Mock::given(method("POST"))
        .and(path("/v3/auth/tokens"))
        .respond_with(
            ResponseTemplate::new(201)
                .insert_header("X-Subject-Token", "gAAAA-token")
                .set_body_json(json!({"token": {"catalog": catalog}})),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/compute/v2.1/servers"))
        .and(header("X-Auth-Token", "gAAAA-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"servers": []})))
        .mount(&server)
        .await;

    server
}

fn profile_for(server: &MockServer, config: Value) -> (CloudProfile, Arc<MockPasswordAuth>) {
    let Value::Object(map) = config else {
        panic!("config must be an object");
    };
    let auth = Arc::new(MockPasswordAuth {
        auth_url: format!("{}/v3", server.uri()),
        calls: AtomicU32::new(0),
    });
    let profile = CloudProfile::new("mock", "RegionOne", map).with_auth(auth.clone());
    (profile, auth)
}

#[tokio::test]
async fn test_catalog_endpoint_and_authenticated_request() {
    let server = mock_cloud().await;
    let (profile, auth) = profile_for(&server, json!({"api_timeout": 5, "interface": "public"}));

    let endpoint = profile.session_endpoint("compute").await.unwrap().unwrap();
    assert_eq!(endpoint, format!("{}/compute/v2.1", server.uri()));

    let session = profile.session().unwrap();
    let response = session
        .request(reqwest::Method::GET, &format!("{}/servers", endpoint))
        .await
        .unwrap()
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert!(auth.calls.load(Ordering::SeqCst) >= 2);
}

#[tokio::test]
async fn test_identity_endpoint_skips_authentication() {
    let server = mock_cloud().await;
    let (profile, auth) = profile_for(&server, json!({}));

    let endpoint = profile.session_endpoint("identity").await.unwrap();
    assert_eq!(endpoint, Some(format!("{}/v3", server.uri())));
    assert_eq!(auth.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_legacy_and_object_store_clients() {
    let server = mock_cloud().await;
    let (profile, _auth) = profile_for(
        &server,
        json!({"compute_interface": "internal", "compute_api_version": "2.1", "identity_api_version": "3"}),
    );

    let compute = profile
        .legacy_client(
            "compute",
            |request| match request {
                ClientRequest::Legacy(args) => Ok::<_, ConfigError>(args),
                ClientRequest::ObjectStore(_) => panic!("unexpected object-store request"),
            },
            LegacyClientOptions::new(),
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(compute.version(), Some("2.1"));
    assert_eq!(compute.keywords.text("endpoint_type"), Some("internal"));

    let swift = profile
        .legacy_client(
            "object-store",
            |request| match request {
                ClientRequest::ObjectStore(args) => Ok::<_, ConfigError>(args),
                ClientRequest::Legacy(_) => panic!("unexpected legacy request"),
            },
            LegacyClientOptions::new(),
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(swift.preauth_token, "gAAAA-token");
    assert_eq!(swift.preauth_url, format!("{}/swift/v1/AUTH_demo", server.uri()));
    assert_eq!(swift.auth_version.as_deref(), Some("3"));
}

#[tokio::test]
async fn test_auth_failure_propagates_and_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v3/auth/tokens"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;

    let (profile, _auth) = profile_for(&server, json!({}));
    let err = profile.session_endpoint("compute").await.unwrap_err();
    assert!(matches!(err, ConfigError::Session(_)));
    assert!(err.is_auth_error());

    assert!(profile.session_endpoint("compute").await.is_err());
}

#[tokio::test]
async fn test_profile_with_cache_store() {
    let server = mock_cloud().await;
    let store = CacheSettings::from_yaml(
        r#"
cache:
  max_age: 120
  expiration:
    server: 10
"#,
    )
    .unwrap()
    .shared();
    let (profile, _auth) = profile_for(&server, json!({}));
    let profile = profile.with_store(store);

    assert_eq!(profile.cache_expiration_time(), Some(120));
    assert_eq!(
        profile.cache_resource_expiration("server", None).unwrap(),
        Some(10.0)
    );
    assert_eq!(
        profile.cache_resource_expiration("image", Some(3.5)).unwrap(),
        Some(3.5)
    );
}
