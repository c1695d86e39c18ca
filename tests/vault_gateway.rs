//! Wire contract of the Vault HTTP gateway.

mod common;

use common::*;
use keepsake::config::VaultConfig;
use keepsake::vault::{
    GatewayError, HttpVaultGateway, IssuanceRequest, PkiPath, SecretString, VaultGateway,
};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn unwrap_returns_client_token_from_auth_block() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/sys/wrapping/unwrap"))
        .and(header("X-Vault-Token", "s.wrapper"))
        .respond_with(ResponseTemplate::new(200).set_body_json(auth_response("s.real", 3600)))
        .expect(1)
        .mount(&server)
        .await;

    let secret = gateway_for(&server, None)
        .unwrap(&SecretString::new("s.wrapper"))
        .await
        .unwrap()
        .expect("wrapped token should unwrap");

    assert_eq!(secret.client_token.unwrap().expose_secret(), "s.real");
    assert_eq!(secret.lease_duration, Duration::from_secs(3600));
    assert!(secret.renewable);
}

#[tokio::test]
async fn unwrap_of_plain_token_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/sys/wrapping/unwrap"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(error_response("wrapping token is not valid or does not exist")),
        )
        .mount(&server)
        .await;

    let secret = gateway_for(&server, None).unwrap(&SecretString::new("s.plain")).await.unwrap();

    assert!(secret.is_none());
}

#[tokio::test]
async fn unwrap_denied_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/sys/wrapping/unwrap"))
        .respond_with(ResponseTemplate::new(403).set_body_json(error_response("permission denied")))
        .mount(&server)
        .await;

    let err = gateway_for(&server, None).unwrap(&SecretString::new("s.x")).await.unwrap_err();

    assert_eq!(err.status_code(), Some(403));
    assert!(err.to_string().contains("permission denied"));
}

#[tokio::test]
async fn lookup_self_reports_remaining_ttl() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/auth/token/lookup-self"))
        .and(header("X-Vault-Token", "s.plain"))
        .respond_with(ResponseTemplate::new(200).set_body_json(lookup_response(1800)))
        .mount(&server)
        .await;

    let secret =
        gateway_for(&server, None).lookup_self(&SecretString::new("s.plain")).await.unwrap();

    assert!(secret.client_token.is_none());
    assert_eq!(secret.lease_duration, Duration::from_secs(1800));
}

#[tokio::test]
async fn renew_self_returns_new_lease() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/auth/token/renew-self"))
        .and(header("X-Vault-Token", "s.live"))
        .respond_with(ResponseTemplate::new(200).set_body_json(auth_response("s.live", 600)))
        .expect(1)
        .mount(&server)
        .await;

    let secret = gateway_for(&server, None).renew_self(&SecretString::new("s.live")).await.unwrap();

    assert_eq!(secret.lease_duration, Duration::from_secs(600));
}

#[tokio::test]
async fn namespace_header_is_sent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/auth/token/renew-self"))
        .and(header("X-Vault-Namespace", "platform/team-a"))
        .respond_with(ResponseTemplate::new(200).set_body_json(auth_response("s.ns", 60)))
        .expect(1)
        .mount(&server)
        .await;

    let secret = gateway_for(&server, Some("platform/team-a"))
        .renew_self(&SecretString::new("s.ns"))
        .await
        .unwrap();

    assert_eq!(secret.lease_duration, Duration::from_secs(60));
}

#[tokio::test]
async fn issue_sends_request_and_parses_bundle() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/pki_int/issue/web"))
        .and(header("X-Vault-Token", "s.issuer"))
        .and(body_json(json!({
            "common_name": "svc.example.com",
            "alt_names": "svc.internal,svc",
            "ip_sans": "10.0.0.5",
            "ttl": "3600s"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(issue_response(3599)))
        .expect(1)
        .mount(&server)
        .await;

    let request = IssuanceRequest::new("svc.example.com", "10.0.0.5")
        .with_alt_names("svc.internal,svc")
        .with_ttl(Duration::from_secs(3600));
    let bundle = gateway_for(&server, None)
        .issue(&SecretString::new("s.issuer"), &PkiPath::new("pki_int", "web"), &request)
        .await
        .unwrap();

    assert_eq!(bundle.certificate, PEM_CERT);
    assert_eq!(bundle.issuing_ca, PEM_CA);
    assert_eq!(bundle.private_key.expose_secret(), PEM_KEY);
    assert_eq!(bundle.lease_duration, Duration::from_secs(3599));
    assert_eq!(bundle.expires_at.map(|t| t.timestamp()), Some(1_900_000_000));
    assert!(bundle.serial_number.unwrap().starts_with("39:dd"));
}

#[tokio::test]
async fn issue_without_optional_fields_omits_them() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/pki/issue/server"))
        .and(body_json(json!({ "common_name": "svc.example.com", "ip_sans": "127.0.0.1" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(issue_response(86400)))
        .expect(1)
        .mount(&server)
        .await;

    let bundle = gateway_for(&server, None)
        .issue(
            &SecretString::new("s.t"),
            &PkiPath::new("pki", "server"),
            &IssuanceRequest::new("svc.example.com", "127.0.0.1"),
        )
        .await
        .unwrap();

    assert_eq!(bundle.lease_duration, Duration::from_secs(86400));
}

#[tokio::test]
async fn issue_with_non_string_field_is_malformed() {
    let server = MockServer::start().await;
    let mut body = issue_response(60);
    body["data"]["private_key"] = json!(42);
    Mock::given(method("POST"))
        .and(path("/v1/pki/issue/server"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&server)
        .await;

    let err = gateway_for(&server, None)
        .issue(
            &SecretString::new("s.t"),
            &PkiPath::new("pki", "server"),
            &IssuanceRequest::new("svc.example.com", "127.0.0.1"),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, GatewayError::MissingField { field: "private_key", .. }));
}

#[tokio::test]
async fn issue_with_invalid_json_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/pki/issue/server"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy error</html>"))
        .mount(&server)
        .await;

    let err = gateway_for(&server, None)
        .issue(
            &SecretString::new("s.t"),
            &PkiPath::new("pki", "server"),
            &IssuanceRequest::new("svc.example.com", "127.0.0.1"),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, GatewayError::MalformedResponse { .. }));
}

#[tokio::test]
async fn unreachable_vault_is_connection_failure() {
    let config = VaultConfig::from_lookup(|key| {
        (key == "VAULT_ADDR").then(|| "http://127.0.0.1:1".to_string())
    })
    .unwrap();
    let gateway = HttpVaultGateway::new(&config).unwrap();

    let err = gateway.renew_self(&SecretString::new("s.t")).await.unwrap_err();

    assert!(matches!(err, GatewayError::ConnectionFailed { .. }));
}
