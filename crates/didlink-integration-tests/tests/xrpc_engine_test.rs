//! Engine over the XRPC store against a mock repository: failure states and
//! explicit retry.

use std::sync::Arc;

use didlink_core::{Identity, WalletChannel};
use didlink_crypto::{build_message, WalletKeyPair};
use didlink_engine::{
    AttestationEngine, EngineError, EngineState, ErrorKind, PasskeyWalletSource,
    StaticWalletSource,
};
use didlink_store::{RepoConfig, StoreError, XrpcAttestationStore, XrpcClient, XrpcPasskeyRegistry};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn alice() -> Identity {
    Identity::parse("did:plc:abc").unwrap()
}

fn client(mock_server: &MockServer) -> XrpcClient {
    let config = RepoConfig::local_mock(&mock_server.uri(), "test-token").unwrap();
    XrpcClient::new(&config).unwrap()
}

#[tokio::test]
async fn expired_token_is_unauthorized_error() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/xrpc/com.atproto.repo.getRecord"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "ExpiredToken",
            "message": "Token has expired"
        })))
        .mount(&mock_server)
        .await;

    let engine = AttestationEngine::new(XrpcAttestationStore::new(client(&mock_server)));
    let err = engine.start_session(alice()).await.unwrap_err();
    assert!(matches!(err, EngineError::Store(StoreError::Unauthorized { .. })));
    assert_eq!(engine.state(), EngineState::Error(ErrorKind::Unauthorized));
    assert!(!engine.view().flags.record_present);
}

#[tokio::test]
async fn outage_then_retry_recovers() {
    let mock_server = MockServer::start().await;
    let key = WalletKeyPair::generate();
    let signature = key
        .sign_message(&build_message(&alice(), &key.address()))
        .unwrap()
        .to_hex();

    // local_mock allows three retries: four failures exhaust the budget.
    Mock::given(method("GET"))
        .and(path("/xrpc/com.atproto.repo.getRecord"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(4)
        .expect(4)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/xrpc/com.atproto.repo.getRecord"))
        .and(query_param("collection", "com.hypercert.walletAttestationTest"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "uri": "at://did:plc:abc/com.hypercert.walletAttestationTest/self",
            "value": {
                "$type": "com.hypercert.walletAttestationTest",
                "address": key.address().to_checksum(),
                "attestation": signature
            }
        })))
        .mount(&mock_server)
        .await;

    let connected = Arc::new(StaticWalletSource::new("connected", WalletChannel::Connected));
    connected.set([key.address()]);
    let engine =
        AttestationEngine::new(XrpcAttestationStore::new(client(&mock_server))).with_source(connected);

    assert!(engine.start_session(alice()).await.is_err());
    assert_eq!(engine.state(), EngineState::Error(ErrorKind::Transport));
    assert!(engine.state().error_kind().is_some_and(|k| k.is_transient()));

    assert_eq!(engine.retry().await.unwrap(), EngineState::RecordVerified);
    assert!(engine.last_result().unwrap().matches_active_wallet());
}

#[tokio::test]
async fn failing_passkey_source_does_not_block_verification() {
    let mock_server = MockServer::start().await;
    let key = WalletKeyPair::generate();
    let signature = key
        .sign_message(&build_message(&alice(), &key.address()))
        .unwrap()
        .to_hex();

    Mock::given(method("GET"))
        .and(path("/xrpc/com.atproto.repo.getRecord"))
        .and(query_param("collection", "com.hypercert.walletAttestationTest"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "uri": "at://did:plc:abc/com.hypercert.walletAttestationTest/self",
            "value": {
                "address": key.address().to_checksum(),
                "attestation": signature
            }
        })))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/xrpc/com.atproto.repo.getRecord"))
        .and(query_param("collection", "com.hypercert.walletPasskeyTest"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&mock_server)
        .await;

    let registry = Arc::new(XrpcPasskeyRegistry::new(client(&mock_server)));
    let engine = AttestationEngine::new(XrpcAttestationStore::new(client(&mock_server)))
        .with_source(Arc::new(PasskeyWalletSource::new(registry)));

    assert_eq!(
        engine.start_session(alice()).await.unwrap(),
        EngineState::RecordVerified
    );
    assert!(!engine.last_result().unwrap().matches_active_wallet());
}
