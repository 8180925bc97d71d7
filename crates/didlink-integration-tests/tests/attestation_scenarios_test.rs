//! # Attestation Scenarios
//!
//! The user-visible stories end to end: engine, codec, in-memory store and
//! wallet sources together.
//!
//! | Scenario | Setup | Expected |
//! |----------|-------|----------|
//! | A | empty slot | `NoRecord`, "None linked yet." |
//! | B | link with valid signature, wallet active | `RecordVerified`, matches |
//! | C | record signed by another key | not authentic, whatever is active |
//! | D | authentic record, other wallet active | authentic, no match |

use std::sync::Arc;

use didlink_core::{ActiveWallets, Identity, WalletAddress, WalletChannel};
use didlink_crypto::{build_message, WalletKeyPair};
use didlink_engine::{
    reconcile, AttestationEngine, EngineState, StaticWalletSource, StatusFlags,
};
use didlink_store::{AttestationStore, MemoryAttestationStore};

fn alice() -> Identity {
    Identity::parse("did:plc:abc").unwrap()
}

fn sign_for(key: &WalletKeyPair, identity: &Identity, address: &WalletAddress) -> String {
    key.sign_message(&build_message(identity, address))
        .unwrap()
        .to_hex()
}

struct Harness {
    engine: AttestationEngine<Arc<MemoryAttestationStore>>,
    store: Arc<MemoryAttestationStore>,
    connected: Arc<StaticWalletSource>,
    embedded: Arc<StaticWalletSource>,
}

fn harness() -> Harness {
    let store = Arc::new(MemoryAttestationStore::new());
    let connected = Arc::new(StaticWalletSource::new("connected", WalletChannel::Connected));
    let embedded = Arc::new(StaticWalletSource::new("embedded", WalletChannel::Embedded));
    let engine = AttestationEngine::new(store.clone())
        .with_source(connected.clone())
        .with_source(embedded.clone());
    Harness {
        engine,
        store,
        connected,
        embedded,
    }
}

#[tokio::test]
async fn scenario_a_no_record() {
    let h = harness();
    assert_eq!(
        h.engine.start_session(alice()).await.unwrap(),
        EngineState::NoRecord
    );
    let view = h.engine.view();
    assert_eq!(view.flags, StatusFlags::default());
    assert_eq!(view.record_line, "None linked yet.");
    assert_eq!(view.link_cta, "Link wallet to DID");
}

#[tokio::test]
async fn scenario_b_link_and_verify() {
    let h = harness();
    let key = WalletKeyPair::generate();
    h.connected.set([key.address()]);
    h.engine.start_session(alice()).await.unwrap();

    let state = h
        .engine
        .link(key.address(), &sign_for(&key, &alice(), &key.address()))
        .await
        .unwrap();
    assert_eq!(state, EngineState::RecordVerified);

    // Stored in the single slot under the canonical address.
    let stored = h.store.get(&alice()).await.unwrap();
    assert_eq!(stored.address, key.address());
    assert_eq!(
        stored.locator.as_str(),
        "at://did:plc:abc/com.hypercert.walletAttestationTest/self"
    );

    let view = h.engine.view();
    assert!(view.flags.record_present);
    assert!(view.flags.record_verified);
    assert!(view.flags.active_wallet_matches);
    assert_eq!(view.record_badge, Some("wallet ownership verified"));
    assert_eq!(view.wallet_badge, Some("Current wallet = attested wallet"));
}

#[tokio::test]
async fn scenario_b_embedded_channel_counts_the_same() {
    let h = harness();
    let key = WalletKeyPair::generate();
    h.embedded.set([key.address()]);
    h.engine.start_session(alice()).await.unwrap();
    h.engine
        .link(key.address(), &sign_for(&key, &alice(), &key.address()))
        .await
        .unwrap();
    assert!(h.engine.last_result().unwrap().matches_active_wallet());
}

#[tokio::test]
async fn scenario_c_signature_recovers_to_other_address() {
    let h = harness();
    let claimed = WalletKeyPair::generate();
    let actual = WalletKeyPair::generate();
    h.store.insert_raw(
        &alice(),
        &claimed.address().to_checksum(),
        &sign_for(&actual, &alice(), &claimed.address()),
    );

    for active in [
        vec![],
        vec![claimed.address()],
        vec![actual.address()],
        vec![claimed.address(), actual.address()],
    ] {
        h.connected.set(active);
        let state = h.engine.start_session(alice()).await.unwrap();
        assert_eq!(state, EngineState::RecordUnverified);
        let result = h.engine.last_result().unwrap();
        assert!(!result.is_authentic());
        assert!(!result.matches_active_wallet());
        assert_eq!(result.signer_recovered(), Some(&actual.address()));
        assert!(!h.engine.view().flags.record_verified);
    }
}

#[tokio::test]
async fn scenario_d_authentic_but_not_active() {
    let h = harness();
    let key = WalletKeyPair::generate();
    let other = WalletAddress::from_bytes([0xcc; 20]);
    h.connected.set([other]);
    h.engine.start_session(alice()).await.unwrap();
    h.engine
        .link(key.address(), &sign_for(&key, &alice(), &key.address()))
        .await
        .unwrap();

    let result = h.engine.last_result().unwrap();
    assert!(result.is_authentic());
    assert!(!result.matches_active_wallet());
    let view = h.engine.view();
    assert!(view.flags.record_verified);
    assert!(!view.flags.active_wallet_matches);
    assert_eq!(view.wallet_badge, Some("Current wallet != attested wallet"));
}

#[tokio::test]
async fn lowercase_stored_address_still_verifies() {
    let h = harness();
    let key = WalletKeyPair::generate();
    h.store.insert_raw(
        &alice(),
        &key.address().to_lower_hex(),
        &sign_for(&key, &alice(), &key.address()),
    );
    h.connected.set([key.address()]);
    assert_eq!(
        h.engine.start_session(alice()).await.unwrap(),
        EngineState::RecordVerified
    );
}

#[tokio::test]
async fn malformed_signature_in_store_is_unverified() {
    let h = harness();
    let key = WalletKeyPair::generate();
    h.store
        .insert_raw(&alice(), &key.address().to_checksum(), "not-hex-at-all");
    assert_eq!(
        h.engine.start_session(alice()).await.unwrap(),
        EngineState::RecordUnverified
    );
    assert!(h
        .engine
        .last_result()
        .unwrap()
        .malformed_signature()
        .is_some());
}

#[tokio::test]
async fn relinking_replaces_the_slot() {
    let h = harness();
    let first = WalletKeyPair::generate();
    let second = WalletKeyPair::generate();
    h.engine.start_session(alice()).await.unwrap();

    h.engine
        .link(first.address(), &sign_for(&first, &alice(), &first.address()))
        .await
        .unwrap();
    h.engine
        .link(
            second.address(),
            &sign_for(&second, &alice(), &second.address()),
        )
        .await
        .unwrap();

    assert_eq!(h.store.len(), 1);
    let result = h.engine.last_result().unwrap();
    assert_eq!(result.record_address(), &second.address());
    assert!(result.is_authentic());
}

#[tokio::test]
async fn identities_do_not_share_slots() {
    let h = harness();
    let key = WalletKeyPair::generate();
    let bob = Identity::parse("did:web:bob.example.com").unwrap();

    h.engine.start_session(alice()).await.unwrap();
    h.engine
        .link(key.address(), &sign_for(&key, &alice(), &key.address()))
        .await
        .unwrap();

    assert_eq!(
        h.engine.start_session(bob.clone()).await.unwrap(),
        EngineState::NoRecord
    );

    // Alice's signature copied into Bob's slot does not verify for Bob.
    let stolen = h.store.get(&alice()).await.unwrap();
    h.store
        .insert_raw(&bob, &stolen.address.to_checksum(), &stolen.signature);
    assert_eq!(
        h.engine.refresh().await.unwrap(),
        EngineState::RecordUnverified
    );
}

#[test]
fn reconcile_needs_no_engine() {
    let key = WalletKeyPair::generate();
    let record = didlink_core::AttestationRecord {
        address: key.address(),
        signature: sign_for(&key, &alice(), &key.address()),
        locator: "at://did:plc:abc/com.hypercert.walletAttestationTest/self"
            .parse()
            .unwrap(),
    };
    let active: ActiveWallets = [key.address()].into_iter().collect();
    assert!(reconcile(&alice(), &record, &active).matches_active_wallet());
}
