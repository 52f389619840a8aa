//! End-to-end integration tests for the SET protocol engine.
//!
//! These drive whole transactions through [`SetSession`] against one set of
//! shared parties (CA, payment processor, acquiring bank): certificate
//! request, bundle construction, bank verification, authorization, capture,
//! and the signed confirmation. Failure paths check both the reported
//! outcome and where the state machine ends up.
//!
//! RSA keys are generated once per test binary; every test builds its own
//! parties around them, so tests share no mutable state.

use std::sync::{Arc, OnceLock};

use set_protocol::clock::FixedClock;
use set_protocol::config::ProtocolConfig;
use set_protocol::crypto::SetKeypair;
use set_protocol::ids::SequentialIds;
use set_protocol::payment::{
    ApproveAll, AuthorizationPolicy, CaptureStatus, SpendingLimit, DECLINED_CAPTURE_REASON,
};
use set_protocol::session::{
    ArtifactKind, ArtifactStore, InMemoryArtifactStore, Operation, ProtocolState, SetSession,
    SharedServices,
};
use set_protocol::transaction::{Amount, Currency, OrderRecord};
use set_protocol::SetError;

const START_MILLIS: i64 = 1_700_000_000_000;
const PAN: &str = "4111111111111111";

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

fn key(cell: &'static OnceLock<SetKeypair>) -> SetKeypair {
    cell.get_or_init(|| SetKeypair::generate_default().expect("keygen"))
        .clone()
}

fn client_key() -> SetKeypair {
    static KEY: OnceLock<SetKeypair> = OnceLock::new();
    key(&KEY)
}

fn ca_key() -> SetKeypair {
    static KEY: OnceLock<SetKeypair> = OnceLock::new();
    key(&KEY)
}

fn bank_key() -> SetKeypair {
    static KEY: OnceLock<SetKeypair> = OnceLock::new();
    key(&KEY)
}

/// Shared parties on a fixed clock. The clock handle is returned so tests
/// can move time.
fn setup_with(
    config: ProtocolConfig,
    policy: Box<dyn AuthorizationPolicy>,
) -> (SharedServices, Arc<FixedClock>) {
    let clock = Arc::new(FixedClock::at_millis(START_MILLIS));
    let services = SharedServices::with_keys(
        config,
        ca_key(),
        bank_key(),
        policy,
        clock.clone(),
        Arc::new(SequentialIds::new()),
    )
    .expect("services");
    (services, clock)
}

fn setup() -> (SharedServices, Arc<FixedClock>) {
    setup_with(ProtocolConfig::default(), Box::new(ApproveAll))
}

fn client_session(services: &SharedServices, session_id: &str) -> SetSession {
    SetSession::with_keypair(session_id, "C1", client_key(), services.clone())
}

/// 49.99 EUR at ShopX.
fn purchase(session: &SetSession, transaction_id: &str, amount: &str) -> OrderRecord {
    session
        .order_builder()
        .transaction_id(transaction_id)
        .merchant("ShopX")
        .amount(Amount::parse(amount, Currency::EUR).expect("amount"))
        .build()
}

/// Enroll, bundle, submit, and verify an honest order.
fn verified_session(services: &SharedServices, session_id: &str, txn: &str) -> SetSession {
    let mut session = client_session(services, session_id);
    session.request_certificate().unwrap();
    session.obtain_certificate().unwrap();
    let order = purchase(&session, txn, "49.99");
    session.create_bundle(order, PAN).unwrap();
    session.submit().unwrap();
    let report = session.verify().unwrap();
    assert!(report.accepted(), "{:?}", report.failed_checks());
    session
}

// ---------------------------------------------------------------------------
// 1. Happy Path
// ---------------------------------------------------------------------------

#[test]
fn purchase_runs_to_signed_confirmation() {
    let (services, _clock) = setup();
    let mut session = verified_session(&services, "S1", "TXN-1");

    session.request_payment().unwrap();
    assert_eq!(session.masked_card(), Some("411111******1111"));

    let authorization = session.authorize().unwrap().clone();
    assert!(authorization.authorized);
    assert!(authorization
        .authorization_code
        .as_deref()
        .unwrap()
        .starts_with("AUTH-"));

    let capture = session.capture().unwrap().clone();
    assert!(capture.captured);
    assert_eq!(capture.status, CaptureStatus::Completed);
    assert_eq!(capture.amount_captured, Some(Amount::new(4999, Currency::EUR)));

    let confirmation = session.complete().unwrap().clone();
    assert_eq!(session.state(), ProtocolState::Completed);
    assert_eq!(confirmation.transaction_id, "TXN-1");
    assert_eq!(confirmation.merchant_id, "ShopX");
    assert_eq!(confirmation.final_status, CaptureStatus::Completed);
    assert_eq!(
        confirmation.certificate_id,
        session.certificate().unwrap().certificate_id
    );
    assert!(confirmation.verify(services.acquirer.public_key()));
    assert!(!confirmation.verify(session.client_public_key().unwrap()));

    let visited: Vec<ProtocolState> = session.history().iter().map(|t| t.to).collect();
    assert_eq!(
        visited,
        vec![
            ProtocolState::CertRequested,
            ProtocolState::CertActive,
            ProtocolState::BundleCreated,
            ProtocolState::Submitted,
            ProtocolState::Verified,
            ProtocolState::PaymentRequested,
            ProtocolState::Authorized,
            ProtocolState::Captured,
            ProtocolState::Completed,
        ]
    );
}

#[test]
fn summary_serializes_without_card_number() {
    let (services, _clock) = setup();
    let mut session = verified_session(&services, "S1", "TXN-1");
    session.request_payment().unwrap();

    let json = serde_json::to_string(&session.summary()).unwrap();
    assert!(json.contains("411111******1111"));
    assert!(!json.contains(PAN));
}

// ---------------------------------------------------------------------------
// 2. Tampering and Expiry
// ---------------------------------------------------------------------------

#[test]
fn tampered_amount_never_reaches_the_processor() {
    let (services, _clock) = setup();
    let mut session = client_session(&services, "S1");
    session.request_certificate().unwrap();
    session.obtain_certificate().unwrap();
    let order = purchase(&session, "TXN-1", "49.99");
    session.create_bundle(order, PAN).unwrap();

    let mut altered = session.bundle().unwrap().clone();
    altered.order.amount = Amount::parse("9999.99", Currency::EUR).unwrap();
    session.submit_json(&altered.to_json().unwrap()).unwrap();

    let report = session.verify().unwrap();
    assert!(!report.signature_ok);
    assert!(!report.hash_integrity_ok);
    assert!(report.certificate_ok);
    assert!(!report.accepted());
    assert_eq!(session.state(), ProtocolState::Error);

    assert!(matches!(
        session.request_payment(),
        Err(SetError::IllegalTransition {
            state: ProtocolState::Error,
            operation: Operation::RequestPayment
        })
    ));
    assert!(!services.processor.is_processed("TXN-1"));
}

#[test]
fn expired_certificate_fails_only_the_certificate_check() {
    let config = ProtocolConfig {
        certificate_validity_secs: 60,
        ..ProtocolConfig::default()
    };
    let (services, clock) = setup_with(config, Box::new(ApproveAll));
    let mut session = client_session(&services, "S1");
    session.request_certificate().unwrap();
    session.obtain_certificate().unwrap();
    let order = purchase(&session, "TXN-1", "49.99");
    session.create_bundle(order, PAN).unwrap();

    clock.advance(chrono::Duration::seconds(61));
    session.submit().unwrap();
    let report = session.verify().unwrap();

    assert!(!report.certificate_ok);
    assert!(report.signature_ok);
    assert!(report.hash_integrity_ok);
    assert!(report.timestamp_ok);
    assert_eq!(report.failed_checks(), vec!["certificate"]);
    assert_eq!(session.state(), ProtocolState::Error);
}

#[test]
fn unknown_wire_field_fails_submission() {
    let (services, _clock) = setup();
    let mut session = client_session(&services, "S1");
    session.request_certificate().unwrap();
    session.obtain_certificate().unwrap();
    let order = purchase(&session, "TXN-1", "49.99");
    session.create_bundle(order, PAN).unwrap();

    let mut wire: serde_json::Value =
        serde_json::from_str(&session.bundle().unwrap().to_json().unwrap()).unwrap();
    wire["priority"] = serde_json::json!("high");

    let err = session.submit_json(&wire.to_string()).unwrap_err();
    assert!(matches!(err, SetError::Serialization(_)));
    assert_eq!(session.state(), ProtocolState::Error);
}

// ---------------------------------------------------------------------------
// 3. Settlement Failures
// ---------------------------------------------------------------------------

#[test]
fn replayed_transaction_is_refused() {
    let (services, _clock) = setup();

    let mut first = verified_session(&services, "S1", "TXN-1");
    first.request_payment().unwrap();
    first.authorize().unwrap();

    let mut second = verified_session(&services, "S2", "TXN-1");
    second.request_payment().unwrap();
    let err = second.authorize().unwrap_err();
    assert!(matches!(err, SetError::ReplayDetected(ref id) if id == "TXN-1"));
    assert_eq!(second.state(), ProtocolState::PaymentRequested);
    assert!(second.authorization().is_none());
}

#[test]
fn declined_order_is_never_captured() {
    let limit = SpendingLimit::new(Amount::parse("20.00", Currency::EUR).unwrap());
    let (services, _clock) = setup_with(ProtocolConfig::default(), Box::new(limit));
    let mut session = verified_session(&services, "S1", "TXN-1");
    session.request_payment().unwrap();

    let authorization = session.authorize().unwrap().clone();
    assert!(!authorization.authorized);
    assert!(authorization.authorization_code.is_none());
    assert!(authorization.decline_reason.is_some());

    let capture = session.capture_result().unwrap();
    assert!(!capture.captured);
    assert_eq!(capture.status, CaptureStatus::Failed);
    assert_eq!(capture.failure_reason.as_deref(), Some(DECLINED_CAPTURE_REASON));
    assert_eq!(session.state(), ProtocolState::Error);

    // The declined id is spent.
    assert!(services.processor.is_processed("TXN-1"));
    assert!(matches!(session.complete(), Err(SetError::IllegalTransition { .. })));
}

// ---------------------------------------------------------------------------
// 4. Revocation and Recovery
// ---------------------------------------------------------------------------

#[test]
fn revoked_certificate_rejects_bundles_until_reenrollment() {
    let (services, _clock) = setup();
    let mut session = client_session(&services, "S1");
    session.request_certificate().unwrap();
    let old_id = session.obtain_certificate().unwrap().certificate_id.clone();
    let order = purchase(&session, "TXN-1", "49.99");
    let stale_bundle = session.create_bundle(order, PAN).unwrap().clone();

    session.revoke().unwrap();
    assert_eq!(session.state(), ProtocolState::Revoked);

    let report = services.acquirer.verify(&stale_bundle);
    assert!(!report.certificate_ok);
    assert!(report.signature_ok);

    session.request_certificate().unwrap();
    let new_id = session.obtain_certificate().unwrap().certificate_id.clone();
    assert_ne!(new_id, old_id);
    assert!(services.ca.is_revoked(&old_id));
    assert!(!services.ca.is_revoked(&new_id));

    let order = purchase(&session, "TXN-2", "49.99");
    session.create_bundle(order, PAN).unwrap();
    session.submit().unwrap();
    assert!(session.verify().unwrap().accepted());
}

#[test]
fn retry_after_failure_starts_over() {
    let (services, _clock) = setup();
    let mut session = client_session(&services, "S1");
    session.request_certificate().unwrap();
    session.obtain_certificate().unwrap();
    let order = purchase(&session, "TXN-1", "49.99");
    assert!(session.create_bundle(order, "not-a-card").is_err());
    assert_eq!(session.state(), ProtocolState::Error);

    session.retry().unwrap();
    assert_eq!(session.state(), ProtocolState::Init);
    assert!(session.certificate().is_none());

    session.request_certificate().unwrap();
    session.obtain_certificate().unwrap();
    let order = purchase(&session, "TXN-1", "49.99");
    session.create_bundle(order, PAN).unwrap();
    assert_eq!(session.state(), ProtocolState::BundleCreated);
}

#[test]
fn illegal_steps_leave_state_untouched() {
    let (services, _clock) = setup();
    let mut session = client_session(&services, "S1");

    assert!(matches!(
        session.submit(),
        Err(SetError::IllegalTransition {
            state: ProtocolState::Init,
            operation: Operation::Submit
        })
    ));
    assert!(matches!(
        session.revoke(),
        Err(SetError::IllegalTransition {
            state: ProtocolState::Init,
            operation: Operation::Revoke
        })
    ));
    assert_eq!(session.state(), ProtocolState::Init);
    assert!(session.history().is_empty());

    session.request_certificate().unwrap();
    assert!(matches!(
        session.request_certificate(),
        Err(SetError::IllegalTransition {
            state: ProtocolState::CertRequested,
            ..
        })
    ));
    assert_eq!(session.history().len(), 1);
}

// ---------------------------------------------------------------------------
// 5. Storage and Concurrency
// ---------------------------------------------------------------------------

#[test]
fn checkpoint_stores_every_artifact() {
    let (services, _clock) = setup();
    let mut session = verified_session(&services, "S1", "TXN-1");
    session.request_payment().unwrap();
    session.authorize().unwrap();
    session.capture().unwrap();
    session.complete().unwrap();

    let store = InMemoryArtifactStore::new();
    session.checkpoint(&store);
    assert_eq!(
        store.kinds("S1"),
        vec![
            ArtifactKind::Keypair,
            ArtifactKind::Certificate,
            ArtifactKind::Bundle,
            ArtifactKind::Authorization,
            ArtifactKind::Capture,
            ArtifactKind::Confirmation,
        ]
    );
    store.clear("S1");
    assert!(store.kinds("S1").is_empty());
}

#[test]
fn concurrent_sessions_share_one_set_of_parties() {
    let (services, _clock) = setup();

    std::thread::scope(|scope| {
        for i in 0..4 {
            let services = &services;
            scope.spawn(move || {
                let txn = format!("TXN-{i}");
                let mut session = verified_session(services, &format!("S{i}"), &txn);
                session.request_payment().unwrap();
                session.authorize().unwrap();
                session.capture().unwrap();
                session.complete().unwrap();
                assert_eq!(session.state(), ProtocolState::Completed);
            });
        }
    });

    for i in 0..4 {
        assert!(services.processor.is_processed(&format!("TXN-{i}")));
    }
    // Four clients plus the bank.
    assert_eq!(services.ca.issued_count(), 5);
}
