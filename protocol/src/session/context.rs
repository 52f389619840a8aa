//! Per-transaction context.
//!
//! A [`SetSession`] is one client's run through the protocol. It owns the
//! client's keypair and every artifact the run produces, and holds shared
//! handles to the CA, the payment processor, and the acquiring bank through
//! [`SharedServices`].
//!
//! Each step method drives exactly one transition. When a step fails in a
//! state from which `Fail` is legal, the session moves to `Error` before the
//! error is returned. Verification never errors: a rejected bundle is
//! reported, and the session moves to `Error` after `Verified`.

use rand::Rng;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use super::state::{Operation, ProtocolState, StateMachine, TransitionRecord};
use super::store::{Artifact, ArtifactStore};
use crate::authority::{Certificate, CertificateAuthority, CertificateRequest};
use crate::clock::Clock;
use crate::config::ProtocolConfig;
use crate::crypto::{SetKeypair, SetPublicKey};
use crate::error::SetError;
use crate::ids::IdGenerator;
use crate::payment::{
    assess, Acquirer, AuthorizationPolicy, AuthorizationResult, CaptureResult, Confirmation,
    PaymentProcessor, RiskAssessment, DECLINED_CAPTURE_REASON,
};
use crate::transaction::{
    OrderBuilder, OrderRecord, TransactionBundle, TransactionBundler, VerificationReport,
};

/// Bank id used when [`SharedServices::bootstrap`] enrolls the acquirer.
pub const DEFAULT_BANK_ID: &str = "SET-ACQUIRER";

// ---------------------------------------------------------------------------
// SharedServices
// ---------------------------------------------------------------------------

/// The parties every session talks to. Cheap to clone.
#[derive(Clone)]
pub struct SharedServices {
    pub config: ProtocolConfig,
    pub clock: Arc<dyn Clock>,
    pub ids: Arc<dyn IdGenerator>,
    pub ca: Arc<CertificateAuthority>,
    pub processor: Arc<PaymentProcessor>,
    pub acquirer: Arc<Acquirer>,
}

impl SharedServices {
    /// Generate CA and bank keys, then stand up all three parties.
    pub fn bootstrap(
        config: ProtocolConfig,
        policy: Box<dyn AuthorizationPolicy>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
    ) -> Result<Self, SetError> {
        config.validate()?;
        let ca_keypair = SetKeypair::generate(config.key_bits)?;
        let bank_keypair = SetKeypair::generate(config.key_bits)?;
        Self::with_keys(config, ca_keypair, bank_keypair, policy, clock, ids)
    }

    /// Stand up the parties around existing keys.
    pub fn with_keys(
        config: ProtocolConfig,
        ca_keypair: SetKeypair,
        bank_keypair: SetKeypair,
        policy: Box<dyn AuthorizationPolicy>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
    ) -> Result<Self, SetError> {
        let ca = Arc::new(CertificateAuthority::with_keypair(
            &config.ca_name,
            ca_keypair,
            clock.clone(),
            ids.clone(),
        ));
        let acquirer = Acquirer::enroll(
            DEFAULT_BANK_ID,
            bank_keypair,
            ca.clone(),
            &config,
            clock.clone(),
        )?;
        let processor = PaymentProcessor::new(policy, clock.clone(), ids.clone());

        Ok(Self {
            config,
            clock,
            ids,
            ca,
            processor: Arc::new(processor),
            acquirer: Arc::new(acquirer),
        })
    }
}

// ---------------------------------------------------------------------------
// SessionSummary
// ---------------------------------------------------------------------------

/// Serializable snapshot of a session, for display. Holds no key material.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub client_id: String,
    pub state: ProtocolState,
    pub certificate: Option<Certificate>,
    pub bundle: Option<TransactionBundle>,
    pub verification: Option<VerificationReport>,
    pub masked_card: Option<String>,
    pub authorization: Option<AuthorizationResult>,
    pub capture: Option<CaptureResult>,
    pub confirmation: Option<Confirmation>,
    pub risk: Option<RiskAssessment>,
    pub history: Vec<TransitionRecord>,
}

// ---------------------------------------------------------------------------
// SetSession
// ---------------------------------------------------------------------------

pub struct SetSession {
    session_id: String,
    client_id: String,
    services: SharedServices,
    machine: StateMachine,

    keypair: Option<SetKeypair>,
    request: Option<CertificateRequest>,
    certificate: Option<Certificate>,
    bundle: Option<TransactionBundle>,
    received: Option<TransactionBundle>,
    report: Option<VerificationReport>,
    masked_card: Option<String>,
    authorization: Option<AuthorizationResult>,
    capture: Option<CaptureResult>,
    confirmation: Option<Confirmation>,
    risk: Option<RiskAssessment>,
}

impl SetSession {
    /// A fresh session in `Init`. The client keypair is generated on the
    /// first certificate request.
    pub fn new(session_id: &str, client_id: &str, services: SharedServices) -> Self {
        Self {
            session_id: session_id.to_string(),
            client_id: client_id.to_string(),
            services,
            machine: StateMachine::new(),
            keypair: None,
            request: None,
            certificate: None,
            bundle: None,
            received: None,
            report: None,
            masked_card: None,
            authorization: None,
            capture: None,
            confirmation: None,
            risk: None,
        }
    }

    /// A fresh session that will use `keypair` instead of generating one.
    pub fn with_keypair(
        session_id: &str,
        client_id: &str,
        keypair: SetKeypair,
        services: SharedServices,
    ) -> Self {
        let mut session = Self::new(session_id, client_id, services);
        session.keypair = Some(keypair);
        session
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn state(&self) -> ProtocolState {
        self.machine.state()
    }

    pub fn history(&self) -> &[TransitionRecord] {
        self.machine.history()
    }

    pub fn services(&self) -> &SharedServices {
        &self.services
    }

    pub fn client_public_key(&self) -> Option<&SetPublicKey> {
        self.keypair.as_ref().map(|k| k.public_key())
    }

    pub fn certificate(&self) -> Option<&Certificate> {
        self.certificate.as_ref()
    }

    pub fn bundle(&self) -> Option<&TransactionBundle> {
        self.bundle.as_ref()
    }

    pub fn report(&self) -> Option<&VerificationReport> {
        self.report.as_ref()
    }

    pub fn masked_card(&self) -> Option<&str> {
        self.masked_card.as_deref()
    }

    pub fn authorization(&self) -> Option<&AuthorizationResult> {
        self.authorization.as_ref()
    }

    pub fn capture_result(&self) -> Option<&CaptureResult> {
        self.capture.as_ref()
    }

    pub fn confirmation(&self) -> Option<&Confirmation> {
        self.confirmation.as_ref()
    }

    pub fn risk(&self) -> Option<&RiskAssessment> {
        self.risk.as_ref()
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            session_id: self.session_id.clone(),
            client_id: self.client_id.clone(),
            state: self.state(),
            certificate: self.certificate.clone(),
            bundle: self.bundle.clone(),
            verification: self.report,
            masked_card: self.masked_card.clone(),
            authorization: self.authorization.clone(),
            capture: self.capture.clone(),
            confirmation: self.confirmation.clone(),
            risk: self.risk.clone(),
            history: self.history().to_vec(),
        }
    }

    /// An order builder pre-filled with this client, a fresh transaction id,
    /// and the current time.
    pub fn order_builder(&self) -> OrderBuilder {
        OrderBuilder::new(&self.client_id)
            .transaction_id(&self.services.ids.transaction_id())
            .created_at(self.services.clock.now())
    }

    // -----------------------------------------------------------------------
    // Certificate phase
    // -----------------------------------------------------------------------

    /// Generate the client keypair if needed and sign a certificate request.
    ///
    /// Legal from `Init` and from `Revoked`, where it starts re-enrollment
    /// and discards the artifacts of the revoked run. The keypair is kept
    /// across re-enrollment.
    pub fn request_certificate(&mut self) -> Result<&CertificateRequest, SetError> {
        self.machine.ensure(Operation::RequestCertificate)?;

        let keypair = match self.keypair.take() {
            Some(keypair) => keypair,
            None => SetKeypair::generate(self.services.config.key_bits)?,
        };
        let request = CertificateRequest::new(&self.client_id, &keypair, self.services.clock.now());
        self.keypair = Some(keypair);
        let request = request?;

        self.clear_artifacts();
        self.transition(Operation::RequestCertificate)?;
        info!(session_id = %self.session_id, client_id = %self.client_id, "certificate requested");
        Ok(self.request.insert(request))
    }

    /// Have the CA issue against the pending request.
    pub fn obtain_certificate(&mut self) -> Result<&Certificate, SetError> {
        self.machine.ensure(Operation::IssueCertificate)?;
        let request = self
            .request
            .as_ref()
            .ok_or(SetError::MissingArtifact("certificate request"))?;

        let issued = self
            .services
            .ca
            .issue_for_request(request, self.services.config.certificate_validity());
        let certificate = match issued {
            Ok(certificate) => certificate,
            Err(e) => return Err(self.abort(e)),
        };

        self.transition(Operation::IssueCertificate)?;
        Ok(self.certificate.insert(certificate))
    }

    // -----------------------------------------------------------------------
    // Bundle phase
    // -----------------------------------------------------------------------

    /// Build the signed bundle for `order`, encrypting `pan` to the bank.
    pub fn create_bundle(
        &mut self,
        order: OrderRecord,
        pan: &str,
    ) -> Result<&TransactionBundle, SetError> {
        self.machine.ensure(Operation::CreateBundle)?;
        let (keypair, certificate) = match (&self.keypair, &self.certificate) {
            (Some(k), Some(c)) => (k, c),
            _ => return Err(SetError::MissingArtifact("client certificate")),
        };

        let bundler = TransactionBundler::new(self.services.clock.clone());
        let built = bundler.build(
            order,
            pan,
            keypair,
            certificate,
            self.services.acquirer.certificate(),
        );
        let bundle = match built {
            Ok(bundle) => bundle,
            Err(e) => return Err(self.abort(e)),
        };

        self.transition(Operation::CreateBundle)?;
        Ok(self.bundle.insert(bundle))
    }

    /// Send the session's own bundle to the bank.
    pub fn submit(&mut self) -> Result<(), SetError> {
        self.machine.ensure(Operation::Submit)?;
        let wire = match self.bundle.as_ref().map(TransactionBundle::to_json) {
            Some(Ok(wire)) => wire,
            Some(Err(e)) => return Err(self.abort(e)),
            None => return Err(SetError::MissingArtifact("bundle")),
        };
        self.submit_json(&wire)
    }

    /// Deliver `wire` to the bank as the submitted bundle.
    ///
    /// Whatever arrives is what gets verified, so this is also the entry
    /// point for bundles altered in transit.
    pub fn submit_json(&mut self, wire: &str) -> Result<(), SetError> {
        self.machine.ensure(Operation::Submit)?;
        let received = match self.services.acquirer.receive(wire) {
            Ok(bundle) => bundle,
            Err(e) => return Err(self.abort(e)),
        };

        self.transition(Operation::Submit)?;
        info!(
            session_id = %self.session_id,
            transaction_id = %received.order.transaction_id,
            "bundle submitted"
        );
        self.received = Some(received);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Verification
    // -----------------------------------------------------------------------

    /// Run the bank's checks on the submitted bundle.
    ///
    /// Always moves to `Verified`; a rejected bundle then moves on to
    /// `Error`. The report is returned either way.
    pub fn verify(&mut self) -> Result<VerificationReport, SetError> {
        self.machine.ensure(Operation::Verify)?;
        let received = self
            .received
            .as_ref()
            .ok_or(SetError::MissingArtifact("submitted bundle"))?;

        let report = self.services.acquirer.verify(received);
        self.transition(Operation::Verify)?;
        self.report = Some(report);

        if !report.accepted() {
            self.transition(Operation::Fail)?;
        }
        Ok(report)
    }

    // -----------------------------------------------------------------------
    // Payment phase
    // -----------------------------------------------------------------------

    /// Hand the verified order to the bank, which decrypts the card field.
    pub fn request_payment(&mut self) -> Result<(), SetError> {
        self.machine.ensure(Operation::RequestPayment)?;
        let received = self
            .received
            .as_ref()
            .ok_or(SetError::MissingArtifact("submitted bundle"))?;

        let masked = match self.services.acquirer.reveal_card(received) {
            Ok(masked) => masked,
            Err(e) => return Err(self.abort(e)),
        };

        self.transition(Operation::RequestPayment)?;
        self.masked_card = Some(masked);
        Ok(())
    }

    /// Phase one of settlement.
    ///
    /// A decline moves to `Authorized` and then `Error`, recording the FAILED
    /// capture without involving the processor. A replayed transaction id is
    /// refused and leaves the session in `PaymentRequested`.
    pub fn authorize(&mut self) -> Result<&AuthorizationResult, SetError> {
        self.machine.ensure(Operation::Authorize)?;
        let received = self
            .received
            .as_ref()
            .ok_or(SetError::MissingArtifact("submitted bundle"))?;

        let authorization = self.services.processor.authorize(&received.order)?;
        self.transition(Operation::Authorize)?;

        if !authorization.authorized {
            self.capture = Some(CaptureResult::declined(DECLINED_CAPTURE_REASON));
            self.transition(Operation::Fail)?;
        }
        Ok(self.authorization.insert(authorization))
    }

    /// Phase two of settlement.
    pub fn capture(&mut self) -> Result<&CaptureResult, SetError> {
        self.machine.ensure(Operation::Capture)?;
        let authorization = self
            .authorization
            .as_ref()
            .ok_or(SetError::MissingArtifact("authorization"))?;

        let captured = self.services.processor.capture(authorization);
        let capture = match captured {
            Ok(capture) => capture,
            Err(e) => return Err(self.abort(e)),
        };

        self.transition(Operation::Capture)?;
        Ok(self.capture.insert(capture))
    }

    /// Have the bank sign the closing confirmation.
    pub fn complete(&mut self) -> Result<&Confirmation, SetError> {
        self.machine.ensure(Operation::Complete)?;
        let (received, authorization, capture, certificate) = match (
            &self.received,
            &self.authorization,
            &self.capture,
            &self.certificate,
        ) {
            (Some(r), Some(a), Some(c), Some(cert)) => (r, a, c, cert),
            _ => return Err(SetError::MissingArtifact("settlement results")),
        };

        let confirmed = self.services.acquirer.confirm(
            &received.order,
            authorization,
            capture,
            &certificate.certificate_id,
        );
        let confirmation = match confirmed {
            Ok(confirmation) => confirmation,
            Err(e) => return Err(self.abort(e)),
        };

        self.transition(Operation::Complete)?;
        Ok(self.confirmation.insert(confirmation))
    }

    // -----------------------------------------------------------------------
    // Out-of-band operations
    // -----------------------------------------------------------------------

    /// Revoke the session's certificate at the CA.
    pub fn revoke(&mut self) -> Result<(), SetError> {
        self.machine.ensure(Operation::Revoke)?;
        let certificate_id = self
            .certificate
            .as_ref()
            .map(|c| c.certificate_id.clone())
            .ok_or(SetError::MissingArtifact("certificate"))?;

        self.services.ca.revoke(&certificate_id)?;
        self.transition(Operation::Revoke)?;
        Ok(())
    }

    /// Leave `Error` for `Init`, discarding every artifact except the keypair.
    pub fn retry(&mut self) -> Result<(), SetError> {
        self.machine.ensure(Operation::Retry)?;
        self.clear_artifacts();
        self.transition(Operation::Retry)?;
        Ok(())
    }

    /// Post-capture risk review. Legal in `Captured` and `Completed`; never
    /// transitions.
    pub fn investigate<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<&RiskAssessment, SetError> {
        let state = self.state();
        if !matches!(state, ProtocolState::Captured | ProtocolState::Completed) {
            return Err(SetError::IllegalTransition {
                state,
                operation: Operation::Investigate,
            });
        }
        let received = self
            .received
            .as_ref()
            .ok_or(SetError::MissingArtifact("submitted bundle"))?;

        let assessment = assess(&received.order, rng, self.services.clock.now());
        Ok(self.risk.insert(assessment))
    }

    /// Write every artifact held so far to `store` under this session's id.
    pub fn checkpoint(&self, store: &dyn ArtifactStore) {
        let id = &self.session_id;
        if let Some(keypair) = &self.keypair {
            store.put(id, Artifact::Keypair(keypair.clone()));
        }
        if let Some(certificate) = &self.certificate {
            store.put(id, Artifact::Certificate(certificate.clone()));
        }
        if let Some(bundle) = &self.bundle {
            store.put(id, Artifact::Bundle(bundle.clone()));
        }
        if let Some(authorization) = &self.authorization {
            store.put(id, Artifact::Authorization(authorization.clone()));
        }
        if let Some(capture) = &self.capture {
            store.put(id, Artifact::Capture(capture.clone()));
        }
        if let Some(confirmation) = &self.confirmation {
            store.put(id, Artifact::Confirmation(confirmation.clone()));
        }
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn transition(&mut self, operation: Operation) -> Result<ProtocolState, SetError> {
        self.machine.apply(operation, self.services.clock.now())
    }

    /// Move to `Error` if that is legal from here, then hand back `err`.
    fn abort(&mut self, err: SetError) -> SetError {
        let from = self.state();
        if self.transition(Operation::Fail).is_ok() {
            warn!(session_id = %self.session_id, %from, error = %err, "session failed");
        }
        err
    }

    fn clear_artifacts(&mut self) {
        self.request = None;
        self.certificate = None;
        self.bundle = None;
        self.received = None;
        self.report = None;
        self.masked_card = None;
        self.authorization = None;
        self.capture = None;
        self.confirmation = None;
        self.risk = None;
    }
}
