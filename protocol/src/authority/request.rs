//! Signed certificate requests (proof of possession).
//!
//! A client asks for a certificate by signing its own request with the
//! private key it wants certified. The CA checks that signature before
//! issuing, so nobody can get a certificate for a key they do not hold.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{CERTIFICATE_REQUEST_TYPE, PROTOCOL_VERSION};
use crate::crypto::{sign, verify, SetKeypair, SetPublicKey, SetSignature, SignatureError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CertificateRequest {
    pub client_id: String,
    pub public_key: SetPublicKey,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub requested_at: DateTime<Utc>,
    pub request_type: String,
    pub version: String,
    /// Signature by the key in `public_key` over every other field.
    pub signature: SetSignature,
}

#[derive(Serialize)]
struct RequestPayload<'a> {
    client_id: &'a str,
    public_key: &'a SetPublicKey,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    requested_at: DateTime<Utc>,
    request_type: &'a str,
    version: &'a str,
}

impl CertificateRequest {
    /// Build and sign a request for `keypair`'s public key.
    pub fn new(
        client_id: &str,
        keypair: &SetKeypair,
        requested_at: DateTime<Utc>,
    ) -> Result<Self, SignatureError> {
        let mut request = Self {
            client_id: client_id.to_string(),
            public_key: keypair.public_key().clone(),
            requested_at,
            request_type: CERTIFICATE_REQUEST_TYPE.to_string(),
            version: PROTOCOL_VERSION.to_string(),
            signature: SetSignature::from_bytes(Vec::new()),
        };
        request.signature = sign(&request.payload(), keypair)?;
        Ok(request)
    }

    fn payload(&self) -> RequestPayload<'_> {
        RequestPayload {
            client_id: &self.client_id,
            public_key: &self.public_key,
            requested_at: self.requested_at,
            request_type: &self.request_type,
            version: &self.version,
        }
    }

    /// Check the proof-of-possession signature.
    pub fn verify_signature(&self) -> bool {
        verify(&self.payload(), &self.signature, &self.public_key)
    }
}
