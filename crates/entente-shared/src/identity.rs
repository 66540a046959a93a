use bytes::Bytes;
use chrono::{DateTime, Utc};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};

use crate::constants::IDENTITY_ENVELOPE_VERSION;
use crate::error::IdentityError;
use crate::types::ContactId;

/// The local user's cryptographic identity based on Ed25519.
/// The public key serves as the contact ID.
#[derive(Clone)]
pub struct Identity {
    signing_key: SigningKey,
}

/// Serializable format for storing/exporting the local identity
#[derive(Serialize, Deserialize)]
pub struct IdentityExport {
    pub secret_key: [u8; 32],
    pub public_key: [u8; 32],
}

impl Identity {
    /// Generate a new random identity
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        Self { signing_key }
    }

    /// Restore identity from secret key bytes
    pub fn from_secret_bytes(secret: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(secret);
        Self { signing_key }
    }

    /// Restore identity from a serialized export
    pub fn from_export(export: &IdentityExport) -> Self {
        Self::from_secret_bytes(&export.secret_key)
    }

    /// Get the contact ID (public key)
    pub fn contact_id(&self) -> ContactId {
        ContactId(self.signing_key.verifying_key().to_bytes())
    }

    /// Get the raw public key bytes
    pub fn public_key_bytes(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    /// Get the raw secret key bytes
    pub fn secret_bytes(&self) -> &[u8; 32] {
        self.signing_key.as_bytes()
    }

    /// Sign a message
    pub fn sign(&self, message: &[u8]) -> Signature {
        self.signing_key.sign(message)
    }

    /// Export identity for serialization
    pub fn to_export(&self) -> IdentityExport {
        IdentityExport {
            secret_key: *self.signing_key.as_bytes(),
            public_key: self.signing_key.verifying_key().to_bytes(),
        }
    }

    /// Build the signed envelope advertising this identity's facts.
    pub fn to_remote(&self, username: String) -> RemoteIdentity {
        RemoteIdentity::create(self, username, None, None)
    }
}

// ---------------------------------------------------------------------------
// Remote identity envelope
// ---------------------------------------------------------------------------

/// Facts carried inside a signed identity envelope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IdentityPayload {
    pub version: u8,
    pub id: [u8; 32],
    pub username: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A peer identity as seen on the wire: a payload of derived facts plus an
/// Ed25519 self-signature by the key the payload names.
///
/// `marshal`/`unmarshal` produce the opaque blob persisted on the contact
/// record; `encode`/`decode` wrap it in a copyable base64url code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RemoteIdentity {
    pub payload: IdentityPayload,
    pub signature: Vec<u8>,
}

impl RemoteIdentity {
    /// Create a self-signed envelope for a local identity.
    pub fn create(
        identity: &Identity,
        username: String,
        email: Option<String>,
        phone: Option<String>,
    ) -> Self {
        let payload = IdentityPayload {
            version: IDENTITY_ENVELOPE_VERSION,
            id: identity.public_key_bytes(),
            username,
            email,
            phone,
            created_at: Utc::now(),
        };

        let payload_bytes = bincode::serialize(&payload).expect("payload serialization");
        let signature = identity.sign(&payload_bytes);

        Self {
            payload,
            signature: signature.to_bytes().to_vec(),
        }
    }

    /// The contact ID this envelope asserts.
    pub fn contact_id(&self) -> ContactId {
        ContactId(self.payload.id)
    }

    pub fn username(&self) -> &str {
        &self.payload.username
    }

    /// Serialize to the opaque blob persisted on contact records.
    pub fn marshal(&self) -> Bytes {
        Bytes::from(bincode::serialize(self).expect("envelope serialization"))
    }

    /// Parse an opaque blob back into an envelope, verifying the signature.
    pub fn unmarshal(bytes: &[u8]) -> Result<Self, IdentityError> {
        let envelope: Self =
            bincode::deserialize(bytes).map_err(|_| IdentityError::InvalidFormat)?;
        if envelope.payload.version != IDENTITY_ENVELOPE_VERSION {
            return Err(IdentityError::UnsupportedVersion(envelope.payload.version));
        }
        envelope.verify()?;
        Ok(envelope)
    }

    /// Encode as a base64url string (copyable identity code).
    pub fn encode(&self) -> String {
        base64_url_encode(&self.marshal())
    }

    /// Decode a base64url identity code.
    pub fn decode(code: &str) -> Result<Self, IdentityError> {
        let bytes = base64_url_decode(code)?;
        Self::unmarshal(&bytes)
    }

    /// Verify the envelope's self-signature.
    pub fn verify(&self) -> Result<(), IdentityError> {
        let payload_bytes =
            bincode::serialize(&self.payload).map_err(|_| IdentityError::InvalidFormat)?;

        let signature = Signature::from_slice(&self.signature)
            .map_err(|_| IdentityError::InvalidSignature)?;

        let verifying_key = VerifyingKey::from_bytes(&self.payload.id)
            .map_err(|_| IdentityError::InvalidKeyBytes)?;

        verifying_key
            .verify(&payload_bytes, &signature)
            .map_err(|_| IdentityError::InvalidSignature)
    }
}

fn base64_url_encode(data: &[u8]) -> String {
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;
    URL_SAFE_NO_PAD.encode(data)
}

fn base64_url_decode(s: &str) -> Result<Vec<u8>, IdentityError> {
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;
    URL_SAFE_NO_PAD
        .decode(s.trim())
        .map_err(|_| IdentityError::Base64Decode)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_generation() {
        let id = Identity::generate();
        assert_eq!(id.contact_id().0.len(), 32);
    }

    #[test]
    fn test_identity_export_round_trip() {
        let id = Identity::generate();
        let export = id.to_export();
        let restored = Identity::from_export(&export);
        assert_eq!(id.contact_id(), restored.contact_id());
    }

    #[test]
    fn test_envelope_round_trip() {
        let identity = Identity::generate();
        let remote = RemoteIdentity::create(
            &identity,
            "alice".to_string(),
            Some("alice@example.org".to_string()),
            None,
        );

        let code = remote.encode();
        let decoded = RemoteIdentity::decode(&code).expect("decode should work");

        assert_eq!(decoded.contact_id(), identity.contact_id());
        assert_eq!(decoded.username(), "alice");
        assert_eq!(decoded.payload.email.as_deref(), Some("alice@example.org"));
    }

    #[test]
    fn test_envelope_tampered_fails() {
        let identity = Identity::generate();
        let remote = identity.to_remote("alice".to_string());

        let mut bad = remote;
        bad.payload.username = "mallory".to_string();
        assert!(bad.verify().is_err());
        assert!(RemoteIdentity::unmarshal(&bincode::serialize(&bad).unwrap()).is_err());
    }

    #[test]
    fn test_unmarshal_garbage_fails() {
        assert!(matches!(
            RemoteIdentity::unmarshal(b"not an envelope"),
            Err(IdentityError::InvalidFormat)
        ));
    }
}
