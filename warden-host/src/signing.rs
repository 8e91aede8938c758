//! Ed25519 key generation, signing and verification
//!
//! Keys and signatures cross the trust boundary as standard base64 strings:
//! 32-byte public keys, 32-byte secret keys and 64-byte signatures.

use base64::{engine::general_purpose, Engine};
use ed25519_dalek::{
    Signature, Signer, SigningKey, Verifier, VerifyingKey, PUBLIC_KEY_LENGTH, SECRET_KEY_LENGTH,
    SIGNATURE_LENGTH,
};
use rand_core::OsRng;
use std::fmt;

use crate::error::{TrustError, TrustResult};

/// Publisher secret key (zeroized on drop)
#[derive(Clone)]
pub struct SecretKey(SigningKey);

impl SecretKey {
    /// Encoded public half of this key
    pub fn public_key(&self) -> String {
        general_purpose::STANDARD.encode(self.0.verifying_key().as_bytes())
    }

    pub fn to_base64(&self) -> String {
        general_purpose::STANDARD.encode(self.0.to_bytes())
    }

    pub fn from_base64(encoded: &str) -> TrustResult<Self> {
        let bytes = general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|e| TrustError::InvalidSecretKey(e.to_string()))?;
        let bytes: [u8; SECRET_KEY_LENGTH] = bytes.as_slice().try_into().map_err(|_| {
            TrustError::InvalidSecretKey(format!(
                "expected {} bytes, got {}",
                SECRET_KEY_LENGTH,
                bytes.len()
            ))
        })?;
        Ok(Self(SigningKey::from_bytes(&bytes)))
    }

    /// Sign `data` and return the encoded signature
    pub fn sign(&self, data: &[u8]) -> String {
        let signature: Signature = self.0.sign(data);
        general_purpose::STANDARD.encode(signature.to_bytes())
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretKey")
            .field("public_key", &self.public_key())
            .finish_non_exhaustive()
    }
}

/// Freshly generated key pair
#[derive(Debug, Clone)]
pub struct KeyPair {
    /// Encoded public key for distribution
    pub public_key: String,
    pub secret_key: SecretKey,
}

/// Generate a new key pair from the OS random source
pub fn generate_key_pair() -> KeyPair {
    let secret_key = SecretKey(SigningKey::generate(&mut OsRng));
    KeyPair {
        public_key: secret_key.public_key(),
        secret_key,
    }
}

/// Decode a base64 public key
pub fn decode_public_key(encoded: &str) -> TrustResult<VerifyingKey> {
    let bytes = general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|e| TrustError::InvalidPublicKey(e.to_string()))?;
    let bytes: [u8; PUBLIC_KEY_LENGTH] = bytes.as_slice().try_into().map_err(|_| {
        TrustError::InvalidPublicKey(format!(
            "expected {} bytes, got {}",
            PUBLIC_KEY_LENGTH,
            bytes.len()
        ))
    })?;
    VerifyingKey::from_bytes(&bytes).map_err(|e| TrustError::InvalidPublicKey(e.to_string()))
}

/// Decode a base64 signature
pub fn decode_signature(encoded: &str) -> TrustResult<Signature> {
    let bytes = general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|e| TrustError::MalformedSignature(e.to_string()))?;
    let bytes: [u8; SIGNATURE_LENGTH] = bytes.as_slice().try_into().map_err(|_| {
        TrustError::MalformedSignature(format!(
            "expected {} bytes, got {}",
            SIGNATURE_LENGTH,
            bytes.len()
        ))
    })?;
    Ok(Signature::from_bytes(&bytes))
}

/// Check an encoded signature over `data` against an encoded public key
///
/// `subject` names what is being verified and only appears in the error.
pub fn verify_encoded(
    subject: &str,
    public_key: &str,
    signature: &str,
    data: &[u8],
) -> TrustResult<()> {
    let verifying_key = decode_public_key(public_key)?;
    let signature = decode_signature(signature)?;
    verifying_key
        .verify(data, &signature)
        .map_err(|_| TrustError::SignatureVerificationFailed(subject.to_string()))
}
