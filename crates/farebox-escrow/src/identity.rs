//! Ed25519 identities and ledger addresses.
//!
//! A **ledger address** is the hex-encoded Ed25519 public key (32 bytes →
//! 64 characters). Payer and contract identities are freshly generated per
//! viewing session and never persisted; the signing key is zeroized when
//! the keypair is dropped.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier};
use farebox_common::{Error, Result};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::Zeroize;

/// Ledger address: hex-encoded Ed25519 public key.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LedgerAddress(String);

impl LedgerAddress {
    /// Create an address from raw public key bytes.
    pub fn from_bytes(bytes: &[u8; 32]) -> Self {
        Self(hex::encode(bytes))
    }

    /// Parse an address from its hex string representation.
    pub fn parse(s: &str) -> Result<Self> {
        let bytes = hex::decode(s).map_err(|_| Error::config("address is not valid hex"))?;
        if bytes.len() != 32 {
            return Err(Error::config(format!(
                "invalid address length: expected 32 bytes, got {}",
                bytes.len()
            )));
        }
        Ok(Self(s.to_ascii_lowercase()))
    }

    /// Get the raw public key bytes.
    pub fn to_bytes(&self) -> Result<[u8; 32]> {
        let bytes = hex::decode(&self.0).map_err(|_| Error::config("address is not valid hex"))?;
        bytes
            .try_into()
            .map_err(|_| Error::config("invalid address length"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LedgerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for LedgerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LedgerAddress({})", self.0)
    }
}

/// Ed25519 keypair backing one ledger identity.
///
/// The signing key is zeroized on drop.
pub struct Keypair {
    signing_key: SigningKey,
}

impl Keypair {
    /// Generate a new random keypair using the OS CSPRNG.
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        Self { signing_key }
    }

    /// Create from raw signing key bytes.
    pub fn from_bytes(bytes: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(bytes);
        Self { signing_key }
    }

    /// The ledger address (hex-encoded public key).
    pub fn address(&self) -> LedgerAddress {
        LedgerAddress::from_bytes(self.signing_key.verifying_key().as_bytes())
    }

    /// The public key bytes.
    pub fn public_key_bytes(&self) -> [u8; 32] {
        *self.signing_key.verifying_key().as_bytes()
    }

    /// Sign a message with this identity.
    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing_key.sign(message).to_bytes()
    }

    /// Verify a signature against this identity's public key.
    pub fn verify(&self, message: &[u8], signature: &[u8; 64]) -> bool {
        let sig = match Signature::from_slice(signature) {
            Ok(s) => s,
            Err(_) => return false,
        };
        self.signing_key
            .verifying_key()
            .verify(message, &sig)
            .is_ok()
    }
}

impl Drop for Keypair {
    fn drop(&mut self) {
        let mut bytes = self.signing_key.to_bytes();
        bytes.zeroize();
    }
}

/// Verify a signature given only the signer's address.
pub fn verify_with_address(
    address: &LedgerAddress,
    message: &[u8],
    signature: &[u8; 64],
) -> bool {
    let Ok(key_bytes) = address.to_bytes() else {
        return false;
    };
    let Ok(verifying_key) = ed25519_dalek::VerifyingKey::from_bytes(&key_bytes) else {
        return false;
    };
    let Ok(sig) = Signature::from_slice(signature) else {
        return false;
    };
    verifying_key.verify(message, &sig).is_ok()
}
