//! Signing Module — Transaction signing and verification
//!
//! Provides deterministic message serialization, SHA-256 hashing,
//! Ed25519 signing/verification, nonce tracking, and replay protection.
//! Implements spec §19 (Security Invariants).

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Signing schema version (frozen).
pub const SIGNING_SCHEMA_VERSION: &str = "1.0.0";

/// Maximum age of a signable message (replay protection window, 5 minutes).
const MAX_MESSAGE_AGE_NS: i64 = 5 * 60 * 1_000_000_000;

// ---------------------------------------------------------------------------
// Signable message
// ---------------------------------------------------------------------------

/// A message payload prepared for signing.
///
/// Uses `BTreeMap` for deterministic serialization (spec §12.3).
/// The canonical byte representation is the UTF-8 encoded JSON string
/// produced by `serde_json` over this struct's sorted fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignableMessage {
    /// Schema version (always `SIGNING_SCHEMA_VERSION`)
    pub version: String,
    /// Action name, e.g. "CreateOrder", "CancelOrder", "Withdraw"
    pub action: String,
    /// Deterministic payload (sorted keys)
    pub payload: BTreeMap<String, String>,
    /// Exchange timestamp (unix nanos) from the request
    pub timestamp: i64,
    /// Monotonic nonce for the signing account
    pub nonce: u64,
}

impl SignableMessage {
    /// Create a new signable message.
    pub fn new(
        action: impl Into<String>,
        payload: BTreeMap<String, String>,
        timestamp: i64,
        nonce: u64,
    ) -> Self {
        Self {
            version: SIGNING_SCHEMA_VERSION.to_owned(),
            action: action.into(),
            payload,
            timestamp,
            nonce,
        }
    }

    /// Serialize to canonical JSON bytes (deterministic, spec §12.8.1).
    pub fn canonical_bytes(&self) -> Vec<u8> {
        // serde_json serializes BTreeMap in sorted-key order
        serde_json::to_vec(self).expect("SignableMessage serialization must not fail")
    }

    /// SHA-256 hash of the canonical bytes.
    pub fn hash(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(&self.canonical_bytes());
        hasher.finalize().into()
    }

    /// SHA-256 hash as hex string.
    pub fn hash_hex(&self) -> String {
        hex::encode(self.hash())
    }
}

// ---------------------------------------------------------------------------
// Signing / Verification
// ---------------------------------------------------------------------------

/// Signed message: message + signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedMessage {
    pub message: SignableMessage,
    /// Ed25519 signature as hex string
    pub signature: String,
    /// Public key of the signer as hex string
    pub public_key: String,
}

/// Sign a message with an Ed25519 private key.
///
/// Returns a `SignedMessage` containing the original message,
/// the hex-encoded signature, and the hex-encoded public key.
pub fn sign_message(message: &SignableMessage, signing_key: &SigningKey) -> SignedMessage {
    let hash = message.hash();
    let signature = signing_key.sign(&hash);
    let verifying_key = signing_key.verifying_key();

    SignedMessage {
        message: message.clone(),
        signature: hex::encode(signature.to_bytes()),
        public_key: hex::encode(verifying_key.to_bytes()),
    }
}

/// Verify a signed message.
///
/// Returns `Ok(())` if the signature is valid, `Err` otherwise.
pub fn verify_signature(signed: &SignedMessage) -> Result<(), SigningError> {
    let pub_bytes = hex::decode(&signed.public_key)
        .map_err(|_| SigningError::InvalidPublicKey)?;
    let sig_bytes = hex::decode(&signed.signature)
        .map_err(|_| SigningError::InvalidSignature)?;

    let pub_key_bytes: [u8; 32] = pub_bytes
        .try_into()
        .map_err(|_| SigningError::InvalidPublicKey)?;
    let sig_key_bytes: [u8; 64] = sig_bytes
        .try_into()
        .map_err(|_| SigningError::InvalidSignature)?;

    let verifying_key = VerifyingKey::from_bytes(&pub_key_bytes)
        .map_err(|_| SigningError::InvalidPublicKey)?;
    let signature = Signature::from_bytes(&sig_key_bytes);

    let hash = signed.message.hash();
    verifying_key
        .verify(&hash, &signature)
        .map_err(|_| SigningError::VerificationFailed)
}

// ---------------------------------------------------------------------------
// Nonce tracking (replay protection)
// ---------------------------------------------------------------------------

/// Nonce validator for replay protection.
///
/// Tracks the last-seen nonce per account and rejects replayed messages.
#[derive(Debug, Clone, Default)]
pub struct NonceTracker {
    /// Last seen nonce per account (account_id hex → nonce)
    last_nonce: BTreeMap<String, u64>,
}

impl NonceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and advance the nonce for an account.
    ///
    /// Returns `Ok(())` if the nonce is strictly greater than the last seen.
    pub fn validate_and_advance(
        &mut self,
        account_id: &str,
        nonce: u64,
    ) -> Result<(), SigningError> {
        let last = self.last_nonce.get(account_id).copied().unwrap_or(0);
        if nonce <= last {
            return Err(SigningError::NonceReplay {
                provided: nonce,
                last_seen: last,
            });
        }
        self.last_nonce.insert(account_id.to_owned(), nonce);
        Ok(())
    }

    /// Check if a message timestamp is within the replay protection window.
    pub fn validate_timestamp(
        &self,
        message_timestamp: i64,
        current_timestamp: i64,
    ) -> Result<(), SigningError> {
        let age = current_timestamp - message_timestamp;
        if age < 0 {
            return Err(SigningError::FutureTimestamp);
        }
        if age > MAX_MESSAGE_AGE_NS {
            return Err(SigningError::ExpiredMessage);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Hardware wallet stub
// ---------------------------------------------------------------------------

/// Trait for hardware wallet integration (stub).
pub trait HardwareWallet {
    /// Sign a message hash with the hardware wallet.
    fn sign(&self, message_hash: &[u8; 32]) -> Result<Vec<u8>, SigningError>;

    /// Get the public key from the hardware wallet.
    fn public_key(&self) -> Result<Vec<u8>, SigningError>;
}

/// Stub implementation that always returns an error.
#[derive(Debug, Clone)]
pub struct StubHardwareWallet;

impl HardwareWallet for StubHardwareWallet {
    fn sign(&self, _message_hash: &[u8; 32]) -> Result<Vec<u8>, SigningError> {
        Err(SigningError::HardwareWalletUnsupported)
    }

    fn public_key(&self) -> Result<Vec<u8>, SigningError> {
        Err(SigningError::HardwareWalletUnsupported)
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Signing module errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SigningError {
    #[error("Invalid public key")]
    InvalidPublicKey,

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Signature verification failed")]
    VerificationFailed,

    #[error("Nonce replay: provided {provided}, last seen {last_seen}")]
    NonceReplay { provided: u64, last_seen: u64 },

    #[error("Message timestamp is in the future")]
    FutureTimestamp,

    #[error("Message has expired (outside replay window)")]
    ExpiredMessage,

    #[error("Hardware wallet not supported")]
    HardwareWalletUnsupported,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
