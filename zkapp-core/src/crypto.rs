//! Cryptographic operations for authorization
//!
//! This module provides:
//! - Ed25519 key pairs that sign 32-byte commitments
//! - SHA-256 hashing of raw bytes (verification keys, URIs)
//! - The [`Authorizer`] seam used after a forest has been finalized

use crate::types::{Field, PublicKey, Signature};
use crate::{Error, Result};
use async_trait::async_trait;
use ed25519_dalek::{Signature as DalekSignature, Signer, SigningKey, Verifier, VerifyingKey};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// Ed25519 key pair for signing commitments
#[derive(Debug)]
pub struct KeyPair {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
}

impl KeyPair {
    /// Generate a new random key pair
    pub fn generate() -> Self {
        Self::from_seed(&rand::random::<[u8; 32]>())
    }

    /// Create from seed (32 bytes) - deterministic generation
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(seed);
        let verifying_key = signing_key.verifying_key();

        Self {
            signing_key,
            verifying_key,
        }
    }

    /// Public key as an account key
    pub fn public_key(&self) -> PublicKey {
        PublicKey::from_bytes(self.verifying_key.to_bytes())
    }

    /// Sign a commitment
    pub fn sign(&self, commitment: &Field) -> Signature {
        let signature = self.signing_key.sign(commitment.as_bytes());
        Signature::from_bytes(signature.to_bytes())
    }

    /// Verify a signature over a commitment
    pub fn verify(&self, commitment: &Field, signature: &Signature) -> Result<()> {
        let dalek_sig = DalekSignature::from_bytes(signature.as_bytes());
        self.verifying_key
            .verify(commitment.as_bytes(), &dalek_sig)
            .map_err(|e| Error::SignatureError(format!("Verification failed: {}", e)))
    }
}

/// Verify a signature over a commitment with a public key
pub fn verify_signature(commitment: &Field, signature: &Signature, public_key: &PublicKey) -> bool {
    let dalek_sig = DalekSignature::from_bytes(signature.as_bytes());

    let verifying_key = match VerifyingKey::from_bytes(public_key.as_bytes()) {
        Ok(key) => key,
        Err(_) => return false,
    };

    verifying_key.verify(commitment.as_bytes(), &dalek_sig).is_ok()
}

/// Hash arbitrary bytes using SHA-256
pub fn hash_bytes(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Produces signatures for finalized commitments
#[async_trait]
pub trait Authorizer: Send + Sync {
    /// Sign `commitment` on behalf of `signer`
    async fn sign(&self, commitment: Field, signer: &PublicKey) -> Result<Signature>;
}

/// In-process authorizer holding key pairs by public key
#[derive(Debug, Default)]
pub struct KeyringAuthorizer {
    keys: HashMap<PublicKey, KeyPair>,
}

impl KeyringAuthorizer {
    /// Empty keyring
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a key pair, returning its public key
    pub fn insert(&mut self, key_pair: KeyPair) -> PublicKey {
        let public_key = key_pair.public_key();
        self.keys.insert(public_key, key_pair);
        public_key
    }

    /// Add a key pair (builder form)
    pub fn with_key(mut self, key_pair: KeyPair) -> Self {
        self.insert(key_pair);
        self
    }

    /// Whether a key is held for `public_key`
    pub fn contains(&self, public_key: &PublicKey) -> bool {
        self.keys.contains_key(public_key)
    }
}

#[async_trait]
impl Authorizer for KeyringAuthorizer {
    async fn sign(&self, commitment: Field, signer: &PublicKey) -> Result<Signature> {
        let key_pair = self
            .keys
            .get(signer)
            .ok_or_else(|| Error::Authorization(format!("no signing key for {}", signer)))?;
        tracing::debug!(%signer, "signing commitment");
        Ok(key_pair.sign(&commitment))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keypair_generation() {
        let kp1 = KeyPair::generate();
        let kp2 = KeyPair::generate();
        assert_ne!(kp1.public_key(), kp2.public_key());
    }

    #[test]
    fn test_deterministic_keypair() {
        let seed = [42u8; 32];
        assert_eq!(
            KeyPair::from_seed(&seed).public_key(),
            KeyPair::from_seed(&seed).public_key()
        );
    }

    #[test]
    fn test_sign_and_verify() {
        let kp = KeyPair::from_seed(&[1u8; 32]);
        let commitment = Field::from_u64(1234);
        let signature = kp.sign(&commitment);

        assert!(kp.verify(&commitment, &signature).is_ok());
        assert!(verify_signature(&commitment, &signature, &kp.public_key()));
        assert!(!verify_signature(&Field::from_u64(1235), &signature, &kp.public_key()));
    }

    #[test]
    fn test_hash_bytes_deterministic() {
        assert_eq!(hash_bytes(b"zkapp"), hash_bytes(b"zkapp"));
        assert_ne!(hash_bytes(b"zkapp"), hash_bytes(b"zkApp"));
    }

    #[tokio::test]
    async fn test_keyring_authorizer() {
        let kp = KeyPair::from_seed(&[3u8; 32]);
        let authorizer = KeyringAuthorizer::new().with_key(KeyPair::from_seed(&[3u8; 32]));
        let commitment = Field::from_u64(9);

        let signature = authorizer.sign(commitment, &kp.public_key()).await.unwrap();
        assert!(kp.verify(&commitment, &signature).is_ok());

        let stranger = PublicKey::from_bytes([8u8; 32]);
        assert!(authorizer.sign(commitment, &stranger).await.is_err());
    }
}
