//! Commit signing capability
//!
//! Optional: when a signing key bundle is configured, commits are created
//! with an armored detached signature over the canonical commit payload.
//! A configured-but-unusable key is a hard failure; the bundler never falls
//! back to an unsigned commit once signing was requested.

use pgp::composed::{Deserializable, SignedPublicKey, SignedSecretKey, StandaloneSignature};
use pgp::crypto::hash::HashAlgorithm;
use pgp::packet::{SignatureConfig, SignatureType, Subpacket, SubpacketData};
use pgp::types::*;
use thiserror::Error;

use crate::config::SigningConfig;

/// Detached signatures carry a one-year validity window.
const SIGNATURE_LIFETIME_SECS: i64 = 86_400 * 365;

#[derive(Debug, Error)]
pub enum SignerError {
    #[error("failed to decode {key} key: {source}")]
    Decode {
        key: &'static str,
        source: pgp::errors::Error,
    },
    #[error("failed to decrypt private key: {0}")]
    Decrypt(pgp::errors::Error),
    #[error("signing requested but no private key configured")]
    MissingPrivateKey,
    #[error("failed to sign commit payload: {0}")]
    Sign(pgp::errors::Error),
}

/// Capability to sign a commit payload. Held as `Option<Arc<dyn Signer>>` by
/// the bundler so "not requested" and "requested but failing" stay distinct.
pub trait Signer: Send + Sync {
    fn sign(&self, payload: &str) -> Result<String, SignerError>;
}

/// OpenPGP-backed signer built from armored key material.
#[derive(Debug)]
pub struct PgpSigner {
    name: String,
    email: String,
    #[allow(dead_code)] // decoded to validate the configured bundle up front
    public_key: SignedPublicKey,
    secret_key: Option<SignedSecretKey>,
    passphrase: String,
}

impl PgpSigner {
    /// Decode the configured key bundle. Decryption of an encrypted private
    /// key is attempted here so a bad passphrase fails the run before any
    /// branch or commit is created.
    pub fn new(config: &SigningConfig) -> Result<Self, SignerError> {
        let (public_key, _) =
            SignedPublicKey::from_string(&config.public_key).map_err(|source| {
                SignerError::Decode {
                    key: "public",
                    source,
                }
            })?;

        let passphrase = config.passphrase.clone().unwrap_or_default();
        let secret_key = match &config.private_key {
            Some(armored) => {
                let (key, _) =
                    SignedSecretKey::from_string(armored).map_err(|source| SignerError::Decode {
                        key: "private",
                        source,
                    })?;
                key.unlock(|| passphrase.clone(), |_| Ok(()))
                    .map_err(SignerError::Decrypt)?;
                Some(key)
            }
            None => None,
        };

        Ok(Self {
            name: config.name.clone(),
            email: config.email.clone(),
            public_key,
            secret_key,
            passphrase,
        })
    }
}

impl Signer for PgpSigner {
    fn sign(&self, payload: &str) -> Result<String, SignerError> {
        let secret_key = self.secret_key.as_ref().ok_or(SignerError::MissingPrivateKey)?;

        tracing::debug!(name = %self.name, email = %self.email, "signing commit payload");

        let mut config = SignatureConfig::v4(
            SignatureType::Binary,
            secret_key.algorithm(),
            HashAlgorithm::SHA2_256,
        );
        config.hashed_subpackets = vec![
            Subpacket::regular(SubpacketData::SignatureCreationTime(chrono::Utc::now())),
            Subpacket::regular(SubpacketData::SignatureExpirationTime(
                chrono::Duration::seconds(SIGNATURE_LIFETIME_SECS),
            )),
            Subpacket::regular(SubpacketData::Issuer(secret_key.key_id())),
        ];

        let signature = config
            .sign(secret_key, || self.passphrase.clone(), payload.as_bytes())
            .map_err(SignerError::Sign)?;

        StandaloneSignature::new(signature)
            .to_armored_string(None.into())
            .map_err(SignerError::Sign)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signing_config(public_key: &str, private_key: Option<&str>) -> SigningConfig {
        SigningConfig {
            name: "Bundle Bot".to_string(),
            email: "bundlebot@example.com".to_string(),
            bits: 4096,
            public_key: public_key.to_string(),
            private_key: private_key.map(str::to_string),
            passphrase: None,
        }
    }

    #[test]
    fn test_new_rejects_malformed_public_key() {
        let config = signing_config("not an armored key", None);
        let err = PgpSigner::new(&config).unwrap_err();
        assert!(matches!(err, SignerError::Decode { key: "public", .. }));
    }

    #[test]
    fn test_new_rejects_malformed_private_key() {
        let config = signing_config(
            "-----BEGIN PGP PUBLIC KEY BLOCK-----\n\ngarbage\n-----END PGP PUBLIC KEY BLOCK-----\n",
            Some("also not a key"),
        );
        let err = PgpSigner::new(&config).unwrap_err();
        // Either key failing to decode must abort signer construction.
        assert!(matches!(err, SignerError::Decode { .. }));
    }
}
