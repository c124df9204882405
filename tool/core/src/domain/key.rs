// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Tool Signing Key
//!
//! The RSA private key the tool uses to authenticate itself to platforms
//! (client assertions for service token requests), together with the key
//! identifier (`kid`) platforms use to pick the matching public key from the
//! tool's keyset.
//!
//! The key is loaded from configuration and held in process memory only. It
//! is never written to the registration store.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use rsa::pkcs1::{DecodeRsaPrivateKey, EncodeRsaPrivateKey};
use rsa::pkcs8::DecodePrivateKey;
use rsa::traits::PublicKeyParts;
use rsa::RsaPrivateKey;
use serde::{Deserialize, Serialize};

/// Key identifier used when the caller does not name one.
pub const DEFAULT_KEY_ID: &str = "defaultKey";

/// Parsed RSA signing key.
#[derive(Clone)]
pub struct SigningKey {
    kid: String,
    private_key: RsaPrivateKey,
    encoding_key: EncodingKey,
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKey")
            .field("kid", &self.kid)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

impl SigningKey {
    /// Parse a PEM encoded RSA private key (PKCS#1 or PKCS#8).
    pub fn from_pem(kid: impl Into<String>, pem: &str) -> Result<Self, KeyError> {
        let kid = kid.into();
        if kid.trim().is_empty() {
            return Err(KeyError::Missing("key identifier".to_string()));
        }

        let pem = pem.trim();
        if pem.is_empty() {
            return Err(KeyError::Missing(format!("private key for '{}'", kid)));
        }

        let private_key = RsaPrivateKey::from_pkcs1_pem(pem)
            .or_else(|_| RsaPrivateKey::from_pkcs8_pem(pem))
            .map_err(|e| KeyError::Malformed(e.to_string()))?;

        let der = private_key
            .to_pkcs1_der()
            .map_err(|e| KeyError::Malformed(e.to_string()))?;
        let encoding_key = EncodingKey::from_rsa_der(der.as_bytes());

        Ok(Self {
            kid,
            private_key,
            encoding_key,
        })
    }

    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// Sign a claim set as an RS256 JWT carrying this key's `kid`.
    pub fn sign<T: Serialize>(&self, claims: &T) -> Result<String, KeyError> {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(self.kid.clone());

        jsonwebtoken::encode(&header, claims, &self.encoding_key)
            .map_err(|e| KeyError::Signing(e.to_string()))
    }

    /// Public half of the key as a JWK.
    pub fn public_jwk(&self) -> Jwk {
        let public_key = self.private_key.to_public_key();
        Jwk {
            kty: "RSA".to_string(),
            alg: "RS256".to_string(),
            key_use: "sig".to_string(),
            kid: self.kid.clone(),
            n: URL_SAFE_NO_PAD.encode(public_key.n().to_bytes_be()),
            e: URL_SAFE_NO_PAD.encode(public_key.e().to_bytes_be()),
        }
    }
}

/// RSA public key in JWK form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    pub kty: String,
    pub alg: String,
    #[serde(rename = "use")]
    pub key_use: String,
    pub kid: String,
    pub n: String,
    pub e: String,
}

/// JWKS document served at the tool's keyset URI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwkSet {
    pub keys: Vec<Jwk>,
}

impl JwkSet {
    pub fn from_keys<'a>(keys: impl IntoIterator<Item = &'a SigningKey>) -> Self {
        Self {
            keys: keys.into_iter().map(SigningKey::public_jwk).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyError {
    #[error("Missing {0}")]
    Missing(String),

    #[error("Malformed private key: {0}")]
    Malformed(String),

    #[error("Signing failed: {0}")]
    Signing(String),
}
