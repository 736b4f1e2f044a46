//! reqwest implementation of the `KmsEncryptor` port.
//!
//! The KMS encrypts to a key bound to the app address, so only that app's
//! TEE can decrypt the payload.

use alloy::primitives::{Address, Bytes};
use anyhow::{Context, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use crate::application::ports::KmsEncryptor;
use crate::domain::error::NetworkError;
use crate::infra::status_api::API_TIMEOUT;

#[derive(Debug, Serialize)]
struct EncryptRequest {
    app: String,
    plaintext: String,
}

#[derive(Debug, Deserialize)]
struct EncryptResponse {
    ciphertext: String,
}

pub struct HttpKmsEncryptor {
    client: reqwest::Client,
    url: String,
}

impl HttpKmsEncryptor {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(API_TIMEOUT)
            .user_agent(concat!("teectl/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("cannot build HTTP client")?;
        Ok(Self {
            client,
            url: url.to_string(),
        })
    }

    fn failed(&self, reason: impl ToString) -> NetworkError {
        NetworkError::KmsUnreachable {
            url: self.url.clone(),
            reason: reason.to_string(),
        }
    }
}

fn decode_ciphertext(encoded: &str) -> Result<Bytes, base64::DecodeError> {
    STANDARD.decode(encoded.trim()).map(Bytes::from)
}

impl KmsEncryptor for HttpKmsEncryptor {
    async fn encrypt(&self, app: Address, plaintext: &[u8]) -> Result<Bytes> {
        let body = EncryptRequest {
            app: app.to_string(),
            plaintext: STANDARD.encode(plaintext),
        };
        tracing::debug!(url = %self.url, %app, bytes = plaintext.len(), "encrypting env");
        let resp: EncryptResponse = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| self.failed(e))?
            .json()
            .await
            .map_err(|e| self.failed(e))?;
        let ciphertext = decode_ciphertext(&resp.ciphertext)
            .map_err(|e| self.failed(format!("invalid ciphertext encoding: {e}")))?;
        if ciphertext.is_empty() {
            return Err(self.failed("empty ciphertext").into());
        }
        Ok(ciphertext)
    }
}
