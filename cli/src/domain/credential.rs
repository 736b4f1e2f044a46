//! Signing credential: a validated secp256k1 secret and its address.

use alloy::primitives::{Address, B256};
use alloy::signers::local::PrivateKeySigner;

use crate::domain::error::{AuthError, CredentialTier};

/// A validated private key together with the address it controls.
///
/// Never persisted by the pipeline; `Debug` output omits the secret.
#[derive(Clone)]
pub struct Credential {
    secret: B256,
    address: Address,
}

impl Credential {
    /// Parse a 32-byte hex private key (with or without `0x`).
    ///
    /// `tier` records where the value came from so format errors can name it.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidFormat`] if the value is not 64 hex digits
    /// or is not a valid secp256k1 scalar.
    pub fn parse(raw: &str, tier: CredentialTier) -> Result<Self, AuthError> {
        let trimmed = raw.trim();
        let hex = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        if hex.len() != 64 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(AuthError::InvalidFormat { tier });
        }
        let secret: B256 = hex.parse().map_err(|_| AuthError::InvalidFormat { tier })?;
        let signer =
            PrivateKeySigner::from_bytes(&secret).map_err(|_| AuthError::InvalidFormat { tier })?;
        Ok(Self {
            secret,
            address: signer.address(),
        })
    }

    /// The address derived from the secret.
    #[must_use]
    pub fn address(&self) -> Address {
        self.address
    }

    /// Build a local signer for this credential.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Signing`] if the key material is rejected.
    pub fn signer(&self) -> Result<PrivateKeySigner, AuthError> {
        PrivateKeySigner::from_bytes(&self.secret).map_err(|e| AuthError::Signing(e.to_string()))
    }

    /// Hex form of the secret, for handing to the credential store.
    #[must_use]
    pub fn secret_hex(&self) -> String {
        format!("{:x}", self.secret)
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}
