//! Relay wallet loading.
//!
//! # Security
//! - The key is read once, at start-up, from an encrypted keystore file
//! - Keys are never logged or serialized
//! - `Debug` prints the address only

use std::fmt;
use std::path::{Path, PathBuf};

use alloy::signers::local::PrivateKeySigner;
use bech32::{Bech32, Hrp};
use thiserror::Error;

use crate::config::KeysConfig;

/// Failure to obtain the relay's signing key.
#[derive(Debug, Error)]
pub enum KeyLoadError {
    #[error("wallet file {0} not found")]
    NotFound(PathBuf),

    /// Corrupt keystore or wrong password; the two are indistinguishable.
    #[error("failed to decrypt wallet {path}: {reason}")]
    Decrypt { path: PathBuf, reason: String },

    #[error("invalid private key: {0}")]
    InvalidKey(String),

    #[error("invalid address prefix '{prefix}': {reason}")]
    Address { prefix: String, reason: String },
}

/// The relay's own signing identity.
#[derive(Clone)]
pub struct Wallet {
    signer: PrivateKeySigner,
    /// Bech32 account address, e.g. `st1...`.
    address: String,
}

impl Wallet {
    /// Decrypt the keystore at `home/keys.wallet_path`.
    pub fn load(home: &Path, keys: &KeysConfig, prefix: &str) -> Result<Self, KeyLoadError> {
        let path = home.join(&keys.wallet_path);
        if !path.is_file() {
            return Err(KeyLoadError::NotFound(path));
        }

        let signer = PrivateKeySigner::decrypt_keystore(&path, &keys.wallet_password).map_err(
            |e| KeyLoadError::Decrypt {
                path: path.clone(),
                reason: e.to_string(),
            },
        )?;

        let wallet = Self::from_signer(signer, prefix)?;
        tracing::info!(address = %wallet.address, path = %path.display(), "Wallet loaded");
        Ok(wallet)
    }

    /// Build a wallet from a hex-encoded private key (with or without `0x`).
    pub fn from_private_key(private_key_hex: &str, prefix: &str) -> Result<Self, KeyLoadError> {
        let key_hex = private_key_hex.strip_prefix("0x").unwrap_or(private_key_hex);
        let signer: PrivateKeySigner = key_hex
            .parse()
            .map_err(|e| KeyLoadError::InvalidKey(format!("{}", e)))?;
        Self::from_signer(signer, prefix)
    }

    fn from_signer(signer: PrivateKeySigner, prefix: &str) -> Result<Self, KeyLoadError> {
        let address = bech32_address(prefix, signer.address().as_slice())?;
        Ok(Self { signer, address })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Raw 32-byte secp256k1 secret, as attached to signature keys.
    pub fn private_key_bytes(&self) -> Vec<u8> {
        self.signer.to_bytes().to_vec()
    }
}

impl fmt::Debug for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wallet").field("address", &self.address).finish()
    }
}

/// Bech32-encode raw address bytes under `prefix`.
pub fn bech32_address(prefix: &str, bytes: &[u8]) -> Result<String, KeyLoadError> {
    let address_error = |reason: String| KeyLoadError::Address {
        prefix: prefix.to_string(),
        reason,
    };
    let hrp = Hrp::parse(prefix).map_err(|e| address_error(e.to_string()))?;
    bech32::encode::<Bech32>(hrp, bytes).map_err(|e| address_error(e.to_string()))
}
