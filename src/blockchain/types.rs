//! Chain-specific types and error definitions.

use std::fmt;

use prost_types::Any;
use thiserror::Error;

/// Errors that can occur during chain interaction.
#[derive(Debug, Error)]
pub enum BlockchainError {
    /// gRPC connection or request failed.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// gRPC request timed out.
    #[error("RPC timeout after {0} seconds")]
    Timeout(u64),

    /// Endpoint string could not be turned into a channel.
    #[error("Invalid endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    /// Account lookup returned nothing usable.
    #[error("Account {0} not found on chain")]
    AccountNotFound(String),

    /// Key material could not be used for signing.
    #[error("Signing error: {0}")]
    Signing(String),

    /// Protobuf encoding or decoding failed.
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Gas price or fee string could not be parsed.
    #[error("Invalid coin '{0}'")]
    InvalidCoin(String),

    /// Nothing left to put in a transaction after filtering.
    #[error("No valid messages to include in the transaction")]
    NoValidMessages,

    /// The chain accepted the request but rejected the transaction.
    #[error("Transaction rejected (code {code}): {raw_log}")]
    Rejected { code: u32, raw_log: String },
}

/// Result type for chain operations.
pub type BlockchainResult<T> = Result<T, BlockchainError>;

/// Signature scheme of a signer, as tagged on the wire (`type` field).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SignatureScheme {
    /// Ethereum-style secp256k1 (keccak256 digest, recoverable signature).
    #[default]
    Secp256k1,
    Ed25519,
}

impl SignatureScheme {
    /// Map the numeric tag; unknown values fall back to secp256k1.
    pub fn from_tag(tag: i64) -> Self {
        match tag {
            1 => SignatureScheme::Ed25519,
            _ => SignatureScheme::Secp256k1,
        }
    }

    pub fn tag(self) -> i64 {
        match self {
            SignatureScheme::Secp256k1 => 0,
            SignatureScheme::Ed25519 => 1,
        }
    }
}

/// On-chain account state needed for signing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountInfo {
    pub account_number: u64,
    pub sequence: u64,
}

/// Gas usage reported by a simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GasInfo {
    pub gas_wanted: u64,
    pub gas_used: u64,
}

/// Result of a synchronous broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TxResponse {
    pub tx_hash: String,
    pub code: u32,
    pub raw_log: String,
}

/// One signer required by a pending message.
///
/// Messages relayed from the network arrive without key material; the
/// broadcaster attaches the relay's own key when the address is its wallet.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct SignatureKey {
    pub address: String,
    pub private_key: Vec<u8>,
    pub account_number: u64,
    pub account_sequence: u64,
    pub scheme: SignatureScheme,
}

impl SignatureKey {
    /// Whether this key carries everything needed to produce a signature.
    pub fn is_signable(&self) -> bool {
        !self.address.is_empty() && !self.private_key.is_empty()
    }
}

impl fmt::Debug for SignatureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignatureKey")
            .field("address", &self.address)
            .field("has_private_key", &!self.private_key.is_empty())
            .field("account_number", &self.account_number)
            .field("account_sequence", &self.account_sequence)
            .field("scheme", &self.scheme)
            .finish()
    }
}

/// A chain message awaiting inclusion in a transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct UnsignedMessage {
    /// Payload packed as `Any { type_url: msg_type, value }`.
    pub msg: Any,
    pub msg_type: String,
    pub signature_keys: Vec<SignatureKey>,
}

impl UnsignedMessage {
    pub fn new(msg_type: impl Into<String>, value: Vec<u8>, signature_keys: Vec<SignatureKey>) -> Self {
        let msg_type = msg_type.into();
        Self {
            msg: Any {
                type_url: msg_type.clone(),
                value,
            },
            msg_type,
            signature_keys,
        }
    }

    /// False if any signer lacks an address or key material.
    pub fn is_signable(&self) -> bool {
        !self.signature_keys.is_empty() && self.signature_keys.iter().all(SignatureKey::is_signable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheme_tags() {
        assert_eq!(SignatureScheme::from_tag(0), SignatureScheme::Secp256k1);
        assert_eq!(SignatureScheme::from_tag(1), SignatureScheme::Ed25519);
        assert_eq!(SignatureScheme::from_tag(7), SignatureScheme::Secp256k1);
        assert_eq!(SignatureScheme::Ed25519.tag(), 1);
    }

    #[test]
    fn test_error_display() {
        let err = BlockchainError::Timeout(10);
        assert_eq!(err.to_string(), "RPC timeout after 10 seconds");

        let err = BlockchainError::Rejected {
            code: 13,
            raw_log: "insufficient fee".into(),
        };
        assert!(err.to_string().contains("code 13"));
    }

    #[test]
    fn test_signable() {
        let key = SignatureKey {
            address: "st1abc".into(),
            private_key: vec![1; 32],
            ..Default::default()
        };
        let msg = UnsignedMessage::new("/stratos.sds.v1.MsgPrepay", vec![], vec![key.clone()]);
        assert!(msg.is_signable());
        assert_eq!(msg.msg.type_url, "/stratos.sds.v1.MsgPrepay");

        let anonymous = SignatureKey {
            address: String::new(),
            ..key
        };
        assert!(!UnsignedMessage::new("t", vec![], vec![anonymous]).is_signable());
        assert!(!UnsignedMessage::new("t", vec![], vec![]).is_signable());
    }

    #[test]
    fn test_debug_hides_private_key() {
        let key = SignatureKey {
            address: "st1abc".into(),
            private_key: b"secret-bytes".to_vec(),
            ..Default::default()
        };
        assert!(!format!("{:?}", key).contains("115"));
    }
}
