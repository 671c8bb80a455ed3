//! Relay envelope decoding.
//!
//! Frames on the network websocket are protobuf `RelayMessage`s. For the
//! `broadcast` topic the payload is a JSON list of pending chain messages,
//! with byte fields base64-encoded.

use prost::Message;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::blockchain::msg_type::is_broadcastable;
use crate::blockchain::{SignatureKey, SignatureScheme, UnsignedMessage};

/// Topic carrying transactions to broadcast.
pub const TYPE_BROADCAST: &str = "broadcast";

/// Errors decoding a relay frame or one of its messages.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("invalid relay envelope: {0}")]
    Frame(#[from] prost::DecodeError),

    #[error("invalid broadcast payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("unsupported message type '{0}'")]
    UnknownType(String),

    #[error("message of type '{0}' has no signers")]
    NoSigners(String),
}

/// Outer frame on the network websocket.
#[derive(Clone, PartialEq, prost::Message)]
pub struct RelayMessage {
    #[prost(string, tag = "1")]
    pub r#type: String,
    #[prost(bytes = "vec", tag = "2")]
    pub data: Vec<u8>,
}

impl RelayMessage {
    pub fn decode_frame(bytes: &[u8]) -> Result<Self, EnvelopeError> {
        Ok(Self::decode(bytes)?)
    }

    pub fn is_broadcast(&self) -> bool {
        self.r#type == TYPE_BROADCAST
    }
}

/// `broadcast` payload.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct UnsignedMsgs {
    #[serde(default)]
    pub msgs: Vec<UnsignedMsgBytes>,
}

/// One pending message as it travels in JSON.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct UnsignedMsgBytes {
    #[serde(default, with = "base64_bytes")]
    pub msg: Vec<u8>,
    #[serde(default)]
    pub signature_keys: Vec<WireSignatureKey>,
    #[serde(default)]
    pub r#type: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct WireSignatureKey {
    #[serde(default)]
    pub account_num: u64,
    #[serde(default)]
    pub account_sequence: u64,
    #[serde(default)]
    pub address: String,
    #[serde(default, with = "base64_bytes")]
    pub private_key: Vec<u8>,
    #[serde(default)]
    pub r#type: i64,
}

impl From<WireSignatureKey> for SignatureKey {
    fn from(key: WireSignatureKey) -> Self {
        SignatureKey {
            address: key.address,
            private_key: key.private_key,
            account_number: key.account_num,
            account_sequence: key.account_sequence,
            scheme: SignatureScheme::from_tag(key.r#type),
        }
    }
}

impl UnsignedMsgBytes {
    /// Convert into an `UnsignedMessage`, rejecting unknown types.
    ///
    /// `msg` is either the encoded message itself or an encoded `Any`
    /// already carrying the same type URL; both are accepted.
    pub fn into_unsigned(self) -> Result<UnsignedMessage, EnvelopeError> {
        if !is_broadcastable(&self.r#type) {
            return Err(EnvelopeError::UnknownType(self.r#type));
        }
        if self.signature_keys.is_empty() {
            return Err(EnvelopeError::NoSigners(self.r#type));
        }

        let value = match prost_types::Any::decode(self.msg.as_slice()) {
            Ok(any) if any.type_url == self.r#type => any.value,
            _ => self.msg,
        };
        let keys = self.signature_keys.into_iter().map(SignatureKey::from).collect();
        Ok(UnsignedMessage::new(self.r#type, value, keys))
    }
}

/// Decode a `broadcast` payload. Bad entries are returned as errors next to
/// the good ones so the caller can log and skip them individually.
pub fn decode_broadcast(data: &[u8]) -> Result<Vec<Result<UnsignedMessage, EnvelopeError>>, EnvelopeError> {
    let payload: UnsignedMsgs = serde_json::from_slice(data)?;
    Ok(payload.msgs.into_iter().map(UnsignedMsgBytes::into_unsigned).collect())
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded: Option<String> = Option::deserialize(deserializer)?;
        match encoded {
            Some(s) => STANDARD.decode(s).map_err(serde::de::Error::custom),
            None => Ok(Vec::new()),
        }
    }
}
