//! Protobuf messages exchanged with the chain's gRPC services.
//!
//! Only the fields the relay reads or writes are declared; prost skips the
//! rest when decoding.

use prost_types::Any;

pub const BASE_ACCOUNT_TYPE_URL: &str = "/cosmos.auth.v1beta1.BaseAccount";
pub const ETH_ACCOUNT_TYPE_URL: &str = "/stratos.types.v1.EthAccount";

/// `SIGN_MODE_DIRECT`.
pub const SIGN_MODE_DIRECT: i32 = 1;
/// `BROADCAST_MODE_SYNC`.
pub const BROADCAST_MODE_SYNC: i32 = 2;

// cosmos.tx.v1beta1

#[derive(Clone, PartialEq, prost::Message)]
pub struct TxBody {
    #[prost(message, repeated, tag = "1")]
    pub messages: Vec<Any>,
    #[prost(string, tag = "2")]
    pub memo: String,
    #[prost(uint64, tag = "3")]
    pub timeout_height: u64,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct AuthInfo {
    #[prost(message, repeated, tag = "1")]
    pub signer_infos: Vec<SignerInfo>,
    #[prost(message, optional, tag = "2")]
    pub fee: Option<Fee>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct SignerInfo {
    #[prost(message, optional, tag = "1")]
    pub public_key: Option<Any>,
    #[prost(message, optional, tag = "2")]
    pub mode_info: Option<ModeInfo>,
    #[prost(uint64, tag = "3")]
    pub sequence: u64,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ModeInfo {
    #[prost(oneof = "mode_info::Sum", tags = "1")]
    pub sum: Option<mode_info::Sum>,
}

pub mod mode_info {
    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum Sum {
        #[prost(message, tag = "1")]
        Single(Single),
    }

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct Single {
        #[prost(int32, tag = "1")]
        pub mode: i32,
    }
}

impl ModeInfo {
    pub fn direct() -> Self {
        Self {
            sum: Some(mode_info::Sum::Single(mode_info::Single {
                mode: SIGN_MODE_DIRECT,
            })),
        }
    }
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Fee {
    #[prost(message, repeated, tag = "1")]
    pub amount: Vec<Coin>,
    #[prost(uint64, tag = "2")]
    pub gas_limit: u64,
    #[prost(string, tag = "3")]
    pub payer: String,
    #[prost(string, tag = "4")]
    pub granter: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct TxRaw {
    #[prost(bytes = "vec", tag = "1")]
    pub body_bytes: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub auth_info_bytes: Vec<u8>,
    #[prost(bytes = "vec", repeated, tag = "3")]
    pub signatures: Vec<Vec<u8>>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct SignDoc {
    #[prost(bytes = "vec", tag = "1")]
    pub body_bytes: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub auth_info_bytes: Vec<u8>,
    #[prost(string, tag = "3")]
    pub chain_id: String,
    #[prost(uint64, tag = "4")]
    pub account_number: u64,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct SimulateRequest {
    #[prost(bytes = "vec", tag = "2")]
    pub tx_bytes: Vec<u8>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct SimulateResponse {
    #[prost(message, optional, tag = "1")]
    pub gas_info: Option<GasInfo>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct GasInfo {
    #[prost(uint64, tag = "1")]
    pub gas_wanted: u64,
    #[prost(uint64, tag = "2")]
    pub gas_used: u64,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct BroadcastTxRequest {
    #[prost(bytes = "vec", tag = "1")]
    pub tx_bytes: Vec<u8>,
    #[prost(int32, tag = "2")]
    pub mode: i32,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct BroadcastTxResponse {
    #[prost(message, optional, tag = "1")]
    pub tx_response: Option<TxResponse>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct TxResponse {
    #[prost(int64, tag = "1")]
    pub height: i64,
    #[prost(string, tag = "2")]
    pub txhash: String,
    #[prost(string, tag = "3")]
    pub codespace: String,
    #[prost(uint32, tag = "4")]
    pub code: u32,
    #[prost(string, tag = "5")]
    pub data: String,
    #[prost(string, tag = "6")]
    pub raw_log: String,
}

// cosmos.base.v1beta1

#[derive(Clone, PartialEq, prost::Message)]
pub struct Coin {
    #[prost(string, tag = "1")]
    pub denom: String,
    #[prost(string, tag = "2")]
    pub amount: String,
}

impl From<&crate::blockchain::coin::Coin> for Coin {
    fn from(coin: &crate::blockchain::coin::Coin) -> Self {
        Self {
            denom: coin.denom.clone(),
            amount: coin.amount.to_string(),
        }
    }
}

// cosmos.auth.v1beta1

#[derive(Clone, PartialEq, prost::Message)]
pub struct QueryAccountRequest {
    #[prost(string, tag = "1")]
    pub address: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct QueryAccountResponse {
    #[prost(message, optional, tag = "1")]
    pub account: Option<Any>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct BaseAccount {
    #[prost(string, tag = "1")]
    pub address: String,
    #[prost(message, optional, tag = "2")]
    pub pub_key: Option<Any>,
    #[prost(uint64, tag = "3")]
    pub account_number: u64,
    #[prost(uint64, tag = "4")]
    pub sequence: u64,
}

/// Ethermint-style account wrapping a `BaseAccount`.
#[derive(Clone, PartialEq, prost::Message)]
pub struct EthAccount {
    #[prost(message, optional, tag = "1")]
    pub base_account: Option<BaseAccount>,
    #[prost(string, tag = "2")]
    pub code_hash: String,
}

// crypto

/// Shared shape of the secp256k1 and ed25519 public key messages.
#[derive(Clone, PartialEq, prost::Message)]
pub struct PubKey {
    #[prost(bytes = "vec", tag = "1")]
    pub key: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message;

    #[test]
    fn test_eth_account_unwraps_base() {
        let account = EthAccount {
            base_account: Some(BaseAccount {
                address: "st1abc".into(),
                pub_key: None,
                account_number: 9,
                sequence: 4,
            }),
            code_hash: String::new(),
        };
        let decoded = EthAccount::decode(account.encode_to_vec().as_slice()).unwrap();
        let base = decoded.base_account.unwrap();
        assert_eq!((base.account_number, base.sequence), (9, 4));
    }

    #[test]
    fn test_mode_info_direct() {
        let bytes = ModeInfo::direct().encode_to_vec();
        // field 1 (Single) containing field 1 varint 1
        assert_eq!(bytes, vec![0x0a, 0x02, 0x08, 0x01]);
    }
}
