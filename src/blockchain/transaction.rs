//! Transaction assembly, signing, simulation and broadcast.
//!
//! # Responsibilities
//! - Attach the relay's key to signers that ask for it
//! - Drop messages that cannot be signed or whose accounts are unknown
//! - Build SIGN_MODE_DIRECT transactions with one signature per signer
//! - Price the transaction from a simulation and broadcast it

use std::collections::{HashMap, HashSet};

use alloy::primitives::keccak256;
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;
use ed25519_dalek::Signer as _;
use futures_util::future::join_all;
use prost::Message;
use prost_types::Any;

use crate::blockchain::client::ChainApi;
use crate::blockchain::coin::{adjusted_gas_limit, Coin};
use crate::blockchain::proto;
use crate::blockchain::types::{
    AccountInfo, BlockchainError, BlockchainResult, SignatureKey, SignatureScheme, TxResponse,
    UnsignedMessage,
};
use crate::config::BlockchainInfoConfig;

pub const SECP256K1_PUBKEY_TYPE_URL: &str = "/stratos.crypto.v1.ethsecp256k1.PubKey";
pub const ED25519_PUBKEY_TYPE_URL: &str = "/cosmos.crypto.ed25519.PubKey";

/// Pricing and chain parameters, snapshotted once per flush.
#[derive(Debug, Clone, PartialEq)]
pub struct TxParams {
    pub chain_id: String,
    pub gas_price: Coin,
    pub gas_adjustment: f64,
}

impl TxParams {
    pub fn from_config(config: &BlockchainInfoConfig) -> BlockchainResult<Self> {
        Ok(Self {
            chain_id: config.chain_id.clone(),
            gas_price: Coin::parse_normalized(&config.transactions.gas_price)?,
            gas_adjustment: config.transactions.gas_adjustment,
        })
    }
}

/// Fill `private_key` into every key of `msg` that has none and belongs to
/// `address`. Returns how many keys were filled.
pub fn attach_wallet_key(msg: &mut UnsignedMessage, address: &str, private_key: &[u8]) -> usize {
    let mut filled = 0;
    for key in &mut msg.signature_keys {
        if key.private_key.is_empty() && key.address == address {
            key.private_key = private_key.to_vec();
            filled += 1;
        }
    }
    filled
}

/// Split messages into `(signable, unsignable)`, preserving order.
pub fn partition_signable(
    msgs: Vec<UnsignedMessage>,
) -> (Vec<UnsignedMessage>, Vec<UnsignedMessage>) {
    msgs.into_iter().partition(UnsignedMessage::is_signable)
}

/// A message dropped because one of its signers could not be resolved.
#[derive(Debug)]
pub struct Unresolved {
    pub msg: UnsignedMessage,
    pub address: String,
    pub reason: String,
}

/// Look up account number and sequence for every distinct signer address,
/// one concurrent query per address, and write them into the keys.
///
/// Messages with any unresolved signer are returned separately.
pub async fn resolve_accounts(
    api: &dyn ChainApi,
    msgs: Vec<UnsignedMessage>,
) -> (Vec<UnsignedMessage>, Vec<Unresolved>) {
    let mut addresses = Vec::new();
    let mut seen = HashSet::new();
    for key in msgs.iter().flat_map(|m| &m.signature_keys) {
        if seen.insert(key.address.as_str()) {
            addresses.push(key.address.clone());
        }
    }

    let lookups = join_all(addresses.iter().map(|address| api.query_account(address))).await;
    let accounts: HashMap<String, BlockchainResult<AccountInfo>> =
        addresses.into_iter().zip(lookups).collect();

    let mut resolved = Vec::with_capacity(msgs.len());
    let mut unresolved = Vec::new();
    for mut msg in msgs {
        let failure = msg.signature_keys.iter().find_map(|key| match accounts.get(&key.address) {
            Some(Ok(_)) => None,
            Some(Err(e)) => Some((key.address.clone(), e.to_string())),
            None => Some((key.address.clone(), "account not queried".to_string())),
        });
        if let Some((address, reason)) = failure {
            unresolved.push(Unresolved { msg, address, reason });
            continue;
        }

        for key in &mut msg.signature_keys {
            if let Some(Ok(info)) = accounts.get(&key.address) {
                key.account_number = info.account_number;
                key.account_sequence = info.sequence;
            }
        }
        resolved.push(msg);
    }
    (resolved, unresolved)
}

/// Distinct signers in first-seen order across all messages.
pub fn collect_signers(msgs: &[UnsignedMessage]) -> Vec<SignatureKey> {
    let mut seen = HashSet::new();
    msgs.iter()
        .flat_map(|m| m.signature_keys.iter())
        .filter(|key| seen.insert(key.address.clone()))
        .cloned()
        .collect()
}

enum KeyPair {
    Secp256k1(PrivateKeySigner),
    Ed25519(ed25519_dalek::SigningKey),
}

impl KeyPair {
    fn from_signature_key(key: &SignatureKey) -> BlockchainResult<Self> {
        let bad_key = |reason: String| {
            BlockchainError::Signing(format!("signer {}: {}", key.address, reason))
        };
        match key.scheme {
            SignatureScheme::Secp256k1 => PrivateKeySigner::from_slice(&key.private_key)
                .map(KeyPair::Secp256k1)
                .map_err(|e| bad_key(e.to_string())),
            SignatureScheme::Ed25519 => {
                let signing_key = match key.private_key.len() {
                    32 => {
                        let mut seed = [0u8; 32];
                        seed.copy_from_slice(&key.private_key);
                        ed25519_dalek::SigningKey::from_bytes(&seed)
                    }
                    64 => {
                        let mut pair = [0u8; 64];
                        pair.copy_from_slice(&key.private_key);
                        ed25519_dalek::SigningKey::from_keypair_bytes(&pair)
                            .map_err(|e| bad_key(e.to_string()))?
                    }
                    n => return Err(bad_key(format!("ed25519 key must be 32 or 64 bytes, got {}", n))),
                };
                Ok(KeyPair::Ed25519(signing_key))
            }
        }
    }

    fn public_key(&self) -> Any {
        let (type_url, key) = match self {
            KeyPair::Secp256k1(signer) => (
                SECP256K1_PUBKEY_TYPE_URL,
                signer
                    .credential()
                    .verifying_key()
                    .to_encoded_point(true)
                    .as_bytes()
                    .to_vec(),
            ),
            KeyPair::Ed25519(signing_key) => (
                ED25519_PUBKEY_TYPE_URL,
                signing_key.verifying_key().to_bytes().to_vec(),
            ),
        };
        Any {
            type_url: type_url.to_string(),
            value: proto::PubKey { key }.encode_to_vec(),
        }
    }

    /// secp256k1 signs keccak256(bytes) as `R || S || V` with V in {0, 1};
    /// ed25519 signs the bytes directly.
    fn sign(&self, bytes: &[u8]) -> BlockchainResult<Vec<u8>> {
        match self {
            KeyPair::Secp256k1(signer) => {
                let signature = signer
                    .sign_hash_sync(&keccak256(bytes))
                    .map_err(|e| BlockchainError::Signing(e.to_string()))?;
                let mut out = Vec::with_capacity(65);
                out.extend_from_slice(&signature.r().to_be_bytes::<32>());
                out.extend_from_slice(&signature.s().to_be_bytes::<32>());
                out.push(signature.v() as u8);
                Ok(out)
            }
            KeyPair::Ed25519(signing_key) => Ok(signing_key.sign(bytes).to_bytes().to_vec()),
        }
    }
}

/// Assemble and sign a transaction over `msgs` with the given fee.
///
/// `signers` must come from `collect_signers`; their order fixes both the
/// signer infos and the signature order.
pub fn build_tx(
    msgs: &[UnsignedMessage],
    signers: &[SignatureKey],
    chain_id: &str,
    fee: &Coin,
    gas_limit: u64,
) -> BlockchainResult<Vec<u8>> {
    if msgs.is_empty() || signers.is_empty() {
        return Err(BlockchainError::NoValidMessages);
    }

    let body = proto::TxBody {
        messages: msgs.iter().map(|m| m.msg.clone()).collect(),
        memo: String::new(),
        timeout_height: 0,
    };

    let key_pairs = signers
        .iter()
        .map(KeyPair::from_signature_key)
        .collect::<BlockchainResult<Vec<_>>>()?;

    let auth_info = proto::AuthInfo {
        signer_infos: signers
            .iter()
            .zip(&key_pairs)
            .map(|(signer, pair)| proto::SignerInfo {
                public_key: Some(pair.public_key()),
                mode_info: Some(proto::ModeInfo::direct()),
                sequence: signer.account_sequence,
            })
            .collect(),
        fee: Some(proto::Fee {
            amount: if fee.is_zero() { Vec::new() } else { vec![fee.into()] },
            gas_limit,
            payer: String::new(),
            granter: String::new(),
        }),
    };

    let body_bytes = body.encode_to_vec();
    let auth_info_bytes = auth_info.encode_to_vec();

    let signatures = signers
        .iter()
        .zip(&key_pairs)
        .map(|(signer, pair)| {
            let sign_doc = proto::SignDoc {
                body_bytes: body_bytes.clone(),
                auth_info_bytes: auth_info_bytes.clone(),
                chain_id: chain_id.to_string(),
                account_number: signer.account_number,
            };
            pair.sign(&sign_doc.encode_to_vec())
        })
        .collect::<BlockchainResult<Vec<_>>>()?;

    Ok(proto::TxRaw {
        body_bytes,
        auth_info_bytes,
        signatures,
    }
    .encode_to_vec())
}

/// Simulate `msgs` for gas, price the result, sign again with the final fee
/// and broadcast.
pub async fn simulate_and_broadcast(
    api: &dyn ChainApi,
    params: &TxParams,
    msgs: &[UnsignedMessage],
) -> BlockchainResult<TxResponse> {
    let signers = collect_signers(msgs);
    let zero_fee = params.gas_price.fee_for(0);

    let draft = build_tx(msgs, &signers, &params.chain_id, &zero_fee, 0)?;
    let gas = api.simulate(draft).await?;

    let gas_limit = adjusted_gas_limit(gas.gas_used, params.gas_adjustment);
    let fee = params.gas_price.fee_for(gas_limit);
    tracing::debug!(
        gas_used = gas.gas_used,
        gas_limit,
        fee = %fee,
        signers = signers.len(),
        "Transaction priced"
    );

    let tx_bytes = build_tx(msgs, &signers, &params.chain_id, &fee, gas_limit)?;
    api.broadcast_tx(tx_bytes).await
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::blockchain::types::GasInfo;
    use async_trait::async_trait;
    use std::sync::Mutex;

    pub(crate) const TEST_PRIVATE_KEY: &str =
        "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    /// In-memory chain: known accounts, fixed gas usage, records broadcasts.
    #[derive(Default)]
    pub(crate) struct MockChain {
        pub accounts: HashMap<String, AccountInfo>,
        pub gas_used: u64,
        pub queries: Mutex<Vec<String>>,
        pub broadcasts: Mutex<Vec<Vec<u8>>>,
    }

    #[async_trait]
    impl ChainApi for MockChain {
        async fn query_account(&self, address: &str) -> BlockchainResult<AccountInfo> {
            self.queries.lock().unwrap().push(address.to_string());
            self.accounts
                .get(address)
                .copied()
                .ok_or_else(|| BlockchainError::AccountNotFound(address.to_string()))
        }

        async fn simulate(&self, _tx_bytes: Vec<u8>) -> BlockchainResult<GasInfo> {
            Ok(GasInfo {
                gas_wanted: 0,
                gas_used: self.gas_used,
            })
        }

        async fn broadcast_tx(&self, tx_bytes: Vec<u8>) -> BlockchainResult<TxResponse> {
            let mut broadcasts = self.broadcasts.lock().unwrap();
            broadcasts.push(tx_bytes);
            Ok(TxResponse {
                tx_hash: format!("HASH{}", broadcasts.len()),
                code: 0,
                raw_log: String::new(),
            })
        }
    }

    pub(crate) fn key(address: &str) -> SignatureKey {
        SignatureKey {
            address: address.to_string(),
            private_key: hex::decode(TEST_PRIVATE_KEY).unwrap(),
            ..Default::default()
        }
    }

    pub(crate) fn msg(address: &str) -> UnsignedMessage {
        UnsignedMessage::new("/stratos.sds.v1.MsgPrepay", vec![1, 2, 3], vec![key(address)])
    }

    fn params() -> TxParams {
        TxParams {
            chain_id: "tropos-5".into(),
            gas_price: Coin::parse_normalized("1gwei").unwrap(),
            gas_adjustment: 1.5,
        }
    }

    #[test]
    fn test_attach_wallet_key_only_matching_empty() {
        let mut m = UnsignedMessage::new(
            "/stratos.pot.v1.MsgVolumeReport",
            vec![],
            vec![
                SignatureKey {
                    address: "st1relay".into(),
                    ..Default::default()
                },
                SignatureKey {
                    address: "st1other".into(),
                    ..Default::default()
                },
                SignatureKey {
                    address: "st1relay".into(),
                    private_key: vec![9; 32],
                    ..Default::default()
                },
            ],
        );
        assert_eq!(attach_wallet_key(&mut m, "st1relay", &[7; 32]), 1);
        assert_eq!(m.signature_keys[0].private_key, vec![7; 32]);
        assert!(m.signature_keys[1].private_key.is_empty());
        assert_eq!(m.signature_keys[2].private_key, vec![9; 32]);
    }

    #[test]
    fn test_collect_signers_dedupes_in_order() {
        let msgs = vec![msg("st1b"), msg("st1a"), msg("st1b")];
        let signers = collect_signers(&msgs);
        let addresses: Vec<_> = signers.iter().map(|s| s.address.as_str()).collect();
        assert_eq!(addresses, vec!["st1b", "st1a"]);
    }

    #[test]
    fn test_partition_excludes_empty_address() {
        let mut anonymous = msg("st1a");
        anonymous.signature_keys[0].address.clear();
        let (signable, dropped) = partition_signable(vec![msg("st1a"), anonymous, msg("st1b")]);
        assert_eq!(signable.len(), 2);
        assert_eq!(dropped.len(), 1);
    }

    #[tokio::test]
    async fn test_resolve_accounts_one_query_per_address() {
        let mut chain = MockChain::default();
        chain.accounts.insert(
            "st1a".into(),
            AccountInfo {
                account_number: 4,
                sequence: 11,
            },
        );

        let (resolved, unresolved) =
            resolve_accounts(&chain, vec![msg("st1a"), msg("st1missing"), msg("st1a")]).await;

        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved[0].signature_keys[0].account_number, 4);
        assert_eq!(resolved[1].signature_keys[0].account_sequence, 11);
        assert_eq!(unresolved.len(), 1);
        assert_eq!(unresolved[0].address, "st1missing");
        assert_eq!(chain.queries.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_same_signer_signs_once() {
        let msgs = vec![msg("st1a"), msg("st1a")];
        let signers = collect_signers(&msgs);
        let bytes = build_tx(&msgs, &signers, "tropos-5", &Coin::parse_normalized("0wei").unwrap(), 0)
            .unwrap();

        let raw = proto::TxRaw::decode(bytes.as_slice()).unwrap();
        assert_eq!(raw.signatures.len(), 1);
        assert_eq!(raw.signatures[0].len(), 65);
        assert!(raw.signatures[0][64] <= 1);

        let body = proto::TxBody::decode(raw.body_bytes.as_slice()).unwrap();
        assert_eq!(body.messages.len(), 2);

        let auth = proto::AuthInfo::decode(raw.auth_info_bytes.as_slice()).unwrap();
        assert_eq!(auth.signer_infos.len(), 1);
        let pubkey = auth.signer_infos[0].public_key.as_ref().unwrap();
        assert_eq!(pubkey.type_url, SECP256K1_PUBKEY_TYPE_URL);
        let pubkey = proto::PubKey::decode(pubkey.value.as_slice()).unwrap();
        assert_eq!(pubkey.key.len(), 33);
    }

    #[test]
    fn test_ed25519_signature_verifies() {
        use ed25519_dalek::Verifier;

        let seed = [3u8; 32];
        let signing_key = ed25519_dalek::SigningKey::from_bytes(&seed);
        let signer = SignatureKey {
            address: "st1ed".into(),
            private_key: signing_key.to_keypair_bytes().to_vec(),
            account_number: 2,
            account_sequence: 0,
            scheme: SignatureScheme::Ed25519,
        };
        let msgs = vec![UnsignedMessage::new("/stratos.pot.v1.MsgVolumeReport", vec![5], vec![signer.clone()])];
        let bytes = build_tx(&msgs, &[signer], "tropos-5", &Coin::parse_normalized("0wei").unwrap(), 0)
            .unwrap();

        let raw = proto::TxRaw::decode(bytes.as_slice()).unwrap();
        let sign_doc = proto::SignDoc {
            body_bytes: raw.body_bytes.clone(),
            auth_info_bytes: raw.auth_info_bytes.clone(),
            chain_id: "tropos-5".into(),
            account_number: 2,
        }
        .encode_to_vec();
        let signature = ed25519_dalek::Signature::from_slice(&raw.signatures[0]).unwrap();
        assert!(signing_key.verifying_key().verify(&sign_doc, &signature).is_ok());
    }

    #[test]
    fn test_bad_key_is_signing_error() {
        let mut bad = msg("st1a");
        bad.signature_keys[0].private_key = vec![1, 2, 3];
        let signers = collect_signers(std::slice::from_ref(&bad));
        let result = build_tx(&[bad], &signers, "c", &Coin::parse_normalized("0wei").unwrap(), 0);
        assert!(matches!(result, Err(BlockchainError::Signing(_))));
    }

    #[tokio::test]
    async fn test_fee_uses_adjusted_gas() {
        let chain = MockChain {
            gas_used: 100_000,
            ..Default::default()
        };
        let response = simulate_and_broadcast(&chain, &params(), &[msg("st1a")]).await.unwrap();
        assert_eq!(response.tx_hash, "HASH1");

        let broadcasts = chain.broadcasts.lock().unwrap();
        let raw = proto::TxRaw::decode(broadcasts[0].as_slice()).unwrap();
        let auth = proto::AuthInfo::decode(raw.auth_info_bytes.as_slice()).unwrap();
        let fee = auth.fee.unwrap();
        assert_eq!(fee.gas_limit, 150_000);
        assert_eq!(fee.amount[0].denom, "wei");
        assert_eq!(fee.amount[0].amount, "150000000000000");
    }
}
