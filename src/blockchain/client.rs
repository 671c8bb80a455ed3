//! Chain gRPC client with timeout and error handling.
//!
//! # Responsibilities
//! - Query account number and sequence for signers
//! - Simulate transactions for gas estimation
//! - Broadcast signed transactions (sync mode)

use std::time::Duration;

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use prost::Message;
use tokio::time::timeout;
use tonic::codec::ProstCodec;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::{Channel, ClientTlsConfig, Endpoint};

use crate::blockchain::proto;
use crate::blockchain::types::{AccountInfo, BlockchainError, BlockchainResult, GasInfo, TxResponse};
use crate::config::GrpcConfig;

const PATH_ACCOUNT: &str = "/cosmos.auth.v1beta1.Query/Account";
const PATH_SIMULATE: &str = "/cosmos.tx.v1beta1.Service/Simulate";
const PATH_BROADCAST: &str = "/cosmos.tx.v1beta1.Service/BroadcastTx";

/// The chain operations the broadcaster depends on.
#[async_trait]
pub trait ChainApi: Send + Sync {
    async fn query_account(&self, address: &str) -> BlockchainResult<AccountInfo>;

    async fn simulate(&self, tx_bytes: Vec<u8>) -> BlockchainResult<GasInfo>;

    /// Broadcast in sync mode. A non-zero response code is `Rejected`.
    async fn broadcast_tx(&self, tx_bytes: Vec<u8>) -> BlockchainResult<TxResponse>;
}

struct Connected {
    uri: String,
    channel: Channel,
    timeout: Duration,
}

/// `ChainApi` over the chain's gRPC endpoint.
///
/// Unconfigured until `configure` is called; the channel connects lazily
/// on first use.
#[derive(Default)]
pub struct GrpcChainClient {
    connected: ArcSwapOption<Connected>,
}

impl GrpcChainClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point the client at `config.server`. Rebuilds the channel only if the
    /// endpoint changed. Must be called from within a Tokio runtime.
    pub fn configure(&self, config: &GrpcConfig) -> BlockchainResult<()> {
        let uri = grpc_uri(&config.server, config.insecure);
        if let Some(current) = self.connected.load().as_ref() {
            if current.uri == uri {
                return Ok(());
            }
        }

        let invalid = |reason: String| BlockchainError::InvalidEndpoint {
            endpoint: config.server.clone(),
            reason,
        };
        let request_timeout = Duration::from_secs(config.timeout_secs.max(1));

        let mut endpoint = Endpoint::from_shared(uri.clone())
            .map_err(|e| invalid(e.to_string()))?
            .connect_timeout(request_timeout)
            .timeout(request_timeout);
        if !config.insecure {
            endpoint = endpoint
                .tls_config(ClientTlsConfig::new().with_webpki_roots())
                .map_err(|e| invalid(e.to_string()))?;
        }

        self.connected.store(Some(std::sync::Arc::new(Connected {
            uri: uri.clone(),
            channel: endpoint.connect_lazy(),
            timeout: request_timeout,
        })));
        tracing::info!(endpoint = %uri, insecure = config.insecure, "Chain gRPC client configured");
        Ok(())
    }

    async fn unary<Req, Resp>(&self, path: &'static str, request: Req) -> BlockchainResult<Resp>
    where
        Req: Message + Send + Sync + 'static,
        Resp: Message + Default + Send + Sync + 'static,
    {
        let connected = self
            .connected
            .load_full()
            .ok_or_else(|| BlockchainError::Rpc("gRPC client not configured".to_string()))?;

        let mut grpc = tonic::client::Grpc::new(connected.channel.clone());
        let call = async move {
            grpc.ready()
                .await
                .map_err(|e| BlockchainError::Rpc(format!("{}: channel not ready: {}", path, e)))?;
            let codec: ProstCodec<Req, Resp> = ProstCodec::default();
            grpc.unary(tonic::Request::new(request), PathAndQuery::from_static(path), codec)
                .await
                .map(tonic::Response::into_inner)
                .map_err(|status| {
                    if status.code() == tonic::Code::NotFound {
                        BlockchainError::AccountNotFound(status.message().to_string())
                    } else {
                        BlockchainError::Rpc(format!("{}: {}", path, status.message()))
                    }
                })
        };

        match timeout(connected.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(BlockchainError::Timeout(connected.timeout.as_secs())),
        }
    }
}

#[async_trait]
impl ChainApi for GrpcChainClient {
    async fn query_account(&self, address: &str) -> BlockchainResult<AccountInfo> {
        let response: proto::QueryAccountResponse = self
            .unary(
                PATH_ACCOUNT,
                proto::QueryAccountRequest {
                    address: address.to_string(),
                },
            )
            .await
            .map_err(|e| match e {
                BlockchainError::AccountNotFound(_) => {
                    BlockchainError::AccountNotFound(address.to_string())
                }
                other => other,
            })?;

        let account = response
            .account
            .ok_or_else(|| BlockchainError::AccountNotFound(address.to_string()))?;
        decode_account(&account)
    }

    async fn simulate(&self, tx_bytes: Vec<u8>) -> BlockchainResult<GasInfo> {
        let response: proto::SimulateResponse = self
            .unary(PATH_SIMULATE, proto::SimulateRequest { tx_bytes })
            .await?;
        let gas = response
            .gas_info
            .ok_or_else(|| BlockchainError::Encoding("simulate response without gas info".into()))?;
        Ok(GasInfo {
            gas_wanted: gas.gas_wanted,
            gas_used: gas.gas_used,
        })
    }

    async fn broadcast_tx(&self, tx_bytes: Vec<u8>) -> BlockchainResult<TxResponse> {
        let response: proto::BroadcastTxResponse = self
            .unary(
                PATH_BROADCAST,
                proto::BroadcastTxRequest {
                    tx_bytes,
                    mode: proto::BROADCAST_MODE_SYNC,
                },
            )
            .await?;
        let tx = response
            .tx_response
            .ok_or_else(|| BlockchainError::Encoding("broadcast response without tx_response".into()))?;

        if tx.code != 0 {
            return Err(BlockchainError::Rejected {
                code: tx.code,
                raw_log: tx.raw_log,
            });
        }
        Ok(TxResponse {
            tx_hash: tx.txhash,
            code: tx.code,
            raw_log: tx.raw_log,
        })
    }
}

/// Extract account number and sequence from a `BaseAccount` or an
/// account type that embeds one.
pub fn decode_account(account: &prost_types::Any) -> BlockchainResult<AccountInfo> {
    let decode_error = |e: prost::DecodeError| {
        BlockchainError::Encoding(format!("account {}: {}", account.type_url, e))
    };

    let base = if account.type_url == proto::BASE_ACCOUNT_TYPE_URL {
        proto::BaseAccount::decode(account.value.as_slice()).map_err(decode_error)?
    } else {
        proto::EthAccount::decode(account.value.as_slice())
            .map_err(decode_error)?
            .base_account
            .ok_or_else(|| {
                BlockchainError::Encoding(format!("account {} has no base account", account.type_url))
            })?
    };

    Ok(AccountInfo {
        account_number: base.account_number,
        sequence: base.sequence,
    })
}

/// Add a scheme to bare `host:port` endpoints.
fn grpc_uri(server: &str, insecure: bool) -> String {
    if server.contains("://") {
        server.to_string()
    } else if insecure {
        format!("http://{}", server)
    } else {
        format!("https://{}", server)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grpc_uri() {
        assert_eq!(grpc_uri("127.0.0.1:9090", true), "http://127.0.0.1:9090");
        assert_eq!(grpc_uri("grpc.example.org:443", false), "https://grpc.example.org:443");
        assert_eq!(grpc_uri("http://node:9090", false), "http://node:9090");
    }

    #[test]
    fn test_decode_base_account() {
        let base = proto::BaseAccount {
            address: "st1abc".into(),
            pub_key: None,
            account_number: 12,
            sequence: 3,
        };
        let any = prost_types::Any {
            type_url: proto::BASE_ACCOUNT_TYPE_URL.into(),
            value: base.encode_to_vec(),
        };
        assert_eq!(
            decode_account(&any).unwrap(),
            AccountInfo {
                account_number: 12,
                sequence: 3
            }
        );
    }

    #[test]
    fn test_decode_eth_account() {
        let eth = proto::EthAccount {
            base_account: Some(proto::BaseAccount {
                address: "st1abc".into(),
                pub_key: None,
                account_number: 5,
                sequence: 8,
            }),
            code_hash: "0x".into(),
        };
        let any = prost_types::Any {
            type_url: proto::ETH_ACCOUNT_TYPE_URL.into(),
            value: eth.encode_to_vec(),
        };
        assert_eq!(decode_account(&any).unwrap().sequence, 8);
    }

    #[tokio::test]
    async fn test_unconfigured_client_errors() {
        let client = GrpcChainClient::new();
        let result = client.query_account("st1abc").await;
        assert!(matches!(result, Err(BlockchainError::Rpc(_))));
    }

    #[tokio::test]
    async fn test_configure_rejects_bad_endpoint() {
        let client = GrpcChainClient::new();
        let config = GrpcConfig {
            server: "not a uri".into(),
            insecure: true,
            timeout_secs: 1,
        };
        assert!(matches!(
            client.configure(&config),
            Err(BlockchainError::InvalidEndpoint { .. })
        ));
    }
}
