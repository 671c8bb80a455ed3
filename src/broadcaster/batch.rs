//! One flush of the pending list.

use crate::blockchain::transaction::{partition_signable, resolve_accounts, simulate_and_broadcast};
use crate::blockchain::{BlockchainResult, ChainApi, TxParams, TxResponse, UnsignedMessage};
use crate::observability::metrics;

/// What happened to a batch.
#[derive(Debug)]
pub struct FlushReport {
    /// Messages handed to the flush.
    pub total: usize,
    pub dropped_unsignable: usize,
    pub dropped_unresolved: usize,
    /// Messages included in the broadcast transaction.
    pub submitted: usize,
    /// `None` when nothing survived filtering.
    pub result: Option<BlockchainResult<TxResponse>>,
}

impl FlushReport {
    pub fn tx_hash(&self) -> Option<&str> {
        match &self.result {
            Some(Ok(response)) => Some(&response.tx_hash),
            _ => None,
        }
    }
}

/// Filter, resolve, price, sign and broadcast `batch`.
///
/// Never retries: a failure is logged and the batch is gone.
pub async fn flush_batch(
    api: &dyn ChainApi,
    params: &TxParams,
    batch: Vec<UnsignedMessage>,
) -> FlushReport {
    let total = batch.len();

    let (signable, unsignable) = partition_signable(batch);
    for msg in &unsignable {
        let addresses: Vec<&str> = msg.signature_keys.iter().map(|k| k.address.as_str()).collect();
        tracing::error!(
            msg_type = %msg.msg_type,
            signers = ?addresses,
            "Dropping message with missing signer address or key"
        );
    }
    metrics::record_batch_dropped("unsignable", unsignable.len());

    let (resolved, unresolved) = resolve_accounts(api, signable).await;
    for dropped in &unresolved {
        tracing::error!(
            msg_type = %dropped.msg.msg_type,
            address = %dropped.address,
            error = %dropped.reason,
            "Dropping message whose signer account could not be resolved"
        );
    }
    metrics::record_batch_dropped("missing_account", unresolved.len());

    let mut report = FlushReport {
        total,
        dropped_unsignable: unsignable.len(),
        dropped_unresolved: unresolved.len(),
        submitted: 0,
        result: None,
    };
    if resolved.is_empty() {
        tracing::warn!(total, "No valid messages left in batch, nothing to broadcast");
        return report;
    }

    report.submitted = resolved.len();
    let result = simulate_and_broadcast(api, params, &resolved).await;
    match &result {
        Ok(response) => {
            metrics::record_tx_broadcast("success");
            tracing::info!(
                tx_hash = %response.tx_hash,
                msgs = resolved.len(),
                "Transaction broadcast"
            );
        }
        Err(e) => {
            metrics::record_tx_broadcast("error");
            tracing::error!(msgs = resolved.len(), error = %e, "Transaction broadcast failed, batch dropped");
        }
    }
    report.result = Some(result);
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::transaction::tests::{msg, MockChain};
    use crate::blockchain::{AccountInfo, BlockchainError, Coin};
    use prost::Message;

    fn params() -> TxParams {
        TxParams {
            chain_id: "tropos-5".into(),
            gas_price: Coin::parse_normalized("1gwei").unwrap(),
            gas_adjustment: 1.3,
        }
    }

    fn chain_with(addresses: &[&str]) -> MockChain {
        let mut chain = MockChain {
            gas_used: 50_000,
            ..Default::default()
        };
        for (i, address) in addresses.iter().enumerate() {
            chain.accounts.insert(
                address.to_string(),
                AccountInfo {
                    account_number: i as u64,
                    sequence: 0,
                },
            );
        }
        chain
    }

    #[tokio::test]
    async fn test_unsignable_message_absent_from_tx() {
        let chain = chain_with(&["st1a"]);
        let mut anonymous = msg("st1a");
        anonymous.signature_keys[0].address.clear();
        anonymous.msg.value = vec![0xAA];

        let report = flush_batch(&chain, &params(), vec![msg("st1a"), anonymous]).await;
        assert_eq!(report.total, 2);
        assert_eq!(report.dropped_unsignable, 1);
        assert_eq!(report.submitted, 1);
        assert_eq!(report.tx_hash(), Some("HASH1"));

        let broadcasts = chain.broadcasts.lock().unwrap();
        let raw = crate::blockchain::proto::TxRaw::decode(broadcasts[0].as_slice()).unwrap();
        let body = crate::blockchain::proto::TxBody::decode(raw.body_bytes.as_slice()).unwrap();
        assert_eq!(body.messages.len(), 1);
        assert_ne!(body.messages[0].value, vec![0xAA]);
    }

    #[tokio::test]
    async fn test_unresolved_account_dropped() {
        let chain = chain_with(&["st1a"]);
        let report = flush_batch(&chain, &params(), vec![msg("st1ghost"), msg("st1a")]).await;
        assert_eq!(report.dropped_unresolved, 1);
        assert_eq!(report.submitted, 1);
        assert!(report.tx_hash().is_some());
    }

    #[tokio::test]
    async fn test_nothing_left_to_broadcast() {
        let chain = chain_with(&[]);
        let report = flush_batch(&chain, &params(), vec![msg("st1ghost")]).await;
        assert!(report.result.is_none());
        assert!(chain.broadcasts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_bad_key_fails_batch() {
        let chain = chain_with(&["st1a"]);
        let mut bad = msg("st1a");
        bad.signature_keys[0].private_key = vec![0; 3];
        let report = flush_batch(&chain, &params(), vec![bad]).await;
        assert!(matches!(report.result, Some(Err(BlockchainError::Signing(_)))));
    }
}
