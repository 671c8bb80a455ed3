//! Extraction, dedup and delivery of one chain result.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::B256;

use crate::blockchain::msg_type::{short_name, MSG_TYPE_EVM_TX};
use crate::cache::TtlCache;
use crate::events::extract::{
    dedup_key, process_events, process_typed_events, Extraction, ProcessedEvent, RequiredAttribute,
};
use crate::events::registry::{Handler, HandlerRegistry};
use crate::events::storage_node::StorageNode;
use crate::events::types::ResultEvent;
use crate::observability::metrics;

/// How long a handled transaction is remembered.
pub const DEDUP_TTL: Duration = Duration::from_secs(60);

/// Per-transaction accounting: every logical message is exactly one of
/// forwarded, missing a required attribute, or carrying an invalid value.
/// Filtered events count as none of them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub success: usize,
    pub missing: usize,
    pub invalid: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// No handler for this message type.
    Unhandled,
    /// Nothing to forward.
    Empty { tally: Tally },
    /// Already handled within the TTL.
    Duplicate,
    Posted { path: &'static str, tally: Tally },
    PostFailed { path: &'static str, tally: Tally },
}

/// Routes chain results to their handler and POSTs the request.
pub struct EventDispatcher {
    registry: Arc<HandlerRegistry>,
    cache: TtlCache<B256, bool>,
    storage: Arc<dyn StorageNode>,
}

impl EventDispatcher {
    pub fn new(registry: Arc<HandlerRegistry>, storage: Arc<dyn StorageNode>) -> Self {
        Self::with_cache(registry, storage, TtlCache::new(DEDUP_TTL))
    }

    pub fn with_cache(
        registry: Arc<HandlerRegistry>,
        storage: Arc<dyn StorageNode>,
        cache: TtlCache<B256, bool>,
    ) -> Self {
        Self {
            registry,
            cache,
            storage,
        }
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Handle a `message.action='<msg_type>'` subscription result.
    pub async fn handle_tx(&self, msg_type: &str, result: &ResultEvent) -> DispatchOutcome {
        let events = result.tx_events();

        let (handler, extraction) = if msg_type == MSG_TYPE_EVM_TX {
            let Some(handler) = self.registry.evm_handler(events) else {
                tracing::debug!(tx_hash = %result.tx_hash(), "EVM transaction carries no supported event");
                return DispatchOutcome::Unhandled;
            };
            let extraction = process_typed_events(events, handler.event_type, handler.required);
            (handler, extraction)
        } else {
            let Some(handler) = self.registry.get(msg_type) else {
                return DispatchOutcome::Unhandled;
            };
            (handler, process_events(events, msg_type, handler.required))
        };

        tracing::info!(msg_type = %short_name(msg_type), tx_hash = %result.tx_hash(), "Received chain message");
        self.deliver(handler, result.tx_hash(), extraction).await
    }

    /// Run every block-level handler whose event appears in a new-block result.
    pub async fn handle_block(&self, result: &ResultEvent) -> Vec<DispatchOutcome> {
        let mut outcomes = Vec::new();
        for handler in self.registry.block_handlers() {
            let present = result
                .events
                .keys()
                .any(|name| name.starts_with(handler.event_type));
            if !present {
                continue;
            }
            tracing::info!(event_type = %handler.event_type, "Received block event");
            let extraction = flat_events(&result.events, handler.required);
            outcomes.push(self.deliver(handler, result.tx_hash(), extraction).await);
        }
        outcomes
    }

    async fn deliver(&self, handler: &Handler, tx_hash: &str, extraction: Extraction) -> DispatchOutcome {
        let msg_type = short_name(handler.msg_type);
        metrics::record_chain_event(msg_type);

        if extraction.events.is_empty() {
            let tally = Tally {
                missing: extraction.total,
                ..Tally::default()
            };
            if extraction.total > 0 {
                tracing::error!(
                    msg_type = %msg_type,
                    tx_hash = %tx_hash,
                    missing_attribute = extraction.total,
                    "No complete event in transaction"
                );
                metrics::record_events_dropped(msg_type, "missing_attribute", extraction.total);
            }
            return DispatchOutcome::Empty { tally };
        }

        let key = dedup_key(tx_hash, handler.required, &extraction.events);
        if self.cache.load(&key).is_some() {
            tracing::debug!(msg_type = %msg_type, tx_hash = %tx_hash, "Event already handled, ignoring");
            metrics::record_dedup_hit(msg_type);
            return DispatchOutcome::Duplicate;
        }
        self.cache.store(key, true);

        let built = handler.build(&extraction.events, tx_hash);
        let tally = Tally {
            success: built.accepted,
            missing: extraction.missing(),
            invalid: extraction.events.len().saturating_sub(built.accepted + built.filtered),
        };
        if tally.missing > 0 || tally.invalid > 0 {
            tracing::error!(
                msg_type = %msg_type,
                tx_hash = %tx_hash,
                success = tally.success,
                missing_attribute = tally.missing,
                invalid_attribute = tally.invalid,
                "Handler couldn't process all events"
            );
            metrics::record_events_dropped(msg_type, "missing_attribute", tally.missing);
            metrics::record_events_dropped(msg_type, "invalid_attribute", tally.invalid);
        }

        let Some(body) = built.body else {
            return DispatchOutcome::Empty { tally };
        };
        match self.storage.post(handler.path, &body).await {
            Ok(_) => {
                metrics::record_storage_node_post(handler.path, true);
                DispatchOutcome::Posted {
                    path: handler.path,
                    tally,
                }
            }
            Err(e) => {
                metrics::record_storage_node_post(handler.path, false);
                tracing::error!(path = %handler.path, tx_hash = %tx_hash, error = %e, "Failed to notify storage node");
                DispatchOutcome::PostFailed {
                    path: handler.path,
                    tally,
                }
            }
        }
    }
}

/// Rebuild events from the flat `"<type>.<attr>" → values` index, pairing
/// the i-th value of every required attribute.
fn flat_events(flat: &HashMap<String, Vec<String>>, required: &[RequiredAttribute]) -> Extraction {
    let column = |r: &RequiredAttribute| flat.get(&format!("{}.{}", r.event_type, r.attribute));
    let total = required
        .iter()
        .filter_map(|r| column(r).map(Vec::len))
        .max()
        .unwrap_or(0);

    let mut extraction = Extraction {
        events: Vec::new(),
        total,
    };
    for i in 0..total {
        let mut event = ProcessedEvent::default();
        for r in required {
            if let Some(value) = column(r).and_then(|values| values.get(i)) {
                event.insert(r.event_type, r.attribute, value);
            }
        }
        if event.has_all(required) {
            extraction.events.push(event);
        }
    }
    extraction
}
