//! Handler table.
//!
//! Built once at start-up and never mutated, so lookups need no locking.

use std::collections::HashMap;

use crate::blockchain::msg_type::*;
use crate::events::extract::{ProcessedEvent, RequiredAttribute};
use crate::events::handlers::{self, BuildFn, Built};
use crate::events::types::*;

/// How one message type is turned into a storage node request.
#[derive(Debug, Clone, Copy)]
pub struct Handler {
    pub msg_type: &'static str,
    /// Event carrying the message's attributes.
    pub event_type: &'static str,
    pub required: &'static [RequiredAttribute],
    /// Storage node endpoint.
    pub path: &'static str,
    build: BuildFn,
}

impl Handler {
    pub const fn new(
        msg_type: &'static str,
        event_type: &'static str,
        required: &'static [RequiredAttribute],
        path: &'static str,
        build: BuildFn,
    ) -> Self {
        Self {
            msg_type,
            event_type,
            required,
            path,
            build,
        }
    }

    pub fn build(&self, events: &[ProcessedEvent], tx_hash: &str) -> Built {
        (self.build)(events, tx_hash)
    }
}

const STANDARD: &[Handler] = &[
    Handler::new(
        MSG_TYPE_CREATE_RESOURCE_NODE,
        EVENT_TYPE_CREATE_RESOURCE_NODE,
        handlers::CREATE_RESOURCE_NODE,
        "/pp/activated",
        handlers::create_resource_node,
    ),
    Handler::new(
        MSG_TYPE_UPDATE_RESOURCE_NODE,
        EVENT_TYPE_UPDATE_RESOURCE_NODE,
        handlers::UPDATE_RESOURCE_NODE,
        "/pp/updateBeneficiaryAddress",
        handlers::update_resource_node,
    ),
    Handler::new(
        MSG_TYPE_UPDATE_RESOURCE_NODE_DEPOSIT,
        EVENT_TYPE_UPDATE_RESOURCE_NODE_DEPOSIT,
        handlers::UPDATE_RESOURCE_NODE_DEPOSIT,
        "/pp/updatedDeposit",
        handlers::update_resource_node_deposit,
    ),
    Handler::new(
        MSG_TYPE_REMOVE_RESOURCE_NODE,
        EVENT_TYPE_UNBONDING_RESOURCE_NODE,
        handlers::UNBONDING_RESOURCE_NODE,
        "/pp/unbonding",
        handlers::unbonding_resource_node,
    ),
    Handler::new(
        MSG_TYPE_UPDATE_META_NODE_DEPOSIT,
        EVENT_TYPE_UPDATE_META_NODE_DEPOSIT,
        handlers::UPDATE_META_NODE_DEPOSIT,
        "/chain/updatedDeposit",
        handlers::update_meta_node_deposit,
    ),
    Handler::new(
        MSG_TYPE_REMOVE_META_NODE,
        EVENT_TYPE_UNBONDING_META_NODE,
        handlers::UNBONDING_META_NODE,
        "/chain/unbonding",
        handlers::unbonding_meta_node,
    ),
    Handler::new(
        MSG_TYPE_META_NODE_REG_VOTE,
        EVENT_TYPE_META_NODE_REG_VOTE,
        handlers::META_NODE_REG_VOTE,
        "/chain/activated",
        handlers::meta_node_reg_vote,
    ),
    Handler::new(
        MSG_TYPE_PREPAY,
        EVENT_TYPE_PREPAY,
        handlers::PREPAY,
        "/pp/prepaid",
        handlers::prepay,
    ),
    Handler::new(
        MSG_TYPE_FILE_UPLOAD,
        EVENT_TYPE_FILE_UPLOAD,
        handlers::FILE_UPLOAD,
        "/pp/uploaded",
        handlers::file_upload,
    ),
    Handler::new(
        MSG_TYPE_VOLUME_REPORT,
        EVENT_TYPE_VOLUME_REPORT,
        handlers::VOLUME_REPORT,
        "/volume/reported",
        handlers::volume_report,
    ),
    Handler::new(
        MSG_TYPE_SLASHING_RESOURCE_NODE,
        EVENT_TYPE_SLASHING,
        handlers::SLASHING,
        "/pp/slashed",
        handlers::slashing,
    ),
    Handler::new(
        MSG_TYPE_UPDATE_EFFECTIVE_DEPOSIT,
        EVENT_TYPE_UPDATE_EFFECTIVE_DEPOSIT,
        handlers::UPDATE_EFFECTIVE_DEPOSIT,
        "/pp/updatedEffectiveDeposit",
        handlers::update_effective_deposit,
    ),
];

/// Events an EVM transaction may carry, each handled like its native message.
const EVM_SUPPORTED: &[(&str, &str)] = &[(EVENT_TYPE_PREPAY, MSG_TYPE_PREPAY)];

/// Block-level events, matched by prefix against the flat event index.
const BLOCK_EVENTS: &[&str] = &[EVENT_TYPE_FILE_UPLOAD];

/// Immutable message type → handler table.
#[derive(Debug, Clone, Default)]
pub struct HandlerRegistry {
    by_msg_type: HashMap<&'static str, Handler>,
    evm: HashMap<&'static str, Handler>,
    block: Vec<Handler>,
}

impl HandlerRegistry {
    pub fn standard() -> Self {
        let mut registry = Self::default();
        for handler in STANDARD {
            registry.register(*handler);
        }

        let evm = EVM_SUPPORTED
            .iter()
            .filter_map(|(event_type, msg_type)| {
                registry
                    .by_msg_type
                    .get(msg_type)
                    .map(|handler| (*event_type, *handler))
            })
            .collect();
        registry.evm = evm;

        registry.block = STANDARD
            .iter()
            .filter(|h| BLOCK_EVENTS.contains(&h.event_type))
            .copied()
            .collect();
        registry
    }

    fn register(&mut self, handler: Handler) {
        self.by_msg_type.insert(handler.msg_type, handler);
    }

    pub fn get(&self, msg_type: &str) -> Option<&Handler> {
        self.by_msg_type.get(msg_type)
    }

    /// Handler for the first EVM-supported event in `events`.
    pub fn evm_handler(&self, events: &[AbciEvent]) -> Option<&Handler> {
        events.iter().find_map(|event| self.evm.get(event.kind.as_str()))
    }

    pub fn block_handlers(&self) -> &[Handler] {
        &self.block
    }

    /// Every message type to subscribe to, sorted.
    pub fn msg_types(&self) -> Vec<&'static str> {
        let mut types: Vec<&'static str> = self.by_msg_type.keys().copied().collect();
        if !self.evm.is_empty() {
            types.push(MSG_TYPE_EVM_TX);
        }
        types.sort_unstable();
        types
    }

    pub fn len(&self) -> usize {
        self.by_msg_type.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_msg_type.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_table() {
        let registry = HandlerRegistry::standard();
        assert_eq!(registry.len(), STANDARD.len());
        assert_eq!(registry.get(MSG_TYPE_CREATE_RESOURCE_NODE).unwrap().path, "/pp/activated");
        assert_eq!(registry.get(MSG_TYPE_SLASHING_RESOURCE_NODE).unwrap().path, "/pp/slashed");
        assert!(registry.get(MSG_TYPE_SEND).is_none());
    }

    #[test]
    fn test_required_attributes_match_event_type() {
        for handler in STANDARD {
            assert!(!handler.required.is_empty(), "{}", handler.msg_type);
            for required in handler.required {
                assert_eq!(required.event_type, handler.event_type, "{}", handler.msg_type);
            }
        }
    }

    #[test]
    fn test_msg_types_include_evm() {
        let types = HandlerRegistry::standard().msg_types();
        assert!(types.contains(&MSG_TYPE_EVM_TX));
        assert!(types.contains(&MSG_TYPE_PREPAY));
        assert!(types.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_evm_handler_lookup() {
        let registry = HandlerRegistry::standard();
        let events = vec![
            AbciEvent::new("ethereum_tx", &[("ethereumTxHash", "0x1")]),
            AbciEvent::new(EVENT_TYPE_PREPAY, &[("sender", "st1a")]),
        ];
        assert_eq!(registry.evm_handler(&events).unwrap().msg_type, MSG_TYPE_PREPAY);
        assert!(registry.evm_handler(&events[..1]).is_none());
    }

    #[test]
    fn test_block_handlers() {
        let registry = HandlerRegistry::standard();
        let paths: Vec<_> = registry.block_handlers().iter().map(|h| h.path).collect();
        assert_eq!(paths, vec!["/pp/uploaded"]);
    }
}
