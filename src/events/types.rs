//! Chain event model.
//!
//! Event type and attribute names as emitted by the chain, plus the JSON
//! shape of a websocket subscription result.

use std::collections::HashMap;

use serde::Deserialize;

pub const EVENT_TYPE_MESSAGE: &str = "message";
pub const ATTRIBUTE_KEY_ACTION: &str = "action";
pub const FLAT_KEY_TX_HASH: &str = "tx.hash";

pub const EVENT_TYPE_CREATE_RESOURCE_NODE: &str = "stratos.register.v1.EventCreateResourceNode";
pub const EVENT_TYPE_UPDATE_RESOURCE_NODE: &str = "stratos.register.v1.EventUpdateResourceNode";
pub const EVENT_TYPE_UPDATE_RESOURCE_NODE_DEPOSIT: &str =
    "stratos.register.v1.EventUpdateResourceNodeDeposit";
pub const EVENT_TYPE_UNBONDING_RESOURCE_NODE: &str = "stratos.register.v1.EventUnBondingResourceNode";
pub const EVENT_TYPE_UPDATE_EFFECTIVE_DEPOSIT: &str = "stratos.register.v1.EventUpdateEffectiveDeposit";
pub const EVENT_TYPE_UNBONDING_META_NODE: &str = "stratos.register.v1.EventUnBondingMetaNode";
pub const EVENT_TYPE_UPDATE_META_NODE_DEPOSIT: &str = "stratos.register.v1.EventUpdateMetaNodeDeposit";
pub const EVENT_TYPE_META_NODE_REG_VOTE: &str = "stratos.register.v1.EventMetaNodeRegistrationVote";

pub const EVENT_TYPE_VOLUME_REPORT: &str = "stratos.pot.v1.EventVolumeReport";
pub const EVENT_TYPE_SLASHING: &str = "stratos.pot.v1.EventSlashing";

pub const EVENT_TYPE_FILE_UPLOAD: &str = "stratos.sds.v1.EventFileUpload";
pub const EVENT_TYPE_PREPAY: &str = "stratos.sds.v1.EventPrePay";

pub const ATTRIBUTE_KEY_RESOURCE_NODE: &str = "resource_node";
pub const ATTRIBUTE_KEY_META_NODE: &str = "meta_node";
pub const ATTRIBUTE_KEY_NETWORK_ADDRESS: &str = "network_address";
pub const ATTRIBUTE_KEY_PUBKEY: &str = "pubkey";
pub const ATTRIBUTE_KEY_CANDIDATE_NETWORK_ADDRESS: &str = "candidate_network_address";
pub const ATTRIBUTE_KEY_CANDIDATE_STATUS: &str = "candidate_status";
pub const ATTRIBUTE_KEY_UNBONDING_MATURE_TIME: &str = "unbonding_mature_time";
pub const ATTRIBUTE_KEY_OZONE_LIMIT_CHANGES: &str = "ozone_limit_changes";
pub const ATTRIBUTE_KEY_INITIAL_DEPOSIT: &str = "initial_deposit";
pub const ATTRIBUTE_KEY_CURRENT_DEPOSIT: &str = "current_deposit";
pub const ATTRIBUTE_KEY_AVAILABLE_TOKEN_BEFORE: &str = "available_token_before";
pub const ATTRIBUTE_KEY_AVAILABLE_TOKEN_AFTER: &str = "available_token_after";
pub const ATTRIBUTE_KEY_DEPOSIT_DELTA: &str = "deposit_delta";
pub const ATTRIBUTE_KEY_DEPOSIT_TO_REMOVE: &str = "deposit_to_remove";
pub const ATTRIBUTE_KEY_EFFECTIVE_DEPOSIT_AFTER: &str = "effective_deposit_after";
pub const ATTRIBUTE_KEY_IS_UNSUSPENDED: &str = "is_unsuspended";
pub const ATTRIBUTE_KEY_EPOCH: &str = "epoch";
pub const ATTRIBUTE_KEY_AMOUNT: &str = "amount";
pub const ATTRIBUTE_KEY_NODE_SUSPENDED: &str = "suspend";
pub const ATTRIBUTE_KEY_REPORTER: &str = "reporter";
pub const ATTRIBUTE_KEY_FILE_HASH: &str = "file_hash";
pub const ATTRIBUTE_KEY_UPLOADER: &str = "uploader";
pub const ATTRIBUTE_KEY_PURCHASED_NOZ: &str = "purchased_noz";
pub const ATTRIBUTE_KEY_BENEFICIARY: &str = "beneficiary";
pub const ATTRIBUTE_KEY_SENDER: &str = "sender";
pub const ATTRIBUTE_KEY_BENEFICIARY_ADDRESS: &str = "beneficiary_address";

/// Bond status a meta node candidate must reach to be announced.
pub const BOND_STATUS_BONDED: &str = "BOND_STATUS_BONDED";

/// One `(type, attributes)` entry of a transaction's ordered event log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AbciEvent {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub attributes: Vec<EventAttribute>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EventAttribute {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub value: String,
}

impl AbciEvent {
    pub fn new(kind: &str, attributes: &[(&str, &str)]) -> Self {
        Self {
            kind: kind.to_string(),
            attributes: attributes
                .iter()
                .map(|(key, value)| EventAttribute {
                    key: key.to_string(),
                    value: value.to_string(),
                })
                .collect(),
        }
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.key == key)
            .map(|a| a.value.as_str())
    }
}

/// `result` of a subscription notification.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResultEvent {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub data: Option<EventData>,
    /// Flat index: `"<event type>.<attribute>"` to every value it took.
    #[serde(default)]
    pub events: HashMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventData {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub value: EventDataValue,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventDataValue {
    #[serde(rename = "TxResult", default)]
    pub tx_result: Option<TxResult>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TxResult {
    #[serde(default)]
    pub result: TxResultBody,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TxResultBody {
    #[serde(default)]
    pub events: Vec<AbciEvent>,
}

impl ResultEvent {
    /// Hash of the transaction, or empty for block-level results.
    pub fn tx_hash(&self) -> &str {
        self.events
            .get(FLAT_KEY_TX_HASH)
            .and_then(|values| values.first())
            .map(String::as_str)
            .unwrap_or_default()
    }

    /// Ordered transaction events; empty if this is not a transaction result.
    pub fn tx_events(&self) -> &[AbciEvent] {
        self.data
            .as_ref()
            .and_then(|data| data.value.tx_result.as_ref())
            .map(|tx| tx.result.events.as_slice())
            .unwrap_or_default()
    }

    /// Strip one pair of surrounding double quotes from every value.
    pub fn clean(&mut self) {
        for values in self.events.values_mut() {
            for value in values.iter_mut() {
                unquote_in_place(value);
            }
        }
        if let Some(tx) = self.data.as_mut().and_then(|d| d.value.tx_result.as_mut()) {
            for event in &mut tx.result.events {
                for attribute in &mut event.attributes {
                    unquote_in_place(&mut attribute.value);
                }
            }
        }
    }
}

/// Typed events JSON-encode their values, so strings arrive as `"\"st1..\""`.
pub fn unquote(value: &str) -> &str {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        &value[1..value.len() - 1]
    } else {
        value
    }
}

fn unquote_in_place(value: &mut String) {
    let trimmed = unquote(value);
    if trimmed.len() != value.len() {
        *value = trimmed.to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TX_RESULT: &str = r#"{
        "query": "message.action='/stratos.sds.v1.MsgPrepay'",
        "data": {
            "type": "tendermint/event/Tx",
            "value": {
                "TxResult": {
                    "height": "10",
                    "result": {
                        "events": [
                            {"type": "message", "attributes": [{"key": "action", "value": "/stratos.sds.v1.MsgPrepay", "index": true}]},
                            {"type": "stratos.sds.v1.EventPrePay", "attributes": [{"key": "sender", "value": "\"st1abc\""}]}
                        ]
                    }
                }
            }
        },
        "events": {"tx.hash": ["ABCDEF"], "stratos.sds.v1.EventPrePay.sender": ["\"st1abc\""]}
    }"#;

    #[test]
    fn test_parse_tx_result() {
        let mut result: ResultEvent = serde_json::from_str(TX_RESULT).unwrap();
        assert_eq!(result.tx_hash(), "ABCDEF");
        assert_eq!(result.tx_events().len(), 2);

        result.clean();
        assert_eq!(result.tx_events()[1].attribute("sender"), Some("st1abc"));
        assert_eq!(result.events["stratos.sds.v1.EventPrePay.sender"], vec!["st1abc"]);
    }

    #[test]
    fn test_block_result_has_no_tx() {
        let result: ResultEvent = serde_json::from_str(
            r#"{"query": "tm.event='NewBlock'", "data": {"type": "tendermint/event/NewBlock", "value": {"block": {}}}, "events": {}}"#,
        )
        .unwrap();
        assert!(result.tx_events().is_empty());
        assert_eq!(result.tx_hash(), "");
    }

    #[test]
    fn test_unquote() {
        assert_eq!(unquote("\"abc\""), "abc");
        assert_eq!(unquote("abc"), "abc");
        assert_eq!(unquote("\""), "\"");
        assert_eq!(unquote("\"\""), "");
    }
}
