//! CometBFT websocket JSON-RPC.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::events::ResultEvent;

pub const NEW_BLOCK_QUERY: &str = "tm.event='NewBlock'";

const ALREADY_SUBSCRIBED: &str = "already subscribed";

#[derive(Debug, Serialize)]
struct Request<'a> {
    jsonrpc: &'static str,
    method: &'static str,
    id: u64,
    params: QueryParams<'a>,
}

#[derive(Debug, Serialize)]
struct QueryParams<'a> {
    query: &'a str,
}

/// Encode a `subscribe` call for `query`.
pub fn subscribe_request(id: u64, query: &str) -> Result<String, serde_json::Error> {
    serde_json::to_string(&Request {
        jsonrpc: "2.0",
        method: "subscribe",
        id,
        params: QueryParams { query },
    })
}

pub fn msg_type_query(msg_type: &str) -> String {
    format!("message.action='{msg_type}'")
}

/// Message type named by a `message.action='<type>'` query.
pub fn parse_msg_type(query: &str) -> Option<&str> {
    let msg_type = query.strip_prefix("message.action='")?;
    let msg_type = msg_type.trim_end_matches('\'');
    (!msg_type.is_empty()).then_some(msg_type)
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcError {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub data: Value,
}

impl RpcError {
    pub fn is_already_subscribed(&self) -> bool {
        self.message.contains(ALREADY_SUBSCRIBED)
            || self
                .data
                .as_str()
                .is_some_and(|data| data.contains(ALREADY_SUBSCRIBED))
    }
}

impl std::fmt::Display for RpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code)?;
        if let Some(data) = self.data.as_str() {
            write!(f, ": {data}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcResponse {
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub result: Option<ResultEvent>,
    #[serde(default)]
    pub error: Option<RpcError>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribe_request_shape() {
        let raw = subscribe_request(3, NEW_BLOCK_QUERY).unwrap();
        let value: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "jsonrpc": "2.0",
                "method": "subscribe",
                "id": 3,
                "params": {"query": "tm.event='NewBlock'"}
            })
        );
    }

    #[test]
    fn test_parse_msg_type() {
        let query = msg_type_query("/stratos.sds.v1.MsgPrepay");
        assert_eq!(parse_msg_type(&query), Some("/stratos.sds.v1.MsgPrepay"));
        assert_eq!(parse_msg_type(NEW_BLOCK_QUERY), None);
        assert_eq!(parse_msg_type("message.action=''"), None);
    }

    #[test]
    fn test_already_subscribed_error() {
        let response: RpcResponse = serde_json::from_str(
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32603,"message":"Internal error","data":"already subscribed"}}"#,
        )
        .unwrap();
        let error = response.error.unwrap();
        assert!(error.is_already_subscribed());
        assert_eq!(error.to_string(), "Internal error (-32603): already subscribed");
    }

    #[test]
    fn test_subscription_ack_has_empty_result() {
        let response: RpcResponse =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":1,"result":{}}"#).unwrap();
        let result = response.result.unwrap();
        assert!(result.query.is_empty());
        assert!(response.error.is_none());
    }
}
