//! Storage node HTTP sink.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::value::RawValue;
use serde_json::Value;
use thiserror::Error;

use crate::config::SharedConfig;

const POST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum StorageNodeError {
    #[error("request to {path} failed: {source}")]
    Http {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{path} returned HTTP {status}: {message}")]
    Status {
        path: String,
        status: u16,
        message: String,
    },

    #[error("{path} returned an undecodable body: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Reply of the storage node's HTTP API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageNodeReply {
    /// HTTP status.
    pub status: u16,
    /// `ReturnCode`/`status` field of the body, if any.
    pub code: Option<String>,
    /// `Msg`/`msg` field of the body.
    pub message: String,
}

/// Where chain events end up.
#[async_trait]
pub trait StorageNode: Send + Sync {
    async fn post(&self, path: &str, body: &RawValue) -> Result<StorageNodeReply, StorageNodeError>;
}

/// Posts JSON to `http://{sds.network_address}:{sds.api_port}{path}`.
pub struct HttpStorageNode {
    client: reqwest::Client,
    config: SharedConfig,
}

impl HttpStorageNode {
    pub fn new(config: SharedConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(POST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self { client, config }
    }

    fn url(&self, path: &str) -> String {
        let config = self.config.load();
        format!("http://{}:{}{}", config.sds.network_address, config.sds.api_port, path)
    }
}

#[async_trait]
impl StorageNode for HttpStorageNode {
    async fn post(&self, path: &str, body: &RawValue) -> Result<StorageNodeReply, StorageNodeError> {
        let response = self
            .client
            .post(self.url(path))
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body.get().to_owned())
            .send()
            .await
            .map_err(|source| StorageNodeError::Http {
                path: path.to_string(),
                source,
            })?;

        let status = response.status();
        let raw = response.bytes().await.map_err(|source| StorageNodeError::Http {
            path: path.to_string(),
            source,
        })?;
        let reply = parse_reply(status.as_u16(), &raw).map_err(|source| StorageNodeError::Decode {
            path: path.to_string(),
            source,
        })?;

        tracing::info!(
            path = %path,
            status = reply.status,
            message = %reply.message,
            "Storage node response"
        );

        if !status.is_success() {
            return Err(StorageNodeError::Status {
                path: path.to_string(),
                status: reply.status,
                message: reply.message,
            });
        }
        Ok(reply)
    }
}

fn parse_reply(status: u16, raw: &[u8]) -> Result<StorageNodeReply, serde_json::Error> {
    let body: Value = if raw.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(raw)?
    };

    let field = |names: &[&str]| {
        names
            .iter()
            .find_map(|name| body.get(*name))
            .map(|value| match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
    };

    Ok(StorageNodeReply {
        status,
        code: field(&["ReturnCode", "status"]),
        message: field(&["Msg", "msg"]).unwrap_or_default(),
    })
}
