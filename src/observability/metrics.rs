//! Metrics collection and exposition.
//!
//! # Metrics
//! - `relay_chain_events_total` (counter): chain messages dispatched, by msg type
//! - `relay_events_dropped_total` (counter): logical messages dropped, by msg type and reason
//! - `relay_dedup_hits_total` (counter): replays suppressed by the dedup cache
//! - `relay_storage_node_posts_total` (counter): POSTs to the storage node, by path and outcome
//! - `relay_batch_messages_dropped_total` (counter): pending messages removed from a batch, by reason
//! - `relay_tx_broadcast_total` (counter): flush outcomes
//! - `relay_reconnects_total` (counter): connection refreshes, by side
//! - `relay_connection_state` (gauge): 0=disconnected .. 3=streaming, by side

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_chain_event(msg_type: &str) {
    counter!("relay_chain_events_total", "msg_type" => msg_type.to_string()).increment(1);
}

pub fn record_events_dropped(msg_type: &str, reason: &'static str, count: usize) {
    if count == 0 {
        return;
    }
    counter!(
        "relay_events_dropped_total",
        "msg_type" => msg_type.to_string(),
        "reason" => reason
    )
    .increment(count as u64);
}

pub fn record_dedup_hit(msg_type: &str) {
    counter!("relay_dedup_hits_total", "msg_type" => msg_type.to_string()).increment(1);
}

pub fn record_storage_node_post(path: &str, success: bool) {
    let outcome = if success { "success" } else { "error" };
    counter!(
        "relay_storage_node_posts_total",
        "path" => path.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_batch_dropped(reason: &'static str, count: usize) {
    if count == 0 {
        return;
    }
    counter!("relay_batch_messages_dropped_total", "reason" => reason).increment(count as u64);
}

pub fn record_tx_broadcast(outcome: &'static str) {
    counter!("relay_tx_broadcast_total", "outcome" => outcome).increment(1);
}

pub fn record_reconnect(side: &'static str) {
    counter!("relay_reconnects_total", "side" => side).increment(1);
}

pub fn record_connection_state(side: &'static str, state: u8) {
    gauge!("relay_connection_state", "side" => side).set(state as f64);
}
