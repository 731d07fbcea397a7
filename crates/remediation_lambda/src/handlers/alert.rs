use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::adapters::alert_sink::AlertSink;
use crate::runtime::contract::AlertDeliveryError;
use crate::runtime::sanitize::build_monitor_payload;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertForwarderConfig {
    /// Monitoring device the forwarded alert is aligned to.
    pub device_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AlertForwardedResponse {
    pub status: String,
    pub aligned_resource: String,
}

/// Strip the alert down to its sanitized remainder and hand it to the sink.
/// Delivery is single-shot; a sink failure surfaces as `AlertDeliveryError`.
pub fn handle_alert_event(
    event: &Value,
    config: &AlertForwarderConfig,
    sink: &dyn AlertSink,
) -> Result<AlertForwardedResponse, AlertDeliveryError> {
    let payload = build_monitor_payload(event, &config.device_id);

    sink.deliver(&payload).map_err(AlertDeliveryError::new)?;

    log_forwarder_info(
        "alert_forwarded",
        json!({ "aligned_resource": payload.aligned_resource.clone() }),
    );
    Ok(AlertForwardedResponse {
        status: "forwarded".to_string(),
        aligned_resource: payload.aligned_resource,
    })
}

fn log_forwarder_info(event: &str, details: Value) {
    eprintln!(
        "{}",
        json!({
            "component": "alert_forwarder",
            "event": event,
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "details": details,
        })
    );
}
