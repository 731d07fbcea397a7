use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Alert fields stripped before the alert leaves the account boundary. The
/// monitoring endpoint only needs the identifying remainder of the alert.
pub const STRIPPED_ALERT_FIELDS: &[&str] = &[
    "hasFinding",
    "alertRemediationCli",
    "source",
    "complianceMetadata",
    "policyLabels",
    "resource",
    "resourceName",
    "alertAttribution",
    "riskRating",
    "resourceRegion",
    "policyDescription",
    "policyRecommendation",
    "accountId",
    "resourceConfig",
    "policyId",
    "resourceCloudService",
    "alertTs",
    "findingSummary",
    "resourceType",
];

/// Payload shape the monitoring endpoint accepts. The `force_*`, `value`,
/// `threshold`, and `message_time` fields are fixed placeholders; `message`
/// carries the stringified sanitized alert and `aligned_resource` names the
/// target device.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MonitorAlertPayload {
    pub force_ytype: String,
    pub force_yid: String,
    pub force_yname: String,
    pub message: String,
    pub value: String,
    pub threshold: String,
    pub message_time: String,
    pub aligned_resource: String,
}

/// Remove every stripped field from the alert object. Non-object payloads
/// pass through untouched.
pub fn sanitize_alert(alert: &Value) -> Value {
    let mut sanitized = alert.clone();
    if let Some(object) = sanitized.as_object_mut() {
        for field in STRIPPED_ALERT_FIELDS {
            object.remove(*field);
        }
    }
    sanitized
}

pub fn build_monitor_payload(alert: &Value, device_id: &str) -> MonitorAlertPayload {
    let sanitized = sanitize_alert(alert);
    MonitorAlertPayload {
        force_ytype: "0".to_string(),
        force_yid: "0".to_string(),
        force_yname: String::new(),
        message: sanitized.to_string(),
        value: "0".to_string(),
        threshold: "0".to_string(),
        message_time: "0".to_string(),
        aligned_resource: format!("/device/{device_id}"),
    }
}
