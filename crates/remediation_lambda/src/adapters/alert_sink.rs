use std::time::Duration;

use remediation_core::sanitize::MonitorAlertPayload;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Downstream sink for sanitized alerts.
pub trait AlertSink {
    fn deliver(&self, payload: &MonitorAlertPayload) -> Result<(), String>;
}

/// Thin HTTP client for the monitoring endpoint. Posts once; never retries.
pub struct HttpAlertSink {
    client: reqwest::Client,
    endpoint: String,
    auth_token: String,
}

impl HttpAlertSink {
    /// Create a sink for the given monitoring host (e.g. `monitor.example.com`).
    pub fn new(host: &str, auth_token: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("failed to build alert sink client");
        Self {
            client,
            endpoint: format!("https://{}/api/alert", host.trim_matches('/')),
            auth_token: auth_token.to_string(),
        }
    }
}

impl AlertSink for HttpAlertSink {
    fn deliver(&self, payload: &MonitorAlertPayload) -> Result<(), String> {
        let request = self
            .client
            .post(&self.endpoint)
            .header("authorization", format!("Basic {}", self.auth_token))
            .json(payload);

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                let response = request
                    .send()
                    .await
                    .map_err(|error| format!("failed to post alert: {error}"))?;

                let status = response.status();
                if !status.is_success() {
                    return Err(format!("monitoring endpoint rejected alert: {status}"));
                }
                Ok(())
            })
        })
    }
}
