use lambda_runtime::{service_fn, Error, LambdaEvent};
use remediation_lambda::adapters::alert_sink::HttpAlertSink;
use remediation_lambda::handlers::alert::{
    handle_alert_event, AlertForwardedResponse, AlertForwarderConfig,
};
use serde_json::Value;

async fn handle_request(event: LambdaEvent<Value>) -> Result<AlertForwardedResponse, Error> {
    let device_id = std::env::var("ALERT_DEVICE_ID")
        .map_err(|_| Error::from("ALERT_DEVICE_ID must be configured"))?;
    let auth_token =
        std::env::var("ALERT_AUTH").map_err(|_| Error::from("ALERT_AUTH must be configured"))?;
    let host =
        std::env::var("ALERT_HOST").map_err(|_| Error::from("ALERT_HOST must be configured"))?;

    let sink = HttpAlertSink::new(&host, &auth_token);
    let config = AlertForwarderConfig { device_id };

    handle_alert_event(&event.payload, &config, &sink)
        .map_err(|error| Error::from(error.message().to_string()))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    lambda_runtime::run(service_fn(handle_request)).await
}
