use lambda_runtime::{service_fn, Error, LambdaEvent};
use remediation_lambda::adapters::credentials::StsCredentialBroker;
use remediation_lambda::adapters::network::Ec2NetworkClientFactory;
use remediation_lambda::handlers::batch::{process_batch, BatchConfig, DEFAULT_PROTECTED_REGION};
use serde_json::Value;

async fn handle_request(event: LambdaEvent<Value>) -> Result<Value, Error> {
    let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let broker = StsCredentialBroker::new(aws_sdk_sts::Client::new(&aws_config));
    let factory = Ec2NetworkClientFactory;

    let config = BatchConfig {
        protected_region: std::env::var("PROTECTED_REGION")
            .unwrap_or_else(|_| DEFAULT_PROTECTED_REGION.to_string()),
    };

    let response = process_batch(&event.payload, &config, &broker, &factory)
        .map_err(|error| Error::from(error.message().to_string()))?;

    serde_json::to_value(&response)
        .map_err(|error| Error::from(format!("failed to serialize batch response: {error}")))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    lambda_runtime::run(service_fn(handle_request)).await
}
