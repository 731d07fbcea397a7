use remediation_core::contract::{
    parse_record, BatchResponse, RemediationError, RemediationRecord, TeardownOutcome,
    TeardownResult, ValidationError,
};
use serde_json::{json, Value};

use crate::adapters::credentials::CredentialBroker;
use crate::adapters::network::NetworkClientFactory;
use crate::handlers::teardown::{discover_resources, execute_teardown};

pub const DEFAULT_PROTECTED_REGION: &str = "us-east-1";

/// Invocation-scoped configuration for the batch processor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchConfig {
    /// Home region exempt from automated teardown.
    pub protected_region: String,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            protected_region: DEFAULT_PROTECTED_REGION.to_string(),
        }
    }
}

/// Process one queue-delivered batch of remediation records. Records are
/// handled strictly in order and in isolation: one record's failure becomes
/// its `Failed` entry and never aborts the rest of the batch.
pub fn process_batch(
    event: &Value,
    config: &BatchConfig,
    broker: &dyn CredentialBroker,
    networks: &dyn NetworkClientFactory,
) -> Result<BatchResponse, ValidationError> {
    let records = event
        .get("Records")
        .and_then(Value::as_array)
        .ok_or_else(|| ValidationError::new("remediation event must include a Records array"))?;

    log_batch_info("batch_started", json!({ "records": records.len() }));

    let mut results = Vec::with_capacity(records.len());
    for record in records {
        let result = match record.get("body").and_then(Value::as_str) {
            Some(body) => process_record_body(body, config, broker, networks),
            None => failed_result(
                None,
                &RemediationError::Validation(ValidationError::new(
                    "queue record body must be a string",
                )),
            ),
        };
        results.push(result);
    }

    let response = BatchResponse::from_results(results);
    log_batch_info(
        "batch_completed",
        json!({
            "records_processed": response.records_processed,
            "succeeded": response.succeeded,
            "skipped": response.skipped,
            "failed": response.failed,
        }),
    );
    Ok(response)
}

fn process_record_body(
    body: &str,
    config: &BatchConfig,
    broker: &dyn CredentialBroker,
    networks: &dyn NetworkClientFactory,
) -> TeardownResult {
    let record = match parse_record(body) {
        Ok(record) => record,
        Err(error) => {
            return failed_result(None, &RemediationError::Validation(error));
        }
    };

    log_batch_info(
        "record_started",
        json!({
            "network_id": record.network_id.clone(),
            "account_id": record.account_id.clone(),
            "region": record.region.clone(),
        }),
    );

    match remediate_record(&record, config, broker, networks) {
        Ok(outcome) => {
            log_batch_info(
                "record_finished",
                json!({
                    "network_id": record.network_id.clone(),
                    "outcome": match &outcome {
                        TeardownOutcome::Success => "success",
                        TeardownOutcome::Skipped { .. } => "skipped",
                        TeardownOutcome::Failed { .. } => "failed",
                    },
                }),
            );
            TeardownResult {
                network_id: Some(record.network_id),
                outcome,
            }
        }
        Err(error) => failed_result(Some(record.network_id), &error),
    }
}

/// Run the credential → inventory → sequencer pipeline for a single record.
/// The delegated session lives exactly as long as this call.
fn remediate_record(
    record: &RemediationRecord,
    config: &BatchConfig,
    broker: &dyn CredentialBroker,
    networks: &dyn NetworkClientFactory,
) -> Result<TeardownOutcome, RemediationError> {
    if record.region == config.protected_region {
        return Ok(TeardownOutcome::skipped("protected region"));
    }

    let session = broker
        .assume_remediation_role(&record.account_id)
        .map_err(|message| RemediationError::Authorization { message })?;

    let ops = networks
        .connect(&session, &record.region)
        .map_err(|message| RemediationError::Query { message })?;

    let exists = ops
        .network_exists(&record.network_id)
        .map_err(|error| RemediationError::Query {
            message: error.to_string(),
        })?;
    if !exists {
        return Ok(TeardownOutcome::skipped("network not found"));
    }

    let resources =
        discover_resources(ops.as_ref(), &record.network_id).map_err(|error| {
            RemediationError::Query {
                message: error.to_string(),
            }
        })?;

    execute_teardown(ops.as_ref(), &record.network_id, &resources)?;
    Ok(TeardownOutcome::Success)
}

fn failed_result(network_id: Option<String>, error: &RemediationError) -> TeardownResult {
    log_batch_error(
        "record_failed",
        json!({
            "network_id": network_id.clone(),
            "error": error.to_string(),
        }),
    );
    TeardownResult {
        network_id,
        outcome: TeardownOutcome::Failed {
            error: error.to_string(),
        },
    }
}

fn log_batch_info(event: &str, details: Value) {
    eprintln!(
        "{}",
        json!({
            "component": "batch_processor",
            "event": event,
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "details": details,
        })
    );
}

fn log_batch_error(event: &str, details: Value) {
    eprintln!(
        "{}",
        json!({
            "component": "batch_processor",
            "level": "error",
            "event": event,
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "details": details,
        })
    );
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use remediation_core::contract::{
        DelegatedSession, InternetGatewayInfo, ProviderError, SecurityGroupInfo,
    };

    use crate::adapters::network::NetworkOps;

    use super::*;

    #[derive(Default)]
    struct ProviderCallLog {
        connects: usize,
        deletes: Vec<String>,
    }

    struct StubNetwork {
        network_present: bool,
        log: Arc<Mutex<ProviderCallLog>>,
    }

    impl NetworkOps for StubNetwork {
        fn network_exists(&self, _network_id: &str) -> Result<bool, ProviderError> {
            Ok(self.network_present)
        }

        fn instances_in_network(&self, _network_id: &str) -> Result<Vec<String>, ProviderError> {
            Ok(Vec::new())
        }

        fn terminate_instances(&self, _instance_ids: &[String]) -> Result<(), ProviderError> {
            Ok(())
        }

        fn internet_gateways_attached_to(
            &self,
            _network_id: &str,
        ) -> Result<Vec<InternetGatewayInfo>, ProviderError> {
            Ok(Vec::new())
        }

        fn detach_internet_gateway(
            &self,
            _gateway_id: &str,
            _network_id: &str,
        ) -> Result<(), ProviderError> {
            Ok(())
        }

        fn delete_internet_gateway(&self, _gateway_id: &str) -> Result<(), ProviderError> {
            Ok(())
        }

        fn subnets_in_network(&self, _network_id: &str) -> Result<Vec<String>, ProviderError> {
            Ok(Vec::new())
        }

        fn delete_subnet(&self, _subnet_id: &str) -> Result<(), ProviderError> {
            Ok(())
        }

        fn security_groups_in_network(
            &self,
            _network_id: &str,
        ) -> Result<Vec<SecurityGroupInfo>, ProviderError> {
            Ok(Vec::new())
        }

        fn delete_security_group(&self, _group_id: &str) -> Result<(), ProviderError> {
            Ok(())
        }

        fn delete_network(&self, network_id: &str) -> Result<(), ProviderError> {
            self.log
                .lock()
                .expect("poisoned mutex")
                .deletes
                .push(network_id.to_string());
            Ok(())
        }
    }

    struct StubFactory {
        network_present: bool,
        log: Arc<Mutex<ProviderCallLog>>,
    }

    impl StubFactory {
        fn new() -> Self {
            Self {
                network_present: true,
                log: Arc::new(Mutex::new(ProviderCallLog::default())),
            }
        }

        fn connects(&self) -> usize {
            self.log.lock().expect("poisoned mutex").connects
        }

        fn deleted_networks(&self) -> Vec<String> {
            self.log.lock().expect("poisoned mutex").deletes.clone()
        }
    }

    impl NetworkClientFactory for StubFactory {
        fn connect(
            &self,
            _session: &DelegatedSession,
            _region: &str,
        ) -> Result<Box<dyn NetworkOps>, String> {
            self.log.lock().expect("poisoned mutex").connects += 1;
            Ok(Box::new(StubNetwork {
                network_present: self.network_present,
                log: Arc::clone(&self.log),
            }))
        }
    }

    struct StubBroker {
        denied_account: Option<String>,
        assumed: Mutex<Vec<String>>,
    }

    impl StubBroker {
        fn new() -> Self {
            Self {
                denied_account: None,
                assumed: Mutex::new(Vec::new()),
            }
        }

        fn denying(account_id: &str) -> Self {
            Self {
                denied_account: Some(account_id.to_string()),
                assumed: Mutex::new(Vec::new()),
            }
        }

        fn assumed(&self) -> Vec<String> {
            self.assumed.lock().expect("poisoned mutex").clone()
        }
    }

    impl CredentialBroker for StubBroker {
        fn assume_remediation_role(&self, account_id: &str) -> Result<DelegatedSession, String> {
            self.assumed
                .lock()
                .expect("poisoned mutex")
                .push(account_id.to_string());
            if self.denied_account.as_deref() == Some(account_id) {
                return Err(format!("account {account_id} does not trust the caller"));
            }
            Ok(DelegatedSession {
                access_key_id: "AKIDEXAMPLE".to_string(),
                secret_access_key: "secret".to_string(),
                session_token: "token".to_string(),
                expiry: "2026-01-01T00:00:00+00:00".to_string(),
            })
        }
    }

    fn record_body(network_id: &str, account_id: &str, region: &str) -> String {
        json!({
            "resource": {
                "data": { "vpcId": network_id },
                "accountId": account_id
            },
            "resourceRegionId": region
        })
        .to_string()
    }

    fn queue_event(bodies: &[String]) -> Value {
        json!({
            "Records": bodies
                .iter()
                .map(|body| json!({ "eventSource": "aws:sqs", "body": body }))
                .collect::<Vec<_>>()
        })
    }

    #[test]
    fn protected_region_records_skip_without_provider_calls() {
        let broker = StubBroker::new();
        let factory = StubFactory::new();
        let event = queue_event(&[record_body("vpc-1", "111122223333", "us-east-1")]);

        let response = process_batch(&event, &BatchConfig::default(), &broker, &factory)
            .expect("batch should complete");

        assert_eq!(response.skipped, 1);
        assert_eq!(
            response.results[0].outcome,
            TeardownOutcome::skipped("protected region")
        );
        assert!(broker.assumed().is_empty());
        assert_eq!(factory.connects(), 0);
    }

    #[test]
    fn one_failing_record_does_not_abort_the_batch() {
        let broker = StubBroker::denying("222233334444");
        let factory = StubFactory::new();
        let event = queue_event(&[
            record_body("vpc-1", "111122223333", "eu-west-1"),
            record_body("vpc-2", "222233334444", "eu-west-1"),
            record_body("vpc-3", "333344445555", "eu-west-1"),
        ]);

        let response = process_batch(&event, &BatchConfig::default(), &broker, &factory)
            .expect("batch should complete");

        assert_eq!(response.records_processed, 3);
        assert_eq!(response.succeeded, 2);
        assert_eq!(response.failed, 1);
        assert!(response.results[0].outcome.is_success());
        assert!(response.results[1].outcome.is_failed());
        assert!(response.results[2].outcome.is_success());
        assert_eq!(
            response.results[1].network_id.as_deref(),
            Some("vpc-2")
        );
        assert_eq!(factory.deleted_networks(), vec!["vpc-1", "vpc-3"]);
    }

    #[test]
    fn malformed_record_is_failed_and_the_batch_continues() {
        let broker = StubBroker::new();
        let factory = StubFactory::new();
        let event = queue_event(&[
            "not json".to_string(),
            record_body("vpc-2", "111122223333", "eu-west-1"),
        ]);

        let response = process_batch(&event, &BatchConfig::default(), &broker, &factory)
            .expect("batch should complete");

        assert!(response.results[0].outcome.is_failed());
        assert_eq!(response.results[0].network_id, None);
        assert!(response.results[1].outcome.is_success());
    }

    #[test]
    fn record_without_string_body_is_failed() {
        let broker = StubBroker::new();
        let factory = StubFactory::new();
        let event = json!({
            "Records": [{ "eventSource": "aws:sqs", "body": 42 }]
        });

        let response = process_batch(&event, &BatchConfig::default(), &broker, &factory)
            .expect("batch should complete");

        assert_eq!(response.failed, 1);
        assert!(response.results[0].outcome.is_failed());
    }

    #[test]
    fn absent_network_is_skipped_not_failed() {
        let broker = StubBroker::new();
        let mut factory = StubFactory::new();
        factory.network_present = false;
        let event = queue_event(&[record_body("vpc-gone", "111122223333", "eu-west-1")]);

        let response = process_batch(&event, &BatchConfig::default(), &broker, &factory)
            .expect("batch should complete");

        assert_eq!(
            response.results[0].outcome,
            TeardownOutcome::skipped("network not found")
        );
        assert!(factory.deleted_networks().is_empty());
    }

    #[test]
    fn event_without_records_array_is_rejected() {
        let broker = StubBroker::new();
        let factory = StubFactory::new();

        let error = process_batch(&json!({}), &BatchConfig::default(), &broker, &factory)
            .expect_err("event should be rejected");
        assert_eq!(
            error.message(),
            "remediation event must include a Records array"
        );
    }
}
