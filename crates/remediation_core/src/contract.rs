use serde::{Deserialize, Serialize};

/// Security group name the provider assigns to every network's default group.
/// Default groups are never part of a teardown set.
pub const DEFAULT_SECURITY_GROUP_NAME: &str = "default";

/// Inbound queue-record body, as produced by the alerting pipeline.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AlertRecordBody {
    pub resource: AlertResource,
    #[serde(rename = "resourceRegionId")]
    pub resource_region_id: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AlertResource {
    pub data: AlertResourceData,
    #[serde(rename = "accountId")]
    pub account_id: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AlertResourceData {
    #[serde(rename = "vpcId")]
    pub vpc_id: String,
}

/// One teardown target: a network in a region, owned by an account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RemediationRecord {
    pub network_id: String,
    pub account_id: String,
    pub region: String,
}

/// Temporary delegated credentials scoped to one account. Owned by the
/// processing of a single record and discarded afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelegatedSession {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
    pub expiry: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternetGatewayInfo {
    pub gateway_id: String,
    pub attached_network_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityGroupInfo {
    pub group_id: String,
    pub group_name: String,
}

/// Snapshot of everything attached to a network at discovery time. Deletions
/// operate from this snapshot; nothing is re-queried mid-sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceSet {
    pub instance_ids: Vec<String>,
    pub internet_gateways: Vec<InternetGatewayInfo>,
    pub subnet_ids: Vec<String>,
    pub security_groups: Vec<SecurityGroupInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TeardownOutcome {
    Success,
    Skipped { reason: String },
    Failed { error: String },
}

impl TeardownOutcome {
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped {
            reason: reason.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Per-record outcome. `network_id` is absent when the record body never
/// parsed far enough to name one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TeardownResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_id: Option<String>,
    #[serde(flatten)]
    pub outcome: TeardownOutcome,
}

/// Aggregate response for one batch invocation, preserving input order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BatchResponse {
    pub records_processed: usize,
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
    pub results: Vec<TeardownResult>,
}

impl BatchResponse {
    pub fn from_results(results: Vec<TeardownResult>) -> Self {
        let succeeded = results
            .iter()
            .filter(|result| result.outcome.is_success())
            .count();
        let skipped = results
            .iter()
            .filter(|result| result.outcome.is_skipped())
            .count();
        let failed = results
            .iter()
            .filter(|result| result.outcome.is_failed())
            .count();
        Self {
            records_processed: results.len(),
            succeeded,
            skipped,
            failed,
            results,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Tagged provider-call failure. A resource that is already gone is
/// distinguished from a genuine API failure so that retried records converge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    NotFound { resource_id: String },
    Api { message: String },
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { resource_id } => {
                write!(f, "resource {resource_id} not found")
            }
            Self::Api { message } => f.write_str(message),
        }
    }
}

impl std::error::Error for ProviderError {}

/// Steps of the teardown sequence, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeardownStep {
    TerminateInstances,
    DetachInternetGateway,
    DeleteInternetGateway,
    DeleteSubnet,
    DeleteSecurityGroup,
    DeleteNetwork,
}

impl TeardownStep {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TerminateInstances => "terminate_instances",
            Self::DetachInternetGateway => "detach_internet_gateway",
            Self::DeleteInternetGateway => "delete_internet_gateway",
            Self::DeleteSubnet => "delete_subnet",
            Self::DeleteSecurityGroup => "delete_security_group",
            Self::DeleteNetwork => "delete_network",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeardownError {
    pub step: TeardownStep,
    pub resource_id: String,
    pub cause: String,
}

impl std::fmt::Display for TeardownError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} failed for {}: {}",
            self.step.as_str(),
            self.resource_id,
            self.cause
        )
    }
}

impl std::error::Error for TeardownError {}

/// Roll-up of everything that can fail while processing one record. Each
/// variant aborts only the record it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemediationError {
    Validation(ValidationError),
    Authorization { message: String },
    Query { message: String },
    Teardown(TeardownError),
}

impl std::fmt::Display for RemediationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(error) => write!(f, "invalid record: {error}"),
            Self::Authorization { message } => {
                write!(f, "role delegation failed: {message}")
            }
            Self::Query { message } => {
                write!(f, "resource discovery failed: {message}")
            }
            Self::Teardown(error) => write!(f, "{error}"),
        }
    }
}

impl std::error::Error for RemediationError {}

impl From<ValidationError> for RemediationError {
    fn from(error: ValidationError) -> Self {
        Self::Validation(error)
    }
}

impl From<TeardownError> for RemediationError {
    fn from(error: TeardownError) -> Self {
        Self::Teardown(error)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertDeliveryError {
    message: String,
}

impl AlertDeliveryError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for AlertDeliveryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for AlertDeliveryError {}

/// Parse and normalize one queue-record body into a teardown target.
pub fn parse_record(body: &str) -> Result<RemediationRecord, ValidationError> {
    let record: AlertRecordBody = serde_json::from_str(body)
        .map_err(|error| ValidationError::new(format!("malformed remediation record: {error}")))?;
    normalize_record(record)
}

pub fn normalize_record(body: AlertRecordBody) -> Result<RemediationRecord, ValidationError> {
    let network_id = body.resource.data.vpc_id.trim().to_string();
    if network_id.is_empty() {
        return Err(ValidationError::new("resource.data.vpcId cannot be empty"));
    }

    let account_id = body.resource.account_id.trim().to_string();
    if account_id.is_empty() {
        return Err(ValidationError::new("resource.accountId cannot be empty"));
    }

    let region = body.resource_region_id.trim().to_string();
    if region.is_empty() {
        return Err(ValidationError::new("resourceRegionId cannot be empty"));
    }

    Ok(RemediationRecord {
        network_id,
        account_id,
        region,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_record_extracts_network_account_and_region() {
        let body = r#"{
            "resource": {
                "data": { "vpcId": "vpc-0a1b2c3d" },
                "accountId": "111122223333"
            },
            "resourceRegionId": "eu-west-1"
        }"#;

        let record = parse_record(body).expect("record should parse");
        assert_eq!(record.network_id, "vpc-0a1b2c3d");
        assert_eq!(record.account_id, "111122223333");
        assert_eq!(record.region, "eu-west-1");
    }

    #[test]
    fn parse_record_tolerates_extra_alert_fields() {
        let body = r#"{
            "policyName": "AWS VPC not in use",
            "severity": "high",
            "resource": {
                "data": { "vpcId": "vpc-1", "isDefault": false },
                "accountId": "111122223333",
                "regionId": "eu-west-1"
            },
            "resourceRegionId": "eu-west-1"
        }"#;

        let record = parse_record(body).expect("record should parse");
        assert_eq!(record.network_id, "vpc-1");
    }

    #[test]
    fn normalize_record_rejects_blank_network_id() {
        let body = AlertRecordBody {
            resource: AlertResource {
                data: AlertResourceData {
                    vpc_id: "   ".to_string(),
                },
                account_id: "111122223333".to_string(),
            },
            resource_region_id: "eu-west-1".to_string(),
        };

        let error = normalize_record(body).expect_err("record should fail");
        assert_eq!(error.message(), "resource.data.vpcId cannot be empty");
    }

    #[test]
    fn normalize_record_trims_whitespace() {
        let body = AlertRecordBody {
            resource: AlertResource {
                data: AlertResourceData {
                    vpc_id: " vpc-1 ".to_string(),
                },
                account_id: " 111122223333 ".to_string(),
            },
            resource_region_id: " eu-west-1 ".to_string(),
        };

        let record = normalize_record(body).expect("record should pass");
        assert_eq!(record.network_id, "vpc-1");
        assert_eq!(record.account_id, "111122223333");
        assert_eq!(record.region, "eu-west-1");
    }

    #[test]
    fn parse_record_rejects_missing_account() {
        let body = r#"{
            "resource": { "data": { "vpcId": "vpc-1" } },
            "resourceRegionId": "eu-west-1"
        }"#;

        let error = parse_record(body).expect_err("record should fail");
        assert!(error.message().contains("malformed remediation record"));
    }

    #[test]
    fn outcome_serializes_with_tag_and_reason() {
        let result = TeardownResult {
            network_id: Some("vpc-1".to_string()),
            outcome: TeardownOutcome::skipped("protected region"),
        };

        let value = serde_json::to_value(&result).expect("result should serialize");
        assert_eq!(value["network_id"], "vpc-1");
        assert_eq!(value["outcome"], "skipped");
        assert_eq!(value["reason"], "protected region");
    }

    #[test]
    fn batch_response_counts_outcomes() {
        let response = BatchResponse::from_results(vec![
            TeardownResult {
                network_id: Some("vpc-1".to_string()),
                outcome: TeardownOutcome::Success,
            },
            TeardownResult {
                network_id: Some("vpc-2".to_string()),
                outcome: TeardownOutcome::skipped("protected region"),
            },
            TeardownResult {
                network_id: None,
                outcome: TeardownOutcome::Failed {
                    error: "invalid record".to_string(),
                },
            },
        ]);

        assert_eq!(response.records_processed, 3);
        assert_eq!(response.succeeded, 1);
        assert_eq!(response.skipped, 1);
        assert_eq!(response.failed, 1);
    }
}
