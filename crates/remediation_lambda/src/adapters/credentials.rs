use remediation_core::contract::DelegatedSession;

/// Fixed remediation role every onboarded account carries. The calling
/// identity must be trusted by this role for delegation to succeed.
pub const REMEDIATION_ROLE_NAME: &str = "Vpc_Term_Role";
pub const ROLE_SESSION_NAME: &str = "VpcTeardown";

/// Obtains temporary account-scoped credentials for one remediation record.
pub trait CredentialBroker {
    fn assume_remediation_role(&self, account_id: &str) -> Result<DelegatedSession, String>;
}

pub fn remediation_role_arn(account_id: &str) -> String {
    format!("arn:aws:iam::{account_id}:role/{REMEDIATION_ROLE_NAME}")
}

pub struct StsCredentialBroker {
    sts_client: aws_sdk_sts::Client,
}

impl StsCredentialBroker {
    pub fn new(sts_client: aws_sdk_sts::Client) -> Self {
        Self { sts_client }
    }
}

impl CredentialBroker for StsCredentialBroker {
    fn assume_remediation_role(&self, account_id: &str) -> Result<DelegatedSession, String> {
        let client = self.sts_client.clone();
        let role_arn = remediation_role_arn(account_id);

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                let response = client
                    .assume_role()
                    .role_arn(&role_arn)
                    .role_session_name(ROLE_SESSION_NAME)
                    .send()
                    .await
                    .map_err(|error| format!("failed to assume {role_arn}: {error}"))?;

                let credentials = response
                    .credentials()
                    .ok_or_else(|| format!("assume-role for {role_arn} returned no credentials"))?;

                Ok(DelegatedSession {
                    access_key_id: credentials.access_key_id().to_string(),
                    secret_access_key: credentials.secret_access_key().to_string(),
                    session_token: credentials.session_token().to_string(),
                    expiry: chrono::DateTime::from_timestamp(credentials.expiration().secs(), 0)
                        .map(|expiry| expiry.to_rfc3339())
                        .unwrap_or_default(),
                })
            })
        })
    }
}
