use aws_sdk_ec2::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_ec2::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_ec2::types::Filter;
use remediation_core::contract::{
    DelegatedSession, InternetGatewayInfo, ProviderError, SecurityGroupInfo,
};

/// Provider operations scoped to one account and region. One instance is
/// constructed per record from that record's delegated session and discarded
/// with it; handles are never shared across accounts.
pub trait NetworkOps {
    fn network_exists(&self, network_id: &str) -> Result<bool, ProviderError>;
    fn instances_in_network(&self, network_id: &str) -> Result<Vec<String>, ProviderError>;
    fn terminate_instances(&self, instance_ids: &[String]) -> Result<(), ProviderError>;
    fn internet_gateways_attached_to(
        &self,
        network_id: &str,
    ) -> Result<Vec<InternetGatewayInfo>, ProviderError>;
    fn detach_internet_gateway(
        &self,
        gateway_id: &str,
        network_id: &str,
    ) -> Result<(), ProviderError>;
    fn delete_internet_gateway(&self, gateway_id: &str) -> Result<(), ProviderError>;
    fn subnets_in_network(&self, network_id: &str) -> Result<Vec<String>, ProviderError>;
    fn delete_subnet(&self, subnet_id: &str) -> Result<(), ProviderError>;
    fn security_groups_in_network(
        &self,
        network_id: &str,
    ) -> Result<Vec<SecurityGroupInfo>, ProviderError>;
    fn delete_security_group(&self, group_id: &str) -> Result<(), ProviderError>;
    fn delete_network(&self, network_id: &str) -> Result<(), ProviderError>;
}

/// Builds a per-record provider client from a delegated session.
pub trait NetworkClientFactory {
    fn connect(
        &self,
        session: &DelegatedSession,
        region: &str,
    ) -> Result<Box<dyn NetworkOps>, String>;
}

pub struct Ec2NetworkClient {
    client: aws_sdk_ec2::Client,
}

impl Ec2NetworkClient {
    pub fn new(client: aws_sdk_ec2::Client) -> Self {
        Self { client }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Ec2NetworkClientFactory;

impl NetworkClientFactory for Ec2NetworkClientFactory {
    fn connect(
        &self,
        session: &DelegatedSession,
        region: &str,
    ) -> Result<Box<dyn NetworkOps>, String> {
        let credentials = Credentials::new(
            session.access_key_id.clone(),
            session.secret_access_key.clone(),
            Some(session.session_token.clone()),
            None,
            "delegated-remediation",
        );
        let config = aws_sdk_ec2::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .credentials_provider(credentials)
            .build();

        Ok(Box::new(Ec2NetworkClient::new(
            aws_sdk_ec2::Client::from_conf(config),
        )))
    }
}

fn block_on<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}

fn network_filter(network_id: &str) -> Filter {
    Filter::builder().name("vpc-id").values(network_id).build()
}

fn classify_ec2_error<E, R>(
    context: &str,
    resource_id: &str,
    error: &SdkError<E, R>,
) -> ProviderError
where
    SdkError<E, R>: ProvideErrorMetadata + std::fmt::Display,
{
    let code = error.code().unwrap_or_default();
    if code.contains("NotFound") {
        return ProviderError::NotFound {
            resource_id: resource_id.to_string(),
        };
    }

    let detail = error
        .message()
        .map(str::to_string)
        .unwrap_or_else(|| error.to_string());
    let message = if code.is_empty() {
        format!("{context} failed: {detail}")
    } else {
        format!("{context} failed ({code}): {detail}")
    };
    ProviderError::Api { message }
}

impl NetworkOps for Ec2NetworkClient {
    fn network_exists(&self, network_id: &str) -> Result<bool, ProviderError> {
        let client = self.client.clone();
        let network_id = network_id.to_string();

        block_on(async move {
            match client.describe_vpcs().vpc_ids(&network_id).send().await {
                Ok(response) => Ok(!response.vpcs().is_empty()),
                Err(error) => {
                    match classify_ec2_error("describe vpcs", &network_id, &error) {
                        ProviderError::NotFound { .. } => Ok(false),
                        other => Err(other),
                    }
                }
            }
        })
    }

    fn instances_in_network(&self, network_id: &str) -> Result<Vec<String>, ProviderError> {
        let client = self.client.clone();
        let network_id = network_id.to_string();

        block_on(async move {
            let mut instance_ids = Vec::new();
            let mut next_token: Option<String> = None;
            loop {
                let response = client
                    .describe_instances()
                    .filters(network_filter(&network_id))
                    .set_next_token(next_token)
                    .send()
                    .await
                    .map_err(|error| {
                        classify_ec2_error("describe instances", &network_id, &error)
                    })?;

                for reservation in response.reservations() {
                    for instance in reservation.instances() {
                        if let Some(instance_id) = instance.instance_id() {
                            instance_ids.push(instance_id.to_string());
                        }
                    }
                }

                next_token = response.next_token().map(str::to_string);
                if next_token.is_none() {
                    break;
                }
            }
            Ok(instance_ids)
        })
    }

    fn terminate_instances(&self, instance_ids: &[String]) -> Result<(), ProviderError> {
        let client = self.client.clone();
        let instance_ids = instance_ids.to_vec();

        block_on(async move {
            let joined = instance_ids.join(",");
            client
                .terminate_instances()
                .set_instance_ids(Some(instance_ids))
                .send()
                .await
                .map(|_| ())
                .map_err(|error| classify_ec2_error("terminate instances", &joined, &error))
        })
    }

    fn internet_gateways_attached_to(
        &self,
        network_id: &str,
    ) -> Result<Vec<InternetGatewayInfo>, ProviderError> {
        let client = self.client.clone();
        let network_id = network_id.to_string();

        block_on(async move {
            let mut gateways = Vec::new();
            let mut next_token: Option<String> = None;
            loop {
                let response = client
                    .describe_internet_gateways()
                    .filters(
                        Filter::builder()
                            .name("attachment.vpc-id")
                            .values(&network_id)
                            .build(),
                    )
                    .set_next_token(next_token)
                    .send()
                    .await
                    .map_err(|error| {
                        classify_ec2_error("describe internet gateways", &network_id, &error)
                    })?;

                for gateway in response.internet_gateways() {
                    let Some(gateway_id) = gateway.internet_gateway_id() else {
                        continue;
                    };
                    gateways.push(InternetGatewayInfo {
                        gateway_id: gateway_id.to_string(),
                        attached_network_ids: gateway
                            .attachments()
                            .iter()
                            .filter_map(|attachment| attachment.vpc_id().map(str::to_string))
                            .collect(),
                    });
                }

                next_token = response.next_token().map(str::to_string);
                if next_token.is_none() {
                    break;
                }
            }
            Ok(gateways)
        })
    }

    fn detach_internet_gateway(
        &self,
        gateway_id: &str,
        network_id: &str,
    ) -> Result<(), ProviderError> {
        let client = self.client.clone();
        let gateway_id = gateway_id.to_string();
        let network_id = network_id.to_string();

        block_on(async move {
            client
                .detach_internet_gateway()
                .internet_gateway_id(&gateway_id)
                .vpc_id(&network_id)
                .send()
                .await
                .map(|_| ())
                .map_err(|error| {
                    classify_ec2_error("detach internet gateway", &gateway_id, &error)
                })
        })
    }

    fn delete_internet_gateway(&self, gateway_id: &str) -> Result<(), ProviderError> {
        let client = self.client.clone();
        let gateway_id = gateway_id.to_string();

        block_on(async move {
            client
                .delete_internet_gateway()
                .internet_gateway_id(&gateway_id)
                .send()
                .await
                .map(|_| ())
                .map_err(|error| {
                    classify_ec2_error("delete internet gateway", &gateway_id, &error)
                })
        })
    }

    fn subnets_in_network(&self, network_id: &str) -> Result<Vec<String>, ProviderError> {
        let client = self.client.clone();
        let network_id = network_id.to_string();

        block_on(async move {
            let mut subnet_ids = Vec::new();
            let mut next_token: Option<String> = None;
            loop {
                let response = client
                    .describe_subnets()
                    .filters(network_filter(&network_id))
                    .set_next_token(next_token)
                    .send()
                    .await
                    .map_err(|error| classify_ec2_error("describe subnets", &network_id, &error))?;

                for subnet in response.subnets() {
                    if let Some(subnet_id) = subnet.subnet_id() {
                        subnet_ids.push(subnet_id.to_string());
                    }
                }

                next_token = response.next_token().map(str::to_string);
                if next_token.is_none() {
                    break;
                }
            }
            Ok(subnet_ids)
        })
    }

    fn delete_subnet(&self, subnet_id: &str) -> Result<(), ProviderError> {
        let client = self.client.clone();
        let subnet_id = subnet_id.to_string();

        block_on(async move {
            client
                .delete_subnet()
                .subnet_id(&subnet_id)
                .send()
                .await
                .map(|_| ())
                .map_err(|error| classify_ec2_error("delete subnet", &subnet_id, &error))
        })
    }

    fn security_groups_in_network(
        &self,
        network_id: &str,
    ) -> Result<Vec<SecurityGroupInfo>, ProviderError> {
        let client = self.client.clone();
        let network_id = network_id.to_string();

        block_on(async move {
            let mut groups = Vec::new();
            let mut next_token: Option<String> = None;
            loop {
                let response = client
                    .describe_security_groups()
                    .filters(network_filter(&network_id))
                    .set_next_token(next_token)
                    .send()
                    .await
                    .map_err(|error| {
                        classify_ec2_error("describe security groups", &network_id, &error)
                    })?;

                for group in response.security_groups() {
                    let Some(group_id) = group.group_id() else {
                        continue;
                    };
                    groups.push(SecurityGroupInfo {
                        group_id: group_id.to_string(),
                        group_name: group.group_name().unwrap_or_default().to_string(),
                    });
                }

                next_token = response.next_token().map(str::to_string);
                if next_token.is_none() {
                    break;
                }
            }
            Ok(groups)
        })
    }

    fn delete_security_group(&self, group_id: &str) -> Result<(), ProviderError> {
        let client = self.client.clone();
        let group_id = group_id.to_string();

        block_on(async move {
            client
                .delete_security_group()
                .group_id(&group_id)
                .send()
                .await
                .map(|_| ())
                .map_err(|error| classify_ec2_error("delete security group", &group_id, &error))
        })
    }

    fn delete_network(&self, network_id: &str) -> Result<(), ProviderError> {
        let client = self.client.clone();
        let network_id = network_id.to_string();

        block_on(async move {
            client
                .delete_vpc()
                .vpc_id(&network_id)
                .send()
                .await
                .map(|_| ())
                .map_err(|error| classify_ec2_error("delete vpc", &network_id, &error))
        })
    }
}
