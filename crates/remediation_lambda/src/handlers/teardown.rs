use serde_json::json;

use crate::adapters::network::NetworkOps;
use crate::runtime::contract::{
    ProviderError, ResourceSet, TeardownError, TeardownStep, DEFAULT_SECURITY_GROUP_NAME,
};

/// Build the teardown snapshot for a network: every instance, internet
/// gateway, subnet, and non-default security group attached to it. Each
/// underlying describe pages until the provider stops returning a
/// continuation token; a failure on any call fails the whole inventory.
pub fn discover_resources(
    ops: &dyn NetworkOps,
    network_id: &str,
) -> Result<ResourceSet, ProviderError> {
    let mut instance_ids = ops.instances_in_network(network_id)?;
    instance_ids.sort_unstable();
    instance_ids.dedup();

    let internet_gateways = ops.internet_gateways_attached_to(network_id)?;

    let mut subnet_ids = ops.subnets_in_network(network_id)?;
    subnet_ids.sort_unstable();
    subnet_ids.dedup();

    let security_groups = ops
        .security_groups_in_network(network_id)?
        .into_iter()
        .filter(|group| group.group_name != DEFAULT_SECURITY_GROUP_NAME)
        .collect();

    let resources = ResourceSet {
        instance_ids,
        internet_gateways,
        subnet_ids,
        security_groups,
    };

    log_teardown_info(
        "resources_discovered",
        json!({
            "network_id": network_id,
            "instances": resources.instance_ids.len(),
            "internet_gateways": resources.internet_gateways.len(),
            "subnets": resources.subnet_ids.len(),
            "security_groups": resources.security_groups.len(),
        }),
    );

    Ok(resources)
}

/// Delete everything in the snapshot, then the network itself, in the order
/// the provider's dependency constraints require. A resource that is already
/// gone counts as done for that step; any other failure aborts the sequence.
pub fn execute_teardown(
    ops: &dyn NetworkOps,
    network_id: &str,
    resources: &ResourceSet,
) -> Result<(), TeardownError> {
    if !resources.instance_ids.is_empty() {
        // Termination is requested, not awaited; a later step can race an
        // instance that is still shutting down.
        absorb_absent(
            ops.terminate_instances(&resources.instance_ids),
            TeardownStep::TerminateInstances,
            &resources.instance_ids.join(","),
        )?;
        log_teardown_info(
            "instances_terminating",
            json!({
                "network_id": network_id,
                "count": resources.instance_ids.len(),
            }),
        );
    }

    for gateway in &resources.internet_gateways {
        for attached_network in &gateway.attached_network_ids {
            absorb_absent(
                ops.detach_internet_gateway(&gateway.gateway_id, attached_network),
                TeardownStep::DetachInternetGateway,
                &gateway.gateway_id,
            )?;
        }
        absorb_absent(
            ops.delete_internet_gateway(&gateway.gateway_id),
            TeardownStep::DeleteInternetGateway,
            &gateway.gateway_id,
        )?;
    }

    for subnet_id in &resources.subnet_ids {
        absorb_absent(
            ops.delete_subnet(subnet_id),
            TeardownStep::DeleteSubnet,
            subnet_id,
        )?;
    }

    for group in &resources.security_groups {
        // Inventory already excludes the default group; never delete it even
        // if a snapshot was built elsewhere.
        if group.group_name == DEFAULT_SECURITY_GROUP_NAME {
            continue;
        }
        absorb_absent(
            ops.delete_security_group(&group.group_id),
            TeardownStep::DeleteSecurityGroup,
            &group.group_id,
        )?;
    }

    absorb_absent(
        ops.delete_network(network_id),
        TeardownStep::DeleteNetwork,
        network_id,
    )?;

    log_teardown_info("network_deleted", json!({ "network_id": network_id }));
    Ok(())
}

fn absorb_absent(
    result: Result<(), ProviderError>,
    step: TeardownStep,
    resource_id: &str,
) -> Result<(), TeardownError> {
    match result {
        Ok(()) => Ok(()),
        Err(ProviderError::NotFound { resource_id }) => {
            log_teardown_info(
                "resource_already_absent",
                json!({
                    "step": step.as_str(),
                    "resource_id": resource_id,
                }),
            );
            Ok(())
        }
        Err(ProviderError::Api { message }) => Err(TeardownError {
            step,
            resource_id: resource_id.to_string(),
            cause: message,
        }),
    }
}

fn log_teardown_info(event: &str, details: serde_json::Value) {
    eprintln!(
        "{}",
        json!({
            "component": "teardown_sequencer",
            "event": event,
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "details": details,
        })
    );
}
