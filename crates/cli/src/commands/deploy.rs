//! Submit a deployment to the daemon

use crate::client::{ApiClient, DeployResponse};
use crate::output::{self, OutputFormat};
use anyhow::Result;
use fleet_lib::DeploymentRequest;
use serde::Serialize;
use tabled::Tabled;

#[derive(Tabled, Serialize)]
struct ReplicaRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "DESTINATION")]
    destination: String,
}

#[derive(Tabled, Serialize)]
struct RuleRow {
    #[tabled(rename = "ORDER")]
    order: usize,
    #[tabled(rename = "PROBABILITY")]
    probability: String,
    #[tabled(rename = "DESTINATION")]
    destination: String,
}

/// Build the wire request; the daemon validates it
pub fn build_request(
    name: String,
    image: String,
    host_port: u16,
    port_space: u16,
    replicas: u32,
) -> DeploymentRequest {
    DeploymentRequest {
        host_port: host_port.to_string(),
        container_port_space: i64::from(port_space),
        image,
        replicas: i64::from(replicas),
        name,
    }
}

pub async fn deploy(
    client: &ApiClient,
    request: DeploymentRequest,
    format: OutputFormat,
) -> Result<()> {
    let response: DeployResponse = client.post("/deploy", &request).await?;

    if format == OutputFormat::Json {
        output::print_json(&response);
        return Ok(());
    }

    output::print_success(&response.message);

    let replicas: Vec<ReplicaRow> = response
        .replicas
        .iter()
        .map(|r| ReplicaRow {
            index: r.index,
            name: r.name.clone(),
            id: r.id.chars().take(12).collect(),
            destination: r.destination(),
        })
        .collect();
    output::print_table(&replicas, format);

    if response.rules.is_empty() {
        output::print_info("Single replica, no redirection rules installed");
        return Ok(());
    }

    let rules: Vec<RuleRow> = response
        .rules
        .iter()
        .enumerate()
        .map(|(order, rule)| RuleRow {
            order,
            probability: rule.probability_arg().unwrap_or_else(|| "-".to_string()),
            destination: rule.destination.clone(),
        })
        .collect();
    output::print_table(&rules, format);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_request_stringifies_host_port() {
        let request = build_request("svc".into(), "demo".into(), 8080, 9000, 3);

        assert_eq!(request.host_port, "8080");
        assert_eq!(request.container_port_space, 9000);
        assert_eq!(request.replicas, 3);

        let spec = fleet_lib::DeploymentSpec::try_from(request).unwrap();
        assert_eq!(spec.replica_name(2), "svc-02");
    }
}
