//! Core data models for fleet deployments

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::net::IpAddr;

/// Label key recording the owning fleet on every replica
pub const FLEET_LABEL: &str = "deployment";

/// Deployment request as decoded from the wire
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentRequest {
    pub host_port: String,
    pub container_port_space: i64,
    pub image: String,
    pub replicas: i64,
    pub name: String,
}

/// Validated description of a desired fleet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentSpec {
    pub image: String,
    pub host_port: u16,
    pub port_space: u16,
    pub replicas: usize,
    pub name: String,
}

impl TryFrom<DeploymentRequest> for DeploymentSpec {
    type Error = ValidationError;

    fn try_from(req: DeploymentRequest) -> Result<Self, Self::Error> {
        let image = req.image.trim().to_string();
        if image.is_empty() {
            return Err(ValidationError::EmptyImage);
        }

        let name = req.name.trim().to_string();
        if name.is_empty() {
            return Err(ValidationError::EmptyName);
        }

        let host_port = match req.host_port.trim().parse::<u16>() {
            Ok(port) if port > 0 => port,
            _ => return Err(ValidationError::InvalidHostPort(req.host_port)),
        };

        if req.replicas < 0 {
            return Err(ValidationError::NegativeReplicas(req.replicas));
        }
        let replicas = req.replicas as usize;

        let port_space = match u16::try_from(req.container_port_space) {
            Ok(port) if port > 0 => port,
            _ => return Err(ValidationError::InvalidPortSpace(req.container_port_space)),
        };

        // Highest assigned port must still be a valid TCP port
        if replicas > 0 {
            let highest = req.container_port_space.checked_add(req.replicas - 1);
            if highest.map_or(true, |port| port > i64::from(u16::MAX)) {
                return Err(ValidationError::PortSpaceOverflow {
                    port_space,
                    replicas,
                });
            }
        }

        Ok(Self {
            image,
            host_port,
            port_space,
            replicas,
            name,
        })
    }
}

impl DeploymentSpec {
    /// Name of the replica at `index`
    ///
    /// The index is zero-padded to at least two digits, widening as needed so
    /// that every name in the fleet is unique and sorts in index order.
    pub fn replica_name(&self, index: usize) -> String {
        let width = index_width(self.replicas);
        format!("{}-{:0width$}", self.name, index, width = width)
    }

    /// Host port assigned to the replica at `index`
    pub fn replica_port(&self, index: usize) -> u16 {
        // Range is checked during validation
        self.port_space + index as u16
    }

    /// Labels attached to every replica of this fleet
    pub fn labels(&self) -> HashMap<String, String> {
        HashMap::from([(FLEET_LABEL.to_string(), self.name.clone())])
    }
}

fn index_width(replicas: usize) -> usize {
    let highest = replicas.saturating_sub(1);
    let digits = highest.checked_ilog10().map(|d| d as usize + 1).unwrap_or(1);
    digits.max(2)
}

/// Everything the runtime needs to create one replica
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateInstance {
    pub name: String,
    pub image: String,
    /// Port the workload listens on inside the instance (tcp)
    pub exposed_port: u16,
    /// Host port bound to `exposed_port`
    pub host_port: u16,
    pub labels: HashMap<String, String>,
}

/// A running replica, created once start and inspect have succeeded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicaDescriptor {
    pub id: String,
    pub name: String,
    pub index: usize,
    pub port: u16,
    pub ip: IpAddr,
}

impl ReplicaDescriptor {
    /// Redirection target in `address:port` form, bracketing IPv6 addresses
    pub fn destination(&self) -> String {
        match self.ip {
            IpAddr::V4(ip) => format!("{}:{}", ip, self.port),
            IpAddr::V6(ip) => format!("[{}]:{}", ip, self.port),
        }
    }
}

/// Replicas in creation order
pub type FleetResult = Vec<ReplicaDescriptor>;

/// One entry of an ordered redirection plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedirectionRule {
    /// Match probability conditioned on reaching this rule; `None` is unconditional
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probability: Option<f64>,
    pub destination: String,
}

impl RedirectionRule {
    pub fn conditional(probability: f64, destination: impl Into<String>) -> Self {
        Self {
            probability: Some(probability),
            destination: destination.into(),
        }
    }

    pub fn unconditional(destination: impl Into<String>) -> Self {
        Self {
            probability: None,
            destination: destination.into(),
        }
    }

    /// Probability rendered for the packet filter's statistic match
    pub fn probability_arg(&self) -> Option<String> {
        self.probability.map(format_probability)
    }
}

impl fmt::Display for RedirectionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.probability_arg() {
            Some(p) => write!(f, "p={} -> {}", p, self.destination),
            None => write!(f, "always -> {}", self.destination),
        }
    }
}

/// Render a probability with six fractional digits
pub fn format_probability(probability: f64) -> String {
    format!("{:.6}", probability)
}

/// Instance summary returned by inventory lookups
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceSummary {
    pub id: String,
    pub names: Vec<String>,
    pub image: String,
    pub state: String,
    pub labels: HashMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> DeploymentRequest {
        DeploymentRequest {
            host_port: "8080".to_string(),
            container_port_space: 9000,
            image: "demo".to_string(),
            replicas: 3,
            name: "svc".to_string(),
        }
    }

    #[test]
    fn test_request_validates_into_spec() {
        let spec = DeploymentSpec::try_from(request()).unwrap();

        assert_eq!(spec.host_port, 8080);
        assert_eq!(spec.port_space, 9000);
        assert_eq!(spec.replicas, 3);
        assert_eq!(spec.name, "svc");
    }

    #[test]
    fn test_request_deserializes_from_wire_format() {
        let body = r#"{"host_port":"8080","container_port_space":9000,"image":"demo","replicas":3,"name":"svc"}"#;
        let req: DeploymentRequest = serde_json::from_str(body).unwrap();

        assert_eq!(req.host_port, "8080");
        assert_eq!(req.replicas, 3);
    }

    #[test]
    fn test_validation_rejects_bad_host_port() {
        for bad in ["", "http", "0", "65536", "-1"] {
            let mut req = request();
            req.host_port = bad.to_string();
            assert!(matches!(
                DeploymentSpec::try_from(req),
                Err(ValidationError::InvalidHostPort(_))
            ));
        }
    }

    #[test]
    fn test_validation_rejects_negative_replicas() {
        let mut req = request();
        req.replicas = -1;
        assert_eq!(
            DeploymentSpec::try_from(req),
            Err(ValidationError::NegativeReplicas(-1))
        );
    }

    #[test]
    fn test_validation_accepts_zero_replicas() {
        let mut req = request();
        req.replicas = 0;
        assert_eq!(DeploymentSpec::try_from(req).unwrap().replicas, 0);
    }

    #[test]
    fn test_validation_rejects_empty_image_and_name() {
        let mut req = request();
        req.image = "  ".to_string();
        assert_eq!(DeploymentSpec::try_from(req), Err(ValidationError::EmptyImage));

        let mut req = request();
        req.name = String::new();
        assert_eq!(DeploymentSpec::try_from(req), Err(ValidationError::EmptyName));
    }

    #[test]
    fn test_validation_rejects_port_space_overflow() {
        let mut req = request();
        req.container_port_space = 65534;
        req.replicas = 3;
        assert!(matches!(
            DeploymentSpec::try_from(req),
            Err(ValidationError::PortSpaceOverflow { .. })
        ));

        let mut req = request();
        req.container_port_space = 65534;
        req.replicas = 2;
        assert!(DeploymentSpec::try_from(req).is_ok());
    }

    #[test]
    fn test_destination_brackets_ipv6() {
        let mut replica = ReplicaDescriptor {
            id: "abc".to_string(),
            name: "svc-00".to_string(),
            index: 0,
            port: 9000,
            ip: "172.17.0.2".parse().unwrap(),
        };
        assert_eq!(replica.destination(), "172.17.0.2:9000");

        replica.ip = "fe80::1".parse().unwrap();
        assert_eq!(replica.destination(), "[fe80::1]:9000");
    }

    #[test]
    fn test_validation_rejects_huge_replica_count() {
        let mut req = request();
        req.replicas = i64::MAX;
        assert!(matches!(
            DeploymentSpec::try_from(req),
            Err(ValidationError::PortSpaceOverflow { port_space: 9000, .. })
        ));

        let mut req = request();
        req.container_port_space = 1;
        req.replicas = i64::from(u16::MAX) + 1;
        assert!(matches!(
            DeploymentSpec::try_from(req),
            Err(ValidationError::PortSpaceOverflow { .. })
        ));
    }

    #[test]
    fn test_validation_rejects_invalid_port_space() {
        let mut req = request();
        req.container_port_space = 0;
        assert_eq!(
            DeploymentSpec::try_from(req),
            Err(ValidationError::InvalidPortSpace(0))
        );
    }

    #[test]
    fn test_replica_names_and_ports() {
        let spec = DeploymentSpec::try_from(request()).unwrap();

        assert_eq!(spec.replica_name(0), "svc-00");
        assert_eq!(spec.replica_name(2), "svc-02");
        assert_eq!(spec.replica_port(0), 9000);
        assert_eq!(spec.replica_port(2), 9002);
    }

    #[test]
    fn test_replica_names_stay_unique_past_ten() {
        let mut req = request();
        req.replicas = 12;
        let spec = DeploymentSpec::try_from(req).unwrap();

        let names: std::collections::HashSet<_> =
            (0..spec.replicas).map(|i| spec.replica_name(i)).collect();
        assert_eq!(names.len(), 12);
        assert_eq!(spec.replica_name(11), "svc-11");

        let mut req = request();
        req.replicas = 150;
        let spec = DeploymentSpec::try_from(req).unwrap();
        assert_eq!(spec.replica_name(7), "svc-007");
        assert_eq!(spec.replica_name(149), "svc-149");
    }

    #[test]
    fn test_fleet_label() {
        let spec = DeploymentSpec::try_from(request()).unwrap();
        assert_eq!(spec.labels().get(FLEET_LABEL), Some(&"svc".to_string()));
    }

    #[test]
    fn test_rule_rendering() {
        let rule = RedirectionRule::conditional(1.0 / 3.0, "10.0.0.2:9000");
        assert_eq!(rule.probability_arg().as_deref(), Some("0.333333"));
        assert_eq!(rule.to_string(), "p=0.333333 -> 10.0.0.2:9000");

        let last = RedirectionRule::unconditional("10.0.0.3:9001");
        assert_eq!(last.probability_arg(), None);
        assert_eq!(last.to_string(), "always -> 10.0.0.3:9001");
    }
}
