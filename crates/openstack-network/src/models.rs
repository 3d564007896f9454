//! Network service models.

use openstack_core::id::{NetworkId, SecurityGroupId, SecurityGroupRuleId, SubnetId};
use openstack_core::query::QueryParams;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Parameters supported by the `/networks` list endpoint.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct NetworkListParams {
    /// Filter by name.
    pub name: Option<String>,
    /// Filter by status.
    pub status: Option<String>,
    /// Filter by shared flag.
    pub shared: Option<bool>,
    /// Filter on external networks.
    pub external: Option<bool>,
}

impl NetworkListParams {
    /// Convert the parameters into query pairs.
    #[must_use]
    pub fn to_query(&self) -> QueryParams {
        let mut params = QueryParams::new();
        params.push_opt("name", self.name.as_deref());
        params.push_opt("status", self.status.as_deref());
        params.push_opt("shared", self.shared);
        params.push_opt("router:external", self.external);
        params
    }
}

/// Network.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Network {
    /// Network id.
    pub id: NetworkId,
    /// Network name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Status (`ACTIVE`, `DOWN`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Administrative state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_state_up: Option<bool>,
    /// Shared across projects.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared: Option<bool>,
    /// Subnets of the network.
    #[serde(default)]
    pub subnets: Vec<SubnetId>,
    /// Owner project.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    /// Provider-specific fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Parameters supported by the `/subnets` list endpoint.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SubnetListParams {
    /// Filter by network.
    pub network_id: Option<NetworkId>,
    /// Filter by name.
    pub name: Option<String>,
    /// Filter by IP version.
    pub ip_version: Option<u8>,
}

impl SubnetListParams {
    /// Convert the parameters into query pairs.
    #[must_use]
    pub fn to_query(&self) -> QueryParams {
        let mut params = QueryParams::new();
        params.push_opt("network_id", self.network_id.as_ref());
        params.push_opt("name", self.name.as_deref());
        params.push_opt("ip_version", self.ip_version);
        params
    }
}

/// Subnet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Subnet {
    /// Subnet id.
    pub id: SubnetId,
    /// Subnet name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Parent network.
    pub network_id: NetworkId,
    /// IP version (4 or 6).
    pub ip_version: u8,
    /// CIDR block.
    pub cidr: String,
    /// Gateway address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway_ip: Option<String>,
    /// DHCP enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_dhcp: Option<bool>,
    /// Provider-specific fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Traffic direction of a security group rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Incoming traffic.
    Ingress,
    /// Outgoing traffic.
    Egress,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ingress => f.write_str("ingress"),
            Self::Egress => f.write_str("egress"),
        }
    }
}

/// Security group rule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SecurityGroupRule {
    /// Rule id.
    pub id: SecurityGroupRuleId,
    /// Owning group.
    pub security_group_id: SecurityGroupId,
    /// Direction.
    pub direction: Direction,
    /// `IPv4` or `IPv6`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ethertype: Option<String>,
    /// Protocol, `None` for any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    /// First port of the range.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port_range_min: Option<u16>,
    /// Last port of the range.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port_range_max: Option<u16>,
    /// Remote CIDR.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_ip_prefix: Option<String>,
    /// Provider-specific fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Security group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SecurityGroup {
    /// Group id.
    pub id: SecurityGroupId,
    /// Group name.
    pub name: String,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Rules of the group.
    #[serde(default)]
    pub security_group_rules: Vec<SecurityGroupRule>,
    /// Provider-specific fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Body of `POST /security-group-rules`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SecurityGroupRuleRequest {
    /// Group the rule belongs to.
    pub security_group_id: SecurityGroupId,
    /// Direction.
    pub direction: Direction,
    /// `IPv4` or `IPv6`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ethertype: Option<String>,
    /// Protocol.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    /// First port of the range.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port_range_min: Option<u16>,
    /// Last port of the range.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port_range_max: Option<u16>,
    /// Remote CIDR.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_ip_prefix: Option<String>,
}

impl SecurityGroupRuleRequest {
    /// Ingress TCP rule for the inclusive port range `min..=max`.
    #[must_use]
    pub fn tcp_ingress(security_group_id: SecurityGroupId, min: u16, max: u16) -> Self {
        Self {
            security_group_id,
            direction: Direction::Ingress,
            ethertype: None,
            protocol: Some("tcp".to_string()),
            port_range_min: Some(min),
            port_range_max: Some(max),
            remote_ip_prefix: None,
        }
    }

    /// Restrict the rule to a remote CIDR.
    #[must_use]
    pub fn with_remote_ip_prefix(mut self, cidr: impl Into<String>) -> Self {
        self.remote_ip_prefix = Some(cidr.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tcp_ingress_rule_body() {
        let rule = SecurityGroupRuleRequest::tcp_ingress(SecurityGroupId::new("sg-1"), 80, 81);
        assert_eq!(
            serde_json::to_value(&rule).unwrap(),
            json!({
                "security_group_id": "sg-1",
                "direction": "ingress",
                "protocol": "tcp",
                "port_range_min": 80,
                "port_range_max": 81
            })
        );
    }

    #[test]
    fn network_query_uses_external_attribute() {
        let params = NetworkListParams {
            external: Some(true),
            ..NetworkListParams::default()
        };
        assert_eq!(params.to_query().to_query_string(), "?router%3Aexternal=true");
    }

    #[test]
    fn rule_with_any_protocol() {
        let rule: SecurityGroupRule = serde_json::from_value(json!({
            "id": "r-1",
            "security_group_id": "sg-1",
            "direction": "egress",
            "ethertype": "IPv6",
            "protocol": null,
            "port_range_min": null,
            "port_range_max": null,
            "remote_ip_prefix": null,
            "revision_number": 0
        }))
        .unwrap();
        assert_eq!(rule.direction, Direction::Egress);
        assert!(rule.protocol.is_none());
        assert_eq!(rule.extra.get("revision_number"), Some(&json!(0)));
    }
}
