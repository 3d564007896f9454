//! Asynchronous network service client.

use crate::models::{
    Network, NetworkListParams, SecurityGroup, SecurityGroupRule, SecurityGroupRuleRequest,
    Subnet, SubnetListParams,
};
use crate::Result;
use openstack_core::id::{NetworkId, SecurityGroupId, SecurityGroupRuleId, SubnetId};
use openstack_core::merge::deep_merge;
use openstack_core::query::QueryParams;
use openstack_core::types::ServiceType;
use openstack_core::ResultExt;
use openstack_session::{ApiRequest, OpenStackClient};
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use tracing::info;

/// Network service client bound to one region.
#[derive(Debug, Clone)]
pub struct NetworkClient {
    client: OpenStackClient,
    region: String,
}

impl NetworkClient {
    /// Create a client for `region`, sharing the session of `client`.
    #[must_use]
    pub fn new(client: OpenStackClient, region: impl Into<String>) -> Self {
        Self {
            client,
            region: region.into(),
        }
    }

    /// Region this client talks to.
    #[must_use]
    pub fn region(&self) -> &str {
        &self.region
    }

    /// List networks matching the filter.
    pub async fn list_networks(&self, params: &NetworkListParams) -> Result<Vec<Network>> {
        let request = ApiRequest::get("/networks")
            .with_query(params.to_query())
            .with_envelope("networks");
        self.fetch(&request)
            .await
            .context("Failed to retrieve the network list")
    }

    /// Fetch one network.
    pub async fn get_network(&self, id: &NetworkId) -> Result<Network> {
        let request = ApiRequest::get(format!("/networks/{}", encode(id.as_str())))
            .with_envelope("network");
        self.fetch(&request)
            .await
            .with_context(|| format!("Failed to retrieve the network {id}"))
    }

    /// Create a network; `overrides` are deep-merged into the body.
    pub async fn create_network(
        &self,
        name: &str,
        overrides: &Map<String, Value>,
    ) -> Result<Network> {
        let mut body = Map::new();
        body.insert("name".to_string(), json!(name));
        let request = ApiRequest::post("/networks")
            .with_envelope("network")
            .with_payload(Value::Object(deep_merge(&body, overrides)));

        let network: Network = self
            .fetch(&request)
            .await
            .with_context(|| format!("Failed to create the network {name}"))?;
        info!(id = %network.id, name, region = %self.region, "Network created");
        Ok(network)
    }

    /// Delete a network.
    pub async fn delete_network(&self, id: &NetworkId) -> Result<()> {
        let request = ApiRequest::delete(format!("/networks/{}", encode(id.as_str())));
        self.execute(&request)
            .await
            .with_context(|| format!("Failed to delete the network {id}"))
    }

    /// List subnets matching the filter.
    pub async fn list_subnets(&self, params: &SubnetListParams) -> Result<Vec<Subnet>> {
        let request = ApiRequest::get("/subnets")
            .with_query(params.to_query())
            .with_envelope("subnets");
        self.fetch(&request)
            .await
            .context("Failed to retrieve the subnet list")
    }

    /// Fetch one subnet.
    pub async fn get_subnet(&self, id: &SubnetId) -> Result<Subnet> {
        let request = ApiRequest::get(format!("/subnets/{}", encode(id.as_str())))
            .with_envelope("subnet");
        self.fetch(&request)
            .await
            .with_context(|| format!("Failed to retrieve the subnet {id}"))
    }

    /// Create a subnet in `network_id`; `overrides` are deep-merged into the
    /// body.
    pub async fn create_subnet(
        &self,
        network_id: &NetworkId,
        ip_version: u8,
        cidr: &str,
        overrides: &Map<String, Value>,
    ) -> Result<Subnet> {
        let mut body = Map::new();
        body.insert("network_id".to_string(), json!(network_id));
        body.insert("ip_version".to_string(), json!(ip_version));
        body.insert("cidr".to_string(), json!(cidr));
        let request = ApiRequest::post("/subnets")
            .with_envelope("subnet")
            .with_payload(Value::Object(deep_merge(&body, overrides)));

        let subnet: Subnet = self
            .fetch(&request)
            .await
            .with_context(|| format!("Failed to create a subnet {cidr} in network {network_id}"))?;
        info!(id = %subnet.id, cidr, region = %self.region, "Subnet created");
        Ok(subnet)
    }

    /// Delete a subnet.
    pub async fn delete_subnet(&self, id: &SubnetId) -> Result<()> {
        let request = ApiRequest::delete(format!("/subnets/{}", encode(id.as_str())));
        self.execute(&request)
            .await
            .with_context(|| format!("Failed to delete the subnet {id}"))
    }

    /// List security groups, optionally filtered by exact name.
    pub async fn list_security_groups(&self, name: Option<&str>) -> Result<Vec<SecurityGroup>> {
        let mut query = QueryParams::new();
        query.push_opt("name", name);
        let request = ApiRequest::get("/security-groups")
            .with_query(query)
            .with_envelope("security_groups");
        self.fetch(&request)
            .await
            .context("Failed to retrieve the security group list")
    }

    /// First security group with this name, if any.
    pub async fn find_security_group(&self, name: &str) -> Result<Option<SecurityGroup>> {
        let groups = self.list_security_groups(Some(name)).await?;
        Ok(groups.into_iter().find(|group| group.name == name))
    }

    /// Fetch one security group.
    pub async fn get_security_group(&self, id: &SecurityGroupId) -> Result<SecurityGroup> {
        let request = ApiRequest::get(format!("/security-groups/{}", encode(id.as_str())))
            .with_envelope("security_group");
        self.fetch(&request)
            .await
            .with_context(|| format!("Failed to retrieve the security group {id}"))
    }

    /// Create a security group; `overrides` are deep-merged into the body.
    pub async fn create_security_group(
        &self,
        name: &str,
        overrides: &Map<String, Value>,
    ) -> Result<SecurityGroup> {
        let mut body = Map::new();
        body.insert("name".to_string(), json!(name));
        let request = ApiRequest::post("/security-groups")
            .with_envelope("security_group")
            .with_payload(Value::Object(deep_merge(&body, overrides)));

        let group: SecurityGroup = self
            .fetch(&request)
            .await
            .with_context(|| format!("Failed to create the security group {name}"))?;
        info!(id = %group.id, name, region = %self.region, "Security group created");
        Ok(group)
    }

    /// Delete a security group.
    pub async fn delete_security_group(&self, id: &SecurityGroupId) -> Result<()> {
        let request = ApiRequest::delete(format!("/security-groups/{}", encode(id.as_str())));
        self.execute(&request)
            .await
            .with_context(|| format!("Failed to delete the security group {id}"))
    }

    /// Add a rule to a security group.
    pub async fn create_security_group_rule(
        &self,
        rule: &SecurityGroupRuleRequest,
    ) -> Result<SecurityGroupRule> {
        let request = ApiRequest::post("/security-group-rules")
            .with_envelope("security_group_rule")
            .with_payload(serde_json::to_value(rule)?);
        self.fetch(&request).await.with_context(|| {
            format!(
                "Failed to add a rule to the security group {}",
                rule.security_group_id
            )
        })
    }

    /// Delete a security group rule.
    pub async fn delete_security_group_rule(&self, id: &SecurityGroupRuleId) -> Result<()> {
        let request = ApiRequest::delete(format!("/security-group-rules/{}", encode(id.as_str())));
        self.execute(&request)
            .await
            .with_context(|| format!("Failed to delete the security group rule {id}"))
    }

    async fn fetch<T>(&self, request: &ApiRequest) -> Result<T>
    where
        T: DeserializeOwned,
    {
        self.client
            .fetch(ServiceType::Network, &self.region, request)
            .await
    }

    async fn execute(&self, request: &ApiRequest) -> Result<()> {
        self.client
            .execute(ServiceType::Network, &self.region, request)
            .await
    }
}

fn encode(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}
