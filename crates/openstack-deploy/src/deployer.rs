//! Idempotent "ensure deployment" pipeline.
//!
//! Steps run in a fixed order and the first failure aborts the run. Nothing
//! created by earlier steps is rolled back. Keypairs and security groups are
//! looked up by name and reused; a reused security group is never re-checked
//! for its rules.

use crate::bootstrap::BootstrapScript;
use crate::request::DeploymentRequest;
use openstack_compute::{ComputeClient, Flavor, Keypair, Server};
use openstack_core::merge::deep_merge;
use openstack_core::{Error, Result};
use openstack_image::{Image, ImageClient};
use openstack_network::{NetworkClient, SecurityGroup, SecurityGroupRuleRequest};
use openstack_session::OpenStackClient;
use serde_json::{json, Map, Value};
use tracing::info;
use uuid::Uuid;

/// Security group every deployed server joins.
pub const DEFAULT_SECURITY_GROUP: &str = "deploy-web-ssh";

/// Inclusive TCP port ranges opened on a newly created security group.
pub const INGRESS_TCP_PORTS: [(u16, u16); 3] = [(80, 81), (443, 443), (22, 22)];

/// Server returned by a successful deployment.
pub type ProvisionedServer = Server;

/// Provisions servers in one region.
#[derive(Debug, Clone)]
pub struct Deployer {
    compute: ComputeClient,
    images: ImageClient,
    network: NetworkClient,
    security_group: String,
    bootstrap: BootstrapScript,
}

impl Deployer {
    /// Create a deployer for `region`, sharing the session of `client`.
    #[must_use]
    pub fn new(client: &OpenStackClient, region: &str) -> Self {
        Self {
            compute: ComputeClient::new(client.clone(), region),
            images: ImageClient::new(client.clone(), region),
            network: NetworkClient::new(client.clone(), region),
            security_group: DEFAULT_SECURITY_GROUP.to_string(),
            bootstrap: BootstrapScript::default(),
        }
    }

    /// Use another security group name.
    #[must_use]
    pub fn with_security_group(mut self, name: impl Into<String>) -> Self {
        self.security_group = name.into();
        self
    }

    /// Use another bootstrap template.
    #[must_use]
    pub fn with_bootstrap(mut self, bootstrap: BootstrapScript) -> Self {
        self.bootstrap = bootstrap;
        self
    }

    /// Region the deployer works in.
    #[must_use]
    pub fn region(&self) -> &str {
        self.compute.region()
    }

    /// Ensure a server matching `request` is created.
    ///
    /// Order: validate, flavor, image, keypair, security group, bootstrap
    /// script, server.
    ///
    /// # Errors
    ///
    /// `Validation` for an incomplete request or a disk-less flavor without
    /// `disk_size_gib` (both before the image lookup), `ResourceNotFound` for
    /// a missing flavor or image, or the error of the failing call.
    pub async fn ensure_deployment(
        &self,
        request: &DeploymentRequest,
    ) -> Result<ProvisionedServer> {
        request.check()?;

        let flavor = self.resolve_flavor(request).await?;
        let image = self.resolve_image(&request.image).await?;
        let keypair = self.ensure_keypair(request).await?;
        let group = self.ensure_security_group().await?;
        let user_data = self.bootstrap.encode(&request.config)?;

        let name = request
            .server_name
            .clone()
            .unwrap_or_else(|| format!("deploy-{}", Uuid::new_v4().simple()));
        let body = server_body(&ServerInputs {
            name: &name,
            image: &image,
            flavor: &flavor,
            keypair: &keypair,
            security_group: &group.name,
            user_data: &user_data,
            disk_size_gib: request.disk_size_gib,
            overrides: &request.server_overrides,
        });

        let server = self.compute.create_server(body).await?;
        info!(
            step = "server",
            id = %server.id,
            name = %name,
            region = self.region(),
            boot_from_volume = flavor.is_diskless(),
            "Deployment created"
        );
        Ok(server)
    }

    async fn resolve_flavor(&self, request: &DeploymentRequest) -> Result<Flavor> {
        let flavor = self.compute.get_flavor(&request.flavor).await.map_err(|err| {
            if err.status_code() == Some(404) {
                Error::resource_not_found("flavor", request.flavor.as_str())
            } else {
                err
            }
        })?;

        if flavor.is_diskless() && request.disk_size_gib.is_none() {
            return Err(Error::Validation(
                "disk size required for disk-less flavor".to_string(),
            ));
        }

        info!(step = "flavor", id = %flavor.id, disk = flavor.disk, "Flavor resolved");
        Ok(flavor)
    }

    async fn resolve_image(&self, name: &str) -> Result<Image> {
        let image = self
            .images
            .find_image_by_name(name)
            .await?
            .ok_or_else(|| Error::resource_not_found("image", name))?;

        info!(step = "image", id = %image.id, name, "Image resolved");
        Ok(image)
    }

    async fn ensure_keypair(&self, request: &DeploymentRequest) -> Result<Keypair> {
        let name = request.ssh.name.as_str();
        if let Some(keypair) = self.compute.find_keypair(name).await? {
            info!(step = "keypair", name, "Reusing existing keypair");
            return Ok(keypair);
        }

        let keypair = self
            .compute
            .create_keypair(name, request.ssh.public_key.as_deref(), &Map::new())
            .await?;
        info!(
            step = "keypair",
            name,
            imported = request.ssh.public_key.is_some(),
            "Keypair created"
        );
        Ok(keypair)
    }

    async fn ensure_security_group(&self) -> Result<SecurityGroup> {
        if let Some(group) = self.network.find_security_group(&self.security_group).await? {
            info!(
                step = "security_group",
                id = %group.id,
                name = %group.name,
                "Reusing existing security group"
            );
            return Ok(group);
        }

        let mut overrides = Map::new();
        overrides.insert(
            "description".to_string(),
            json!("HTTP, HTTPS and SSH ingress for deployed servers"),
        );
        let group = self
            .network
            .create_security_group(&self.security_group, &overrides)
            .await?;

        for (min, max) in INGRESS_TCP_PORTS {
            self.network
                .create_security_group_rule(&SecurityGroupRuleRequest::tcp_ingress(
                    group.id.clone(),
                    min,
                    max,
                ))
                .await?;
        }

        info!(
            step = "security_group",
            id = %group.id,
            name = %group.name,
            "Security group created"
        );
        Ok(group)
    }
}

/// Inputs of the server body.
struct ServerInputs<'a> {
    name: &'a str,
    image: &'a Image,
    flavor: &'a Flavor,
    keypair: &'a Keypair,
    security_group: &'a str,
    user_data: &'a str,
    disk_size_gib: Option<u32>,
    overrides: &'a Map<String, Value>,
}

/// `{name, imageRef, flavorRef}` merged with the overrides, then the managed
/// fields on top. Disk-less flavors boot from a volume created from the image.
fn server_body(inputs: &ServerInputs<'_>) -> Map<String, Value> {
    let mut base = Map::new();
    base.insert("name".to_string(), json!(inputs.name));
    base.insert("imageRef".to_string(), json!(inputs.image.id));
    base.insert("flavorRef".to_string(), json!(inputs.flavor.id));

    let mut body = deep_merge(&base, inputs.overrides);
    body.insert("key_name".to_string(), json!(inputs.keypair.name));
    body.insert("user_data".to_string(), json!(inputs.user_data));
    body.insert(
        "security_groups".to_string(),
        json!([{ "name": inputs.security_group }]),
    );

    if inputs.flavor.is_diskless() {
        body.insert(
            "block_device_mapping_v2".to_string(),
            json!([{
                "boot_index": 0,
                "uuid": inputs.image.id,
                "source_type": "image",
                "destination_type": "volume",
                "volume_size": inputs.disk_size_gib,
                "delete_on_termination": true
            }]),
        );
    }

    body
}
