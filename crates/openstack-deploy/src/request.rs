//! Deployment request.

use openstack_core::id::FlavorId;
use openstack_core::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use validator::{Validate, ValidationError};

/// SSH key to inject into the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct SshKeySpec {
    /// Keypair name, reused when it already exists
    #[validate(custom(function = "not_blank"))]
    pub name: String,

    /// Public key to import; the compute service generates a pair when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
}

/// Everything needed to ensure one server exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct DeploymentRequest {
    /// Image name
    #[validate(custom(function = "not_blank"))]
    pub image: String,

    /// Flavor id
    #[validate(custom(function = "not_blank_id"))]
    pub flavor: FlavorId,

    /// SSH key
    #[validate(nested)]
    pub ssh: SshKeySpec,

    /// Boot volume size (GiB), required for flavors without local disk
    #[validate(range(min = 1))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk_size_gib: Option<u32>,

    /// Server name, generated when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_name: Option<String>,

    /// Variables exported by the bootstrap script
    #[serde(default)]
    pub config: BTreeMap<String, String>,

    /// Fields deep-merged into the server body
    #[serde(default)]
    pub server_overrides: Map<String, Value>,
}

impl DeploymentRequest {
    /// Request with the required fields only.
    #[must_use]
    pub fn new(
        image: impl Into<String>,
        flavor: impl Into<FlavorId>,
        ssh_key_name: impl Into<String>,
    ) -> Self {
        Self {
            image: image.into(),
            flavor: flavor.into(),
            ssh: SshKeySpec {
                name: ssh_key_name.into(),
                public_key: None,
            },
            disk_size_gib: None,
            server_name: None,
            config: BTreeMap::new(),
            server_overrides: Map::new(),
        }
    }

    /// Import this public key when the keypair does not exist yet.
    #[must_use]
    pub fn with_public_key(mut self, public_key: impl Into<String>) -> Self {
        self.ssh.public_key = Some(public_key.into());
        self
    }

    /// Boot volume size in GiB.
    #[must_use]
    pub const fn with_disk_size(mut self, gib: u32) -> Self {
        self.disk_size_gib = Some(gib);
        self
    }

    /// Server name.
    #[must_use]
    pub fn with_server_name(mut self, name: impl Into<String>) -> Self {
        self.server_name = Some(name.into());
        self
    }

    /// Add one bootstrap variable.
    #[must_use]
    pub fn with_config(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }

    /// Set one top-level server body override.
    #[must_use]
    pub fn with_server_override(mut self, key: impl Into<String>, value: Value) -> Self {
        self.server_overrides.insert(key.into(), value);
        self
    }

    /// Check the request before any network call.
    ///
    /// # Errors
    ///
    /// `Validation` naming the offending fields.
    pub fn check(&self) -> Result<()> {
        self.validate()?;
        Ok(())
    }
}

fn not_blank(value: &str) -> std::result::Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

fn not_blank_id(value: &FlavorId) -> std::result::Result<(), ValidationError> {
    not_blank(value.as_str())
}
