//! Configuration structures for OpenStack clients.
//!
//! [`OpenStackConfig`] carries the identity endpoint, the credentials and the
//! region/interface selection used by the service wrappers.

use crate::types::{Interface, DEFAULT_DOMAIN};
use crate::Error;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;
use validator::Validate;

/// Environment variable holding the identity endpoint URL.
pub const ENV_URL: &str = "OPENSTACK_URL";
/// Environment variable holding the user login.
pub const ENV_USER: &str = "OPENSTACK_USER";
/// Environment variable holding the user password.
pub const ENV_PASSWORD: &str = "OPENSTACK_PASSWORD";
/// Environment variable holding the identity domain.
pub const ENV_DOMAIN: &str = "OPENSTACK_DOMAIN";
/// Environment variable holding the project to scope to.
pub const ENV_PROJECT: &str = "OPENSTACK_PROJECT";
/// Environment variable holding the default region.
pub const ENV_REGION: &str = "OPENSTACK_REGION";

/// Configuration for an OpenStack client instance.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct OpenStackConfig {
    /// Identity (Keystone v3) base URL, e.g. `https://auth.example.com/v3`
    #[validate(url)]
    pub auth_url: String,

    /// User login
    #[validate(length(min = 1))]
    pub username: String,

    /// User password
    #[serde(default = "empty_password", skip_serializing)]
    pub password: SecretString,

    /// Identity domain of the user and project
    #[serde(default = "default_domain")]
    pub domain: String,

    /// Project to scope the token to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,

    /// Region used by service wrappers when none is given explicitly
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    /// Endpoint interface resolved from the catalog
    #[serde(default)]
    pub interface: Interface,

    /// Request timeout in seconds
    #[validate(range(min = 1, max = 300))]
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn empty_password() -> SecretString {
    SecretString::from(String::new())
}

fn default_domain() -> String {
    DEFAULT_DOMAIN.to_string()
}

const fn default_request_timeout_secs() -> u64 {
    30
}

impl OpenStackConfig {
    /// Create a new client configuration with required parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or validation fails.
    pub fn new(
        auth_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, Error> {
        let config = Self {
            auth_url: auth_url.into(),
            username: username.into(),
            password: SecretString::from(password.into()),
            domain: default_domain(),
            project: None,
            region: None,
            interface: Interface::default(),
            request_timeout_secs: default_request_timeout_secs(),
        };

        config
            .validate()
            .map_err(|e| Error::Config(format!("Invalid configuration: {e}")))?;

        Ok(config)
    }

    /// Build a configuration from the `OPENSTACK_*` environment variables.
    ///
    /// `OPENSTACK_URL`, `OPENSTACK_USER` and `OPENSTACK_PASSWORD` are required;
    /// `OPENSTACK_DOMAIN`, `OPENSTACK_PROJECT` and `OPENSTACK_REGION` are optional.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or validation fails.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or validation fails.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(|| Error::Config(format!("Missing environment variable {key}")))
        };

        let mut config = Self::new(
            required(ENV_URL)?,
            required(ENV_USER)?,
            required(ENV_PASSWORD)?,
        )?;

        if let Some(domain) = lookup(ENV_DOMAIN).filter(|v| !v.trim().is_empty()) {
            config.domain = domain;
        }
        config.project = lookup(ENV_PROJECT).filter(|v| !v.trim().is_empty());
        config.region = lookup(ENV_REGION).filter(|v| !v.trim().is_empty());

        Ok(config)
    }

    /// Password in clear text, for building the identity request only.
    #[must_use]
    pub fn password(&self) -> &str {
        self.password.expose_secret()
    }

    /// Set the identity domain.
    #[must_use]
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = domain.into();
        self
    }

    /// Set the project to scope to.
    #[must_use]
    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    /// Set the default region.
    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Set the endpoint interface.
    #[must_use]
    pub const fn with_interface(mut self, interface: Interface) -> Self {
        self.interface = interface;
        self
    }

    /// Set request timeout in seconds.
    #[must_use]
    pub const fn with_timeout(mut self, seconds: u64) -> Self {
        self.request_timeout_secs = seconds;
        self
    }

    /// Get the request timeout as a Duration.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Parse and validate the identity URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be parsed.
    pub fn parse_auth_url(&self) -> Result<Url, Error> {
        Url::parse(&self.auth_url).map_err(|e| Error::Config(format!("Invalid auth URL: {e}")))
    }
}
