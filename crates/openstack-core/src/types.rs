//! Core OpenStack domain types.
//!
//! Service types as they appear in the catalog and endpoint interface kinds.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{Error, Result};

/// Identity domain used when none is given.
pub const DEFAULT_DOMAIN: &str = "Default";

/// Services consumed by this client, keyed by their catalog `type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceType {
    /// Keystone
    Identity,
    /// Glance
    Image,
    /// Nova
    Compute,
    /// Neutron
    Network,
}

impl ServiceType {
    /// Returns the catalog type string.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Identity => "identity",
            Self::Image => "image",
            Self::Compute => "compute",
            Self::Network => "network",
        }
    }

    /// Versioned path prefix appended to the catalog URL before resource paths.
    ///
    /// Compute and identity catalog URLs already carry their version.
    #[must_use]
    pub const fn api_prefix(&self) -> &'static str {
        match self {
            Self::Image => "/v2",
            Self::Network => "/v2.0",
            Self::Identity | Self::Compute => "",
        }
    }
}

impl FromStr for ServiceType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "identity" => Ok(Self::Identity),
            "image" => Ok(Self::Image),
            "compute" => Ok(Self::Compute),
            "network" => Ok(Self::Network),
            _ => Err(Error::ServiceNotFound {
                service_type: s.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for ServiceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Endpoint interface kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interface {
    /// Publicly reachable endpoint
    #[default]
    Public,
    /// Endpoint on the internal network
    Internal,
    /// Administrative endpoint
    Admin,
}

impl Interface {
    /// Returns the interface as it appears in the catalog.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Internal => "internal",
            Self::Admin => "admin",
        }
    }
}

impl FromStr for Interface {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "public" => Ok(Self::Public),
            "internal" => Ok(Self::Internal),
            "admin" => Ok(Self::Admin),
            _ => Err(Error::Config(format!("Unknown interface: {s}"))),
        }
    }
}

impl std::fmt::Display for Interface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
