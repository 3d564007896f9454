//! Service catalog model and endpoint resolution.
//!
//! Resolution is first-match-wins at both levels: the first service of the
//! requested type is used (duplicated services are never merged) and, inside
//! it, the first endpoint matching the region and interface.

use openstack_core::types::Interface;
use openstack_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One endpoint of a catalog service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    /// Interface kind
    pub interface: Interface,
    /// Region identifier
    pub region_id: String,
    /// Region display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Base URL of the endpoint
    pub url: String,
    /// Endpoint id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// A catalog entry describing one service and its endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    /// Service type (`compute`, `image`, ...)
    #[serde(rename = "type")]
    pub service_type: String,
    /// Endpoints in catalog order
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
    /// Service id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Service name (`nova`, `glance`, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Region view derived from a service's endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    /// Region identifier
    pub region_id: String,
    /// Region display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

/// Ordered list of services returned at authentication time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog(Vec<Service>);

impl Catalog {
    /// Wrap a list of services, keeping their order.
    #[must_use]
    pub const fn new(services: Vec<Service>) -> Self {
        Self(services)
    }

    /// Services in catalog order.
    #[must_use]
    pub fn services(&self) -> &[Service] {
        &self.0
    }

    /// Returns true if the catalog has no services.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// First service whose type matches.
    ///
    /// # Errors
    ///
    /// `CatalogMissing` for an empty catalog, `ServiceNotFound` when no service
    /// has the requested type.
    pub fn service(&self, service_type: &str) -> Result<&Service> {
        if self.0.is_empty() {
            return Err(Error::CatalogMissing);
        }

        self.0
            .iter()
            .find(|service| service.service_type == service_type)
            .ok_or_else(|| Error::ServiceNotFound {
                service_type: service_type.to_string(),
            })
    }

    /// Resolve the base URL for a service type, region and interface.
    ///
    /// # Errors
    ///
    /// `CatalogMissing`, `ServiceNotFound` or `EndpointNotFound`.
    pub fn resolve(
        &self,
        service_type: &str,
        region_id: &str,
        interface: Interface,
    ) -> Result<&str> {
        let service = self.service(service_type)?;

        service
            .endpoints
            .iter()
            .find(|endpoint| endpoint.interface == interface && endpoint.region_id == region_id)
            .map(|endpoint| endpoint.url.as_str())
            .ok_or_else(|| Error::EndpointNotFound {
                service_type: service_type.to_string(),
                region_id: region_id.to_string(),
                interface: interface.to_string(),
            })
    }

    /// Distinct regions of a service, in first-seen order.
    ///
    /// # Errors
    ///
    /// `CatalogMissing` or `ServiceNotFound`.
    pub fn regions(&self, service_type: &str) -> Result<Vec<Region>> {
        let service = self.service(service_type)?;
        let mut seen = HashSet::new();

        Ok(service
            .endpoints
            .iter()
            .filter(|endpoint| seen.insert(endpoint.region_id.as_str()))
            .map(|endpoint| Region {
                region_id: endpoint.region_id.clone(),
                region: endpoint.region.clone(),
            })
            .collect())
    }
}

impl From<Vec<Service>> for Catalog {
    fn from(services: Vec<Service>) -> Self {
        Self(services)
    }
}
