//! Asynchronous image service client.

use crate::models::{Image, ImageListParams};
use crate::Result;
use openstack_core::id::ImageId;
use openstack_core::types::ServiceType;
use openstack_core::ResultExt;
use openstack_session::{ApiRequest, OpenStackClient};
use tracing::debug;

/// Image service client bound to one region.
#[derive(Debug, Clone)]
pub struct ImageClient {
    client: OpenStackClient,
    region: String,
}

impl ImageClient {
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

    /// List images matching the filter.
    pub async fn list_images(&self, params: &ImageListParams) -> Result<Vec<Image>> {
        let request = ApiRequest::get("/images")
            .with_query(params.to_query())
            .with_envelope("images");
        self.client
            .fetch(ServiceType::Image, &self.region, &request)
            .await
            .context("Failed to retrieve the image list")
    }

    /// Fetch a single image by id.
    pub async fn get_image(&self, id: &ImageId) -> Result<Image> {
        let request = ApiRequest::get(format!("/images/{id}"));
        self.client
            .fetch(ServiceType::Image, &self.region, &request)
            .await
            .with_context(|| format!("Failed to retrieve the image {id}"))
    }

    /// First image with exactly this name, if any.
    pub async fn find_image_by_name(&self, name: &str) -> Result<Option<Image>> {
        let images = self.list_images(&ImageListParams::by_name(name)).await?;
        debug!(name, matches = images.len(), region = %self.region, "Image lookup");
        Ok(images.into_iter().next())
    }
}
