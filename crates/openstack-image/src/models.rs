//! Image service models.

use chrono::{DateTime, Utc};
use openstack_core::id::ImageId;
use openstack_core::query::QueryParams;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Parameters supported by the `/v2/images` list endpoint.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImageListParams {
    /// Filter by exact name.
    pub name: Option<String>,
    /// Filter by status (`active`, `queued`, ...).
    pub status: Option<String>,
    /// Filter by visibility (`public`, `private`, `shared`, `community`).
    pub visibility: Option<String>,
    /// Filter by owner project id.
    pub owner: Option<String>,
    /// Filter by tag.
    pub tag: Option<String>,
    /// Maximum number of results.
    pub limit: Option<u32>,
    /// Pagination marker (id of the last image of the previous page).
    pub marker: Option<String>,
    /// Sort key.
    pub sort_key: Option<String>,
    /// Sort direction (`asc` or `desc`).
    pub sort_dir: Option<String>,
}

impl ImageListParams {
    /// Filter by name only.
    #[must_use]
    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Convert the parameters into query pairs, in a stable order.
    #[must_use]
    pub fn to_query(&self) -> QueryParams {
        let mut params = QueryParams::new();
        params.push_opt("name", self.name.as_deref());
        params.push_opt("status", self.status.as_deref());
        params.push_opt("visibility", self.visibility.as_deref());
        params.push_opt("owner", self.owner.as_deref());
        params.push_opt("tag", self.tag.as_deref());
        params.push_opt("limit", self.limit);
        params.push_opt("marker", self.marker.as_deref());
        params.push_opt("sort_key", self.sort_key.as_deref());
        params.push_opt("sort_dir", self.sort_dir.as_deref());
        params
    }
}

/// Representation of an image as returned by the image service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Image {
    /// Image id.
    pub id: ImageId,
    /// Image name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Current status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Visibility.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<String>,
    /// Image size (bytes).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// Minimum disk (GiB).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_disk: Option<u64>,
    /// Minimum memory (MiB).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_ram: Option<u64>,
    /// Disk format (`qcow2`, `raw`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk_format: Option<String>,
    /// Container format.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_format: Option<String>,
    /// Owner project id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    /// Tags.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Created timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Updated timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Provider-specific properties.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Image {
    /// Returns true if the image is ready to boot.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status.as_deref() == Some("active")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn list_params_render_in_order() {
        let params = ImageListParams {
            name: Some("Debian 12".to_string()),
            status: Some("active".to_string()),
            limit: Some(10),
            ..ImageListParams::default()
        };
        assert_eq!(
            params.to_query().to_query_string(),
            "?name=Debian%2012&status=active&limit=10"
        );
    }

    #[test]
    fn empty_params_render_nothing() {
        assert_eq!(ImageListParams::default().to_query().to_query_string(), "");
    }

    #[test]
    fn image_keeps_unknown_properties() {
        let image: Image = serde_json::from_value(json!({
            "id": "b0d9f9d0-0000-4000-8000-000000000001",
            "name": "Debian 12",
            "status": "active",
            "visibility": "public",
            "min_disk": 0,
            "tags": [],
            "hw_disk_bus": "scsi",
            "os_distro": "debian"
        }))
        .unwrap();

        assert!(image.is_active());
        assert_eq!(image.extra.get("os_distro"), Some(&json!("debian")));
        assert_eq!(image.extra.len(), 2);
    }
}
