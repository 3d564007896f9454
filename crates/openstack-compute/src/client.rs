//! Asynchronous compute service client.

use crate::models::{
    Addresses, Flavor, FlavorSummary, Keypair, KeypairEntry, Server, ServerAction,
    ServerListParams, ServerStatus,
};
use crate::Result;
use futures::future::try_join_all;
use openstack_core::id::{FlavorId, ServerId};
use openstack_core::merge::deep_merge;
use openstack_core::types::ServiceType;
use openstack_core::{Error, ResultExt};
use openstack_session::{ApiRequest, OpenStackClient};
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info};

/// Compute service client bound to one region.
#[derive(Debug, Clone)]
pub struct ComputeClient {
    client: OpenStackClient,
    region: String,
}

impl ComputeClient {
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

    /// List flavors (id and name only).
    pub async fn list_flavors(&self) -> Result<Vec<FlavorSummary>> {
        let request = ApiRequest::get("/flavors").with_envelope("flavors");
        self.fetch(&request)
            .await
            .context("Failed to retrieve the compute flavor list")
    }

    /// Fetch the detail of one flavor.
    pub async fn get_flavor(&self, id: &FlavorId) -> Result<Flavor> {
        let request = ApiRequest::get(format!("/flavors/{}", encode(id.as_str())))
            .with_envelope("flavor");
        self.fetch(&request)
            .await
            .context("Failed to retrieve the compute flavor detail")
    }

    /// List flavors with their detail.
    ///
    /// Details are fetched concurrently and returned in list order; the first
    /// failing fetch aborts the whole call.
    pub async fn list_flavors_detailed(&self) -> Result<Vec<Flavor>> {
        let summaries = self.list_flavors().await?;
        debug!(count = summaries.len(), region = %self.region, "Fetching flavor details");

        try_join_all(summaries.iter().map(|summary| self.get_flavor(&summary.id)))
            .await
            .context("Failed to retrieve the compute flavor list")
    }

    /// List the keypairs of the user.
    pub async fn list_keypairs(&self) -> Result<Vec<Keypair>> {
        let request = ApiRequest::get("/os-keypairs").with_envelope("keypairs");
        let entries: Vec<KeypairEntry> = self
            .fetch(&request)
            .await
            .context("Failed to retrieve the compute keypair list")?;
        Ok(entries.into_iter().map(|entry| entry.keypair).collect())
    }

    /// First keypair with this name, if any.
    pub async fn find_keypair(&self, name: &str) -> Result<Option<Keypair>> {
        let keypairs = self.list_keypairs().await?;
        Ok(keypairs.into_iter().find(|keypair| keypair.name == name))
    }

    /// Fetch one keypair by name.
    pub async fn get_keypair(&self, name: &str) -> Result<Keypair> {
        let request = ApiRequest::get(format!("/os-keypairs/{}", encode(name)))
            .with_envelope("keypair");
        self.fetch(&request)
            .await
            .with_context(|| format!("Failed to retrieve the compute keypair {name}"))
    }

    /// Import `public_key` under `name`, or let the server generate a pair
    /// when no key is given. `overrides` are deep-merged into the keypair body.
    pub async fn create_keypair(
        &self,
        name: &str,
        public_key: Option<&str>,
        overrides: &Map<String, Value>,
    ) -> Result<Keypair> {
        let mut body = Map::new();
        body.insert("name".to_string(), json!(name));
        if let Some(public_key) = public_key {
            body.insert("public_key".to_string(), json!(public_key));
        }
        let body = deep_merge(&body, overrides);

        let request = ApiRequest::post("/os-keypairs")
            .with_envelope("keypair")
            .with_payload(Value::Object(body));
        let keypair: Keypair = self
            .fetch(&request)
            .await
            .with_context(|| format!("Failed to create the compute keypair {name}"))?;

        info!(name, imported = public_key.is_some(), region = %self.region, "Keypair created");
        Ok(keypair)
    }

    /// Delete a keypair.
    pub async fn delete_keypair(&self, name: &str) -> Result<()> {
        let request = ApiRequest::delete(format!("/os-keypairs/{}", encode(name)));
        self.execute(&request)
            .await
            .with_context(|| format!("Failed to delete the compute keypair {name}"))
    }

    /// List servers matching the filter.
    pub async fn list_servers(&self, params: &ServerListParams) -> Result<Vec<Server>> {
        let request = ApiRequest::get("/servers")
            .with_query(params.to_query())
            .with_envelope("servers");
        self.fetch(&request)
            .await
            .context("Failed to retrieve the compute server list")
    }

    /// Fetch one server.
    pub async fn get_server(&self, id: &ServerId) -> Result<Server> {
        let request = ApiRequest::get(format!("/servers/{}", encode(id.as_str())))
            .with_envelope("server");
        self.fetch(&request)
            .await
            .with_context(|| format!("Failed to retrieve the compute server {id}"))
    }

    /// Create a server from a complete server body (without the `server`
    /// envelope).
    pub async fn create_server(&self, body: Map<String, Value>) -> Result<Server> {
        let request = ApiRequest::post("/servers")
            .with_envelope("server")
            .with_payload(Value::Object(body));
        let server: Server = self
            .fetch(&request)
            .await
            .context("Failed to create the compute server")?;

        info!(id = %server.id, region = %self.region, "Server created");
        Ok(server)
    }

    /// Delete a server.
    pub async fn delete_server(&self, id: &ServerId) -> Result<()> {
        let request = ApiRequest::delete(format!("/servers/{}", encode(id.as_str())));
        self.execute(&request)
            .await
            .with_context(|| format!("Failed to delete the compute server {id}"))
    }

    /// Addresses of a server grouped by network.
    pub async fn server_addresses(&self, id: &ServerId) -> Result<Addresses> {
        let request = ApiRequest::get(format!("/servers/{}/ips", encode(id.as_str())))
            .with_envelope("addresses");
        self.fetch(&request)
            .await
            .with_context(|| format!("Failed to retrieve the addresses of server {id}"))
    }

    /// Post an action and wait for the service to accept it.
    pub async fn server_action(&self, id: &ServerId, action: ServerAction) -> Result<()> {
        let request = ApiRequest::post(format!("/servers/{}/action", encode(id.as_str())))
            .with_payload(action.to_body());
        self.execute(&request)
            .await
            .with_context(|| format!("Failed to {} server {id}", action.label()))?;

        info!(
            id = %id,
            action = action.label(),
            region = %self.region,
            "Server action accepted"
        );
        Ok(())
    }

    /// Poll a server until it reports `status`.
    ///
    /// Polls at most `max_attempts` times, sleeping `interval` between polls.
    ///
    /// # Errors
    ///
    /// `UnexpectedState` as soon as the server reports `ERROR` (unless that is
    /// the awaited status), `Timeout` once the attempts are exhausted, or the
    /// error of a failed poll.
    pub async fn wait_for_status(
        &self,
        id: &ServerId,
        status: ServerStatus,
        interval: Duration,
        max_attempts: u32,
    ) -> Result<Server> {
        for attempt in 1..=max_attempts {
            let server = self.get_server(id).await?;
            debug!(
                id = %id,
                attempt,
                status = ?server.status,
                progress = ?server.progress,
                "Polled server status"
            );

            if server.has_status(status) {
                return Ok(server);
            }
            if server.has_status(ServerStatus::Error) {
                return Err(Error::UnexpectedState {
                    resource: "server".to_string(),
                    id: id.to_string(),
                    state: ServerStatus::Error.to_string(),
                });
            }
            if attempt < max_attempts {
                sleep(interval).await;
            }
        }

        Err(Error::Timeout(format!(
            "server {id} did not reach {status} after {max_attempts} attempts"
        )))
    }

    async fn fetch<T>(&self, request: &ApiRequest) -> Result<T>
    where
        T: DeserializeOwned,
    {
        self.client
            .fetch(ServiceType::Compute, &self.region, request)
            .await
    }

    async fn execute(&self, request: &ApiRequest) -> Result<()> {
        self.client
            .execute(ServiceType::Compute, &self.region, request)
            .await
    }
}

fn encode(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RebootType;
    use chrono::{Duration as ChronoDuration, Utc};
    use openstack_core::types::Interface;
    use openstack_core::ErrorKind;
    use openstack_session::{Catalog, Endpoint, Service, Session, Token};
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(server: &MockServer) -> ComputeClient {
        let client = OpenStackClient::new("http://keystone.example.com/v3").unwrap();
        client.set_session(Session::new(
            Token::new("tok-nova", Utc::now() + ChronoDuration::hours(1)),
            None,
            Catalog::new(vec![Service {
                service_type: "compute".to_string(),
                endpoints: vec![Endpoint {
                    interface: Interface::Public,
                    region_id: "R1".to_string(),
                    region: None,
                    url: format!("{}/v2.1/p-1", server.uri()),
                    id: None,
                }],
                id: None,
                name: Some("nova".to_string()),
            }]),
        ));
        ComputeClient::new(client, "R1")
    }

    async fn mount_flavor(server: &MockServer, id: &str, disk: u64) {
        Mock::given(method("GET"))
            .and(path(format!("/v2.1/p-1/flavors/{id}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "flavor": {"id": id, "name": id, "disk": disk, "ram": 2000, "vcpus": 1}
            })))
            .expect(1)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn list_flavors_detailed_preserves_order() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2.1/p-1/flavors"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "flavors": [
                    {"id": "s1-2", "name": "s1-2", "links": []},
                    {"id": "b2-7", "name": "b2-7", "links": []},
                    {"id": "d2-2", "name": "d2-2", "links": []}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;
        mount_flavor(&server, "s1-2", 10).await;
        mount_flavor(&server, "b2-7", 0).await;
        mount_flavor(&server, "d2-2", 25).await;

        let flavors = test_client(&server).list_flavors_detailed().await.unwrap();
        let ids: Vec<_> = flavors.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["s1-2", "b2-7", "d2-2"]);
        assert!(flavors[1].is_diskless());
    }

    #[tokio::test]
    async fn list_flavors_detailed_fails_on_first_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2.1/p-1/flavors"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "flavors": [{"id": "s1-2"}, {"id": "gone"}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v2.1/p-1/flavors/s1-2"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"flavor": {"id": "s1-2", "disk": 10}})),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v2.1/p-1/flavors/gone"))
            .respond_with(ResponseTemplate::new(404).set_body_string("itemNotFound"))
            .mount(&server)
            .await;

        let err = test_client(&server).list_flavors_detailed().await.unwrap_err();
        assert_eq!(err.status_code(), Some(404));
        assert!(err.to_string().starts_with("Failed to retrieve the compute flavor list"));
    }

    #[tokio::test]
    async fn keypair_list_unwraps_entries() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2.1/p-1/os-keypairs"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "keypairs": [
                    {"keypair": {
                        "name": "k1",
                        "public_key": "ssh-ed25519 AAAA k1",
                        "fingerprint": "aa:bb"
                    }},
                    {"keypair": {"name": "k2", "public_key": "ssh-ed25519 BBBB k2"}}
                ]
            })))
            .mount(&server)
            .await;

        let client = test_client(&server);
        let keypairs = client.list_keypairs().await.unwrap();
        assert_eq!(keypairs.len(), 2);
        assert_eq!(keypairs[0].fingerprint.as_deref(), Some("aa:bb"));

        let found = client.find_keypair("k2").await.unwrap().unwrap();
        assert_eq!(found.public_key.as_deref(), Some("ssh-ed25519 BBBB k2"));
        assert!(client.find_keypair("k3").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn create_keypair_imports_public_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2.1/p-1/os-keypairs"))
            .and(body_json(json!({
                "keypair": {"name": "k1", "public_key": "ssh-ed25519 AAAA", "type": "ssh"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "keypair": {"name": "k1", "public_key": "ssh-ed25519 AAAA", "fingerprint": "aa"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut overrides = Map::new();
        overrides.insert("type".to_string(), json!("ssh"));
        let keypair = test_client(&server)
            .create_keypair("k1", Some("ssh-ed25519 AAAA"), &overrides)
            .await
            .unwrap();
        assert_eq!(keypair.name, "k1");
        assert!(keypair.private_key.is_none());
    }

    #[tokio::test]
    async fn create_keypair_generated() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2.1/p-1/os-keypairs"))
            .and(body_json(json!({"keypair": {"name": "gen"}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "keypair": {"name": "gen", "public_key": "ssh-rsa X", "private_key": "PRIVATE"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let keypair = test_client(&server)
            .create_keypair("gen", None, &Map::new())
            .await
            .unwrap();
        assert_eq!(keypair.private_key.as_deref(), Some("PRIVATE"));
    }

    #[tokio::test]
    async fn delete_keypair_encodes_name() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/v2.1/p-1/os-keypairs/my%20key"))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;

        test_client(&server).delete_keypair("my key").await.unwrap();
    }

    #[tokio::test]
    async fn server_lifecycle_calls() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2.1/p-1/servers"))
            .and(body_json(json!({
                "server": {"name": "web-1", "imageRef": "img", "flavorRef": "s1-2"}
            })))
            .respond_with(ResponseTemplate::new(202).set_body_json(json!({
                "server": {"id": "srv-1", "adminPass": "pw", "links": []}
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v2.1/p-1/servers/srv-1/ips"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "addresses": {"Ext-Net": [{"addr": "203.0.113.7", "version": 4}]}
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v2.1/p-1/servers/srv-1/action"))
            .and(body_json(json!({"reboot": {"type": "HARD"}})))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/v2.1/p-1/servers/srv-1"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let mut body = Map::new();
        body.insert("name".to_string(), json!("web-1"));
        body.insert("imageRef".to_string(), json!("img"));
        body.insert("flavorRef".to_string(), json!("s1-2"));

        let created = client.create_server(body).await.unwrap();
        assert_eq!(created.admin_pass.as_deref(), Some("pw"));

        let addresses = client.server_addresses(&created.id).await.unwrap();
        assert_eq!(addresses["Ext-Net"][0].addr, "203.0.113.7");

        client
            .server_action(&created.id, ServerAction::Reboot(RebootType::Hard))
            .await
            .unwrap();
        client.delete_server(&created.id).await.unwrap();
    }

    #[tokio::test]
    async fn server_action_failure_names_action() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2.1/p-1/servers/srv-1/action"))
            .respond_with(ResponseTemplate::new(409).set_body_string("conflictingRequest"))
            .mount(&server)
            .await;

        let err = test_client(&server)
            .server_action(&ServerId::new("srv-1"), ServerAction::Start)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), Some(409));
        assert!(err.to_string().starts_with("Failed to start server srv-1:"));
    }

    #[tokio::test]
    async fn wait_for_status_until_active() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2.1/p-1/servers/srv-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "server": {"id": "srv-1", "status": "BUILD", "progress": 40}
            })))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v2.1/p-1/servers/srv-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "server": {"id": "srv-1", "status": "ACTIVE", "progress": 100}
            })))
            .mount(&server)
            .await;

        let active = test_client(&server)
            .wait_for_status(
                &ServerId::new("srv-1"),
                ServerStatus::Active,
                Duration::from_millis(5),
                5,
            )
            .await
            .unwrap();
        assert!(active.has_status(ServerStatus::Active));
        assert_eq!(active.progress, Some(100));
    }

    #[tokio::test]
    async fn wait_for_status_stops_on_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2.1/p-1/servers/srv-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "server": {"id": "srv-1", "status": "ERROR", "fault": {"message": "No valid host"}}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let err = test_client(&server)
            .wait_for_status(
                &ServerId::new("srv-1"),
                ServerStatus::Active,
                Duration::from_millis(5),
                10,
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnexpectedState);
    }

    #[tokio::test]
    async fn wait_for_status_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2.1/p-1/servers/srv-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "server": {"id": "srv-1", "status": "BUILD"}
            })))
            .expect(3)
            .mount(&server)
            .await;

        let err = test_client(&server)
            .wait_for_status(
                &ServerId::new("srv-1"),
                ServerStatus::Active,
                Duration::from_millis(1),
                3,
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);
    }
}
