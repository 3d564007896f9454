//! OpenStack client facade: session management, endpoint resolution and
//! authenticated calls against catalog services.

use crate::catalog::{Catalog, Region};
use crate::dispatcher::{ApiRequest, RequestDispatcher};
use crate::models::{AuthRequest, TokenEnvelope};
use crate::session::{ProjectScope, Session, SessionSlot, Token};
use crate::transport::{HttpTransport, ReqwestTransport};
use openstack_core::client::ClientConfig;
use openstack_core::config::OpenStackConfig;
use openstack_core::types::{Interface, ServiceType, DEFAULT_DOMAIN};
use openstack_core::{Error, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

/// Header carrying the issued token on `POST /auth/tokens`.
const SUBJECT_TOKEN_HEADER: &str = "x-subject-token";

/// Builder for [`OpenStackClient`].
#[derive(Clone)]
pub struct OpenStackClientBuilder {
    auth_url: Url,
    interface: Interface,
    region: Option<String>,
    http_config: ClientConfig,
    transport: Option<Arc<dyn HttpTransport>>,
}

impl OpenStackClientBuilder {
    /// Create a builder for the identity endpoint, e.g. `https://auth.example.com/v3`.
    ///
    /// # Errors
    ///
    /// `Config` when the URL cannot be parsed.
    pub fn new(auth_url: impl AsRef<str>) -> Result<Self> {
        let auth_url = Url::parse(auth_url.as_ref()).map_err(|err| {
            Error::Config(format!("Invalid auth URL `{}`: {err}", auth_url.as_ref()))
        })?;
        Ok(Self::from_url(auth_url))
    }

    fn from_url(auth_url: Url) -> Self {
        Self {
            auth_url,
            interface: Interface::default(),
            region: None,
            http_config: ClientConfig::default(),
            transport: None,
        }
    }

    /// Create a builder from a full client configuration.
    ///
    /// # Errors
    ///
    /// `Config` when the auth URL cannot be parsed.
    pub fn from_config(config: &OpenStackConfig) -> Result<Self> {
        let mut builder = Self::from_url(config.parse_auth_url()?)
            .with_interface(config.interface)
            .with_http_config(ClientConfig::new().with_timeout(config.timeout()));
        builder.region.clone_from(&config.region);
        Ok(builder)
    }

    /// Override the HTTP settings of the default transport.
    #[must_use]
    pub fn with_http_config(mut self, config: ClientConfig) -> Self {
        self.http_config = config;
        self
    }

    /// Use a custom transport instead of the default reqwest one.
    #[must_use]
    pub fn with_transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Endpoint interface resolved from the catalog.
    #[must_use]
    pub const fn with_interface(mut self, interface: Interface) -> Self {
        self.interface = interface;
        self
    }

    /// Default region for service wrappers.
    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Build the client.
    ///
    /// # Errors
    ///
    /// `Config` when the default transport cannot be built.
    pub fn build(self) -> Result<OpenStackClient> {
        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new(&self.http_config)?),
        };

        Ok(OpenStackClient {
            auth_url: self.auth_url.as_str().trim_end_matches('/').to_string(),
            interface: self.interface,
            region: self.region,
            dispatcher: RequestDispatcher::new(transport),
            session: SessionSlot::default(),
        })
    }
}

/// Asynchronous OpenStack client.
///
/// Clones share the same session: re-authenticating through one clone is
/// visible to every service wrapper built from any of them.
#[derive(Debug, Clone)]
pub struct OpenStackClient {
    auth_url: String,
    interface: Interface,
    region: Option<String>,
    dispatcher: RequestDispatcher,
    session: SessionSlot,
}

impl OpenStackClient {
    /// Create a client with the default transport.
    ///
    /// # Errors
    ///
    /// `Config` for an invalid auth URL.
    pub fn new(auth_url: impl AsRef<str>) -> Result<Self> {
        OpenStackClientBuilder::new(auth_url)?.build()
    }

    /// Create a builder.
    ///
    /// # Errors
    ///
    /// `Config` for an invalid auth URL.
    pub fn builder(auth_url: impl AsRef<str>) -> Result<OpenStackClientBuilder> {
        OpenStackClientBuilder::new(auth_url)
    }

    /// Identity endpoint, without trailing slash.
    #[must_use]
    pub fn auth_url(&self) -> &str {
        &self.auth_url
    }

    /// Endpoint interface used for resolution.
    #[must_use]
    pub const fn interface(&self) -> Interface {
        self.interface
    }

    /// Default region, if configured.
    #[must_use]
    pub fn default_region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    /// Authenticate with a password and load the catalog.
    ///
    /// The current session is dropped before anything else; on failure the
    /// client stays unauthenticated. `domain` defaults to `Default` and the
    /// token is unscoped when `project` is `None`.
    ///
    /// # Errors
    ///
    /// `Authentication` wrapping the cause (validation, transport, missing
    /// token header, missing catalog).
    pub async fn authenticate(
        &self,
        login: &str,
        password: &str,
        domain: Option<&str>,
        project: Option<&str>,
    ) -> Result<Arc<Session>> {
        self.session.replace(None);
        let domain = domain.unwrap_or(DEFAULT_DOMAIN);

        let session = self
            .request_session(login, password, domain, project)
            .await
            .map_err(|err| {
                Error::authentication(format!("Failed to authenticate user {login}"), err)
            })?;

        info!(
            login,
            domain,
            services = session.catalog().services().len(),
            expires_at = %session.token().expires_at(),
            "Authenticated against OpenStack"
        );

        self.session
            .replace(Some(session))
            .ok_or(Error::NotAuthenticated)
    }

    /// Authenticate with the credentials of a configuration.
    ///
    /// # Errors
    ///
    /// Same as [`OpenStackClient::authenticate`].
    pub async fn authenticate_with_config(&self, config: &OpenStackConfig) -> Result<Arc<Session>> {
        self.authenticate(
            &config.username,
            config.password(),
            Some(&config.domain),
            config.project.as_deref(),
        )
        .await
    }

    async fn request_session(
        &self,
        login: &str,
        password: &str,
        domain: &str,
        project: Option<&str>,
    ) -> Result<Session> {
        if login.trim().is_empty() {
            return Err(Error::Validation("login must not be blank".to_string()));
        }
        if password.trim().is_empty() {
            return Err(Error::Validation("password must not be blank".to_string()));
        }

        let body = serde_json::to_value(AuthRequest::password(login, password, domain, project))?;
        let request = ApiRequest::post("/auth/tokens")
            .unauthenticated()
            .with_payload(body);
        let response = self.dispatcher.send(&self.auth_url, &request, None).await?;

        let value = response
            .header(SUBJECT_TOKEN_HEADER)
            .ok_or_else(|| Error::Parse("Missing X-Subject-Token header".to_string()))?
            .to_string();
        let envelope: TokenEnvelope = serde_json::from_slice(&response.body)?;
        let token = Token::new(value, envelope.token.expires_at);

        let scope = match envelope.token.project {
            Some(reported) => Some(ProjectScope {
                id: Some(reported.id),
                name: reported.name.or_else(|| project.map(str::to_string)),
            }),
            None => project.map(|name| ProjectScope {
                id: None,
                name: Some(name.to_string()),
            }),
        };

        let catalog = match envelope.token.catalog {
            Some(catalog) if !catalog.is_empty() => catalog,
            _ => self.fetch_catalog(&token).await?,
        };

        Ok(Session::new(token, scope, catalog))
    }

    async fn fetch_catalog(&self, token: &Token) -> Result<Catalog> {
        debug!("Token carries no catalog, fetching it");
        let request = ApiRequest::get("/auth/catalog").with_envelope("catalog");
        let value = self
            .dispatcher
            .call(&self.auth_url, &request, Some(token))
            .await?
            .ok_or(Error::CatalogMissing)?;
        let catalog: Catalog = serde_json::from_value(value)?;

        if catalog.is_empty() {
            return Err(Error::CatalogMissing);
        }
        Ok(catalog)
    }

    /// Snapshot of the current session.
    #[must_use]
    pub fn session(&self) -> Option<Arc<Session>> {
        self.session.snapshot()
    }

    /// Install an existing session, e.g. to reuse a token.
    pub fn set_session(&self, session: Session) {
        self.session.replace(Some(session));
    }

    /// Drop the current session.
    pub fn clear_session(&self) {
        self.session.replace(None);
    }

    /// Returns true if a session with a still valid token is loaded.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.session
            .snapshot()
            .is_some_and(|session| session.token().is_valid_at(chrono::Utc::now()))
    }

    /// Base URL of a service in a region, for the configured interface.
    ///
    /// # Errors
    ///
    /// `CatalogMissing`, `ServiceNotFound` or `EndpointNotFound`.
    pub fn resolve(&self, service_type: &str, region_id: &str) -> Result<String> {
        let session = self.session.snapshot().ok_or(Error::CatalogMissing)?;
        session
            .catalog()
            .resolve(service_type, region_id, self.interface)
            .map(str::to_string)
    }

    /// Distinct regions of a service in first-seen order.
    ///
    /// # Errors
    ///
    /// `CatalogMissing` or `ServiceNotFound`.
    pub fn regions(&self, service_type: &str) -> Result<Vec<Region>> {
        let session = self.session.snapshot().ok_or(Error::CatalogMissing)?;
        session.catalog().regions(service_type)
    }

    /// Base URL of a known service including its API version prefix.
    ///
    /// # Errors
    ///
    /// Same as [`OpenStackClient::resolve`].
    pub fn service_url(&self, service: ServiceType, region_id: &str) -> Result<String> {
        let base = self.resolve(service.name(), region_id)?;
        Ok(format!("{}{}", base.trim_end_matches('/'), service.api_prefix()))
    }

    /// Issue a call against an explicit base URL with the current token.
    ///
    /// # Errors
    ///
    /// See [`RequestDispatcher::call`].
    pub async fn call(&self, base_url: &str, request: &ApiRequest) -> Result<Option<Value>> {
        let session = self.session.snapshot();
        let token = session.as_ref().map(|session| session.token());
        self.dispatcher.call(base_url, request, token).await
    }

    /// Issue a call against a catalog service.
    ///
    /// One session snapshot serves both endpoint resolution and the token.
    ///
    /// # Errors
    ///
    /// `NotAuthenticated` without a session, resolution errors, then the
    /// dispatcher errors.
    pub async fn call_service(
        &self,
        service: ServiceType,
        region_id: &str,
        request: &ApiRequest,
    ) -> Result<Option<Value>> {
        let session = self.session.snapshot();
        if request.requires_auth() && session.is_none() {
            return Err(Error::NotAuthenticated);
        }

        let catalog = session
            .as_ref()
            .map(|session| session.catalog())
            .ok_or(Error::CatalogMissing)?;
        let base = catalog.resolve(service.name(), region_id, self.interface)?;
        let base = format!("{}{}", base.trim_end_matches('/'), service.api_prefix());
        debug!(service = %service, region = region_id, path = request.path(), "Resolved endpoint");

        let token = session.as_ref().map(|session| session.token());
        self.dispatcher.call(&base, request, token).await
    }

    /// Issue a call and decode the (unwrapped) response.
    ///
    /// # Errors
    ///
    /// Same as [`OpenStackClient::call_service`], plus `Parse` for an empty or
    /// mismatched body.
    pub async fn fetch<T>(
        &self,
        service: ServiceType,
        region_id: &str,
        request: &ApiRequest,
    ) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let value = self
            .call_service(service, region_id, request)
            .await?
            .ok_or_else(|| Error::Parse(format!("Empty response to `{}`", request.path())))?;
        serde_json::from_value(value).map_err(|err| {
            Error::Parse(format!("Unexpected response to `{}`: {err}", request.path()))
        })
    }

    /// Issue a call and discard the response body.
    ///
    /// # Errors
    ///
    /// Same as [`OpenStackClient::call_service`].
    pub async fn execute(
        &self,
        service: ServiceType,
        region_id: &str,
        request: &ApiRequest,
    ) -> Result<()> {
        self.call_service(service, region_id, request).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Endpoint, Service};
    use crate::transport::MockHttpTransport;
    use chrono::{Duration, Utc};
    use openstack_core::ErrorKind;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn catalog_json(server_uri: &str) -> Value {
        json!([
            {
                "type": "compute",
                "name": "nova",
                "endpoints": [
                    {
                        "interface": "public",
                        "region_id": "R1",
                        "region": "R1",
                        "url": format!("{server_uri}/compute/v2.1")
                    },
                    {
                        "interface": "internal",
                        "region_id": "R1",
                        "region": "R1",
                        "url": "http://nova.internal/v2.1"
                    }
                ]
            },
            {
                "type": "image",
                "name": "glance",
                "endpoints": [
                    {
                        "interface": "public",
                        "region_id": "R1",
                        "region": "R1",
                        "url": format!("{server_uri}/image")
                    }
                ]
            }
        ])
    }

    fn test_session(url: &str, expires_at: chrono::DateTime<Utc>) -> Session {
        Session::new(
            Token::new("tok-1", expires_at),
            None,
            Catalog::new(vec![Service {
                service_type: "compute".to_string(),
                endpoints: vec![Endpoint {
                    interface: Interface::Public,
                    region_id: "R1".to_string(),
                    region: None,
                    url: url.to_string(),
                    id: None,
                }],
                id: None,
                name: None,
            }]),
        )
    }

    fn untouched_client() -> OpenStackClient {
        let mut mock = MockHttpTransport::new();
        mock.expect_send().times(0);
        OpenStackClient::builder("http://keystone.example.com/v3")
            .unwrap()
            .with_transport(Arc::new(mock))
            .build()
            .unwrap()
    }

    async fn mount_token(server: &MockServer, body: Value) {
        Mock::given(method("POST"))
            .and(path("/v3/auth/tokens"))
            .respond_with(
                ResponseTemplate::new(201)
                    .insert_header("X-Subject-Token", "tok-abc")
                    .set_body_json(body),
            )
            .expect(1)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn authenticate_stores_token_project_and_catalog() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v3/auth/tokens"))
            .and(body_partial_json(json!({
                "auth": {
                    "identity": {
                        "password": {"user": {"name": "alice", "domain": {"name": "Default"}}}
                    },
                    "scope": {"project": {"name": "demo"}}
                }
            })))
            .respond_with(
                ResponseTemplate::new(201)
                    .insert_header("X-Subject-Token", "tok-abc")
                    .set_body_json(json!({
                        "token": {
                            "expires_at": "2099-01-01T00:00:00Z",
                            "project": {"id": "p-1", "name": "demo"},
                            "catalog": catalog_json(&server.uri())
                        }
                    })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = OpenStackClient::new(format!("{}/v3", server.uri())).unwrap();
        let session = client
            .authenticate("alice", "s3cret", None, Some("demo"))
            .await
            .unwrap();

        assert_eq!(session.token().value(), "tok-abc");
        assert_eq!(session.project().unwrap().id.as_ref().unwrap().as_str(), "p-1");
        assert!(client.is_authenticated());
        assert_eq!(
            client.resolve("compute", "R1").unwrap(),
            format!("{}/compute/v2.1", server.uri())
        );
        assert_eq!(
            client.service_url(ServiceType::Image, "R1").unwrap(),
            format!("{}/image/v2", server.uri())
        );
    }

    #[tokio::test]
    async fn authenticate_fetches_catalog_when_token_has_none() {
        let server = MockServer::start().await;
        mount_token(
            &server,
            json!({"token": {"expires_at": "2099-01-01T00:00:00Z"}}),
        )
        .await;
        Mock::given(method("GET"))
            .and(path("/v3/auth/catalog"))
            .and(header("x-auth-token", "tok-abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "catalog": catalog_json(&server.uri())
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = OpenStackClient::new(format!("{}/v3", server.uri())).unwrap();
        let session = client
            .authenticate("alice", "s3cret", Some("corp"), Some("demo"))
            .await
            .unwrap();

        assert_eq!(session.catalog().services().len(), 2);
        let project = session.project().unwrap();
        assert!(project.id.is_none());
        assert_eq!(project.name.as_deref(), Some("demo"));
        let regions = client.regions("compute").unwrap();
        assert_eq!(regions.len(), 1);
    }

    #[tokio::test]
    async fn authenticate_fails_when_catalog_is_empty() {
        let server = MockServer::start().await;
        mount_token(
            &server,
            json!({"token": {"expires_at": "2099-01-01T00:00:00Z", "catalog": []}}),
        )
        .await;
        Mock::given(method("GET"))
            .and(path("/v3/auth/catalog"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"catalog": []})))
            .mount(&server)
            .await;

        let client = OpenStackClient::new(format!("{}/v3", server.uri())).unwrap();
        let err = client
            .authenticate("alice", "s3cret", None, None)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Authentication);
        assert!(err.has_kind(ErrorKind::CatalogMissing));
        assert!(client.session().is_none());
    }

    #[tokio::test]
    async fn authenticate_requires_subject_token_header() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v3/auth/tokens"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "token": {
                    "expires_at": "2099-01-01T00:00:00Z",
                    "catalog": catalog_json(&server.uri())
                }
            })))
            .mount(&server)
            .await;

        let client = OpenStackClient::new(format!("{}/v3", server.uri())).unwrap();
        let err = client
            .authenticate("alice", "s3cret", None, None)
            .await
            .unwrap_err();
        assert!(err.has_kind(ErrorKind::Parse));
    }

    #[tokio::test]
    async fn blank_login_fails_without_network_call() {
        let client = untouched_client();
        let err = client.authenticate("", "x", None, None).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Authentication);
        assert!(err.has_kind(ErrorKind::Validation));
        assert_eq!(err.error_code(), "AUTHENTICATION_ERROR");
    }

    #[tokio::test]
    async fn blank_password_fails_without_network_call() {
        let client = untouched_client();
        let err = client.authenticate("alice", "   ", None, None).await.unwrap_err();
        assert!(err.has_kind(ErrorKind::Validation));
    }

    #[tokio::test]
    async fn failed_authentication_clears_previous_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v3/auth/tokens"))
            .respond_with(
                ResponseTemplate::new(401).set_body_string("{\"error\": \"unauthorized\"}"),
            )
            .mount(&server)
            .await;

        let client = OpenStackClient::new(format!("{}/v3", server.uri())).unwrap();
        client.set_session(test_session("http://nova", Utc::now() + Duration::hours(1)));
        assert!(client.is_authenticated());

        let err = client
            .authenticate("alice", "wrong", None, None)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Authentication);
        assert_eq!(err.status_code(), Some(401));
        assert_eq!(err.raw_body(), Some("{\"error\": \"unauthorized\"}"));
        assert!(!client.is_authenticated());
        assert!(client.session().is_none());
    }

    #[tokio::test]
    async fn expired_token_is_rejected_before_transport() {
        let client = untouched_client();
        client.set_session(test_session(
            "http://nova.example.com/v2.1",
            Utc::now() - Duration::seconds(1),
        ));

        let err = client
            .call_service(ServiceType::Compute, "R1", &ApiRequest::get("/flavors"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TokenExpired);
        assert!(!client.is_authenticated());
    }

    #[tokio::test]
    async fn call_service_without_session() {
        let client = untouched_client();
        let err = client
            .call_service(ServiceType::Compute, "R1", &ApiRequest::get("/flavors"))
            .await
            .unwrap_err();
        assert_eq!(err, Error::NotAuthenticated);
        assert_eq!(client.resolve("compute", "R1").unwrap_err(), Error::CatalogMissing);
    }

    #[tokio::test]
    async fn call_service_unknown_region() {
        let client = untouched_client();
        client.set_session(test_session(
            "http://nova.example.com/v2.1",
            Utc::now() + Duration::hours(1),
        ));

        let err = client
            .call_service(ServiceType::Compute, "R9", &ApiRequest::get("/flavors"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EndpointNotFound);
    }

    #[tokio::test]
    async fn fetch_decodes_enveloped_body() {
        #[derive(serde::Deserialize)]
        struct Flavor {
            id: String,
        }

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/compute/v2.1/flavors/s1-2"))
            .and(header("x-auth-token", "tok-1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"flavor": {"id": "s1-2"}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = OpenStackClient::new("http://keystone.example.com/v3").unwrap();
        client.set_session(test_session(
            &format!("{}/compute/v2.1", server.uri()),
            Utc::now() + Duration::hours(1),
        ));

        let flavor: Flavor = client
            .fetch(
                ServiceType::Compute,
                "R1",
                &ApiRequest::get("/flavors/s1-2").with_envelope("flavor"),
            )
            .await
            .unwrap();
        assert_eq!(flavor.id, "s1-2");
    }

    #[test]
    fn builder_rejects_invalid_auth_url() {
        let err = OpenStackClientBuilder::new("not a url").err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn builder_from_config() {
        let config = OpenStackConfig::new("https://auth.example.com/v3/", "alice", "pw")
            .unwrap()
            .with_region("R1")
            .with_interface(Interface::Internal);
        let client = OpenStackClientBuilder::from_config(&config).unwrap().build().unwrap();

        assert_eq!(client.auth_url(), "https://auth.example.com/v3");
        assert_eq!(client.default_region(), Some("R1"));
        assert_eq!(client.interface(), Interface::Internal);
    }
}
