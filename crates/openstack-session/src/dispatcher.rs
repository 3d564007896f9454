//! Single authenticated API call: auth header injection, envelope handling and
//! error translation.

use crate::session::Token;
use crate::transport::{HttpTransport, TransportRequest, TransportResponse};
use chrono::Utc;
use openstack_core::query::QueryParams;
use openstack_core::{Error, Result};
use reqwest::Method;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

/// Header carrying the subject token on authenticated calls.
pub const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";

/// Description of one API call, relative to a service base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    method: Method,
    path: String,
    query: QueryParams,
    requires_auth: bool,
    envelope: Option<String>,
    payload: Option<Value>,
}

impl ApiRequest {
    /// Authenticated request without body, query or envelope.
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: QueryParams::new(),
            requires_auth: true,
            envelope: None,
            payload: None,
        }
    }

    /// `GET` request.
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// `POST` request.
    #[must_use]
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// `PUT` request.
    #[must_use]
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    /// `DELETE` request.
    #[must_use]
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Send without an auth token.
    #[must_use]
    pub fn unauthenticated(mut self) -> Self {
        self.requires_auth = false;
        self
    }

    /// Wrap the payload under, and unwrap the response from, `key`.
    #[must_use]
    pub fn with_envelope(mut self, key: impl Into<String>) -> Self {
        self.envelope = Some(key.into());
        self
    }

    /// Set the JSON payload.
    #[must_use]
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Set query parameters.
    #[must_use]
    pub fn with_query(mut self, query: QueryParams) -> Self {
        self.query = query;
        self
    }

    /// HTTP method.
    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// Resource path relative to the base URL.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Whether the call carries the auth token.
    #[must_use]
    pub const fn requires_auth(&self) -> bool {
        self.requires_auth
    }

    /// Envelope key, if any.
    #[must_use]
    pub fn envelope(&self) -> Option<&str> {
        self.envelope.as_deref()
    }

    /// Body to send: the payload, wrapped in its envelope when one is set.
    #[must_use]
    pub fn body(&self) -> Option<Value> {
        let payload = self.payload.clone()?;
        match &self.envelope {
            Some(key) => {
                let mut wrapped = Map::new();
                wrapped.insert(key.clone(), payload);
                Some(Value::Object(wrapped))
            }
            None => Some(payload),
        }
    }

    /// `{base_url}{path}{query}` as an absolute URL.
    ///
    /// # Errors
    ///
    /// `InvalidEndpoint` when the result is not a valid URL.
    pub fn url(&self, base_url: &str) -> Result<Url> {
        let raw = format!(
            "{}{}{}",
            base_url.trim_end_matches('/'),
            self.path,
            self.query.to_query_string()
        );
        Url::parse(&raw)
            .map_err(|err| Error::InvalidEndpoint(format!("Invalid URL `{raw}`: {err}")))
    }
}

/// Issues [`ApiRequest`]s over an injected transport.
#[derive(Clone)]
pub struct RequestDispatcher {
    transport: Arc<dyn HttpTransport>,
}

impl std::fmt::Debug for RequestDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestDispatcher").finish_non_exhaustive()
    }
}

impl RequestDispatcher {
    /// Create a dispatcher over a transport.
    #[must_use]
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }

    /// Issue the call and decode the response.
    ///
    /// Returns the value under the envelope key when one is set, the whole
    /// decoded body otherwise, and `None` for an empty body.
    ///
    /// # Errors
    ///
    /// `NotAuthenticated`/`TokenExpired` before contacting the transport,
    /// `Transport` for non-2xx or network failures, `Parse` for undecodable
    /// bodies or a missing envelope key.
    pub async fn call(
        &self,
        base_url: &str,
        request: &ApiRequest,
        token: Option<&Token>,
    ) -> Result<Option<Value>> {
        let response = self.send(base_url, request, token).await?;
        decode_body(request, &response)
    }

    /// Issue the call and return the raw successful response.
    ///
    /// # Errors
    ///
    /// Same as [`RequestDispatcher::call`], without decoding.
    pub async fn send(
        &self,
        base_url: &str,
        request: &ApiRequest,
        token: Option<&Token>,
    ) -> Result<TransportResponse> {
        let mut headers = vec![("Accept".to_string(), "application/json".to_string())];

        if request.requires_auth {
            let token = token.ok_or(Error::NotAuthenticated)?;
            let value = token.check(Utc::now())?;
            headers.push((AUTH_TOKEN_HEADER.to_string(), value.to_string()));
        }

        let body = match request.body() {
            Some(body) => {
                headers.push(("Content-Type".to_string(), "application/json".to_string()));
                Some(serde_json::to_vec(&body)?)
            }
            None => None,
        };

        let url = request.url(base_url)?;
        debug!(method = %request.method, path = %request.path, "OpenStack request");

        let response = self
            .transport
            .send(TransportRequest {
                method: request.method.clone(),
                url,
                headers,
                body,
            })
            .await?;

        if !response.is_success() {
            warn!(
                method = %request.method,
                path = %request.path,
                status = response.status,
                "OpenStack request failed"
            );
            return Err(Error::transport(response.status, response.text()));
        }

        debug!(
            method = %request.method,
            path = %request.path,
            status = response.status,
            "OpenStack response"
        );
        Ok(response)
    }
}

fn decode_body(request: &ApiRequest, response: &TransportResponse) -> Result<Option<Value>> {
    if response.body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }

    let value: Value = serde_json::from_slice(&response.body).map_err(|err| {
        Error::Parse(format!("Invalid JSON in response to `{}`: {err}", request.path))
    })?;

    match &request.envelope {
        Some(key) => match value {
            Value::Object(mut map) => map.remove(key).map(Some).ok_or_else(|| {
                Error::Parse(format!("Missing `{key}` in response to `{}`", request.path))
            }),
            _ => Err(Error::Parse(format!(
                "Expected an object with `{key}` in response to `{}`",
                request.path
            ))),
        },
        None => Ok(Some(value)),
    }
}
