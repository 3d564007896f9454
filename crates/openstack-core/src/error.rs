//! Error types for OpenStack operations.
//!
//! Every layer of the client reports failures through the single [`Error`] enum.
//! Lower layers never swallow errors: wrappers attach an operation-specific
//! message with [`ResultExt::context`] and the original cause stays reachable
//! through [`Error::kind`], [`Error::status_code`] and [`Error::raw_body`].

use thiserror::Error;

/// Main error type for OpenStack operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A required field is missing or blank, or a request is inconsistent
    #[error("Validation error: {0}")]
    Validation(String),

    /// The identity call failed or the catalog could not be obtained
    #[error("Authentication failed: {message}")]
    Authentication {
        /// Human-readable description
        message: String,
        /// Underlying cause
        #[source]
        source: Option<Box<Error>>,
    },

    /// A catalog-dependent call was made before a successful authentication
    #[error("Catalog is missing or empty, call `authenticate` first")]
    CatalogMissing,

    /// No service of the requested type exists in the catalog
    #[error("The service '{service_type}' doesn't exist")]
    ServiceNotFound {
        /// Requested service type
        service_type: String,
    },

    /// The service exists but has no endpoint for the region/interface pair
    #[error("There is no {region_id} / {interface} endpoint in service {service_type}")]
    EndpointNotFound {
        /// Requested service type
        service_type: String,
        /// Requested region id
        region_id: String,
        /// Requested interface kind
        interface: String,
    },

    /// An authenticated call was attempted without a token
    #[error("Not authenticated, call `authenticate` first")]
    NotAuthenticated,

    /// An authenticated call was attempted with an expired token
    #[error("Token expired at {expires_at}")]
    TokenExpired {
        /// Expiry timestamp of the stale token (RFC 3339)
        expires_at: String,
    },

    /// Non-success HTTP response or network failure
    #[error("{message}")]
    Transport {
        /// HTTP status code, absent for network failures
        status: Option<u16>,
        /// Description of the failure
        message: String,
        /// Raw response body, if one was received
        raw_body: Option<String>,
    },

    /// An orchestration lookup found no matching resource
    #[error("No {resource} found matching `{name}`")]
    ResourceNotFound {
        /// Resource family (image, flavor, ...)
        resource: String,
        /// Name or id that was looked up
        name: String,
    },

    /// A resource entered a state the operation cannot continue from
    #[error("{resource} {id} is in state {state}")]
    UnexpectedState {
        /// Resource family (server, ...)
        resource: String,
        /// Resource id
        id: String,
        /// Reported state
        state: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Endpoint URL could not be built
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Response body could not be decoded
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// A polling operation gave up
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Operation context wrapped around an underlying error
    #[error("{context}: {source}")]
    Context {
        /// Operation that failed
        context: String,
        /// Underlying cause
        #[source]
        source: Box<Error>,
    },
}

/// Specialized result type for OpenStack operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Discriminant of an [`Error`], with context layers looked through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`Error::Validation`]
    Validation,
    /// See [`Error::Authentication`]
    Authentication,
    /// See [`Error::CatalogMissing`]
    CatalogMissing,
    /// See [`Error::ServiceNotFound`]
    ServiceNotFound,
    /// See [`Error::EndpointNotFound`]
    EndpointNotFound,
    /// See [`Error::NotAuthenticated`]
    NotAuthenticated,
    /// See [`Error::TokenExpired`]
    TokenExpired,
    /// See [`Error::Transport`]
    Transport,
    /// See [`Error::ResourceNotFound`]
    ResourceNotFound,
    /// See [`Error::UnexpectedState`]
    UnexpectedState,
    /// See [`Error::Config`]
    Config,
    /// See [`Error::InvalidEndpoint`]
    InvalidEndpoint,
    /// See [`Error::Parse`]
    Parse,
    /// See [`Error::Timeout`]
    Timeout,
}

impl Error {
    /// Build a transport error from an HTTP status and the raw response body.
    #[must_use]
    pub fn transport(status: u16, raw_body: impl Into<String>) -> Self {
        let raw_body = raw_body.into();
        Self::Transport {
            status: Some(status),
            message: format!("Request failed with status code {status}"),
            raw_body: Some(raw_body),
        }
    }

    /// Build an authentication error wrapping a cause.
    #[must_use]
    pub fn authentication(message: impl Into<String>, source: Self) -> Self {
        Self::Authentication {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Build a resource-not-found error.
    #[must_use]
    pub fn resource_not_found(resource: impl Into<String>, name: impl Into<String>) -> Self {
        Self::ResourceNotFound {
            resource: resource.into(),
            name: name.into(),
        }
    }

    /// Wrap this error with an operation context.
    #[must_use]
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Returns the kind of this error, looking through context layers.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Authentication { .. } => ErrorKind::Authentication,
            Self::CatalogMissing => ErrorKind::CatalogMissing,
            Self::ServiceNotFound { .. } => ErrorKind::ServiceNotFound,
            Self::EndpointNotFound { .. } => ErrorKind::EndpointNotFound,
            Self::NotAuthenticated => ErrorKind::NotAuthenticated,
            Self::TokenExpired { .. } => ErrorKind::TokenExpired,
            Self::Transport { .. } => ErrorKind::Transport,
            Self::ResourceNotFound { .. } => ErrorKind::ResourceNotFound,
            Self::UnexpectedState { .. } => ErrorKind::UnexpectedState,
            Self::Config(_) => ErrorKind::Config,
            Self::InvalidEndpoint(_) => ErrorKind::InvalidEndpoint,
            Self::Parse(_) => ErrorKind::Parse,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::Context { source, .. } => source.kind(),
        }
    }

    /// Returns true if this error or any of its causes has the given kind.
    #[must_use]
    pub fn has_kind(&self, kind: ErrorKind) -> bool {
        if self.kind() == kind {
            return true;
        }
        match self {
            Self::Context { source, .. } => source.has_kind(kind),
            Self::Authentication {
                source: Some(source),
                ..
            } => source.has_kind(kind),
            _ => false,
        }
    }

    /// HTTP status code carried by a transport error, if any.
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Transport { status, .. } => *status,
            Self::Context { source, .. } => source.status_code(),
            Self::Authentication {
                source: Some(source),
                ..
            } => source.status_code(),
            _ => None,
        }
    }

    /// Raw response body carried by a transport error, if any.
    #[must_use]
    pub fn raw_body(&self) -> Option<&str> {
        match self {
            Self::Transport { raw_body, .. } => raw_body.as_deref(),
            Self::Context { source, .. } => source.raw_body(),
            Self::Authentication {
                source: Some(source),
                ..
            } => source.raw_body(),
            _ => None,
        }
    }

    /// Returns the error code for this error type.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self.kind() {
            ErrorKind::Validation => "VALIDATION_ERROR",
            ErrorKind::Authentication => "AUTHENTICATION_ERROR",
            ErrorKind::CatalogMissing => "CATALOG_MISSING",
            ErrorKind::ServiceNotFound => "SERVICE_NOT_FOUND",
            ErrorKind::EndpointNotFound => "ENDPOINT_NOT_FOUND",
            ErrorKind::NotAuthenticated => "NOT_AUTHENTICATED",
            ErrorKind::TokenExpired => "TOKEN_EXPIRED",
            ErrorKind::Transport => "TRANSPORT_ERROR",
            ErrorKind::ResourceNotFound => "RESOURCE_NOT_FOUND",
            ErrorKind::UnexpectedState => "UNEXPECTED_STATE",
            ErrorKind::Config => "CONFIG_ERROR",
            ErrorKind::InvalidEndpoint => "INVALID_ENDPOINT",
            ErrorKind::Parse => "PARSE_ERROR",
            ErrorKind::Timeout => "TIMEOUT",
        }
    }
}

/// Adds operation context to fallible results.
pub trait ResultExt<T> {
    /// Wrap the error, if any, with the given context message.
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Like [`ResultExt::context`], building the message lazily.
    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|err| err.with_context(context))
    }

    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|err| err.with_context(f()))
    }
}

// Conversions from external error types
impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport {
            status: err.status().map(|status| status.as_u16()),
            message: format!("HTTP request failed: {err}"),
            raw_body: None,
        }
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidEndpoint(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::Validation(err.to_string())
    }
}
