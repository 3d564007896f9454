//! Identity wire models for password authentication.

use crate::catalog::Catalog;
use chrono::{DateTime, Utc};
use openstack_core::id::ProjectId;
use serde::{Deserialize, Serialize};

/// Body of `POST /auth/tokens`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthRequest {
    /// Authentication payload
    pub auth: AuthBody,
}

/// Identity and optional scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthBody {
    /// Identity methods
    pub identity: Identity,
    /// Project scope, omitted for unscoped tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<Scope>,
}

/// Identity block of the auth request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    /// Always `["password"]`
    pub methods: Vec<String>,
    /// Password credentials
    pub password: PasswordMethod,
}

/// Password method wrapper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PasswordMethod {
    /// User credentials
    pub user: UserCredentials,
}

/// User login and password.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct UserCredentials {
    /// Login name
    pub name: String,
    /// Password
    pub password: String,
    /// User domain
    pub domain: DomainRef,
}

impl std::fmt::Debug for UserCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserCredentials")
            .field("name", &self.name)
            .field("password", &"<redacted>")
            .field("domain", &self.domain)
            .finish()
    }
}

/// Domain reference by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainRef {
    /// Domain name
    pub name: String,
}

/// Scope block of the auth request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Scope {
    /// Project to scope to
    pub project: ProjectScopeRequest,
}

/// Project reference by name and domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectScopeRequest {
    /// Project name
    pub name: String,
    /// Project domain
    pub domain: DomainRef,
}

impl AuthRequest {
    /// Password authentication, scoped to `project` when one is given.
    #[must_use]
    pub fn password(login: &str, password: &str, domain: &str, project: Option<&str>) -> Self {
        let domain = DomainRef {
            name: domain.to_string(),
        };

        Self {
            auth: AuthBody {
                identity: Identity {
                    methods: vec!["password".to_string()],
                    password: PasswordMethod {
                        user: UserCredentials {
                            name: login.to_string(),
                            password: password.to_string(),
                            domain: domain.clone(),
                        },
                    },
                },
                scope: project.map(|name| Scope {
                    project: ProjectScopeRequest {
                        name: name.to_string(),
                        domain,
                    },
                }),
            },
        }
    }
}

/// Response of `POST /auth/tokens`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TokenEnvelope {
    /// Token body
    pub token: TokenBody,
}

/// Token metadata; the token value itself is in `X-Subject-Token`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TokenBody {
    /// Expiry timestamp
    pub expires_at: DateTime<Utc>,
    /// Service catalog, absent for some deployments
    #[serde(default)]
    pub catalog: Option<Catalog>,
    /// Scoped project
    #[serde(default)]
    pub project: Option<ProjectRef>,
}

/// Project reported by the identity service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProjectRef {
    /// Project id
    pub id: ProjectId,
    /// Project name
    #[serde(default)]
    pub name: Option<String>,
}
