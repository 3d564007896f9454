//! Authentication state: token, scoped project and catalog.
//!
//! A [`Session`] is an immutable value. The client replaces it wholesale on
//! every successful authentication and hands out `Arc` snapshots to in-flight
//! calls, so a call never sees a half-updated session.

use crate::catalog::Catalog;
use chrono::{DateTime, Utc};
use openstack_core::id::ProjectId;
use openstack_core::{Error, Result};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

/// Subject token issued by the identity service.
#[derive(Clone, PartialEq, Eq)]
pub struct Token {
    value: String,
    expires_at: DateTime<Utc>,
}

impl Token {
    /// Create a token.
    #[must_use]
    pub fn new(value: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            value: value.into(),
            expires_at,
        }
    }

    /// Token value sent as `X-Auth-Token`.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Expiry timestamp.
    #[must_use]
    pub const fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// A token is usable only while `now < expires_at`.
    #[must_use]
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    /// Return the token value if it is still valid at `now`.
    ///
    /// # Errors
    ///
    /// `TokenExpired` when `expires_at <= now`.
    pub fn check(&self, now: DateTime<Utc>) -> Result<&str> {
        if self.is_valid_at(now) {
            Ok(&self.value)
        } else {
            Err(Error::TokenExpired {
                expires_at: self.expires_at.to_rfc3339(),
            })
        }
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("value", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Project the token is scoped to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectScope {
    /// Project id, when the identity service reported it
    pub id: Option<ProjectId>,
    /// Project name, when known
    pub name: Option<String>,
}

/// Authenticated session.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    token: Token,
    project: Option<ProjectScope>,
    catalog: Catalog,
}

impl Session {
    /// Assemble a session.
    #[must_use]
    pub const fn new(token: Token, project: Option<ProjectScope>, catalog: Catalog) -> Self {
        Self {
            token,
            project,
            catalog,
        }
    }

    /// Subject token.
    #[must_use]
    pub const fn token(&self) -> &Token {
        &self.token
    }

    /// Scoped project, if any.
    #[must_use]
    pub const fn project(&self) -> Option<&ProjectScope> {
        self.project.as_ref()
    }

    /// Service catalog.
    #[must_use]
    pub const fn catalog(&self) -> &Catalog {
        &self.catalog
    }
}

/// Shared, replace-only holder of the current session.
#[derive(Debug, Clone, Default)]
pub(crate) struct SessionSlot {
    inner: Arc<RwLock<Option<Arc<Session>>>>,
}

impl SessionSlot {
    pub(crate) fn snapshot(&self) -> Option<Arc<Session>> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn replace(&self, session: Option<Session>) -> Option<Arc<Session>> {
        let session = session.map(Arc::new);
        let mut slot = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        slot.clone_from(&session);
        session
    }
}
