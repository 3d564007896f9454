//! Session, catalog and request dispatch for OpenStack services.
//!
//! [`OpenStackClient`] authenticates against the identity service, keeps the
//! resulting [`Session`] and issues authenticated calls to the services listed
//! in its [`Catalog`]. Service crates build their wrappers on top of it.

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod catalog;
pub mod client;
pub mod dispatcher;
pub mod models;
pub mod session;
pub mod transport;

pub use catalog::{Catalog, Endpoint, Region, Service};
pub use client::{OpenStackClient, OpenStackClientBuilder};
pub use dispatcher::{ApiRequest, RequestDispatcher};
pub use session::{ProjectScope, Session, Token};
pub use transport::{HttpTransport, ReqwestTransport, TransportRequest, TransportResponse};

/// Convenient result alias matching the shared OpenStack error type.
pub type Result<T> = openstack_core::Result<T>;
