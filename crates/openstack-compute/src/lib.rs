//! Compute service wrappers for OpenStack.
//!
//! Flavors, keypairs, servers, server actions and status polling against the
//! compute service (Nova) of one region.

#![deny(missing_docs)]

pub mod client;
pub mod models;

pub use client::ComputeClient;
pub use models::{
    Address, Flavor, FlavorSummary, Keypair, RebootType, Server, ServerAction, ServerListParams,
    ServerStatus,
};

/// Convenient result alias using the shared OpenStack error type.
pub type Result<T> = openstack_core::Result<T>;
