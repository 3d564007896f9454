//! Network service wrappers for OpenStack.
//!
//! Networks, subnets, security groups and security group rules against the
//! network service (Neutron v2.0) of one region.

#![deny(missing_docs)]

pub mod client;
pub mod models;

pub use client::NetworkClient;
pub use models::{
    Direction, Network, NetworkListParams, SecurityGroup, SecurityGroupRule,
    SecurityGroupRuleRequest, Subnet, SubnetListParams,
};

/// Convenient result alias using the shared OpenStack error type.
pub type Result<T> = openstack_core::Result<T>;
