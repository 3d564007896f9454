//! # openstack-core
//!
//! Core types and utilities shared by the OpenStack client crates.
//!
//! ## Modules
//!
//! - [`error`] - Error taxonomy and context wrapping
//! - [`id`] - Strongly-typed resource identifiers
//! - [`types`] - Service types and endpoint interfaces
//! - [`config`] - Client configuration
//! - [`client`] - HTTP transport settings
//! - [`query`] - Query-string builder
//! - [`merge`] - Deep merge of JSON request bodies

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod config;
pub mod error;
pub mod id;
pub mod merge;
pub mod query;
pub mod types;

// Re-export commonly used types
pub use error::{Error, ErrorKind, Result, ResultExt};
