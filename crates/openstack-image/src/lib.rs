//! Image service wrappers for OpenStack.
//!
//! Provides strongly typed models and an asynchronous client for the image
//! service (Glance v2) of one region.

#![deny(missing_docs)]

pub mod client;
pub mod models;

pub use client::ImageClient;
pub use models::{Image, ImageListParams};

/// Convenient result alias using the shared OpenStack error type.
pub type Result<T> = openstack_core::Result<T>;
