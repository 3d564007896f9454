//! Idempotent server deployment on OpenStack.
//!
//! [`Deployer::ensure_deployment`] composes the image, compute and network
//! wrappers into one find-or-create pipeline: it resolves the flavor and the
//! image, reuses or creates the SSH keypair and the security group, renders
//! the bootstrap script and creates the server.
//!
//! ```no_run
//! use openstack_deploy::{Deployer, DeploymentRequest};
//! use openstack_session::OpenStackClient;
//!
//! # async fn run() -> openstack_core::Result<()> {
//! let client = OpenStackClient::new("https://auth.example.com/v3")?;
//! client.authenticate("deployer", "secret", None, Some("web")).await?;
//!
//! let request = DeploymentRequest::new("Debian 12", "b2-7", "deploy-key")
//!     .with_disk_size(20)
//!     .with_config("APP_ENV", "production");
//! let server = Deployer::new(&client, "GRA11").ensure_deployment(&request).await?;
//! println!("created {}", server.id);
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]

pub mod bootstrap;
pub mod deployer;
pub mod request;

pub use bootstrap::BootstrapScript;
pub use deployer::{Deployer, ProvisionedServer, DEFAULT_SECURITY_GROUP};
pub use request::{DeploymentRequest, SshKeySpec};

/// Convenient result alias using the shared OpenStack error type.
pub type Result<T> = openstack_core::Result<T>;
