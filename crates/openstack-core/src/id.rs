//! Strongly-typed identifiers for OpenStack resources.
//!
//! OpenStack ids are opaque strings (flavor ids such as `"s1-2"` are not UUIDs);
//! each wrapper holds a `String`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Macro to generate strongly-typed id wrapper types.
macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident, $doc:expr) => {
        $(#[$meta])*
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new id wrapper.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the id as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Converts to the inner `String`.
            #[must_use]
            pub fn into_string(self) -> String {
                self.0
            }

            /// Parses an id, rejecting blank input.
            ///
            /// # Errors
            ///
            /// Returns an error if the string is empty or whitespace.
            pub fn parse_str(input: &str) -> Result<Self> {
                if input.trim().is_empty() {
                    return Err(Error::Validation(format!(
                        "{} must not be blank",
                        stringify!($name)
                    )));
                }
                Ok(Self(input.to_string()))
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                Self::parse_str(s)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

id_type!(ImageId, "Image id (Glance)");
id_type!(FlavorId, "Flavor id (Nova)");
id_type!(ServerId, "Server id (Nova)");
id_type!(NetworkId, "Network id (Neutron)");
id_type!(SubnetId, "Subnet id (Neutron)");
id_type!(SecurityGroupId, "Security group id (Neutron)");
id_type!(SecurityGroupRuleId, "Security group rule id (Neutron)");
id_type!(ProjectId, "Project id (Keystone)");
