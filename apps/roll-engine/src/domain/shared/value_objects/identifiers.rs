//! Strongly-typed identifiers for orders.
//!
//! These prevent mixing up our client-side ids with the gateway's ids.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! define_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new identifier from a string.
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Get the inner string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

define_id!(ClientOrderId, "Client-side order identifier sent with each order.");
define_id!(BrokerOrderId, "Gateway-assigned identifier for an accepted order.");

impl ClientOrderId {
    /// Generate a unique id tagged with the session client id.
    ///
    /// Format: `{client_id}-{uuid v4}`.
    #[must_use]
    pub fn generate(client_id: u32) -> Self {
        Self(format!("{client_id}-{}", uuid::Uuid::new_v4()))
    }
}
