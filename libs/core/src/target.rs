//! Addressing of a remote `service/action` endpoint.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Characters that would end a path segment or the path itself.
const RESERVED: [char; 3] = ['/', '?', '#'];

// Newtype over a validated path segment.
// Generates: struct, new() returning Option<Self>, as_str(), Display,
// and a TryFrom<String> that deserialization goes through.
macro_rules! segment {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String")]
        pub struct $name(String);

        impl $name {
            /// Returns `None` if the value is blank or contains `/`, `?` or `#`.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.trim().is_empty() || v.contains(RESERVED) {
                    None
                } else {
                    Some(Self(v))
                }
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = Error;

            fn try_from(value: String) -> Result<Self> {
                Self::new(value.as_str()).ok_or_else(|| {
                    Error::invalid_target(format!(
                        concat!("bad ", stringify!($name), " {:?}"),
                        value
                    ))
                })
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

segment! {
    /// Name of a remote service, the first path segment after the base URL.
    ServiceName
}

segment! {
    /// Name of an action within a service, the second path segment.
    ActionName
}

/// Identifies one remote endpoint for a single call
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServiceTarget {
    service: ServiceName,
    action: ActionName,
    service_key: Option<String>,
}

impl ServiceTarget {
    pub fn new(service: ServiceName, action: ActionName) -> Self {
        Self {
            service,
            action,
            service_key: None,
        }
    }

    /// Build a target from raw names.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTarget`] if either name is blank or contains
    /// `/`, `?` or `#`.
    pub fn parse(service: &str, action: &str) -> Result<Self> {
        let service = ServiceName::new(service)
            .ok_or_else(|| Error::invalid_target(format!("bad service name {service:?}")))?;
        let action = ActionName::new(action)
            .ok_or_else(|| Error::invalid_target(format!("bad action name {action:?}")))?;
        Ok(Self::new(service, action))
    }

    /// Attach a per-call access key. Blank keys are ignored.
    pub fn with_service_key(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        self.service_key = if key.trim().is_empty() {
            None
        } else {
            Some(key)
        };
        self
    }

    pub fn service(&self) -> &ServiceName {
        &self.service
    }

    pub fn action(&self) -> &ActionName {
        &self.action
    }

    pub fn service_key(&self) -> Option<&str> {
        self.service_key.as_deref()
    }

    /// `{base}/{service}/{action}`, with trailing slashes on `base` dropped.
    pub fn url(&self, base: &str) -> String {
        format!(
            "{}/{}/{}",
            base.trim_end_matches('/'),
            self.service,
            self.action
        )
    }
}
