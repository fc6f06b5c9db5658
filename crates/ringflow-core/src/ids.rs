//! Identifier newtypes for calls and extensions.

use serde::{Deserialize, Serialize};

/// Defines a string-backed identifier newtype with the usual conversions.
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Returns `true` if the identifier is the empty string.
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::new(s)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id!(
    /// Token identifying one call leg at the telephony provider.
    ///
    /// Every dial attempt yields its own `CallControlId`; the inbound caller
    /// leg has one too.
    CallControlId
);

define_id!(
    /// Identifier of a call session, shared by events about the same call.
    ///
    /// Caller hangup events are correlated on this value.
    CallSessionId
);

define_id!(
    /// Logical extension in a ring group, resolved to a dialable destination.
    ExtensionId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_conversions() {
        let id = CallControlId::new("v3:abc");
        assert_eq!(id.as_str(), "v3:abc");
        assert_eq!(id.to_string(), "v3:abc");

        let same: CallControlId = "v3:abc".into();
        assert_eq!(id, same);
        assert!(!id.is_empty());
        assert!(ExtensionId::new("").is_empty());
    }

    #[test]
    fn test_id_serializes_transparently() {
        let id = CallSessionId::new("session-1");
        let json = serde_json::to_string(&id).expect("serialize");
        assert_eq!(json, "\"session-1\"");

        let back: CallSessionId = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, id);
    }
}
