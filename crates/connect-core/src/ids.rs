//! Strongly Typed Identifiers
//!
//! Every entity in BHP Connect is keyed by a UUID. Wrapping each one in its
//! own newtype keeps a `FacilityId` from being handed to a function that
//! expects a `BhpProfileId`, which is exactly the mistake that leaks data
//! across tenants.
//!
//! # Example
//!
//! ```
//! use connect_core::{BhpProfileId, FacilityId};
//!
//! let facility = FacilityId::new();
//! let owner = BhpProfileId::new();
//!
//! fn requires_facility(id: FacilityId) -> String {
//!     id.to_string()
//! }
//!
//! let result = requires_facility(facility);
//! // requires_facility(owner); // This would not compile!
//! ```

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

/// Error type for ID parsing failures
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    /// The type of ID that failed to parse
    pub id_type: &'static str,
    /// The underlying UUID parse error message
    pub message: String,
}

impl Display for ParseIdError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Failed to parse {}: {}", self.id_type, self.message)
    }
}

impl std::error::Error for ParseIdError {}

/// Macro to define a strongly-typed ID type
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random ID using UUID v4.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates an ID from an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns a reference to the underlying UUID.
            #[must_use]
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            /// Consumes the ID and returns the underlying UUID.
            #[must_use]
            pub fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                Uuid::parse_str(s)
                    .map(Self)
                    .map_err(|e| ParseIdError {
                        id_type: stringify!($name),
                        message: e.to_string(),
                    })
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id!(
    /// Identifier of a registered account (ADMIN, BHP or BHRF).
    ///
    /// ```
    /// use connect_core::ActorId;
    /// use uuid::Uuid;
    ///
    /// let uuid = Uuid::new_v4();
    /// let actor = ActorId::from_uuid(uuid);
    /// assert_eq!(actor.as_uuid(), &uuid);
    ///
    /// let parsed: ActorId = "550e8400-e29b-41d4-a716-446655440000".parse().unwrap();
    /// assert_eq!(parsed.to_string(), "550e8400-e29b-41d4-a716-446655440000");
    /// ```
    ActorId
);

define_id!(
    /// Identifier of a Behavioral Health Professional profile.
    ///
    /// A BHP profile owns zero or more facilities and is the decider for
    /// every workflow document filed against them.
    BhpProfileId
);

define_id!(
    /// Identifier of a Behavioral Health Residential Facility profile.
    BhrfProfileId
);

define_id!(
    /// Identifier of a facility.
    FacilityId
);

define_id!(
    /// Identifier of a facility application filed at BHRF registration.
    FacilityApplicationId
);

define_id!(
    /// Identifier of an intake or ASAM workflow document.
    WorkflowDocumentId
);

define_id!(
    /// Identifier of the resident a workflow document is about.
    SubjectId
);

define_id!(
    /// Identifier of a compliance artifact (document, employee document, credential).
    ArtifactId
);

define_id!(
    /// Identifier of a single uploaded version of a compliance artifact.
    ArtifactVersionId
);

define_id!(
    /// Identifier of a facility-scoped message.
    MessageId
);

define_id!(
    /// Identifier of an audit log entry.
    AuditEntryId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_creates_distinct_ids() {
        let a = ActorId::new();
        let b = ActorId::new();
        assert_ne!(a, b);
        assert_eq!(a.to_string().len(), 36);
    }

    #[test]
    fn test_from_uuid_preserves_value() {
        let uuid = Uuid::new_v4();
        let id = FacilityId::from_uuid(uuid);
        assert_eq!(id.as_uuid(), &uuid);
        assert_eq!(id.into_inner(), uuid);
        assert_eq!(Uuid::from(id), uuid);
    }

    #[test]
    fn test_parse_round_trips_display() {
        let id = WorkflowDocumentId::new();
        let parsed: WorkflowDocumentId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_parse_error_names_the_type() {
        let err = "not-a-uuid".parse::<BhpProfileId>().unwrap_err();
        assert_eq!(err.id_type, "BhpProfileId");
        assert!(err.to_string().starts_with("Failed to parse BhpProfileId"));
    }

    #[test]
    fn test_serde_is_transparent() {
        let uuid = Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").unwrap();
        let id = ArtifactId::from_uuid(uuid);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"550e8400-e29b-41d4-a716-446655440000\"");

        let back: ArtifactId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_ids_are_hashable() {
        use std::collections::HashSet;

        let mut set = HashSet::new();
        let id = MessageId::new();
        set.insert(id);
        set.insert(id);
        assert_eq!(set.len(), 1);
    }
}
