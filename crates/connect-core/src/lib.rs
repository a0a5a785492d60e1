//! BHP Connect Core Library
//!
//! Shared types and traits for BHP Connect.
//!
//! # Modules
//!
//! - [`ids`] - Strongly typed identifiers (ActorId, FacilityId, ...)
//! - [`traits`] - Ownership scoping traits (FacilityScoped, ProfileScoped)
//! - [`error`] - Standardized error taxonomy (ConnectError)
//!
//! # Example
//!
//! ```
//! use connect_core::{ActorId, FacilityId, ConnectError, Result};
//!
//! let actor = ActorId::new();
//! let facility = FacilityId::new();
//!
//! fn example() -> Result<()> {
//!     Err(ConnectError::Forbidden)
//! }
//! ```

pub mod error;
pub mod ids;
pub mod traits;

pub use error::{ConnectError, Result};
pub use ids::{
    ActorId, ArtifactId, ArtifactVersionId, AuditEntryId, BhpProfileId, BhrfProfileId,
    FacilityApplicationId, FacilityId, MessageId, ParseIdError, SubjectId, WorkflowDocumentId,
};
pub use traits::{FacilityScoped, ProfileScoped};
