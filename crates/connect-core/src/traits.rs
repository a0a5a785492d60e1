//! Ownership Scoping Traits
//!
//! Entities in BHP Connect are owned either through a facility (intakes,
//! facility documents, messages) or directly by a BHP profile (credentials,
//! facility applications). These traits let the authorization gate build
//! its target from any entity without knowing the concrete type.
//!
//! # Example
//!
//! ```
//! use connect_core::{FacilityId, FacilityScoped};
//!
//! struct Intake {
//!     facility_id: FacilityId,
//! }
//!
//! impl FacilityScoped for Intake {
//!     fn facility_id(&self) -> FacilityId {
//!         self.facility_id
//!     }
//! }
//!
//! fn same_facility<T: FacilityScoped>(a: &T, b: &T) -> bool {
//!     a.facility_id() == b.facility_id()
//! }
//!
//! let facility = FacilityId::new();
//! assert!(same_facility(&Intake { facility_id: facility }, &Intake { facility_id: facility }));
//! ```

use crate::ids::{BhpProfileId, FacilityId};

/// Trait for entities that belong to a facility.
///
/// This trait is object-safe.
pub trait FacilityScoped {
    /// Returns the facility that owns this entity.
    fn facility_id(&self) -> FacilityId;
}

/// Trait for entities owned directly by a BHP profile.
pub trait ProfileScoped {
    /// Returns the BHP profile that owns this entity.
    fn bhp_profile_id(&self) -> BhpProfileId;
}
