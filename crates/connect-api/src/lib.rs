//! HTTP JSON API for BHP Connect.
//!
//! Thin axum layer over `connect-governance`: handlers resolve the caller,
//! hand the typed [`connect_governance::Actor`] to a service and map
//! [`connect_governance::GovernanceError`] onto status codes. No handler
//! makes an authorization decision of its own.
//!
//! # Usage
//!
//! ```rust,ignore
//! let state = ConnectState::new(backends, sessions, chrono::Duration::minutes(15));
//! let app = connect_api::router(state);
//! ```

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod router;
pub mod session;
pub mod state;

pub use error::{ApiError, ApiResult, ErrorResponse};
pub use router::router;
pub use session::SessionKeys;
pub use state::{Backends, ConnectState};
