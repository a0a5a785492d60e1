//! Request middleware and extractors.

mod approved;
mod metadata;
mod session;

pub use approved::require_approved;
pub use metadata::ClientMetadata;
pub use session::{bearer_token, session_middleware};
