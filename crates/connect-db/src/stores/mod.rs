//! PostgreSQL implementations of the governance store traits.

mod artifact;
mod audit;
mod directory;
mod message;
mod workflow;

pub use artifact::PgArtifactStore;
pub use audit::PgAuditStore;
pub use directory::PgDirectoryStore;
pub use message::PgMessageStore;
pub use workflow::PgWorkflowStore;
