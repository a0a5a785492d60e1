//! # connect-db
//!
//! PostgreSQL persistence for BHP Connect.
//!
//! Provides the connection pool, embedded migrations, and `Pg*` stores that
//! implement the store traits of `connect-governance`. Every compare-and-set
//! transition the services rely on is a single conditional `UPDATE`, and the
//! multi-row writes (registration, application approval, uploads, purges)
//! run in one transaction.
//!
//! ## Example
//!
//! ```ignore
//! use connect_db::{run_migrations, DbPool, PgDirectoryStore};
//!
//! let pool = DbPool::connect("postgres://localhost/connect").await?;
//! run_migrations(&pool).await?;
//! let directory = PgDirectoryStore::new(pool.clone());
//! ```

pub mod error;
pub mod migrations;
pub mod pool;
pub mod stores;

pub use error::DbError;
pub use migrations::run_migrations;
pub use pool::DbPool;
pub use stores::{
    PgArtifactStore, PgAuditStore, PgDirectoryStore, PgMessageStore, PgWorkflowStore,
};
