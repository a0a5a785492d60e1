//! Request and response models.

mod auth;
mod dashboard;

pub use auth::*;
pub use dashboard::*;
