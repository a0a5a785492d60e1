//! HTTP handlers.

pub mod admin;
pub mod applications;
pub mod artifacts;
pub mod auth;
pub mod documents;
pub mod facilities;
pub mod files;
pub mod health;
pub mod me;
pub mod messages;
pub mod notifications;
