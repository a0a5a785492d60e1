//! Session tokens, password hashing and TOTP for BHP Connect.
//!
//! This crate provides:
//! - JWT RS256 encoding and decoding of [`SessionClaims`]
//! - Argon2id password hashing with OWASP-recommended parameters
//! - TOTP secret generation and verification for MFA
//!
//! The session token is only a carrier for identity. Role and approval
//! status inside it are a snapshot taken at login; the API layer always
//! re-resolves the actor from storage before consulting the gate.
//!
//! # Example
//!
//! ```rust,ignore
//! use connect_auth::{encode_token, decode_token, SessionClaims, hash_password, verify_password};
//!
//! let claims = SessionClaims::builder()
//!     .subject(actor_id.to_string())
//!     .role("BHP")
//!     .approval_status("PENDING")
//!     .expires_in_secs(3600)
//!     .build();
//!
//! let token = encode_token(&claims, private_key_pem)?;
//! let decoded = decode_token(&token, public_key_pem)?;
//!
//! let hash = hash_password("my-secure-password")?;
//! assert!(verify_password("my-secure-password", &hash)?);
//! ```

mod claims;
mod error;
mod jwt;
mod mfa;
mod password;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_keys;

pub use claims::{SessionClaims, SessionClaimsBuilder, DEFAULT_ISSUER};
pub use error::AuthError;
pub use jwt::{decode_token, decode_token_with_config, encode_token, ValidationConfig};
pub use mfa::{generate_totp_secret, verify_totp_code, TotpSetup};
#[cfg(any(test, feature = "test-utils"))]
pub use mfa::current_totp_code;
pub use password::{hash_password, verify_password, PasswordHasher};
