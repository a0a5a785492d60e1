//! TOTP secrets for MFA.
//!
//! Secrets are 160-bit random values stored base32-encoded. Codes are
//! 6-digit SHA1 with a 30 second step and one step of skew tolerance.

use crate::error::AuthError;
use data_encoding::BASE32;
use rand::rngs::OsRng;
use rand::RngCore;
use totp_rs::{Algorithm, TOTP};

/// TOTP secret length in bytes (160 bits).
const TOTP_SECRET_LENGTH: usize = 20;

/// A freshly generated TOTP secret and its enrolment URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TotpSetup {
    /// Base32-encoded secret, as stored.
    pub secret: String,
    /// `otpauth://` URI for authenticator apps (QR payload).
    pub otpauth_uri: String,
}

fn build_totp(
    secret_bytes: Vec<u8>,
    issuer: Option<String>,
    account: String,
) -> Result<TOTP, AuthError> {
    TOTP::new(Algorithm::SHA1, 6, 1, 30, secret_bytes, issuer, account)
        .map_err(|e| AuthError::InvalidTotpSecret(e.to_string()))
}

fn decode_secret(secret: &str) -> Result<Vec<u8>, AuthError> {
    BASE32
        .decode(secret.as_bytes())
        .map_err(|e| AuthError::InvalidTotpSecret(e.to_string()))
}

/// Generate a new TOTP secret for `account` (usually the email).
pub fn generate_totp_secret(issuer: &str, account: &str) -> Result<TotpSetup, AuthError> {
    let mut secret_bytes = vec![0u8; TOTP_SECRET_LENGTH];
    OsRng.fill_bytes(&mut secret_bytes);

    let secret = BASE32.encode(&secret_bytes);
    let totp = build_totp(secret_bytes, Some(issuer.to_string()), account.to_string())?;

    Ok(TotpSetup {
        secret,
        otpauth_uri: totp.get_url(),
    })
}

/// Check a 6-digit code against a stored base32 secret.
///
/// A malformed secret is an error; a wrong code is `Ok(false)`.
pub fn verify_totp_code(secret: &str, code: &str) -> Result<bool, AuthError> {
    let totp = build_totp(decode_secret(secret)?, None, String::new())?;
    Ok(totp.check_current(code).unwrap_or(false))
}

/// Current code for a stored secret. Test suites use this to enrol.
#[cfg(any(test, feature = "test-utils"))]
pub fn current_totp_code(secret: &str) -> Result<String, AuthError> {
    let totp = build_totp(decode_secret(secret)?, None, String::new())?;
    totp.generate_current()
        .map_err(|e| AuthError::InvalidTotpSecret(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_secret_is_base32_of_expected_length() {
        let setup = generate_totp_secret("BHP Connect", "bhp@example.com").unwrap();
        let bytes = BASE32.decode(setup.secret.as_bytes()).unwrap();
        assert_eq!(bytes.len(), TOTP_SECRET_LENGTH);
    }

    #[test]
    fn test_uri_names_issuer_and_account() {
        let setup = generate_totp_secret("BHP Connect", "bhp@example.com").unwrap();
        assert!(setup.otpauth_uri.starts_with("otpauth://totp/"));
        assert!(setup.otpauth_uri.contains("bhp%40example.com") || setup.otpauth_uri.contains("bhp@example.com"));
    }

    #[test]
    fn test_current_code_verifies() {
        let setup = generate_totp_secret("BHP Connect", "a@example.com").unwrap();
        let code = current_totp_code(&setup.secret).unwrap();
        assert!(verify_totp_code(&setup.secret, &code).unwrap());
    }

    #[test]
    fn test_wrong_code_is_false_not_error() {
        let setup = generate_totp_secret("BHP Connect", "a@example.com").unwrap();
        let code = current_totp_code(&setup.secret).unwrap();
        let wrong = if code == "000000" { "111111" } else { "000000" };
        assert!(!verify_totp_code(&setup.secret, wrong).unwrap());
    }

    #[test]
    fn test_malformed_secret_is_error() {
        assert!(verify_totp_code("not base32!", "123456").is_err());
    }
}
