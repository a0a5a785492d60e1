//! Session token issue and verification.

use connect_auth::{
    decode_token_with_config, encode_token, AuthError, SessionClaims, ValidationConfig,
    DEFAULT_ISSUER,
};
use connect_governance::ActorRecord;

/// RS256 key pair and token lifetime.
#[derive(Clone)]
pub struct SessionKeys {
    private_key: Vec<u8>,
    public_key: Vec<u8>,
    ttl_secs: i64,
}

impl std::fmt::Debug for SessionKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionKeys")
            .field("ttl_secs", &self.ttl_secs)
            .finish_non_exhaustive()
    }
}

impl SessionKeys {
    pub fn new(private_key: impl Into<Vec<u8>>, public_key: impl Into<Vec<u8>>, ttl_secs: i64) -> Self {
        Self {
            private_key: private_key.into(),
            public_key: public_key.into(),
            ttl_secs,
        }
    }

    #[must_use]
    pub fn ttl_secs(&self) -> i64 {
        self.ttl_secs
    }

    /// Sign a session for `record`. Role and status are informational only.
    pub fn issue(&self, record: &ActorRecord) -> Result<String, AuthError> {
        let mut builder = SessionClaims::builder()
            .subject(record.id.to_string())
            .role(record.role.as_str())
            .approval_status(record.approval_status.as_str())
            .email(record.email.clone())
            .expires_in_secs(self.ttl_secs);
        if let Some(id) = record.bhp_profile_id {
            builder = builder.bhp_profile(id);
        }
        if let Some(id) = record.bhrf_profile_id {
            builder = builder.bhrf_profile(id);
        }
        encode_token(&builder.build(), &self.private_key)
    }

    /// Validate signature, expiry and issuer.
    pub fn verify(&self, token: &str) -> Result<SessionClaims, AuthError> {
        decode_token_with_config(
            token,
            &self.public_key,
            &ValidationConfig::default().issuer(DEFAULT_ISSUER),
        )
    }
}
