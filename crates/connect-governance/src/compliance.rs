//! Derived expiry status for compliance artifacts.

use chrono::{DateTime, Duration, Utc};

use crate::types::ComplianceStatus;

/// Artifacts expiring within this many days are reported as expiring soon.
pub const EXPIRING_SOON_DAYS: i64 = 30;

/// Derive the compliance status from an expiry date.
///
/// `no_expiration` wins over any date. A missing date without the flag is
/// treated as valid.
#[must_use]
pub fn derive_status(
    expires_at: Option<DateTime<Utc>>,
    no_expiration: bool,
    now: DateTime<Utc>,
) -> ComplianceStatus {
    if no_expiration {
        return ComplianceStatus::Valid;
    }
    match expires_at {
        Some(at) if at < now => ComplianceStatus::Expired,
        Some(at) if at <= now + Duration::days(EXPIRING_SOON_DAYS) => {
            ComplianceStatus::ExpiringSoon
        }
        _ => ComplianceStatus::Valid,
    }
}
