//! Per-actor actionable notifications.
//!
//! Nothing is stored: every call evaluates [`RULES`] in declaration order
//! against live counts and returns the rules that fire.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::artifact::{ArtifactFilter, ArtifactScope, ArtifactStore};
use super::directory::{ActorFilter, ApplicationFilter, DirectoryStore};
use super::message::{MessageFilter, MessageStore};
use crate::actor::Actor;
use crate::error::Result;
use crate::types::{ApprovalStatus, ArtifactCategory, ArtifactState, Role, Severity};

/// Horizon of the BHRF expiring-artifact rule.
pub const EXPIRING_WITHIN_DAYS: i64 = 7;

/// A notification shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Stable per rule.
    pub id: String,
    pub severity: Severity,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

/// Count a rule is evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    PendingApplications,
    ExpiredCredentials,
    UnreadMessages,
    RequestedArtifacts,
    ExpiringArtifacts,
    PendingBhpRegistrations,
}

/// A notification rule.
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub id: &'static str,
    pub role: Role,
    pub signal: Signal,
    /// Fires when the count is strictly greater.
    pub threshold: i64,
    pub severity: Severity,
    pub link: Option<&'static str>,
}

impl Rule {
    fn message(&self, count: i64) -> String {
        match self.signal {
            Signal::PendingApplications => {
                format!("{count} facility application(s) awaiting your decision")
            }
            Signal::ExpiredCredentials => format!("{count} of your credential(s) have expired"),
            Signal::UnreadMessages => format!("{count} unread message(s)"),
            Signal::RequestedArtifacts => format!("{count} document(s) requested by your BHP"),
            Signal::ExpiringArtifacts => {
                format!("{count} document(s) expire within {EXPIRING_WITHIN_DAYS} days")
            }
            Signal::PendingBhpRegistrations => {
                format!("{count} BHP registration(s) awaiting review")
            }
        }
    }
}

/// All rules, in the order their notifications are returned.
pub const RULES: &[Rule] = &[
    Rule {
        id: "bhp-pending-applications",
        role: Role::Bhp,
        signal: Signal::PendingApplications,
        threshold: 0,
        severity: Severity::Warning,
        link: Some("/facility-applications"),
    },
    Rule {
        id: "bhp-expired-credentials",
        role: Role::Bhp,
        signal: Signal::ExpiredCredentials,
        threshold: 0,
        severity: Severity::Urgent,
        link: Some("/credentials"),
    },
    Rule {
        id: "bhp-unread-messages",
        role: Role::Bhp,
        signal: Signal::UnreadMessages,
        threshold: 5,
        severity: Severity::Info,
        link: Some("/messages"),
    },
    Rule {
        id: "bhrf-requested-artifacts",
        role: Role::Bhrf,
        signal: Signal::RequestedArtifacts,
        threshold: 0,
        severity: Severity::Warning,
        link: Some("/artifacts"),
    },
    Rule {
        id: "bhrf-expiring-artifacts",
        role: Role::Bhrf,
        signal: Signal::ExpiringArtifacts,
        threshold: 0,
        severity: Severity::Urgent,
        link: Some("/artifacts"),
    },
    Rule {
        id: "bhrf-unread-messages",
        role: Role::Bhrf,
        signal: Signal::UnreadMessages,
        threshold: 0,
        severity: Severity::Info,
        link: Some("/messages"),
    },
    Rule {
        id: "admin-pending-bhps",
        role: Role::Admin,
        signal: Signal::PendingBhpRegistrations,
        threshold: 0,
        severity: Severity::Warning,
        link: Some("/admin/users/pending"),
    },
];

/// Computes notifications from live store counts.
pub struct NotificationService {
    directory: Arc<dyn DirectoryStore>,
    artifacts: Arc<dyn ArtifactStore>,
    messages: Arc<dyn MessageStore>,
}

impl NotificationService {
    pub fn new(
        directory: Arc<dyn DirectoryStore>,
        artifacts: Arc<dyn ArtifactStore>,
        messages: Arc<dyn MessageStore>,
    ) -> Self {
        Self {
            directory,
            artifacts,
            messages,
        }
    }

    /// Notifications for `actor` at `now`. Unapproved actors get none.
    pub async fn urgent_for(&self, actor: &Actor, now: DateTime<Utc>) -> Result<Vec<Notification>> {
        if !actor.is_approved() {
            return Ok(Vec::new());
        }

        let mut notifications = Vec::new();
        for rule in RULES.iter().filter(|r| r.role == actor.role()) {
            let count = self.count(actor, rule.signal, now).await?;
            if count > rule.threshold {
                notifications.push(Notification {
                    id: rule.id.to_string(),
                    severity: rule.severity,
                    message: rule.message(count),
                    link: rule.link.map(str::to_string),
                });
            }
        }
        Ok(notifications)
    }

    async fn count(&self, actor: &Actor, signal: Signal, now: DateTime<Utc>) -> Result<i64> {
        match signal {
            Signal::PendingApplications => match actor.bhp_profile_id() {
                Some(bhp_id) => {
                    self.directory
                        .count_applications(&ApplicationFilter {
                            bhp_id: Some(bhp_id),
                            status: Some(ApprovalStatus::Pending),
                        })
                        .await
                }
                None => Ok(0),
            },
            Signal::ExpiredCredentials => match actor.bhp_profile_id() {
                Some(bhp_id) => {
                    self.artifacts
                        .count(&ArtifactFilter {
                            scope: Some(ArtifactScope::BhpProfile(bhp_id)),
                            category: Some(ArtifactCategory::Credential),
                            active_only: true,
                            expires_before: Some(now),
                            ..Default::default()
                        })
                        .await
                }
                None => Ok(0),
            },
            Signal::UnreadMessages => {
                self.messages
                    .count(&MessageFilter {
                        recipient_id: Some(actor.id()),
                        unread_only: true,
                        ..Default::default()
                    })
                    .await
            }
            Signal::RequestedArtifacts => match actor.bhrf_facility_id() {
                Some(facility_id) => {
                    self.artifacts
                        .count(&ArtifactFilter {
                            scope: Some(ArtifactScope::Facility(facility_id)),
                            state: Some(ArtifactState::Requested),
                            ..Default::default()
                        })
                        .await
                }
                None => Ok(0),
            },
            Signal::ExpiringArtifacts => match actor.bhrf_facility_id() {
                Some(facility_id) => {
                    self.artifacts
                        .count(&ArtifactFilter {
                            scope: Some(ArtifactScope::Facility(facility_id)),
                            active_only: true,
                            expires_from: Some(now),
                            expires_before: Some(now + Duration::days(EXPIRING_WITHIN_DAYS)),
                            ..Default::default()
                        })
                        .await
                }
                None => Ok(0),
            },
            Signal::PendingBhpRegistrations => {
                self.directory
                    .count_actors(&ActorFilter {
                        role: Some(Role::Bhp),
                        status: Some(ApprovalStatus::Pending),
                    })
                    .await
            }
        }
    }
}
