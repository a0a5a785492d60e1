//! Periodic purge of deactivated compliance artifacts.

use std::sync::Arc;
use std::time::Duration;

use connect_governance::services::ArtifactService;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Run [`ArtifactService::reconcile_orphans`] every `every`.
///
/// The first run happens one interval after startup.
pub fn spawn_reconciler(artifacts: Arc<ArtifactService>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + every, every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            match artifacts.reconcile_orphans().await {
                Ok(report) if report.purged_artifacts > 0 || report.failed_object_deletes > 0 => {
                    tracing::info!(
                        purged_artifacts = report.purged_artifacts,
                        deleted_objects = report.deleted_objects,
                        failed_object_deletes = report.failed_object_deletes,
                        "Artifact reconciliation completed"
                    );
                }
                Ok(_) => tracing::debug!("Artifact reconciliation found nothing to purge"),
                Err(e) => tracing::warn!(error = %e, "Artifact reconciliation failed"),
            }
        }
    })
}
