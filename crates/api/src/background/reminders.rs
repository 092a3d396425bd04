//! Periodic reminders and housekeeping.
//!
//! On each tick the job:
//! - publishes `maintenance.due` for schedules due within
//!   [`MAINTENANCE_DUE_WINDOW_DAYS`] that were not yet reminded for their
//!   current due date,
//! - publishes `certification.expiring` for certifications expiring within
//!   the configured lookahead, once per expiry date,
//! - purges expired permission overrides and stale sessions.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use clinicops_core::assets::MAINTENANCE_DUE_WINDOW_DAYS;
use clinicops_core::audit::entities;
use clinicops_core::event_types;
use clinicops_core::roles::ALERT_ROLES;
use clinicops_db::repositories::{AssetRepo, HrRepo, PermissionRepo, SessionRepo};
use clinicops_db::DbPool;
use clinicops_events::{Audience, ClinicEvent, EventBus};
use tokio_util::sync::CancellationToken;

/// What a single pass did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReminderSummary {
    pub maintenance_reminded: usize,
    pub certifications_reminded: usize,
    pub overrides_purged: u64,
    pub sessions_purged: u64,
}

/// Run the reminder loop until `cancel` is triggered.
pub async fn run(
    pool: DbPool,
    event_bus: Arc<EventBus>,
    every: Duration,
    lookahead_days: i64,
    cancel: CancellationToken,
) {
    tracing::info!(
        interval_secs = every.as_secs(),
        lookahead_days,
        "Reminder job started"
    );

    let mut interval = tokio::time::interval(every);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Reminder job stopping");
                break;
            }
            _ = interval.tick() => {
                match run_once(&pool, &event_bus, lookahead_days).await {
                    Ok(summary) => {
                        tracing::info!(
                            maintenance = summary.maintenance_reminded,
                            certifications = summary.certifications_reminded,
                            overrides_purged = summary.overrides_purged,
                            sessions_purged = summary.sessions_purged,
                            "Reminder pass complete"
                        );
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Reminder pass failed");
                    }
                }
            }
        }
    }
}

/// One reminder pass. Each reminded row is marked so the next pass skips it
/// until its due or expiry date changes.
pub async fn run_once(
    pool: &DbPool,
    event_bus: &EventBus,
    lookahead_days: i64,
) -> Result<ReminderSummary, sqlx::Error> {
    let mut summary = ReminderSummary::default();
    let today = Utc::now().date_naive();

    let maintenance_cutoff = today + chrono::Duration::days(MAINTENANCE_DUE_WINDOW_DAYS);
    for due in AssetRepo::maintenance_due_for_reminder(pool, maintenance_cutoff).await? {
        let audience = match due.assigned_to_id {
            Some(user_id) => Audience::User(user_id),
            None => Audience::roles(ALERT_ROLES),
        };
        event_bus.publish(
            ClinicEvent::new(
                event_types::MAINTENANCE_DUE,
                format!("Maintenance due: {}", due.asset_tag),
                format!(
                    "'{}' on {} is due on {}",
                    due.title, due.asset_name, due.next_due_on
                ),
            )
            .with_source(entities::MAINTENANCE_SCHEDULE, due.schedule_id)
            .with_audience(audience),
        );
        AssetRepo::mark_schedule_reminded(pool, due.schedule_id, due.next_due_on).await?;
        summary.maintenance_reminded += 1;
    }

    let cert_cutoff = today + chrono::Duration::days(lookahead_days);
    for cert in HrRepo::certifications_due_for_reminder(pool, today, cert_cutoff).await? {
        let days_left = (cert.expires_on - today).num_days();
        event_bus.publish(
            ClinicEvent::new(
                event_types::CERTIFICATION_EXPIRING,
                "Certification expiring",
                format!(
                    "{} expires on {} ({days_left} days)",
                    cert.name, cert.expires_on
                ),
            )
            .with_source(entities::CERTIFICATION, cert.id)
            .with_audience(Audience::User(cert.user_id)),
        );
        HrRepo::mark_certification_reminded(pool, cert.id, cert.expires_on).await?;
        summary.certifications_reminded += 1;
    }

    summary.overrides_purged = PermissionRepo::purge_expired(pool, Utc::now()).await?;
    summary.sessions_purged = SessionRepo::purge_stale(pool).await?;

    Ok(summary)
}
