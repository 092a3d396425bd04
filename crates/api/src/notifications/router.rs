//! Event-to-notification routing engine.
//!
//! [`NotificationRouter`] subscribes to the clinic event bus, resolves each
//! event's [`Audience`] to concrete active users and stores a notification
//! for each of them.

use std::collections::BTreeSet;

use clinicops_core::types::DbId;
use clinicops_db::repositories::{NotificationRepo, UserRepo};
use clinicops_db::DbPool;
use clinicops_events::{Audience, ClinicEvent};
use tokio::sync::broadcast;

/// Routes clinic events to user notifications.
pub struct NotificationRouter {
    pool: DbPool,
}

impl NotificationRouter {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Consume events until the bus is dropped. Routing failures are logged
    /// and the loop carries on with the next event.
    pub async fn run(self, mut receiver: broadcast::Receiver<ClinicEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    if let Err(e) = self.route_event(&event).await {
                        tracing::error!(
                            error = %e,
                            event_type = %event.event_type,
                            "Failed to route event"
                        );
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Notification router lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, notification router shutting down");
                    break;
                }
            }
        }
    }

    /// Deliver a single event to its audience. Returns the number of
    /// notifications written.
    pub async fn route_event(&self, event: &ClinicEvent) -> Result<u64, sqlx::Error> {
        if event.audience.is_nobody() {
            return Ok(0);
        }
        let candidates = match &event.audience {
            Audience::None => Vec::new(),
            Audience::User(id) => vec![*id],
            Audience::Users(ids) => ids.clone(),
            Audience::Roles(roles) => UserRepo::active_ids_by_roles(&self.pool, roles).await?,
            Audience::AllActive => UserRepo::active_ids(&self.pool).await?,
        };

        let recipients = finalize_recipients(candidates, event.actor_user_id);
        if recipients.is_empty() {
            tracing::debug!(event_type = %event.event_type, "Event has no recipients");
            return Ok(0);
        }

        let written = NotificationRepo::create_many(
            &self.pool,
            &recipients,
            &event.event_type,
            &event.title,
            &event.message,
            event.entity_type.as_deref(),
            event.entity_id,
        )
        .await?;

        tracing::debug!(
            event_type = %event.event_type,
            recipients = written,
            "Event routed"
        );
        Ok(written)
    }
}

/// Deduplicate and drop the acting user.
fn finalize_recipients(candidates: Vec<DbId>, actor: Option<DbId>) -> Vec<DbId> {
    candidates
        .into_iter()
        .filter(|id| Some(*id) != actor)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actor_is_never_a_recipient() {
        assert_eq!(finalize_recipients(vec![3, 1, 2], Some(1)), vec![2, 3]);
    }

    #[test]
    fn duplicates_collapse() {
        assert_eq!(finalize_recipients(vec![5, 5, 4], None), vec![4, 5]);
    }
}
