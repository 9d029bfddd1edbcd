//! Referral operations — ordered transitions, privileged overrides,
//! logistics and follow-up chases.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use amparo_types::{Actor, CoreError, CoreResult, EventOrder, IdentityDirectory, Scope};

use crate::events::{ReferralEvent, ReferralEventKind};
use crate::inbox::ReferralInboxEntry;
use crate::model::{NewReferral, Referral};
use crate::status::{ReferralStatus, ReferralTrack};
use crate::store::ReferralStore;

/// Partial logistics update; unset fields are left as recorded.
#[derive(Debug, Clone, Default)]
pub struct LogisticsUpdate {
    pub ticket_number: Option<String>,
    pub carrier: Option<String>,
    pub food_kit: Option<bool>,
    pub hygiene_kit: Option<bool>,
}

pub struct ReferralService {
    store: Arc<dyn ReferralStore>,
    identity: Arc<dyn IdentityDirectory>,
}

impl ReferralService {
    pub fn new(store: Arc<dyn ReferralStore>, identity: Arc<dyn IdentityDirectory>) -> Self {
        Self { store, identity }
    }

    async fn actor(&self, actor_id: Uuid) -> CoreResult<Actor> {
        self.identity
            .resolve(actor_id)
            .await
            .ok_or_else(|| CoreError::not_found("actor", actor_id))
    }

    /// Create a referral at its track's initial status.
    pub async fn create(&self, req: NewReferral, actor_id: Uuid) -> CoreResult<Referral> {
        let actor = self.actor(actor_id).await?;
        if req.motive.trim().is_empty() {
            return Err(CoreError::Validation("referral motive is required".into()));
        }
        if req.track == ReferralTrack::CrossMunicipality && req.consent.is_none() {
            return Err(CoreError::Validation(
                "consent flag is required for cross-municipality referrals".into(),
            ));
        }

        let now = Utc::now();
        let referral = Referral::open(&req, now);
        let event = ReferralEvent::new(
            referral.referral_id,
            ReferralEventKind::from(referral.status),
            Some(req.motive.clone()),
            actor.display_name,
            now,
        );
        let inbox = (req.track == ReferralTrack::CrossMunicipality).then(|| {
            ReferralInboxEntry::new(referral.referral_id, referral.destination, referral.status, now)
        });
        self.store.insert(&referral, event, inbox).await?;

        info!(
            referral_id = %referral.referral_id,
            track = %referral.track,
            status = %referral.status,
            "referral created"
        );
        Ok(referral)
    }

    /// Move the referral to `target`.
    ///
    /// Non-privileged actors may only take the single next step of the
    /// track's ladder. Privileged actors (coordinator capability on either
    /// endpoint municipality) may jump anywhere; the jump is recorded as
    /// forced in the event detail. Re-setting the current status is an
    /// idempotent no-op.
    pub async fn set_status(
        &self,
        referral_id: Uuid,
        target: ReferralStatus,
        detail: Option<String>,
        acting_scope: Scope,
        actor_id: Uuid,
    ) -> CoreResult<Referral> {
        let actor = self.actor(actor_id).await?;
        let mut referral = self.store.load(referral_id).await?;

        if !referral.track.admits(target) {
            return Err(CoreError::Validation(format!(
                "status '{}' is not valid for {} referrals",
                target, referral.track
            )));
        }
        if target == referral.status {
            return Ok(referral);
        }

        let allowed = referral.track.allowed_next(referral.status);
        let in_order = allowed.contains(&target);
        if !in_order {
            let privileged = self
                .identity
                .is_privileged(actor_id, &referral.origin)
                .await
                || self
                    .identity
                    .is_privileged(actor_id, &referral.destination)
                    .await;
            if !privileged {
                return Err(match allowed {
                    [] => CoreError::State(format!(
                        "referral already '{}'; no further transitions",
                        referral.status
                    )),
                    _ => CoreError::State(format!(
                        "referral is '{}'; next allowed status is {}",
                        referral.status,
                        describe_allowed(allowed)
                    )),
                });
            }
        }

        let now = Utc::now();
        let previous = referral.status;
        let detail = if in_order {
            detail
        } else {
            let marker = format!(
                "forced out-of-order transition from '{}' to '{}'",
                previous, target
            );
            Some(match detail {
                Some(d) => format!("{} ({})", d, marker),
                None => marker,
            })
        };

        referral.status = target;
        referral.milestones.stamp(target, now);
        referral.updated_at = now;

        let event = ReferralEvent::new(
            referral_id,
            ReferralEventKind::from(target),
            detail,
            actor.display_name,
            now,
        );
        let inbox = self.inbox_row(&referral, &acting_scope, now);
        self.store.commit(&referral, event, inbox).await?;

        if in_order {
            info!(referral_id = %referral_id, from = %previous, to = %target, "referral status updated");
        } else {
            warn!(referral_id = %referral_id, from = %previous, to = %target, "forced referral transition");
        }
        Ok(referral)
    }

    /// Record transport logistics independent of status.
    /// Cross-municipality referrals only.
    pub async fn record_logistics(
        &self,
        referral_id: Uuid,
        update: LogisticsUpdate,
        acting_scope: Scope,
        actor_id: Uuid,
    ) -> CoreResult<Referral> {
        let actor = self.actor(actor_id).await?;
        let mut referral = self.store.load(referral_id).await?;
        let logistics = referral.logistics.as_mut().ok_or_else(|| {
            CoreError::Validation(
                "logistics milestones apply only to cross-municipality referrals".into(),
            )
        })?;

        if let Some(ticket) = update.ticket_number {
            logistics.ticket_number = Some(ticket);
        }
        if let Some(carrier) = update.carrier {
            logistics.carrier = Some(carrier);
        }
        if let Some(food) = update.food_kit {
            logistics.food_kit = food;
        }
        if let Some(hygiene) = update.hygiene_kit {
            logistics.hygiene_kit = hygiene;
        }
        let summary = logistics.summary();

        let now = Utc::now();
        referral.updated_at = now;
        let event = ReferralEvent::new(
            referral_id,
            ReferralEventKind::Logistics,
            Some(summary),
            actor.display_name,
            now,
        );
        let inbox = self.inbox_row(&referral, &acting_scope, now);
        self.store.commit(&referral, event, inbox).await?;
        Ok(referral)
    }

    /// Follow-up chase ("cobrança") — event only, status untouched, but the
    /// destination's inbox is bumped.
    pub async fn follow_up(
        &self,
        referral_id: Uuid,
        detail: Option<String>,
        acting_scope: Scope,
        actor_id: Uuid,
    ) -> CoreResult<()> {
        let actor = self.actor(actor_id).await?;
        let referral = self.store.load(referral_id).await?;

        let now = Utc::now();
        let event = ReferralEvent::new(
            referral_id,
            ReferralEventKind::FollowUp,
            detail,
            actor.display_name,
            now,
        );
        let inbox = self.inbox_row(&referral, &acting_scope, now);
        self.store.commit(&referral, event, inbox).await
    }

    pub async fn events(
        &self,
        referral_id: Uuid,
        order: EventOrder,
    ) -> CoreResult<Vec<ReferralEvent>> {
        self.store.load(referral_id).await?;
        self.store.events(referral_id, order).await
    }

    pub async fn inbox_for(&self, destination: &Scope) -> CoreResult<Vec<ReferralInboxEntry>> {
        self.store.inbox(destination).await
    }

    /// Updated inbox row for cross-municipality referrals; unread unless
    /// the destination itself is acting on its own item.
    fn inbox_row(
        &self,
        referral: &Referral,
        acting_scope: &Scope,
        now: chrono::DateTime<Utc>,
    ) -> Option<ReferralInboxEntry> {
        (referral.track == ReferralTrack::CrossMunicipality).then(|| ReferralInboxEntry {
            referral_id: referral.referral_id,
            destination: referral.destination,
            last_status: referral.status,
            unread: acting_scope.municipality != referral.destination.municipality,
            last_event_at: now,
        })
    }
}

fn describe_allowed(allowed: &[ReferralStatus]) -> String {
    allowed
        .iter()
        .map(|s| format!("'{}'", s))
        .collect::<Vec<_>>()
        .join(" or ")
}
