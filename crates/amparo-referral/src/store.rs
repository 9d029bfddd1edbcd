//! Referral persistence boundary: referral + ledger + inbox.
//!
//! Like the case store, each commit couples one referral mutation with one
//! ledger append (and, for cross-municipality referrals, the inbox row)
//! as a single unit.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use amparo_types::{CoreError, CoreResult, EventOrder, Scope};

use crate::events::ReferralEvent;
use crate::inbox::ReferralInboxEntry;
use crate::model::Referral;

#[async_trait]
pub trait ReferralStore: Send + Sync {
    /// Persist a new referral, its creation event, and (cross-municipality
    /// only) its inbox row atomically.
    async fn insert(
        &self,
        referral: &Referral,
        event: ReferralEvent,
        inbox: Option<ReferralInboxEntry>,
    ) -> CoreResult<()>;

    async fn load(&self, referral_id: Uuid) -> CoreResult<Referral>;

    /// Persist one referral mutation + one ledger append + the updated
    /// inbox row atomically.
    async fn commit(
        &self,
        referral: &Referral,
        event: ReferralEvent,
        inbox: Option<ReferralInboxEntry>,
    ) -> CoreResult<()>;

    /// Ledger in insertion order.
    async fn events(&self, referral_id: Uuid, order: EventOrder) -> CoreResult<Vec<ReferralEvent>>;

    /// Inbox rows for a destination scope.
    async fn inbox(&self, destination: &Scope) -> CoreResult<Vec<ReferralInboxEntry>>;

    /// Non-terminal referrals originating from or destined to the scope.
    async fn list_open(&self, scope: &Scope) -> CoreResult<Vec<Referral>>;
}

#[derive(Default)]
struct Inner {
    referrals: HashMap<Uuid, Referral>,
    events: HashMap<Uuid, Vec<ReferralEvent>>,
    inbox: HashMap<Uuid, ReferralInboxEntry>,
    next_seq: u64,
}

impl Inner {
    fn append(&mut self, referral_id: Uuid, mut event: ReferralEvent) {
        self.next_seq += 1;
        event.seq = self.next_seq;
        self.events.entry(referral_id).or_default().push(event);
    }
}

/// In-memory store for tests and embedded deployments.
#[derive(Default)]
pub struct InMemoryReferralStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryReferralStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReferralStore for InMemoryReferralStore {
    async fn insert(
        &self,
        referral: &Referral,
        event: ReferralEvent,
        inbox: Option<ReferralInboxEntry>,
    ) -> CoreResult<()> {
        let mut inner = self.inner.write().await;
        if inner.referrals.contains_key(&referral.referral_id) {
            return Err(CoreError::Validation(format!(
                "referral {} already exists",
                referral.referral_id
            )));
        }
        inner.referrals.insert(referral.referral_id, referral.clone());
        inner.append(referral.referral_id, event);
        if let Some(entry) = inbox {
            inner.inbox.insert(referral.referral_id, entry);
        }
        Ok(())
    }

    async fn load(&self, referral_id: Uuid) -> CoreResult<Referral> {
        let inner = self.inner.read().await;
        inner
            .referrals
            .get(&referral_id)
            .cloned()
            .ok_or_else(|| CoreError::not_found("referral", referral_id))
    }

    async fn commit(
        &self,
        referral: &Referral,
        event: ReferralEvent,
        inbox: Option<ReferralInboxEntry>,
    ) -> CoreResult<()> {
        let mut inner = self.inner.write().await;
        if !inner.referrals.contains_key(&referral.referral_id) {
            return Err(CoreError::not_found("referral", referral.referral_id));
        }
        inner.referrals.insert(referral.referral_id, referral.clone());
        inner.append(referral.referral_id, event);
        if let Some(entry) = inbox {
            inner.inbox.insert(referral.referral_id, entry);
        }
        Ok(())
    }

    async fn events(
        &self,
        referral_id: Uuid,
        order: EventOrder,
    ) -> CoreResult<Vec<ReferralEvent>> {
        let inner = self.inner.read().await;
        let mut events = inner.events.get(&referral_id).cloned().unwrap_or_default();
        if order == EventOrder::LatestFirst {
            events.reverse();
        }
        Ok(events)
    }

    async fn inbox(&self, destination: &Scope) -> CoreResult<Vec<ReferralInboxEntry>> {
        let inner = self.inner.read().await;
        let mut entries: Vec<ReferralInboxEntry> = inner
            .inbox
            .values()
            .filter(|e| destination.contains(&e.destination))
            .cloned()
            .collect();
        entries.sort_by_key(|e| e.last_event_at);
        Ok(entries)
    }

    async fn list_open(&self, scope: &Scope) -> CoreResult<Vec<Referral>> {
        let inner = self.inner.read().await;
        let mut open: Vec<Referral> = inner
            .referrals
            .values()
            .filter(|r| {
                !r.is_terminal() && (scope.contains(&r.origin) || scope.contains(&r.destination))
            })
            .cloned()
            .collect();
        open.sort_by_key(|r| r.created_at);
        Ok(open)
    }
}
