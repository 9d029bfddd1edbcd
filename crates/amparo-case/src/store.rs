//! Case persistence boundary.
//!
//! The store commits one case mutation plus one history append as a single
//! unit; a SQL-backed implementation wraps both in one transaction. The
//! in-memory implementation serializes commits behind a single write lock.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use amparo_types::{CoreError, CoreResult, EventOrder, Scope};

use crate::history::CaseEvent;
use crate::record::CaseRecord;

#[async_trait]
pub trait CaseStore: Send + Sync {
    /// Persist a new case and its intake event atomically.
    async fn insert(&self, case: &CaseRecord, event: CaseEvent) -> CoreResult<()>;

    /// Load a case; `NotFound` if the id does not resolve.
    async fn load(&self, case_id: Uuid) -> CoreResult<CaseRecord>;

    /// Persist one case mutation and its single history event atomically.
    async fn commit(&self, case: &CaseRecord, event: CaseEvent) -> CoreResult<()>;

    /// History in insertion order (ascending or descending).
    async fn events(&self, case_id: Uuid, order: EventOrder) -> CoreResult<Vec<CaseEvent>>;

    /// Open (not closed) cases inside the scope.
    async fn list_open(&self, scope: &Scope) -> CoreResult<Vec<CaseRecord>>;
}

#[derive(Default)]
struct Inner {
    cases: HashMap<Uuid, CaseRecord>,
    events: HashMap<Uuid, Vec<CaseEvent>>,
    next_seq: u64,
}

/// In-memory store for tests and embedded deployments.
#[derive(Default)]
pub struct InMemoryCaseStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryCaseStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Inner {
    fn append(&mut self, case_id: Uuid, mut event: CaseEvent) {
        self.next_seq += 1;
        event.seq = self.next_seq;
        self.events.entry(case_id).or_default().push(event);
    }
}

#[async_trait]
impl CaseStore for InMemoryCaseStore {
    async fn insert(&self, case: &CaseRecord, event: CaseEvent) -> CoreResult<()> {
        let mut inner = self.inner.write().await;
        if inner.cases.contains_key(&case.case_id) {
            return Err(CoreError::Validation(format!(
                "case {} already exists",
                case.case_id
            )));
        }
        inner.cases.insert(case.case_id, case.clone());
        inner.append(case.case_id, event);
        Ok(())
    }

    async fn load(&self, case_id: Uuid) -> CoreResult<CaseRecord> {
        let inner = self.inner.read().await;
        inner
            .cases
            .get(&case_id)
            .cloned()
            .ok_or_else(|| CoreError::not_found("case", case_id))
    }

    async fn commit(&self, case: &CaseRecord, event: CaseEvent) -> CoreResult<()> {
        let mut inner = self.inner.write().await;
        if !inner.cases.contains_key(&case.case_id) {
            return Err(CoreError::not_found("case", case.case_id));
        }
        inner.cases.insert(case.case_id, case.clone());
        inner.append(case.case_id, event);
        Ok(())
    }

    async fn events(&self, case_id: Uuid, order: EventOrder) -> CoreResult<Vec<CaseEvent>> {
        let inner = self.inner.read().await;
        let mut events = inner.events.get(&case_id).cloned().unwrap_or_default();
        if order == EventOrder::LatestFirst {
            events.reverse();
        }
        Ok(events)
    }

    async fn list_open(&self, scope: &Scope) -> CoreResult<Vec<CaseRecord>> {
        let inner = self.inner.read().await;
        let mut open: Vec<CaseRecord> = inner
            .cases
            .values()
            .filter(|c| !c.is_closed() && scope.contains(&c.scope))
            .cloned()
            .collect();
        open.sort_by_key(|c| c.opened_at);
        Ok(open)
    }
}
