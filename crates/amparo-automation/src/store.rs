//! Rule and task persistence boundaries, with in-memory implementations.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use amparo_types::{CoreError, CoreResult, Scope};

use crate::execution::RuleExecution;
use crate::rule::AutomationRule;
use crate::task::{Task, TaskRef, TaskStatus};

#[async_trait]
pub trait RuleStore: Send + Sync {
    /// Insert the rule unless one with the same (scope, key) exists;
    /// returns the stored rule either way. This is the idempotent seed
    /// upsert.
    async fn upsert_seed(&self, rule: AutomationRule) -> CoreResult<AutomationRule>;

    /// Rules registered for exactly this scope.
    async fn list(&self, scope: &Scope) -> CoreResult<Vec<AutomationRule>>;

    async fn record_execution(&self, execution: RuleExecution) -> CoreResult<()>;

    async fn executions(&self, rule_id: Uuid) -> CoreResult<Vec<RuleExecution>>;

    async fn touch_last_execution(&self, rule_id: Uuid, at: DateTime<Utc>) -> CoreResult<()>;
}

#[async_trait]
pub trait TaskStore: Send + Sync {
    /// The existing open task for (rule key, reference, scope), if any.
    /// This read backs the best-effort dedup check.
    async fn find_open(
        &self,
        rule_key: &str,
        reference: &TaskRef,
        scope: &Scope,
    ) -> CoreResult<Option<Task>>;

    async fn insert(&self, task: Task) -> CoreResult<()>;

    async fn set_status(&self, task_id: Uuid, status: TaskStatus) -> CoreResult<()>;

    async fn list(&self, scope: &Scope) -> CoreResult<Vec<Task>>;
}

#[derive(Default)]
struct RuleInner {
    rules: HashMap<Uuid, AutomationRule>,
    executions: HashMap<Uuid, Vec<RuleExecution>>,
}

#[derive(Default)]
pub struct InMemoryRuleStore {
    inner: Arc<RwLock<RuleInner>>,
}

impl InMemoryRuleStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RuleStore for InMemoryRuleStore {
    async fn upsert_seed(&self, rule: AutomationRule) -> CoreResult<AutomationRule> {
        let mut inner = self.inner.write().await;
        if let Some(existing) = inner
            .rules
            .values()
            .find(|r| r.scope == rule.scope && r.key == rule.key)
        {
            return Ok(existing.clone());
        }
        inner.rules.insert(rule.rule_id, rule.clone());
        Ok(rule)
    }

    async fn list(&self, scope: &Scope) -> CoreResult<Vec<AutomationRule>> {
        let inner = self.inner.read().await;
        let mut rules: Vec<AutomationRule> = inner
            .rules
            .values()
            .filter(|r| r.scope == *scope)
            .cloned()
            .collect();
        rules.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(rules)
    }

    async fn record_execution(&self, execution: RuleExecution) -> CoreResult<()> {
        let mut inner = self.inner.write().await;
        inner
            .executions
            .entry(execution.rule_id)
            .or_default()
            .push(execution);
        Ok(())
    }

    async fn executions(&self, rule_id: Uuid) -> CoreResult<Vec<RuleExecution>> {
        let inner = self.inner.read().await;
        Ok(inner.executions.get(&rule_id).cloned().unwrap_or_default())
    }

    async fn touch_last_execution(&self, rule_id: Uuid, at: DateTime<Utc>) -> CoreResult<()> {
        let mut inner = self.inner.write().await;
        let rule = inner
            .rules
            .get_mut(&rule_id)
            .ok_or_else(|| CoreError::not_found("rule", rule_id))?;
        rule.last_execution = Some(at);
        rule.updated_at = at;
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryTaskStore {
    inner: Arc<RwLock<HashMap<Uuid, Task>>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn find_open(
        &self,
        rule_key: &str,
        reference: &TaskRef,
        scope: &Scope,
    ) -> CoreResult<Option<Task>> {
        let inner = self.inner.read().await;
        Ok(inner
            .values()
            .find(|t| {
                t.status.is_open()
                    && t.rule_key.as_deref() == Some(rule_key)
                    && t.reference == *reference
                    && t.scope == *scope
            })
            .cloned())
    }

    async fn insert(&self, task: Task) -> CoreResult<()> {
        let mut inner = self.inner.write().await;
        inner.insert(task.task_id, task);
        Ok(())
    }

    async fn set_status(&self, task_id: Uuid, status: TaskStatus) -> CoreResult<()> {
        let mut inner = self.inner.write().await;
        let task = inner
            .get_mut(&task_id)
            .ok_or_else(|| CoreError::not_found("task", task_id))?;
        task.status = status;
        task.updated_at = Utc::now();
        Ok(())
    }

    async fn list(&self, scope: &Scope) -> CoreResult<Vec<Task>> {
        let inner = self.inner.read().await;
        let mut tasks: Vec<Task> = inner
            .values()
            .filter(|t| scope.contains(&t.scope))
            .cloned()
            .collect();
        tasks.sort_by_key(|t| t.created_at);
        Ok(tasks)
    }
}
