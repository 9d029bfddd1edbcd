//! Collaborator lookups the core consumes.
//!
//! The user/identity service and the person/family registry live outside
//! the core. These traits are the seams; the static implementations back
//! tests and embedded single-process deployments.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::scope::Scope;
use crate::subject::SubjectRef;

/// A resolved acting user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: Uuid,
    pub display_name: String,
}

/// Actor id → display name, plus the capability check the core requires.
#[async_trait]
pub trait IdentityDirectory: Send + Sync {
    async fn resolve(&self, actor_id: Uuid) -> Option<Actor>;

    /// Whether the actor holds the global/coordinator capability for the
    /// given scope (privileged referral overrides).
    async fn is_privileged(&self, actor_id: Uuid, scope: &Scope) -> bool;
}

/// Person/family existence check used as the intake guard.
#[async_trait]
pub trait SubjectDirectory: Send + Sync {
    async fn exists(&self, subject: &SubjectRef, scope: &Scope) -> bool;
}

/// Fixed in-memory identity directory.
#[derive(Debug, Default)]
pub struct StaticDirectory {
    actors: HashMap<Uuid, Actor>,
    /// (actor, municipality) capability grants.
    privileged: HashSet<(Uuid, Uuid)>,
    /// Actors privileged everywhere (global coordinators).
    global: HashSet<Uuid>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_actor(mut self, id: Uuid, display_name: impl Into<String>) -> Self {
        self.actors.insert(
            id,
            Actor {
                id,
                display_name: display_name.into(),
            },
        );
        self
    }

    pub fn grant_municipality(mut self, actor_id: Uuid, municipality: Uuid) -> Self {
        self.privileged.insert((actor_id, municipality));
        self
    }

    pub fn grant_global(mut self, actor_id: Uuid) -> Self {
        self.global.insert(actor_id);
        self
    }
}

#[async_trait]
impl IdentityDirectory for StaticDirectory {
    async fn resolve(&self, actor_id: Uuid) -> Option<Actor> {
        self.actors.get(&actor_id).cloned()
    }

    async fn is_privileged(&self, actor_id: Uuid, scope: &Scope) -> bool {
        self.global.contains(&actor_id)
            || self.privileged.contains(&(actor_id, scope.municipality))
    }
}

/// Fixed in-memory subject registry.
#[derive(Debug, Default)]
pub struct StaticSubjects {
    subjects: HashSet<(SubjectRef, Uuid)>,
}

impl StaticSubjects {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_subject(mut self, subject: SubjectRef, municipality: Uuid) -> Self {
        self.subjects.insert((subject, municipality));
        self
    }
}

#[async_trait]
impl SubjectDirectory for StaticSubjects {
    async fn exists(&self, subject: &SubjectRef, scope: &Scope) -> bool {
        self.subjects.contains(&(*subject, scope.municipality))
    }
}
