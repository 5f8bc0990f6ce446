// src/repo/mod.rs

//! Object repository contract.
//!
//! The engine never owns persistent state. It talks to the repository
//! through two calls:
//! - [`Repository::search_objects`] (query by condition)
//! - [`Repository::modify_object`] (modify by delta)
//!
//! [`memory::InMemoryRepository`] is the implementation used by the CLI and
//! the test suite; a real deployment plugs in its own store.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::types::BoxFuture;

pub mod memory;

pub use memory::InMemoryRepository;

/// Object identifier.
pub type Oid = String;

/// Trigger identifier, unique within its owning object.
pub type TriggerId = u64;

/// A deferred, timestamp-gated action attached to an object.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Trigger {
    pub id: TriggerId,
    pub timestamp: DateTime<Utc>,
    /// URI of the registered trigger handler that fires this trigger.
    #[serde(rename = "handler")]
    pub handler_uri: String,
    /// Opaque handler parameters.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, String>,
}

impl Trigger {
    pub fn new(id: TriggerId, timestamp: DateTime<Utc>, handler_uri: impl Into<String>) -> Self {
        Self {
            id,
            timestamp,
            handler_uri: handler_uri.into(),
            parameters: BTreeMap::new(),
        }
    }

    /// A trigger is "hot" once its timestamp is at or before the cutoff.
    pub fn is_due(&self, cutoff: DateTime<Utc>) -> bool {
        self.timestamp <= cutoff
    }
}

/// Repository object as seen by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RepoObject {
    pub oid: Oid,
    #[serde(default)]
    pub name: String,
    /// Resources this object has unpropagated changes for.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub pending: BTreeSet<String>,
    #[serde(default, rename = "trigger", skip_serializing_if = "Vec::is_empty")]
    pub triggers: Vec<Trigger>,
}

impl RepoObject {
    pub fn new(oid: impl Into<Oid>, name: impl Into<String>) -> Self {
        Self {
            oid: oid.into(),
            name: name.into(),
            pending: BTreeSet::new(),
            triggers: Vec::new(),
        }
    }

    pub fn with_trigger(mut self, trigger: Trigger) -> Self {
        self.triggers.push(trigger);
        self
    }

    pub fn with_pending(mut self, resource: impl Into<String>) -> Self {
        self.pending.insert(resource.into());
        self
    }

    pub fn trigger(&self, id: TriggerId) -> Option<&Trigger> {
        self.triggers.iter().find(|t| t.id == id)
    }

    fn apply(&mut self, delta: ItemDelta) {
        match delta {
            ItemDelta::AddTrigger(trigger) => {
                self.triggers.retain(|t| t.id != trigger.id);
                self.triggers.push(trigger);
            }
            ItemDelta::DeleteTrigger(id) => self.triggers.retain(|t| t.id != id),
            ItemDelta::AddPending(resource) => {
                self.pending.insert(resource);
            }
            ItemDelta::ClearPending(resource) => {
                self.pending.remove(&resource);
            }
        }
    }
}

/// Query conditions the engine needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectQuery {
    /// Objects with at least one trigger due at or before the cutoff.
    TriggersDueBy(DateTime<Utc>),
    /// Objects with unpropagated changes for the given resource.
    PendingFor(String),
    /// Objects with unpropagated changes for any resource.
    AnyPending,
}

impl ObjectQuery {
    pub fn matches(&self, object: &RepoObject) -> bool {
        match self {
            ObjectQuery::TriggersDueBy(cutoff) => object.triggers.iter().any(|t| t.is_due(*cutoff)),
            ObjectQuery::PendingFor(resource) => object.pending.contains(resource),
            ObjectQuery::AnyPending => !object.pending.is_empty(),
        }
    }
}

/// A single modification of an object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemDelta {
    /// Add a trigger (replaces a trigger with the same id).
    AddTrigger(Trigger),
    DeleteTrigger(TriggerId),
    AddPending(String),
    ClearPending(String),
}

#[derive(Error, Debug)]
pub enum RepoError {
    /// The object does not exist (any more). Benign for deletions.
    #[error("object not found: {0}")]
    NotFound(Oid),

    #[error("repository operation cancelled")]
    Cancelled,

    #[error("repository failure: {0}")]
    Other(#[from] anyhow::Error),
}

/// Repository seam.
///
/// Implementations provide their own concurrency control and must honour the
/// cancellation token on every call that may block.
pub trait Repository: Send + Sync {
    /// Point-in-time snapshot of the objects matching `query`.
    fn search_objects<'a>(
        &'a self,
        query: &'a ObjectQuery,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<Vec<RepoObject>, RepoError>>;

    /// Apply `deltas` to the object identified by `oid`.
    fn modify_object<'a>(
        &'a self,
        oid: &'a str,
        deltas: Vec<ItemDelta>,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<(), RepoError>>;
}
