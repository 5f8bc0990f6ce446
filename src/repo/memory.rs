// src/repo/memory.rs

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{ItemDelta, ObjectQuery, Oid, RepoError, RepoObject, Repository};
use crate::errors::{EngineError, Result};
use crate::types::BoxFuture;

/// On-disk fixture format:
///
/// ```toml
/// [[object]]
/// oid = "u1"
/// name = "alice"
/// pending = ["ldap"]
///
/// [[object.trigger]]
/// id = 1
/// timestamp = "2026-01-01T10:00:00Z"
/// handler = "urn:arbor:trigger:log"
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ObjectsFile {
    #[serde(default, rename = "object")]
    pub objects: Vec<RepoObject>,
}

/// Mutex-guarded in-memory object store.
///
/// Cloning shares the underlying map, so a test can keep a handle for
/// assertions while the engine holds another behind `Arc<dyn Repository>`.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRepository {
    objects: Arc<Mutex<BTreeMap<Oid, RepoObject>>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_objects(objects: impl IntoIterator<Item = RepoObject>) -> Self {
        let repo = Self::new();
        for object in objects {
            repo.insert(object);
        }
        repo
    }

    /// Load repository content from a TOML fixture.
    pub fn load_fixture(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())?;
        let file: ObjectsFile = toml::from_str(&contents)?;
        Ok(Self::with_objects(file.objects))
    }

    /// Write current content back to a TOML fixture.
    pub fn save_fixture(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = ObjectsFile {
            objects: self.snapshot(),
        };
        let contents = toml::to_string(&file)
            .map_err(|e| EngineError::Other(anyhow::anyhow!("serializing objects: {e}")))?;
        fs::write(path.as_ref(), contents)?;
        Ok(())
    }

    pub fn insert(&self, object: RepoObject) {
        self.guard().insert(object.oid.clone(), object);
    }

    pub fn remove(&self, oid: &str) -> Option<RepoObject> {
        self.guard().remove(oid)
    }

    pub fn get(&self, oid: &str) -> Option<RepoObject> {
        self.guard().get(oid).cloned()
    }

    /// All objects ordered by oid.
    pub fn snapshot(&self) -> Vec<RepoObject> {
        self.guard().values().cloned().collect()
    }

    fn guard(&self) -> MutexGuard<'_, BTreeMap<Oid, RepoObject>> {
        self.objects.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Repository for InMemoryRepository {
    fn search_objects<'a>(
        &'a self,
        query: &'a ObjectQuery,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, std::result::Result<Vec<RepoObject>, RepoError>> {
        Box::pin(async move {
            if cancel.is_cancelled() {
                return Err(RepoError::Cancelled);
            }
            let found: Vec<RepoObject> = self
                .guard()
                .values()
                .filter(|obj| query.matches(obj))
                .cloned()
                .collect();
            debug!(?query, found = found.len(), "in-memory search");
            Ok(found)
        })
    }

    fn modify_object<'a>(
        &'a self,
        oid: &'a str,
        deltas: Vec<ItemDelta>,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, std::result::Result<(), RepoError>> {
        Box::pin(async move {
            if cancel.is_cancelled() {
                return Err(RepoError::Cancelled);
            }
            let mut objects = self.guard();
            let object = objects
                .get_mut(oid)
                .ok_or_else(|| RepoError::NotFound(oid.to_string()))?;
            for delta in deltas {
                object.apply(delta);
            }
            Ok(())
        })
    }
}
