use std::sync::atomic::{AtomicUsize, Ordering};

use arbor::repo::{InMemoryRepository, ItemDelta, ObjectQuery, RepoError, RepoObject, Repository};
use arbor::types::BoxFuture;
use tokio_util::sync::CancellationToken;

/// Misbehaviour a [`QuirkyRepository`] adds on top of an in-memory store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quirk {
    /// Every matched object is returned twice.
    DuplicateResults,
    /// Matched objects are deleted right after the search returns them.
    VanishAfterSearch,
    /// Every modification fails with a generic repository error.
    FailModify,
    /// Every search fails with a generic repository error.
    FailSearch,
}

/// Wraps an [`InMemoryRepository`] and injects one [`Quirk`].
#[derive(Debug)]
pub struct QuirkyRepository {
    inner: InMemoryRepository,
    quirk: Quirk,
    modify_calls: AtomicUsize,
}

impl QuirkyRepository {
    pub fn new(inner: InMemoryRepository, quirk: Quirk) -> Self {
        Self {
            inner,
            quirk,
            modify_calls: AtomicUsize::new(0),
        }
    }

    pub fn duplicating(inner: InMemoryRepository) -> Self {
        Self::new(inner, Quirk::DuplicateResults)
    }

    pub fn vanishing(inner: InMemoryRepository) -> Self {
        Self::new(inner, Quirk::VanishAfterSearch)
    }

    pub fn failing_modify(inner: InMemoryRepository) -> Self {
        Self::new(inner, Quirk::FailModify)
    }

    pub fn failing_search(inner: InMemoryRepository) -> Self {
        Self::new(inner, Quirk::FailSearch)
    }

    pub fn modify_calls(&self) -> usize {
        self.modify_calls.load(Ordering::SeqCst)
    }
}

impl Repository for QuirkyRepository {
    fn search_objects<'a>(
        &'a self,
        query: &'a ObjectQuery,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<Vec<RepoObject>, RepoError>> {
        Box::pin(async move {
            if self.quirk == Quirk::FailSearch {
                return Err(RepoError::Other(anyhow::anyhow!("injected search failure")));
            }
            let found = self.inner.search_objects(query, cancel).await?;
            match self.quirk {
                Quirk::DuplicateResults => Ok(found
                    .iter()
                    .flat_map(|o| [o.clone(), o.clone()])
                    .collect()),
                Quirk::VanishAfterSearch => {
                    for object in &found {
                        self.inner.remove(&object.oid);
                    }
                    Ok(found)
                }
                Quirk::FailModify | Quirk::FailSearch => Ok(found),
            }
        })
    }

    fn modify_object<'a>(
        &'a self,
        oid: &'a str,
        deltas: Vec<ItemDelta>,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<(), RepoError>> {
        Box::pin(async move {
            self.modify_calls.fetch_add(1, Ordering::SeqCst);
            if self.quirk == Quirk::FailModify {
                return Err(RepoError::Other(anyhow::anyhow!(
                    "injected modify failure for {oid}"
                )));
            }
            self.inner.modify_object(oid, deltas, cancel).await
        })
    }
}
