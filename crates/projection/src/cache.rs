//! Projection cache
//!
//! One slot per `(procedure, TypeId)`. Slots are filled on first use and
//! kept for the life of the cache; there is no eviction.
//!
//! # Build Races
//!
//! Building happens outside any lock. Threads missing on the same key may
//! each build a projection, but only the first insert is kept and every
//! caller receives that retained instance.

use crate::projection::Projection;
use dashmap::DashMap;
use procmap_core::{Column, Entity, EntityDescriptor, Error, Result};
use std::any::{type_name, Any, TypeId};
use std::sync::Arc;
use tracing::debug;

type Slot = Arc<dyn Any + Send + Sync>;

/// Cache of compiled projections keyed by procedure and entity type
#[derive(Default)]
pub struct ProjectionCache {
    slots: DashMap<(String, TypeId), Slot>,
}

impl ProjectionCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the cached projection, building it from `columns` on a miss
    ///
    /// The key ignores the column list; a procedure is expected to return
    /// one result shape.
    pub fn get_or_build<E: Entity>(
        &self,
        procedure: &str,
        columns: &[Column],
        descriptor: &EntityDescriptor<E>,
    ) -> Result<Arc<Projection<E>>> {
        let key = (procedure.to_string(), TypeId::of::<E>());

        if let Some(slot) = self.slots.get(&key) {
            return downcast(Arc::clone(slot.value()));
        }

        let built = Arc::new(Projection::build(columns, descriptor));
        debug!(
            target: "procmap::projection",
            procedure,
            entity = descriptor.name(),
            columns = columns.len(),
            "Compiled projection"
        );

        let candidate: Slot = built.clone();
        let winner = Arc::clone(self.slots.entry(key).or_insert(candidate).value());
        let winner = downcast::<E>(winner)?;
        if !Arc::ptr_eq(&winner, &built) {
            debug!(
                target: "procmap::projection",
                procedure,
                entity = descriptor.name(),
                "Projection build lost race, using cached instance"
            );
        }
        Ok(winner)
    }

    /// Cached projection for a key, if any
    pub fn get<E: Entity>(&self, procedure: &str) -> Result<Option<Arc<Projection<E>>>> {
        let key = (procedure.to_string(), TypeId::of::<E>());
        match self.slots.get(&key) {
            Some(slot) => downcast(Arc::clone(slot.value())).map(Some),
            None => Ok(None),
        }
    }

    /// Number of cached projections
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

fn downcast<E: Entity>(slot: Slot) -> Result<Arc<Projection<E>>> {
    slot.downcast::<Projection<E>>().map_err(|_| {
        Error::internal(format!("projection slot type mismatch for {}", type_name::<E>()))
    })
}

impl std::fmt::Debug for ProjectionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectionCache")
            .field("slots", &self.slots.len())
            .finish()
    }
}
