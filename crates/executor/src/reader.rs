//! Lazy entity sequence returned by the reader entry points

use crate::scope::ConnectionScope;
use procmap_core::{Column, Connection, Entity, Result, RowReader, TypeCoercion};
use procmap_params::PartialParams;
use procmap_projection::Projection;
use std::sync::Arc;

/// Partial bag supplied by the caller or created for the call
pub(crate) enum BagRef<'a> {
    Borrowed(&'a PartialParams),
    Owned(PartialParams),
}

impl<'a> BagRef<'a> {
    pub(crate) fn new(bag: Option<&'a PartialParams>) -> Self {
        match bag {
            Some(bag) => BagRef::Borrowed(bag),
            None => BagRef::Owned(PartialParams::new()),
        }
    }

    pub(crate) fn get(&self) -> &PartialParams {
        match self {
            BagRef::Borrowed(bag) => bag,
            BagRef::Owned(bag) => bag,
        }
    }
}

/// Forward-only, single-pass sequence of entities, one per result row
///
/// Rows are materialized as the iterator advances. Unmatched columns of each
/// row are written to the partial bag. The connection is closed when the
/// reader is dropped, whether or not it was exhausted.
pub struct EntityReader<'a, E, C: Connection> {
    // Declared before `scope` so the cursor is released first
    rows: Box<dyn RowReader + Send>,
    projection: Arc<Projection<E>>,
    bag: BagRef<'a>,
    coercion: &'a TypeCoercion,
    implicit_cast: bool,
    finished: bool,
    _scope: ConnectionScope<C>,
}

impl<'a, E: Entity, C: Connection> EntityReader<'a, E, C> {
    pub(crate) fn new(
        scope: ConnectionScope<C>,
        rows: Box<dyn RowReader + Send>,
        projection: Arc<Projection<E>>,
        bag: BagRef<'a>,
        coercion: &'a TypeCoercion,
        implicit_cast: bool,
    ) -> Self {
        EntityReader {
            rows,
            projection,
            bag,
            coercion,
            implicit_cast,
            finished: false,
            _scope: scope,
        }
    }

    /// Columns of the result set
    pub fn columns(&self) -> &[Column] {
        self.rows.columns()
    }

    /// The partial bag rows are written to
    pub fn params(&self) -> &PartialParams {
        self.bag.get()
    }

    /// The projection materializing each row
    pub fn projection(&self) -> &Arc<Projection<E>> {
        &self.projection
    }
}

impl<E: Entity, C: Connection> Iterator for EntityReader<'_, E, C> {
    type Item = Result<E>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.rows.next_row() {
            Ok(Some(row)) => Some(Ok(self.projection.apply(
                &row,
                self.bag.get(),
                self.implicit_cast,
                self.coercion,
            ))),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

impl<E, C: Connection> std::fmt::Debug for EntityReader<'_, E, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityReader")
            .field("projection", &self.projection)
            .field("implicit_cast", &self.implicit_cast)
            .field("finished", &self.finished)
            .finish()
    }
}
