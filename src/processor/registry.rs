use std::fmt;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::db::{Store, StoreError, StoreResult};
use crate::models::{Entity, Trailer};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileCounts {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
}

impl fmt::Display for ReconcileCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} created, {} updated, {} skipped",
            self.created, self.updated, self.skipped
        )
    }
}

/// Upserts fetched entities by external ID, keeping whichever side carries
/// the newer `last_modified`.
///
/// A storage failure only aborts the entity it happened on; the rest of the
/// list is still reconciled and the last failure is returned at the end.
pub async fn reconcile(store: &dyn Store, entities: &[Entity]) -> StoreResult<ReconcileCounts> {
    let total = entities.len();
    let mut counts = ReconcileCounts::default();
    let mut failure: Option<StoreError> = None;

    for (i, entity) in entities.iter().enumerate() {
        match reconcile_one(store, entity).await {
            Ok(Change::Created) => {
                info!("({} / {}) Importing {} {}", i + 1, total, entity.kind(), entity.external_id());
                counts.created += 1;
            }
            Ok(Change::Updated) => {
                info!("({} / {}) Updated {} {}", i + 1, total, entity.kind(), entity.external_id());
                counts.updated += 1;
            }
            Ok(Change::Skipped) => {
                debug!("({} / {}) Skipped {} {}", i + 1, total, entity.kind(), entity.external_id());
                counts.skipped += 1;
            }
            Err(e) => {
                error!("Failed to store {} {}: {}", entity.kind(), entity.external_id(), e);
                failure = Some(e);
            }
        }
    }

    match failure {
        Some(e) => Err(e),
        None => Ok(counts),
    }
}

enum Change {
    Created,
    Updated,
    Skipped,
}

async fn reconcile_one(store: &dyn Store, entity: &Entity) -> StoreResult<Change> {
    match store
        .entity_last_modified(entity.kind(), entity.external_id())
        .await?
    {
        None => {
            store.insert_entity(entity).await?;
            Ok(Change::Created)
        }
        Some(stored) if entity.last_modified() > stored => {
            store.update_entity(entity).await?;
            Ok(Change::Updated)
        }
        Some(_) => Ok(Change::Skipped),
    }
}

/// Registers a trailer in the background. Failures are logged and dropped.
pub fn spawn_trailer_registration(store: Arc<dyn Store>, trailer: Trailer) -> JoinHandle<()> {
    tokio::spawn(async move {
        let external_id = trailer.external_id;
        if let Err(e) = reconcile(store.as_ref(), &[Entity::Trailer(trailer)]).await {
            warn!("Trailer {} not registered: {}", external_id, e);
        }
    })
}
