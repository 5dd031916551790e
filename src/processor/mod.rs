use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::db::{Store, StoreError};
use crate::feed::TelematicsFeed;
use crate::models::ReportKind;

pub mod importer;
pub mod pass;
pub mod queue;
pub mod registry;
pub mod tours;
pub mod windows;

/// Handles shared by every stage of a reconciliation pass.
#[derive(Clone)]
pub struct SyncContext {
    pub store: Arc<dyn Store>,
    pub feed: Arc<dyn TelematicsFeed>,
    pub request_delay: Duration,
}

impl SyncContext {
    pub fn new(store: Arc<dyn Store>, feed: Arc<dyn TelematicsFeed>, request_delay: Duration) -> Self {
        Self {
            store,
            feed,
            request_delay,
        }
    }

    /// Fixed pause after every upstream call, whatever its result.
    pub async fn pace(&self) {
        if !self.request_delay.is_zero() {
            tokio::time::sleep(self.request_delay).await;
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("reconciliation task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
    #[error("retry of tour {tour_id} ({kind}) deferred again: {reason}")]
    Deferred {
        tour_id: Uuid,
        kind: ReportKind,
        reason: String,
    },
}
