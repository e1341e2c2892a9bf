//! Health data store contract and the delete+insert update.

use crate::error::Fault;
use crate::types::{HealthRecord, TimeRange};
use async_trait::async_trait;
use thiserror::Error;

/// The device health data store, as the pipeline sees it.
///
/// Writes are atomic per call. There is no update primitive.
#[async_trait]
pub trait HealthDataSink: Send + Sync {
    /// Insert a record and return the id the store assigned to it.
    async fn insert(&self, record: &HealthRecord) -> Result<String, Fault>;

    /// Delete a record. Deleting an unknown id is not an error.
    async fn delete(&self, id: &str) -> Result<(), Fault>;

    /// Records whose start time falls in `range`, ordered by start time.
    async fn query(&self, range: TimeRange) -> Result<Vec<HealthRecord>, Fault>;
}

/// Failure of [`update_record`], split by which phase failed.
#[derive(Error, Debug)]
pub enum UpdateError {
    /// Phase one failed; the old record is still in place
    #[error("Delete of {old_id} failed, record unchanged: {source}")]
    DeleteFailed {
        old_id: String,
        #[source]
        source: Fault,
    },

    /// Phase two failed after the old record was deleted: the store now holds
    /// neither version. The replacement is handed back to the caller.
    #[error("Insert failed after deleting {old_id}; record is missing: {source}")]
    InsertFailed {
        old_id: String,
        record: Box<HealthRecord>,
        #[source]
        source: Fault,
    },
}

/// Replace record `old_id` with `record`, returning the new id.
///
/// This is two separate store calls, not a transaction. Between them the
/// store holds no version of the record; if the insert fails, that gap stays
/// visible as [`UpdateError::InsertFailed`].
pub async fn update_record(
    sink: &dyn HealthDataSink,
    old_id: &str,
    record: HealthRecord,
) -> Result<String, UpdateError> {
    if let Err(source) = sink.delete(old_id).await {
        return Err(UpdateError::DeleteFailed {
            old_id: old_id.to_string(),
            source,
        });
    }

    match sink.insert(&record).await {
        Ok(new_id) => {
            tracing::info!(old_id, new_id = %new_id, "Health record replaced");
            Ok(new_id)
        }
        Err(source) => {
            tracing::error!(old_id, "Health record lost between delete and insert: {source}");
            Err(UpdateError::InsertFailed {
                old_id: old_id.to_string(),
                record: Box::new(record),
                source,
            })
        }
    }
}
