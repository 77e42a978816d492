use std::future::Future;

use log::error;
use thiserror::Error;

use crate::models::WorkoutRecord;

use super::Database;

/// Why a finished workout could not be written.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("workout storage unavailable: {0}")]
    Unavailable(String),

    #[error("failed to write workout: {0}")]
    Write(String),

    #[error("invalid workout record: {0}")]
    InvalidRecord(String),
}

/// Destination for finished workouts. One call per finished session, and a
/// single atomic create per call.
pub trait WorkoutStore: Clone + Send + Sync + 'static {
    fn create(&self, record: WorkoutRecord) -> impl Future<Output = Result<(), StoreError>> + Send;
}

impl WorkoutStore for Database {
    fn create(&self, record: WorkoutRecord) -> impl Future<Output = Result<(), StoreError>> + Send {
        let db = self.clone();
        async move {
            if !record.category.is_recordable() {
                return Err(StoreError::InvalidRecord(format!(
                    "workout {} has no concrete category",
                    record.id
                )));
            }

            db.insert_workout(&record).await.map_err(|err| {
                error!("Failed to store workout {}: {err:#}", record.id);
                StoreError::Write(format!("{err:#}"))
            })
        }
    }
}
