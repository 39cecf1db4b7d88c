use crate::calendar::CalendarError;
use crate::task::Task;
use crate::task_validation;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[cfg(feature = "sqlite")]
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("invalid calendar: {0}")]
    Calendar(#[from] CalendarError),

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("storage connection is unusable after a panic")]
    Poisoned,
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;

pub fn validate_tasks(tasks: &[Task]) -> PersistenceResult<()> {
    task_validation::validate_task_collection(tasks)
        .map_err(|err| PersistenceError::InvalidData(err.to_string()))
}

pub mod file;
pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use file::{
    ProjectSnapshot, load_change_request_from_json, load_project_from_json, load_tasks_from_csv,
    save_project_to_json, save_tasks_to_csv, write_change_set_csv,
};
pub use memory::ProjectGraph;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteTaskStore;
