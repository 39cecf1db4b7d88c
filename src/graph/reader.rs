use crate::task::{Task, TaskId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GraphReadError {
    #[error("task graph backend failed: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("stored task {task} is malformed: {message}")]
    Malformed { task: TaskId, message: String },
}

impl GraphReadError {
    pub fn backend<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Backend(Box::new(err))
    }
}

/// Read access to the persisted task graph.
///
/// The scheduler only ever reads through this trait; writes happen in the
/// caller after a run returns its change-set.
pub trait TaskGraphReader {
    fn task(&self, id: TaskId) -> Result<Option<Task>, GraphReadError>;

    /// Ids of the tasks whose parent is `id`.
    fn children(&self, id: TaskId) -> Result<Vec<TaskId>, GraphReadError>;

    /// Ids of the tasks that follow `id`. The order carries no meaning.
    fn followers(&self, id: TaskId) -> Result<Vec<TaskId>, GraphReadError>;
}

impl<T: TaskGraphReader + ?Sized> TaskGraphReader for &T {
    fn task(&self, id: TaskId) -> Result<Option<Task>, GraphReadError> {
        (**self).task(id)
    }

    fn children(&self, id: TaskId) -> Result<Vec<TaskId>, GraphReadError> {
        (**self).children(id)
    }

    fn followers(&self, id: TaskId) -> Result<Vec<TaskId>, GraphReadError> {
        (**self).followers(id)
    }
}
