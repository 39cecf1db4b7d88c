use super::PersistenceResult;
use crate::change_set::ChangeSet;
use crate::graph::{GraphReadError, TaskGraphReader};
use crate::task::{Task, TaskId};
use std::collections::{BTreeMap, HashMap};

/// The whole task graph of a project held in memory, with reverse indexes
/// for the lookups the scheduler needs.
#[derive(Debug, Clone, Default)]
pub struct ProjectGraph {
    tasks: BTreeMap<TaskId, Task>,
    children: HashMap<TaskId, Vec<TaskId>>,
    followers: HashMap<TaskId, Vec<TaskId>>,
}

impl ProjectGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a graph from a validated task collection.
    pub fn from_tasks<I>(tasks: I) -> PersistenceResult<Self>
    where
        I: IntoIterator<Item = Task>,
    {
        let tasks: Vec<Task> = tasks.into_iter().collect();
        super::validate_tasks(&tasks)?;
        let mut graph = Self::new();
        for task in tasks {
            graph.insert(task);
        }
        Ok(graph)
    }

    /// Inserts or replaces a task, keeping the indexes in sync.
    pub fn insert(&mut self, task: Task) {
        if let Some(previous) = self.tasks.remove(&task.id) {
            self.unlink(&previous);
        }
        self.link(&task);
        self.tasks.insert(task.id, task);
    }

    /// Writes back every task of a change-set.
    pub fn apply(&mut self, changes: &ChangeSet) {
        for update in changes {
            self.insert(update.task.clone());
        }
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.get(&id)
    }

    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = TaskId> + '_ {
        self.tasks.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn into_tasks(self) -> Vec<Task> {
        self.tasks.into_values().collect()
    }

    fn link(&mut self, task: &Task) {
        if let Some(parent) = task.parent {
            self.children.entry(parent).or_default().push(task.id);
        }
        for relation in &task.predecessors {
            self.followers
                .entry(relation.predecessor)
                .or_default()
                .push(task.id);
        }
    }

    fn unlink(&mut self, task: &Task) {
        if let Some(parent) = task.parent {
            if let Some(children) = self.children.get_mut(&parent) {
                children.retain(|id| *id != task.id);
            }
        }
        for relation in &task.predecessors {
            if let Some(followers) = self.followers.get_mut(&relation.predecessor) {
                followers.retain(|id| *id != task.id);
            }
        }
    }
}

impl TaskGraphReader for ProjectGraph {
    fn task(&self, id: TaskId) -> Result<Option<Task>, GraphReadError> {
        Ok(self.tasks.get(&id).cloned())
    }

    fn children(&self, id: TaskId) -> Result<Vec<TaskId>, GraphReadError> {
        Ok(self.children.get(&id).cloned().unwrap_or_default())
    }

    fn followers(&self, id: TaskId) -> Result<Vec<TaskId>, GraphReadError> {
        Ok(self.followers.get(&id).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indexes_follow_replacements() {
        let mut graph = ProjectGraph::from_tasks([
            Task::new(1, "A"),
            Task::new(2, "B").follows(1, 0).child_of(3),
            Task::new(3, "P"),
        ])
        .unwrap();
        assert_eq!(graph.followers(TaskId(1)).unwrap(), vec![TaskId(2)]);
        assert_eq!(graph.children(TaskId(3)).unwrap(), vec![TaskId(2)]);

        graph.insert(Task::new(2, "B"));
        assert!(graph.followers(TaskId(1)).unwrap().is_empty());
        assert!(graph.children(TaskId(3)).unwrap().is_empty());
    }

    #[test]
    fn rejects_dangling_references() {
        assert!(ProjectGraph::from_tasks([Task::new(1, "A").follows(7, 0)]).is_err());
    }
}
