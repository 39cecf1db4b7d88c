//! The result of a scheduling run: tasks whose persisted fields changed.

use crate::graph::TaskArena;
use crate::task::{Task, TaskAttribute, TaskId};
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskUpdate {
    pub task: Task,
    pub changed: BTreeSet<TaskAttribute>,
    pub created: bool,
}

impl TaskUpdate {
    pub fn touches(&self, attribute: TaskAttribute) -> bool {
        self.changed.contains(&attribute)
    }
}

/// Final state of every task that differs from what is stored, keyed and
/// iterated by task id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    updates: BTreeMap<TaskId, TaskUpdate>,
}

impl ChangeSet {
    /// Diffs every task in `arena` against its baseline. Tasks without a
    /// baseline were created by the run and are always included.
    pub(crate) fn from_arena(arena: &TaskArena) -> Self {
        let mut set = ChangeSet::default();
        for task in arena.iter() {
            match arena.baseline(task.id) {
                Some(baseline) => {
                    let changed = task.changed_attributes(baseline);
                    if !changed.is_empty() {
                        set.record(task.clone(), changed, false);
                    }
                }
                None => {
                    let blank = Task::new(task.id, "");
                    set.record(task.clone(), task.changed_attributes(&blank), true);
                }
            }
        }
        set
    }

    pub(crate) fn record(&mut self, task: Task, changed: Vec<TaskAttribute>, created: bool) {
        self.updates.insert(
            task.id,
            TaskUpdate {
                task,
                changed: changed.into_iter().collect(),
                created,
            },
        );
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.updates.len()
    }

    pub fn get(&self, id: TaskId) -> Option<&TaskUpdate> {
        self.updates.get(&id)
    }

    /// Final state of `id`, if it changed.
    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.updates.get(&id).map(|update| &update.task)
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.updates.contains_key(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TaskUpdate> {
        self.updates.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = TaskId> + '_ {
        self.updates.keys().copied()
    }
}

impl Serialize for ChangeSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.updates.values())
    }
}

impl<'a> IntoIterator for &'a ChangeSet {
    type Item = &'a TaskUpdate;
    type IntoIter = std::collections::btree_map::Values<'a, TaskId, TaskUpdate>;

    fn into_iter(self) -> Self::IntoIter {
        self.updates.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn settled_tasks_are_left_out() {
        let mut arena = TaskArena::new();
        let stored = Task::new(1, "A");
        arena.insert_loaded(stored.clone());
        arena.insert_changed(Some(stored.clone()), stored.clone().automatic().manual());
        arena.insert_loaded(Task::new(2, "B"));

        assert!(ChangeSet::from_arena(&arena).is_empty());
    }

    #[test]
    fn records_changed_attributes_and_creations() {
        let mut arena = TaskArena::new();
        let stored = Task::new(1, "A");
        let moved = stored
            .clone()
            .with_dates(NaiveDate::from_ymd_opt(2025, 1, 6), None);
        arena.insert_changed(Some(stored), moved);
        arena.insert_changed(None, Task::new(5, "new"));

        let set = ChangeSet::from_arena(&arena);
        assert_eq!(set.len(), 2);
        assert!(set.get(TaskId(1)).unwrap().touches(TaskAttribute::StartDate));
        assert!(!set.get(TaskId(1)).unwrap().created);
        assert!(set.get(TaskId(5)).unwrap().created);
        assert_eq!(set.ids().collect::<Vec<_>>(), vec![TaskId(1), TaskId(5)]);
    }
}
