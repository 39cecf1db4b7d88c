use crate::task::{Task, TaskId};
use std::collections::{HashMap, HashSet, VecDeque};

/// In-memory snapshot of the tasks one scheduling run looks at.
///
/// Tasks are kept in load order. Each task remembers its baseline (the
/// stored version, or none for tasks created by the run) so the run can be
/// diffed afterwards.
#[derive(Debug, Clone, Default)]
pub struct TaskArena {
    tasks: Vec<Task>,
    index: HashMap<TaskId, usize>,
    baselines: HashMap<TaskId, Task>,
}

impl TaskArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a task read from storage; it is its own baseline.
    pub fn insert_loaded(&mut self, task: Task) {
        if self.index.contains_key(&task.id) {
            return;
        }
        self.baselines.insert(task.id, task.clone());
        self.push(task);
    }

    /// Adds a task that has pending edits relative to `baseline`.
    pub fn insert_changed(&mut self, baseline: Option<Task>, task: Task) {
        if let Some(baseline) = baseline {
            self.baselines.insert(task.id, baseline);
        }
        match self.index.get(&task.id) {
            Some(&idx) => self.tasks[idx] = task,
            None => self.push(task),
        }
    }

    fn push(&mut self, task: Task) {
        self.index.insert(task.id, self.tasks.len());
        self.tasks.push(task);
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.index.get(&id).map(|&idx| &self.tasks[idx])
    }

    pub fn get_mut(&mut self, id: TaskId) -> Option<&mut Task> {
        self.index.get(&id).map(|&idx| &mut self.tasks[idx])
    }

    /// The stored version of `id`, `None` for tasks created in this run.
    pub fn baseline(&self, id: TaskId) -> Option<&Task> {
        self.baselines.get(&id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = TaskId> + '_ {
        self.tasks.iter().map(|task| task.id)
    }

    /// Loaded tasks whose parent is `id`, in load order.
    pub fn children(&self, id: TaskId) -> Vec<TaskId> {
        self.tasks
            .iter()
            .filter(|task| task.parent == Some(id))
            .map(|task| task.id)
            .collect()
    }

    /// Loaded tasks following `id`.
    pub fn followers(&self, id: TaskId) -> Vec<TaskId> {
        self.tasks
            .iter()
            .filter(|task| task.follows_task(id))
            .map(|task| task.id)
            .collect()
    }

    /// Parent chain of `id`, nearest first, stopping at the first ancestor
    /// that is not loaded. A corrupt hierarchy loop ends the walk.
    pub fn ancestors(&self, id: TaskId) -> Vec<TaskId> {
        let mut chain = Vec::new();
        let mut seen = HashSet::from([id]);
        let mut cursor = self.get(id).and_then(|task| task.parent);
        while let Some(parent) = cursor {
            if !seen.insert(parent) || !self.contains(parent) {
                break;
            }
            chain.push(parent);
            cursor = self.get(parent).and_then(|task| task.parent);
        }
        chain
    }

    /// All loaded descendants of `id`, breadth first.
    pub fn descendants(&self, id: TaskId) -> Vec<TaskId> {
        let mut found = Vec::new();
        let mut seen = HashSet::from([id]);
        let mut queue = VecDeque::from([id]);
        while let Some(current) = queue.pop_front() {
            for child in self.children(current) {
                if seen.insert(child) {
                    found.push(child);
                    queue.push_back(child);
                }
            }
        }
        found
    }
}
