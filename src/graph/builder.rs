use super::arena::TaskArena;
use super::reader::TaskGraphReader;
use super::schedule_dag::ScheduleDag;
use crate::error::{SchedulingError, SchedulingResult, ValidationError};
use crate::task::{Task, TaskId};
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::debug;

/// The task may have to move because a constraint on it changed.
const CONSTRAINT: u8 = 0b01;
/// The task's own dates may change.
const DATES: u8 = 0b10;

/// A relation created by the pending change request, kept to name the
/// culprit when the result turns out cyclic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NewLink {
    Follows { predecessor: TaskId, successor: TaskId },
    Parent { child: TaskId, parent: TaskId },
}

/// Everything one scheduling run needs, in processing order.
#[derive(Debug)]
pub struct AffectedGraph {
    arena: TaskArena,
    order: Vec<TaskId>,
    affected: HashSet<TaskId>,
    orphaned: HashSet<TaskId>,
}

impl AffectedGraph {
    pub fn arena(&self) -> &TaskArena {
        &self.arena
    }

    pub(crate) fn arena_mut(&mut self) -> &mut TaskArena {
        &mut self.arena
    }

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.arena.get(id)
    }

    /// All loaded tasks in processing order.
    pub fn order(&self) -> &[TaskId] {
        &self.order
    }

    pub fn is_affected(&self, id: TaskId) -> bool {
        self.affected.contains(&id)
    }

    /// Tasks that may need recomputation, in processing order.
    pub fn affected_in_order(&self) -> Vec<TaskId> {
        self.order
            .iter()
            .copied()
            .filter(|id| self.affected.contains(id))
            .collect()
    }

    /// Former parents that lost their last child in this run.
    pub fn is_orphaned(&self, id: TaskId) -> bool {
        self.orphaned.contains(&id)
    }

    pub fn affected_count(&self) -> usize {
        self.affected.len()
    }
}

/// Discovers the tasks a change request can move and orders them.
pub struct GraphBuilder<'a, R: ?Sized> {
    reader: &'a R,
}

impl<'a, R> GraphBuilder<'a, R>
where
    R: TaskGraphReader + ?Sized,
{
    pub fn new(reader: &'a R) -> Self {
        Self { reader }
    }

    /// `arena` must already hold the seed tasks with their edits applied.
    pub fn build(
        &self,
        mut arena: TaskArena,
        seeds: &[TaskId],
        former_parents: &[TaskId],
        new_links: &[NewLink],
    ) -> SchedulingResult<AffectedGraph> {
        let affected = self.discover(&mut arena, seeds, former_parents)?;
        self.load_context(&mut arena, &affected)?;

        let mut orphaned = HashSet::new();
        for &former in former_parents {
            if self.children(&arena, former)?.is_empty() {
                orphaned.insert(former);
            }
        }

        let dag = ScheduleDag::build(&arena);
        let order = match dag.order() {
            Ok(order) => order,
            Err(task) => return Err(Self::cycle_error(&arena, new_links, task).into()),
        };

        debug!(
            "scheduling graph: {} affected of {} loaded tasks",
            affected.len(),
            arena.len()
        );

        Ok(AffectedGraph {
            arena,
            order,
            affected: affected.into_iter().collect(),
            orphaned,
        })
    }

    fn discover(
        &self,
        arena: &mut TaskArena,
        seeds: &[TaskId],
        former_parents: &[TaskId],
    ) -> SchedulingResult<Vec<TaskId>> {
        let mut reach: HashMap<TaskId, u8> = HashMap::new();
        let mut discovered = Vec::new();
        let mut queue: VecDeque<(TaskId, u8)> = seeds
            .iter()
            .map(|id| (*id, CONSTRAINT | DATES))
            .chain(former_parents.iter().map(|id| (*id, DATES)))
            .collect();

        while let Some((id, bits)) = queue.pop_front() {
            self.load(arena, id)?;
            let seen = reach.entry(id).or_insert_with(|| {
                discovered.push(id);
                0
            });
            let mut fresh = bits & !*seen;
            if fresh & CONSTRAINT != 0 {
                fresh |= DATES & !*seen;
            }
            if fresh == 0 {
                continue;
            }
            *seen |= fresh;

            if fresh & CONSTRAINT != 0 {
                for child in self.children(arena, id)? {
                    queue.push_back((child, CONSTRAINT));
                }
            }
            if fresh & DATES != 0 {
                for follower in self.followers(arena, id)? {
                    queue.push_back((follower, CONSTRAINT));
                }
                if let Some(parent) = arena.get(id).and_then(|task| task.parent) {
                    queue.push_back((parent, DATES));
                }
            }
        }

        Ok(discovered)
    }

    /// Loads, read-only, what affected tasks are computed from: the
    /// predecessors of each task and of its ancestors, and all children.
    fn load_context(&self, arena: &mut TaskArena, affected: &[TaskId]) -> SchedulingResult<()> {
        for &id in affected {
            let mut cursor = Some(id);
            let mut visited = HashSet::new();
            while let Some(current) = cursor {
                if !visited.insert(current) {
                    break;
                }
                self.load(arena, current)?;
                let Some(task) = arena.get(current) else {
                    break;
                };
                let predecessors: Vec<TaskId> =
                    task.predecessors.iter().map(|rel| rel.predecessor).collect();
                cursor = task.parent;
                for predecessor in predecessors {
                    self.load(arena, predecessor)?;
                }
            }

            for child in self.children(arena, id)? {
                self.load(arena, child)?;
            }
        }
        Ok(())
    }

    fn load(&self, arena: &mut TaskArena, id: TaskId) -> SchedulingResult<()> {
        if arena.contains(id) {
            return Ok(());
        }
        let task = self
            .reader
            .task(id)?
            .ok_or(SchedulingError::TaskNotFound(id))?;
        arena.insert_loaded(task);
        Ok(())
    }

    /// Stored children of `id` overlaid with the arena's pending edits.
    fn children(&self, arena: &TaskArena, id: TaskId) -> SchedulingResult<Vec<TaskId>> {
        let mut children: Vec<TaskId> = self
            .reader
            .children(id)?
            .into_iter()
            .filter(|child| {
                arena
                    .get(*child)
                    .map_or(true, |task| task.parent == Some(id))
            })
            .collect();
        for child in arena.children(id) {
            if !children.contains(&child) {
                children.push(child);
            }
        }
        Ok(children)
    }

    /// Stored followers of `id` overlaid with the arena's pending edits.
    fn followers(&self, arena: &TaskArena, id: TaskId) -> SchedulingResult<Vec<TaskId>> {
        let mut followers: Vec<TaskId> = self
            .reader
            .followers(id)?
            .into_iter()
            .filter(|follower| {
                arena
                    .get(*follower)
                    .map_or(true, |task| task.follows_task(id))
            })
            .collect();
        for follower in arena.followers(id) {
            if !followers.contains(&follower) {
                followers.push(follower);
            }
        }
        Ok(followers)
    }

    /// Blames the first new link whose removal makes the graph acyclic.
    fn cycle_error(arena: &TaskArena, new_links: &[NewLink], on_cycle: TaskId) -> ValidationError {
        for link in new_links {
            let mut without = arena.clone();
            match *link {
                NewLink::Follows {
                    predecessor,
                    successor,
                } => {
                    if let Some(task) = without.get_mut(successor) {
                        task.remove_predecessor(predecessor);
                    }
                }
                NewLink::Parent { child, .. } => {
                    if let Some(task) = without.get_mut(child) {
                        task.parent = None;
                    }
                }
            }
            if ScheduleDag::build(&without).order().is_err() {
                continue;
            }
            return match *link {
                NewLink::Follows {
                    predecessor,
                    successor,
                } => ValidationError::CyclicRelation {
                    predecessor,
                    successor,
                },
                NewLink::Parent { child, parent } => ValidationError::CyclicHierarchy { child, parent },
            };
        }
        ValidationError::Cycle { task: on_cycle }
    }
}
