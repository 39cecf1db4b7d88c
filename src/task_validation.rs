use crate::error::{SchedulingError, SchedulingResult, ValidationError};
use crate::graph::{AffectedGraph, NewLink};
use crate::task::{Task, TaskId};
use std::collections::HashSet;

/// Value checks on a single task after its edits are applied.
pub fn validate_task(task: &Task) -> Result<(), ValidationError> {
    if task.is_automatic() && task.has_predecessors() && task.duration == Some(0) {
        return Err(ValidationError::ZeroDuration { task: task.id });
    }

    if let (Some(start), Some(due)) = (task.start_date, task.due_date) {
        if due < start {
            return Err(ValidationError::DueBeforeStart {
                task: task.id,
                start,
                due,
            });
        }
    }

    Ok(())
}

/// Milestones cannot have children: neither an edited task that became a
/// milestone nor a milestone that gains a child.
pub fn validate_milestones(
    graph: &AffectedGraph,
    seeds: &[TaskId],
    new_links: &[NewLink],
) -> Result<(), ValidationError> {
    let arena = graph.arena();
    for &seed in seeds {
        let is_milestone = arena.get(seed).is_some_and(|task| task.milestone);
        if is_milestone && !arena.children(seed).is_empty() {
            return Err(ValidationError::MilestoneWithChildren { task: seed });
        }
    }

    for link in new_links {
        if let NewLink::Parent { parent, .. } = link {
            if arena.get(*parent).is_some_and(|task| task.milestone) {
                return Err(ValidationError::MilestoneWithChildren { task: *parent });
            }
        }
    }

    Ok(())
}

/// Structural checks on a whole task collection, used when loading a project
/// snapshot: unique ids, resolvable references and per-task values.
pub fn validate_task_collection(tasks: &[Task]) -> SchedulingResult<()> {
    let mut seen_ids = HashSet::with_capacity(tasks.len());
    for task in tasks {
        if !seen_ids.insert(task.id) {
            return Err(SchedulingError::DuplicateTask(task.id));
        }
    }

    for task in tasks {
        let references = task
            .parent
            .into_iter()
            .chain(task.predecessors.iter().map(|rel| rel.predecessor));
        for reference in references {
            if !seen_ids.contains(&reference) {
                return Err(SchedulingError::TaskNotFound(reference));
            }
        }
        validate_task(task)?;
    }
    Ok(())
}
