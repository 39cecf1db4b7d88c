use super::aggregation::aggregate_children;
use super::precedence::{follow, soonest_start};
use crate::calendar::WorkingCalendar;
use crate::date_span::DateSpan;
use crate::error::{SchedulingError, SchedulingResult};
use crate::graph::AffectedGraph;
use crate::task::{SchedulingMode, Task, TaskId};
use tracing::{debug, warn};

/// Recomputes every affected automatic task, in processing order.
///
/// Predecessors and children are final by the time a task is visited, so a
/// single pass reaches the fixed point.
pub struct ForwardPass<'a, C: ?Sized> {
    calendar: &'a C,
}

impl<'a, C> ForwardPass<'a, C>
where
    C: WorkingCalendar + ?Sized,
{
    pub fn new(calendar: &'a C) -> Self {
        Self { calendar }
    }

    pub fn execute(&self, graph: &mut AffectedGraph) -> SchedulingResult<()> {
        for id in graph.affected_in_order() {
            let Some(task) = graph.task(id) else {
                return Err(SchedulingError::TaskNotFound(id));
            };
            if !task.is_automatic() {
                continue;
            }

            let updated = self.reschedule(graph, task)?;
            if &updated != task {
                debug!(
                    "rescheduled {}: {:?}..{:?} ({:?} days)",
                    id, updated.start_date, updated.due_date, updated.duration
                );
            }
            if let Some(slot) = graph.arena_mut().get_mut(id) {
                *slot = updated;
            }
        }
        Ok(())
    }

    fn reschedule(&self, graph: &AffectedGraph, task: &Task) -> SchedulingResult<Task> {
        let arena = graph.arena();
        let mut updated = task.clone();

        if graph.is_orphaned(task.id) {
            warn!("{} lost its last child, switching to manual scheduling", task.id);
            Self::unschedule(&mut updated);
            return Ok(updated);
        }

        let children: Vec<TaskId> = arena.children(task.id);
        if !children.is_empty() {
            let span = aggregate_children(self.calendar, children.iter().filter_map(|id| arena.get(*id)))?;
            match span {
                Some(span) => span.write_to(&mut updated),
                None => {
                    warn!("{} has no dated children, switching to manual scheduling", task.id);
                    Self::unschedule(&mut updated);
                }
            }
            return Ok(updated);
        }

        let soonest = soonest_start(self.calendar, arena, task)?;
        follow(self.calendar, DateSpan::of(task), task.milestone, soonest)?.write_to(&mut updated);
        Ok(updated)
    }

    fn unschedule(task: &mut Task) {
        task.start_date = None;
        task.due_date = None;
        task.duration = None;
        task.scheduling_mode = SchedulingMode::Manual;
    }
}
