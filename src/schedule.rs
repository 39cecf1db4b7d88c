use crate::calculations::ForwardPass;
use crate::calendar::{CalendarError, WorkingCalendar};
use crate::change::{ChangeRequest, TaskChange};
use crate::change_set::ChangeSet;
use crate::date_span::DateSpan;
use crate::error::{SchedulingError, SchedulingResult, ValidationError};
use crate::graph::{AffectedGraph, GraphBuilder, NewLink, TaskArena, TaskGraphReader};
use crate::task::{Task, TaskId};
use crate::task_validation::{validate_milestones, validate_task};
use tracing::info;

/// Entry point of the scheduling engine.
///
/// Holds the project calendar and read access to the stored task graph. Each
/// call works on its own in-memory snapshot and returns the tasks to
/// persist; nothing is written through the reader.
pub struct Scheduler<C, R> {
    calendar: C,
    reader: R,
}

/// A validated, ordered run that has not been propagated yet.
struct PreparedRun {
    graph: AffectedGraph,
    seeds: Vec<TaskId>,
}

impl<C, R> Scheduler<C, R>
where
    C: WorkingCalendar,
    R: TaskGraphReader,
{
    pub fn new(calendar: C, reader: R) -> Self {
        Self { calendar, reader }
    }

    pub fn calendar(&self) -> &C {
        &self.calendar
    }

    pub fn reader(&self) -> &R {
        &self.reader
    }

    /// Validates `request` and returns the ordered subgraph it affects,
    /// without recomputing any date.
    pub fn prepare(&self, request: &ChangeRequest) -> SchedulingResult<AffectedGraph> {
        self.prepare_run(request).map(|run| run.graph)
    }

    /// Applies `request` and propagates it through every dependent task.
    pub fn schedule(&self, request: &ChangeRequest) -> SchedulingResult<ChangeSet> {
        let PreparedRun { mut graph, seeds } = self.prepare_run(request)?;

        ForwardPass::new(&self.calendar).execute(&mut graph)?;

        let changes = ChangeSet::from_arena(graph.arena());
        info!(
            "scheduled {} seed(s): {} affected, {} changed",
            seeds.len(),
            graph.affected_count(),
            changes.len()
        );
        Ok(changes)
    }

    /// Recomputes `ids` and their dependents without editing them, e.g. after
    /// the calendar changed.
    pub fn reschedule<I>(&self, ids: I) -> SchedulingResult<ChangeSet>
    where
        I: IntoIterator<Item = TaskId>,
    {
        self.schedule(&ChangeRequest::touch(ids))
    }

    /// Dry run: would making `successor` follow `predecessor` be accepted?
    pub fn check_relation(&self, predecessor: TaskId, successor: TaskId) -> SchedulingResult<()> {
        let request = ChangeRequest::new().change(TaskChange::new(successor).add_predecessor(predecessor, 0));
        self.prepare_run(&request).map(|_| ())
    }

    fn prepare_run(&self, request: &ChangeRequest) -> SchedulingResult<PreparedRun> {
        let mut arena = TaskArena::new();
        let mut seeds = Vec::new();
        let mut former_parents = Vec::new();
        let mut new_links = Vec::new();

        for task in &request.create {
            if arena.contains(task.id) || self.reader.task(task.id)?.is_some() {
                return Err(SchedulingError::DuplicateTask(task.id));
            }
            let blank = Task::new(task.id, "");
            let created = self.apply_change(blank, &TaskChange::from_created(task), &mut new_links)?;
            arena.insert_changed(None, created);
            seeds.push(task.id);
        }

        for change in &request.changes {
            let (baseline, current) = match arena.get(change.id) {
                Some(pending) => (None, pending.clone()),
                None => {
                    let stored = self
                        .reader
                        .task(change.id)?
                        .ok_or(SchedulingError::TaskNotFound(change.id))?;
                    (Some(stored.clone()), stored)
                }
            };

            let old_parent = current.parent;
            let updated = self.apply_change(current, change, &mut new_links)?;
            if updated.parent != old_parent {
                if let Some(former) = old_parent {
                    former_parents.push(former);
                }
            }

            arena.insert_changed(baseline, updated);
            if !seeds.contains(&change.id) {
                seeds.push(change.id);
            }
        }

        let graph = GraphBuilder::new(&self.reader).build(arena, &seeds, &former_parents, &new_links)?;
        validate_milestones(&graph, &seeds, &new_links)?;

        Ok(PreparedRun { graph, seeds })
    }

    /// Applies one edit to `task` in the order links, mode, then dates, and
    /// records any relation or parent link it creates.
    fn apply_change(
        &self,
        mut task: Task,
        change: &TaskChange,
        new_links: &mut Vec<NewLink>,
    ) -> SchedulingResult<Task> {
        if let Some(subject) = &change.subject {
            task.subject = subject.clone();
        }

        if let Some(parent) = change.parent {
            if parent != task.parent {
                if let Some(parent) = parent {
                    if parent == task.id {
                        return Err(ValidationError::CyclicHierarchy {
                            child: task.id,
                            parent,
                        }
                        .into());
                    }
                    new_links.push(NewLink::Parent {
                        child: task.id,
                        parent,
                    });
                }
                task.parent = parent;
            }
        }

        for predecessor in &change.remove_predecessors {
            task.remove_predecessor(*predecessor);
        }
        for relation in &change.add_predecessors {
            if relation.predecessor == task.id {
                return Err(ValidationError::CyclicRelation {
                    predecessor: relation.predecessor,
                    successor: task.id,
                }
                .into());
            }
            if !task.follows_task(relation.predecessor) {
                new_links.push(NewLink::Follows {
                    predecessor: relation.predecessor,
                    successor: task.id,
                });
            }
            task.add_predecessor(*relation);
        }

        if let Some(mode) = change.scheduling_mode {
            task.scheduling_mode = mode;
        }
        if let Some(milestone) = change.milestone {
            task.milestone = milestone;
        }

        // Checked before derivation, which would recount the duration away.
        if change.duration == Some(Some(0)) && task.is_automatic() && task.has_predecessors() {
            return Err(ValidationError::ZeroDuration { task: task.id }.into());
        }

        if task.milestone {
            Self::apply_milestone_date(&mut task, change);
        } else {
            let span = DateSpan::of(&task)
                .apply(&change.span_change(), &self.calendar)
                .map_err(|err| Self::attribute_calendar_error(task.id, err))?;
            span.write_to(&mut task);
        }

        validate_task(&task)?;
        Ok(task)
    }

    /// A milestone keeps a single date: the one just set, else the one it had.
    fn apply_milestone_date(task: &mut Task, change: &TaskChange) {
        let date = match change.due_date.or(change.start_date) {
            Some(date) => date,
            None => task.start_date.or(task.due_date),
        };
        if let Some(mode) = change.day_counting {
            task.day_counting = mode;
        }
        task.start_date = date;
        task.due_date = date;
        task.duration = None;
    }

    fn attribute_calendar_error(task: TaskId, err: CalendarError) -> SchedulingError {
        match err {
            CalendarError::DueBeforeStart { start, due } => {
                ValidationError::DueBeforeStart { task, start, due }.into()
            }
            other => other.into(),
        }
    }
}
