use chrono::NaiveDate;
use wp_scheduler::{
    CalendarError, ChangeRequest, DayCounting, ProjectGraph, Scheduler, SchedulingError, Task, TaskAttribute,
    TaskChange, TaskId, ValidationError, WorkCalendar,
};

fn d(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn graph(tasks: Vec<Task>) -> ProjectGraph {
    ProjectGraph::from_tasks(tasks).unwrap()
}

fn dates(graph: &ProjectGraph, id: i32) -> (Option<NaiveDate>, Option<NaiveDate>, Option<u32>) {
    let task = graph.get(TaskId(id)).unwrap();
    (task.start_date, task.due_date, task.duration)
}

/// Schedules `request` and writes the result back into `graph`.
fn apply(graph: &mut ProjectGraph, calendar: &WorkCalendar, request: &ChangeRequest) {
    let changes = Scheduler::new(calendar, &*graph).schedule(request).unwrap();
    graph.apply(&changes);
}

#[test]
fn successor_of_single_day_task_starts_next_working_day() {
    // Mon 2025-01-06
    let graph = graph(vec![
        Task::new(1, "A").with_dates(Some(d(2025, 1, 6)), Some(d(2025, 1, 6))),
        Task::new(2, "B").automatic().follows(1, 0),
    ]);
    let scheduler = Scheduler::new(WorkCalendar::default(), &graph);

    let changes = scheduler.reschedule([TaskId(2)]).unwrap();
    let b = changes.task(TaskId(2)).unwrap();
    assert_eq!(b.start_date, Some(d(2025, 1, 7)));
    assert_eq!(b.due_date, None);
    assert_eq!(changes.len(), 1);
}

#[test]
fn overtaken_successor_keeps_due_date_and_recounts_duration() {
    let graph = graph(vec![
        Task::new(1, "A")
            .with_dates(Some(d(2025, 1, 6)), Some(d(2025, 1, 8)))
            .with_duration(Some(3)),
        Task::new(2, "B")
            .automatic()
            .with_dates(Some(d(2025, 1, 6)), Some(d(2025, 1, 10)))
            .with_duration(Some(5))
            .follows(1, 0),
    ]);
    let scheduler = Scheduler::new(WorkCalendar::default(), &graph);

    let changes = scheduler.reschedule([TaskId(2)]).unwrap();
    let b = changes.task(TaskId(2)).unwrap();
    assert_eq!(b.start_date, Some(d(2025, 1, 9)));
    assert_eq!(b.due_date, Some(d(2025, 1, 10)));
    assert_eq!(b.duration, Some(2));
    let update = changes.get(TaskId(2)).unwrap();
    assert!(update.touches(TaskAttribute::StartDate));
    assert!(update.touches(TaskAttribute::Duration));
    assert!(!update.touches(TaskAttribute::DueDate));
}

#[test]
fn longer_predecessor_pushes_successor() {
    let mut graph = graph(vec![
        Task::new(1, "A")
            .with_dates(Some(d(2025, 1, 6)), Some(d(2025, 1, 8)))
            .with_duration(Some(3)),
        Task::new(2, "B")
            .automatic()
            .with_dates(Some(d(2025, 1, 9)), Some(d(2025, 1, 9)))
            .with_duration(Some(1))
            .follows(1, 0),
    ]);
    let calendar = WorkCalendar::default();

    let request = ChangeRequest::new().change(TaskChange::new(1).duration(Some(4)));
    apply(&mut graph, &calendar, &request);

    assert_eq!(dates(&graph, 1), (Some(d(2025, 1, 6)), Some(d(2025, 1, 9)), Some(4)));
    assert_eq!(dates(&graph, 2), (Some(d(2025, 1, 10)), Some(d(2025, 1, 10)), Some(1)));
}

#[test]
fn chain_propagates_in_one_pass() {
    let mut graph = graph(vec![
        Task::new(1, "A")
            .with_dates(Some(d(2025, 1, 6)), Some(d(2025, 1, 7)))
            .with_duration(Some(2)),
        Task::new(2, "B")
            .automatic()
            .with_dates(Some(d(2025, 1, 8)), Some(d(2025, 1, 9)))
            .with_duration(Some(2))
            .follows(1, 0),
        Task::new(3, "C")
            .automatic()
            .with_dates(Some(d(2025, 1, 10)), Some(d(2025, 1, 13)))
            .with_duration(Some(2))
            .follows(2, 0),
    ]);
    let calendar = WorkCalendar::default();

    let request = ChangeRequest::new().change(TaskChange::new(1).due_date(Some(d(2025, 1, 10))));
    apply(&mut graph, &calendar, &request);

    assert_eq!(dates(&graph, 1), (Some(d(2025, 1, 6)), Some(d(2025, 1, 10)), Some(5)));
    assert_eq!(dates(&graph, 2), (Some(d(2025, 1, 13)), Some(d(2025, 1, 14)), Some(2)));
    assert_eq!(dates(&graph, 3), (Some(d(2025, 1, 15)), Some(d(2025, 1, 16)), Some(2)));
}

#[test]
fn diamond_waits_for_the_later_branch() {
    let graph = graph(vec![
        Task::new(1, "A").with_dates(Some(d(2025, 1, 6)), Some(d(2025, 1, 7))),
        Task::new(2, "B").automatic().with_duration(Some(1)).follows(1, 0),
        Task::new(3, "C").automatic().with_duration(Some(1)).follows(1, 2),
        Task::new(4, "D")
            .automatic()
            .with_duration(Some(1))
            .follows(2, 0)
            .follows(3, 0),
    ]);
    let scheduler = Scheduler::new(WorkCalendar::default(), &graph);

    let changes = scheduler.reschedule([TaskId(1)]).unwrap();
    assert_eq!(changes.task(TaskId(2)).unwrap().start_date, Some(d(2025, 1, 8)));
    assert_eq!(changes.task(TaskId(3)).unwrap().start_date, Some(d(2025, 1, 10)));
    let joined = changes.task(TaskId(4)).unwrap();
    assert_eq!(joined.start_date, Some(d(2025, 1, 13)));
    assert_eq!(joined.due_date, Some(d(2025, 1, 13)));
}

#[test]
fn lag_is_counted_in_successor_mode() {
    let graph = graph(vec![
        Task::new(1, "A").with_dates(Some(d(2025, 1, 10)), Some(d(2025, 1, 10))),
        Task::new(2, "working").automatic().follows(1, 1),
        Task::new(3, "calendar").automatic().all_days().follows(1, 1),
    ]);
    let scheduler = Scheduler::new(WorkCalendar::default(), &graph);

    let changes = scheduler.reschedule([TaskId(1)]).unwrap();
    // Friday + one working day of lag is Monday, start Tuesday
    assert_eq!(changes.task(TaskId(2)).unwrap().start_date, Some(d(2025, 1, 14)));
    // Saturday is lag, start Sunday
    assert_eq!(changes.task(TaskId(3)).unwrap().start_date, Some(d(2025, 1, 12)));
}

#[test]
fn earlier_predecessor_leaves_successor_alone() {
    let graph = graph(vec![
        Task::new(1, "A")
            .with_dates(Some(d(2025, 1, 6)), Some(d(2025, 1, 8)))
            .with_duration(Some(3)),
        Task::new(2, "B")
            .automatic()
            .with_dates(Some(d(2025, 1, 13)), Some(d(2025, 1, 14)))
            .with_duration(Some(2))
            .follows(1, 0),
    ]);
    let scheduler = Scheduler::new(WorkCalendar::default(), &graph);

    let request = ChangeRequest::new().change(TaskChange::new(1).due_date(Some(d(2025, 1, 7))));
    let changes = scheduler.schedule(&request).unwrap();
    assert_eq!(changes.ids().collect::<Vec<_>>(), vec![TaskId(1)]);
}

#[test]
fn zero_duration_with_predecessor_is_rejected() {
    let graph = graph(vec![
        Task::new(1, "A").with_dates(Some(d(2025, 1, 6)), Some(d(2025, 1, 6))),
        Task::new(2, "B")
            .automatic()
            .with_dates(Some(d(2025, 1, 7)), Some(d(2025, 1, 8)))
            .with_duration(Some(2))
            .follows(1, 0),
    ]);
    let scheduler = Scheduler::new(WorkCalendar::default(), &graph);

    let request = ChangeRequest::new().change(TaskChange::new(2).duration(Some(0)));
    let err = scheduler.schedule(&request).unwrap_err();
    let validation = err.validation().unwrap();
    assert_eq!(validation, &ValidationError::ZeroDuration { task: TaskId(2) });
    assert_eq!(validation.attribute(), TaskAttribute::Duration);
    assert_eq!(validation.code(), "greater_than");
    assert_eq!(dates(&graph, 2), (Some(d(2025, 1, 7)), Some(d(2025, 1, 8)), Some(2)));
}

#[test]
fn zero_duration_without_predecessor_is_accepted() {
    let graph = graph(vec![Task::new(1, "A").automatic()]);
    let scheduler = Scheduler::new(WorkCalendar::default(), &graph);

    let request = ChangeRequest::new().change(TaskChange::new(1).duration(Some(0)));
    let changes = scheduler.schedule(&request).unwrap();
    assert_eq!(changes.task(TaskId(1)).unwrap().duration, Some(0));
}

#[test]
fn manual_successor_is_frozen() {
    let graph = graph(vec![
        Task::new(1, "A")
            .with_dates(Some(d(2025, 1, 6)), Some(d(2025, 1, 8)))
            .with_duration(Some(3)),
        Task::new(2, "B")
            .with_dates(Some(d(2025, 1, 7)), Some(d(2025, 1, 7)))
            .with_duration(Some(1))
            .follows(1, 0),
    ]);
    let scheduler = Scheduler::new(WorkCalendar::default(), &graph);

    let request = ChangeRequest::new().change(TaskChange::new(1).duration(Some(5)));
    let changes = scheduler.schedule(&request).unwrap();
    assert!(changes.contains(TaskId(1)));
    assert!(!changes.contains(TaskId(2)));
}

#[test]
fn switching_to_automatic_recomputes_immediately() {
    let graph = graph(vec![
        Task::new(1, "A")
            .with_dates(Some(d(2025, 1, 6)), Some(d(2025, 1, 8)))
            .with_duration(Some(3)),
        Task::new(2, "B")
            .with_dates(Some(d(2025, 1, 6)), Some(d(2025, 1, 7)))
            .with_duration(Some(2))
            .follows(1, 0),
    ]);
    let scheduler = Scheduler::new(WorkCalendar::default(), &graph);

    let request = ChangeRequest::new().change(
        TaskChange::new(2).scheduling_mode(wp_scheduler::SchedulingMode::Automatic),
    );
    let changes = scheduler.schedule(&request).unwrap();
    let b = changes.task(TaskId(2)).unwrap();
    assert_eq!(b.start_date, Some(d(2025, 1, 9)));
    assert_eq!(b.due_date, Some(d(2025, 1, 10)));
    assert_eq!(b.duration, Some(2));
}

#[test]
fn holiday_on_start_drifts_task_forward() {
    let graph = graph(vec![
        Task::new(1, "A")
            .automatic()
            .with_dates(Some(d(2025, 1, 13)), Some(d(2025, 1, 15)))
            .with_duration(Some(3)),
    ]);
    let mut calendar = WorkCalendar::default();
    calendar.add_holiday(d(2025, 1, 13));
    let scheduler = Scheduler::new(calendar, &graph);

    let changes = scheduler.reschedule([TaskId(1)]).unwrap();
    let a = changes.task(TaskId(1)).unwrap();
    assert_eq!(a.start_date, Some(d(2025, 1, 14)));
    assert_eq!(a.due_date, Some(d(2025, 1, 15)));
    assert_eq!(a.duration, Some(2));
}

#[test]
fn rescheduling_a_consistent_graph_changes_nothing() {
    let mut graph = graph(vec![
        Task::new(1, "A")
            .with_dates(Some(d(2025, 1, 6)), Some(d(2025, 1, 8)))
            .with_duration(Some(3)),
        Task::new(2, "B").automatic().with_duration(Some(2)).follows(1, 0),
        Task::new(3, "P").automatic(),
        Task::new(4, "C").automatic().with_duration(Some(3)).follows(2, 1).child_of(3),
    ]);
    let calendar = WorkCalendar::default();
    let all: Vec<TaskId> = graph.ids().collect();

    apply(&mut graph, &calendar, &ChangeRequest::touch(all.clone()));
    assert_eq!(dates(&graph, 4), (Some(d(2025, 1, 14)), Some(d(2025, 1, 16)), Some(3)));

    let scheduler = Scheduler::new(&calendar, &graph);
    assert!(scheduler.reschedule(all).unwrap().is_empty());
}

#[test]
fn created_tasks_are_scheduled_and_flagged() {
    let graph = graph(vec![
        Task::new(1, "A").with_dates(Some(d(2025, 1, 6)), Some(d(2025, 1, 7))),
    ]);
    let scheduler = Scheduler::new(WorkCalendar::default(), &graph);

    let request = ChangeRequest::new().create(
        Task::new(5, "new")
            .automatic()
            .with_duration(Some(2))
            .follows(1, 0),
    );
    let changes = scheduler.schedule(&request).unwrap();
    let update = changes.get(TaskId(5)).unwrap();
    assert!(update.created);
    assert_eq!(update.task.start_date, Some(d(2025, 1, 8)));
    assert_eq!(update.task.due_date, Some(d(2025, 1, 9)));
    assert!(update.touches(TaskAttribute::Relations));
}

#[test]
fn creating_an_existing_task_fails() {
    let graph = graph(vec![Task::new(1, "A")]);
    let scheduler = Scheduler::new(WorkCalendar::default(), &graph);

    let err = scheduler
        .schedule(&ChangeRequest::new().create(Task::new(1, "again")))
        .unwrap_err();
    assert!(matches!(err, SchedulingError::DuplicateTask(TaskId(1))));
}

#[test]
fn editing_an_unknown_task_fails() {
    let graph = graph(vec![Task::new(1, "A")]);
    let scheduler = Scheduler::new(WorkCalendar::default(), &graph);

    let err = scheduler
        .schedule(&ChangeRequest::new().change(TaskChange::new(9).duration(Some(2))))
        .unwrap_err();
    assert!(matches!(err, SchedulingError::TaskNotFound(TaskId(9))));
}

#[test]
fn several_edits_to_one_task_accumulate() {
    let graph = graph(vec![Task::new(1, "A")]);
    let scheduler = Scheduler::new(WorkCalendar::default(), &graph);

    let request = ChangeRequest::new()
        .change(TaskChange::new(1).start_date(Some(d(2025, 1, 6))))
        .change(TaskChange::new(1).duration(Some(3)));
    let changes = scheduler.schedule(&request).unwrap();
    let a = changes.task(TaskId(1)).unwrap();
    assert_eq!((a.start_date, a.due_date, a.duration), (Some(d(2025, 1, 6)), Some(d(2025, 1, 8)), Some(3)));
}

#[test]
fn all_days_task_is_not_snapped() {
    let graph = graph(vec![
        Task::new(1, "A")
            .automatic()
            .all_days()
            .with_dates(Some(d(2025, 1, 11)), Some(d(2025, 1, 12)))
            .with_duration(Some(2)),
    ]);
    let scheduler = Scheduler::new(WorkCalendar::default(), &graph);

    assert!(scheduler.reschedule([TaskId(1)]).unwrap().is_empty());
    assert_eq!(graph.get(TaskId(1)).unwrap().day_counting, DayCounting::AllDays);
}

#[test]
fn duration_beyond_the_calendar_range_is_an_error() {
    let graph = graph(vec![
        Task::new(1, "A")
            .all_days()
            .with_dates(Some(d(2025, 1, 6)), Some(d(2025, 1, 6))),
    ]);
    let scheduler = Scheduler::new(WorkCalendar::default(), &graph);

    let request = ChangeRequest::new().change(TaskChange::new(1).duration(Some(200_000_000)));
    let err = scheduler.schedule(&request).unwrap_err();
    assert!(
        matches!(err, SchedulingError::Calendar(CalendarError::OutOfRange { .. })),
        "{err}"
    );
}

#[test]
fn lag_beyond_the_calendar_range_is_an_error() {
    let graph = graph(vec![
        Task::new(1, "A").with_dates(Some(d(2025, 1, 6)), Some(d(2025, 1, 10))),
        Task::new(2, "B").automatic().all_days().with_duration(Some(2)),
    ]);
    let scheduler = Scheduler::new(WorkCalendar::default(), &graph);

    let request =
        ChangeRequest::new().change(TaskChange::new(2).add_predecessor(1, 200_000_000));
    let err = scheduler.schedule(&request).unwrap_err();
    assert!(
        matches!(err, SchedulingError::Calendar(CalendarError::OutOfRange { .. })),
        "{err}"
    );
    assert!(graph.get(TaskId(2)).unwrap().predecessors.is_empty());
}
