use proptest::prelude::*;
use tymepace::models::{Day, Overrides, Priority, TaskDraft, TaskId};
use tymepace::scheduler::{Placement, ScheduleError, Scheduler, SchedulerSettings};

fn scheduler_with(ids: &[&str]) -> Scheduler {
    let mut s = Scheduler::new(SchedulerSettings::default());
    for id in ids {
        s.add_task(TaskDraft::new(format!("Task {}", id)).with_id(*id)).unwrap();
    }
    s
}

fn assert_no_overlap(s: &Scheduler, day: &Day) {
    let entries = s.entries_on(day);
    for (i, a) in entries.iter().enumerate() {
        for b in &entries[i + 1..] {
            assert!(
                !(a.start_hour < b.end_hour && b.start_hour < a.end_hour),
                "{} [{}, {}) overlaps {} [{}, {})",
                a.task_id, a.start_hour, a.end_hour, b.task_id, b.start_hour, b.end_hour
            );
        }
    }
}

fn assert_full_coverage(s: &Scheduler, day: &Day) {
    let settings = s.settings();
    let mut cursor = settings.visible_start();
    for slot in s.compute_slots(day) {
        assert_eq!(slot.start, cursor, "gap or overlap before slot at {}", slot.start);
        assert!(slot.end > slot.start);
        cursor = slot.end;
    }
    assert_eq!(cursor, settings.visible_end());
}

#[test]
fn test_place_into_free_slot() {
    let mut s = scheduler_with(&["a"]);
    let mon = Day::new("MON");
    assert_eq!(s.place(&"a".into(), &mon, 9.0, 10.0, None), Ok(Placement::Created));
    assert_eq!(s.entries_on(&mon).len(), 1);
    assert_eq!(s.unscheduled().count(), 0);
}

#[test]
fn test_overlapping_place_is_rejected_without_change() {
    let mut s = scheduler_with(&["a", "b"]);
    let mon = Day::new("MON");
    s.place(&"a".into(), &mon, 9.0, 11.0, None).unwrap();

    let err = s.place(&"b".into(), &mon, 10.5, 12.0, None).unwrap_err();
    assert_eq!(
        err,
        ScheduleError::SlotOccupied { day: mon.clone(), hour: 10.5, occupant: "a".into() }
    );
    assert_eq!(s.entries_on(&mon).len(), 1);
    assert!(!s.is_scheduled(&"b".into()));
}

#[test]
fn test_adjacent_placement_is_legal() {
    let mut s = scheduler_with(&["a", "b", "c"]);
    let mon = Day::new("MON");
    s.place(&"a".into(), &mon, 9.0, 10.0, None).unwrap();
    s.place(&"b".into(), &mon, 10.0, 11.0, None).unwrap();
    s.place(&"c".into(), &mon, 8.0, 9.0, None).unwrap();
    let starts: Vec<f64> = s.entries_on(&mon).iter().map(|e| e.start_hour).collect();
    assert_eq!(starts, vec![8.0, 9.0, 10.0]);
}

#[test]
fn test_same_hours_on_other_day_do_not_conflict() {
    let mut s = scheduler_with(&["a", "b"]);
    s.place(&"a".into(), &Day::new("MON"), 9.0, 10.0, None).unwrap();
    s.place(&"b".into(), &Day::new("TUES"), 9.0, 10.0, None).unwrap();
    assert_eq!(s.all_entries().count(), 2);
}

#[test]
fn test_move_keeps_single_entry() {
    let mut s = scheduler_with(&["a"]);
    let a: TaskId = "a".into();
    s.place(&a, &Day::new("MON"), 9.0, 10.0, None).unwrap();
    assert_eq!(s.place(&a, &Day::new("WED"), 14.0, 15.5, None), Ok(Placement::Moved));

    assert_eq!(s.all_entries().filter(|e| e.task_id == a).count(), 1);
    assert!(s.entries_on(&Day::new("MON")).is_empty());
    let e = s.entry(&a).unwrap();
    assert_eq!((e.day.as_str(), e.start_hour, e.end_hour), ("WED", 14.0, 15.5));
}

#[test]
fn test_move_may_overlap_its_own_old_interval() {
    let mut s = scheduler_with(&["a"]);
    let a: TaskId = "a".into();
    let mon = Day::new("MON");
    s.place(&a, &mon, 9.0, 11.0, None).unwrap();
    s.place(&a, &mon, 10.0, 12.0, None).unwrap();
    let e = s.entry(&a).unwrap();
    assert_eq!((e.start_hour, e.end_hour), (10.0, 12.0));
}

#[test]
fn test_rejected_move_keeps_old_entry() {
    let mut s = scheduler_with(&["a", "b"]);
    let mon = Day::new("MON");
    s.place(&"a".into(), &mon, 9.0, 10.0, None).unwrap();
    s.place(&"b".into(), &mon, 12.0, 13.0, None).unwrap();
    assert!(s.place(&"a".into(), &mon, 12.5, 13.5, None).is_err());
    assert_eq!(s.entry(&"a".into()).unwrap().start_hour, 9.0);
}

#[test]
fn test_overrides_apply_to_entry_and_task() {
    let mut s = scheduler_with(&["a"]);
    let a: TaskId = "a".into();
    let overrides = Overrides {
        title: Some("Renamed".into()),
        priority: Some(Priority::High),
        ..Default::default()
    };
    s.place(&a, &Day::new("MON"), 9.0, 10.0, Some(&overrides)).unwrap();
    assert_eq!(s.entry(&a).unwrap().title, "Renamed");
    assert_eq!(s.entry(&a).unwrap().priority, Priority::High);
    assert_eq!(s.task(&a).unwrap().title, "Renamed");
}

#[test]
fn test_invalid_intervals_are_rejected() {
    let mut s = scheduler_with(&["a"]);
    let mon = Day::new("MON");
    assert!(matches!(s.place(&"a".into(), &mon, 10.0, 10.0, None), Err(ScheduleError::InvalidInterval { .. })));
    assert!(matches!(s.place(&"a".into(), &mon, 11.0, 10.0, None), Err(ScheduleError::InvalidInterval { .. })));
    assert!(matches!(s.place(&"a".into(), &mon, f64::NAN, 10.0, None), Err(ScheduleError::InvalidInterval { .. })));
    assert!(!s.is_scheduled(&"a".into()));
}

#[test]
fn test_unknown_task_is_rejected() {
    let mut s = scheduler_with(&[]);
    assert_eq!(
        s.place(&"ghost".into(), &Day::new("MON"), 9.0, 10.0, None),
        Err(ScheduleError::UnknownTask("ghost".into()))
    );
    assert_eq!(s.resize(&"ghost".into(), 12.0), Err(ScheduleError::UnknownTask("ghost".into())));
}

#[test]
fn test_resize_grows_into_free_time() {
    let mut s = scheduler_with(&["a", "b"]);
    let mon = Day::new("MON");
    s.place(&"a".into(), &mon, 9.0, 10.0, None).unwrap();
    s.place(&"b".into(), &mon, 12.0, 13.0, None).unwrap();
    assert_eq!(s.resize(&"a".into(), 12.0), Ok(12.0));
    assert_eq!(
        s.resize(&"a".into(), 12.5),
        Err(ScheduleError::ResizeBlocked { task_id: "a".into(), blocker: "b".into() })
    );
    assert_eq!(s.entry(&"a".into()).unwrap().end_hour, 12.0);
}

#[test]
fn test_resize_floor_clamps_to_granularity() {
    let mut s = scheduler_with(&["a"]);
    let mon = Day::new("MON");
    s.place(&"a".into(), &mon, 9.0, 11.0, None).unwrap();
    assert_eq!(s.resize(&"a".into(), 8.0), Ok(10.0));
    assert_eq!(s.resize(&"a".into(), 9.0), Ok(10.0));
    assert_eq!(s.entry(&"a".into()).unwrap().end_hour, 10.0);
}

#[test]
fn test_resize_floor_uses_configured_granularity() {
    let mut s = Scheduler::new(SchedulerSettings { granularity: 0.25, ..Default::default() });
    s.add_task(TaskDraft::new("a").with_id("a")).unwrap();
    s.place(&"a".into(), &Day::new("MON"), 9.0, 10.0, None).unwrap();
    assert_eq!(s.resize(&"a".into(), 0.0), Ok(9.25));
}

#[test]
fn test_resize_unscheduled_task() {
    let mut s = scheduler_with(&["a"]);
    assert_eq!(s.resize(&"a".into(), 12.0), Err(ScheduleError::NotScheduled("a".into())));
}

#[test]
fn test_retract_is_idempotent() {
    let mut s = scheduler_with(&["a"]);
    let a: TaskId = "a".into();
    s.place(&a, &Day::new("MON"), 9.0, 10.0, None).unwrap();

    assert!(s.retract(&a).is_some());
    let once: Vec<_> = s.unscheduled().map(|t| t.id.clone()).collect();
    assert!(s.retract(&a).is_none());
    let twice: Vec<_> = s.unscheduled().map(|t| t.id.clone()).collect();

    assert_eq!(once, twice);
    assert_eq!(once, vec![a]);
    assert!(s.retract(&"ghost".into()).is_none());
}

#[test]
fn test_slots_for_empty_day() {
    let s = scheduler_with(&[]);
    let slots: Vec<_> = s.compute_slots(&Day::new("MON")).collect();
    assert_eq!(slots.len(), 24);
    assert!(slots.iter().all(|slot| slot.is_empty() && slot.duration() == 1.0));
    assert_eq!(slots[0].start, 1.0);
    assert_eq!(slots[23].end, 25.0);
}

#[test]
fn test_slots_span_entries_and_split_around_mid_hour() {
    let mut s = scheduler_with(&["a", "b"]);
    let mon = Day::new("MON");
    s.place(&"a".into(), &mon, 9.5, 11.0, None).unwrap();
    s.place(&"b".into(), &mon, 13.0, 13.25, None).unwrap();

    let slots: Vec<_> = s.compute_slots(&mon).collect();
    let around: Vec<(f64, f64, bool)> = slots
        .iter()
        .filter(|slot| slot.start >= 9.0 && slot.end <= 14.0)
        .map(|slot| (slot.start, slot.end, slot.is_empty()))
        .collect();
    assert_eq!(
        around,
        vec![
            (9.0, 9.5, true),
            (9.5, 11.0, false),
            (11.0, 12.0, true),
            (12.0, 13.0, true),
            (13.0, 13.25, false),
            (13.25, 14.0, true),
        ]
    );
    assert_full_coverage(&s, &mon);
}

#[derive(Debug, Clone)]
enum Op {
    Place { task: usize, day: usize, start_q: u32, len_q: u32 },
    Resize { task: usize, end_q: u32 },
    Retract { task: usize },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..6usize, 0..2usize, 0..100u32, 1..16u32)
            .prop_map(|(task, day, start_q, len_q)| Op::Place { task, day, start_q, len_q }),
        (0..6usize, 0..104u32).prop_map(|(task, end_q)| Op::Resize { task, end_q }),
        (0..6usize).prop_map(|task| Op::Retract { task }),
    ]
}

proptest! {
    #[test]
    fn prop_random_operations_keep_invariants(ops in prop::collection::vec(op_strategy(), 1..60)) {
        let ids = ["t0", "t1", "t2", "t3", "t4", "t5"];
        let days = [Day::new("MON"), Day::new("TUES")];
        let mut s = Scheduler::new(SchedulerSettings { granularity: 0.25, ..Default::default() });
        for id in ids {
            s.add_task(TaskDraft::new(id).with_id(id)).unwrap();
        }

        for op in ops {
            match op {
                Op::Place { task, day, start_q, len_q } => {
                    let start = f64::from(start_q) / 4.0;
                    let _ = s.place(&ids[task].into(), &days[day], start, start + f64::from(len_q) / 4.0, None);
                }
                Op::Resize { task, end_q } => {
                    let _ = s.resize(&ids[task].into(), f64::from(end_q) / 4.0);
                }
                Op::Retract { task } => {
                    s.retract(&ids[task].into());
                }
            }

            for day in &days {
                assert_no_overlap(&s, day);
                assert_full_coverage(&s, day);
            }
            for id in ids {
                let id: TaskId = id.into();
                let count = s.all_entries().filter(|e| e.task_id == id).count();
                let pooled = s.unscheduled().filter(|t| t.id == id).count();
                prop_assert_eq!(count + pooled, 1);
                if let Some(e) = s.entry(&id) {
                    prop_assert!(e.end_hour - e.start_hour >= 0.25 - 1e-9);
                }
            }
        }
    }
}
