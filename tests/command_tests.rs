use std::path::PathBuf;

use tymepace::commands::*;
use tymepace::config::Config;
use tymepace::models::{Priority, TaskEdit};
use tymepace::scheduler::Placement;
use tymepace::storage::TaskStore;

fn with_test_db<F>(f: F)
where
    F: FnOnce(Config, PathBuf),
{
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("tasks.json");
    f(Config::with_db(&db_path), db_path);
}

#[test]
fn test_add_and_list() {
    with_test_db(|config, path| {
        let id = cmd_add(&config, "Test Task".into(), Some("notes".into()), Priority::High, None, Some("work".into())).unwrap();

        let rows = TaskStore::new(&path).list().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, id.as_str());
        assert_eq!(rows[0].title, "Test Task");
        assert_eq!(rows[0].color, "red");
        assert_eq!(rows[0].category.as_deref(), Some("work"));
        assert_eq!(rows[0].day, None);

        cmd_list(&config, false, None).unwrap();
        cmd_list(&config, true, Some("work".into())).unwrap();
    });
}

#[test]
fn test_empty_title_is_rejected() {
    with_test_db(|config, path| {
        assert!(cmd_add(&config, "   ".into(), None, Priority::None, None, None).is_err());
        assert!(TaskStore::new(&path).list().unwrap().is_empty());
    });
}

#[test]
fn test_place_persists_schedule() {
    with_test_db(|config, path| {
        let id = cmd_add(&config, "Report".into(), None, Priority::None, None, None).unwrap();

        let outcome = cmd_place(&config, id.short(), "2025-03-24", "9:30", Some("11:00")).unwrap();
        assert_eq!(outcome, Placement::Created);

        let rows = TaskStore::new(&path).list().unwrap();
        assert_eq!(rows[0].day.as_deref(), Some("2025-03-24"));
        assert_eq!(rows[0].time_range.as_deref(), Some("09:30-11:00"));

        let outcome = cmd_place(&config, id.as_str(), "2025-03-25", "2pm", None).unwrap();
        assert_eq!(outcome, Placement::Moved);
        let rows = TaskStore::new(&path).list().unwrap();
        assert_eq!(rows[0].day.as_deref(), Some("2025-03-25"));
        assert_eq!(rows[0].time_range.as_deref(), Some("14:00-15:00"));
    });
}

#[test]
fn test_conflicting_place_fails_and_keeps_state() {
    with_test_db(|config, path| {
        let a = cmd_add(&config, "First".into(), None, Priority::None, None, None).unwrap();
        let b = cmd_add(&config, "Second".into(), None, Priority::None, None, None).unwrap();
        cmd_place(&config, a.as_str(), "MON", "9", Some("11")).unwrap();

        let err = cmd_place(&config, b.as_str(), "mon", "10", Some("12")).unwrap_err();
        assert!(err.to_string().contains("First"), "unexpected message: {}", err);

        let rows = TaskStore::new(&path).list().unwrap();
        let second = rows.iter().find(|r| r.id == b.as_str()).unwrap();
        assert_eq!(second.day, None);
    });
}

#[test]
fn test_resize_and_retract() {
    with_test_db(|config, path| {
        let id = cmd_add(&config, "Stretch".into(), None, Priority::None, None, None).unwrap();
        cmd_place(&config, id.as_str(), "MON", "9", Some("10")).unwrap();

        assert_eq!(cmd_resize(&config, id.as_str(), "12:00").unwrap(), 12.0);
        assert_eq!(cmd_resize(&config, id.as_str(), "8").unwrap(), 10.0);
        let rows = TaskStore::new(&path).list().unwrap();
        assert_eq!(rows[0].time_range.as_deref(), Some("09:00-10:00"));

        cmd_retract(&config, id.as_str()).unwrap();
        cmd_retract(&config, id.as_str()).unwrap();
        let rows = TaskStore::new(&path).list().unwrap();
        assert_eq!(rows[0].day, None);
        assert_eq!(rows[0].time_range, None);
    });
}

#[test]
fn test_edit_updates_content() {
    with_test_db(|config, path| {
        let id = cmd_add(&config, "Old".into(), None, Priority::Low, None, Some("home".into())).unwrap();
        let edit = TaskEdit {
            title: Some("New".into()),
            priority: Some(Priority::High),
            category: Some(String::new()),
            ..Default::default()
        };
        cmd_edit(&config, id.as_str(), edit).unwrap();

        let rows = TaskStore::new(&path).list().unwrap();
        assert_eq!(rows[0].title, "New");
        assert_eq!(rows[0].color, "red");
        assert_eq!(rows[0].category, None);
    });
}

#[test]
fn test_remove_task() {
    with_test_db(|config, path| {
        let id = cmd_add(&config, "Doomed".into(), None, Priority::None, None, None).unwrap();
        cmd_place(&config, id.as_str(), "MON", "9", None).unwrap();
        cmd_remove(&config, id.short()).unwrap();
        assert!(TaskStore::new(&path).list().unwrap().is_empty());
        assert!(cmd_remove(&config, id.as_str()).is_err());
    });
}

#[test]
fn test_blank_id_matches_nothing() {
    with_test_db(|config, path| {
        cmd_add(&config, "Precious".into(), None, Priority::None, None, None).unwrap();
        assert!(cmd_remove(&config, "").is_err());
        assert!(cmd_remove(&config, "  ").is_err());
        assert!(cmd_retract(&config, "").is_err());
        assert_eq!(TaskStore::new(&path).list().unwrap().len(), 1);
    });
}

#[test]
fn test_show_and_reset() {
    with_test_db(|config, path| {
        let id = cmd_add(&config, "Visible".into(), None, Priority::Medium, None, None).unwrap();
        cmd_place(&config, id.as_str(), "2025-03-24", "9:15", Some("9:45")).unwrap();
        cmd_show(&config, Some("2025-03-24"), Some(1), None, false).unwrap();
        cmd_show(&config, Some("2025-03-24"), Some(7), Some("work"), true).unwrap();
        assert!(cmd_show(&config, Some("2025-03-24"), Some(5), None, false).is_err());
        assert!(cmd_show(&config, Some("MON"), None, None, false).is_err());

        cmd_reset(&config, true).unwrap();
        assert!(!path.exists());
        cmd_reset(&config, true).unwrap();
    });
}
