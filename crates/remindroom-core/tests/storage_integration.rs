//! Integration tests for SQLite persistence and the config file.
//!
//! Reminders saved by one board are restored by a fresh one, the way the
//! CLI hydrates its board on every invocation.

use remindroom_core::storage::data_dir;
use remindroom_core::{
    Board, Config, ManualClock, NotificationCenter, ReminderDefaults, ReminderPatch, SqliteStore,
};

#[test]
fn test_board_changes_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("remindroom.db");

    let id = {
        let store = SqliteStore::open_at(&path).unwrap();
        let mut board = Board::new(ManualClock::new(), NotificationCenter::new(), store);
        let id = board.create(&ReminderDefaults::default());

        // Drafts stay out of the database.
        board
            .update(
                id,
                ReminderPatch {
                    name: Some("Stretch".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(board.store().count().unwrap(), 0);

        board.register(id).unwrap();
        board
            .update(
                id,
                ReminderPatch {
                    cycle_duration_secs: Some(1800),
                    wait_for_acknowledgement: Some(true),
                    ..Default::default()
                },
            )
            .unwrap();

        let draft = board.create(&ReminderDefaults::default());
        board.activate(draft).unwrap();
        id
    };

    let store = SqliteStore::open_at(&path).unwrap();
    let configs = store.load_all().unwrap();
    assert_eq!(configs.len(), 1);

    let mut board = Board::new(ManualClock::new(), NotificationCenter::new(), store);
    for config in configs {
        board.restore(config);
    }
    let restored = board.get(id).unwrap();
    assert_eq!(restored.config().name, "Stretch");
    assert_eq!(restored.config().cycle_duration_secs, 1800);
    assert!(restored.config().wait_for_acknowledgement);
    assert!(!restored.is_active());

    board.remove(id).unwrap();
    assert_eq!(board.store().count().unwrap(), 0);
}

#[test]
fn test_config_file_lives_in_data_dir() {
    let dir = tempfile::tempdir().unwrap();
    std::env::set_var("REMINDROOM_DATA_DIR", dir.path());
    assert_eq!(data_dir().unwrap(), dir.path());

    let mut cfg = Config::load().unwrap();
    assert_eq!(cfg, Config::default());
    assert!(dir.path().join("config.toml").exists());

    cfg.set("defaults.cycle_duration_secs", "60").unwrap();
    cfg.set("notifications.suppressed", "true").unwrap();

    let reloaded = Config::load().unwrap();
    assert_eq!(reloaded.defaults.cycle_duration_secs, 60);
    assert!(reloaded.notifications.suppressed);

    std::fs::write(dir.path().join("config.toml"), "[engine\n").unwrap();
    assert!(Config::load().is_err());
    assert_eq!(Config::load_or_default(), Config::default());
}
