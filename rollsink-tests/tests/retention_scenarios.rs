//! Retention policy scenarios

use std::io::Write;
use std::time::Duration;

use rollsink::RollSinkBuilder;
use rollsink_tests::{frozen_clock, log_name, seed_gzipped_log, seed_log, wait_until};
use tempfile::TempDir;

const CONTENT: &str = "uncompressed fake - log - content";

#[tokio::test]
async fn the_backup_set_is_trimmed_to_the_configured_count() {
    let dir = TempDir::new().unwrap();
    let dates = [
        "2018-01-16",
        "2018-01-17",
        "2018-01-18",
        "2018-01-19",
        "2018-01-20",
        "2018-01-21",
        "2018-01-22",
        "2018-01-23",
        "2018-01-25",
        "2018-01-26",
        "2018-01-29",
    ];
    for date in dates {
        seed_log(dir.path(), "test_log", date, 1, CONTENT);
    }

    let sink = RollSinkBuilder::new("test_log", dir.path())
        .max_backups(5)
        .next_tick(Duration::from_millis(100))
        .now_fn(frozen_clock("2018-01-30"))
        .build()
        .unwrap();

    (&sink).write(b"foo bar\n").unwrap();

    let should_not_exist = [
        "2018-01-16",
        "2018-01-17",
        "2018-01-18",
        "2018-01-19",
        "2018-01-20",
        "2018-01-21",
    ];
    let trimmed = wait_until(
        || {
            should_not_exist
                .iter()
                .all(|date| !dir.path().join(log_name("test_log", date, 1)).exists())
        },
        Duration::from_secs(3),
    )
    .await;
    assert!(trimmed, "the six oldest backups should be deleted");

    // Today's file does not count against the limit.
    let should_exist = [
        "2018-01-22",
        "2018-01-23",
        "2018-01-25",
        "2018-01-26",
        "2018-01-29",
        "2018-01-30",
    ];
    for date in should_exist {
        assert!(
            dir.path().join(log_name("test_log", date, 1)).exists(),
            "{date} should survive"
        );
    }

    sink.close().unwrap();
}

#[tokio::test]
async fn gzipped_backups_do_not_count_and_are_never_deleted() {
    let dir = TempDir::new().unwrap();
    for date in [
        "2018-01-16",
        "2018-01-18",
        "2018-01-21",
        "2018-01-22",
        "2018-01-23",
        "2018-01-25",
        "2018-01-26",
        "2018-01-29",
    ] {
        seed_log(dir.path(), "test_log", date, 1, CONTENT);
    }
    for date in ["2018-01-17", "2018-01-19", "2018-01-20"] {
        seed_gzipped_log(dir.path(), "test_log", date, 1, "compressed fake - log - content");
    }

    let sink = RollSinkBuilder::new("test_log", dir.path())
        .max_backups(5)
        .next_tick(Duration::from_millis(100))
        .now_fn(frozen_clock("2018-01-30"))
        .build()
        .unwrap();

    let trimmed = wait_until(
        || {
            ["2018-01-16", "2018-01-18", "2018-01-21"]
                .iter()
                .all(|date| !dir.path().join(log_name("test_log", date, 1)).exists())
        },
        Duration::from_secs(3),
    )
    .await;
    assert!(trimmed, "the three oldest plain backups should be deleted");

    for date in ["2018-01-22", "2018-01-23", "2018-01-25", "2018-01-26", "2018-01-29"] {
        assert!(dir.path().join(log_name("test_log", date, 1)).exists());
    }
    for date in ["2018-01-17", "2018-01-19", "2018-01-20"] {
        let gz = dir
            .path()
            .join(format!("{}.gz", log_name("test_log", date, 1)));
        assert!(gz.exists(), "gzipped {date} must be left untouched");
    }

    sink.close().unwrap();
}

#[tokio::test]
async fn todays_file_is_never_a_backup() {
    let dir = TempDir::new().unwrap();
    for date in ["2018-01-22", "2018-01-23", "2018-01-25", "2018-01-26", "2018-01-29"] {
        seed_log(dir.path(), "test_log", date, 1, CONTENT);
    }

    let sink = RollSinkBuilder::new("test_log", dir.path())
        .max_backups(5)
        .next_tick(Duration::from_millis(100))
        .now_fn(frozen_clock("2018-01-30"))
        .build()
        .unwrap();

    (&sink).write(b"foo bar\n").unwrap();

    // Give the policy several cycles to do the wrong thing.
    tokio::time::sleep(Duration::from_millis(400)).await;

    for date in [
        "2018-01-22",
        "2018-01-23",
        "2018-01-25",
        "2018-01-26",
        "2018-01-29",
        "2018-01-30",
    ] {
        assert!(
            dir.path().join(log_name("test_log", date, 1)).exists(),
            "{date} should still exist"
        );
    }

    sink.close().unwrap();
}
