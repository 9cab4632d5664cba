//! End-to-end write-path scenarios

use std::fs;
use std::io::Write;

use rollsink::RollSinkBuilder;
use rollsink_tests::{frozen_clock, log_name, seed_log, SteppingClock};
use tempfile::TempDir;

#[tokio::test]
async fn a_fresh_directory_gets_a_version_one_file() {
    let dir = TempDir::new().unwrap();
    let sink = RollSinkBuilder::new("test_log", dir.path())
        .now_fn(frozen_clock("2020-01-01"))
        .build()
        .unwrap();

    let written = (&sink).write(b"test log").unwrap();
    assert_eq!(written, 8);

    let expected = dir.path().join(log_name("test_log", "2020-01-01", 1));
    assert_eq!(fs::read(&expected).unwrap(), b"test log");
    assert_eq!(fs::metadata(&expected).unwrap().len(), 8);

    sink.close().unwrap();
}

#[tokio::test]
async fn an_existing_file_is_appended_to() {
    let dir = TempDir::new().unwrap();
    let existing = seed_log(dir.path(), "test_log", "2020-01-01", 1, "logEntry\n");

    let sink = RollSinkBuilder::new("test_log", dir.path())
        .now_fn(frozen_clock("2020-01-01"))
        .build()
        .unwrap();

    (&sink).write(b"nextEntry\n").unwrap();
    assert_eq!(fs::read(&existing).unwrap(), b"logEntry\nnextEntry\n");

    sink.close().unwrap();
}

#[tokio::test]
async fn a_write_crossing_the_cap_lands_whole_in_the_next_version() {
    let dir = TempDir::new().unwrap();
    seed_log(dir.path(), "test_log", "2018-01-30", 1, "logEntry\n");

    let sink = RollSinkBuilder::new("test_log", dir.path())
        .max_file_bytes(17)
        .now_fn(frozen_clock("2018-01-30"))
        .build()
        .unwrap();

    let payload = b"next log too big";
    let written = (&sink).write(payload).unwrap();
    assert_eq!(written, payload.len());

    let next = dir.path().join(log_name("test_log", "2018-01-30", 2));
    assert_eq!(fs::read(&next).unwrap(), payload);

    sink.close().unwrap();
}

#[tokio::test]
async fn midnight_moves_writes_to_a_fresh_version_one_file() {
    let dir = TempDir::new().unwrap();
    let clock = SteppingClock::starting_at("2020-01-01");

    let sink = RollSinkBuilder::new("test_log", dir.path())
        .max_file_bytes(8)
        .now_fn(clock.now_fn())
        .build()
        .unwrap();

    // Two full files end the day on version 2.
    (&sink).write(b"12345678").unwrap();
    (&sink).write(b"abcdefgh").unwrap();

    clock.advance_to("2020-01-02");
    (&sink).write(b"newday\n").unwrap();

    let fresh = dir.path().join(log_name("test_log", "2020-01-02", 1));
    assert_eq!(fs::read(&fresh).unwrap(), b"newday\n");
    assert!(dir.path().join(log_name("test_log", "2020-01-01", 2)).exists());

    sink.close().unwrap();
}

#[tokio::test]
async fn writeln_through_the_io_write_facade() {
    let dir = TempDir::new().unwrap();
    let mut sink = RollSinkBuilder::new("test_log", dir.path())
        .now_fn(frozen_clock("2020-01-01"))
        .build()
        .unwrap();

    writeln!(sink, "structured front-ends see a plain byte sink").unwrap();
    sink.flush().unwrap();

    let content = fs::read_to_string(dir.path().join(log_name("test_log", "2020-01-01", 1))).unwrap();
    assert_eq!(content, "structured front-ends see a plain byte sink\n");
}
