//! End-to-end tests: synthetic source -> normalizer -> log file.

use chrono::Utc;
use inputlog::collector::{
    CollectorConfig, InputEvent, InputSource, KeyName, MouseButton, RawKey, SyntheticCollector,
};
use inputlog::core::{
    run_pipeline, EventKind, FieldValue, KeyboardNormalizer, LogError, LogRecord, LogWriter,
    ManualClock, MouseNormalizer, MouseSettings, PipelineKind,
};
use inputlog::transparency::CaptureStats;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

fn read_lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

fn read_records(path: &Path) -> Vec<LogRecord> {
    read_lines(path)
        .iter()
        .map(|line| LogRecord::from_line(line).unwrap())
        .collect()
}

#[test]
fn test_key_down_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("log.txt");

    let writer = LogWriter::initialize(&path).unwrap();
    assert_eq!(std::fs::metadata(&path).unwrap().len(), 0);

    let mut keyboard = KeyboardNormalizer::new(writer);
    let before = Utc::now().timestamp_millis();
    keyboard.on_key_down(&RawKey::Char('a')).unwrap();
    let after = Utc::now().timestamp_millis();

    let lines = read_lines(&path);
    assert_eq!(lines.len(), 1);

    let record = LogRecord::from_line(&lines[0]).unwrap();
    assert!(record.timestamp >= before && record.timestamp <= after);
    assert_eq!(
        lines[0],
        format!(
            "{{\"timestamp\": {}, \"event\": \"KEY_PRESS\", \"key\": \"a\"}}",
            record.timestamp
        )
    );
}

#[test]
fn test_appends_leave_prior_lines_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("log.txt");
    let mut keyboard = KeyboardNormalizer::new(LogWriter::initialize(&path).unwrap());

    let keys = [
        RawKey::Char('h'),
        RawKey::Named(KeyName::Shift),
        RawKey::Code(999),
        RawKey::Named(KeyName::Enter),
    ];

    let mut previous = Vec::new();
    for key in &keys {
        keyboard.on_key_down(key).unwrap();
        let content = std::fs::read(&path).unwrap();
        assert!(content.starts_with(&previous));
        assert_eq!(content.iter().filter(|&&b| b == b'\n').count(), previous_lines(&previous) + 1);
        assert_eq!(content.last(), Some(&b'\n'));
        previous = content;
    }

    // Re-initializing an existing file keeps its content
    LogWriter::initialize(&path).unwrap();
    assert_eq!(std::fs::read(&path).unwrap(), previous);
}

fn previous_lines(content: &[u8]) -> usize {
    content.iter().filter(|&&b| b == b'\n').count()
}

#[test]
fn test_immediate_second_move_is_dropped() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mouse.txt");
    let mut mouse = MouseNormalizer::new(
        LogWriter::initialize(&path).unwrap(),
        MouseSettings::default(),
    );

    mouse.on_move(10, 10).unwrap();
    mouse.on_move(11, 11).unwrap();

    let records = read_records(&path);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].fields.get("x"), Some(&FieldValue::Int(10)));
}

#[test]
fn test_click_release_pair() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mouse.txt");
    let mut mouse = MouseNormalizer::new(
        LogWriter::initialize(&path).unwrap(),
        MouseSettings::default(),
    );

    mouse.on_button(5, 5, MouseButton::Left, true).unwrap();
    mouse.on_button(5, 5, MouseButton::Left, false).unwrap();

    let records = read_records(&path);
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].event, EventKind::MouseClick);
    assert_eq!(records[1].event, EventKind::MouseRelease);
    for key in ["x", "y", "button"] {
        assert_eq!(records[0].fields.get(key), records[1].fields.get(key));
    }
}

#[test]
fn test_removed_directory_surfaces_error_without_partial_line() {
    let dir = tempfile::tempdir().unwrap();
    let log_dir = dir.path().join("logs");
    std::fs::create_dir(&log_dir).unwrap();
    let path = log_dir.join("mouse.txt");

    let mut mouse = MouseNormalizer::new(
        LogWriter::initialize(&path).unwrap(),
        MouseSettings::default(),
    );
    mouse.on_scroll(0, 0, 0, 1).unwrap();

    std::fs::remove_dir_all(&log_dir).unwrap();

    let err = mouse.on_scroll(0, 0, 0, -1).unwrap_err();
    assert!(matches!(err, LogError::Open { .. }));
    assert!(!path.exists());
    assert_eq!(mouse.writer().records_written(), 1);
}

#[test]
fn test_synthetic_keyboard_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("keys.txt");

    let mut collector = SyntheticCollector::new(CollectorConfig::keyboard());
    collector.start().unwrap();
    let injector = collector.injector().unwrap();

    let producer = thread::spawn(move || {
        injector.send(InputEvent::KeyDown(RawKey::Char('o')));
        injector.send(InputEvent::Move { x: 3, y: 4 });
        injector.send(InputEvent::KeyUp(RawKey::Char('o')));
        injector.send(InputEvent::KeyDown(RawKey::Named(KeyName::Esc)));
    });
    producer.join().unwrap();
    collector.stop();

    let mut keyboard = KeyboardNormalizer::new(LogWriter::initialize(&path).unwrap());
    let stats = CaptureStats::new(PipelineKind::Keyboard);
    let running = AtomicBool::new(true);
    run_pipeline(&mut keyboard, collector.receiver(), &running, &stats).unwrap();

    let records = read_records(&path);
    let events: Vec<_> = records.iter().map(|r| r.event).collect();
    assert_eq!(
        events,
        [EventKind::KeyPress, EventKind::KeyRelease, EventKind::KeyPress]
    );
    assert_eq!(
        records[2].fields.get("key"),
        Some(&FieldValue::from("Key.esc"))
    );
    // The move never reached a keyboard-only source
    assert_eq!(stats.stats().events_ignored, 0);
}

#[test]
fn test_mouse_pipeline_on_listener_thread() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mouse.txt");

    let mut collector = SyntheticCollector::new(CollectorConfig::mouse());
    collector.start().unwrap();
    let injector = collector.injector().unwrap();

    let clock = ManualClock::from_millis(1_716_213_045_000);
    let mouse = MouseNormalizer::with_clock(
        LogWriter::initialize(&path).unwrap(),
        MouseSettings::default(),
        clock.clone(),
    );

    let running = Arc::new(AtomicBool::new(true));
    let receiver = collector.receiver().clone();
    let pipeline_running = running.clone();
    let pipeline = thread::spawn(move || {
        let mut mouse = mouse;
        let stats = CaptureStats::new(PipelineKind::Mouse);
        let result = run_pipeline(&mut mouse, &receiver, &pipeline_running, &stats);
        (result, stats.stats())
    });

    injector.send(InputEvent::Move { x: 1, y: 1 });
    injector.send(InputEvent::Move { x: 2, y: 2 });
    injector.send(InputEvent::Button {
        x: 2,
        y: 2,
        button: MouseButton::Right,
        pressed: true,
    });
    injector.send(InputEvent::Scroll {
        x: 2,
        y: 2,
        dx: 0,
        dy: -1,
    });

    // Close the channel so the pipeline drains and returns
    drop(injector);
    collector.stop();
    drop(collector);

    let (result, stats) = pipeline.join().unwrap();
    result.unwrap();
    running.store(false, Ordering::SeqCst);

    assert_eq!(stats.records_written, 3);
    assert_eq!(stats.moves_suppressed, 1);

    let records = read_records(&path);
    let events: Vec<_> = records.iter().map(|r| r.event).collect();
    assert_eq!(
        events,
        [
            EventKind::MouseMove,
            EventKind::MouseClick,
            EventKind::MouseScroll
        ]
    );
    assert!(records.iter().all(|r| r.timestamp == 1_716_213_045_000));
}
