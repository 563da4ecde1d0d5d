use std::time::Duration;

use assert_matches::assert_matches;
use tempfile::tempdir;

use swiftkeys::config::Config;
use swiftkeys::history::ResultsLog;
use swiftkeys::runtime::ManualClock;
use swiftkeys::stats::{self, AccuracyWeighting};
use swiftkeys::store::{FileStore, KeyValueStore};
use swiftkeys::timer::TimerKind;
use swiftkeys::{Mode, Phase, SessionController, SessionError, STATS_KEY};

fn config() -> Config {
    Config {
        countdown_secs: 0,
        seed: Some(7),
        ..Config::default()
    }
}

/// Finishes the current race after `secs` seconds of typing.
fn run_race(ctl: &mut SessionController, clock: &ManualClock, secs: u64) {
    if ctl.state().phase == Phase::Complete {
        ctl.restart().unwrap();
    } else {
        ctl.start_race();
    }
    assert!(ctl.is_racing());
    clock.advance(Duration::from_secs(secs));
    let reference = ctl.state().reference.as_str().to_string();
    ctl.submit_input(&reference).unwrap();
    assert_eq!(ctl.state().phase, Phase::Complete);
}

#[test]
fn races_persist_to_file_store_and_results_log() {
    let dir = tempdir().unwrap();
    let store_path = dir.path().join("store.json");
    let log = ResultsLog::with_path(dir.path().join("results.csv"));
    let clock = ManualClock::new();

    let mut ctl = SessionController::new(
        &config(),
        Box::new(clock.clone()),
        Box::new(FileStore::with_path(&store_path)),
    )
    .with_history(log.clone());

    let mut best = 0;
    for secs in [60, 30, 45] {
        run_race(&mut ctl, &clock, secs);
        best = best.max(ctl.state().wpm);
    }

    let record = stats::load_record(&FileStore::with_path(&store_path));
    assert_eq!(record.races, 3);
    assert_eq!(record.best_wpm, best);
    assert_eq!(record.last_wpm, ctl.state().wpm);
    assert_eq!(record.last_accuracy, 100);

    let rows = log.recent(10).unwrap();
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(|r| r.mode == Mode::Race && r.errors == 0));

    // A fresh controller picks the record back up
    let reopened = SessionController::new(
        &config(),
        Box::new(clock.clone()),
        Box::new(FileStore::with_path(&store_path)),
    );
    assert_eq!(reopened.stats().total_races, 3);
    assert_eq!(reopened.stats().best_wpm, best);
}

#[test]
fn recent_progress_keeps_last_nine_races() {
    let dir = tempdir().unwrap();
    let clock = ManualClock::new();
    let mut ctl = SessionController::new(
        &config(),
        Box::new(clock.clone()),
        Box::new(FileStore::with_path(dir.path().join("store.json"))),
    );

    let mut wpms = Vec::new();
    for i in 0..10 {
        run_race(&mut ctl, &clock, 20 + i * 5);
        wpms.push(ctl.state().wpm);
    }

    let stats = ctl.stats();
    assert_eq!(stats.total_races, 10);
    assert_eq!(stats.recent_progress.len(), 9);
    assert_eq!(
        stats.recent_progress.iter().copied().collect::<Vec<_>>(),
        wpms[1..].to_vec()
    );
    assert_eq!(stats.best_wpm, *wpms.iter().max().unwrap());
}

#[test]
fn unknown_record_keys_survive_a_race() {
    let dir = tempdir().unwrap();
    let store_path = dir.path().join("store.json");
    let mut store = FileStore::with_path(&store_path);
    store
        .set(STATS_KEY, r#"{"races":4,"bestWPM":70,"theme":"dark"}"#.to_string())
        .unwrap();

    let clock = ManualClock::new();
    let mut ctl = SessionController::new(&config(), Box::new(clock.clone()), Box::new(store));
    run_race(&mut ctl, &clock, 600);

    let raw = FileStore::with_path(&store_path).get(STATS_KEY).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(value["races"], 5);
    assert_eq!(value["bestWPM"], 70);
    assert_eq!(value["theme"], "dark");
}

#[test]
fn stale_ticks_after_leaving_are_ignored() {
    let clock = ManualClock::new();
    let mut ctl = SessionController::new(
        &config(),
        Box::new(clock.clone()),
        Box::new(swiftkeys::store::MemoryStore::new()),
    );
    ctl.start_race();
    clock.advance(Duration::from_millis(1000));
    let ticks = ctl.due_ticks();
    assert!(ticks.iter().any(|t| t.kind == TimerKind::Competitors));

    ctl.leave();
    for token in ticks {
        ctl.fire(token);
    }
    assert_eq!(ctl.state().phase, Phase::Idle);
    assert!(ctl.competitors().iter().all(|c| c.progress_percent == 0.0));
    assert!(!ctl.poll());
}

#[test]
fn lesson_accuracy_weighting_is_configurable() {
    let clock = ManualClock::new();
    let mut by_lessons = SessionController::new(
        &Config {
            accuracy_weighting: AccuracyWeighting::Lessons,
            ..config()
        },
        Box::new(clock.clone()),
        Box::new(swiftkeys::store::MemoryStore::new()),
    );

    by_lessons.select_lesson(Some(2));
    let reference = by_lessons.state().reference.as_str().to_string();
    // One wrong char at the front of the lesson
    let mut typed: String = reference.chars().collect();
    typed.replace_range(0..1, "#");
    by_lessons.submit_input(&typed).unwrap();
    let first = by_lessons.state().accuracy_percent;
    assert!(first < 100);
    assert_eq!(by_lessons.stats().average_accuracy, first);

    by_lessons.retry().unwrap();
    by_lessons.submit_input(&reference).unwrap();
    assert_eq!(
        by_lessons.stats().average_accuracy,
        ((first as f64 + 100.0) / 2.0).round() as u32
    );
}

#[test]
fn out_of_phase_actions_are_rejected() {
    let clock = ManualClock::new();
    let mut ctl = SessionController::new(
        &config(),
        Box::new(clock),
        Box::new(swiftkeys::store::MemoryStore::new()),
    );
    assert_matches!(
        ctl.submit_input("abc"),
        Err(SessionError::InvalidTransition { phase: Phase::Idle, .. })
    );
    assert_matches!(ctl.restart(), Err(SessionError::InvalidTransition { .. }));
    assert_matches!(ctl.retry(), Err(SessionError::InvalidTransition { .. }));
}

#[test]
fn running_average_survives_reopening_the_store() {
    let dir = tempdir().unwrap();
    let store_path = dir.path().join("store.json");
    let clock = ManualClock::new();

    let mut ctl = SessionController::new(
        &config(),
        Box::new(clock.clone()),
        Box::new(FileStore::with_path(&store_path)),
    );
    for secs in [120, 120, 120, 120, 15] {
        run_race(&mut ctl, &clock, secs);
    }
    let before = ctl.stats().clone();
    assert_ne!(before.average_wpm, ctl.state().wpm);

    let reopened = SessionController::new(
        &config(),
        Box::new(clock.clone()),
        Box::new(FileStore::with_path(&store_path)),
    );
    let after = reopened.stats();
    assert_eq!(after.average_wpm, before.average_wpm);
    assert_eq!(after.average_accuracy, before.average_accuracy);
    assert_eq!(after.best_wpm, before.best_wpm);
    assert_eq!(after.total_races, 5);
}
