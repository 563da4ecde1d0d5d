use chrono::Local;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::competitor::{Competitor, CompetitorSimulator};
use crate::config::Config;
use crate::history::{ResultEntry, ResultsLog};
use crate::pace;
use crate::passage::{self, Lesson, Passage};
use crate::runtime::Clock;
use crate::scorer::{self, Outcome, Score};
use crate::stats::{self, AccuracyWeighting, AggregateStats, SessionResult};
use crate::store::KeyValueStore;
use crate::timer::{TimerKind, TimerToken, Timers};
use crate::{COMPETITOR_TICK_MS, COUNTDOWN_TICK_MS, LIVE_WPM_TICK_MS};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display)]
pub enum Mode {
    Race,
    Lesson,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, strum_macros::Display)]
pub enum Phase {
    Idle,
    LessonSelect,
    Countdown,
    InProgress,
    Complete,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("cannot {action} while {mode} is {phase}")]
    InvalidTransition {
        action: &'static str,
        mode: Mode,
        phase: Phase,
    },
}

/// Everything the presentation layer needs to draw the current session
#[derive(Clone, Debug)]
pub struct SessionState {
    pub mode: Mode,
    pub phase: Phase,
    pub reference: Passage,
    /// Truncated to the reference length.
    pub typed: String,
    /// Characters submitted past the end of the reference. Each one is
    /// already counted in `error_count`.
    pub overflow: usize,
    pub started_at: Option<SystemTime>,
    pub ended_at: Option<SystemTime>,
    pub error_count: usize,
    pub accuracy_percent: u32,
    pub wpm: u32,
    pub is_complete: bool,
    pub countdown: u8,
    pub lesson_id: Option<u32>,
}

impl SessionState {
    pub fn new(mode: Mode, reference: Passage) -> Self {
        Self {
            mode,
            phase: Phase::Idle,
            reference,
            typed: String::new(),
            overflow: 0,
            started_at: None,
            ended_at: None,
            error_count: 0,
            accuracy_percent: 100,
            wpm: 0,
            is_complete: false,
            countdown: 0,
            lesson_id: None,
        }
    }

    pub fn typed_len(&self) -> usize {
        self.typed.chars().count()
    }

    pub fn progress_percent(&self) -> f64 {
        scorer::progress_percent(self.reference.len(), self.typed_len())
    }

    pub fn outcomes(&self) -> Vec<Outcome> {
        scorer::outcomes(self.reference.as_str(), &self.typed)
    }

    pub fn elapsed(&self) -> Duration {
        match (self.started_at, self.ended_at) {
            (Some(start), Some(end)) => end.duration_since(start).unwrap_or_default(),
            _ => Duration::ZERO,
        }
    }
}

/// Drives race and lesson sessions: owns the state machine, the timers, the
/// simulated field and the aggregate statistics.
pub struct SessionController {
    state: SessionState,
    competitors: CompetitorSimulator,
    stats: AggregateStats,
    timers: Timers,
    rng: StdRng,
    clock: Box<dyn Clock>,
    store: Box<dyn KeyValueStore>,
    history: Option<ResultsLog>,
    countdown_secs: u8,
    weighting: AccuracyWeighting,
}

impl SessionController {
    pub fn new(config: &Config, clock: Box<dyn Clock>, store: Box<dyn KeyValueStore>) -> Self {
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let stats = AggregateStats::from_record(&stats::load_record(store.as_ref()));
        let reference = passage::pick_random_passage(&mut rng);

        Self {
            state: SessionState::new(Mode::Race, reference),
            competitors: CompetitorSimulator::new(config.competitors.iter().cloned()),
            stats,
            timers: Timers::new(),
            rng,
            clock,
            store,
            history: None,
            countdown_secs: config.countdown_secs,
            weighting: config.accuracy_weighting,
        }
    }

    pub fn with_history(mut self, history: ResultsLog) -> Self {
        self.history = Some(history);
        self
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn competitors(&self) -> &[Competitor] {
        self.competitors.competitors()
    }

    pub fn stats(&self) -> &AggregateStats {
        &self.stats
    }

    pub fn store(&self) -> &dyn KeyValueStore {
        self.store.as_ref()
    }

    pub fn history(&self) -> Option<&ResultsLog> {
        self.history.as_ref()
    }

    pub fn timers(&self) -> &Timers {
        &self.timers
    }

    pub fn lesson(&self) -> Option<&'static Lesson> {
        self.state.lesson_id.and_then(passage::lesson)
    }

    pub fn is_racing(&self) -> bool {
        self.state.mode == Mode::Race && self.state.phase == Phase::InProgress
    }

    fn reject(&self, action: &'static str) -> SessionError {
        SessionError::InvalidTransition {
            action,
            mode: self.state.mode,
            phase: self.state.phase,
        }
    }

    /// Resets race state, draws a new passage and starts the countdown.
    pub fn start_race(&mut self) {
        let now = self.clock.now();
        self.timers.cancel_all();

        let reference = passage::pick_random_passage(&mut self.rng);
        self.state = SessionState::new(Mode::Race, reference);
        self.competitors.reset();

        info!(chars = self.state.reference.len(), "race starting");
        if self.countdown_secs == 0 {
            self.begin_race(now);
        } else {
            self.state.phase = Phase::Countdown;
            self.state.countdown = self.countdown_secs;
            self.timers.schedule(
                TimerKind::Countdown,
                Duration::from_millis(COUNTDOWN_TICK_MS),
                now,
            );
        }
    }

    /// "Race again" from the results screen.
    pub fn restart(&mut self) -> Result<(), SessionError> {
        if self.state.mode != Mode::Race || self.state.phase != Phase::Complete {
            return Err(self.reject("restart"));
        }
        self.start_race();
        Ok(())
    }

    fn begin_race(&mut self, now: SystemTime) {
        self.state.phase = Phase::InProgress;
        self.state.countdown = 0;
        self.state.started_at = Some(now);
        self.timers.schedule(
            TimerKind::Competitors,
            Duration::from_millis(COMPETITOR_TICK_MS),
            now,
        );
        self.timers.schedule(
            TimerKind::LiveWpm,
            Duration::from_millis(LIVE_WPM_TICK_MS),
            now,
        );
        debug!("race in progress");
    }

    pub fn start_lesson(&mut self, lesson_id: u32) {
        let now = self.clock.now();
        self.timers.cancel_all();

        self.state = SessionState::new(Mode::Lesson, passage::passage_for_lesson(lesson_id));
        self.state.lesson_id = Some(lesson_id);
        self.state.phase = Phase::InProgress;
        self.state.started_at = Some(now);
        info!(lesson_id, "lesson started");
    }

    /// `None` returns to the lesson list.
    pub fn select_lesson(&mut self, lesson_id: Option<u32>) {
        match lesson_id {
            Some(id) => self.start_lesson(id),
            None => self.open_lessons(),
        }
    }

    fn open_lessons(&mut self) {
        self.timers.cancel_all();
        let reference = self.state.reference.clone();
        self.state = SessionState::new(Mode::Lesson, reference);
        self.state.phase = Phase::LessonSelect;
    }

    /// Same lesson again with the input cleared.
    pub fn retry(&mut self) -> Result<(), SessionError> {
        if self.state.mode != Mode::Lesson || self.state.phase != Phase::Complete {
            return Err(self.reject("retry"));
        }
        let lesson_id = self.state.lesson_id;
        let reference = self.state.reference.clone();
        self.state = SessionState::new(Mode::Lesson, reference);
        self.state.lesson_id = lesson_id;
        self.state.phase = Phase::InProgress;
        self.state.started_at = Some(self.clock.now());
        Ok(())
    }

    pub fn next_lesson(&mut self) -> Result<(), SessionError> {
        if self.state.mode != Mode::Lesson || self.state.phase != Phase::Complete {
            return Err(self.reject("pick the next lesson"));
        }
        self.open_lessons();
        Ok(())
    }

    /// Navigating away: every timer stops and the session goes idle.
    pub fn leave(&mut self) {
        self.timers.cancel_all();
        let reference = self.state.reference.clone();
        self.state = SessionState::new(self.state.mode, reference);
    }

    /// Replaces the typed text. Only accepted while a session is in progress.
    pub fn submit_input(&mut self, text: &str) -> Result<Score, SessionError> {
        if self.state.phase != Phase::InProgress {
            return Err(self.reject("accept input"));
        }
        let now = self.clock.now();
        let score = scorer::score(self.state.reference.as_str(), text);

        let limit = self.state.reference.len();
        self.state.typed = text.chars().take(limit).collect();
        self.state.overflow = text.chars().count().saturating_sub(limit);
        self.state.error_count = score.error_count;
        self.state.accuracy_percent = score.accuracy_percent;

        if self.state.mode == Mode::Race {
            if let Some(wpm) = self
                .state
                .started_at
                .and_then(|start| pace::live_wpm(&self.state.typed, start, now))
            {
                self.state.wpm = wpm;
            }
        }

        if score.is_complete {
            self.complete(now);
        }
        Ok(score)
    }

    fn complete(&mut self, now: SystemTime) {
        self.timers.cancel_all();
        self.state.ended_at = Some(now);
        self.state.is_complete = true;
        self.state.phase = Phase::Complete;

        let reference = self.state.reference.as_str();
        self.state.wpm = match self.state.mode {
            Mode::Race => self
                .state
                .started_at
                .and_then(|start| pace::final_wpm(reference, start, now))
                .unwrap_or(self.state.wpm),
            Mode::Lesson => pace::lesson_wpm(reference),
        };

        let result = SessionResult {
            wpm: self.state.wpm,
            accuracy_percent: self.state.accuracy_percent,
            kind: self.state.mode,
        };
        self.stats = stats::fold(&self.stats, &result, self.weighting);
        info!(
            mode = %result.kind,
            wpm = result.wpm,
            accuracy = result.accuracy_percent,
            errors = self.state.error_count,
            "session complete"
        );

        if result.kind == Mode::Race {
            if let Err(e) = stats::record_race(
                self.store.as_mut(),
                result.wpm,
                result.accuracy_percent,
                &self.stats,
            ) {
                warn!(error = %e, "could not persist stats record");
            }
        }

        if let Some(history) = &self.history {
            let entry = ResultEntry {
                date: Local::now(),
                mode: result.kind,
                passage_chars: self.state.reference.len(),
                elapsed_secs: self.state.elapsed().as_secs_f64(),
                wpm: result.wpm,
                accuracy: result.accuracy_percent,
                errors: self.state.error_count,
            };
            if let Err(e) = history.append(&entry) {
                warn!(path = %history.path().display(), error = %e, "could not append results log");
            }
        }
    }

    /// Ticks that are due now, without firing them.
    pub fn due_ticks(&mut self) -> Vec<TimerToken> {
        let now = self.clock.now();
        self.timers.due(now)
    }

    /// Fires every due tick. Returns whether anything fired.
    pub fn poll(&mut self) -> bool {
        let ticks = self.due_ticks();
        for &token in &ticks {
            self.fire(token);
        }
        !ticks.is_empty()
    }

    /// Applies one timer tick. Stale tokens are ignored.
    pub fn fire(&mut self, token: TimerToken) {
        if !self.timers.is_live(token) {
            debug!(timer = %token.kind, "stale tick ignored");
            return;
        }
        let now = self.clock.now();
        match token.kind {
            TimerKind::Countdown => self.on_countdown_tick(now),
            TimerKind::Competitors => self.on_competitor_tick(now),
            TimerKind::LiveWpm => self.on_live_wpm_tick(now),
        }
    }

    fn on_countdown_tick(&mut self, now: SystemTime) {
        if self.state.phase != Phase::Countdown {
            return;
        }
        if self.state.countdown <= 1 {
            self.timers.cancel(TimerKind::Countdown);
            self.begin_race(now);
        } else {
            self.state.countdown -= 1;
        }
    }

    fn on_competitor_tick(&mut self, now: SystemTime) {
        if !self.is_racing() {
            return;
        }
        if let Some(start) = self.state.started_at {
            self.competitors
                .tick(&mut self.rng, self.state.reference.as_str(), start, now);
        }
    }

    fn on_live_wpm_tick(&mut self, now: SystemTime) {
        if !self.is_racing() {
            return;
        }
        if let Some(wpm) = self
            .state
            .started_at
            .and_then(|start| pace::live_wpm(&self.state.typed, start, now))
        {
            self.state.wpm = wpm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::ManualClock;
    use crate::store::MemoryStore;
    use assert_matches::assert_matches;

    fn controller(clock: &ManualClock) -> SessionController {
        let config = Config {
            seed: Some(5),
            ..Config::default()
        };
        SessionController::new(&config, Box::new(clock.clone()), Box::new(MemoryStore::new()))
    }

    fn run_countdown(ctl: &mut SessionController, clock: &ManualClock) {
        for _ in 0..3 {
            clock.advance(Duration::from_millis(1000));
            ctl.poll();
        }
    }

    #[test]
    fn starts_idle() {
        let clock = ManualClock::new();
        let ctl = controller(&clock);
        assert_eq!(ctl.state().phase, Phase::Idle);
        assert_eq!(ctl.stats(), &AggregateStats::default());
    }

    #[test]
    fn countdown_runs_three_two_one() {
        let clock = ManualClock::new();
        let mut ctl = controller(&clock);
        ctl.start_race();
        assert_eq!(ctl.state().phase, Phase::Countdown);
        assert_eq!(ctl.state().countdown, 3);

        clock.advance(Duration::from_millis(1000));
        ctl.poll();
        assert_eq!(ctl.state().countdown, 2);

        clock.advance(Duration::from_millis(1000));
        ctl.poll();
        assert_eq!(ctl.state().countdown, 1);

        clock.advance(Duration::from_millis(1000));
        ctl.poll();
        assert_eq!(ctl.state().countdown, 0);
        assert_eq!(ctl.state().phase, Phase::InProgress);
        assert_eq!(ctl.state().started_at, Some(clock.now()));
        assert!(!ctl.timers().is_active(TimerKind::Countdown));
        assert!(ctl.timers().is_active(TimerKind::Competitors));
        assert!(ctl.timers().is_active(TimerKind::LiveWpm));
    }

    #[test]
    fn input_rejected_during_countdown() {
        let clock = ManualClock::new();
        let mut ctl = controller(&clock);
        ctl.start_race();
        assert_matches!(
            ctl.submit_input("T"),
            Err(SessionError::InvalidTransition {
                phase: Phase::Countdown,
                ..
            })
        );
        assert!(ctl.state().typed.is_empty());
    }

    #[test]
    fn race_completes_with_reference_wpm() {
        let clock = ManualClock::new();
        let mut ctl = controller(&clock);
        ctl.start_race();
        run_countdown(&mut ctl, &clock);

        let reference = ctl.state().reference.as_str().to_string();
        let words = pace::word_count(&reference) as u32;
        clock.advance(Duration::from_secs(60));

        let score = ctl.submit_input(&reference).unwrap();
        assert!(score.is_complete);
        assert_eq!(ctl.state().phase, Phase::Complete);
        assert_eq!(ctl.state().wpm, words);
        assert_eq!(ctl.state().accuracy_percent, 100);
        assert_eq!(ctl.stats().total_races, 1);
        assert_eq!(ctl.stats().best_wpm, words);

        let record = stats::load_record(ctl.store());
        assert_eq!(record.races, 1);
        assert_eq!(record.last_wpm, words);
    }

    #[test]
    fn input_after_completion_is_rejected() {
        let clock = ManualClock::new();
        let mut ctl = controller(&clock);
        ctl.start_race();
        run_countdown(&mut ctl, &clock);
        let reference = ctl.state().reference.as_str().to_string();
        clock.advance(Duration::from_secs(30));
        ctl.submit_input(&reference).unwrap();

        assert!(ctl.submit_input("x").is_err());
        assert_eq!(ctl.state().typed, reference);
    }

    #[test]
    fn typed_text_is_clamped_to_reference() {
        let clock = ManualClock::new();
        let mut ctl = controller(&clock);
        ctl.start_lesson(3);
        let mut long = ctl.state().reference.as_str().to_string();
        long.push_str("zz");
        let score = ctl.submit_input(&long).unwrap();
        assert_eq!(score.error_count, 2);
        assert_eq!(ctl.state().typed_len(), ctl.state().reference.len());
        assert!(ctl.state().is_complete);
    }

    #[test]
    fn overflow_accounts_for_errors_outside_the_reference() {
        let clock = ManualClock::new();
        let mut ctl = controller(&clock);
        ctl.start_lesson(3);
        let mut long = ctl.state().reference.as_str().to_string();
        long.push_str("zz");
        ctl.submit_input(&long).unwrap();

        let state = ctl.state();
        let shown = state
            .outcomes()
            .iter()
            .filter(|o| **o == Outcome::Incorrect)
            .count();
        assert_eq!(shown, 0);
        assert_eq!(state.overflow, 2);
        assert_eq!(state.error_count, shown + state.overflow);
    }

    #[test]
    fn stale_ticks_after_completion_are_ignored() {
        let clock = ManualClock::new();
        let mut ctl = controller(&clock);
        ctl.start_race();
        run_countdown(&mut ctl, &clock);

        clock.advance(Duration::from_millis(2000));
        let pending = ctl.due_ticks();
        assert!(pending.iter().any(|t| t.kind == TimerKind::Competitors));
        assert!(pending.iter().any(|t| t.kind == TimerKind::LiveWpm));

        let reference = ctl.state().reference.as_str().to_string();
        ctl.submit_input(&reference).unwrap();
        let competitors = ctl.competitors().to_vec();
        let wpm = ctl.state().wpm;

        for token in pending {
            ctl.fire(token);
        }
        clock.advance(Duration::from_secs(5));
        assert!(!ctl.poll());
        assert_eq!(ctl.competitors(), competitors.as_slice());
        assert_eq!(ctl.state().wpm, wpm);
    }

    #[test]
    fn restarting_during_countdown_does_not_double_tick() {
        let clock = ManualClock::new();
        let mut ctl = controller(&clock);
        ctl.start_race();
        clock.advance(Duration::from_millis(600));
        ctl.start_race();
        clock.advance(Duration::from_millis(600));
        ctl.poll();
        // the first countdown would have ticked at 1000ms
        assert_eq!(ctl.state().countdown, 3);
        clock.advance(Duration::from_millis(400));
        ctl.poll();
        assert_eq!(ctl.state().countdown, 2);
    }

    #[test]
    fn competitors_advance_only_while_racing() {
        let clock = ManualClock::new();
        let mut ctl = controller(&clock);
        ctl.start_race();
        clock.advance(Duration::from_millis(900));
        ctl.poll();
        assert!(ctl.competitors().iter().all(|c| c.progress_percent == 0.0));

        run_countdown(&mut ctl, &clock);
        clock.advance(Duration::from_millis(1000));
        ctl.poll();
        assert!(ctl.competitors().iter().all(|c| c.progress_percent > 0.0));
    }

    #[test]
    fn live_wpm_tick_uses_typed_words() {
        let clock = ManualClock::new();
        let mut ctl = controller(&clock);
        ctl.start_race();
        run_countdown(&mut ctl, &clock);
        let prefix: String = ctl.state().reference.as_str().chars().take(1).collect();
        ctl.submit_input(&prefix).unwrap();

        // 30s: one word over half a minute
        clock.advance(Duration::from_secs(30));
        ctl.poll();
        assert_eq!(ctl.state().wpm, 2);
    }

    #[test]
    fn restart_only_from_completed_race() {
        let clock = ManualClock::new();
        let mut ctl = controller(&clock);
        assert!(ctl.restart().is_err());
        ctl.start_race();
        run_countdown(&mut ctl, &clock);
        clock.advance(Duration::from_secs(10));
        let reference = ctl.state().reference.as_str().to_string();
        ctl.submit_input(&reference).unwrap();

        ctl.restart().unwrap();
        assert_eq!(ctl.state().phase, Phase::Countdown);
        assert!(ctl.state().typed.is_empty());
        assert_eq!(ctl.state().wpm, 0);
        assert!(ctl.competitors().iter().all(|c| c.progress_percent == 0.0));
    }

    #[test]
    fn lesson_flow() {
        let clock = ManualClock::new();
        let mut ctl = controller(&clock);
        ctl.select_lesson(None);
        assert_eq!(ctl.state().phase, Phase::LessonSelect);

        ctl.select_lesson(Some(2));
        assert_eq!(ctl.state().phase, Phase::InProgress);
        assert_eq!(ctl.lesson().map(|l| l.id), Some(2));
        assert!(!ctl.timers().is_active(TimerKind::Countdown));
        assert!(!ctl.timers().is_active(TimerKind::Competitors));
        assert!(!ctl.timers().is_active(TimerKind::LiveWpm));

        let reference = ctl.state().reference.as_str().to_string();
        ctl.submit_input(&reference[..5]).unwrap();
        assert_eq!(ctl.state().phase, Phase::InProgress);

        clock.advance(Duration::from_secs(600));
        ctl.submit_input(&reference).unwrap();
        assert_eq!(ctl.state().phase, Phase::Complete);
        assert_eq!(ctl.state().wpm, pace::lesson_wpm(&reference));
        assert_eq!(ctl.stats().total_lessons, 1);
        assert_eq!(ctl.stats().total_races, 0);
        // lessons do not touch the durable record
        assert_eq!(stats::load_record(ctl.store()).races, 0);

        ctl.retry().unwrap();
        assert_eq!(ctl.state().phase, Phase::InProgress);
        assert!(ctl.state().typed.is_empty());
        assert_eq!(ctl.state().reference.as_str(), reference);

        ctl.submit_input(&reference).unwrap();
        ctl.next_lesson().unwrap();
        assert_eq!(ctl.state().phase, Phase::LessonSelect);
        assert!(ctl.lesson().is_none());
    }

    #[test]
    fn retry_requires_completed_lesson() {
        let clock = ManualClock::new();
        let mut ctl = controller(&clock);
        ctl.start_lesson(1);
        assert_matches!(ctl.retry(), Err(SessionError::InvalidTransition { .. }));
        assert!(ctl.next_lesson().is_err());
    }

    #[test]
    fn leave_cancels_timers() {
        let clock = ManualClock::new();
        let mut ctl = controller(&clock);
        ctl.start_race();
        run_countdown(&mut ctl, &clock);
        ctl.leave();
        assert_eq!(ctl.state().phase, Phase::Idle);
        clock.advance(Duration::from_secs(5));
        assert!(!ctl.poll());
        assert!(ctl.competitors().iter().all(|c| c.progress_percent == 0.0));
    }

    #[test]
    fn zero_countdown_starts_immediately() {
        let clock = ManualClock::new();
        let config = Config {
            countdown_secs: 0,
            seed: Some(1),
            ..Config::default()
        };
        let mut ctl =
            SessionController::new(&config, Box::new(clock.clone()), Box::new(MemoryStore::new()));
        ctl.start_race();
        assert_eq!(ctl.state().phase, Phase::InProgress);
    }
}
