use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{debug, warn};

use crate::error::Result;
use crate::session::Mode;
use crate::store::KeyValueStore;
use crate::{RECENT_PROGRESS_CAPACITY, STATS_KEY};

/// Which counter weights the running lesson accuracy.
///
/// `Races` reproduces the long-standing dashboard numbers, where the lesson
/// accuracy average is weighted by the number of races.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccuracyWeighting {
    #[default]
    Races,
    Lessons,
}

/// Outcome of one finished session, as fed into [`fold`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionResult {
    pub wpm: u32,
    pub accuracy_percent: u32,
    pub kind: Mode,
}

/// Lifetime and recent-window summary shown on the stats dashboard
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateStats {
    pub average_wpm: u32,
    pub best_wpm: u32,
    pub total_races: u32,
    pub total_lessons: u32,
    pub average_accuracy: u32,
    pub recent_progress: VecDeque<u32>,
}

impl AggregateStats {
    /// Seeds the dashboard from what survived in the durable record.
    pub fn from_record(record: &StatsRecord) -> Self {
        let mut recent_progress = VecDeque::with_capacity(RECENT_PROGRESS_CAPACITY);
        if record.races > 0 {
            recent_progress.push_back(record.last_wpm);
        }
        Self {
            average_wpm: record.average_wpm.unwrap_or(record.last_wpm),
            best_wpm: record.best_wpm,
            total_races: record.races,
            total_lessons: 0,
            average_accuracy: record.average_accuracy.unwrap_or(record.last_accuracy),
            recent_progress,
        }
    }
}

fn running_average(average: u32, count: u32, value: u32) -> u32 {
    let total = average as f64 * count as f64 + value as f64;
    (total / (count as f64 + 1.0)).round() as u32
}

/// Folds a finished session into the aggregate.
pub fn fold(
    prior: &AggregateStats,
    result: &SessionResult,
    weighting: AccuracyWeighting,
) -> AggregateStats {
    let mut next = prior.clone();
    match result.kind {
        Mode::Race => {
            next.average_wpm = running_average(prior.average_wpm, prior.total_races, result.wpm);
            next.total_races = prior.total_races + 1;
            next.best_wpm = prior.best_wpm.max(result.wpm);
            next.recent_progress.push_back(result.wpm);
            while next.recent_progress.len() > RECENT_PROGRESS_CAPACITY {
                next.recent_progress.pop_front();
            }
        }
        Mode::Lesson => {
            let weight = match weighting {
                AccuracyWeighting::Races => prior.total_races,
                AccuracyWeighting::Lessons => prior.total_lessons,
            };
            next.average_accuracy =
                running_average(prior.average_accuracy, weight, result.accuracy_percent);
            next.total_lessons = prior.total_lessons + 1;
        }
    }
    next
}

/// Durable mirror of race results, stored as JSON under [`STATS_KEY`].
///
/// Keys this version does not know about are carried through unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsRecord {
    pub races: u32,
    #[serde(rename = "bestWPM")]
    pub best_wpm: u32,
    #[serde(rename = "lastWPM")]
    pub last_wpm: u32,
    #[serde(rename = "lastAccuracy")]
    pub last_accuracy: u32,
    /// Running averages as of the last race. Older records lack them.
    #[serde(rename = "averageWPM", skip_serializing_if = "Option::is_none")]
    pub average_wpm: Option<u32>,
    #[serde(rename = "averageAccuracy", skip_serializing_if = "Option::is_none")]
    pub average_accuracy: Option<u32>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Missing or unreadable content yields an empty record.
pub fn load_record(store: &dyn KeyValueStore) -> StatsRecord {
    let Some(raw) = store.get(STATS_KEY) else {
        return StatsRecord::default();
    };
    serde_json::from_str(&raw).unwrap_or_else(|e| {
        warn!(error = %e, "discarding malformed stats record");
        StatsRecord::default()
    })
}

/// Read-modify-write of the durable record after a race. `aggregate` is the
/// dashboard with that race already folded in.
pub fn record_race(
    store: &mut dyn KeyValueStore,
    wpm: u32,
    accuracy_percent: u32,
    aggregate: &AggregateStats,
) -> Result<StatsRecord> {
    let mut record = load_record(store);
    record.races += 1;
    record.best_wpm = record.best_wpm.max(wpm);
    record.last_wpm = wpm;
    record.last_accuracy = accuracy_percent;
    record.average_wpm = Some(aggregate.average_wpm);
    record.average_accuracy = Some(aggregate.average_accuracy);

    store.set(STATS_KEY, serde_json::to_string(&record)?)?;
    debug!(races = record.races, best = record.best_wpm, "stats record saved");
    Ok(record)
}
