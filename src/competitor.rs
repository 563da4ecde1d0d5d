use rand::Rng;
use std::time::SystemTime;

use crate::pace::{elapsed_minutes, word_count, words_per_minute};

const MIN_STEP: f64 = 0.2;
const MAX_STEP: f64 = 1.0;

/// Simulated opponent in a race
#[derive(Clone, Debug, PartialEq)]
pub struct Competitor {
    pub id: u32,
    pub name: String,
    pub progress_percent: f64,
    pub wpm: u32,
}

impl Competitor {
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            progress_percent: 0.0,
            wpm: 0,
        }
    }

    pub fn has_finished(&self) -> bool {
        self.progress_percent >= 100.0
    }
}

/// Random-walk progress for the field of competitors. Finishing does not end
/// the race; only the player's input does.
#[derive(Clone, Debug, Default)]
pub struct CompetitorSimulator {
    competitors: Vec<Competitor>,
}

impl CompetitorSimulator {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let competitors = names
            .into_iter()
            .zip(1..)
            .map(|(name, id)| Competitor::new(id, name))
            .collect();
        Self { competitors }
    }

    pub fn competitors(&self) -> &[Competitor] {
        &self.competitors
    }

    pub fn reset(&mut self) {
        for c in &mut self.competitors {
            c.progress_percent = 0.0;
            c.wpm = 0;
        }
    }

    /// One simulation step for every competitor.
    pub fn tick<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        reference: &str,
        start: SystemTime,
        now: SystemTime,
    ) {
        let minutes = elapsed_minutes(start, now);
        let words = word_count(reference) as f64;

        for c in &mut self.competitors {
            let step = rng.gen_range(MIN_STEP..=MAX_STEP);
            c.progress_percent = (c.progress_percent + step).min(100.0);
            c.wpm = words_per_minute(words * (c.progress_percent / 100.0), minutes).unwrap_or(0);
        }
    }
}
