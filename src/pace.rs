use std::time::SystemTime;

/// Characters per word for the lesson convention.
pub const CHARS_PER_WORD: f64 = 5.0;

/// Lessons do not track wall time; they assume thirty seconds.
pub const LESSON_ASSUMED_MINUTES: f64 = 0.5;

pub fn elapsed_minutes(start: SystemTime, now: SystemTime) -> f64 {
    now.duration_since(start).unwrap_or_default().as_secs_f64() / 60.0
}

/// Words separated by single spaces. An empty text is one (empty) word.
pub fn word_count(text: &str) -> usize {
    text.split(' ').count()
}

/// `None` when no time has elapsed; the caller keeps its previous value.
pub fn words_per_minute(words: f64, minutes: f64) -> Option<u32> {
    if minutes > 0.0 {
        Some((words / minutes).round().max(0.0) as u32)
    } else {
        None
    }
}

/// Running estimate while a race is in progress, from the typed text.
pub fn live_wpm(typed: &str, start: SystemTime, now: SystemTime) -> Option<u32> {
    words_per_minute(word_count(typed) as f64, elapsed_minutes(start, now))
}

/// Score shown when a race completes, from the reference word count.
pub fn final_wpm(reference: &str, start: SystemTime, end: SystemTime) -> Option<u32> {
    words_per_minute(word_count(reference) as f64, elapsed_minutes(start, end))
}

/// Lesson score: `len / 5` words over the fixed half minute.
pub fn lesson_wpm(reference: &str) -> u32 {
    let words = reference.chars().count() as f64 / CHARS_PER_WORD;
    words_per_minute(words, LESSON_ASSUMED_MINUTES).unwrap_or(0)
}
