use itertools::{EitherOrBoth, Itertools};

#[derive(Clone, Debug, Copy, PartialEq, Eq)]
pub enum Outcome {
    Correct,
    Incorrect,
}

/// Result of comparing typed text against a reference
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Score {
    pub error_count: usize,
    pub accuracy_percent: u32,
    pub is_complete: bool,
}

/// Per-position outcome for every typed character.
///
/// Characters typed past the end of the reference have nothing to match and
/// are always `Incorrect`.
pub fn outcomes(reference: &str, typed: &str) -> Vec<Outcome> {
    reference
        .chars()
        .zip_longest(typed.chars())
        .filter_map(|pair| match pair {
            EitherOrBoth::Both(expected, actual) if expected == actual => Some(Outcome::Correct),
            EitherOrBoth::Both(_, _) | EitherOrBoth::Right(_) => Some(Outcome::Incorrect),
            EitherOrBoth::Left(_) => None,
        })
        .collect()
}

/// Scores `typed` against `reference`. Pure: equal inputs give equal scores.
pub fn score(reference: &str, typed: &str) -> Score {
    let typed_len = typed.chars().count();
    let error_count = outcomes(reference, typed)
        .into_iter()
        .filter(|o| *o == Outcome::Incorrect)
        .count();

    Score {
        error_count,
        accuracy_percent: accuracy(typed_len, error_count),
        is_complete: typed_len >= reference.chars().count(),
    }
}

/// 100 for no input, otherwise the rounded share of correct characters.
pub fn accuracy(typed_len: usize, error_count: usize) -> u32 {
    if typed_len == 0 {
        return 100;
    }
    let correct = typed_len.saturating_sub(error_count) as f64;
    ((correct / typed_len as f64) * 100.0).round().max(0.0) as u32
}

pub fn progress_percent(reference_len: usize, typed_len: usize) -> f64 {
    if reference_len == 0 {
        return 100.0;
    }
    (typed_len as f64 / reference_len as f64 * 100.0).min(100.0)
}
