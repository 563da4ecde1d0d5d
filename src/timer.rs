use std::collections::HashMap;
use std::time::{Duration, SystemTime};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, strum_macros::Display)]
pub enum TimerKind {
    Countdown,
    Competitors,
    LiveWpm,
}

/// Identifies one scheduling of a timer. A token outlives its timer: once the
/// timer is cancelled or rescheduled the token is stale and must be ignored.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimerToken {
    pub kind: TimerKind,
    generation: u64,
}

#[derive(Clone, Copy, Debug)]
struct Slot {
    period: Duration,
    next_due: SystemTime,
    generation: u64,
}

/// Periodic timers driven by an external clock.
#[derive(Debug, Default)]
pub struct Timers {
    slots: HashMap<TimerKind, Slot>,
    next_generation: u64,
}

impl Timers {
    pub fn new() -> Self {
        Self::default()
    }

    /// (Re)arms `kind` to fire every `period` starting one period after `now`.
    /// Tokens from an earlier scheduling become stale.
    pub fn schedule(&mut self, kind: TimerKind, period: Duration, now: SystemTime) -> TimerToken {
        self.next_generation += 1;
        let generation = self.next_generation;
        self.slots.insert(
            kind,
            Slot {
                period,
                next_due: now + period,
                generation,
            },
        );
        TimerToken { kind, generation }
    }

    pub fn cancel(&mut self, kind: TimerKind) -> bool {
        self.slots.remove(&kind).is_some()
    }

    pub fn cancel_all(&mut self) {
        self.slots.clear();
    }

    pub fn is_active(&self, kind: TimerKind) -> bool {
        self.slots.contains_key(&kind)
    }

    pub fn is_live(&self, token: TimerToken) -> bool {
        self.slots
            .get(&token.kind)
            .is_some_and(|slot| slot.generation == token.generation)
    }

    /// Collects one token per elapsed period, ordered by due time.
    pub fn due(&mut self, now: SystemTime) -> Vec<TimerToken> {
        let mut fired: Vec<(SystemTime, TimerToken)> = Vec::new();
        for (kind, slot) in self.slots.iter_mut() {
            if slot.period.is_zero() {
                continue;
            }
            while slot.next_due <= now {
                fired.push((
                    slot.next_due,
                    TimerToken {
                        kind: *kind,
                        generation: slot.generation,
                    },
                ));
                slot.next_due += slot.period;
            }
        }
        fired.sort_by_key(|(at, token)| (*at, token.kind));
        fired.into_iter().map(|(_, token)| token).collect()
    }
}
