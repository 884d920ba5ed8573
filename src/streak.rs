// src/streak.rs
use std::collections::HashMap;

use crate::scrape::types::Source;

/// What a single record did to a source's streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreakEvent {
    None,
    /// The failure streak just reached the alert threshold.
    Escalated(u32),
    /// A success ended a streak that had been escalated.
    Recovered(u32),
}

/// Consecutive-failure counter per source.
/// - Escalation fires once per streak, when it reaches `threshold`.
/// - A success resets the streak.
#[derive(Debug, Clone)]
pub struct FailureStreaks {
    threshold: u32,
    current: HashMap<Source, u32>,
}

impl FailureStreaks {
    /// `threshold` of 0 is treated as 1.
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold: threshold.max(1),
            current: HashMap::new(),
        }
    }

    pub fn record(&mut self, source: Source, ok: bool) -> StreakEvent {
        let streak = self.current.entry(source).or_insert(0);
        if ok {
            let prev = std::mem::take(streak);
            return if prev >= self.threshold {
                StreakEvent::Recovered(prev)
            } else {
                StreakEvent::None
            };
        }
        *streak = streak.saturating_add(1);
        if *streak == self.threshold {
            StreakEvent::Escalated(*streak)
        } else {
            StreakEvent::None
        }
    }

    pub fn streak(&self, source: Source) -> u32 {
        self.current.get(&source).copied().unwrap_or(0)
    }
}
