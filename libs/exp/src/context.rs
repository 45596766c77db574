//! Evaluation context

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// How `in` treats a `null` among its list elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NullInListPolicy {
    /// Fail with an evaluation error.
    Reject,
    /// Treat the null element as never matching.
    Ignore,
}

impl Default for NullInListPolicy {
    #[cfg(feature = "strict-null-in")]
    fn default() -> Self {
        NullInListPolicy::Reject
    }

    #[cfg(not(feature = "strict-null-in"))]
    fn default() -> Self {
        NullInListPolicy::Ignore
    }
}

/// Immutable settings for one evaluation.
#[derive(Debug, Clone, Default)]
pub struct EvalContext {
    pub null_in_list: NullInListPolicy,
    /// Fixed "now" for `currentDate()`, `currentTime()` and `now()`. The
    /// local clock is used when unset.
    pub clock: Option<NaiveDateTime>,
}

impl EvalContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_null_in_list(mut self, policy: NullInListPolicy) -> Self {
        self.null_in_list = policy;
        self
    }

    pub fn with_clock(mut self, now: NaiveDateTime) -> Self {
        self.clock = Some(now);
        self
    }

    pub fn now(&self) -> NaiveDateTime {
        self.clock.unwrap_or_else(|| Local::now().naive_local())
    }
}
