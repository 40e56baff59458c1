//! Time-based approval policies for repeatable actions.
//!
//! A [`TimeStrategy`] is an immutable value deciding, given a moment and
//! the caller-owned history (last approval time, approvals so far),
//! whether that moment is an approved occasion. The strategy never
//! mutates anything; `approve` is a pure function of its arguments.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

/// Policy kind. Ordinals are part of the persisted format; do not reorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    EveryMonth = 0,
    EveryDay = 1,
    EveryHour = 2,
    Custom = 3,
    Always = 4,
}

impl StrategyKind {
    fn ordinal(self) -> u8 {
        self as u8
    }

    fn from_ordinal(ord: u8) -> Option<Self> {
        match ord {
            0 => Some(Self::EveryMonth),
            1 => Some(Self::EveryDay),
            2 => Some(Self::EveryHour),
            3 => Some(Self::Custom),
            4 => Some(Self::Always),
            _ => None,
        }
    }
}

/// Immutable approval policy: kind, optional start gate and repeat budget
/// (`0` = unlimited).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TimeStrategyRecord", into = "TimeStrategyRecord")]
pub struct TimeStrategy {
    kind: StrategyKind,
    start_time: Option<DateTime<Utc>>,
    repeat_limit: u32,
}

impl TimeStrategy {
    /// Approve exactly once, ever.
    pub fn once() -> Self {
        Self::custom(1)
    }

    /// Approve exactly once, no earlier than `start_time`.
    pub fn once_at(start_time: DateTime<Utc>) -> Self {
        Self::custom_at(start_time, 1)
    }

    pub fn every_month(start_time: DateTime<Utc>, repeat_limit: u32) -> Self {
        Self {
            kind: StrategyKind::EveryMonth,
            start_time: Some(start_time),
            repeat_limit,
        }
    }

    pub fn every_day(start_time: DateTime<Utc>, repeat_limit: u32) -> Self {
        Self {
            kind: StrategyKind::EveryDay,
            start_time: Some(start_time),
            repeat_limit,
        }
    }

    pub fn every_hour(start_time: DateTime<Utc>, repeat_limit: u32) -> Self {
        Self {
            kind: StrategyKind::EveryHour,
            start_time: Some(start_time),
            repeat_limit,
        }
    }

    /// Caller-paced: only the repeat budget gates approval.
    pub fn custom(repeat_limit: u32) -> Self {
        Self {
            kind: StrategyKind::Custom,
            start_time: None,
            repeat_limit,
        }
    }

    pub fn custom_at(start_time: DateTime<Utc>, repeat_limit: u32) -> Self {
        Self {
            kind: StrategyKind::Custom,
            start_time: Some(start_time),
            repeat_limit,
        }
    }

    pub fn always() -> Self {
        Self {
            kind: StrategyKind::Always,
            start_time: None,
            repeat_limit: 0,
        }
    }

    pub fn always_from(start_time: DateTime<Utc>) -> Self {
        Self {
            kind: StrategyKind::Always,
            start_time: Some(start_time),
            repeat_limit: 0,
        }
    }

    pub fn kind(&self) -> StrategyKind {
        self.kind
    }

    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.start_time
    }

    pub fn repeat_limit(&self) -> u32 {
        self.repeat_limit
    }

    /// Decide whether `now` is an approved occasion given the history.
    ///
    /// Gate order is part of the contract and must not change: start gate,
    /// then ALWAYS, then the repeat budget, then CUSTOM, then the
    /// kind-specific elapsed-time rules.
    pub fn approve(
        &self,
        now: DateTime<Utc>,
        last_time: Option<DateTime<Utc>>,
        times_approved: u32,
    ) -> bool {
        if let Some(start) = self.start_time {
            if now < start {
                tracing::debug!("approval window has not opened yet");
                return false;
            }
        }

        if self.kind == StrategyKind::Always {
            return true;
        }

        if self.repeat_limit > 0 && times_approved >= self.repeat_limit {
            tracing::debug!("approval limit exceeded");
            return false;
        }

        if self.kind == StrategyKind::Custom {
            return true;
        }

        if self.start_time.is_none() {
            tracing::error!("time-gated strategy has no start time");
            return false;
        }

        let Some(last) = last_time else {
            // First occurrence; start and budget gates already passed.
            return true;
        };

        let elapsed_secs = (now - last).num_seconds();
        match self.kind {
            StrategyKind::EveryHour => elapsed_secs / 3600 >= 1,
            StrategyKind::EveryDay => elapsed_secs / 3600 / 24 >= 1,
            StrategyKind::EveryMonth => {
                // Calendar-aware: last day of one month to the first day
                // of the next counts as a month, even under 24h apart.
                let months = |t: DateTime<Utc>| t.year() * 12 + t.month0() as i32;
                months(now) - months(last) >= 1
            }
            // Unreachable given the kinds above; reject rather than assume.
            _ => false,
        }
    }

    /// [`Self::approve`] against the system clock.
    pub fn approve_now(&self, last_time: Option<DateTime<Utc>>, times_approved: u32) -> bool {
        self.approve(Utc::now(), last_time, times_approved)
    }
}

/// Persisted form: integer kind ordinal, repeat budget, start time in
/// epoch milliseconds (`0` or absent = no start gate).
#[derive(Serialize, Deserialize)]
struct TimeStrategyRecord {
    kind: u8,
    repeat: u32,
    #[serde(default)]
    start: i64,
}

impl From<TimeStrategy> for TimeStrategyRecord {
    fn from(ts: TimeStrategy) -> Self {
        Self {
            kind: ts.kind.ordinal(),
            repeat: ts.repeat_limit,
            start: ts
                .start_time
                .map(|t| t.timestamp_millis())
                .unwrap_or(0),
        }
    }
}

impl TryFrom<TimeStrategyRecord> for TimeStrategy {
    type Error = String;

    fn try_from(rec: TimeStrategyRecord) -> Result<Self, Self::Error> {
        let kind = StrategyKind::from_ordinal(rec.kind)
            .ok_or_else(|| format!("unknown strategy kind ordinal {}", rec.kind))?;
        let start_time = if rec.start == 0 {
            None
        } else {
            Some(
                DateTime::from_timestamp_millis(rec.start)
                    .ok_or_else(|| format!("start time {} out of range", rec.start))?,
            )
        };
        Ok(Self {
            kind,
            start_time,
            repeat_limit: rec.repeat,
        })
    }
}
