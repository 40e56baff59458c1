//! Reward bookkeeping over the key-value store.
//!
//! Persists per-reward state (times given, last given time, sequence
//! index) through the storage facade and announces changes on the event
//! bus. Corrupted or unparseable counters degrade to their absent/zero
//! defaults; a single bad entry never takes the caller down.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use pv_store::{KvStorage, StoreError};

use crate::events::{EventBus, StateEvent};
use crate::time_strategy::TimeStrategy;

pub struct RewardStorage {
    kv: KvStorage,
    bus: Arc<dyn EventBus>,
}

impl RewardStorage {
    pub fn new(kv: KvStorage, bus: Arc<dyn EventBus>) -> Self {
        Self { kv, bus }
    }

    fn reward_key(&self, reward_id: &str, postfix: &str) -> String {
        format!("{}rewards.{}.{}", self.kv.key_prefix(), reward_id, postfix)
    }

    /// Give (`true`) or take back (`false`) a reward, bumping its counter
    /// and, when giving, stamping the last-given time with the system
    /// clock.
    pub fn set_reward_status(
        &self,
        reward_id: &str,
        give: bool,
        notify: bool,
    ) -> Result<(), StoreError> {
        self.set_reward_status_at(reward_id, give, notify, Utc::now())
    }

    /// As [`Self::set_reward_status`], with an explicit timestamp.
    pub fn set_reward_status_at(
        &self,
        reward_id: &str,
        give: bool,
        notify: bool,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let times = self.times_given(reward_id)?;
        // The counter never goes below zero.
        let total = if give { times + 1 } else { times.saturating_sub(1) };
        tracing::debug!(reward_id, give, total, "updating reward status");

        self.kv
            .set(&self.reward_key(reward_id, "timesGiven"), &total.to_string())?;

        if give {
            self.kv.set(
                &self.reward_key(reward_id, "lastGiven"),
                &now.timestamp_millis().to_string(),
            )?;
        }

        if notify {
            let event = if give {
                StateEvent::RewardGiven {
                    reward_id: reward_id.to_string(),
                }
            } else {
                StateEvent::RewardTaken {
                    reward_id: reward_id.to_string(),
                }
            };
            self.bus.publish(event);
        }

        Ok(())
    }

    /// Whether the reward has been given at least once.
    pub fn is_reward_given(&self, reward_id: &str) -> Result<bool, StoreError> {
        Ok(self.times_given(reward_id)? > 0)
    }

    pub fn times_given(&self, reward_id: &str) -> Result<u32, StoreError> {
        let val = self
            .kv
            .get(&self.reward_key(reward_id, "timesGiven"))?
            .into_option();
        Ok(val.and_then(|v| v.parse().ok()).unwrap_or(0))
    }

    pub fn last_given_time(&self, reward_id: &str) -> Result<Option<DateTime<Utc>>, StoreError> {
        let val = self
            .kv
            .get(&self.reward_key(reward_id, "lastGiven"))?
            .into_option();
        Ok(val
            .and_then(|v| v.parse::<i64>().ok())
            .and_then(DateTime::from_timestamp_millis))
    }

    /// Index of the last reward given in a sequence, if any.
    pub fn last_seq_idx_given(&self, reward_id: &str) -> Result<Option<u32>, StoreError> {
        let val = self
            .kv
            .get(&self.reward_key(reward_id, "seq.idx"))?
            .into_option();
        Ok(val.and_then(|v| v.parse().ok()))
    }

    pub fn set_last_seq_idx_given(&self, reward_id: &str, idx: u32) -> Result<(), StoreError> {
        self.kv
            .set(&self.reward_key(reward_id, "seq.idx"), &idx.to_string())
    }

    /// Whether the reward may be given at `now` under `strategy`, judged
    /// against the persisted history.
    pub fn can_give(
        &self,
        reward_id: &str,
        strategy: &TimeStrategy,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let last = self.last_given_time(reward_id)?;
        let times = self.times_given(reward_id)?;
        Ok(strategy.approve(now, last, times))
    }
}
