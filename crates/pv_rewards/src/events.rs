//! Reward and lifecycle notifications.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Fire-and-forget notifications announcing state changes. No
/// acknowledgment; slow or absent consumers never block the producer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StateEvent {
    RewardGiven { reward_id: String },
    RewardTaken { reward_id: String },
    AppToForeground,
    AppToBackground,
}

/// Subscriber seam. Publishing never fails.
pub trait EventBus: Send + Sync {
    fn publish(&self, event: StateEvent);
}

/// Discards everything.
#[derive(Default)]
pub struct NullBus;

impl EventBus for NullBus {
    fn publish(&self, _event: StateEvent) {}
}

/// Captures published events in order. Useful in tests and in hosts that
/// poll instead of subscribing.
#[derive(Default)]
pub struct RecordingBus {
    events: Mutex<Vec<StateEvent>>,
}

impl RecordingBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain the captured events.
    pub fn take(&self) -> Vec<StateEvent> {
        std::mem::take(&mut self.events.lock())
    }

    pub fn events(&self) -> Vec<StateEvent> {
        self.events.lock().clone()
    }
}

impl EventBus for RecordingBus {
    fn publish(&self, event: StateEvent) {
        self.events.lock().push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_bus_keeps_order_and_drains() {
        let bus = RecordingBus::new();
        bus.publish(StateEvent::AppToForeground);
        bus.publish(StateEvent::RewardGiven {
            reward_id: "gold".to_string(),
        });

        assert_eq!(bus.events().len(), 2);
        let drained = bus.take();
        assert_eq!(drained[0], StateEvent::AppToForeground);
        assert!(bus.events().is_empty());
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let json = serde_json::to_value(StateEvent::RewardGiven {
            reward_id: "gold".to_string(),
        })
        .unwrap();
        assert_eq!(json["type"], "reward_given");
        assert_eq!(json["reward_id"], "gold");
    }
}
