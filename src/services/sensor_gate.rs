//! Optical sensor gate - presence display and one-shot production counting
//!
//! Two facts are kept apart:
//! - display: ACTIVE while any object sits in the detection zone AND the belt
//!   is moving; a stalled belt always reads CLEAR
//! - count: each object is counted exactly once, on the first evaluation where
//!   its position has reached the gate entry, regardless of belt speed
//!
//! Counting on "reached the entry" rather than "inside the zone" means an
//! object whose tick step is wider than the zone is still counted.

use crate::domain::types::{GateState, ObjectId};
use crate::infra::config::Config;
use crate::services::registry::ObjectRegistry;
use smallvec::SmallVec;
use std::ops::RangeInclusive;
use tracing::info;

/// Result of evaluating the gate for one tick
#[derive(Debug, Clone, Default)]
pub struct GateReading {
    pub state: GateState,
    /// Objects counted on this tick, ascending by id
    pub counted: SmallVec<[ObjectId; 4]>,
}

pub struct SensorGate {
    enter_x: f64,
    zone_width: f64,
    total_count: u64,
}

impl SensorGate {
    pub fn new(config: &Config) -> Self {
        Self { enter_x: config.gate_enter_x(), zone_width: config.gate_zone_width(), total_count: 0 }
    }

    /// `[enter, enter + width]`
    pub fn detection_zone(&self) -> RangeInclusive<f64> {
        self.enter_x..=self.enter_x + self.zone_width
    }

    /// `[enter + width, enter + 2 * width]`, downstream of the detection zone
    pub fn clear_zone(&self) -> RangeInclusive<f64> {
        self.enter_x + self.zone_width..=self.enter_x + 2.0 * self.zone_width
    }

    /// Cumulative production counter
    #[inline]
    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    /// Evaluate presence and counting over every live object
    pub fn evaluate(&mut self, registry: &mut ObjectRegistry, belt_speed: f64) -> GateReading {
        let detection = self.detection_zone();
        let mut occupied = false;
        let mut counted: SmallVec<[ObjectId; 4]> = SmallVec::new();

        for obj in registry.values_mut() {
            if detection.contains(&obj.position) {
                occupied = true;
            }
            if obj.position >= self.enter_x && obj.mark_counted() {
                counted.push(obj.id);
            }
        }

        counted.sort_unstable();
        for id in &counted {
            self.total_count += 1;
            info!(object_id = %id, count = %self.total_count, "object_counted");
        }

        let state = if occupied && belt_speed > 0.0 { GateState::Active } else { GateState::Clear };
        GateReading { state, counted }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate() -> SensorGate {
        SensorGate::new(&Config::default())
    }

    fn spawn_at(registry: &mut ObjectRegistry, x: f64) -> ObjectId {
        let id = registry.spawn(-5.0, 0.0, 0.0);
        registry.place(id, x);
        id
    }

    #[test]
    fn test_zones() {
        let gate = gate();
        assert!(gate.detection_zone().contains(&14.9));
        assert!(gate.detection_zone().contains(&15.0));
        assert!(!gate.detection_zone().contains(&15.2));
        assert!(gate.clear_zone().contains(&15.2));
        assert!(!gate.clear_zone().contains(&15.0));
    }

    #[test]
    fn test_active_when_moving_and_occupied() {
        let mut registry = ObjectRegistry::new();
        let id = spawn_at(&mut registry, 15.0);
        let mut gate = gate();

        let reading = gate.evaluate(&mut registry, 6.0);
        assert_eq!(reading.state, GateState::Active);
        assert_eq!(reading.counted.as_slice(), &[id]);
        assert_eq!(gate.total_count(), 1);
    }

    #[test]
    fn test_clear_when_empty() {
        let mut registry = ObjectRegistry::new();
        spawn_at(&mut registry, 10.0);
        let reading = gate().evaluate(&mut registry, 6.0);
        assert_eq!(reading.state, GateState::Clear);
        assert!(reading.counted.is_empty());
    }

    #[test]
    fn test_stalled_belt_reads_clear_but_still_counts() {
        let mut registry = ObjectRegistry::new();
        let id = spawn_at(&mut registry, 15.0);
        let mut gate = gate();

        let reading = gate.evaluate(&mut registry, 0.0);
        assert_eq!(reading.state, GateState::Clear);
        assert_eq!(reading.counted.as_slice(), &[id]);
        assert_eq!(gate.total_count(), 1);
    }

    #[test]
    fn test_count_is_one_shot() {
        let mut registry = ObjectRegistry::new();
        spawn_at(&mut registry, 15.0);
        let mut gate = gate();

        gate.evaluate(&mut registry, 6.0);
        let reading = gate.evaluate(&mut registry, 6.0);
        assert!(reading.counted.is_empty());
        assert_eq!(gate.total_count(), 1);
    }

    #[test]
    fn test_object_that_skipped_zone_is_counted() {
        // Stepped from 14.8 to 15.4 in one tick, never inside the zone
        let mut registry = ObjectRegistry::new();
        let id = spawn_at(&mut registry, 15.4);
        let mut gate = gate();

        let reading = gate.evaluate(&mut registry, 6.0);
        assert_eq!(reading.state, GateState::Clear);
        assert_eq!(reading.counted.as_slice(), &[id]);
    }

    #[test]
    fn test_multiple_objects_counted_in_id_order() {
        let mut registry = ObjectRegistry::new();
        let a = spawn_at(&mut registry, 16.0);
        let b = spawn_at(&mut registry, 15.0);
        let _upstream = spawn_at(&mut registry, 3.0);
        let mut gate = gate();

        let reading = gate.evaluate(&mut registry, 6.0);
        assert_eq!(reading.counted.as_slice(), &[a, b]);
        assert_eq!(gate.total_count(), 2);
    }
}
