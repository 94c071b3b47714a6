//! Motion engine - advances objects and enforces the jam queueing policy
//!
//! Outside a jam every object moves `belt_speed * dt`. During a jam the belt is
//! stopped but upstream infeed still pushes objects toward the accumulation
//! point, where they queue nose to tail:
//! - an object already at or past the accumulation point holds
//! - an object with another object strictly ahead within the blocking distance holds
//! - otherwise it advances, never beyond the accumulation point nor into the
//!   back of the object ahead
//!
//! Objects are resolved front to back (position descending), so the leader of
//! a queue moves first and followers see its updated position in the same tick.

use crate::domain::types::{ObjectId, Regime};
use crate::infra::config::Config;
use crate::services::regime::jitter;
use crate::services::registry::ObjectRegistry;
use rand::Rng;
use smallvec::SmallVec;

/// Float slack when comparing gaps against the blocking distance
const GAP_EPSILON: f64 = 1e-9;

/// Outcome of one motion step
#[derive(Debug, Default)]
pub struct MotionReport {
    pub advanced: usize,
    pub stalled: usize,
    pub culled: SmallVec<[ObjectId; 4]>,
}

pub struct MotionEngine {
    exit_x: f64,
    accumulation_x: f64,
    blocking_distance: f64,
    infeed_speed: f64,
    stall_jitter: f64,
}

impl MotionEngine {
    pub fn new(config: &Config) -> Self {
        Self {
            exit_x: config.exit_x(),
            accumulation_x: config.jam_accumulation_x(),
            blocking_distance: config.blocking_distance(),
            infeed_speed: config.jam_infeed_speed(),
            stall_jitter: config.stall_jitter(),
        }
    }

    /// Advance every live object by one tick, then cull objects past the exit
    pub fn tick<R: Rng>(
        &self,
        registry: &mut ObjectRegistry,
        regime: Regime,
        belt_speed: f64,
        dt: f64,
        rng: &mut R,
    ) -> MotionReport {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };

        let mut report = if regime == Regime::Jam {
            self.tick_jammed(registry, dt, rng)
        } else {
            self.tick_running(registry, belt_speed.max(0.0), dt)
        };

        report.culled = registry.cull_past(self.exit_x);
        report
    }

    fn tick_running(&self, registry: &mut ObjectRegistry, speed: f64, dt: f64) -> MotionReport {
        let step = speed * dt;
        let mut report = MotionReport::default();
        for obj in registry.values_mut() {
            obj.position += step;
            obj.wobble = 0.0;
            report.advanced += 1;
        }
        report
    }

    fn tick_jammed<R: Rng>(&self, registry: &mut ObjectRegistry, dt: f64, rng: &mut R) -> MotionReport {
        let step = self.infeed_speed * dt;
        let mut report = MotionReport::default();

        // Front to back; entries are updated in place as objects move
        let mut lane = registry.lane_front_to_back();

        for i in 0..lane.len() {
            let (id, position) = lane[i];

            // Already-resolved entries are the only ones that can be strictly ahead
            let nearest_ahead = lane[..i]
                .iter()
                .map(|&(_, p)| p)
                .filter(|&p| p > position)
                .min_by(f64::total_cmp);

            let blocked = nearest_ahead
                .is_some_and(|ahead| ahead - position <= self.blocking_distance + GAP_EPSILON);

            let mut next = position;
            if position < self.accumulation_x && !blocked {
                let mut limit = self.accumulation_x;
                if let Some(ahead) = nearest_ahead {
                    limit = limit.min(ahead - self.blocking_distance);
                }
                next = (position + step).min(limit).max(position);
            }

            let Some(obj) = registry.get_mut(id) else {
                continue;
            };
            if next > position {
                obj.position = next;
                obj.wobble = 0.0;
                lane[i].1 = next;
                report.advanced += 1;
            } else {
                obj.wobble = jitter(rng, self.stall_jitter);
                report.stalled += 1;
            }
        }

        report
    }
}
