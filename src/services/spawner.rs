//! Spawn scheduler - periodic object creation at the belt entry
//!
//! A plain rate limiter: at most one spawn per invocation, missed intervals
//! are not banked, and nothing is created while the belt is jammed. The next
//! interval is drawn fresh from the configured range after every spawn.

use crate::domain::types::{ObjectId, Regime};
use crate::infra::config::Config;
use crate::services::regime::jitter;
use crate::services::registry::ObjectRegistry;
use rand::Rng;

pub struct SpawnScheduler {
    entry_x: f64,
    lateral_jitter: f64,
    interval_min_secs: f64,
    interval_max_secs: f64,
    /// None until the first spawn, which happens immediately
    last_spawn_at: Option<f64>,
    next_interval_secs: f64,
}

impl SpawnScheduler {
    pub fn new(config: &Config) -> Self {
        Self {
            entry_x: config.entry_x(),
            lateral_jitter: config.lateral_jitter(),
            interval_min_secs: config.spawn_interval_min_secs(),
            interval_max_secs: config.spawn_interval_max_secs(),
            last_spawn_at: None,
            next_interval_secs: config.spawn_interval_min_secs(),
        }
    }

    fn draw_interval<R: Rng>(&self, rng: &mut R) -> f64 {
        if self.interval_max_secs > self.interval_min_secs {
            rng.gen_range(self.interval_min_secs..=self.interval_max_secs)
        } else {
            self.interval_min_secs
        }
    }

    /// Interval that must elapse before the next spawn
    #[inline]
    pub fn next_interval_secs(&self) -> f64 {
        self.next_interval_secs
    }

    /// Spawn one object if not jammed and the interval has elapsed
    pub fn maybe_spawn<R: Rng>(
        &mut self,
        now: f64,
        regime: Regime,
        registry: &mut ObjectRegistry,
        rng: &mut R,
    ) -> Option<ObjectId> {
        if regime == Regime::Jam {
            return None;
        }

        if let Some(last) = self.last_spawn_at {
            if now - last < self.next_interval_secs {
                return None;
            }
        }

        let lateral = jitter(rng, self.lateral_jitter);
        let id = registry.spawn(self.entry_x, lateral, now);
        self.last_spawn_at = Some(now);
        self.next_interval_secs = self.draw_interval(rng);
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(3)
    }

    #[test]
    fn test_first_spawn_is_immediate() {
        let mut scheduler = SpawnScheduler::new(&Config::default());
        let mut registry = ObjectRegistry::new();
        let id = scheduler.maybe_spawn(0.0, Regime::Normal, &mut registry, &mut rng());
        assert!(id.is_some());
        let obj = registry.get(id.unwrap()).unwrap();
        assert_eq!(obj.position, -5.0);
        assert!(obj.lateral.abs() <= 0.5);
    }

    #[test]
    fn test_respects_interval() {
        let config = Config::default().with_spawn_interval(1.0, 1.0);
        let mut scheduler = SpawnScheduler::new(&config);
        let mut registry = ObjectRegistry::new();
        let mut rng = rng();

        assert!(scheduler.maybe_spawn(0.0, Regime::Normal, &mut registry, &mut rng).is_some());
        assert!(scheduler.maybe_spawn(0.5, Regime::Normal, &mut registry, &mut rng).is_none());
        assert!(scheduler.maybe_spawn(1.0, Regime::Normal, &mut registry, &mut rng).is_some());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_no_burst_after_long_gap() {
        let config = Config::default().with_spawn_interval(1.0, 1.0);
        let mut scheduler = SpawnScheduler::new(&config);
        let mut registry = ObjectRegistry::new();
        let mut rng = rng();

        scheduler.maybe_spawn(0.0, Regime::Normal, &mut registry, &mut rng);
        // Ten intervals later only one spawn happens, and the clock restarts from now
        assert!(scheduler.maybe_spawn(10.0, Regime::Normal, &mut registry, &mut rng).is_some());
        assert!(scheduler.maybe_spawn(10.0, Regime::Normal, &mut registry, &mut rng).is_none());
        assert!(scheduler.maybe_spawn(10.5, Regime::Normal, &mut registry, &mut rng).is_none());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_jam_suppresses_spawning() {
        let mut scheduler = SpawnScheduler::new(&Config::default());
        let mut registry = ObjectRegistry::new();
        let mut rng = rng();

        for i in 0..100 {
            let now = f64::from(i) * 0.1;
            assert!(scheduler.maybe_spawn(now, Regime::Jam, &mut registry, &mut rng).is_none());
        }
        assert!(registry.is_empty());
    }

    #[test]
    fn test_interval_drawn_within_range() {
        let mut scheduler = SpawnScheduler::new(&Config::default());
        let mut registry = ObjectRegistry::new();
        let mut rng = rng();
        let mut now = 0.0;

        for _ in 0..50 {
            scheduler.maybe_spawn(now, Regime::Wear, &mut registry, &mut rng);
            let interval = scheduler.next_interval_secs();
            assert!((1.2..=1.8).contains(&interval));
            now += interval + 1e-6;
        }
        assert_eq!(registry.len(), 50);
    }
}
