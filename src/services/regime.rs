//! Operating regime state machine
//!
//! Transitions are operator-triggered only. A requested regime is latched and
//! applied at the start of the next tick's refresh, so a tick never observes a
//! half-applied change.

use crate::domain::types::Regime;
use crate::infra::config::{Config, RegimeProfile};
use rand::Rng;
use tracing::info;

/// Values derived from the active regime for one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegimeOutputs {
    pub regime: Regime,
    pub belt_speed: f64,
    pub vibration_target: f64,
    pub current_target: f64,
}

/// Uniform draw in `[-amplitude, amplitude]`; zero amplitude draws nothing
#[inline]
pub(crate) fn jitter<R: Rng>(rng: &mut R, amplitude: f64) -> f64 {
    if amplitude > 0.0 {
        rng.gen_range(-amplitude..=amplitude)
    } else {
        0.0
    }
}

/// Holds the single authoritative regime and publishes its targets
pub struct RegimeMachine {
    current: Regime,
    requested: Option<Regime>,
    normal: RegimeProfile,
    wear: RegimeProfile,
    jam: RegimeProfile,
}

impl RegimeMachine {
    pub fn new(config: &Config) -> Self {
        Self {
            current: Regime::Normal,
            requested: None,
            normal: *config.regime_profile(Regime::Normal),
            wear: *config.regime_profile(Regime::Wear),
            jam: *config.regime_profile(Regime::Jam),
        }
    }

    /// Regime in effect for the last refreshed tick
    #[inline]
    pub fn current(&self) -> Regime {
        self.current
    }

    /// Regime that will be in effect on the next tick
    #[inline]
    pub fn effective_next(&self) -> Regime {
        self.requested.unwrap_or(self.current)
    }

    /// Request a regime; applied at the next refresh
    pub fn request(&mut self, regime: Regime) {
        self.requested = Some(regime);
    }

    fn profile(&self, regime: Regime) -> &RegimeProfile {
        match regime {
            Regime::Normal => &self.normal,
            Regime::Wear => &self.wear,
            Regime::Jam => &self.jam,
        }
    }

    /// Apply any pending request, then publish this tick's speed and targets
    ///
    /// Returns the outputs and, when the regime changed, the previous regime.
    pub fn refresh<R: Rng>(&mut self, rng: &mut R) -> (RegimeOutputs, Option<Regime>) {
        let mut changed_from = None;
        if let Some(next) = self.requested.take() {
            if next != self.current {
                info!(from = %self.current.as_str(), to = %next.as_str(), "regime_changed");
                changed_from = Some(self.current);
                self.current = next;
            }
        }

        let profile = *self.profile(self.current);
        let outputs = RegimeOutputs {
            regime: self.current,
            belt_speed: profile.speed.max(0.0),
            vibration_target: profile.vibration + jitter(rng, profile.vibration_jitter),
            current_target: profile.current + jitter(rng, profile.current_jitter),
        };
        (outputs, changed_from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(42)
    }

    #[test]
    fn test_initial_regime_is_normal() {
        let machine = RegimeMachine::new(&Config::default());
        assert_eq!(machine.current(), Regime::Normal);
        assert_eq!(machine.effective_next(), Regime::Normal);
    }

    #[test]
    fn test_request_applies_on_refresh() {
        let mut machine = RegimeMachine::new(&Config::default());
        let mut rng = rng();

        machine.request(Regime::Jam);
        assert_eq!(machine.current(), Regime::Normal);
        assert_eq!(machine.effective_next(), Regime::Jam);

        let (outputs, changed_from) = machine.refresh(&mut rng);
        assert_eq!(machine.current(), Regime::Jam);
        assert_eq!(outputs.regime, Regime::Jam);
        assert_eq!(outputs.belt_speed, 0.0);
        assert_eq!(changed_from, Some(Regime::Normal));

        // No further change on the next refresh
        let (_, changed_from) = machine.refresh(&mut rng);
        assert_eq!(changed_from, None);
    }

    #[test]
    fn test_same_regime_request_is_not_a_change() {
        let mut machine = RegimeMachine::new(&Config::default());
        machine.request(Regime::Normal);
        let (_, changed_from) = machine.refresh(&mut rng());
        assert_eq!(changed_from, None);
    }

    #[test]
    fn test_every_regime_reachable_from_every_other() {
        let mut machine = RegimeMachine::new(&Config::default());
        let mut rng = rng();
        let all = [Regime::Normal, Regime::Wear, Regime::Jam];
        for from in all {
            for to in all {
                machine.request(from);
                machine.refresh(&mut rng);
                machine.request(to);
                let (outputs, _) = machine.refresh(&mut rng);
                assert_eq!(outputs.regime, to);
            }
        }
    }

    #[test]
    fn test_speed_ordering() {
        let mut machine = RegimeMachine::new(&Config::default());
        let mut rng = rng();
        let mut speed_for = |regime: Regime| {
            machine.request(regime);
            machine.refresh(&mut rng).0.belt_speed
        };
        let normal = speed_for(Regime::Normal);
        let wear = speed_for(Regime::Wear);
        let jam = speed_for(Regime::Jam);
        assert!(normal > wear && wear > jam);
        assert_eq!(jam, 0.0);
    }

    #[test]
    fn test_targets_within_jitter_bounds() {
        let mut machine = RegimeMachine::new(&Config::default());
        let mut rng = rng();
        machine.request(Regime::Wear);
        for _ in 0..200 {
            let (outputs, _) = machine.refresh(&mut rng);
            assert!((4.0..=5.0).contains(&outputs.vibration_target));
            assert!((2.4..=2.6).contains(&outputs.current_target));
        }
    }

    #[test]
    fn test_zero_jitter_is_exact() {
        let mut machine = RegimeMachine::new(&Config::default());
        machine.request(Regime::Jam);
        let (outputs, _) = machine.refresh(&mut rng());
        assert_eq!(outputs.vibration_target, 0.1);
    }
}
