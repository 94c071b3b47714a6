//! Exponential smoothing of telemetry signals
//!
//! Each tick moves a signal toward its target by `clamp(dt * rate, 0, 1)` of
//! the remaining distance. No overshoot; monotone convergence to a fixed target.

/// A named scalar that follows a regime-dependent target
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetrySignal {
    pub name: &'static str,
    pub value: f64,
    pub target: f64,
}

impl TelemetrySignal {
    pub fn new(name: &'static str, initial: f64) -> Self {
        Self { name, value: initial, target: initial }
    }
}

/// Interpolation factor for one step, clamped to [0, 1]
///
/// Negative or non-finite `dt` yields 0 (no-op step).
#[inline]
pub fn smoothing_factor(dt: f64, rate: f64) -> f64 {
    let factor = dt * rate;
    if factor.is_nan() || dt <= 0.0 {
        return 0.0;
    }
    factor.clamp(0.0, 1.0)
}

/// Move `signal` toward `target` by one filter step
pub fn advance(signal: &mut TelemetrySignal, target: f64, dt: f64, rate: f64) {
    signal.target = target;
    let factor = smoothing_factor(dt, rate);
    signal.value += (target - signal.value) * factor;
}
