//! Per-tick read-only view of the simulation for presentation

use crate::domain::object::MovingObject;
use crate::domain::types::{AlertLevel, GateState, ObjectId, Regime};
use serde::Serialize;

/// Presentation view of one live object
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ObjectView {
    pub id: ObjectId,
    #[serde(rename = "x")]
    pub position: f64,
    #[serde(rename = "z")]
    pub lateral: f64,
    pub wobble: f64,
    pub counted: bool,
}

impl From<&MovingObject> for ObjectView {
    fn from(obj: &MovingObject) -> Self {
        Self {
            id: obj.id,
            position: obj.position,
            lateral: obj.lateral,
            wobble: obj.wobble,
            counted: obj.counted,
        }
    }
}

/// Everything the presentation layer needs to draw one frame
///
/// `objects` is ordered by position ascending (ties by id).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationSnapshot {
    pub tick: u64,
    pub elapsed_secs: f64,
    pub regime: Regime,
    pub status: &'static str,
    pub alert: AlertLevel,
    pub belt_speed: f64,
    /// Smoothed vibration (mm/s)
    pub vibration: f64,
    /// Smoothed motor current (A)
    pub current: f64,
    pub gate: GateState,
    pub count: u64,
    pub objects: Vec<ObjectView>,
}

impl SimulationSnapshot {
    /// Snapshot before the first tick
    pub fn initial(vibration: f64, current: f64) -> Self {
        let regime = Regime::default();
        Self {
            tick: 0,
            elapsed_secs: 0.0,
            regime,
            status: regime.status_label(),
            alert: regime.alert_level(),
            belt_speed: 0.0,
            vibration,
            current,
            gate: GateState::Clear,
            count: 0,
            objects: Vec::new(),
        }
    }

    #[inline]
    pub fn live_objects(&self) -> usize {
        self.objects.len()
    }

    pub fn position_of(&self, id: ObjectId) -> Option<f64> {
        self.objects.iter().find(|o| o.id == id).map(|o| o.position)
    }
}
