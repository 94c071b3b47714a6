//! Moving object (bottle) state

use crate::domain::types::ObjectId;

/// One unit travelling along the belt
///
/// Position only moves forward; `counted` flips to true once and stays there.
#[derive(Debug, Clone)]
pub struct MovingObject {
    pub id: ObjectId,
    /// Coordinate along the belt axis
    pub position: f64,
    /// Lateral offset across the belt, fixed at creation
    pub lateral: f64,
    /// Set by the sensor gate the first time the object crosses it
    pub counted: bool,
    /// Simulation time (seconds) at creation
    pub created_at: f64,
    /// Display-only shake while stalled in a jam, never added to `position`
    pub wobble: f64,
}

impl MovingObject {
    #[inline]
    pub fn new(id: ObjectId, position: f64, lateral: f64, created_at: f64) -> Self {
        Self { id, position, lateral, counted: false, created_at, wobble: 0.0 }
    }

    /// Mark the object as counted. Returns true only on the first call.
    #[inline]
    pub fn mark_counted(&mut self) -> bool {
        if self.counted {
            return false;
        }
        self.counted = true;
        true
    }
}
