//! Object registry - sole owner of live objects on the belt
//!
//! Objects are keyed by a monotonically allocated `ObjectId`; IDs of culled
//! objects are never handed out again. Only the spawn scheduler inserts and
//! only the motion engine removes.

use crate::domain::object::MovingObject;
use crate::domain::snapshot::ObjectView;
use crate::domain::types::ObjectId;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use tracing::debug;

pub struct ObjectRegistry {
    objects: FxHashMap<ObjectId, MovingObject>,
    next_id: u64,
}

impl ObjectRegistry {
    pub fn new() -> Self {
        Self { objects: FxHashMap::default(), next_id: 1 }
    }

    /// Insert a new object at `position` and return its fresh identifier
    pub fn spawn(&mut self, position: f64, lateral: f64, created_at: f64) -> ObjectId {
        let id = ObjectId(self.next_id);
        self.next_id += 1;
        self.objects.insert(id, MovingObject::new(id, position, lateral, created_at));
        debug!(object_id = %id, x = %position, z = %format!("{:.2}", lateral), "object_spawned");
        id
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn get(&self, id: ObjectId) -> Option<&MovingObject> {
        self.objects.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: ObjectId) -> Option<&mut MovingObject> {
        self.objects.get_mut(&id)
    }

    pub(crate) fn values_mut(&mut self) -> impl Iterator<Item = &mut MovingObject> {
        self.objects.values_mut()
    }

    /// IDs with positions, ordered by position descending (ties: lower id first)
    pub(crate) fn lane_front_to_back(&self) -> Vec<(ObjectId, f64)> {
        let mut lane: Vec<(ObjectId, f64)> =
            self.objects.values().map(|o| (o.id, o.position)).collect();
        lane.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        lane
    }

    /// Remove every object past `exit_x`; returns the removed IDs
    pub(crate) fn cull_past(&mut self, exit_x: f64) -> SmallVec<[ObjectId; 4]> {
        let mut culled: SmallVec<[ObjectId; 4]> = SmallVec::new();
        self.objects.retain(|&id, obj| {
            if obj.position > exit_x {
                culled.push(id);
                false
            } else {
                true
            }
        });
        culled.sort_unstable();
        for id in &culled {
            debug!(object_id = %id, "object_culled");
        }
        culled
    }

    /// Live objects ordered by position ascending (ties by id)
    pub fn snapshot(&self) -> Vec<ObjectView> {
        let mut views: Vec<ObjectView> = self.objects.values().map(ObjectView::from).collect();
        views.sort_by(|a, b| a.position.total_cmp(&b.position).then(a.id.cmp(&b.id)));
        views
    }

    /// Place an object at an arbitrary position (tests and scripted setups)
    #[cfg(test)]
    pub(crate) fn place(&mut self, id: ObjectId, position: f64) {
        if let Some(obj) = self.objects.get_mut(&id) {
            obj.position = position;
        }
    }
}

impl Default for ObjectRegistry {
    fn default() -> Self {
        Self::new()
    }
}
