//! Waypoint picking in model space
//!
//! An R-tree (via `rstar`) over waypoint positions, rebuilt whenever a new
//! document is loaded. Queries run in model units, so a pick radius in pixels
//! has to be divided by the current view scale first.

use floorplan_model::{MapDocument, NodeKey, Point};
use rstar::{PointDistance, RTree, RTreeObject, AABB};

#[derive(Debug, Clone)]
struct WaypointEntry {
    key: NodeKey,
    name: String,
    position: [f64; 2],
}

impl RTreeObject for WaypointEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.position)
    }
}

impl PointDistance for WaypointEntry {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = point[0] - self.position[0];
        let dy = point[1] - self.position[1];
        dx * dx + dy * dy
    }
}

/// A waypoint found near a query point.
#[derive(Debug, Clone, PartialEq)]
pub struct PickedWaypoint {
    pub key: NodeKey,
    pub name: String,
    pub position: Point,
    pub distance: f64,
}

impl PickedWaypoint {
    fn from_entry(entry: &WaypointEntry, at: [f64; 2]) -> Self {
        Self {
            key: entry.key.clone(),
            name: entry.name.clone(),
            position: Point::from(entry.position),
            distance: entry.distance_2(&at).sqrt(),
        }
    }
}

#[derive(Debug, Default)]
pub struct WaypointPicker {
    tree: RTree<WaypointEntry>,
}

impl WaypointPicker {
    pub fn build(doc: &MapDocument) -> Self {
        let entries = doc
            .nodes()
            .iter()
            .map(|node| WaypointEntry {
                key: node.key.clone(),
                name: node.display_name().to_string(),
                position: [node.x, node.y],
            })
            .collect();
        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Nearest waypoint no further than `max_distance` from `at`.
    pub fn pick(&self, at: Point, max_distance: f64) -> Option<PickedWaypoint> {
        let query = [at.x, at.y];
        self.tree
            .nearest_neighbor(&query)
            .map(|entry| PickedWaypoint::from_entry(entry, query))
            .filter(|picked| picked.distance <= max_distance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use floorplan_model::Node;

    fn picker() -> WaypointPicker {
        let doc = MapDocument::new(
            10_000.0,
            10_000.0,
            vec![
                Node::new("A", 0.0, 0.0),
                Node::new("B", 1_000.0, 0.0).with_name("Dock B"),
                Node::new("C", 5_000.0, 5_000.0),
            ],
            vec![],
            vec![],
        );
        WaypointPicker::build(&doc)
    }

    #[test]
    fn picks_nearest_within_radius() {
        let picker = picker();
        assert_eq!(picker.len(), 3);

        let hit = picker.pick(Point::new(900.0, 50.0), 200.0).unwrap();
        assert_eq!(hit.key.as_str(), "B");
        assert_eq!(hit.name, "Dock B");

        assert!(picker.pick(Point::new(2_500.0, 2_500.0), 200.0).is_none());
    }

    #[test]
    fn empty_picker_finds_nothing() {
        let picker = WaypointPicker::default();
        assert!(picker.is_empty());
        assert!(picker.pick(Point::new(0.0, 0.0), 1e9).is_none());
    }
}
