//! Circle overlap queries over organisms and energy sources.
//!
//! The simulation only needs one capability from its physics layer: "which
//! tagged bodies overlap this circle". [`SpatialQuery`] is that seam and
//! [`SpatialIndex`] is a uniform-grid implementation rebuilt every physics
//! tick.

use cellsim_core::{EnergySourceId, EntityId, Vec2};
use serde::{Deserialize, Serialize};

/// Collision tag of a body in the field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpatialTag {
    Organism,
    Energy,
}

/// What a collider belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyRef {
    Entity(EntityId),
    Source(EnergySourceId),
}

/// One hit returned from an overlap query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Overlap {
    pub tag: SpatialTag,
    pub body: BodyRef,
    pub position: Vec2,
    pub radius: f32,
}

/// Spatial collaborator used by sensors, feeding and contact detection.
pub trait SpatialQuery {
    /// Collect bodies whose circle overlaps `(center, radius)` and whose tag is
    /// in `tags` into `out` (cleared first). At most the implementation's
    /// capacity is returned; further hits are silently dropped.
    fn overlap_circle(&self, center: Vec2, radius: f32, tags: &[SpatialTag], out: &mut Vec<Overlap>);
}

/// Uniform grid of cells holding body entries
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    cell_size: f32,
    origin: Vec2,
    cols: usize,
    rows: usize,
    capacity: usize,
    cells: Vec<Vec<usize>>,
    entries: Vec<Overlap>,
    max_radius: f32,
}

impl SpatialIndex {
    /// Index covering `[min, max]`; bodies outside are clamped to edge cells
    pub fn new(min: Vec2, max: Vec2, cell_size: f32, capacity: usize) -> Self {
        let cell_size = cell_size.max(0.01);
        let cols = (((max.x - min.x) / cell_size).ceil() as usize).max(1);
        let rows = (((max.y - min.y) / cell_size).ceil() as usize).max(1);
        Self {
            cell_size,
            origin: min,
            cols,
            rows,
            capacity,
            cells: vec![Vec::new(); cols * rows],
            entries: Vec::new(),
            max_radius: 0.0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        for cell in &mut self.cells {
            cell.clear();
        }
        self.entries.clear();
        self.max_radius = 0.0;
    }

    pub fn insert(&mut self, entry: Overlap) {
        let index = self.entries.len();
        let (cx, cy) = self.cell_coords(entry.position);
        self.cells[cy * self.cols + cx].push(index);
        self.max_radius = self.max_radius.max(entry.radius);
        self.entries.push(entry);
    }

    fn cell_coords(&self, p: Vec2) -> (usize, usize) {
        let fx = ((p.x - self.origin.x) / self.cell_size).floor();
        let fy = ((p.y - self.origin.y) / self.cell_size).floor();
        let cx = if fx.is_finite() { fx.max(0.0) as usize } else { 0 };
        let cy = if fy.is_finite() { fy.max(0.0) as usize } else { 0 };
        (cx.min(self.cols - 1), cy.min(self.rows - 1))
    }
}

impl SpatialQuery for SpatialIndex {
    fn overlap_circle(&self, center: Vec2, radius: f32, tags: &[SpatialTag], out: &mut Vec<Overlap>) {
        out.clear();
        if self.entries.is_empty() || self.capacity == 0 {
            return;
        }

        let reach = radius + self.max_radius;
        let (x0, y0) = self.cell_coords(center - Vec2::new(reach, reach));
        let (x1, y1) = self.cell_coords(center + Vec2::new(reach, reach));

        for cy in y0..=y1 {
            for cx in x0..=x1 {
                for &i in &self.cells[cy * self.cols + cx] {
                    let entry = &self.entries[i];
                    if !tags.contains(&entry.tag) {
                        continue;
                    }
                    if entry.position.distance(center) > radius + entry.radius {
                        continue;
                    }
                    if out.len() >= self.capacity {
                        return;
                    }
                    out.push(*entry);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn organism(index: u32, x: f32, y: f32) -> Overlap {
        Overlap {
            tag: SpatialTag::Organism,
            body: BodyRef::Entity(EntityId::new(index, 0)),
            position: Vec2::new(x, y),
            radius: 0.5,
        }
    }

    fn index(capacity: usize) -> SpatialIndex {
        SpatialIndex::new(Vec2::new(-10.0, -10.0), Vec2::new(10.0, 10.0), 2.0, capacity)
    }

    #[test]
    fn test_overlap_counts_body_radius() {
        let mut idx = index(16);
        idx.insert(organism(0, 0.0, 0.0));
        idx.insert(organism(1, 2.4, 0.0));
        idx.insert(organism(2, 5.0, 0.0));

        let mut out = Vec::new();
        idx.overlap_circle(Vec2::ZERO, 2.0, &[SpatialTag::Organism], &mut out);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_overlap_filters_tags() {
        let mut idx = index(16);
        idx.insert(organism(0, 0.0, 0.0));
        idx.insert(Overlap {
            tag: SpatialTag::Energy,
            body: BodyRef::Source(EnergySourceId::new(0, 0)),
            position: Vec2::new(0.5, 0.0),
            radius: 0.1,
        });

        let mut out = Vec::new();
        idx.overlap_circle(Vec2::ZERO, 1.0, &[SpatialTag::Energy], &mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].tag, SpatialTag::Energy);
    }

    #[test]
    fn test_overlap_truncates_at_capacity() {
        let mut idx = index(3);
        for i in 0..10 {
            idx.insert(organism(i, 0.1 * i as f32, 0.0));
        }
        let mut out = Vec::new();
        idx.overlap_circle(Vec2::ZERO, 5.0, &[SpatialTag::Organism], &mut out);
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn test_out_of_range_positions_are_clamped() {
        let mut idx = index(8);
        idx.insert(organism(0, 50.0, 50.0));
        let mut out = Vec::new();
        idx.overlap_circle(Vec2::new(50.0, 50.0), 1.0, &[SpatialTag::Organism], &mut out);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_clear() {
        let mut idx = index(8);
        idx.insert(organism(0, 0.0, 0.0));
        idx.clear();
        assert!(idx.is_empty());
        let mut out = vec![organism(9, 0.0, 0.0)];
        idx.overlap_circle(Vec2::ZERO, 1.0, &[SpatialTag::Organism], &mut out);
        assert!(out.is_empty());
    }
}
