use std::collections::{HashMap, HashSet};

use crate::engine::geom;
use crate::model::{ConnId, Pt, SegId};

/// Spatial occupancy index over the canvas: cells map to the segments
/// crossing them. The engine brackets every geometric mutation with a
/// remove/add pair so the matrix always mirrors the model; the router
/// consults it for occupancy while routing.
#[derive(Debug)]
pub struct RoutingMatrix {
    cell: i32,
    cells: HashMap<(i32, i32), Vec<SegId>>,
    entries: HashMap<SegId, SegEntry>,
}

#[derive(Debug, Clone, Copy)]
struct SegEntry {
    owner: ConnId,
    a: Pt,
    b: Pt,
}

impl RoutingMatrix {
    pub fn new(cell: i32) -> Self {
        Self {
            cell: cell.max(1),
            cells: HashMap::new(),
            entries: HashMap::new(),
        }
    }

    fn cell_index(&self, p: Pt) -> (i32, i32) {
        (p.x.div_euclid(self.cell), p.y.div_euclid(self.cell))
    }

    /// Cells crossed by a segment, sampled at sub-cell steps so no cell
    /// along the span is skipped.
    fn span_cells(&self, a: Pt, b: Pt) -> Vec<(i32, i32)> {
        let dx = (b.x - a.x) as f64;
        let dy = (b.y - a.y) as f64;
        let span = dx.abs().max(dy.abs());
        let steps = ((span / self.cell as f64).ceil() as usize * 2).max(1);
        let mut out: Vec<(i32, i32)> = Vec::new();
        let mut seen: HashSet<(i32, i32)> = HashSet::new();
        for i in 0..=steps {
            let t = i as f64 / steps as f64;
            let p = Pt::new(
                (a.x as f64 + dx * t).round() as i32,
                (a.y as f64 + dy * t).round() as i32,
            );
            let idx = self.cell_index(p);
            if seen.insert(idx) {
                out.push(idx);
            }
        }
        out
    }

    /// Register a segment under the coordinates it currently has. Calling
    /// twice for the same id replaces the previous registration.
    pub fn add_segment(&mut self, id: SegId, owner: ConnId, a: Pt, b: Pt) {
        self.remove_segment(id);
        for idx in self.span_cells(a, b) {
            self.cells.entry(idx).or_default().push(id);
        }
        self.entries.insert(id, SegEntry { owner, a, b });
    }

    /// Idempotent removal; unknown ids are a no-op.
    pub fn remove_segment(&mut self, id: SegId) {
        let Some(entry) = self.entries.remove(&id) else {
            return;
        };
        for idx in self.span_cells(entry.a, entry.b) {
            if let Some(bucket) = self.cells.get_mut(&idx) {
                bucket.retain(|s| *s != id);
                if bucket.is_empty() {
                    self.cells.remove(&idx);
                }
            }
        }
    }

    /// Re-home a registered segment onto another connector without
    /// touching its geometry (used when connectors merge or split).
    pub fn set_owner(&mut self, id: SegId, owner: ConnId) {
        if let Some(entry) = self.entries.get_mut(&id) {
            entry.owner = owner;
        }
    }

    pub fn contains(&self, id: SegId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn seg_ids(&self) -> Vec<SegId> {
        self.entries.keys().copied().collect()
    }

    fn candidates_around(&self, p: Pt, cell_radius: i32) -> Vec<SegId> {
        let (cx, cy) = self.cell_index(p);
        let mut out: Vec<SegId> = Vec::new();
        let mut seen: HashSet<SegId> = HashSet::new();
        for ix in (cx - cell_radius)..=(cx + cell_radius) {
            for iy in (cy - cell_radius)..=(cy + cell_radius) {
                if let Some(bucket) = self.cells.get(&(ix, iy)) {
                    for id in bucket {
                        if seen.insert(*id) {
                            out.push(*id);
                        }
                    }
                }
            }
        }
        out
    }

    /// Segments passing exactly through a coordinate.
    pub fn segments_at(&self, p: Pt) -> Vec<(SegId, ConnId)> {
        self.candidates_around(p, 1)
            .into_iter()
            .filter_map(|id| {
                let entry = self.entries.get(&id)?;
                if geom::point_on_segment(entry.a, entry.b, p) {
                    Some((id, entry.owner))
                } else {
                    None
                }
            })
            .collect()
    }

    /// Segments within an L-infinity tolerance of a coordinate.
    pub fn segments_near(&self, p: Pt, res: i32) -> Vec<(SegId, ConnId)> {
        let radius = 1 + res.max(0).div_euclid(self.cell) + 1;
        self.candidates_around(p, radius)
            .into_iter()
            .filter_map(|id| {
                let entry = self.entries.get(&id)?;
                if geom::point_near_segment(entry.a, entry.b, p, res) {
                    Some((id, entry.owner))
                } else {
                    None
                }
            })
            .collect()
    }

    /// Whether any registered segment other than those excluded passes
    /// through `p`. Used by the router for occupancy scoring.
    pub fn occupied(&self, p: Pt, exclude: &HashSet<SegId>) -> bool {
        self.segments_at(p)
            .iter()
            .any(|(id, _)| !exclude.contains(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix() -> RoutingMatrix {
        RoutingMatrix::new(10)
    }

    #[test]
    fn add_query_remove_roundtrip() {
        let mut m = matrix();
        m.add_segment(SegId(1), ConnId(1), Pt::new(0, 0), Pt::new(100, 0));
        assert_eq!(m.segments_at(Pt::new(50, 0)), vec![(SegId(1), ConnId(1))]);
        assert!(m.segments_at(Pt::new(50, 5)).is_empty());
        m.remove_segment(SegId(1));
        assert!(m.segments_at(Pt::new(50, 0)).is_empty());
        // Idempotent.
        m.remove_segment(SegId(1));
        assert!(m.is_empty());
    }

    #[test]
    fn near_query_respects_tolerance() {
        let mut m = matrix();
        m.add_segment(SegId(1), ConnId(1), Pt::new(0, 0), Pt::new(100, 0));
        assert_eq!(m.segments_near(Pt::new(50, 4), 5).len(), 1);
        assert!(m.segments_near(Pt::new(50, 8), 5).is_empty());
    }

    #[test]
    fn reregistration_replaces_span() {
        let mut m = matrix();
        m.add_segment(SegId(1), ConnId(1), Pt::new(0, 0), Pt::new(100, 0));
        m.add_segment(SegId(1), ConnId(1), Pt::new(0, 50), Pt::new(100, 50));
        assert!(m.segments_at(Pt::new(50, 0)).is_empty());
        assert_eq!(m.segments_at(Pt::new(50, 50)).len(), 1);
        assert_eq!(m.len(), 1);
    }

    #[test]
    fn owner_reassignment() {
        let mut m = matrix();
        m.add_segment(SegId(1), ConnId(1), Pt::new(0, 0), Pt::new(10, 0));
        m.set_owner(SegId(1), ConnId(7));
        assert_eq!(m.segments_at(Pt::new(5, 0)), vec![(SegId(1), ConnId(7))]);
    }
}
