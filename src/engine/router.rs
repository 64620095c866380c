use std::collections::HashSet;

use crate::config::{JumpMode, RouteMode};
use crate::model::{Canvas, ConnId, Pt, Segment};
use crate::vattr::VisAttr;

/// The routing contract consumed by the connector engine.
///
/// An implementation appends one or more segments to `out` routing from
/// `start` to as close to `end` as it can reach given current occupancy,
/// registers each produced segment with the routing matrix, and returns
/// the coordinate actually reached.
pub trait Router {
    fn generate(
        &self,
        cnv: &mut Canvas,
        owner: ConnId,
        start: Pt,
        end: Pt,
        out: &mut Vec<Segment>,
        jump: JumpMode,
    ) -> Pt;
}

/// Default router: straight-line or orthogonal L/Z candidates, picked by
/// occupancy score over the routing matrix, fewest bends as tie-break.
#[derive(Debug, Clone, Copy)]
pub struct OrthoRouter {
    pub mode: RouteMode,
}

impl OrthoRouter {
    pub fn new(mode: RouteMode) -> Self {
        Self { mode }
    }

    fn candidates(start: Pt, end: Pt) -> Vec<Vec<Pt>> {
        if start.x == end.x || start.y == end.y {
            return vec![vec![start, end]];
        }
        let mid_x = (start.x + end.x) / 2;
        let mid_y = (start.y + end.y) / 2;
        vec![
            vec![start, Pt::new(end.x, start.y), end],
            vec![start, Pt::new(start.x, end.y), end],
            vec![start, Pt::new(mid_x, start.y), Pt::new(mid_x, end.y), end],
            vec![start, Pt::new(start.x, mid_y), Pt::new(end.x, mid_y), end],
        ]
    }

    fn occupancy_score(cnv: &Canvas, path: &[Pt]) -> u32 {
        let (gx, gy) = cnv.grid.pitch();
        let step = gx.max(gy).max(1) as f64;
        let none: HashSet<crate::model::SegId> = HashSet::new();
        let mut score = 0u32;
        for pair in path.windows(2) {
            let dx = (pair[1].x - pair[0].x) as f64;
            let dy = (pair[1].y - pair[0].y) as f64;
            let span = dx.abs().max(dy.abs());
            let steps = ((span / step).ceil() as usize).max(1);
            for i in 0..=steps {
                let t = i as f64 / steps as f64;
                let p = Pt::new(
                    (pair[0].x as f64 + dx * t).round() as i32,
                    (pair[0].y as f64 + dy * t).round() as i32,
                );
                if cnv.matrix.occupied(p, &none) {
                    score += 1;
                }
            }
        }
        score
    }

    fn bend_count(path: &[Pt]) -> usize {
        path.len().saturating_sub(2)
    }

    /// Grid points strictly inside an axis-aligned leg where an existing
    /// wire already sits, expressed as offsets along the leg.
    fn crossing_offsets(cnv: &Canvas, a: Pt, b: Pt) -> Vec<i32> {
        let vertical = a.x == b.x;
        let (gx, gy) = cnv.grid.pitch();
        let step = if vertical { gy.max(1) } else { gx.max(1) };
        let (axis_a, axis_b) = if vertical { (a.y, b.y) } else { (a.x, b.x) };
        let dir = if axis_b >= axis_a { 1 } else { -1 };
        let len = (axis_b - axis_a).abs();
        let mut out = Vec::new();
        let mut s = step;
        while s < len {
            let p = if vertical {
                Pt::new(a.x, axis_a + s * dir)
            } else {
                Pt::new(axis_a + s * dir, a.y)
            };
            if !cnv.matrix.segments_at(p).is_empty() {
                out.push(s);
            }
            s += step;
        }
        out
    }

    /// Break a routed leg into plain spans and jump-cross hops over the
    /// wires it crosses. `None` keeps the leg whole; `Marked` stamps the
    /// hops with the jump attribute, `Plain` emits them bare. Oblique
    /// legs are never carved.
    fn leg_pieces(cnv: &Canvas, a: Pt, b: Pt, jump: JumpMode) -> Vec<(Pt, Pt, Option<VisAttr>)> {
        if jump == JumpMode::None || (a.x != b.x && a.y != b.y) {
            return vec![(a, b, None)];
        }
        let crossings = Self::crossing_offsets(cnv, a, b);
        if crossings.is_empty() {
            return vec![(a, b, None)];
        }

        let vertical = a.x == b.x;
        let (gx, gy) = cnv.grid.pitch();
        let hop = gx.max(gy).max(1);
        let hop_attr = match jump {
            JumpMode::Marked => Some(VisAttr::jump_marker()),
            _ => None,
        };
        let (axis_a, axis_b) = if vertical { (a.y, b.y) } else { (a.x, b.x) };
        let dir = if axis_b >= axis_a { 1 } else { -1 };
        let len = (axis_b - axis_a).abs();
        let at = |s: i32| {
            if vertical {
                Pt::new(a.x, axis_a + s * dir)
            } else {
                Pt::new(axis_a + s * dir, a.y)
            }
        };

        // One hop window per crossing, overlapping windows merged.
        let mut windows: Vec<(i32, i32)> = Vec::new();
        for s in crossings {
            let (lo, hi) = ((s - hop).max(0), (s + hop).min(len));
            match windows.last_mut() {
                Some((_, prev_hi)) if lo <= *prev_hi => *prev_hi = (*prev_hi).max(hi),
                _ => windows.push((lo, hi)),
            }
        }

        let mut pieces: Vec<(Pt, Pt, Option<VisAttr>)> = Vec::new();
        let mut cur = 0;
        for (lo, hi) in windows {
            if lo > cur {
                pieces.push((at(cur), at(lo), None));
            }
            pieces.push((at(lo), at(hi), hop_attr.clone()));
            cur = hi;
        }
        if cur < len {
            pieces.push((at(cur), at(len), None));
        }
        pieces
    }
}

impl Router for OrthoRouter {
    fn generate(
        &self,
        cnv: &mut Canvas,
        owner: ConnId,
        start: Pt,
        end: Pt,
        out: &mut Vec<Segment>,
        jump: JumpMode,
    ) -> Pt {
        if start == end {
            return start;
        }

        let path = match self.mode {
            RouteMode::Direct => vec![start, end],
            RouteMode::Orthogonal => {
                let mut best: Option<(u32, usize, Vec<Pt>)> = None;
                for candidate in Self::candidates(start, end) {
                    let score = Self::occupancy_score(cnv, &candidate);
                    let bends = Self::bend_count(&candidate);
                    let better = match &best {
                        None => true,
                        Some((bs, bb, _)) => score < *bs || (score == *bs && bends < *bb),
                    };
                    if better {
                        best = Some((score, bends, candidate));
                    }
                }
                best.map(|(_, _, path)| path).unwrap_or(vec![start, end])
            }
        };

        for pair in path.windows(2) {
            if pair[0] == pair[1] {
                continue;
            }
            for (a, b, vattr) in Self::leg_pieces(cnv, pair[0], pair[1], jump) {
                if a == b {
                    continue;
                }
                let seg = cnv.new_segment(a, b, vattr);
                cnv.register_seg(owner, &seg);
                out.push(seg);
            }
        }
        end
    }
}
