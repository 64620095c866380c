use crate::engine::geom;
use crate::model::{junctions_of, Canvas, ConnId, Pt, Segment};

/// Normalise one connector so that no two of its segments overlap on the
/// same line beyond an endpoint, every touch point is a real endpoint of
/// every segment passing through it, and the junction list matches the
/// endpoint multiset. The three steps of this pass are mutually
/// reinforcing: coalescing can expose new touch points and splitting adds
/// endpoints to the multiset, so junctions are regenerated last.
pub fn repair_seg_and_junc(cnv: &mut Canvas, conn: ConnId, check_ports: bool) {
    coalesce_overlaps(cnv, conn, check_ports);
    split_at_touch_points(cnv, conn);
    if let Some(c) = cnv.conn_mut(conn) {
        c.junctions = junctions_of(&c.segments);
    }
}

/// An endpoint is dangling when nothing anchors it: no port sits there
/// and the only other segment ending there, if any, is collinear with the
/// owner. `check_ports` disables the port clause.
fn endpoint_dangling(
    cnv: &Canvas,
    segments: &[Segment],
    owner: &Segment,
    e: Pt,
    check_ports: bool,
) -> bool {
    if check_ports && !cnv.ports_at(e).is_empty() {
        return false;
    }
    let mut collinear_anchor = true;
    let mut others = 0usize;
    for seg in segments {
        if seg.id == owner.id || !seg.touches(e) {
            continue;
        }
        others += 1;
        if !geom::same_line(owner, seg) {
            collinear_anchor = false;
        }
    }
    others == 0 || (others == 1 && collinear_anchor)
}

/// Phase A: collapse collinear overlap between segment pairs.
///
/// The pair analysis is folded by sorting the four endpoints along the
/// shared line: the covered span is rebuilt broken only at interior
/// endpoints that are not dangling. A pair whose rebuild equals the pair
/// itself is left alone, which keeps the scan terminating.
fn coalesce_overlaps(cnv: &mut Canvas, conn_id: ConnId, check_ports: bool) {
    'restart: loop {
        let Some(ci) = cnv.conn_index(conn_id) else {
            return;
        };
        let count = cnv.conns[ci].segments.len();
        for i in 0..count {
            for j in (i + 1)..count {
                let s1 = cnv.conns[ci].segments[i].clone();
                let s2 = cnv.conns[ci].segments[j].clone();
                if !geom::same_line(&s1, &s2) {
                    continue;
                }
                let Some(chain) =
                    overlap_chain(cnv, &cnv.conns[ci].segments, &s1, &s2, check_ports)
                else {
                    continue;
                };
                if chain_matches_pair(&chain, &s1, &s2) {
                    continue;
                }

                let vattr = s1.vattr.clone().or_else(|| s2.vattr.clone());
                let mut replacement: Vec<Segment> = Vec::with_capacity(chain.len() - 1);
                for pair in chain.windows(2) {
                    if pair[0] == pair[1] {
                        continue;
                    }
                    replacement.push(cnv.new_segment(pair[0], pair[1], vattr.clone()));
                }

                cnv.unregister_seg(s1.id);
                cnv.unregister_seg(s2.id);
                for seg in &replacement {
                    cnv.register_seg(conn_id, seg);
                }
                let conn = &mut cnv.conns[ci];
                conn.segments.remove(j);
                conn.segments.remove(i);
                for (offset, seg) in replacement.into_iter().enumerate() {
                    conn.segments.insert(i + offset, seg);
                }
                continue 'restart;
            }
        }
        return;
    }
}

/// The replacement chain for a same-line pair, or `None` when the pair is
/// disjoint along the line. The chain runs from the low end of the union
/// span to the high end, broken at non-dangling interior endpoints.
fn overlap_chain(
    cnv: &Canvas,
    segments: &[Segment],
    s1: &Segment,
    s2: &Segment,
    check_ports: bool,
) -> Option<Vec<Pt>> {
    let key = geom::line_key(s1.a, s1.b);
    let t = |p: Pt| geom::axis_value(p, key);
    let (s1_lo, s1_hi) = {
        let (a, b) = span(s1, key);
        (t(a), t(b))
    };
    let (s2_lo, s2_hi) = {
        let (a, b) = span(s2, key);
        (t(a), t(b))
    };
    if s1_hi < s2_lo || s2_hi < s1_lo {
        return None;
    }
    let lo = s1_lo.min(s2_lo);
    let hi = s1_hi.max(s2_hi);

    let mut points = vec![s1.a, s1.b, s2.a, s2.b];
    points.sort_by_key(|p| t(*p));
    points.dedup();

    let mut chain: Vec<Pt> = Vec::with_capacity(points.len());
    for p in points {
        let interior = t(p) > lo && t(p) < hi;
        if interior {
            let owner = if s1.touches(p) { s1 } else { s2 };
            if endpoint_dangling(cnv, segments, owner, p, check_ports) {
                continue;
            }
        }
        chain.push(p);
    }
    Some(chain)
}

fn span(seg: &Segment, key: geom::LineKey) -> (Pt, Pt) {
    if geom::axis_value(seg.a, key) <= geom::axis_value(seg.b, key) {
        (seg.a, seg.b)
    } else {
        (seg.b, seg.a)
    }
}

/// Whether rebuilding the chain would reproduce the pair unchanged.
fn chain_matches_pair(chain: &[Pt], s1: &Segment, s2: &Segment) -> bool {
    if chain.len() != 3 {
        return false;
    }
    let mut rebuilt = [
        normalize(chain[0], chain[1]),
        normalize(chain[1], chain[2]),
    ];
    let mut pair = [normalize(s1.a, s1.b), normalize(s2.a, s2.b)];
    rebuilt.sort();
    pair.sort();
    rebuilt == pair
}

fn normalize(a: Pt, b: Pt) -> (Pt, Pt) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Phase B: wherever a segment endpoint of the connector lies strictly
/// inside another segment of the same connector, split that segment so
/// the touch point becomes a shared endpoint (the T-junction rule).
fn split_at_touch_points(cnv: &mut Canvas, conn_id: ConnId) {
    loop {
        let Some(ci) = cnv.conn_index(conn_id) else {
            return;
        };
        let mut split: Option<(usize, Pt)> = None;
        'scan: for seg in &cnv.conns[ci].segments {
            for e in seg.endpoints() {
                for (k, target) in cnv.conns[ci].segments.iter().enumerate() {
                    if geom::point_inside_segment(target.a, target.b, e) {
                        split = Some((k, e));
                        break 'scan;
                    }
                }
            }
        }
        let Some((k, at)) = split else {
            return;
        };

        let old = cnv.conns[ci].segments[k].clone();
        let first = cnv.new_segment(old.a, at, old.vattr.clone());
        let second = cnv.new_segment(at, old.b, old.vattr.clone());
        cnv.unregister_seg(old.id);
        cnv.register_seg(conn_id, &first);
        cnv.register_seg(conn_id, &second);
        let conn = &mut cnv.conns[ci];
        conn.segments.remove(k);
        conn.segments.insert(k, second);
        conn.segments.insert(k, first);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GridConfig;
    use crate::model::{Connector, ShapeKind};

    fn canvas_with_conn(segs: &[(i32, i32, i32, i32)]) -> (Canvas, ConnId) {
        let mut cnv = Canvas::new(GridConfig {
            x: 1,
            y: 1,
            snap: false,
        });
        let id = cnv.alloc_conn_id();
        let segments = segs
            .iter()
            .map(|(x1, y1, x2, y2)| {
                cnv.new_segment(Pt::new(*x1, *y1), Pt::new(*x2, *y2), None)
            })
            .collect();
        cnv.push_conn(Connector {
            id,
            order: 0,
            segments,
            ports: Vec::new(),
            junctions: Vec::new(),
            vattr: None,
        });
        (cnv, id)
    }

    fn seg_pairs(cnv: &Canvas, id: ConnId) -> Vec<(Pt, Pt)> {
        cnv.conn(id)
            .unwrap()
            .segments
            .iter()
            .map(|s| normalize(s.a, s.b))
            .collect()
    }

    #[test]
    fn dangling_collinear_pair_coalesces() {
        let (mut cnv, id) = canvas_with_conn(&[(0, 0, 5, 0), (5, 0, 10, 0)]);
        repair_seg_and_junc(&mut cnv, id, true);
        assert_eq!(seg_pairs(&cnv, id), vec![(Pt::new(0, 0), Pt::new(10, 0))]);
        assert!(cnv.conn(id).unwrap().junctions.is_empty());
    }

    #[test]
    fn anchored_touch_point_is_preserved() {
        // The vertical stub anchors (5,0): the horizontal halves stay split.
        let (mut cnv, id) = canvas_with_conn(&[(0, 0, 5, 0), (5, 0, 10, 0), (5, 0, 5, 10)]);
        repair_seg_and_junc(&mut cnv, id, true);
        let segs = seg_pairs(&cnv, id);
        assert_eq!(segs.len(), 3);
        assert_eq!(cnv.conn(id).unwrap().junctions, vec![Pt::new(5, 0)]);
    }

    #[test]
    fn t_touch_materialises_junction() {
        let (mut cnv, id) = canvas_with_conn(&[(0, 0, 10, 0), (5, 0, 5, 10)]);
        repair_seg_and_junc(&mut cnv, id, true);
        let segs = seg_pairs(&cnv, id);
        assert_eq!(
            segs,
            vec![
                (Pt::new(0, 0), Pt::new(5, 0)),
                (Pt::new(5, 0), Pt::new(10, 0)),
                (Pt::new(5, 0), Pt::new(5, 10)),
            ]
        );
        assert_eq!(cnv.conn(id).unwrap().junctions, vec![Pt::new(5, 0)]);
    }

    #[test]
    fn duplicate_segment_collapses() {
        let (mut cnv, id) = canvas_with_conn(&[(0, 0, 10, 0), (10, 0, 0, 0)]);
        repair_seg_and_junc(&mut cnv, id, true);
        assert_eq!(seg_pairs(&cnv, id), vec![(Pt::new(0, 0), Pt::new(10, 0))]);
    }

    #[test]
    fn contained_overlap_is_flattened() {
        let (mut cnv, id) = canvas_with_conn(&[(0, 0, 10, 0), (4, 0, 6, 0)]);
        repair_seg_and_junc(&mut cnv, id, true);
        // (4,0) and (6,0) anchor nothing, so the union collapses fully.
        assert_eq!(seg_pairs(&cnv, id), vec![(Pt::new(0, 0), Pt::new(10, 0))]);
    }

    #[test]
    fn port_anchors_endpoint_against_coalescing() {
        let (mut cnv, id) = canvas_with_conn(&[(0, 0, 5, 0), (5, 0, 10, 0)]);
        let obj = cnv.add_object(ShapeKind::Rect, Pt::new(0, 0), Pt::new(5, 5));
        cnv.insert_port(obj, Pt::new(5, 0)).unwrap();
        repair_seg_and_junc(&mut cnv, id, true);
        assert_eq!(seg_pairs(&cnv, id).len(), 2);
        // With port checking disabled the same pair merges.
        let (mut cnv2, id2) = canvas_with_conn(&[(0, 0, 5, 0), (5, 0, 10, 0)]);
        let obj2 = cnv2.add_object(ShapeKind::Rect, Pt::new(0, 0), Pt::new(5, 5));
        cnv2.insert_port(obj2, Pt::new(5, 0)).unwrap();
        repair_seg_and_junc(&mut cnv2, id2, false);
        assert_eq!(seg_pairs(&cnv2, id2).len(), 1);
    }

    #[test]
    fn matrix_tracks_replacements() {
        let (mut cnv, id) = canvas_with_conn(&[(0, 0, 5, 0), (5, 0, 10, 0)]);
        repair_seg_and_junc(&mut cnv, id, true);
        let conn = cnv.conn(id).unwrap();
        assert_eq!(cnv.matrix.len(), conn.segments.len());
        for seg in &conn.segments {
            assert!(cnv.matrix.contains(seg.id));
        }
    }
}
