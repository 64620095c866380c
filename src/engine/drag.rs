use std::collections::HashSet;

use crate::config::JumpMode;
use crate::engine::router::Router;
use crate::model::{Canvas, ConnId, ObjId, Pt, SegId};

/// Which endpoint of the reference segment a drag node re-routes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegEnd {
    A,
    B,
}

/// An anchor from which the router regenerates a wire run each frame of
/// a drag: the wire is re-drawn from `anchor` to the moved position of
/// the reference segment's endpoint.
#[derive(Debug, Clone, Copy)]
pub struct DragNode {
    pub conn: ConnId,
    pub anchor: Pt,
    pub seg: SegId,
    pub end: SegEnd,
}

/// Everything a segment drag needs to carry between frames.
#[derive(Debug, Default)]
pub struct DragContext {
    /// Segments being dragged, including any pulled in transitively.
    pub selected: Vec<(ConnId, SegId)>,
    pub nodes: Vec<DragNode>,
    /// Single-use stubs that no longer anchor anything once the drag
    /// starts; deleted up front.
    pub stubs: Vec<(ConnId, SegId)>,
    /// Connectors touched by the drag, for the closing assimilation.
    pub conns: Vec<ConnId>,
    /// Router output of the previous frame, replaced every frame.
    pub routed: Vec<(ConnId, SegId)>,
}

impl DragContext {
    fn push_node(&mut self, node: DragNode) {
        let exists = self.nodes.iter().any(|n| {
            n.anchor == node.anchor && n.seg == node.seg && n.end == node.end
        });
        if !exists {
            self.nodes.push(node);
        }
    }

    fn push_conn(&mut self, conn: ConnId) {
        if !self.conns.contains(&conn) {
            self.conns.push(conn);
        }
    }
}

/// Classify every endpoint of the selected segments: decide which
/// adjacent wires move along, which anchor a re-route, and which are
/// stubs to delete. `obj_list` names the objects moving together with
/// the selection, so their ports do not anchor anything.
pub fn generate_routing_start_nodes(
    cnv: &Canvas,
    selection: &[(ConnId, SegId)],
    obj_list: &[ObjId],
) -> DragContext {
    let mut ctx = DragContext {
        selected: selection.to_vec(),
        ..DragContext::default()
    };
    let mut sel_set: HashSet<SegId> = selection.iter().map(|(_, s)| *s).collect();
    let mut stub_set: HashSet<SegId> = HashSet::new();

    let mut i = 0;
    while i < ctx.selected.len() {
        let (conn_id, seg_id) = ctx.selected[i];
        i += 1;
        ctx.push_conn(conn_id);
        let Some((ci, si)) = cnv.seg_position(seg_id) else {
            continue;
        };
        let seg = cnv.conns[ci].segments[si].clone();

        for (end, pt) in [(SegEnd::A, seg.a), (SegEnd::B, seg.b)] {
            let adj: Vec<SegId> = cnv
                .conns[ci]
                .segments
                .iter()
                .filter(|s| s.id != seg_id && s.touches(pt))
                .map(|s| s.id)
                .collect();
            let adj_all_selected = adj.iter().all(|id| sel_set.contains(id));
            let prts = cnv.ports_at(pt);
            let all_owned = !prts.is_empty()
                && prts.iter().all(|pid| {
                    cnv.port(*pid)
                        .map(|p| obj_list.contains(&p.obj))
                        .unwrap_or(false)
                });

            if adj_all_selected && adj.len() != 1 {
                // The whole neighbourhood moves (or nothing is attached):
                // only an unowned port can still demand a route.
                if !prts.is_empty() && !all_owned {
                    ctx.push_node(DragNode {
                        conn: conn_id,
                        anchor: pt,
                        seg: seg_id,
                        end,
                    });
                }
                continue;
            }

            if adj.len() >= 2 || (!prts.is_empty() && !all_owned) {
                // A junction, or an anchoring port: route from here.
                ctx.push_node(DragNode {
                    conn: conn_id,
                    anchor: pt,
                    seg: seg_id,
                    end,
                });
            } else if adj.len() == 1 {
                let t_id = adj[0];
                if sel_set.contains(&t_id) || stub_set.contains(&t_id) {
                    continue;
                }
                let Some((_, ti)) = cnv.seg_position(t_id) else {
                    continue;
                };
                let t = cnv.conns[ci].segments[ti].clone();
                let far = t.other_end(pt);
                let others_at_far: Vec<SegId> = cnv
                    .conns[ci]
                    .segments
                    .iter()
                    .filter(|s| s.id != t_id && s.touches(far))
                    .map(|s| s.id)
                    .collect();

                if !others_at_far.is_empty()
                    && others_at_far.iter().all(|id| sel_set.contains(id))
                {
                    // t links selected geometry on both sides: drag it too.
                    sel_set.insert(t_id);
                    ctx.selected.push((conn_id, t_id));
                } else {
                    // t is a one-shot link; its far end is the anchor.
                    ctx.push_node(DragNode {
                        conn: conn_id,
                        anchor: far,
                        seg: seg_id,
                        end,
                    });
                    stub_set.insert(t_id);
                    ctx.stubs.push((conn_id, t_id));
                }
            }
        }
    }
    ctx
}

/// Remove the stub segments collected by node generation. Run once when
/// the drag begins.
pub fn remove_stubs(cnv: &mut Canvas, ctx: &DragContext) {
    for (_, seg_id) in &ctx.stubs {
        if let Some((ci, si)) = cnv.seg_position(*seg_id) {
            cnv.conns[ci].segments.remove(si);
        }
        cnv.unregister_seg(*seg_id);
    }
}

/// One frame of drag regeneration: drop the previous frame's routed
/// segments, shift the selection by the frame offset, then re-route every
/// drag node to the moved endpoint of its reference segment.
///
/// The routed connector's own segments are pulled from the routing matrix
/// around the router call so the router only sees foreign occupancy; the
/// matrix is coherent again by the time this returns.
pub fn regen_segments(
    cnv: &mut Canvas,
    ctx: &mut DragContext,
    dx: i32,
    dy: i32,
    router: &dyn Router,
    jump: JumpMode,
) {
    for (_, seg_id) in ctx.routed.drain(..) {
        if let Some((ci, si)) = cnv.seg_position(seg_id) {
            cnv.conns[ci].segments.remove(si);
        }
        cnv.unregister_seg(seg_id);
    }

    for (_, seg_id) in &ctx.selected {
        let Some((ci, si)) = cnv.seg_position(*seg_id) else {
            continue;
        };
        let owner = cnv.conns[ci].id;
        let seg = &mut cnv.conns[ci].segments[si];
        seg.a = seg.a.offset(dx, dy);
        seg.b = seg.b.offset(dx, dy);
        let (id, a, b) = (seg.id, seg.a, seg.b);
        cnv.matrix.add_segment(id, owner, a, b);
    }

    for n in 0..ctx.nodes.len() {
        let node = ctx.nodes[n];
        let Some((ci, si)) = cnv.seg_position(node.seg) else {
            continue;
        };
        let owner = cnv.conns[ci].id;
        let target = {
            let seg = &cnv.conns[ci].segments[si];
            match node.end {
                SegEnd::A => seg.a,
                SegEnd::B => seg.b,
            }
        };

        let resident: Vec<(SegId, Pt, Pt)> = cnv
            .conns[ci]
            .segments
            .iter()
            .map(|s| (s.id, s.a, s.b))
            .collect();
        for (id, _, _) in &resident {
            cnv.matrix.remove_segment(*id);
        }
        let mut out = Vec::new();
        router.generate(cnv, owner, node.anchor, target, &mut out, jump);
        for (id, a, b) in resident {
            cnv.matrix.add_segment(id, owner, a, b);
        }

        if let Some(conn) = cnv.conn_mut(owner) {
            for seg in out {
                ctx.routed.push((owner, seg.id));
                conn.segments.push(seg);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GridConfig;
    use crate::model::{Connector, ShapeKind};

    fn canvas() -> Canvas {
        Canvas::new(GridConfig {
            x: 1,
            y: 1,
            snap: false,
        })
    }

    fn add_conn(cnv: &mut Canvas, segs: &[(i32, i32, i32, i32)]) -> ConnId {
        let id = cnv.alloc_conn_id();
        let segments = segs
            .iter()
            .map(|(x1, y1, x2, y2)| cnv.new_segment(Pt::new(*x1, *y1), Pt::new(*x2, *y2), None))
            .collect();
        cnv.push_conn(Connector {
            id,
            order: 0,
            segments,
            ports: Vec::new(),
            junctions: Vec::new(),
            vattr: None,
        });
        id
    }

    #[test]
    fn junction_neighbour_becomes_drag_node() {
        let mut cnv = canvas();
        // A junction at (10,0): dragging the left arm must anchor there.
        let id = add_conn(
            &mut cnv,
            &[(0, 0, 10, 0), (10, 0, 20, 0), (10, 0, 10, 10)],
        );
        let first = cnv.conn(id).unwrap().segments[0].id;
        let ctx = generate_routing_start_nodes(&cnv, &[(id, first)], &[]);
        assert_eq!(ctx.nodes.len(), 1);
        assert_eq!(ctx.nodes[0].anchor, Pt::new(10, 0));
        assert!(ctx.stubs.is_empty());
    }

    #[test]
    fn single_link_becomes_stub_with_far_anchor() {
        let mut cnv = canvas();
        // Chain of three; dragging the first means the middle one is a
        // stub and the route re-grows from its far end.
        let id = add_conn(&mut cnv, &[(0, 0, 10, 0), (10, 0, 10, 10), (10, 10, 20, 10)]);
        let segs: Vec<SegId> = cnv.conn(id).unwrap().segments.iter().map(|s| s.id).collect();
        let ctx = generate_routing_start_nodes(&cnv, &[(id, segs[0])], &[]);
        assert_eq!(ctx.stubs.len(), 1);
        assert_eq!(ctx.stubs[0].1, segs[1]);
        assert_eq!(ctx.nodes.len(), 1);
        assert_eq!(ctx.nodes[0].anchor, Pt::new(10, 10));
    }

    #[test]
    fn owned_port_does_not_anchor() {
        let mut cnv = canvas();
        let id = add_conn(&mut cnv, &[(0, 0, 10, 0)]);
        let obj = cnv.add_object(ShapeKind::Rect, Pt::new(-5, -5), Pt::new(0, 5));
        let pid = cnv.insert_port(obj, Pt::new(0, 0)).unwrap();
        cnv.conn_mut(id).unwrap().ports.push(pid);
        cnv.port_mut(pid).unwrap().conns.push(id);
        let seg = cnv.conn(id).unwrap().segments[0].id;

        // Port's object moves with the drag: the wire end follows freely.
        let ctx = generate_routing_start_nodes(&cnv, &[(id, seg)], &[obj]);
        assert!(ctx.nodes.is_empty());

        // Port's object stays put: its coordinate anchors a route.
        let ctx = generate_routing_start_nodes(&cnv, &[(id, seg)], &[]);
        assert_eq!(ctx.nodes.len(), 1);
        assert_eq!(ctx.nodes[0].anchor, Pt::new(0, 0));
    }

    #[test]
    fn bridge_between_selected_segments_is_pulled_in() {
        let mut cnv = canvas();
        let id = add_conn(&mut cnv, &[(0, 0, 10, 0), (10, 0, 10, 10), (10, 10, 20, 10)]);
        let segs: Vec<SegId> = cnv.conn(id).unwrap().segments.iter().map(|s| s.id).collect();
        let ctx = generate_routing_start_nodes(&cnv, &[(id, segs[0]), (id, segs[2])], &[]);
        assert!(ctx.selected.iter().any(|(_, s)| *s == segs[1]));
        assert!(ctx.nodes.is_empty());
        assert!(ctx.stubs.is_empty());
    }

    #[test]
    fn regen_moves_selection_and_routes_from_anchor() {
        let mut cnv = canvas();
        let id = add_conn(&mut cnv, &[(0, 0, 10, 0), (10, 0, 20, 0)]);
        let segs: Vec<SegId> = cnv.conn(id).unwrap().segments.iter().map(|s| s.id).collect();
        let mut ctx = generate_routing_start_nodes(&cnv, &[(id, segs[0])], &[]);
        remove_stubs(&mut cnv, &ctx);
        let router = crate::engine::router::OrthoRouter::new(crate::config::RouteMode::Orthogonal);
        regen_segments(&mut cnv, &mut ctx, 0, 5, &router, JumpMode::None);

        let conn = cnv.conn(id).unwrap();
        let moved = conn.segments.iter().find(|s| s.id == segs[0]).unwrap();
        assert_eq!(moved.a, Pt::new(0, 5));
        assert_eq!(moved.b, Pt::new(10, 5));
        assert!(!ctx.routed.is_empty());
        // Matrix mirrors the model.
        assert_eq!(cnv.matrix.len(), conn.segments.len());
    }
}
