pub mod drag;
pub mod geom;
pub mod matrix;
pub mod merge;
pub mod ports;
pub mod repair;
pub mod router;
pub mod split;

use std::collections::HashSet;
use std::fmt;

use crate::config::JumpMode;
use crate::model::{
    junctions_of, Canvas, ConnId, Connector, GroupId, ObjId, OrderEntry, PortId, Pt, SegId,
};

use drag::{generate_routing_start_nodes, regen_segments, remove_stubs};
use merge::short_and_merge_connectors;
use ports::{connect_coincident_ports, connect_ports};
use router::Router;
use split::split_connector_at_segments;

/// Failure of a public edit operation. Internal geometry errors during
/// reconciliation are bugs, not variants here: the engine does not roll
/// back partial mutations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    InvalidInput(String),
    NotFound(String),
    InvariantViolation(String),
}

impl fmt::Display for EditError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            Self::NotFound(msg) => write!(f, "not found: {msg}"),
            Self::InvariantViolation(msg) => write!(f, "invariant violation: {msg}"),
        }
    }
}

impl std::error::Error for EditError {}

/// The single reconciliation entry point every structural edit funnels
/// into: short-and-merge to a fixpoint (which repairs each master), then
/// reconcile the ports lying on each master. Connectors absorbed by an
/// earlier iteration's merge are skipped. Returns the surviving
/// connector ids.
pub fn assimilate(cnv: &mut Canvas, list: &[ConnId]) -> Vec<ConnId> {
    let mut absorbed: HashSet<ConnId> = HashSet::new();
    let mut finals: Vec<ConnId> = Vec::new();
    for &c in list {
        if absorbed.contains(&c) || cnv.conn_index(c).is_none() {
            continue;
        }
        let (masters, merged_away) = short_and_merge_connectors(cnv, &[c]);
        absorbed.extend(merged_away);
        for m in masters {
            let on_master: Vec<PortId> = cnv
                .ports
                .iter()
                .filter(|port| {
                    cnv.conn(m)
                        .map(|conn| {
                            conn.segments
                                .iter()
                                .any(|s| geom::point_on_segment(s.a, s.b, port.pos))
                        })
                        .unwrap_or(false)
                })
                .map(|port| port.id)
                .collect();
            connect_ports(cnv, Some(m), &on_master);
            if !finals.contains(&m) {
                finals.push(m);
            }
        }
    }
    finals
}

/// Create a connector from explicit segments (the non-interactive draw).
///
/// Inputs are grid-snapped first. Validation is strict: no zero-length
/// segments, and no endpoint of one segment may lie strictly inside
/// another segment of the same call (the caller must pre-split). Returns
/// the id of the connector the drawing ended up in after assimilation.
pub fn draw_connector(cnv: &mut Canvas, segs: &[(Pt, Pt)]) -> Result<ConnId, EditError> {
    if segs.is_empty() {
        return Err(EditError::InvalidInput("no segments given".to_string()));
    }
    let snapped: Vec<(Pt, Pt)> = segs
        .iter()
        .map(|(a, b)| (cnv.snap(*a), cnv.snap(*b)))
        .collect();
    for (a, b) in &snapped {
        if a == b {
            return Err(EditError::InvalidInput(format!(
                "zero-length segment at {a}"
            )));
        }
    }
    for (i, (a1, b1)) in snapped.iter().enumerate() {
        for e in [*a1, *b1] {
            for (j, (a2, b2)) in snapped.iter().enumerate() {
                if i != j && geom::point_inside_segment(*a2, *b2, e) {
                    return Err(EditError::InvariantViolation(format!(
                        "endpoint {e} lies inside another segment; pre-split required"
                    )));
                }
            }
        }
    }

    let id = cnv.alloc_conn_id();
    let segments: Vec<_> = snapped
        .iter()
        .map(|(a, b)| cnv.new_segment(*a, *b, None))
        .collect();
    let junctions = junctions_of(&segments);
    cnv.push_conn(Connector {
        id,
        order: 0,
        segments,
        ports: Vec::new(),
        junctions,
        vattr: None,
    });
    cnv.fix_order();

    let finals = assimilate(cnv, &[id]);
    if cnv.conn_index(id).is_some() {
        Ok(id)
    } else {
        finals
            .into_iter()
            .next()
            .ok_or_else(|| EditError::NotFound(format!("connector {id} vanished")))
    }
}

/// Add a port to an object at a grid-snapped position and reconcile it
/// against everything already there: a connector under the port is split
/// onto it, a coincident port is joined to it.
pub fn add_port(cnv: &mut Canvas, obj: ObjId, pos: Pt) -> Result<PortId, EditError> {
    if cnv.obj(obj).is_none() {
        return Err(EditError::NotFound(format!("object {obj}")));
    }
    let pos = cnv.snap(pos);
    let pid = cnv
        .insert_port(obj, pos)
        .ok_or_else(|| EditError::NotFound(format!("object {obj}")))?;
    connect_ports(cnv, None, &[pid]);
    connect_coincident_ports(cnv);
    Ok(pid)
}

fn snap_offset(cnv: &Canvas, dx: i32, dy: i32) -> (i32, i32) {
    let (gx, gy) = cnv.grid.pitch();
    (geom::snap_coord(dx, gx), geom::snap_coord(dy, gy))
}

/// Translate whole connectors. Port links are dropped up front (the wire
/// is leaving them behind); assimilation re-links whatever coincides at
/// the destination.
pub fn move_conn(cnv: &mut Canvas, list: &[ConnId], dx: i32, dy: i32) -> Result<(), EditError> {
    for id in list {
        if cnv.conn_index(*id).is_none() {
            return Err(EditError::NotFound(format!("connector {id}")));
        }
    }
    let (dx, dy) = snap_offset(cnv, dx, dy);
    for &id in list {
        let Some(ci) = cnv.conn_index(id) else {
            continue;
        };
        if cnv.conns[ci].segments.is_empty() {
            continue;
        }
        let pids = std::mem::take(&mut cnv.conns[ci].ports);
        for pid in pids {
            if let Some(port) = cnv.port_mut(pid) {
                port.conns.retain(|c| *c != id);
            }
        }
        for si in 0..cnv.conns[ci].segments.len() {
            let seg = &mut cnv.conns[ci].segments[si];
            seg.a = seg.a.offset(dx, dy);
            seg.b = seg.b.offset(dx, dy);
            let (sid, a, b) = (seg.id, seg.a, seg.b);
            cnv.matrix.add_segment(sid, id, a, b);
        }
        for junction in &mut cnv.conns[ci].junctions {
            *junction = junction.offset(dx, dy);
        }
    }
    assimilate(cnv, list);
    Ok(())
}

/// Move individual segments rigidly: carve them out into their own
/// connectors, then translate those.
pub fn move_segment(
    cnv: &mut Canvas,
    refs: &[(ConnId, usize)],
    dx: i32,
    dy: i32,
) -> Result<(), EditError> {
    let seg_ids = resolve_refs(cnv, refs)?;
    split_connector_at_segments(cnv, refs);
    let mut moving: Vec<ConnId> = Vec::new();
    for (_, sid) in seg_ids {
        if let Some((ci, _)) = cnv.seg_position(sid) {
            let id = cnv.conns[ci].id;
            if !moving.contains(&id) {
                moving.push(id);
            }
        }
    }
    move_conn(cnv, &moving, dx, dy)
}

/// Drag segments with re-routing: unselected neighbours either follow,
/// anchor a regenerated route, or are dropped as stubs (the one-shot
/// variant of the interactive drag).
pub fn drag_segment(
    cnv: &mut Canvas,
    refs: &[(ConnId, usize)],
    dx: i32,
    dy: i32,
    router: &dyn Router,
    jump: JumpMode,
) -> Result<(), EditError> {
    let selection = resolve_refs(cnv, refs)?;
    let (dx, dy) = snap_offset(cnv, dx, dy);
    let mut ctx = generate_routing_start_nodes(cnv, &selection, &[]);
    remove_stubs(cnv, &ctx);
    regen_segments(cnv, &mut ctx, dx, dy, router, jump);
    let conns = ctx.conns.clone();
    assimilate(cnv, &conns);
    Ok(())
}

pub(crate) fn resolve_refs(
    cnv: &Canvas,
    refs: &[(ConnId, usize)],
) -> Result<Vec<(ConnId, SegId)>, EditError> {
    let mut out = Vec::with_capacity(refs.len());
    for (conn, idx) in refs {
        let c = cnv
            .conn(*conn)
            .ok_or_else(|| EditError::NotFound(format!("connector {conn}")))?;
        let seg = c.segments.get(*idx).ok_or_else(|| {
            EditError::InvalidInput(format!("connector {conn} has no segment {idx}"))
        })?;
        out.push((*conn, seg.id));
    }
    Ok(out)
}

/// Move objects (expanding groups) together with their ports, re-routing
/// every wire end that terminated on a moved port.
pub fn move_obj(
    cnv: &mut Canvas,
    objs: &[ObjId],
    dx: i32,
    dy: i32,
    router: &dyn Router,
    jump: JumpMode,
) -> Result<(), EditError> {
    for id in objs {
        if cnv.obj(*id).is_none() {
            return Err(EditError::NotFound(format!("object {id}")));
        }
    }
    let (dx, dy) = snap_offset(cnv, dx, dy);
    if dx == 0 && dy == 0 {
        return Ok(());
    }

    // Expand group membership.
    let mut moving: Vec<ObjId> = Vec::new();
    for &id in objs {
        let members = cnv
            .obj(id)
            .and_then(|o| o.group)
            .and_then(|gid| cnv.groups.get(gid.0 as usize - 1).cloned())
            .unwrap_or_else(|| vec![id]);
        for member in members {
            if !moving.contains(&member) {
                moving.push(member);
            }
        }
    }

    let mut moved_ports: Vec<(PortId, Pt)> = Vec::new();
    for &id in &moving {
        if let Some(obj) = cnv.obj(id) {
            for pid in &obj.ports {
                if let Some(port) = cnv.port(*pid) {
                    moved_ports.push((*pid, port.pos));
                }
            }
        }
    }
    for &id in &moving {
        if let Some(obj) = cnv.obj_mut(id) {
            obj.start = obj.start.offset(dx, dy);
            obj.end = obj.end.offset(dx, dy);
        }
    }
    for (pid, _) in &moved_ports {
        if let Some(port) = cnv.port_mut(*pid) {
            port.pos = port.pos.offset(dx, dy);
        }
    }

    let affected = rewire_moved_ports(cnv, &moved_ports, dx, dy, router, jump);
    assimilate(cnv, &affected);
    Ok(())
}

/// Regenerate every wire end that terminated on a moved port. The ports
/// themselves have already been translated; `moved_ports` carries their
/// former positions. Returns the affected connectors for assimilation.
pub(crate) fn rewire_moved_ports(
    cnv: &mut Canvas,
    moved_ports: &[(PortId, Pt)],
    dx: i32,
    dy: i32,
    router: &dyn Router,
    jump: JumpMode,
) -> Vec<ConnId> {
    let mut affected: Vec<ConnId> = Vec::new();
    let mut rigidly_moved: HashSet<SegId> = HashSet::new();
    for (pid, old) in moved_ports {
        let conn_ids = cnv
            .port(*pid)
            .map(|p| p.conns.clone())
            .unwrap_or_default();
        for cid in conn_ids {
            let has_segments = cnv.conn(cid).map(|c| !c.segments.is_empty()).unwrap_or(false);
            if has_segments {
                reroute_port_chain(
                    cnv,
                    cid,
                    *old,
                    old.offset(dx, dy),
                    dx,
                    dy,
                    &mut rigidly_moved,
                    router,
                    jump,
                );
            }
            if !affected.contains(&cid) {
                affected.push(cid);
            }
        }
    }
    affected
}

/// Follow a wire from a moved port's former position to its first stable
/// node (junction, port, or dead end) and regenerate the run in between.
#[allow(clippy::too_many_arguments)]
fn reroute_port_chain(
    cnv: &mut Canvas,
    cid: ConnId,
    old: Pt,
    new_pos: Pt,
    dx: i32,
    dy: i32,
    rigidly_moved: &mut HashSet<SegId>,
    router: &dyn Router,
    jump: JumpMode,
) {
    let Some(ci) = cnv.conn_index(cid) else {
        return;
    };
    let incident: Vec<SegId> = cnv.conns[ci]
        .segments
        .iter()
        .filter(|s| s.touches(old))
        .map(|s| s.id)
        .collect();
    if incident.is_empty() {
        return;
    }
    if incident.len() >= 2 {
        // A junction sits on the port itself: stretch a fresh run from it.
        let mut out = Vec::new();
        router.generate(cnv, cid, old, new_pos, &mut out, jump);
        if let Some(conn) = cnv.conn_mut(cid) {
            conn.segments.extend(out);
        }
        return;
    }
    if rigidly_moved.contains(&incident[0]) {
        return;
    }

    let mut chain: Vec<SegId> = Vec::new();
    let mut visited: HashSet<SegId> = HashSet::new();
    let mut cur_seg = incident[0];
    let mut cur_pt = old;
    loop {
        let fresh = visited.insert(cur_seg);
        debug_assert!(fresh, "connector graph must be acyclic");
        if !fresh {
            return;
        }
        chain.push(cur_seg);
        let Some((ci, si)) = cnv.seg_position(cur_seg) else {
            return;
        };
        let far = cnv.conns[ci].segments[si].other_end(cur_pt);
        let others: Vec<SegId> = cnv.conns[ci]
            .segments
            .iter()
            .filter(|s| s.id != cur_seg && s.touches(far))
            .map(|s| s.id)
            .collect();
        let far_ports = cnv.ports_at(far);

        if others.is_empty() && far_ports.is_empty() {
            // The wire hangs off the moving port alone: carry it rigidly.
            for sid in &chain {
                if let Some((ci, si)) = cnv.seg_position(*sid) {
                    let owner = cnv.conns[ci].id;
                    let seg = &mut cnv.conns[ci].segments[si];
                    seg.a = seg.a.offset(dx, dy);
                    seg.b = seg.b.offset(dx, dy);
                    let (id, a, b) = (seg.id, seg.a, seg.b);
                    cnv.matrix.add_segment(id, owner, a, b);
                    rigidly_moved.insert(*sid);
                }
            }
            return;
        }
        if others.len() != 1 || !far_ports.is_empty() {
            // Stable anchor: delete the run and grow it again from here.
            for sid in &chain {
                if let Some((ci, si)) = cnv.seg_position(*sid) {
                    cnv.conns[ci].segments.remove(si);
                }
                cnv.unregister_seg(*sid);
            }
            let mut out = Vec::new();
            router.generate(cnv, cid, far, new_pos, &mut out, jump);
            if let Some(conn) = cnv.conn_mut(cid) {
                conn.segments.extend(out);
            }
            return;
        }
        cur_seg = others[0];
        cur_pt = far;
    }
}

/// Delete a connector outright, releasing its ports and matrix entries.
pub fn remove_conn(cnv: &mut Canvas, id: ConnId) -> Result<(), EditError> {
    let ci = cnv
        .conn_index(id)
        .ok_or_else(|| EditError::NotFound(format!("connector {id}")))?;
    let conn = cnv.conns.remove(ci);
    for pid in &conn.ports {
        if let Some(port) = cnv.port_mut(*pid) {
            port.conns.retain(|c| *c != id);
        }
    }
    for seg in &conn.segments {
        cnv.unregister_seg(seg.id);
    }
    cnv.remove_order_entry(OrderEntry::Conn(id));
    cnv.fix_order();
    Ok(())
}

/// Delete an object with its ports; connectors that terminated on those
/// ports are reconciled (a now-dangling stub may coalesce away).
pub fn remove_obj(cnv: &mut Canvas, id: ObjId) -> Result<(), EditError> {
    let oi = cnv
        .obj_index(id)
        .ok_or_else(|| EditError::NotFound(format!("object {id}")))?;
    let obj = cnv.objects.remove(oi);
    let mut affected: Vec<ConnId> = Vec::new();
    for pid in obj.ports {
        let Some(pi) = cnv.ports.iter().position(|p| p.id == pid) else {
            continue;
        };
        let port = cnv.ports.remove(pi);
        for cid in port.conns {
            if let Some(conn) = cnv.conn_mut(cid) {
                conn.ports.retain(|p| *p != pid);
            }
            if !affected.contains(&cid) {
                affected.push(cid);
            }
        }
    }
    if let Some(gid) = obj.group {
        if let Some(group) = cnv.groups.get_mut(gid.0 as usize - 1) {
            group.retain(|o| *o != id);
        }
    }
    cnv.remove_order_entry(OrderEntry::Object(id));
    cnv.fix_order();

    // Zero-segment connectors that lost a port dissolve entirely.
    let dissolve: Vec<ConnId> = affected
        .iter()
        .copied()
        .filter(|cid| {
            cnv.conn(*cid)
                .map(|c| c.segments.is_empty() && c.ports.len() < 2)
                .unwrap_or(false)
        })
        .collect();
    for cid in dissolve {
        remove_conn(cnv, cid)?;
        affected.retain(|c| *c != cid);
    }
    assimilate(cnv, &affected);
    Ok(())
}

/// Group objects so they move as one. Objects already grouped are pulled
/// out of their old group.
pub fn group_objects(cnv: &mut Canvas, objs: &[ObjId]) -> Result<GroupId, EditError> {
    if objs.len() < 2 {
        return Err(EditError::InvalidInput(
            "a group needs at least two objects".to_string(),
        ));
    }
    for id in objs {
        if cnv.obj(*id).is_none() {
            return Err(EditError::NotFound(format!("object {id}")));
        }
    }
    let gid = cnv.alloc_group_id();
    let mut members: Vec<ObjId> = Vec::new();
    for &id in objs {
        if let Some(old) = cnv.obj(id).and_then(|o| o.group) {
            if let Some(group) = cnv.groups.get_mut(old.0 as usize - 1) {
                group.retain(|o| *o != id);
            }
        }
        if let Some(obj) = cnv.obj_mut(id) {
            obj.group = Some(gid);
        }
        members.push(id);
    }
    cnv.groups.push(members);
    debug_assert_eq!(cnv.groups.len(), gid.0 as usize);
    Ok(gid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GridConfig, RouteMode};
    use crate::engine::router::OrthoRouter;
    use crate::model::ShapeKind;

    fn canvas() -> Canvas {
        Canvas::new(GridConfig {
            x: 1,
            y: 1,
            snap: false,
        })
    }

    #[test]
    fn draw_rejects_interior_touch() {
        let mut cnv = canvas();
        let err = draw_connector(
            &mut cnv,
            &[
                (Pt::new(0, 0), Pt::new(10, 0)),
                (Pt::new(5, 0), Pt::new(5, 10)),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, EditError::InvariantViolation(_)));
    }

    #[test]
    fn draw_rejects_zero_length() {
        let mut cnv = canvas();
        let err = draw_connector(&mut cnv, &[(Pt::new(3, 3), Pt::new(3, 3))]).unwrap_err();
        assert!(matches!(err, EditError::InvalidInput(_)));
    }

    #[test]
    fn draw_then_draw_touching_fuses() {
        let mut cnv = canvas();
        let a = draw_connector(&mut cnv, &[(Pt::new(0, 0), Pt::new(10, 0))]).unwrap();
        let b = draw_connector(&mut cnv, &[(Pt::new(10, 0), Pt::new(10, 10))]).unwrap();
        assert_eq!(a, b, "second draw is absorbed into the first connector");
        assert_eq!(cnv.conns.len(), 1);
        assert_eq!(cnv.conn(a).unwrap().segments.len(), 2);
    }

    #[test]
    fn assimilate_is_idempotent() {
        let mut cnv = canvas();
        let id = draw_connector(
            &mut cnv,
            &[
                (Pt::new(0, 0), Pt::new(10, 0)),
                (Pt::new(10, 0), Pt::new(10, 10)),
            ],
        )
        .unwrap();
        let before: Vec<_> = cnv
            .conn(id)
            .unwrap()
            .segments
            .iter()
            .map(|s| (s.a, s.b))
            .collect();
        assimilate(&mut cnv, &[id]);
        let after: Vec<_> = cnv
            .conn(id)
            .unwrap()
            .segments
            .iter()
            .map(|s| (s.a, s.b))
            .collect();
        assert_eq!(before, after);
        assert_eq!(cnv.conns.len(), 1);
    }

    #[test]
    fn move_conn_relinks_ports_at_destination() {
        let mut cnv = canvas();
        let obj = cnv.add_object(ShapeKind::Rect, Pt::new(20, -5), Pt::new(30, 5));
        let pid = add_port(&mut cnv, obj, Pt::new(20, 10)).unwrap();
        let id = draw_connector(&mut cnv, &[(Pt::new(0, 0), Pt::new(10, 0))]).unwrap();
        assert!(cnv.conn(id).unwrap().ports.is_empty());

        // Move the wire so its right end lands on the port.
        move_conn(&mut cnv, &[id], 10, 10).unwrap();
        assert_eq!(cnv.conn(id).unwrap().ports, vec![pid]);
        assert_eq!(cnv.port(pid).unwrap().conns, vec![id]);
    }

    #[test]
    fn remove_conn_releases_everything() {
        let mut cnv = canvas();
        let obj = cnv.add_object(ShapeKind::Rect, Pt::new(-5, -5), Pt::new(5, 5));
        let pid = add_port(&mut cnv, obj, Pt::new(0, 0)).unwrap();
        let id = draw_connector(&mut cnv, &[(Pt::new(0, 0), Pt::new(10, 0))]).unwrap();
        remove_conn(&mut cnv, id).unwrap();
        assert!(cnv.conns.is_empty());
        assert!(cnv.matrix.is_empty());
        assert!(cnv.port(pid).unwrap().conns.is_empty());
        assert!(cnv.order.iter().all(|e| !matches!(e, OrderEntry::Conn(_))));
    }

    #[test]
    fn move_obj_reroutes_to_anchored_far_end() {
        let mut cnv = canvas();
        let obj = cnv.add_object(ShapeKind::Rect, Pt::new(-10, -5), Pt::new(0, 5));
        let pid = add_port(&mut cnv, obj, Pt::new(0, 0)).unwrap();
        let far_obj = cnv.add_object(ShapeKind::Rect, Pt::new(40, 15), Pt::new(50, 25));
        let far_pid = add_port(&mut cnv, far_obj, Pt::new(40, 20)).unwrap();
        let id = draw_connector(
            &mut cnv,
            &[
                (Pt::new(0, 0), Pt::new(20, 0)),
                (Pt::new(20, 0), Pt::new(20, 20)),
                (Pt::new(20, 20), Pt::new(40, 20)),
            ],
        )
        .unwrap();
        let router = OrthoRouter::new(RouteMode::Orthogonal);
        move_obj(&mut cnv, &[obj], 0, 10, &router, JumpMode::None).unwrap();

        assert_eq!(cnv.port(pid).unwrap().pos, Pt::new(0, 10));
        let conn = cnv.conn(id).unwrap();
        assert!(conn.ports.contains(&pid));
        assert!(conn.ports.contains(&far_pid));
        // The anchored end stayed put and the wire reaches the moved port.
        assert!(conn.segments.iter().any(|s| s.touches(Pt::new(40, 20))));
        assert!(conn.segments.iter().any(|s| s.touches(Pt::new(0, 10))));
    }

    #[test]
    fn move_obj_carries_wire_anchored_nowhere_else() {
        let mut cnv = canvas();
        let obj = cnv.add_object(ShapeKind::Rect, Pt::new(-10, -5), Pt::new(0, 5));
        let pid = add_port(&mut cnv, obj, Pt::new(0, 0)).unwrap();
        let id = draw_connector(&mut cnv, &[(Pt::new(0, 0), Pt::new(20, 0))]).unwrap();
        let router = OrthoRouter::new(RouteMode::Orthogonal);
        move_obj(&mut cnv, &[obj], 0, 10, &router, JumpMode::None).unwrap();

        // Nothing anchors the far end, so the whole wire rides along.
        let conn = cnv.conn(id).unwrap();
        assert_eq!(conn.segments.len(), 1);
        assert!(conn.segments[0].touches(Pt::new(0, 10)));
        assert!(conn.segments[0].touches(Pt::new(20, 10)));
        assert!(conn.ports.contains(&pid));
    }

    #[test]
    fn grouped_objects_move_together() {
        let mut cnv = canvas();
        let a = cnv.add_object(ShapeKind::Rect, Pt::new(0, 0), Pt::new(10, 10));
        let b = cnv.add_object(ShapeKind::Rect, Pt::new(20, 0), Pt::new(30, 10));
        group_objects(&mut cnv, &[a, b]).unwrap();
        let router = OrthoRouter::new(RouteMode::Orthogonal);
        move_obj(&mut cnv, &[a], 5, 5, &router, JumpMode::None).unwrap();
        assert_eq!(cnv.obj(b).unwrap().start, Pt::new(25, 5));
    }

    #[test]
    fn move_segment_carves_and_translates() {
        let mut cnv = canvas();
        let id = draw_connector(
            &mut cnv,
            &[
                (Pt::new(0, 0), Pt::new(10, 0)),
                (Pt::new(10, 0), Pt::new(10, 10)),
                (Pt::new(10, 10), Pt::new(20, 10)),
            ],
        )
        .unwrap();
        move_segment(&mut cnv, &[(id, 1)], 100, 100).unwrap();
        // The carved-out middle segment is now its own connector far away;
        // the two leftover arms remain (still one remainder connector).
        assert!(cnv
            .conns
            .iter()
            .any(|c| c.segments.iter().any(|s| s.a.x >= 100 || s.b.x >= 100)));
    }
}
