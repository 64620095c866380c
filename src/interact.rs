use std::error::Error;

use crate::config::{Config, RouterConfig};
use crate::engine::drag::{generate_routing_start_nodes, regen_segments, remove_stubs, DragContext};
use crate::engine::router::OrthoRouter;
use crate::engine::{self, EditError};
use crate::model::{Canvas, ConnId, ObjId, OrderEntry, PortId, Pt};

// ── Hooks ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookKey {
    MouseClickPre,
    MouseClickPost,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookId(u64);

#[derive(Debug, Clone, Copy)]
pub struct HookEvent {
    pub key: HookKey,
    pub pos: Pt,
}

type HookFn = Box<dyn FnMut(&HookEvent) -> Result<(), Box<dyn Error>>>;

/// Third-party callbacks at the event boundaries of interactive ops.
/// Fired in reverse registration order; a failing hook is swallowed so it
/// can never corrupt an edit in progress.
#[derive(Default)]
pub struct HookRegistry {
    entries: Vec<(HookId, HookKey, HookFn)>,
    next: u64,
}

impl HookRegistry {
    pub fn register(&mut self, key: HookKey, hook: HookFn) -> HookId {
        self.next += 1;
        let id = HookId(self.next);
        self.entries.push((id, key, hook));
        id
    }

    pub fn unregister(&mut self, id: HookId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(hid, _, _)| *hid != id);
        self.entries.len() != before
    }

    pub fn fire(&mut self, event: &HookEvent) {
        for (_, key, hook) in self.entries.iter_mut().rev() {
            if *key == event.key {
                let _ = hook(event);
            }
        }
    }
}

impl std::fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookRegistry")
            .field("entries", &self.entries.len())
            .finish()
    }
}

// ── Interactive operations ──────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpMode {
    Idle,
    DrawConn,
    MoveConn,
    DragSeg,
    MoveObj,
}

#[derive(Debug)]
enum OpState {
    Draw {
        points: Vec<Pt>,
    },
    MoveConn {
        list: Vec<ConnId>,
        last: Option<Pt>,
    },
    DragSeg {
        ctx: DragContext,
        last: Option<Pt>,
    },
    MoveObj {
        moved_ports: Vec<(PortId, Pt)>,
        objs: Vec<ObjId>,
        total: (i32, i32),
        last: Option<Pt>,
    },
}

#[derive(Debug)]
struct PendingOp {
    mode: OpMode,
    order_backup: Option<Vec<OrderEntry>>,
    state: OpState,
}

/// The interactive front of the engine: one state machine over
/// `{Idle, DrawConn, MoveConn, DragSeg, MoveObj}` driven by typed
/// pointer events. Pending operations nest on a stack so a begin/finish
/// pair restores whatever was active before it. `finish` is the single
/// commit point: it restores the z-order backup, assimilates, pops the
/// op and raises the refresh flag. Cancelling is finishing without a
/// final move.
#[derive(Debug)]
pub struct Editor {
    pub canvas: Canvas,
    pub hooks: HookRegistry,
    router: RouterConfig,
    ops: Vec<PendingOp>,
    needs_refresh: bool,
}

impl Editor {
    pub fn new(config: Config) -> Self {
        Self {
            canvas: Canvas::new(config.grid),
            hooks: HookRegistry::default(),
            router: config.router,
            ops: Vec::new(),
            needs_refresh: false,
        }
    }

    pub fn mode(&self) -> OpMode {
        self.ops.last().map(|op| op.mode).unwrap_or(OpMode::Idle)
    }

    /// True once since the last structural change; rendering layers poll
    /// this instead of diffing the model.
    pub fn take_refresh(&mut self) -> bool {
        std::mem::take(&mut self.needs_refresh)
    }

    // ── Begin operations ────────────────────────────────────────────

    pub fn begin_draw_conn(&mut self) {
        self.ops.push(PendingOp {
            mode: OpMode::DrawConn,
            order_backup: None,
            state: OpState::Draw { points: Vec::new() },
        });
    }

    pub fn begin_move_conn(&mut self, list: Vec<ConnId>) -> Result<(), EditError> {
        for id in &list {
            if self.canvas.conn_index(*id).is_none() {
                return Err(EditError::NotFound(format!("connector {id}")));
            }
        }
        // The wires are leaving their ports behind; reconciliation at
        // finish re-links whatever still coincides.
        for &id in &list {
            let Some(ci) = self.canvas.conn_index(id) else {
                continue;
            };
            let pids = std::mem::take(&mut self.canvas.conns[ci].ports);
            for pid in pids {
                if let Some(port) = self.canvas.port_mut(pid) {
                    port.conns.retain(|c| *c != id);
                }
            }
        }
        self.ops.push(PendingOp {
            mode: OpMode::MoveConn,
            order_backup: Some(self.canvas.order.clone()),
            state: OpState::MoveConn { list, last: None },
        });
        Ok(())
    }

    pub fn begin_drag_seg(&mut self, refs: &[(ConnId, usize)]) -> Result<(), EditError> {
        let selection = engine::resolve_refs(&self.canvas, refs)?;
        let ctx = generate_routing_start_nodes(&self.canvas, &selection, &[]);
        remove_stubs(&mut self.canvas, &ctx);
        self.ops.push(PendingOp {
            mode: OpMode::DragSeg,
            order_backup: Some(self.canvas.order.clone()),
            state: OpState::DragSeg { ctx, last: None },
        });
        Ok(())
    }

    pub fn begin_move_obj(&mut self, objs: Vec<ObjId>) -> Result<(), EditError> {
        let mut moved_ports = Vec::new();
        for id in &objs {
            let obj = self
                .canvas
                .obj(*id)
                .ok_or_else(|| EditError::NotFound(format!("object {id}")))?;
            for pid in &obj.ports {
                if let Some(port) = self.canvas.port(*pid) {
                    moved_ports.push((*pid, port.pos));
                }
            }
        }
        self.ops.push(PendingOp {
            mode: OpMode::MoveObj,
            order_backup: Some(self.canvas.order.clone()),
            state: OpState::MoveObj {
                moved_ports,
                objs,
                total: (0, 0),
                last: None,
            },
        });
        Ok(())
    }

    // ── Event handling ──────────────────────────────────────────────

    pub fn pointer_down(&mut self, x: i32, y: i32) {
        let pos = self.canvas.snap(Pt::new(x, y));
        self.hooks.fire(&HookEvent {
            key: HookKey::MouseClickPre,
            pos,
        });

        let mut finish_after = false;
        match self.ops.last_mut().map(|op| &mut op.state) {
            Some(OpState::Draw { points }) => {
                if points.last() != Some(&pos) {
                    points.push(pos);
                }
            }
            Some(OpState::MoveConn { last, .. })
            | Some(OpState::DragSeg { last, .. }) => {
                if last.is_none() {
                    *last = Some(pos);
                } else {
                    finish_after = true;
                }
            }
            Some(OpState::MoveObj { last, .. }) => {
                if last.is_none() {
                    *last = Some(pos);
                } else {
                    finish_after = true;
                }
            }
            None => {}
        }
        if finish_after {
            // Second clicks only ever commit move ops, which cannot fail;
            // drawings are committed by an explicit `finish`.
            let _ = self.finish();
        }

        self.hooks.fire(&HookEvent {
            key: HookKey::MouseClickPost,
            pos,
        });
    }

    pub fn pointer_move(&mut self, x: i32, y: i32) {
        let pos = self.canvas.snap(Pt::new(x, y));
        let Some(op) = self.ops.last_mut() else {
            return;
        };
        match &mut op.state {
            OpState::Draw { .. } => {}
            OpState::MoveConn { list, last } => {
                let Some(prev) = *last else {
                    return;
                };
                let (dx, dy) = (pos.x - prev.x, pos.y - prev.y);
                if dx == 0 && dy == 0 {
                    return;
                }
                *last = Some(pos);
                let list = list.clone();
                offset_conns_raw(&mut self.canvas, &list, dx, dy);
            }
            OpState::DragSeg { ctx, last } => {
                let Some(prev) = *last else {
                    return;
                };
                let (dx, dy) = (pos.x - prev.x, pos.y - prev.y);
                if dx == 0 && dy == 0 {
                    return;
                }
                *last = Some(pos);
                let router = OrthoRouter::new(self.router.drag_mode);
                regen_segments(&mut self.canvas, ctx, dx, dy, &router, self.router.drag_jump);
            }
            OpState::MoveObj {
                objs, total, last, ..
            } => {
                let Some(prev) = *last else {
                    return;
                };
                let (dx, dy) = (pos.x - prev.x, pos.y - prev.y);
                if dx == 0 && dy == 0 {
                    return;
                }
                *last = Some(pos);
                total.0 += dx;
                total.1 += dy;
                let objs = objs.clone();
                offset_objs_raw(&mut self.canvas, &objs, dx, dy);
            }
        }
    }

    /// Commit the pending operation: final route, z-order restore,
    /// assimilation, pop, refresh. A drawing whose click path violates
    /// the draw preconditions is discarded and its error returned; the
    /// operation is popped either way.
    pub fn finish(&mut self) -> Result<(), EditError> {
        let Some(op) = self.ops.pop() else {
            return Ok(());
        };

        let mut result = Ok(());
        match op.state {
            OpState::Draw { points } => {
                let mut segs: Vec<(Pt, Pt)> = Vec::new();
                for pair in points.windows(2) {
                    if pair[0] != pair[1] {
                        segs.push((pair[0], pair[1]));
                    }
                }
                if !segs.is_empty() {
                    if let Err(err) = engine::draw_connector(&mut self.canvas, &segs) {
                        result = Err(err);
                    }
                }
            }
            OpState::MoveConn { list, .. } => {
                restore_order(&mut self.canvas, op.order_backup);
                engine::assimilate(&mut self.canvas, &list);
            }
            OpState::DragSeg { mut ctx, .. } => {
                // Replace the drag-quality routes with final-quality ones.
                let router = OrthoRouter::new(self.router.final_mode);
                regen_segments(&mut self.canvas, &mut ctx, 0, 0, &router, self.router.final_jump);
                restore_order(&mut self.canvas, op.order_backup);
                let conns = ctx.conns.clone();
                engine::assimilate(&mut self.canvas, &conns);
            }
            OpState::MoveObj {
                moved_ports,
                total: (dx, dy),
                ..
            } => {
                let router = OrthoRouter::new(self.router.final_mode);
                let affected = engine::rewire_moved_ports(
                    &mut self.canvas,
                    &moved_ports,
                    dx,
                    dy,
                    &router,
                    self.router.final_jump,
                );
                restore_order(&mut self.canvas, op.order_backup);
                engine::assimilate(&mut self.canvas, &affected);
            }
        }
        self.needs_refresh = true;
        result
    }
}

/// Translate connectors without reconciliation, keeping the routing
/// matrix coherent. The intermediate states of a drag are allowed to
/// violate the wiring invariants; matrix coherence is not negotiable
/// because the router reads it on the next frame.
fn offset_conns_raw(cnv: &mut Canvas, list: &[ConnId], dx: i32, dy: i32) {
    for &id in list {
        let Some(ci) = cnv.conn_index(id) else {
            continue;
        };
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
}

fn offset_objs_raw(cnv: &mut Canvas, objs: &[ObjId], dx: i32, dy: i32) {
    for &id in objs {
        let port_ids = cnv.obj(id).map(|o| o.ports.clone()).unwrap_or_default();
        if let Some(obj) = cnv.obj_mut(id) {
            obj.start = obj.start.offset(dx, dy);
            obj.end = obj.end.offset(dx, dy);
        }
        for pid in port_ids {
            if let Some(port) = cnv.port_mut(pid) {
                port.pos = port.pos.offset(dx, dy);
            }
        }
    }
}

/// Put the z-order back to its backup, keeping entries for items created
/// during the operation and dropping entries for items that vanished.
fn restore_order(cnv: &mut Canvas, backup: Option<Vec<OrderEntry>>) {
    let Some(backup) = backup else {
        return;
    };
    let still_valid = |cnv: &Canvas, e: &OrderEntry| match e {
        OrderEntry::Object(id) => cnv.obj(*id).is_some(),
        OrderEntry::Conn(id) => cnv.conn(*id).is_some(),
    };
    let mut restored: Vec<OrderEntry> = backup
        .into_iter()
        .filter(|e| still_valid(cnv, e))
        .collect();
    for entry in cnv.order.clone() {
        if still_valid(cnv, &entry) && !restored.contains(&entry) {
            restored.push(entry);
        }
    }
    cnv.order = restored;
    cnv.fix_order();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    use crate::config::Config;
    use crate::model::ShapeKind;

    fn editor() -> Editor {
        let mut config = Config::default();
        config.grid.x = 1;
        config.grid.y = 1;
        Editor::new(config)
    }

    #[test]
    fn draw_via_clicks_creates_connector() {
        let mut ed = editor();
        ed.begin_draw_conn();
        assert_eq!(ed.mode(), OpMode::DrawConn);
        ed.pointer_down(0, 0);
        ed.pointer_down(10, 0);
        ed.pointer_down(10, 10);
        ed.finish().unwrap();
        assert_eq!(ed.mode(), OpMode::Idle);
        assert_eq!(ed.canvas.conns.len(), 1);
        assert_eq!(ed.canvas.conns[0].segments.len(), 2);
        assert!(ed.take_refresh());
        assert!(!ed.take_refresh());
    }

    #[test]
    fn rejected_draw_surfaces_the_error() {
        let mut ed = editor();
        ed.begin_draw_conn();
        // Doubling back puts the final click strictly inside the first
        // segment, which the draw preconditions reject.
        ed.pointer_down(0, 0);
        ed.pointer_down(10, 0);
        ed.pointer_down(5, 0);
        let err = ed.finish().unwrap_err();
        assert!(matches!(err, EditError::InvariantViolation(_)));
        assert!(ed.canvas.conns.is_empty());
        assert_eq!(ed.mode(), OpMode::Idle);
        assert!(ed.take_refresh());
    }

    #[test]
    fn move_conn_interactive_roundtrip() {
        let mut ed = editor();
        let id = engine::draw_connector(
            &mut ed.canvas,
            &[(Pt::new(0, 0), Pt::new(10, 0))],
        )
        .unwrap();
        ed.begin_move_conn(vec![id]).unwrap();
        ed.pointer_down(0, 0);
        ed.pointer_move(5, 5);
        ed.pointer_move(20, 30);
        ed.finish().unwrap();
        let conn = ed.canvas.conn(id).unwrap();
        assert_eq!(conn.segments[0].a, Pt::new(20, 30));
        assert_eq!(conn.segments[0].b, Pt::new(30, 30));
        assert_eq!(ed.canvas.matrix.len(), 1);
    }

    #[test]
    fn nested_ops_restore_previous_mode() {
        let mut ed = editor();
        let id = engine::draw_connector(
            &mut ed.canvas,
            &[(Pt::new(0, 0), Pt::new(10, 0))],
        )
        .unwrap();
        ed.begin_draw_conn();
        ed.begin_move_conn(vec![id]).unwrap();
        assert_eq!(ed.mode(), OpMode::MoveConn);
        ed.finish().unwrap();
        assert_eq!(ed.mode(), OpMode::DrawConn);
        ed.finish().unwrap();
        assert_eq!(ed.mode(), OpMode::Idle);
    }

    #[test]
    fn hooks_fire_in_reverse_order_and_swallow_failures() {
        let mut ed = editor();
        let log: Rc<RefCell<Vec<&'static str>>> = Rc::new(RefCell::new(Vec::new()));
        let l1 = log.clone();
        ed.hooks.register(
            HookKey::MouseClickPre,
            Box::new(move |_| {
                l1.borrow_mut().push("first");
                Ok(())
            }),
        );
        let l2 = log.clone();
        ed.hooks.register(
            HookKey::MouseClickPre,
            Box::new(move |_| {
                l2.borrow_mut().push("second");
                Err("hook exploded".into())
            }),
        );
        ed.pointer_down(3, 4);
        assert_eq!(*log.borrow(), vec!["second", "first"]);
    }

    #[test]
    fn unregistered_hook_stops_firing() {
        let mut ed = editor();
        let count: Rc<RefCell<usize>> = Rc::new(RefCell::new(0));
        let c = count.clone();
        let id = ed.hooks.register(
            HookKey::MouseClickPost,
            Box::new(move |_| {
                *c.borrow_mut() += 1;
                Ok(())
            }),
        );
        ed.pointer_down(0, 0);
        assert!(ed.hooks.unregister(id));
        ed.pointer_down(0, 0);
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn drag_segment_interactive_reroutes() {
        let mut ed = editor();
        let id = engine::draw_connector(
            &mut ed.canvas,
            &[
                (Pt::new(0, 0), Pt::new(20, 0)),
                (Pt::new(20, 0), Pt::new(20, 20)),
                (Pt::new(20, 20), Pt::new(40, 20)),
            ],
        )
        .unwrap();
        ed.begin_drag_seg(&[(id, 1)]).unwrap();
        ed.pointer_down(20, 10);
        ed.pointer_move(30, 10);
        ed.finish().unwrap();

        // The dragged vertical run moved to x=30 and the arms re-routed
        // to reach it; the wiring stays a single connector.
        assert_eq!(ed.canvas.conns.len(), 1);
        let conn = &ed.canvas.conns[0];
        assert!(conn.segments.iter().any(|s| s.a.x == 30 || s.b.x == 30));
        assert_eq!(ed.canvas.matrix.len(), conn.segments.len());
    }

    #[test]
    fn move_obj_interactive_commits_on_finish() {
        let mut ed = editor();
        let obj = ed
            .canvas
            .add_object(ShapeKind::Rect, Pt::new(-10, -5), Pt::new(0, 5));
        let pid = engine::add_port(&mut ed.canvas, obj, Pt::new(0, 0)).unwrap();
        let id = engine::draw_connector(
            &mut ed.canvas,
            &[(Pt::new(0, 0), Pt::new(20, 0))],
        )
        .unwrap();

        ed.begin_move_obj(vec![obj]).unwrap();
        ed.pointer_down(0, 0);
        ed.pointer_move(0, 7);
        ed.finish().unwrap();

        assert_eq!(ed.canvas.port(pid).unwrap().pos, Pt::new(0, 7));
        let conn = ed.canvas.conn(id).unwrap();
        assert!(conn.ports.contains(&pid));
        assert!(conn.segments.iter().any(|s| s.touches(Pt::new(0, 7))));
    }
}
