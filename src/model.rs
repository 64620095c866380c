use std::collections::HashSet;
use std::fmt;

use crate::config::GridConfig;
use crate::engine::geom;
use crate::engine::matrix::RoutingMatrix;
use crate::vattr::VisAttr;

// ── Coordinates ─────────────────────────────────────────────────────

/// A canvas coordinate. Grid snapping keeps every model coordinate
/// integral, so endpoint comparisons throughout the engine are exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Pt {
    pub x: i32,
    pub y: i32,
}

impl Pt {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

impl fmt::Display for Pt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.x, self.y)
    }
}

// ── Handles ─────────────────────────────────────────────────────────
//
// Entities are referenced by stable numeric handles, never by position:
// positions in the owning vectors shift as connectors merge and split.
// The numeric part doubles as the display identifier.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PortId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupId(pub u32);

/// Internal segment identity used by the routing matrix. Never displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SegId(pub u64);

impl fmt::Display for ObjId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

impl fmt::Display for ConnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C{}", self.0)
    }
}

// ── Entities ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    Rect,
    Line,
    Ellipse,
}

impl ShapeKind {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "rect" | "RECT" => Some(Self::Rect),
            "line" | "LINE" => Some(Self::Line),
            "ellipse" | "ELLIPSE" => Some(Self::Ellipse),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rect => "RECT",
            Self::Line => "LINE",
            Self::Ellipse => "ELLIPSE",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Object {
    pub id: ObjId,
    pub kind: ShapeKind,
    pub start: Pt,
    pub end: Pt,
    pub group: Option<GroupId>,
    pub ports: Vec<PortId>,
    pub order: usize,
}

#[derive(Debug, Clone)]
pub struct Port {
    pub id: PortId,
    pub pos: Pt,
    pub obj: ObjId,
    /// Connectors terminating on this port. Mirror of `Connector::ports`.
    pub conns: Vec<ConnId>,
}

#[derive(Debug, Clone)]
pub struct Segment {
    pub id: SegId,
    pub a: Pt,
    pub b: Pt,
    pub vattr: Option<VisAttr>,
}

impl Segment {
    pub fn endpoints(&self) -> [Pt; 2] {
        [self.a, self.b]
    }

    pub fn touches(&self, p: Pt) -> bool {
        self.a == p || self.b == p
    }

    /// The endpoint opposite to `p`. Caller guarantees `p` is an endpoint.
    pub fn other_end(&self, p: Pt) -> Pt {
        if self.a == p {
            self.b
        } else {
            self.a
        }
    }

    /// Geometric equality regardless of orientation.
    pub fn same_geometry(&self, other: &Segment) -> bool {
        (self.a == other.a && self.b == other.b) || (self.a == other.b && self.b == other.a)
    }
}

/// A wire net: segments plus terminating ports plus junction coordinates.
///
/// A connector with no segments is the degenerate port-to-port form: it
/// joins exactly two ports that share a coordinate and is not indexed in
/// the routing matrix.
#[derive(Debug, Clone)]
pub struct Connector {
    pub id: ConnId,
    pub order: usize,
    pub segments: Vec<Segment>,
    pub ports: Vec<PortId>,
    pub junctions: Vec<Pt>,
    pub vattr: Option<VisAttr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderEntry {
    Object(ObjId),
    Conn(ConnId),
}

#[derive(Debug, Clone, Copy, Default)]
struct Counters {
    obj: u32,
    port: u32,
    conn: u32,
    group: u32,
    seg: u64,
}

// ── Canvas root ─────────────────────────────────────────────────────

/// The canvas model root. Owns every object, port and connector; all
/// cross-references between them are handles into these vectors.
#[derive(Debug)]
pub struct Canvas {
    pub objects: Vec<Object>,
    pub ports: Vec<Port>,
    pub conns: Vec<Connector>,
    pub groups: Vec<Vec<ObjId>>,
    /// Global z-order. `order[i]` names the item whose `order` field is `i`.
    pub order: Vec<OrderEntry>,
    pub grid: GridConfig,
    pub(crate) matrix: RoutingMatrix,
    counters: Counters,
}

impl Canvas {
    pub fn new(grid: GridConfig) -> Self {
        let (gx, gy) = grid.pitch();
        Self {
            objects: Vec::new(),
            ports: Vec::new(),
            conns: Vec::new(),
            groups: Vec::new(),
            order: Vec::new(),
            grid,
            matrix: RoutingMatrix::new(gx.max(gy)),
            counters: Counters::default(),
        }
    }

    pub fn snap(&self, p: Pt) -> Pt {
        geom::snap_pt(p, self.grid.pitch())
    }

    // ── Allocation ──────────────────────────────────────────────────

    pub fn alloc_obj_id(&mut self) -> ObjId {
        self.counters.obj += 1;
        ObjId(self.counters.obj)
    }

    pub fn alloc_port_id(&mut self) -> PortId {
        self.counters.port += 1;
        PortId(self.counters.port)
    }

    pub fn alloc_conn_id(&mut self) -> ConnId {
        self.counters.conn += 1;
        ConnId(self.counters.conn)
    }

    pub fn alloc_group_id(&mut self) -> GroupId {
        self.counters.group += 1;
        GroupId(self.counters.group)
    }

    pub fn alloc_seg_id(&mut self) -> SegId {
        self.counters.seg += 1;
        SegId(self.counters.seg)
    }

    pub fn new_segment(&mut self, a: Pt, b: Pt, vattr: Option<VisAttr>) -> Segment {
        Segment {
            id: self.alloc_seg_id(),
            a,
            b,
            vattr,
        }
    }

    // ── Lookup ──────────────────────────────────────────────────────

    pub fn obj_index(&self, id: ObjId) -> Option<usize> {
        self.objects.iter().position(|o| o.id == id)
    }

    pub fn obj(&self, id: ObjId) -> Option<&Object> {
        self.objects.iter().find(|o| o.id == id)
    }

    pub fn obj_mut(&mut self, id: ObjId) -> Option<&mut Object> {
        self.objects.iter_mut().find(|o| o.id == id)
    }

    pub fn port(&self, id: PortId) -> Option<&Port> {
        self.ports.iter().find(|p| p.id == id)
    }

    pub fn port_mut(&mut self, id: PortId) -> Option<&mut Port> {
        self.ports.iter_mut().find(|p| p.id == id)
    }

    pub fn conn_index(&self, id: ConnId) -> Option<usize> {
        self.conns.iter().position(|c| c.id == id)
    }

    pub fn conn(&self, id: ConnId) -> Option<&Connector> {
        self.conns.iter().find(|c| c.id == id)
    }

    pub fn conn_mut(&mut self, id: ConnId) -> Option<&mut Connector> {
        self.conns.iter_mut().find(|c| c.id == id)
    }

    /// Resolve a segment id to `(connector index, segment index)`.
    pub fn seg_position(&self, id: SegId) -> Option<(usize, usize)> {
        for (ci, conn) in self.conns.iter().enumerate() {
            if let Some(si) = conn.segments.iter().position(|s| s.id == id) {
                return Some((ci, si));
            }
        }
        None
    }

    // ── Structural mutation ─────────────────────────────────────────

    pub fn add_object(&mut self, kind: ShapeKind, start: Pt, end: Pt) -> ObjId {
        let id = self.alloc_obj_id();
        let order = self.order.len();
        self.objects.push(Object {
            id,
            kind,
            start: self.snap(start),
            end: self.snap(end),
            group: None,
            ports: Vec::new(),
            order,
        });
        self.order.push(OrderEntry::Object(id));
        id
    }

    /// Raw port insertion: no snapping, no overlap reconciliation. The
    /// public entry point is `engine::add_port`.
    pub(crate) fn insert_port(&mut self, obj: ObjId, pos: Pt) -> Option<PortId> {
        self.obj_index(obj)?;
        let id = self.alloc_port_id();
        self.ports.push(Port {
            id,
            pos,
            obj,
            conns: Vec::new(),
        });
        if let Some(object) = self.obj_mut(obj) {
            object.ports.push(id);
        }
        Some(id)
    }

    /// Append a connector at the top of the z-order.
    pub fn push_conn(&mut self, mut conn: Connector) {
        conn.order = self.order.len();
        self.order.push(OrderEntry::Conn(conn.id));
        for seg in &conn.segments {
            self.matrix.add_segment(seg.id, conn.id, seg.a, seg.b);
        }
        self.conns.push(conn);
    }

    /// Relabel every item's `order` field from its position in the order
    /// array. O(n); run after any order-array surgery.
    pub fn fix_order(&mut self) {
        for idx in 0..self.order.len() {
            match self.order[idx] {
                OrderEntry::Object(id) => {
                    if let Some(obj) = self.obj_mut(id) {
                        obj.order = idx;
                    }
                }
                OrderEntry::Conn(id) => {
                    if let Some(conn) = self.conn_mut(id) {
                        conn.order = idx;
                    }
                }
            }
        }
    }

    pub fn remove_order_entry(&mut self, entry: OrderEntry) {
        if let Some(pos) = self.order.iter().position(|e| *e == entry) {
            self.order.remove(pos);
        }
    }

    // ── Coordinate queries ──────────────────────────────────────────

    pub fn ports_at(&self, p: Pt) -> Vec<PortId> {
        self.ports
            .iter()
            .filter(|port| port.pos == p)
            .map(|port| port.id)
            .collect()
    }

    /// Connectors present at a coordinate (zero tolerance). Segment hits
    /// come from the routing matrix; segment-less connectors are found
    /// through their port coordinates since they are never indexed.
    pub fn conns_at(&self, p: Pt) -> Vec<ConnId> {
        let mut found: Vec<ConnId> = Vec::new();
        let mut seen: HashSet<ConnId> = HashSet::new();
        for (_, owner) in self.matrix.segments_at(p) {
            if seen.insert(owner) {
                found.push(owner);
            }
        }
        for conn in &self.conns {
            if !conn.segments.is_empty() || seen.contains(&conn.id) {
                continue;
            }
            let on_port = conn
                .ports
                .iter()
                .filter_map(|pid| self.port(*pid))
                .any(|port| port.pos == p);
            if on_port {
                seen.insert(conn.id);
                found.push(conn.id);
            }
        }
        found
    }

    /// Segments of one connector incident (by endpoint) at a coordinate.
    pub fn conn_segs_ending_at(&self, conn: ConnId, p: Pt) -> Vec<SegId> {
        self.conn(conn)
            .map(|c| {
                c.segments
                    .iter()
                    .filter(|s| s.touches(p))
                    .map(|s| s.id)
                    .collect()
            })
            .unwrap_or_default()
    }

    // ── Routing-matrix bookkeeping ──────────────────────────────────

    /// Read access to the occupancy index, mainly for invariant checks.
    pub fn matrix(&self) -> &RoutingMatrix {
        &self.matrix
    }

    pub(crate) fn register_seg(&mut self, conn: ConnId, seg: &Segment) {
        self.matrix.add_segment(seg.id, conn, seg.a, seg.b);
    }

    pub(crate) fn unregister_seg(&mut self, id: SegId) {
        self.matrix.remove_segment(id);
    }
}

/// Recompute a connector's junction list: coordinates where more than two
/// segment endpoints meet. Sorted for deterministic output.
pub fn junctions_of(segments: &[Segment]) -> Vec<Pt> {
    let mut counts: std::collections::HashMap<Pt, usize> = std::collections::HashMap::new();
    for seg in segments {
        *counts.entry(seg.a).or_insert(0) += 1;
        *counts.entry(seg.b).or_insert(0) += 1;
    }
    let mut out: Vec<Pt> = counts
        .into_iter()
        .filter(|(_, n)| *n > 2)
        .map(|(p, _)| p)
        .collect();
    out.sort();
    out
}
