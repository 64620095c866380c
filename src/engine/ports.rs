use std::collections::HashSet;

use crate::engine::geom;
use crate::engine::split::split_connector_at_coor;
use crate::model::{Canvas, ConnId, Connector, OrderEntry, PortId};

/// Port-to-port reconciliation: any two ports sharing a coordinate must
/// be joined. Ports with no wire between them get the degenerate
/// zero-segment connector, which lives in the z-order like any other
/// connector but never enters the routing matrix.
pub fn connect_coincident_ports(cnv: &mut Canvas) {
    for i in 0..cnv.ports.len() {
        for j in (i + 1)..cnv.ports.len() {
            if cnv.ports[i].pos != cnv.ports[j].pos {
                continue;
            }
            let already_joined = cnv.ports[i]
                .conns
                .iter()
                .any(|c| cnv.ports[j].conns.contains(c));
            if already_joined {
                continue;
            }
            let id = cnv.alloc_conn_id();
            let (pa, pb) = (cnv.ports[i].id, cnv.ports[j].id);
            cnv.push_conn(Connector {
                id,
                order: 0,
                segments: Vec::new(),
                ports: vec![pa, pb],
                junctions: Vec::new(),
                vattr: None,
            });
            cnv.fix_order();
            cnv.ports[i].conns.push(id);
            cnv.ports[j].conns.push(id);
        }
    }
}

/// Ports-to-connector reconciliation: attach every listed port that lies
/// on a connector, splitting the connector when the port lands anywhere
/// but a dangling endpoint.
///
/// With `conn` set, only that connector and the partitions produced by
/// splits inside this call are considered; with `None` every connector
/// under a port is.
pub fn connect_ports(cnv: &mut Canvas, conn: Option<ConnId>, ports: &[PortId]) {
    let mut scope: HashSet<ConnId> = HashSet::new();
    if let Some(target) = conn {
        scope.insert(target);
    }

    for &pid in ports {
        let Some(port) = cnv.port(pid) else {
            continue;
        };
        let pos = port.pos;
        let mut candidates = cnv.conns_at(pos);
        if conn.is_some() {
            candidates.retain(|k| scope.contains(k));
        }

        for k in candidates {
            let Some(ki) = cnv.conn_index(k) else {
                continue;
            };

            // Detach first so a stale back-reference cannot survive a
            // split below.
            cnv.conns[ki].ports.retain(|p| *p != pid);
            if let Some(port) = cnv.port_mut(pid) {
                port.conns.retain(|c| *c != k);
            }

            let mut touching = 0usize;
            let mut at_endpoint = true;
            for seg in &cnv.conns[ki].segments {
                if geom::point_on_segment(seg.a, seg.b, pos) {
                    touching += 1;
                    if !seg.touches(pos) {
                        at_endpoint = false;
                    }
                }
            }

            let needs_split = touching > 1 || (touching == 1 && !at_endpoint);
            if needs_split {
                let slot_order = cnv.conns[ki].order;
                let partitions = split_connector_at_coor(cnv, k, pos);
                let Some(husk) = cnv.conn_index(k) else {
                    continue;
                };
                cnv.conns.remove(husk);
                cnv.remove_order_entry(OrderEntry::Conn(k));
                for (offset, mut part) in partitions.into_iter().enumerate() {
                    let part_id = part.id;
                    if part.segments.iter().any(|s| s.touches(pos)) {
                        if !part.ports.contains(&pid) {
                            part.ports.push(pid);
                        }
                        if let Some(port) = cnv.port_mut(pid) {
                            if !port.conns.contains(&part_id) {
                                port.conns.push(part_id);
                            }
                        }
                    }
                    cnv.order.insert(
                        (slot_order + offset).min(cnv.order.len()),
                        OrderEntry::Conn(part_id),
                    );
                    cnv.conns
                        .insert((husk + offset).min(cnv.conns.len()), part);
                    scope.insert(part_id);
                }
                cnv.fix_order();
            } else {
                // Dangling endpoint, or a zero-segment connector sharing
                // the coordinate: a plain link suffices.
                cnv.conns[ki].ports.push(pid);
                if let Some(port) = cnv.port_mut(pid) {
                    port.conns.push(k);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GridConfig;
    use crate::model::{Pt, ShapeKind};

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
    fn coincident_ports_get_zero_segment_connector() {
        let mut cnv = canvas();
        let o1 = cnv.add_object(ShapeKind::Rect, Pt::new(0, 0), Pt::new(100, 100));
        let o2 = cnv.add_object(ShapeKind::Rect, Pt::new(100, 0), Pt::new(200, 100));
        let p1 = cnv.insert_port(o1, Pt::new(100, 100)).unwrap();
        let p2 = cnv.insert_port(o2, Pt::new(100, 100)).unwrap();
        connect_coincident_ports(&mut cnv);
        assert_eq!(cnv.conns.len(), 1);
        let conn = &cnv.conns[0];
        assert!(conn.segments.is_empty());
        assert_eq!(conn.ports, vec![p1, p2]);
        assert!(cnv.order.contains(&OrderEntry::Conn(conn.id)));
        assert!(cnv.matrix.is_empty());
        // Running again must not duplicate the join.
        connect_coincident_ports(&mut cnv);
        assert_eq!(cnv.conns.len(), 1);
    }

    #[test]
    fn port_at_dangling_endpoint_links_without_split() {
        let mut cnv = canvas();
        let id = add_conn(&mut cnv, &[(0, 0, 10, 0)]);
        let obj = cnv.add_object(ShapeKind::Rect, Pt::new(-5, -5), Pt::new(5, 5));
        let pid = cnv.insert_port(obj, Pt::new(0, 0)).unwrap();
        connect_ports(&mut cnv, None, &[pid]);
        assert_eq!(cnv.conns.len(), 1);
        assert_eq!(cnv.conn(id).unwrap().ports, vec![pid]);
        assert_eq!(cnv.port(pid).unwrap().conns, vec![id]);
    }

    #[test]
    fn port_inside_segment_forces_split() {
        let mut cnv = canvas();
        let id = add_conn(&mut cnv, &[(0, 0, 10, 0)]);
        let obj = cnv.add_object(ShapeKind::Rect, Pt::new(3, -5), Pt::new(8, 5));
        let pid = cnv.insert_port(obj, Pt::new(5, 0)).unwrap();
        connect_ports(&mut cnv, None, &[pid]);
        assert_eq!(cnv.conns.len(), 2);
        assert!(cnv.conn(id).is_some(), "first partition reuses the id");
        for conn in &cnv.conns {
            assert_eq!(conn.segments.len(), 1);
            assert_eq!(conn.ports, vec![pid]);
        }
        assert_eq!(cnv.port(pid).unwrap().conns.len(), 2);
        for (idx, entry) in cnv.order.iter().enumerate() {
            if let OrderEntry::Conn(cid) = entry {
                assert_eq!(cnv.conn(*cid).unwrap().order, idx);
            }
        }
    }

    #[test]
    fn port_at_junction_splits_every_arm() {
        let mut cnv = canvas();
        add_conn(&mut cnv, &[(0, 0, 5, 0), (5, 0, 10, 0), (5, 0, 5, 10)]);
        let obj = cnv.add_object(ShapeKind::Rect, Pt::new(3, -5), Pt::new(8, 5));
        let pid = cnv.insert_port(obj, Pt::new(5, 0)).unwrap();
        connect_ports(&mut cnv, None, &[pid]);
        assert_eq!(cnv.conns.len(), 3);
        assert_eq!(cnv.port(pid).unwrap().conns.len(), 3);
    }
}
