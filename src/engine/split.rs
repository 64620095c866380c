use std::collections::BTreeMap;

use crate::engine::geom;
use crate::engine::ports::connect_ports;
use crate::model::{junctions_of, Canvas, ConnId, Connector, OrderEntry, Pt, Segment};

/// Partition a connector at a coordinate.
///
/// Segments are grouped by reachability: traversal never crosses `at`
/// and never passes through a coordinate holding a port, so a port acts
/// as a barrier between partitions. Segments unreachable from `at` (a
/// disconnected remainder) form one extra partition.
///
/// The first partition reuses the connector's id; the rest get fresh ids.
/// The connector itself is left in `canvas.conns` as an emptied husk with
/// no order assigned to the partitions: removing the husk and installing
/// the partitions is the caller's job. Port back-references are updated
/// here (the original id is unlinked, partition ids linked in).
pub fn split_connector_at_coor(cnv: &mut Canvas, conn_id: ConnId, at: Pt) -> Vec<Connector> {
    let Some(ci) = cnv.conn_index(conn_id) else {
        return Vec::new();
    };

    // A coordinate in a segment's interior first becomes a real endpoint.
    if let Some(k) = cnv.conns[ci]
        .segments
        .iter()
        .position(|s| geom::point_inside_segment(s.a, s.b, at))
    {
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

    let segments = std::mem::take(&mut cnv.conns[ci].segments);
    let original_ports = cnv.conns[ci].ports.clone();
    let vattr = cnv.conns[ci].vattr.clone();

    let barrier = |cnv: &Canvas, q: Pt| q == at || !cnv.ports_at(q).is_empty();

    let mut assigned = vec![usize::MAX; segments.len()];
    let mut component_count = 0usize;
    for start in 0..segments.len() {
        if assigned[start] != usize::MAX || !segments[start].touches(at) {
            continue;
        }
        // Starts already reachable from an earlier start share its group.
        let component = component_count;
        assigned[start] = component;
        component_count += 1;
        let mut stack = vec![start];
        while let Some(idx) = stack.pop() {
            for e in segments[idx].endpoints() {
                if barrier(cnv, e) {
                    continue;
                }
                for (other, seg) in segments.iter().enumerate() {
                    if assigned[other] == usize::MAX && seg.touches(e) {
                        assigned[other] = component;
                        stack.push(other);
                    }
                }
            }
        }
    }

    // Everything untouched by the traversal is one extra partition.
    let leftover = component_count;
    let mut has_leftover = false;
    for slot in assigned.iter_mut() {
        if *slot == usize::MAX {
            *slot = leftover;
            has_leftover = true;
        }
    }
    let total = component_count + usize::from(has_leftover);

    let mut buckets: Vec<Vec<Segment>> = vec![Vec::new(); total.max(1)];
    for (idx, seg) in segments.into_iter().enumerate() {
        buckets[assigned[idx]].push(seg);
    }
    buckets.retain(|b| !b.is_empty());

    let mut partitions: Vec<Connector> = Vec::with_capacity(buckets.len());
    for (n, bucket) in buckets.into_iter().enumerate() {
        let id = if n == 0 { conn_id } else { cnv.alloc_conn_id() };
        for seg in &bucket {
            cnv.matrix.set_owner(seg.id, id);
        }
        let ports = original_ports
            .iter()
            .copied()
            .filter(|pid| {
                cnv.port(*pid)
                    .map(|port| bucket.iter().any(|s| s.touches(port.pos)))
                    .unwrap_or(false)
            })
            .collect::<Vec<_>>();
        let junctions = junctions_of(&bucket);
        partitions.push(Connector {
            id,
            order: 0,
            segments: bucket,
            ports,
            junctions,
            vattr: vattr.clone(),
        });
    }

    for pid in original_ports {
        if let Some(port) = cnv.port_mut(pid) {
            port.conns.retain(|c| *c != conn_id);
        }
        for partition in &partitions {
            if partition.ports.contains(&pid) {
                if let Some(port) = cnv.port_mut(pid) {
                    if !port.conns.contains(&partition.id) {
                        port.conns.push(partition.id);
                    }
                }
            }
        }
    }

    partitions
}

/// Separate the listed segments into their own connectors.
///
/// Listed segments are grouped by endpoint adjacency into new connectors;
/// whatever remains of each source connector stays together under the
/// original id. Every resulting connector goes through port
/// reconciliation. Returns the ids of all resulting connectors.
pub fn split_connector_at_segments(cnv: &mut Canvas, refs: &[(ConnId, usize)]) -> Vec<ConnId> {
    let mut by_conn: BTreeMap<ConnId, Vec<usize>> = BTreeMap::new();
    for (conn, idx) in refs {
        by_conn.entry(*conn).or_default().push(*idx);
    }

    let mut results: Vec<ConnId> = Vec::new();
    for (conn_id, mut idxs) in by_conn {
        let Some(ci) = cnv.conn_index(conn_id) else {
            continue;
        };
        idxs.sort_unstable();
        idxs.dedup();
        idxs.reverse();

        let mut extracted: Vec<Segment> = Vec::with_capacity(idxs.len());
        for idx in idxs {
            if idx < cnv.conns[ci].segments.len() {
                extracted.push(cnv.conns[ci].segments.remove(idx));
            }
        }
        if extracted.is_empty() {
            continue;
        }

        let original = cnv.conns.remove(ci);
        cnv.remove_order_entry(OrderEntry::Conn(conn_id));
        let insert_order = original.order.min(cnv.order.len());
        for pid in &original.ports {
            if let Some(port) = cnv.port_mut(*pid) {
                port.conns.retain(|c| *c != conn_id);
            }
        }

        let mut new_conns: Vec<Connector> = Vec::new();
        if !original.segments.is_empty() {
            new_conns.push(Connector {
                id: conn_id,
                order: 0,
                segments: original.segments,
                ports: Vec::new(),
                junctions: Vec::new(),
                vattr: original.vattr.clone(),
            });
        }
        for bucket in adjacency_groups(extracted) {
            let id = cnv.alloc_conn_id();
            new_conns.push(Connector {
                id,
                order: 0,
                segments: bucket,
                ports: Vec::new(),
                junctions: Vec::new(),
                vattr: original.vattr.clone(),
            });
        }

        for (offset, mut conn) in new_conns.into_iter().enumerate() {
            conn.junctions = junctions_of(&conn.segments);
            for seg in &conn.segments {
                cnv.matrix.set_owner(seg.id, conn.id);
            }
            let id = conn.id;
            cnv.order
                .insert((insert_order + offset).min(cnv.order.len()), OrderEntry::Conn(id));
            cnv.conns.insert((ci + offset).min(cnv.conns.len()), conn);
            results.push(id);
        }
        cnv.fix_order();
    }

    for &id in &results {
        let ports: Vec<_> = cnv
            .ports
            .iter()
            .filter(|port| {
                cnv.conn(id)
                    .map(|c| c.segments.iter().any(|s| geom::point_on_segment(s.a, s.b, port.pos)))
                    .unwrap_or(false)
            })
            .map(|port| port.id)
            .collect();
        if !ports.is_empty() {
            connect_ports(cnv, Some(id), &ports);
        }
    }
    results
}

/// Group segments into connected components by shared endpoints.
fn adjacency_groups(segments: Vec<Segment>) -> Vec<Vec<Segment>> {
    let mut assigned = vec![usize::MAX; segments.len()];
    let mut groups = 0usize;
    for start in 0..segments.len() {
        if assigned[start] != usize::MAX {
            continue;
        }
        assigned[start] = groups;
        let mut stack = vec![start];
        while let Some(idx) = stack.pop() {
            for e in segments[idx].endpoints() {
                for (other, seg) in segments.iter().enumerate() {
                    if assigned[other] == usize::MAX && seg.touches(e) {
                        assigned[other] = groups;
                        stack.push(other);
                    }
                }
            }
        }
        groups += 1;
    }
    let mut out: Vec<Vec<Segment>> = vec![Vec::new(); groups];
    for (idx, seg) in segments.into_iter().enumerate() {
        out[assigned[idx]].push(seg);
    }
    out
}
