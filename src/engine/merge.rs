use std::collections::HashSet;

use crate::engine::repair::repair_seg_and_junc;
use crate::model::{Canvas, ConnId, OrderEntry, Pt};

#[derive(Debug)]
pub struct MergeOutcome {
    pub master: ConnId,
    /// Every connector fused by this pass, master last. A single entry
    /// means nothing else was touching.
    pub merged: Vec<ConnId>,
}

/// Fuse every connector that shares a coordinate with `conn` into one.
///
/// The surviving connector is the one lowest in `canvas.conns`, so the
/// higher-indexed donors can be removed in place back to front without
/// disturbing the master's position. Donor segments that duplicate a
/// master segment (in either orientation) are dropped and unregistered.
pub fn short_and_merge_connector(cnv: &mut Canvas, conn: ConnId) -> MergeOutcome {
    let Some(_) = cnv.conn_index(conn) else {
        return MergeOutcome {
            master: conn,
            merged: Vec::new(),
        };
    };

    let coords = touch_coords(cnv, conn);
    let mut found: Vec<ConnId> = vec![conn];
    for p in &coords {
        for k in cnv.conns_at(*p) {
            if !found.contains(&k) {
                found.push(k);
            }
        }
    }
    if found.len() <= 1 {
        return MergeOutcome {
            master: conn,
            merged: vec![conn],
        };
    }

    let mut indexed: Vec<(usize, ConnId)> = found
        .iter()
        .filter_map(|id| cnv.conn_index(*id).map(|i| (i, *id)))
        .collect();
    indexed.sort();
    let (master_idx, master) = indexed[0];
    let max_order = indexed
        .iter()
        .filter_map(|(i, _)| cnv.conns.get(*i).map(|c| c.order))
        .max()
        .unwrap_or(0);

    // Donors back to front; the master sits below all of them.
    let mut donors: Vec<(usize, ConnId)> = indexed[1..].to_vec();
    donors.sort_by(|a, b| b.0.cmp(&a.0));

    let mut merged: Vec<ConnId> = Vec::with_capacity(found.len());
    for (idx, donor_id) in donors {
        let donor = cnv.conns.remove(idx);
        for seg in donor.segments {
            let duplicate = cnv.conns[master_idx]
                .segments
                .iter()
                .any(|s| s.same_geometry(&seg));
            if duplicate {
                cnv.unregister_seg(seg.id);
            } else {
                cnv.matrix.set_owner(seg.id, master);
                cnv.conns[master_idx].segments.push(seg);
            }
        }
        for pid in donor.ports {
            if !cnv.conns[master_idx].ports.contains(&pid) {
                cnv.conns[master_idx].ports.push(pid);
            }
            if let Some(port) = cnv.port_mut(pid) {
                port.conns.retain(|c| *c != donor_id);
                if !port.conns.contains(&master) {
                    port.conns.push(master);
                }
            }
        }
        for junction in donor.junctions {
            if !cnv.conns[master_idx].junctions.contains(&junction) {
                cnv.conns[master_idx].junctions.push(junction);
            }
        }
        if cnv.conns[master_idx].vattr.is_none() {
            cnv.conns[master_idx].vattr = donor.vattr;
        }
        cnv.remove_order_entry(OrderEntry::Conn(donor_id));
        merged.push(donor_id);
    }

    // The master takes the topmost merged order slot: with the donors'
    // entries gone, that slot is maxOrder - (#merged - 1).
    cnv.remove_order_entry(OrderEntry::Conn(master));
    let pos = max_order
        .saturating_sub(found.len() - 1)
        .min(cnv.order.len());
    cnv.order.insert(pos, OrderEntry::Conn(master));
    cnv.fix_order();

    merged.push(master);
    MergeOutcome { master, merged }
}

/// Coordinates through which `conn` can short to another connector: its
/// segment endpoints, or its port positions when it has no segments.
fn touch_coords(cnv: &Canvas, conn: ConnId) -> Vec<Pt> {
    let Some(c) = cnv.conn(conn) else {
        return Vec::new();
    };
    let mut coords: Vec<Pt> = Vec::new();
    if c.segments.is_empty() {
        for pid in &c.ports {
            if let Some(port) = cnv.port(*pid) {
                if !coords.contains(&port.pos) {
                    coords.push(port.pos);
                }
            }
        }
    } else {
        for seg in &c.segments {
            for e in seg.endpoints() {
                if !coords.contains(&e) {
                    coords.push(e);
                }
            }
        }
    }
    coords
}

/// Drive merging to a fixpoint for each listed connector, then repair
/// every resulting master. Returns the masters plus the set of connector
/// ids absorbed along the way.
pub fn short_and_merge_connectors(
    cnv: &mut Canvas,
    list: &[ConnId],
) -> (Vec<ConnId>, HashSet<ConnId>) {
    let mut masters: Vec<ConnId> = Vec::new();
    let mut absorbed: HashSet<ConnId> = HashSet::new();
    for &c in list {
        if absorbed.contains(&c) || cnv.conn_index(c).is_none() {
            continue;
        }
        let mut cur = c;
        loop {
            let outcome = short_and_merge_connector(cnv, cur);
            for id in &outcome.merged {
                if *id != outcome.master {
                    absorbed.insert(*id);
                }
            }
            let progressed = outcome.merged.len() > 1;
            cur = outcome.master;
            if !progressed {
                break;
            }
        }
        if !masters.contains(&cur) {
            masters.push(cur);
        }
    }
    for &m in &masters {
        repair_seg_and_junc(cnv, m, true);
    }
    (masters, absorbed)
}
