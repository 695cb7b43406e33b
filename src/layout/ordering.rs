//! Path ordering on shared segments. When multiple routed edges traverse
//! the same routing-graph edge, nudging needs a consistent order for them
//! so the separated tracks don't cross mid-corridor. Each edge gets a
//! rank within the first shared segment it appears in, recorded per
//! orientation.

use std::collections::BTreeMap;

use crate::geometry::Point;

use super::router::EdgeRoute;
use super::routing_graph::RoutingGraph;

/// Perpendicular sort keys for edges on shared segments, one map per
/// orientation. Missing entries sort last.
#[derive(Debug, Default)]
pub struct EdgeOrdering {
    h_keys: BTreeMap<usize, f64>,
    v_keys: BTreeMap<usize, f64>,
}

impl EdgeOrdering {
    /// Sort key within horizontal shared segments.
    pub fn h_key(&self, edge_idx: usize) -> f64 {
        self.h_keys.get(&edge_idx).copied().unwrap_or(f64::MAX)
    }

    /// Sort key within vertical shared segments.
    pub fn v_key(&self, edge_idx: usize) -> f64 {
        self.v_keys.get(&edge_idx).copied().unwrap_or(f64::MAX)
    }
}

/// Computes ordering keys for edges sharing routing-graph segments.
///
/// Consecutive route points are mapped back to their nearest graph nodes;
/// pairs used by more than one route are shared segments. Users of a
/// horizontal segment sort by the Y of their route's first point, users
/// of a vertical one by its X. The resulting rank is the ordering key;
/// the first shared segment an edge appears in wins.
pub fn order_edges_on_shared_segments(routes: &[EdgeRoute], rg: &RoutingGraph) -> EdgeOrdering {
    let mut ordering = EdgeOrdering::default();
    if routes.len() <= 1 || rg.nodes.is_empty() {
        return ordering;
    }

    // Canonical (min, max) graph-node pair → route indices using it.
    // BTreeMap so segment processing order is stable.
    let mut segment_users: BTreeMap<(usize, usize), Vec<usize>> = BTreeMap::new();

    for (ri, route) in routes.iter().enumerate() {
        if route.points.len() < 2 {
            continue;
        }
        for pair in route.points.windows(2) {
            let from = rg.find_nearest(pair[0]);
            let to = rg.find_nearest(pair[1]);
            let (from, to) = match (from, to) {
                (Some(f), Some(t)) if f != t => (f, t),
                _ => continue,
            };
            let key = (from.min(to), from.max(to));
            segment_users.entry(key).or_default().push(ri);
        }
    }

    for (&(from, to), users) in &segment_users {
        if users.len() <= 1 {
            continue;
        }

        let mut deduped: Vec<usize> = Vec::with_capacity(users.len());
        for &u in users {
            if !deduped.contains(&u) {
                deduped.push(u);
            }
        }
        if deduped.len() <= 1 {
            continue;
        }

        let from_pos = rg.nodes[from].pos;
        let to_pos = rg.nodes[to].pos;
        let is_horizontal = (from_pos.y - to_pos.y).abs() < (from_pos.x - to_pos.x).abs();

        deduped.sort_by(|&a, &b| {
            let ka = first_point_key(&routes[a], is_horizontal);
            let kb = first_point_key(&routes[b], is_horizontal);
            ka.total_cmp(&kb).then_with(|| a.cmp(&b))
        });

        for (rank, &edge_idx) in deduped.iter().enumerate() {
            let keys = if is_horizontal {
                &mut ordering.h_keys
            } else {
                &mut ordering.v_keys
            };
            keys.entry(edge_idx).or_insert(rank as f64);
        }
    }

    ordering
}

/// Perpendicular position of a route for sorting within a shared
/// segment: Y of the first point for horizontal segments, X for
/// vertical ones.
fn first_point_key(route: &EdgeRoute, use_y: bool) -> f64 {
    let first = match route.points.first() {
        Some(p) => *p,
        None => Point::default(),
    };
    if use_y {
        first.y
    } else {
        first.x
    }
}
