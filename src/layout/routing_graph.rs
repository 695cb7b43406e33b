//! Routing-graph construction: intersects channel representatives into a
//! partial grid. Vertices sit at ports and at H/V representative
//! intersections; edges connect consecutive vertices along one
//! representative and never pass through a node box, so any path through
//! the graph is an orthogonal route that clears every obstacle.

use std::collections::HashMap;

use crate::geometry::{Orientation, Point, Rect, COORD_TOLERANCE};

use super::channels::{build_representatives, Channel, Segment};
use super::ports::PortAssignment;

/// Coordinates are snapped to this grid before interning, so vertices
/// that ought to coincide actually do.
const SNAP_GRID: f64 = 0.01;

#[derive(Debug, Clone, Copy)]
pub struct RoutingGraphNode {
    pub id: usize,
    pub pos: Point,
}

/// One directed half of an undirected routing-graph edge.
#[derive(Debug, Clone, Copy)]
pub struct RoutingEdge {
    pub from: usize,
    pub to: usize,
    pub weight: f64,
    pub orientation: Orientation,
}

/// The partial grid used for edge routing. Undirected: every edge is
/// stored in both endpoint adjacency lists.
#[derive(Debug, Clone, Default)]
pub struct RoutingGraph {
    pub nodes: Vec<RoutingGraphNode>,
    pub adj: Vec<Vec<RoutingEdge>>,
}

impl RoutingGraph {
    /// Id of the graph node closest to `p` by squared distance, or None
    /// on an empty graph.
    pub fn find_nearest(&self, p: Point) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for node in &self.nodes {
            let d = node.pos.dist_sq(p);
            match best {
                Some((_, best_d)) if d >= best_d => {}
                _ => best = Some((node.id, d)),
            }
        }
        best.map(|(id, _)| id)
    }
}

/// Builds the partial grid from channels and ports. `boxes` are the
/// obstacle rectangles; graph edges crossing any box interior are
/// rejected.
pub fn build_routing_graph(
    channels: &[Channel],
    ports: &PortAssignment,
    boxes: &[Rect],
) -> RoutingGraph {
    let segments = build_representatives(channels, ports);

    let mut h_segs: Vec<Segment> = Vec::new();
    let mut v_segs: Vec<Segment> = Vec::new();
    for s in &segments {
        match s.orientation {
            Orientation::Horizontal => h_segs.push(*s),
            Orientation::Vertical => v_segs.push(*s),
        }
    }

    let mut interner = NodeInterner::default();

    for p in ports.all_ports() {
        interner.intern(p.pos);
    }

    // Representative intersections become vertices when each segment's
    // range contains the other's fixed coordinate.
    for h in &h_segs {
        for v in &v_segs {
            let h_y = h.start.y;
            let v_x = v.start.x;
            if v_x >= h.start.x - COORD_TOLERANCE
                && v_x <= h.end.x + COORD_TOLERANCE
                && h_y >= v.start.y - COORD_TOLERANCE
                && h_y <= v.end.y + COORD_TOLERANCE
            {
                interner.intern(Point::new(v_x, h_y));
            }
        }
    }

    for s in &segments {
        interner.intern(s.start);
        interner.intern(s.end);
    }

    let nodes = interner.nodes;
    let mut adj: Vec<Vec<RoutingEdge>> = vec![Vec::new(); nodes.len()];

    for seg in &segments {
        connect_along_segment(seg, &nodes, &mut adj, boxes);
    }

    RoutingGraph { nodes, adj }
}

#[derive(Default)]
struct NodeInterner {
    lookup: HashMap<(i64, i64), usize>,
    nodes: Vec<RoutingGraphNode>,
}

impl NodeInterner {
    fn intern(&mut self, p: Point) -> usize {
        let px = (p.x / SNAP_GRID).round() * SNAP_GRID;
        let py = (p.y / SNAP_GRID).round() * SNAP_GRID;
        let key = ((p.x / SNAP_GRID).round() as i64, (p.y / SNAP_GRID).round() as i64);
        if let Some(&id) = self.lookup.get(&key) {
            return id;
        }
        let id = self.nodes.len();
        self.nodes.push(RoutingGraphNode {
            id,
            pos: Point::new(px, py),
        });
        self.lookup.insert(key, id);
        id
    }
}

/// Connects consecutive graph nodes lying on `seg` with undirected edges
/// weighted by Euclidean distance.
fn connect_along_segment(
    seg: &Segment,
    nodes: &[RoutingGraphNode],
    adj: &mut [Vec<RoutingEdge>],
    boxes: &[Rect],
) {
    let mut on_seg: Vec<usize> = Vec::new();
    for node in nodes {
        let on = match seg.orientation {
            Orientation::Horizontal => {
                (node.pos.y - seg.start.y).abs() < COORD_TOLERANCE
                    && node.pos.x >= seg.start.x - COORD_TOLERANCE
                    && node.pos.x <= seg.end.x + COORD_TOLERANCE
            }
            Orientation::Vertical => {
                (node.pos.x - seg.start.x).abs() < COORD_TOLERANCE
                    && node.pos.y >= seg.start.y - COORD_TOLERANCE
                    && node.pos.y <= seg.end.y + COORD_TOLERANCE
            }
        };
        if on {
            on_seg.push(node.id);
        }
    }

    match seg.orientation {
        Orientation::Horizontal => {
            on_seg.sort_by(|&a, &b| nodes[a].pos.x.total_cmp(&nodes[b].pos.x).then(a.cmp(&b)));
        }
        Orientation::Vertical => {
            on_seg.sort_by(|&a, &b| nodes[a].pos.y.total_cmp(&nodes[b].pos.y).then(a.cmp(&b)));
        }
    }

    for pair in on_seg.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        let pa = nodes[a].pos;
        let pb = nodes[b].pos;
        let w = (pb.x - pa.x).hypot(pb.y - pa.y);
        if w < COORD_TOLERANCE {
            continue;
        }
        if edge_passes_through_box(pa, pb, boxes) {
            continue;
        }
        adj[a].push(RoutingEdge {
            from: a,
            to: b,
            weight: w,
            orientation: seg.orientation,
        });
        adj[b].push(RoutingEdge {
            from: b,
            to: a,
            weight: w,
            orientation: seg.orientation,
        });
    }
}

/// True when the (axis-aligned) segment from `a` to `b` passes through the
/// interior of any box. Both endpoints sit on representative lines, so
/// only the orthogonal cases need handling.
pub(super) fn edge_passes_through_box(a: Point, b: Point, boxes: &[Rect]) -> bool {
    for rect in boxes {
        if (a.x - b.x).abs() < COORD_TOLERANCE {
            let x = (a.x + b.x) / 2.0;
            let min_y = a.y.min(b.y);
            let max_y = a.y.max(b.y);
            if x > rect.left() + COORD_TOLERANCE
                && x < rect.right() - COORD_TOLERANCE
                && max_y > rect.top() + COORD_TOLERANCE
                && min_y < rect.bottom() - COORD_TOLERANCE
            {
                return true;
            }
        } else if (a.y - b.y).abs() < COORD_TOLERANCE {
            let y = (a.y + b.y) / 2.0;
            let min_x = a.x.min(b.x);
            let max_x = a.x.max(b.x);
            if y > rect.top() + COORD_TOLERANCE
                && y < rect.bottom() - COORD_TOLERANCE
                && max_x > rect.left() + COORD_TOLERANCE
                && min_x < rect.right() - COORD_TOLERANCE
            {
                return true;
            }
        }
    }
    false
}
