//! Corridor edge router for pre-positioned nodes.
//!
//! Pipeline per invocation: port assignment, channel discovery, routing
//! graph, modified Dijkstra per edge in priority order with crossing
//! penalties, path ordering on shared segments, and constraint-based
//! nudging. Nodes are never moved; only edge routes and label positions
//! are written.

use std::collections::HashMap;

use tracing::debug;

use crate::config::RouterOptions;
use crate::error::LayoutError;
use crate::geometry::{near_eq, segments_cross, Point, Rect, Side};
use crate::graph::{Graph, LabelPosition};

use super::channels::find_channels;
use super::dijkstra::dijkstra_route;
use super::nudging::nudge_routes;
use super::ordering::order_edges_on_shared_segments;
use super::ports::{assign_ports, PortAssignment};
use super::routing_graph::{build_routing_graph, RoutingGraph};

/// Margin around the node bounding box reserved for boundary corridors.
const BOUNDARY_MARGIN: f64 = 40.0;

/// The routed polyline of a single edge. `edge_idx` indexes the routed
/// edge list of one invocation, not the graph's full edge list.
#[derive(Debug, Clone)]
pub struct EdgeRoute {
    pub edge_idx: usize,
    pub points: Vec<Point>,
}

/// Routes `edge_indices` orthogonally through the corridors between their
/// sibling boxes. Node positions must already be final.
pub fn route_edges(
    graph: &mut Graph,
    edge_indices: &[usize],
    opts: &RouterOptions,
) -> Result<(), LayoutError> {
    if edge_indices.is_empty() {
        return Ok(());
    }
    if graph.nodes.is_empty() {
        return Err(LayoutError::NoObjects);
    }
    for &ei in edge_indices {
        let edge = graph
            .edges
            .get(ei)
            .ok_or(LayoutError::UnknownNode { edge: ei, node: 0 })?;
        for node in [edge.src, edge.dst] {
            if node >= graph.nodes.len() {
                return Err(LayoutError::UnknownNode { edge: ei, node });
            }
        }
    }

    debug!("router: routing {} edges", edge_indices.len());

    // Obstacles: all siblings under the common parent, or the union of
    // endpoints when no single parent covers the edge set.
    let objects = collect_objects(graph, edge_indices);
    if objects.is_empty() {
        return Err(LayoutError::NoObjects);
    }

    let mut local_index: HashMap<usize, usize> = HashMap::with_capacity(objects.len());
    let mut boxes: Vec<Rect> = Vec::with_capacity(objects.len());
    for (i, &obj) in objects.iter().enumerate() {
        local_index.insert(obj, i);
        boxes.push(graph.nodes[obj].bounds);
    }

    let endpoints: Vec<(usize, usize)> = edge_indices
        .iter()
        .map(|&ei| {
            let edge = &graph.edges[ei];
            (local_index[&edge.src], local_index[&edge.dst])
        })
        .collect();

    let bbox = compute_bounding_box(&boxes);
    let ports = assign_ports(&boxes, &endpoints);
    let channels = find_channels(&boxes, bbox);
    let mut rg = build_routing_graph(&channels, &ports, &boxes);

    let mut routes = route_all_edges(&mut rg, &ports, opts.crossing_penalty as f64);

    let ordering = order_edges_on_shared_segments(&routes, &rg);
    nudge_routes(&mut routes, &channels, &ordering, opts.edge_spacing as f64);

    // Port positions already lie on shape boundaries, so the route is
    // applied as-is after a final simplification pass.
    for route in routes {
        let ei = edge_indices[route.edge_idx];
        if route.points.len() >= 2 {
            graph.edges[ei].route = simplify_route(&route.points);
        } else {
            let src = graph.nodes[graph.edges[ei].src].bounds.center();
            let dst = graph.nodes[graph.edges[ei].dst].bounds.center();
            graph.edges[ei].route = vec![src, dst];
        }
        let edge = &mut graph.edges[ei];
        if edge.label.is_some() && edge.label_position.is_none() {
            edge.label_position = Some(LabelPosition::InsideMiddleCenter);
        }
    }

    Ok(())
}

/// Obstacle set for one invocation: the common parent's children when one
/// exists, otherwise the deduplicated union of endpoint nodes. Endpoints
/// missing from the sibling list are appended so their boxes always
/// participate.
fn collect_objects(graph: &Graph, edge_indices: &[usize]) -> Vec<usize> {
    let first_parent = graph.nodes[graph.edges[edge_indices[0]].src].parent;
    let common = edge_indices.iter().all(|&ei| {
        let edge = &graph.edges[ei];
        graph.nodes[edge.src].parent == first_parent && graph.nodes[edge.dst].parent == first_parent
    });

    let mut objects: Vec<usize> = Vec::new();
    if common {
        match first_parent {
            Some(p) => objects.extend(graph.nodes[p].children.iter().copied()),
            None => objects.extend(graph.roots()),
        }
    }

    // Union fallback, and a guarantee that endpoint boxes always
    // participate even when the sibling list misses them.
    for &ei in edge_indices {
        let edge = &graph.edges[ei];
        if !objects.contains(&edge.src) {
            objects.push(edge.src);
        }
        if !objects.contains(&edge.dst) {
            objects.push(edge.dst);
        }
    }

    objects
}

/// Bounding box of all obstacle boxes, expanded for boundary corridors.
pub(super) fn compute_bounding_box(boxes: &[Rect]) -> Rect {
    if boxes.is_empty() {
        return Rect::default();
    }
    let mut min_x = boxes[0].left();
    let mut min_y = boxes[0].top();
    let mut max_x = boxes[0].right();
    let mut max_y = boxes[0].bottom();
    for b in &boxes[1..] {
        min_x = min_x.min(b.left());
        min_y = min_y.min(b.top());
        max_x = max_x.max(b.right());
        max_y = max_y.max(b.bottom());
    }
    Rect::new(
        min_x - BOUNDARY_MARGIN,
        min_y - BOUNDARY_MARGIN,
        (max_x - min_x) + 2.0 * BOUNDARY_MARGIN,
        (max_y - min_y) + 2.0 * BOUNDARY_MARGIN,
    )
}

/// Routes every edge through the routing graph in priority order. After
/// each committed edge, crossing penalties are applied to graph edges
/// that would cross it before the next edge's search runs, and reversed
/// afterwards, so the weights always reflect exactly the committed set.
pub(super) fn route_all_edges(
    rg: &mut RoutingGraph,
    ports: &PortAssignment,
    crossing_penalty: f64,
) -> Vec<EdgeRoute> {
    let n = ports.src_ports.len();
    let mut routes: Vec<EdgeRoute> = (0..n)
        .map(|i| EdgeRoute {
            edge_idx: i,
            points: Vec::new(),
        })
        .collect();

    let order = edge_routing_order(ports);
    let mut routed_segments: Vec<(usize, usize)> = Vec::new();

    for &i in &order {
        let src_pos = ports.src_ports[i].pos;
        let dst_pos = ports.dst_ports[i].pos;

        let (src_node, dst_node) = match (rg.find_nearest(src_pos), rg.find_nearest(dst_pos)) {
            (Some(s), Some(d)) if s != d => (s, d),
            _ => {
                // Isolated port or coincident endpoints: straight segment
                // between the ports.
                routes[i].points = vec![src_pos, dst_pos];
                continue;
            }
        };

        apply_crossing_penalties(rg, &routed_segments, crossing_penalty);
        let path = dijkstra_route(rg, src_node, dst_node);
        apply_crossing_penalties(rg, &routed_segments, -crossing_penalty);

        let path = match path {
            Some(p) if !p.is_empty() => p,
            _ => {
                routes[i].points = vec![src_pos, dst_pos];
                continue;
            }
        };

        let mut points = Vec::with_capacity(path.len() + 2);
        points.push(src_pos);
        for &node_id in &path {
            points.push(rg.nodes[node_id].pos);
        }
        points.push(dst_pos);
        routes[i].points = simplify_route(&points);

        routed_segments.push((src_node, path[0]));
        for pair in path.windows(2) {
            routed_segments.push((pair[0], pair[1]));
        }
    }

    routes
}

/// Adds `delta` to the weight of every routing-graph edge that crosses a
/// committed segment. Called with the negated delta to reverse; the pair
/// is an exact involution.
pub(super) fn apply_crossing_penalties(
    rg: &mut RoutingGraph,
    routed: &[(usize, usize)],
    delta: f64,
) {
    if routed.is_empty() {
        return;
    }
    let RoutingGraph { nodes, adj } = rg;
    for a in 0..adj.len() {
        for ei in 0..adj[a].len() {
            let e = adj[a][ei];
            if e.from >= e.to {
                continue; // handle each undirected edge from its lower end
            }
            let from_pos = nodes[e.from].pos;
            let to_pos = nodes[e.to].pos;
            let crosses = routed
                .iter()
                .any(|&(rf, rt)| segments_cross(from_pos, to_pos, nodes[rf].pos, nodes[rt].pos));
            if !crosses {
                continue;
            }
            adj[a][ei].weight += delta;
            for rev in adj[e.to].iter_mut() {
                if rev.from == e.to && rev.to == e.from {
                    rev.weight += delta;
                    break;
                }
            }
        }
    }
}

/// Routing order: direct face pairs first (they own the most constrained
/// corridors), then decreasing Manhattan port distance so long edges
/// claim corridors before short ones. Ties fall back to input order.
pub(super) fn edge_routing_order(ports: &PortAssignment) -> Vec<usize> {
    let n = ports.src_ports.len();
    let mut order: Vec<usize> = (0..n).collect();

    let priority = |i: usize| -> (u8, f64) {
        let src = &ports.src_ports[i];
        let dst = &ports.dst_ports[i];
        let direct = matches!(
            (src.side, dst.side),
            (Side::Bottom, Side::Top)
                | (Side::Top, Side::Bottom)
                | (Side::Right, Side::Left)
                | (Side::Left, Side::Right)
        );
        let dist = (src.pos.x - dst.pos.x).abs() + (src.pos.y - dst.pos.y).abs();
        (if direct { 0 } else { 1 }, dist)
    };

    order.sort_by(|&a, &b| {
        let (pa, da) = priority(a);
        let (pb, db) = priority(b);
        pa.cmp(&pb)
            .then_with(|| db.total_cmp(&da))
            .then_with(|| a.cmp(&b))
    });
    order
}

/// Removes duplicate and collinear points and snaps near-aligned bends so
/// sub-pixel jitter from the routing graph never reaches the renderer.
/// The first and last points are ports on shape boundaries and are left
/// untouched; residual misalignment at the ends is absorbed by snapping
/// the adjacent interior point instead.
pub fn simplify_route(points: &[Point]) -> Vec<Point> {
    if points.len() <= 1 {
        return points.to_vec();
    }

    let first = points[0];
    let last = *points.last().unwrap();

    let mut deduped: Vec<Point> = vec![first];
    for p in &points[1..] {
        let prev = *deduped.last().unwrap();
        if !near_eq(p.x, prev.x) || !near_eq(p.y, prev.y) {
            deduped.push(*p);
        }
    }
    // The destination port must survive deduplication.
    if deduped.len() == 1 {
        deduped.push(last);
    } else if *deduped.last().unwrap() != last {
        *deduped.last_mut().unwrap() = last;
    }
    if deduped.len() <= 2 {
        return deduped;
    }

    let mut result: Vec<Point> = vec![first];
    for i in 1..deduped.len() - 1 {
        let prev = *result.last().unwrap();
        let next = deduped[i + 1];
        let mut curr = deduped[i];

        let same_x = near_eq(prev.x, curr.x) && near_eq(curr.x, next.x);
        let same_y = near_eq(prev.y, curr.y) && near_eq(curr.y, next.y);
        if same_x || same_y {
            continue;
        }

        // A real bend: snap it into exact alignment with its neighbours.
        if near_eq(prev.x, curr.x) {
            curr.x = prev.x;
        } else if near_eq(prev.y, curr.y) {
            curr.y = prev.y;
        }
        if near_eq(curr.x, next.x) {
            curr.x = next.x;
        } else if near_eq(curr.y, next.y) {
            curr.y = next.y;
        }
        result.push(curr);
    }

    // Align the final interior point with the destination port.
    if result.len() >= 2 {
        let idx = result.len() - 1;
        let prev = result[idx];
        if near_eq(prev.x, last.x) {
            result[idx].x = last.x;
        } else if near_eq(prev.y, last.y) {
            result[idx].y = last.y;
        }
    }
    result.push(last);
    result
}
