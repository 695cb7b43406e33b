//! L/Z router for the standalone pipeline: grid-aware orthogonal edge
//! routing with bends near the target entry, port spreading, and obstacle
//! avoidance.
//!
//! Route shapes, tried in order of bend count:
//! - Straight: same row/col → 2 points, 0 bends
//! - L-route:  diagonal cells → 3 points, 1 bend
//! - Z-route:  when the L crosses an occupied cell → 4 points, 2 bends
//!   through the channel between rows or columns

use std::collections::{BTreeMap, HashMap};

use crate::geometry::{near_eq, segment_intersects_rect, Point, Rect, Side};
use crate::graph::Graph;

use super::placement::{GridCell, GridInfo};

/// Safety margin around node boxes when testing candidate routes.
const OBSTACLE_MARGIN: f64 = 4.0;
/// Ports keep this distance from face corners.
const CORNER_GAP: f64 = 12.0;
/// Minimum gap between adjacent ports on one face.
const MIN_PORT_CLEARANCE: f64 = 8.0;

/// One endpoint of an edge on a node face, before and after spreading.
#[derive(Debug, Clone, Copy)]
struct PortSlot {
    edge_idx: usize,
    is_source: bool,
}

/// Routes all edges of the placed graph. Ports are assigned per face, then
/// each edge gets the first straight/L/Z candidate whose segments avoid
/// every non-endpoint node box.
pub fn grid_route_edges(graph: &mut Graph, info: &GridInfo) {
    if graph.edges.is_empty() || info.placement.is_empty() {
        return;
    }

    let mut local_index: HashMap<usize, usize> = HashMap::with_capacity(info.objects.len());
    for (i, &obj) in info.objects.iter().enumerate() {
        local_index.insert(obj, i);
    }

    // Pass 1: deterministic faces for same-row/col and strictly dominant
    // diagonals; equal diagonals deferred.
    let mut edge_faces: Vec<Option<(Side, Side)>> = vec![None; graph.edges.len()];
    let mut face_load: HashMap<(usize, Side), usize> = HashMap::new();
    let mut flex_edges: Vec<usize> = Vec::new();

    for (ei, edge) in graph.edges.iter().enumerate() {
        let (si, di) = match (local_index.get(&edge.src), local_index.get(&edge.dst)) {
            (Some(&si), Some(&di)) => (si, di),
            _ => continue,
        };
        let (sc, dc) = (info.placement[si], info.placement[di]);
        let dcol = dc.col - sc.col;
        let drow = dc.row - sc.row;

        if dcol != 0 && dcol.abs() == drow.abs() {
            flex_edges.push(ei);
            continue;
        }

        let (sf, df) = select_faces(sc, dc);
        edge_faces[ei] = Some((sf, df));
        *face_load.entry((si, sf)).or_insert(0) += 1;
        *face_load.entry((di, df)).or_insert(0) += 1;
    }

    // Pass 2: equal diagonals pick the less loaded of their two candidate
    // faces independently per endpoint, vertical winning ties. Mixed pairs
    // (e.g. source Bottom, destination Left) push L-bends toward the
    // layout corners.
    for &ei in &flex_edges {
        let edge = &graph.edges[ei];
        let si = local_index[&edge.src];
        let di = local_index[&edge.dst];
        let (sc, dc) = (info.placement[si], info.placement[di]);
        let dcol = dc.col - sc.col;
        let drow = dc.row - sc.row;

        let (src_v, dst_v) = if drow > 0 {
            (Side::Bottom, Side::Top)
        } else {
            (Side::Top, Side::Bottom)
        };
        let (src_h, dst_h) = if dcol > 0 {
            (Side::Right, Side::Left)
        } else {
            (Side::Left, Side::Right)
        };

        let load = |k: (usize, Side)| face_load.get(&k).copied().unwrap_or(0);
        let sf = if load((si, src_h)) < load((si, src_v)) {
            src_h
        } else {
            src_v
        };
        let df = if load((di, dst_h)) < load((di, dst_v)) {
            dst_h
        } else {
            dst_v
        };

        edge_faces[ei] = Some((sf, df));
        *face_load.entry((si, sf)).or_insert(0) += 1;
        *face_load.entry((di, df)).or_insert(0) += 1;
    }

    // Group ports by (node, face); BTreeMap keeps downstream iteration
    // deterministic.
    let mut face_groups: BTreeMap<(usize, Side), Vec<PortSlot>> = BTreeMap::new();
    for (ei, edge) in graph.edges.iter().enumerate() {
        let (faces, si, di) = match (
            edge_faces[ei],
            local_index.get(&edge.src),
            local_index.get(&edge.dst),
        ) {
            (Some(faces), Some(&si), Some(&di)) => (faces, si, di),
            _ => continue,
        };
        face_groups.entry((si, faces.0)).or_default().push(PortSlot {
            edge_idx: ei,
            is_source: true,
        });
        face_groups.entry((di, faces.1)).or_default().push(PortSlot {
            edge_idx: ei,
            is_source: false,
        });
    }

    let mut src_ports: Vec<Option<Point>> = vec![None; graph.edges.len()];
    let mut dst_ports: Vec<Option<Point>> = vec![None; graph.edges.len()];
    let group_sizes: HashMap<(usize, Side), usize> = face_groups
        .iter()
        .map(|(&key, slots)| (key, slots.len()))
        .collect();

    for (&(node_local, face), slots) in face_groups.iter_mut() {
        sort_ports_by_neighbour(slots, graph, face);
        let bounds = graph.nodes[info.objects[node_local]].bounds;
        let n = slots.len();
        for (i, slot) in slots.iter().enumerate() {
            let t = (i as f64 + 1.0) / (n as f64 + 1.0);
            let pos = face_point(&bounds, face, t, n);
            if slot.is_source {
                src_ports[slot.edge_idx] = Some(pos);
            } else {
                dst_ports[slot.edge_idx] = Some(pos);
            }
        }
    }

    // Straight-edge alignment: after independent spreading, the two ports
    // of an adjacent same-column (or same-row) edge may disagree on the
    // cross coordinate, which would render a slanted "straight" line.
    // Align both to the port on the face with fewer ports: that one sits
    // at face center and has no room to shift.
    for (ei, edge) in graph.edges.iter().enumerate() {
        let (faces, si, di) = match (
            edge_faces[ei],
            local_index.get(&edge.src),
            local_index.get(&edge.dst),
        ) {
            (Some(faces), Some(&si), Some(&di)) => (faces, si, di),
            _ => continue,
        };
        let (sc, dc) = (info.placement[si], info.placement[di]);
        let (src_pos, dst_pos) = match (src_ports[ei], dst_ports[ei]) {
            (Some(s), Some(d)) => (s, d),
            _ => continue,
        };

        let vertical_pair = matches!(
            faces,
            (Side::Bottom, Side::Top) | (Side::Top, Side::Bottom)
        );
        if vertical_pair && sc.col == dc.col && (sc.row - dc.row).abs() == 1 {
            let src_count = group_sizes.get(&(si, faces.0)).copied().unwrap_or(1);
            let dst_count = group_sizes.get(&(di, faces.1)).copied().unwrap_or(1);
            let align_x = if src_count <= dst_count {
                src_pos.x
            } else {
                dst_pos.x
            };
            let src_bounds = graph.nodes[edge.src].bounds;
            let dst_bounds = graph.nodes[edge.dst].bounds;
            if align_x >= src_bounds.left()
                && align_x <= src_bounds.right()
                && align_x >= dst_bounds.left()
                && align_x <= dst_bounds.right()
            {
                src_ports[ei] = Some(Point::new(align_x, src_pos.y));
                dst_ports[ei] = Some(Point::new(align_x, dst_pos.y));
            }
        }

        let horizontal_pair = matches!(
            faces,
            (Side::Right, Side::Left) | (Side::Left, Side::Right)
        );
        if horizontal_pair && sc.row == dc.row && (sc.col - dc.col).abs() == 1 {
            let src_count = group_sizes.get(&(si, faces.0)).copied().unwrap_or(1);
            let dst_count = group_sizes.get(&(di, faces.1)).copied().unwrap_or(1);
            let align_y = if src_count <= dst_count {
                src_pos.y
            } else {
                dst_pos.y
            };
            let src_bounds = graph.nodes[edge.src].bounds;
            let dst_bounds = graph.nodes[edge.dst].bounds;
            if align_y >= src_bounds.top()
                && align_y <= src_bounds.bottom()
                && align_y >= dst_bounds.top()
                && align_y <= dst_bounds.bottom()
            {
                src_ports[ei] = Some(Point::new(src_pos.x, align_y));
                dst_ports[ei] = Some(Point::new(dst_pos.x, align_y));
            }
        }
    }

    // Route construction.
    for ei in 0..graph.edges.len() {
        let edge = &graph.edges[ei];
        let resolved = match (src_ports[ei], dst_ports[ei], edge_faces[ei]) {
            (Some(s), Some(d), Some(faces)) => (s, d, faces),
            _ => {
                // Endpoint outside the placed set: center-to-center.
                let route = vec![
                    graph.nodes[edge.src].bounds.center(),
                    graph.nodes[edge.dst].bounds.center(),
                ];
                graph.edges[ei].route = route;
                continue;
            }
        };
        let (src_pos, dst_pos, faces) = resolved;
        let si = local_index[&edge.src];
        let di = local_index[&edge.dst];
        let route = construct_route(
            src_pos,
            dst_pos,
            faces.0,
            faces.1,
            info.placement[si],
            info.placement[di],
            info,
            graph,
        );
        graph.edges[ei].route = route;
    }
}

/// Exit face for the source and entry face for the destination, from grid
/// positions alone. Equal diagonals prefer vertical faces here; the
/// load-balanced second pass overrides this for edges it handles.
pub(super) fn select_faces(src_cell: GridCell, dst_cell: GridCell) -> (Side, Side) {
    let dc = dst_cell.col - src_cell.col;
    let dr = dst_cell.row - src_cell.row;

    if dr == 0 && dc == 0 {
        return (Side::Right, Side::Left);
    }

    if dr == 0 {
        return if dc > 0 {
            (Side::Right, Side::Left)
        } else {
            (Side::Left, Side::Right)
        };
    }

    if dc == 0 {
        return if dr > 0 {
            (Side::Bottom, Side::Top)
        } else {
            (Side::Top, Side::Bottom)
        };
    }

    if dc.abs() > dr.abs() {
        return if dc > 0 {
            (Side::Right, Side::Left)
        } else {
            (Side::Left, Side::Right)
        };
    }
    if dr > 0 {
        (Side::Bottom, Side::Top)
    } else {
        (Side::Top, Side::Bottom)
    }
}

/// Sorts ports on one face by the center of each port's neighbour
/// (the other endpoint): X for Top/Bottom faces, Y for Left/Right.
fn sort_ports_by_neighbour(slots: &mut [PortSlot], graph: &Graph, face: Side) {
    slots.sort_by(|a, b| {
        let na = neighbour_center(graph, a);
        let nb = neighbour_center(graph, b);
        let key = match face {
            Side::Top | Side::Bottom => (na.x, nb.x),
            Side::Left | Side::Right => (na.y, nb.y),
        };
        key.0
            .total_cmp(&key.1)
            .then_with(|| a.edge_idx.cmp(&b.edge_idx))
    });
}

fn neighbour_center(graph: &Graph, slot: &PortSlot) -> Point {
    let edge = &graph.edges[slot.edge_idx];
    let other = if slot.is_source { edge.dst } else { edge.src };
    graph.nodes[other].bounds.center()
}

/// Point on a face at parameter `t ∈ (0,1)` of the usable span. The corner
/// gap collapses proportionally when the face cannot fit `n` ports with
/// the minimum clearance.
fn face_point(bounds: &Rect, face: Side, t: f64, n: usize) -> Point {
    let span = match face {
        Side::Top | Side::Bottom => bounds.w,
        Side::Left | Side::Right => bounds.h,
    };
    let mut corner_gap = CORNER_GAP;
    let mut usable = span - 2.0 * corner_gap;
    if usable < (n as f64 + 1.0) * MIN_PORT_CLEARANCE {
        corner_gap = ((span - (n as f64 + 1.0) * MIN_PORT_CLEARANCE) / 2.0).max(0.0);
        usable = span - 2.0 * corner_gap;
    }

    match face {
        Side::Top => Point::new(bounds.left() + corner_gap + usable * t, bounds.top()),
        Side::Bottom => Point::new(bounds.left() + corner_gap + usable * t, bounds.bottom()),
        Side::Left => Point::new(bounds.left(), bounds.top() + corner_gap + usable * t),
        Side::Right => Point::new(bounds.right(), bounds.top() + corner_gap + usable * t),
    }
}

/// Builds an orthogonal route from `src` to `dst`, taking the first
/// candidate that avoids every non-endpoint node box:
/// 1. straight (same row/col only), 2. L matching the source exit axis,
/// 3. the other L, 4. Z through the channel implied by the destination
/// face, 5. Z fallbacks with perpendicular/opposite channels, 6. the
/// first Z regardless.
#[allow(clippy::too_many_arguments)]
pub(super) fn construct_route(
    src: Point,
    dst: Point,
    src_face: Side,
    dst_face: Side,
    src_cell: GridCell,
    dst_cell: GridCell,
    info: &GridInfo,
    graph: &Graph,
) -> Vec<Point> {
    // Straight only when the two ports actually line up; spread ports on
    // a crowded face would otherwise produce a slanted two-point route.
    let ports_aligned = (src_cell.row == dst_cell.row && near_eq(src.y, dst.y))
        || (src_cell.col == dst_cell.col && near_eq(src.x, dst.x));
    if ports_aligned {
        let straight = vec![src, dst];
        if !route_crosses_node(&straight, info, graph, src_cell, dst_cell) {
            return straight;
        }
    }

    // The first leg must leave along the source face's exit axis.
    let (bend_primary, bend_alt) = if src_face.is_vertical_exit() {
        (Point::new(src.x, dst.y), Point::new(dst.x, src.y))
    } else {
        (Point::new(dst.x, src.y), Point::new(src.x, dst.y))
    };

    let l_primary = vec![src, bend_primary, dst];
    if !route_crosses_node(&l_primary, info, graph, src_cell, dst_cell) {
        return l_primary;
    }
    let l_alt = vec![src, bend_alt, dst];
    if !route_crosses_node(&l_alt, info, graph, src_cell, dst_cell) {
        return l_alt;
    }

    let z_route = build_z_route(src, dst, dst_face, src_cell, dst_cell, info);
    if !route_crosses_node(&z_route, info, graph, src_cell, dst_cell) {
        return z_route;
    }

    let perp = dst_face.perpendicular();
    let z_perp = build_z_route(src, dst, perp, src_cell, dst_cell, info);
    if !route_crosses_node(&z_perp, info, graph, src_cell, dst_cell) {
        return z_perp;
    }
    let z_opp = build_z_route(src, dst, perp.opposite(), src_cell, dst_cell, info);
    if !route_crosses_node(&z_opp, info, graph, src_cell, dst_cell) {
        return z_opp;
    }

    z_route
}

/// 4-point Z through the channel between the two rows or columns.
fn build_z_route(
    src: Point,
    dst: Point,
    dst_face: Side,
    src_cell: GridCell,
    dst_cell: GridCell,
    info: &GridInfo,
) -> Vec<Point> {
    match dst_face {
        Side::Top | Side::Bottom => {
            let channel_y = horizontal_channel_y(src.y, src_cell, dst_cell, info);
            vec![
                src,
                Point::new(src.x, channel_y),
                Point::new(dst.x, channel_y),
                dst,
            ]
        }
        Side::Left | Side::Right => {
            let channel_x = vertical_channel_x(src.x, src_cell, dst_cell, info);
            vec![
                src,
                Point::new(channel_x, src.y),
                Point::new(channel_x, dst.y),
                dst,
            ]
        }
    }
}

/// Y of a horizontal channel between the endpoint rows: the boundary under
/// the upper row when they differ, else the nearer of the row's own top or
/// bottom boundary.
fn horizontal_channel_y(src_y: f64, src_cell: GridCell, dst_cell: GridCell, info: &GridInfo) -> f64 {
    let min_r = src_cell.row.min(dst_cell.row) as usize;
    let max_r = src_cell.row.max(dst_cell.row) as usize;

    if min_r != max_r {
        return info.row_y[min_r] + info.row_height[min_r];
    }

    let r = src_cell.row as usize;
    let above = info.row_y[r];
    let below = info.row_y[r] + info.row_height[r];
    if (src_y - above).abs() < (src_y - below).abs() {
        above
    } else {
        below
    }
}

/// X of a vertical channel between the endpoint columns, mirroring
/// [`horizontal_channel_y`].
fn vertical_channel_x(src_x: f64, src_cell: GridCell, dst_cell: GridCell, info: &GridInfo) -> f64 {
    let min_c = src_cell.col.min(dst_cell.col) as usize;
    let max_c = src_cell.col.max(dst_cell.col) as usize;

    if min_c != max_c {
        return info.col_x[min_c] + info.col_width[min_c];
    }

    let c = src_cell.col as usize;
    let left = info.col_x[c];
    let right = info.col_x[c] + info.col_width[c];
    if (src_x - left).abs() < (src_x - right).abs() {
        left
    } else {
        right
    }
}

/// True if any route segment passes through an occupied cell's node box
/// (expanded by the safety margin), ignoring the endpoint cells.
pub(super) fn route_crosses_node(
    route: &[Point],
    info: &GridInfo,
    graph: &Graph,
    src_cell: GridCell,
    dst_cell: GridCell,
) -> bool {
    for (&cell, &local) in &info.occupied {
        if cell == src_cell || cell == dst_cell {
            continue;
        }
        let bounds = graph.nodes[info.objects[local]]
            .bounds
            .expanded(OBSTACLE_MARGIN);
        for pair in route.windows(2) {
            if segment_intersects_rect(pair[0], pair[1], &bounds) {
                return true;
            }
        }
    }
    false
}
