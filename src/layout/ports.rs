//! Port assignment for the corridor router: decides which side of each
//! endpoint box an edge uses, orders the ports on every side, and
//! distributes them evenly along it.
//!
//! Side selection draws a line between box centers and picks the dominant
//! axis; when the minor axis is significant the destination flips to a
//! perpendicular face so the edge routes as an L rather than a Z.

use std::collections::BTreeMap;

use crate::geometry::{Point, Rect, Side};

/// How large the minor center-delta must be, as a fraction of the major
/// one, before the destination face flips to produce an L-shape.
const Z_AVOIDANCE_RATIO: f64 = 0.25;

/// Ports clamp into the inner span of a face when aligned across boxes.
const ALIGN_CLAMP_RATIO: f64 = 0.1;

/// An edge endpoint on a box boundary.
#[derive(Debug, Clone, Copy)]
pub struct Port {
    /// Index into the obstacle/object list.
    pub node_idx: usize,
    /// Index into the routed edge list.
    pub edge_idx: usize,
    pub side: Side,
    pub pos: Point,
    pub is_src: bool,
}

/// Port assignments for all routed edges, one source and one destination
/// port per edge.
#[derive(Debug, Clone, Default)]
pub struct PortAssignment {
    pub src_ports: Vec<Port>,
    pub dst_ports: Vec<Port>,
}

impl PortAssignment {
    pub fn all_ports(&self) -> impl Iterator<Item = &Port> {
        self.src_ports.iter().chain(self.dst_ports.iter())
    }
}

/// Assigns exit/entry ports for every edge. `endpoints[i]` holds the
/// object indices of edge `i`'s source and destination.
pub fn assign_ports(boxes: &[Rect], endpoints: &[(usize, usize)]) -> PortAssignment {
    let mut pa = PortAssignment {
        src_ports: Vec::with_capacity(endpoints.len()),
        dst_ports: Vec::with_capacity(endpoints.len()),
    };

    // Port count per (node, side), used by self-loops to find the least
    // populated side.
    let mut side_count: BTreeMap<(usize, Side), usize> = BTreeMap::new();

    for (ei, &(src_idx, dst_idx)) in endpoints.iter().enumerate() {
        let (src_side, dst_side) = if src_idx == dst_idx {
            self_loop_sides(src_idx, &side_count)
        } else {
            determine_sides(&boxes[src_idx], &boxes[dst_idx])
        };

        pa.src_ports.push(Port {
            node_idx: src_idx,
            edge_idx: ei,
            side: src_side,
            pos: Point::default(),
            is_src: true,
        });
        pa.dst_ports.push(Port {
            node_idx: dst_idx,
            edge_idx: ei,
            side: dst_side,
            pos: Point::default(),
            is_src: false,
        });
        *side_count.entry((src_idx, src_side)).or_insert(0) += 1;
        *side_count.entry((dst_idx, dst_side)).or_insert(0) += 1;
    }

    distribute_ports_on_sides(boxes, endpoints, &mut pa);
    align_nearly_aligned_ports(boxes, &mut pa);

    pa
}

/// Picks the side of each box an edge should use, based on the angle
/// between centers, with Z-avoidance and a 45° L-shape rule.
pub(super) fn determine_sides(src: &Rect, dst: &Rect) -> (Side, Side) {
    let dx = dst.center_x() - src.center_x();
    let dy = dst.center_y() - src.center_y();
    let abs_dx = dx.abs();
    let abs_dy = dy.abs();

    if abs_dx > abs_dy {
        let (src_side, mut dst_side) = if dx > 0.0 {
            (Side::Right, Side::Left)
        } else {
            (Side::Left, Side::Right)
        };
        // Significant vertical component: enter the destination from
        // above/below so the route bends once instead of twice.
        if abs_dy > abs_dx * Z_AVOIDANCE_RATIO {
            dst_side = if dy > 0.0 { Side::Top } else { Side::Bottom };
        }
        (src_side, dst_side)
    } else if abs_dy > abs_dx {
        let (src_side, mut dst_side) = if dy > 0.0 {
            (Side::Bottom, Side::Top)
        } else {
            (Side::Top, Side::Bottom)
        };
        if abs_dx > abs_dy * Z_AVOIDANCE_RATIO {
            dst_side = if dx > 0.0 { Side::Left } else { Side::Right };
        }
        (src_side, dst_side)
    } else {
        // Exactly 45°: one horizontal and one vertical face make an L.
        let src_side = if dx > 0.0 { Side::Right } else { Side::Left };
        let dst_side = if dy > 0.0 { Side::Top } else { Side::Bottom };
        (src_side, dst_side)
    }
}

/// Self-loops take the least populated side as primary and its clockwise
/// neighbour as secondary.
pub(super) fn self_loop_sides(
    node_idx: usize,
    side_count: &BTreeMap<(usize, Side), usize>,
) -> (Side, Side) {
    let mut best_side = Side::Right;
    let mut best_count = usize::MAX;
    for side in Side::ALL {
        let count = side_count.get(&(node_idx, side)).copied().unwrap_or(0);
        if count < best_count {
            best_count = count;
            best_side = side;
        }
    }
    (best_side, best_side.clockwise())
}

/// Orders ports on each (node, side) by the center of the connected
/// neighbour and positions them at `t = (i+1)/(n+1)` along the side.
fn distribute_ports_on_sides(
    boxes: &[Rect],
    endpoints: &[(usize, usize)],
    pa: &mut PortAssignment,
) {
    // (node, side) → (is_src, edge index) of every port there. BTreeMap
    // iteration keeps output independent of insertion hashing.
    let mut groups: BTreeMap<(usize, Side), Vec<(bool, usize)>> = BTreeMap::new();
    for port in &pa.src_ports {
        groups
            .entry((port.node_idx, port.side))
            .or_default()
            .push((true, port.edge_idx));
    }
    for port in &pa.dst_ports {
        groups
            .entry((port.node_idx, port.side))
            .or_default()
            .push((false, port.edge_idx));
    }

    for (&(node_idx, side), members) in groups.iter_mut() {
        // Neighbour box: the other end of the port's edge.
        members.sort_by(|&(a_src, a_edge), &(b_src, b_edge)| {
            let na = neighbour_box(boxes, endpoints, a_src, a_edge);
            let nb = neighbour_box(boxes, endpoints, b_src, b_edge);
            let (ka, kb) = match side {
                Side::Top | Side::Bottom => (na.center_x(), nb.center_x()),
                Side::Left | Side::Right => (na.center_y(), nb.center_y()),
            };
            ka.total_cmp(&kb).then_with(|| a_edge.cmp(&b_edge))
        });

        let bounds = boxes[node_idx];
        let n = members.len() as f64;
        for (i, &(is_src, edge_idx)) in members.iter().enumerate() {
            let t = (i as f64 + 1.0) / (n + 1.0);
            let pos = match side {
                Side::Top => Point::new(bounds.left() + t * bounds.w, bounds.top()),
                Side::Bottom => Point::new(bounds.left() + t * bounds.w, bounds.bottom()),
                Side::Left => Point::new(bounds.left(), bounds.top() + t * bounds.h),
                Side::Right => Point::new(bounds.right(), bounds.top() + t * bounds.h),
            };
            if is_src {
                pa.src_ports[edge_idx].pos = pos;
            } else {
                pa.dst_ports[edge_idx].pos = pos;
            }
        }
    }
}

fn neighbour_box(boxes: &[Rect], endpoints: &[(usize, usize)], is_src: bool, edge_idx: usize) -> Rect {
    let (src_idx, dst_idx) = endpoints[edge_idx];
    if is_src {
        boxes[dst_idx]
    } else {
        boxes[src_idx]
    }
}

/// Aligns port pairs of vertical (Bottom↔Top) edges whose boxes overlap
/// horizontally to the overlap midpoint, clamped to the inner span of
/// both faces; symmetric for horizontal edges. Without this, distributed
/// ports create small offsets that render as diagonal lines.
fn align_nearly_aligned_ports(boxes: &[Rect], pa: &mut PortAssignment) {
    for ei in 0..pa.src_ports.len() {
        let src = pa.src_ports[ei];
        let dst = pa.dst_ports[ei];
        let src_box = boxes[src.node_idx];
        let dst_box = boxes[dst.node_idx];

        let is_vertical = matches!(
            (src.side, dst.side),
            (Side::Bottom, Side::Top) | (Side::Top, Side::Bottom)
        );
        if is_vertical {
            let overlap_left = src_box.left().max(dst_box.left());
            let overlap_right = src_box.right().min(dst_box.right());
            if overlap_right > overlap_left {
                let target_x = (overlap_left + overlap_right) / 2.0;
                let src_min = src_box.left() + src_box.w * ALIGN_CLAMP_RATIO;
                let src_max = src_box.left() + src_box.w * (1.0 - ALIGN_CLAMP_RATIO);
                let dst_min = dst_box.left() + dst_box.w * ALIGN_CLAMP_RATIO;
                let dst_max = dst_box.left() + dst_box.w * (1.0 - ALIGN_CLAMP_RATIO);
                if target_x >= src_min && target_x <= src_max && target_x >= dst_min && target_x <= dst_max {
                    pa.src_ports[ei].pos.x = target_x;
                    pa.dst_ports[ei].pos.x = target_x;
                }
            }
        }

        let is_horizontal = matches!(
            (src.side, dst.side),
            (Side::Right, Side::Left) | (Side::Left, Side::Right)
        );
        if is_horizontal {
            let overlap_top = src_box.top().max(dst_box.top());
            let overlap_bottom = src_box.bottom().min(dst_box.bottom());
            if overlap_bottom > overlap_top {
                let target_y = (overlap_top + overlap_bottom) / 2.0;
                let src_min = src_box.top() + src_box.h * ALIGN_CLAMP_RATIO;
                let src_max = src_box.top() + src_box.h * (1.0 - ALIGN_CLAMP_RATIO);
                let dst_min = dst_box.top() + dst_box.h * ALIGN_CLAMP_RATIO;
                let dst_max = dst_box.top() + dst_box.h * (1.0 - ALIGN_CLAMP_RATIO);
                if target_y >= src_min && target_y <= src_max && target_y >= dst_min && target_y <= dst_max {
                    pa.src_ports[ei].pos.y = target_y;
                    pa.dst_ports[ei].pos.y = target_y;
                }
            }
        }
    }
}
