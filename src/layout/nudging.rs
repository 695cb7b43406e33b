//! Constraint-based nudging: separates edges that share a corridor so
//! they run as evenly spaced parallel tracks.
//!
//! Routes are decomposed into orthogonal segments, overlapping segments
//! at the same fixed coordinate are bundled, and each bundle is solved
//! through a small constraint DAG (source → slots → sink with
//! minimum-spacing arcs) via longest-path relaxation. When the channel
//! cannot fit the required total width the bundle falls back to even
//! distribution across the channel.

use std::collections::BTreeMap;

use crate::geometry::Orientation;

use super::channels::Channel;
use super::ordering::EdgeOrdering;
use super::router::EdgeRoute;

/// Bundles form over fixed coordinates bucketed at this size.
const BUNDLE_TOLERANCE: f64 = 1.0;
/// Segments shorter than this are degenerate and ignored.
const MIN_SEGMENT_LENGTH: f64 = 0.5;
/// Channels narrower than this are left alone.
const MIN_CHANNEL_WIDTH: f64 = 4.0;
/// Offsets below this are not worth applying.
const MIN_OFFSET: f64 = 0.1;

/// One horizontal or vertical piece of a route.
#[derive(Debug, Clone, Copy)]
struct RouteSegment {
    edge_idx: usize,
    seg_idx: usize,
    orientation: Orientation,
    fixed_coord: f64,
    range_min: f64,
    range_max: f64,
}

/// Segments sharing one corridor.
#[derive(Debug)]
struct SegmentBundle {
    orientation: Orientation,
    fixed_coord: f64,
    segments: Vec<RouteSegment>,
}

/// Offsets edges that share corridor segments. `ordering` fixes the
/// track order within each bundle; `min_spacing` is the configured
/// edge-to-edge distance.
pub fn nudge_routes(
    routes: &mut [EdgeRoute],
    channels: &[Channel],
    ordering: &EdgeOrdering,
    min_spacing: f64,
) {
    if routes.len() <= 1 {
        return;
    }

    let mut all_segs: Vec<RouteSegment> = Vec::new();
    for (ri, route) in routes.iter().enumerate() {
        for (i, pair) in route.points.windows(2).enumerate() {
            let (p1, p2) = (pair[0], pair[1]);
            let seg = if (p1.y - p2.y).abs() < MIN_SEGMENT_LENGTH {
                RouteSegment {
                    edge_idx: ri,
                    seg_idx: i,
                    orientation: Orientation::Horizontal,
                    fixed_coord: p1.y,
                    range_min: p1.x.min(p2.x),
                    range_max: p1.x.max(p2.x),
                }
            } else if (p1.x - p2.x).abs() < MIN_SEGMENT_LENGTH {
                RouteSegment {
                    edge_idx: ri,
                    seg_idx: i,
                    orientation: Orientation::Vertical,
                    fixed_coord: p1.x,
                    range_min: p1.y.min(p2.y),
                    range_max: p1.y.max(p2.y),
                }
            } else {
                continue; // diagonal, not produced by the router
            };
            if seg.range_max - seg.range_min < MIN_SEGMENT_LENGTH {
                continue;
            }
            all_segs.push(seg);
        }
    }

    for bundle in group_into_bundles(all_segs) {
        if bundle.segments.len() <= 1 {
            continue;
        }

        let (ch_min, ch_max) = channel_bounds(&bundle, channels);
        let channel_width = ch_max - ch_min;
        if channel_width < MIN_CHANNEL_WIDTH {
            continue;
        }

        let mut unique_edges: Vec<usize> = Vec::new();
        for seg in &bundle.segments {
            if !unique_edges.contains(&seg.edge_idx) {
                unique_edges.push(seg.edge_idx);
            }
        }
        if unique_edges.len() <= 1 {
            continue;
        }
        unique_edges.sort_by(|&a, &b| {
            let (ka, kb) = match bundle.orientation {
                Orientation::Horizontal => (ordering.h_key(a), ordering.h_key(b)),
                Orientation::Vertical => (ordering.v_key(a), ordering.v_key(b)),
            };
            ka.total_cmp(&kb).then_with(|| a.cmp(&b))
        });

        let positions = match constraint_nudge(&unique_edges, &bundle, ch_min, ch_max, min_spacing)
        {
            Some(positions) => positions,
            None => even_distribution(&unique_edges, bundle.fixed_coord, ch_min, channel_width),
        };

        apply_offsets(routes, &bundle, &positions);
    }
}

/// Solves one bundle through the constraint DAG. Returns per-edge offsets
/// from the bundle's fixed coordinate, or `None` when the required total
/// width does not fit the channel.
fn constraint_nudge(
    unique_edges: &[usize],
    bundle: &SegmentBundle,
    ch_min: f64,
    ch_max: f64,
    min_spacing: f64,
) -> Option<BTreeMap<usize, f64>> {
    let n = unique_edges.len();
    let margin = min_spacing / 2.0;

    // Slot nodes 0..n in sorted order, then source and sink. The chain
    // topology makes the topological order trivial: source, slots, sink.
    let src_node = n;
    let sink_node = n + 1;
    let mut arcs: Vec<(usize, usize, f64)> = Vec::with_capacity(n + 2);
    arcs.push((src_node, 0, margin));
    for i in 0..n - 1 {
        arcs.push((i, i + 1, min_spacing));
    }
    arcs.push((n - 1, sink_node, margin));

    let mut dist = vec![0.0f64; n + 2];
    let mut order: Vec<usize> = Vec::with_capacity(n + 2);
    order.push(src_node);
    order.extend(0..n);
    order.push(sink_node);

    // Longest-path relaxation in topological order.
    for &u in &order {
        for &(from, to, min_dist) in &arcs {
            if from != u {
                continue;
            }
            let candidate = dist[u] + min_dist;
            if candidate > dist[to] {
                dist[to] = candidate;
            }
        }
    }

    let required = dist[sink_node];
    let channel_width = ch_max - ch_min;
    if required > channel_width + 0.5 {
        return None;
    }

    // Center the track group; unused width splits evenly on both sides.
    let slack = (channel_width - required) / 2.0;
    let mut positions = BTreeMap::new();
    for (i, &edge_idx) in unique_edges.iter().enumerate() {
        let abs_pos = ch_min + slack + dist[i];
        positions.insert(edge_idx, abs_pos - bundle.fixed_coord);
    }
    Some(positions)
}

/// Fallback: tracks at `(i+1)/(n+1)` of the channel width.
fn even_distribution(
    unique_edges: &[usize],
    fixed_coord: f64,
    ch_min: f64,
    channel_width: f64,
) -> BTreeMap<usize, f64> {
    let n = unique_edges.len() as f64;
    unique_edges
        .iter()
        .enumerate()
        .map(|(i, &edge_idx)| {
            let target = ch_min + channel_width * (i as f64 + 1.0) / (n + 1.0);
            (edge_idx, target - fixed_coord)
        })
        .collect()
}

/// Groups segments sharing (orientation, bucketed fixed coordinate) that
/// mutually overlap in the varying range.
fn group_into_bundles(segs: Vec<RouteSegment>) -> Vec<SegmentBundle> {
    let mut groups: BTreeMap<(Orientation, i64), Vec<RouteSegment>> = BTreeMap::new();
    for seg in segs {
        let bucket = (seg.fixed_coord / BUNDLE_TOLERANCE).round() as i64;
        groups.entry((seg.orientation, bucket)).or_default().push(seg);
    }

    let mut bundles = Vec::new();
    for ((orientation, _), group) in groups {
        if group.len() <= 1 {
            continue;
        }
        for overlapping in overlapping_groups(group) {
            if overlapping.len() > 1 {
                bundles.push(SegmentBundle {
                    orientation,
                    fixed_coord: overlapping[0].fixed_coord,
                    segments: overlapping,
                });
            }
        }
    }
    bundles
}

/// Splits a same-coordinate group into clusters whose varying ranges
/// overlap.
fn overlapping_groups(mut segs: Vec<RouteSegment>) -> Vec<Vec<RouteSegment>> {
    segs.sort_by(|a, b| {
        a.range_min
            .total_cmp(&b.range_min)
            .then_with(|| a.edge_idx.cmp(&b.edge_idx))
            .then_with(|| a.seg_idx.cmp(&b.seg_idx))
    });

    let mut groups: Vec<Vec<RouteSegment>> = Vec::new();
    let mut used = vec![false; segs.len()];

    for i in 0..segs.len() {
        if used[i] {
            continue;
        }
        let mut group = vec![segs[i]];
        used[i] = true;
        let mut group_max = segs[i].range_max;

        for j in (i + 1)..segs.len() {
            if used[j] {
                continue;
            }
            if segs[j].range_min < group_max - 0.5 {
                group.push(segs[j]);
                used[j] = true;
                if segs[j].range_max > group_max {
                    group_max = segs[j].range_max;
                }
            }
        }
        groups.push(group);
    }
    groups
}

/// Bounds of the channel containing the bundle along the perpendicular
/// axis, with a small spread around the current coordinate as fallback.
fn channel_bounds(bundle: &SegmentBundle, channels: &[Channel]) -> (f64, f64) {
    for ch in channels {
        if bundle.orientation == Orientation::Horizontal
            && ch.orientation == Orientation::Horizontal
            && bundle.fixed_coord >= ch.rect.top() - 1.0
            && bundle.fixed_coord <= ch.rect.bottom() + 1.0
        {
            return (ch.rect.top(), ch.rect.bottom());
        }
        if bundle.orientation == Orientation::Vertical
            && ch.orientation == Orientation::Vertical
            && bundle.fixed_coord >= ch.rect.left() - 1.0
            && bundle.fixed_coord <= ch.rect.right() + 1.0
        {
            return (ch.rect.left(), ch.rect.right());
        }
    }
    (bundle.fixed_coord - 10.0, bundle.fixed_coord + 10.0)
}

/// Shifts bundled segments by their edge's offset along the perpendicular
/// axis. The first and last points of a route are ports on shape
/// boundaries and are never moved.
fn apply_offsets(
    routes: &mut [EdgeRoute],
    bundle: &SegmentBundle,
    offsets: &BTreeMap<usize, f64>,
) {
    for seg in &bundle.segments {
        let offset = match offsets.get(&seg.edge_idx) {
            Some(&o) if o.abs() >= MIN_OFFSET => o,
            _ => continue,
        };

        let points = &mut routes[seg.edge_idx].points;
        if seg.seg_idx + 1 >= points.len() {
            continue;
        }

        let is_first_point = seg.seg_idx == 0;
        let is_last_point = seg.seg_idx + 1 == points.len() - 1;

        match bundle.orientation {
            Orientation::Horizontal => {
                if !is_first_point {
                    points[seg.seg_idx].y += offset;
                }
                if !is_last_point {
                    points[seg.seg_idx + 1].y += offset;
                }
            }
            Orientation::Vertical => {
                if !is_first_point {
                    points[seg.seg_idx].x += offset;
                }
                if !is_last_point {
                    points[seg.seg_idx + 1].x += offset;
                }
            }
        }
    }
}
