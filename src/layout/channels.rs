//! Channel discovery: finds the maximal empty horizontal and vertical
//! strips between node boxes, then turns each surviving channel into a
//! representative line that the routing graph is built from.
//!
//! The strips come from the sorted unique box boundaries rather than a
//! full maximal-empty-rectangle sweep, which is adequate for grid-like
//! layouts.

use crate::geometry::{near_eq, sorted_unique, Orientation, Point, Rect};
use crate::geometry::Side;

use super::ports::PortAssignment;

/// Minimum principal width for a strip to count as a channel.
const MIN_CHANNEL_WIDTH: f64 = 1.0;
/// Tolerance used when pruning dominated channels.
const PRUNE_EPS: f64 = 0.5;

/// A maximal empty strip between boxes (or between a box and the drawing
/// boundary). A vertical channel carries a vertical representative line,
/// and vice versa.
#[derive(Debug, Clone, Copy)]
pub struct Channel {
    pub rect: Rect,
    pub orientation: Orientation,
}

/// A horizontal or vertical line segment: a channel representative or a
/// short connector from a port into a channel.
#[derive(Debug, Clone, Copy)]
pub struct Segment {
    pub start: Point,
    pub end: Point,
    pub orientation: Orientation,
}

/// Discovers all routing channels between `boxes` inside `bbox`.
pub fn find_channels(boxes: &[Rect], bbox: Rect) -> Vec<Channel> {
    let mut channels = Vec::new();

    let mut x_bounds: Vec<f64> = Vec::with_capacity(boxes.len() * 2 + 2);
    let mut y_bounds: Vec<f64> = Vec::with_capacity(boxes.len() * 2 + 2);
    for b in boxes {
        x_bounds.push(b.left());
        x_bounds.push(b.right());
        y_bounds.push(b.top());
        y_bounds.push(b.bottom());
    }
    x_bounds.push(bbox.left());
    x_bounds.push(bbox.right());
    y_bounds.push(bbox.top());
    y_bounds.push(bbox.bottom());
    sorted_unique(&mut x_bounds);
    sorted_unique(&mut y_bounds);

    // Vertical channels: a strip [x1, x2] spanning the full bbox height is
    // a channel when its midline hits no box.
    for pair in x_bounds.windows(2) {
        let (x1, x2) = (pair[0], pair[1]);
        if x2 - x1 < MIN_CHANNEL_WIDTH {
            continue;
        }
        let mid_x = (x1 + x2) / 2.0;
        if vertical_strip_free(mid_x, bbox.top(), bbox.bottom(), boxes) {
            channels.push(Channel {
                rect: Rect::new(x1, bbox.top(), x2 - x1, bbox.h),
                orientation: Orientation::Vertical,
            });
        }
    }

    for pair in y_bounds.windows(2) {
        let (y1, y2) = (pair[0], pair[1]);
        if y2 - y1 < MIN_CHANNEL_WIDTH {
            continue;
        }
        let mid_y = (y1 + y2) / 2.0;
        if horizontal_strip_free(mid_y, bbox.left(), bbox.right(), boxes) {
            channels.push(Channel {
                rect: Rect::new(bbox.left(), y1, bbox.w, y2 - y1),
                orientation: Orientation::Horizontal,
            });
        }
    }

    prune_channels(channels)
}

fn vertical_strip_free(x: f64, y1: f64, y2: f64, boxes: &[Rect]) -> bool {
    for b in boxes {
        if x > b.left() && x < b.right() && y2 > b.top() && y1 < b.bottom() {
            return false;
        }
    }
    true
}

fn horizontal_strip_free(y: f64, x1: f64, x2: f64, boxes: &[Rect]) -> bool {
    for b in boxes {
        if y > b.top() && y < b.bottom() && x2 > b.left() && x1 < b.right() {
            return false;
        }
    }
    true
}

/// Removes dominated channels. In regular grids this eliminates the thin
/// slivers between aligned box edges that would otherwise seed redundant
/// representatives.
pub(super) fn prune_channels(channels: Vec<Channel>) -> Vec<Channel> {
    let n = channels.len();
    if n <= 1 {
        return channels;
    }

    let mut dominated = vec![false; n];
    for i in 0..n {
        if dominated[i] {
            continue;
        }
        for j in 0..n {
            if i == j || dominated[j] || channels[i].orientation != channels[j].orientation {
                continue;
            }
            if dominates(&channels[i], &channels[j]) {
                dominated[j] = true;
            }
        }
    }

    channels
        .into_iter()
        .zip(dominated)
        .filter_map(|(ch, dead)| if dead { None } else { Some(ch) })
        .collect()
}

/// True when `a` makes `b` redundant: same orientation, `a` contains
/// `b`'s extent on both axes, and `a`'s principal width is strictly
/// greater.
fn dominates(a: &Channel, b: &Channel) -> bool {
    if a.orientation == Orientation::Vertical {
        let contains_x = a.rect.left() - PRUNE_EPS <= b.rect.left()
            && a.rect.right() + PRUNE_EPS >= b.rect.right();
        let at_least_as_tall = a.rect.top() - PRUNE_EPS <= b.rect.top()
            && a.rect.bottom() + PRUNE_EPS >= b.rect.bottom();
        let wider = a.rect.w > b.rect.w + PRUNE_EPS;
        contains_x && at_least_as_tall && wider
    } else {
        let contains_y = a.rect.top() - PRUNE_EPS <= b.rect.top()
            && a.rect.bottom() + PRUNE_EPS >= b.rect.bottom();
        let at_least_as_wide = a.rect.left() - PRUNE_EPS <= b.rect.left()
            && a.rect.right() + PRUNE_EPS >= b.rect.right();
        let taller = a.rect.h > b.rect.h + PRUNE_EPS;
        contains_y && at_least_as_wide && taller
    }
}

/// Builds the representative line of every channel. A representative runs
/// through the channel center, unless a port lies strictly inside the
/// channel's principal range, in which case the port coordinate closest
/// to the center wins, letting routes reach the port without a jog.
pub fn build_representatives(channels: &[Channel], ports: &PortAssignment) -> Vec<Segment> {
    let mut segments = Vec::with_capacity(channels.len());

    for ch in channels {
        match ch.orientation {
            Orientation::Vertical => {
                let center_x = ch.rect.center_x();
                let mut aligned_x = center_x;
                let mut best_dist = ch.rect.w / 2.0;
                for p in ports.all_ports() {
                    if p.pos.x > ch.rect.left() && p.pos.x < ch.rect.right() {
                        let dist = (p.pos.x - center_x).abs();
                        if dist < best_dist {
                            aligned_x = p.pos.x;
                            best_dist = dist;
                        }
                    }
                }
                segments.push(Segment {
                    start: Point::new(aligned_x, ch.rect.top()),
                    end: Point::new(aligned_x, ch.rect.bottom()),
                    orientation: Orientation::Vertical,
                });
            }
            Orientation::Horizontal => {
                let center_y = ch.rect.center_y();
                let mut aligned_y = center_y;
                let mut best_dist = ch.rect.h / 2.0;
                for p in ports.all_ports() {
                    if p.pos.y > ch.rect.top() && p.pos.y < ch.rect.bottom() {
                        let dist = (p.pos.y - center_y).abs();
                        if dist < best_dist {
                            aligned_y = p.pos.y;
                            best_dist = dist;
                        }
                    }
                }
                segments.push(Segment {
                    start: Point::new(ch.rect.left(), aligned_y),
                    end: Point::new(ch.rect.right(), aligned_y),
                    orientation: Orientation::Horizontal,
                });
            }
        }
    }

    let mut segments = add_port_connectors(segments, ports, channels);
    sort_segment_points(&mut segments);
    deduplicate_segments(segments)
}

/// Adds short connector segments for ports that no representative covers,
/// running from the port into the adjacent channel.
fn add_port_connectors(
    mut segments: Vec<Segment>,
    ports: &PortAssignment,
    channels: &[Channel],
) -> Vec<Segment> {
    for p in ports.all_ports() {
        let covered = segments.iter().any(|s| match s.orientation {
            Orientation::Vertical => {
                near_eq(s.start.x, p.pos.x)
                    && p.pos.y >= s.start.y.min(s.end.y)
                    && p.pos.y <= s.start.y.max(s.end.y)
            }
            Orientation::Horizontal => {
                near_eq(s.start.y, p.pos.y)
                    && p.pos.x >= s.start.x.min(s.end.x)
                    && p.pos.x <= s.start.x.max(s.end.x)
            }
        });
        if covered {
            continue;
        }

        let connector = match p.side {
            Side::Top | Side::Bottom => vertical_connector(p.pos, p.side, channels),
            Side::Left | Side::Right => horizontal_connector(p.pos, p.side, channels),
        };
        if let Some(seg) = connector {
            segments.push(seg);
        }
    }
    segments
}

/// Vertical stub from a Top/Bottom port into the adjacent horizontal
/// channel's representative line.
fn vertical_connector(pos: Point, side: Side, channels: &[Channel]) -> Option<Segment> {
    for ch in channels {
        if ch.orientation != Orientation::Horizontal {
            continue;
        }
        if pos.x < ch.rect.left() || pos.x > ch.rect.right() {
            continue;
        }
        if side == Side::Top && ch.rect.bottom() <= pos.y + 1.0 {
            return Some(Segment {
                start: Point::new(pos.x, ch.rect.center_y()),
                end: pos,
                orientation: Orientation::Vertical,
            });
        }
        if side == Side::Bottom && ch.rect.top() >= pos.y - 1.0 {
            return Some(Segment {
                start: pos,
                end: Point::new(pos.x, ch.rect.center_y()),
                orientation: Orientation::Vertical,
            });
        }
    }
    None
}

/// Horizontal stub from a Left/Right port into the adjacent vertical
/// channel's representative line.
fn horizontal_connector(pos: Point, side: Side, channels: &[Channel]) -> Option<Segment> {
    for ch in channels {
        if ch.orientation != Orientation::Vertical {
            continue;
        }
        if pos.y < ch.rect.top() || pos.y > ch.rect.bottom() {
            continue;
        }
        if side == Side::Left && ch.rect.right() <= pos.x + 1.0 {
            return Some(Segment {
                start: Point::new(ch.rect.center_x(), pos.y),
                end: pos,
                orientation: Orientation::Horizontal,
            });
        }
        if side == Side::Right && ch.rect.left() >= pos.x - 1.0 {
            return Some(Segment {
                start: pos,
                end: Point::new(ch.rect.center_x(), pos.y),
                orientation: Orientation::Horizontal,
            });
        }
    }
    None
}

/// Orients every segment so start ≤ end along the varying axis.
fn sort_segment_points(segments: &mut [Segment]) {
    for s in segments.iter_mut() {
        let swap = match s.orientation {
            Orientation::Horizontal => s.start.x > s.end.x,
            Orientation::Vertical => s.start.y > s.end.y,
        };
        if swap {
            std::mem::swap(&mut s.start, &mut s.end);
        }
    }
}

/// Removes duplicate segments; coordinates are keyed at 0.01 precision,
/// the same grid routing-graph nodes are interned on.
fn deduplicate_segments(segments: Vec<Segment>) -> Vec<Segment> {
    let key = |v: f64| (v * 100.0).round() as i64;
    let mut seen = std::collections::HashSet::new();
    segments
        .into_iter()
        .filter(|s| {
            seen.insert((
                key(s.start.x),
                key(s.start.y),
                key(s.end.x),
                key(s.end.y),
                s.orientation,
            ))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Side;
    use crate::layout::ports::Port;

    fn bbox_of(boxes: &[Rect], margin: f64) -> Rect {
        let min_x = boxes.iter().map(|b| b.left()).fold(f64::MAX, f64::min);
        let min_y = boxes.iter().map(|b| b.top()).fold(f64::MAX, f64::min);
        let max_x = boxes.iter().map(|b| b.right()).fold(f64::MIN, f64::max);
        let max_y = boxes.iter().map(|b| b.bottom()).fold(f64::MIN, f64::max);
        Rect::new(
            min_x - margin,
            min_y - margin,
            (max_x - min_x) + 2.0 * margin,
            (max_y - min_y) + 2.0 * margin,
        )
    }

    #[test]
    fn simple_grid_has_middle_channels() {
        let boxes = vec![
            Rect::new(0.0, 0.0, 100.0, 100.0),
            Rect::new(150.0, 0.0, 100.0, 100.0),
            Rect::new(0.0, 150.0, 100.0, 100.0),
            Rect::new(150.0, 150.0, 100.0, 100.0),
        ];
        let channels = find_channels(&boxes, bbox_of(&boxes, 40.0));

        let has_vertical_middle = channels.iter().any(|ch| {
            ch.orientation == Orientation::Vertical
                && ch.rect.left() >= 99.0
                && ch.rect.right() <= 151.0
        });
        let has_horizontal_middle = channels.iter().any(|ch| {
            ch.orientation == Orientation::Horizontal
                && ch.rect.top() >= 99.0
                && ch.rect.bottom() <= 151.0
        });
        assert!(has_vertical_middle, "missing vertical channel between columns");
        assert!(has_horizontal_middle, "missing horizontal channel between rows");
    }

    #[test]
    fn dominated_channel_is_pruned() {
        let channels = vec![
            Channel {
                rect: Rect::new(100.0, 0.0, 50.0, 300.0),
                orientation: Orientation::Vertical,
            },
            Channel {
                rect: Rect::new(110.0, 0.0, 20.0, 300.0),
                orientation: Orientation::Vertical,
            },
        ];
        let pruned = prune_channels(channels);
        assert_eq!(pruned.len(), 1);
        assert_eq!(pruned[0].rect.w, 50.0);
    }

    #[test]
    fn different_orientations_never_dominate() {
        let channels = vec![
            Channel {
                rect: Rect::new(0.0, 100.0, 300.0, 50.0),
                orientation: Orientation::Horizontal,
            },
            Channel {
                rect: Rect::new(100.0, 0.0, 50.0, 300.0),
                orientation: Orientation::Vertical,
            },
        ];
        assert_eq!(prune_channels(channels).len(), 2);
    }

    #[test]
    fn disjoint_channels_both_survive() {
        let channels = vec![
            Channel {
                rect: Rect::new(50.0, 0.0, 30.0, 300.0),
                orientation: Orientation::Vertical,
            },
            Channel {
                rect: Rect::new(200.0, 0.0, 30.0, 300.0),
                orientation: Orientation::Vertical,
            },
        ];
        assert_eq!(prune_channels(channels).len(), 2);
    }

    #[test]
    fn representative_prefers_port_alignment() {
        let channels = vec![Channel {
            rect: Rect::new(100.0, 0.0, 50.0, 300.0),
            orientation: Orientation::Vertical,
        }];
        let ports = PortAssignment {
            src_ports: vec![Port {
                node_idx: 0,
                edge_idx: 0,
                side: Side::Top,
                pos: Point::new(130.0, 0.0),
                is_src: true,
            }],
            dst_ports: vec![],
        };
        let segments = build_representatives(&channels, &ports);
        let rep = segments
            .iter()
            .find(|s| s.orientation == Orientation::Vertical)
            .unwrap();
        assert_eq!(rep.start.x, 130.0, "representative should snap to the port");
    }

    #[test]
    fn uncovered_port_gets_connector() {
        // One box above a horizontal channel; a Bottom port off the
        // representative grid needs a stub down into the channel.
        let channels = vec![Channel {
            rect: Rect::new(0.0, 100.0, 300.0, 50.0),
            orientation: Orientation::Horizontal,
        }];
        let ports = PortAssignment {
            src_ports: vec![Port {
                node_idx: 0,
                edge_idx: 0,
                side: Side::Bottom,
                pos: Point::new(80.0, 100.0),
                is_src: true,
            }],
            dst_ports: vec![],
        };
        let segments = build_representatives(&channels, &ports);
        let connector = segments
            .iter()
            .find(|s| s.orientation == Orientation::Vertical)
            .expect("connector segment expected");
        assert_eq!(connector.start.x, 80.0);
        assert!(connector.end.y >= 100.0 && connector.start.y <= 125.0);
    }

    #[test]
    fn duplicate_segments_collapse() {
        let seg = Segment {
            start: Point::new(0.0, 0.0),
            end: Point::new(100.0, 0.0),
            orientation: Orientation::Horizontal,
        };
        let out = deduplicate_segments(vec![seg, seg]);
        assert_eq!(out.len(), 1);
    }
}
