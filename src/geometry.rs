//! Axis-aligned geometry primitives shared by the placement and routing
//! stages. Coordinates coming out of the routing graph carry sub-pixel
//! noise, so every comparison at that precision goes through [`near_eq`]
//! with a 0.5-unit tolerance rather than exact equality.

/// Tolerance for coordinate comparison on routing-graph output.
pub const COORD_TOLERANCE: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn dist_sq(self, other: Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }
}

/// Axis-aligned rectangle: top-left corner plus dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    pub fn left(&self) -> f64 {
        self.x
    }

    pub fn right(&self) -> f64 {
        self.x + self.w
    }

    pub fn top(&self) -> f64 {
        self.y
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.h
    }

    pub fn center_x(&self) -> f64 {
        self.x + self.w / 2.0
    }

    pub fn center_y(&self) -> f64 {
        self.y + self.h / 2.0
    }

    pub fn center(&self) -> Point {
        Point::new(self.center_x(), self.center_y())
    }

    /// The same rectangle grown by `margin` on every side.
    pub fn expanded(&self, margin: f64) -> Rect {
        Rect {
            x: self.x - margin,
            y: self.y - margin,
            w: self.w + 2.0 * margin,
            h: self.h + 2.0 * margin,
        }
    }
}

/// Orientation of a segment or channel representative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

/// A side (face) of a node box. A face owns a stretch of the node's
/// boundary; ports are placed along it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Side {
    Top,
    Right,
    Bottom,
    Left,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Top => Side::Bottom,
            Side::Right => Side::Left,
            Side::Bottom => Side::Top,
            Side::Left => Side::Right,
        }
    }

    /// Clockwise neighbour: Top→Right→Bottom→Left→Top.
    pub fn clockwise(self) -> Side {
        match self {
            Side::Top => Side::Right,
            Side::Right => Side::Bottom,
            Side::Bottom => Side::Left,
            Side::Left => Side::Top,
        }
    }

    /// A face perpendicular to this one.
    pub fn perpendicular(self) -> Side {
        match self {
            Side::Left | Side::Right => Side::Top,
            Side::Top | Side::Bottom => Side::Right,
        }
    }

    /// True for Top/Bottom, whose exit axis is vertical.
    pub fn is_vertical_exit(self) -> bool {
        matches!(self, Side::Top | Side::Bottom)
    }

    pub const ALL: [Side; 4] = [Side::Top, Side::Right, Side::Bottom, Side::Left];
}

pub fn near_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < COORD_TOLERANCE
}

/// True iff the segment from `p1` to `p2` enters the interior of `rect`.
/// Orthogonal segments are resolved by the bounding-box test alone; the
/// general case runs Liang-Barsky clipping so arbitrary segments are
/// handled correctly.
pub fn segment_intersects_rect(p1: Point, p2: Point, rect: &Rect) -> bool {
    let (left, top, right, bottom) = (rect.left(), rect.top(), rect.right(), rect.bottom());

    let min_x = p1.x.min(p2.x);
    let max_x = p1.x.max(p2.x);
    let min_y = p1.y.min(p2.y);
    let max_y = p1.y.max(p2.y);
    if max_x < left || min_x > right || max_y < top || min_y > bottom {
        return false;
    }

    // Orthogonal segment: the bounding-box overlap already decides it.
    if (p1.x - p2.x).abs() < COORD_TOLERANCE || (p1.y - p2.y).abs() < COORD_TOLERANCE {
        return true;
    }

    let dx = p2.x - p1.x;
    let dy = p2.y - p1.y;
    let mut t_min = 0.0f64;
    let mut t_max = 1.0f64;

    let mut clip = |p: f64, q: f64| -> bool {
        if p == 0.0 {
            return q >= 0.0;
        }
        let t = q / p;
        if p < 0.0 {
            if t > t_max {
                return false;
            }
            if t > t_min {
                t_min = t;
            }
        } else {
            if t < t_min {
                return false;
            }
            if t < t_max {
                t_max = t;
            }
        }
        true
    };

    clip(-dx, p1.x - left)
        && clip(dx, right - p1.x)
        && clip(-dy, p1.y - top)
        && clip(dy, bottom - p1.y)
        && t_min <= t_max
}

/// True iff two orthogonal segments cross: one horizontal, one vertical,
/// with the vertical's x strictly inside the horizontal's x-range and the
/// horizontal's y strictly inside the vertical's y-range. Touching at an
/// endpoint is not a crossing.
pub fn segments_cross(a1: Point, a2: Point, b1: Point, b2: Point) -> bool {
    let a_horiz = (a1.y - a2.y).abs() < COORD_TOLERANCE;
    let b_horiz = (b1.y - b2.y).abs() < COORD_TOLERANCE;

    if a_horiz == b_horiz {
        return false;
    }

    let (h_start, h_end, v_start, v_end) = if a_horiz {
        (a1, a2, b1, b2)
    } else {
        (b1, b2, a1, a2)
    };

    let h_min_x = h_start.x.min(h_end.x);
    let h_max_x = h_start.x.max(h_end.x);
    let v_min_y = v_start.y.min(v_end.y);
    let v_max_y = v_start.y.max(v_end.y);

    v_start.x > h_min_x && v_start.x < h_max_x && h_start.y > v_min_y && h_start.y < v_max_y
}

/// Sorted, deduplicated copy of `vals`. Exact duplicates only; callers
/// that need tolerance-aware merging do it themselves.
pub fn sorted_unique(vals: &mut Vec<f64>) {
    vals.sort_by(f64::total_cmp);
    vals.dedup();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_accessors() {
        let r = Rect::new(10.0, 20.0, 100.0, 50.0);
        assert_eq!(r.left(), 10.0);
        assert_eq!(r.right(), 110.0);
        assert_eq!(r.top(), 20.0);
        assert_eq!(r.bottom(), 70.0);
        assert_eq!(r.center_x(), 60.0);
        assert_eq!(r.center_y(), 45.0);
    }

    #[test]
    fn side_mappings() {
        assert_eq!(Side::Top.opposite(), Side::Bottom);
        assert_eq!(Side::Left.opposite(), Side::Right);
        assert_eq!(Side::Top.clockwise(), Side::Right);
        assert_eq!(Side::Left.clockwise(), Side::Top);
        assert_eq!(Side::Left.perpendicular(), Side::Top);
        assert_eq!(Side::Bottom.perpendicular(), Side::Right);
    }

    #[test]
    fn segment_through_box_center() {
        let rect = Rect::new(50.0, 50.0, 100.0, 100.0);
        assert!(segment_intersects_rect(
            Point::new(0.0, 100.0),
            Point::new(200.0, 100.0),
            &rect
        ));
        assert!(segment_intersects_rect(
            Point::new(100.0, 0.0),
            Point::new(100.0, 200.0),
            &rect
        ));
    }

    #[test]
    fn segment_outside_box() {
        let rect = Rect::new(50.0, 50.0, 100.0, 100.0);
        assert!(!segment_intersects_rect(
            Point::new(0.0, 30.0),
            Point::new(200.0, 30.0),
            &rect
        ));
        assert!(!segment_intersects_rect(
            Point::new(200.0, 0.0),
            Point::new(200.0, 200.0),
            &rect
        ));
    }

    #[test]
    fn diagonal_segment_clipping() {
        let rect = Rect::new(50.0, 50.0, 100.0, 100.0);
        assert!(segment_intersects_rect(
            Point::new(0.0, 0.0),
            Point::new(200.0, 200.0),
            &rect
        ));
        // Steep diagonal that stays left of the box.
        assert!(!segment_intersects_rect(
            Point::new(0.0, 0.0),
            Point::new(40.0, 200.0),
            &rect
        ));
    }

    #[test]
    fn crossing_is_strict() {
        // Perpendicular crossing.
        assert!(segments_cross(
            Point::new(0.0, 50.0),
            Point::new(100.0, 50.0),
            Point::new(50.0, 0.0),
            Point::new(50.0, 100.0)
        ));
        // Parallel segments never cross.
        assert!(!segments_cross(
            Point::new(0.0, 50.0),
            Point::new(100.0, 50.0),
            Point::new(0.0, 80.0),
            Point::new(100.0, 80.0)
        ));
        // Perpendicular but out of range.
        assert!(!segments_cross(
            Point::new(0.0, 50.0),
            Point::new(30.0, 50.0),
            Point::new(50.0, 0.0),
            Point::new(50.0, 100.0)
        ));
        // T-junction: endpoint touch is not a crossing.
        assert!(!segments_cross(
            Point::new(0.0, 50.0),
            Point::new(100.0, 50.0),
            Point::new(50.0, 50.0),
            Point::new(50.0, 100.0)
        ));
    }

    #[test]
    fn sorted_unique_collapses_duplicates() {
        let mut vals = vec![3.0, 1.0, 2.0, 1.0, 3.0];
        sorted_unique(&mut vals);
        assert_eq!(vals, vec![1.0, 2.0, 3.0]);
    }
}
