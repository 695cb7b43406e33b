//! Grid-snap placement: maps the root node set onto a virtual grid with
//! variable row heights and column widths, then improves it locally.
//!
//! Stages:
//! 1. BFS from the most-connected node assigns grid cells, expanding in
//!    the graph's preferred flow direction with forward-edge bias.
//! 2. Disconnected nodes fill free cells scanning outward from the origin.
//! 3. A bounded local-improvement pass moves and swaps nodes to reduce
//!    Manhattan edge length plus a blocking penalty.
//! 4. Cells get per-column widths / per-row heights sized to their largest
//!    occupant plus the routing channel; prefix sums yield absolute
//!    coordinates and every node is centered in its cell.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::config::PlacementOptions;
use crate::geometry::Point;
use crate::graph::{FlowDirection, Graph};

/// Each blocked cell observed along a candidate route adds this to the
/// layout cost during local improvement.
const BLOCKING_PENALTY: i64 = 4;

/// Local improvement only considers swap pairs within this window of the
/// node list; beyond it the quadratic pass stops paying for itself.
const SWAP_WINDOW: usize = 30;

/// Outward spiral search radius bound in `find_best_cell`.
const SPIRAL_RADIUS_MAX: i32 = 20;

/// Position on the virtual grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct GridCell {
    pub row: i32,
    pub col: i32,
}

impl GridCell {
    pub fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }
}

/// Result of grid placement, consumed by the L/Z router.
#[derive(Debug, Clone, Default)]
pub struct GridInfo {
    /// Local object index → normalized grid cell.
    pub placement: Vec<GridCell>,
    /// Normalized grid cell → local object index.
    pub occupied: HashMap<GridCell, usize>,
    pub col_width: Vec<f64>,
    pub row_height: Vec<f64>,
    pub col_x: Vec<f64>,
    pub row_y: Vec<f64>,
    /// Graph node indices of the placed objects, in root order.
    pub objects: Vec<usize>,
    pub channel: f64,
}

impl GridInfo {
    /// Center of a (normalized) cell in absolute coordinates.
    pub fn cell_center(&self, cell: GridCell) -> Point {
        let c = cell.col as usize;
        let r = cell.row as usize;
        Point::new(
            self.col_x[c] + self.col_width[c] / 2.0,
            self.row_y[r] + self.row_height[r] / 2.0,
        )
    }
}

/// Places root nodes on the virtual grid and mutates their bounds so each
/// node's center coincides with its cell center. Degenerate inputs (empty
/// graph, single node, singleton clusters) all produce legal placements.
pub fn grid_placement(graph: &mut Graph, opts: &PlacementOptions) -> GridInfo {
    let objects = graph.roots();
    let n = objects.len();
    if n == 0 {
        return GridInfo::default();
    }
    let channel = opts.channel;

    let mut local_index: HashMap<usize, usize> = HashMap::with_capacity(n);
    for (i, &obj) in objects.iter().enumerate() {
        local_index.insert(obj, i);
    }

    // Undirected adjacency over local indices, with direction memory: for
    // each (src, dst) pair, whether an outgoing edge src→dst exists.
    let mut adj: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut outgoing: Vec<HashSet<usize>> = vec![HashSet::new(); n];
    for edge in &graph.edges {
        let (si, di) = match (local_index.get(&edge.src), local_index.get(&edge.dst)) {
            (Some(&si), Some(&di)) => (si, di),
            _ => continue,
        };
        if si == di {
            continue;
        }
        adj[si].push(di);
        adj[di].push(si);
        outgoing[si].insert(di);
    }
    for neighbours in adj.iter_mut() {
        let mut seen = HashSet::new();
        neighbours.retain(|&nb| seen.insert(nb));
    }

    let degree: Vec<usize> = adj.iter().map(Vec::len).collect();

    // BFS root: maximum degree, ties broken by input index.
    let mut start = 0usize;
    for i in 1..n {
        if degree[i] > degree[start] {
            start = i;
        }
    }

    let dirs = bfs_dirs(graph.direction);

    // Aspect ratio control: deprioritize columns beyond ±ceil(sqrt(n)).
    let max_cols = ((n as f64).sqrt().ceil() as i32).max(2);

    let mut occupied: HashSet<GridCell> = HashSet::new();
    let mut placement: Vec<GridCell> = vec![GridCell::default(); n];
    let mut visited = vec![false; n];

    placement[start] = GridCell::new(0, 0);
    occupied.insert(GridCell::new(0, 0));
    visited[start] = true;

    let mut queue: VecDeque<usize> = VecDeque::new();
    queue.push_back(start);

    while let Some(cur) = queue.pop_front() {
        let cur_cell = placement[cur];

        let mut neighbours: Vec<usize> = adj[cur].iter().copied().filter(|&nb| !visited[nb]).collect();

        // Higher degree first; forward edges before backward; index ascending.
        neighbours.sort_by(|&a, &b| {
            degree[b]
                .cmp(&degree[a])
                .then_with(|| outgoing[cur].contains(&b).cmp(&outgoing[cur].contains(&a)))
                .then_with(|| a.cmp(&b))
        });

        for nb in neighbours {
            if visited[nb] {
                continue;
            }
            visited[nb] = true;

            // Backward edges (nb→cur) expand against the flow direction.
            let preferred = if outgoing[cur].contains(&nb) {
                dirs
            } else {
                reverse_dirs(dirs)
            };

            let cell = find_best_cell(cur_cell, &occupied, &preferred, max_cols);
            placement[nb] = cell;
            occupied.insert(cell);
            queue.push_back(nb);
        }
    }

    // Disconnected components fill free cells around the origin.
    for i in 0..n {
        if !visited[i] {
            let cell = find_first_free(&occupied);
            placement[i] = cell;
            occupied.insert(cell);
            visited[i] = true;
        }
    }

    local_improve(
        &mut placement,
        &mut occupied,
        &adj,
        opts.improvement_passes,
    );

    // Normalize so the minimum row and column are 0.
    let min_row = placement.iter().map(|c| c.row).min().unwrap_or(0);
    let min_col = placement.iter().map(|c| c.col).min().unwrap_or(0);
    let max_row = placement.iter().map(|c| c.row).max().unwrap_or(0);
    let max_col = placement.iter().map(|c| c.col).max().unwrap_or(0);
    for cell in placement.iter_mut() {
        cell.row -= min_row;
        cell.col -= min_col;
    }
    let num_rows = (max_row - min_row + 1) as usize;
    let num_cols = (max_col - min_col + 1) as usize;

    // Variable cell sizes: each column/row fits its largest occupant plus
    // the routing channel; empty tracks keep the channel as a floor.
    let mut col_width = vec![channel; num_cols];
    let mut row_height = vec![channel; num_rows];
    for (i, &obj) in objects.iter().enumerate() {
        let cell = placement[i];
        let bounds = graph.nodes[obj].bounds;
        let w = bounds.w + channel;
        let h = bounds.h + channel;
        let c = cell.col as usize;
        let r = cell.row as usize;
        if w > col_width[c] {
            col_width[c] = w;
        }
        if h > row_height[r] {
            row_height[r] = h;
        }
    }

    let mut col_x = vec![0.0; num_cols];
    let mut x = 0.0;
    for c in 0..num_cols {
        col_x[c] = x;
        x += col_width[c];
    }
    let mut row_y = vec![0.0; num_rows];
    let mut y = 0.0;
    for r in 0..num_rows {
        row_y[r] = y;
        y += row_height[r];
    }

    let mut occupied_idx: HashMap<GridCell, usize> = HashMap::with_capacity(n);
    for (i, &cell) in placement.iter().enumerate() {
        occupied_idx.insert(cell, i);
    }

    let info = GridInfo {
        placement,
        occupied: occupied_idx,
        col_width,
        row_height,
        col_x,
        row_y,
        objects,
        channel,
    };

    // Center each node in its cell.
    for (i, &obj) in info.objects.iter().enumerate() {
        let center = info.cell_center(info.placement[i]);
        let node = &mut graph.nodes[obj];
        node.bounds.x = center.x - node.bounds.w / 2.0;
        node.bounds.y = center.y - node.bounds.h / 2.0;
    }

    info
}

/// BFS expansion offsets in priority order, primary direction first.
fn bfs_dirs(direction: FlowDirection) -> [GridCell; 4] {
    match direction {
        FlowDirection::Down => [
            GridCell::new(1, 0),
            GridCell::new(0, 1),
            GridCell::new(-1, 0),
            GridCell::new(0, -1),
        ],
        FlowDirection::Up => [
            GridCell::new(-1, 0),
            GridCell::new(0, 1),
            GridCell::new(1, 0),
            GridCell::new(0, -1),
        ],
        FlowDirection::Left => [
            GridCell::new(0, -1),
            GridCell::new(1, 0),
            GridCell::new(0, 1),
            GridCell::new(-1, 0),
        ],
        FlowDirection::Right => [
            GridCell::new(0, 1),
            GridCell::new(1, 0),
            GridCell::new(0, -1),
            GridCell::new(-1, 0),
        ],
    }
}

/// Same offsets with the primary direction reversed, used for backward
/// edges.
fn reverse_dirs(dirs: [GridCell; 4]) -> [GridCell; 4] {
    let mut rev = dirs;
    rev[0] = GridCell::new(-dirs[0].row, -dirs[0].col);
    rev
}

/// Finds the best unoccupied cell near `center`: direct neighbours in
/// priority order (column-bounded first), then an outward spiral, and as a
/// last resort a far-off cell in the same row so placement always
/// terminates.
fn find_best_cell(
    center: GridCell,
    occupied: &HashSet<GridCell>,
    dirs: &[GridCell; 4],
    max_cols: i32,
) -> GridCell {
    for d in dirs {
        let candidate = GridCell::new(center.row + d.row, center.col + d.col);
        if !occupied.contains(&candidate) && candidate.col.abs() < max_cols {
            return candidate;
        }
    }
    for d in dirs {
        let candidate = GridCell::new(center.row + d.row, center.col + d.col);
        if !occupied.contains(&candidate) {
            return candidate;
        }
    }

    for radius in 2..=SPIRAL_RADIUS_MAX {
        for dr in -radius..=radius {
            for dc in -radius..=radius {
                if dr.abs() != radius && dc.abs() != radius {
                    continue;
                }
                let candidate = GridCell::new(center.row + dr, center.col + dc);
                if !occupied.contains(&candidate) && candidate.col.abs() < max_cols {
                    return candidate;
                }
            }
        }
    }
    for radius in 2..=SPIRAL_RADIUS_MAX {
        for dr in -radius..=radius {
            for dc in -radius..=radius {
                if dr.abs() != radius && dc.abs() != radius {
                    continue;
                }
                let candidate = GridCell::new(center.row + dr, center.col + dc);
                if !occupied.contains(&candidate) {
                    return candidate;
                }
            }
        }
    }

    GridCell::new(center.row, center.col + 100)
}

/// First unoccupied cell scanning expanding squares around the origin.
fn find_first_free(occupied: &HashSet<GridCell>) -> GridCell {
    for radius in 0..=50 {
        for r in -radius..=radius {
            for c in -radius..=radius {
                let cell = GridCell::new(r, c);
                if !occupied.contains(&cell) {
                    return cell;
                }
            }
        }
    }
    GridCell::new(0, occupied.len() as i32)
}

/// Cost of one edge between cells: Manhattan distance plus a blocking
/// penalty for occupied cells a route would have to dodge. Same-row and
/// same-column endpoints count occupied cells strictly between them; for
/// diagonal endpoints the penalty applies only when both L-route corners
/// are blocked, since either free corner yields a working L-route.
fn edge_cost(ci: GridCell, cj: GridCell, occupied: &HashSet<GridCell>) -> i64 {
    let dist = ((ci.row - cj.row).abs() + (ci.col - cj.col).abs()) as i64;
    if dist <= 1 {
        return dist;
    }

    let mut penalty = 0i64;
    if ci.row == cj.row {
        let (min_c, max_c) = (ci.col.min(cj.col), ci.col.max(cj.col));
        for c in (min_c + 1)..max_c {
            if occupied.contains(&GridCell::new(ci.row, c)) {
                penalty += BLOCKING_PENALTY;
            }
        }
    } else if ci.col == cj.col {
        let (min_r, max_r) = (ci.row.min(cj.row), ci.row.max(cj.row));
        for r in (min_r + 1)..max_r {
            if occupied.contains(&GridCell::new(r, ci.col)) {
                penalty += BLOCKING_PENALTY;
            }
        }
    } else {
        // Corner 1: bend at (ci.row, cj.col), horizontal leg then vertical.
        let corner1_blocked = row_span_blocked(ci.row, ci.col, cj.col, occupied)
            || col_span_blocked(cj.col, ci.row, cj.row, occupied);
        // Corner 2: bend at (cj.row, ci.col), vertical leg then horizontal.
        let corner2_blocked = col_span_blocked(ci.col, ci.row, cj.row, occupied)
            || row_span_blocked(cj.row, ci.col, cj.col, occupied);
        if corner1_blocked && corner2_blocked {
            penalty += BLOCKING_PENALTY;
        }
    }
    dist + penalty
}

fn row_span_blocked(row: i32, c1: i32, c2: i32, occupied: &HashSet<GridCell>) -> bool {
    let (min_c, max_c) = (c1.min(c2), c1.max(c2));
    ((min_c + 1)..max_c).any(|c| occupied.contains(&GridCell::new(row, c)))
}

fn col_span_blocked(col: i32, r1: i32, r2: i32, occupied: &HashSet<GridCell>) -> bool {
    let (min_r, max_r) = (r1.min(r2), r1.max(r2));
    ((min_r + 1)..max_r).any(|r| occupied.contains(&GridCell::new(r, col)))
}

/// Bounded move/swap optimization. Each pass tries, for every node, the
/// four unit moves into a free cell (accepting the first strict
/// improvement) and then pair swaps within [`SWAP_WINDOW`]. Stops early
/// when a whole pass finds nothing.
fn local_improve(
    placement: &mut [GridCell],
    occupied: &mut HashSet<GridCell>,
    adj: &[Vec<usize>],
    max_passes: usize,
) {
    let n = placement.len();
    if n <= 2 {
        return;
    }

    let total_cost = |placement: &[GridCell], occupied: &HashSet<GridCell>| -> i64 {
        let mut sum = 0i64;
        for (i, neighbours) in adj.iter().enumerate() {
            for &nb in neighbours {
                if nb > i {
                    sum += edge_cost(placement[i], placement[nb], occupied);
                }
            }
        }
        sum
    };

    let dirs = [
        GridCell::new(0, 1),
        GridCell::new(1, 0),
        GridCell::new(0, -1),
        GridCell::new(-1, 0),
    ];

    for _ in 0..max_passes {
        let mut improved = false;
        let mut baseline = total_cost(placement, occupied);

        for i in 0..n {
            let orig = placement[i];
            for d in dirs {
                let candidate = GridCell::new(orig.row + d.row, orig.col + d.col);
                if occupied.contains(&candidate) {
                    continue;
                }
                occupied.remove(&orig);
                occupied.insert(candidate);
                placement[i] = candidate;

                let new_cost = total_cost(placement, occupied);
                if new_cost < baseline {
                    baseline = new_cost;
                    improved = true;
                    break;
                }

                occupied.remove(&candidate);
                occupied.insert(orig);
                placement[i] = orig;
            }
        }

        for i in 0..n.min(SWAP_WINDOW) {
            for j in (i + 1)..n.min(SWAP_WINDOW) {
                let (ci, cj) = (placement[i], placement[j]);
                if ci == cj {
                    continue;
                }
                placement[i] = cj;
                placement[j] = ci;

                let new_cost = total_cost(placement, occupied);
                if new_cost < baseline {
                    baseline = new_cost;
                    improved = true;
                } else {
                    placement[i] = ci;
                    placement[j] = cj;
                }
            }
        }

        if !improved {
            break;
        }
    }
}
