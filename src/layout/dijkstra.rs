//! Modified Dijkstra over the routing graph with augmented state
//! (length, bends, entry orientation). Lexicographic minimization:
//! shortest path first, then fewest bends. The visited key is the
//! (node, entry orientation) pair, which keeps the search finite while
//! letting a node be entered cheaply on either axis.

use std::cmp::{Ordering as CmpOrdering, Reverse};
use std::collections::{BinaryHeap, HashMap, HashSet};

use crate::geometry::Orientation;

use super::routing_graph::RoutingGraph;

/// Path lengths closer than this are considered equal and decided by
/// bend count instead.
const LENGTH_EPS: f64 = 1e-9;

/// Search state at one routing-graph node.
#[derive(Debug, Clone, Copy)]
pub struct DijkstraState {
    pub node: usize,
    pub length: f64,
    pub bends: u32,
    pub orientation: Orientation,
}

impl DijkstraState {
    /// Strictly better under the lexicographic (length, bends) order,
    /// with an epsilon on length to keep float noise from flipping the
    /// comparison.
    pub fn better_than(&self, other: &DijkstraState) -> bool {
        if (self.length - other.length).abs() > LENGTH_EPS {
            self.length < other.length
        } else {
            self.bends < other.bends
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct HeapEntry {
    length: f64,
    bends: u32,
    node: usize,
    orientation: Orientation,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == CmpOrdering::Equal
    }
}

impl Eq for HeapEntry {}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        self.length
            .total_cmp(&other.length)
            .then_with(|| self.bends.cmp(&other.bends))
            .then_with(|| self.node.cmp(&other.node))
            .then_with(|| self.orientation.cmp(&other.orientation))
    }
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

type StateKey = (usize, Orientation);

/// Shortest (length, bends) path from `src` to `dst`. Returns the node
/// ids on the path excluding `src`, including `dst`; `None` when no path
/// exists.
pub fn dijkstra_route(rg: &RoutingGraph, src: usize, dst: usize) -> Option<Vec<usize>> {
    if src == dst {
        return Some(vec![src]);
    }

    let mut best: HashMap<StateKey, DijkstraState> = HashMap::new();
    let mut parent: HashMap<StateKey, StateKey> = HashMap::new();
    let mut visited: HashSet<StateKey> = HashSet::new();
    let mut heap: BinaryHeap<Reverse<HeapEntry>> = BinaryHeap::new();

    // Two seeds, one per orientation, so the first step may take either
    // axis without counting a bend.
    for orientation in [Orientation::Horizontal, Orientation::Vertical] {
        let state = DijkstraState {
            node: src,
            length: 0.0,
            bends: 0,
            orientation,
        };
        best.insert((src, orientation), state);
        heap.push(Reverse(HeapEntry {
            length: 0.0,
            bends: 0,
            node: src,
            orientation,
        }));
    }

    while let Some(Reverse(entry)) = heap.pop() {
        let cur_key = (entry.node, entry.orientation);
        if !visited.insert(cur_key) {
            continue;
        }
        let cur = best[&cur_key];

        if cur.node == dst {
            return Some(reconstruct_path(&parent, cur_key, src));
        }

        for edge in &rg.adj[cur.node] {
            let mut new_bends = cur.bends;
            if cur.node != src && edge.orientation != cur.orientation {
                new_bends += 1;
            }

            let new_state = DijkstraState {
                node: edge.to,
                length: cur.length + edge.weight,
                bends: new_bends,
                orientation: edge.orientation,
            };

            let new_key = (edge.to, edge.orientation);
            if visited.contains(&new_key) {
                continue;
            }
            if let Some(known) = best.get(&new_key) {
                if !new_state.better_than(known) {
                    continue;
                }
            }

            best.insert(new_key, new_state);
            parent.insert(new_key, cur_key);
            heap.push(Reverse(HeapEntry {
                length: new_state.length,
                bends: new_state.bends,
                node: new_state.node,
                orientation: new_state.orientation,
            }));
        }
    }

    None
}

fn reconstruct_path(parent: &HashMap<StateKey, StateKey>, end: StateKey, src: usize) -> Vec<usize> {
    let mut path = Vec::new();
    let mut cur = end;
    while cur.0 != src {
        path.push(cur.0);
        match parent.get(&cur) {
            Some(&prev) => cur = prev,
            None => break,
        }
    }
    path.reverse();
    path
}
