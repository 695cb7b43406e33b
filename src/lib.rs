//! orthoflow: grid placement and orthogonal edge routing for
//! text-to-diagram pipelines.
//!
//! The crate turns a set of labeled nodes and directed edges into
//! axis-aligned polyline routes and node positions that read as a clean
//! grid: nodes aligned on an invisible grid, edges composed of purely
//! horizontal and vertical segments with few bends, bends placed near
//! node boundaries, and no edge passing through a node box.
//!
//! Entry points:
//! - [`layout::layout`] places nodes on a virtual grid and routes edges
//!   with the L/Z router.
//! - [`layout::route_edges`] routes edges through corridors between
//!   nodes that are already positioned.
//! - [`engine`] wraps both behind the plugin interface hosts use to
//!   switch between layout backends.

pub mod config;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod graph;
pub mod layout;

pub use config::{LayoutOptions, PlacementOptions, RouterOptions};
pub use error::LayoutError;
pub use geometry::{Point, Rect};
pub use graph::{Edge, FlowDirection, Graph, LabelPosition, Node, NodeShape, TextDims};
pub use layout::{layout, route_edges};
