//! The layout pipeline. Two entry points share the same geometry stack:
//!
//! - [`layout`] runs the standalone pipeline: grid-snap placement,
//!   label positioning, and L/Z edge routing.
//! - [`route_edges`] runs the corridor pipeline over a pre-positioned
//!   subgraph: ports, channels, routing graph, Dijkstra, ordering,
//!   nudging.

pub mod channels;
pub mod dijkstra;
pub mod gridroute;
pub mod nudging;
pub mod ordering;
pub mod placement;
pub mod ports;
pub mod router;
pub mod routing_graph;

pub use router::route_edges;
pub use router::simplify_route;

use crate::config::LayoutOptions;
use crate::error::LayoutError;
use crate::graph::{Graph, LabelPosition};

/// Standalone layout: places root nodes on the virtual grid, positions
/// labels and icons, and routes every edge with the L/Z router.
/// Degenerate inputs (no nodes, one node, disconnected clusters) succeed
/// and produce legal output.
pub fn layout(graph: &mut Graph, opts: &LayoutOptions) -> Result<(), LayoutError> {
    if graph.nodes.is_empty() {
        return Ok(());
    }
    for (ei, edge) in graph.edges.iter().enumerate() {
        for node in [edge.src, edge.dst] {
            if node >= graph.nodes.len() {
                return Err(LayoutError::UnknownNode { edge: ei, node });
            }
        }
    }

    let info = placement::grid_placement(graph, &opts.placement);

    position_labels(graph);

    if !graph.edges.is_empty() {
        gridroute::grid_route_edges(graph, &info);
    }

    // Edge labels sit above the line so they never overlap it.
    for edge in &mut graph.edges {
        if edge.label.is_some() && edge.label_position.is_none() {
            edge.label_position = Some(LabelPosition::OutsideTopCenter);
        }
    }

    Ok(())
}

/// Assigns label and icon positions on every node that has none yet.
/// Without an explicit position a renderer would anchor text at the
/// top-left corner.
pub(crate) fn position_labels(graph: &mut Graph) {
    for node in &mut graph.nodes {
        if node.icon.is_some() && node.icon_position.is_none() {
            if !node.children.is_empty() {
                node.icon_position = Some(LabelPosition::OutsideTopLeft);
                if node.label_position.is_none() {
                    node.label_position = Some(LabelPosition::OutsideTopRight);
                }
            } else if node.language.is_some() {
                node.icon_position = Some(LabelPosition::OutsideTopLeft);
            } else {
                node.icon_position = Some(LabelPosition::InsideMiddleCenter);
            }
        }

        if !node.has_label() || node.label_position.is_some() {
            continue;
        }

        node.label_position = Some(if !node.children.is_empty() {
            LabelPosition::OutsideTopCenter
        } else if node.shape.has_outside_bottom_label() {
            LabelPosition::OutsideBottomCenter
        } else if node.icon.is_some() {
            LabelPosition::InsideTopCenter
        } else {
            LabelPosition::InsideMiddleCenter
        });

        // A label that overflows its shape moves outside.
        if let Some(label) = &node.label {
            if label.width > node.bounds.w || label.height > node.bounds.h {
                node.label_position = Some(if node.children.is_empty() {
                    LabelPosition::OutsideBottomCenter
                } else {
                    LabelPosition::OutsideTopCenter
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Node, NodeShape, TextDims};

    fn labelled(id: &str, w: f64, h: f64) -> Node {
        let mut node = Node::new(id, w, h);
        node.label = Some(TextDims {
            text: id.to_string(),
            width: 40.0,
            height: 14.0,
        });
        node
    }

    #[test]
    fn empty_graph_succeeds_without_mutation() {
        let mut graph = Graph::new();
        layout(&mut graph, &LayoutOptions::default()).unwrap();
        assert!(graph.nodes.is_empty());
    }

    #[test]
    fn layout_places_and_routes() {
        let mut graph = Graph::new();
        graph.add_node(labelled("a", 100.0, 60.0));
        graph.add_node(labelled("b", 100.0, 60.0));
        graph.add_edge(0, 1);
        layout(&mut graph, &LayoutOptions::default()).unwrap();

        assert!(graph.nodes[1].bounds.x > graph.nodes[0].bounds.x);
        assert!(graph.edges[0].route.len() >= 2);
    }

    #[test]
    fn plain_leaf_label_is_centered() {
        let mut graph = Graph::new();
        graph.add_node(labelled("a", 100.0, 60.0));
        layout(&mut graph, &LayoutOptions::default()).unwrap();
        assert_eq!(
            graph.nodes[0].label_position,
            Some(LabelPosition::InsideMiddleCenter)
        );
    }

    #[test]
    fn container_label_goes_outside_top() {
        let mut graph = Graph::new();
        let parent = graph.add_node(labelled("box", 200.0, 150.0));
        let child = graph.add_node(labelled("inner", 80.0, 60.0));
        graph.nodes[child].parent = Some(parent);
        graph.nodes[parent].children.push(child);
        layout(&mut graph, &LayoutOptions::default()).unwrap();
        assert_eq!(
            graph.nodes[parent].label_position,
            Some(LabelPosition::OutsideTopCenter)
        );
    }

    #[test]
    fn image_label_goes_below() {
        let mut graph = Graph::new();
        let mut node = labelled("pic", 64.0, 64.0);
        node.shape = NodeShape::Image;
        graph.add_node(node);
        layout(&mut graph, &LayoutOptions::default()).unwrap();
        assert_eq!(
            graph.nodes[0].label_position,
            Some(LabelPosition::OutsideBottomCenter)
        );
    }

    #[test]
    fn icon_pushes_label_to_inside_top() {
        let mut graph = Graph::new();
        let mut node = labelled("svc", 100.0, 60.0);
        node.icon = Some("database".to_string());
        graph.add_node(node);
        layout(&mut graph, &LayoutOptions::default()).unwrap();
        assert_eq!(
            graph.nodes[0].label_position,
            Some(LabelPosition::InsideTopCenter)
        );
        assert_eq!(
            graph.nodes[0].icon_position,
            Some(LabelPosition::InsideMiddleCenter)
        );
    }

    #[test]
    fn overflowing_label_promotes_outside() {
        let mut graph = Graph::new();
        let mut node = Node::new("tiny", 30.0, 20.0);
        node.label = Some(TextDims {
            text: "very long label".to_string(),
            width: 120.0,
            height: 14.0,
        });
        graph.add_node(node);
        layout(&mut graph, &LayoutOptions::default()).unwrap();
        assert_eq!(
            graph.nodes[0].label_position,
            Some(LabelPosition::OutsideBottomCenter)
        );
    }

    #[test]
    fn explicit_positions_are_preserved() {
        let mut graph = Graph::new();
        let mut node = labelled("a", 100.0, 60.0);
        node.label_position = Some(LabelPosition::OutsideTopLeft);
        graph.add_node(node);
        layout(&mut graph, &LayoutOptions::default()).unwrap();
        assert_eq!(
            graph.nodes[0].label_position,
            Some(LabelPosition::OutsideTopLeft)
        );
    }

    #[test]
    fn edge_labels_default_outside_top() {
        let mut graph = Graph::new();
        graph.add_node(labelled("a", 100.0, 60.0));
        graph.add_node(labelled("b", 100.0, 60.0));
        let e = graph.add_edge(0, 1);
        graph.edges[e].label = Some(TextDims {
            text: "connects".to_string(),
            width: 50.0,
            height: 14.0,
        });
        layout(&mut graph, &LayoutOptions::default()).unwrap();
        assert_eq!(
            graph.edges[e].label_position,
            Some(LabelPosition::OutsideTopCenter)
        );
    }

    #[test]
    fn dangling_edge_is_an_error() {
        let mut graph = Graph::new();
        graph.add_node(labelled("a", 100.0, 60.0));
        graph.add_edge(0, 7);
        let err = layout(&mut graph, &LayoutOptions::default()).unwrap_err();
        assert!(matches!(err, LayoutError::UnknownNode { edge: 0, node: 7 }));
    }
}
