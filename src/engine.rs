//! Layout-engine plugin surface. Hosts treat every backend through the
//! same interface: flags for the CLI layer, an info record, JSON option
//! hydration, `layout`, and `post_process`. A backend that can also
//! route edges over pre-positioned nodes exposes an [`EdgeRouter`].
//!
//! Two engines ship in-process: `grid` (grid-snap placement plus L/Z
//! routing) and `preset` (node positions produced upstream, e.g. by a
//! layered engine running out of process; only labels and corridor
//! routing happen here).

use crate::config::{LayoutOptions, RouterOptions};
use crate::error::LayoutError;
use crate::graph::Graph;
use crate::layout;

/// A flag a host CLI can surface for one engine.
#[derive(Debug, Clone)]
pub struct EngineFlag {
    pub name: &'static str,
    pub usage: &'static str,
    pub default: i64,
    /// Field name in the options JSON this flag hydrates.
    pub tag: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineFeature {
    /// The engine can route edges for a graph positioned elsewhere.
    RoutesEdges,
}

#[derive(Debug, Clone)]
pub struct EngineInfo {
    pub name: &'static str,
    pub features: Vec<EngineFeature>,
    pub short_help: &'static str,
}

/// Edge routing over pre-positioned nodes, offered by engines that
/// support it.
pub trait EdgeRouter {
    fn route_edges(&self, graph: &mut Graph, edges: &[usize]) -> Result<(), LayoutError>;
}

/// Common interface over layout backends.
pub trait LayoutEngine {
    fn flags(&self) -> Vec<EngineFlag>;
    fn info(&self) -> EngineInfo;
    /// Applies a JSON options blob. `None` keeps the defaults.
    fn hydrate_opts(&mut self, opts: Option<&[u8]>) -> Result<(), LayoutError>;
    fn layout(&self, graph: &mut Graph) -> Result<(), LayoutError>;
    /// Hook over the rendered output; the default passes it through.
    fn post_process(&self, rendered: Vec<u8>) -> Vec<u8> {
        rendered
    }
    /// The engine's router, when it has the [`EngineFeature::RoutesEdges`]
    /// feature.
    fn router(&self) -> Option<&dyn EdgeRouter> {
        None
    }
}

fn router_flags(crossing_name: &'static str, spacing_name: &'static str) -> Vec<EngineFlag> {
    let defaults = RouterOptions::default();
    vec![
        EngineFlag {
            name: crossing_name,
            usage: "penalty for edge crossings in routing (higher = fewer crossings)",
            default: defaults.crossing_penalty,
            tag: "crossingPenalty",
        },
        EngineFlag {
            name: spacing_name,
            usage: "minimum spacing between parallel edges",
            default: defaults.edge_spacing,
            tag: "edgeSpacing",
        },
    ]
}

/// Grid engine: standalone placement and L/Z routing, with corridor
/// routing for pre-positioned subgraphs.
#[derive(Debug, Default)]
pub struct GridEngine {
    opts: LayoutOptions,
}

impl LayoutEngine for GridEngine {
    fn flags(&self) -> Vec<EngineFlag> {
        router_flags("grid-crossingPenalty", "grid-edgeSpacing")
    }

    fn info(&self) -> EngineInfo {
        EngineInfo {
            name: "grid",
            features: vec![EngineFeature::RoutesEdges],
            short_help: "Grid-snap placement with orthogonal L/Z edge routing.",
        }
    }

    fn hydrate_opts(&mut self, opts: Option<&[u8]>) -> Result<(), LayoutError> {
        if let Some(bytes) = opts {
            self.opts.router = serde_json::from_slice(bytes)?;
        }
        Ok(())
    }

    fn layout(&self, graph: &mut Graph) -> Result<(), LayoutError> {
        layout::layout(graph, &self.opts)
    }

    fn router(&self) -> Option<&dyn EdgeRouter> {
        Some(self)
    }
}

impl EdgeRouter for GridEngine {
    fn route_edges(&self, graph: &mut Graph, edges: &[usize]) -> Result<(), LayoutError> {
        layout::route_edges(graph, edges, &self.opts.router)
    }
}

/// Preset engine: node boxes are taken as given (an external engine
/// positioned them); `layout` only resolves label and icon positions,
/// and edges route through the corridor pipeline.
#[derive(Debug, Default)]
pub struct PresetEngine {
    opts: RouterOptions,
}

impl LayoutEngine for PresetEngine {
    fn flags(&self) -> Vec<EngineFlag> {
        router_flags("preset-crossingPenalty", "preset-edgeSpacing")
    }

    fn info(&self) -> EngineInfo {
        EngineInfo {
            name: "preset",
            features: vec![EngineFeature::RoutesEdges],
            short_help: "Corridor edge routing over externally positioned nodes.",
        }
    }

    fn hydrate_opts(&mut self, opts: Option<&[u8]>) -> Result<(), LayoutError> {
        if let Some(bytes) = opts {
            self.opts = serde_json::from_slice(bytes)?;
        }
        Ok(())
    }

    fn layout(&self, graph: &mut Graph) -> Result<(), LayoutError> {
        layout::position_labels(graph);
        Ok(())
    }

    fn router(&self) -> Option<&dyn EdgeRouter> {
        Some(self)
    }
}

impl EdgeRouter for PresetEngine {
    fn route_edges(&self, graph: &mut Graph, edges: &[usize]) -> Result<(), LayoutError> {
        layout::route_edges(graph, edges, &self.opts)
    }
}

/// All bundled engines, in registration order.
pub fn engines() -> Vec<Box<dyn LayoutEngine>> {
    vec![Box::<GridEngine>::default(), Box::<PresetEngine>::default()]
}

/// Looks an engine up by name.
pub fn engine(name: &str) -> Result<Box<dyn LayoutEngine>, LayoutError> {
    engines()
        .into_iter()
        .find(|e| e.info().name == name)
        .ok_or_else(|| LayoutError::UnknownEngine(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Node;

    #[test]
    fn registry_resolves_known_engines() {
        assert!(engine("grid").is_ok());
        assert!(engine("preset").is_ok());
        assert!(matches!(
            engine("sugiyama"),
            Err(LayoutError::UnknownEngine(_))
        ));
    }

    #[test]
    fn hydrate_accepts_camel_case_json() {
        let mut eng = GridEngine::default();
        eng.hydrate_opts(Some(br#"{"crossingPenalty": 100, "edgeSpacing": 4}"#))
            .unwrap();
        assert_eq!(eng.opts.router.crossing_penalty, 100);
        assert_eq!(eng.opts.router.edge_spacing, 4);
    }

    #[test]
    fn hydrate_rejects_malformed_json() {
        let mut eng = PresetEngine::default();
        let err = eng.hydrate_opts(Some(b"not json")).unwrap_err();
        assert!(matches!(err, LayoutError::InvalidOptions(_)));
    }

    #[test]
    fn flags_carry_defaults() {
        let flags = GridEngine::default().flags();
        assert_eq!(flags.len(), 2);
        assert_eq!(flags[0].default, 500);
        assert_eq!(flags[1].default, 10);
    }

    #[test]
    fn both_engines_route_edges() {
        for eng in engines() {
            assert!(eng.router().is_some(), "{} lost its router", eng.info().name);
            assert!(eng.info().features.contains(&EngineFeature::RoutesEdges));
        }
    }

    #[test]
    fn grid_engine_runs_full_layout() {
        let mut graph = Graph::new();
        graph.add_node(Node::new("a", 100.0, 60.0));
        graph.add_node(Node::new("b", 100.0, 60.0));
        graph.add_edge(0, 1);
        let eng = GridEngine::default();
        eng.layout(&mut graph).unwrap();
        assert!(graph.edges[0].route.len() >= 2);
    }

    #[test]
    fn preset_engine_keeps_positions() {
        let mut graph = Graph::new();
        let mut a = Node::new("a", 100.0, 60.0);
        a.bounds.x = 10.0;
        a.bounds.y = 20.0;
        graph.add_node(a);
        let eng = PresetEngine::default();
        eng.layout(&mut graph).unwrap();
        assert_eq!(graph.nodes[0].bounds.x, 10.0);
        assert_eq!(graph.nodes[0].bounds.y, 20.0);
    }

    #[test]
    fn post_process_is_identity_by_default() {
        let eng = GridEngine::default();
        let payload = b"<svg/>".to_vec();
        assert_eq!(eng.post_process(payload.clone()), payload);
    }
}
