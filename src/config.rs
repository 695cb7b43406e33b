use serde::{Deserialize, Serialize};

/// Tunable parameters for the corridor edge router. Hosts pass these as a
/// JSON blob through the engine plugin surface, so the wire names stay
/// camelCase.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RouterOptions {
    /// Weight added to routing-graph edges that cross already-routed
    /// edges. Higher values produce fewer crossings but potentially
    /// longer routes.
    pub crossing_penalty: i64,
    /// Minimum spacing between parallel edges in shared corridors.
    pub edge_spacing: i64,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            crossing_penalty: 500,
            edge_spacing: 10,
        }
    }
}

/// Tunable parameters for grid-snap placement.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementOptions {
    /// Routing channel reserved around every node, also the minimum cell
    /// dimension.
    pub channel: f64,
    /// Upper bound on local-improvement passes over the placed grid.
    pub improvement_passes: usize,
}

impl Default for PlacementOptions {
    fn default() -> Self {
        Self {
            channel: 80.0,
            improvement_passes: 5,
        }
    }
}

/// Aggregate options for the standalone pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutOptions {
    pub placement: PlacementOptions,
    pub router: RouterOptions,
}
