use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub routing: RoutingConfig,
    #[serde(default)]
    pub costs: CostConfig,
    #[serde(default)]
    pub input: InputConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            routing: RoutingConfig::default(),
            costs: CostConfig::default(),
            input: InputConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RoutingConfig {
    #[serde(default = "default_routing_algorithm")]
    pub algorithm: String,
    #[serde(default = "default_congestion_penalty")]
    pub congestion_penalty: f64,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            algorithm: default_routing_algorithm(),
            congestion_penalty: default_congestion_penalty(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct CostConfig {
    #[serde(default = "default_latency_weight")]
    pub latency_weight: f64,
    #[serde(default = "default_constraint_weight")]
    pub constraint_weight: f64,
    #[serde(default = "default_bandwidth_norm_ceiling")]
    pub bandwidth_norm_ceiling: f64,
    #[serde(default = "default_latency_norm_ceiling")]
    pub latency_norm_ceiling: f64,
    #[serde(default = "default_error_tolerance")]
    pub error_tolerance: f64,
}

impl Default for CostConfig {
    fn default() -> Self {
        Self {
            latency_weight: default_latency_weight(),
            constraint_weight: default_constraint_weight(),
            bandwidth_norm_ceiling: default_bandwidth_norm_ceiling(),
            latency_norm_ceiling: default_latency_norm_ceiling(),
            error_tolerance: default_error_tolerance(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct InputConfig {
    #[serde(default = "default_design_file")]
    pub design_file: String,
    #[serde(default = "default_output_image")]
    pub output_image: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            design_file: default_design_file(),
            output_image: default_output_image(),
        }
    }
}

fn default_routing_algorithm() -> String {
    "shortest_latency".to_string()
}

fn default_congestion_penalty() -> f64 {
    20.0
}

fn default_latency_weight() -> f64 {
    1.0
}

fn default_constraint_weight() -> f64 {
    1.0
}

fn default_bandwidth_norm_ceiling() -> f64 {
    1.0
}

// Latencies sit in the picosecond range; the inverse factor is capped there
// so a near-zero latency total cannot blow up the normalized cost.
fn default_latency_norm_ceiling() -> f64 {
    1e12
}

fn default_error_tolerance() -> f64 {
    1e-9
}

fn default_design_file() -> String {
    "inputs/mesh.noc".to_string()
}

fn default_output_image() -> String {
    "output/noc.png".to_string()
}
