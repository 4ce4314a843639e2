use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub routing: RoutingConfig,
    #[serde(default)]
    pub heatmap: HeatmapConfig,
    #[serde(default)]
    pub advisor: AdvisorConfig,
    #[serde(default)]
    pub input: InputConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RoutingConfig {
    #[serde(default = "default_two_opt_max_passes")]
    pub two_opt_max_passes: usize,
    // Node count from which the distance matrix is built on the rayon pool.
    #[serde(default = "default_parallel_threshold")]
    pub parallel_threshold: usize,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            two_opt_max_passes: default_two_opt_max_passes(),
            parallel_threshold: default_parallel_threshold(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct HeatmapConfig {
    #[serde(default = "default_half_life_secs")]
    pub half_life_secs: u64,
    #[serde(default = "default_eviction_epsilon")]
    pub eviction_epsilon: f64,
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl HeatmapConfig {
    pub fn half_life(&self) -> Duration {
        Duration::from_secs(self.half_life_secs.max(1))
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

impl Default for HeatmapConfig {
    fn default() -> Self {
        Self {
            half_life_secs: default_half_life_secs(),
            eviction_epsilon: default_eviction_epsilon(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AdvisorConfig {
    #[serde(default = "default_hot_fraction")]
    pub hot_fraction: f64,
    #[serde(default = "default_far_quantile")]
    pub far_quantile: f64,
    #[serde(default = "default_zone_quantile")]
    pub zone_quantile: f64,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            hot_fraction: default_hot_fraction(),
            far_quantile: default_far_quantile(),
            zone_quantile: default_zone_quantile(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct InputConfig {
    #[serde(default = "default_layout_file")]
    pub layout_file: String,
    #[serde(default = "default_events_file")]
    pub events_file: String,
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            layout_file: default_layout_file(),
            events_file: default_events_file(),
            output_dir: default_output_dir(),
        }
    }
}

fn default_two_opt_max_passes() -> usize {
    50
}

fn default_parallel_threshold() -> usize {
    16
}

fn default_half_life_secs() -> u64 {
    24 * 60 * 60
}

fn default_eviction_epsilon() -> f64 {
    1e-3
}

fn default_sweep_interval_secs() -> u64 {
    300
}

fn default_hot_fraction() -> f64 {
    0.10
}

fn default_far_quantile() -> f64 {
    0.50
}

fn default_zone_quantile() -> f64 {
    0.25
}

fn default_layout_file() -> String {
    "inputs/warehouse.layout".to_string()
}

fn default_events_file() -> String {
    "inputs/visits.events".to_string()
}

fn default_output_dir() -> String {
    "output".to_string()
}
