// src/config.rs
//! Declarative description of every scene the viewer can draw.
//!
//! `SceneConfig::default()` is the reference design of the portfolio hero:
//! three rings of 6/8/4 nodes, thinned connections between them, a 500 point
//! particle cloud and a (disabled) floating grid.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::error::{Result, SceneError};
use crate::sections::Backdrop;

/// Upper bounds that keep instance buffers well below wgpu's default
/// `max_buffer_size`.
pub const MAX_LAYERS: usize = 16;
pub const MAX_LAYER_NODES: u32 = 128;
pub const MAX_PARTICLES: u32 = 100_000;
/// Grid lines along one axis, the grid has roughly `2 * n * n` segments.
pub const MAX_GRID_LINES: u32 = 201;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub network: NetworkConfig,
    pub driver: DriverConfig,
    pub particles: ParticleConfig,
    pub grid: GridConfig,
    /// Backdrop used by sections that have no scene of their own.
    pub default_backdrop: Backdrop,
    pub clear_color: Color,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            driver: DriverConfig::default(),
            particles: ParticleConfig::default(),
            grid: GridConfig::default(),
            default_backdrop: Backdrop::Network,
            clear_color: Color::from((18, 18, 18)),
        }
    }
}

impl SceneConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: SceneConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_json_str(&raw)?;
        log::info!("Loaded scene config from {}", path.as_ref().display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.network.validate()?;
        self.driver.validate()?;
        self.particles.validate()?;
        self.grid.validate()
    }
}

/// One ring of neurons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSpec {
    pub center: [f32; 3],
    pub count: u32,
    pub radius: f32,
    #[serde(default)]
    pub pulse: bool,
}

/// Keep-rule and styling for the connections between one pair of layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRule {
    /// Pair (i, j) is kept when `(i + j) % modulus == 0`.
    pub modulus: u32,
    pub color: Color,
    pub width: f32,
    pub opacity: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub layers: Vec<LayerSpec>,
    /// Rule `k` connects layer `k` to layer `k + 1`. Missing rules reuse the last one.
    pub edge_rules: Vec<EdgeRule>,
    pub node_radius: f32,
    pub node_color: Color,
    pub node_alt_color: Color,
    pub hover_color: Color,
    pub camera: CameraConfig,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            layers: vec![
                LayerSpec { center: [-4.0, 0.0, 0.0], count: 6, radius: 2.0, pulse: false },
                LayerSpec { center: [0.0, 0.0, 0.0], count: 8, radius: 2.5, pulse: true },
                LayerSpec { center: [4.0, 0.0, 0.0], count: 4, radius: 1.5, pulse: false },
            ],
            edge_rules: vec![
                EdgeRule { modulus: 3, color: Color::ACCENT, width: 0.5, opacity: 0.4 },
                EdgeRule { modulus: 2, color: Color::PRIMARY, width: 0.5, opacity: 0.4 },
            ],
            node_radius: 0.2,
            node_color: Color::PRIMARY,
            node_alt_color: Color::ACCENT,
            hover_color: Color::ACCENT,
            camera: CameraConfig { eye: [0.0, 0.0, 10.0], target: [0.0, 0.0, 0.0], fov_y_degrees: 50.0 },
        }
    }
}

impl NetworkConfig {
    /// Rule for the connections leaving layer `pair_index`.
    pub fn edge_rule(&self, pair_index: usize) -> Option<&EdgeRule> {
        self.edge_rules.get(pair_index).or_else(|| self.edge_rules.last())
    }

    fn validate(&self) -> Result<()> {
        if self.layers.len() > MAX_LAYERS {
            return Err(SceneError::InvalidConfig(format!(
                "{} layers exceed the limit of {MAX_LAYERS}",
                self.layers.len()
            )));
        }
        for (i, layer) in self.layers.iter().enumerate() {
            if layer.count > MAX_LAYER_NODES {
                return Err(SceneError::InvalidConfig(format!(
                    "layer {i} has {} nodes, limit is {MAX_LAYER_NODES}",
                    layer.count
                )));
            }
            if !layer.center.iter().all(|c| c.is_finite()) {
                return Err(SceneError::InvalidConfig(format!("layer {i} has a non-finite center")));
            }
            if !layer.radius.is_finite() || layer.radius < 0.0 {
                return Err(SceneError::InvalidConfig(format!("layer {i} radius must be finite and >= 0")));
            }
        }
        if self.layers.len() > 1 && self.edge_rules.is_empty() {
            return Err(SceneError::InvalidConfig("at least one edge rule is required".into()));
        }
        if let Some(k) = self.edge_rules.iter().position(|r| r.modulus == 0) {
            return Err(SceneError::InvalidConfig(format!("edge rule {k} has modulus 0")));
        }
        if !(self.node_radius > 0.0) {
            return Err(SceneError::InvalidConfig("node_radius must be > 0".into()));
        }
        self.camera.validate()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraConfig {
    pub eye: [f32; 3],
    pub target: [f32; 3],
    pub fov_y_degrees: f32,
}

impl CameraConfig {
    fn validate(&self) -> Result<()> {
        if !(self.fov_y_degrees > 0.0 && self.fov_y_degrees < 180.0) {
            return Err(SceneError::InvalidConfig(format!("fov {} out of range", self.fov_y_degrees)));
        }
        if self.eye == self.target {
            return Err(SceneError::InvalidConfig("camera eye and target coincide".into()));
        }
        Ok(())
    }
}

/// Factors of the per-frame rotation/pulse driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    pub sway_frequency: f32,
    pub sway_amplitude: f32,
    pub pointer_gain: f32,
    pub pointer_bias: f32,
    pub rotation_smoothing: f32,
    pub pulse_scale: f32,
    pub pulse_smoothing: f32,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            sway_frequency: 0.1,
            sway_amplitude: 0.2,
            pointer_gain: 0.1,
            pointer_bias: 0.05,
            rotation_smoothing: 0.05,
            pulse_scale: 1.4,
            pulse_smoothing: 0.1,
        }
    }
}

impl DriverConfig {
    fn validate(&self) -> Result<()> {
        for (name, factor) in [("rotation_smoothing", self.rotation_smoothing), ("pulse_smoothing", self.pulse_smoothing)] {
            if !(0.0..=1.0).contains(&factor) {
                return Err(SceneError::InvalidConfig(format!("{name} must be within [0, 1]")));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticleConfig {
    pub count: u32,
    /// Edge length of the cube the particles are scattered in.
    pub extent: f32,
    pub size: f32,
    pub color: Color,
    pub opacity: f32,
    /// Fixed seed for a repeatable cloud; random when absent.
    pub seed: Option<u64>,
    pub camera: CameraConfig,
}

impl Default for ParticleConfig {
    fn default() -> Self {
        Self {
            count: 500,
            extent: 15.0,
            size: 0.15,
            color: Color::ACCENT,
            opacity: 0.6,
            seed: None,
            camera: CameraConfig { eye: [0.0, 0.0, 5.0], target: [0.0, 0.0, 0.0], fov_y_degrees: 60.0 },
        }
    }
}

/// Rejects particle counts above `MAX_PARTICLES`.
pub fn check_particle_count(count: u32) -> Result<()> {
    if count > MAX_PARTICLES {
        return Err(SceneError::InvalidConfig(format!(
            "{count} particles exceed the limit of {MAX_PARTICLES}"
        )));
    }
    Ok(())
}

impl ParticleConfig {
    fn validate(&self) -> Result<()> {
        check_particle_count(self.count)?;
        if !(self.extent > 0.0) || !(self.size > 0.0) {
            return Err(SceneError::InvalidConfig("particle extent and size must be > 0".into()));
        }
        self.camera.validate()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub enabled: bool,
    pub height: f32,
    pub size: [f32; 2],
    pub cell_size: f32,
    pub cell_color: Color,
    pub section_size: f32,
    pub section_color: Color,
    pub fade_distance: f32,
    pub fade_strength: f32,
    pub scroll_speed: f32,
    pub camera: CameraConfig,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            height: -2.0,
            size: [10.5, 10.5],
            cell_size: 1.0,
            cell_color: Color::PRIMARY,
            section_size: 3.0,
            section_color: Color::ACCENT,
            fade_distance: 25.0,
            fade_strength: 1.5,
            scroll_speed: 0.15,
            camera: CameraConfig { eye: [0.0, 2.0, 5.0], target: [0.0, 0.0, 0.0], fov_y_degrees: 75.0 },
        }
    }
}

impl GridConfig {
    /// Number of grid lines crossing the given axis (0 = x, 1 = z).
    pub fn lines_along(&self, axis: usize) -> f32 {
        (self.size[axis] * 0.5 / self.cell_size).floor() * 2.0 + 1.0
    }

    fn validate(&self) -> Result<()> {
        if !(self.cell_size > 0.0) || !(self.section_size > 0.0) {
            return Err(SceneError::InvalidConfig("grid cell and section sizes must be > 0".into()));
        }
        if !self.size.iter().all(|s| s.is_finite() && *s >= 0.0) {
            return Err(SceneError::InvalidConfig("grid size must be finite and >= 0".into()));
        }
        for axis in 0..2 {
            let lines = self.lines_along(axis);
            if lines > MAX_GRID_LINES as f32 {
                return Err(SceneError::InvalidConfig(format!(
                    "grid needs {lines} lines on axis {axis}, limit is {MAX_GRID_LINES}"
                )));
            }
        }
        if !(self.fade_distance > 0.0) {
            return Err(SceneError::InvalidConfig("grid fade_distance must be > 0".into()));
        }
        self.camera.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_reference_design() {
        let config = SceneConfig::default();
        let counts: Vec<u32> = config.network.layers.iter().map(|l| l.count).collect();
        assert_eq!(counts, vec![6, 8, 4]);
        assert!(config.network.layers[1].pulse);
        assert_eq!(config.network.edge_rules[0].modulus, 3);
        assert_eq!(config.network.edge_rules[1].modulus, 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn json_round_trip_and_partial_input() {
        let json = serde_json::to_string(&SceneConfig::default()).unwrap();
        assert_eq!(SceneConfig::from_json_str(&json).unwrap(), SceneConfig::default());

        let partial = SceneConfig::from_json_str(r#"{ "particles": { "count": 42 } }"#).unwrap();
        assert_eq!(partial.particles.count, 42);
        assert_eq!(partial.network, NetworkConfig::default());
    }

    #[test]
    fn rejects_zero_modulus() {
        let mut config = SceneConfig::default();
        config.network.edge_rules[1].modulus = 0;
        assert!(matches!(config.validate(), Err(SceneError::InvalidConfig(_))));
    }

    #[test]
    fn rejects_bad_color_in_json() {
        let json = r##"{ "clear_color": "#12" }"##;
        assert!(matches!(SceneConfig::from_json_str(json), Err(SceneError::Json(_))));
    }

    #[test]
    fn missing_edge_rules_reuse_the_last() {
        let mut network = NetworkConfig::default();
        network.edge_rules.truncate(1);
        assert_eq!(network.edge_rule(1).map(|r| r.modulus), Some(3));
        network.edge_rules.clear();
        assert!(network.edge_rule(0).is_none());
    }

    #[test]
    fn rejects_oversized_scenes() {
        let json = r#"{ "particles": { "count": 10000000 } }"#;
        assert!(matches!(SceneConfig::from_json_str(json), Err(SceneError::InvalidConfig(_))));

        let json = r#"{ "grid": { "cell_size": 0.0001 } }"#;
        assert!(matches!(SceneConfig::from_json_str(json), Err(SceneError::InvalidConfig(_))));

        let mut config = SceneConfig::default();
        config.network.layers[0].count = MAX_LAYER_NODES + 1;
        assert!(config.validate().is_err());

        let mut config = SceneConfig::default();
        let layer = config.network.layers[0].clone();
        config.network.layers = vec![layer; MAX_LAYERS + 1];
        assert!(config.validate().is_err());
    }

    #[test]
    fn limits_are_inclusive() {
        assert!(check_particle_count(MAX_PARTICLES).is_ok());
        assert!(check_particle_count(MAX_PARTICLES + 1).is_err());

        let mut config = SceneConfig::default();
        config.particles.count = MAX_PARTICLES;
        config.network.layers[1].count = MAX_LAYER_NODES;
        assert!(config.validate().is_ok());
        assert_eq!(config.grid.lines_along(0), 11.0);
    }

    #[test]
    fn load_reports_missing_file() {
        assert!(matches!(SceneConfig::load("/definitely/not/here.json"), Err(SceneError::Io(_))));
    }
}
