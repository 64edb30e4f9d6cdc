use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::GridMapError;

fn default_weight_property() -> String {
    "n".to_string()
}

fn default_seed_radius() -> f64 {
    5000.0
}

fn default_iterations() -> u32 {
    300
}

fn default_alpha_min() -> f64 {
    0.001
}

fn default_velocity_decay() -> f64 {
    0.6
}

fn default_seed() -> u64 {
    1
}

fn default_position_strength() -> f64 {
    0.1
}

fn default_collide_strength() -> f64 {
    1.0
}

fn default_collide_iterations() -> u32 {
    1
}

fn default_radius_factor() -> f64 {
    0.5
}

fn default_cluster_strength() -> f64 {
    0.08
}

fn default_tile_repel_strength() -> f64 {
    0.8
}

fn default_true() -> bool {
    true
}

fn default_snap_duration_ms() -> u64 {
    500
}

fn default_frame_ms() -> u64 {
    16
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Everything needed to turn a weighted layer into a grid map. Built once and
/// handed to [`crate::map::GridMap::build`]; nothing mutates it afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridMapConfig {
    #[serde(default = "default_weight_property")]
    pub weight_property: String,
    #[serde(default = "default_seed_radius")]
    pub seed_radius: f64,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub forces: ForcesConfig,
    #[serde(default)]
    pub snap: SnapConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    #[serde(default = "default_iterations")]
    pub iterations: u32,
    #[serde(default = "default_alpha_min")]
    pub alpha_min: f64,
    #[serde(default)]
    pub alpha_target: f64,
    #[serde(default = "default_velocity_decay")]
    pub velocity_decay: f64,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ForcesConfig {
    #[serde(default)]
    pub position: PositionForceConfig,
    #[serde(default)]
    pub collide: CollideForceConfig,
    #[serde(default)]
    pub cluster: ClusterForceConfig,
    #[serde(default)]
    pub tile_repel: TileRepelForceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionForceConfig {
    #[serde(default = "default_position_strength")]
    pub strength: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollideForceConfig {
    #[serde(default = "default_collide_strength")]
    pub strength: f64,
    #[serde(default = "default_collide_iterations")]
    pub iterations: u32,
    /// Tile radius as a fraction of the cell size.
    #[serde(default = "default_radius_factor")]
    pub radius_factor: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterForceConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_cluster_strength")]
    pub strength: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TileRepelForceConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_tile_repel_strength")]
    pub strength: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapConfig {
    #[serde(default = "default_snap_duration_ms")]
    pub duration_ms: u64,
    #[serde(default = "default_frame_ms")]
    pub frame_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for GridMapConfig {
    fn default() -> Self {
        Self {
            weight_property: default_weight_property(),
            seed_radius: default_seed_radius(),
            simulation: SimulationConfig::default(),
            forces: ForcesConfig::default(),
            snap: SnapConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            iterations: default_iterations(),
            alpha_min: default_alpha_min(),
            alpha_target: 0.0,
            velocity_decay: default_velocity_decay(),
            seed: default_seed(),
        }
    }
}

impl Default for PositionForceConfig {
    fn default() -> Self {
        Self {
            strength: default_position_strength(),
        }
    }
}

impl Default for CollideForceConfig {
    fn default() -> Self {
        Self {
            strength: default_collide_strength(),
            iterations: default_collide_iterations(),
            radius_factor: default_radius_factor(),
        }
    }
}

impl Default for ClusterForceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            strength: default_cluster_strength(),
        }
    }
}

impl Default for TileRepelForceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            strength: default_tile_repel_strength(),
        }
    }
}

impl Default for SnapConfig {
    fn default() -> Self {
        Self {
            duration_ms: default_snap_duration_ms(),
            frame_ms: default_frame_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl GridMapConfig {
    pub fn with_weight_property(mut self, property: impl Into<String>) -> Self {
        self.weight_property = property.into();
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.simulation.seed = seed;
        self
    }

    pub fn with_seed_radius(mut self, radius: f64) -> Self {
        self.seed_radius = radius;
        self
    }

    pub fn validate(&self) -> Result<(), GridMapError> {
        let invalid = |msg: String| Err(GridMapError::InvalidConfig(msg));

        if self.weight_property.trim().is_empty() {
            return invalid("weight_property must not be empty".into());
        }
        if !self.seed_radius.is_finite() || self.seed_radius < 0.0 {
            return invalid(format!(
                "seed_radius must be a non-negative number, got {}",
                self.seed_radius
            ));
        }

        let sim = &self.simulation;
        if sim.iterations == 0 {
            return invalid("simulation.iterations must be at least 1".into());
        }
        if !(sim.alpha_min > 0.0 && sim.alpha_min < 1.0) {
            return invalid(format!(
                "simulation.alpha_min must lie in (0, 1), got {}",
                sim.alpha_min
            ));
        }
        if !(0.0..1.0).contains(&sim.alpha_target) {
            return invalid(format!(
                "simulation.alpha_target must lie in [0, 1), got {}",
                sim.alpha_target
            ));
        }
        if !(0.0..=1.0).contains(&sim.velocity_decay) {
            return invalid(format!(
                "simulation.velocity_decay must lie in [0, 1], got {}",
                sim.velocity_decay
            ));
        }

        let forces = &self.forces;
        let strengths = [
            ("forces.position.strength", forces.position.strength),
            ("forces.collide.strength", forces.collide.strength),
            ("forces.cluster.strength", forces.cluster.strength),
            ("forces.tile_repel.strength", forces.tile_repel.strength),
        ];
        for (name, value) in strengths {
            if !value.is_finite() {
                return invalid(format!("{name} must be finite, got {value}"));
            }
        }
        if forces.collide.iterations == 0 {
            return invalid("forces.collide.iterations must be at least 1".into());
        }
        if !(forces.collide.radius_factor.is_finite() && forces.collide.radius_factor > 0.0) {
            return invalid(format!(
                "forces.collide.radius_factor must be positive, got {}",
                forces.collide.radius_factor
            ));
        }

        if self.snap.frame_ms == 0 {
            return invalid("snap.frame_ms must be at least 1".into());
        }
        Ok(())
    }
}

pub struct ConfigLoader {
    base_dir: PathBuf,
}

impl ConfigLoader {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn load(&self, file: impl AsRef<Path>) -> Result<GridMapConfig> {
        let path = self.base_dir.join(file);
        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: GridMapConfig = serde_yaml::from_str(&data)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config in {}", path.display()))?;
        Ok(config)
    }
}
