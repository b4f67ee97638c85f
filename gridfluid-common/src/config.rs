use serde::{Deserialize, Serialize};
use anyhow::Result;
use crate::sim_params::SimParams;
use std::path::Path;

// Grid layout, loaded from config.toml
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct GridConfig {
    pub boxes_per_axis: u32,
    pub domain_size: f32,
    #[serde(default = "default_box_capacity")]
    pub box_capacity: u32,
}

// Initial particle fill
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ParticleConfig {
    #[serde(default)]
    pub initial_per_box: u32,
    #[serde(default = "default_mass")]
    pub initial_mass: f32,
    #[serde(default = "default_velocity_jitter")]
    pub velocity_jitter: f32,
}

// Inflow condition along the left edge of the domain
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct InflowConfig {
    #[serde(default = "default_inflow_min_particles")]
    pub min_particles: u32,
    #[serde(default = "default_mass")]
    pub mass: f32,
    #[serde(default = "default_inflow_velocity_x")]
    pub velocity_x: f32,
}

// Periodic migration and capacity culling
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ReassignmentConfig {
    #[serde(default = "default_interval_ticks")]
    pub interval_ticks: u32,
    #[serde(default = "default_cull_trigger")]
    pub cull_trigger: u32,
    #[serde(default = "default_cull_target")]
    pub cull_target: u32,
}

// Run length and seeding for the engine binary
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct RunConfig {
    pub seed: u64,
    pub total_ticks: u32,
    #[serde(default = "default_record_interval_ticks")]
    pub record_interval_ticks: u32,
}

// Configuration for output settings, loaded from config.toml
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct OutputConfig {
    pub base_filename: String,
    pub save_stats: bool,
    pub save_positions: bool,
    #[serde(default)]
    pub save_particles_in_snapshot: bool,
    pub format: Option<String>, // Output format: "json", "bincode", "messagepack"
}

// Main simulation configuration structure, loaded from config.toml.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct SimulationConfig {
    pub grid: GridConfig,
    #[serde(default)]
    pub particles: ParticleConfig,
    #[serde(default)]
    pub inflow: InflowConfig,
    #[serde(default)]
    pub reassignment: ReassignmentConfig,
    pub run: RunConfig,
    pub output: OutputConfig,
}

impl Default for ParticleConfig {
    fn default() -> Self {
        ParticleConfig {
            initial_per_box: 0,
            initial_mass: default_mass(),
            velocity_jitter: default_velocity_jitter(),
        }
    }
}

impl Default for InflowConfig {
    fn default() -> Self {
        InflowConfig {
            min_particles: default_inflow_min_particles(),
            mass: default_mass(),
            velocity_x: default_inflow_velocity_x(),
        }
    }
}

impl Default for ReassignmentConfig {
    fn default() -> Self {
        ReassignmentConfig {
            interval_ticks: default_interval_ticks(),
            cull_trigger: default_cull_trigger(),
            cull_target: default_cull_target(),
        }
    }
}

impl SimulationConfig {
    /// Loads the simulation configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();

        let config_str = std::fs::read_to_string(path_ref)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path_ref.display(), e))?;
        let config = Self::from_toml_str(&config_str)
            .map_err(|e| anyhow::anyhow!("Invalid config '{}': {}", path_ref.display(), e))?;

        Ok(config)
    }

    /// Parses and validates a configuration from TOML text.
    pub fn from_toml_str(config_str: &str) -> Result<Self> {
        let config: SimulationConfig = toml::from_str(config_str)
            .map_err(|e| anyhow::anyhow!("Failed to parse TOML: {}", e))?;

        config.get_sim_params().validate()?;
        if config.run.record_interval_ticks == 0 {
            anyhow::bail!("record_interval_ticks must be greater than 0.");
        }

        Ok(config)
    }

    /// Converts the configuration into simulation parameters used at runtime.
    pub fn get_sim_params(&self) -> SimParams {
        let boxes_per_axis = self.grid.boxes_per_axis;
        let domain_size = self.grid.domain_size;
        let box_size = if boxes_per_axis > 0 { domain_size / boxes_per_axis as f32 } else { 0.0 };

        SimParams {
            // Domain & Grid
            boxes_per_axis,
            domain_size,
            box_size,
            num_boxes: boxes_per_axis * boxes_per_axis,
            box_capacity: self.grid.box_capacity,
            // Initial fill
            initial_per_box: self.particles.initial_per_box,
            initial_mass: self.particles.initial_mass,
            velocity_jitter: self.particles.velocity_jitter,
            // Inflow
            inflow_min_particles: self.inflow.min_particles,
            inflow_mass: self.inflow.mass,
            inflow_velocity_x: self.inflow.velocity_x,
            // Reassignment
            reassign_interval_ticks: self.reassignment.interval_ticks,
            cull_trigger: self.reassignment.cull_trigger,
            cull_target: self.reassignment.cull_target,
            seed: self.run.seed,
        }
    }
}

fn default_box_capacity() -> u32 {
    16
}

fn default_mass() -> f32 {
    1.0
}

fn default_velocity_jitter() -> f32 {
    0.5 // Spawn velocities fall in [-0.5, 0.5) per axis
}

fn default_inflow_min_particles() -> u32 {
    8
}

fn default_inflow_velocity_x() -> f32 {
    1.0
}

fn default_interval_ticks() -> u32 {
    10
}

fn default_cull_trigger() -> u32 {
    16
}

fn default_cull_target() -> u32 {
    12
}

fn default_record_interval_ticks() -> u32 {
    50
}
