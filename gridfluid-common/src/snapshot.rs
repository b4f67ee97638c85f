use serde::{Serialize, Deserialize};
use crate::vecmath::Vec2;

/// Per-particle record stored in a snapshot when particle output is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParticleRecord {
    pub id: u64,
    pub x: f32,
    pub y: f32,
    pub density: f32,
    pub mass: f32,
}

/// A snapshot of the simulation state and metrics at a specific tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Number of completed ticks when the snapshot was taken.
    pub tick: u64,
    /// Live particles across the whole grid.
    pub live_particle_count: u32,
    /// Sum of particle masses.
    pub total_mass: f32,
    /// Sum of `mass * velocity` over all live particles.
    pub total_momentum: Vec2,
    pub mean_density: f32,
    pub max_density: f32,
    /// Live particle count of every box, in linear box index order.
    pub box_live_counts: Vec<u32>,
    #[serde(skip_serializing_if = "Option::is_none")] // Don't write "particles": null
    pub particles: Option<Vec<ParticleRecord>>,
}
