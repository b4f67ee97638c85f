pub mod config;
pub mod sim_params;
pub mod snapshot;
pub mod vecmath;

// Re-export key types for easier use by dependent crates
pub use config::{SimulationConfig, GridConfig, ParticleConfig, InflowConfig, ReassignmentConfig, RunConfig, OutputConfig};
pub use sim_params::SimParams;
pub use snapshot::{Snapshot, ParticleRecord};
pub use vecmath::{Vec2, lerp};
