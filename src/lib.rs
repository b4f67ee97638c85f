//! Box-grid particle simulation.
//!
//! The domain is a square grid of fixed-capacity boxes held in two
//! generations. Each tick computes densities, advects particles and feeds the
//! inflow edge; every few ticks particles migrate to the box that contains
//! them, with crowded boxes culled under mass and momentum conservation.

pub mod density;
pub mod error;
pub mod generations;
pub mod grid;
pub mod injector;
pub mod integrator;
pub mod particle;
pub mod reassign;
pub mod simulation;

pub use error::SimError;
pub use grid::SpatialGrid;
pub use particle::{Particle, ParticleBox, Slot};
pub use reassign::{CullLimits, ReassignStats};
pub use simulation::{GridSimulation, RenderParticle, TickReport};
