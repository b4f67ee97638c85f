//! Fatal conditions raised by the simulation core.
//!
//! Both variants indicate a broken setup or invariant rather than a
//! recoverable per-tick failure; they propagate out of
//! [`GridSimulation::advance`](crate::simulation::GridSimulation::advance).

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum SimError {
    /// A box had no empty slot left for an insertion.
    CapacityExceeded { capacity: usize },
    /// A computed density was negative or NaN.
    NegativeDensity { id: u64, density: f32 },
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimError::CapacityExceeded { capacity } => write!(
                f,
                "Box capacity of {} slots exceeded. Check box_capacity against the inflow and cull thresholds.",
                capacity
            ),
            SimError::NegativeDensity { id, density } => {
                write!(f, "Particle {} has invalid density {}", id, density)
            }
        }
    }
}

impl std::error::Error for SimError {}
