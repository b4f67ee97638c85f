use serde::{Deserialize, Serialize};

/// Simulation parameters derived from the configuration, used frequently during simulation steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimParams {
    // Domain & Grid
    pub boxes_per_axis: u32,
    pub domain_size: f32,
    pub box_size: f32, // Edge length of a (square) box
    pub num_boxes: u32,
    pub box_capacity: u32, // Slots per box, fixed for the lifetime of the grid

    // Initial fill
    pub initial_per_box: u32,
    pub initial_mass: f32,
    pub velocity_jitter: f32, // Spawned velocities are drawn from [-jitter, jitter) per axis

    // Inflow edge (column x = 0)
    pub inflow_min_particles: u32,
    pub inflow_mass: f32,
    pub inflow_velocity_x: f32,

    // Reassignment
    pub reassign_interval_ticks: u32,
    pub cull_trigger: u32, // Cull fires when a box gathers more candidates than this
    pub cull_target: u32,  // Survivors kept after a cull

    pub seed: u64,
}

impl SimParams {
    /// Parameters for a square grid with the default inflow and reassignment tuning.
    pub fn new(boxes_per_axis: u32, domain_size: f32, box_capacity: u32, seed: u64) -> Self {
        SimParams {
            boxes_per_axis,
            domain_size,
            box_size: domain_size / boxes_per_axis.max(1) as f32,
            num_boxes: boxes_per_axis * boxes_per_axis,
            box_capacity,
            initial_per_box: 0,
            initial_mass: 1.0,
            velocity_jitter: 0.5,
            inflow_min_particles: 8,
            inflow_mass: 1.0,
            inflow_velocity_x: 1.0,
            reassign_interval_ticks: 10,
            cull_trigger: 16,
            cull_target: 12,
            seed,
        }
    }

    /// Checks the relationships between capacity and thresholds that the core relies on.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.boxes_per_axis == 0 {
            anyhow::bail!("boxes_per_axis must be greater than 0.");
        }
        if !(self.domain_size > 0.0) {
            anyhow::bail!("domain_size must be positive.");
        }
        if self.box_capacity < self.cull_trigger {
            anyhow::bail!(
                "box_capacity ({}) must be at least cull_trigger ({}).",
                self.box_capacity,
                self.cull_trigger
            );
        }
        if self.cull_target == 0 || self.cull_target > self.cull_trigger {
            anyhow::bail!(
                "cull_target ({}) must be in 1..={} (cull_trigger).",
                self.cull_target,
                self.cull_trigger
            );
        }
        if self.inflow_min_particles > self.box_capacity {
            anyhow::bail!(
                "inflow min_particles ({}) exceeds box_capacity ({}).",
                self.inflow_min_particles,
                self.box_capacity
            );
        }
        if self.initial_per_box > self.box_capacity {
            anyhow::bail!(
                "initial_per_box ({}) exceeds box_capacity ({}).",
                self.initial_per_box,
                self.box_capacity
            );
        }
        if self.reassign_interval_ticks == 0 {
            anyhow::bail!("reassignment interval_ticks must be greater than 0.");
        }
        if self.initial_mass < 0.0 || self.inflow_mass < 0.0 {
            anyhow::bail!("particle masses must not be negative.");
        }
        if self.velocity_jitter < 0.0 {
            anyhow::bail!("velocity_jitter must not be negative.");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let params = SimParams::new(32, 1024.0, 16, 7);
        assert_eq!(params.box_size, 32.0);
        assert_eq!(params.num_boxes, 1024);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_capacity_below_trigger_is_rejected() {
        let params = SimParams::new(4, 64.0, 12, 7);
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_target_above_trigger_is_rejected() {
        let mut params = SimParams::new(4, 64.0, 16, 7);
        params.cull_target = 17;
        assert!(params.validate().is_err());
        params.cull_target = 0;
        assert!(params.validate().is_err());
    }
}
