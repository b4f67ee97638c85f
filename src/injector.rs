use crate::error::SimError;
use crate::grid::SpatialGrid;
use crate::particle::{Particle, ParticleBox};
use gridfluid_common::{SimParams, Vec2};
use rand::prelude::*;
use rand::distr::Uniform;

/// Hands out particle ids. Ids are never reused within a run.
#[derive(Debug, Clone, Default)]
pub struct IdSource {
    next: u64,
}

impl IdSource {
    pub fn new() -> Self {
        IdSource { next: 0 }
    }

    pub fn next_id(&mut self) -> u64 {
        let id = self.next;
        self.next += 1;
        id
    }
}

/// Random velocity in `[-jitter, jitter)` on both axes.
pub fn random_velocity(rng: &mut StdRng, jitter: f32) -> Vec2 {
    match Uniform::new(-jitter, jitter) {
        Ok(dist) => Vec2::new(rng.sample(dist), rng.sample(dist)),
        // Zero jitter gives an empty range
        Err(_) => Vec2::zero(),
    }
}

/// Keeps the inflow column (x = 0) of `boxes` topped up and pinned to the inflow condition.
///
/// Boxes below `inflow_min_particles` live particles receive new particles at
/// their lower corner. Afterwards every live particle in the column gets the
/// inflow mass and horizontal velocity. Returns the number of particles spawned.
pub fn inject_inflow(
    grid: &SpatialGrid,
    boxes: &mut [ParticleBox],
    params: &SimParams,
    rng: &mut StdRng,
    ids: &mut IdSource,
) -> Result<usize, SimError> {
    let min_live = params.inflow_min_particles as usize;
    let mut spawned = 0;

    for y in 0..grid.boxes_per_axis() as i32 {
        let Some(box_idx) = grid.to_index(0, y) else { continue };
        let inflow_box = &mut boxes[box_idx];

        let mut live = inflow_box.count_live();
        while live < min_live {
            let velocity = random_velocity(rng, params.velocity_jitter);
            let particle = Particle::new(ids.next_id(), inflow_box.lower, velocity, params.inflow_mass);
            inflow_box.insert(particle)?;
            live += 1;
            spawned += 1;
        }

        for particle in inflow_box.live_mut() {
            particle.mass = params.inflow_mass;
            particle.velocity.x = params.inflow_velocity_x;
        }
    }

    Ok(spawned)
}
