use crate::error::SimError;
use crate::grid::SpatialGrid;
use crate::particle::{Particle, ParticleBox};
use gridfluid_common::{lerp, Vec2};
use rayon::prelude::*;

/// Density contribution of a neighbour of mass `mass` at `distance`.
///
/// The interpolation factor is floored at 1.0, so the weight never decays below
/// `mass` and grows linearly with distance.
#[inline(always)]
pub fn contribution(mass: f32, distance: f32, box_size: f32) -> f32 {
    lerp(0.0, mass, (distance / box_size).max(1.0))
}

/// Density of a particle at `position` with identity `id` from the live particles in `neighbours`.
pub fn density_at<'a, I>(id: u64, position: Vec2, neighbours: I, box_size: f32) -> f32
where
    I: IntoIterator<Item = &'a ParticleBox>,
{
    neighbours
        .into_iter()
        .flat_map(|b| b.live())
        .filter(|q| q.id != id)
        .map(|q| contribution(q.mass, q.position.distance(position), box_size))
        .sum()
}

/// Recomputes `density` for every live particle of `write` against the Moore
/// neighbourhoods of `read`. Positions and velocities are left untouched.
pub fn compute_densities(
    grid: &SpatialGrid,
    read: &[ParticleBox],
    write: &mut [ParticleBox],
) -> Result<(), SimError> {
    // Stand-in for neighbours that fall outside the grid.
    let empty = ParticleBox::empty();
    let box_size = grid.box_size();

    // Each output box is owned by one task; the input generation is shared read-only.
    write
        .par_iter_mut()
        .enumerate()
        .try_for_each(|(box_idx, write_box)| {
            for particle in write_box.live_mut() {
                // Sum contributions from all live particles in the 3x3 block, self excluded.
                let density = density_at(
                    particle.id,
                    particle.position,
                    grid.moore_boxes(read, box_idx, &empty),
                    box_size,
                );
                check_density(particle, density)?;
                particle.density = density;
            }
            Ok(())
        })
}

fn check_density(particle: &Particle, density: f32) -> Result<(), SimError> {
    // NaN compares false, so test for the valid range instead of `< 0.0`
    if density >= 0.0 {
        Ok(())
    } else {
        log::error!("Particle {} at {:?} produced density {}", particle.id, particle.position, density);
        Err(SimError::NegativeDensity { id: particle.id, density })
    }
}
