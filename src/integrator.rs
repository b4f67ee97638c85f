use crate::particle::{ParticleBox, Slot};
use rayon::prelude::*;

/// Advances every particle of `read` by one velocity unit into the matching slot of `write`.
///
/// An empty input slot empties the output slot. Id, mass and velocity carry
/// over unchanged; the output slot keeps the density it already holds.
pub fn integrate(read: &[ParticleBox], write: &mut [ParticleBox]) {
    write
        .par_iter_mut()
        .zip(read.par_iter())
        .for_each(|(write_box, read_box)| {
            for (out, old) in write_box.slots_mut().iter_mut().zip(read_box.slots()) {
                *out = match old {
                    Slot::Empty => Slot::Empty,
                    Slot::Occupied(prev) => {
                        let density = out.particle().map_or(0.0, |p| p.density);
                        let mut next = *prev;
                        next.position = prev.position + prev.velocity;
                        next.density = density;
                        Slot::Occupied(next)
                    }
                };
            }
        });
}
