use crate::error::SimError;
use crate::grid::SpatialGrid;
use crate::particle::{Particle, ParticleBox};
use gridfluid_common::{SimParams, Vec2};
use rand::prelude::*;
use rayon::prelude::*;
use serde::Serialize;

/// Capacity thresholds applied per destination box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CullLimits {
    /// A cull fires when more candidates than this are gathered.
    pub trigger: usize,
    /// Survivors kept by a cull.
    pub target: usize,
}

impl CullLimits {
    pub fn from_params(params: &SimParams) -> Self {
        CullLimits {
            trigger: params.cull_trigger as usize,
            target: params.cull_target as usize,
        }
    }
}

/// Outcome of one destination box.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BoxOutcome {
    pub gathered: usize,
    pub culled: usize,
    pub mass_redistributed: f32,
}

/// Totals for a whole reassignment pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ReassignStats {
    pub culled_boxes: usize,
    pub particles_culled: usize,
    /// Live particles before the pass that no destination box claimed (left the domain).
    pub particles_dropped: usize,
    pub mass_redistributed: f32,
}

/// SplitMix64 finalizer.
#[inline(always)]
fn mix(mut z: u64) -> u64 {
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Independent RNG for one destination box of one reassignment pass.
///
/// Ticks are mixed from even inputs and box indices from odd ones, so the two
/// terms cannot cancel each other.
pub fn box_rng(seed: u64, tick: u64, box_idx: usize) -> StdRng {
    let box_seed = seed ^ mix(tick.wrapping_mul(2)) ^ mix((box_idx as u64).wrapping_mul(2).wrapping_add(1));
    StdRng::seed_from_u64(box_seed)
}

/// Live particles of `read` around `box_idx` whose position lies inside `dest`.
pub fn gather_candidates(
    grid: &SpatialGrid,
    read: &[ParticleBox],
    box_idx: usize,
    dest: &ParticleBox,
) -> Vec<Particle> {
    let empty = ParticleBox::empty();
    grid.moore_boxes(read, box_idx, &empty)
        .flat_map(|b| b.live())
        .filter(|p| p.position.within(dest.lower, dest.upper))
        .copied()
        .collect()
}

/// Reduces `candidates` to `limits.target` when there are more than `limits.trigger`.
///
/// The removed particles' mass and momentum are shared equally among the
/// survivors, so both totals of the candidate set are unchanged. Returns the
/// number removed and the mass handed on.
pub fn cull_and_redistribute(
    candidates: &mut Vec<Particle>,
    limits: CullLimits,
    rng: &mut StdRng,
) -> (usize, f32) {
    if candidates.len() <= limits.trigger || limits.target == 0 {
        return (0, 0.0);
    }

    // Random survivors: shuffle, then cut the tail.
    candidates.shuffle(rng);
    let removed = candidates.split_off(limits.target);

    let mass_lost: f32 = removed.iter().map(|p| p.mass).sum();
    let momentum_lost: Vec2 = removed.iter().map(Particle::momentum).sum();

    let survivors = candidates.len() as f32;
    let mass_share = mass_lost / survivors;
    let momentum_share = momentum_lost / survivors;

    for p in candidates.iter_mut() {
        let momentum = p.momentum() + momentum_share;
        p.mass += mass_share;
        if p.mass > 0.0 {
            p.velocity = momentum / p.mass;
        }
    }

    (removed.len(), mass_lost)
}

/// Rebuilds one destination box from the Moore neighbourhood of `read`.
pub fn reassign_box(
    grid: &SpatialGrid,
    read: &[ParticleBox],
    box_idx: usize,
    dest: &mut ParticleBox,
    limits: CullLimits,
    rng: &mut StdRng,
) -> Result<BoxOutcome, SimError> {
    // Phase 1: Collect everything in the neighbourhood that now sits inside this box.
    let mut candidates = gather_candidates(grid, read, box_idx, dest);
    let gathered = candidates.len();
    // Phase 2: Thin out an overcrowded box, handing the removed mass and momentum on.
    let (culled, mass_redistributed) = cull_and_redistribute(&mut candidates, limits, rng);
    // Phase 3: Overwrite the destination slots; the rest are padded with Empty.
    dest.write_slots(&candidates)?;
    Ok(BoxOutcome { gathered, culled, mass_redistributed })
}

/// Migrates every live particle of `read` into the box of `write` that contains it,
/// enforcing the cull limits box by box.
pub fn reassign_particles(
    grid: &SpatialGrid,
    read: &[ParticleBox],
    write: &mut [ParticleBox],
    limits: CullLimits,
    seed: u64,
    tick: u64,
) -> Result<ReassignStats, SimError> {
    // Destination boxes are independent, so each gets its own task and its own seeded RNG.
    let outcomes: Vec<BoxOutcome> = write
        .par_iter_mut()
        .enumerate()
        .map(|(box_idx, dest)| {
            let mut rng = box_rng(seed, tick, box_idx);
            reassign_box(grid, read, box_idx, dest, limits, &mut rng)
        })
        .collect::<Result<Vec<BoxOutcome>, SimError>>()?;

    // Anything no destination claimed has left the domain or moved too far.
    let live_before: usize = read.iter().map(ParticleBox::count_live).sum();
    let gathered: usize = outcomes.iter().map(|o| o.gathered).sum();

    let mut stats = ReassignStats {
        particles_dropped: live_before.saturating_sub(gathered),
        ..ReassignStats::default()
    };
    for outcome in outcomes.iter().filter(|o| o.culled > 0) {
        stats.culled_boxes += 1;
        stats.particles_culled += outcome.culled;
        stats.mass_redistributed += outcome.mass_redistributed;
    }
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIMITS: CullLimits = CullLimits { trigger: 16, target: 12 };

    fn uniform_particles(n: u64, position: Vec2) -> Vec<Particle> {
        (0..n)
            .map(|id| Particle::new(id, position, Vec2::new(1.0, 0.0), 1.0))
            .collect()
    }

    #[test]
    fn test_cull_keeps_target_and_conserves() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut candidates: Vec<Particle> = (0..20u64)
            .map(|id| {
                let v = Vec2::new(id as f32 * 0.1 - 1.0, 0.3);
                Particle::new(id, Vec2::new(1.0, 1.0), v, 0.5 + id as f32 * 0.05)
            })
            .collect();
        let mass_before: f32 = candidates.iter().map(|p| p.mass).sum();
        let momentum_before: Vec2 = candidates.iter().map(Particle::momentum).sum();

        let (culled, _) = cull_and_redistribute(&mut candidates, LIMITS, &mut rng);
        assert_eq!(culled, 8);
        assert_eq!(candidates.len(), 12);

        let mass_after: f32 = candidates.iter().map(|p| p.mass).sum();
        let momentum_after: Vec2 = candidates.iter().map(Particle::momentum).sum();
        assert!((mass_before - mass_after).abs() < 1e-4);
        assert!((momentum_before - momentum_after).length() < 1e-4);
    }

    #[test]
    fn test_at_trigger_nothing_changes() {
        let mut rng = StdRng::seed_from_u64(9);
        let original = uniform_particles(16, Vec2::new(1.0, 1.0));
        let mut candidates = original.clone();
        assert_eq!(cull_and_redistribute(&mut candidates, LIMITS, &mut rng), (0, 0.0));
        assert_eq!(candidates, original);
    }

    #[test]
    fn test_same_seed_same_survivors() {
        let run = || {
            let mut candidates = uniform_particles(30, Vec2::new(1.0, 1.0));
            cull_and_redistribute(&mut candidates, LIMITS, &mut box_rng(5, 10, 3));
            candidates.iter().map(|p| p.id).collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_particles_migrate_to_containing_box() {
        let grid = SpatialGrid::new(2, 10.0);
        let mut read = grid.build_boxes(16);
        // Stored in box 0 but has drifted into box (1, 0)
        read[0].insert(Particle::new(1, Vec2::new(12.0, 3.0), Vec2::new(1.0, 0.0), 1.0)).unwrap();
        read[0].insert(Particle::new(2, Vec2::new(3.0, 3.0), Vec2::zero(), 1.0)).unwrap();
        // Outside the domain entirely
        read[3].insert(Particle::new(3, Vec2::new(25.0, 25.0), Vec2::zero(), 1.0)).unwrap();
        let mut write = grid.build_boxes(16);

        let stats = reassign_particles(&grid, &read, &mut write, LIMITS, 1, 0).unwrap();
        assert_eq!(write[0].live().map(|p| p.id).collect::<Vec<_>>(), vec![2]);
        assert_eq!(write[1].live().map(|p| p.id).collect::<Vec<_>>(), vec![1]);
        assert_eq!(write[3].count_live(), 0);
        assert_eq!(stats.particles_dropped, 1);
        assert_eq!(stats.culled_boxes, 0);
        assert!(write.iter().all(|b| b.capacity() == 16));
    }

    #[test]
    fn test_box_rng_differs_per_box() {
        let a: u64 = box_rng(1, 0, 0).random();
        let b: u64 = box_rng(1, 0, 1).random();
        let c: u64 = box_rng(1, 10, 0).random();
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_box_rng_xors_mixed_tick_and_box() {
        let expected: u64 = StdRng::seed_from_u64(42 ^ mix(2 * 30) ^ mix(2 * 7 + 1)).random();
        let actual: u64 = box_rng(42, 30, 7).random();
        assert_eq!(actual, expected);

        // Swapping tick and box index, or making them equal, must not collapse the seed
        let swapped: u64 = box_rng(42, 7, 30).random();
        let equal: u64 = box_rng(42, 7, 7).random();
        let seed_only: u64 = StdRng::seed_from_u64(42).random();
        assert_ne!(actual, swapped);
        assert_ne!(equal, seed_only);
    }
}
