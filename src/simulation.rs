use crate::density::compute_densities;
use crate::generations::GenerationBuffer;
use crate::grid::SpatialGrid;
use crate::injector::{inject_inflow, random_velocity, IdSource};
use crate::integrator::integrate;
use crate::particle::{Particle, ParticleBox};
use crate::reassign::{reassign_particles, CullLimits, ReassignStats};
use anyhow::Result;
use gridfluid_common::{ParticleRecord, SimParams, SimulationConfig, Snapshot, Vec2};
use log::{debug, info, trace};
use rand::distr::Uniform;
use rand::prelude::*;
use rayon::prelude::*;
use serde::Serialize;

/// What a renderer needs to draw one particle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderParticle {
    pub position: Vec2,
    pub density: f32,
    pub mass: f32,
}

/// Summary of one call to [`GridSimulation::advance`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TickReport {
    /// Index of the tick that just ran (0-based).
    pub tick: u64,
    /// Particles spawned along the inflow edge.
    pub injected: usize,
    /// Present when this tick ran a reassignment pass.
    pub reassigned: Option<ReassignStats>,
}

/// Box-grid particle simulation driven one tick at a time by its host.
pub struct GridSimulation {
    params: SimParams,
    grid: SpatialGrid,
    /// Input side holds the completed state between ticks.
    generations: GenerationBuffer,
    /// Host-side RNG for spawning. Reassignment derives its own per-box RNGs.
    rng: StdRng,
    ids: IdSource,
    /// Number of completed ticks.
    tick: u64,
    record_particles: bool,
    recorded_snapshots: Vec<Snapshot>,
}

impl GridSimulation {
    /// Creates a simulation from a loaded configuration.
    pub fn new(config: &SimulationConfig) -> Result<Self> {
        let mut sim = Self::from_params(config.get_sim_params())?;
        sim.record_particles = config.output.save_particles_in_snapshot;
        Ok(sim)
    }

    /// Creates a simulation from runtime parameters, filling every box with
    /// `initial_per_box` randomly placed particles.
    pub fn from_params(params: SimParams) -> Result<Self> {
        params.validate()?;

        let grid = SpatialGrid::from_params(&params);
        let generations = GenerationBuffer::new(&grid, params.box_capacity as usize);
        let rng = StdRng::seed_from_u64(params.seed);

        let mut sim = Self {
            params,
            grid,
            generations,
            rng,
            ids: IdSource::new(),
            tick: 0,
            record_particles: false,
            recorded_snapshots: Vec::new(),
        };
        sim.populate_initial()?;

        info!(
            "Grid of {}x{} boxes ({:.2} units each, {} slots) initialized with {} particles.",
            sim.params.boxes_per_axis,
            sim.params.boxes_per_axis,
            sim.params.box_size,
            sim.params.box_capacity,
            sim.live_particle_count()
        );
        Ok(sim)
    }

    /// Fills the output generation, then mirrors it so both generations start identical.
    fn populate_initial(&mut self) -> Result<()> {
        let per_box = self.params.initial_per_box as usize;
        if per_box > 0 {
            let jitter = self.params.velocity_jitter;
            let mass = self.params.initial_mass;
            for particle_box in self.generations.output_mut().iter_mut() {
                let dist_x = Uniform::new(particle_box.lower.x, particle_box.upper.x)?;
                let dist_y = Uniform::new(particle_box.lower.y, particle_box.upper.y)?;
                for _ in 0..per_box {
                    let position = Vec2::new(self.rng.sample(dist_x), self.rng.sample(dist_y));
                    let velocity = random_velocity(&mut self.rng, jitter);
                    particle_box.insert(Particle::new(self.ids.next_id(), position, velocity, mass))?;
                }
            }
        }
        self.generations.sync_input_from_output();
        Ok(())
    }

    /// Advances the simulation by one tick.
    ///
    /// Density and integration read the input generation and write the output
    /// generation, the inflow edge is topped up in the output, and the
    /// generations swap. Every `reassign_interval_ticks` ticks the reassignment
    /// pass then rebuilds the grid from the new input generation.
    pub fn advance(&mut self) -> Result<TickReport> {
        let tick = self.tick;

        // --- 1. Density and integration (Parallel) ---
        {
            let (read, write) = self.generations.split();
            compute_densities(&self.grid, read, write)?;
            integrate(read, write);
        }

        // --- 2. Top up the inflow column (Serial, host RNG) ---
        let injected = inject_inflow(
            &self.grid,
            self.generations.output_mut(),
            &self.params,
            &mut self.rng,
            &mut self.ids,
        )?;

        // --- Swap: output becomes input for the next step ---
        self.generations.swap();

        // --- 3. Reassign particles to their boxes (Parallel, every N ticks) ---
        let reassigned = if tick % self.params.reassign_interval_ticks as u64 == 0 {
            Some(self.reassign(tick)?)
        } else {
            None
        };

        self.tick += 1;
        trace!("Tick {} complete: {} injected, {} live.", tick, injected, self.live_particle_count());

        Ok(TickReport { tick, injected, reassigned })
    }

    fn reassign(&mut self, tick: u64) -> Result<ReassignStats> {
        let limits = CullLimits::from_params(&self.params);
        let stats = {
            let (read, write) = self.generations.split();
            reassign_particles(&self.grid, read, write, limits, self.params.seed, tick)?
        };
        // Next density pass must see the migrated state on both sides
        self.generations.sync_input_from_output();
        self.generations.swap();

        debug!(
            "Reassignment at tick {}: {} boxes culled, {} particles removed, {:.3} mass redistributed, {} left the domain.",
            tick, stats.culled_boxes, stats.particles_culled, stats.mass_redistributed, stats.particles_dropped
        );
        Ok(stats)
    }

    /// The completed generation, box by box.
    pub fn boxes(&self) -> &[ParticleBox] {
        self.generations.input()
    }

    /// Position, density and mass of every live particle in the completed generation.
    pub fn render_particles(&self) -> impl Iterator<Item = RenderParticle> + '_ {
        self.boxes().iter().flat_map(|b| b.live()).map(|p| RenderParticle {
            position: p.position,
            density: p.density,
            mass: p.mass,
        })
    }

    pub fn live_particle_count(&self) -> u32 {
        self.boxes().par_iter().map(|b| b.count_live() as u32).sum()
    }

    pub fn total_mass(&self) -> f32 {
        self.boxes().iter().map(ParticleBox::total_mass).sum()
    }

    pub fn total_momentum(&self) -> Vec2 {
        self.boxes().iter().map(ParticleBox::total_momentum).sum()
    }

    /// Number of completed ticks.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn params(&self) -> &SimParams {
        &self.params
    }

    pub fn grid(&self) -> &SpatialGrid {
        &self.grid
    }

    /// Records for every live particle of the completed generation.
    pub fn final_positions(&self) -> Vec<ParticleRecord> {
        self.boxes()
            .iter()
            .flat_map(|b| b.live())
            .map(|p| ParticleRecord {
                id: p.id,
                x: p.position.x,
                y: p.position.y,
                density: p.density,
                mass: p.mass,
            })
            .collect()
    }

    /// Collects the current metrics and stores them as a Snapshot.
    pub fn record_snapshot(&mut self) -> Result<()> {
        let box_live_counts: Vec<u32> = self.boxes().par_iter().map(|b| b.count_live() as u32).collect();
        let live_particle_count: u32 = box_live_counts.iter().sum();

        let (density_sum, max_density) = self
            .render_particles()
            .fold((0.0f32, 0.0f32), |(sum, max), p| (sum + p.density, max.max(p.density)));
        let mean_density = if live_particle_count > 0 {
            density_sum / live_particle_count as f32
        } else {
            0.0
        };

        let snapshot = Snapshot {
            tick: self.tick,
            live_particle_count,
            total_mass: self.total_mass(),
            total_momentum: self.total_momentum(),
            mean_density,
            max_density,
            box_live_counts,
            particles: self.record_particles.then(|| self.final_positions()),
        };

        debug!(
            "Snapshot at tick {}: {} live, mass {:.3}, mean density {:.3}",
            snapshot.tick, snapshot.live_particle_count, snapshot.total_mass, snapshot.mean_density
        );
        self.recorded_snapshots.push(snapshot);
        Ok(())
    }

    /// Provides access to the recorded snapshots.
    pub fn recorded_snapshots(&self) -> &[Snapshot] {
        &self.recorded_snapshots
    }
}
