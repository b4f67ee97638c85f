use crate::error::SimError;
use gridfluid_common::Vec2;

/// A fluid particle. `density` is recomputed every tick; the other fields are advected.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    pub id: u64,
    pub position: Vec2,
    pub velocity: Vec2,
    pub mass: f32,
    pub density: f32,
}

impl Particle {
    pub fn new(id: u64, position: Vec2, velocity: Vec2, mass: f32) -> Self {
        Particle { id, position, velocity, mass, density: 0.0 }
    }

    #[inline(always)]
    pub fn momentum(&self) -> Vec2 {
        self.velocity * self.mass
    }
}

/// One entry of a box's fixed slot array.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Slot {
    #[default]
    Empty,
    Occupied(Particle),
}

impl Slot {
    #[inline(always)]
    pub fn particle(&self) -> Option<&Particle> {
        match self {
            Slot::Occupied(p) => Some(p),
            Slot::Empty => None,
        }
    }

    #[inline(always)]
    pub fn particle_mut(&mut self) -> Option<&mut Particle> {
        match self {
            Slot::Occupied(p) => Some(p),
            Slot::Empty => None,
        }
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        matches!(self, Slot::Empty)
    }
}

/// A square cell of the domain holding a fixed number of particle slots.
///
/// The slot array length never changes after construction. Live particles may
/// sit in any slot, and between reassignments their positions may lie outside
/// `[lower, upper)`.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleBox {
    pub lower: Vec2,
    pub upper: Vec2,
    slots: Vec<Slot>,
}

impl ParticleBox {
    pub fn new(lower: Vec2, upper: Vec2, capacity: usize) -> Self {
        ParticleBox { lower, upper, slots: vec![Slot::Empty; capacity] }
    }

    /// A zero-capacity box standing in for neighbours outside the grid.
    pub fn empty() -> Self {
        ParticleBox::new(Vec2::zero(), Vec2::zero(), 0)
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn count_live(&self) -> usize {
        self.slots.iter().filter(|s| !s.is_empty()).count()
    }

    /// Index of the first empty slot. Callers check `count_live() < capacity()` first.
    pub fn first_empty_slot(&self) -> Result<usize, SimError> {
        self.slots
            .iter()
            .position(Slot::is_empty)
            .ok_or(SimError::CapacityExceeded { capacity: self.capacity() })
    }

    /// Places a particle in the first empty slot and returns the slot index.
    pub fn insert(&mut self, particle: Particle) -> Result<usize, SimError> {
        let idx = self.first_empty_slot()?;
        self.slots[idx] = Slot::Occupied(particle);
        Ok(idx)
    }

    pub fn live(&self) -> impl Iterator<Item = &Particle> + '_ {
        self.slots.iter().filter_map(Slot::particle)
    }

    pub fn live_mut(&mut self) -> impl Iterator<Item = &mut Particle> + '_ {
        self.slots.iter_mut().filter_map(Slot::particle_mut)
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn slots_mut(&mut self) -> &mut [Slot] {
        &mut self.slots
    }

    /// Rewrites every slot: the given particles first, then `Empty` padding.
    pub fn write_slots(&mut self, particles: &[Particle]) -> Result<(), SimError> {
        if particles.len() > self.slots.len() {
            return Err(SimError::CapacityExceeded { capacity: self.slots.len() });
        }
        for (i, slot) in self.slots.iter_mut().enumerate() {
            *slot = match particles.get(i) {
                Some(p) => Slot::Occupied(*p),
                None => Slot::Empty,
            };
        }
        Ok(())
    }

    pub fn total_mass(&self) -> f32 {
        self.live().map(|p| p.mass).sum()
    }

    pub fn total_momentum(&self) -> Vec2 {
        self.live().map(Particle::momentum).sum()
    }
}
