use crate::grid::SpatialGrid;
use crate::particle::ParticleBox;

/// Two full-grid generations of boxes with a single flag naming the input side.
///
/// Every sub-step reads the input generation and writes the output generation,
/// so a step never observes its own writes. After a tick completes the input
/// generation holds the finished state.
#[derive(Debug)]
pub struct GenerationBuffer {
    buffers: [Vec<ParticleBox>; 2],
    input: usize,
}

impl GenerationBuffer {
    /// Allocates both generations with empty boxes.
    pub fn new(grid: &SpatialGrid, capacity: usize) -> Self {
        let boxes = grid.build_boxes(capacity);
        GenerationBuffer { buffers: [boxes.clone(), boxes], input: 0 }
    }

    /// Read-only view of the input (completed) generation.
    pub fn input(&self) -> &[ParticleBox] {
        &self.buffers[self.input]
    }

    pub fn output_mut(&mut self) -> &mut [ParticleBox] {
        &mut self.buffers[1 - self.input]
    }

    /// Borrows the input generation for reading and the output generation for writing.
    pub fn split(&mut self) -> (&[ParticleBox], &mut [ParticleBox]) {
        let (first, second) = self.buffers.split_at_mut(1);
        if self.input == 0 {
            (first[0].as_slice(), second[0].as_mut_slice())
        } else {
            (second[0].as_slice(), first[0].as_mut_slice())
        }
    }

    /// Output becomes input for the next step.
    pub fn swap(&mut self) {
        self.input = 1 - self.input;
    }

    /// Overwrites the input generation with the contents of the output generation.
    pub fn sync_input_from_output(&mut self) {
        let (first, second) = self.buffers.split_at_mut(1);
        if self.input == 0 {
            first[0].clone_from_slice(&second[0]);
        } else {
            second[0].clone_from_slice(&first[0]);
        }
    }
}
