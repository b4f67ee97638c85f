use crate::particle::ParticleBox;
use gridfluid_common::{SimParams, Vec2};

/// The 3x3 Moore neighbourhood, the box itself included.
pub const MOORE_OFFSETS: [(i32, i32); 9] = [
    (-1, 1), (0, 1), (1, 1),
    (-1, 0), (0, 0), (1, 0),
    (-1, -1), (0, -1), (1, -1),
];

/// Maps box coordinates to linear indices for a square grid of boxes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialGrid {
    boxes_per_axis: i32,
    box_size: f32,
}

impl SpatialGrid {
    pub fn new(boxes_per_axis: u32, box_size: f32) -> Self {
        SpatialGrid { boxes_per_axis: boxes_per_axis as i32, box_size }
    }

    pub fn from_params(params: &SimParams) -> Self {
        SpatialGrid::new(params.boxes_per_axis, params.box_size)
    }

    pub fn boxes_per_axis(&self) -> u32 {
        self.boxes_per_axis as u32
    }

    pub fn num_boxes(&self) -> usize {
        (self.boxes_per_axis * self.boxes_per_axis) as usize
    }

    pub fn box_size(&self) -> f32 {
        self.box_size
    }

    /// Linear index of box `(x, y)`, or `None` outside the grid.
    #[inline(always)]
    pub fn to_index(&self, x: i32, y: i32) -> Option<usize> {
        let n = self.boxes_per_axis;
        if x < 0 || x >= n || y < 0 || y >= n {
            return None;
        }
        Some((x + y * n) as usize)
    }

    /// Box coordinate of a linear index; inverse of [`to_index`](Self::to_index).
    #[inline(always)]
    pub fn to_coord(&self, index: usize) -> (i32, i32) {
        let n = self.boxes_per_axis as usize;
        ((index % n) as i32, (index / n) as i32)
    }

    /// Lower and upper corners of a box.
    pub fn box_bounds(&self, index: usize) -> (Vec2, Vec2) {
        let (x, y) = self.to_coord(index);
        let lower = Vec2::new(x as f32 * self.box_size, y as f32 * self.box_size);
        let upper = Vec2::new((x + 1) as f32 * self.box_size, (y + 1) as f32 * self.box_size);
        (lower, upper)
    }

    /// Allocates one generation: every box with its bounds and `capacity` empty slots.
    pub fn build_boxes(&self, capacity: usize) -> Vec<ParticleBox> {
        (0..self.num_boxes())
            .map(|i| {
                let (lower, upper) = self.box_bounds(i);
                ParticleBox::new(lower, upper, capacity)
            })
            .collect()
    }

    /// Linear indices of the Moore neighbourhood of `index`; `None` marks neighbours outside the grid.
    pub fn moore_indices(&self, index: usize) -> impl Iterator<Item = Option<usize>> + '_ {
        let (cx, cy) = self.to_coord(index);
        MOORE_OFFSETS
            .iter()
            .map(move |&(dx, dy)| self.to_index(cx + dx, cy + dy))
    }

    /// The nine boxes around `index` in `boxes`. Out-of-range neighbours resolve to `empty`.
    pub fn moore_boxes<'a>(
        &'a self,
        boxes: &'a [ParticleBox],
        index: usize,
        empty: &'a ParticleBox,
    ) -> impl Iterator<Item = &'a ParticleBox> + 'a {
        self.moore_indices(index)
            .map(move |neighbor| neighbor.and_then(|i| boxes.get(i)).unwrap_or(empty))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_round_trip_and_range() {
        let grid = SpatialGrid::new(4, 8.0);
        assert_eq!(grid.to_index(1, 2), Some(9));
        assert_eq!(grid.to_coord(9), (1, 2));
        assert_eq!(grid.to_index(-1, 0), None);
        assert_eq!(grid.to_index(0, 4), None);
        assert_eq!(grid.to_index(4, 3), None);
        assert_eq!(grid.num_boxes(), 16);
    }

    #[test]
    fn test_box_bounds_tile_the_domain() {
        let grid = SpatialGrid::new(4, 8.0);
        let (lower, upper) = grid.box_bounds(grid.to_index(3, 1).unwrap());
        assert_eq!(lower, Vec2::new(24.0, 8.0));
        assert_eq!(upper, Vec2::new(32.0, 16.0));
    }

    #[test]
    fn test_corner_neighbourhood_has_five_empties() {
        let grid = SpatialGrid::new(3, 1.0);
        let missing = grid.moore_indices(0).filter(Option::is_none).count();
        assert_eq!(missing, 5);
        let centre = grid.to_index(1, 1).unwrap();
        assert!(grid.moore_indices(centre).all(|i| i.is_some()));
    }

    #[test]
    fn test_moore_boxes_substitutes_empty_box() {
        let grid = SpatialGrid::new(2, 4.0);
        let boxes = grid.build_boxes(16);
        let empty = ParticleBox::empty();
        let neighbours: Vec<&ParticleBox> = grid.moore_boxes(&boxes, 0, &empty).collect();
        assert_eq!(neighbours.len(), 9);
        assert_eq!(neighbours.iter().filter(|b| b.capacity() == 0).count(), 5);
        assert!(neighbours.iter().all(|b| b.count_live() == 0));
    }
}
