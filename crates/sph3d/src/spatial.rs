//! Spatial hash index for neighbor search.
//!
//! Each particle is keyed by hashing its predicted-position cell
//! (`floor(predicted / h)`) and reducing modulo the particle count, then the
//! particle arrays are sorted so equal keys occupy one contiguous bucket.
//! `offsets[key]` holds the bucket's first index, or N for an empty bucket.
//! Keys collide by design; neighborhood walks must filter candidates by
//! actual distance.

use glam::{IVec3, Vec3};

// Fast integer hash constants for cell coordinates.
const HASH_X: i32 = 73_856_093;
const HASH_Y: i32 = 19_349_663;
const HASH_Z: i32 = 83_492_791;

/// Offsets of the 3x3x3 cell neighborhood, the center cell included.
pub const NEIGHBOR_OFFSETS: [IVec3; 27] = [
    IVec3::new(-1, -1, -1),
    IVec3::new(0, -1, -1),
    IVec3::new(1, -1, -1),
    IVec3::new(-1, 0, -1),
    IVec3::new(0, 0, -1),
    IVec3::new(1, 0, -1),
    IVec3::new(-1, 1, -1),
    IVec3::new(0, 1, -1),
    IVec3::new(1, 1, -1),
    IVec3::new(-1, -1, 0),
    IVec3::new(0, -1, 0),
    IVec3::new(1, -1, 0),
    IVec3::new(-1, 0, 0),
    IVec3::new(0, 0, 0),
    IVec3::new(1, 0, 0),
    IVec3::new(-1, 1, 0),
    IVec3::new(0, 1, 0),
    IVec3::new(1, 1, 0),
    IVec3::new(-1, -1, 1),
    IVec3::new(0, -1, 1),
    IVec3::new(1, -1, 1),
    IVec3::new(-1, 0, 1),
    IVec3::new(0, 0, 1),
    IVec3::new(1, 0, 1),
    IVec3::new(-1, 1, 1),
    IVec3::new(0, 1, 1),
    IVec3::new(1, 1, 1),
];

/// Cell-bucket index rebuilt from predicted positions every step.
pub struct SpatialHash {
    cell_size: f32,
    keys: Vec<u32>,
    sorted_indices: Vec<u32>,
    offsets: Vec<u32>,
    scratch_vec3: Vec<Vec3>,
    scratch_keys: Vec<u32>,
}

impl SpatialHash {
    /// Create an index sized for `particle_count` entries.
    pub fn new(particle_count: usize) -> Self {
        let mut index = Self {
            cell_size: 0.0,
            keys: Vec::new(),
            sorted_indices: Vec::new(),
            offsets: Vec::new(),
            scratch_vec3: Vec::new(),
            scratch_keys: Vec::new(),
        };
        index.resize(particle_count);
        index
    }

    /// Size every buffer for `particle_count` entries.
    pub fn resize(&mut self, particle_count: usize) {
        self.keys.resize(particle_count, 0);
        self.sorted_indices.resize(particle_count, 0);
        self.offsets.resize(particle_count, 0);
        self.scratch_vec3.resize(particle_count, Vec3::ZERO);
        self.scratch_keys.resize(particle_count, 0);
    }

    /// Number of indexed particles.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// True when the index covers no particles.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Cell keys, one per particle in reordered array order.
    pub fn keys(&self) -> &[u32] {
        &self.keys
    }

    /// First reordered index of each key bucket; `len()` marks an empty one.
    pub fn offsets(&self) -> &[u32] {
        &self.offsets
    }

    /// Cell containing `point` at the current cell size.
    #[inline]
    pub fn cell_of(&self, point: Vec3) -> IVec3 {
        (point / self.cell_size).floor().as_ivec3()
    }

    /// Wrap-around integer hash of a cell coordinate.
    #[inline]
    fn hash(cell: IVec3) -> i32 {
        (cell.x.wrapping_mul(HASH_X))
            ^ (cell.y.wrapping_mul(HASH_Y))
            ^ (cell.z.wrapping_mul(HASH_Z))
    }

    /// Bucket key for a cell: hash reduced modulo the particle count.
    #[inline]
    pub fn key_for_cell(&self, cell: IVec3) -> u32 {
        Self::hash(cell) as u32 % self.keys.len() as u32
    }

    /// Compute per-particle keys and the key-sorted permutation.
    pub fn build(&mut self, predicted: &[Vec3], cell_size: f32) {
        debug_assert_eq!(predicted.len(), self.keys.len());
        self.cell_size = cell_size;
        if self.keys.is_empty() {
            return;
        }

        let n = self.keys.len() as u32;
        for (key, point) in self.keys.iter_mut().zip(predicted) {
            let cell = (*point / cell_size).floor().as_ivec3();
            *key = Self::hash(cell) as u32 % n;
        }

        for (index, slot) in self.sorted_indices.iter_mut().enumerate() {
            *slot = index as u32;
        }
        let keys = &self.keys;
        self.sorted_indices
            .sort_unstable_by_key(|&index| keys[index as usize]);
    }

    /// Apply the sorted permutation to the live particle fields and the keys,
    /// grouping equal keys into contiguous buckets.
    pub fn reorder(
        &mut self,
        positions: &mut Vec<Vec3>,
        predicted: &mut Vec<Vec3>,
        velocities: &mut Vec<Vec3>,
    ) {
        for field in [positions, predicted, velocities] {
            for (slot, &index) in self.scratch_vec3.iter_mut().zip(&self.sorted_indices) {
                *slot = field[index as usize];
            }
            std::mem::swap(field, &mut self.scratch_vec3);
        }

        for (slot, &index) in self.scratch_keys.iter_mut().zip(&self.sorted_indices) {
            *slot = self.keys[index as usize];
        }
        std::mem::swap(&mut self.keys, &mut self.scratch_keys);
    }

    /// Record the first reordered index of every key bucket.
    pub fn compute_offsets(&mut self) {
        let n = self.keys.len() as u32;
        self.offsets.fill(n);
        for (index, &key) in self.keys.iter().enumerate() {
            let slot = &mut self.offsets[key as usize];
            if *slot > index as u32 {
                *slot = index as u32;
            }
        }
    }

    /// Walk every particle bucketed under the 27 cells around `origin_cell`.
    ///
    /// Candidates include hash-collision false positives; callers filter by
    /// distance.
    pub fn neighborhood(&self, origin_cell: IVec3) -> Neighborhood<'_> {
        Neighborhood {
            index: self,
            origin_cell,
            offset_index: 0,
            cursor: self.keys.len() as u32,
            key: 0,
        }
    }
}

/// Iterator over candidate neighbor indices; see
/// [`SpatialHash::neighborhood`].
pub struct Neighborhood<'a> {
    index: &'a SpatialHash,
    origin_cell: IVec3,
    offset_index: usize,
    cursor: u32,
    key: u32,
}

impl Iterator for Neighborhood<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        loop {
            let keys = &self.index.keys;
            if (self.cursor as usize) < keys.len() && keys[self.cursor as usize] == self.key {
                let found = self.cursor as usize;
                self.cursor += 1;
                return Some(found);
            }

            let offset = NEIGHBOR_OFFSETS.get(self.offset_index)?;
            self.offset_index += 1;
            self.key = self.index.key_for_cell(self.origin_cell + *offset);
            self.cursor = self.index.offsets[self.key as usize];
        }
    }
}
