// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The 3D grid of chunks a scene is made of.

use std::fmt;

/// Integer coordinates of a chunk inside the chunk grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ChunkCoord {
    /// Position along X.
    pub x: u32,
    /// Position along Y.
    pub y: u32,
    /// Position along Z.
    pub z: u32,
}

impl ChunkCoord {
    /// Creates a chunk coordinate.
    pub const fn new(x: u32, y: u32, z: u32) -> Self {
        Self { x, y, z }
    }

    /// The coordinate as an array.
    pub const fn to_array(self) -> [u32; 3] {
        [self.x, self.y, self.z]
    }
}

impl fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// The extent of the chunk grid, `X × Y × Z` chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkGrid {
    dims: [u32; 3],
}

impl ChunkGrid {
    /// Creates a grid of `dims[0] × dims[1] × dims[2]` chunks.
    pub const fn new(dims: [u32; 3]) -> Self {
        Self { dims }
    }

    /// The number of chunks along each axis.
    pub const fn dims(&self) -> [u32; 3] {
        self.dims
    }

    /// The total number of chunks.
    pub fn chunk_count(&self) -> usize {
        self.dims.iter().map(|&d| d as usize).product()
    }

    /// Returns `true` if `coord` lies inside the grid.
    pub fn contains(&self, coord: ChunkCoord) -> bool {
        coord.x < self.dims[0] && coord.y < self.dims[1] && coord.z < self.dims[2]
    }

    /// The row-major index of `coord` (`x + y·X + z·X·Y`), matching the
    /// layout of the chunks lookup buffer.
    pub fn linear_index(&self, coord: ChunkCoord) -> Option<usize> {
        if !self.contains(coord) {
            return None;
        }
        let [dx, dy, _] = self.dims.map(|d| d as usize);
        Some(coord.x as usize + coord.y as usize * dx + coord.z as usize * dx * dy)
    }

    /// Iterates every chunk, x fastest, then y, then z.
    pub fn iter(&self) -> impl Iterator<Item = ChunkCoord> {
        let [dx, dy, dz] = self.dims;
        (0..dz).flat_map(move |z| {
            (0..dy).flat_map(move |y| (0..dx).map(move |x| ChunkCoord::new(x, y, z)))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iteration_is_row_major_x_inner() {
        let grid = ChunkGrid::new([2, 2, 2]);
        let order: Vec<_> = grid.iter().map(ChunkCoord::to_array).collect();
        assert_eq!(
            order,
            vec![
                [0, 0, 0],
                [1, 0, 0],
                [0, 1, 0],
                [1, 1, 0],
                [0, 0, 1],
                [1, 0, 1],
                [0, 1, 1],
                [1, 1, 1],
            ]
        );
    }

    #[test]
    fn linear_index_matches_iteration_order() {
        let grid = ChunkGrid::new([4, 2, 3]);
        assert_eq!(grid.chunk_count(), 24);
        for (i, coord) in grid.iter().enumerate() {
            assert_eq!(grid.linear_index(coord), Some(i));
        }
        assert_eq!(grid.linear_index(ChunkCoord::new(4, 0, 0)), None);
    }
}
