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

//! Provides structs for representing extents (sizes) and origins (offsets) in 3D.
//!
//! These types use integer (`u32`) components, making them suitable for texel
//! coordinates, voxel lattices, and compute dispatch sizes.

/// A three-dimensional extent, representing width, height, and depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Extent3D {
    /// The width component of the extent.
    pub width: u32,
    /// The height component of the extent.
    pub height: u32,
    /// The depth or number of array layers.
    pub depth_or_array_layers: u32,
}

impl Extent3D {
    /// Creates an extent with the same size along all three axes.
    pub const fn cube(side: u32) -> Self {
        Self {
            width: side,
            height: side,
            depth_or_array_layers: side,
        }
    }

    /// Returns the number of cells covered by the extent.
    pub const fn volume(&self) -> u64 {
        self.width as u64 * self.height as u64 * self.depth_or_array_layers as u64
    }

    /// Returns `true` if `origin` lies inside the extent.
    pub const fn contains(&self, origin: Origin3D) -> bool {
        origin.x < self.width && origin.y < self.height && origin.z < self.depth_or_array_layers
    }

    /// Returns the extent as an `[x, y, z]` array.
    pub const fn to_array(&self) -> [u32; 3] {
        [self.width, self.height, self.depth_or_array_layers]
    }
}

/// A three-dimensional origin, representing an (x, y, z) offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Origin3D {
    /// The x-coordinate of the origin.
    pub x: u32,
    /// The y-coordinate of the origin.
    pub y: u32,
    /// The z-coordinate of the origin.
    pub z: u32,
}

impl Origin3D {
    /// The origin at (0, 0, 0).
    pub const ZERO: Self = Self { x: 0, y: 0, z: 0 };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cube_volume() {
        let extent = Extent3D::cube(9);
        assert_eq!(extent.volume(), 729);
        assert_eq!(extent.to_array(), [9, 9, 9]);
    }

    #[test]
    fn contains_is_exclusive_on_the_upper_bound() {
        let extent = Extent3D {
            width: 4,
            height: 2,
            depth_or_array_layers: 3,
        };
        assert!(extent.contains(Origin3D { x: 3, y: 1, z: 2 }));
        assert!(!extent.contains(Origin3D { x: 4, y: 0, z: 0 }));
        assert!(!extent.contains(Origin3D { x: 0, y: 2, z: 0 }));
    }
}
