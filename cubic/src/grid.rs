//! Grid - Maps lattice cells to world positions and colors
//!
//! Cell `(x, y, z)` in an `N`x`N`x`N` lattice sits at
//! `index * spacing - extent / 2` on each axis, with `spacing = extent / (N - 1)`,
//! so the outermost cells touch the faces of the containing cube. Its color
//! channels grow linearly with the index: `floor(index / (N - 1) * 255)`.
//!
//! Everything here is a pure function of the cell; there are no error paths.

use glam::Vec3;
use std::fmt;

/// One integer coordinate of the lattice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridCell {
    x: u32,
    y: u32,
    z: u32,
}

impl GridCell {
    /// Create a cell, or `None` if any coordinate is outside `[0, size)`.
    pub fn new(x: u32, y: u32, z: u32, size: u32) -> Option<Self> {
        if x < size && y < size && z < size {
            Some(Self { x, y, z })
        } else {
            None
        }
    }

    pub fn x(&self) -> u32 {
        self.x
    }

    pub fn y(&self) -> u32 {
        self.y
    }

    pub fn z(&self) -> u32 {
        self.z
    }
}

impl fmt::Display for GridCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// 8-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Per-channel `255 - c`.
    pub fn inverse(self) -> Self {
        Self::new(255 - self.r, 255 - self.g, 255 - self.b)
    }

    /// Channels scaled to `0.0..=1.0`.
    pub fn to_linear(self) -> [f32; 3] {
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
        ]
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RGB({}, {}, {})", self.r, self.g, self.b)
    }
}

/// Everything needed to instantiate the cube of one cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubeDescriptor {
    pub cell: GridCell,
    pub position: Vec3,
    pub color: Rgb,
    pub edge_color: Rgb,
}

/// Lattice dimensions: `size` cells per axis spread across `extent` world units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLayout {
    size: u32,
    extent: f32,
}

impl GridLayout {
    /// `size` must be at least 2 (see `Config::validate`).
    pub fn new(size: u32, extent: f32) -> Self {
        debug_assert!(size >= 2, "grid size must be at least 2");
        Self { size, extent }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn extent(&self) -> f32 {
        self.extent
    }

    /// Total number of cells.
    pub fn len(&self) -> usize {
        (self.size as usize).pow(3)
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Distance between neighbouring cell centers.
    pub fn spacing(&self) -> f32 {
        self.extent / (self.size - 1) as f32
    }

    /// Edge length of a single cube (1/64 of the extent).
    pub fn cube_size(&self) -> f32 {
        self.extent / 64.0
    }

    pub fn cell(&self, x: u32, y: u32, z: u32) -> Option<GridCell> {
        GridCell::new(x, y, z, self.size)
    }

    /// Linear index, x-major: `x * N^2 + y * N + z`.
    pub fn index_of(&self, cell: GridCell) -> usize {
        let n = self.size as usize;
        cell.x as usize * n * n + cell.y as usize * n + cell.z as usize
    }

    pub fn cell_at(&self, index: usize) -> Option<GridCell> {
        if index >= self.len() {
            return None;
        }
        let n = self.size as usize;
        Some(GridCell {
            x: (index / (n * n)) as u32,
            y: (index / n % n) as u32,
            z: (index % n) as u32,
        })
    }

    /// All cells in index order.
    pub fn cells(&self) -> impl Iterator<Item = GridCell> + '_ {
        (0..self.len()).filter_map(move |index| self.cell_at(index))
    }

    pub fn position(&self, cell: GridCell) -> Vec3 {
        let spacing = self.spacing();
        let half = self.extent / 2.0;
        Vec3::new(
            cell.x as f32 * spacing - half,
            cell.y as f32 * spacing - half,
            cell.z as f32 * spacing - half,
        )
    }

    pub fn color(&self, cell: GridCell) -> Rgb {
        Rgb::new(
            self.channel(cell.x),
            self.channel(cell.y),
            self.channel(cell.z),
        )
    }

    // index * 255 / (N - 1) in integers is exactly the floor of the real quotient
    fn channel(&self, index: u32) -> u8 {
        (index as u64 * 255 / (self.size as u64 - 1)) as u8
    }

    pub fn descriptor(&self, cell: GridCell) -> CubeDescriptor {
        let color = self.color(cell);
        CubeDescriptor {
            cell,
            position: self.position(cell),
            color,
            edge_color: color.inverse(),
        }
    }

    pub fn descriptors(&self) -> impl Iterator<Item = CubeDescriptor> + '_ {
        self.cells().map(move |cell| self.descriptor(cell))
    }
}

impl Default for GridLayout {
    fn default() -> Self {
        Self::new(crate::config::GRID_SIZE, crate::config::EXTENT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_vec_close(a: Vec3, b: Vec3) {
        assert!((a - b).abs().max_element() < 1e-3, "{a:?} != {b:?}");
    }

    #[test]
    fn test_corner_cells() {
        let grid = GridLayout::default();

        let origin = grid.descriptor(grid.cell(0, 0, 0).unwrap());
        assert_vec_close(origin.position, Vec3::splat(-64.0));
        assert_eq!(origin.color, Rgb::new(0, 0, 0));
        assert_eq!(origin.edge_color, Rgb::new(255, 255, 255));

        let far = grid.descriptor(grid.cell(15, 15, 15).unwrap());
        assert_vec_close(far.position, Vec3::splat(64.0));
        assert_eq!(far.color, Rgb::new(255, 255, 255));
        assert_eq!(far.edge_color, Rgb::new(0, 0, 0));
    }

    #[test]
    fn test_every_cell_matches_formula() {
        let grid = GridLayout::default();
        let spacing = 128.0f32 / 15.0;
        for cell in grid.cells() {
            let d = grid.descriptor(cell);
            let expected = Vec3::new(
                cell.x() as f32 * spacing - 64.0,
                cell.y() as f32 * spacing - 64.0,
                cell.z() as f32 * spacing - 64.0,
            );
            assert_vec_close(d.position, expected);

            let channel = |i: u32| ((i as f64 / 15.0) * 255.0).floor() as u8;
            assert_eq!(d.color, Rgb::new(channel(cell.x()), channel(cell.y()), channel(cell.z())));
            assert_eq!(d.edge_color.r, 255 - d.color.r);
            assert_eq!(d.edge_color.g, 255 - d.color.g);
            assert_eq!(d.edge_color.b, 255 - d.color.b);
        }
    }

    #[test]
    fn test_floor_rounding_on_uneven_grid() {
        // 255 / 6 = 42.5, so index 1 must floor to 42
        let grid = GridLayout::new(7, 10.0);
        assert_eq!(grid.color(grid.cell(1, 2, 6).unwrap()), Rgb::new(42, 85, 255));
    }

    #[test]
    fn test_index_roundtrip_and_order() {
        let grid = GridLayout::default();
        assert_eq!(grid.len(), 4096);
        let cells: Vec<_> = grid.cells().collect();
        assert_eq!(cells.len(), 4096);
        assert_eq!(cells[1], grid.cell(0, 0, 1).unwrap());
        assert_eq!(cells[16], grid.cell(0, 1, 0).unwrap());
        assert_eq!(cells[256], grid.cell(1, 0, 0).unwrap());
        for (index, cell) in cells.iter().enumerate() {
            assert_eq!(grid.index_of(*cell), index);
        }
        assert_eq!(grid.cell_at(4096), None);
    }

    #[test]
    fn test_out_of_range_cell() {
        let grid = GridLayout::default();
        assert!(grid.cell(16, 0, 0).is_none());
        assert!(grid.cell(0, 0, 15).is_some());
    }

    #[test]
    fn test_spacing_and_cube_size() {
        let grid = GridLayout::default();
        assert!((grid.spacing() - 128.0 / 15.0).abs() < 1e-6);
        assert_eq!(grid.cube_size(), 2.0);
    }
}
