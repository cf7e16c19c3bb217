//! Spatial indexing for efficient neighbour lookup.
#![allow(clippy::cast_possible_truncation)]

use std::collections::HashMap;

/// Uniform grid over the plane for fixed-radius neighbour queries.
///
/// The plane is divided into square cells of side `cell_size`. With
/// `cell_size >= radius`, every neighbour within `radius` of a point lies in
/// the 3x3 block of cells around it.
#[derive(Debug, Default)]
pub struct SpatialGrid<T> {
    cell_size: f64,
    origin_x: f64,
    origin_y: f64,
    cells: HashMap<(i64, i64), Vec<T>>,
}

impl<T: Copy> SpatialGrid<T> {
    /// Create a new spatial grid anchored at `(origin_x, origin_y)`.
    ///
    /// A non-positive or non-finite `cell_size` collapses everything into a
    /// single cell.
    pub fn new(cell_size: f64, origin_x: f64, origin_y: f64) -> Self {
        let cell_size = if cell_size.is_finite() && cell_size > 0.0 {
            cell_size
        } else {
            f64::INFINITY
        };
        Self {
            cell_size,
            origin_x,
            origin_y,
            cells: HashMap::new(),
        }
    }

    /// Clear all data.
    pub fn clear(&mut self) {
        self.cells.clear();
    }

    fn cell_of(&self, x: f64, y: f64) -> (i64, i64) {
        if self.cell_size.is_infinite() {
            return (0, 0);
        }
        (
            ((x - self.origin_x) / self.cell_size).floor() as i64,
            ((y - self.origin_y) / self.cell_size).floor() as i64,
        )
    }

    /// Insert a value at the given coordinates.
    pub fn insert(&mut self, x: f64, y: f64, value: T) {
        let cell = self.cell_of(x, y);
        self.cells.entry(cell).or_default().push(value);
    }

    /// Number of occupied cells.
    pub fn occupied_cells(&self) -> usize {
        self.cells.len()
    }

    /// Visit every value in the 3x3 neighbourhood around a point.
    pub fn for_each_neighbor<F: FnMut(T)>(&self, x: f64, y: f64, mut visit: F) {
        let (cx, cy) = self.cell_of(x, y);
        for dx in -1..=1 {
            for dy in -1..=1 {
                if let Some(values) = self.cells.get(&(cx + dx, cy + dy)) {
                    for &value in values {
                        visit(value);
                    }
                }
            }
        }
    }

    /// Query the 3x3 neighbourhood around a point.
    pub fn query_neighborhood(&self, x: f64, y: f64) -> Vec<T> {
        let mut result = Vec::new();
        self.for_each_neighbor(x, y, |value| result.push(value));
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spatial_grid() {
        let mut grid: SpatialGrid<usize> = SpatialGrid::new(32.0, 0.0, 0.0);
        grid.insert(100.0, 100.0, 0);
        grid.insert(105.0, 105.0, 1);
        grid.insert(300.0, 300.0, 2);

        let neighbors = grid.query_neighborhood(100.0, 100.0);
        assert!(neighbors.contains(&0));
        assert!(neighbors.contains(&1));
        assert!(!neighbors.contains(&2));
    }

    #[test]
    fn test_negative_coordinates_use_floor() {
        let mut grid: SpatialGrid<usize> = SpatialGrid::new(10.0, 0.0, 0.0);
        grid.insert(-1.0, -1.0, 0);
        grid.insert(1.0, 1.0, 1);
        grid.insert(-25.0, 0.0, 2);
        assert_eq!(grid.occupied_cells(), 3);

        let neighbors = grid.query_neighborhood(-1.0, -1.0);
        assert!(neighbors.contains(&0));
        assert!(neighbors.contains(&1));
        assert!(!neighbors.contains(&2));
    }

    #[test]
    fn test_degenerate_cell_size_single_cell() {
        let mut grid: SpatialGrid<usize> = SpatialGrid::new(0.0, 0.0, 0.0);
        grid.insert(0.0, 0.0, 0);
        grid.insert(1e9, -1e9, 1);
        assert_eq!(grid.occupied_cells(), 1);
        assert_eq!(grid.query_neighborhood(5.0, 5.0).len(), 2);
    }

    #[test]
    fn test_clear() {
        let mut grid: SpatialGrid<usize> = SpatialGrid::new(1.0, 0.0, 0.0);
        grid.insert(0.5, 0.5, 0);
        grid.clear();
        assert!(grid.query_neighborhood(0.5, 0.5).is_empty());
    }
}
