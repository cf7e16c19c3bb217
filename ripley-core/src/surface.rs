//! Gridded intensity surfaces.
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]

use crate::error::{Error, Result};
use crate::window::ObservationWindow;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A regular grid of estimated point densities over a window.
///
/// Values are points per unit area, stored row-major with row 0 at `ymin`.
/// Cells tile the window exactly.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct IntensitySurface {
    window: ObservationWindow,
    cols: usize,
    rows: usize,
    values: Vec<f64>,
}

impl IntensitySurface {
    /// Creates a surface from row-major values.
    ///
    /// # Errors
    /// Returns [`Error::DegenerateWindow`] for a zero-area window and
    /// [`Error::InvalidConfig`] if the shape and value count disagree.
    pub fn new(
        window: ObservationWindow,
        cols: usize,
        rows: usize,
        values: Vec<f64>,
    ) -> Result<Self> {
        window.ensure_area()?;
        if cols == 0 || rows == 0 || values.len() != cols * rows {
            return Err(Error::InvalidConfig(format!(
                "surface shape {cols}x{rows} does not match {} values",
                values.len()
            )));
        }
        Ok(Self {
            window,
            cols,
            rows,
            values,
        })
    }

    /// Grid shape for `resolution` cells along the longer window side.
    ///
    /// The shorter side gets proportionally fewer cells (at least one).
    #[must_use]
    pub fn grid_shape(window: &ObservationWindow, resolution: usize) -> (usize, usize) {
        let resolution = resolution.max(1);
        let (w, h) = (window.width(), window.height());
        if w >= h {
            let rows = ((resolution as f64) * h / w).ceil().max(1.0) as usize;
            (resolution, rows)
        } else {
            let cols = ((resolution as f64) * w / h).ceil().max(1.0) as usize;
            (cols, resolution)
        }
    }

    /// The window covered by the grid.
    #[must_use]
    pub fn window(&self) -> &ObservationWindow {
        &self.window
    }

    /// Number of columns.
    #[must_use]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Number of rows.
    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Row-major values.
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Cell extent along x.
    #[must_use]
    pub fn cell_width(&self) -> f64 {
        self.window.width() / self.cols as f64
    }

    /// Cell extent along y.
    #[must_use]
    pub fn cell_height(&self) -> f64 {
        self.window.height() / self.rows as f64
    }

    /// Area of one cell.
    #[must_use]
    pub fn cell_area(&self) -> f64 {
        self.cell_width() * self.cell_height()
    }

    /// Centre of cell `(col, row)`.
    #[must_use]
    pub fn cell_center(&self, col: usize, row: usize) -> (f64, f64) {
        (
            self.window.xmin() + (col as f64 + 0.5) * self.cell_width(),
            self.window.ymin() + (row as f64 + 0.5) * self.cell_height(),
        )
    }

    /// Value of cell `(col, row)`, if in range.
    #[must_use]
    pub fn value(&self, col: usize, row: usize) -> Option<f64> {
        if col >= self.cols || row >= self.rows {
            return None;
        }
        self.values.get(row * self.cols + col).copied()
    }

    /// Value of the cell containing `(x, y)`; `None` outside the window.
    ///
    /// Points on the upper/right boundary belong to the last cell.
    #[must_use]
    pub fn value_at(&self, x: f64, y: f64) -> Option<f64> {
        if !self.window.contains(x, y) {
            return None;
        }
        let col = (((x - self.window.xmin()) / self.cell_width()) as usize).min(self.cols - 1);
        let row = (((y - self.window.ymin()) / self.cell_height()) as usize).min(self.rows - 1);
        self.value(col, row)
    }

    /// Largest cell value.
    #[must_use]
    pub fn max(&self) -> f64 {
        self.values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    /// Smallest cell value.
    #[must_use]
    pub fn min(&self) -> f64 {
        self.values.iter().copied().fold(f64::INFINITY, f64::min)
    }

    /// Mean cell value, i.e. the homogeneous rate with the same mass.
    #[must_use]
    pub fn mean(&self) -> f64 {
        self.values.iter().sum::<f64>() / self.values.len() as f64
    }

    /// Total estimated mass: Σ value × cell area.
    #[must_use]
    pub fn integral(&self) -> f64 {
        self.values.iter().sum::<f64>() * self.cell_area()
    }

    /// Iterates `(x, y, value)` triples at cell centres, row by row.
    pub fn cells(&self) -> impl Iterator<Item = (f64, f64, f64)> + '_ {
        (0..self.rows).flat_map(move |row| {
            (0..self.cols).map(move |col| {
                let (x, y) = self.cell_center(col, row);
                (x, y, self.values[row * self.cols + col])
            })
        })
    }

    /// Checks that every value is finite and non-negative and that the
    /// surface carries some mass.
    ///
    /// # Errors
    /// Returns [`Error::InvalidIntensity`] describing the first violation.
    pub fn validate_intensity(&self) -> Result<()> {
        if let Some(index) = self
            .values
            .iter()
            .position(|v| !v.is_finite() || *v < 0.0)
        {
            return Err(Error::InvalidIntensity(format!(
                "surface cell {index} has value {} (must be finite and >= 0)",
                self.values[index]
            )));
        }
        if self.max() <= 0.0 {
            return Err(Error::InvalidIntensity(
                "surface is zero everywhere".to_string(),
            ));
        }
        Ok(())
    }
}
