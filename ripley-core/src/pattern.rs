//! Point patterns stored in Structure of Arrays (`SoA`) layout.
//!
//! Coordinates live in two parallel vectors rather than a vector of points.
//! Pairwise distance loops only touch the columns they need, which keeps the
//! K-function and KDE inner loops cache-friendly.

use crate::error::{Error, Result};
use crate::point::SpatialPoint;
use crate::window::ObservationWindow;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// An immutable set of points together with the window they live in.
///
/// Invariant: every point lies inside `window`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PointPattern {
    x: Vec<f64>,
    y: Vec<f64>,
    window: ObservationWindow,
}

impl PointPattern {
    /// Creates a pattern from points, checking that each lies in `window`.
    ///
    /// # Errors
    /// Returns [`Error::PointOutsideWindow`] naming the first offending point.
    pub fn new(points: &[SpatialPoint], window: ObservationWindow) -> Result<Self> {
        let mut x = Vec::with_capacity(points.len());
        let mut y = Vec::with_capacity(points.len());
        for p in points {
            x.push(p.x);
            y.push(p.y);
        }
        Self::from_columns(x, y, window)
    }

    /// Creates a pattern from coordinate columns.
    ///
    /// # Errors
    /// Returns [`Error::InvalidConfig`] if the columns differ in length and
    /// [`Error::PointOutsideWindow`] if a point is outside `window`.
    pub fn from_columns(x: Vec<f64>, y: Vec<f64>, window: ObservationWindow) -> Result<Self> {
        if x.len() != y.len() {
            return Err(Error::InvalidConfig(format!(
                "coordinate columns differ in length: x = {}, y = {}",
                x.len(),
                y.len()
            )));
        }
        if let Some(index) = x
            .iter()
            .zip(&y)
            .position(|(&px, &py)| !window.contains(px, py))
        {
            return Err(Error::PointOutsideWindow {
                index,
                x: x[index],
                y: y[index],
            });
        }
        Ok(Self { x, y, window })
    }

    /// Creates an empty pattern (a valid simulation outcome).
    #[must_use]
    pub fn empty(window: ObservationWindow) -> Self {
        Self {
            x: Vec::new(),
            y: Vec::new(),
            window,
        }
    }

    /// Returns the number of points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.x.len()
    }

    /// Returns true if the pattern has no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Columnar x coordinates.
    #[must_use]
    pub fn x(&self) -> &[f64] {
        &self.x
    }

    /// Columnar y coordinates.
    #[must_use]
    pub fn y(&self) -> &[f64] {
        &self.y
    }

    /// The window the pattern lives in.
    #[must_use]
    pub fn window(&self) -> &ObservationWindow {
        &self.window
    }

    /// Returns the point at `index`, if any.
    #[must_use]
    pub fn point(&self, index: usize) -> Option<SpatialPoint> {
        Some(SpatialPoint::new(*self.x.get(index)?, *self.y.get(index)?))
    }

    /// Iterates over the points in order.
    pub fn iter(&self) -> impl Iterator<Item = SpatialPoint> + '_ {
        self.x
            .iter()
            .zip(&self.y)
            .map(|(&x, &y)| SpatialPoint::new(x, y))
    }

    /// Collects the points into a vector of [`SpatialPoint`].
    #[must_use]
    pub fn to_points(&self) -> Vec<SpatialPoint> {
        self.iter().collect()
    }

    /// Homogeneous intensity estimate `n / area` (zero for degenerate windows).
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn intensity(&self) -> f64 {
        let area = self.window.area();
        if area > 0.0 {
            self.len() as f64 / area
        } else {
            0.0
        }
    }
}
