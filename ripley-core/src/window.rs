//! Rectangular observation window.

use crate::error::{Error, Result};
use crate::point::SpatialPoint;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle over which intensity and randomness are evaluated.
///
/// Bounds are inclusive on both ends. A window is `Copy` and compared by
/// value, so every pattern carries its own copy and consistency checks are
/// plain `==`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ObservationWindow {
    xmin: f64,
    xmax: f64,
    ymin: f64,
    ymax: f64,
}

impl ObservationWindow {
    /// Creates a window from its bounds.
    ///
    /// # Errors
    /// Returns [`Error::InvalidWindow`] if a bound is non-finite or a
    /// minimum exceeds its maximum. Zero-width windows are allowed here;
    /// stages that need an area reject them with [`Error::DegenerateWindow`].
    pub fn new(xmin: f64, xmax: f64, ymin: f64, ymax: f64) -> Result<Self> {
        let finite = xmin.is_finite() && xmax.is_finite() && ymin.is_finite() && ymax.is_finite();
        if !finite || xmin > xmax || ymin > ymax {
            return Err(Error::InvalidWindow {
                xmin,
                xmax,
                ymin,
                ymax,
            });
        }
        Ok(Self {
            xmin,
            xmax,
            ymin,
            ymax,
        })
    }

    /// Derives the bounding rectangle of `points`, padded by `padding` on
    /// every side.
    ///
    /// # Errors
    /// Returns [`Error::EmptyInput`] for an empty slice,
    /// [`Error::InvalidConfig`] for a negative or non-finite padding and
    /// [`Error::InvalidWindow`] if a point is non-finite.
    pub fn from_points(points: &[SpatialPoint], padding: f64) -> Result<Self> {
        if points.is_empty() {
            return Err(Error::EmptyInput);
        }
        if !padding.is_finite() || padding < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "padding must be a non-negative finite number, got {padding}"
            )));
        }

        let mut xmin = f64::INFINITY;
        let mut xmax = f64::NEG_INFINITY;
        let mut ymin = f64::INFINITY;
        let mut ymax = f64::NEG_INFINITY;
        for p in points {
            xmin = xmin.min(p.x);
            xmax = xmax.max(p.x);
            ymin = ymin.min(p.y);
            ymax = ymax.max(p.y);
        }

        Self::new(xmin, xmax, ymin, ymax)?.padded(padding)
    }

    /// Returns a copy grown by `margin` on every side.
    ///
    /// # Errors
    /// Returns [`Error::InvalidConfig`] for a negative or non-finite margin.
    pub fn padded(&self, margin: f64) -> Result<Self> {
        if !margin.is_finite() || margin < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "padding must be a non-negative finite number, got {margin}"
            )));
        }
        Self::new(
            self.xmin - margin,
            self.xmax + margin,
            self.ymin - margin,
            self.ymax + margin,
        )
    }

    /// Minimum x.
    #[inline]
    #[must_use]
    pub fn xmin(&self) -> f64 {
        self.xmin
    }

    /// Maximum x.
    #[inline]
    #[must_use]
    pub fn xmax(&self) -> f64 {
        self.xmax
    }

    /// Minimum y.
    #[inline]
    #[must_use]
    pub fn ymin(&self) -> f64 {
        self.ymin
    }

    /// Maximum y.
    #[inline]
    #[must_use]
    pub fn ymax(&self) -> f64 {
        self.ymax
    }

    /// Extent along x.
    #[inline]
    #[must_use]
    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    /// Extent along y.
    #[inline]
    #[must_use]
    pub fn height(&self) -> f64 {
        self.ymax - self.ymin
    }

    /// Window area.
    #[inline]
    #[must_use]
    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// Length of the shorter side.
    #[inline]
    #[must_use]
    pub fn shorter_side(&self) -> f64 {
        self.width().min(self.height())
    }

    /// Returns true if the window has zero area.
    #[inline]
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.area() <= 0.0
    }

    /// Fails with [`Error::DegenerateWindow`] if the window has zero area.
    ///
    /// # Errors
    /// See above.
    pub fn ensure_area(&self) -> Result<()> {
        if self.is_degenerate() {
            return Err(Error::DegenerateWindow {
                width: self.width(),
                height: self.height(),
            });
        }
        Ok(())
    }

    /// Returns true if `(x, y)` lies inside the window (bounds inclusive).
    #[inline]
    #[must_use]
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.xmin && x <= self.xmax && y >= self.ymin && y <= self.ymax
    }

    /// Returns true if `point` lies inside the window.
    #[inline]
    #[must_use]
    pub fn contains_point(&self, point: &SpatialPoint) -> bool {
        self.contains(point.x, point.y)
    }

    /// Distances from `(x, y)` to the left, right, bottom and top edges.
    #[inline]
    #[must_use]
    pub fn edge_distances(&self, x: f64, y: f64) -> [f64; 4] {
        [x - self.xmin, self.xmax - x, y - self.ymin, self.ymax - y]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_window_geometry() {
        let window = ObservationWindow::new(0.0, 100.0, 10.0, 60.0).unwrap();
        assert_relative_eq!(window.width(), 100.0);
        assert_relative_eq!(window.height(), 50.0);
        assert_relative_eq!(window.area(), 5000.0);
        assert_relative_eq!(window.shorter_side(), 50.0);
        assert!(window.contains(0.0, 10.0));
        assert!(window.contains(100.0, 60.0));
        assert!(!window.contains(100.1, 30.0));
    }

    #[test]
    fn test_window_rejects_reversed_bounds() {
        let result = ObservationWindow::new(10.0, 0.0, 0.0, 1.0);
        assert!(matches!(result, Err(Error::InvalidWindow { .. })));
        let result = ObservationWindow::new(0.0, f64::NAN, 0.0, 1.0);
        assert!(matches!(result, Err(Error::InvalidWindow { .. })));
    }

    #[test]
    fn test_window_from_points_contains_all() {
        let points = vec![
            SpatialPoint::new(3.0, -2.0),
            SpatialPoint::new(-1.5, 7.0),
            SpatialPoint::new(10.0, 4.0),
        ];
        let window = ObservationWindow::from_points(&points, 0.0).unwrap();
        assert_relative_eq!(window.xmin(), -1.5);
        assert_relative_eq!(window.xmax(), 10.0);
        assert_relative_eq!(window.ymin(), -2.0);
        assert_relative_eq!(window.ymax(), 7.0);
        assert!(points.iter().all(|p| window.contains_point(p)));

        let padded = ObservationWindow::from_points(&points, 5.0).unwrap();
        assert_relative_eq!(padded.width(), 21.5);
        assert_relative_eq!(padded.height(), 19.0);
    }

    #[test]
    fn test_window_from_points_errors() {
        assert_eq!(ObservationWindow::from_points(&[], 0.0), Err(Error::EmptyInput));
        let points = vec![SpatialPoint::new(0.0, 0.0)];
        assert!(matches!(
            ObservationWindow::from_points(&points, -1.0),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_single_point_window_is_degenerate() {
        let points = vec![SpatialPoint::new(5.0, 5.0)];
        let window = ObservationWindow::from_points(&points, 0.0).unwrap();
        assert!(window.is_degenerate());
        assert!(matches!(
            window.ensure_area(),
            Err(Error::DegenerateWindow { .. })
        ));
    }

    #[test]
    fn test_edge_distances() {
        let window = ObservationWindow::new(0.0, 10.0, 0.0, 20.0).unwrap();
        let d = window.edge_distances(2.0, 5.0);
        assert_relative_eq!(d[0], 2.0);
        assert_relative_eq!(d[1], 8.0);
        assert_relative_eq!(d[2], 5.0);
        assert_relative_eq!(d[3], 15.0);
    }
}
