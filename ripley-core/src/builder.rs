//! Building observed point patterns from raw coordinates.

use crate::error::{Error, Result};
use crate::pattern::PointPattern;
use crate::point::{GeoCoord, SpatialPoint};
use crate::projection::Projection;
use crate::window::ObservationWindow;

/// Projects raw coordinates and derives the observation window from their
/// bounding extent.
///
/// The input is expected to be cleaned already (no missing values, restricted
/// to the study period and region).
#[derive(Debug, Clone, Copy, Default)]
pub struct PointSetBuilder {
    projection: Projection,
    padding: f64,
}

impl PointSetBuilder {
    /// Creates a builder for the given projection with no padding.
    #[must_use]
    pub fn new(projection: Projection) -> Self {
        Self {
            projection,
            padding: 0.0,
        }
    }

    /// Sets the margin added around the bounding rectangle.
    #[must_use]
    pub fn with_padding(mut self, padding: f64) -> Self {
        self.padding = padding;
        self
    }

    /// The projection used by this builder.
    #[must_use]
    pub fn projection(&self) -> Projection {
        self.projection
    }

    /// Projects `coords` and builds the observed pattern.
    ///
    /// # Errors
    /// [`Error::EmptyInput`] for no coordinates, [`Error::Projection`] for the
    /// first coordinate that cannot be projected, [`Error::InvalidConfig`] for
    /// a bad padding.
    pub fn build(&self, coords: &[GeoCoord]) -> Result<PointPattern> {
        if coords.is_empty() {
            return Err(Error::EmptyInput);
        }
        let points = self.projection.project_all(coords)?;
        self.build_planar(&points)
    }

    /// Builds the observed pattern from already projected points.
    ///
    /// # Errors
    /// [`Error::EmptyInput`] for no points, [`Error::InvalidWindow`] for
    /// non-finite points, [`Error::InvalidConfig`] for a bad padding.
    pub fn build_planar(&self, points: &[SpatialPoint]) -> Result<PointPattern> {
        let window = ObservationWindow::from_points(points, self.padding)?;
        PointPattern::new(points, window)
    }
}
