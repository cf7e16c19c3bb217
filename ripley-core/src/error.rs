//! Error types for ripley-core.

use thiserror::Error;

/// Result type alias for ripley operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for point-pattern analysis.
///
/// Every variant is an input-validation failure: nothing here is transient,
/// so callers abort the current analysis run instead of retrying.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// No input points were supplied, so no window can be derived.
    #[error("empty input: at least one point is required to derive an observation window")]
    EmptyInput,

    /// A geographic coordinate could not be projected.
    #[error("projection error at (lon={lon}, lat={lat}): {reason}")]
    Projection {
        /// Longitude of the offending coordinate.
        lon: f64,
        /// Latitude of the offending coordinate.
        lat: f64,
        /// Why the projection failed.
        reason: String,
    },

    /// Kernel bandwidth must be strictly positive and finite.
    #[error("invalid bandwidth: sigma = {0} (must be > 0)")]
    InvalidBandwidth(f64),

    /// Observation window has zero area.
    #[error("degenerate window: width = {width}, height = {height} (zero area)")]
    DegenerateWindow {
        /// Window width.
        width: f64,
        /// Window height.
        height: f64,
    },

    /// Simulation repetition count must be at least one.
    #[error("invalid repetition count: {0} (must be >= 1)")]
    InvalidRepetitionCount(usize),

    /// Intensity is non-positive, non-finite or contains negative cells.
    #[error("invalid intensity: {0}")]
    InvalidIntensity(String),

    /// Fewer than two points, so no pairwise distances exist.
    #[error("insufficient points: n = {n} (at least 2 required for pairwise statistics)")]
    InsufficientPoints {
        /// Number of points in the pattern.
        n: usize,
    },

    /// A simulated pattern lives in a different window than the observed one.
    #[error("inconsistent window: simulated pattern {index} does not share the observed window")]
    InconsistentWindow {
        /// Index of the offending simulated pattern.
        index: usize,
    },

    /// Window bounds are reversed or non-finite.
    #[error("invalid window bounds: x [{xmin}, {xmax}], y [{ymin}, {ymax}]")]
    InvalidWindow {
        /// Minimum x.
        xmin: f64,
        /// Maximum x.
        xmax: f64,
        /// Minimum y.
        ymin: f64,
        /// Maximum y.
        ymax: f64,
    },

    /// A point lies outside the window of its pattern.
    #[error("point {index} at ({x}, {y}) lies outside the observation window")]
    PointOutsideWindow {
        /// Index of the point.
        index: usize,
        /// X coordinate.
        x: f64,
        /// Y coordinate.
        y: f64,
    },

    /// Configuration error.
    #[error("configuration error: {0}")]
    InvalidConfig(String),
}
