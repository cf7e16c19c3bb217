//! ripley-core: Core types for spatial point-pattern analysis.
//!
//! This crate provides the data model shared by every stage of the
//! clustering analysis: planar points and projections, observation windows,
//! point patterns, intensity surfaces, K-function curves and envelopes,
//! plus the configuration and error types.
//!

pub mod builder;
pub mod config;
pub mod curve;
pub mod error;
pub mod pattern;
pub mod point;
pub mod projection;
pub mod surface;
pub mod window;

pub use builder::PointSetBuilder;
pub use config::{
    AnalysisConfig, EdgeCorrection, EnvelopeConfig, KFunctionConfig, KdeConfig, Kernel,
    NullModel, SimulationConfig,
};
pub use curve::{Envelope, Exceedance, KFunctionCurve, Statistic, Verdict};
pub use error::{Error, Result};
pub use pattern::PointPattern;
pub use point::{GeoCoord, SpatialPoint};
pub use projection::Projection;
pub use surface::IntensitySurface;
pub use window::ObservationWindow;
