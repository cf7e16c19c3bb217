//! ripley-algorithms: Statistical stages of the clustering analysis.
//!
//! This crate provides:
//! - **KDE** - Gaussian or quartic kernel intensity surfaces
//! - **CSR simulation** - seeded homogeneous and inhomogeneous Poisson patterns
//! - **K-function** - Ripley's K / Besag's L with edge correction
//! - **Envelope test** - rank envelopes, verdict and Monte Carlo p-values
//!
#![warn(missing_docs)]

mod envelope;
mod kde;
mod kfunction;
mod pipeline;
mod simulate;
pub mod spatial;

pub use envelope::{envelope_from_curves, ClusteringTest, ClusteringTester};
pub use kde::KernelDensityEstimator;
pub use kfunction::{
    isotropic_weight, k_values, translation_weight, KFunctionEstimator, MAX_EDGE_WEIGHT,
};
pub use pipeline::{analyze_coordinates, run_analysis, AnalysisReport, AnalysisStatistics};
pub use simulate::{derive_seeds, sample_pattern, CsrSimulator, Intensity, SimulationSet};
pub use spatial::SpatialGrid;

// Re-export core types used in this crate's signatures
pub use ripley_core::config::{
    AnalysisConfig, EdgeCorrection, EnvelopeConfig, KFunctionConfig, KdeConfig, Kernel,
    NullModel, SimulationConfig,
};
pub use ripley_core::error::{Error, Result};
