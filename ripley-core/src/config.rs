//! Analysis configuration.
//!
//! Every stage takes its parameters from an explicit config value; nothing is
//! read from shared state. All structs have sensible defaults and consuming
//! `with_*` setters.

use crate::curve::Statistic;
use crate::error::{Error, Result};
use crate::projection::Projection;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Smoothing kernel used by the density estimator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Kernel {
    /// Isotropic Gaussian with standard deviation σ.
    #[default]
    Gaussian,
    /// Quartic (biweight) kernel with support radius σ.
    Quartic,
}

/// Kernel density estimation parameters.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct KdeConfig {
    /// Bandwidth σ in planar units.
    pub bandwidth: f64,
    /// Number of cells along the longer window side.
    pub resolution: usize,
    /// Smoothing kernel.
    pub kernel: Kernel,
    /// Gaussian truncation radius in multiples of σ.
    pub cutoff: f64,
    /// Rescale each point's kernel to unit mass inside the window.
    pub edge_correction: bool,
    /// Evaluate grid rows in parallel.
    pub parallel: bool,
}

impl Default for KdeConfig {
    fn default() -> Self {
        Self {
            bandwidth: 500.0,
            resolution: 128,
            kernel: Kernel::Gaussian,
            cutoff: 4.0,
            edge_correction: true,
            parallel: true,
        }
    }
}

impl KdeConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the bandwidth σ.
    #[must_use]
    pub fn with_bandwidth(mut self, bandwidth: f64) -> Self {
        self.bandwidth = bandwidth;
        self
    }

    /// Sets the grid resolution.
    #[must_use]
    pub fn with_resolution(mut self, resolution: usize) -> Self {
        self.resolution = resolution;
        self
    }

    /// Sets the kernel.
    #[must_use]
    pub fn with_kernel(mut self, kernel: Kernel) -> Self {
        self.kernel = kernel;
        self
    }

    /// Sets the Gaussian truncation radius (in σ).
    #[must_use]
    pub fn with_cutoff(mut self, cutoff: f64) -> Self {
        self.cutoff = cutoff;
        self
    }

    /// Enables or disables edge correction.
    #[must_use]
    pub fn with_edge_correction(mut self, enabled: bool) -> Self {
        self.edge_correction = enabled;
        self
    }

    /// Enables or disables parallel evaluation.
    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Validates the parameters.
    ///
    /// # Errors
    /// [`Error::InvalidBandwidth`] for σ ≤ 0 or non-finite,
    /// [`Error::InvalidConfig`] for a zero resolution or bad cutoff.
    pub fn validate(&self) -> Result<()> {
        if !self.bandwidth.is_finite() || self.bandwidth <= 0.0 {
            return Err(Error::InvalidBandwidth(self.bandwidth));
        }
        if self.resolution == 0 {
            return Err(Error::InvalidConfig(
                "kde resolution must be at least 1".to_string(),
            ));
        }
        if !self.cutoff.is_finite() || self.cutoff <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "kde cutoff must be > 0, got {}",
                self.cutoff
            )));
        }
        Ok(())
    }
}

/// Null model used to generate reference patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum NullModel {
    /// Homogeneous Poisson at the observed rate n / area.
    #[default]
    Homogeneous,
    /// Inhomogeneous Poisson following the estimated intensity surface.
    Inhomogeneous,
}

/// Monte Carlo simulation parameters.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SimulationConfig {
    /// Number of simulated patterns N.
    pub repetitions: usize,
    /// Master seed; `None` draws one from the thread RNG.
    pub seed: Option<u64>,
    /// Condition every pattern on exactly this many points.
    pub fixed_count: Option<usize>,
    /// Generate patterns in parallel.
    pub parallel: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            repetitions: 999,
            seed: None,
            fixed_count: None,
            parallel: true,
        }
    }
}

impl SimulationConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of simulations.
    #[must_use]
    pub fn with_repetitions(mut self, repetitions: usize) -> Self {
        self.repetitions = repetitions;
        self
    }

    /// Sets the master seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Conditions every simulated pattern on `count` points.
    #[must_use]
    pub fn with_fixed_count(mut self, count: usize) -> Self {
        self.fixed_count = Some(count);
        self
    }

    /// Enables or disables parallel generation.
    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Validates the parameters.
    ///
    /// # Errors
    /// [`Error::InvalidRepetitionCount`] if `repetitions` is zero.
    pub fn validate(&self) -> Result<()> {
        if self.repetitions < 1 {
            return Err(Error::InvalidRepetitionCount(self.repetitions));
        }
        Ok(())
    }
}

/// Edge correction applied to K-function pair weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum EdgeCorrection {
    /// Raw counts; K is biased downwards near the window boundary.
    None,
    /// Ripley's isotropic correction.
    #[default]
    Isotropic,
    /// Ohser-Stoyan translation correction.
    Translation,
}

/// K-function parameters.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct KFunctionConfig {
    /// Largest distance; `None` uses a quarter of the shorter window side.
    pub r_max: Option<f64>,
    /// Number of equal steps between 0 and `r_max`.
    pub steps: usize,
    /// Edge correction.
    pub edge_correction: EdgeCorrection,
    /// Reported statistic.
    pub statistic: Statistic,
    /// Split the observed pattern's pair loop across threads.
    pub parallel: bool,
}

impl Default for KFunctionConfig {
    fn default() -> Self {
        Self {
            r_max: None,
            steps: 100,
            edge_correction: EdgeCorrection::Isotropic,
            statistic: Statistic::K,
            parallel: true,
        }
    }
}

impl KFunctionConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum distance.
    #[must_use]
    pub fn with_r_max(mut self, r_max: f64) -> Self {
        self.r_max = Some(r_max);
        self
    }

    /// Sets the number of distance steps.
    #[must_use]
    pub fn with_steps(mut self, steps: usize) -> Self {
        self.steps = steps;
        self
    }

    /// Sets the edge correction.
    #[must_use]
    pub fn with_edge_correction(mut self, correction: EdgeCorrection) -> Self {
        self.edge_correction = correction;
        self
    }

    /// Sets the reported statistic.
    #[must_use]
    pub fn with_statistic(mut self, statistic: Statistic) -> Self {
        self.statistic = statistic;
        self
    }

    /// Enables or disables parallel pair counting.
    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Validates the parameters.
    ///
    /// # Errors
    /// [`Error::InvalidConfig`] for zero steps or a non-positive `r_max`.
    pub fn validate(&self) -> Result<()> {
        if self.steps == 0 {
            return Err(Error::InvalidConfig(
                "k-function steps must be at least 1".to_string(),
            ));
        }
        if let Some(r_max) = self.r_max {
            if !r_max.is_finite() || r_max <= 0.0 {
                return Err(Error::InvalidConfig(format!(
                    "r_max must be > 0, got {r_max}"
                )));
            }
        }
        Ok(())
    }
}

/// Envelope and verdict parameters.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EnvelopeConfig {
    /// Rank k of the envelope bounds (1 = min/max).
    pub rank: usize,
    /// Distances below this are ignored by the verdict.
    pub min_distance: f64,
    /// Minimum contiguous grid steps outside the envelope for a verdict.
    pub min_run: usize,
    /// Distance for the pointwise p-value; `None` uses the middle of the grid.
    pub reference_distance: Option<f64>,
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        Self {
            rank: 1,
            min_distance: 0.0,
            min_run: 5,
            reference_distance: None,
        }
    }
}

impl EnvelopeConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the envelope rank.
    #[must_use]
    pub fn with_rank(mut self, rank: usize) -> Self {
        self.rank = rank;
        self
    }

    /// Sets the minimum distance considered by the verdict.
    #[must_use]
    pub fn with_min_distance(mut self, distance: f64) -> Self {
        self.min_distance = distance;
        self
    }

    /// Sets the minimum run length.
    #[must_use]
    pub fn with_min_run(mut self, steps: usize) -> Self {
        self.min_run = steps;
        self
    }

    /// Sets the p-value reference distance.
    #[must_use]
    pub fn with_reference_distance(mut self, distance: f64) -> Self {
        self.reference_distance = Some(distance);
        self
    }

    /// Validates the parameters against the number of simulations.
    ///
    /// # Errors
    /// [`Error::InvalidConfig`] if the rank is zero or exceeds `simulations`,
    /// or if `min_run` is zero or `min_distance` is negative.
    pub fn validate(&self, simulations: usize) -> Result<()> {
        if self.rank == 0 || self.rank > simulations {
            return Err(Error::InvalidConfig(format!(
                "envelope rank must be in 1..={simulations}, got {}",
                self.rank
            )));
        }
        if self.min_run == 0 {
            return Err(Error::InvalidConfig(
                "envelope min_run must be at least 1".to_string(),
            ));
        }
        if !self.min_distance.is_finite() || self.min_distance < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "envelope min_distance must be >= 0, got {}",
                self.min_distance
            )));
        }
        Ok(())
    }
}

/// Parameters for a complete analysis run.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AnalysisConfig {
    /// Planar projection applied to geographic input.
    pub projection: Projection,
    /// Margin added around the bounding box of the points.
    pub padding: f64,
    /// Density estimation.
    pub kde: KdeConfig,
    /// Null model for the simulations.
    pub null_model: NullModel,
    /// Simulation.
    pub simulation: SimulationConfig,
    /// K-function.
    pub kfunction: KFunctionConfig,
    /// Envelope and verdict.
    pub envelope: EnvelopeConfig,
}

impl AnalysisConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the projection.
    #[must_use]
    pub fn with_projection(mut self, projection: Projection) -> Self {
        self.projection = projection;
        self
    }

    /// Sets the window padding.
    #[must_use]
    pub fn with_padding(mut self, padding: f64) -> Self {
        self.padding = padding;
        self
    }

    /// Sets the density estimation parameters.
    #[must_use]
    pub fn with_kde(mut self, kde: KdeConfig) -> Self {
        self.kde = kde;
        self
    }

    /// Sets the null model.
    #[must_use]
    pub fn with_null_model(mut self, model: NullModel) -> Self {
        self.null_model = model;
        self
    }

    /// Sets the simulation parameters.
    #[must_use]
    pub fn with_simulation(mut self, simulation: SimulationConfig) -> Self {
        self.simulation = simulation;
        self
    }

    /// Sets the K-function parameters.
    #[must_use]
    pub fn with_kfunction(mut self, kfunction: KFunctionConfig) -> Self {
        self.kfunction = kfunction;
        self
    }

    /// Sets the envelope parameters.
    #[must_use]
    pub fn with_envelope(mut self, envelope: EnvelopeConfig) -> Self {
        self.envelope = envelope;
        self
    }

    /// Validates every stage's parameters up front.
    ///
    /// # Errors
    /// The first validation error found, in pipeline order.
    pub fn validate(&self) -> Result<()> {
        if !self.padding.is_finite() || self.padding < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "padding must be a non-negative finite number, got {}",
                self.padding
            )));
        }
        self.kde.validate()?;
        self.simulation.validate()?;
        self.kfunction.validate()?;
        self.envelope.validate(self.simulation.repetitions)
    }
}
