//! End-to-end analysis: density, null model simulation and envelope test.
#![allow(clippy::missing_errors_doc)]

use crate::envelope::{ClusteringTest, ClusteringTester};
use crate::kde::KernelDensityEstimator;
use crate::simulate::{CsrSimulator, Intensity, SimulationSet};
use ripley_core::builder::PointSetBuilder;
use ripley_core::config::{AnalysisConfig, NullModel};
use ripley_core::error::{Error, Result};
use ripley_core::pattern::PointPattern;
use ripley_core::point::GeoCoord;
use ripley_core::surface::IntensitySurface;
use std::time::Instant;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Counts and timings of an analysis run.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AnalysisStatistics {
    /// Points in the observed pattern.
    pub observed_points: usize,
    /// Observed intensity n / area.
    pub observed_intensity: f64,
    /// Number of simulated patterns.
    pub simulations: usize,
    /// Master seed of the simulations.
    pub seed: u64,
    /// Mean point count of the simulated patterns.
    pub mean_simulated_points: f64,
    /// Density estimation wall-clock time in seconds.
    pub kde_seconds: f64,
    /// Simulation wall-clock time in seconds.
    pub simulation_seconds: f64,
    /// K-function and envelope wall-clock time in seconds.
    pub test_seconds: f64,
}

impl AnalysisStatistics {
    /// Total time across stages.
    #[must_use]
    pub fn total_seconds(&self) -> f64 {
        self.kde_seconds + self.simulation_seconds + self.test_seconds
    }
}

/// Everything produced by one analysis run.
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    /// Observed pattern the analysis ran on.
    pub pattern: PointPattern,
    /// Estimated intensity surface.
    pub surface: IntensitySurface,
    /// Simulated null-model patterns.
    pub simulations: SimulationSet,
    /// Envelope test outcome.
    pub test: ClusteringTest,
    /// Counts and timings.
    pub statistics: AnalysisStatistics,
}

/// Runs all stages on an observed pattern.
pub fn run_analysis(pattern: &PointPattern, config: &AnalysisConfig) -> Result<AnalysisReport> {
    config.validate()?;
    pattern.window().ensure_area()?;
    if pattern.len() < 2 {
        return Err(Error::InsufficientPoints { n: pattern.len() });
    }

    let start = Instant::now();
    let surface = KernelDensityEstimator::new(config.kde.clone()).estimate(pattern)?;
    let kde_seconds = start.elapsed().as_secs_f64();

    let intensity = match config.null_model {
        NullModel::Homogeneous => Intensity::of_pattern(pattern),
        NullModel::Inhomogeneous => Intensity::Surface(&surface),
    };
    let start = Instant::now();
    let simulations =
        CsrSimulator::new(config.simulation.clone()).simulate(pattern.window(), intensity)?;
    let simulation_seconds = start.elapsed().as_secs_f64();

    let start = Instant::now();
    let test = ClusteringTester::new(config.kfunction.clone(), config.envelope.clone())
        .test(pattern, simulations.patterns())?;
    let test_seconds = start.elapsed().as_secs_f64();

    let statistics = AnalysisStatistics {
        observed_points: pattern.len(),
        observed_intensity: pattern.intensity(),
        simulations: simulations.len(),
        seed: simulations.seed(),
        mean_simulated_points: simulations.mean_count(),
        kde_seconds,
        simulation_seconds,
        test_seconds,
    };

    Ok(AnalysisReport {
        pattern: pattern.clone(),
        surface,
        simulations,
        test,
        statistics,
    })
}

/// Projects geographic coordinates and runs the analysis.
pub fn analyze_coordinates(coords: &[GeoCoord], config: &AnalysisConfig) -> Result<AnalysisReport> {
    config.validate()?;
    let pattern = PointSetBuilder::new(config.projection)
        .with_padding(config.padding)
        .build(coords)?;
    run_analysis(&pattern, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ripley_core::config::{KFunctionConfig, KdeConfig, SimulationConfig};
    use ripley_core::projection::Projection;
    use ripley_core::window::ObservationWindow;

    fn small_config() -> AnalysisConfig {
        AnalysisConfig::new()
            .with_kde(KdeConfig::new().with_bandwidth(50.0).with_resolution(16))
            .with_simulation(SimulationConfig::new().with_repetitions(19).with_seed(4))
            .with_kfunction(KFunctionConfig::new().with_steps(20))
    }

    fn grid_pattern() -> PointPattern {
        let window = ObservationWindow::new(0.0, 1000.0, 0.0, 1000.0).unwrap();
        let mut xs = Vec::new();
        let mut ys = Vec::new();
        for i in 0..10 {
            for j in 0..10 {
                xs.push(50.0 + 100.0 * f64::from(i));
                ys.push(50.0 + 100.0 * f64::from(j));
            }
        }
        PointPattern::from_columns(xs, ys, window).unwrap()
    }

    #[test]
    fn test_run_analysis_statistics() {
        let pattern = grid_pattern();
        let report = run_analysis(&pattern, &small_config()).unwrap();
        let stats = &report.statistics;
        assert_eq!(stats.observed_points, 100);
        assert_eq!(stats.simulations, 19);
        assert_eq!(stats.seed, 4);
        assert!(stats.mean_simulated_points > 50.0 && stats.mean_simulated_points < 150.0);
        assert!(stats.total_seconds() >= 0.0);
        assert_eq!(report.surface.window(), pattern.window());
        assert_eq!(report.test.envelope.simulations, 19);
        assert_eq!(report.pattern, pattern);
    }

    #[test]
    fn test_inhomogeneous_null_model() {
        let config = small_config().with_null_model(NullModel::Inhomogeneous);
        let report = run_analysis(&grid_pattern(), &config).unwrap();
        assert_eq!(report.simulations.len(), 19);
        assert_relative_eq!(report.surface.integral(), 100.0, max_relative = 1e-9);
        let mean = report.statistics.mean_simulated_points;
        assert!((mean - 100.0).abs() < 10.0, "mean simulated count {mean}");
    }

    #[test]
    fn test_rejects_single_point() {
        let window = ObservationWindow::new(0.0, 10.0, 0.0, 10.0).unwrap();
        let pattern = PointPattern::from_columns(vec![1.0], vec![1.0], window).unwrap();
        assert_eq!(
            run_analysis(&pattern, &small_config()).unwrap_err(),
            Error::InsufficientPoints { n: 1 }
        );
    }

    #[test]
    fn test_rejects_bad_config_before_work() {
        let config = small_config().with_kde(KdeConfig::new().with_bandwidth(0.0));
        assert_eq!(
            run_analysis(&grid_pattern(), &config).unwrap_err(),
            Error::InvalidBandwidth(0.0)
        );
    }

    #[test]
    fn test_analyze_coordinates() {
        let coords: Vec<GeoCoord> = (0..30)
            .map(|i| {
                let t = f64::from(i);
                GeoCoord::new(-73.99 + 0.003 * (t % 6.0), 40.70 + 0.002 * (t / 6.0).floor())
            })
            .collect();
        let config = small_config()
            .with_projection(Projection::NewYorkLongIsland)
            .with_kde(KdeConfig::new().with_bandwidth(300.0).with_resolution(16));
        let report = analyze_coordinates(&coords, &config).unwrap();
        assert_eq!(report.statistics.observed_points, 30);
        assert_eq!(analyze_coordinates(&[], &config).unwrap_err(), Error::EmptyInput);
    }
}
