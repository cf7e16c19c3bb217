//! Ripley's K-function with edge correction.
//!
//! K(r) = area / n² · Σ_i Σ_{j≠i} 1[d_ij ≤ r] · e_ij
//!
//! Ordered pairs are visited once through a [`SpatialGrid`] with cell size
//! `r_max`. Each pair adds its weight to the bin of the smallest grid
//! distance it counts towards; a cumulative sum over bins then yields K on
//! the whole grid, which is non-decreasing by construction.
#![allow(
    clippy::cast_precision_loss,
    clippy::missing_errors_doc,
    clippy::must_use_candidate
)]

use crate::spatial::SpatialGrid;
use rayon::prelude::*;
use ripley_core::config::{EdgeCorrection, KFunctionConfig};
use ripley_core::curve::KFunctionCurve;
use ripley_core::error::{Error, Result};
use ripley_core::pattern::PointPattern;
use ripley_core::window::ObservationWindow;
use std::f64::consts::{FRAC_PI_2, PI};

/// Upper bound on a single pair weight.
pub const MAX_EDGE_WEIGHT: f64 = 100.0;

/// Points per work unit in the parallel pair loop.
const CHUNK_SIZE: usize = 256;

/// Estimates K (or L) curves on a fixed distance grid.
#[derive(Clone, Debug, Default)]
pub struct KFunctionEstimator {
    config: KFunctionConfig,
}

impl KFunctionEstimator {
    /// Create with custom configuration.
    pub fn new(config: KFunctionConfig) -> Self {
        Self { config }
    }

    /// Get current configuration.
    pub fn config(&self) -> &KFunctionConfig {
        &self.config
    }

    /// Distance grid for `window`: `steps + 1` equally spaced values from 0
    /// to `r_max`, where `r_max` defaults to a quarter of the shorter side.
    pub fn radii(&self, window: &ObservationWindow) -> Result<Vec<f64>> {
        self.config.validate()?;
        window.ensure_area()?;
        let r_max = self
            .config
            .r_max
            .unwrap_or_else(|| window.shorter_side() / 4.0);
        let steps = self.config.steps;
        Ok((0..=steps)
            .map(|k| r_max * k as f64 / steps as f64)
            .collect())
    }

    /// Estimates the curve of an observed pattern.
    ///
    /// Fails with [`Error::InsufficientPoints`] below two points.
    pub fn estimate(&self, pattern: &PointPattern) -> Result<KFunctionCurve> {
        if pattern.len() < 2 {
            return Err(Error::InsufficientPoints { n: pattern.len() });
        }
        let radii = self.radii(pattern.window())?;
        self.estimate_at(pattern, radii)
    }

    /// Estimates the curve on caller-supplied distances.
    ///
    /// Patterns with fewer than two points give an all-zero curve, which is
    /// how sparse simulated patterns are scored.
    pub fn estimate_at(&self, pattern: &PointPattern, radii: Vec<f64>) -> Result<KFunctionCurve> {
        pattern.window().ensure_area()?;
        let k = k_values(pattern, &radii, self.config.edge_correction, self.config.parallel);
        let statistic = self.config.statistic;
        let values = k.into_iter().map(|v| statistic.transform_k(v)).collect();
        KFunctionCurve::new(statistic, radii, values)
    }
}

/// Raw K values at `radii` (ascending). Zeros below two points.
pub fn k_values(
    pattern: &PointPattern,
    radii: &[f64],
    correction: EdgeCorrection,
    parallel: bool,
) -> Vec<f64> {
    let n = pattern.len();
    let Some(&r_max) = radii.last() else {
        return Vec::new();
    };
    if n < 2 || r_max < 0.0 {
        return vec![0.0; radii.len()];
    }

    let window = pattern.window();
    let (xs, ys) = (pattern.x(), pattern.y());
    let mut grid: SpatialGrid<usize> = SpatialGrid::new(r_max, window.xmin(), window.ymin());
    for (i, (&x, &y)) in xs.iter().zip(ys).enumerate() {
        grid.insert(x, y, i);
    }

    let chunk_hist = |start: usize| -> Vec<f64> {
        let mut hist = vec![0.0; radii.len()];
        let end = (start + CHUNK_SIZE).min(n);
        for i in start..end {
            let (xi, yi) = (xs[i], ys[i]);
            grid.for_each_neighbor(xi, yi, |j| {
                if j == i {
                    return;
                }
                let (dx, dy) = (xs[j] - xi, ys[j] - yi);
                let d = dx.hypot(dy);
                let bin = radii.partition_point(|&r| r < d);
                if bin < hist.len() {
                    hist[bin] += pair_weight(window, correction, xi, yi, dx, dy, d);
                }
            });
        }
        hist
    };

    let starts: Vec<usize> = (0..n).step_by(CHUNK_SIZE).collect();
    let partials: Vec<Vec<f64>> = if parallel {
        starts.par_iter().map(|&s| chunk_hist(s)).collect()
    } else {
        starts.iter().map(|&s| chunk_hist(s)).collect()
    };

    // Summed in chunk order so the result does not depend on scheduling.
    let mut hist = vec![0.0; radii.len()];
    for partial in &partials {
        for (h, p) in hist.iter_mut().zip(partial) {
            *h += p;
        }
    }

    let scale = window.area() / (n as f64 * n as f64);
    let mut running = 0.0;
    hist.into_iter()
        .map(|h| {
            running += h;
            running * scale
        })
        .collect()
}

fn pair_weight(
    window: &ObservationWindow,
    correction: EdgeCorrection,
    x: f64,
    y: f64,
    dx: f64,
    dy: f64,
    d: f64,
) -> f64 {
    match correction {
        EdgeCorrection::None => 1.0,
        EdgeCorrection::Isotropic => isotropic_weight(window, x, y, d),
        EdgeCorrection::Translation => translation_weight(window, dx, dy),
    }
}

/// Ripley's isotropic weight: inverse of the fraction of the circle of
/// radius `r` around `(x, y)` that lies inside the window.
pub fn isotropic_weight(window: &ObservationWindow, x: f64, y: f64, r: f64) -> f64 {
    if r <= 0.0 {
        return 1.0;
    }
    // left, right, bottom, top
    let e = window.edge_distances(x, y);
    let half_angle = |dist: f64| if dist < r { (dist / r).acos() } else { 0.0 };
    let phi = e.map(half_angle);

    let mut outside: f64 = phi.iter().map(|p| 2.0 * p).sum();
    // Corners inside the circle: the arcs beyond the two adjacent edges overlap.
    for (a, b) in [(0, 2), (0, 3), (1, 2), (1, 3)] {
        if e[a] * e[a] + e[b] * e[b] < r * r {
            outside -= phi[a] + phi[b] - FRAC_PI_2;
        }
    }

    let inside = 1.0 - outside / (2.0 * PI);
    if inside * MAX_EDGE_WEIGHT <= 1.0 {
        MAX_EDGE_WEIGHT
    } else {
        1.0 / inside
    }
}

/// Translation weight: window area over the area of the window intersected
/// with its copy shifted by `(dx, dy)`.
pub fn translation_weight(window: &ObservationWindow, dx: f64, dy: f64) -> f64 {
    let overlap = (window.width() - dx.abs()) * (window.height() - dy.abs());
    if overlap * MAX_EDGE_WEIGHT <= window.area() {
        MAX_EDGE_WEIGHT
    } else {
        window.area() / overlap
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;
    use ripley_core::curve::Statistic;

    fn square(side: f64) -> ObservationWindow {
        ObservationWindow::new(0.0, side, 0.0, side).unwrap()
    }

    fn uniform_pattern(n: usize, side: f64, seed: u64) -> PointPattern {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let xs = (0..n).map(|_| rng.gen_range(0.0..side)).collect();
        let ys = (0..n).map(|_| rng.gen_range(0.0..side)).collect();
        PointPattern::from_columns(xs, ys, square(side)).unwrap()
    }

    #[test]
    fn test_radii_default_quarter_of_shorter_side() {
        let window = ObservationWindow::new(0.0, 8000.0, 0.0, 4000.0).unwrap();
        let radii = KFunctionEstimator::new(KFunctionConfig::new().with_steps(10))
            .radii(&window)
            .unwrap();
        assert_eq!(radii.len(), 11);
        assert_relative_eq!(radii[0], 0.0);
        assert_relative_eq!(radii[10], 1000.0);
        assert_relative_eq!(radii[1], 100.0);
    }

    #[test]
    fn test_insufficient_points() {
        let single = PointPattern::from_columns(vec![5.0], vec![5.0], square(10.0)).unwrap();
        let estimator = KFunctionEstimator::default();
        assert_eq!(
            estimator.estimate(&single),
            Err(Error::InsufficientPoints { n: 1 })
        );
        let empty = PointPattern::empty(square(10.0));
        assert_eq!(
            estimator.estimate(&empty),
            Err(Error::InsufficientPoints { n: 0 })
        );
    }

    #[test]
    fn test_sparse_pattern_scores_zero() {
        let single = PointPattern::from_columns(vec![5.0], vec![5.0], square(10.0)).unwrap();
        let curve = KFunctionEstimator::default()
            .estimate_at(&single, vec![0.0, 1.0, 2.0])
            .unwrap();
        assert_eq!(curve.values(), &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_two_points_step() {
        let pattern =
            PointPattern::from_columns(vec![50.0, 51.0], vec![50.0, 50.0], square(100.0)).unwrap();
        let config = KFunctionConfig::new()
            .with_r_max(2.0)
            .with_steps(4)
            .with_edge_correction(EdgeCorrection::None);
        let curve = KFunctionEstimator::new(config).estimate(&pattern).unwrap();
        // area / n² · 2 ordered pairs = 10_000 / 4 · 2
        assert_eq!(curve.r(), &[0.0, 0.5, 1.0, 1.5, 2.0]);
        assert_eq!(curve.values(), &[0.0, 0.0, 5000.0, 5000.0, 5000.0]);
    }

    #[test]
    fn test_coincident_points_count_at_zero() {
        let pattern =
            PointPattern::from_columns(vec![5.0, 5.0], vec![5.0, 5.0], square(10.0)).unwrap();
        let config = KFunctionConfig::new()
            .with_r_max(1.0)
            .with_steps(2)
            .with_edge_correction(EdgeCorrection::Isotropic);
        let curve = KFunctionEstimator::new(config).estimate(&pattern).unwrap();
        assert_relative_eq!(curve.values()[0], 50.0);
    }

    #[test]
    fn test_isotropic_weight_geometry() {
        let window = square(100.0);
        // Circle fully inside.
        assert_relative_eq!(isotropic_weight(&window, 50.0, 50.0, 10.0), 1.0);
        // Centre on an edge: half the circle is outside.
        assert_relative_eq!(isotropic_weight(&window, 50.0, 0.0, 10.0), 2.0, epsilon = 1e-12);
        // Centre on a corner: a quarter is inside.
        assert_relative_eq!(isotropic_weight(&window, 0.0, 0.0, 10.0), 4.0, epsilon = 1e-12);
        // Edge at distance r/2: outside arc is 2·acos(1/2) = 2π/3.
        assert_relative_eq!(
            isotropic_weight(&window, 50.0, 5.0, 10.0),
            1.5,
            epsilon = 1e-12
        );
        // Circle much larger than the window is capped.
        assert_relative_eq!(
            isotropic_weight(&window, 50.0, 50.0, 1000.0),
            MAX_EDGE_WEIGHT
        );
    }

    #[test]
    fn test_translation_weight() {
        let window = square(100.0);
        assert_relative_eq!(translation_weight(&window, 0.0, 0.0), 1.0);
        assert_relative_eq!(translation_weight(&window, 10.0, 0.0), 100.0 / 90.0);
        assert_relative_eq!(translation_weight(&window, -10.0, 20.0), 10_000.0 / (90.0 * 80.0));
        assert_relative_eq!(translation_weight(&window, 100.0, 0.0), MAX_EDGE_WEIGHT);
    }

    #[test]
    fn test_curves_are_non_decreasing() {
        let pattern = uniform_pattern(300, 1000.0, 17);
        for correction in [
            EdgeCorrection::None,
            EdgeCorrection::Isotropic,
            EdgeCorrection::Translation,
        ] {
            let config = KFunctionConfig::new()
                .with_edge_correction(correction)
                .with_steps(50);
            let curve = KFunctionEstimator::new(config).estimate(&pattern).unwrap();
            assert_eq!(curve.len(), 51);
            assert!(curve.is_non_decreasing(), "{correction:?}");
        }
    }

    #[test]
    fn test_correction_raises_estimate() {
        let pattern = uniform_pattern(400, 1000.0, 5);
        let estimate = |c| {
            KFunctionEstimator::new(KFunctionConfig::new().with_edge_correction(c))
                .estimate(&pattern)
                .unwrap()
        };
        let raw = estimate(EdgeCorrection::None);
        let iso = estimate(EdgeCorrection::Isotropic);
        let last = raw.len() - 1;
        assert!(iso.values()[last] > raw.values()[last]);
    }

    #[test]
    fn test_parallel_matches_serial() {
        let pattern = uniform_pattern(1500, 5000.0, 99);
        let base = KFunctionConfig::new().with_r_max(600.0).with_steps(30);
        let serial = KFunctionEstimator::new(base.clone().with_parallel(false))
            .estimate(&pattern)
            .unwrap();
        let parallel = KFunctionEstimator::new(base.with_parallel(true))
            .estimate(&pattern)
            .unwrap();
        assert_eq!(serial, parallel);
    }

    #[test]
    fn test_l_statistic() {
        let pattern = uniform_pattern(200, 1000.0, 3);
        let base = KFunctionConfig::new().with_steps(20);
        let k = KFunctionEstimator::new(base.clone()).estimate(&pattern).unwrap();
        let l = KFunctionEstimator::new(base.with_statistic(Statistic::L))
            .estimate(&pattern)
            .unwrap();
        assert_eq!(l.statistic(), Statistic::L);
        for (kv, lv) in k.values().iter().zip(l.values()) {
            assert_relative_eq!((kv / PI).sqrt(), *lv, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_invalid_config() {
        let pattern = uniform_pattern(10, 100.0, 1);
        let zero_steps = KFunctionEstimator::new(KFunctionConfig::new().with_steps(0));
        assert!(matches!(
            zero_steps.estimate(&pattern),
            Err(Error::InvalidConfig(_))
        ));
        let negative = KFunctionEstimator::new(KFunctionConfig::new().with_r_max(-5.0));
        assert!(matches!(
            negative.estimate(&pattern),
            Err(Error::InvalidConfig(_))
        ));
    }
}
