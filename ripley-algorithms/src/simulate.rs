//! Monte Carlo simulation of the complete-spatial-randomness null model.
//!
//! Each simulated pattern is drawn from its own `ChaCha8Rng`, seeded from a
//! master generator in simulation order. Patterns can therefore be generated
//! on any number of threads and still come out identical for a given master
//! seed.
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss,
    clippy::missing_errors_doc,
    clippy::must_use_candidate
)]

use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Poisson};
use rayon::prelude::*;
use ripley_core::config::SimulationConfig;
use ripley_core::error::{Error, Result};
use ripley_core::pattern::PointPattern;
use ripley_core::surface::IntensitySurface;
use ripley_core::window::ObservationWindow;

/// Intensity the null model is calibrated to.
#[derive(Clone, Copy, Debug)]
pub enum Intensity<'a> {
    /// Homogeneous Poisson rate λ (points per unit area).
    Uniform(f64),
    /// Spatially varying rate given by an estimated surface.
    Surface(&'a IntensitySurface),
}

impl Intensity<'_> {
    /// Homogeneous rate matching an observed pattern, `n / area`.
    pub fn of_pattern(pattern: &PointPattern) -> Self {
        Intensity::Uniform(pattern.intensity())
    }

    /// Largest rate, used for the dominating homogeneous process.
    fn max_rate(&self) -> f64 {
        match self {
            Intensity::Uniform(lambda) => *lambda,
            Intensity::Surface(surface) => surface.max(),
        }
    }

    /// Rate at `(x, y)`.
    fn rate_at(&self, x: f64, y: f64) -> f64 {
        match self {
            Intensity::Uniform(lambda) => *lambda,
            Intensity::Surface(surface) => surface.value_at(x, y).unwrap_or(0.0),
        }
    }

    fn validate(&self, window: &ObservationWindow) -> Result<()> {
        match self {
            Intensity::Uniform(lambda) => {
                if !lambda.is_finite() || *lambda <= 0.0 {
                    return Err(Error::InvalidIntensity(format!(
                        "rate lambda = {lambda} (must be finite and > 0)"
                    )));
                }
            }
            Intensity::Surface(surface) => {
                surface.validate_intensity()?;
                if surface.window() != window {
                    return Err(Error::InvalidIntensity(
                        "surface window differs from the simulation window".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// The simulated patterns of one run, in simulation order.
#[derive(Clone, Debug, PartialEq)]
pub struct SimulationSet {
    patterns: Vec<PointPattern>,
    seed: u64,
}

impl SimulationSet {
    /// Simulated patterns, indexed by simulation number.
    pub fn patterns(&self) -> &[PointPattern] {
        &self.patterns
    }

    /// Consumes the set, returning the patterns.
    pub fn into_patterns(self) -> Vec<PointPattern> {
        self.patterns
    }

    /// Master seed the run was generated from; replaying it reproduces the set.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Number of simulated patterns.
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Returns true if the set holds no patterns.
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Mean point count across patterns.
    pub fn mean_count(&self) -> f64 {
        if self.patterns.is_empty() {
            return 0.0;
        }
        self.patterns.iter().map(PointPattern::len).sum::<usize>() as f64
            / self.patterns.len() as f64
    }
}

/// Derives one independent seed per simulation from a master seed.
pub fn derive_seeds(master: u64, count: usize) -> Vec<u64> {
    let mut master = ChaCha8Rng::seed_from_u64(master);
    (0..count).map(|_| master.next_u64()).collect()
}

/// Generates reference patterns under a Poisson null model.
#[derive(Clone, Debug, Default)]
pub struct CsrSimulator {
    config: SimulationConfig,
}

impl CsrSimulator {
    /// Create with custom configuration.
    pub fn new(config: SimulationConfig) -> Self {
        Self { config }
    }

    /// Get current configuration.
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Generates `repetitions` independent patterns in `window`.
    pub fn simulate(
        &self,
        window: &ObservationWindow,
        intensity: Intensity<'_>,
    ) -> Result<SimulationSet> {
        self.config.validate()?;
        window.ensure_area()?;
        intensity.validate(window)?;

        let seed = self
            .config
            .seed
            .unwrap_or_else(|| rand::thread_rng().gen::<u64>());
        let seeds = derive_seeds(seed, self.config.repetitions);
        let fixed_count = self.config.fixed_count;

        let run = |&s: &u64| {
            let mut rng = ChaCha8Rng::seed_from_u64(s);
            sample_pattern(window, intensity, fixed_count, &mut rng)
        };

        let patterns = if self.config.parallel {
            seeds.par_iter().map(run).collect::<Result<Vec<_>>>()?
        } else {
            seeds.iter().map(run).collect::<Result<Vec<_>>>()?
        };

        Ok(SimulationSet { patterns, seed })
    }
}

/// Draws one pattern. Validation of `window` and `intensity` is the caller's
/// responsibility.
///
/// With `fixed_count = None` the count is Poisson with mean
/// `max_rate × area` before thinning; otherwise candidates are drawn until
/// exactly `fixed_count` are accepted.
pub fn sample_pattern<R: Rng>(
    window: &ObservationWindow,
    intensity: Intensity<'_>,
    fixed_count: Option<usize>,
    rng: &mut R,
) -> Result<PointPattern> {
    let lambda_max = intensity.max_rate();

    let (xs, ys) = match fixed_count {
        Some(n) => {
            let mut xs = Vec::with_capacity(n);
            let mut ys = Vec::with_capacity(n);
            while xs.len() < n {
                if let Some((x, y)) = draw_candidate(window, intensity, lambda_max, rng) {
                    xs.push(x);
                    ys.push(y);
                }
            }
            (xs, ys)
        }
        None => {
            let mean = lambda_max * window.area();
            let poisson = Poisson::new(mean).map_err(|e| {
                Error::InvalidIntensity(format!("poisson mean {mean} rejected: {e}"))
            })?;
            let candidates = poisson.sample(rng) as usize;
            let mut xs = Vec::with_capacity(candidates);
            let mut ys = Vec::with_capacity(candidates);
            for _ in 0..candidates {
                if let Some((x, y)) = draw_candidate(window, intensity, lambda_max, rng) {
                    xs.push(x);
                    ys.push(y);
                }
            }
            (xs, ys)
        }
    };

    PointPattern::from_columns(xs, ys, *window)
}

/// Uniform candidate in `window`, thinned by `rate / lambda_max` for surfaces.
fn draw_candidate<R: Rng>(
    window: &ObservationWindow,
    intensity: Intensity<'_>,
    lambda_max: f64,
    rng: &mut R,
) -> Option<(f64, f64)> {
    let x = rng.gen_range(window.xmin()..window.xmax());
    let y = rng.gen_range(window.ymin()..window.ymax());
    if let Intensity::Surface(_) = intensity {
        if rng.gen::<f64>() * lambda_max >= intensity.rate_at(x, y) {
            return None;
        }
    }
    Some((x, y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn window() -> ObservationWindow {
        ObservationWindow::new(0.0, 10_000.0, 0.0, 10_000.0).unwrap()
    }

    fn simulator(reps: usize, seed: u64) -> CsrSimulator {
        CsrSimulator::new(
            SimulationConfig::new()
                .with_repetitions(reps)
                .with_seed(seed),
        )
    }

    #[test]
    fn test_fixed_seed_is_deterministic() {
        let a = simulator(20, 42).simulate(&window(), Intensity::Uniform(1e-6)).unwrap();
        let b = simulator(20, 42).simulate(&window(), Intensity::Uniform(1e-6)).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.seed(), 42);
        assert_eq!(a.len(), 20);
    }

    #[test]
    fn test_parallel_matches_serial() {
        let config = SimulationConfig::new().with_repetitions(16).with_seed(9);
        let serial = CsrSimulator::new(config.clone().with_parallel(false))
            .simulate(&window(), Intensity::Uniform(2e-6))
            .unwrap();
        let parallel = CsrSimulator::new(config.with_parallel(true))
            .simulate(&window(), Intensity::Uniform(2e-6))
            .unwrap();
        assert_eq!(serial, parallel);
    }

    #[test]
    fn test_different_seeds_differ() {
        let a = simulator(5, 1).simulate(&window(), Intensity::Uniform(1e-6)).unwrap();
        let b = simulator(5, 2).simulate(&window(), Intensity::Uniform(1e-6)).unwrap();
        assert_ne!(a.patterns(), b.patterns());
    }

    #[test]
    fn test_unseeded_run_records_replayable_seed() {
        let config = SimulationConfig::new().with_repetitions(3);
        let first = CsrSimulator::new(config.clone())
            .simulate(&window(), Intensity::Uniform(1e-6))
            .unwrap();
        let replay = CsrSimulator::new(config.with_seed(first.seed()))
            .simulate(&window(), Intensity::Uniform(1e-6))
            .unwrap();
        assert_eq!(first, replay);
    }

    #[test]
    fn test_counts_follow_poisson_rate() {
        // lambda * area = 100
        let set = simulator(400, 7).simulate(&window(), Intensity::Uniform(1e-6)).unwrap();
        let mean = set.mean_count();
        assert_abs_diff_eq!(mean, 100.0, epsilon = 3.0);

        let var = set
            .patterns()
            .iter()
            .map(|p| (p.len() as f64 - mean).powi(2))
            .sum::<f64>()
            / (set.len() as f64 - 1.0);
        assert_abs_diff_eq!(var, 100.0, epsilon = 30.0);
    }

    #[test]
    fn test_points_stay_in_window() {
        let set = simulator(10, 3).simulate(&window(), Intensity::Uniform(5e-6)).unwrap();
        for pattern in set.patterns() {
            assert_eq!(pattern.window(), &window());
            assert!(pattern.iter().all(|p| window().contains_point(&p)));
        }
    }

    #[test]
    fn test_fixed_count() {
        let config = SimulationConfig::new()
            .with_repetitions(5)
            .with_seed(11)
            .with_fixed_count(37);
        let set = CsrSimulator::new(config)
            .simulate(&window(), Intensity::Uniform(1e-6))
            .unwrap();
        assert!(set.patterns().iter().all(|p| p.len() == 37));
    }

    #[test]
    fn test_inhomogeneous_thinning_follows_surface() {
        // Left half empty, right half at 1e-6.
        let surface = IntensitySurface::new(window(), 2, 1, vec![0.0, 1e-6]).unwrap();
        let set = simulator(200, 5).simulate(&window(), Intensity::Surface(&surface)).unwrap();
        for pattern in set.patterns() {
            assert!(pattern.x().iter().all(|&x| x >= 5000.0));
        }
        assert_abs_diff_eq!(set.mean_count(), 50.0, epsilon = 3.0);

        let fixed = CsrSimulator::new(
            SimulationConfig::new()
                .with_repetitions(3)
                .with_seed(5)
                .with_fixed_count(25),
        )
        .simulate(&window(), Intensity::Surface(&surface))
        .unwrap();
        for pattern in fixed.patterns() {
            assert_eq!(pattern.len(), 25);
            assert!(pattern.x().iter().all(|&x| x >= 5000.0));
        }
    }

    #[test]
    fn test_invalid_inputs() {
        let zero_reps = CsrSimulator::new(SimulationConfig::new().with_repetitions(0));
        assert_eq!(
            zero_reps.simulate(&window(), Intensity::Uniform(1e-6)),
            Err(Error::InvalidRepetitionCount(0))
        );

        let sim = simulator(3, 1);
        assert!(matches!(
            sim.simulate(&window(), Intensity::Uniform(0.0)),
            Err(Error::InvalidIntensity(_))
        ));
        assert!(matches!(
            sim.simulate(&window(), Intensity::Uniform(f64::NAN)),
            Err(Error::InvalidIntensity(_))
        ));

        let negative = IntensitySurface::new(window(), 2, 1, vec![-1e-6, 1e-6]).unwrap();
        assert!(matches!(
            sim.simulate(&window(), Intensity::Surface(&negative)),
            Err(Error::InvalidIntensity(_))
        ));

        let other = ObservationWindow::new(0.0, 5.0, 0.0, 5.0).unwrap();
        let mismatched = IntensitySurface::new(other, 1, 1, vec![1.0]).unwrap();
        assert!(matches!(
            sim.simulate(&window(), Intensity::Surface(&mismatched)),
            Err(Error::InvalidIntensity(_))
        ));

        let flat = ObservationWindow::new(0.0, 10.0, 3.0, 3.0).unwrap();
        assert!(matches!(
            sim.simulate(&flat, Intensity::Uniform(1.0)),
            Err(Error::DegenerateWindow { .. })
        ));
    }

    #[test]
    fn test_derive_seeds_is_stable_prefix() {
        let short = derive_seeds(123, 3);
        let long = derive_seeds(123, 10);
        assert_eq!(short[..], long[..3]);
        assert_ne!(short[0], short[1]);
    }
}
