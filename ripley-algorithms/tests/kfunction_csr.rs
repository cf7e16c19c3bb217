#![allow(clippy::cast_precision_loss)]
use approx::assert_relative_eq;
use ripley_algorithms::{
    CsrSimulator, EdgeCorrection, Intensity, KFunctionConfig, KFunctionEstimator,
    SimulationConfig,
};
use ripley_core::window::ObservationWindow;
use std::f64::consts::PI;

fn mean_k_at(correction: EdgeCorrection, r: f64) -> f64 {
    let window = ObservationWindow::new(0.0, 10_000.0, 0.0, 10_000.0).unwrap();
    let simulations = CsrSimulator::new(
        SimulationConfig::new()
            .with_repetitions(200)
            .with_seed(31)
            .with_fixed_count(200),
    )
    .simulate(&window, Intensity::Uniform(2e-6))
    .unwrap();

    let estimator = KFunctionEstimator::new(
        KFunctionConfig::new()
            .with_r_max(r)
            .with_steps(1)
            .with_edge_correction(correction),
    );
    let total: f64 = simulations
        .patterns()
        .iter()
        .map(|p| {
            let curve = estimator.estimate(p).unwrap();
            assert!(curve.is_non_decreasing());
            curve.values()[1]
        })
        .sum();
    total / simulations.len() as f64
}

#[test]
fn test_uncorrected_k_matches_pi_r_squared_at_small_r() {
    let r = 200.0;
    assert_relative_eq!(mean_k_at(EdgeCorrection::None, r), PI * r * r, max_relative = 0.08);
}

#[test]
fn test_isotropic_k_matches_pi_r_squared() {
    let r = 1000.0;
    assert_relative_eq!(
        mean_k_at(EdgeCorrection::Isotropic, r),
        PI * r * r,
        max_relative = 0.05
    );
}

#[test]
fn test_translation_k_matches_pi_r_squared() {
    let r = 1000.0;
    assert_relative_eq!(
        mean_k_at(EdgeCorrection::Translation, r),
        PI * r * r,
        max_relative = 0.05
    );
}

#[test]
fn test_uncorrected_k_is_biased_low_at_large_r() {
    let r = 1500.0;
    assert!(mean_k_at(EdgeCorrection::None, r) < 0.9 * PI * r * r);
}
