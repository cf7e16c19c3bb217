//! Monte Carlo envelope test against the null model.
//!
//! The observed K (or L) curve is compared with the pointwise rank envelope
//! of curves estimated from simulated patterns on the same distance grid.
#![allow(
    clippy::cast_precision_loss,
    clippy::missing_errors_doc,
    clippy::must_use_candidate
)]

use crate::kfunction::KFunctionEstimator;
use rayon::prelude::*;
use ripley_core::config::{EnvelopeConfig, KFunctionConfig};
use ripley_core::curve::{Envelope, Exceedance, KFunctionCurve, Verdict};
use ripley_core::error::{Error, Result};
use ripley_core::pattern::PointPattern;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Result of comparing an observed pattern with its simulations.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ClusteringTest {
    /// Observed curve.
    pub observed: KFunctionCurve,
    /// Pointwise envelope of the simulated curves.
    pub envelope: Envelope,
    /// Overall outcome.
    pub verdict: Verdict,
    /// Runs of distances where the observed curve is above the envelope.
    pub above: Vec<Exceedance>,
    /// Runs of distances where the observed curve is below the envelope.
    pub below: Vec<Exceedance>,
    /// Grid distance the pointwise p-value was evaluated at.
    pub reference_distance: f64,
    /// One-sided pointwise Monte Carlo p-value for clustering at
    /// `reference_distance`.
    pub p_value: f64,
    /// Maximum absolute deviation of the observed L curve from the simulated
    /// mean.
    pub mad_statistic: f64,
    /// Global Monte Carlo p-value of the MAD test.
    pub mad_p_value: f64,
}

impl ClusteringTest {
    /// Longest run above the envelope, if any.
    pub fn longest_above(&self) -> Option<&Exceedance> {
        self.above.iter().max_by_key(|e| e.steps)
    }

    /// Longest run below the envelope, if any.
    pub fn longest_below(&self) -> Option<&Exceedance> {
        self.below.iter().max_by_key(|e| e.steps)
    }
}

/// Estimates observed and simulated curves and evaluates the envelope test.
#[derive(Clone, Debug, Default)]
pub struct ClusteringTester {
    kfunction: KFunctionConfig,
    envelope: EnvelopeConfig,
}

impl ClusteringTester {
    /// Create with the curve and envelope parameters.
    pub fn new(kfunction: KFunctionConfig, envelope: EnvelopeConfig) -> Self {
        Self {
            kfunction,
            envelope,
        }
    }

    /// Curve parameters.
    pub fn kfunction_config(&self) -> &KFunctionConfig {
        &self.kfunction
    }

    /// Envelope parameters.
    pub fn envelope_config(&self) -> &EnvelopeConfig {
        &self.envelope
    }

    /// Runs the test.
    ///
    /// Every simulated pattern must share the observed window. Simulated
    /// patterns with fewer than two points contribute an all-zero curve.
    pub fn test(
        &self,
        observed: &PointPattern,
        simulated: &[PointPattern],
    ) -> Result<ClusteringTest> {
        if simulated.is_empty() {
            return Err(Error::InvalidRepetitionCount(0));
        }
        self.envelope.validate(simulated.len())?;
        if observed.len() < 2 {
            return Err(Error::InsufficientPoints { n: observed.len() });
        }
        if let Some(index) = simulated
            .iter()
            .position(|p| p.window() != observed.window())
        {
            return Err(Error::InconsistentWindow { index });
        }

        let estimator = KFunctionEstimator::new(self.kfunction.clone());
        let observed_curve = estimator.estimate(observed)?;
        let radii = observed_curve.r().to_vec();

        // Parallelism goes across simulations; each curve is computed serially.
        let per_sim = KFunctionEstimator::new(self.kfunction.clone().with_parallel(false));
        let sim_curve = |p: &PointPattern| per_sim.estimate_at(p, radii.clone());
        let curves = if self.kfunction.parallel {
            simulated.par_iter().map(sim_curve).collect::<Result<Vec<_>>>()?
        } else {
            simulated.iter().map(sim_curve).collect::<Result<Vec<_>>>()?
        };

        envelope_from_curves(&observed_curve, &curves, &self.envelope)
    }
}

/// Builds the envelope, verdict and p-values from precomputed curves.
///
/// All curves must share the observed curve's statistic and distances.
pub fn envelope_from_curves(
    observed: &KFunctionCurve,
    simulated: &[KFunctionCurve],
    config: &EnvelopeConfig,
) -> Result<ClusteringTest> {
    let n_sim = simulated.len();
    if n_sim == 0 {
        return Err(Error::InvalidRepetitionCount(0));
    }
    config.validate(n_sim)?;
    if let Some(index) = simulated
        .iter()
        .position(|c| c.r() != observed.r() || c.statistic() != observed.statistic())
    {
        return Err(Error::InvalidConfig(format!(
            "simulated curve {index} does not match the observed distance grid or statistic"
        )));
    }
    if observed.is_empty() {
        return Err(Error::InvalidConfig("observed curve is empty".to_string()));
    }

    let envelope = rank_envelope(observed, simulated, config.rank);

    let eligible = |r: f64| r > 0.0 && r >= config.min_distance;
    let (above, below) = exceedance_runs(observed, &envelope, eligible);
    let longest = |runs: &[Exceedance]| runs.iter().map(|e| e.steps).max().unwrap_or(0);
    let (up, down) = (longest(&above), longest(&below));
    let verdict = if up >= config.min_run && up >= down {
        Verdict::Clustered
    } else if down >= config.min_run {
        Verdict::Dispersed
    } else {
        Verdict::CsrConsistent
    };

    let target = config
        .reference_distance
        .unwrap_or_else(|| observed.r()[observed.len() / 2]);
    let index = observed.nearest_index(target).unwrap_or(0);
    let obs_value = observed.values()[index];
    let exceeding = simulated
        .iter()
        .filter(|c| c.values()[index] >= obs_value)
        .count();
    let p_value = monte_carlo_p(exceeding, n_sim);

    let (mad_statistic, mad_p_value) = mad_test(observed, simulated, config.min_distance);

    Ok(ClusteringTest {
        observed: observed.clone(),
        envelope,
        verdict,
        above,
        below,
        reference_distance: observed.r()[index],
        p_value,
        mad_statistic,
        mad_p_value,
    })
}

fn monte_carlo_p(exceeding: usize, simulations: usize) -> f64 {
    (1.0 + exceeding as f64) / (simulations as f64 + 1.0)
}

/// k-th smallest and k-th largest simulated value at every distance.
fn rank_envelope(observed: &KFunctionCurve, simulated: &[KFunctionCurve], rank: usize) -> Envelope {
    let n_sim = simulated.len();
    let len = observed.len();
    let mut lower = Vec::with_capacity(len);
    let mut upper = Vec::with_capacity(len);
    let mut mean = Vec::with_capacity(len);
    let mut column = Vec::with_capacity(n_sim);

    for i in 0..len {
        column.clear();
        column.extend(simulated.iter().map(|c| c.values()[i]));
        column.sort_by(f64::total_cmp);
        lower.push(column[rank - 1]);
        upper.push(column[n_sim - rank]);
        mean.push(column.iter().sum::<f64>() / n_sim as f64);
    }

    Envelope {
        statistic: observed.statistic(),
        r: observed.r().to_vec(),
        lower,
        upper,
        mean,
        theoretical: observed.theoretical(),
        rank,
        simulations: n_sim,
    }
}

/// Contiguous runs above and below the envelope among eligible distances.
fn exceedance_runs<F: Fn(f64) -> bool>(
    observed: &KFunctionCurve,
    envelope: &Envelope,
    eligible: F,
) -> (Vec<Exceedance>, Vec<Exceedance>) {
    #[derive(Clone, Copy, PartialEq)]
    enum Side {
        Above,
        Below,
        Inside,
    }

    let mut above = Vec::new();
    let mut below = Vec::new();
    let mut current: Option<(Side, usize)> = None;
    let r = observed.r();

    let mut close = |side: Side, start: usize, end: usize| {
        let run = Exceedance {
            r_start: r[start],
            r_end: r[end],
            steps: end - start + 1,
        };
        match side {
            Side::Above => above.push(run),
            Side::Below => below.push(run),
            Side::Inside => {}
        }
    };

    for (i, (&ri, &v)) in r.iter().zip(observed.values()).enumerate() {
        let side = if !eligible(ri) {
            Side::Inside
        } else if v > envelope.upper[i] {
            Side::Above
        } else if v < envelope.lower[i] {
            Side::Below
        } else {
            Side::Inside
        };
        match current {
            Some((s, _)) if s == side => {}
            Some((s, start)) => {
                close(s, start, i - 1);
                current = Some((side, i));
            }
            None => current = Some((side, i)),
        }
    }
    if let Some((s, start)) = current {
        close(s, start, r.len() - 1);
    }

    (above, below)
}

/// Global maximum-absolute-deviation test on the L transform.
fn mad_test(
    observed: &KFunctionCurve,
    simulated: &[KFunctionCurve],
    min_distance: f64,
) -> (f64, f64) {
    let obs_l = observed.to_l();
    let sim_l: Vec<KFunctionCurve> = simulated.iter().map(KFunctionCurve::to_l).collect();
    let n_sim = sim_l.len() as f64;

    let indices: Vec<usize> = obs_l
        .r()
        .iter()
        .enumerate()
        .filter(|&(_, &r)| r >= min_distance)
        .map(|(i, _)| i)
        .collect();
    let mean: Vec<f64> = (0..obs_l.len())
        .map(|i| sim_l.iter().map(|c| c.values()[i]).sum::<f64>() / n_sim)
        .collect();

    let deviation = |curve: &KFunctionCurve| {
        indices
            .iter()
            .map(|&i| (curve.values()[i] - mean[i]).abs())
            .fold(0.0, f64::max)
    };

    let t_obs = deviation(&obs_l);
    let exceeding = sim_l.iter().filter(|c| deviation(c) >= t_obs).count();
    (t_obs, monte_carlo_p(exceeding, sim_l.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ripley_core::curve::Statistic;
    use ripley_core::window::ObservationWindow;

    fn grid(len: usize) -> Vec<f64> {
        (0..len).map(|i| i as f64).collect()
    }

    fn flat_sims(len: usize, levels: &[f64]) -> Vec<KFunctionCurve> {
        levels
            .iter()
            .map(|&v| KFunctionCurve::new(Statistic::L, grid(len), vec![v; len]).unwrap())
            .collect()
    }

    fn observed_with(len: usize, base: f64, overrides: &[(usize, f64)]) -> KFunctionCurve {
        let mut values = vec![base; len];
        for &(i, v) in overrides {
            values[i] = v;
        }
        KFunctionCurve::new(Statistic::L, grid(len), values).unwrap()
    }

    #[test]
    fn test_rank_bounds() {
        let sims = flat_sims(5, &[1.0, 4.0, 2.0, 5.0, 3.0]);
        let obs = observed_with(5, 3.0, &[]);

        let k1 = envelope_from_curves(&obs, &sims, &EnvelopeConfig::new()).unwrap();
        assert_eq!(k1.envelope.lower, vec![1.0; 5]);
        assert_eq!(k1.envelope.upper, vec![5.0; 5]);
        assert_eq!(k1.envelope.mean, vec![3.0; 5]);

        let k2 = envelope_from_curves(&obs, &sims, &EnvelopeConfig::new().with_rank(2)).unwrap();
        assert_eq!(k2.envelope.lower, vec![2.0; 5]);
        assert_eq!(k2.envelope.upper, vec![4.0; 5]);
        assert!(k2
            .envelope
            .lower
            .iter()
            .zip(&k2.envelope.upper)
            .all(|(l, u)| l <= u));
        assert_eq!(k2.verdict, Verdict::CsrConsistent);
    }

    #[test]
    fn test_clustered_run() {
        let sims = flat_sims(20, &[1.0, 2.0, 3.0]);
        let above: Vec<(usize, f64)> = (5..11).map(|i| (i, 10.0)).collect();
        let obs = observed_with(20, 2.0, &above);
        let test = envelope_from_curves(&obs, &sims, &EnvelopeConfig::new()).unwrap();
        assert_eq!(test.verdict, Verdict::Clustered);
        assert_eq!(test.above.len(), 1);
        let run = test.longest_above().unwrap();
        assert_eq!(run.steps, 6);
        assert_relative_eq!(run.r_start, 5.0);
        assert_relative_eq!(run.r_end, 10.0);
        assert!(test.below.is_empty());
    }

    #[test]
    fn test_short_run_is_consistent() {
        let sims = flat_sims(20, &[1.0, 2.0, 3.0]);
        let above: Vec<(usize, f64)> = (5..9).map(|i| (i, 10.0)).collect();
        let obs = observed_with(20, 2.0, &above);
        let test = envelope_from_curves(&obs, &sims, &EnvelopeConfig::new()).unwrap();
        assert_eq!(test.verdict, Verdict::CsrConsistent);
        assert_eq!(test.above[0].steps, 4);

        let relaxed = EnvelopeConfig::new().with_min_run(4);
        let test = envelope_from_curves(&obs, &sims, &relaxed).unwrap();
        assert_eq!(test.verdict, Verdict::Clustered);
    }

    #[test]
    fn test_dispersed_and_tie() {
        let sims = flat_sims(30, &[1.0, 2.0, 3.0]);
        let below: Vec<(usize, f64)> = (2..9).map(|i| (i, 0.0)).collect();
        let obs = observed_with(30, 2.0, &below);
        let test = envelope_from_curves(&obs, &sims, &EnvelopeConfig::new()).unwrap();
        assert_eq!(test.verdict, Verdict::Dispersed);

        let mut both = below.clone();
        both.extend((15..22).map(|i| (i, 9.0)));
        let obs = observed_with(30, 2.0, &both);
        let test = envelope_from_curves(&obs, &sims, &EnvelopeConfig::new()).unwrap();
        assert_eq!(test.longest_below().unwrap().steps, 7);
        assert_eq!(test.longest_above().unwrap().steps, 7);
        assert_eq!(test.verdict, Verdict::Clustered);
    }

    #[test]
    fn test_min_distance_and_zero_are_ignored() {
        let sims = flat_sims(20, &[1.0, 2.0, 3.0]);
        // Exceeds at r = 0..=7, but only r >= 4 is eligible.
        let above: Vec<(usize, f64)> = (0..8).map(|i| (i, 10.0)).collect();
        let obs = observed_with(20, 2.0, &above);
        let config = EnvelopeConfig::new().with_min_distance(4.0);
        let test = envelope_from_curves(&obs, &sims, &config).unwrap();
        assert_eq!(test.longest_above().unwrap().steps, 4);
        assert_relative_eq!(test.longest_above().unwrap().r_start, 4.0);
        assert_eq!(test.verdict, Verdict::CsrConsistent);

        let test = envelope_from_curves(&obs, &sims, &EnvelopeConfig::new()).unwrap();
        assert_eq!(test.longest_above().unwrap().steps, 7);
        assert_relative_eq!(test.longest_above().unwrap().r_start, 1.0);
    }

    #[test]
    fn test_pointwise_p_value() {
        let sims = flat_sims(11, &[1.0, 2.0, 3.0, 4.0]);
        let obs = observed_with(11, 10.0, &[]);
        let test = envelope_from_curves(&obs, &sims, &EnvelopeConfig::new()).unwrap();
        assert_relative_eq!(test.reference_distance, 5.0);
        assert_relative_eq!(test.p_value, 1.0 / 5.0);

        let low = observed_with(11, 2.5, &[]);
        let config = EnvelopeConfig::new().with_reference_distance(7.2);
        let test = envelope_from_curves(&low, &sims, &config).unwrap();
        assert_relative_eq!(test.reference_distance, 7.0);
        assert_relative_eq!(test.p_value, 3.0 / 5.0);
    }

    #[test]
    fn test_mad_statistic() {
        let sims = flat_sims(6, &[1.0, 3.0]);
        let obs = observed_with(6, 2.0, &[(3, 6.0)]);
        let test = envelope_from_curves(&obs, &sims, &EnvelopeConfig::new()).unwrap();
        assert_relative_eq!(test.mad_statistic, 4.0);
        assert_relative_eq!(test.mad_p_value, 1.0 / 3.0);
    }

    #[test]
    fn test_curve_errors() {
        let obs = observed_with(5, 1.0, &[]);
        assert_eq!(
            envelope_from_curves(&obs, &[], &EnvelopeConfig::new()),
            Err(Error::InvalidRepetitionCount(0))
        );
        let sims = flat_sims(5, &[1.0, 2.0]);
        assert!(matches!(
            envelope_from_curves(&obs, &sims, &EnvelopeConfig::new().with_rank(3)),
            Err(Error::InvalidConfig(_))
        ));
        let other_grid = flat_sims(6, &[1.0, 2.0]);
        assert!(matches!(
            envelope_from_curves(&obs, &other_grid, &EnvelopeConfig::new()),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_tester_checks_windows() {
        let window = ObservationWindow::new(0.0, 100.0, 0.0, 100.0).unwrap();
        let other = ObservationWindow::new(0.0, 100.0, 0.0, 90.0).unwrap();
        let observed =
            PointPattern::from_columns(vec![10.0, 20.0, 30.0], vec![10.0, 50.0, 80.0], window)
                .unwrap();
        let sims = vec![
            observed.clone(),
            PointPattern::empty(window),
            PointPattern::empty(other),
        ];
        let tester = ClusteringTester::default();
        assert_eq!(
            tester.test(&observed, &sims),
            Err(Error::InconsistentWindow { index: 2 })
        );

        let single = PointPattern::from_columns(vec![10.0], vec![10.0], window).unwrap();
        assert_eq!(
            tester.test(&single, &sims[..2]),
            Err(Error::InsufficientPoints { n: 1 })
        );
        assert_eq!(
            tester.test(&observed, &[]),
            Err(Error::InvalidRepetitionCount(0))
        );
    }

    #[test]
    fn test_tester_accepts_sparse_simulations() {
        let window = ObservationWindow::new(0.0, 100.0, 0.0, 100.0).unwrap();
        let observed =
            PointPattern::from_columns(vec![10.0, 12.0, 60.0], vec![10.0, 11.0, 70.0], window)
                .unwrap();
        let sims = vec![PointPattern::empty(window), PointPattern::empty(window)];
        let config = KFunctionConfig::new().with_steps(10);
        let test = ClusteringTester::new(config, EnvelopeConfig::new())
            .test(&observed, &sims)
            .unwrap();
        assert!(test.envelope.upper.iter().all(|&u| u == 0.0));
        assert_eq!(test.envelope.len(), 11);
    }
}
