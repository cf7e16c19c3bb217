//! Second-order summary curves and simulation envelopes.

use crate::error::{Error, Result};
use std::f64::consts::PI;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Which second-order statistic a curve holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Statistic {
    /// Ripley's K(r).
    #[default]
    K,
    /// Besag's variance-stabilised L(r) = sqrt(K(r) / π).
    L,
}

impl Statistic {
    /// Value of the statistic under complete spatial randomness.
    #[must_use]
    pub fn theoretical_csr(&self, r: f64) -> f64 {
        match self {
            Self::K => PI * r * r,
            Self::L => r,
        }
    }

    /// Converts a K value into this statistic.
    #[must_use]
    pub fn transform_k(&self, k: f64) -> f64 {
        match self {
            Self::K => k,
            Self::L => (k.max(0.0) / PI).sqrt(),
        }
    }
}

impl fmt::Display for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::K => write!(f, "K"),
            Self::L => write!(f, "L"),
        }
    }
}

/// An ordered sequence of `(r, value)` pairs for one pattern.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct KFunctionCurve {
    statistic: Statistic,
    r: Vec<f64>,
    values: Vec<f64>,
}

impl KFunctionCurve {
    /// Creates a curve.
    ///
    /// # Errors
    /// Returns [`Error::InvalidConfig`] if the lengths differ or `r` is not
    /// strictly increasing.
    pub fn new(statistic: Statistic, r: Vec<f64>, values: Vec<f64>) -> Result<Self> {
        if r.len() != values.len() {
            return Err(Error::InvalidConfig(format!(
                "curve has {} distances but {} values",
                r.len(),
                values.len()
            )));
        }
        if r.windows(2).any(|w| w[1] <= w[0]) {
            return Err(Error::InvalidConfig(
                "curve distances must be strictly increasing".to_string(),
            ));
        }
        Ok(Self {
            statistic,
            r,
            values,
        })
    }

    /// The statistic held by this curve.
    #[must_use]
    pub fn statistic(&self) -> Statistic {
        self.statistic
    }

    /// Distances.
    #[must_use]
    pub fn r(&self) -> &[f64] {
        &self.r
    }

    /// Statistic values, one per distance.
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Number of distances.
    #[must_use]
    pub fn len(&self) -> usize {
        self.r.len()
    }

    /// Returns true if the curve has no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.r.is_empty()
    }

    /// Iterates `(r, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.r.iter().copied().zip(self.values.iter().copied())
    }

    /// Theoretical CSR values on the same distances.
    #[must_use]
    pub fn theoretical(&self) -> Vec<f64> {
        self.r
            .iter()
            .map(|&r| self.statistic.theoretical_csr(r))
            .collect()
    }

    /// Index of the distance closest to `r`.
    #[must_use]
    pub fn nearest_index(&self, r: f64) -> Option<usize> {
        self.r
            .iter()
            .enumerate()
            .min_by(|a, b| (a.1 - r).abs().total_cmp(&(b.1 - r).abs()))
            .map(|(i, _)| i)
    }

    /// Converts a K curve to the L transform. L curves are returned as-is.
    #[must_use]
    pub fn to_l(&self) -> Self {
        match self.statistic {
            Statistic::L => self.clone(),
            Statistic::K => Self {
                statistic: Statistic::L,
                r: self.r.clone(),
                values: self.values.iter().map(|&k| Statistic::L.transform_k(k)).collect(),
            },
        }
    }

    /// Returns true if the values never decrease with r.
    #[must_use]
    pub fn is_non_decreasing(&self) -> bool {
        self.values.windows(2).all(|w| w[1] >= w[0])
    }
}

/// Pointwise rank envelope of simulated curves.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Envelope {
    /// Statistic the bounds refer to.
    pub statistic: Statistic,
    /// Distances.
    pub r: Vec<f64>,
    /// k-th smallest simulated value at each distance.
    pub lower: Vec<f64>,
    /// k-th largest simulated value at each distance.
    pub upper: Vec<f64>,
    /// Pointwise mean of the simulated values.
    pub mean: Vec<f64>,
    /// Theoretical CSR value at each distance.
    pub theoretical: Vec<f64>,
    /// Rank used for the bounds.
    pub rank: usize,
    /// Number of simulated curves.
    pub simulations: usize,
}

impl Envelope {
    /// Number of distances.
    #[must_use]
    pub fn len(&self) -> usize {
        self.r.len()
    }

    /// Returns true if the envelope has no distances.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.r.is_empty()
    }

    /// Pointwise significance level of the two-sided envelope, 2k / (N + 1).
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn pointwise_alpha(&self) -> f64 {
        2.0 * self.rank as f64 / (self.simulations as f64 + 1.0)
    }
}

/// Outcome of the envelope comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Verdict {
    /// Observed curve above the upper envelope over a contiguous range.
    Clustered,
    /// Observed curve below the lower envelope over a contiguous range.
    Dispersed,
    /// Observed curve stays within the envelope.
    CsrConsistent,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Clustered => write!(f, "CLUSTERED"),
            Self::Dispersed => write!(f, "DISPERSED"),
            Self::CsrConsistent => write!(f, "CSR-CONSISTENT"),
        }
    }
}

/// A contiguous range of distances where the observed curve leaves the
/// envelope.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Exceedance {
    /// First distance in the run.
    pub r_start: f64,
    /// Last distance in the run.
    pub r_end: f64,
    /// Number of grid distances in the run.
    pub steps: usize,
}
