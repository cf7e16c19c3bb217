//! Kernel density estimation of the intensity surface.
//!
//! Each cell centre receives the sum of the kernels of all points within the
//! kernel support. Points are bucketed into a [`SpatialGrid`] whose cell size
//! equals the support radius, so a cell only visits nearby points.
#![allow(
    clippy::cast_precision_loss,
    clippy::missing_errors_doc,
    clippy::must_use_candidate
)]

use crate::spatial::SpatialGrid;
use rayon::prelude::*;
use ripley_core::config::{KdeConfig, Kernel};
use ripley_core::error::Result;
use ripley_core::pattern::PointPattern;
use ripley_core::surface::IntensitySurface;
use std::f64::consts::PI;

/// Evaluates a normalised 2D kernel at squared distance `d2`.
#[derive(Clone, Copy, Debug)]
struct KernelFn {
    kernel: Kernel,
    sigma2: f64,
    support2: f64,
    norm: f64,
}

impl KernelFn {
    fn new(config: &KdeConfig) -> Self {
        let sigma = config.bandwidth;
        let sigma2 = sigma * sigma;
        match config.kernel {
            Kernel::Gaussian => Self {
                kernel: Kernel::Gaussian,
                sigma2,
                support2: (config.cutoff * sigma).powi(2),
                norm: 1.0 / (2.0 * PI * sigma2),
            },
            Kernel::Quartic => Self {
                kernel: Kernel::Quartic,
                sigma2,
                support2: sigma2,
                norm: 3.0 / (PI * sigma2),
            },
        }
    }

    fn support(&self) -> f64 {
        self.support2.sqrt()
    }

    #[inline]
    fn eval(&self, d2: f64) -> f64 {
        if d2 > self.support2 {
            return 0.0;
        }
        match self.kernel {
            Kernel::Gaussian => self.norm * (-d2 / (2.0 * self.sigma2)).exp(),
            Kernel::Quartic => {
                let u = 1.0 - d2 / self.sigma2;
                if u <= 0.0 {
                    0.0
                } else {
                    self.norm * u * u
                }
            }
        }
    }
}

/// Grid geometry shared by the evaluation passes.
struct GridSpec {
    xmin: f64,
    ymin: f64,
    cell_w: f64,
    cell_h: f64,
    cols: usize,
}

impl GridSpec {
    #[inline]
    fn center(&self, col: usize, row: usize) -> (f64, f64) {
        (
            self.xmin + (col as f64 + 0.5) * self.cell_w,
            self.ymin + (row as f64 + 0.5) * self.cell_h,
        )
    }
}

/// Kernel density estimator with a configurable bandwidth.
#[derive(Clone, Debug, Default)]
pub struct KernelDensityEstimator {
    config: KdeConfig,
}

impl KernelDensityEstimator {
    /// Create with custom configuration.
    pub fn new(config: KdeConfig) -> Self {
        Self { config }
    }

    /// Create with a bandwidth and otherwise default configuration.
    pub fn with_bandwidth(bandwidth: f64) -> Self {
        Self::new(KdeConfig::default().with_bandwidth(bandwidth))
    }

    /// Get current configuration.
    pub fn config(&self) -> &KdeConfig {
        &self.config
    }

    /// Estimates the intensity surface of `pattern` over its window.
    ///
    /// Values are points per unit area. With edge correction (the default)
    /// each point's kernel is rescaled to unit mass on the grid, so the
    /// surface integrates to the point count even when points sit on the
    /// window boundary. Without it the surface integrates to the kernel mass
    /// that falls inside the window.
    pub fn estimate(&self, pattern: &PointPattern) -> Result<IntensitySurface> {
        self.config.validate()?;
        let window = *pattern.window();
        window.ensure_area()?;

        let (cols, rows) = IntensitySurface::grid_shape(&window, self.config.resolution);
        let spec = GridSpec {
            xmin: window.xmin(),
            ymin: window.ymin(),
            cell_w: window.width() / cols as f64,
            cell_h: window.height() / rows as f64,
            cols,
        };
        let kernel = KernelFn::new(&self.config);
        let support = kernel.support();

        let xs = pattern.x();
        let ys = pattern.y();
        let mut index: SpatialGrid<usize> = SpatialGrid::new(support, spec.xmin, spec.ymin);
        for (i, (&x, &y)) in xs.iter().zip(ys).enumerate() {
            index.insert(x, y, i);
        }

        let weights = if self.config.edge_correction {
            self.edge_weights(pattern, &spec, rows, &kernel)
        } else {
            vec![1.0; pattern.len()]
        };

        let fill_row = |row: usize, out: &mut [f64]| {
            for (col, value) in out.iter_mut().enumerate() {
                let (cx, cy) = spec.center(col, row);
                let mut sum = 0.0;
                index.for_each_neighbor(cx, cy, |i| {
                    let dx = xs[i] - cx;
                    let dy = ys[i] - cy;
                    sum += weights[i] * kernel.eval(dx * dx + dy * dy);
                });
                *value = sum;
            }
        };

        let mut values = vec![0.0; cols * rows];
        if self.config.parallel {
            values
                .par_chunks_mut(cols)
                .enumerate()
                .for_each(|(row, out)| fill_row(row, out));
        } else {
            values
                .chunks_mut(cols)
                .enumerate()
                .for_each(|(row, out)| fill_row(row, out));
        }

        IntensitySurface::new(window, cols, rows, values)
    }

    /// Reciprocal of each point's kernel mass captured by the grid.
    fn edge_weights(
        &self,
        pattern: &PointPattern,
        spec: &GridSpec,
        rows: usize,
        kernel: &KernelFn,
    ) -> Vec<f64> {
        let support = kernel.support();
        let cell_area = spec.cell_w * spec.cell_h;
        let rows_f = rows as f64;
        let cols_f = spec.cols as f64;

        let mass_of = |(&x, &y): (&f64, &f64)| -> f64 {
            // Cell index ranges whose centres can lie within the support.
            let c0 = ((x - support - spec.xmin) / spec.cell_w - 0.5)
                .floor()
                .clamp(0.0, cols_f - 1.0);
            let c1 = ((x + support - spec.xmin) / spec.cell_w - 0.5)
                .ceil()
                .clamp(0.0, cols_f - 1.0);
            let r0 = ((y - support - spec.ymin) / spec.cell_h - 0.5)
                .floor()
                .clamp(0.0, rows_f - 1.0);
            let r1 = ((y + support - spec.ymin) / spec.cell_h - 0.5)
                .ceil()
                .clamp(0.0, rows_f - 1.0);

            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let (c0, c1, r0, r1) = (c0 as usize, c1 as usize, r0 as usize, r1 as usize);

            let mut mass = 0.0;
            for row in r0..=r1 {
                for col in c0..=c1 {
                    let (cx, cy) = spec.center(col, row);
                    let dx = x - cx;
                    let dy = y - cy;
                    mass += kernel.eval(dx * dx + dy * dy);
                }
            }
            let mass = mass * cell_area;
            if mass > 0.0 {
                1.0 / mass
            } else {
                1.0
            }
        };

        if self.config.parallel {
            pattern
                .x()
                .par_iter()
                .zip(pattern.y().par_iter())
                .map(mass_of)
                .collect()
        } else {
            pattern.x().iter().zip(pattern.y()).map(mass_of).collect()
        }
    }
}
