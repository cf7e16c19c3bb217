//! Result writers: CSV tables and a JSON run report.

use crate::Result;
use ripley_algorithms::{AnalysisReport, AnalysisStatistics, ClusteringTest};
use ripley_core::config::AnalysisConfig;
use ripley_core::curve::{Exceedance, Statistic, Verdict};
use ripley_core::pattern::PointPattern;
use ripley_core::surface::IntensitySurface;
use ripley_core::window::ObservationWindow;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Summary of an analysis run as written to `report.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    /// Overall outcome.
    pub verdict: Verdict,
    /// Statistic the envelope was built on.
    pub statistic: Statistic,
    /// Observation window.
    pub window: ObservationWindow,
    /// Envelope rank.
    pub rank: usize,
    /// Pointwise significance of the envelope.
    pub pointwise_alpha: f64,
    /// Distance of the pointwise p-value.
    pub reference_distance: f64,
    /// Pointwise Monte Carlo p-value.
    pub p_value: f64,
    /// MAD test statistic.
    pub mad_statistic: f64,
    /// MAD test p-value.
    pub mad_p_value: f64,
    /// Runs above the envelope.
    pub above: Vec<Exceedance>,
    /// Runs below the envelope.
    pub below: Vec<Exceedance>,
    /// Counts and timings.
    pub statistics: AnalysisStatistics,
    /// Configuration the run used.
    pub config: AnalysisConfig,
}

impl ReportSummary {
    /// Collects the summary of `report`.
    #[must_use]
    pub fn new(report: &AnalysisReport, config: &AnalysisConfig) -> Self {
        let test = &report.test;
        Self {
            verdict: test.verdict,
            statistic: test.observed.statistic(),
            window: *report.pattern.window(),
            rank: test.envelope.rank,
            pointwise_alpha: test.envelope.pointwise_alpha(),
            reference_distance: test.reference_distance,
            p_value: test.p_value,
            mad_statistic: test.mad_statistic,
            mad_p_value: test.mad_p_value,
            above: test.above.clone(),
            below: test.below.clone(),
            statistics: report.statistics.clone(),
            config: config.clone(),
        }
    }
}

/// Writer for analysis outputs.
pub struct ResultWriter {
    writer: BufWriter<File>,
}

impl ResultWriter {
    /// Creates a new file writer.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        Ok(Self { writer })
    }

    /// Writes the surface as `x,y,intensity` at cell centres.
    ///
    /// # Errors
    /// Returns an error on write failure.
    pub fn write_surface_csv(&mut self, surface: &IntensitySurface) -> Result<()> {
        writeln!(self.writer, "x,y,intensity")?;
        for (x, y, value) in surface.cells() {
            writeln!(self.writer, "{x},{y},{value}")?;
        }
        self.writer.flush()?;
        Ok(())
    }

    /// Writes the observed curve with its envelope.
    ///
    /// # Errors
    /// Returns an error on write failure.
    pub fn write_curves_csv(&mut self, test: &ClusteringTest) -> Result<()> {
        writeln!(self.writer, "r,observed,lower,upper,mean,theoretical")?;
        let env = &test.envelope;
        for (i, (r, observed)) in test.observed.iter().enumerate() {
            writeln!(
                self.writer,
                "{},{},{},{},{},{}",
                r, observed, env.lower[i], env.upper[i], env.mean[i], env.theoretical[i]
            )?;
        }
        self.writer.flush()?;
        Ok(())
    }

    /// Writes simulated patterns as `simulation,x,y`, numbering from 1.
    ///
    /// # Errors
    /// Returns an error on write failure.
    pub fn write_patterns_csv(&mut self, patterns: &[PointPattern]) -> Result<()> {
        writeln!(self.writer, "simulation,x,y")?;
        for (index, pattern) in patterns.iter().enumerate() {
            for p in pattern.iter() {
                writeln!(self.writer, "{},{},{}", index + 1, p.x, p.y)?;
            }
        }
        self.writer.flush()?;
        Ok(())
    }

    /// Writes projected points as `x,y`.
    ///
    /// # Errors
    /// Returns an error on write failure.
    pub fn write_points_csv(&mut self, pattern: &PointPattern) -> Result<()> {
        writeln!(self.writer, "x,y")?;
        for p in pattern.iter() {
            writeln!(self.writer, "{},{}", p.x, p.y)?;
        }
        self.writer.flush()?;
        Ok(())
    }

    /// Writes the run summary as pretty-printed JSON.
    ///
    /// # Errors
    /// Returns an error on encoding or write failure.
    pub fn write_report_json(
        &mut self,
        report: &AnalysisReport,
        config: &AnalysisConfig,
    ) -> Result<()> {
        let summary = ReportSummary::new(report, config);
        serde_json::to_writer_pretty(&mut self.writer, &summary)?;
        writeln!(self.writer)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Flushes the writer.
    ///
    /// # Errors
    /// Returns an error on write failure.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
