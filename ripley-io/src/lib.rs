//! ripley-io: Coordinate input and result output for ripley.
//!
//! Reads longitude/latitude columns from CSV exports and writes surfaces,
//! curves, simulated patterns and a JSON run report.
//!

mod error;
mod reader;
mod writer;

pub use error::{Error, Result};
pub use reader::{CoordinateReader, ReadSummary};
pub use writer::{ReportSummary, ResultWriter};
