//! Smooths the series recorded by an RMHL run and renders them

#[macro_use]
extern crate log;

mod error;
mod format;
mod overall;
mod prepare;

pub use error::{PlotError, Result};
pub use format::PlotFormat;
pub use overall::{plot_distinct, plot_overall, PlotInfo, OVERALL_FILE_STEM};
pub use prepare::{carry_forward, prepare, PreparedSeries};

/// (x, y) points of one line
pub type Series = Vec<(f64, f64)>;
