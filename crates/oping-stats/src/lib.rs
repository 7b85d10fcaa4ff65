//! Per-target, per-series probe statistics.

pub mod aggregate;

pub use aggregate::{Aggregator, ReportRow};
