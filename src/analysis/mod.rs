//! Grade aggregation over a roster.

pub mod aggregator;

pub use aggregator::*;
