//! Pulsegraph Test Harness - Fixtures, property tests and benchmarks
//!
//! This crate provides:
//! - The six-cell scenario mixing every freshness rule
//! - Seeded random DAGs with per-cell compute counters
//! - A traced scenario driving the tracer end to end
//! - Property tests for memoization and propagation

pub mod scenario;
pub mod random_dag;
pub mod session;

#[cfg(test)]
mod properties;

pub use scenario::*;
pub use random_dag::*;
pub use session::*;
