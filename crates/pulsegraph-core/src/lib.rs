//! Pulsegraph Core - Demand-driven signal graph
//!
//! This crate implements the update-freshness engine of a control pipeline:
//! - Logical clock (`Time`) supplied by the caller once per control cycle
//! - Dependency policies deciding when a cell is stale
//! - Cached computation cells memoized per clock value
//! - Trigger cells firing a side effect at most once per clock value
//! - An arena graph owning every cell, wired by non-owning handles
//! - Diagnostic tree and DOT renderers

pub mod time;
pub mod id;
pub mod error;
pub mod policy;
pub mod cell;
pub mod trigger;
pub mod graph;
pub mod render;

pub use time::*;
pub use id::*;
pub use error::*;
pub use policy::*;
pub use cell::*;
pub use trigger::*;
pub use graph::*;
