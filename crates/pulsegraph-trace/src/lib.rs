//! Pulsegraph Trace - Signal tracer built on a trigger cell
//!
//! The tracer records the value of a list of cells once per tick:
//! - Traced cells become dependencies of the tracer's trigger cell
//! - Refreshing the trigger writes `<time>\t<value>` lines, one file per cell
//! - `start`/`stop` arm and disarm the trigger without replaying ticks
//! - A small textual command surface drives it from a console

pub mod config;
pub mod error;
pub mod tracer;
pub mod command;

pub use config::*;
pub use error::*;
pub use tracer::*;
pub use command::*;
