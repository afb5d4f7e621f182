//! Logical clock of the control loop

/// Control-cycle index. Owned and advanced by the caller, never by the engine.
pub type Time = i64;

/// Default spacing between two satisfied requests (every tick)
pub const DEFAULT_PERIOD: Time = 1;
