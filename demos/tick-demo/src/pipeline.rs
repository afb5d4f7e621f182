//! Demo control pipeline
//!
//! ```text
//! command <- error, gain
//! error   <- filtered, setpoint
//! filtered <- sensor
//! ```
//!
//! `gain` is computed once, `setpoint` only when an operator changes it.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use pulsegraph_core::{ComputedCell, FreshnessRule, Graph, GraphResult, Signal, Time};

/// Demo settings
#[derive(Clone, Debug)]
pub struct DemoConfig {
    /// Ticks advanced by a bare `tick` command
    pub ticks_per_step: Time,
    /// Pause between two ticks
    pub tick_interval: Duration,
    /// Depth used by the `tree` command without argument
    pub tree_depth: i32,
    /// Low-pass coefficient of the sensor filter
    pub smoothing: f64,
    /// Proportional gain of the controller
    pub gain: f64,
}

impl Default for DemoConfig {
    fn default() -> Self {
        DemoConfig {
            ticks_per_step: 1,
            tick_interval: Duration::ZERO,
            tree_depth: -1,
            smoothing: 0.2,
            gain: 0.5,
        }
    }
}

impl DemoConfig {
    /// Paced loop, one tick every 100 ms
    pub fn paced() -> Self {
        DemoConfig {
            ticks_per_step: 10,
            tick_interval: Duration::from_millis(100),
            ..DemoConfig::default()
        }
    }
}

/// The control pipeline and its operator inputs
pub struct Pipeline {
    pub sensor: Signal<f64>,
    pub filtered: Signal<f64>,
    pub setpoint: Signal<f64>,
    pub gain: Signal<f64>,
    pub error: Signal<f64>,
    pub command: Signal<f64>,
    requested_setpoint: Rc<Cell<f64>>,
}

impl Pipeline {
    pub fn build(graph: &mut Graph, config: &DemoConfig) -> GraphResult<Self> {
        let sensor = graph.add_cell(ComputedCell::new("plant.sensor").with_function(
            |value: &mut f64, time, _| {
                *value = (time as f64 * 0.1).sin();
                Ok(())
            },
        ));

        let smoothing = config.smoothing;
        let filtered = graph.add_cell(
            ComputedCell::new("filter.output")
                .depends_on([sensor])
                .with_function(move |value: &mut f64, _, graph| {
                    let input = *graph.value(sensor)?;
                    *value += smoothing * (input - *value);
                    Ok(())
                }),
        );

        let requested_setpoint = Rc::new(Cell::new(0.0));
        let requested = Rc::clone(&requested_setpoint);
        let setpoint = graph.add_cell(
            ComputedCell::new("operator.setpoint")
                .with_rule(FreshnessRule::FlagDriven)
                .with_function(move |value: &mut f64, _, _| {
                    *value = requested.get();
                    Ok(())
                }),
        );

        let k = config.gain;
        let gain = graph.add_cell(
            ComputedCell::new("controller.gain")
                .with_rule(FreshnessRule::AlwaysFresh)
                .with_function(move |value: &mut f64, _, _| {
                    *value = k;
                    Ok(())
                }),
        );

        let error = graph.add_cell(
            ComputedCell::new("controller.error")
                .depends_on([filtered, setpoint])
                .with_function(move |value: &mut f64, _, graph| {
                    *value = *graph.value(setpoint)? - *graph.value(filtered)?;
                    Ok(())
                }),
        );

        let command = graph.add_cell(
            ComputedCell::new("actuator.command")
                .depends_on([error, gain])
                .with_function(move |value: &mut f64, _, graph| {
                    *value = *graph.value(gain)? * *graph.value(error)?;
                    Ok(())
                }),
        );

        Ok(Pipeline {
            sensor,
            filtered,
            setpoint,
            gain,
            error,
            command,
            requested_setpoint,
        })
    }

    /// Request a new setpoint, picked up by the next tick
    pub fn set_setpoint(&self, graph: &mut Graph, value: f64) -> GraphResult<()> {
        self.requested_setpoint.set(value);
        graph.set_ready(self.setpoint, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setpoint_is_picked_up_once() {
        let mut graph = Graph::new();
        let pipeline = Pipeline::build(&mut graph, &DemoConfig::default()).unwrap();

        graph.refresh(pipeline.command, 1).unwrap();
        assert_eq!(*graph.value(pipeline.setpoint).unwrap(), 0.0);

        pipeline.set_setpoint(&mut graph, 1.0).unwrap();
        graph.refresh(pipeline.command, 2).unwrap();
        assert_eq!(*graph.value(pipeline.setpoint).unwrap(), 1.0);
        assert!(!graph.is_ready(pipeline.setpoint).unwrap());
    }

    #[test]
    fn test_command_follows_error() {
        let mut graph = Graph::new();
        let config = DemoConfig::default();
        let pipeline = Pipeline::build(&mut graph, &config).unwrap();
        pipeline.set_setpoint(&mut graph, 2.0).unwrap();

        let command = *graph.refresh(pipeline.command, 5).unwrap();
        let error = *graph.value(pipeline.error).unwrap();
        assert!((command - config.gain * error).abs() < 1e-12);
    }
}
