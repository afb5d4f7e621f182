//! Six-cell scenario - mixed freshness rules on a shared graph
//!
//! Wiring (dependencies in declaration order):
//!
//! ```text
//! Sig1 <- Sig2, Sig3
//! Sig2 <- Sig4, Sig6
//! Sig3 <- Sig2, Sig5, Sig6
//! Sig4 <- Sig5
//! ```
//!
//! `Sig5` is always fresh and `Sig6` is flag-driven, starting ready. Every
//! compute call is appended to a shared log so tests can check ordering
//! and memoization.

use std::cell::RefCell;
use std::rc::Rc;

use pulsegraph_core::{FreshnessRule, Graph, GraphResult, Signal, Time};

/// One compute call: cell name and requested clock
pub type Call = (&'static str, Time);

/// Shared compute log
#[derive(Clone, Default)]
pub struct CallLog(Rc<RefCell<Vec<Call>>>);

impl CallLog {
    pub fn push(&self, name: &'static str, time: Time) {
        self.0.borrow_mut().push((name, time));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.0.borrow().clone()
    }

    /// Return and forget every logged call
    pub fn take(&self) -> Vec<Call> {
        std::mem::take(&mut *self.0.borrow_mut())
    }

    pub fn count(&self, name: &str) -> usize {
        self.0.borrow().iter().filter(|(n, _)| *n == name).count()
    }
}

/// The six-cell graph and its handles
pub struct Scenario {
    pub graph: Graph,
    pub sig1: Signal<f64>,
    pub sig2: Signal<String>,
    pub sig3: Signal<f64>,
    pub sig4: Signal<String>,
    pub sig5: Signal<f64>,
    pub sig6: Signal<String>,
    pub log: CallLog,
}

impl Scenario {
    /// Build the graph the way a session would: cells first, then
    /// wiring, then functions, then freshness rules
    pub fn build() -> GraphResult<Self> {
        let mut graph = Graph::new();
        let log = CallLog::default();

        let sig5 = graph.new_cell::<f64>("Sig5");
        let sig6 = graph.new_cell::<String>("Sig6");
        let sig4 = graph.new_cell::<String>("Sig4");
        let sig2 = graph.new_cell::<String>("Sig2");
        let sig3 = graph.new_cell::<f64>("Sig3");
        let sig1 = graph.new_cell::<f64>("Sig1");

        graph.add_dependency(sig4, sig5)?;
        graph.add_dependency(sig2, sig4)?;
        graph.add_dependency(sig2, sig6)?;
        graph.add_dependency(sig3, sig2)?;
        graph.add_dependency(sig3, sig5)?;
        graph.add_dependency(sig3, sig6)?;
        graph.add_dependency(sig1, sig2)?;
        graph.add_dependency(sig1, sig3)?;

        let calls = log.clone();
        graph.attach_function(sig5, move |value, time, _| {
            calls.push("Sig5", time);
            *value = time as f64;
            Ok(())
        })?;

        let calls = log.clone();
        graph.attach_function(sig6, move |value, time, _| {
            calls.push("Sig6", time);
            *value = format!("event@{time}");
            Ok(())
        })?;

        let calls = log.clone();
        graph.attach_function(sig4, move |value, time, graph| {
            calls.push("Sig4", time);
            *value = format!("{}", graph.value(sig5)?);
            Ok(())
        })?;

        let calls = log.clone();
        graph.attach_function(sig2, move |value, time, graph| {
            calls.push("Sig2", time);
            *value = format!("{}|{}", graph.value(sig4)?, graph.value(sig6)?);
            Ok(())
        })?;

        let calls = log.clone();
        graph.attach_function(sig3, move |value, time, graph| {
            calls.push("Sig3", time);
            *value = graph.value(sig2)?.len() as f64 + graph.value(sig5)?;
            Ok(())
        })?;

        let calls = log.clone();
        graph.attach_function(sig1, move |value, time, graph| {
            calls.push("Sig1", time);
            *value = 2.0 * graph.value(sig3)?;
            Ok(())
        })?;

        graph.set_freshness_rule(sig5, FreshnessRule::AlwaysFresh)?;
        graph.set_freshness_rule(sig6, FreshnessRule::FlagDriven)?;
        graph.set_ready(sig6, true)?;

        Ok(Scenario {
            graph,
            sig1,
            sig2,
            sig3,
            sig4,
            sig5,
            sig6,
            log,
        })
    }

    /// Full dependency tree below `Sig1`
    pub fn render(&self) -> GraphResult<String> {
        self.graph.render(self.sig1, -1)
    }
}
