//! Cached computation cells
//!
//! A cell binds a user compute function to a set of upstream cells and
//! memoizes its result per clock value. All cell kinds share one refresh
//! protocol, [`refresh_with`], so value-producing cells and trigger cells
//! give the same once-per-tick guarantee.

use std::any::{type_name, Any};
use std::fmt;

use tracing::{debug, trace};

use crate::{
    CellId, DependencyPolicy, FreshnessRule, Graph, GraphError, GraphResult, PolicyConfig, Time,
};

/// Values a computed cell can hold
pub trait CellValue: Any + fmt::Debug {}

impl<T: Any + fmt::Debug> CellValue for T {}

/// Compute function: `(previous value, requested time, graph) -> ()`.
///
/// The previous value is passed by mutable reference so it can be updated
/// in place. Upstream values are read through the graph; they have already
/// been refreshed for the requested time.
pub type ComputeFn<T> = Box<dyn FnMut(&mut T, Time, &Graph) -> GraphResult<()>>;

/// Capability interface shared by every cell kind.
///
/// Graph-shape algorithms (wiring, rendering, removal) only go through
/// this trait.
pub trait Node: Any {
    /// Diagnostic name, not used for identity
    fn name(&self) -> &str;

    /// Runtime tag of the produced value type
    fn class_tag(&self) -> &'static str;

    /// Whether a compute function is attached
    fn has_function(&self) -> bool;

    fn policy(&self) -> &DependencyPolicy;

    fn policy_mut(&mut self) -> &mut DependencyPolicy;

    /// Clock value of the last completed recompute
    fn last_computed(&self) -> Option<Time>;

    /// Recompute if stale for `time`. Returns true when a recompute ran.
    fn refresh(&mut self, graph: &mut Graph, time: Time) -> GraphResult<bool>;

    /// Write the cached value for tracing
    fn trace_value(&self, out: &mut dyn fmt::Write) -> fmt::Result;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Shared refresh protocol.
///
/// 1. Return early if the policy is not stale for `time`.
/// 2. Refresh every dependency, depth-first, in declaration order.
/// 3. Run `compute`.
/// 4. Mark the policy satisfied and consume the ready flag of
///    flag-driven cells.
///
/// Any error leaves the policy untouched, so the next request for the
/// same `time` retries.
pub fn refresh_with<F>(
    name: &str,
    policy: &mut DependencyPolicy,
    graph: &mut Graph,
    time: Time,
    compute: F,
) -> GraphResult<bool>
where
    F: FnOnce(&Graph) -> GraphResult<()>,
{
    if !policy.is_stale(time) {
        trace!(cell = name, time, "cached");
        return Ok(false);
    }

    for dep in policy.dependencies() {
        graph.refresh_node(*dep, time)?;
    }

    debug!(cell = name, time, "recomputing");
    compute(graph)?;
    policy.mark_satisfied(time);

    if policy.rule() == FreshnessRule::FlagDriven && policy.is_ready() {
        policy.set_ready(false);
        debug!(cell = name, time, "ready flag consumed");
    }

    Ok(true)
}

/// Shortened type name used as class tag (`f64`, `String`, `Vec<f64>`)
pub fn short_type_name<T: ?Sized>() -> &'static str {
    let full = type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    match base.rfind("::") {
        Some(pos) => &full[pos + 2..],
        None => full,
    }
}

/// Cached computation cell producing values of type `T`
pub struct ComputedCell<T> {
    name: String,
    policy: DependencyPolicy,
    value: T,
    last_computed: Option<Time>,
    function: Option<ComputeFn<T>>,
}

impl<T: CellValue> ComputedCell<T> {
    /// Create an unwired clock-driven cell holding `T::default()`
    pub fn new(name: impl Into<String>) -> Self
    where
        T: Default,
    {
        Self::with_value(name, T::default())
    }

    /// Create an unwired clock-driven cell with an initial value
    pub fn with_value(name: impl Into<String>, value: T) -> Self {
        ComputedCell {
            name: name.into(),
            policy: DependencyPolicy::new(),
            value,
            last_computed: None,
            function: None,
        }
    }

    pub fn with_rule(mut self, rule: FreshnessRule) -> Self {
        self.policy.set_rule(rule);
        self
    }

    pub fn with_config(mut self, config: &PolicyConfig) -> Self {
        let previous = std::mem::take(&mut self.policy);
        self.policy = DependencyPolicy::with_config(config);
        for dep in previous.dependencies() {
            self.policy.add_dependency(*dep);
        }
        self
    }

    pub fn depends_on<I, D>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = D>,
        D: Into<CellId>,
    {
        for dep in dependencies {
            self.policy.add_dependency(dep.into());
        }
        self
    }

    pub fn with_function<F>(mut self, function: F) -> Self
    where
        F: FnMut(&mut T, Time, &Graph) -> GraphResult<()> + 'static,
    {
        self.attach_function(function);
        self
    }

    /// Replace the compute function. Safe at any time between ticks.
    pub fn attach_function<F>(&mut self, function: F)
    where
        F: FnMut(&mut T, Time, &Graph) -> GraphResult<()> + 'static,
    {
        self.function = Some(Box::new(function));
    }

    /// Cached value, as of the last recompute
    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn set_freshness_rule(&mut self, rule: FreshnessRule) {
        self.policy.set_rule(rule);
    }

    pub fn set_ready(&mut self, ready: bool) {
        self.policy.set_ready(ready);
    }
}

impl<T: CellValue> Node for ComputedCell<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn class_tag(&self) -> &'static str {
        short_type_name::<T>()
    }

    fn has_function(&self) -> bool {
        self.function.is_some()
    }

    fn policy(&self) -> &DependencyPolicy {
        &self.policy
    }

    fn policy_mut(&mut self) -> &mut DependencyPolicy {
        &mut self.policy
    }

    fn last_computed(&self) -> Option<Time> {
        self.last_computed
    }

    fn refresh(&mut self, graph: &mut Graph, time: Time) -> GraphResult<bool> {
        let name = &self.name;
        let function = &mut self.function;
        let value = &mut self.value;

        let updated = refresh_with(name, &mut self.policy, graph, time, |graph| {
            let function = function
                .as_mut()
                .ok_or_else(|| GraphError::MissingFunction { name: name.clone() })?;
            function(value, time, graph)
        })?;

        if updated {
            self.last_computed = Some(time);
        }
        Ok(updated)
    }

    fn trace_value(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        write!(out, "{:?}", self.value)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl<T: fmt::Debug> fmt::Debug for ComputedCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComputedCell")
            .field("name", &self.name)
            .field("policy", &self.policy)
            .field("value", &self.value)
            .field("last_computed", &self.last_computed)
            .field("wired", &self.function.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;

    fn counting_cell(name: &str, calls: &Rc<Cell<u32>>) -> ComputedCell<i64> {
        let calls = calls.clone();
        ComputedCell::new(name).with_function(move |value: &mut i64, time, _| {
            calls.set(calls.get() + 1);
            *value = time * 10;
            Ok(())
        })
    }

    #[test]
    fn test_short_type_name() {
        assert_eq!(short_type_name::<f64>(), "f64");
        assert_eq!(short_type_name::<String>(), "String");
        assert_eq!(short_type_name::<Vec<f64>>(), "Vec<f64>");
    }

    #[test]
    fn test_refresh_memoizes_per_time() {
        let calls = Rc::new(Cell::new(0));
        let mut graph = Graph::new();
        let sig = graph.add_cell(counting_cell("a", &calls));

        assert_eq!(*graph.refresh(sig, 3).unwrap(), 30);
        assert_eq!(*graph.refresh(sig, 3).unwrap(), 30);
        assert_eq!(calls.get(), 1);

        assert_eq!(*graph.refresh(sig, 4).unwrap(), 40);
        assert_eq!(calls.get(), 2);
        assert_eq!(graph.last_computed(sig.id()).unwrap(), Some(4));
    }

    #[test]
    fn test_missing_function_leaves_cell_stale() {
        let mut graph = Graph::new();
        let sig = graph.add_cell(ComputedCell::<f64>::new("unwired"));

        let err = graph.refresh(sig, 1).unwrap_err();
        assert!(matches!(err, GraphError::MissingFunction { ref name } if name == "unwired"));
        assert!(graph.needs_update(sig.id(), 1).unwrap());

        graph
            .attach_function(sig, |value, time, _| {
                *value = time as f64 * 0.5;
                Ok(())
            })
            .unwrap();
        assert_eq!(*graph.refresh(sig, 1).unwrap(), 0.5);
        assert!(!graph.needs_update(sig.id(), 1).unwrap());
    }

    #[test]
    fn test_failed_compute_retries_same_time() {
        let attempts = Rc::new(Cell::new(0));
        let counter = attempts.clone();
        let mut graph = Graph::new();
        let sig = graph.add_cell(ComputedCell::<u32>::new("flaky").with_function(
            move |value, _, _| {
                counter.set(counter.get() + 1);
                if counter.get() == 1 {
                    return Err(GraphError::compute("flaky", "sensor offline"));
                }
                *value = counter.get();
                Ok(())
            },
        ));

        assert!(graph.refresh(sig, 7).is_err());
        assert_eq!(*graph.refresh(sig, 7).unwrap(), 2);
        assert_eq!(attempts.get(), 2);
    }

    #[test]
    fn test_compute_reads_upstream_values() {
        let mut graph = Graph::new();
        let input = graph.add_cell(ComputedCell::<i64>::new("input").with_function(
            |value, time, _| {
                *value = time + 1;
                Ok(())
            },
        ));
        let doubled = graph.add_cell(
            ComputedCell::<i64>::new("doubled")
                .depends_on([input])
                .with_function(move |value, _, graph| {
                    *value = graph.value(input)? * 2;
                    Ok(())
                }),
        );

        assert_eq!(*graph.refresh(doubled, 5).unwrap(), 12);
        assert_eq!(*graph.value(input).unwrap(), 6);
    }

    #[test]
    fn test_in_place_accumulation() {
        let mut graph = Graph::new();
        let sum = graph.add_cell(ComputedCell::<Vec<i64>>::new("history").with_function(
            |history, time, _| {
                history.push(time);
                Ok(())
            },
        ));

        for t in [1, 2, 2, 3] {
            graph.refresh(sum, t).unwrap();
        }
        assert_eq!(graph.value(sum).unwrap(), &vec![1, 2, 3]);
    }

    #[test]
    fn test_flag_driven_cell_consumes_flag() {
        let calls = Rc::new(Cell::new(0));
        let mut graph = Graph::new();
        let sig = graph.add_cell(counting_cell("event", &calls).with_rule(FreshnessRule::FlagDriven));

        graph.refresh(sig, 1).unwrap();
        assert_eq!(calls.get(), 0);

        graph.set_ready(sig.id(), true).unwrap();
        graph.refresh(sig, 2).unwrap();
        assert_eq!(calls.get(), 1);
        assert!(!graph.is_ready(sig.id()).unwrap());

        graph.refresh(sig, 3).unwrap();
        assert_eq!(calls.get(), 1);
        assert_eq!(*graph.value(sig).unwrap(), 20);
    }

    #[test]
    fn test_always_fresh_computes_once() {
        let calls = Rc::new(Cell::new(0));
        let mut graph = Graph::new();
        let sig = graph.add_cell(counting_cell("gain", &calls).with_config(&PolicyConfig::constant()));

        for t in [0, 1, 2, 50, -1] {
            assert_eq!(*graph.refresh(sig, t).unwrap(), 0);
        }
        assert_eq!(calls.get(), 1);
    }
}
