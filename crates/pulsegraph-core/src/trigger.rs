//! Trigger cells - side effects fired at most once per clock value
//!
//! A trigger cell goes through the same refresh protocol as a computed cell,
//! but its value is a fire counter and the real work is the action's side
//! effect. While disarmed the action is skipped and the cell is still marked
//! satisfied, so re-arming does not replay missed ticks.

use std::any::Any;
use std::fmt;

use crate::{refresh_with, CellId, DependencyPolicy, Graph, GraphError, GraphResult, Node, Time};

/// Side-effect action: `(requested time, graph)`
pub type ActionFn = Box<dyn FnMut(Time, &Graph) -> GraphResult<()>>;

/// Cell whose refresh performs an action once per distinct clock value
pub struct TriggerCell {
    name: String,
    policy: DependencyPolicy,
    armed: bool,
    action: Option<ActionFn>,
    last_computed: Option<Time>,
    fired: u64,
}

impl TriggerCell {
    /// Create an armed trigger with no action
    pub fn new(name: impl Into<String>) -> Self {
        TriggerCell {
            name: name.into(),
            policy: DependencyPolicy::new(),
            armed: true,
            action: None,
            last_computed: None,
            fired: 0,
        }
    }

    pub fn with_action<F>(mut self, action: F) -> Self
    where
        F: FnMut(Time, &Graph) -> GraphResult<()> + 'static,
    {
        self.set_action(action);
        self
    }

    pub fn armed(mut self, armed: bool) -> Self {
        self.armed = armed;
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

    pub fn set_action<F>(&mut self, action: F)
    where
        F: FnMut(Time, &Graph) -> GraphResult<()> + 'static,
    {
        self.action = Some(Box::new(action));
    }

    pub fn set_armed(&mut self, armed: bool) {
        self.armed = armed;
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Number of times the action actually ran
    pub fn fired(&self) -> u64 {
        self.fired
    }
}

impl Node for TriggerCell {
    fn name(&self) -> &str {
        &self.name
    }

    fn class_tag(&self) -> &'static str {
        "trigger"
    }

    fn has_function(&self) -> bool {
        self.action.is_some()
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
        let armed = self.armed;
        let action = &mut self.action;
        let fired = &mut self.fired;

        let updated = refresh_with(name, &mut self.policy, graph, time, |graph| {
            let action = action
                .as_mut()
                .ok_or_else(|| GraphError::MissingFunction { name: name.clone() })?;
            if armed {
                action(time, graph)?;
                *fired += 1;
            }
            Ok(())
        })?;

        if updated {
            self.last_computed = Some(time);
        }
        Ok(updated)
    }

    fn trace_value(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        write!(out, "{}", self.fired)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl fmt::Debug for TriggerCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TriggerCell")
            .field("name", &self.name)
            .field("policy", &self.policy)
            .field("armed", &self.armed)
            .field("fired", &self.fired)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::ComputedCell;

    fn recording_trigger(log: &Rc<RefCell<Vec<Time>>>) -> TriggerCell {
        let log = log.clone();
        TriggerCell::new("probe").with_action(move |time, _| {
            log.borrow_mut().push(time);
            Ok(())
        })
    }

    #[test]
    fn test_trigger_fires_once_per_time() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut graph = Graph::new();
        let trigger = graph.add_trigger(recording_trigger(&log));

        for t in [1, 1, 2, 2, 2, 3] {
            graph.refresh_node(trigger, t).unwrap();
        }

        assert_eq!(*log.borrow(), vec![1, 2, 3]);
        assert_eq!(graph.trigger(trigger).unwrap().fired(), 3);
    }

    #[test]
    fn test_disarmed_trigger_does_not_replay() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut graph = Graph::new();
        let trigger = graph.add_trigger(recording_trigger(&log).armed(false));

        graph.refresh_node(trigger, 1).unwrap();
        graph.refresh_node(trigger, 2).unwrap();
        assert!(log.borrow().is_empty());
        assert_eq!(graph.last_computed(trigger).unwrap(), Some(2));

        graph.set_armed(trigger, true).unwrap();
        graph.refresh_node(trigger, 2).unwrap();
        assert!(log.borrow().is_empty());

        graph.refresh_node(trigger, 3).unwrap();
        assert_eq!(*log.borrow(), vec![3]);
    }

    #[test]
    fn test_trigger_refreshes_dependencies_first() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut graph = Graph::new();
        let source = graph.add_cell(ComputedCell::<i64>::new("source").with_function(
            |value, time, _| {
                *value = time * time;
                Ok(())
            },
        ));

        let sink = seen.clone();
        let trigger = graph.add_trigger(TriggerCell::new("sink").depends_on([source]).with_action(
            move |_, graph| {
                sink.borrow_mut().push(*graph.value(source)?);
                Ok(())
            },
        ));

        graph.refresh_node(trigger, 3).unwrap();
        graph.refresh_node(trigger, 4).unwrap();
        assert_eq!(*seen.borrow(), vec![9, 16]);
    }

    #[test]
    fn test_trigger_without_action_errors() {
        let mut graph = Graph::new();
        let trigger = graph.add_trigger(TriggerCell::new("empty"));

        assert!(matches!(
            graph.refresh_node(trigger, 1),
            Err(GraphError::MissingFunction { .. })
        ));
    }
}
