//! Signal graph - arena owning every cell
//!
//! Cells are addressed by [`CellId`] handles and dependency edges are plain
//! ids, so wiring never owns an upstream cell. The graph is the explicit
//! context passed to whoever needs name resolution or rewiring; it has no
//! internal locking and is meant to be driven by a single control thread.
//!
//! While a cell refreshes it is moved out of its slot. Reaching the same
//! slot again during that traversal is reported as a cycle instead of
//! recursing forever.

use std::any::type_name;

use tracing::debug;

use crate::{
    CellId, CellValue, ComputedCell, DependencyPolicy, FreshnessRule, GraphError, GraphResult,
    Node, PolicyConfig, Signal, Time, TriggerCell,
};

enum Entry {
    Vacant,
    Ready(Box<dyn Node>),
    /// Moved out for the duration of its own refresh
    Busy,
}

struct Slot {
    generation: u32,
    name: String,
    entry: Entry,
}

/// Arena of cells wired into a dependency graph
#[derive(Default)]
pub struct Graph {
    slots: Vec<Slot>,
    free: Vec<u32>,
    defaults: PolicyConfig,
}

impl Graph {
    pub fn new() -> Self {
        Graph::default()
    }

    /// Create a graph whose `new_cell` uses the given policy settings
    pub fn with_defaults(defaults: PolicyConfig) -> Self {
        Graph {
            defaults,
            ..Graph::default()
        }
    }

    pub fn defaults(&self) -> &PolicyConfig {
        &self.defaults
    }

    // ---- Ownership -------------------------------------------------------

    /// Insert any cell implementation
    pub fn insert(&mut self, node: Box<dyn Node>) -> CellId {
        let name = node.name().to_string();
        debug!(cell = %name, class = node.class_tag(), "cell inserted");

        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.name = name;
                slot.entry = Entry::Ready(node);
                CellId::new(index, slot.generation)
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    name,
                    entry: Entry::Ready(node),
                });
                CellId::new(index, 0)
            }
        }
    }

    pub fn add_cell<T: CellValue>(&mut self, cell: ComputedCell<T>) -> Signal<T> {
        Signal::new(self.insert(Box::new(cell)))
    }

    /// Add an unwired cell using the graph's default policy settings
    pub fn new_cell<T: CellValue + Default>(&mut self, name: impl Into<String>) -> Signal<T> {
        let cell = ComputedCell::new(name).with_config(self.defaults());
        self.add_cell(cell)
    }

    pub fn add_trigger(&mut self, trigger: TriggerCell) -> CellId {
        self.insert(Box::new(trigger))
    }

    /// Remove a cell, unwiring it from every other cell first.
    ///
    /// Outstanding handles to the removed cell report
    /// [`GraphError::DanglingDependency`] from then on.
    pub fn remove(&mut self, id: impl Into<CellId>) -> GraphResult<Box<dyn Node>> {
        let id = id.into();
        let node = self.take(id)?;

        let slot = &mut self.slots[id.index()];
        slot.entry = Entry::Vacant;
        slot.generation = slot.generation.wrapping_add(1);
        let name = std::mem::take(&mut slot.name);
        self.free.push(id.index() as u32);

        let mut unwired = 0;
        for slot in &mut self.slots {
            if let Entry::Ready(other) = &mut slot.entry {
                if other.policy_mut().remove_dependency(id) {
                    unwired += 1;
                }
            }
        }
        debug!(cell = %name, unwired, "cell removed");

        Ok(node)
    }

    pub fn contains(&self, id: impl Into<CellId>) -> bool {
        self.slot(id.into()).is_ok()
    }

    /// Number of live cells
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate over live cell ids
    pub fn ids(&self) -> impl Iterator<Item = CellId> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| !matches!(slot.entry, Entry::Vacant))
            .map(|(index, slot)| CellId::new(index as u32, slot.generation))
    }

    /// Resolve a cell by its name (first match)
    pub fn find(&self, name: &str) -> Option<CellId> {
        self.ids().find(|id| self.slots[id.index()].name == name)
    }

    /// Resolve a typed cell by its name
    pub fn find_signal<T: CellValue>(&self, name: &str) -> GraphResult<Signal<T>> {
        let id = self
            .find(name)
            .ok_or_else(|| GraphError::UnknownCell(name.to_string()))?;
        self.typed::<ComputedCell<T>>(id, type_name::<T>())?;
        Ok(Signal::new(id))
    }

    // ---- Refresh ---------------------------------------------------------

    /// Refresh any cell for `time`. Returns true when it recomputed.
    pub fn refresh_node(&mut self, id: CellId, time: Time) -> GraphResult<bool> {
        let mut node = self.take(id)?;
        let result = node.refresh(self, time);
        self.restore(id, node);
        result
    }

    /// Refresh a typed cell for `time` and return its value
    pub fn refresh<T: CellValue>(&mut self, signal: Signal<T>, time: Time) -> GraphResult<&T> {
        self.refresh_node(signal.id(), time)?;
        self.value(signal)
    }

    /// Cached value of a typed cell, without refreshing
    pub fn value<T: CellValue>(&self, signal: Signal<T>) -> GraphResult<&T> {
        Ok(self.cell(signal)?.value())
    }

    /// Whether a request for `time` would recompute the cell
    pub fn needs_update(&self, id: impl Into<CellId>, time: Time) -> GraphResult<bool> {
        Ok(self.node(id.into())?.policy().is_stale(time))
    }

    // ---- Wiring ----------------------------------------------------------

    /// Append `dependency` to the dependencies of `cell`.
    /// Returns false if it was already present.
    pub fn add_dependency(
        &mut self,
        cell: impl Into<CellId>,
        dependency: impl Into<CellId>,
    ) -> GraphResult<bool> {
        let (cell, dependency) = (cell.into(), dependency.into());
        self.slot(dependency)?;
        let added = self.policy_mut(cell)?.add_dependency(dependency);
        debug!(cell = %cell, dependency = %dependency, added, "dependency added");
        Ok(added)
    }

    pub fn remove_dependency(
        &mut self,
        cell: impl Into<CellId>,
        dependency: impl Into<CellId>,
    ) -> GraphResult<bool> {
        let (cell, dependency) = (cell.into(), dependency.into());
        let removed = self.policy_mut(cell)?.remove_dependency(dependency);
        debug!(cell = %cell, dependency = %dependency, removed, "dependency removed");
        Ok(removed)
    }

    pub fn clear_dependencies(&mut self, cell: impl Into<CellId>) -> GraphResult<()> {
        self.policy_mut(cell.into())?.clear_dependencies();
        Ok(())
    }

    pub fn dependencies(&self, cell: impl Into<CellId>) -> GraphResult<&[CellId]> {
        Ok(self.policy(cell.into())?.dependencies())
    }

    /// Attach or replace the compute function of a typed cell
    pub fn attach_function<T, F>(&mut self, signal: Signal<T>, function: F) -> GraphResult<()>
    where
        T: CellValue,
        F: FnMut(&mut T, Time, &Graph) -> GraphResult<()> + 'static,
    {
        self.cell_mut(signal)?.attach_function(function);
        Ok(())
    }

    // ---- Policy mutators -------------------------------------------------

    pub fn policy(&self, id: impl Into<CellId>) -> GraphResult<&DependencyPolicy> {
        Ok(self.node(id.into())?.policy())
    }

    pub fn policy_mut(&mut self, id: impl Into<CellId>) -> GraphResult<&mut DependencyPolicy> {
        Ok(self.node_mut(id.into())?.policy_mut())
    }

    pub fn set_freshness_rule(&mut self, id: impl Into<CellId>, rule: FreshnessRule) -> GraphResult<()> {
        self.policy_mut(id)?.set_rule(rule);
        Ok(())
    }

    pub fn freshness_rule(&self, id: impl Into<CellId>) -> GraphResult<FreshnessRule> {
        Ok(self.policy(id)?.rule())
    }

    pub fn set_ready(&mut self, id: impl Into<CellId>, ready: bool) -> GraphResult<()> {
        self.policy_mut(id)?.set_ready(ready);
        Ok(())
    }

    pub fn is_ready(&self, id: impl Into<CellId>) -> GraphResult<bool> {
        Ok(self.policy(id)?.is_ready())
    }

    pub fn set_period(&mut self, id: impl Into<CellId>, period: Time) -> GraphResult<()> {
        self.policy_mut(id)?.set_period(period);
        Ok(())
    }

    pub fn set_require_all_fresh(&mut self, id: impl Into<CellId>, require: bool) -> GraphResult<()> {
        self.policy_mut(id)?.set_require_all_fresh(require);
        Ok(())
    }

    pub fn set_armed(&mut self, id: CellId, armed: bool) -> GraphResult<()> {
        self.trigger_mut(id)?.set_armed(armed);
        debug!(cell = %id, armed, "trigger armed state changed");
        Ok(())
    }

    pub fn is_armed(&self, id: CellId) -> GraphResult<bool> {
        Ok(self.trigger(id)?.is_armed())
    }

    // ---- Introspection ---------------------------------------------------

    pub fn name(&self, id: impl Into<CellId>) -> GraphResult<&str> {
        Ok(&self.slot(id.into())?.name)
    }

    pub fn class_tag(&self, id: impl Into<CellId>) -> GraphResult<&'static str> {
        Ok(self.node(id.into())?.class_tag())
    }

    pub fn last_computed(&self, id: impl Into<CellId>) -> GraphResult<Option<Time>> {
        Ok(self.node(id.into())?.last_computed())
    }

    /// Write the cached value of any cell
    pub fn trace_value(&self, id: impl Into<CellId>, out: &mut dyn std::fmt::Write) -> GraphResult<()> {
        self.node(id.into())?.trace_value(out)?;
        Ok(())
    }

    pub fn node(&self, id: CellId) -> GraphResult<&(dyn Node + 'static)> {
        let slot = self.slot(id)?;
        match &slot.entry {
            Entry::Ready(node) => Ok(&**node),
            Entry::Busy => Err(GraphError::CycleDetected {
                name: slot.name.clone(),
            }),
            Entry::Vacant => Err(GraphError::DanglingDependency(id)),
        }
    }

    pub fn node_mut(&mut self, id: CellId) -> GraphResult<&mut (dyn Node + 'static)> {
        let slot = self.slot_mut(id)?;
        match &mut slot.entry {
            Entry::Ready(node) => Ok(&mut **node),
            Entry::Busy => Err(GraphError::CycleDetected {
                name: slot.name.clone(),
            }),
            Entry::Vacant => Err(GraphError::DanglingDependency(id)),
        }
    }

    pub fn cell<T: CellValue>(&self, signal: Signal<T>) -> GraphResult<&ComputedCell<T>> {
        self.typed(signal.id(), type_name::<T>())
    }

    pub fn cell_mut<T: CellValue>(&mut self, signal: Signal<T>) -> GraphResult<&mut ComputedCell<T>> {
        self.typed_mut(signal.id(), type_name::<T>())
    }

    pub fn trigger(&self, id: CellId) -> GraphResult<&TriggerCell> {
        self.typed(id, "trigger")
    }

    pub fn trigger_mut(&mut self, id: CellId) -> GraphResult<&mut TriggerCell> {
        self.typed_mut(id, "trigger")
    }

    // ---- Internals -------------------------------------------------------

    fn slot(&self, id: CellId) -> GraphResult<&Slot> {
        self.slots
            .get(id.index())
            .filter(|slot| slot.generation == id.generation())
            .filter(|slot| !matches!(slot.entry, Entry::Vacant))
            .ok_or(GraphError::DanglingDependency(id))
    }

    fn slot_mut(&mut self, id: CellId) -> GraphResult<&mut Slot> {
        self.slots
            .get_mut(id.index())
            .filter(|slot| slot.generation == id.generation())
            .filter(|slot| !matches!(slot.entry, Entry::Vacant))
            .ok_or(GraphError::DanglingDependency(id))
    }

    fn typed<N: Node>(&self, id: CellId, expected: &'static str) -> GraphResult<&N> {
        self.node(id)?
            .as_any()
            .downcast_ref::<N>()
            .ok_or_else(|| GraphError::TypeMismatch {
                name: self.slots[id.index()].name.clone(),
                expected,
            })
    }

    fn typed_mut<N: Node>(&mut self, id: CellId, expected: &'static str) -> GraphResult<&mut N> {
        if !self.node(id)?.as_any().is::<N>() {
            return Err(GraphError::TypeMismatch {
                name: self.slots[id.index()].name.clone(),
                expected,
            });
        }
        self.node_mut(id)?
            .as_any_mut()
            .downcast_mut::<N>()
            .ok_or(GraphError::DanglingDependency(id))
    }

    fn take(&mut self, id: CellId) -> GraphResult<Box<dyn Node>> {
        let slot = self.slot_mut(id)?;
        match std::mem::replace(&mut slot.entry, Entry::Busy) {
            Entry::Ready(node) => Ok(node),
            Entry::Busy => Err(GraphError::CycleDetected {
                name: slot.name.clone(),
            }),
            Entry::Vacant => {
                slot.entry = Entry::Vacant;
                Err(GraphError::DanglingDependency(id))
            }
        }
    }

    fn restore(&mut self, id: CellId, node: Box<dyn Node>) {
        if let Some(slot) = self.slots.get_mut(id.index()) {
            slot.entry = Entry::Ready(node);
        }
    }
}
