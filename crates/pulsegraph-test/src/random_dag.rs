//! Random DAG builder - seeded graph shapes for property tests and benches
//!
//! Cell `i` may only depend on cells `0..i`, so every generated graph is
//! acyclic. Each cell computes `1 + sum(dependencies)` and counts its own
//! compute calls.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use pulsegraph_core::{CellId, ComputedCell, Graph, GraphResult, Signal};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Generator configuration
#[derive(Clone, Debug)]
pub struct DagConfig {
    /// Number of cells
    pub cells: usize,
    /// Upper bound of dependencies per cell
    pub max_fanin: usize,
    /// Random seed
    pub seed: u64,
}

impl Default for DagConfig {
    fn default() -> Self {
        DagConfig {
            cells: 64,
            max_fanin: 3,
            seed: 42,
        }
    }
}

impl DagConfig {
    /// Small graph for quick tests
    pub fn small(seed: u64) -> Self {
        DagConfig {
            cells: 12,
            max_fanin: 3,
            seed,
        }
    }

    /// Wide graph for benchmarks
    pub fn large() -> Self {
        DagConfig {
            cells: 1024,
            max_fanin: 6,
            seed: 42,
        }
    }
}

/// A generated graph with per-cell compute counters
pub struct RandomDag {
    pub graph: Graph,
    pub cells: Vec<Signal<i64>>,
    counts: Rc<RefCell<Vec<u64>>>,
    index: HashMap<CellId, usize>,
}

impl RandomDag {
    pub fn generate(config: &DagConfig) -> GraphResult<Self> {
        let mut rng = StdRng::seed_from_u64(config.seed);
        let mut graph = Graph::new();
        let counts = Rc::new(RefCell::new(vec![0u64; config.cells]));
        let mut cells: Vec<Signal<i64>> = Vec::with_capacity(config.cells);
        let mut index = HashMap::with_capacity(config.cells);

        for i in 0..config.cells {
            let fanin = if i == 0 {
                0
            } else {
                rng.gen_range(0..=config.max_fanin.min(i))
            };
            let mut picks: Vec<usize> = (0..fanin).map(|_| rng.gen_range(0..i)).collect();
            picks.sort_unstable();
            picks.dedup();
            let deps: Vec<Signal<i64>> = picks.into_iter().map(|p| cells[p]).collect();

            let counter = Rc::clone(&counts);
            let inputs = deps.clone();
            let cell = ComputedCell::new(format!("n{i}"))
                .depends_on(deps)
                .with_function(move |value: &mut i64, _, graph| {
                    counter.borrow_mut()[i] += 1;
                    *value = 1;
                    for dep in &inputs {
                        *value += *graph.value(*dep)?;
                    }
                    Ok(())
                });

            let signal = graph.add_cell(cell);
            index.insert(signal.id(), i);
            cells.push(signal);
        }

        Ok(RandomDag {
            graph,
            cells,
            counts,
            index,
        })
    }

    /// Last generated cell, the one with the most potential ancestors
    pub fn sink(&self) -> Option<Signal<i64>> {
        self.cells.last().copied()
    }

    pub fn compute_counts(&self) -> Vec<u64> {
        self.counts.borrow().clone()
    }

    pub fn reset_counts(&self) {
        self.counts.borrow_mut().iter_mut().for_each(|c| *c = 0);
    }

    /// Indices of every cell reachable from `root`, itself included
    pub fn reachable_from(&self, root: Signal<i64>) -> GraphResult<HashSet<usize>> {
        let mut seen = HashSet::new();
        let mut stack = vec![root.id()];
        while let Some(id) = stack.pop() {
            if let Some(&i) = self.index.get(&id) {
                if !seen.insert(i) {
                    continue;
                }
            }
            stack.extend_from_slice(self.graph.dependencies(id)?);
        }
        Ok(seen)
    }

    /// Value of `root` computed directly from the wiring, without the graph cache
    pub fn expected_value(&self, root: Signal<i64>) -> GraphResult<i64> {
        let mut memo = HashMap::new();
        self.expected(root.id(), &mut memo)
    }

    fn expected(&self, id: CellId, memo: &mut HashMap<CellId, i64>) -> GraphResult<i64> {
        if let Some(value) = memo.get(&id) {
            return Ok(*value);
        }
        let mut value = 1;
        for dep in self.graph.dependencies(id)? {
            value += self.expected(*dep, memo)?;
        }
        memo.insert(id, value);
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_is_deterministic() {
        let a = RandomDag::generate(&DagConfig::small(7)).unwrap();
        let b = RandomDag::generate(&DagConfig::small(7)).unwrap();

        for (x, y) in a.cells.iter().zip(&b.cells) {
            let dx: Vec<_> = a.graph.dependencies(*x).unwrap().iter().map(|d| d.index()).collect();
            let dy: Vec<_> = b.graph.dependencies(*y).unwrap().iter().map(|d| d.index()).collect();
            assert_eq!(dx, dy);
        }
    }

    #[test]
    fn test_dependencies_point_backwards() {
        let dag = RandomDag::generate(&DagConfig::default()).unwrap();
        for (i, cell) in dag.cells.iter().enumerate() {
            for dep in dag.graph.dependencies(*cell).unwrap() {
                assert!(dep.index() < i);
            }
        }
    }

    #[test]
    fn test_refresh_matches_expected_value() {
        let mut dag = RandomDag::generate(&DagConfig::default()).unwrap();
        let sink = dag.sink().unwrap();
        let expected = dag.expected_value(sink).unwrap();
        assert_eq!(*dag.graph.refresh(sink, 1).unwrap(), expected);
    }
}
