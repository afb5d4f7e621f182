//! Diagnostic renderers
//!
//! The tree format is consumed by tooling and must stay bit-exact:
//!
//! ```text
//! -- Sig:sink (Type Fun) (t=2 (/1) )
//!    |-- Sig:filter (Type Fun) (t=2 (/1) )
//!    |   `-- Sig:gain (Type Fun) (A)
//!    `-- Sig:event (Type Fun) (ready=FALSE)
//! ```

use std::collections::HashSet;
use std::fmt::Write;

use crate::{CellId, Graph, GraphResult};

impl Graph {
    /// Render the dependency tree below `id`.
    ///
    /// `depth = -1` recurses without limit, `depth = 0` prints only the
    /// node itself.
    pub fn render(&self, id: impl Into<CellId>, depth: i32) -> GraphResult<String> {
        let mut out = String::new();
        self.write_tree(&mut out, id, depth)?;
        Ok(out)
    }

    /// Same as [`Graph::render`], writing into any text sink
    pub fn write_tree(
        &self,
        out: &mut dyn Write,
        id: impl Into<CellId>,
        depth: i32,
    ) -> GraphResult<()> {
        self.write_node(out, id.into(), depth, "", "", "")
    }

    fn write_node(
        &self,
        out: &mut dyn Write,
        id: CellId,
        depth: i32,
        space: &str,
        lead: &str,
        rail: &str,
    ) -> GraphResult<()> {
        let node = self.node(id)?;
        let kind = if node.has_function() { "Fun" } else { "Cst" };
        write!(
            out,
            "{space}{lead}-- Sig:{} (Type {kind}) ({})",
            node.name(),
            node.policy().status()
        )?;

        if depth == 0 {
            return Ok(());
        }

        let dependencies = node.policy().dependencies();
        let child_space = format!("{space}{rail}   ");
        for (i, dep) in dependencies.iter().enumerate() {
            out.write_char('\n')?;
            let last = i + 1 == dependencies.len();
            let (lead, rail) = if last { ("`", " ") } else { ("|", "|") };
            self.write_node(out, *dep, depth - 1, &child_space, lead, rail)?;
        }
        Ok(())
    }

    /// Export the subgraph reachable from `id` in graphviz DOT format.
    /// Edges point from dependency to dependent, each listed once.
    pub fn write_dot(&self, id: impl Into<CellId>) -> GraphResult<String> {
        let root = id.into();
        let mut out = String::new();
        writeln!(out, "digraph \"{}\" {{", self.name(root)?)?;

        let mut visited = HashSet::new();
        let mut stack = vec![root];
        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            let name = self.name(current)?;
            writeln!(out, "  \"{name}\";")?;
            for dep in self.dependencies(current)? {
                writeln!(out, "  \"{}\" -> \"{name}\";", self.name(*dep)?)?;
                stack.push(*dep);
            }
        }

        out.push('}');
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use crate::{ComputedCell, FreshnessRule, Graph, Signal};

    fn wired(graph: &mut Graph, name: &str) -> Signal<f64> {
        graph.add_cell(ComputedCell::new(name).with_function(|_: &mut f64, _, _| Ok(())))
    }

    #[test]
    fn test_render_single_node() {
        let mut graph = Graph::new();
        let a = wired(&mut graph, "a");
        let b = graph.new_cell::<f64>("b");

        assert_eq!(graph.render(a, -1).unwrap(), "-- Sig:a (Type Fun) (t=0 (/1) )");
        assert_eq!(graph.render(b, -1).unwrap(), "-- Sig:b (Type Cst) (t=0 (/1) )");
    }

    #[test]
    fn test_render_nested_tree() {
        let mut graph = Graph::new();
        let sink = wired(&mut graph, "sink");
        let filter = wired(&mut graph, "filter");
        let gain = wired(&mut graph, "gain");
        let event = wired(&mut graph, "event");
        graph.set_freshness_rule(gain, FreshnessRule::AlwaysFresh).unwrap();
        graph.set_freshness_rule(event, FreshnessRule::FlagDriven).unwrap();
        graph.add_dependency(sink, filter).unwrap();
        graph.add_dependency(sink, event).unwrap();
        graph.add_dependency(filter, gain).unwrap();

        graph.refresh(sink, 2).unwrap();

        assert_eq!(
            graph.render(sink, -1).unwrap(),
            "-- Sig:sink (Type Fun) (t=2 (/1) )\n\
             \x20  |-- Sig:filter (Type Fun) (t=2 (/1) )\n\
             \x20  |   `-- Sig:gain (Type Fun) (A)\n\
             \x20  `-- Sig:event (Type Fun) (ready=FALSE)"
        );
    }

    #[test]
    fn test_render_depth_limit() {
        let mut graph = Graph::new();
        let a = wired(&mut graph, "a");
        let b = wired(&mut graph, "b");
        let c = wired(&mut graph, "c");
        let d = wired(&mut graph, "d");
        graph.add_dependency(a, b).unwrap();
        graph.add_dependency(a, c).unwrap();
        graph.add_dependency(b, d).unwrap();

        assert_eq!(graph.render(a, 0).unwrap(), "-- Sig:a (Type Fun) (t=0 (/1) )");
        assert_eq!(
            graph.render(a, 1).unwrap(),
            "-- Sig:a (Type Fun) (t=0 (/1) )\n\
             \x20  |-- Sig:b (Type Fun) (t=0 (/1) )\n\
             \x20  `-- Sig:c (Type Fun) (t=0 (/1) )"
        );
        assert_eq!(
            graph.render(a, 2).unwrap(),
            "-- Sig:a (Type Fun) (t=0 (/1) )\n\
             \x20  |-- Sig:b (Type Fun) (t=0 (/1) )\n\
             \x20  |   `-- Sig:d (Type Fun) (t=0 (/1) )\n\
             \x20  `-- Sig:c (Type Fun) (t=0 (/1) )"
        );
        assert_eq!(graph.render(a, 2).unwrap(), graph.render(a, -1).unwrap());
    }

    #[test]
    fn test_write_dot_lists_edges_once() {
        let mut graph = Graph::new();
        let top = wired(&mut graph, "top");
        let left = wired(&mut graph, "left");
        let right = wired(&mut graph, "right");
        let base = wired(&mut graph, "base");
        graph.add_dependency(top, left).unwrap();
        graph.add_dependency(top, right).unwrap();
        graph.add_dependency(left, base).unwrap();
        graph.add_dependency(right, base).unwrap();

        let dot = graph.write_dot(top).unwrap();
        assert!(dot.starts_with("digraph \"top\" {"));
        assert!(dot.ends_with('}'));
        assert_eq!(dot.matches("\"base\" -> ").count(), 2);
        assert_eq!(dot.matches("  \"base\";").count(), 1);
        assert!(dot.contains("\"left\" -> \"top\";"));
    }
}
