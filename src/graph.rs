//! Emission graph of a kernel: every expression node reachable from the
//! values the builder emitted, with operand edges.

use std::collections::HashMap;

use petgraph::algo::{is_cyclic_directed, toposort};
use petgraph::graph::{DiGraph, NodeIndex};

use crate::expr::ExprRef;

/// Expression DAG snapshot, keyed by node id. Edges point from a node to
/// its operands and carry the operand role (`lhs`, `arg`, `cond`, ...).
#[derive(Clone, Debug, Default)]
pub struct ExprGraph {
    graph: DiGraph<String, &'static str>,
    index: HashMap<u32, NodeIndex>,
}

impl ExprGraph {
    pub fn from_roots(roots: &[ExprRef]) -> Self {
        let mut out = Self::default();
        let mut nodes = Vec::new();
        let mut stack: Vec<ExprRef> = roots.to_vec();
        while let Some(expr) = stack.pop() {
            if out.index.contains_key(&expr.id()) {
                continue;
            }
            let idx = out.graph.add_node(expr.label());
            out.index.insert(expr.id(), idx);
            stack.extend(expr.children().into_iter().map(|(_, c)| c.clone()));
            nodes.push(expr);
        }
        for expr in &nodes {
            let from = out.index[&expr.id()];
            for (role, child) in expr.children() {
                let to = out.index[&child.id()];
                out.graph.add_edge(from, to, role);
            }
        }
        out
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn contains(&self, id: u32) -> bool {
        self.index.contains_key(&id)
    }

    pub fn is_acyclic(&self) -> bool {
        !is_cyclic_directed(&self.graph)
    }

    /// Node labels with every operand before its users.
    pub fn evaluation_order(&self) -> Vec<String> {
        match toposort(&self.graph, None) {
            Ok(order) => order
                .into_iter()
                .rev()
                .map(|i| self.graph[i].clone())
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Graphviz rendering.
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph kernel {\n    node [shape=box, fontname=monospace];\n");
        for idx in self.graph.node_indices() {
            out.push_str(&format!(
                "    n{} [label=\"{}\"];\n",
                idx.index(),
                escape(&self.graph[idx])
            ));
        }
        for edge in self.graph.raw_edges() {
            out.push_str(&format!(
                "    n{} -> n{} [label=\"{}\"];\n",
                edge.source().index(),
                edge.target().index(),
                edge.weight
            ));
        }
        out.push_str("}\n");
        out
    }
}

fn escape(label: &str) -> String {
    label.replace('\\', "\\\\").replace('"', "\\\"")
}
