use std::fmt::Write;

use super::Node;

const START: &str = "__start__";
const END: &str = "__end__";

/// An edge between two nodes, by name.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Edge {
    /// Source node.
    pub from: &'static str,
    /// Target node.
    pub to: &'static str,
    /// `true` if the edge is taken only when its condition holds.
    pub conditional: bool,
}

/// The shape of the research graph, for display.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Topology {
    /// Node names, including the `__start__` and `__end__` markers.
    pub nodes: Vec<&'static str>,
    /// Edges, in declaration order.
    pub edges: Vec<Edge>,
}

impl Topology {
    pub(super) fn research() -> Self {
        let edge = |from, to, conditional| Edge {
            from,
            to,
            conditional,
        };
        let call_model = Node::CallModel.name();
        let web_search = Node::WebSearch.name();
        let final_answer = Node::FinalAnswer.name();
        Self {
            nodes: vec![START, call_model, web_search, final_answer, END],
            edges: vec![
                edge(START, call_model, false),
                edge(call_model, web_search, true),
                edge(call_model, final_answer, true),
                edge(web_search, call_model, false),
                edge(final_answer, END, false),
            ],
        }
    }

    /// Renders the graph as a Mermaid flowchart.
    pub fn to_mermaid(&self) -> String {
        let mut out = String::from("graph TD;\n");
        for node in &self.nodes {
            // `write!` into a `String` cannot fail.
            let _ = if *node == START || *node == END {
                writeln!(out, "\t{node}([{node}])")
            } else {
                writeln!(out, "\t{node}({node})")
            };
        }
        for edge in &self.edges {
            let arrow = if edge.conditional { "-.->" } else { "-->" };
            let _ = writeln!(out, "\t{} {arrow} {};", edge.from, edge.to);
        }
        out
    }
}
