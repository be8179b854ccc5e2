/*!

  Diagram export: projects a network onto a petgraph graph and renders it as DOT.

  Gates become visible nodes labeled with their operator. Terminals are not drawn,
  but every input slot wired to a terminal and every output root gets an invisible
  anchor node, so the layout keeps room for the wires going in and out.

*/

use crate::circuit::{Identifier, Operator};
use crate::error::{ExportError, NetworkError};
use crate::network::{GateId, Network, OutputGroup, Source};
use petgraph::dot::{Config, Dot};
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::instrument;

/// A node of the diagram
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagramNode {
    /// A gate, drawn as a box labeled with its operator
    Gate {
        /// Name of the gate
        name: Identifier,
        /// Operator of the gate
        operator: Operator,
    },
    /// An invisible placeholder, unique per key
    Anchor(AnchorKey),
}

/// Where an anchor attaches: a gate name plus a slot on one of its sides
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AnchorKey {
    /// An input slot wired to a terminal
    Input(Identifier, usize),
    /// The position of a root in the output group
    Output(Identifier, usize),
}

impl std::fmt::Display for AnchorKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnchorKey::Input(gate, slot) => write!(f, "{gate} in {slot}"),
            AnchorKey::Output(gate, i) => write!(f, "{gate} out {i}"),
        }
    }
}

impl DiagramNode {
    /// Returns `true` if the node is drawn
    pub fn is_visible(&self) -> bool {
        matches!(self, DiagramNode::Gate { .. })
    }

    fn attributes(&self) -> String {
        match self {
            DiagramNode::Gate { name, operator } => format!(
                "label = \"{}\" shape = rectangle tooltip = \"{}\" ",
                operator,
                name.get_name().escape_default()
            ),
            DiagramNode::Anchor(key) => format!(
                "label = \"\" style = invis tooltip = \"{}\" ",
                key.to_string().escape_default()
            ),
        }
    }
}

impl std::fmt::Display for DiagramNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiagramNode::Gate { operator, .. } => std::fmt::Display::fmt(operator, f),
            DiagramNode::Anchor(key) => std::fmt::Display::fmt(key, f),
        }
    }
}

/// An edge of the diagram, pointing from producer to consumer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagramEdge {
    /// The output of one gate feeds an input slot of another
    Wire {
        /// The consumer's input slot
        slot: usize,
    },
    /// Connects a gate to an anchor
    Anchor,
}

impl std::fmt::Display for DiagramEdge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiagramEdge::Wire { slot } => write!(f, "{slot}"),
            DiagramEdge::Anchor => Ok(()),
        }
    }
}

/// The projected network, ready to be rendered
#[derive(Debug)]
pub struct Diagram {
    name: String,
    graph: DiGraph<DiagramNode, DiagramEdge>,
    gates: HashMap<GateId, NodeIndex>,
}

impl Diagram {
    /// Return a reference to the underlying graph
    pub fn get_graph(&self) -> &DiGraph<DiagramNode, DiagramEdge> {
        &self.graph
    }

    /// Returns the graph node of `gate`, if it was reachable from the roots
    pub fn node_of(&self, gate: GateId) -> Option<NodeIndex> {
        self.gates.get(&gate).copied()
    }

    /// Returns the number of visible nodes
    pub fn visible_count(&self) -> usize {
        self.graph
            .node_weights()
            .filter(|n| n.is_visible())
            .count()
    }

    /// Renders the diagram in the graphviz DOT language
    pub fn to_dot(&self) -> String {
        let dot = Dot::with_attr_getters(
            &self.graph,
            &[
                Config::GraphContentOnly,
                Config::NodeNoLabel,
                Config::EdgeNoLabel,
            ],
            &|_, edge| match edge.weight() {
                DiagramEdge::Wire { .. } => String::new(),
                DiagramEdge::Anchor => "arrowhead = none ".to_string(),
            },
            &|_, (_, node)| node.attributes(),
        );
        format!(
            "digraph \"{}\" {{\n    rankdir = LR;\n    splines = ortho;\n    node [shape = ellipse];\n{}}}\n",
            self.name.escape_default(),
            dot
        )
    }
}

/// Builds a [Diagram] for one export. Holds no state between exports.
pub struct Exporter<'a> {
    network: &'a Network,
    group: &'a OutputGroup,
}

impl<'a> Exporter<'a> {
    /// Creates an exporter rooted at `group`
    pub fn new(network: &'a Network, group: &'a OutputGroup) -> Self {
        Self { network, group }
    }

    /// Projects every gate reachable from the roots.
    pub fn build(&self) -> Result<Diagram, NetworkError> {
        let mut graph = DiGraph::new();
        let mut gates: HashMap<GateId, NodeIndex> = HashMap::new();
        let mut order = Vec::new();

        for root in self.group.iter() {
            self.network.gate(root)?;
            for id in self.network.dfs(root) {
                if gates.contains_key(&id) {
                    continue;
                }
                let gate = self.network.gate(id)?;
                let node = graph.add_node(DiagramNode::Gate {
                    name: gate.get_name().clone(),
                    operator: gate.get_operator(),
                });
                gates.insert(id, node);
                order.push(id);
            }
        }

        for id in order {
            let gate = self.network.gate(id)?;
            let consumer = gates[&id];
            for (slot, source) in gate.inputs().iter().enumerate() {
                match source {
                    Source::Gate(driver) => {
                        graph.add_edge(gates[driver], consumer, DiagramEdge::Wire { slot });
                    }
                    Source::Terminal(_) => {
                        let key = AnchorKey::Input(gate.get_name().clone(), slot);
                        let anchor = graph.add_node(DiagramNode::Anchor(key));
                        graph.add_edge(anchor, consumer, DiagramEdge::Anchor);
                    }
                    Source::Empty => (),
                }
            }
        }

        for (i, root) in self.group.iter().enumerate() {
            let name = self.network.gate(root)?.get_name().clone();
            let anchor = graph.add_node(DiagramNode::Anchor(AnchorKey::Output(name, i)));
            graph.add_edge(gates[&root], anchor, DiagramEdge::Anchor);
        }

        Ok(Diagram {
            name: self.network.get_name().to_string(),
            graph,
            gates,
        })
    }

    /// Builds the diagram and hands it to `renderer` to write `destination`.
    #[instrument(level = "debug", skip_all, fields(destination = %destination.as_ref().display()), err)]
    pub fn export(
        &self,
        destination: impl AsRef<Path>,
        renderer: &dyn Renderer,
    ) -> Result<(), ExportError> {
        let diagram = self.build()?;
        renderer.render(&diagram.to_dot(), destination.as_ref())
    }
}

/// A graph-rendering service that turns DOT text into an artifact on disk
pub trait Renderer {
    /// Writes the rendering of `dot` to `destination`
    fn render(&self, dot: &str, destination: &Path) -> Result<(), ExportError>;
}

/// Writes the DOT text itself
#[derive(Debug, Clone, Copy, Default)]
pub struct DotFileRenderer;

impl Renderer for DotFileRenderer {
    fn render(&self, dot: &str, destination: &Path) -> Result<(), ExportError> {
        std::fs::write(destination, dot).map_err(|source| ExportError::Io {
            path: destination.display().to_string(),
            source,
        })
    }
}

/// Runs an external graphviz layout program, `dot -Tsvg` by default
#[derive(Debug, Clone)]
pub struct GraphvizRenderer {
    program: String,
    format: String,
}

impl Default for GraphvizRenderer {
    fn default() -> Self {
        Self {
            program: "dot".to_string(),
            format: "svg".to_string(),
        }
    }
}

impl GraphvizRenderer {
    /// Creates a renderer running `program` with output format `format`
    pub fn new(program: String, format: String) -> Self {
        Self { program, format }
    }
}

impl Renderer for GraphvizRenderer {
    fn render(&self, dot: &str, destination: &Path) -> Result<(), ExportError> {
        let io_err = |source| ExportError::Io {
            path: destination.display().to_string(),
            source,
        };
        let mut child = Command::new(&self.program)
            .arg(format!("-T{}", self.format))
            .arg("-o")
            .arg(destination)
            .stdin(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ExportError::Renderer {
                program: self.program.clone(),
                message: e.to_string(),
            })?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(dot.as_bytes()).map_err(io_err)?;
        }
        let output = child.wait_with_output().map_err(io_err)?;
        if !output.status.success() {
            return Err(ExportError::Renderer {
                program: self.program.clone(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

/// Writes the diagram of `group` as a DOT file at `destination`.
pub fn export_diagram(
    network: &Network,
    group: &OutputGroup,
    destination: impl AsRef<Path>,
) -> Result<(), ExportError> {
    Exporter::new(network, group).export(destination, &DotFileRenderer)
}
