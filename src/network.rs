/*!

  API for building a logic network.

  A [Network] is an arena: it owns every [Gate] and [Terminal] it allocates,
  and hands out [GateId] and [TerminalId] handles. Input slots hold a [Source],
  which refers to other objects only through these handles, so a gate can feed
  any number of consumers without being copied.

*/

use crate::{
    circuit::{Identifier, Operator, Status, Terminal, TerminalKind},
    error::{Handle, NetworkError},
};
use bitvec::vec::BitVec;
use std::collections::{HashMap, HashSet};

/// A handle to a gate owned by a [Network]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
pub struct GateId(usize);

impl GateId {
    /// Returns the position of the gate in the arena
    pub fn index(&self) -> usize {
        self.0
    }
}

impl std::fmt::Display for GateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "g{}", self.0)
    }
}

/// A handle to a terminal owned by a [Network]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
pub struct TerminalId(usize);

impl TerminalId {
    /// Returns the position of the terminal in the arena
    pub fn index(&self) -> usize {
        self.0
    }
}

impl std::fmt::Display for TerminalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// The content of an input slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Source {
    /// Reads the value of a terminal
    Terminal(TerminalId),
    /// Reads the canonical output of another gate
    Gate(GateId),
    /// Declared but never wired
    #[default]
    Empty,
}

impl Source {
    /// Returns the driving gate, if the slot is wired to one
    pub fn as_gate(&self) -> Option<GateId> {
        match self {
            Source::Gate(id) => Some(*id),
            _ => None,
        }
    }

    /// Returns `true` if the slot was never wired
    pub fn is_empty(&self) -> bool {
        matches!(self, Source::Empty)
    }
}

impl From<GateId> for Source {
    fn from(id: GateId) -> Self {
        Source::Gate(id)
    }
}

impl From<TerminalId> for Source {
    fn from(id: TerminalId) -> Self {
        Source::Terminal(id)
    }
}

/// A logic operator with a fixed number of input and output slots
#[derive(Debug, Clone)]
pub struct Gate {
    operator: Operator,
    name: Identifier,
    /// Free-form tag carried into evaluation records, like "SUM" or "CARRY"
    label: Option<String>,
    /// Input slots, order matters
    inputs: Vec<Source>,
    /// Output slots, order matters. The first one is canonical.
    outputs: Vec<TerminalId>,
    next_input_index: usize,
    next_output_index: usize,
    status: Status,
    cached_result: bool,
    /// Number of input slots reading this gate
    users: usize,
}

impl Gate {
    /// Returns the operator computed by this gate
    pub fn get_operator(&self) -> Operator {
        self.operator
    }

    /// Returns the name of the gate
    pub fn get_name(&self) -> &Identifier {
        &self.name
    }

    /// Returns the optional label of the gate
    pub fn get_label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Returns the input slots in declaration order
    pub fn inputs(&self) -> &[Source] {
        &self.inputs
    }

    /// Returns the output terminals in declaration order
    pub fn outputs(&self) -> &[TerminalId] {
        &self.outputs
    }

    /// Returns the canonical output terminal
    pub fn get_output(&self) -> TerminalId {
        self.outputs[0]
    }

    /// Returns the number of declared input slots
    pub fn get_input_arity(&self) -> usize {
        self.inputs.len()
    }

    /// Returns the number of declared output slots
    pub fn get_output_arity(&self) -> usize {
        self.outputs.len()
    }

    /// Returns the number of input slots wired so far
    pub fn get_connected_inputs(&self) -> usize {
        self.next_input_index
    }

    /// Returns `true` if every input slot is wired
    pub fn is_fully_connected(&self) -> bool {
        self.inputs.iter().all(|s| !s.is_empty())
    }

    /// Returns the evaluation status
    pub fn get_status(&self) -> Status {
        self.status
    }

    /// Returns the memoized result, if the gate was evaluated
    pub fn get_result(&self) -> Option<bool> {
        (self.status == Status::Evaluated).then_some(self.cached_result)
    }

    pub(crate) fn set_status(&mut self, status: Status) {
        self.status = status;
    }

    pub(crate) fn settle(&mut self, result: bool) {
        self.cached_result = result;
        self.status = Status::Evaluated;
    }

    /// Iterator to the gates wired into this one
    pub fn drivers(&self) -> impl Iterator<Item = GateId> + '_ {
        self.inputs.iter().filter_map(Source::as_gate)
    }
}

/// The ordered roots of a network that are observed from the outside
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputGroup {
    roots: Vec<GateId>,
}

impl OutputGroup {
    /// Creates an empty group
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a root gate
    pub fn push(&mut self, gate: GateId) {
        self.roots.push(gate);
    }

    /// Returns the roots in order
    pub fn roots(&self) -> &[GateId] {
        &self.roots
    }

    /// Returns the number of roots
    pub fn len(&self) -> usize {
        self.roots.len()
    }

    /// Returns `true` if there are no roots
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Iterator to the roots
    pub fn iter(&self) -> impl Iterator<Item = GateId> + '_ {
        self.roots.iter().copied()
    }
}

impl FromIterator<GateId> for OutputGroup {
    fn from_iter<T: IntoIterator<Item = GateId>>(iter: T) -> Self {
        Self {
            roots: iter.into_iter().collect(),
        }
    }
}

impl From<Vec<GateId>> for OutputGroup {
    fn from(roots: Vec<GateId>) -> Self {
        Self { roots }
    }
}

/// A combinational logic network
#[derive(Debug, Clone)]
pub struct Network {
    /// The name of the network
    name: String,
    gates: Vec<Gate>,
    terminals: Vec<Terminal>,
    /// Terminals allocated by [Network::create_terminal] rather than by a gate
    external: HashSet<TerminalId>,
    names: HashMap<Identifier, GateId>,
    /// The gate writing each output terminal
    drivers: HashMap<TerminalId, GateId>,
}

impl Network {
    /// Creates a new, empty network with the given name
    pub fn new(name: String) -> Self {
        Self {
            name,
            gates: Vec::new(),
            terminals: Vec::new(),
            external: HashSet::new(),
            names: HashMap::new(),
            drivers: HashMap::new(),
        }
    }

    /// Returns the name of the network
    pub fn get_name(&self) -> &str {
        &self.name
    }

    fn alloc_terminal(&mut self, kind: TerminalKind, value: bool) -> TerminalId {
        let id = TerminalId(self.terminals.len());
        self.terminals.push(Terminal::new(kind, value));
        id
    }

    /// Allocates a terminal holding `initial_value`
    pub fn create_terminal(&mut self, kind: TerminalKind, initial_value: bool) -> TerminalId {
        let id = self.alloc_terminal(kind, initial_value);
        self.external.insert(id);
        id
    }

    /// Allocates a primary input
    pub fn create_input(&mut self, value: bool) -> TerminalId {
        self.create_terminal(TerminalKind::Input, value)
    }

    /// Allocates an output pin that a gate can be made to drive
    pub fn create_output(&mut self) -> TerminalId {
        self.create_terminal(TerminalKind::Output, false)
    }

    /// Allocates a gate with empty input slots and fresh output terminals.
    ///
    /// Fails if the name is taken, if no output is declared,
    /// or if a [Operator::Not] gate is not declared with exactly one input.
    pub fn create_gate(
        &mut self,
        operator: Operator,
        input_arity: usize,
        output_arity: usize,
        name: Identifier,
    ) -> Result<GateId, NetworkError> {
        if output_arity == 0 || (operator.is_unary() && input_arity != 1) {
            return Err(NetworkError::InvalidArity {
                gate: name.to_string(),
                inputs: input_arity,
                outputs: output_arity,
            });
        }
        if self.names.contains_key(&name) {
            return Err(NetworkError::DuplicateName(name.to_string()));
        }

        let id = GateId(self.gates.len());
        let outputs: Vec<TerminalId> = (0..output_arity)
            .map(|_| self.alloc_terminal(TerminalKind::Output, false))
            .collect();
        for t in outputs.iter() {
            self.drivers.insert(*t, id);
        }
        self.gates.push(Gate {
            operator,
            name: name.clone(),
            label: None,
            inputs: vec![Source::Empty; input_arity],
            outputs,
            next_input_index: 0,
            next_output_index: 0,
            status: Status::NotEvaluated,
            cached_result: false,
            users: 0,
        });
        self.names.insert(name, id);
        tracing::debug!(gate = %self.gates[id.0].name, %operator, input_arity, output_arity, "created gate");
        Ok(id)
    }

    /// Creates a single-output gate and wires `sources` into it, in order
    pub fn insert_gate(
        &mut self,
        operator: Operator,
        name: Identifier,
        sources: &[Source],
    ) -> Result<GateId, NetworkError> {
        let id = self.create_gate(operator, sources.len(), 1, name)?;
        for source in sources {
            self.connect_source(id, *source)?;
        }
        Ok(id)
    }

    /// Attaches a free-form label to a gate
    pub fn set_label(&mut self, gate: GateId, label: String) -> Result<(), NetworkError> {
        self.gate_mut(gate)?.label = Some(label);
        Ok(())
    }

    /// Wires a terminal to `gate`.
    ///
    /// An input terminal fills the next free input slot. An output terminal
    /// replaces the gate's own terminal at the next output slot, so the caller's
    /// terminal becomes the one the evaluator writes. An output terminal can
    /// only ever have one driver.
    pub fn connect_terminal(
        &mut self,
        gate: GateId,
        terminal: TerminalId,
    ) -> Result<(), NetworkError> {
        let kind = self.terminal(terminal)?.get_kind();
        let g = self.gate(gate)?;
        let (slot, arity) = match kind {
            TerminalKind::Input => (g.next_input_index, g.inputs.len()),
            TerminalKind::Output => (g.next_output_index, g.outputs.len()),
        };
        if slot >= arity {
            return Err(NetworkError::SlotOverflow {
                gate: g.name.to_string(),
                kind: match kind {
                    TerminalKind::Input => "input",
                    TerminalKind::Output => "output",
                },
                arity,
            });
        }

        match kind {
            TerminalKind::Input => {
                let g = self.gate_mut(gate)?;
                g.inputs[slot] = Source::Terminal(terminal);
                g.next_input_index += 1;
                tracing::debug!(gate = %g.name, slot, %terminal, "connected input terminal");
            }
            TerminalKind::Output => {
                if let Some(driver) = self.drivers.get(&terminal) {
                    return Err(NetworkError::MultipleDrivers {
                        terminal,
                        driver: self.gate(*driver)?.name.to_string(),
                    });
                }
                let g = self.gate_mut(gate)?;
                let replaced = std::mem::replace(&mut g.outputs[slot], terminal);
                g.next_output_index += 1;
                tracing::debug!(gate = %g.name, slot, %terminal, "connected output terminal");
                self.drivers.remove(&replaced);
                self.drivers.insert(terminal, gate);
            }
        }
        Ok(())
    }

    /// Wires the canonical output of `source` into the next free input slot of `consumer`.
    /// Fails if the connection would close a loop.
    pub fn connect_gate(&mut self, consumer: GateId, source: GateId) -> Result<(), NetworkError> {
        self.gate(source)?;
        let c = self.gate(consumer)?;
        if c.next_input_index >= c.inputs.len() {
            return Err(NetworkError::SlotOverflow {
                gate: c.name.to_string(),
                kind: "input",
                arity: c.inputs.len(),
            });
        }
        // A gate nobody reads cannot lie upstream of `source`
        let closes_loop = source == consumer
            || (c.users > 0 && self.dfs(source).any(|g| g == consumer));
        if closes_loop {
            return Err(NetworkError::CycleDetected(c.name.to_string()));
        }

        let c = self.gate_mut(consumer)?;
        let slot = c.next_input_index;
        c.inputs[slot] = Source::Gate(source);
        c.next_input_index += 1;
        tracing::debug!(gate = %c.name, slot, %source, "connected gate");
        self.gate_mut(source)?.users += 1;
        Ok(())
    }

    /// Wires any [Source] into the next free input slot of `gate`
    pub fn connect_source(&mut self, gate: GateId, source: Source) -> Result<(), NetworkError> {
        match source {
            Source::Terminal(t) => self.connect_terminal(gate, t),
            Source::Gate(g) => self.connect_gate(gate, g),
            Source::Empty => {
                let g = self.gate_mut(gate)?;
                if g.next_input_index >= g.inputs.len() {
                    return Err(NetworkError::SlotOverflow {
                        gate: g.name.to_string(),
                        kind: "input",
                        arity: g.inputs.len(),
                    });
                }
                g.next_input_index += 1;
                Ok(())
            }
        }
    }
}

impl Network {
    /// Returns the gate behind `id`
    pub fn gate(&self, id: GateId) -> Result<&Gate, NetworkError> {
        self.gates
            .get(id.0)
            .ok_or(NetworkError::NullReference(Handle::Gate(id)))
    }

    pub(crate) fn gate_mut(&mut self, id: GateId) -> Result<&mut Gate, NetworkError> {
        self.gates
            .get_mut(id.0)
            .ok_or(NetworkError::NullReference(Handle::Gate(id)))
    }

    /// Returns the terminal behind `id`
    pub fn terminal(&self, id: TerminalId) -> Result<&Terminal, NetworkError> {
        self.terminals
            .get(id.0)
            .ok_or(NetworkError::NullReference(Handle::Terminal(id)))
    }

    pub(crate) fn terminal_mut(&mut self, id: TerminalId) -> Result<&mut Terminal, NetworkError> {
        self.terminals
            .get_mut(id.0)
            .ok_or(NetworkError::NullReference(Handle::Terminal(id)))
    }

    /// Looks a gate up by name
    pub fn find_gate(&self, name: &str) -> Option<GateId> {
        self.names.get(&Identifier::from(name)).copied()
    }

    /// Returns the gate that writes `terminal`, if any
    pub fn driver_of(&self, terminal: TerminalId) -> Option<GateId> {
        self.drivers.get(&terminal).copied()
    }

    /// Returns the value of the canonical output terminal of `gate`
    pub fn output_value(&self, gate: GateId) -> Result<bool, NetworkError> {
        let t = self.gate(gate)?.get_output();
        Ok(self.terminal(t)?.get_value())
    }

    /// Iterator over all gates with their handles
    pub fn gates(&self) -> impl Iterator<Item = (GateId, &Gate)> {
        self.gates.iter().enumerate().map(|(i, g)| (GateId(i), g))
    }

    /// Iterator over all terminals with their handles
    pub fn terminals(&self) -> impl Iterator<Item = (TerminalId, &Terminal)> {
        self.terminals
            .iter()
            .enumerate()
            .map(|(i, t)| (TerminalId(i), t))
    }

    /// Iterator over the primary inputs
    pub fn inputs(&self) -> impl Iterator<Item = TerminalId> + '_ {
        self.terminals()
            .filter(|(_, t)| t.is_an_input())
            .map(|(id, _)| id)
    }

    /// Returns the values of the primary inputs, in allocation order
    pub fn input_values(&self) -> BitVec {
        self.terminals
            .iter()
            .filter(|t| t.is_an_input())
            .map(Terminal::get_value)
            .collect()
    }

    /// Returns the number of gates
    pub fn gate_count(&self) -> usize {
        self.gates.len()
    }

    /// Returns a depth-first search iterator over the gates reachable from `from`.
    pub fn dfs(&self, from: GateId) -> iter::DFSIterator<'_> {
        iter::DFSIterator::new(self, from)
    }

    /// Overwrites an input slot without any check
    #[cfg(test)]
    pub(crate) fn rewire_unchecked(&mut self, gate: GateId, slot: usize, source: Source) {
        if let Source::Gate(driver) = source {
            self.gates[driver.0].users += 1;
        }
        self.gates[gate.0].inputs[slot] = source;
    }

    /// Returns `true` if `terminal` was allocated by the caller rather than by a gate
    fn is_external(&self, terminal: TerminalId) -> bool {
        self.external.contains(&terminal)
    }
}

/// Iterators over a network
pub mod iter {
    use super::{GateId, Network};
    use std::collections::HashSet;

    /// A depth-first, pre-order iterator over the gates feeding a root.
    /// Each gate is visited once, even when it fans out to several consumers.
    /// Handles that do not resolve are skipped.
    pub struct DFSIterator<'a> {
        network: &'a Network,
        stack: Vec<GateId>,
        visited: HashSet<GateId>,
    }

    impl<'a> DFSIterator<'a> {
        /// Create a new DFS iterator for the network starting at `from`.
        pub fn new(network: &'a Network, from: GateId) -> Self {
            Self {
                network,
                stack: vec![from],
                visited: HashSet::new(),
            }
        }
    }

    impl Iterator for DFSIterator<'_> {
        type Item = GateId;

        fn next(&mut self) -> Option<Self::Item> {
            while let Some(id) = self.stack.pop() {
                if !self.visited.insert(id) {
                    continue;
                }
                let Ok(gate) = self.network.gate(id) else {
                    continue;
                };
                // Reverse so the first input slot is visited first
                let drivers: Vec<GateId> = gate.drivers().collect();
                self.stack.extend(drivers.into_iter().rev());
                return Some(id);
            }
            None
        }
    }
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Internal output terminals are named after the gate driving them
        let mut net_names: HashMap<TerminalId, String> = HashMap::new();
        for (id, _) in self.terminals() {
            if self.is_external(id) {
                net_names.insert(id, id.to_string());
            }
        }
        for gate in self.gates.iter() {
            for (i, t) in gate.outputs.iter().enumerate() {
                net_names
                    .entry(*t)
                    .or_insert_with(|| crate::format_id!("{}_y{}", gate.name.get_name(), i).emit_name());
            }
        }
        let net = |t: &TerminalId| net_names.get(t).cloned().unwrap_or_else(|| t.to_string());

        let inputs: Vec<TerminalId> = self.inputs().collect();
        let outputs: Vec<TerminalId> = self
            .gates
            .iter()
            .flat_map(|g| g.outputs.iter().copied())
            .filter(|t| self.is_external(*t))
            .collect();

        writeln!(f, "module {} (", self.name)?;
        let level = 2;
        let indent = " ".repeat(level);
        let ports: Vec<&TerminalId> = inputs.iter().chain(outputs.iter()).collect();
        for (i, port) in ports.iter().enumerate() {
            if i == ports.len() - 1 {
                writeln!(f, "{}{}", indent, net(*port))?;
            } else {
                writeln!(f, "{}{},", indent, net(*port))?;
            }
        }
        writeln!(f, ");")?;

        for t in inputs.iter() {
            writeln!(f, "{}input {};", indent, net(t))?;
        }
        for t in outputs.iter() {
            writeln!(f, "{}output {};", indent, net(t))?;
        }
        for gate in self.gates.iter() {
            for t in gate.outputs.iter().filter(|t| !self.is_external(**t)) {
                writeln!(f, "{}wire {};", indent, net(t))?;
            }
        }

        for gate in self.gates.iter() {
            let canonical = net(&gate.outputs[0]);
            let operands: Vec<String> = gate
                .inputs
                .iter()
                .map(|s| match s {
                    Source::Terminal(t) => net(t),
                    Source::Gate(g) => net(&self.gates[g.0].outputs[0]),
                    Source::Empty => "1'bx".to_string(),
                })
                .collect();
            write!(
                f,
                "{}{} {} ({}",
                indent,
                gate.operator.primitive(),
                gate.name.emit_name(),
                canonical
            )?;
            for operand in operands {
                write!(f, ", {operand}")?;
            }
            writeln!(f, ");")?;
            for t in gate.outputs.iter().skip(1) {
                writeln!(f, "{}assign {} = {};", indent, net(t), canonical)?;
            }
        }

        writeln!(f, "endmodule")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_gate_allocates_outputs() {
        let mut network = Network::new("alloc".to_string());
        let g = network
            .create_gate(Operator::And, 2, 2, "g".into())
            .unwrap();
        let gate = network.gate(g).unwrap();
        assert_eq!(gate.get_input_arity(), 2);
        assert_eq!(gate.get_output_arity(), 2);
        assert!(gate.inputs().iter().all(Source::is_empty));
        assert_ne!(gate.outputs()[0], gate.outputs()[1]);
        assert_eq!(gate.get_status(), Status::NotEvaluated);
        assert_eq!(gate.get_result(), None);
    }

    #[test]
    fn output_terminal_replaces_internal() {
        let mut network = Network::new("replace".to_string());
        let a = network.create_input(true);
        let out = network.create_output();
        let g = network.create_gate(Operator::Not, 1, 1, "inv".into()).unwrap();
        let internal = network.gate(g).unwrap().get_output();
        network.connect_terminal(g, a).unwrap();
        network.connect_terminal(g, out).unwrap();
        assert_ne!(internal, out);
        assert_eq!(network.gate(g).unwrap().get_output(), out);
        assert!(network.is_external(out));
        assert!(!network.is_external(internal));
        assert_eq!(network.driver_of(out), Some(g));
        assert_eq!(network.driver_of(internal), None);
    }

    #[test]
    fn rejected_wiring_keeps_previous_slots() {
        let mut network = Network::new("keep".to_string());
        let a = network.create_input(true);
        let b = network.create_input(false);
        let c = network.create_input(true);
        let g = network.create_gate(Operator::Or, 2, 1, "g".into()).unwrap();
        network.connect_terminal(g, a).unwrap();
        network.connect_terminal(g, b).unwrap();
        assert!(matches!(
            network.connect_terminal(g, c),
            Err(NetworkError::SlotOverflow { arity: 2, .. })
        ));
        let gate = network.gate(g).unwrap();
        assert_eq!(gate.inputs(), &[Source::Terminal(a), Source::Terminal(b)]);
        assert_eq!(gate.get_connected_inputs(), 2);
    }

    #[test]
    fn self_loop_is_rejected() {
        let mut network = Network::new("loop".to_string());
        let g = network.create_gate(Operator::And, 2, 1, "g".into()).unwrap();
        assert_eq!(
            network.connect_gate(g, g),
            Err(NetworkError::CycleDetected("g".to_string()))
        );
        assert!(network.gate(g).unwrap().inputs().iter().all(Source::is_empty));
    }

    #[test]
    fn dfs_visits_shared_gate_once() {
        let mut network = Network::new("shared".to_string());
        let a = network.create_input(true);
        let shared = network.insert_gate(Operator::Not, "s".into(), &[a.into()]).unwrap();
        let left = network
            .insert_gate(Operator::And, "l".into(), &[shared.into(), a.into()])
            .unwrap();
        let right = network
            .insert_gate(Operator::Or, "r".into(), &[shared.into(), a.into()])
            .unwrap();
        let top = network
            .insert_gate(Operator::Xor, "top".into(), &[left.into(), right.into()])
            .unwrap();
        let order: Vec<GateId> = network.dfs(top).collect();
        assert_eq!(order, vec![top, left, shared, right]);
    }
}
