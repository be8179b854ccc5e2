/*!

  Structural analyses of a logic network.

*/

use crate::error::NetworkError;
use crate::network::{GateId, Network, Source, TerminalId};
use std::collections::HashMap;
use std::collections::hash_map::Entry;

/// A common trait of analyses than can be performed on a network.
/// An analysis becomes stale when the network is rewired.
pub trait Analysis<'a>
where
    Self: Sized + 'a,
{
    /// Construct the analysis to the current state of the network.
    fn build(network: &'a Network) -> Result<Self, NetworkError>;
}

impl Network {
    /// Constructs an analysis of the network.
    pub fn get_analysis<'a, A: Analysis<'a>>(&'a self) -> Result<A, NetworkError> {
        A::build(self)
    }
}

/// A table that maps gates and terminals to the gates that consume them
pub struct FanOutTable<'a> {
    // A reference to the underlying network
    _network: &'a Network,
    /// Maps a gate to the gates it feeds, once per wired slot
    gate_fan_out: HashMap<GateId, Vec<GateId>>,
    /// Maps a terminal to the (gate, slot) pairs that read it
    terminal_fan_out: HashMap<TerminalId, Vec<(GateId, usize)>>,
}

impl FanOutTable<'_> {
    /// Returns an iterator to the gates that read the output of `gate`.
    pub fn get_gate_users(&self, gate: GateId) -> impl Iterator<Item = GateId> + '_ {
        self.gate_fan_out
            .get(&gate)
            .into_iter()
            .flat_map(|users| users.iter().copied())
    }

    /// Returns an iterator to the gate input slots that read `terminal`.
    pub fn get_terminal_users(
        &self,
        terminal: TerminalId,
    ) -> impl Iterator<Item = (GateId, usize)> + '_ {
        self.terminal_fan_out
            .get(&terminal)
            .into_iter()
            .flat_map(|users| users.iter().copied())
    }

    /// Returns the number of input slots fed by `gate`
    pub fn fan_out(&self, gate: GateId) -> usize {
        self.gate_fan_out.get(&gate).map_or(0, Vec::len)
    }

    /// Returns `true` if the output of `gate` feeds more than one slot
    pub fn is_shared(&self, gate: GateId) -> bool {
        self.fan_out(gate) > 1
    }
}

impl<'a> Analysis<'a> for FanOutTable<'a> {
    fn build(network: &'a Network) -> Result<Self, NetworkError> {
        let mut gate_fan_out: HashMap<GateId, Vec<GateId>> = HashMap::new();
        let mut terminal_fan_out: HashMap<TerminalId, Vec<(GateId, usize)>> = HashMap::new();

        for (id, gate) in network.gates() {
            for (slot, source) in gate.inputs().iter().enumerate() {
                match source {
                    Source::Gate(driver) => match gate_fan_out.entry(*driver) {
                        Entry::Vacant(e) => {
                            e.insert(vec![id]);
                        }
                        Entry::Occupied(mut e) => e.get_mut().push(id),
                    },
                    Source::Terminal(t) => terminal_fan_out.entry(*t).or_default().push((id, slot)),
                    Source::Empty => (),
                }
            }
        }

        Ok(FanOutTable {
            _network: network,
            gate_fan_out,
            terminal_fan_out,
        })
    }
}

/// The logic depth of every gate: the number of gates on the longest path
/// from a terminal to its output. It bounds the evaluator's recursion.
pub struct LogicDepth<'a> {
    // A reference to the underlying network
    _network: &'a Network,
    depth: HashMap<GateId, usize>,
    /// The maximum depth of the network
    max_depth: usize,
}

impl LogicDepth<'_> {
    /// Returns the logic depth of a gate.
    pub fn get_depth(&self, gate: GateId) -> Option<usize> {
        self.depth.get(&gate).copied()
    }

    /// Returns the maximum logic depth of the network.
    pub fn get_max_depth(&self) -> usize {
        self.max_depth
    }
}

/// Visit marks for the iterative post-order walk
#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Open,
    Done,
}

impl<'a> Analysis<'a> for LogicDepth<'a> {
    fn build(network: &'a Network) -> Result<Self, NetworkError> {
        let mut depth: HashMap<GateId, usize> = HashMap::new();
        let mut marks: HashMap<GateId, Mark> = HashMap::new();

        for (root, _) in network.gates() {
            if marks.contains_key(&root) {
                continue;
            }
            // (gate, drivers expanded)
            let mut stack = vec![(root, false)];
            while let Some((id, expanded)) = stack.pop() {
                let gate = network.gate(id)?;
                if expanded {
                    let d = gate
                        .drivers()
                        .filter_map(|g| depth.get(&g))
                        .max()
                        .copied()
                        .unwrap_or(0);
                    depth.insert(id, d + 1);
                    marks.insert(id, Mark::Done);
                    continue;
                }
                match marks.get(&id) {
                    Some(Mark::Done) => continue,
                    Some(Mark::Open) => {
                        return Err(NetworkError::CycleDetected(gate.get_name().to_string()));
                    }
                    None => (),
                }
                marks.insert(id, Mark::Open);
                stack.push((id, true));
                for driver in gate.drivers() {
                    match marks.get(&driver) {
                        Some(Mark::Done) => (),
                        Some(Mark::Open) => {
                            return Err(NetworkError::CycleDetected(
                                network.gate(driver)?.get_name().to_string(),
                            ));
                        }
                        None => stack.push((driver, false)),
                    }
                }
            }
        }

        let max_depth = depth.values().max().copied().unwrap_or(0);

        Ok(LogicDepth {
            _network: network,
            depth,
            max_depth,
        })
    }
}
