/*!

  Memoized evaluation of a logic network.

  Each gate is computed at most once. The first evaluation folds its inputs
  left to right, starting from the operator identity, writes the result to every
  output terminal and caches it on the gate. Later evaluations, including those
  reached through another consumer of a shared gate, read the cached value.

*/

use crate::{
    circuit::{Operator, Status},
    error::NetworkError,
    network::{GateId, Network, OutputGroup, Source},
    sink::{EvalRecord, EvalSink, TracingSink},
};
use bitvec::vec::BitVec;
use tracing::instrument;

/// Evaluation settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvalConfig {
    /// Maximum evaluation depth, counted in gates from the root.
    pub max_depth: usize,
    /// Treat unwired input slots as contributing nothing. When `false`,
    /// evaluating a gate with an empty slot fails with [NetworkError::UnwiredInput].
    pub allow_unwired: bool,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            max_depth: 1024,
            allow_unwired: true,
        }
    }
}

impl EvalConfig {
    /// Create settings with custom values.
    pub fn new(max_depth: usize, allow_unwired: bool) -> Self {
        Self {
            max_depth,
            allow_unwired,
        }
    }

    /// Every input slot must be wired.
    pub fn strict() -> Self {
        Self {
            allow_unwired: false,
            ..Self::default()
        }
    }

    /// Deep networks and unwired slots are accepted.
    pub fn permissive() -> Self {
        Self {
            max_depth: 16 * 1024,
            allow_unwired: true,
        }
    }
}

/// Walks a [Network] and computes gate outputs, reporting each computed gate to a sink.
pub struct Evaluator<'a, S: EvalSink = TracingSink> {
    network: &'a mut Network,
    config: EvalConfig,
    sink: S,
}

impl<'a> Evaluator<'a> {
    /// Creates an evaluator with default settings that reports through `tracing`
    pub fn new(network: &'a mut Network) -> Self {
        Self {
            network,
            config: EvalConfig::default(),
            sink: TracingSink,
        }
    }
}

impl<'a, S> Evaluator<'a, S>
where
    S: EvalSink,
{
    /// Replaces the record sink
    pub fn with_sink<T: EvalSink>(self, sink: T) -> Evaluator<'a, T> {
        Evaluator {
            network: self.network,
            config: self.config,
            sink,
        }
    }

    /// Replaces the settings
    pub fn with_config(mut self, config: EvalConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns the network being evaluated
    pub fn network(&self) -> &Network {
        self.network
    }

    /// Returns the sink
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Consumes the evaluator and returns its sink
    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Computes the canonical output of `gate`, evaluating its sources first when needed.
    /// Calling it again on an evaluated gate returns the cached result.
    #[instrument(level = "debug", skip(self), err)]
    pub fn evaluate(&mut self, gate: GateId) -> Result<bool, NetworkError> {
        self.eval_gate(gate)
    }

    /// Evaluates each root of `group` in order and returns one bit per root.
    /// Fails before touching the network if any root does not resolve.
    #[instrument(level = "debug", skip_all, fields(roots = group.len()), err)]
    pub fn evaluate_outputs(&mut self, group: &OutputGroup) -> Result<BitVec, NetworkError> {
        for root in group.iter() {
            self.network.gate(root)?;
        }
        let mut results = BitVec::with_capacity(group.len());
        for root in group.iter() {
            results.push(self.eval_gate(root)?);
        }
        Ok(results)
    }

    /// Evaluates `root` with an explicit work stack. Each frame is a gate whose
    /// slots are being folded; a slot fed by an unevaluated gate pushes that gate
    /// and is revisited once it has settled.
    fn eval_gate(&mut self, root: GateId) -> Result<bool, NetworkError> {
        let mut stack: Vec<Frame> = Vec::new();
        let outcome = match self.enter(root, 0, &mut stack) {
            Ok(Some(cached)) => Ok(cached),
            Ok(None) => self.run(&mut stack),
            Err(e) => Err(e),
        };
        if outcome.is_err() {
            // Unfinished gates go back to being untouched
            for frame in stack {
                if let Ok(gate) = self.network.gate_mut(frame.id) {
                    gate.set_status(Status::NotEvaluated);
                }
            }
        }
        outcome
    }

    /// Returns the cached value of `id`, or pushes a frame for it.
    fn enter(
        &mut self,
        id: GateId,
        depth: usize,
        stack: &mut Vec<Frame>,
    ) -> Result<Option<bool>, NetworkError> {
        if depth > self.config.max_depth {
            return Err(NetworkError::DepthExceeded(self.config.max_depth));
        }
        let gate = self.network.gate(id)?;
        match gate.get_status() {
            Status::Evaluated => return Ok(Some(gate.get_result().unwrap_or_default())),
            Status::InProgress => {
                return Err(NetworkError::CycleDetected(gate.get_name().to_string()));
            }
            Status::NotEvaluated => (),
        }
        if !self.config.allow_unwired {
            if let Some(slot) = gate.inputs().iter().position(Source::is_empty) {
                return Err(NetworkError::UnwiredInput {
                    gate: gate.get_name().to_string(),
                    slot,
                });
            }
        }

        let operator = gate.get_operator();
        let arity = gate.get_input_arity();
        self.network.gate_mut(id)?.set_status(Status::InProgress);
        stack.push(Frame {
            id,
            depth,
            operator,
            slot: 0,
            result: operator.identity(),
            operands: Vec::with_capacity(arity),
        });
        Ok(None)
    }

    fn run(&mut self, stack: &mut Vec<Frame>) -> Result<bool, NetworkError> {
        let mut last = false;
        while let Some(frame) = stack.last() {
            let (id, depth, slot) = (frame.id, frame.depth, frame.slot);
            let source = self.network.gate(id)?.inputs().get(slot).copied();
            let Some(source) = source else {
                if let Some(frame) = stack.pop() {
                    last = self.settle(frame)?;
                }
                continue;
            };
            let operand = match source {
                Source::Gate(s) => match self.enter(s, depth + 1, stack)? {
                    Some(value) => Some(value),
                    // Come back to this slot once `s` has settled
                    None => continue,
                },
                Source::Terminal(t) => Some(self.network.terminal(t)?.get_value()),
                Source::Empty => None,
            };
            if let Some(frame) = stack.last_mut() {
                frame.take(operand);
            }
        }
        Ok(last)
    }

    fn settle(&mut self, frame: Frame) -> Result<bool, NetworkError> {
        let Frame {
            id,
            operator,
            result,
            operands,
            ..
        } = frame;
        let gate = self.network.gate(id)?;
        let outputs = gate.outputs().to_vec();
        let record = EvalRecord {
            gate: gate.get_name().clone(),
            label: gate.get_label().map(str::to_string),
            operator,
            inputs: operands,
            output: result,
        };
        for t in outputs {
            self.network.terminal_mut(t)?.drive(result);
        }
        self.network.gate_mut(id)?.settle(result);
        tracing::trace!(gate = %record.gate, result, "settled gate");

        if let Err(e) = self.sink.record(&record) {
            tracing::warn!(gate = %record.gate, error = %e, "evaluation sink failed");
        }
        Ok(result)
    }
}

/// A gate whose input slots are being folded
struct Frame {
    id: GateId,
    /// Distance from the root
    depth: usize,
    operator: Operator,
    /// Next slot to read
    slot: usize,
    result: bool,
    operands: Vec<Option<bool>>,
}

impl Frame {
    fn take(&mut self, operand: Option<bool>) {
        if let Some(v) = operand {
            self.result = self.operator.combine(self.result, v);
        }
        self.operands.push(operand);
        self.slot += 1;
    }
}

impl Network {
    /// Evaluates `gate` with default settings, reporting through `tracing`.
    pub fn evaluate(&mut self, gate: GateId) -> Result<bool, NetworkError> {
        Evaluator::new(self).evaluate(gate)
    }

    /// Evaluates every root of `group` with default settings, reporting through `tracing`.
    pub fn evaluate_outputs(&mut self, group: &OutputGroup) -> Result<BitVec, NetworkError> {
        Evaluator::new(self).evaluate_outputs(group)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::{NullSink, RecordingSink};

    fn inverter_chain(length: usize) -> (Network, GateId) {
        let mut network = Network::new("chain".to_string());
        let a = network.create_input(false);
        let mut last = network
            .insert_gate(Operator::Not, "n0".into(), &[a.into()])
            .unwrap();
        for i in 1..length {
            last = network
                .insert_gate(Operator::Not, format!("n{i}").into(), &[last.into()])
                .unwrap();
        }
        (network, last)
    }

    fn truth(operator: Operator, values: &[bool]) -> bool {
        let mut network = Network::new("truth".to_string());
        let sources: Vec<Source> = values
            .iter()
            .map(|v| network.create_input(*v).into())
            .collect();
        let g = network
            .insert_gate(operator, "g".into(), &sources)
            .unwrap();
        network.evaluate(g).unwrap()
    }

    #[test]
    fn truth_tables() {
        assert!(truth(Operator::And, &[true, true]));
        assert!(!truth(Operator::And, &[true, false]));
        assert!(!truth(Operator::Or, &[false, false]));
        assert!(truth(Operator::Or, &[true, false]));
        assert!(!truth(Operator::Xor, &[true, true]));
        assert!(truth(Operator::Xor, &[true, false]));
        assert!(truth(Operator::Not, &[false]));
        assert!(!truth(Operator::Not, &[true]));
    }

    #[test]
    fn wide_gates_fold_left_to_right() {
        assert!(truth(Operator::Xor, &[true, true, true]));
        assert!(!truth(Operator::And, &[true, true, true, false]));
        assert!(truth(Operator::Or, &[false, false, false, true]));
    }

    #[test]
    fn loop_is_caught_while_evaluating() {
        let mut network = Network::new("loop".to_string());
        let a = network.create_input(true);
        let g = network.create_gate(Operator::And, 2, 1, "g".into()).unwrap();
        let h = network
            .insert_gate(Operator::Or, "h".into(), &[g.into(), a.into()])
            .unwrap();
        network.connect_terminal(g, a).unwrap();
        // Bypass the wiring check to close the loop g -> h -> g
        network.rewire_unchecked(g, 1, Source::Gate(h));
        assert_eq!(
            network.evaluate(g),
            Err(NetworkError::CycleDetected("g".to_string()))
        );
        assert_eq!(network.gate(g).unwrap().get_status(), Status::NotEvaluated);
        assert_eq!(network.gate(h).unwrap().get_status(), Status::NotEvaluated);
    }

    #[test]
    fn depth_bound() {
        let (mut network, last) = inverter_chain(8);
        {
            let mut evaluator =
                Evaluator::new(&mut network).with_config(EvalConfig::new(4, true));
            assert_eq!(evaluator.evaluate(last), Err(NetworkError::DepthExceeded(4)));
        }
        assert!(
            network
                .gates()
                .all(|(_, g)| g.get_status() == Status::NotEvaluated)
        );

        let mut evaluator = Evaluator::new(&mut network).with_config(EvalConfig::new(8, true));
        // Eight inverters in a row
        assert_eq!(evaluator.evaluate(last), Ok(false));
    }

    #[test]
    fn chain_at_default_depth() {
        let max_depth = EvalConfig::default().max_depth;
        // The gate farthest from the root sits exactly at the bound
        let (mut network, last) = inverter_chain(max_depth + 1);
        let result = Evaluator::new(&mut network)
            .with_sink(NullSink)
            .evaluate(last);
        // An odd number of inverters over a false input
        assert_eq!(result, Ok((max_depth + 1) % 2 == 1));

        let (mut network, last) = inverter_chain(max_depth + 2);
        let result = Evaluator::new(&mut network)
            .with_sink(NullSink)
            .evaluate(last);
        assert_eq!(result, Err(NetworkError::DepthExceeded(max_depth)));
    }

    #[test]
    fn permissive_chain() {
        let config = EvalConfig::permissive();
        let (mut network, last) = inverter_chain(config.max_depth + 1);
        let result = Evaluator::new(&mut network)
            .with_config(config)
            .with_sink(NullSink)
            .evaluate(last);
        assert_eq!(result, Ok((config.max_depth + 1) % 2 == 1));
        assert_eq!(network.gate(last).unwrap().get_status(), Status::Evaluated);
    }

    #[test]
    fn unwired_slot_policy() {
        let mut network = Network::new("unwired".to_string());
        let a = network.create_input(false);
        let g = network.create_gate(Operator::Or, 2, 1, "g".into()).unwrap();
        network.connect_terminal(g, a).unwrap();

        {
            let mut evaluator = Evaluator::new(&mut network)
                .with_config(EvalConfig::strict())
                .with_sink(RecordingSink::new());
            assert_eq!(
                evaluator.evaluate(g),
                Err(NetworkError::UnwiredInput {
                    gate: "g".to_string(),
                    slot: 1
                })
            );
            assert!(evaluator.sink().records().is_empty());
        }

        let mut evaluator = Evaluator::new(&mut network).with_sink(RecordingSink::new());
        assert_eq!(evaluator.evaluate(g), Ok(false));
        let records = evaluator.into_sink().into_records();
        assert_eq!(records[0].inputs, vec![Some(false), None]);
    }
}
