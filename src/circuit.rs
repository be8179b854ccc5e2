/*!

  Leaf types of a logic network: operators, terminals and identifiers.

*/

use crate::error::NetworkError;

/// The boolean operator computed by a gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
pub enum Operator {
    /// Conjunction of all inputs
    And,
    /// Disjunction of all inputs
    Or,
    /// Complement of a single input
    Not,
    /// Parity of all inputs
    Xor,
}

impl Operator {
    /// Every operator, in declaration order
    pub const ALL: [Operator; 4] = [Operator::And, Operator::Or, Operator::Not, Operator::Xor];

    /// Returns the value the accumulator starts from before any input is folded in.
    pub fn identity(&self) -> bool {
        match self {
            Operator::And => true,
            Operator::Or => false,
            Operator::Xor => false,
            Operator::Not => true,
        }
    }

    /// Folds `operand` into the accumulator `acc`.
    /// [Operator::Not] ignores the accumulator and complements the operand.
    pub fn combine(&self, acc: bool, operand: bool) -> bool {
        match self {
            Operator::And => acc & operand,
            Operator::Or => acc | operand,
            Operator::Xor => acc ^ operand,
            Operator::Not => !operand,
        }
    }

    /// Returns `true` if the operator only accepts a single input
    pub fn is_unary(&self) -> bool {
        matches!(self, Operator::Not)
    }

    /// Returns the upper-case display name of the operator
    pub fn name(&self) -> &'static str {
        match self {
            Operator::And => "AND",
            Operator::Or => "OR",
            Operator::Not => "NOT",
            Operator::Xor => "XOR",
        }
    }

    /// Returns the Verilog gate primitive for the operator
    pub fn primitive(&self) -> &'static str {
        match self {
            Operator::And => "and",
            Operator::Or => "or",
            Operator::Not => "not",
            Operator::Xor => "xor",
        }
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Operator {
    type Err = NetworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operator::ALL
            .into_iter()
            .find(|op| op.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| NetworkError::UnknownOperator(s.to_string()))
    }
}

/// The direction of a terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
pub enum TerminalKind {
    /// A primary input to the circuit
    Input,
    /// A value written by a gate
    Output,
}

/// Evaluation progress of a gate or terminal.
/// Transitions only move forward and are never reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
pub enum Status {
    /// Not computed yet
    #[default]
    NotEvaluated,
    /// On the evaluation stack. Seeing it again means a loop.
    InProgress,
    /// Computed, the cached value is valid
    Evaluated,
}

/// A boolean value cell acting as an input or output pin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Terminal {
    kind: TerminalKind,
    value: bool,
    status: Status,
}

impl Terminal {
    /// Creates a new terminal holding `value`
    pub fn new(kind: TerminalKind, value: bool) -> Self {
        Self {
            kind,
            value,
            status: Status::NotEvaluated,
        }
    }

    /// Returns the direction of the terminal
    pub fn get_kind(&self) -> TerminalKind {
        self.kind
    }

    /// Returns the current value
    pub fn get_value(&self) -> bool {
        self.value
    }

    /// Returns the evaluation status
    pub fn get_status(&self) -> Status {
        self.status
    }

    /// Returns `true` if this is a primary input
    pub fn is_an_input(&self) -> bool {
        self.kind == TerminalKind::Input
    }

    /// Writes the computed value. Only the evaluator drives outputs.
    pub(crate) fn drive(&mut self, value: bool) {
        self.value = value;
        self.status = Status::Evaluated;
    }
}

/// The display label of a gate, unique within a network
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
pub struct Identifier {
    name: String,
}

impl Identifier {
    /// Creates a new identifier with the given name
    pub fn new(name: String) -> Self {
        Self { name }
    }

    /// Returns the name of the identifier
    pub fn get_name(&self) -> &str {
        &self.name
    }

    /// Emit the name as a Verilog identifier, escaping it when needed
    pub fn emit_name(&self) -> String {
        let simple = self
            .name
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && self
                .name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$');
        if simple {
            self.name.clone()
        } else {
            format!("\\{} ", self.name)
        }
    }
}

impl std::fmt::Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

impl From<&str> for Identifier {
    fn from(name: &str) -> Self {
        Self::new(name.to_string())
    }
}

impl From<String> for Identifier {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}
