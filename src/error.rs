/*!

  Error types for building, evaluating and exporting a logic network.

*/

use crate::network::{GateId, TerminalId};
use thiserror::Error;

/// A handle that failed to resolve inside a network
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handle {
    /// A gate handle
    Gate(GateId),
    /// A terminal handle
    Terminal(TerminalId),
}

impl std::fmt::Display for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Handle::Gate(id) => write!(f, "gate {id}"),
            Handle::Terminal(id) => write!(f, "terminal {id}"),
        }
    }
}

/// Errors that can occur while wiring or evaluating a network.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NetworkError {
    /// The handle does not refer to an object of this network.
    #[error("{0} does not exist in this network")]
    NullReference(Handle),

    /// Every slot of the given kind is already wired.
    #[error("gate `{gate}` has no free {kind} slot (arity {arity})")]
    SlotOverflow {
        /// Name of the gate
        gate: String,
        /// Either "input" or "output"
        kind: &'static str,
        /// The declared arity
        arity: usize,
    },

    /// The output terminal is already written by a gate.
    #[error("{terminal} is already driven by gate `{driver}`")]
    MultipleDrivers {
        /// The terminal being connected
        terminal: TerminalId,
        /// Name of the gate that drives it
        driver: String,
    },

    /// The operator name is not one of AND, OR, NOT or XOR.
    #[error("unknown operator `{0}`")]
    UnknownOperator(String),

    /// The declared arity does not suit the operator.
    #[error("gate `{gate}` cannot be declared with {inputs} inputs and {outputs} outputs")]
    InvalidArity {
        /// Name of the gate
        gate: String,
        /// Requested input arity
        inputs: usize,
        /// Requested output arity
        outputs: usize,
    },

    /// Another gate already uses this name.
    #[error("gate name `{0}` is already in use")]
    DuplicateName(String),

    /// The wiring or evaluation would go around a loop.
    #[error("combinational loop through gate `{0}`")]
    CycleDetected(String),

    /// An input slot was never wired and strict evaluation is enabled.
    #[error("input {slot} of gate `{gate}` is not wired")]
    UnwiredInput {
        /// Name of the gate
        gate: String,
        /// The empty slot
        slot: usize,
    },

    /// The evaluation recursed deeper than the configured bound.
    #[error("evaluation depth exceeded ({0})")]
    DepthExceeded(usize),
}

/// Errors that can occur while exporting a diagram.
#[derive(Debug, Error)]
pub enum ExportError {
    /// The network could not be traversed.
    #[error(transparent)]
    Network(#[from] NetworkError),

    /// The destination could not be written.
    #[error("failed to write diagram to `{path}`: {source}")]
    Io {
        /// The destination path
        path: String,
        /// The underlying failure
        #[source]
        source: std::io::Error,
    },

    /// The external renderer ran but did not succeed.
    #[error("renderer `{program}` failed: {message}")]
    Renderer {
        /// The program that was run
        program: String,
        /// What it reported
        message: String,
    },
}
