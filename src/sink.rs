/*!

  Destinations for the per-gate report produced during evaluation.

*/

use crate::circuit::{Identifier, Operator};
use std::io::Write;

/// What the evaluator reports after computing a single gate
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize))]
pub struct EvalRecord {
    /// Name of the gate
    pub gate: Identifier,
    /// Optional label of the gate
    pub label: Option<String>,
    /// Operator of the gate
    pub operator: Operator,
    /// Operand values in slot order. Unwired slots are `None`.
    pub inputs: Vec<Option<bool>>,
    /// The computed canonical output
    pub output: bool,
}

impl std::fmt::Display for EvalRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.gate)?;
        if let Some(label) = &self.label {
            write!(f, " ({label})")?;
        }
        write!(f, " {} [", self.operator)?;
        for (i, input) in self.inputs.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match input {
                Some(v) => write!(f, "{}", u8::from(*v))?,
                None => write!(f, "-")?,
            }
        }
        write!(f, "] -> {}", u8::from(self.output))
    }
}

/// A consumer of evaluation records.
/// A failing sink never aborts evaluation; the evaluator logs the error and moves on.
pub trait EvalSink {
    /// Receive the record for one evaluated gate
    fn record(&mut self, record: &EvalRecord) -> std::io::Result<()>;
}

impl<S> EvalSink for &mut S
where
    S: EvalSink + ?Sized,
{
    fn record(&mut self, record: &EvalRecord) -> std::io::Result<()> {
        (**self).record(record)
    }
}

/// An absent sink drops every record
impl<S> EvalSink for Option<S>
where
    S: EvalSink,
{
    fn record(&mut self, record: &EvalRecord) -> std::io::Result<()> {
        match self {
            Some(sink) => sink.record(record),
            None => Ok(()),
        }
    }
}

/// Emits every record as a `tracing` event at info level
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EvalSink for TracingSink {
    fn record(&mut self, record: &EvalRecord) -> std::io::Result<()> {
        tracing::info!(
            gate = %record.gate,
            label = record.label.as_deref().unwrap_or(""),
            operator = %record.operator,
            inputs = ?record.inputs,
            output = record.output,
            "evaluated gate"
        );
        Ok(())
    }
}

/// Discards every record
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EvalSink for NullSink {
    fn record(&mut self, _record: &EvalRecord) -> std::io::Result<()> {
        Ok(())
    }
}

/// Keeps every record in memory
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    records: Vec<EvalRecord>,
}

impl RecordingSink {
    /// Creates an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the records in evaluation order
    pub fn records(&self) -> &[EvalRecord] {
        &self.records
    }

    /// Returns how many times the gate named `name` was computed
    pub fn count_for(&self, name: &str) -> usize {
        self.records
            .iter()
            .filter(|r| r.gate.get_name() == name)
            .count()
    }

    /// Consumes the recorder and returns its records
    pub fn into_records(self) -> Vec<EvalRecord> {
        self.records
    }
}

impl EvalSink for RecordingSink {
    fn record(&mut self, record: &EvalRecord) -> std::io::Result<()> {
        self.records.push(record.clone());
        Ok(())
    }
}

/// Writes one line of text per record
#[derive(Debug)]
pub struct WriterSink<W: Write> {
    writer: W,
}

impl<W: Write> WriterSink<W> {
    /// Wraps a writer
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Returns the underlying writer
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> EvalSink for WriterSink<W> {
    fn record(&mut self, record: &EvalRecord) -> std::io::Result<()> {
        writeln!(self.writer, "{record}")
    }
}

/// Writes one JSON object per line
#[cfg(feature = "serde")]
#[derive(Debug)]
pub struct JsonSink<W: Write> {
    writer: W,
}

#[cfg(feature = "serde")]
impl<W: Write> JsonSink<W> {
    /// Wraps a writer
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Returns the underlying writer
    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[cfg(feature = "serde")]
impl<W: Write> EvalSink for JsonSink<W> {
    fn record(&mut self, record: &EvalRecord) -> std::io::Result<()> {
        serde_json::to_writer(&mut self.writer, record)?;
        writeln!(self.writer)
    }
}
