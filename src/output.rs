//! Trap output sink trait and append-only log.
//!
//! `ECALL` output goes through the [`TrapSink`] trait so the engine never
//! owns the log; the host decides where messages land (console widget, test
//! buffer) and when to clear them.

/// Receiver for trap messages emitted by `ECALL`.
pub trait TrapSink {
    /// Appends one message to the sink.
    fn emit(&mut self, message: String);
}

/// In-memory append-only trap log.
///
/// Single-writer, single-reader; cleared by the host on program restart, not
/// by the engine.
#[derive(Debug, Default)]
pub struct OutputLog {
    messages: Vec<String>,
}

impl OutputLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// All messages emitted so far, oldest first.
    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    /// Discards all messages.
    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

impl TrapSink for OutputLog {
    fn emit(&mut self, message: String) {
        self.messages.push(message);
    }
}
