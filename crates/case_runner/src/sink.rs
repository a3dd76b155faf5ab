//! DiagnosticSink - The runner's view of the diagnostic output
//!
//! The runner only ever sets the current prefix and writes announcements.
//! [`PrefixGuard`] ties a prefix to a scope: dropping the guard clears it,
//! on normal exit, early return and panic unwinding alike.

use std::sync::Arc;

use case_notes::NoteStream;

/// Diagnostic collaborator driven by the runner
pub trait DiagnosticSink {
    /// Replace the current prefix
    fn set_prefix(&self, prefix: &str);

    /// Read the current prefix
    fn prefix(&self) -> String;

    /// Write `padding` blank lines followed by the announcement line
    fn announce(&self, padding: usize, line: &str);

    /// Reset the prefix to empty
    fn clear_prefix(&self) {
        self.set_prefix("");
    }
}

impl DiagnosticSink for NoteStream {
    fn set_prefix(&self, prefix: &str) {
        NoteStream::set_prefix(self, prefix);
    }

    fn prefix(&self) -> String {
        NoteStream::prefix(self)
    }

    fn announce(&self, padding: usize, line: &str) {
        self.blank_lines(padding);
        self.note(line);
    }

    fn clear_prefix(&self) {
        NoteStream::clear_prefix(self);
    }
}

impl<T: DiagnosticSink + ?Sized> DiagnosticSink for &T {
    fn set_prefix(&self, prefix: &str) {
        (**self).set_prefix(prefix);
    }

    fn prefix(&self) -> String {
        (**self).prefix()
    }

    fn announce(&self, padding: usize, line: &str) {
        (**self).announce(padding, line);
    }

    fn clear_prefix(&self) {
        (**self).clear_prefix();
    }
}

impl<T: DiagnosticSink + ?Sized> DiagnosticSink for Arc<T> {
    fn set_prefix(&self, prefix: &str) {
        (**self).set_prefix(prefix);
    }

    fn prefix(&self) -> String {
        (**self).prefix()
    }

    fn announce(&self, padding: usize, line: &str) {
        (**self).announce(padding, line);
    }

    fn clear_prefix(&self) {
        (**self).clear_prefix();
    }
}

/// Scope guard that clears the sink's prefix when dropped
#[must_use = "the prefix is cleared as soon as the guard is dropped"]
pub struct PrefixGuard<'a, S: DiagnosticSink + ?Sized> {
    sink: &'a S,
}

impl<'a, S: DiagnosticSink + ?Sized> PrefixGuard<'a, S> {
    /// Set `prefix` for the lifetime of the guard
    pub fn set(sink: &'a S, prefix: &str) -> Self {
        tracing::trace!(prefix, "prefix set");
        sink.set_prefix(prefix);
        Self { sink }
    }

    /// Hold the prefix empty; anything set meanwhile is cleared on drop
    pub fn empty(sink: &'a S) -> Self {
        sink.clear_prefix();
        Self { sink }
    }
}

impl<S: DiagnosticSink + ?Sized> Drop for PrefixGuard<'_, S> {
    fn drop(&mut self) {
        self.sink.clear_prefix();
        tracing::trace!("prefix cleared");
    }
}
