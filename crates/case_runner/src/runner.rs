//! CaseRunner - Driving a test body over a case table
//!
//! For every case, in table order:
//!
//! 1. clear the prefix
//! 2. announce the label (description, else prefix) if there is one
//! 3. set the case prefix under a [`PrefixGuard`]
//! 4. call the body with the case, its setup and its expected data
//!
//! The guard clears the prefix before control leaves the case, whether the
//! body returned, returned an error or panicked. Body errors are returned
//! as-is and stop the run.

use std::convert::Infallible;

use super::Map;
use super::case::Case;
use super::options::RunnerOptions;
use super::sink::{DiagnosticSink, PrefixGuard};

/// Runs a body once per case against a diagnostic sink
pub struct CaseRunner<'s, S: DiagnosticSink + ?Sized> {
    /// Where announcements and prefixes go
    sink: &'s S,
    options: RunnerOptions,
}

impl<'s, S: DiagnosticSink + ?Sized> CaseRunner<'s, S> {
    /// Create a runner with default options
    pub fn new(sink: &'s S) -> Self {
        Self {
            sink,
            options: RunnerOptions::default(),
        }
    }

    /// Replace the runner options
    pub fn with_options(mut self, options: RunnerOptions) -> Self {
        self.options = options;
        self
    }

    /// Current options
    pub fn options(&self) -> &RunnerOptions {
        &self.options
    }

    /// Run `body` for every case.
    ///
    /// A panic in `body` propagates; the prefix is already empty by the time
    /// it reaches the caller.
    pub fn run<'c, I, F>(&self, cases: I, mut body: F)
    where
        I: IntoIterator<Item = &'c Case>,
        F: FnMut(&Case, &Map, &Map),
    {
        let result = self.try_run(cases, |case, setup, expected| {
            body(case, setup, expected);
            Ok::<(), Infallible>(())
        });
        match result {
            Ok(()) => {}
            Err(never) => match never {},
        }
    }

    /// Run a fallible `body` for every case, stopping at the first error.
    ///
    /// The error is returned unchanged and the remaining cases are skipped.
    pub fn try_run<'c, I, F, E>(&self, cases: I, mut body: F) -> Result<(), E>
    where
        I: IntoIterator<Item = &'c Case>,
        F: FnMut(&Case, &Map, &Map) -> Result<(), E>,
    {
        for (index, case) in cases.into_iter().enumerate() {
            self.run_case(index, case, &mut body)?;
        }
        Ok(())
    }

    fn run_case<F, E>(&self, index: usize, case: &Case, body: &mut F) -> Result<(), E>
    where
        F: FnMut(&Case, &Map, &Map) -> Result<(), E>,
    {
        self.sink.clear_prefix();

        let setup = case.setup();
        let expected = case.expected();
        let label = self.options.label_for(case);

        if let Some(label) = label {
            self.sink
                .announce(self.options.padding, &self.options.announcement(label));
        }

        let _guard = match self.options.prefix_for(case) {
            Some(prefix) => PrefixGuard::set(self.sink, prefix),
            None => PrefixGuard::empty(self.sink),
        };

        tracing::debug!(index, label = label.unwrap_or_default(), "running case");
        body(case, setup, expected)
    }
}

/// Run `body` for every case with default options.
///
/// ```rust
/// use case_runner::{Case, run_cases};
/// use case_runner::case_notes::NoteStream;
///
/// let notes = NoteStream::new();
/// let cases = vec![Case::new().with_prefix("first"), Case::new()];
/// let mut calls = 0;
/// run_cases(&notes, &cases, |_case, setup, _expected| {
///     assert!(setup.is_empty());
///     calls += 1;
/// });
/// assert_eq!(calls, 2);
/// assert!(notes.prefix().is_empty());
/// ```
pub fn run_cases<'c, S, I, F>(sink: &S, cases: I, body: F)
where
    S: DiagnosticSink + ?Sized,
    I: IntoIterator<Item = &'c Case>,
    F: FnMut(&Case, &Map, &Map),
{
    CaseRunner::new(sink).run(cases, body);
}

/// Run a fallible `body` for every case with default options.
pub fn try_run_cases<'c, S, I, F, E>(sink: &S, cases: I, body: F) -> Result<(), E>
where
    S: DiagnosticSink + ?Sized,
    I: IntoIterator<Item = &'c Case>,
    F: FnMut(&Case, &Map, &Map) -> Result<(), E>,
{
    CaseRunner::new(sink).try_run(cases, body)
}
