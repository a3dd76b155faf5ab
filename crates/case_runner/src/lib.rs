#![forbid(unsafe_code)]
#![allow(clippy::nursery)]
#![allow(clippy::pedantic)]
//! Table-driven test cases with scoped diagnostic prefixes
//!
//! Give the runner an ordered table of cases and a body; it calls the body
//! once per case with the case, its setup data and its expected data.
//!
//! ## Architecture
//!
//! - **Case**: one row: optional `prefix` and `description`, `setup` and
//!   `expected` mappings (empty when missing), plus pass-through keys
//! - **CaseSet**: an ordered table, loadable from JSON or YAML files
//! - **DiagnosticSink**: where announcements and the current prefix go;
//!   implemented by [`case_notes::NoteStream`]
//! - **PrefixGuard**: clears the prefix when a case leaves scope
//! - **CaseRunner**: the loop itself
//!
//! ## Usage
//!
//! ```rust
//! use case_runner::{CaseSet, run_cases};
//! use case_runner::case_notes::NoteStream;
//!
//! let table = CaseSet::from_json_str(r#"[
//!     {"prefix": "pref1", "description": "desc1",
//!      "setup": {"start": 17, "add": 1}, "expected": {"sum": 18}},
//!     {}
//! ]"#).unwrap();
//!
//! let notes = NoteStream::new();
//! run_cases(&notes, &table, |_case, setup, expected| {
//!     if let (Some(start), Some(add)) = (setup.get("start"), setup.get("add")) {
//!         let sum = start.as_i64().unwrap() + add.as_i64().unwrap();
//!         assert_eq!(expected["sum"], sum);
//!     }
//! });
//! ```

mod case;
mod error;
mod options;
mod runner;
mod sink;
mod table;

pub use case::Case;
pub use error::{CaseError, CaseResult};
pub use options::{DEFAULT_MARKER, DEFAULT_PADDING, RunnerOptions};
pub use runner::{CaseRunner, run_cases, try_run_cases};
pub use sink::{DiagnosticSink, PrefixGuard};
pub use table::CaseSet;

pub use case_notes;

/// Mapping type used for setup and expected data.
pub type Map = serde_json::Map<String, serde_json::Value>;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        Case, CaseError, CaseResult, CaseRunner, CaseSet, DiagnosticSink, Map, PrefixGuard,
        RunnerOptions, run_cases, try_run_cases,
    };
    pub use case_notes::NoteStream;
}
