//! CaseSet - Ordered case tables and loading them from disk
//!
//! A case table is a top-level array of case mappings, written as JSON or
//! YAML. Order in the file is the order the runner visits the cases.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;

use super::case::Case;
use super::error::{CaseError, CaseResult, kind_of};

/// An ordered, owned sequence of cases
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CaseSet {
    cases: Vec<Case>,
}

impl CaseSet {
    /// Wrap an existing list of cases, keeping its order
    pub fn new(cases: Vec<Case>) -> Self {
        Self { cases }
    }

    /// Number of cases
    pub fn len(&self) -> usize {
        self.cases.len()
    }

    /// Whether the table has no cases
    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    /// Iterate cases in table order
    pub fn iter(&self) -> std::slice::Iter<'_, Case> {
        self.cases.iter()
    }

    /// Borrow the cases as a slice
    pub fn cases(&self) -> &[Case] {
        &self.cases
    }

    /// Append a case at the end of the table
    pub fn push(&mut self, case: Case) {
        self.cases.push(case);
    }

    /// Build a table from an already-parsed JSON value
    pub fn from_value(value: Value, origin: &str) -> CaseResult<Self> {
        let entries = match value {
            Value::Array(entries) => entries,
            other => {
                return Err(CaseError::NotATable {
                    origin: origin.to_string(),
                    found: kind_of(&other),
                });
            }
        };

        entries
            .into_iter()
            .enumerate()
            .map(|(index, entry)| Case::from_value_at(entry, index))
            .collect::<CaseResult<Vec<_>>>()
            .map(Self::new)
    }

    /// Parse a JSON case table
    pub fn from_json_str(content: &str) -> CaseResult<Self> {
        Self::parse_json(content, "<string>")
    }

    /// Parse a YAML case table
    pub fn from_yaml_str(content: &str) -> CaseResult<Self> {
        Self::parse_yaml(content, "<string>")
    }

    /// Load a case table, picking the format from the file extension
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let table = CaseSet::load("tests/cases/addition.yaml")?;
    /// run_cases(&notes, &table, |case, setup, expected| { /* ... */ });
    /// ```
    pub fn load(path: impl AsRef<Path>) -> CaseResult<Self> {
        let path = path.as_ref();
        let path_str = path.display().to_string();

        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);

        let parse: fn(&str, &str) -> CaseResult<Self> = match extension.as_deref() {
            Some("json") => Self::parse_json,
            Some("yaml" | "yml") => Self::parse_yaml,
            _ => return Err(CaseError::UnsupportedFormat { path: path_str }),
        };

        let content = fs::read_to_string(path).map_err(|e| CaseError::Io {
            path: path_str.clone(),
            error: e.to_string(),
        })?;

        let table = parse(&content, &path_str)?;
        tracing::debug!(path = %path_str, cases = table.len(), "loaded case table");
        Ok(table)
    }

    fn parse_json(content: &str, origin: &str) -> CaseResult<Self> {
        let value: Value = serde_json::from_str(content).map_err(|e| CaseError::InvalidJson {
            origin: origin.to_string(),
            error: e.to_string(),
        })?;
        Self::from_value(value, origin)
    }

    fn parse_yaml(content: &str, origin: &str) -> CaseResult<Self> {
        let value: Value = serde_yaml::from_str(content).map_err(|e| CaseError::InvalidYaml {
            origin: origin.to_string(),
            error: e.to_string(),
        })?;
        Self::from_value(value, origin)
    }
}

impl From<Vec<Case>> for CaseSet {
    fn from(cases: Vec<Case>) -> Self {
        Self::new(cases)
    }
}

impl FromIterator<Case> for CaseSet {
    fn from_iter<I: IntoIterator<Item = Case>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a CaseSet {
    type Item = &'a Case;
    type IntoIter = std::slice::Iter<'a, Case>;

    fn into_iter(self) -> Self::IntoIter {
        self.cases.iter()
    }
}

impl IntoIterator for CaseSet {
    type Item = Case;
    type IntoIter = std::vec::IntoIter<Case>;

    fn into_iter(self) -> Self::IntoIter {
        self.cases.into_iter()
    }
}
