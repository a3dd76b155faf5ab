//! Case - A single row of a case table
//!
//! A case carries display metadata (`prefix`, `description`), the data the
//! body consumes (`setup`, `expected`), and any other keys untouched.
//! Missing or null `setup`/`expected` read as an empty mapping.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::Map;
use super::error::{CaseError, CaseResult, kind_of};

/// One test scenario: input data, expected data and display metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Case {
    /// Tag applied to diagnostic notes while the case runs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    prefix: Option<String>,
    /// Human-readable label announced before the case runs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    /// Input data for the body
    #[serde(
        default,
        deserialize_with = "map_or_null",
        skip_serializing_if = "Map::is_empty"
    )]
    setup: Map,
    /// Expected outcome data for the body
    #[serde(
        default,
        deserialize_with = "map_or_null",
        skip_serializing_if = "Map::is_empty"
    )]
    expected: Map,
    /// Any other keys, passed through as-is
    #[serde(flatten)]
    extra: Map,
}

/// Keys with a dedicated field; never stored among the extras.
const RESERVED_KEYS: [&str; 4] = ["prefix", "description", "setup", "expected"];

fn map_or_null<'de, D>(deserializer: D) -> Result<Map, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Map>::deserialize(deserializer)?.unwrap_or_default())
}

impl Case {
    /// Create an empty case (no label, no prefix, empty data)
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the diagnostic prefix
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the setup mapping
    pub fn with_setup(mut self, setup: Map) -> Self {
        self.setup = setup;
        self
    }

    /// Set the expected mapping
    pub fn with_expected(mut self, expected: Map) -> Self {
        self.expected = expected;
        self
    }

    /// Add a pass-through key
    ///
    /// `prefix`, `description`, `setup` and `expected` go to their own
    /// fields, so the case reads the same before and after serialization.
    /// A reserved key with the wrong shape is dropped.
    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        let key = key.into();
        let found = kind_of(&value);
        let accepted = match (key.as_str(), value) {
            ("prefix", Value::String(s)) => {
                self.prefix = Some(s);
                true
            }
            ("description", Value::String(s)) => {
                self.description = Some(s);
                true
            }
            ("prefix", Value::Null) => {
                self.prefix = None;
                true
            }
            ("description", Value::Null) => {
                self.description = None;
                true
            }
            ("setup", Value::Object(map)) => {
                self.setup = map;
                true
            }
            ("expected", Value::Object(map)) => {
                self.expected = map;
                true
            }
            ("setup", Value::Null) => {
                self.setup = Map::new();
                true
            }
            ("expected", Value::Null) => {
                self.expected = Map::new();
                true
            }
            (name, _) if RESERVED_KEYS.contains(&name) => false,
            (_, value) => {
                self.extra.insert(key.clone(), value);
                true
            }
        };
        if !accepted {
            tracing::warn!(key = %key, found, "dropping reserved case key with the wrong shape");
        }
        self
    }

    /// Build a case from a JSON value found at `index` of a table.
    ///
    /// `index` only feeds error messages.
    pub fn from_value_at(value: Value, index: usize) -> CaseResult<Self> {
        let object = match value {
            Value::Object(object) => object,
            other => {
                return Err(CaseError::NotAMapping {
                    index,
                    found: kind_of(&other),
                });
            }
        };

        check_field(&object, index, "prefix", "a string", Value::is_string)?;
        check_field(&object, index, "description", "a string", Value::is_string)?;
        check_field(&object, index, "setup", "a mapping", Value::is_object)?;
        check_field(&object, index, "expected", "a mapping", Value::is_object)?;

        serde_json::from_value(Value::Object(object)).map_err(|e| CaseError::Decode {
            field: "case",
            error: e.to_string(),
        })
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Setup data; empty when the case has none
    pub fn setup(&self) -> &Map {
        &self.setup
    }

    /// Expected data; empty when the case has none
    pub fn expected(&self) -> &Map {
        &self.expected
    }

    /// Look up a pass-through key
    pub fn extra(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }

    /// All pass-through keys
    pub fn extras(&self) -> &Map {
        &self.extra
    }

    /// Announcement label: the description, else the prefix
    pub fn label(&self) -> Option<&str> {
        self.description().or_else(|| self.prefix())
    }

    /// Decode the setup mapping into a typed value
    pub fn setup_as<T: DeserializeOwned>(&self) -> CaseResult<T> {
        decode("setup", &self.setup)
    }

    /// Decode the expected mapping into a typed value
    pub fn expected_as<T: DeserializeOwned>(&self) -> CaseResult<T> {
        decode("expected", &self.expected)
    }
}

impl TryFrom<Value> for Case {
    type Error = CaseError;

    /// Errors report the case as index 0.
    fn try_from(value: Value) -> CaseResult<Self> {
        Self::from_value_at(value, 0)
    }
}

fn check_field(
    object: &Map,
    index: usize,
    field: &'static str,
    expected: &'static str,
    accepts: fn(&Value) -> bool,
) -> CaseResult<()> {
    match object.get(field) {
        None | Some(Value::Null) => Ok(()),
        Some(value) if accepts(value) => Ok(()),
        Some(value) => Err(CaseError::InvalidField {
            index,
            field,
            expected,
            found: kind_of(value),
        }),
    }
}

fn decode<T: DeserializeOwned>(field: &'static str, data: &Map) -> CaseResult<T> {
    serde_json::from_value(Value::Object(data.clone())).map_err(|e| CaseError::Decode {
        field,
        error: e.to_string(),
    })
}
