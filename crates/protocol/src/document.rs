use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::fields;

/// A search-engine document in its columnar shape: every field maps to a
/// list of values and readers take the first one.
///
/// Absent fields read as empty lists, so every accessor is total. This is
/// the only place that knows about the `field[0]` convention; the engine
/// maps documents into typed items once, at ingestion.
///
/// Decoding is lenient: a `null` field reads as an empty list and a bare
/// scalar as a one-element list.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FieldDoc(BTreeMap<String, Vec<Value>>);

impl<'de> Deserialize<'de> for FieldDoc {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let fields = BTreeMap::<String, Value>::deserialize(deserializer)?;
        Ok(Self(
            fields
                .into_iter()
                .map(|(field, value)| {
                    let values = match value {
                        Value::Null => Vec::new(),
                        Value::Array(values) => values,
                        scalar => vec![scalar],
                    };
                    (field, values)
                })
                .collect(),
        ))
    }
}

impl FieldDoc {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Builder-style insert, mostly useful for fixtures.
    pub fn with<V: Into<Value>>(
        mut self,
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.insert(field, values.into_iter().map(Into::into).collect());
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, values: Vec<Value>) {
        self.0.insert(field.into(), values);
    }

    /// All values of a field (empty if the field is absent).
    pub fn values(&self, field: &str) -> &[Value] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn first(&self, field: &str) -> Option<&Value> {
        self.values(field).first()
    }

    /// First value as a string slice.
    pub fn str(&self, field: &str) -> Option<&str> {
        self.first(field).and_then(Value::as_str)
    }

    /// First value as a non-empty string slice. Empty strings are treated
    /// the same as a missing value.
    pub fn non_empty_str(&self, field: &str) -> Option<&str> {
        self.str(field).filter(|s| !s.is_empty())
    }

    /// First value as a number. Numeric strings are accepted as well.
    pub fn f64(&self, field: &str) -> Option<f64> {
        match self.first(field)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// All string values of a field, skipping non-string entries.
    pub fn strs<'a>(&'a self, field: &str) -> impl Iterator<Item = &'a str> + use<'a> {
        self.values(field).iter().filter_map(Value::as_str)
    }

    /// Number of values stored under a field.
    pub fn count(&self, field: &str) -> usize {
        self.values(field).len()
    }

    /// The `processor.event` discriminator, if it names a known event.
    pub fn processor_event(&self) -> Option<ProcessorEvent> {
        self.str(fields::PROCESSOR_EVENT)
            .and_then(ProcessorEvent::parse)
    }
}

/// Kind of document, as reported by `processor.event`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessorEvent {
    Transaction,
    Span,
    Error,
}

impl ProcessorEvent {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "transaction" => Some(Self::Transaction),
            "span" => Some(Self::Span),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transaction => "transaction",
            Self::Span => "span",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for ProcessorEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
