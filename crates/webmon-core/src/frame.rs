//! Column-oriented result sets handed to the visualization host.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{MonitorError, Result};

/// Name given to every frame produced by the data source.
pub const FRAME_NAME: &str = "response";

/// Values of one field; every value shares one semantic type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "values", rename_all = "lowercase")]
pub enum FieldValues {
    Time(Vec<DateTime<Utc>>),
    Number(Vec<i64>),
    String(Vec<String>),
}

impl FieldValues {
    pub fn len(&self) -> usize {
        match self {
            FieldValues::Time(v) => v.len(),
            FieldValues::Number(v) => v.len(),
            FieldValues::String(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Display metadata attached to a field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

/// A named column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<FieldConfig>,
    #[serde(flatten)]
    pub values: FieldValues,
}

impl Field {
    pub fn new(name: impl Into<String>, values: FieldValues) -> Self {
        Self {
            name: name.into(),
            config: None,
            values,
        }
    }

    pub fn time(name: impl Into<String>, values: Vec<DateTime<Utc>>) -> Self {
        Self::new(name, FieldValues::Time(values))
    }

    pub fn number(name: impl Into<String>, values: Vec<i64>) -> Self {
        Self::new(name, FieldValues::Number(values))
    }

    pub fn string(name: impl Into<String>, values: Vec<String>) -> Self {
        Self::new(name, FieldValues::String(values))
    }

    /// Attach a display unit, e.g. `"ms"`.
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.config.get_or_insert_with(FieldConfig::default).unit = Some(unit.into());
        self
    }

    /// Display unit, if any.
    pub fn unit(&self) -> Option<&str> {
        self.config.as_ref().and_then(|c| c.unit.as_deref())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A named, ordered set of equally long fields (one row per index).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Frame {
    pub name: String,
    fields: Vec<Field>,
}

impl Frame {
    /// Build a frame, rejecting fields whose lengths differ from the first.
    pub fn new(name: impl Into<String>, fields: Vec<Field>) -> Result<Self> {
        if let Some(first) = fields.first() {
            let expected = first.len();
            if let Some(ragged) = fields.iter().find(|f| f.len() != expected) {
                return Err(MonitorError::RaggedFrame {
                    field: ragged.name.clone(),
                    len: ragged.len(),
                    expected,
                });
            }
        }

        Ok(Self {
            name: name.into(),
            fields,
        })
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Look a field up by name.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Number of rows (zero for a frame without fields).
    pub fn row_count(&self) -> usize {
        self.fields.first().map(Field::len).unwrap_or(0)
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
