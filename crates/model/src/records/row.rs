use crate::core::value::{FieldValue, Value};
use serde::{Deserialize, Serialize};

/// One record of a table: an ordered sequence of named cells.
///
/// Field order is the column order; `set` on an unknown column appends it,
/// so augmenting a row preserves the position of every existing column.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Row {
    pub field_values: Vec<FieldValue>,
}

impl Row {
    pub fn new(field_values: Vec<FieldValue>) -> Self {
        Row { field_values }
    }

    pub fn from_pairs(pairs: Vec<(&str, Value)>) -> Self {
        Row {
            field_values: pairs
                .into_iter()
                .map(|(name, value)| FieldValue::new(name, value))
                .collect(),
        }
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.field_values.iter().find(|f| f.name == field)
    }

    pub fn get_value(&self, field: &str) -> Value {
        self.get(field)
            .map(|f| f.value.clone())
            .unwrap_or(Value::Null)
    }

    pub fn set(&mut self, field: &str, value: Value) {
        match self.field_values.iter_mut().find(|f| f.name == field) {
            Some(existing) => existing.value = value,
            None => self.field_values.push(FieldValue::new(field, value)),
        }
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.field_values.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.field_values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.field_values.is_empty()
    }
}
