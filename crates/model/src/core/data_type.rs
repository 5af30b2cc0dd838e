use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum DataType {
    Int,
    IntUnsigned,
    Float,
    String,
    Boolean,
    Json,
    Uuid,
    Date,
    Timestamp,
    Null,
}

impl DataType {
    pub fn name(&self) -> &'static str {
        match self {
            DataType::Int => "INT",
            DataType::IntUnsigned => "INT UNSIGNED",
            DataType::Float => "FLOAT",
            DataType::String => "STRING",
            DataType::Boolean => "BOOLEAN",
            DataType::Json => "JSON",
            DataType::Uuid => "UUID",
            DataType::Date => "DATE",
            DataType::Timestamp => "TIMESTAMP",
            DataType::Null => "NULL",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
