//! Schema definition for trip tables

use std::collections::HashMap;
use std::fmt;

use crate::error::{Error, Result};

/// Data type for column values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// 64-bit signed integer
    Int64,

    /// 64-bit floating point
    Float64,

    /// UTF-8 encoded string
    Utf8,

    /// Wall-clock timestamp without timezone
    Timestamp,

    /// Calendar date
    Date,

    /// 8-bit unsigned integer, used for small categories such as hour of day
    UInt8,

    /// Day of week, Monday first
    DayOfWeek,

    /// Trip distance bin (nullable)
    DistanceBin,
}

impl DataType {
    /// Approximate in-memory size of one value in bytes
    pub fn size_bytes(self) -> usize {
        match self {
            DataType::Int64 | DataType::Float64 => 8,
            DataType::Utf8 => std::mem::size_of::<String>(),
            DataType::Timestamp => 12,
            DataType::Date => 4,
            DataType::UInt8 | DataType::DayOfWeek => 1,
            DataType::DistanceBin => 2,
        }
    }

    /// Check if values of this type may be null
    pub fn is_nullable(self) -> bool {
        matches!(self, DataType::DistanceBin)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::Int64 => "Int64",
            DataType::Float64 => "Float64",
            DataType::Utf8 => "Utf8",
            DataType::Timestamp => "Timestamp",
            DataType::Date => "Date",
            DataType::UInt8 => "UInt8",
            DataType::DayOfWeek => "DayOfWeek",
            DataType::DistanceBin => "DistanceBin",
        };
        write!(f, "{name}")
    }
}

/// A field in a schema, with a name, data type, and nullability
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Field {
    /// Name of the field
    pub name: String,

    /// Data type of the field
    pub data_type: DataType,

    /// Whether the field can be null
    pub nullable: bool,
}

impl Field {
    /// Create a new field
    pub fn new(name: &str, data_type: DataType, nullable: bool) -> Self {
        Self {
            name: name.to_string(),
            data_type,
            nullable,
        }
    }

    /// Get the name of this field
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the data type of this field
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Check if this field is nullable
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.nullable {
            write!(f, "{}: {} (nullable)", self.name, self.data_type)
        } else {
            write!(f, "{}: {} (non-nullable)", self.name, self.data_type)
        }
    }
}

/// A schema describing a table's structure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    /// Fields in this schema
    fields: Vec<Field>,

    /// Field indices by name for faster lookup
    field_indices: HashMap<String, usize>,
}

impl Schema {
    /// Create a new schema with the given fields.
    ///
    /// Fails with [`Error::Schema`] if two fields share a name.
    pub fn new(fields: Vec<Field>) -> Result<Self> {
        let mut field_indices = HashMap::with_capacity(fields.len());
        for (i, field) in fields.iter().enumerate() {
            if field_indices.insert(field.name.clone(), i).is_some() {
                return Err(Error::Schema(format!("duplicate column name '{}'", field.name)));
            }
        }

        Ok(Self {
            fields,
            field_indices,
        })
    }

    /// Create a schema with no fields
    pub fn empty() -> Self {
        Self {
            fields: Vec::new(),
            field_indices: HashMap::new(),
        }
    }

    /// Get all fields in this schema
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Get a field by index
    pub fn field(&self, index: usize) -> &Field {
        &self.fields[index]
    }

    /// Get a field by name
    pub fn field_by_name(&self, name: &str) -> Result<&Field> {
        let index = self.index_of(name)?;
        Ok(&self.fields[index])
    }

    /// Get the index of a field by name
    pub fn index_of(&self, name: &str) -> Result<usize> {
        self.field_indices
            .get(name)
            .copied()
            .ok_or_else(|| Error::ColumnNotFound(name.to_string()))
    }

    /// Check whether a field with this name exists
    pub fn contains(&self, name: &str) -> bool {
        self.field_indices.contains_key(name)
    }

    /// Get the number of fields in this schema
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if this schema is empty
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Schema: {} fields", self.fields.len())?;
        for field in &self.fields {
            writeln!(f, "  {field}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_field_rejected() {
        let result = Schema::new(vec![
            Field::new("hour", DataType::UInt8, false),
            Field::new("hour", DataType::Int64, false),
        ]);
        assert!(matches!(result, Err(Error::Schema(_))));
    }

    #[test]
    fn test_index_of_missing_column() {
        let schema = Schema::new(vec![Field::new("trip_distance", DataType::Float64, false)]).unwrap();
        assert_eq!(schema.index_of("trip_distance").unwrap(), 0);
        assert!(matches!(schema.index_of("fare"), Err(Error::ColumnNotFound(name)) if name == "fare"));
    }
}
