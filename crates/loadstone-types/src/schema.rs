//! Positional dataset schemas and named backup schemas.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Primitive type a field is coerced to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// Signed 64-bit integer. Fractional or non-numeric text is rejected.
    Int,
    /// Free text. Any non-empty value is accepted as-is.
    Text,
}

impl FieldType {
    /// Wire-format string used in configuration and diagnostics.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Text => "text",
        }
    }

    /// Column type used when the destination creates the table.
    #[must_use]
    pub fn sql_type(self) -> &'static str {
        match self {
            Self::Int => "INTEGER",
            Self::Text => "TEXT",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One field of a schema. Its position is its index within the schema.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldRule {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
}

impl FieldRule {
    #[must_use]
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
        }
    }

    #[must_use]
    pub fn int(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Int)
    }

    #[must_use]
    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Text)
    }
}

/// Ordered, immutable list of typed fields.
///
/// Field order must match both the source column order and the
/// destination table's column order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatasetSchema {
    fields: Vec<FieldRule>,
}

/// Named+typed field list used by the columnar backup codec.
///
/// Structurally identical to a [`DatasetSchema`]; the alias keeps call
/// sites honest about which registry lookup produced the schema.
pub type BackupSchema = DatasetSchema;

impl DatasetSchema {
    #[must_use]
    pub fn new(fields: Vec<FieldRule>) -> Self {
        Self { fields }
    }

    #[must_use]
    pub fn fields(&self) -> &[FieldRule] {
        &self.fields
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }
}

impl From<Vec<FieldRule>> for DatasetSchema {
    fn from(fields: Vec<FieldRule>) -> Self {
        Self::new(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_type_yaml_is_snake_case() {
        let rule: FieldRule = serde_yaml::from_str("name: id\ntype: int").unwrap();
        assert_eq!(rule, FieldRule::int("id"));
        let rule: FieldRule = serde_yaml::from_str("name: job\ntype: text").unwrap();
        assert_eq!(rule.field_type, FieldType::Text);
    }

    #[test]
    fn unknown_field_type_is_rejected() {
        let result: Result<FieldRule, _> = serde_yaml::from_str("name: id\ntype: float");
        assert!(result.is_err());
    }

    #[test]
    fn schema_serializes_as_plain_list() {
        let schema = DatasetSchema::new(vec![FieldRule::int("id"), FieldRule::text("job")]);
        let json = serde_json::to_value(&schema).unwrap();
        assert!(json.is_array());
        assert_eq!(json[1]["type"], "text");
    }

    #[test]
    fn field_names_follow_declaration_order() {
        let schema = DatasetSchema::new(vec![
            FieldRule::int("id"),
            FieldRule::text("department"),
        ]);
        assert_eq!(schema.field_names().collect::<Vec<_>>(), ["id", "department"]);
        assert_eq!(schema.len(), 2);
        assert_eq!(FieldType::Int.sql_type(), "INTEGER");
    }
}
