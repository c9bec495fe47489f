//! Synonym resolution for worklist cells.

use crate::errors::BatchError;
use serde_json::Value;
use std::collections::HashMap;

/// field type -> lower-cased raw value -> canonical value
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingTable {
    fields: HashMap<String, HashMap<String, String>>,
}

impl MappingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one synonym. The raw key is normalised the same way lookups are.
    pub fn insert(
        &mut self,
        field_type: impl Into<String>,
        raw: &str,
        canonical: impl Into<String>,
    ) -> &mut Self {
        self.fields
            .entry(field_type.into())
            .or_default()
            .insert(normalize_key(raw), canonical.into());
        self
    }

    /// Build from the `VALUE_MAPPINGS` config object, rejecting anything that
    /// is not an object of string values.
    pub fn from_json(value: &Value) -> Result<Self, BatchError> {
        let mut table = Self::new();
        let fields = match value {
            Value::Null => return Ok(table),
            Value::Object(fields) => fields,
            _ => {
                return Err(BatchError::Configuration(
                    "VALUE_MAPPINGS must be an object".to_string(),
                ))
            }
        };
        for (field_type, synonyms) in fields {
            let synonyms = synonyms.as_object().ok_or_else(|| {
                BatchError::Configuration(format!(
                    "VALUE_MAPPINGS.{field_type} must be an object of raw -> canonical values"
                ))
            })?;
            for (raw, canonical) in synonyms {
                let canonical = canonical.as_str().ok_or_else(|| {
                    BatchError::Configuration(format!(
                        "VALUE_MAPPINGS.{field_type}.{raw} must be a string"
                    ))
                })?;
                table.insert(field_type.as_str(), raw, canonical);
            }
        }
        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.fields.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Canonical value for `raw` under `field_type`.
    ///
    /// Blank input resolves to an empty string. Unmapped values pass through
    /// trimmed, on the assumption that they are already canonical.
    pub fn resolve(&self, raw: Option<&str>, field_type: &str) -> String {
        let Some(raw) = raw.map(str::trim).filter(|v| !is_blank(v)) else {
            return String::new();
        };
        self.fields
            .get(field_type)
            .and_then(|synonyms| synonyms.get(&normalize_key(raw)))
            .cloned()
            .unwrap_or_else(|| raw.to_string())
    }
}

fn normalize_key(raw: &str) -> String {
    raw.trim().to_lowercase()
}

// Spreadsheet exports write missing numbers as NaN.
fn is_blank(value: &str) -> bool {
    value.is_empty() || value.eq_ignore_ascii_case("nan")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn table() -> MappingTable {
        let mut table = MappingTable::new();
        table.insert("AGENTE", "agent a", "Agente A");
        table
    }

    #[test]
    fn test_blank_resolves_to_empty() {
        let table = table();
        assert_eq!(table.resolve(Some(""), "AGENTE"), "");
        assert_eq!(table.resolve(Some("   "), "AGENTE"), "");
        assert_eq!(table.resolve(None, "AGENTE"), "");
        assert_eq!(table.resolve(Some("NaN"), "AGENTE"), "");
    }

    #[test]
    fn test_trim_and_case_insensitive_match() {
        assert_eq!(table().resolve(Some(" Agent A "), "AGENTE"), "Agente A");
        assert_eq!(table().resolve(Some("AGENT A"), "AGENTE"), "Agente A");
    }

    #[test]
    fn test_unmapped_values_pass_through_trimmed() {
        assert_eq!(
            table().resolve(Some("Unknown Value"), "AGENTE"),
            "Unknown Value"
        );
        assert_eq!(table().resolve(Some("  Agent A  "), "GRUPO"), "Agent A");
    }

    #[test]
    fn test_from_json_normalizes_keys() {
        let table = MappingTable::from_json(&json!({
            "CLASSIFICACAO": { "  Preventiva ": "Manutenção Preventiva" }
        }))
        .unwrap();
        assert_eq!(
            table.resolve(Some("preventiva"), "CLASSIFICACAO"),
            "Manutenção Preventiva"
        );
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_from_json_rejects_malformed_tables() {
        assert!(MappingTable::from_json(&json!({ "AGENTE": "x" })).is_err());
        assert!(MappingTable::from_json(&json!({ "AGENTE": { "a": 1 } })).is_err());
        assert!(MappingTable::from_json(&json!([])).is_err());
        assert!(MappingTable::from_json(&Value::Null).unwrap().is_empty());
    }
}
