// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 feedflow contributors

//! Data mapper
//!
//! Projects source records onto the target shape. For each rule the mapper
//! extracts the source value, applies the value-mapping table, then the
//! transformer. Output records contain the static fields followed by the
//! rule targets, in declaration order.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{FeedflowResult, RecordError, RowError};
use crate::extract::{extract, insert_path};
use crate::pipeline::MappingResult;
use crate::record::{is_empty_value, Record};
use crate::transform::{TransformOptions, Transformer, TransformerKind, TransformerRegistry};

fn is_false(b: &bool) -> bool {
    !*b
}

/// One output field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingRule {
    /// Source path (dot notation, `*` wildcards)
    #[serde(alias = "source")]
    pub source_field: String,

    /// Target field; dots create nested objects
    #[serde(alias = "target")]
    pub target_field: String,

    #[serde(default, skip_serializing_if = "TransformerKind::is_none")]
    pub transformation: TransformerKind,

    #[serde(default, skip_serializing_if = "is_false")]
    pub is_required: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,

    /// Exact-match lookup table applied before the transformer
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub value_mapping: IndexMap<String, Value>,

    #[serde(default, skip_serializing_if = "TransformOptions::is_default")]
    pub options: TransformOptions,
}

impl MappingRule {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source_field: source.into(),
            target_field: target.into(),
            transformation: TransformerKind::None,
            is_required: false,
            default_value: None,
            value_mapping: IndexMap::new(),
            options: TransformOptions::default(),
        }
    }

    pub fn required(mut self) -> Self {
        self.is_required = true;
        self
    }

    pub fn with_transformation(mut self, kind: TransformerKind) -> Self {
        self.transformation = kind;
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default_value = Some(value);
        self
    }

    pub fn with_value_mapping<K: Into<String>>(
        mut self,
        entries: impl IntoIterator<Item = (K, Value)>,
    ) -> Self {
        self.value_mapping = entries.into_iter().map(|(k, v)| (k.into(), v)).collect();
        self
    }

    fn map_scalar(&self, value: Value) -> Value {
        let key = match &value {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            _ => return value,
        };
        self.value_mapping.get(&key).cloned().unwrap_or(value)
    }

    /// Apply the lookup table; lists are mapped element by element
    pub fn apply_value_mapping(&self, value: Value) -> Value {
        if self.value_mapping.is_empty() {
            return value;
        }
        match value {
            Value::Array(items) => {
                Value::Array(items.into_iter().map(|v| self.map_scalar(v)).collect())
            }
            other => self.map_scalar(other),
        }
    }

    fn fallback(&self, value: Value) -> Value {
        self.default_value.clone().unwrap_or(value)
    }
}

/// Mapping section of a pipeline
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MappingConfig {
    #[serde(default)]
    pub rules: Vec<MappingRule>,

    /// Constant fields written to every mapped record
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub static_fields: IndexMap<String, Value>,
}

/// Mapping rules with their transformers resolved
pub struct DataMapper<'a> {
    config: &'a MappingConfig,
    rules: Vec<(&'a MappingRule, &'a dyn Transformer)>,
}

impl<'a> DataMapper<'a> {
    pub fn new(config: &'a MappingConfig, registry: &'a TransformerRegistry) -> FeedflowResult<Self> {
        let rules = config
            .rules
            .iter()
            .map(|rule| Ok((rule, registry.get(rule.transformation)?)))
            .collect::<FeedflowResult<Vec<_>>>()?;
        Ok(Self { config, rules })
    }

    /// Compute one output value from its (possibly missing) source
    pub fn map_value(
        rule: &MappingRule,
        transformer: &dyn Transformer,
        source: Option<Value>,
    ) -> Result<Value, RecordError> {
        let value = match source {
            None | Some(Value::Null) if rule.is_required => {
                return Err(RecordError::MissingRequiredField {
                    field: rule.source_field.clone(),
                })
            }
            None | Some(Value::Null) => return Ok(rule.fallback(Value::Null)),
            Some(value) => value,
        };

        let value = rule.apply_value_mapping(value);

        if !transformer.accepts_empty() && is_empty_value(&value) {
            return Ok(rule.fallback(value));
        }

        let transformed = transformer
            .transform(value, &rule.options)
            .map_err(|reason| RecordError::Transform {
                field: rule.target_field.clone(),
                transformer: rule.transformation.to_string(),
                reason,
            })?;

        if is_empty_value(&transformed) {
            return Ok(rule.fallback(transformed));
        }
        Ok(transformed)
    }

    /// Map one record
    pub fn map_record(&self, record: &Record) -> Result<Record, RecordError> {
        let mut output = Record::new();
        for (key, value) in &self.config.static_fields {
            insert_path(&mut output, key, value.clone());
        }
        for (rule, transformer) in &self.rules {
            let value = Self::map_value(rule, *transformer, extract(record, &rule.source_field))?;
            insert_path(&mut output, &rule.target_field, value);
        }
        Ok(output)
    }

    /// Map a record set; failed rows are dropped and reported
    pub fn apply(&self, records: &[Record], warn_rows: bool) -> MappingResult {
        let total = records.len();
        let mut mapped = Vec::with_capacity(total);
        let mut errors = Vec::new();

        for (index, record) in records.iter().enumerate() {
            match self.map_record(record) {
                Ok(output) => mapped.push(output),
                Err(e) => {
                    if warn_rows {
                        tracing::warn!(row = index, error = %e, "mapping failed, row dropped");
                    }
                    errors.push(RowError::new(index, e.to_string()));
                }
            }
        }

        MappingResult {
            mapped_count: mapped.len(),
            records: mapped,
            total,
            errors,
        }
    }
}
