// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 feedflow contributors

//! Value transformers
//!
//! Named scalar conversions applied by the data mapper after value mapping.
//! Scalar transformers applied to an array convert each element.

mod builtin;

pub use builtin::{
    is_valid_date_format, ArrayFirstTransformer, ArrayJoinTransformer, BoolTransformer,
    DateTransformer, FloatTransformer, IntTransformer, LowerTransformer, NoneTransformer,
    TrimTransformer, UpperTransformer,
};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};

use crate::errors::{FeedflowError, FeedflowResult};

/// Default separator for `array_join`
pub const DEFAULT_JOIN_SEPARATOR: &str = ", ";

/// Default output format for `date`
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Transformer identifiers
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TransformerKind {
    #[default]
    None,
    Trim,
    Upper,
    Lower,
    Int,
    Float,
    Bool,
    Date,
    #[serde(alias = "array-first")]
    ArrayFirst,
    #[serde(alias = "array-join")]
    ArrayJoin,
}

impl TransformerKind {
    /// Parse an identifier, failing with the list of valid ones
    pub fn parse(name: &str) -> FeedflowResult<Self> {
        name.parse()
            .map_err(|_| FeedflowError::unsupported("transformer", name, Self::iter()))
    }

    /// `None` is the identity and is omitted from serialized rules
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

/// Per-rule transformer settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransformOptions {
    /// Separator used by `array_join`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub separator: Option<String>,

    /// chrono output format used by `date`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_format: Option<String>,
}

impl TransformOptions {
    pub fn is_default(&self) -> bool {
        self == &Self::default()
    }
}

/// A named value conversion
pub trait Transformer: Send + Sync {
    /// Convert a value
    ///
    /// Returning `Err` turns into a record error for the row being mapped.
    fn transform(&self, value: Value, options: &TransformOptions) -> Result<Value, String>;

    /// Whether this transformer handles empty input itself
    ///
    /// When false, the mapper substitutes the rule's default for empty input
    /// without calling [`Transformer::transform`].
    fn accepts_empty(&self) -> bool {
        false
    }
}

/// Registry mapping transformer identifiers to implementations
pub struct TransformerRegistry {
    transformers: HashMap<TransformerKind, Box<dyn Transformer>>,
}

impl TransformerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            transformers: HashMap::new(),
        }
    }

    /// Create a registry with every built-in transformer
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(TransformerKind::None, Box::new(NoneTransformer));
        registry.register(TransformerKind::Trim, Box::new(TrimTransformer));
        registry.register(TransformerKind::Upper, Box::new(UpperTransformer));
        registry.register(TransformerKind::Lower, Box::new(LowerTransformer));
        registry.register(TransformerKind::Int, Box::new(IntTransformer));
        registry.register(TransformerKind::Float, Box::new(FloatTransformer));
        registry.register(TransformerKind::Bool, Box::new(BoolTransformer));
        registry.register(TransformerKind::Date, Box::new(DateTransformer));
        registry.register(TransformerKind::ArrayFirst, Box::new(ArrayFirstTransformer));
        registry.register(TransformerKind::ArrayJoin, Box::new(ArrayJoinTransformer));
        registry
    }

    /// Register (or replace) a transformer
    pub fn register(&mut self, kind: TransformerKind, transformer: Box<dyn Transformer>) {
        self.transformers.insert(kind, transformer);
    }

    /// Look up a transformer
    pub fn get(&self, kind: TransformerKind) -> FeedflowResult<&dyn Transformer> {
        self.transformers
            .get(&kind)
            .map(|t| t.as_ref())
            .ok_or_else(|| {
                FeedflowError::unsupported("transformer", kind.as_ref(), self.registered())
            })
    }

    fn registered(&self) -> Vec<String> {
        TransformerKind::iter()
            .filter(|k| self.transformers.contains_key(k))
            .map(|k| k.to_string())
            .collect()
    }
}

impl Default for TransformerRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_kind() {
        assert_eq!(TransformerKind::parse("array_join").unwrap(), TransformerKind::ArrayJoin);
        assert_eq!(TransformerKind::parse("upper").unwrap(), TransformerKind::Upper);
    }

    #[test]
    fn test_parse_unknown_kind_lists_valid() {
        let err = TransformerKind::parse("reverse").unwrap_err();
        match err {
            FeedflowError::UnsupportedType { valid, .. } => {
                assert!(valid.contains("array_first"));
                assert!(valid.contains("date"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_empty_registry_reports_unsupported() {
        let registry = TransformerRegistry::new();
        assert!(registry.get(TransformerKind::Trim).is_err());
    }

    #[test]
    fn test_default_registry_has_all_kinds() {
        let registry = TransformerRegistry::with_defaults();
        for kind in TransformerKind::iter() {
            assert!(registry.get(kind).is_ok(), "missing {kind}");
        }
    }

    #[test]
    fn test_hyphenated_alias_deserializes() {
        let kind: TransformerKind = serde_yaml::from_str("array-first").unwrap();
        assert_eq!(kind, TransformerKind::ArrayFirst);
    }
}
