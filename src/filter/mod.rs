// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 feedflow contributors

//! Record filtering
//!
//! A record survives the filter stage iff every configured rule accepts it.
//! Rules are evaluated in order and evaluation stops at the first rejecting
//! rule, so operators must be free of side effects.

mod engine;
mod operators;

pub use engine::{FilterEngine, RuleStats};
pub use operators::{
    BetweenOperator, CompareOperator, ContainsOperator, EmptyOperator, EndsWithOperator,
    EqualsOperator, InOperator, NullOperator, RegexOperator, StartsWithOperator,
};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};

use crate::errors::{FeedflowError, FeedflowResult};

/// Filter operator identifiers
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FilterOperator {
    Equals,
    NotEquals,
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    Regex,
    NotRegex,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    In,
    NotIn,
    IsNull,
    IsNotNull,
    IsEmpty,
    IsNotEmpty,
    Between,
    NotBetween,
}

impl FilterOperator {
    /// Parse an identifier, failing with the list of valid ones
    pub fn parse(name: &str) -> FeedflowResult<Self> {
        name.parse()
            .map_err(|_| FeedflowError::unsupported("filter operator", name, Self::iter()))
    }

    /// Whether the operator ignores the rule value
    pub fn is_unary(&self) -> bool {
        matches!(
            self,
            Self::IsNull | Self::IsNotNull | Self::IsEmpty | Self::IsNotEmpty
        )
    }
}

/// One filter rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterRule {
    /// Field path (dot notation, `*` wildcards)
    pub key: String,

    /// Operator to apply
    pub operator: FilterOperator,

    /// Operand; a list for `in`/`not_in`, a two-element range for `between`
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub value: Value,

    /// Compare strings case-sensitively
    #[serde(default)]
    pub case_sensitive: bool,

    /// Flags for regex operators (`i`, `m`, `s`, `x`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex_flags: Option<String>,

    /// Human readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl FilterRule {
    /// Create a rule with default options
    pub fn new(key: impl Into<String>, operator: FilterOperator, value: Value) -> Self {
        Self {
            key: key.into(),
            operator,
            value,
            case_sensitive: false,
            regex_flags: None,
            description: None,
        }
    }

    /// Options handed to the operator
    pub fn options(&self) -> OperatorOptions<'_> {
        OperatorOptions {
            case_sensitive: self.case_sensitive,
            regex_flags: self.regex_flags.as_deref(),
        }
    }
}

/// Evaluation options passed to every operator call
#[derive(Debug, Clone, Copy, Default)]
pub struct OperatorOptions<'a> {
    pub case_sensitive: bool,
    pub regex_flags: Option<&'a str>,
}

/// A named boolean predicate
pub trait Operator: Send + Sync {
    /// Evaluate `value` (null when the field is missing) against `rule_value`
    ///
    /// `Err` means the record could not be evaluated; the filter stage records
    /// it and excludes the record.
    fn apply(
        &self,
        value: &Value,
        rule_value: &Value,
        options: &OperatorOptions<'_>,
    ) -> Result<bool, String>;
}

/// Registry mapping operator identifiers to implementations
pub struct OperatorRegistry {
    operators: HashMap<FilterOperator, Box<dyn Operator>>,
}

impl OperatorRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            operators: HashMap::new(),
        }
    }

    /// Create a registry with every built-in operator
    pub fn with_defaults() -> Self {
        use std::cmp::Ordering;

        let mut registry = Self::new();
        registry.register(FilterOperator::Equals, Box::new(EqualsOperator::new(false)));
        registry.register(FilterOperator::NotEquals, Box::new(EqualsOperator::new(true)));
        registry.register(FilterOperator::Contains, Box::new(ContainsOperator::new(false)));
        registry.register(FilterOperator::NotContains, Box::new(ContainsOperator::new(true)));
        registry.register(FilterOperator::StartsWith, Box::new(StartsWithOperator));
        registry.register(FilterOperator::EndsWith, Box::new(EndsWithOperator));
        registry.register(FilterOperator::Regex, Box::new(RegexOperator::new(false)));
        registry.register(FilterOperator::NotRegex, Box::new(RegexOperator::new(true)));
        registry.register(
            FilterOperator::GreaterThan,
            Box::new(CompareOperator::new(&[Ordering::Greater])),
        );
        registry.register(
            FilterOperator::GreaterThanOrEqual,
            Box::new(CompareOperator::new(&[Ordering::Greater, Ordering::Equal])),
        );
        registry.register(
            FilterOperator::LessThan,
            Box::new(CompareOperator::new(&[Ordering::Less])),
        );
        registry.register(
            FilterOperator::LessThanOrEqual,
            Box::new(CompareOperator::new(&[Ordering::Less, Ordering::Equal])),
        );
        registry.register(FilterOperator::In, Box::new(InOperator::new(false)));
        registry.register(FilterOperator::NotIn, Box::new(InOperator::new(true)));
        registry.register(FilterOperator::IsNull, Box::new(NullOperator::new(false)));
        registry.register(FilterOperator::IsNotNull, Box::new(NullOperator::new(true)));
        registry.register(FilterOperator::IsEmpty, Box::new(EmptyOperator::new(false)));
        registry.register(FilterOperator::IsNotEmpty, Box::new(EmptyOperator::new(true)));
        registry.register(FilterOperator::Between, Box::new(BetweenOperator::new(false)));
        registry.register(FilterOperator::NotBetween, Box::new(BetweenOperator::new(true)));
        registry
    }

    /// Register (or replace) an operator
    pub fn register(&mut self, operator: FilterOperator, implementation: Box<dyn Operator>) {
        self.operators.insert(operator, implementation);
    }

    /// Look up an operator
    pub fn get(&self, operator: FilterOperator) -> FeedflowResult<&dyn Operator> {
        self.operators
            .get(&operator)
            .map(|op| op.as_ref())
            .ok_or_else(|| {
                let registered: Vec<String> = FilterOperator::iter()
                    .filter(|op| self.operators.contains_key(op))
                    .map(|op| op.to_string())
                    .collect();
                FeedflowError::unsupported("filter operator", operator.as_ref(), registered)
            })
    }
}

impl Default for OperatorRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
