// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 feedflow contributors

//! Rule evaluation over record sets

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{FilterRule, Operator, OperatorRegistry};
use crate::errors::{FeedflowResult, RecordError, RowError};
use crate::extract::extract;
use crate::pipeline::FilterResult;
use crate::record::Record;

/// Evaluation counters for one rule
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleStats {
    pub key: String,
    pub operator: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub evaluated: usize,
    pub passed: usize,
    pub rejected: usize,
    pub errored: usize,
}

impl RuleStats {
    fn for_rule(rule: &FilterRule) -> Self {
        Self {
            key: rule.key.clone(),
            operator: rule.operator.to_string(),
            description: rule.description.clone(),
            ..Default::default()
        }
    }
}

/// A rule set with operators resolved up front
pub struct FilterEngine<'a> {
    rules: Vec<(&'a FilterRule, &'a dyn Operator)>,
}

impl<'a> FilterEngine<'a> {
    /// Resolve every rule's operator; fails on the first unregistered one
    pub fn new(rules: &'a [FilterRule], registry: &'a OperatorRegistry) -> FeedflowResult<Self> {
        let rules = rules
            .iter()
            .map(|rule| Ok((rule, registry.get(rule.operator)?)))
            .collect::<FeedflowResult<Vec<_>>>()?;
        Ok(Self { rules })
    }

    /// Number of rules
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Evaluate one record; stops at the first rejecting rule
    ///
    /// `stats` must hold one entry per rule.
    pub fn matches(&self, record: &Record, stats: &mut [RuleStats]) -> Result<bool, RecordError> {
        for ((rule, operator), stat) in self.rules.iter().zip(stats.iter_mut()) {
            stat.evaluated += 1;
            let value = extract(record, &rule.key).unwrap_or(Value::Null);

            match operator.apply(&value, &rule.value, &rule.options()) {
                Ok(true) => stat.passed += 1,
                Ok(false) => {
                    stat.rejected += 1;
                    return Ok(false);
                }
                Err(reason) => {
                    stat.errored += 1;
                    return Err(RecordError::Operator {
                        key: rule.key.clone(),
                        operator: rule.operator.to_string(),
                        reason,
                    });
                }
            }
        }
        Ok(true)
    }

    /// Filter a record set
    ///
    /// A record whose evaluation fails is excluded and reported as a row
    /// error; the remaining records are still evaluated.
    pub fn apply(&self, records: &[Record], warn_rows: bool) -> FilterResult {
        let total = records.len();
        let mut stats: Vec<RuleStats> = self.rules.iter().map(|(r, _)| RuleStats::for_rule(r)).collect();
        let mut kept = Vec::new();
        let mut errors = Vec::new();

        for (index, record) in records.iter().enumerate() {
            match self.matches(record, &mut stats) {
                Ok(true) => kept.push(record.clone()),
                Ok(false) => {}
                Err(e) => {
                    if warn_rows {
                        tracing::warn!(row = index, error = %e, "filter rule failed, record excluded");
                    }
                    errors.push(RowError::new(index, e.to_string()));
                }
            }
        }

        let filtered_count = kept.len();
        FilterResult {
            records: kept,
            total,
            filtered_count,
            excluded_count: total - filtered_count,
            rule_stats: stats,
            errors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterOperator;
    use serde_json::json;

    fn rows(values: Vec<Value>) -> Vec<Record> {
        values
            .into_iter()
            .map(|v| v.as_object().cloned().unwrap())
            .collect()
    }

    #[test]
    fn test_case_insensitive_equals_keeps_one_row() {
        let registry = OperatorRegistry::with_defaults();
        let rules = vec![FilterRule::new("name", FilterOperator::Equals, json!("FOO"))];
        let engine = FilterEngine::new(&rules, &registry).unwrap();

        let result = engine.apply(&rows(vec![json!({"name": "Foo"}), json!({"name": "bar"})]), true);

        assert_eq!(result.total, 2);
        assert_eq!(result.filtered_count, 1);
        assert_eq!(result.excluded_count, 1);
        assert_eq!(result.records, rows(vec![json!({"name": "Foo"})]));
        assert!(result.errors.is_empty());
    }

    #[test]
    fn test_and_short_circuits() {
        let registry = OperatorRegistry::with_defaults();
        let rules = vec![
            FilterRule::new("make", FilterOperator::Equals, json!("volvo")),
            FilterRule::new("price", FilterOperator::GreaterThan, json!(1000)),
        ];
        let engine = FilterEngine::new(&rules, &registry).unwrap();

        let result = engine.apply(
            &rows(vec![
                json!({"make": "Volvo", "price": 5000}),
                json!({"make": "Audi", "price": 5000}),
                json!({"make": "Volvo", "price": 10}),
            ]),
            true,
        );

        assert_eq!(result.filtered_count, 1);
        assert_eq!(result.rule_stats[0].evaluated, 3);
        assert_eq!(result.rule_stats[0].rejected, 1);
        // The Audi row never reaches the second rule
        assert_eq!(result.rule_stats[1].evaluated, 2);
        assert_eq!(result.rule_stats[1].passed, 1);
    }

    #[test]
    fn test_operator_error_excludes_record_and_continues() {
        let registry = OperatorRegistry::with_defaults();
        let rules = vec![FilterRule::new("year", FilterOperator::Between, json!([2000]))];
        let engine = FilterEngine::new(&rules, &registry).unwrap();

        let result = engine.apply(&rows(vec![json!({"year": 2010}), json!({"year": 2012})]), false);

        assert_eq!(result.filtered_count, 0);
        assert_eq!(result.errors.len(), 2);
        assert_eq!(result.errors[0].index, 0);
        assert_eq!(result.errors[1].index, 1);
        assert_eq!(result.rule_stats[0].errored, 2);
    }

    #[test]
    fn test_missing_field_is_null() {
        let registry = OperatorRegistry::with_defaults();
        let rules = vec![FilterRule::new("vin", FilterOperator::IsNull, Value::Null)];
        let engine = FilterEngine::new(&rules, &registry).unwrap();

        let result = engine.apply(&rows(vec![json!({"vin": "X"}), json!({})]), true);
        assert_eq!(result.records, rows(vec![json!({})]));
    }

    #[test]
    fn test_wildcard_key() {
        let registry = OperatorRegistry::with_defaults();
        let rules = vec![FilterRule::new("items.*.sku", FilterOperator::In, json!(["b"]))];
        let engine = FilterEngine::new(&rules, &registry).unwrap();

        let result = engine.apply(
            &rows(vec![
                json!({"items": [{"sku": "a"}, {"sku": "b"}]}),
                json!({"items": [{"sku": "c"}]}),
            ]),
            true,
        );
        assert_eq!(result.filtered_count, 1);
    }

    #[test]
    fn test_unregistered_operator_fails_construction() {
        let registry = OperatorRegistry::new();
        let rules = vec![FilterRule::new("name", FilterOperator::Equals, json!("x"))];
        assert!(FilterEngine::new(&rules, &registry).is_err());
    }
}
