// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 feedflow contributors

//! Built-in filter operators
//!
//! String operators compare case-insensitively unless `case_sensitive` is set.
//! When the extracted value is a list (wildcard paths), positive operators
//! accept if any element matches and negated operators accept if none does.

use regex::{Regex, RegexBuilder};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Mutex;

use super::{Operator, OperatorOptions};
use crate::record::{is_empty_value, value_to_f64, value_to_string};

fn elements(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    }
}

fn fold_case(s: &str, case_sensitive: bool) -> String {
    if case_sensitive {
        s.to_string()
    } else {
        s.to_lowercase()
    }
}

fn scalar_equals(a: &Value, b: &Value, case_sensitive: bool) -> bool {
    if let (Some(x), Some(y)) = (value_to_f64(a), value_to_f64(b)) {
        return x == y;
    }
    fold_case(&value_to_string(a), case_sensitive) == fold_case(&value_to_string(b), case_sensitive)
}

/// `equals` / `not_equals`
pub struct EqualsOperator {
    negate: bool,
}

impl EqualsOperator {
    pub fn new(negate: bool) -> Self {
        Self { negate }
    }
}

impl Operator for EqualsOperator {
    fn apply(
        &self,
        value: &Value,
        rule_value: &Value,
        options: &OperatorOptions<'_>,
    ) -> Result<bool, String> {
        let matched = elements(value)
            .into_iter()
            .any(|v| scalar_equals(v, rule_value, options.case_sensitive));
        Ok(matched != self.negate)
    }
}

/// `contains` / `not_contains`
///
/// Substring search on strings, membership on lists.
pub struct ContainsOperator {
    negate: bool,
}

impl ContainsOperator {
    pub fn new(negate: bool) -> Self {
        Self { negate }
    }
}

impl Operator for ContainsOperator {
    fn apply(
        &self,
        value: &Value,
        rule_value: &Value,
        options: &OperatorOptions<'_>,
    ) -> Result<bool, String> {
        let matched = match value {
            Value::Array(items) => items
                .iter()
                .any(|v| scalar_equals(v, rule_value, options.case_sensitive)),
            Value::Null => false,
            other => {
                let haystack = fold_case(&value_to_string(other), options.case_sensitive);
                let needle = fold_case(&value_to_string(rule_value), options.case_sensitive);
                haystack.contains(&needle)
            }
        };
        Ok(matched != self.negate)
    }
}

fn any_string(
    value: &Value,
    rule_value: &Value,
    options: &OperatorOptions<'_>,
    test: impl Fn(&str, &str) -> bool,
) -> bool {
    let needle = fold_case(&value_to_string(rule_value), options.case_sensitive);
    elements(value)
        .into_iter()
        .filter(|v| !v.is_null())
        .any(|v| test(&fold_case(&value_to_string(v), options.case_sensitive), &needle))
}

/// `starts_with`
pub struct StartsWithOperator;

impl Operator for StartsWithOperator {
    fn apply(
        &self,
        value: &Value,
        rule_value: &Value,
        options: &OperatorOptions<'_>,
    ) -> Result<bool, String> {
        Ok(any_string(value, rule_value, options, |h, n| h.starts_with(n)))
    }
}

/// `ends_with`
pub struct EndsWithOperator;

impl Operator for EndsWithOperator {
    fn apply(
        &self,
        value: &Value,
        rule_value: &Value,
        options: &OperatorOptions<'_>,
    ) -> Result<bool, String> {
        Ok(any_string(value, rule_value, options, |h, n| h.ends_with(n)))
    }
}

/// `regex` / `not_regex`
///
/// Accepts either a bare pattern (flags from `regex_flags`) or a delimited
/// `/pattern/flags` form. Patterns that fail to compile evaluate to false for
/// both operators. Compiled patterns are cached per operator.
pub struct RegexOperator {
    negate: bool,
    cache: Mutex<HashMap<(String, String), Option<Regex>>>,
}

impl RegexOperator {
    pub fn new(negate: bool) -> Self {
        Self {
            negate,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Split `/body/flags` into its parts; bare patterns use `default_flags`
    fn split_delimited<'a>(pattern: &'a str, default_flags: &'a str) -> (&'a str, &'a str) {
        if pattern.len() >= 2 && pattern.starts_with('/') {
            if let Some(end) = pattern.rfind('/').filter(|&end| end > 0) {
                let flags = &pattern[end + 1..];
                if flags.chars().all(|c| c.is_ascii_alphabetic()) {
                    return (&pattern[1..end], flags);
                }
            }
        }
        (pattern, default_flags)
    }

    /// Compile a pattern with PCRE-style flags
    pub fn compile(pattern: &str, flags: Option<&str>) -> Option<Regex> {
        let (body, flags) = Self::split_delimited(pattern, flags.unwrap_or(""));
        let mut builder = RegexBuilder::new(body);
        for flag in flags.chars() {
            match flag {
                'i' => {
                    builder.case_insensitive(true);
                }
                'm' => {
                    builder.multi_line(true);
                }
                's' => {
                    builder.dot_matches_new_line(true);
                }
                'x' => {
                    builder.ignore_whitespace(true);
                }
                _ => {}
            }
        }
        builder.build().ok()
    }

    fn regex(&self, pattern: &str, flags: Option<&str>) -> Option<Regex> {
        let key = (pattern.to_string(), flags.unwrap_or("").to_string());
        let mut cache = match self.cache.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        cache
            .entry(key)
            .or_insert_with(|| Self::compile(pattern, flags))
            .clone()
    }
}

impl Operator for RegexOperator {
    fn apply(
        &self,
        value: &Value,
        rule_value: &Value,
        options: &OperatorOptions<'_>,
    ) -> Result<bool, String> {
        let pattern = value_to_string(rule_value);
        let Some(regex) = self.regex(&pattern, options.regex_flags) else {
            tracing::debug!(pattern = %pattern, "invalid regex pattern evaluates to false");
            return Ok(false);
        };

        let matched = elements(value)
            .into_iter()
            .filter(|v| !v.is_null())
            .any(|v| regex.is_match(&value_to_string(v)));
        Ok(matched != self.negate)
    }
}

/// Numeric comparisons; non-numeric operands evaluate to false
pub struct CompareOperator {
    accepted: Vec<Ordering>,
}

impl CompareOperator {
    pub fn new(accepted: &[Ordering]) -> Self {
        Self {
            accepted: accepted.to_vec(),
        }
    }
}

impl Operator for CompareOperator {
    fn apply(
        &self,
        value: &Value,
        rule_value: &Value,
        _options: &OperatorOptions<'_>,
    ) -> Result<bool, String> {
        let Some(bound) = value_to_f64(rule_value) else {
            return Ok(false);
        };
        Ok(elements(value).into_iter().any(|v| {
            value_to_f64(v)
                .and_then(|n| n.partial_cmp(&bound))
                .is_some_and(|ord| self.accepted.contains(&ord))
        }))
    }
}

/// Operand list for `in`: a list, or a comma separated string
fn operand_list(rule_value: &Value) -> Vec<Value> {
    match rule_value {
        Value::Array(items) => items.clone(),
        Value::String(s) => s
            .split(',')
            .map(|part| Value::String(part.trim().to_string()))
            .collect(),
        Value::Null => Vec::new(),
        other => vec![other.clone()],
    }
}

/// `in` / `not_in`
pub struct InOperator {
    negate: bool,
}

impl InOperator {
    pub fn new(negate: bool) -> Self {
        Self { negate }
    }
}

impl Operator for InOperator {
    fn apply(
        &self,
        value: &Value,
        rule_value: &Value,
        options: &OperatorOptions<'_>,
    ) -> Result<bool, String> {
        let list = operand_list(rule_value);
        let matched = elements(value)
            .into_iter()
            .filter(|v| !v.is_null())
            .any(|v| list.iter().any(|item| scalar_equals(v, item, options.case_sensitive)));
        Ok(matched != self.negate)
    }
}

/// `is_null` / `is_not_null`
pub struct NullOperator {
    negate: bool,
}

impl NullOperator {
    pub fn new(negate: bool) -> Self {
        Self { negate }
    }
}

impl Operator for NullOperator {
    fn apply(
        &self,
        value: &Value,
        _rule_value: &Value,
        _options: &OperatorOptions<'_>,
    ) -> Result<bool, String> {
        Ok(value.is_null() != self.negate)
    }
}

/// `is_empty` / `is_not_empty`
pub struct EmptyOperator {
    negate: bool,
}

impl EmptyOperator {
    pub fn new(negate: bool) -> Self {
        Self { negate }
    }
}

impl Operator for EmptyOperator {
    fn apply(
        &self,
        value: &Value,
        _rule_value: &Value,
        _options: &OperatorOptions<'_>,
    ) -> Result<bool, String> {
        Ok(is_empty_value(value) != self.negate)
    }
}

/// `between` / `not_between` (inclusive)
///
/// Reversed bounds are swapped. Compares numerically when the value and both
/// bounds are numeric, lexicographically otherwise.
pub struct BetweenOperator {
    negate: bool,
}

impl BetweenOperator {
    pub fn new(negate: bool) -> Self {
        Self { negate }
    }

    /// Extract the `[min, max]` pair from the rule value
    pub fn bounds(rule_value: &Value) -> Result<(Value, Value), String> {
        let items = operand_list(rule_value);
        match items.as_slice() {
            [min, max] => Ok((min.clone(), max.clone())),
            _ => Err(format!(
                "between requires a two-element range, got {}",
                rule_value
            )),
        }
    }

    fn within(value: &Value, min: &Value, max: &Value, case_sensitive: bool) -> bool {
        if let (Some(v), Some(lo), Some(hi)) =
            (value_to_f64(value), value_to_f64(min), value_to_f64(max))
        {
            let (lo, hi) = if lo > hi { (hi, lo) } else { (lo, hi) };
            return v >= lo && v <= hi;
        }

        let v = fold_case(&value_to_string(value), case_sensitive);
        let lo = fold_case(&value_to_string(min), case_sensitive);
        let hi = fold_case(&value_to_string(max), case_sensitive);
        let (lo, hi) = if lo > hi { (hi, lo) } else { (lo, hi) };
        v >= lo && v <= hi
    }
}

impl Operator for BetweenOperator {
    fn apply(
        &self,
        value: &Value,
        rule_value: &Value,
        options: &OperatorOptions<'_>,
    ) -> Result<bool, String> {
        let (min, max) = Self::bounds(rule_value)?;
        let matched = elements(value)
            .into_iter()
            .filter(|v| !v.is_null())
            .any(|v| Self::within(v, &min, &max, options.case_sensitive));
        Ok(matched != self.negate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const INSENSITIVE: OperatorOptions<'static> = OperatorOptions {
        case_sensitive: false,
        regex_flags: None,
    };
    const SENSITIVE: OperatorOptions<'static> = OperatorOptions {
        case_sensitive: true,
        regex_flags: None,
    };

    #[test]
    fn test_equals_case_handling() {
        let eq = EqualsOperator::new(false);
        assert!(eq.apply(&json!("Foo"), &json!("FOO"), &INSENSITIVE).unwrap());
        assert!(!eq.apply(&json!("Foo"), &json!("FOO"), &SENSITIVE).unwrap());
        assert!(eq.apply(&json!(5), &json!("5.0"), &INSENSITIVE).unwrap());

        let ne = EqualsOperator::new(true);
        assert!(ne.apply(&json!("bar"), &json!("FOO"), &INSENSITIVE).unwrap());
    }

    #[test]
    fn test_equals_over_list() {
        let eq = EqualsOperator::new(false);
        assert!(eq.apply(&json!(["a", "b"]), &json!("B"), &INSENSITIVE).unwrap());
        let ne = EqualsOperator::new(true);
        assert!(!ne.apply(&json!(["a", "b"]), &json!("B"), &INSENSITIVE).unwrap());
    }

    #[test]
    fn test_contains_string_and_list() {
        let op = ContainsOperator::new(false);
        assert!(op.apply(&json!("Volvo XC90"), &json!("xc"), &INSENSITIVE).unwrap());
        assert!(op.apply(&json!(["red", "blue"]), &json!("Blue"), &INSENSITIVE).unwrap());
        assert!(!op.apply(&json!(["red", "blue"]), &json!("bl"), &INSENSITIVE).unwrap());
        assert!(!op.apply(&Value::Null, &json!("x"), &INSENSITIVE).unwrap());

        let not = ContainsOperator::new(true);
        assert!(not.apply(&json!("Volvo"), &json!("audi"), &INSENSITIVE).unwrap());
    }

    #[test]
    fn test_starts_and_ends_with() {
        assert!(StartsWithOperator
            .apply(&json!("WVW123"), &json!("wvw"), &INSENSITIVE)
            .unwrap());
        assert!(EndsWithOperator
            .apply(&json!("photo.JPG"), &json!(".jpg"), &INSENSITIVE)
            .unwrap());
        assert!(!EndsWithOperator
            .apply(&json!("photo.JPG"), &json!(".jpg"), &SENSITIVE)
            .unwrap());
    }

    #[test]
    fn test_regex_bare_and_delimited() {
        let op = RegexOperator::new(false);
        assert!(op.apply(&json!("ABC-123"), &json!("^[A-Z]+-\\d+$"), &INSENSITIVE).unwrap());
        assert!(op.apply(&json!("abc"), &json!("/^ABC$/i"), &INSENSITIVE).unwrap());

        let flagged = OperatorOptions {
            case_sensitive: false,
            regex_flags: Some("i"),
        };
        assert!(op.apply(&json!("abc"), &json!("^ABC$"), &flagged).unwrap());
        assert!(!op.apply(&json!("abc"), &json!("^ABC$"), &INSENSITIVE).unwrap());
    }

    #[test]
    fn test_invalid_regex_is_false_for_both() {
        let op = RegexOperator::new(false);
        let not = RegexOperator::new(true);
        assert!(!op.apply(&json!("abc"), &json!("(unclosed"), &INSENSITIVE).unwrap());
        assert!(!not.apply(&json!("abc"), &json!("(unclosed"), &INSENSITIVE).unwrap());
    }

    #[test]
    fn test_numeric_comparisons() {
        let gt = CompareOperator::new(&[Ordering::Greater]);
        let lte = CompareOperator::new(&[Ordering::Less, Ordering::Equal]);
        assert!(gt.apply(&json!("10"), &json!(5), &INSENSITIVE).unwrap());
        assert!(!gt.apply(&json!("five"), &json!(5), &INSENSITIVE).unwrap());
        assert!(!gt.apply(&json!(10), &json!("abc"), &INSENSITIVE).unwrap());
        assert!(lte.apply(&json!(5), &json!("5"), &INSENSITIVE).unwrap());
    }

    #[test]
    fn test_in_and_not_in() {
        let op = InOperator::new(false);
        assert!(op.apply(&json!("BMW"), &json!(["audi", "bmw"]), &INSENSITIVE).unwrap());
        assert!(!op.apply(&json!("BMW"), &json!(["audi", "bmw"]), &SENSITIVE).unwrap());
        assert!(op.apply(&json!("bmw"), &json!("audi, bmw"), &INSENSITIVE).unwrap());

        let not = InOperator::new(true);
        assert!(not.apply(&json!("opel"), &json!(["audi", "bmw"]), &INSENSITIVE).unwrap());
    }

    #[test]
    fn test_null_and_empty() {
        assert!(NullOperator::new(false).apply(&Value::Null, &Value::Null, &INSENSITIVE).unwrap());
        assert!(NullOperator::new(true).apply(&json!(""), &Value::Null, &INSENSITIVE).unwrap());
        assert!(EmptyOperator::new(false).apply(&json!(""), &Value::Null, &INSENSITIVE).unwrap());
        assert!(EmptyOperator::new(false).apply(&json!([]), &Value::Null, &INSENSITIVE).unwrap());
        assert!(EmptyOperator::new(true).apply(&json!(0), &Value::Null, &INSENSITIVE).unwrap());
    }

    #[test]
    fn test_between_swaps_reversed_bounds() {
        let op = BetweenOperator::new(false);
        assert!(op.apply(&json!(15), &json!([20, 10]), &INSENSITIVE).unwrap());
        assert!(op.apply(&json!("10"), &json!([10, 20]), &INSENSITIVE).unwrap());
        assert!(!op.apply(&json!(25), &json!([10, 20]), &INSENSITIVE).unwrap());
        assert!(BetweenOperator::new(true)
            .apply(&json!(25), &json!([10, 20]), &INSENSITIVE)
            .unwrap());
    }

    #[test]
    fn test_between_lexicographic() {
        let op = BetweenOperator::new(false);
        assert!(op.apply(&json!("m"), &json!(["z", "a"]), &INSENSITIVE).unwrap());
        assert!(op.apply(&json!("2024-05-01"), &json!(["2024-01-01", "2024-12-31"]), &INSENSITIVE).unwrap());
    }

    #[test]
    fn test_between_malformed_range_errors() {
        let op = BetweenOperator::new(false);
        assert!(op.apply(&json!(5), &json!([1]), &INSENSITIVE).is_err());
        assert!(op.apply(&json!(5), &json!(3), &INSENSITIVE).is_err());
    }
}
