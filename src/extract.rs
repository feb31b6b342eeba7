// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 feedflow contributors

//! Field extraction over nested records
//!
//! Paths use dot notation (`vehicle.make`), numeric segments index into
//! arrays (`images.0`), and a `*` segment fans out over every element of an
//! array (or every value of an object), gathering the results into a list:
//! `items.*.sku` on `{items: [{sku: "a"}, {sku: "b"}]}` yields `["a", "b"]`.
//!
//! A wildcard that gathers nothing yields `None`, never an empty list.

use serde_json::Value;

use crate::record::Record;

/// Extract the value at `path`, or `None` when nothing is there
pub fn extract(record: &Record, path: &str) -> Option<Value> {
    // Literal keys win, so CSV headers containing dots stay addressable
    if let Some(value) = record.get(path) {
        return Some(value.clone());
    }

    let segments: Vec<&str> = path.split('.').collect();
    let (first, rest) = segments.split_first()?;

    if *first == "*" {
        return gather(record.values(), rest);
    }

    walk(record.get(*first)?, rest)
}

/// Extract from an arbitrary JSON value rather than a record
pub fn extract_value(value: &Value, path: &str) -> Option<Value> {
    if path.is_empty() {
        return Some(value.clone());
    }
    let segments: Vec<&str> = path.split('.').collect();
    walk(value, &segments)
}

fn walk(value: &Value, segments: &[&str]) -> Option<Value> {
    let Some((segment, rest)) = segments.split_first() else {
        return Some(value.clone());
    };

    match (*segment, value) {
        ("*", Value::Array(items)) => gather(items.iter(), rest),
        ("*", Value::Object(map)) => gather(map.values(), rest),
        ("*", _) => None,
        (key, Value::Object(map)) => walk(map.get(key)?, rest),
        (key, Value::Array(items)) => {
            let index: usize = key.parse().ok()?;
            walk(items.get(index)?, rest)
        }
        _ => None,
    }
}

fn gather<'a>(items: impl Iterator<Item = &'a Value>, rest: &[&str]) -> Option<Value> {
    let nested = rest.contains(&"*");
    let mut collected = Vec::new();

    for item in items {
        match walk(item, rest) {
            Some(Value::Array(inner)) if nested => collected.extend(inner),
            Some(value) => collected.push(value),
            None => {}
        }
    }

    if collected.is_empty() {
        None
    } else {
        Some(Value::Array(collected))
    }
}

/// Write `value` at a dotted `path`, creating intermediate objects
///
/// An intermediate segment that holds a non-object value is replaced.
pub fn insert_path(record: &mut Record, path: &str, value: Value) {
    let mut segments = path.split('.').peekable();
    let mut current = record;

    while let Some(segment) = segments.next() {
        if segments.peek().is_none() {
            current.insert(segment.to_string(), value);
            return;
        }

        let slot = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Record::new()));
        if !slot.is_object() {
            *slot = Value::Object(Record::new());
        }
        let Value::Object(next) = slot else {
            return;
        };
        current = next;
    }
}
