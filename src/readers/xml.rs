// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 feedflow contributors

//! XML reader
//!
//! The document is converted into a JSON tree: attributes become `@name`
//! keys, repeated child elements become lists, and text content of an
//! element that also has attributes or children is stored under `#text`.
//! A leaf element becomes its text.
//!
//! Without `keep_root`, paths start below the root element. Without an
//! `entry_point`, the records are the root's only child element group.

use quick_xml::events::{BytesStart, Event};
use serde_json::Value;

use super::{records_from_document, strip_bom, ReadOutput, Reader, ReaderOptions};
use crate::errors::{FeedflowError, FeedflowResult};
use crate::record::Record;

pub(crate) const ACCEPTED: &[&str] = &["entry_point", "keep_root"];

pub struct XmlReader;

struct Element {
    name: String,
    fields: Record,
    text: String,
}

impl Element {
    fn open(start: &BytesStart<'_>) -> FeedflowResult<Self> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut fields = Record::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| FeedflowError::read(format!("Invalid XML attribute in <{name}>: {e}")))?;
            let key = format!("@{}", String::from_utf8_lossy(attr.key.as_ref()));
            let value = attr
                .unescape_value()
                .map_err(|e| FeedflowError::read(format!("Invalid XML attribute in <{name}>: {e}")))?;
            fields.insert(key, Value::String(value.into_owned()));
        }
        Ok(Self {
            name,
            fields,
            text: String::new(),
        })
    }

    fn add_child(&mut self, name: String, value: Value) {
        match self.fields.get_mut(&name) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                self.fields.insert(name, value);
            }
        }
    }

    fn into_value(self) -> Value {
        let text = self.text.trim();
        if self.fields.is_empty() {
            return Value::String(text.to_string());
        }
        let mut fields = self.fields;
        if !text.is_empty() {
            fields.insert("#text".into(), Value::String(text.to_string()));
        }
        Value::Object(fields)
    }
}

/// Parse an XML payload into `(root name, root value)`
pub fn parse_document(payload: &[u8]) -> FeedflowResult<(String, Value)> {
    let mut reader = quick_xml::Reader::from_reader(payload);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<(String, Value)> = None;
    let mut buf = Vec::new();

    loop {
        let event = reader.read_event_into(&mut buf).map_err(|e| {
            FeedflowError::read(format!(
                "Invalid XML at position {}: {e}",
                reader.buffer_position()
            ))
        })?;

        let closed = match event {
            Event::Start(start) => {
                stack.push(Element::open(&start)?);
                None
            }
            Event::Empty(start) => Some(Element::open(&start)?),
            Event::End(_) => stack.pop(),
            Event::Text(text) => {
                let text = text
                    .unescape()
                    .map_err(|e| FeedflowError::read(format!("Invalid XML text: {e}")))?;
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&text);
                }
                None
            }
            Event::CData(data) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
                None
            }
            Event::Eof => break,
            _ => None,
        };

        if let Some(element) = closed {
            let name = element.name.clone();
            let value = element.into_value();
            match stack.last_mut() {
                Some(parent) => parent.add_child(name, value),
                None if root.is_none() => root = Some((name, value)),
                None => {
                    return Err(FeedflowError::read(
                        "XML document has more than one root element",
                    ))
                }
            }
        }
        buf.clear();
    }

    if let Some(open) = stack.last() {
        return Err(FeedflowError::read(format!(
            "XML document ended inside <{}>",
            open.name
        )));
    }
    root.ok_or_else(|| FeedflowError::read("XML document has no root element"))
}

/// The single child element group below the root, if there is exactly one
fn default_entry(content: &Value) -> FeedflowResult<Option<String>> {
    let Value::Object(fields) = content else {
        return Ok(None);
    };
    let groups: Vec<&String> = fields
        .keys()
        .filter(|k| !k.starts_with('@') && !k.starts_with('#'))
        .collect();
    match groups.as_slice() {
        [] => Ok(None),
        [only] => Ok(Some((*only).clone())),
        many => Err(FeedflowError::read(format!(
            "XML root has several child elements ({}); set options.entry_point",
            many.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", ")
        ))),
    }
}

impl Reader for XmlReader {
    fn name(&self) -> &'static str {
        "xml"
    }

    fn accepted_options(&self) -> &'static [&'static str] {
        ACCEPTED
    }

    fn read(&self, payload: &[u8], options: &ReaderOptions) -> FeedflowResult<ReadOutput> {
        self.validate_options(options)?;
        let (root_name, content) = parse_document(strip_bom(payload))?;
        let keep_root = options.keep_root.unwrap_or(false);

        let entry = match options.entry_point.clone() {
            Some(path) => Some(path),
            None => default_entry(&content)?.map(|group| {
                if keep_root {
                    format!("{root_name}.{group}")
                } else {
                    group
                }
            }),
        };

        let document = if keep_root {
            let mut wrapped = Record::new();
            wrapped.insert(root_name, content);
            Value::Object(wrapped)
        } else {
            content
        };

        records_from_document(&document, entry.as_deref())
    }
}
