//! YAML front matter: splitting it off a document and editing named fields.

use std::path::PathBuf;

use serde_yaml::{Mapping, Value};

use crate::error::Error;

/// Opening and closing delimiter line.
const DELIMITER: &str = "---";

/// The raw front matter block of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawFrontMatter<'a> {
    /// Whole block including both delimiter lines and the final newline.
    pub block: &'a str,
    /// YAML between the delimiters.
    pub yaml: &'a str,
}

/// Split `content` into its front matter block (if any) and the body.
/// The block must open on the first line (after an optional BOM) and close
/// with a `---` or `...` line; otherwise the whole content is body.
pub fn split(content: &str) -> (Option<RawFrontMatter<'_>>, &str) {
    let start = if content.starts_with('\u{feff}') { '\u{feff}'.len_utf8() } else { 0 };
    let rest = content.get(start..).unwrap_or("");

    let mut lines = rest.split_inclusive('\n');
    let Some(first) = lines.next() else {
        return (None, content);
    };
    if first.trim_end() != DELIMITER {
        return (None, content);
    }

    let yaml_start = start.saturating_add(first.len());
    let mut offset = yaml_start;
    for line in lines {
        let line_end = offset.saturating_add(line.len());
        let trimmed = line.trim_end();
        if trimmed == DELIMITER || trimmed == "..." {
            let (Some(block), Some(yaml), Some(body)) = (
                content.get(..line_end),
                content.get(yaml_start..offset),
                content.get(line_end..),
            ) else {
                return (None, content);
            };
            return (Some(RawFrontMatter { block, yaml }), body);
        }
        offset = line_end;
    }

    return (None, content);
}

/// Front matter as an ordered key → value mapping.
///
/// Fields are read and written as lists of strings: a string scalar is a
/// one-element list, a sequence yields its string elements. Other values are
/// preserved but never exposed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrontMatter {
    /// Parsed top-level mapping, in source order.
    fields: Mapping,
}

impl FrontMatter {
    /// String keys in source order.
    pub fn keys(&self) -> Vec<String> {
        return self
            .fields
            .keys()
            .filter_map(|k| return k.as_str().map(str::to_string))
            .collect();
    }

    /// Parse the YAML between the delimiters. Empty YAML is an empty mapping.
    ///
    /// # Errors
    ///
    /// Returns `Error::Yaml` for invalid YAML and `Error::ParseFailed` when
    /// the top level is not a mapping.
    pub fn parse(yaml: &str) -> Result<Self, Error> {
        let value: Value = serde_yaml::from_str(yaml)?;
        return match value {
            Value::Mapping(fields) => Ok(Self { fields }),
            Value::Null => Ok(Self::default()),
            _ => Err(Error::ParseFailed {
                file: PathBuf::from("<front matter>"),
                reason: "front matter is not a mapping".to_string(),
            }),
        };
    }

    /// Serialize back to a complete block with delimiters.
    ///
    /// # Errors
    ///
    /// Returns `Error::Yaml` if serialization fails.
    pub fn serialize(&self) -> Result<String, Error> {
        if self.fields.is_empty() {
            return Ok(format!("{DELIMITER}\n{DELIMITER}\n"));
        }
        let yaml = serde_yaml::to_string(&self.fields)?;
        return Ok(format!("{DELIMITER}\n{yaml}{DELIMITER}\n"));
    }

    /// Replace the string values of `key`, keeping the field's shape.
    /// A missing key is inserted as a scalar (or a sequence for several values).
    pub fn set_values(&mut self, key: &str, values: &[String]) {
        let Some(existing) = self.fields.get_mut(key) else {
            let inserted = match values {
                [single] => Value::String(single.clone()),
                _ => Value::Sequence(values.iter().cloned().map(Value::String).collect()),
            };
            self.fields.insert(Value::String(key.to_string()), inserted);
            return;
        };

        let mut replacements = values.iter();
        match existing {
            Value::Sequence(items) => {
                for item in items.iter_mut().filter(|i| return i.is_string()) {
                    if let Some(next) = replacements.next() {
                        *item = Value::String(next.clone());
                    }
                }
            },
            _ => {
                if let Some(first) = replacements.next() {
                    *existing = Value::String(first.clone());
                }
            },
        }
    }

    /// String values of `key`; empty if absent or not string-valued.
    pub fn values(&self, key: &str) -> Vec<String> {
        return match self.fields.get(key) {
            Some(Value::String(s)) => vec![s.clone()],
            Some(Value::Sequence(items)) => {
                items.iter().filter_map(|i| return i.as_str().map(str::to_string)).collect()
            },
            _ => Vec::new(),
        };
    }
}
