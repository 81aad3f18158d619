//! Sections backed by a local JSON document
//!
//! Top-level keys are section types. An array holds one anonymous section
//! per object item (named by its `.name` when present); an object is a
//! single section named after its type:
//!
//! ```json
//! {
//!     "system": { "hostname": "OpenWrt" },
//!     "rule": [
//!         { "name": "Allow-SSH", "dest_port": 22 },
//!         { ".name": "dns", "dest_port": 53 }
//!     ]
//! }
//! ```
//!
//! The config name passed to [`ConfigSource`] methods is ignored.

use crate::error::{Error, Result};
use crate::mutators::reposition;
use crate::source::ConfigSource;
use crate::types::{OptionValue, Section, SectionMap};
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::cmp::Ordering;

/// Sort position of sections without an explicit `.index`
const UNINDEXED: i64 = 9999;

/// In-memory sections built from JSON
#[derive(Debug, Default)]
pub struct JsonConfig {
    data: Mutex<SectionMap>,
}

impl JsonConfig {
    /// Build sections from a JSON object
    pub fn from_value(value: Value) -> Result<Self> {
        let types = match value {
            Value::Object(types) => types,
            other => {
                return Err(Error::InvalidData(format!(
                    "expected an object of section types, got {}",
                    other
                )))
            }
        };

        let mut data: IndexMap<String, Section> = IndexMap::new();
        let mut count: i64 = 0;

        for (section_type, entry) in types {
            match entry {
                Value::Array(items) => {
                    for item in items {
                        let Value::Object(item) = item else {
                            continue;
                        };

                        let (name, anonymous) = match item.get(".name") {
                            Some(Value::String(name)) => (name.clone(), false),
                            _ => (format!("{}{}", section_type, count), true),
                        };

                        let mut section = Section::new(name.clone(), section_type.clone(), count);
                        section.anonymous = anonymous;
                        section.options = options_from(&item);
                        count += 1;

                        data.insert(name, section);
                    }
                }
                Value::Object(item) => {
                    let index = item
                        .get(".index")
                        .and_then(index_from)
                        .unwrap_or(UNINDEXED);

                    let mut section = Section::new(section_type.clone(), section_type.clone(), index);
                    section.options = options_from(&item);
                    count += 1;

                    data.insert(section_type, section);
                }
                _ => {}
            }
        }

        data.sort_by(|a_name, a, b_name, b| {
            a.index
                .cmp(&b.index)
                .then_with(|| natural_cmp(a_name, b_name))
        });
        for (position, section) in data.values_mut().enumerate() {
            section.index = position as i64;
        }

        Ok(Self {
            data: Mutex::new(data),
        })
    }

    /// Current sections as JSON, keyed by id
    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(&*self.data.lock())?)
    }
}

fn index_from(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Options of a JSON item; scalars are stringified, other values dropped
fn options_from(item: &Map<String, Value>) -> IndexMap<String, OptionValue> {
    item.iter()
        .filter(|(key, _)| !key.starts_with('.'))
        .filter_map(|(key, value)| {
            let value = match value {
                Value::Array(items) => OptionValue::List(items.iter().filter_map(scalar).collect()),
                other => OptionValue::Single(scalar(other)?),
            };
            Some((key.clone(), value))
        })
        .collect()
}

/// Compare strings with digit runs ordered numerically (`rule2` < `rule10`)
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut a_chars = a.chars().peekable();
    let mut b_chars = b.chars().peekable();

    loop {
        match (a_chars.peek().copied(), b_chars.peek().copied()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                let x_run = take_digits(&mut a_chars);
                let y_run = take_digits(&mut b_chars);
                let x_trim = x_run.trim_start_matches('0');
                let y_trim = y_run.trim_start_matches('0');

                let ord = x_trim
                    .len()
                    .cmp(&y_trim.len())
                    .then_with(|| x_trim.cmp(y_trim));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (Some(x), Some(y)) => {
                let ord = x.to_lowercase().cmp(y.to_lowercase());
                if ord != Ordering::Equal {
                    return ord;
                }
                a_chars.next();
                b_chars.next();
            }
        }
    }
}

fn take_digits(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut run = String::new();
    while let Some(c) = chars.next_if(|c| c.is_ascii_digit()) {
        run.push(c);
    }
    run
}

impl ConfigSource for JsonConfig {
    fn resolve_sid(&self, _config: &str, sid: &str) -> Option<String> {
        (!sid.is_empty()).then(|| sid.to_string())
    }

    fn get(&self, _config: &str, sid: &str, option: &str) -> Option<OptionValue> {
        self.data.lock().get(sid)?.get(option)
    }

    fn get_section(&self, _config: &str, sid: &str) -> Option<Section> {
        self.data.lock().get(sid).cloned()
    }

    fn set(&self, _config: &str, sid: &str, option: &str, value: Option<OptionValue>) {
        if option.is_empty() || option.starts_with('.') {
            return;
        }

        let mut data = self.data.lock();
        let Some(section) = data.get_mut(sid) else {
            return;
        };

        match value {
            Some(value) => {
                section.options.insert(option.to_string(), value);
            }
            None => {
                section.options.shift_remove(option);
            }
        }
    }

    fn sections(&self, _config: &str, section_type: Option<&str>) -> Vec<Section> {
        let mut sections: Vec<Section> = self
            .data
            .lock()
            .values()
            .filter(|section| section_type.map_or(true, |t| section.section_type == t))
            .cloned()
            .collect();

        sections.sort_by_key(|section| section.index);
        sections
    }

    fn add(&self, _config: &str, section_type: &str, name: Option<&str>) -> String {
        let mut data = self.data.lock();

        let of_type = data
            .values()
            .filter(|section| section.section_type == section_type)
            .count();
        let next_index = data.values().map(|section| section.index).max().unwrap_or(0).max(0);

        let sid = name
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}{}", section_type, of_type));

        if !data.contains_key(&sid) {
            let mut section = Section::new(sid.clone(), section_type, next_index + 1);
            section.anonymous = name.is_none();
            data.insert(sid.clone(), section);
        }

        sid
    }

    fn remove(&self, _config: &str, sid: &str) {
        self.data.lock().shift_remove(sid);
    }

    fn move_section(&self, config: &str, sid: &str, target: Option<&str>, after: bool) -> bool {
        let order = self
            .sections(config, None)
            .into_iter()
            .map(|section| section.name)
            .collect();

        let Some(order) = reposition(order, sid, target, after) else {
            return false;
        };

        let mut data = self.data.lock();
        for (position, name) in order.iter().enumerate() {
            if let Some(section) = data.get_mut(name) {
                section.index = position as i64;
            }
        }

        true
    }
}
