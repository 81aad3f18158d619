//! In-memory `uci` object for store tests

#![allow(dead_code)]

use async_trait::async_trait;
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use std::collections::VecDeque;
use std::time::Duration;
use ucistage_rpc::{Reply, Result, Rpc, RpcError};

/// A recorded call
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub object: String,
    pub method: String,
    pub args: Value,
}

#[derive(Debug, Clone)]
struct MockSection {
    section_type: String,
    anonymous: bool,
    options: Map<String, Value>,
}

#[derive(Default)]
struct MockState {
    configs: IndexMap<String, IndexMap<String, MockSection>>,
    calls: Vec<Call>,
    confirm_script: VecDeque<Option<i64>>,
    next_anonymous: usize,
}

/// Scripted stand-in for the remote `uci` object
///
/// Mutating calls are applied to an in-memory copy of the configs so that
/// reloads after a commit observe them.
#[derive(Default)]
pub struct MockRpc {
    state: Mutex<MockState>,
    fetch_delay: Option<Duration>,
    apply_status: i64,
    confirm_default: i64,
    failing: Option<String>,
}

impl MockRpc {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a section to a config, creating the config if needed
    pub fn with_section(self, config: &str, sid: &str, section_type: &str, options: Value) -> Self {
        let options = match options {
            Value::Object(map) => map,
            _ => Map::new(),
        };

        self.state
            .lock()
            .configs
            .entry(config.to_string())
            .or_default()
            .insert(
                sid.to_string(),
                MockSection {
                    section_type: section_type.to_string(),
                    anonymous: sid.starts_with("cfg"),
                    options,
                },
            );
        self
    }

    /// Delay every `get` by `delay`
    pub fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = Some(delay);
        self
    }

    /// Status returned by `apply`
    pub fn with_apply_status(mut self, status: i64) -> Self {
        self.apply_status = status;
        self
    }

    /// Statuses returned by successive `confirm` calls (`None` fails the
    /// call itself), then `default` forever
    pub fn with_confirm(self, script: &[Option<i64>], default: i64) -> Self {
        self.state.lock().confirm_script = script.iter().copied().collect();
        Self {
            confirm_default: default,
            ..self
        }
    }

    /// Reject every call to `method` with a permission error
    pub fn failing(mut self, method: &str) -> Self {
        self.failing = Some(method.to_string());
        self
    }

    /// All calls made so far
    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    /// Calls to `method` made so far
    pub fn calls_to(&self, method: &str) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| call.method == method)
            .collect()
    }

    /// Methods called so far, in order
    pub fn methods(&self) -> Vec<String> {
        self.calls().into_iter().map(|call| call.method).collect()
    }

    fn values(&self, config: &str) -> Option<Value> {
        let state = self.state.lock();
        let sections = state.configs.get(config)?;

        let mut values = Map::new();
        for (index, (sid, section)) in sections.iter().enumerate() {
            let mut value = section.options.clone();
            value.insert(".name".to_string(), json!(sid));
            value.insert(".type".to_string(), json!(section.section_type));
            value.insert(".anonymous".to_string(), json!(section.anonymous));
            value.insert(".index".to_string(), json!(index));
            values.insert(sid.clone(), Value::Object(value));
        }

        Some(Value::Object(values))
    }

    fn handle(&self, method: &str, args: &Value) -> Reply {
        let config = args["config"].as_str().unwrap_or_default().to_string();
        let mut state = self.state.lock();

        match method {
            "add" => {
                if !state.configs.contains_key(&config) {
                    return Reply::status(4);
                }

                let anonymous = args["name"].as_str().is_none();
                let name = match args["name"].as_str() {
                    Some(name) => name.to_string(),
                    None => {
                        state.next_anonymous += 1;
                        format!("cfg{:06x}", state.next_anonymous)
                    }
                };
                let section = MockSection {
                    section_type: args["type"].as_str().unwrap_or_default().to_string(),
                    anonymous,
                    options: args["values"].as_object().cloned().unwrap_or_default(),
                };

                if let Some(sections) = state.configs.get_mut(&config) {
                    sections.insert(name.clone(), section);
                }

                Reply::ok(json!({ "section": name }))
            }
            "set" => {
                let sid = args["section"].as_str().unwrap_or_default();
                let Some(section) = state.configs.get_mut(&config).and_then(|c| c.get_mut(sid)) else {
                    return Reply::status(4);
                };
                if let Some(values) = args["values"].as_object() {
                    for (key, value) in values {
                        section.options.insert(key.clone(), value.clone());
                    }
                }
                Reply::status(0)
            }
            "delete" => {
                let sid = args["section"].as_str().unwrap_or_default();
                let Some(sections) = state.configs.get_mut(&config) else {
                    return Reply::status(4);
                };
                match args.get("options").and_then(Value::as_array) {
                    Some(options) => {
                        if let Some(section) = sections.get_mut(sid) {
                            for option in options.iter().filter_map(Value::as_str) {
                                section.options.remove(option);
                            }
                        }
                    }
                    None => {
                        sections.shift_remove(sid);
                    }
                }
                Reply::status(0)
            }
            "order" => {
                let Some(sections) = state.configs.get_mut(&config) else {
                    return Reply::status(4);
                };
                let wanted: Vec<&str> = args["sections"]
                    .as_array()
                    .map(|list| list.iter().filter_map(Value::as_str).collect())
                    .unwrap_or_default();

                let mut reordered = IndexMap::new();
                for sid in wanted {
                    if let Some(section) = sections.shift_remove(sid) {
                        reordered.insert(sid.to_string(), section);
                    }
                }
                reordered.extend(sections.drain(..));
                *sections = reordered;
                Reply::status(0)
            }
            "apply" => Reply::status(self.apply_status),
            "changes" => Reply::ok(json!({ "changes": { "network": [["set", "lan", "proto", "dhcp"]] } })),
            _ => Reply::status(3),
        }
    }
}

#[async_trait]
impl Rpc for MockRpc {
    async fn call(&self, object: &str, method: &str, args: Value) -> Result<Reply> {
        self.state.lock().calls.push(Call {
            object: object.to_string(),
            method: method.to_string(),
            args: args.clone(),
        });

        if self.failing.as_deref() == Some(method) {
            return Ok(Reply::status(6));
        }

        match method {
            "get" => {
                if let Some(delay) = self.fetch_delay {
                    tokio::time::sleep(delay).await;
                }
                let config = args["config"].as_str().unwrap_or_default();
                Ok(match self.values(config) {
                    Some(values) => Reply::ok(json!({ "values": values })),
                    None => Reply::status(4),
                })
            }
            "confirm" => {
                let step = self.state.lock().confirm_script.pop_front();
                match step {
                    Some(None) => Err(RpcError::Transport("connection reset".to_string())),
                    Some(Some(status)) => Ok(Reply::status(status)),
                    None => Ok(Reply::status(self.confirm_default)),
                }
            }
            _ => Ok(self.handle(method, &args)),
        }
    }
}

/// `network` config with `loopback`, `lan` and `wan` interfaces
pub fn network() -> MockRpc {
    MockRpc::new()
        .with_section(
            "network",
            "loopback",
            "interface",
            json!({ "device": "lo", "proto": "static", "ipaddr": "127.0.0.1" }),
        )
        .with_section(
            "network",
            "lan",
            "interface",
            json!({
                "device": "br-lan",
                "proto": "static",
                "ipaddr": "192.168.1.1",
                "netmask": "255.255.255.0"
            }),
        )
        .with_section(
            "network",
            "wan",
            "interface",
            json!({ "device": "wan", "proto": "dhcp" }),
        )
}
