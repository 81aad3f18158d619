//! Typed wrappers around the `uci` ubus object
//!
//! Calls that manipulate data reject any non-zero status; `apply` and
//! `confirm` hand the status back because their callers act on it.

use crate::types::{OptionValue, SectionMap};
use indexmap::IndexMap;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::debug;
use ucistage_rpc::{Reply, Result, Rpc, RpcError, UbusStatus};

const OBJECT: &str = "uci";

/// Client for the remote `uci` object
pub struct UciRemote<R> {
    rpc: Arc<R>,
}

impl<R> Clone for UciRemote<R> {
    fn clone(&self) -> Self {
        Self {
            rpc: Arc::clone(&self.rpc),
        }
    }
}

impl<R: Rpc> UciRemote<R> {
    /// Wrap a shared RPC primitive
    pub fn new(rpc: Arc<R>) -> Self {
        Self { rpc }
    }

    /// Underlying RPC primitive
    pub fn rpc(&self) -> &Arc<R> {
        &self.rpc
    }

    async fn call(&self, method: &str, args: Value) -> Result<Reply> {
        debug!(method, %args, "uci call");
        self.rpc.call(OBJECT, method, args).await
    }

    async fn call_checked(&self, method: &str, args: Value) -> Result<Reply> {
        self.call(method, args).await?.reject_nonzero(OBJECT, method)
    }

    /// Fetch all sections of a config
    pub async fn get(&self, config: &str) -> Result<SectionMap> {
        let values = self
            .call_checked("get", json!({ "config": config }))
            .await?
            .expect("values")?;

        if values.is_null() {
            return Ok(SectionMap::new());
        }

        let mut sections: SectionMap = serde_json::from_value(values)?;
        for (sid, section) in sections.iter_mut() {
            if section.name.is_empty() {
                section.name = sid.clone();
            }
        }

        Ok(sections)
    }

    /// Create a section and return the name the server assigned
    pub async fn add(
        &self,
        config: &str,
        section_type: &str,
        name: Option<&str>,
        values: &IndexMap<String, OptionValue>,
    ) -> Result<String> {
        let mut args = Map::new();
        args.insert("config".to_string(), json!(config));
        args.insert("type".to_string(), json!(section_type));
        if let Some(name) = name {
            args.insert("name".to_string(), json!(name));
        }
        args.insert("values".to_string(), serde_json::to_value(values)?);

        match self.call_checked("add", Value::Object(args)).await?.expect("section")? {
            Value::String(section) => Ok(section),
            other => Err(RpcError::UnexpectedReply(format!(
                "uci add returned section {}",
                other
            ))),
        }
    }

    /// Overwrite options of a section
    pub async fn set(
        &self,
        config: &str,
        section: &str,
        values: &IndexMap<String, OptionValue>,
    ) -> Result<()> {
        self.call_checked(
            "set",
            json!({ "config": config, "section": section, "values": values }),
        )
        .await?;
        Ok(())
    }

    /// Delete a whole section (`options == None`) or some of its options
    pub async fn delete(&self, config: &str, section: &str, options: Option<&[String]>) -> Result<()> {
        let mut args = json!({ "config": config, "section": section });
        if let Some(options) = options {
            args["options"] = json!(options);
        }

        self.call_checked("delete", args).await?;
        Ok(())
    }

    /// Set the section order of a config
    pub async fn order(&self, config: &str, sections: &[String]) -> Result<()> {
        self.call_checked("order", json!({ "config": config, "sections": sections }))
            .await?;
        Ok(())
    }

    /// Activate committed changes, optionally arming the rollback timer
    pub async fn apply(&self, timeout: u64, rollback: bool) -> Result<UbusStatus> {
        let reply = self
            .call("apply", json!({ "timeout": timeout, "rollback": rollback }))
            .await?;
        Ok(reply.status)
    }

    /// Confirm applied changes, disarming the rollback timer
    pub async fn confirm(&self) -> Result<UbusStatus> {
        Ok(self.call("confirm", json!({})).await?.status)
    }

    /// Changes pending on the server, keyed by config
    pub async fn changes(&self) -> Result<IndexMap<String, Value>> {
        match self.call_checked("changes", json!({})).await?.expect("changes")? {
            Value::Null => Ok(IndexMap::new()),
            Value::Object(map) => Ok(map.into_iter().collect()),
            other => Err(RpcError::UnexpectedReply(format!(
                "uci changes returned {}",
                other
            ))),
        }
    }
}
