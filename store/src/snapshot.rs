//! Snapshot loading and invalidation
//!
//! Fetches are shared: concurrent `load` calls for the same config await one
//! underlying `uci get`.

use crate::error::Result;
use crate::store::{Store, StoreEvent};
use crate::types::SectionMap;
use futures::future::{join_all, BoxFuture, Shared};
use futures::FutureExt;
use tracing::{debug, info, warn};
use ucistage_rpc::{Rpc, RpcError};

/// A config fetch that may be awaited by several loaders
pub(crate) type InFlight = Shared<BoxFuture<'static, std::result::Result<SectionMap, RpcError>>>;

impl<R: Rpc + 'static> Store<R> {
    /// Fetch snapshots of the given configs
    ///
    /// Configs already cached are skipped. Returns the configs that were not
    /// cached when the call was made.
    pub async fn load<S: AsRef<str>>(&self, packages: &[S]) -> Result<Vec<String>> {
        let mut pending: Vec<(String, InFlight)> = Vec::new();

        {
            let state = self.state.lock();
            let mut in_flight = self.in_flight.lock();

            for package in packages {
                let config = package.as_ref();
                if state.is_loaded(config) || pending.iter().any(|(name, _)| name == config) {
                    continue;
                }

                let fetch = in_flight
                    .entry(config.to_string())
                    .or_insert_with(|| {
                        debug!(config, "Fetching config");
                        let remote = self.remote.clone();
                        let config = config.to_string();
                        async move { remote.get(&config).await }.boxed().shared()
                    })
                    .clone();

                pending.push((config.to_string(), fetch));
            }
        }

        if pending.is_empty() {
            return Ok(Vec::new());
        }

        let results = join_all(pending.iter().map(|(_, fetch)| fetch.clone())).await;

        let mut failure = None;
        let mut fetched = Vec::with_capacity(results.len());
        {
            let mut in_flight = self.in_flight.lock();
            for ((config, _), result) in pending.into_iter().zip(results) {
                match result {
                    Ok(sections) => fetched.push((config, sections)),
                    Err(e) => {
                        warn!(config = %config, error = %e, "Failed to fetch config");
                        in_flight.remove(&config);
                        failure.get_or_insert(e);
                    }
                }
            }
        }

        if let Some(e) = failure {
            return Err(e.into());
        }

        let loaded: Vec<String> = {
            let mut state = self.state.lock();
            fetched
                .into_iter()
                .map(|(config, sections)| {
                    state.insert_snapshot(&config, sections);
                    config
                })
                .collect()
        };

        info!(configs = ?loaded, "Loaded configs");
        self.emit(StoreEvent::Loaded(loaded.clone()));

        Ok(loaded)
    }

    /// Drop the snapshot and all staged work for the given configs
    pub fn unload<S: AsRef<str>>(&self, packages: &[S]) {
        let mut state = self.state.lock();
        let mut in_flight = self.in_flight.lock();

        for package in packages {
            let config = package.as_ref();
            debug!(config, "Unloading config");
            state.purge(config);
            in_flight.remove(config);
        }
    }
}
