//! Commit pipeline
//!
//! `save` turns the overlay into remote calls: deletions, additions and
//! option sets run concurrently, then section order is pushed for configs
//! that were reordered, and finally every touched config is reloaded from
//! the server, which discards its overlay.

use crate::error::Result;
use crate::state::State;
use crate::store::{Store, StoreEvent};
use crate::types::{Deletion, OptionValue, Section};
use futures::future::try_join_all;
use indexmap::IndexMap;
use tracing::{debug, info};
use ucistage_rpc::Rpc;

/// A draft waiting for its `uci add` call
#[derive(Debug, Clone)]
struct PendingAdd {
    config: String,
    sid: String,
    section_type: String,
    name: Option<String>,
    values: IndexMap<String, OptionValue>,
}

/// Remote calls derived from the overlay
#[derive(Debug, Default)]
struct CommitPlan {
    deletes: Vec<(String, String, Option<Vec<String>>)>,
    adds: Vec<PendingAdd>,
    sets: Vec<(String, String, IndexMap<String, OptionValue>)>,
    touched: Vec<String>,
}

impl CommitPlan {
    fn build(state: &State) -> Self {
        let overlay = state.overlay();
        let mut plan = CommitPlan {
            touched: overlay.touched().into_iter().collect(),
            ..Default::default()
        };

        for config in &plan.touched {
            if let Some(deletes) = overlay.deletes.get(config) {
                for (sid, deletion) in deletes {
                    let options = match deletion {
                        Deletion::Section => None,
                        Deletion::Options(options) => Some(options.iter().cloned().collect()),
                    };
                    plan.deletes.push((config.clone(), sid.clone(), options));
                }
            }

            for draft in overlay.drafts(config) {
                plan.adds.push(PendingAdd {
                    config: config.clone(),
                    sid: draft.name.clone(),
                    section_type: draft.section_type.clone(),
                    name: draft.create.clone(),
                    values: draft
                        .options
                        .iter()
                        .filter(|(key, _)| !key.starts_with('.'))
                        .map(|(key, value)| (key.clone(), value.clone()))
                        .collect(),
                });
            }

            if let Some(changes) = overlay.changes.get(config) {
                for (sid, values) in changes {
                    plan.sets.push((config.clone(), sid.clone(), values.clone()));
                }
            }
        }

        plan
    }
}

/// Full section order of a config: drafts and surviving snapshot sections,
/// stably sorted by stored index
fn section_order(state: &State, config: &str) -> Vec<String> {
    let overlay = state.overlay();
    let mut sections: Vec<&Section> = overlay.drafts(config).collect();

    if let Some(values) = state.snapshot(config) {
        sections.extend(
            values
                .iter()
                // Deletes are committed before the order call, so they are left out.
                .filter(|(sid, _)| !overlay.is_section_deleted(config, sid))
                .map(|(_, section)| section),
        );
    }

    sections.sort_by_key(|section| section.index);
    sections.into_iter().map(|section| section.name.clone()).collect()
}

impl<R: Rpc + 'static> Store<R> {
    /// Commit everything staged and reload the affected configs
    ///
    /// Returns the configs that were committed. If any remote call fails the
    /// error is returned and the overlay stays in place; the server may
    /// then hold part of the batch.
    pub async fn save(&self) -> Result<Vec<String>> {
        let plan = CommitPlan::build(&self.state.lock());

        if plan.touched.is_empty() {
            debug!("Nothing staged to commit");
            return Ok(Vec::new());
        }

        info!(
            configs = ?plan.touched,
            deletes = plan.deletes.len(),
            adds = plan.adds.len(),
            sets = plan.sets.len(),
            "Committing staged changes"
        );

        let remote = &self.remote;

        let deletes = try_join_all(
            plan.deletes
                .iter()
                .map(|(config, sid, options)| remote.delete(config, sid, options.as_deref())),
        );
        let adds = try_join_all(plan.adds.iter().map(|add| {
            remote.add(&add.config, &add.section_type, add.name.as_deref(), &add.values)
        }));
        let sets = try_join_all(
            plan.sets
                .iter()
                .map(|(config, sid, values)| remote.set(config, sid, values)),
        );

        let (_, assigned, _) = futures::try_join!(deletes, adds, sets)?;

        let orders: Vec<(String, Vec<String>)> = {
            let mut state = self.state.lock();

            for (add, name) in plan.adds.iter().zip(assigned) {
                if let Some(draft) = state.overlay.draft_mut(&add.config, &add.sid) {
                    debug!(config = %add.config, sid = %add.sid, name = %name, "Section created");
                    draft.name = name;
                }
            }

            let flagged: Vec<String> = state.overlay.reorder.drain(..).collect();
            flagged
                .into_iter()
                .filter(|config| state.is_loaded(config))
                .map(|config| {
                    let order = section_order(&state, &config);
                    (config, order)
                })
                .collect()
        };

        try_join_all(
            orders
                .iter()
                .map(|(config, sections)| remote.order(config, sections)),
        )
        .await?;

        self.unload(&plan.touched);
        self.load(&plan.touched).await?;

        info!(configs = ?plan.touched, "Committed staged changes");
        self.emit(StoreEvent::Saved(plan.touched.clone()));

        Ok(plan.touched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::fixtures::network_state;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_plan_groups() {
        let mut state = network_state();
        state.set("network", "lan", "proto", Some(OptionValue::from("dhcp")));
        state.set("network", "lan", "netmask", None);
        state.remove("network", "wan");
        let sid = state.add("network", "route", None);
        state.set("network", &sid, "target", Some(OptionValue::from("10.0.0.0/8")));

        let plan = CommitPlan::build(&state);

        assert_eq!(plan.touched, vec!["network".to_string()]);
        assert_eq!(
            plan.deletes,
            vec![
                ("network".to_string(), "lan".to_string(), Some(vec!["netmask".to_string()])),
                ("network".to_string(), "wan".to_string(), None),
            ]
        );
        assert_eq!(plan.adds.len(), 1);
        assert_eq!(plan.adds[0].sid, sid);
        assert_eq!(plan.adds[0].name, None);
        assert_eq!(
            plan.adds[0].values.get("target"),
            Some(&OptionValue::from("10.0.0.0/8"))
        );
        assert_eq!(plan.sets.len(), 1);
        assert_eq!(plan.sets[0].1, "lan");
    }

    #[test]
    fn test_plan_empty_overlay() {
        let state = network_state();
        let plan = CommitPlan::build(&state);
        assert!(plan.touched.is_empty());
        assert!(plan.adds.is_empty());
    }

    #[test]
    fn test_section_order_skips_deleted() {
        let mut state = network_state();
        let sid = state.add("network", "interface", Some("guest"));
        state.move_section("network", &sid, Some("lan"), false);
        state.remove("network", "cfg030f15");

        assert_eq!(
            section_order(&state, "network"),
            vec!["loopback", "guest", "lan", "wan"]
        );
    }
}
