//! Store state: fetched snapshots plus the staging overlay

use crate::overlay::Overlay;
use crate::types::{Section, SectionMap};
use std::collections::HashMap;

/// First index handed to newly added sections, so they sort after the
/// sections already present until moved
pub const NEW_SECTION_INDEX_BASE: i64 = 1000;

/// Snapshot cache and staging overlay of one store
#[derive(Debug, Default)]
pub struct State {
    pub(crate) values: HashMap<String, SectionMap>,
    pub(crate) overlay: Overlay,
    next_index: i64,
}

impl State {
    /// Whether a snapshot of the config has been fetched
    pub fn is_loaded(&self, config: &str) -> bool {
        self.values.contains_key(config)
    }

    /// Fetched snapshot of a config
    pub fn snapshot(&self, config: &str) -> Option<&SectionMap> {
        self.values.get(config)
    }

    /// Snapshot form of a section
    pub fn snapshot_section(&self, config: &str, sid: &str) -> Option<&Section> {
        self.values.get(config)?.get(sid)
    }

    /// Staging overlay
    pub fn overlay(&self) -> &Overlay {
        &self.overlay
    }

    /// Store a fetched snapshot unless one is already cached
    pub(crate) fn insert_snapshot(&mut self, config: &str, sections: SectionMap) {
        self.values.entry(config.to_string()).or_insert(sections);
    }

    /// Forget the snapshot and everything staged for a config
    pub(crate) fn purge(&mut self, config: &str) {
        self.values.remove(config);
        self.overlay.purge(config);
    }

    pub(crate) fn take_new_index(&mut self) -> i64 {
        let index = NEW_SECTION_INDEX_BASE + self.next_index;
        self.next_index += 1;
        index
    }

    /// Write a section's stored sort position, wherever it lives
    pub(crate) fn set_stored_index(&mut self, config: &str, sid: &str, index: i64) {
        if let Some(draft) = self.overlay.draft_mut(config, sid) {
            draft.index = index;
        } else if let Some(section) = self.values.get_mut(config).and_then(|v| v.get_mut(sid)) {
            section.index = index;
        }
    }
}
