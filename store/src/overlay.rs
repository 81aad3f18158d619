//! Staging overlay
//!
//! Uncommitted work layered over the fetched snapshot: drafts of new
//! sections, option changes and deletions on snapshot sections, and the set
//! of configs whose section order must be pushed on the next commit.
//!
//! Empty per-section and per-config entries are pruned as they drain so that
//! an overlay with nothing staged is indistinguishable from a fresh one.

use crate::types::{Deletion, OptionValue, Section};
use indexmap::{IndexMap, IndexSet};
use std::collections::HashMap;

/// Per-config, per-section option changes
pub type Changes = IndexMap<String, IndexMap<String, OptionValue>>;

/// Staging overlay
#[derive(Debug, Default, Clone)]
pub struct Overlay {
    pub(crate) creates: HashMap<String, IndexMap<String, Section>>,
    pub(crate) changes: HashMap<String, Changes>,
    pub(crate) deletes: HashMap<String, IndexMap<String, Deletion>>,
    pub(crate) reorder: IndexSet<String>,
}

impl Overlay {
    /// Whether nothing is staged
    pub fn is_empty(&self) -> bool {
        self.creates.is_empty()
            && self.changes.is_empty()
            && self.deletes.is_empty()
            && self.reorder.is_empty()
    }

    /// Draft section, if `sid` was created in this overlay
    pub fn draft(&self, config: &str, sid: &str) -> Option<&Section> {
        self.creates.get(config)?.get(sid)
    }

    pub(crate) fn draft_mut(&mut self, config: &str, sid: &str) -> Option<&mut Section> {
        self.creates.get_mut(config)?.get_mut(sid)
    }

    /// Drafts of a config in creation order
    pub fn drafts(&self, config: &str) -> impl Iterator<Item = &Section> {
        self.creates.get(config).into_iter().flat_map(|c| c.values())
    }

    pub(crate) fn insert_draft(&mut self, config: &str, sid: String, section: Section) {
        self.creates
            .entry(config.to_string())
            .or_default()
            .insert(sid, section);
    }

    pub(crate) fn discard_draft(&mut self, config: &str, sid: &str) -> bool {
        let Some(creates) = self.creates.get_mut(config) else {
            return false;
        };

        let removed = creates.shift_remove(sid).is_some();
        if creates.is_empty() {
            self.creates.remove(config);
        }
        removed
    }

    /// Staged value for an option of a snapshot section
    pub fn change(&self, config: &str, sid: &str, option: &str) -> Option<&OptionValue> {
        self.changes.get(config)?.get(sid)?.get(option)
    }

    /// All staged values for a snapshot section
    pub fn section_changes(&self, config: &str, sid: &str) -> Option<&IndexMap<String, OptionValue>> {
        self.changes.get(config)?.get(sid)
    }

    pub(crate) fn record_change(&mut self, config: &str, sid: &str, option: &str, value: OptionValue) {
        self.changes
            .entry(config.to_string())
            .or_default()
            .entry(sid.to_string())
            .or_default()
            .insert(option.to_string(), value);
    }

    pub(crate) fn clear_change(&mut self, config: &str, sid: &str, option: &str) {
        let Some(sections) = self.changes.get_mut(config) else {
            return;
        };

        if let Some(options) = sections.get_mut(sid) {
            options.shift_remove(option);
            if options.is_empty() {
                sections.shift_remove(sid);
            }
        }

        if sections.is_empty() {
            self.changes.remove(config);
        }
    }

    pub(crate) fn clear_section_changes(&mut self, config: &str, sid: &str) {
        if let Some(sections) = self.changes.get_mut(config) {
            sections.shift_remove(sid);
            if sections.is_empty() {
                self.changes.remove(config);
            }
        }
    }

    /// Staged deletion for a snapshot section
    pub fn deletion(&self, config: &str, sid: &str) -> Option<&Deletion> {
        self.deletes.get(config)?.get(sid)
    }

    /// Whether the snapshot section is staged for removal
    pub fn is_section_deleted(&self, config: &str, sid: &str) -> bool {
        matches!(self.deletion(config, sid), Some(Deletion::Section))
    }

    pub(crate) fn delete_section(&mut self, config: &str, sid: &str) {
        self.deletes
            .entry(config.to_string())
            .or_default()
            .insert(sid.to_string(), Deletion::Section);
    }

    /// Stage an option deletion; a whole-section deletion already covers it
    pub(crate) fn delete_option(&mut self, config: &str, sid: &str, option: &str) {
        let deletion = self
            .deletes
            .entry(config.to_string())
            .or_default()
            .entry(sid.to_string())
            .or_insert_with(|| Deletion::Options(IndexSet::new()));

        if let Deletion::Options(options) = deletion {
            options.insert(option.to_string());
        }
    }

    pub(crate) fn restore_option(&mut self, config: &str, sid: &str, option: &str) {
        let Some(sections) = self.deletes.get_mut(config) else {
            return;
        };

        if let Some(Deletion::Options(options)) = sections.get_mut(sid) {
            options.shift_remove(option);
            if options.is_empty() {
                sections.shift_remove(sid);
            }
        }

        if sections.is_empty() {
            self.deletes.remove(config);
        }
    }

    /// Whether the config's section order must be pushed on commit
    pub fn needs_reorder(&self, config: &str) -> bool {
        self.reorder.contains(config)
    }

    pub(crate) fn mark_reorder(&mut self, config: &str) {
        self.reorder.insert(config.to_string());
    }

    /// Configs with staged work of any kind
    pub fn touched(&self) -> IndexSet<String> {
        let mut configs = IndexSet::new();
        configs.extend(self.deletes.keys().cloned());
        configs.extend(self.creates.keys().cloned());
        configs.extend(self.changes.keys().cloned());
        configs.extend(self.reorder.iter().cloned());
        configs
    }

    /// Drop everything staged for a config
    pub(crate) fn purge(&mut self, config: &str) {
        self.creates.remove(config);
        self.changes.remove(config);
        self.deletes.remove(config);
        self.reorder.shift_remove(config);
    }
}
