//! Reads and option writes over snapshot plus overlay
//!
//! Drafts are authoritative: they are read and written in place and never
//! combined with changes or deletions. Snapshot sections are read through
//! the overlay, and writes to them are staged as changes or deletions, which
//! are mutually exclusive per option.

use crate::state::State;
use crate::types::{OptionValue, Section};
use tracing::debug;

/// Strings `get_bool` accepts as true, compared case-insensitively
pub const TRUE_VALUES: [&str; 5] = ["1", "on", "true", "yes", "enabled"];

impl State {
    /// Enumerate the sections of a config, optionally filtered by type
    ///
    /// Snapshot sections (minus whole-section deletions, with changes merged)
    /// come first, then drafts; the result is stably sorted by stored index
    /// and re-indexed densely from zero. An unloaded config enumerates as
    /// empty.
    pub fn sections(&self, config: &str, section_type: Option<&str>) -> Vec<Section> {
        let Some(values) = self.values.get(config) else {
            return Vec::new();
        };

        let wanted = |section: &Section| section_type.map_or(true, |t| section.section_type == t);

        let mut sections: Vec<Section> = values
            .iter()
            .filter(|(sid, _)| !self.overlay.is_section_deleted(config, sid))
            .filter(|(_, section)| wanted(section))
            .map(|(sid, section)| {
                let mut merged = section.clone();
                if let Some(changes) = self.overlay.section_changes(config, sid) {
                    for (option, value) in changes {
                        merged.options.insert(option.clone(), value.clone());
                    }
                }
                merged
            })
            .collect();

        sections.extend(self.overlay.drafts(config).filter(|s| wanted(s)).cloned());

        sections.sort_by_key(|section| section.index);
        for (position, section) in sections.iter_mut().enumerate() {
            section.index = position as i64;
        }

        sections
    }

    /// Read one option of a section
    pub fn get(&self, config: &str, sid: &str, option: &str) -> Option<OptionValue> {
        let sid = self.resolve_sid(config, sid)?;

        if let Some(draft) = self.overlay.draft(config, &sid) {
            return draft.get(option);
        }

        if self
            .overlay
            .deletion(config, &sid)
            .is_some_and(|deletion| deletion.covers(option))
        {
            return None;
        }

        if let Some(value) = self.overlay.change(config, &sid, option) {
            return Some(value.clone());
        }

        self.snapshot_section(config, &sid)?.get(option)
    }

    /// Read a whole section as it would look after commit
    pub fn get_section(&self, config: &str, sid: &str) -> Option<Section> {
        let sid = self.resolve_sid(config, sid)?;

        if let Some(draft) = self.overlay.draft(config, &sid) {
            return Some(draft.clone());
        }

        if self.overlay.is_section_deleted(config, &sid) {
            return None;
        }

        let mut section = self.snapshot_section(config, &sid)?.clone();

        if let Some(changes) = self.overlay.section_changes(config, &sid) {
            for (option, value) in changes {
                section.options.insert(option.clone(), value.clone());
            }
        }

        if let Some(deletion) = self.overlay.deletion(config, &sid) {
            section.options.retain(|option, _| !deletion.covers(option));
        }

        Some(section)
    }

    /// Interpret an option as a boolean flag
    pub fn get_bool(&self, config: &str, sid: &str, option: &str) -> bool {
        self.get(config, sid, option)
            .as_ref()
            .and_then(OptionValue::as_str)
            .is_some_and(|value| {
                TRUE_VALUES
                    .iter()
                    .any(|truthy| value.eq_ignore_ascii_case(truthy))
            })
    }

    /// Id of the first section (of a type) in enumeration order
    pub fn first_sid(&self, config: &str, section_type: Option<&str>) -> Option<String> {
        self.sections(config, section_type)
            .into_iter()
            .next()
            .map(|section| section.name)
    }

    /// Stage an option write; `None` or an empty value removes the option
    ///
    /// Writes to unresolvable sections, empty option names and reserved
    /// `.`-prefixed keys are ignored.
    pub fn set(&mut self, config: &str, sid: &str, option: &str, value: Option<OptionValue>) {
        let Some(sid) = self.resolve_sid(config, sid) else {
            debug!(config, sid, option, "Ignoring write to unresolvable section");
            return;
        };

        if option.is_empty() || option.starts_with('.') {
            debug!(config, sid = %sid, option, "Ignoring write to reserved option");
            return;
        }

        let value = value.filter(|value| !value.is_empty());

        if let Some(draft) = self.overlay.draft_mut(config, &sid) {
            match value {
                Some(value) => {
                    draft.options.insert(option.to_string(), value);
                }
                None => {
                    draft.options.shift_remove(option);
                }
            }
            return;
        }

        match value {
            Some(value) => {
                if self.overlay.is_section_deleted(config, &sid) {
                    debug!(config, sid = %sid, option, "Ignoring write to deleted section");
                    return;
                }

                if self.snapshot_section(config, &sid).is_none() {
                    debug!(config, sid = %sid, option, "Ignoring write to unknown section");
                    return;
                }

                self.overlay.restore_option(config, &sid, option);
                self.overlay.record_change(config, &sid, option, value);
            }
            None => {
                self.overlay.clear_change(config, &sid, option);

                let present = self
                    .snapshot_section(config, &sid)
                    .is_some_and(|section| section.options.contains_key(option));

                if present {
                    self.overlay.delete_option(config, &sid, option);
                }
            }
        }
    }
}
