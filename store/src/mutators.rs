//! Section creation, cloning, removal and reordering

use crate::state::State;
use crate::types::Section;
use tracing::debug;

/// Move `sid` within an ordered id list
///
/// Without a target the section goes to the end; otherwise it is placed
/// immediately before or after the target. Returns `None` if either id is
/// not in the list.
pub fn reposition(
    mut order: Vec<String>,
    sid: &str,
    target: Option<&str>,
    after: bool,
) -> Option<Vec<String>> {
    let position = order.iter().position(|s| s == sid)?;
    let moving = order.remove(position);

    match target {
        None => order.push(moving),
        Some(target) => {
            let at = order.iter().position(|s| s == target)?;
            order.insert(if after { at + 1 } else { at }, moving);
        }
    }

    Some(order)
}

impl State {
    /// Create a draft section and return its id
    ///
    /// Without a name the section is anonymous and gets a generated id. A
    /// name that is already taken by a live section returns that section's id
    /// and stages nothing.
    pub fn add(&mut self, config: &str, section_type: &str, name: Option<&str>) -> String {
        let name = name.filter(|n| !n.is_empty()).map(str::to_string);

        if let Some(existing) = name.as_deref().filter(|n| self.is_live(config, n)) {
            debug!(config, sid = existing, section_type, "Section already exists, not staging");
            return existing.to_string();
        }

        let sid = name.clone().unwrap_or_else(|| self.create_sid(config));
        let index = self.take_new_index();

        debug!(config, sid = %sid, section_type, "Staging new section");

        self.overlay.insert_draft(
            config,
            sid.clone(),
            Section::draft(sid.clone(), section_type, name, index),
        );

        sid
    }

    /// A draft, or a snapshot section not wholly deleted
    fn is_live(&self, config: &str, sid: &str) -> bool {
        self.overlay.draft(config, sid).is_some()
            || (self.snapshot_section(config, sid).is_some()
                && !self.overlay.is_section_deleted(config, sid))
    }

    /// Create a draft copying the options of a snapshot section
    ///
    /// With `put_next` the copy is placed right after its source. Returns
    /// `None` if the source is not a snapshot section.
    pub fn clone_section(
        &mut self,
        config: &str,
        section_type: &str,
        source: &str,
        put_next: bool,
        name: Option<&str>,
    ) -> Option<String> {
        let source = self.resolve_sid(config, source)?;
        let options = self.snapshot_section(config, &source)?.values();

        let name = name.filter(|n| !n.is_empty()).map(str::to_string);
        let sid = self.create_sid(config);
        let index = self.take_new_index();

        let mut draft = Section::draft(sid.clone(), section_type, name, index);
        draft.options = options;

        debug!(config, sid = %sid, source = %source, "Staging cloned section");
        self.overlay.insert_draft(config, sid.clone(), draft);

        if put_next {
            self.move_section(config, &sid, Some(&source), true);
        }

        Some(sid)
    }

    /// Remove a section
    ///
    /// Drafts vanish without a trace; snapshot sections drop their pending
    /// changes and are staged for deletion.
    pub fn remove(&mut self, config: &str, sid: &str) {
        let Some(sid) = self.resolve_sid(config, sid) else {
            return;
        };

        if self.overlay.discard_draft(config, &sid) {
            debug!(config, sid = %sid, "Discarded draft section");
            return;
        }

        if self.snapshot_section(config, &sid).is_some() {
            self.overlay.clear_section_changes(config, &sid);
            self.overlay.delete_section(config, &sid);
            debug!(config, sid = %sid, "Staged section deletion");
        }
    }

    /// Move `sid` to the end, or before/after `target`
    ///
    /// Every section's stored index is rewritten to its new position and the
    /// config is flagged for reordering on commit.
    pub fn move_section(
        &mut self,
        config: &str,
        sid: &str,
        target: Option<&str>,
        after: bool,
    ) -> bool {
        let Some(sid) = self.resolve_sid(config, sid) else {
            return false;
        };

        let target = match target {
            Some(target) => match self.resolve_sid(config, target) {
                Some(resolved) => Some(resolved),
                None => return false,
            },
            None => None,
        };

        let order = self
            .sections(config, None)
            .into_iter()
            .map(|section| section.name)
            .collect();

        let Some(order) = reposition(order, &sid, target.as_deref(), after) else {
            return false;
        };

        for (position, name) in order.iter().enumerate() {
            self.set_stored_index(config, name, position as i64);
        }

        self.overlay.mark_reorder(config);
        true
    }
}
