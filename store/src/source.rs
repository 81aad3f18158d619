//! Section contract shared by the store and local JSON data
//!
//! Form-style consumers read and stage writes through [`ConfigSource`]
//! without caring whether sections come from the remote store or from an
//! in-memory document.

use crate::store::Store;
use crate::types::{OptionValue, Section};
use ucistage_rpc::Rpc;

/// Synchronous section access
pub trait ConfigSource {
    /// Resolve a section reference to a section id
    fn resolve_sid(&self, config: &str, sid: &str) -> Option<String>;

    /// Read one option
    fn get(&self, config: &str, sid: &str, option: &str) -> Option<OptionValue>;

    /// Read a whole section
    fn get_section(&self, config: &str, sid: &str) -> Option<Section>;

    /// Write an option; `None` removes it
    fn set(&self, config: &str, sid: &str, option: &str, value: Option<OptionValue>);

    /// Remove an option
    fn unset(&self, config: &str, sid: &str, option: &str) {
        self.set(config, sid, option, None);
    }

    /// Sections in order, optionally filtered by type
    fn sections(&self, config: &str, section_type: Option<&str>) -> Vec<Section>;

    /// Create a section and return its id
    fn add(&self, config: &str, section_type: &str, name: Option<&str>) -> String;

    /// Remove a section
    fn remove(&self, config: &str, sid: &str);

    /// Move a section to the end, or before/after `target`
    fn move_section(&self, config: &str, sid: &str, target: Option<&str>, after: bool) -> bool;
}

impl<R: Rpc + 'static> ConfigSource for Store<R> {
    fn resolve_sid(&self, config: &str, sid: &str) -> Option<String> {
        Store::resolve_sid(self, config, sid)
    }

    fn get(&self, config: &str, sid: &str, option: &str) -> Option<OptionValue> {
        Store::get(self, config, sid, option)
    }

    fn get_section(&self, config: &str, sid: &str) -> Option<Section> {
        Store::get_section(self, config, sid)
    }

    fn set(&self, config: &str, sid: &str, option: &str, value: Option<OptionValue>) {
        self.state.lock().set(config, sid, option, value);
    }

    fn sections(&self, config: &str, section_type: Option<&str>) -> Vec<Section> {
        Store::sections(self, config, section_type)
    }

    fn add(&self, config: &str, section_type: &str, name: Option<&str>) -> String {
        Store::add(self, config, section_type, name)
    }

    fn remove(&self, config: &str, sid: &str) {
        Store::remove(self, config, sid);
    }

    fn move_section(&self, config: &str, sid: &str, target: Option<&str>, after: bool) -> bool {
        Store::move_section(self, config, sid, target, after)
    }
}
