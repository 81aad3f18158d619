//! The staged configuration store
//!
//! [`Store`] owns the snapshot cache and the staging overlay for one
//! session. Reads and staged writes are synchronous; loading, committing and
//! applying talk to the remote `uci` object.
//!
//! The store assumes a single logical caller: nothing prevents overlapping
//! `save()` or `apply()` calls on the same config.

use crate::remote::UciRemote;
use crate::settings::Settings;
use crate::snapshot::InFlight;
use crate::state::State;
use crate::types::{OptionValue, Section};
use parking_lot::{Mutex, MutexGuard};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use ucistage_rpc::Rpc;

/// Notifications emitted by the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// Snapshots of these configs were fetched
    Loaded(Vec<String>),
    /// Staged work for these configs was committed and reloaded
    Saved(Vec<String>),
    /// Changes were applied with a rollback timeout of this many seconds
    Applied(u64),
    /// Applied changes were confirmed
    Confirmed,
}

/// Staged configuration store
pub struct Store<R> {
    pub(crate) remote: UciRemote<R>,
    pub(crate) settings: Settings,
    pub(crate) state: Mutex<State>,
    pub(crate) in_flight: Mutex<HashMap<String, InFlight>>,
    events: broadcast::Sender<StoreEvent>,
}

impl<R: Rpc + 'static> Store<R> {
    /// Create a store with default settings
    pub fn new(rpc: R) -> Self {
        Self::with_settings(rpc, Settings::default())
    }

    /// Create a store with the given settings
    pub fn with_settings(rpc: R, settings: Settings) -> Self {
        Self::from_arc(Arc::new(rpc), settings)
    }

    /// Create a store sharing an RPC primitive with other users
    pub fn from_arc(rpc: Arc<R>, settings: Settings) -> Self {
        let (events, _) = broadcast::channel(16);

        Self {
            remote: UciRemote::new(rpc),
            settings,
            state: Mutex::new(State::default()),
            in_flight: Mutex::new(HashMap::new()),
            events,
        }
    }

    /// Settings in use
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Client for the remote `uci` object
    pub fn remote(&self) -> &UciRemote<R> {
        &self.remote
    }

    /// Subscribe to store notifications
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    pub(crate) fn emit(&self, event: StoreEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    /// Lock the state for inspection
    ///
    /// The guard must not be held across an await point.
    pub fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock()
    }

    /// Resolve `@type[n]` references to section ids
    pub fn resolve_sid(&self, config: &str, sid: &str) -> Option<String> {
        self.state.lock().resolve_sid(config, sid)
    }

    /// Read one option
    pub fn get(&self, config: &str, sid: &str, option: &str) -> Option<OptionValue> {
        self.state.lock().get(config, sid, option)
    }

    /// Read a whole section
    pub fn get_section(&self, config: &str, sid: &str) -> Option<Section> {
        self.state.lock().get_section(config, sid)
    }

    /// Read one option of the first section of a type
    pub fn get_first(
        &self,
        config: &str,
        section_type: Option<&str>,
        option: &str,
    ) -> Option<OptionValue> {
        let state = self.state.lock();
        let sid = state.first_sid(config, section_type)?;
        state.get(config, &sid, option)
    }

    /// Read the first section of a type
    pub fn get_first_section(&self, config: &str, section_type: Option<&str>) -> Option<Section> {
        let state = self.state.lock();
        let sid = state.first_sid(config, section_type)?;
        state.get_section(config, &sid)
    }

    /// Read an option as a boolean flag
    pub fn get_bool(&self, config: &str, sid: &str, option: &str) -> bool {
        self.state.lock().get_bool(config, sid, option)
    }

    /// Stage an option value
    pub fn set(&self, config: &str, sid: &str, option: &str, value: impl Into<OptionValue>) {
        self.state
            .lock()
            .set(config, sid, option, Some(value.into()));
    }

    /// Stage an option value on the first section of a type
    pub fn set_first(
        &self,
        config: &str,
        section_type: Option<&str>,
        option: &str,
        value: impl Into<OptionValue>,
    ) {
        let mut state = self.state.lock();
        if let Some(sid) = state.first_sid(config, section_type) {
            state.set(config, &sid, option, Some(value.into()));
        }
    }

    /// Stage removal of an option
    pub fn unset(&self, config: &str, sid: &str, option: &str) {
        self.state.lock().set(config, sid, option, None);
    }

    /// Stage removal of an option on the first section of a type
    pub fn unset_first(&self, config: &str, section_type: Option<&str>, option: &str) {
        let mut state = self.state.lock();
        if let Some(sid) = state.first_sid(config, section_type) {
            state.set(config, &sid, option, None);
        }
    }

    /// Stage a new section and return its id
    pub fn add(&self, config: &str, section_type: &str, name: Option<&str>) -> String {
        self.state.lock().add(config, section_type, name)
    }

    /// Stage a copy of a snapshot section
    pub fn clone_section(
        &self,
        config: &str,
        section_type: &str,
        source: &str,
        put_next: bool,
        name: Option<&str>,
    ) -> Option<String> {
        self.state
            .lock()
            .clone_section(config, section_type, source, put_next, name)
    }

    /// Stage removal of a section
    pub fn remove(&self, config: &str, sid: &str) {
        self.state.lock().remove(config, sid);
    }

    /// Stage a section move
    pub fn move_section(&self, config: &str, sid: &str, target: Option<&str>, after: bool) -> bool {
        self.state.lock().move_section(config, sid, target, after)
    }

    /// Enumerate sections in their staged order
    pub fn sections(&self, config: &str, section_type: Option<&str>) -> Vec<Section> {
        self.state.lock().sections(config, section_type)
    }

    /// Enumerate sections, invoking `callback` with each section and its id
    ///
    /// The state is not locked while the callback runs, so it may use the
    /// store.
    pub fn sections_with<F>(&self, config: &str, section_type: Option<&str>, mut callback: F) -> Vec<Section>
    where
        F: FnMut(&Section, &str),
    {
        let sections = self.sections(config, section_type);
        for section in &sections {
            callback(section, &section.name);
        }
        sections
    }

    /// Whether anything is staged
    pub fn has_staged_changes(&self) -> bool {
        !self.state.lock().overlay().is_empty()
    }
}
