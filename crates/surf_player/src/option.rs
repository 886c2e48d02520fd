//! Per-player preference access
//!
//! The persistence engine itself is an external collaborator consumed as a
//! key/value boolean store; this service wraps it per player and publishes
//! the "preferences loaded" lifecycle event.

use dashmap::DashMap;
use std::sync::Arc;
use surf_event_system::{EventError, EventSystem, PlayerId, PreferencesLoadedEvent, PREFERENCES_LOADED};

/// Preference key for the HUD info panel.
pub const PREF_SHOW_PANEL: &str = "showPanel";

pub trait PreferenceStore: Send + Sync {
    fn get_bool(&self, player_id: PlayerId, key: &str, default: bool) -> bool;
    fn set_bool(&self, player_id: PlayerId, key: &str, value: bool);
}

/// In-memory store used by the host simulator and tests.
pub struct MemoryPreferenceStore {
    values: DashMap<(PlayerId, String), bool>,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self {
            values: DashMap::new(),
        }
    }
}

impl Default for MemoryPreferenceStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn get_bool(&self, player_id: PlayerId, key: &str, default: bool) -> bool {
        self.values
            .get(&(player_id, key.to_string()))
            .map(|entry| *entry.value())
            .unwrap_or(default)
    }

    fn set_bool(&self, player_id: PlayerId, key: &str, value: bool) {
        self.values.insert((player_id, key.to_string()), value);
    }
}

pub struct OptionService {
    player_id: PlayerId,
    store: Arc<dyn PreferenceStore>,
}

impl OptionService {
    pub fn new(player_id: PlayerId, store: Arc<dyn PreferenceStore>) -> Self {
        Self { player_id, store }
    }

    pub fn get_preference_bool(&self, key: &str, default: bool) -> bool {
        self.store.get_bool(self.player_id, key, default)
    }

    pub fn set_preference_bool(&self, key: &str, value: bool) {
        self.store.set_bool(self.player_id, key, value);
    }

    /// Announces that this player's persisted preferences finished loading,
    /// letting dependent services resynchronize their mirrors.
    pub fn notify_loaded(&self, events: &EventSystem) -> Result<(), EventError> {
        events.emit_option(
            PREFERENCES_LOADED,
            &PreferencesLoadedEvent {
                player_id: self.player_id,
            },
        )
    }
}
