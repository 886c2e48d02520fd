//! Typed handles behind the host capabilities
//!
//! These are the minimal surfaces this layer consumes from the host: the
//! game-configuration table (signatures and offsets by name), the cvar
//! registry extension-local controls hang off, and the mapping-data API.

use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use surf_player::{ConVarValue, ModeConVar};
use tracing::debug;

/// Host game configuration: named signature/offset entries.
pub struct GameConfig {
    entries: HashMap<String, String>,
}

impl GameConfig {
    pub fn new(entries: HashMap<String, String>) -> Self {
        Self { entries }
    }

    pub fn lookup(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }
}

/// Host-side console-variable table. Extension-local values are only
/// activated after the mode registration sticks.
pub struct ConVarRegistry {
    values: DashMap<String, ConVarValue>,
}

impl ConVarRegistry {
    pub fn new() -> Self {
        Self {
            values: DashMap::new(),
        }
    }

    pub fn register_mode_values(&self, cvars: &[ModeConVar]) {
        for cvar in cvars {
            debug!("Registering convar {} = {:?}", cvar.name, cvar.value);
            self.values.insert(cvar.name.to_string(), cvar.value);
        }
    }

    pub fn get(&self, name: &str) -> Option<ConVarValue> {
        self.values.get(name).map(|entry| *entry.value())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Default for ConVarRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// General host-accessor capability.
pub struct HostUtils {
    game_config: Option<Arc<GameConfig>>,
    convars: ConVarRegistry,
}

impl HostUtils {
    pub fn new(game_config: Option<Arc<GameConfig>>) -> Self {
        Self {
            game_config,
            convars: ConVarRegistry::new(),
        }
    }

    pub fn game_config(&self) -> Option<Arc<GameConfig>> {
        self.game_config.clone()
    }

    pub fn convars(&self) -> &ConVarRegistry {
        &self.convars
    }
}

/// Mapping-data capability: map metadata the modes read.
pub struct MappingApi {
    map_name: RwLock<String>,
}

impl MappingApi {
    pub fn new(map_name: impl Into<String>) -> Self {
        Self {
            map_name: RwLock::new(map_name.into()),
        }
    }

    pub fn current_map_name(&self) -> String {
        self.map_name.read().unwrap().clone()
    }

    pub fn set_current_map_name(&self, name: &str) {
        *self.map_name.write().unwrap() = name.to_string();
    }
}
