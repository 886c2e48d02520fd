//! Central mode registry
//!
//! Maps plugin identifiers to active mode registrations. Per-player mode
//! services are created lazily through the registered factory; the
//! registry itself never holds per-player state. Mutations only happen
//! during host-driven lifecycle transitions, which the host guarantees
//! are not concurrent with gameplay callbacks.

use dashmap::DashMap;
use std::sync::{Arc, RwLock};
use surf_player::{ModeService, ModeServiceFactory, Player};
use tracing::{info, warn};
use uuid::Uuid;

/// Identifier the host hands each loaded plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PluginId(pub Uuid);

impl PluginId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PluginId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PluginId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone)]
pub struct ModeRegistration {
    pub plugin_id: PluginId,
    pub short_name: String,
    pub full_name: String,
    pub factory: ModeServiceFactory,
}

impl std::fmt::Debug for ModeRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModeRegistration")
            .field("plugin_id", &self.plugin_id)
            .field("short_name", &self.short_name)
            .field("full_name", &self.full_name)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default, Clone)]
pub struct RegistryStats {
    pub register_calls: u64,
    pub unregister_calls: u64,
    pub rejected_registrations: u64,
}

pub struct ModeRegistry {
    modes: DashMap<PluginId, ModeRegistration>,
    stats: RwLock<RegistryStats>,
}

impl ModeRegistry {
    pub fn new() -> Self {
        Self {
            modes: DashMap::new(),
            stats: RwLock::new(RegistryStats::default()),
        }
    }

    /// Registers a mode. Returns false when the plugin id already holds a
    /// registration or the short name is taken; at most one registration
    /// exists per plugin id at any time.
    pub fn register(
        &self,
        plugin_id: PluginId,
        short_name: &str,
        full_name: &str,
        factory: ModeServiceFactory,
    ) -> bool {
        self.stats.write().unwrap().register_calls += 1;

        if self.modes.contains_key(&plugin_id) || self.find_by_short_name(short_name).is_some() {
            self.stats.write().unwrap().rejected_registrations += 1;
            warn!(
                "Rejected mode registration {} ({}): identifier or short name already taken",
                full_name, short_name
            );
            return false;
        }

        self.modes.insert(
            plugin_id,
            ModeRegistration {
                plugin_id,
                short_name: short_name.to_string(),
                full_name: full_name.to_string(),
                factory,
            },
        );
        info!("Registered mode {} ({})", full_name, short_name);
        true
    }

    /// Removes a registration. Idempotent: unregistering an identifier
    /// that was never registered leaves the registry untouched, and the
    /// caller is not told whether the identifier was present.
    pub fn unregister(&self, plugin_id: PluginId) {
        self.stats.write().unwrap().unregister_calls += 1;
        if let Some((_, registration)) = self.modes.remove(&plugin_id) {
            info!(
                "Unregistered mode {} ({})",
                registration.full_name, registration.short_name
            );
        }
    }

    pub fn get(&self, plugin_id: PluginId) -> Option<ModeRegistration> {
        self.modes.get(&plugin_id).map(|entry| entry.value().clone())
    }

    pub fn find_by_short_name(&self, short_name: &str) -> Option<ModeRegistration> {
        self.modes
            .iter()
            .find(|entry| entry.value().short_name == short_name)
            .map(|entry| entry.value().clone())
    }

    /// Creates a per-player service through the factory bound to
    /// `short_name`.
    pub fn create_service(
        &self,
        short_name: &str,
        player: &Arc<Player>,
    ) -> Option<Box<dyn ModeService>> {
        self.find_by_short_name(short_name)
            .map(|registration| (registration.factory)(Arc::downgrade(player)))
    }

    /// Activates the mode on the player's session through
    /// [`Player::activate_mode`]. Returns false for an unknown short name.
    pub fn activate(&self, short_name: &str, player: &Arc<Player>) -> bool {
        match self.find_by_short_name(short_name) {
            Some(registration) => {
                player.activate_mode(&registration.factory);
                true
            }
            None => false,
        }
    }

    pub fn mode_count(&self) -> usize {
        self.modes.len()
    }

    pub fn stats(&self) -> RegistryStats {
        self.stats.read().unwrap().clone()
    }
}

impl Default for ModeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Weak;
    use surf_player::ModeConVar;

    struct NullModeService;

    impl ModeService for NullModeService {
        fn reset(&mut self) {}

        fn cleanup(&mut self) {}

        fn mode_name(&self) -> &'static str {
            "Null"
        }

        fn mode_short_name(&self) -> &'static str {
            "NUL"
        }

        fn mode_convar_values(&self) -> &'static [ModeConVar] {
            &[]
        }
    }

    fn null_factory() -> ModeServiceFactory {
        Arc::new(|_player: Weak<Player>| Box::new(NullModeService) as Box<dyn ModeService>)
    }

    #[test]
    fn unregister_of_unknown_identifier_is_idempotent() {
        let registry = ModeRegistry::new();
        registry.unregister(PluginId::new());
        assert_eq!(registry.mode_count(), 0);
        assert_eq!(registry.stats().unregister_calls, 1);
        assert_eq!(registry.stats().rejected_registrations, 0);
    }

    #[test]
    fn duplicate_short_name_is_rejected() {
        let registry = ModeRegistry::new();
        assert!(registry.register(PluginId::new(), "NUL", "Null", null_factory()));
        assert!(!registry.register(PluginId::new(), "NUL", "Other Null", null_factory()));
        assert_eq!(registry.mode_count(), 1);
        assert_eq!(registry.stats().rejected_registrations, 1);
    }

    #[test]
    fn same_identifier_must_unregister_before_registering_again() {
        let registry = ModeRegistry::new();
        let id = PluginId::new();
        assert!(registry.register(id, "NUL", "Null", null_factory()));
        assert!(!registry.register(id, "NU2", "Null Two", null_factory()));

        registry.unregister(id);
        assert!(registry.register(id, "NU2", "Null Two", null_factory()));
    }

    #[test]
    fn services_are_created_through_the_bound_factory() {
        let registry = ModeRegistry::new();
        registry.register(PluginId::new(), "NUL", "Null", null_factory());

        let player = Player::new(
            "runner",
            Arc::new(surf_player::MemoryPreferenceStore::new()),
        );
        let service = registry.create_service("NUL", &player).unwrap();
        assert_eq!(service.mode_name(), "Null");
        assert!(registry.create_service("XYZ", &player).is_none());
    }
}
