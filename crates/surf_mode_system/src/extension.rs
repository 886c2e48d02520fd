//! Mode extension lifecycle
//!
//! Each extension runs load/unload/pause/unpause independently against the
//! mode registry. Load is all-or-nothing: every required capability binds
//! before any stateful step, and a failure at any step aborts with a
//! diagnostic and no registration left behind. Pause is a full, temporary
//! withdrawal from the registry; to the registry a paused extension is
//! indistinguishable from an unloaded one.

use crate::capability::{
    CapabilityDirectory, HOST_UTILS_INTERFACE, MAPPING_API_INTERFACE, MODE_REGISTRY_INTERFACE,
};
use crate::error::{ModeLifecycleError, ModeResult};
use crate::host::{GameConfig, HostUtils, MappingApi};
use crate::registry::{ModeRegistry, PluginId};
use std::sync::Arc;
use surf_player::{ModeConVar, ModeServiceFactory};
use tracing::{error, info};

/// What a mode extension supplies to the lifecycle: its static names, its
/// per-player service factory, its tunables, and an internal-module init
/// hook that runs before the registry is touched.
pub trait ModeExtension: Send + Sync {
    fn mode_name(&self) -> &'static str;
    fn mode_short_name(&self) -> &'static str;
    fn factory(&self) -> ModeServiceFactory;
    fn convar_values(&self) -> &'static [ModeConVar];

    fn init_modules(&self) -> ModeResult<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtensionState {
    Unloaded,
    Active,
    Paused,
}

/// Drives one extension's lifecycle against the host.
pub struct ExtensionHost {
    plugin_id: PluginId,
    extension: Arc<dyn ModeExtension>,
    state: ExtensionState,
    registry: Option<Arc<ModeRegistry>>,
    utils: Option<Arc<HostUtils>>,
    mapping: Option<Arc<MappingApi>>,
    game_config: Option<Arc<GameConfig>>,
}

impl ExtensionHost {
    pub fn new(extension: Arc<dyn ModeExtension>) -> Self {
        Self {
            plugin_id: PluginId::new(),
            extension,
            state: ExtensionState::Unloaded,
            registry: None,
            utils: None,
            mapping: None,
            game_config: None,
        }
    }

    pub fn plugin_id(&self) -> PluginId {
        self.plugin_id
    }

    pub fn state(&self) -> ExtensionState {
        self.state
    }

    pub fn game_config(&self) -> Option<Arc<GameConfig>> {
        self.game_config.clone()
    }

    pub fn utils(&self) -> Option<Arc<HostUtils>> {
        self.utils.clone()
    }

    pub fn mapping(&self) -> Option<Arc<MappingApi>> {
        self.mapping.clone()
    }

    /// Extension load. The error's display string is the diagnostic the
    /// host shows; on any failure no registration exists.
    pub fn load(&mut self, directory: &CapabilityDirectory) -> ModeResult<()> {
        // All three capabilities must resolve before anything is bound.
        let registry: Arc<ModeRegistry> = directory.query(MODE_REGISTRY_INTERFACE)?;
        let utils: Arc<HostUtils> = directory.query(HOST_UTILS_INTERFACE)?;
        let mapping: Arc<MappingApi> = directory.query(MAPPING_API_INTERFACE)?;

        self.extension.init_modules()?;

        let game_config = utils
            .game_config()
            .ok_or(ModeLifecycleError::ConfigMissing)?;

        if !registry.register(
            self.plugin_id,
            self.extension.mode_short_name(),
            self.extension.mode_name(),
            self.extension.factory(),
        ) {
            let err = ModeLifecycleError::RegistrationFailed {
                short_name: self.extension.mode_short_name().to_string(),
            };
            error!("{}", err);
            return Err(err);
        }

        // Extension-local user-facing controls only come up once the
        // registration stuck.
        utils.convars().register_mode_values(self.extension.convar_values());

        self.registry = Some(registry);
        self.utils = Some(utils);
        self.mapping = Some(mapping);
        self.game_config = Some(game_config);
        self.state = ExtensionState::Active;
        info!(
            "Loaded mode extension {} ({})",
            self.extension.mode_name(),
            self.extension.mode_short_name()
        );
        Ok(())
    }

    /// Unconditionally withdraws the registration and drops all bindings.
    /// Always succeeds from the extension's point of view.
    pub fn unload(&mut self) {
        if let Some(registry) = &self.registry {
            registry.unregister(self.plugin_id);
        }
        self.registry = None;
        self.utils = None;
        self.mapping = None;
        self.game_config = None;
        self.state = ExtensionState::Unloaded;
        info!(
            "Unloaded mode extension {}",
            self.extension.mode_short_name()
        );
    }

    /// Withdraws the registration but keeps the capability bindings so
    /// unpause can re-register with the same static state.
    pub fn pause(&mut self) {
        if let Some(registry) = &self.registry {
            registry.unregister(self.plugin_id);
        }
        if self.state == ExtensionState::Active {
            self.state = ExtensionState::Paused;
            info!("Paused mode extension {}", self.extension.mode_short_name());
        }
    }

    /// Re-registers with the bindings captured at load. Failure carries
    /// the same diagnostic as the load path.
    pub fn unpause(&mut self) -> ModeResult<()> {
        let registry = self.registry.as_ref().ok_or(ModeLifecycleError::NotLoaded)?;
        if !registry.register(
            self.plugin_id,
            self.extension.mode_short_name(),
            self.extension.mode_name(),
            self.extension.factory(),
        ) {
            return Err(ModeLifecycleError::RegistrationFailed {
                short_name: self.extension.mode_short_name().to_string(),
            });
        }
        self.state = ExtensionState::Active;
        info!(
            "Unpaused mode extension {}",
            self.extension.mode_short_name()
        );
        Ok(())
    }
}
