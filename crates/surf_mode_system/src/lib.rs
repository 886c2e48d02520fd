//! Mode-extension machinery for the surf plugin layer
//!
//! Independently loadable mode extensions register per-player movement
//! service factories with a central registry. Extensions discover the
//! registry and the other host services through named capabilities; their
//! load/unload/pause/unpause lifecycle tears registration state down and
//! rebuilds it without leaking or duplicating entries.

pub mod capability;
pub mod error;
pub mod extension;
pub mod host;
pub mod patches;
pub mod registry;

pub use capability::{
    CapabilityDirectory, HOST_UTILS_INTERFACE, MAPPING_API_INTERFACE, MODE_REGISTRY_INTERFACE,
};
pub use error::{CapabilityError, ModeLifecycleError, ModeResult};
pub use extension::{ExtensionHost, ExtensionState, ModeExtension};
pub use host::{ConVarRegistry, GameConfig, HostUtils, MappingApi};
pub use patches::{MemPatch, PatchSet};
pub use registry::{ModeRegistration, ModeRegistry, PluginId, RegistryStats};
