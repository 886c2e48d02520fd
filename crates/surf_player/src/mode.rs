//! Polymorphic per-player movement-mode service
//!
//! Concrete variants live in their own extension crates and are created
//! exclusively through the factory bound at mode registration.

use crate::player::Player;
use std::sync::{Arc, Weak};

/// A mode-specific tunable value, owned by the extension rather than by any
/// per-player instance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConVarValue {
    Bool(bool),
    Int(i32),
    Float(f32),
    Str(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModeConVar {
    pub name: &'static str,
    pub value: ConVarValue,
}

/// Capability set every movement-mode service implements.
///
/// `reset` only clears internal bookkeeping and may be called repeatedly
/// while the service is active; it never touches host-visible player state.
/// `cleanup` is the one operation allowed to mutate the pawn (to undo any
/// modifier the mode applied) and must be a no-op when the pawn is absent.
pub trait ModeService: Send + Sync {
    fn reset(&mut self);
    fn cleanup(&mut self);
    fn mode_name(&self) -> &'static str;
    fn mode_short_name(&self) -> &'static str;
    fn mode_convar_values(&self) -> &'static [ModeConVar];
}

/// Constructs a mode service for one player. The player handle is a
/// non-owning back-reference; the service itself is owned by the player's
/// session container.
pub type ModeServiceFactory = Arc<dyn Fn(Weak<Player>) -> Box<dyn ModeService> + Send + Sync>;
