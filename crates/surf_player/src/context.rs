//! Process-wide plugin context
//!
//! One `SurfContext` is constructed at plugin load and dropped at unload;
//! components receive it by reference instead of going through global
//! singletons. It also models the load/unload lifecycle state that gates
//! access to host-owned transient state such as the server clock.

use crate::display::DisplayTransport;
use crate::language::PhraseStore;
use crate::option::PreferenceStore;
use crate::player::{Player, PlayerRegistry};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use surf_event_system::{create_event_system, EventSystem, PlayerId};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Running,
    Unloading,
}

/// Explicit process lifecycle; host-owned state like the server clock may
/// only be read while `Running`.
pub struct ProcessLifecycle {
    unloading: AtomicBool,
}

impl ProcessLifecycle {
    pub fn new() -> Self {
        Self {
            unloading: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> LifecycleState {
        if self.unloading.load(Ordering::Acquire) {
            LifecycleState::Unloading
        } else {
            LifecycleState::Running
        }
    }

    pub fn begin_unload(&self) {
        info!("Plugin entering unload; host state reads are now gated off");
        self.unloading.store(true, Ordering::Release);
    }
}

impl Default for ProcessLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

/// Mirror of the host's global clock (`curtime`), advanced by the host
/// tick. Valid only while the plugin lifecycle is `Running`.
pub struct ServerClock {
    curtime: RwLock<f64>,
}

impl ServerClock {
    pub fn new() -> Self {
        Self {
            curtime: RwLock::new(0.0),
        }
    }

    pub fn now(&self) -> f64 {
        *self.curtime.read().unwrap()
    }

    pub fn advance(&self, dt: f64) {
        *self.curtime.write().unwrap() += dt;
    }

    pub fn set(&self, curtime: f64) {
        *self.curtime.write().unwrap() = curtime;
    }
}

impl Default for ServerClock {
    fn default() -> Self {
        Self::new()
    }
}

pub struct SurfContext {
    pub events: Arc<EventSystem>,
    pub players: PlayerRegistry,
    pub phrases: Arc<PhraseStore>,
    pub prefs: Arc<dyn PreferenceStore>,
    pub transport: Arc<dyn DisplayTransport>,
    pub clock: ServerClock,
    pub lifecycle: ProcessLifecycle,
}

impl SurfContext {
    pub fn new(
        phrases: Arc<PhraseStore>,
        prefs: Arc<dyn PreferenceStore>,
        transport: Arc<dyn DisplayTransport>,
    ) -> Arc<Self> {
        Arc::new(Self {
            events: create_event_system(),
            players: PlayerRegistry::new(),
            phrases,
            prefs,
            transport,
            clock: ServerClock::new(),
            lifecycle: ProcessLifecycle::new(),
        })
    }

    /// Creates a session for a newly connected player and seeds its HUD
    /// state from the preference store.
    pub fn connect_player(&self, name: impl Into<String>) -> Arc<Player> {
        let player = Player::new(name, self.prefs.clone());
        player.hud.reset(&player.options);
        self.players.insert(player.clone());
        player
    }

    pub fn disconnect_player(&self, id: PlayerId) {
        self.players.remove(id);
    }

    /// Resolves a phrase in the player's language and prints it to chat.
    /// Empty resolutions are swallowed rather than sent.
    pub fn print_chat(&self, player: &Player, key: &str, args: &[&str]) {
        let text = self.phrases.prepare(&player.language(), key, args);
        if !text.is_empty() {
            self.transport.print_chat(player.id, &text);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::RecordingTransport;
    use crate::option::MemoryPreferenceStore;

    #[test]
    fn lifecycle_starts_running() {
        let lifecycle = ProcessLifecycle::new();
        assert_eq!(lifecycle.state(), LifecycleState::Running);
        lifecycle.begin_unload();
        assert_eq!(lifecycle.state(), LifecycleState::Unloading);
    }

    #[test]
    fn connect_and_disconnect_round_trip() {
        let ctx = SurfContext::new(
            Arc::new(PhraseStore::with_defaults()),
            Arc::new(MemoryPreferenceStore::new()),
            Arc::new(RecordingTransport::new()),
        );
        let player = ctx.connect_player("alice");
        assert_eq!(ctx.players.len(), 1);
        ctx.disconnect_player(player.id);
        assert!(ctx.players.is_empty());
    }
}
