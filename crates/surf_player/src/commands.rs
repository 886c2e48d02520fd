//! User command surface
//!
//! The host owns command parsing and dispatch; this is the thin registry
//! the plugin hangs its handlers on. Commands take no arguments and always
//! complete.

use crate::context::SurfContext;
use crate::player::Player;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

pub type CommandHandler = Arc<dyn Fn(&SurfContext, &Player) + Send + Sync>;

pub struct CommandRegistry {
    commands: DashMap<String, CommandHandler>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self {
            commands: DashMap::new(),
        }
    }

    /// Returns false when the name is already taken.
    pub fn register(&self, name: &str, handler: CommandHandler) -> bool {
        if self.commands.contains_key(name) {
            return false;
        }
        debug!("Registered command {}", name);
        self.commands.insert(name.to_string(), handler);
        true
    }

    /// Dispatches `name` for `player`; returns false for unknown commands.
    pub fn dispatch(&self, ctx: &SurfContext, name: &str, player: &Player) -> bool {
        match self.commands.get(name) {
            Some(handler) => {
                handler.value()(ctx, player);
                true
            }
            None => false,
        }
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Binds the HUD panel toggle. The acknowledgment names the resulting
/// state, never a failure.
pub fn register_panel_command(registry: &CommandRegistry) {
    registry.register(
        "surf_panel",
        Arc::new(|ctx, player| {
            let showing = player.hud.toggle_panel(ctx, player);
            let key = if showing {
                "HUD Option - Info Panel - Enable"
            } else {
                "HUD Option - Info Panel - Disable"
            };
            ctx.print_chat(player, key, &[]);
        }),
    );
}
