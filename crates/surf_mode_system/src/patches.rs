//! Server behavior patches
//!
//! Patches toggle named server behaviors whose signatures come from the
//! game config. `init_patches` attempts every patch even when an earlier
//! one fails, so one missing signature doesn't block the rest.

use crate::host::GameConfig;
use tracing::{info, warn};

/// One named, reversible patch. It stays inert until `perform` finds its
/// signature in the game config.
#[derive(Debug, Clone)]
pub struct MemPatch {
    name: &'static str,
    signature_key: &'static str,
    applied: bool,
}

impl MemPatch {
    pub const fn new(name: &'static str, signature_key: &'static str) -> Self {
        Self {
            name,
            signature_key,
            applied: false,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_applied(&self) -> bool {
        self.applied
    }

    pub fn perform(&mut self, config: &GameConfig) -> bool {
        if self.applied {
            return true;
        }
        match config.lookup(self.signature_key) {
            Some(signature) => {
                info!(patch = self.name, signature, "Applied patch");
                self.applied = true;
                true
            }
            None => {
                warn!(
                    patch = self.name,
                    key = self.signature_key,
                    "Failed to find signature for patch"
                );
                false
            }
        }
    }

    pub fn undo(&mut self) {
        if self.applied {
            info!(patch = self.name, "Undid patch");
            self.applied = false;
        }
    }
}

pub struct PatchSet {
    patches: Vec<MemPatch>,
}

impl PatchSet {
    pub fn new(patches: Vec<MemPatch>) -> Self {
        Self { patches }
    }

    /// Patches every installation needs.
    pub fn common() -> Self {
        Self::new(vec![MemPatch::new(
            "ServerMovementUnlock",
            "ServerMovementUnlock",
        )])
    }

    /// Attempts every patch. Returns false if any patch failed, but never
    /// stops early.
    pub fn init_patches(&mut self, config: &GameConfig) -> bool {
        let mut success = true;
        for patch in &mut self.patches {
            if !patch.perform(config) {
                success = false;
            }
        }
        success
    }

    pub fn undo_patches(&mut self) {
        for patch in &mut self.patches {
            patch.undo();
        }
    }

    pub fn applied_count(&self) -> usize {
        self.patches.iter().filter(|p| p.is_applied()).count()
    }
}
