//! Source-style movement mode
//!
//! Registers the "CSS" mode with the host and hands out a per-player
//! service carrying the transient movement bookkeeping the mode needs
//! between ticks. All of it resets cleanly; only `cleanup` touches the
//! pawn, restoring the velocity modifier the mode scales during play.

use std::sync::{Arc, Weak};
use surf_mode_system::ModeExtension;
use surf_player::{ConVarValue, ModeConVar, ModeService, ModeServiceFactory, Player, Vec3};
use tracing::debug;

pub const MODE_NAME: &str = "Source";
pub const MODE_NAME_SHORT: &str = "CSS";

/// Server tunables this mode pins while it is active.
pub const MODE_CVAR_VALUES: &[ModeConVar] = &[
    ModeConVar {
        name: "sv_accelerate",
        value: ConVarValue::Float(10.0),
    },
    ModeConVar {
        name: "sv_airaccelerate",
        value: ConVarValue::Float(150.0),
    },
    ModeConVar {
        name: "sv_air_max_wishspeed",
        value: ConVarValue::Float(30.0),
    },
    ModeConVar {
        name: "sv_autobunnyhopping",
        value: ConVarValue::Bool(true),
    },
    ModeConVar {
        name: "sv_enablebunnyhopping",
        value: ConVarValue::Bool(true),
    },
    ModeConVar {
        name: "sv_friction",
        value: ConVarValue::Float(4.0),
    },
    ModeConVar {
        name: "sv_gravity",
        value: ConVarValue::Float(800.0),
    },
    ModeConVar {
        name: "sv_jump_impulse",
        value: ConVarValue::Float(301.993377),
    },
    ModeConVar {
        name: "sv_maxspeed",
        value: ConVarValue::Float(320.0),
    },
    ModeConVar {
        name: "sv_maxvelocity",
        value: ConVarValue::Float(3500.0),
    },
    ModeConVar {
        name: "sv_staminajumpcost",
        value: ConVarValue::Float(0.0),
    },
    ModeConVar {
        name: "sv_staminalandcost",
        value: ConVarValue::Float(0.0),
    },
    ModeConVar {
        name: "sv_wateraccelerate",
        value: ConVarValue::Float(10.0),
    },
];

/// One entry of the pre-strafe angle window.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AngleSnapshot {
    pub angle: Vec3,
    pub when: f64,
}

/// Per-player movement state for the Source mode. Everything here is
/// transient bookkeeping between ticks; `reset` returns it all to the
/// just-constructed state.
pub struct SourceModeService {
    player: Weak<Player>,

    pub has_valid_desired_view_angle: bool,
    pub last_valid_desired_view_angle: Vec3,
    pub last_jump_release_time: f64,
    pub old_duck_pressed: bool,
    pub forced_unduck: bool,
    pub post_process_movement_z_speed: f32,

    pub angle_history: Vec<AngleSnapshot>,
    pub left_pre_ratio: f32,
    pub right_pre_ratio: f32,
    pub bonus_speed: f32,
    pub max_pre: f32,

    pub did_tpm: bool,
    pub override_tpm: bool,
    pub tpm_velocity: Vec3,
    pub tpm_origin: Vec3,
    pub last_valid_plane: Vec3,

    pub air_moving: bool,
    pub tpm_trigger_fix_origins: Vec<Vec3>,
}

impl SourceModeService {
    pub fn new(player: Weak<Player>) -> Self {
        Self {
            player,
            has_valid_desired_view_angle: false,
            last_valid_desired_view_angle: Vec3::default(),
            last_jump_release_time: 0.0,
            old_duck_pressed: false,
            forced_unduck: false,
            post_process_movement_z_speed: 0.0,
            angle_history: Vec::new(),
            left_pre_ratio: 0.0,
            right_pre_ratio: 0.0,
            bonus_speed: 0.0,
            max_pre: 0.0,
            did_tpm: false,
            override_tpm: false,
            tpm_velocity: Vec3::default(),
            tpm_origin: Vec3::default(),
            last_valid_plane: Vec3::default(),
            air_moving: false,
            tpm_trigger_fix_origins: Vec::new(),
        }
    }
}

impl ModeService for SourceModeService {
    fn reset(&mut self) {
        self.has_valid_desired_view_angle = false;
        self.last_valid_desired_view_angle = Vec3::default();
        self.last_jump_release_time = 0.0;
        self.old_duck_pressed = false;
        self.forced_unduck = false;
        self.post_process_movement_z_speed = 0.0;

        self.angle_history.clear();
        self.left_pre_ratio = 0.0;
        self.right_pre_ratio = 0.0;
        self.bonus_speed = 0.0;
        self.max_pre = 0.0;

        self.did_tpm = false;
        self.override_tpm = false;
        self.tpm_velocity = Vec3::default();
        self.tpm_origin = Vec3::default();
        self.last_valid_plane = Vec3::default();

        self.air_moving = false;
        self.tpm_trigger_fix_origins.clear();
    }

    fn cleanup(&mut self) {
        let Some(player) = self.player.upgrade() else {
            return;
        };
        if !player.with_pawn_mut(|pawn| pawn.velocity_modifier = 1.0) {
            debug!(player = %player.id, "Cleanup with no pawn, nothing to restore");
        }
    }

    fn mode_name(&self) -> &'static str {
        MODE_NAME
    }

    fn mode_short_name(&self) -> &'static str {
        MODE_NAME_SHORT
    }

    fn mode_convar_values(&self) -> &'static [ModeConVar] {
        MODE_CVAR_VALUES
    }
}

pub struct SourceModeExtension;

impl ModeExtension for SourceModeExtension {
    fn mode_name(&self) -> &'static str {
        MODE_NAME
    }

    fn mode_short_name(&self) -> &'static str {
        MODE_NAME_SHORT
    }

    fn factory(&self) -> ModeServiceFactory {
        Arc::new(|player: Weak<Player>| Box::new(SourceModeService::new(player)) as Box<dyn ModeService>)
    }

    fn convar_values(&self) -> &'static [ModeConVar] {
        MODE_CVAR_VALUES
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use surf_mode_system::{
        CapabilityDirectory, ExtensionHost, ExtensionState, GameConfig, HostUtils, MappingApi,
        ModeRegistry, HOST_UTILS_INTERFACE, MAPPING_API_INTERFACE, MODE_REGISTRY_INTERFACE,
    };
    use surf_player::{MemoryPreferenceStore, Pawn};

    fn test_player() -> Arc<Player> {
        Player::new("tester", Arc::new(MemoryPreferenceStore::new()))
    }

    #[test]
    fn reset_returns_to_initial_state_and_is_idempotent() {
        let player = test_player();
        let mut service = SourceModeService::new(Arc::downgrade(&player));

        service.bonus_speed = 42.0;
        service.did_tpm = true;
        service.angle_history.push(AngleSnapshot {
            angle: Vec3 { x: 0.0, y: 90.0, z: 0.0 },
            when: 1.5,
        });
        service.tpm_trigger_fix_origins.push(Vec3::default());

        service.reset();
        assert_eq!(service.bonus_speed, 0.0);
        assert!(!service.did_tpm);
        assert!(service.angle_history.is_empty());
        assert!(service.tpm_trigger_fix_origins.is_empty());

        service.reset();
        assert_eq!(service.max_pre, 0.0);
    }

    #[test]
    fn cleanup_restores_velocity_modifier() {
        let player = test_player();
        player.with_pawn_mut(|pawn| pawn.velocity_modifier = 0.3);

        let mut service = SourceModeService::new(Arc::downgrade(&player));
        service.cleanup();

        let mut restored = 0.0;
        player.with_pawn_mut(|pawn| restored = pawn.velocity_modifier);
        assert_eq!(restored, 1.0);
    }

    #[test]
    fn cleanup_without_pawn_is_a_no_op() {
        let player = test_player();
        player.set_pawn(None);

        let mut service = SourceModeService::new(Arc::downgrade(&player));
        // Must not panic or recreate the pawn.
        service.cleanup();
        assert!(!player.with_pawn_mut(|_| {}));
    }

    #[test]
    fn cleanup_after_player_is_gone_is_a_no_op() {
        let player = test_player();
        let mut service = SourceModeService::new(Arc::downgrade(&player));
        drop(player);
        service.cleanup();
    }

    #[test]
    fn reset_never_touches_the_pawn() {
        let player = test_player();
        player.with_pawn_mut(|pawn| pawn.velocity_modifier = 0.5);

        let mut service = SourceModeService::new(Arc::downgrade(&player));
        service.reset();

        let mut modifier = 0.0;
        player.with_pawn_mut(|pawn| modifier = pawn.velocity_modifier);
        assert_eq!(modifier, 0.5);
    }

    fn full_directory() -> (CapabilityDirectory, Arc<ModeRegistry>) {
        let directory = CapabilityDirectory::new();
        let registry = Arc::new(ModeRegistry::new());
        let config = Arc::new(GameConfig::new(HashMap::new()));
        directory.provide(MODE_REGISTRY_INTERFACE, registry.clone());
        directory.provide(HOST_UTILS_INTERFACE, Arc::new(HostUtils::new(Some(config))));
        directory.provide(MAPPING_API_INTERFACE, Arc::new(MappingApi::new("surf_kitsune")));
        (directory, registry)
    }

    #[test]
    fn extension_loads_and_creates_services_through_the_registry() {
        let (directory, registry) = full_directory();
        let mut host = ExtensionHost::new(Arc::new(SourceModeExtension));

        host.load(&directory).unwrap();
        assert_eq!(host.state(), ExtensionState::Active);

        let player = test_player();
        let service = registry.create_service("CSS", &player).unwrap();
        assert_eq!(service.mode_name(), "Source");
        assert_eq!(service.mode_short_name(), "CSS");

        host.unload();
        assert!(registry.find_by_short_name("CSS").is_none());
    }

    struct TickrateModeService;

    impl ModeService for TickrateModeService {
        fn reset(&mut self) {}

        fn cleanup(&mut self) {}

        fn mode_name(&self) -> &'static str {
            "102tick"
        }

        fn mode_short_name(&self) -> &'static str {
            "102t"
        }

        fn mode_convar_values(&self) -> &'static [ModeConVar] {
            &[]
        }
    }

    struct TickrateModeExtension;

    impl ModeExtension for TickrateModeExtension {
        fn mode_name(&self) -> &'static str {
            "102tick"
        }

        fn mode_short_name(&self) -> &'static str {
            "102t"
        }

        fn factory(&self) -> ModeServiceFactory {
            Arc::new(|_player| Box::new(TickrateModeService) as Box<dyn ModeService>)
        }

        fn convar_values(&self) -> &'static [ModeConVar] {
            &[]
        }
    }

    #[test]
    fn two_extensions_coexist_under_distinct_short_names() {
        let (directory, registry) = full_directory();
        let mut source = ExtensionHost::new(Arc::new(SourceModeExtension));
        let mut tickrate = ExtensionHost::new(Arc::new(TickrateModeExtension));

        source.load(&directory).unwrap();
        tickrate.load(&directory).unwrap();
        assert_eq!(registry.mode_count(), 2);

        // Unloading one mode leaves the other registered.
        tickrate.unload();
        assert!(registry.find_by_short_name("CSS").is_some());
        assert!(registry.find_by_short_name("102t").is_none());
    }

    #[test]
    fn pawn_default_velocity_modifier_is_neutral() {
        assert_eq!(Pawn::default().velocity_modifier, 1.0);
    }
}
