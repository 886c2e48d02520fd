//! Connected-player session state

use crate::hud::HudService;
use crate::mode::{ModeService, ModeServiceFactory};
use crate::option::{OptionService, PreferenceStore};
use crate::timer::TimerService;
use dashmap::DashMap;
use std::sync::{Arc, Mutex, RwLock};
use surf_event_system::PlayerId;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Horizontal magnitude, ignoring the vertical component.
    pub fn length_2d(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }
}

impl std::ops::Add for Vec3 {
    type Output = Vec3;

    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MoveType {
    #[default]
    Walk,
    Ladder,
    Noclip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    MoveLeft,
    Forward,
    Back,
    MoveRight,
    Duck,
    Jump,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ButtonState {
    pub move_left: bool,
    pub forward: bool,
    pub back: bool,
    pub move_right: bool,
    pub duck: bool,
    pub jump: bool,
}

impl ButtonState {
    pub fn is_pressed(&self, button: Button) -> bool {
        match button {
            Button::MoveLeft => self.move_left,
            Button::Forward => self.forward,
            Button::Back => self.back,
            Button::MoveRight => self.move_right,
            Button::Duck => self.duck,
            Button::Jump => self.jump,
        }
    }
}

/// The player's physical representation on the host side. Absent between
/// disconnect and respawn, and during round transitions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pawn {
    pub on_ground: bool,
    pub move_type: MoveType,
    pub velocity_modifier: f32,
}

impl Default for Pawn {
    fn default() -> Self {
        Self {
            on_ground: true,
            move_type: MoveType::Walk,
            velocity_modifier: 1.0,
        }
    }
}

/// Movement snapshots the HUD reads every frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MovementState {
    pub velocity: Vec3,
    pub base_velocity: Vec3,
    pub takeoff_velocity: Vec3,
    /// Host clock value at the moment of the last landing.
    pub landing_time: f64,
}

/// One connected player and the services bound to their session.
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    language: RwLock<String>,
    pawn: RwLock<Option<Pawn>>,
    buttons: RwLock<ButtonState>,
    movement: RwLock<MovementState>,
    pub timer: TimerService,
    pub options: OptionService,
    pub hud: HudService,
    mode: Mutex<Option<Box<dyn ModeService>>>,
}

impl Player {
    pub fn new(name: impl Into<String>, prefs: Arc<dyn PreferenceStore>) -> Arc<Self> {
        let id = PlayerId::new();
        Arc::new(Self {
            id,
            name: name.into(),
            language: RwLock::new(crate::language::DEFAULT_LANGUAGE.to_string()),
            pawn: RwLock::new(Some(Pawn::default())),
            buttons: RwLock::new(ButtonState::default()),
            movement: RwLock::new(MovementState::default()),
            timer: TimerService::new(),
            options: OptionService::new(id, prefs),
            hud: HudService::new(),
            mode: Mutex::new(None),
        })
    }

    pub fn language(&self) -> String {
        self.language.read().unwrap().clone()
    }

    pub fn set_language(&self, tag: &str) {
        *self.language.write().unwrap() = tag.to_string();
    }

    pub fn pawn(&self) -> Option<Pawn> {
        *self.pawn.read().unwrap()
    }

    pub fn set_pawn(&self, pawn: Option<Pawn>) {
        *self.pawn.write().unwrap() = pawn;
    }

    /// Runs `f` against the pawn if one exists. Returns false when the
    /// physical representation is absent.
    pub fn with_pawn_mut<F: FnOnce(&mut Pawn)>(&self, f: F) -> bool {
        match self.pawn.write().unwrap().as_mut() {
            Some(pawn) => {
                f(pawn);
                true
            }
            None => false,
        }
    }

    pub fn buttons(&self) -> ButtonState {
        *self.buttons.read().unwrap()
    }

    pub fn set_buttons(&self, buttons: ButtonState) {
        *self.buttons.write().unwrap() = buttons;
    }

    pub fn is_button_pressed(&self, button: Button) -> bool {
        self.buttons.read().unwrap().is_pressed(button)
    }

    pub fn movement(&self) -> MovementState {
        *self.movement.read().unwrap()
    }

    pub fn set_movement(&self, movement: MovementState) {
        *self.movement.write().unwrap() = movement;
    }

    pub fn set_velocity(&self, velocity: Vec3, base_velocity: Vec3) {
        let mut movement = self.movement.write().unwrap();
        movement.velocity = velocity;
        movement.base_velocity = base_velocity;
    }

    pub fn record_takeoff(&self, velocity: Vec3) {
        self.movement.write().unwrap().takeoff_velocity = velocity;
    }

    pub fn record_landing(&self, time: f64) {
        self.movement.write().unwrap().landing_time = time;
    }

    // ------------------------------------------------------------------
    // Mode service lifecycle
    // ------------------------------------------------------------------

    /// Creates this player's mode service through the registered factory.
    /// A previously active service is cleaned up first so its host-visible
    /// side effects never leak across a mode switch.
    pub fn activate_mode(self: &Arc<Self>, factory: &ModeServiceFactory) {
        let mut slot = self.mode.lock().unwrap();
        if let Some(previous) = slot.as_mut() {
            previous.cleanup();
        }
        let service = factory(Arc::downgrade(self));
        debug!("Activated mode {} for {}", service.mode_short_name(), self.name);
        *slot = Some(service);
    }

    /// Clears the mode service's transient bookkeeping, e.g. on respawn.
    pub fn reset_mode(&self) {
        if let Some(service) = self.mode.lock().unwrap().as_mut() {
            service.reset();
        }
    }

    /// Cleans up and drops the mode service. Safe to call when no mode is
    /// active; cleanup runs exactly once per service instance.
    pub fn deactivate_mode(&self) {
        if let Some(mut service) = self.mode.lock().unwrap().take() {
            service.cleanup();
        }
    }

    pub fn has_mode(&self) -> bool {
        self.mode.lock().unwrap().is_some()
    }

    pub fn mode_short_name(&self) -> Option<&'static str> {
        self.mode
            .lock()
            .unwrap()
            .as_ref()
            .map(|service| service.mode_short_name())
    }
}

/// All connected players, keyed by id. Each session is owned exclusively
/// by this table; handlers and the tick loop share `Arc` handles.
pub struct PlayerRegistry {
    players: DashMap<PlayerId, Arc<Player>>,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        Self {
            players: DashMap::new(),
        }
    }

    pub fn insert(&self, player: Arc<Player>) {
        info!("Player {} connected ({})", player.name, player.id);
        self.players.insert(player.id, player);
    }

    pub fn get(&self, id: PlayerId) -> Option<Arc<Player>> {
        self.players.get(&id).map(|entry| entry.value().clone())
    }

    /// Removes the session, cleaning up the mode service exactly once.
    pub fn remove(&self, id: PlayerId) -> Option<Arc<Player>> {
        let (_, player) = self.players.remove(&id)?;
        player.deactivate_mode();
        info!("Player {} disconnected ({})", player.name, player.id);
        Some(player)
    }

    pub fn snapshot(&self) -> Vec<Arc<Player>> {
        self.players.iter().map(|entry| entry.value().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

impl Default for PlayerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::{ModeConVar, ModeService, ModeServiceFactory};
    use crate::option::MemoryPreferenceStore;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Weak;

    struct CountingModeService {
        cleanups: Arc<AtomicU32>,
        resets: Arc<AtomicU32>,
    }

    impl ModeService for CountingModeService {
        fn reset(&mut self) {
            self.resets.fetch_add(1, Ordering::SeqCst);
        }

        fn cleanup(&mut self) {
            self.cleanups.fetch_add(1, Ordering::SeqCst);
        }

        fn mode_name(&self) -> &'static str {
            "Counting"
        }

        fn mode_short_name(&self) -> &'static str {
            "CNT"
        }

        fn mode_convar_values(&self) -> &'static [ModeConVar] {
            &[]
        }
    }

    fn counting_factory(cleanups: Arc<AtomicU32>, resets: Arc<AtomicU32>) -> ModeServiceFactory {
        Arc::new(move |_player: Weak<Player>| {
            Box::new(CountingModeService {
                cleanups: cleanups.clone(),
                resets: resets.clone(),
            }) as Box<dyn ModeService>
        })
    }

    fn test_player() -> Arc<Player> {
        Player::new("tester", Arc::new(MemoryPreferenceStore::new()))
    }

    #[test]
    fn disconnect_runs_cleanup_exactly_once() {
        let cleanups = Arc::new(AtomicU32::new(0));
        let resets = Arc::new(AtomicU32::new(0));
        let registry = PlayerRegistry::new();
        let player = test_player();
        let id = player.id;
        registry.insert(player.clone());

        player.activate_mode(&counting_factory(cleanups.clone(), resets.clone()));
        registry.remove(id);
        // Further deactivation attempts find an empty slot.
        player.deactivate_mode();

        assert_eq!(cleanups.load(Ordering::SeqCst), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn mode_switch_cleans_up_previous_service() {
        let cleanups = Arc::new(AtomicU32::new(0));
        let resets = Arc::new(AtomicU32::new(0));
        let player = test_player();
        let factory = counting_factory(cleanups.clone(), resets.clone());

        player.activate_mode(&factory);
        player.activate_mode(&factory);

        assert_eq!(cleanups.load(Ordering::SeqCst), 1);
        assert!(player.has_mode());
    }

    #[test]
    fn reset_mode_without_active_service_is_a_no_op() {
        let player = test_player();
        player.reset_mode();
        assert!(!player.has_mode());
    }

    #[test]
    fn pawn_mutation_reports_absence() {
        let player = test_player();
        assert!(player.with_pawn_mut(|pawn| pawn.velocity_modifier = 1.5));
        player.set_pawn(None);
        assert!(!player.with_pawn_mut(|pawn| pawn.velocity_modifier = 1.0));
    }
}
