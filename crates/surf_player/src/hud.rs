//! Per-player HUD service
//!
//! Computes four text fragments from current movement and timer state and
//! composes the centre, alert and HTML-centre channel strings. Fragment
//! computation is pure; the only stateful pieces are the panel visibility
//! mirror and the stop-time snapshot written by the timer listeners.

use crate::context::{LifecycleState, SurfContext};
use crate::option::{OptionService, PREF_SHOW_PANEL};
use crate::player::{Button, MoveType, Player};
use crate::timer::format_time;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use surf_event_system::{
    EventError, PreferencesLoadedEvent, TimerEndEvent, TimerStoppedEvent, PREFERENCES_LOADED,
    TIMER_END_POST, TIMER_STOPPED,
};

/// Keep the takeoff velocity on for a while after landing so the speed
/// values flicker less.
pub const HUD_ON_GROUND_THRESHOLD: f64 = 0.07;

/// How long the stopped-run time stays on screen after the timer stops.
pub const HUD_TIMER_AFTER_STOP_DURATION: f64 = 5.0;

#[derive(Debug, Clone, Copy, Default)]
struct StoppedSnapshot {
    /// Host clock value at the moment the timer stopped.
    stopped_at: Option<f64>,
    /// Elapsed run time captured at that moment.
    time: f64,
}

pub struct HudService {
    show_panel: AtomicBool,
    stopped: Mutex<StoppedSnapshot>,
}

impl HudService {
    pub fn new() -> Self {
        Self {
            show_panel: AtomicBool::new(true),
            stopped: Mutex::new(StoppedSnapshot::default()),
        }
    }

    /// Round/session reset: resynchronizes the panel preference and drops
    /// the stop snapshot.
    pub fn reset(&self, options: &OptionService) {
        self.reset_show_panel(options);
        *self.stopped.lock().unwrap() = StoppedSnapshot::default();
    }

    pub fn reset_show_panel(&self, options: &OptionService) {
        let show = options.get_preference_bool(PREF_SHOW_PANEL, true);
        self.show_panel.store(show, Ordering::Relaxed);
    }

    pub fn is_showing_panel(&self) -> bool {
        self.show_panel.load(Ordering::Relaxed)
    }

    /// Records the stop snapshot. The host clock becomes invalid while the
    /// plugin is unloading, so the write is skipped entirely in that state.
    pub fn on_timer_stopped(&self, ctx: &SurfContext, current_time_when_timer_stopped: f64) {
        if ctx.lifecycle.state() == LifecycleState::Unloading {
            return;
        }
        *self.stopped.lock().unwrap() = StoppedSnapshot {
            stopped_at: Some(ctx.clock.now()),
            time: current_time_when_timer_stopped,
        };
    }

    fn should_show_timer_after_stop(&self, ctx: &SurfContext) -> bool {
        match self.stopped.lock().unwrap().stopped_at {
            Some(stopped_at) => ctx.clock.now() - stopped_at <= HUD_TIMER_AFTER_STOP_DURATION,
            None => false,
        }
    }

    // ------------------------------------------------------------------
    // Fragments
    // ------------------------------------------------------------------

    pub fn speed_text(&self, ctx: &SurfContext, player: &Player, language: &str) -> String {
        let movement = player.movement();
        let speed = (movement.velocity + movement.base_velocity).length_2d();
        let pawn = player.pawn();

        let settled_on_ground = pawn.map_or(true, |p| p.on_ground)
            && ctx.clock.now() - movement.landing_time > HUD_ON_GROUND_THRESHOLD;
        let climbing = pawn.map_or(false, |p| p.move_type == MoveType::Ladder)
            && !player.is_button_pressed(Button::Jump);

        if settled_on_ground || climbing {
            ctx.phrases
                .prepare(language, "HUD - Speed Text", &[&format!("{:.0}", speed)])
        } else {
            ctx.phrases.prepare(
                language,
                "HUD - Speed Text (Takeoff)",
                &[
                    &format!("{:.0}", speed),
                    &format!("{:.0}", movement.takeoff_velocity.length_2d()),
                ],
            )
        }
    }

    pub fn key_text(&self, ctx: &SurfContext, player: &Player, language: &str) -> String {
        let buttons = player.buttons();
        let key = |pressed: bool, glyph: &'static str| if pressed { glyph } else { "_" };
        ctx.phrases.prepare(
            language,
            "HUD - Key Text",
            &[
                key(buttons.move_left, "A"),
                key(buttons.forward, "W"),
                key(buttons.back, "S"),
                key(buttons.move_right, "D"),
                key(buttons.duck, "C"),
                key(buttons.jump, "J"),
            ],
        )
    }

    pub fn stage_text(&self, ctx: &SurfContext, player: &Player, language: &str) -> String {
        let stage = player.timer.stage();
        if stage > 0 {
            ctx.phrases
                .prepare(language, "HUD - Stage Text", &[&stage.to_string()])
        } else {
            String::new()
        }
    }

    pub fn timer_text(&self, ctx: &SurfContext, player: &Player, language: &str) -> String {
        let mut time_text = "00:00.000".to_string();
        if player.timer.is_running() || self.should_show_timer_after_stop(ctx) {
            let time = if player.timer.is_running() {
                player.timer.time()
            } else {
                self.stopped.lock().unwrap().time
            };
            time_text = format_time(time);
        }

        let paused_text = if player.timer.is_paused() {
            ctx.phrases.prepare(language, "HUD - Paused Text", &[])
        } else {
            String::new()
        };

        // Always return a timer line, so composite templates relying on
        // fixed line counts keep a consistent panel height whether or not
        // a timer is active.
        ctx.phrases
            .prepare(language, "HUD - Timer Text", &[&time_text, "", &paused_text])
    }

    /// Flips and persists the panel preference. On a transition to hidden
    /// the three channels are cleared so no stale text lingers.
    pub fn toggle_panel(&self, ctx: &SurfContext, player: &Player) -> bool {
        let show = !self.show_panel.load(Ordering::Relaxed);
        self.show_panel.store(show, Ordering::Relaxed);
        player.options.set_preference_bool(PREF_SHOW_PANEL, show);
        if !show {
            ctx.transport.print_centre(player.id, "");
            ctx.transport.print_alert(player.id, "");
            ctx.transport.print_html_centre(player.id, "");
        }
        show
    }
}

impl Default for HudService {
    fn default() -> Self {
        Self::new()
    }
}

/// Strips the leading and trailing runs of newline characters; interior
/// newlines survive. Tolerates language templates that resolve empty for a
/// key yet still contribute a blank line by convention.
pub fn trim_newlines(text: &str) -> &str {
    text.trim_matches('\n')
}

/// Composes and sends the three channel strings for `player`'s state to
/// `target`'s screen. A target with the panel hidden receives nothing; a
/// channel whose composite trims down to empty is not sent at all.
pub fn draw_panels(ctx: &SurfContext, player: &Player, target: &Player) {
    if !target.hud.is_showing_panel() {
        return;
    }
    let language = target.language();

    let key_text = player.hud.key_text(ctx, player, &language);
    let timer_text = player.hud.timer_text(ctx, player, &language);
    let speed_text = player.hud.speed_text(ctx, player, &language);
    let stage_text = player.hud.stage_text(ctx, player, &language);
    let fragments = [
        key_text.as_str(),
        stage_text.as_str(),
        timer_text.as_str(),
        speed_text.as_str(),
    ];

    let centre_text = ctx.phrases.prepare(&language, "HUD - Center Text", &fragments);
    let alert_text = ctx.phrases.prepare(&language, "HUD - Alert Text", &fragments);
    let html_text = ctx
        .phrases
        .prepare(&language, "HUD - Html Center Text", &fragments);

    let centre_text = trim_newlines(&centre_text);
    let alert_text = trim_newlines(&alert_text);
    let html_text = trim_newlines(&html_text);

    if !centre_text.is_empty() {
        ctx.transport.print_centre(target.id, centre_text);
    }
    if !alert_text.is_empty() {
        ctx.transport.print_alert(target.id, alert_text);
    }
    if !html_text.is_empty() {
        ctx.transport.print_html_centre(target.id, html_text);
    }
}

/// Wires the two process-wide listener registrations: timer stop/end push
/// the stop snapshot into the firing player's HUD state, and the
/// preferences-loaded event resynchronizes the panel flag. Called once at
/// plugin init, never per player.
pub fn register_hud_listeners(ctx: &Arc<SurfContext>) -> Result<(), EventError> {
    let weak = Arc::downgrade(ctx);
    ctx.events.on_timer(TIMER_STOPPED, move |event: TimerStoppedEvent| {
        let Some(ctx) = weak.upgrade() else {
            return Ok(());
        };
        if let Some(player) = ctx.players.get(event.player_id) {
            let time = player.timer.time();
            player.hud.on_timer_stopped(&ctx, time);
        }
        Ok(())
    })?;

    let weak = Arc::downgrade(ctx);
    ctx.events.on_timer(TIMER_END_POST, move |event: TimerEndEvent| {
        let Some(ctx) = weak.upgrade() else {
            return Ok(());
        };
        if let Some(player) = ctx.players.get(event.player_id) {
            player.hud.on_timer_stopped(&ctx, event.time);
        }
        Ok(())
    })?;

    let weak = Arc::downgrade(ctx);
    ctx.events
        .on_option(PREFERENCES_LOADED, move |event: PreferencesLoadedEvent| {
            let Some(ctx) = weak.upgrade() else {
                return Ok(());
            };
            if let Some(player) = ctx.players.get(event.player_id) {
                player.hud.reset_show_panel(&player.options);
            }
            Ok(())
        })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::{Channel, RecordingTransport};
    use crate::language::PhraseStore;
    use crate::option::{MemoryPreferenceStore, PreferenceStore};
    use crate::player::{ButtonState, Pawn, Vec3};
    use surf_event_system::{CourseId, PlayerId};

    fn test_context() -> (Arc<SurfContext>, Arc<RecordingTransport>) {
        let transport = Arc::new(RecordingTransport::new());
        let ctx = SurfContext::new(
            Arc::new(PhraseStore::with_defaults()),
            Arc::new(MemoryPreferenceStore::new()),
            transport.clone(),
        );
        (ctx, transport)
    }

    fn moving_player(ctx: &SurfContext) -> Arc<Player> {
        let player = ctx.connect_player("runner");
        player.set_velocity(Vec3::new(300.0, 0.0, 0.0), Vec3::default());
        player.record_takeoff(Vec3::new(250.0, 0.0, 0.0));
        player
    }

    #[test]
    fn speed_shows_takeoff_inside_the_grace_window() {
        let (ctx, _) = test_context();
        let player = moving_player(&ctx);
        player.record_landing(10.0);

        ctx.clock.set(10.05);
        let text = player.hud.speed_text(&ctx, &player, "en");
        assert_eq!(text, "Speed: 300 (250)");

        ctx.clock.set(10.08);
        let text = player.hud.speed_text(&ctx, &player, "en");
        assert_eq!(text, "Speed: 300");

        // The boundary itself still counts as just-landed.
        ctx.clock.set(10.07);
        let text = player.hud.speed_text(&ctx, &player, "en");
        assert_eq!(text, "Speed: 300 (250)");
    }

    #[test]
    fn speed_on_ladder_without_jump_is_normal() {
        let (ctx, _) = test_context();
        let player = moving_player(&ctx);
        ctx.clock.set(100.0);
        player.set_pawn(Some(Pawn {
            on_ground: false,
            move_type: MoveType::Ladder,
            velocity_modifier: 1.0,
        }));

        assert_eq!(player.hud.speed_text(&ctx, &player, "en"), "Speed: 300");

        let mut buttons = ButtonState::default();
        buttons.jump = true;
        player.set_buttons(buttons);
        assert_eq!(player.hud.speed_text(&ctx, &player, "en"), "Speed: 300 (250)");
    }

    #[test]
    fn key_text_renders_fixed_width_indicator() {
        let (ctx, _) = test_context();
        let player = ctx.connect_player("keys");
        player.set_buttons(ButtonState {
            move_left: true,
            forward: true,
            back: false,
            move_right: false,
            duck: true,
            jump: false,
        });
        assert_eq!(player.hud.key_text(&ctx, &player, "en"), "Keys: AW__C_");
    }

    #[test]
    fn stage_fragment_is_empty_at_stage_zero() {
        let (ctx, _) = test_context();
        let player = ctx.connect_player("stager");
        assert_eq!(player.hud.stage_text(&ctx, &player, "en"), "");
        player.timer.set_stage(3);
        assert_eq!(player.hud.stage_text(&ctx, &player, "en"), "Stage: 3");
    }

    #[test]
    fn timer_fragment_defaults_to_zero_text() {
        let (ctx, _) = test_context();
        let player = ctx.connect_player("idler");
        assert_eq!(player.hud.timer_text(&ctx, &player, "en"), "Time: 00:00.000");
    }

    #[test]
    fn timer_fragment_appends_paused_suffix_while_running() {
        let (ctx, _) = test_context();
        let player = ctx.connect_player("pauser");
        player.timer.start(CourseId(0));
        player.timer.tick(1.5);
        player.timer.pause();
        assert_eq!(
            player.hud.timer_text(&ctx, &player, "en"),
            "Time: 00:01.500 (paused)"
        );
    }

    #[test]
    fn stopped_snapshot_lingers_then_expires() {
        let (ctx, _) = test_context();
        register_hud_listeners(&ctx).unwrap();
        let player = ctx.connect_player("stopper");

        ctx.clock.set(20.0);
        player.timer.start(CourseId(1));
        player.timer.tick(12.345);
        player.timer.stop(&ctx.events, player.id).unwrap();

        // Within the linger window the snapshot time renders; pause state
        // was cleared by the stop, so no suffix appears.
        ctx.clock.set(23.0);
        assert_eq!(
            player.hud.timer_text(&ctx, &player, "en"),
            "Time: 00:12.345"
        );

        ctx.clock.set(25.1);
        assert_eq!(
            player.hud.timer_text(&ctx, &player, "en"),
            "Time: 00:00.000"
        );
    }

    #[test]
    fn end_event_snapshot_uses_reported_time() {
        let (ctx, _) = test_context();
        register_hud_listeners(&ctx).unwrap();
        let player = ctx.connect_player("finisher");

        ctx.clock.set(50.0);
        player.timer.start(CourseId(2));
        player.timer.tick(61.25);
        player.timer.end(&ctx.events, player.id).unwrap();

        assert_eq!(
            player.hud.timer_text(&ctx, &player, "en"),
            "Time: 01:01.250"
        );
    }

    #[test]
    fn snapshot_write_is_skipped_during_unload() {
        let (ctx, _) = test_context();
        register_hud_listeners(&ctx).unwrap();
        let player = ctx.connect_player("leaver");

        ctx.clock.set(30.0);
        ctx.lifecycle.begin_unload();
        player.timer.start(CourseId(0));
        player.timer.tick(5.0);
        player.timer.stop(&ctx.events, player.id).unwrap();

        assert_eq!(
            player.hud.timer_text(&ctx, &player, "en"),
            "Time: 00:00.000"
        );
    }

    #[test]
    fn preferences_load_resynchronizes_show_panel() {
        let (ctx, _) = test_context();
        register_hud_listeners(&ctx).unwrap();
        let player = ctx.connect_player("prefs");
        assert!(player.hud.is_showing_panel());

        ctx.prefs.set_bool(player.id, PREF_SHOW_PANEL, false);
        player.options.notify_loaded(&ctx.events).unwrap();
        assert!(!player.hud.is_showing_panel());
    }

    #[test]
    fn draw_panels_is_a_no_op_for_hidden_target() {
        let (ctx, transport) = test_context();
        let player = moving_player(&ctx);
        let target = ctx.connect_player("watcher");
        target.options.set_preference_bool(PREF_SHOW_PANEL, false);
        target.hud.reset_show_panel(&target.options);

        draw_panels(&ctx, &player, &target);
        assert!(transport.sends().is_empty());
    }

    #[test]
    fn draw_panels_sends_trimmed_composites() {
        let (ctx, transport) = test_context();
        ctx.clock.set(100.0);
        let player = moving_player(&ctx);

        draw_panels(&ctx, &player, &player);
        let sends = transport.take();
        assert_eq!(sends.len(), 3);

        // Stage is empty, so the centre composite's leading blank line is
        // trimmed away while the interior structure survives.
        assert_eq!(sends[0].channel, Channel::Centre);
        assert_eq!(sends[0].text, "Time: 00:00.000\nSpeed: 300");
        assert_eq!(sends[1].channel, Channel::Alert);
        assert_eq!(sends[1].text, "Keys: ______");
        assert_eq!(sends[2].channel, Channel::HtmlCentre);
        assert_eq!(sends[2].text, "Keys: ______\n\nTime: 00:00.000\nSpeed: 300");
    }

    #[test]
    fn newline_only_composite_suppresses_the_channel() {
        let (ctx, transport) = test_context();
        ctx.phrases.insert("en", "HUD - Center Text", "\n\n");
        ctx.clock.set(100.0);
        let player = moving_player(&ctx);

        draw_panels(&ctx, &player, &player);
        let sends = transport.take();
        assert!(sends.iter().all(|sent| sent.channel != Channel::Centre));
        assert_eq!(sends.len(), 2);
    }

    #[test]
    fn trim_preserves_interior_blank_lines() {
        assert_eq!(trim_newlines("\n\nabc\n\ndef\n"), "abc\n\ndef");
        assert_eq!(trim_newlines("\n\n\n"), "");
    }

    #[test]
    fn toggle_twice_returns_to_original_state() {
        struct CountingStore {
            inner: MemoryPreferenceStore,
            writes: Mutex<Vec<bool>>,
        }

        impl PreferenceStore for CountingStore {
            fn get_bool(&self, player_id: PlayerId, key: &str, default: bool) -> bool {
                self.inner.get_bool(player_id, key, default)
            }

            fn set_bool(&self, player_id: PlayerId, key: &str, value: bool) {
                self.writes.lock().unwrap().push(value);
                self.inner.set_bool(player_id, key, value);
            }
        }

        let store = Arc::new(CountingStore {
            inner: MemoryPreferenceStore::new(),
            writes: Mutex::new(Vec::new()),
        });
        let transport = Arc::new(RecordingTransport::new());
        let ctx = SurfContext::new(
            Arc::new(PhraseStore::with_defaults()),
            store.clone(),
            transport,
        );
        let player = ctx.connect_player("toggler");

        assert!(!player.hud.toggle_panel(&ctx, &player));
        assert!(player.hud.toggle_panel(&ctx, &player));

        assert!(player.hud.is_showing_panel());
        assert_eq!(*store.writes.lock().unwrap(), vec![false, true]);
    }

    #[test]
    fn toggle_to_hidden_clears_all_three_channels() {
        let (ctx, transport) = test_context();
        let player = ctx.connect_player("hider");

        player.hud.toggle_panel(&ctx, &player);
        let sends = transport.take();
        let channels: Vec<Channel> = sends.iter().map(|sent| sent.channel).collect();
        assert_eq!(
            channels,
            vec![Channel::Centre, Channel::Alert, Channel::HtmlCentre]
        );
        assert!(sends.iter().all(|sent| sent.text.is_empty()));

        // Toggling back on sends nothing by itself.
        player.hud.toggle_panel(&ctx, &player);
        assert!(transport.take().is_empty());
    }
}
