//! Standalone host harness for the surf plugin layer
//!
//! Wires the capability directory, loads the enabled mode extensions,
//! spawns the configured players and drives the HUD pipeline from a fixed
//! tick until Ctrl+C, then tears the plugin layer down in the unload
//! order the host would use.

mod cli;
mod config;

use cli::CliArgs;
use config::AppConfig;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use surf_mode_source::SourceModeExtension;
use surf_mode_system::{
    CapabilityDirectory, ExtensionHost, GameConfig, HostUtils, MappingApi, ModeRegistry, PatchSet,
    HOST_UTILS_INTERFACE, MAPPING_API_INTERFACE, MODE_REGISTRY_INTERFACE,
};
use surf_player::{
    draw_panels, register_hud_listeners, register_panel_command, CommandRegistry,
    MemoryPreferenceStore, PhraseStore, SurfContext, TracingTransport,
};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// ============================================================================
// Logging Setup
// ============================================================================

fn setup_logging(config: &config::LoggingSettings, json_logs: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.level.as_str()));

    let registry = tracing_subscriber::registry().with(filter);

    if json_logs || config.json_format {
        registry
            .with(fmt::layer().json().with_file(false).with_line_number(false))
            .init();
    } else {
        registry
            .with(fmt::layer().with_ansi(true).with_file(false).with_line_number(false))
            .init();
    }

    info!("🔧 Logging initialized with level: {}", config.level);
}

// ============================================================================
// Host wiring
// ============================================================================

fn build_capabilities(config: &AppConfig) -> (CapabilityDirectory, Arc<ModeRegistry>, Arc<GameConfig>) {
    let directory = CapabilityDirectory::new();
    let registry = Arc::new(ModeRegistry::new());
    let game_config = Arc::new(GameConfig::new(
        config
            .game
            .signatures
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect::<HashMap<_, _>>(),
    ));

    directory.provide(MODE_REGISTRY_INTERFACE, registry.clone());
    directory.provide(
        HOST_UTILS_INTERFACE,
        Arc::new(HostUtils::new(Some(game_config.clone()))),
    );
    directory.provide(
        MAPPING_API_INTERFACE,
        Arc::new(MappingApi::new(config.server.map.clone())),
    );

    (directory, registry, game_config)
}

fn load_extensions(
    config: &AppConfig,
    directory: &CapabilityDirectory,
) -> Vec<ExtensionHost> {
    let mut hosts = Vec::new();
    for short_name in &config.modes.enabled {
        if short_name != surf_mode_source::MODE_NAME_SHORT {
            warn!("Unknown mode extension {}, skipping", short_name);
            continue;
        }
        let mut host = ExtensionHost::new(Arc::new(SourceModeExtension));
        match host.load(directory) {
            Ok(()) => hosts.push(host),
            Err(e) => error!("{}", e),
        }
    }
    hosts
}

// ============================================================================
// Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();
    let mut config = AppConfig::load_or_default(&args.config_path)?;

    if let Some(level) = args.log_level {
        config.logging.level = level;
    }
    if let Some(map) = args.map {
        config.server.map = map;
    }
    setup_logging(&config.logging, args.json_logs);

    info!("🚀 surfd starting on map {}", config.server.map);

    // Host services the extensions discover by name.
    let (directory, registry, game_config) = build_capabilities(&config);

    let mut patches = PatchSet::common();
    if !patches.init_patches(&game_config) {
        warn!("Some patches failed to apply, continuing without them");
    }

    // Plugin-layer context and process-wide listeners.
    let ctx = SurfContext::new(
        Arc::new(PhraseStore::with_defaults()),
        Arc::new(MemoryPreferenceStore::new()),
        Arc::new(TracingTransport),
    );
    register_hud_listeners(&ctx)?;

    let commands = CommandRegistry::new();
    register_panel_command(&commands);

    let mut extension_hosts = load_extensions(&config, &directory);
    info!("{} mode extension(s) active", registry.mode_count());

    // Spawn the configured sessions and hand each the default mode.
    for name in &config.server.players {
        let player = ctx.connect_player(name.clone());
        if let Err(e) = player.options.notify_loaded(&ctx.events) {
            error!("Failed to announce preferences for {}: {}", player.name, e);
        }
        if !extension_hosts.is_empty()
            && !registry.activate(surf_mode_source::MODE_NAME_SHORT, &player)
        {
            warn!("No mode available for {}", player.name);
        }
    }

    let stats = ctx.events.get_stats();
    info!(
        "📊 Event system ready: {} handlers registered",
        stats.total_handlers
    );

    let tick = Duration::from_millis(config.server.tick_interval_ms);
    let dt = tick.as_secs_f64();
    let mut interval = tokio::time::interval(tick);
    info!("✅ surfd running, {}ms tick. Press Ctrl+C to stop", config.server.tick_interval_ms);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                ctx.clock.advance(dt);
                for player in ctx.players.snapshot() {
                    player.timer.tick(dt);
                    draw_panels(&ctx, &player, &player);
                }
            }
            _ = signal::ctrl_c() => {
                info!("🛑 Shutdown signal received");
                break;
            }
        }
    }

    // Unload order: gate host state reads off first, then withdraw the
    // extensions, then drop the sessions.
    ctx.lifecycle.begin_unload();
    for host in &mut extension_hosts {
        host.unload();
    }
    patches.undo_patches();
    for player in ctx.players.snapshot() {
        ctx.disconnect_player(player.id);
    }

    let stats = ctx.events.get_stats();
    info!(
        "📊 Final statistics: {} events emitted, {} handler failures",
        stats.events_emitted, stats.handler_failures
    );
    info!("✅ surfd shutdown complete");
    Ok(())
}
