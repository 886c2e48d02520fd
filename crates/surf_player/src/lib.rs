//! Per-player session model and services for the surf plugin layer
//!
//! A connected player owns a timer service, a preference (option) service,
//! a HUD service and, while a mode extension is active, one polymorphic
//! movement-mode service created through the factory that the extension
//! registered with the mode registry. Everything here runs synchronously
//! inside host-driven callbacks; cross-service reaction goes through the
//! event system.

pub mod commands;
pub mod context;
pub mod display;
pub mod hud;
pub mod language;
pub mod mode;
pub mod option;
pub mod player;
pub mod timer;

pub use commands::{register_panel_command, CommandHandler, CommandRegistry};
pub use context::{LifecycleState, ProcessLifecycle, ServerClock, SurfContext};
pub use display::{Channel, DisplayTransport, RecordingTransport, SentText, TracingTransport};
pub use hud::{draw_panels, register_hud_listeners, trim_newlines, HudService};
pub use language::{PhraseStore, DEFAULT_LANGUAGE};
pub use mode::{ConVarValue, ModeConVar, ModeService, ModeServiceFactory};
pub use option::{MemoryPreferenceStore, OptionService, PreferenceStore, PREF_SHOW_PANEL};
pub use player::{Button, ButtonState, MoveType, MovementState, Pawn, Player, PlayerRegistry, Vec3};
pub use timer::{format_time, TimerService};

pub use surf_event_system::{CourseId, PlayerId};
