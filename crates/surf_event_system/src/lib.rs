//! In-process event system for the surf service layer
//!
//! Handles the cross-service lifecycle events (timer stop/end, preference
//! loads) that decouple the timer, option and HUD services. Dispatch is
//! fully synchronous: emitting an event invokes every registered handler,
//! in registration order, before the emit call returns. Game-specific
//! per-tick logic never goes through this bus.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, error, warn};
use uuid::Uuid;

// ============================================================================
// Core Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub Uuid);

impl PlayerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_str(s: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(s).map(Self)
    }
}

impl Default for PlayerId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifies a timed course on the current map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CourseId(pub u32);

impl std::fmt::Display for CourseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Event Traits and Core Infrastructure
// ============================================================================

pub trait Event: Send + Sync + Any + std::fmt::Debug {
    fn type_name() -> &'static str
    where
        Self: Sized;
    fn serialize(&self) -> Result<Vec<u8>, EventError>;
    fn deserialize(data: &[u8]) -> Result<Self, EventError>
    where
        Self: Sized;
    fn as_any(&self) -> &dyn Any;
}

impl<T> Event for T
where
    T: Serialize + DeserializeOwned + Send + Sync + Any + std::fmt::Debug + 'static,
{
    fn type_name() -> &'static str {
        std::any::type_name::<T>()
    }

    fn serialize(&self) -> Result<Vec<u8>, EventError> {
        serde_json::to_vec(self).map_err(EventError::Serialization)
    }

    fn deserialize(data: &[u8]) -> Result<Self, EventError> {
        serde_json::from_slice(data).map_err(EventError::Deserialization)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub trait EventHandler: Send + Sync {
    fn handle(&self, data: &[u8]) -> Result<(), EventError>;
    fn expected_type_id(&self) -> TypeId;
    fn handler_name(&self) -> &str;
}

pub struct TypedEventHandler<T, F>
where
    T: Event,
    F: Fn(T) -> Result<(), EventError> + Send + Sync,
{
    handler: F,
    name: String,
    _phantom: std::marker::PhantomData<T>,
}

impl<T, F> TypedEventHandler<T, F>
where
    T: Event,
    F: Fn(T) -> Result<(), EventError> + Send + Sync,
{
    pub fn new(name: String, handler: F) -> Self {
        Self {
            handler,
            name,
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<T, F> EventHandler for TypedEventHandler<T, F>
where
    T: Event,
    F: Fn(T) -> Result<(), EventError> + Send + Sync,
{
    fn handle(&self, data: &[u8]) -> Result<(), EventError> {
        let event = T::deserialize(data)?;
        (self.handler)(event)
    }

    fn expected_type_id(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn handler_name(&self) -> &str {
        &self.name
    }
}

// ============================================================================
// Event System
// ============================================================================

/// Synchronous publish/subscribe registry keyed by event category.
///
/// Listeners are registered once at process-wide initialization, never per
/// player. Emission serializes the payload once and walks the handler list
/// in registration order; a failing handler is logged and skipped, it never
/// aborts delivery to the remaining handlers.
pub struct EventSystem {
    handlers: RwLock<HashMap<String, Vec<Arc<dyn EventHandler>>>>,
    stats: RwLock<EventSystemStats>,
}

impl EventSystem {
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
            stats: RwLock::new(EventSystemStats::default()),
        }
    }

    /// Register a timer-lifecycle event handler
    pub fn on_timer<T, F>(&self, event_name: &str, handler: F) -> Result<(), EventError>
    where
        T: Event + 'static,
        F: Fn(T) -> Result<(), EventError> + Send + Sync + 'static,
    {
        let event_key = format!("timer:{}", event_name);
        self.register_typed_handler(event_key, handler)
    }

    /// Register a preference-lifecycle event handler
    pub fn on_option<T, F>(&self, event_name: &str, handler: F) -> Result<(), EventError>
    where
        T: Event + 'static,
        F: Fn(T) -> Result<(), EventError> + Send + Sync + 'static,
    {
        let event_key = format!("option:{}", event_name);
        self.register_typed_handler(event_key, handler)
    }

    fn register_typed_handler<T, F>(&self, event_key: String, handler: F) -> Result<(), EventError>
    where
        T: Event + 'static,
        F: Fn(T) -> Result<(), EventError> + Send + Sync + 'static,
    {
        let handler_name = format!("{}::{}", event_key, T::type_name());
        let typed_handler = TypedEventHandler::new(handler_name, handler);
        let handler_arc: Arc<dyn EventHandler> = Arc::new(typed_handler);

        let mut handlers = self
            .handlers
            .write()
            .map_err(|_| EventError::Poisoned)?;
        handlers
            .entry(event_key.clone())
            .or_insert_with(Vec::new)
            .push(handler_arc);

        let mut stats = self.stats.write().map_err(|_| EventError::Poisoned)?;
        stats.total_handlers += 1;

        debug!("📝 Registered handler for {}", event_key);
        Ok(())
    }

    /// Emit a timer-lifecycle event
    pub fn emit_timer<T>(&self, event_name: &str, event: &T) -> Result<(), EventError>
    where
        T: Event,
    {
        let event_key = format!("timer:{}", event_name);
        self.emit_event(&event_key, event)
    }

    /// Emit a preference-lifecycle event
    pub fn emit_option<T>(&self, event_name: &str, event: &T) -> Result<(), EventError>
    where
        T: Event,
    {
        let event_key = format!("option:{}", event_name);
        self.emit_event(&event_key, event)
    }

    fn emit_event<T>(&self, event_key: &str, event: &T) -> Result<(), EventError>
    where
        T: Event,
    {
        let data = event.serialize()?;

        // Handlers are cloned out so a handler that registers further
        // handlers does not deadlock against the read guard.
        let matching: Vec<Arc<dyn EventHandler>> = {
            let handlers = self.handlers.read().map_err(|_| EventError::Poisoned)?;
            match handlers.get(event_key) {
                Some(list) => list.clone(),
                None => {
                    warn!("⚠️ No handlers for event: {}", event_key);
                    return Ok(());
                }
            }
        };

        debug!("📤 Emitting {} to {} handlers", event_key, matching.len());

        let mut failures = 0u64;
        for handler in &matching {
            if let Err(e) = handler.handle(&data) {
                error!("❌ Handler {} failed: {}", handler.handler_name(), e);
                failures += 1;
            }
        }

        let mut stats = self.stats.write().map_err(|_| EventError::Poisoned)?;
        stats.events_emitted += 1;
        stats.handler_failures += failures;

        Ok(())
    }

    pub fn get_stats(&self) -> EventSystemStats {
        self.stats
            .read()
            .map(|s| s.clone())
            .unwrap_or_default()
    }
}

impl Default for EventSystem {
    fn default() -> Self {
        Self::new()
    }
}

pub fn create_event_system() -> Arc<EventSystem> {
    Arc::new(EventSystem::new())
}

// ============================================================================
// Event Payloads
// ============================================================================

/// The timer stopped before reaching an end zone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerStoppedEvent {
    pub player_id: PlayerId,
    pub course_id: CourseId,
}

/// The timer reached the end of a course; `time` is the final run time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerEndEvent {
    pub player_id: PlayerId,
    pub course_id: CourseId,
    pub time: f64,
}

/// A player's persisted preferences finished loading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreferencesLoadedEvent {
    pub player_id: PlayerId,
}

pub const TIMER_STOPPED: &str = "timer_stopped";
pub const TIMER_END_POST: &str = "timer_end_post";
pub const PREFERENCES_LOADED: &str = "preferences_loaded";

// ============================================================================
// Statistics and Error Types
// ============================================================================

#[derive(Debug, Default, Clone)]
pub struct EventSystemStats {
    pub total_handlers: usize,
    pub events_emitted: u64,
    pub handler_failures: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Deserialization error: {0}")]
    Deserialization(serde_json::Error),
    #[error("Handler execution error: {0}")]
    HandlerExecution(String),
    #[error("Event system lock poisoned")]
    Poisoned,
}
