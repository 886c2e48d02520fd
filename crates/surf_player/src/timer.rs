//! Per-player run timer
//!
//! The timer itself is mostly host territory; this service keeps the
//! run/pause/stop state and elapsed time the HUD reads, and publishes the
//! stop/end lifecycle events other services subscribe to.

use std::sync::RwLock;
use surf_event_system::{
    CourseId, EventError, EventSystem, PlayerId, TimerEndEvent, TimerStoppedEvent, TIMER_END_POST,
    TIMER_STOPPED,
};

#[derive(Debug, Clone, Copy, Default)]
struct TimerState {
    running: bool,
    paused: bool,
    stage: u32,
    time: f64,
    course: Option<CourseId>,
}

pub struct TimerService {
    state: RwLock<TimerState>,
}

impl TimerService {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(TimerState::default()),
        }
    }

    pub fn is_running(&self) -> bool {
        self.state.read().unwrap().running
    }

    pub fn is_paused(&self) -> bool {
        self.state.read().unwrap().paused
    }

    pub fn stage(&self) -> u32 {
        self.state.read().unwrap().stage
    }

    /// Elapsed time of the current run. Retains its last value after a
    /// stop so listeners that fire during the stop can still read it.
    pub fn time(&self) -> f64 {
        self.state.read().unwrap().time
    }

    pub fn course(&self) -> Option<CourseId> {
        self.state.read().unwrap().course
    }

    pub fn start(&self, course: CourseId) {
        *self.state.write().unwrap() = TimerState {
            running: true,
            course: Some(course),
            ..TimerState::default()
        };
    }

    pub fn set_stage(&self, stage: u32) {
        self.state.write().unwrap().stage = stage;
    }

    /// Host tick: advances the elapsed time while running and not paused.
    pub fn tick(&self, dt: f64) {
        let mut state = self.state.write().unwrap();
        if state.running && !state.paused {
            state.time += dt;
        }
    }

    pub fn pause(&self) {
        let mut state = self.state.write().unwrap();
        if state.running {
            state.paused = true;
        }
    }

    pub fn resume(&self) {
        self.state.write().unwrap().paused = false;
    }

    /// Stops the run without a finish. Emits `timer_stopped` after the
    /// state lock is released; stopping an idle timer emits nothing.
    pub fn stop(&self, events: &EventSystem, player_id: PlayerId) -> Result<(), EventError> {
        let course = {
            let mut state = self.state.write().unwrap();
            if !state.running {
                return Ok(());
            }
            state.running = false;
            state.paused = false;
            state.course.take().unwrap_or(CourseId(0))
        };
        events.emit_timer(
            TIMER_STOPPED,
            &TimerStoppedEvent {
                player_id,
                course_id: course,
            },
        )
    }

    /// Finishes the run and emits `timer_end_post` with the final time.
    pub fn end(&self, events: &EventSystem, player_id: PlayerId) -> Result<(), EventError> {
        let (course, time) = {
            let mut state = self.state.write().unwrap();
            if !state.running {
                return Ok(());
            }
            state.running = false;
            state.paused = false;
            (state.course.take().unwrap_or(CourseId(0)), state.time)
        };
        events.emit_timer(
            TIMER_END_POST,
            &TimerEndEvent {
                player_id,
                course_id: course,
                time,
            },
        )
    }
}

impl Default for TimerService {
    fn default() -> Self {
        Self::new()
    }
}

/// Renders a run time as `MM:SS.mmm`, with an hour prefix once a run goes
/// past the hour mark.
pub fn format_time(time: f64) -> String {
    let total_ms = (time.max(0.0) * 1000.0).round() as u64;
    let ms = total_ms % 1000;
    let seconds = (total_ms / 1000) % 60;
    let minutes = (total_ms / 60_000) % 60;
    let hours = total_ms / 3_600_000;
    if hours > 0 {
        format!("{}:{:02}:{:02}.{:03}", hours, minutes, seconds, ms)
    } else {
        format!("{:02}:{:02}.{:03}", minutes, seconds, ms)
    }
}
