//! Display transport boundary
//!
//! The host renders text through three independent on-screen channels plus
//! chat; each send takes a pre-composed string. The tracing transport backs
//! the host simulator, the recording transport backs tests and embedders
//! that want to inspect what would have been drawn.

use std::sync::Mutex;
use surf_event_system::PlayerId;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Centre,
    Alert,
    HtmlCentre,
    Chat,
}

pub trait DisplayTransport: Send + Sync {
    fn print_centre(&self, player_id: PlayerId, text: &str);
    fn print_alert(&self, player_id: PlayerId, text: &str);
    fn print_html_centre(&self, player_id: PlayerId, text: &str);
    fn print_chat(&self, player_id: PlayerId, text: &str);
}

/// Logs every send through tracing instead of a real renderer.
pub struct TracingTransport;

impl DisplayTransport for TracingTransport {
    fn print_centre(&self, player_id: PlayerId, text: &str) {
        debug!(player = %player_id, channel = "centre", "{}", text);
    }

    fn print_alert(&self, player_id: PlayerId, text: &str) {
        debug!(player = %player_id, channel = "alert", "{}", text);
    }

    fn print_html_centre(&self, player_id: PlayerId, text: &str) {
        debug!(player = %player_id, channel = "html_centre", "{}", text);
    }

    fn print_chat(&self, player_id: PlayerId, text: &str) {
        debug!(player = %player_id, channel = "chat", "{}", text);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentText {
    pub player_id: PlayerId,
    pub channel: Channel,
    pub text: String,
}

/// Captures every send in order.
pub struct RecordingTransport {
    sends: Mutex<Vec<SentText>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self {
            sends: Mutex::new(Vec::new()),
        }
    }

    pub fn sends(&self) -> Vec<SentText> {
        self.sends.lock().unwrap().clone()
    }

    /// Drains the captured sends.
    pub fn take(&self) -> Vec<SentText> {
        std::mem::take(&mut self.sends.lock().unwrap())
    }

    fn record(&self, player_id: PlayerId, channel: Channel, text: &str) {
        self.sends.lock().unwrap().push(SentText {
            player_id,
            channel,
            text: text.to_string(),
        });
    }
}

impl Default for RecordingTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl DisplayTransport for RecordingTransport {
    fn print_centre(&self, player_id: PlayerId, text: &str) {
        self.record(player_id, Channel::Centre, text);
    }

    fn print_alert(&self, player_id: PlayerId, text: &str) {
        self.record(player_id, Channel::Alert, text);
    }

    fn print_html_centre(&self, player_id: PlayerId, text: &str) {
        self.record(player_id, Channel::HtmlCentre, text);
    }

    fn print_chat(&self, player_id: PlayerId, text: &str) {
        self.record(player_id, Channel::Chat, text);
    }
}
