use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::models::SlotRole;

/// Engine event kept for debugging and status reporting
#[derive(Debug, Clone)]
pub struct AudioEvent {
    pub timestamp: DateTime<Utc>,
    pub event_type: AudioEventType,
    pub slot: Option<SlotRole>,
    pub details: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioEventType {
    SessionStarted,
    SessionStopped,
    TrackLoaded,
    CrossfadeTriggered,
    FadeCompleted,
    StaleSlot,
    DecodeError,
    VolumeError,
}

impl AudioEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AudioEventType::SessionStarted => "SESSION_STARTED",
            AudioEventType::SessionStopped => "SESSION_STOPPED",
            AudioEventType::TrackLoaded => "TRACK_LOADED",
            AudioEventType::CrossfadeTriggered => "CROSSFADE_TRIGGERED",
            AudioEventType::FadeCompleted => "FADE_COMPLETED",
            AudioEventType::StaleSlot => "STALE_SLOT",
            AudioEventType::DecodeError => "DECODE_ERROR",
            AudioEventType::VolumeError => "VOLUME_ERROR",
        }
    }

    fn log_level(&self) -> log::Level {
        match self {
            AudioEventType::SessionStarted
            | AudioEventType::SessionStopped
            | AudioEventType::TrackLoaded
            | AudioEventType::CrossfadeTriggered
            | AudioEventType::FadeCompleted => log::Level::Info,
            AudioEventType::StaleSlot => log::Level::Debug,
            AudioEventType::VolumeError => log::Level::Warn,
            AudioEventType::DecodeError => log::Level::Error,
        }
    }
}

/// Event log shared by a session and its actor task
#[derive(Clone)]
pub struct AudioLogger {
    events: Arc<Mutex<VecDeque<AudioEvent>>>,
    max_events: usize,
}

impl AudioLogger {
    pub fn new() -> Self {
        Self::with_capacity(1000)
    }

    pub fn with_capacity(max_events: usize) -> Self {
        Self {
            events: Arc::new(Mutex::new(VecDeque::new())),
            max_events,
        }
    }

    /// Initialize logging system with appropriate log level
    pub fn init() -> Result<(), Box<dyn std::error::Error>> {
        let log_level = std::env::var("CROSSFADE_PLAYER_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let mut builder = env_logger::Builder::new();

        builder.format(|buf, record| {
            use std::io::Write;
            writeln!(
                buf,
                "{} [{}] [{}:{}] {}",
                chrono::Utc::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                record.args()
            )
        });

        builder.filter_level(parse_level(&log_level));
        builder.try_init()?;

        info!("Crossfade player logging initialized with level: {}", log_level);
        Ok(())
    }

    /// Record an event and mirror it to the standard logger
    pub fn log_event(&self, event_type: AudioEventType, slot: Option<SlotRole>, details: String) {
        match event_type.log_level() {
            log::Level::Error => error!("[{}] {}", event_type.as_str(), details),
            log::Level::Warn => warn!("[{}] {}", event_type.as_str(), details),
            log::Level::Info => info!("[{}] {}", event_type.as_str(), details),
            _ => debug!("[{}] {}", event_type.as_str(), details),
        }

        let event = AudioEvent {
            timestamp: Utc::now(),
            event_type,
            slot,
            details,
        };

        // A poisoned lock only means another thread panicked mid-push
        let mut events = self.events.lock().unwrap_or_else(|p| p.into_inner());
        events.push_back(event);
        while events.len() > self.max_events {
            events.pop_front();
        }
    }

    pub fn log_session_started(&self, primary: &str, secondary: &str) {
        self.log_event(
            AudioEventType::SessionStarted,
            None,
            format!("Session started: '{}' then '{}'", primary, secondary),
        );
    }

    pub fn log_session_stopped(&self, reason: &str) {
        self.log_event(AudioEventType::SessionStopped, None, format!("Session stopped: {}", reason));
    }

    pub fn log_track_loaded(&self, slot: SlotRole, track: &str, duration: Duration) {
        self.log_event(
            AudioEventType::TrackLoaded,
            Some(slot),
            format!("Loaded '{}' into {} slot ({:.2}s)", track, slot, duration.as_secs_f64()),
        );
    }

    pub fn log_crossfade_triggered(&self, fade_out: SlotRole, fade_in: SlotRole, remaining: Duration) {
        self.log_event(
            AudioEventType::CrossfadeTriggered,
            Some(fade_in),
            format!(
                "Crossfade {} -> {} with {:.2}s remaining",
                fade_out,
                fade_in,
                remaining.as_secs_f64()
            ),
        );
    }

    pub fn log_fade_completed(&self, fade_out: SlotRole, fade_in: SlotRole, steps: u32) {
        self.log_event(
            AudioEventType::FadeCompleted,
            Some(fade_in),
            format!("Fade {} -> {} completed after {} steps", fade_out, fade_in, steps),
        );
    }

    pub fn log_stale_slot(&self, slot: SlotRole) {
        self.log_event(
            AudioEventType::StaleSlot,
            Some(slot),
            format!("Skipped volume write to released {} slot", slot),
        );
    }

    pub fn log_decode_error(&self, slot: SlotRole, error: &str) {
        self.log_event(
            AudioEventType::DecodeError,
            Some(slot),
            format!("Decode error in {} slot: {}", slot, error),
        );
    }

    pub fn log_volume_error(&self, slot: SlotRole, error: &str) {
        self.log_event(
            AudioEventType::VolumeError,
            Some(slot),
            format!("Volume write to {} slot failed: {}", slot, error),
        );
    }

    /// Get recent events, oldest first
    pub fn get_recent_events(&self, count: usize) -> Vec<AudioEvent> {
        let events = self.events.lock().unwrap_or_else(|p| p.into_inner());
        let skip = events.len().saturating_sub(count);
        events.iter().skip(skip).cloned().collect()
    }

    pub fn clear_events(&self) {
        self.events.lock().unwrap_or_else(|p| p.into_inner()).clear();
    }

    pub fn get_event_statistics(&self) -> EventStatistics {
        let events = self.events.lock().unwrap_or_else(|p| p.into_inner());
        let mut stats = EventStatistics::new();

        for event in events.iter() {
            match event.event_type {
                AudioEventType::CrossfadeTriggered => stats.crossfades += 1,
                AudioEventType::FadeCompleted => stats.completed_fades += 1,
                AudioEventType::DecodeError => stats.decode_errors += 1,
                AudioEventType::VolumeError => stats.volume_errors += 1,
                AudioEventType::StaleSlot => stats.stale_slot_skips += 1,
                _ => {}
            }
        }

        stats.total_events = events.len();
        stats
    }
}

impl Default for AudioLogger {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_level(level: &str) -> log::LevelFilter {
    match level.to_lowercase().as_str() {
        "trace" => log::LevelFilter::Trace,
        "debug" => log::LevelFilter::Debug,
        "warn" => log::LevelFilter::Warn,
        "error" => log::LevelFilter::Error,
        "off" => log::LevelFilter::Off,
        _ => log::LevelFilter::Info,
    }
}

/// Statistics about logged events
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventStatistics {
    pub total_events: usize,
    pub crossfades: usize,
    pub completed_fades: usize,
    pub decode_errors: usize,
    pub volume_errors: usize,
    pub stale_slot_skips: usize,
}

impl EventStatistics {
    pub fn new() -> Self {
        Self::default()
    }
}
