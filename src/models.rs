use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::SessionError;

/// Reference to playable audio content. The locator is opaque to the engine;
/// only the player implementation interprets it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Track {
    locator: String,
}

impl Track {
    /// Build a track from a locator. A blank locator counts as "no track selected".
    pub fn parse(slot: SlotRole, locator: &str) -> Result<Self, SessionError> {
        let trimmed = locator.trim();
        if trimmed.is_empty() {
            return Err(SessionError::InvalidInput {
                slot,
                reason: "no track selected".to_string(),
            });
        }

        Ok(Self {
            locator: trimmed.to_string(),
        })
    }

    pub fn locator(&self) -> &str {
        &self.locator
    }

    /// Interpret the locator as a filesystem path, stripping a `file://` scheme
    pub fn as_path(&self) -> PathBuf {
        let raw = self.locator.strip_prefix("file://").unwrap_or(&self.locator);
        PathBuf::from(raw)
    }

    /// Get the display name for this track (file stem or raw locator)
    pub fn display_name(&self) -> String {
        self.as_path()
            .file_stem()
            .and_then(|s| s.to_str())
            .map(|s| s.to_string())
            .unwrap_or_else(|| self.locator.clone())
    }
}

impl std::fmt::Display for Track {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.locator)
    }
}

/// One of the two player slots of a session
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum SlotRole {
    Primary,
    Secondary,
}

impl SlotRole {
    pub const ALL: [SlotRole; 2] = [SlotRole::Primary, SlotRole::Secondary];

    /// The peer slot
    pub fn other(self) -> SlotRole {
        match self {
            SlotRole::Primary => SlotRole::Secondary,
            SlotRole::Secondary => SlotRole::Primary,
        }
    }

    pub fn index(self) -> usize {
        match self {
            SlotRole::Primary => 0,
            SlotRole::Secondary => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SlotRole::Primary => "primary",
            SlotRole::Secondary => "secondary",
        }
    }
}

impl std::fmt::Display for SlotRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Snapshot of one slot
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SlotStatus {
    pub role: SlotRole,
    pub track: Track,
    pub playing: bool,
    pub position: Duration,
    pub duration: Duration,
    /// Last volume written by the engine (left, right)
    pub volume: (f32, f32),
    pub faulted: bool,
    pub released: bool,
}

impl SlotStatus {
    /// Remaining playback time
    pub fn remaining(&self) -> Duration {
        self.duration.saturating_sub(self.position)
    }

    /// Get progress as a fraction (0.0 to 1.0)
    pub fn progress(&self) -> f32 {
        if self.duration.is_zero() {
            0.0
        } else {
            (self.position.as_secs_f32() / self.duration.as_secs_f32()).min(1.0)
        }
    }

    /// Format position as MM:SS
    pub fn position_formatted(&self) -> String {
        format_mm_ss(self.position)
    }

    /// Format duration as MM:SS
    pub fn duration_formatted(&self) -> String {
        format_mm_ss(self.duration)
    }
}

/// Progress of the fade in flight
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct FadeProgress {
    pub fade_out: SlotRole,
    pub fade_in: SlotRole,
    pub steps_taken: u32,
    pub step_count: u32,
    pub level: f32,
}

/// Snapshot of a running session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionStatus {
    pub slots: Vec<SlotStatus>,
    pub fade: Option<FadeProgress>,
}

impl SessionStatus {
    pub fn slot(&self, role: SlotRole) -> Option<&SlotStatus> {
        self.slots.iter().find(|s| s.role == role)
    }

    /// The slot that is currently audible, if exactly one is playing
    pub fn audible(&self) -> Option<&SlotStatus> {
        let mut playing = self.slots.iter().filter(|s| s.playing);
        match (playing.next(), playing.next()) {
            (Some(slot), None) => Some(slot),
            _ => self.fade.and_then(|fade| self.slot(fade.fade_in)),
        }
    }

    pub fn is_fading(&self) -> bool {
        self.fade.is_some()
    }
}

fn format_mm_ss(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    format!("{:02}:{:02}", total_seconds / 60, total_seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(role: SlotRole, playing: bool, position_ms: u64, duration_ms: u64) -> SlotStatus {
        SlotStatus {
            role,
            track: Track::parse(role, "/music/song.flac").unwrap(),
            playing,
            position: Duration::from_millis(position_ms),
            duration: Duration::from_millis(duration_ms),
            volume: (1.0, 1.0),
            faulted: false,
            released: false,
        }
    }

    #[test]
    fn test_track_parse_rejects_blank() {
        let result = Track::parse(SlotRole::Secondary, "   ");
        match result {
            Err(SessionError::InvalidInput { slot, .. }) => assert_eq!(slot, SlotRole::Secondary),
            other => panic!("Expected InvalidInput, got {:?}", other),
        }
    }

    #[test]
    fn test_track_locator_and_path() {
        let track = Track::parse(SlotRole::Primary, " file:///music/Artist - Song.mp3 ").unwrap();
        assert_eq!(track.locator(), "file:///music/Artist - Song.mp3");
        assert_eq!(track.as_path(), PathBuf::from("/music/Artist - Song.mp3"));
        assert_eq!(track.display_name(), "Artist - Song");
    }

    #[test]
    fn test_slot_role_other() {
        assert_eq!(SlotRole::Primary.other(), SlotRole::Secondary);
        assert_eq!(SlotRole::Secondary.other(), SlotRole::Primary);
        assert_eq!(SlotRole::Primary.index(), 0);
        assert_eq!(SlotRole::Secondary.index(), 1);
        assert_eq!(format!("{}", SlotRole::Secondary), "secondary");
    }

    #[test]
    fn test_slot_status_remaining_and_progress() {
        let status = slot(SlotRole::Primary, true, 50_000, 60_000);
        assert_eq!(status.remaining(), Duration::from_millis(10_000));
        assert!((status.progress() - 0.8333).abs() < 0.001);
        assert_eq!(status.position_formatted(), "00:50");
        assert_eq!(status.duration_formatted(), "01:00");

        let unknown = slot(SlotRole::Primary, true, 5_000, 0);
        assert_eq!(unknown.progress(), 0.0);
        assert_eq!(unknown.remaining(), Duration::ZERO);
    }

    #[test]
    fn test_session_status_audible_slot() {
        let status = SessionStatus {
            slots: vec![
                slot(SlotRole::Primary, true, 1_000, 12_000),
                slot(SlotRole::Secondary, false, 0, 20_000),
            ],
            fade: None,
        };
        assert_eq!(status.audible().map(|s| s.role), Some(SlotRole::Primary));
        assert!(!status.is_fading());

        let fading = SessionStatus {
            slots: vec![
                slot(SlotRole::Primary, true, 3_000, 12_000),
                slot(SlotRole::Secondary, true, 1_000, 20_000),
            ],
            fade: Some(FadeProgress {
                fade_out: SlotRole::Primary,
                fade_in: SlotRole::Secondary,
                steps_taken: 4,
                step_count: 40,
                level: 0.1,
            }),
        };
        assert_eq!(fading.audible().map(|s| s.role), Some(SlotRole::Secondary));
        assert!(fading.is_fading());
    }
}
