use std::io::{self, Write};
use std::time::Duration;

use crate::error::{AudioError, ErrorSeverity, PlayerError, SessionError};
use crate::models::{FadeProgress, SessionStatus, SlotStatus};

/// Status and error formatting for the CLI
pub struct StatusDisplay;

impl StatusDisplay {
    /// Print the session status on one line, overwriting the previous one
    pub fn display_status_line(status: &SessionStatus) {
        print!("\r\x1B[2K{}", Self::format_status_line(status));
        let _ = io::stdout().flush();
    }

    pub fn format_status_line(status: &SessionStatus) -> String {
        let Some(slot) = status.audible() else {
            return "⏹ Nothing playing".to_string();
        };

        let mut line = format!(
            "▶ {} [{}] {}/{} ({:.0}%)",
            Self::truncate(&slot.track.display_name(), 30),
            Self::create_progress_bar(slot.progress(), 20),
            Self::format_duration(slot.position),
            Self::format_duration(slot.duration),
            slot.progress() * 100.0
        );

        if let Some(fade) = &status.fade {
            line.push_str(" | ");
            line.push_str(&Self::format_fade(fade));
        }
        line
    }

    pub fn format_fade(fade: &FadeProgress) -> String {
        format!(
            "fading {} → {} {}/{} ({:.0}%)",
            fade.fade_out,
            fade.fade_in,
            fade.steps_taken,
            fade.step_count,
            fade.level * 100.0
        )
    }

    /// Multi-line view of both slots
    pub fn display_full_status(status: &SessionStatus) {
        for line in Self::format_full_status(status) {
            println!("{}", line);
        }
    }

    pub fn format_full_status(status: &SessionStatus) -> Vec<String> {
        let mut lines = vec!["┌─ Crossfade Session ─────────────────────────────────────┐".to_string()];
        for slot in &status.slots {
            lines.extend(Self::format_slot(slot));
        }
        lines.push(match &status.fade {
            Some(fade) => format!("│ {}", Self::format_fade(fade)),
            None => "│ No crossfade in progress".to_string(),
        });
        lines.push("└─────────────────────────────────────────────────────────┘".to_string());
        lines
    }

    fn format_slot(slot: &SlotStatus) -> [String; 2] {
        let state = if slot.faulted {
            "✗ Faulted"
        } else if slot.released {
            "⏹ Released"
        } else if slot.playing {
            "▶ Playing"
        } else {
            "⏸ Idle"
        };

        [
            format!("│ {:<9} {} {}", slot.role.as_str(), state, Self::truncate(&slot.track.display_name(), 35)),
            format!(
                "│           {} / {}  volume {:.0}%",
                slot.position_formatted(),
                slot.duration_formatted(),
                slot.volume.0 * 100.0
            ),
        ]
    }

    /// Display error message with formatting and recovery suggestions
    pub fn display_error(error: &PlayerError) {
        let severity = error.severity();
        let severity_icon = match severity {
            ErrorSeverity::Info => "ℹ",
            ErrorSeverity::Warning => "⚠",
            ErrorSeverity::Error => "✗",
            ErrorSeverity::Critical => "🔥",
        };

        eprintln!("┌─ {} {} ─────────────────────────────────────────────────┐", severity_icon, severity.as_str());

        for line in Self::wrap_text(&error.user_message(), 55) {
            eprintln!("│ {}", line);
        }

        let suggestions = error.recovery_suggestions();
        if !suggestions.is_empty() {
            eprintln!("│");
            eprintln!("│ Suggestions:");
            for suggestion in suggestions.iter().take(3) {
                for line in Self::wrap_text(&format!("• {}", suggestion), 53) {
                    eprintln!("│   {}", line);
                }
            }
        }

        if let Some(context) = Self::error_context(error) {
            eprintln!("│");
            eprintln!("│ {}", context);
        }

        eprintln!("└─────────────────────────────────────────────────────────┘");
    }

    fn error_context(error: &PlayerError) -> Option<&'static str> {
        match error {
            PlayerError::Audio(AudioError::DeviceNotFound { .. }) => {
                Some("Use --list-devices to see available devices")
            }
            PlayerError::Session(SessionError::Decoder {
                source: AudioError::UnsupportedFormat { .. },
                ..
            }) => Some("Supported: FLAC, WAV, MP3, OGG/Vorbis, AAC/ALAC"),
            PlayerError::Config(_) => Some("Command line options override the config file"),
            _ => None,
        }
    }

    fn wrap_text(text: &str, width: usize) -> Vec<String> {
        let mut lines = Vec::new();
        let mut current_line = String::new();

        for word in text.split_whitespace() {
            if current_line.is_empty() {
                current_line = word.to_string();
            } else if current_line.len() + word.len() < width {
                current_line.push(' ');
                current_line.push_str(word);
            } else {
                lines.push(std::mem::take(&mut current_line));
                current_line = word.to_string();
            }
        }

        if !current_line.is_empty() {
            lines.push(current_line);
        }
        lines
    }

    /// Format duration as MM:SS or HH:MM:SS
    pub fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
        } else {
            format!("{:02}:{:02}", minutes, seconds)
        }
    }

    /// Truncate on a char boundary, adding an ellipsis
    pub fn truncate(s: &str, max_len: usize) -> String {
        if s.chars().count() <= max_len || max_len <= 3 {
            s.to_string()
        } else {
            let kept: String = s.chars().take(max_len - 3).collect();
            format!("{}...", kept)
        }
    }

    pub fn create_progress_bar(progress: f32, width: usize) -> String {
        let filled = ((progress.clamp(0.0, 1.0) * width as f32) as usize).min(width);
        format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SlotRole, Track};

    fn slot(role: SlotRole, locator: &str, playing: bool, position_s: u64, duration_s: u64) -> SlotStatus {
        SlotStatus {
            role,
            track: Track::parse(role, locator).unwrap(),
            playing,
            position: Duration::from_secs(position_s),
            duration: Duration::from_secs(duration_s),
            volume: if playing { (1.0, 1.0) } else { (0.0, 0.0) },
            faulted: false,
            released: false,
        }
    }

    #[test]
    fn test_status_line_single_track() {
        let status = SessionStatus {
            slots: vec![
                slot(SlotRole::Primary, "/music/Intro.flac", true, 30, 120),
                slot(SlotRole::Secondary, "/music/Outro.flac", false, 0, 200),
            ],
            fade: None,
        };

        let line = StatusDisplay::format_status_line(&status);
        assert!(line.starts_with("▶ Intro"));
        assert!(line.contains("00:30/02:00"));
        assert!(line.contains("(25%)"));
        assert!(!line.contains("fading"));
    }

    #[test]
    fn test_status_line_during_fade() {
        let status = SessionStatus {
            slots: vec![
                slot(SlotRole::Primary, "/music/Intro.flac", true, 115, 120),
                slot(SlotRole::Secondary, "/music/Outro.flac", true, 5, 200),
            ],
            fade: Some(FadeProgress {
                fade_out: SlotRole::Primary,
                fade_in: SlotRole::Secondary,
                steps_taken: 20,
                step_count: 40,
                level: 0.5,
            }),
        };

        let line = StatusDisplay::format_status_line(&status);
        assert!(line.starts_with("▶ Outro"));
        assert!(line.contains("fading primary → secondary 20/40 (50%)"));
    }

    #[test]
    fn test_status_line_when_nothing_plays() {
        let status = SessionStatus {
            slots: vec![slot(SlotRole::Primary, "/music/a.flac", false, 120, 120)],
            fade: None,
        };
        assert_eq!(StatusDisplay::format_status_line(&status), "⏹ Nothing playing");
    }

    #[test]
    fn test_full_status_lists_both_slots() {
        let mut faulted = slot(SlotRole::Secondary, "/music/Outro.flac", false, 0, 200);
        faulted.faulted = true;
        let status = SessionStatus {
            slots: vec![slot(SlotRole::Primary, "/music/Intro.flac", true, 65, 120), faulted],
            fade: None,
        };

        let lines = StatusDisplay::format_full_status(&status);

        assert_eq!(lines.len(), 7);
        assert!(lines[1].contains("primary") && lines[1].contains("▶ Playing") && lines[1].contains("Intro"));
        assert!(lines[2].contains("volume 100%"));
        assert!(lines[3].contains("secondary") && lines[3].contains("✗ Faulted"));
        assert!(lines[4].contains("volume 0%"));
        assert_eq!(lines[5], "│ No crossfade in progress");
    }

    #[test]
    fn test_full_status_shows_fade() {
        let status = SessionStatus {
            slots: vec![slot(SlotRole::Primary, "/music/Intro.flac", true, 115, 120)],
            fade: Some(FadeProgress {
                fade_out: SlotRole::Primary,
                fade_in: SlotRole::Secondary,
                steps_taken: 10,
                step_count: 40,
                level: 0.25,
            }),
        };

        let lines = StatusDisplay::format_full_status(&status);
        assert_eq!(lines[3], "│ fading primary → secondary 10/40 (25%)");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(StatusDisplay::format_duration(Duration::from_secs(0)), "00:00");
        assert_eq!(StatusDisplay::format_duration(Duration::from_secs(65)), "01:05");
        assert_eq!(StatusDisplay::format_duration(Duration::from_secs(3_725)), "01:02:05");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(StatusDisplay::truncate("short", 10), "short");
        assert_eq!(StatusDisplay::truncate("a rather long title", 10), "a rathe...");
        assert_eq!(StatusDisplay::truncate("ünïcödé títle", 8), "ünïcö...");
    }

    #[test]
    fn test_progress_bar() {
        assert_eq!(StatusDisplay::create_progress_bar(0.0, 4), "░░░░");
        assert_eq!(StatusDisplay::create_progress_bar(0.5, 4), "██░░");
        assert_eq!(StatusDisplay::create_progress_bar(1.5, 4), "████");
    }

    #[test]
    fn test_wrap_text() {
        let lines = StatusDisplay::wrap_text("one two three four", 9);
        assert_eq!(lines, vec!["one two", "three", "four"]);
    }
}
