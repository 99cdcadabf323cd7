use std::time::Duration;

use log::trace;

use crate::audio::AudioPlayer;
use crate::crossfade::fade::FadeScheduler;
use crate::crossfade::slots::SlotTable;
use crate::error::CrossfadeError;
use crate::logging::AudioLogger;
use crate::models::SlotRole;

/// A crossfade the controller just began
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FadeTrigger {
    pub fade_out: SlotRole,
    pub fade_in: SlotRole,
    pub position: Duration,
    pub duration: Duration,
    pub remaining: Duration,
}

/// Decides when the playing track is close enough to its end to hand over
/// to the other slot.
pub struct CrossfadeController {
    window: Duration,
    logger: AudioLogger,
}

impl CrossfadeController {
    pub fn new(window: Duration, logger: AudioLogger) -> Self {
        Self { window, logger }
    }

    /// Run one position check. Starts the other slot silently and begins a
    /// fade when exactly one slot plays and its remaining time is within the
    /// window.
    pub fn check_and_maybe_trigger<P: AudioPlayer>(
        &self,
        slots: &mut SlotTable<P>,
        scheduler: &mut FadeScheduler,
    ) -> Option<FadeTrigger> {
        if scheduler.is_active() {
            return None;
        }

        let playing = slots.playing();
        let [current] = playing.as_slice() else {
            trace!("{} slots playing, no crossfade check", playing.len());
            return None;
        };
        let current = *current;

        let (position, duration) = {
            let player = slots.player(current).ok()?;
            (player.current_position(), player.total_duration())
        };
        if duration.is_zero() {
            // Unknown length
            return None;
        }

        let remaining = duration.saturating_sub(position);
        if remaining > self.window {
            return None;
        }

        let fade_in_role = current.role().other();
        if slots.is_faulted(fade_in_role) {
            return None;
        }
        let target = slots.handle(fade_in_role)?;

        match slots.set_volume(target, 0.0, 0.0) {
            Ok(()) => {}
            Err(CrossfadeError::StaleReference { role }) => {
                self.logger.log_stale_slot(role);
                return None;
            }
            Err(e) => {
                // Never start a slot that could not be silenced
                self.logger.log_volume_error(fade_in_role, &e.to_string());
                slots.mark_faulted(fade_in_role);
                return None;
            }
        }

        if let Err(e) = slots.start(target) {
            self.logger.log_decode_error(fade_in_role, &e.to_string());
            slots.mark_faulted(fade_in_role);
            return None;
        }

        if !scheduler.begin(current, target) {
            return None;
        }
        self.logger
            .log_crossfade_triggered(current.role(), fade_in_role, remaining);

        Some(FadeTrigger {
            fade_out: current.role(),
            fade_in: fade_in_role,
            position,
            duration,
            remaining,
        })
    }
}
