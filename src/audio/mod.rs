pub mod decode;
pub mod device;
pub mod output;
pub mod resampler;

use std::time::Duration;

use crate::error::AudioError;
use crate::models::{SlotRole, Track};

pub use decode::{decode_file, DecodedTrack};
pub use device::DeviceManager;
pub use output::{CpalPlayer, CpalPlayerFactory};
pub use resampler::LinearResampler;

/// Capability set the crossfade engine needs from one playback slot.
///
/// All calls are synchronous and expected to return quickly; implementations
/// do their decoding and device I/O elsewhere.
pub trait AudioPlayer: Send + 'static {
    /// Open the track for streaming playback
    fn load(&mut self, track: &Track) -> Result<(), AudioError>;

    /// Start or continue playback. A player that reached the end of its
    /// track starts again from the beginning.
    fn start(&mut self) -> Result<(), AudioError>;

    /// Whether the player is currently producing audio
    fn is_playing(&self) -> bool;

    /// Current playback position
    fn current_position(&self) -> Duration;

    /// Total length of the loaded track, `Duration::ZERO` if unknown
    fn total_duration(&self) -> Duration;

    /// Set the left/right output gain (0.0 to 1.0)
    fn set_volume(&mut self, left: f32, right: f32) -> Result<(), AudioError>;

    /// Free decoder and output resources. Calling it twice is harmless.
    fn release(&mut self);
}

/// Creates fresh, unloaded players for a session's slots
pub trait PlayerFactory: Send + Sync + 'static {
    type Player: AudioPlayer;

    fn create(&self, role: SlotRole) -> Result<Self::Player, AudioError>;
}
