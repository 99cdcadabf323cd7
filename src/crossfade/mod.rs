//! Two-slot crossfade engine: slot ownership, fade stepping, trigger
//! decisions, and the session that drives them on tokio timers.

pub mod controller;
pub mod fade;
pub mod session;
pub mod slots;

#[cfg(test)]
pub(crate) mod tests;

pub use controller::{CrossfadeController, FadeTrigger};
pub use fade::{FadePlan, FadeScheduler, FadeState, FadeStep, FadeTimer};
pub use session::PlaybackSession;
pub use slots::{SlotHandle, SlotTable};
