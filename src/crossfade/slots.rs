use log::debug;

use crate::audio::AudioPlayer;
use crate::error::CrossfadeError;
use crate::models::{SlotRole, SlotStatus, Track};

/// Reference to one loaded slot of a `SlotTable`.
///
/// A handle stays valid until the slot it points to is released or
/// replaced; after that every lookup reports `StaleReference`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotHandle {
    role: SlotRole,
    generation: u64,
}

impl SlotHandle {
    pub fn role(&self) -> SlotRole {
        self.role
    }
}

struct Slot<P> {
    track: Track,
    /// `None` once released (tombstone)
    player: Option<P>,
    generation: u64,
    volume: (f32, f32),
    faulted: bool,
}

/// The two players of a session, owned in one place.
///
/// Every player placed in the table is released exactly once: explicitly,
/// when replaced, or when the table is dropped.
pub struct SlotTable<P: AudioPlayer> {
    slots: [Option<Slot<P>>; 2],
    next_generation: u64,
}

impl<P: AudioPlayer> SlotTable<P> {
    pub fn new() -> Self {
        Self {
            slots: [None, None],
            next_generation: 1,
        }
    }

    /// Put a player into a slot, releasing whatever occupied it before
    pub fn insert(&mut self, role: SlotRole, track: Track, player: P) -> SlotHandle {
        if let Some(handle) = self.handle(role) {
            let _ = self.release(handle);
        }

        let generation = self.next_generation;
        self.next_generation += 1;
        self.slots[role.index()] = Some(Slot {
            track,
            player: Some(player),
            generation,
            volume: (0.0, 0.0),
            faulted: false,
        });

        SlotHandle { role, generation }
    }

    /// Current handle for a role, if that slot holds a live player
    pub fn handle(&self, role: SlotRole) -> Option<SlotHandle> {
        self.slots[role.index()]
            .as_ref()
            .filter(|slot| slot.player.is_some())
            .map(|slot| SlotHandle {
                role,
                generation: slot.generation,
            })
    }

    pub fn is_live(&self, handle: SlotHandle) -> bool {
        self.slot(handle).is_ok()
    }

    pub fn track(&self, role: SlotRole) -> Option<&Track> {
        self.slots[role.index()].as_ref().map(|slot| &slot.track)
    }

    pub fn player(&self, handle: SlotHandle) -> Result<&P, CrossfadeError> {
        self.slot(handle)?
            .player
            .as_ref()
            .ok_or(CrossfadeError::StaleReference { role: handle.role })
    }

    pub fn player_mut(&mut self, handle: SlotHandle) -> Result<&mut P, CrossfadeError> {
        self.slot_mut(handle)?
            .player
            .as_mut()
            .ok_or(CrossfadeError::StaleReference { role: handle.role })
    }

    /// Write both channel gains and remember them for status snapshots
    pub fn set_volume(&mut self, handle: SlotHandle, left: f32, right: f32) -> Result<(), CrossfadeError> {
        let slot = self.slot_mut(handle)?;
        let player = slot
            .player
            .as_mut()
            .ok_or(CrossfadeError::StaleReference { role: handle.role })?;

        player
            .set_volume(left, right)
            .map_err(|source| CrossfadeError::Player {
                role: handle.role,
                source,
            })?;
        slot.volume = (left, right);
        Ok(())
    }

    pub fn start(&mut self, handle: SlotHandle) -> Result<(), CrossfadeError> {
        self.player_mut(handle)?
            .start()
            .map_err(|source| CrossfadeError::Player {
                role: handle.role,
                source,
            })
    }

    pub fn mark_faulted(&mut self, role: SlotRole) {
        if let Some(slot) = self.slots[role.index()].as_mut() {
            slot.faulted = true;
        }
    }

    pub fn is_faulted(&self, role: SlotRole) -> bool {
        self.slots[role.index()].as_ref().map(|slot| slot.faulted).unwrap_or(false)
    }

    /// Handles of the slots whose player is currently producing audio
    pub fn playing(&self) -> Vec<SlotHandle> {
        SlotRole::ALL
            .iter()
            .filter_map(|&role| self.handle(role))
            .filter(|&handle| self.player(handle).map(|p| p.is_playing()).unwrap_or(false))
            .collect()
    }

    /// Release one slot, leaving a tombstone behind
    pub fn release(&mut self, handle: SlotHandle) -> Result<(), CrossfadeError> {
        let slot = self.slot_mut(handle)?;
        match slot.player.take() {
            Some(mut player) => {
                player.release();
                debug!("Released {} slot ({})", handle.role, slot.track);
                Ok(())
            }
            None => Err(CrossfadeError::StaleReference { role: handle.role }),
        }
    }

    /// Release every live player; returns how many were released
    pub fn release_all(&mut self) -> usize {
        SlotRole::ALL
            .iter()
            .filter_map(|&role| self.handle(role))
            .collect::<Vec<_>>()
            .into_iter()
            .filter(|&handle| self.release(handle).is_ok())
            .count()
    }

    pub fn snapshot(&self) -> Vec<SlotStatus> {
        SlotRole::ALL
            .iter()
            .filter_map(|&role| {
                let slot = self.slots[role.index()].as_ref()?;
                let player = slot.player.as_ref();
                Some(SlotStatus {
                    role,
                    track: slot.track.clone(),
                    playing: player.map(|p| p.is_playing()).unwrap_or(false),
                    position: player.map(|p| p.current_position()).unwrap_or_default(),
                    duration: player.map(|p| p.total_duration()).unwrap_or_default(),
                    volume: slot.volume,
                    faulted: slot.faulted,
                    released: player.is_none(),
                })
            })
            .collect()
    }

    fn slot(&self, handle: SlotHandle) -> Result<&Slot<P>, CrossfadeError> {
        self.slots[handle.role.index()]
            .as_ref()
            .filter(|slot| slot.generation == handle.generation && slot.player.is_some())
            .ok_or(CrossfadeError::StaleReference { role: handle.role })
    }

    fn slot_mut(&mut self, handle: SlotHandle) -> Result<&mut Slot<P>, CrossfadeError> {
        self.slots[handle.role.index()]
            .as_mut()
            .filter(|slot| slot.generation == handle.generation && slot.player.is_some())
            .ok_or(CrossfadeError::StaleReference { role: handle.role })
    }
}

impl<P: AudioPlayer> Default for SlotTable<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: AudioPlayer> Drop for SlotTable<P> {
    fn drop(&mut self) {
        self.release_all();
    }
}
