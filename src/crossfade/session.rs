use std::sync::Arc;

use log::{debug, error, info};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};

use crate::audio::{AudioPlayer, PlayerFactory};
use crate::config::CrossfadeConfig;
use crate::crossfade::controller::CrossfadeController;
use crate::crossfade::fade::{FadePlan, FadeScheduler, FadeStep, FadeTimer};
use crate::crossfade::slots::SlotTable;
use crate::error::{AudioError, ConfigError, CrossfadeError, SessionError};
use crate::logging::AudioLogger;
use crate::models::{SessionStatus, SlotRole, Track};

#[derive(Debug)]
enum SessionCommand {
    Stop,
    Status(oneshot::Sender<SessionStatus>),
}

struct ActiveSession {
    commands: mpsc::Sender<SessionCommand>,
    task: JoinHandle<()>,
}

/// Two-track crossfading playback.
///
/// Each started session runs in its own tokio task which owns both players,
/// the fade state, and both timers; callers talk to it through a command
/// channel. Must be used from within a tokio runtime.
pub struct PlaybackSession<F: PlayerFactory> {
    factory: Arc<F>,
    config: CrossfadeConfig,
    logger: AudioLogger,
    active: Option<ActiveSession>,
}

impl<F: PlayerFactory> PlaybackSession<F> {
    pub fn new(factory: F, config: CrossfadeConfig) -> Result<Self, ConfigError> {
        Self::with_logger(factory, config, AudioLogger::new())
    }

    pub fn with_logger(factory: F, config: CrossfadeConfig, logger: AudioLogger) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            factory: Arc::new(factory),
            config,
            logger,
            active: None,
        })
    }

    pub fn config(&self) -> &CrossfadeConfig {
        &self.config
    }

    pub fn logger(&self) -> &AudioLogger {
        &self.logger
    }

    /// Load both tracks and start playing `primary`.
    ///
    /// Blank locators are rejected before anything else happens, so a
    /// running session survives a bad request. Otherwise the running
    /// session is stopped first. On a load failure every player created for
    /// the new session is released and no session is left running.
    pub async fn start(&mut self, primary: &str, secondary: &str) -> Result<(), SessionError> {
        let primary = Track::parse(SlotRole::Primary, primary)?;
        let secondary = Track::parse(SlotRole::Secondary, secondary)?;

        self.stop().await;

        let factory = Arc::clone(&self.factory);
        let logger = self.logger.clone();
        let tracks = (primary.clone(), secondary.clone());
        let slots = tokio::task::spawn_blocking(move || prepare_slots(factory.as_ref(), tracks, &logger))
            .await
            .map_err(|e| SessionError::Decoder {
                slot: SlotRole::Primary,
                source: AudioError::InitializationFailed(format!("Player setup task failed: {}", e)),
            })??;

        let actor = SessionActor::new(slots, &self.config, self.logger.clone());
        let (commands, receiver) = mpsc::channel(8);
        let task = tokio::spawn(actor.run(receiver));
        self.active = Some(ActiveSession { commands, task });

        self.logger
            .log_session_started(primary.locator(), secondary.locator());
        Ok(())
    }

    /// Cancel both timers and release both players. Does nothing when idle.
    pub async fn stop(&mut self) {
        let Some(active) = self.active.take() else {
            return;
        };

        // A closed channel means the actor is already tearing down
        let _ = active.commands.send(SessionCommand::Stop).await;
        if let Err(e) = active.task.await {
            error!("Session task ended abnormally: {}", e);
        }
        self.logger.log_session_stopped("stop requested");
    }

    /// Snapshot of both slots and the fade in flight, `None` when idle
    pub async fn status(&self) -> Option<SessionStatus> {
        let active = self.active.as_ref()?;
        let (reply, response) = oneshot::channel();
        active.commands.send(SessionCommand::Status(reply)).await.ok()?;
        response.await.ok()
    }

    pub fn is_active(&self) -> bool {
        self.active
            .as_ref()
            .map(|active| !active.task.is_finished())
            .unwrap_or(false)
    }
}

impl<F: PlayerFactory> Drop for PlaybackSession<F> {
    fn drop(&mut self) {
        // Dropping the sender closes the channel; the actor then tears down
        if self.active.take().is_some() {
            debug!("Playback session dropped while active");
        }
    }
}

/// Create and load both players, then start the primary one.
/// Runs on the blocking pool since loading decodes whole files.
fn prepare_slots<F: PlayerFactory>(
    factory: &F,
    (primary, secondary): (Track, Track),
    logger: &AudioLogger,
) -> Result<SlotTable<F::Player>, SessionError> {
    let mut slots = SlotTable::new();

    for (role, track) in [(SlotRole::Primary, primary), (SlotRole::Secondary, secondary)] {
        let player = factory
            .create(role)
            .map_err(|source| SessionError::Decoder { slot: role, source })?;
        let handle = slots.insert(role, track.clone(), player);

        let player = slots.player_mut(handle).map_err(setup_error)?;
        player.load(&track).map_err(|source| match source {
            AudioError::SourceNotFound { locator } => SessionError::InvalidInput {
                slot: role,
                reason: format!("source not found: {}", locator),
            },
            source => SessionError::Decoder { slot: role, source },
        })?;
        logger.log_track_loaded(role, track.locator(), player.total_duration());
    }

    let primary = slots
        .handle(SlotRole::Primary)
        .ok_or_else(|| setup_error(CrossfadeError::StaleReference { role: SlotRole::Primary }))?;
    let secondary = slots
        .handle(SlotRole::Secondary)
        .ok_or_else(|| setup_error(CrossfadeError::StaleReference { role: SlotRole::Secondary }))?;

    slots.set_volume(secondary, 0.0, 0.0).map_err(setup_error)?;
    slots.set_volume(primary, 1.0, 1.0).map_err(setup_error)?;
    slots.start(primary).map_err(setup_error)?;

    Ok(slots)
}

fn setup_error(error: CrossfadeError) -> SessionError {
    match error {
        CrossfadeError::Player { role, source } => SessionError::Decoder { slot: role, source },
        CrossfadeError::StaleReference { role } => SessionError::Decoder {
            slot: role,
            source: AudioError::Released,
        },
    }
}

/// Owns everything a running session touches; all timer callbacks run here
struct SessionActor<P: AudioPlayer> {
    slots: SlotTable<P>,
    controller: CrossfadeController,
    scheduler: FadeScheduler,
    fade_timer: FadeTimer,
    poll_period: Duration,
}

impl<P: AudioPlayer> SessionActor<P> {
    fn new(slots: SlotTable<P>, config: &CrossfadeConfig, logger: AudioLogger) -> Self {
        let plan = FadePlan::from_config(config);
        Self {
            slots,
            controller: CrossfadeController::new(config.crossfade_window(), logger.clone()),
            scheduler: FadeScheduler::new(plan, logger),
            fade_timer: FadeTimer::new(plan.step_interval()),
            poll_period: config.position_poll_interval(),
        }
    }

    async fn run(mut self, mut commands: mpsc::Receiver<SessionCommand>) {
        // First tick completes immediately
        let mut poll = interval(self.poll_period);
        poll.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(SessionCommand::Status(reply)) => {
                        let _ = reply.send(self.status());
                    }
                    Some(SessionCommand::Stop) | None => break,
                },
                _ = poll.tick() => self.on_position_tick(),
                _ = self.fade_timer.tick(), if self.fade_timer.is_armed() => self.on_fade_tick(),
            }
        }

        self.shutdown();
    }

    fn on_position_tick(&mut self) {
        if let Some(trigger) = self
            .controller
            .check_and_maybe_trigger(&mut self.slots, &mut self.scheduler)
        {
            info!(
                "Crossfading {} -> {} at {:.2}s of {:.2}s",
                trigger.fade_out,
                trigger.fade_in,
                trigger.position.as_secs_f64(),
                trigger.duration.as_secs_f64()
            );
            self.fade_timer.arm();
        }
    }

    fn on_fade_tick(&mut self) {
        match self.scheduler.step(&mut self.slots) {
            FadeStep::Stepped { .. } => {}
            FadeStep::Completed { .. } | FadeStep::Idle => self.fade_timer.disarm(),
        }
    }

    fn status(&self) -> SessionStatus {
        SessionStatus {
            slots: self.slots.snapshot(),
            fade: self.scheduler.progress(),
        }
    }

    fn shutdown(&mut self) {
        self.fade_timer.disarm();
        self.scheduler.cancel();
        let released = self.slots.release_all();
        debug!("Session actor stopped, released {} players", released);
    }
}
