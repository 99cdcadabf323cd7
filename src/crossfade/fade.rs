use std::time::Duration;

use log::debug;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

use crate::audio::AudioPlayer;
use crate::config::CrossfadeConfig;
use crate::crossfade::slots::{SlotHandle, SlotTable};
use crate::error::CrossfadeError;
use crate::logging::AudioLogger;
use crate::models::FadeProgress;

/// Fixed parameters of every fade in a session
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FadePlan {
    step_count: u32,
    step_interval: Duration,
    max_volume: f32,
}

impl FadePlan {
    pub const MAX_VOLUME: f32 = 1.0;

    /// A fade of `duration` in steps of `step_interval`. The remainder of the
    /// division is dropped; at least one step is always taken.
    pub fn new(duration: Duration, step_interval: Duration) -> Self {
        let interval_ms = step_interval.as_millis().max(1);
        let step_count = (duration.as_millis() / interval_ms).clamp(1, u32::MAX as u128) as u32;
        Self {
            step_count,
            step_interval,
            max_volume: Self::MAX_VOLUME,
        }
    }

    pub fn from_config(config: &CrossfadeConfig) -> Self {
        Self::new(config.fade_duration(), config.fade_step_interval())
    }

    pub fn step_count(&self) -> u32 {
        self.step_count
    }

    pub fn step_interval(&self) -> Duration {
        self.step_interval
    }

    /// Volume change per step
    pub fn delta(&self) -> f32 {
        self.max_volume / self.step_count as f32
    }

    /// Fade-in level after `steps` steps; derived from the count so it never drifts
    pub fn level_at(&self, steps: u32) -> f32 {
        (steps as f32 / self.step_count as f32) * self.max_volume
    }
}

/// The fade in progress. Exists only between `begin` and completion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FadeState {
    pub fade_out: SlotHandle,
    pub fade_in: SlotHandle,
    pub steps_taken: u32,
    pub level: f32,
}

/// Outcome of one `FadeScheduler::step`
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FadeStep {
    /// No fade active; nothing was written
    Idle,
    Stepped { steps_taken: u32, level: f32 },
    /// The fade reached full level and was discarded; disarm the timer
    Completed {
        fade_out: SlotHandle,
        fade_in: SlotHandle,
        steps: u32,
    },
}

pub struct FadeScheduler {
    plan: FadePlan,
    state: Option<FadeState>,
    logger: AudioLogger,
}

impl FadeScheduler {
    pub fn new(plan: FadePlan, logger: AudioLogger) -> Self {
        Self {
            plan,
            state: None,
            logger,
        }
    }

    pub fn plan(&self) -> &FadePlan {
        &self.plan
    }

    pub fn is_active(&self) -> bool {
        self.state.is_some()
    }

    pub fn state(&self) -> Option<&FadeState> {
        self.state.as_ref()
    }

    pub fn progress(&self) -> Option<FadeProgress> {
        self.state.map(|state| FadeProgress {
            fade_out: state.fade_out.role(),
            fade_in: state.fade_in.role(),
            steps_taken: state.steps_taken,
            step_count: self.plan.step_count,
            level: state.level,
        })
    }

    /// Start fading `fade_out` down and `fade_in` up. Refused while a fade is active.
    pub fn begin(&mut self, fade_out: SlotHandle, fade_in: SlotHandle) -> bool {
        if self.state.is_some() {
            return false;
        }
        self.state = Some(FadeState {
            fade_out,
            fade_in,
            steps_taken: 0,
            level: 0.0,
        });
        true
    }

    /// Drop the fade without touching volumes
    pub fn cancel(&mut self) -> Option<FadeState> {
        self.state.take()
    }

    /// Write the current level to both slots, then advance one step
    pub fn step<P: AudioPlayer>(&mut self, slots: &mut SlotTable<P>) -> FadeStep {
        let Some(mut state) = self.state else {
            return FadeStep::Idle;
        };

        let max = self.plan.max_volume;
        self.write(slots, state.fade_out, max - state.level);
        self.write(slots, state.fade_in, state.level);

        state.steps_taken += 1;
        state.level = self.plan.level_at(state.steps_taken);

        if state.steps_taken >= self.plan.step_count || state.level >= max {
            // End state is written exactly instead of trusting the last increment
            self.write(slots, state.fade_out, 0.0);
            self.write(slots, state.fade_in, max);
            self.state = None;

            self.logger
                .log_fade_completed(state.fade_out.role(), state.fade_in.role(), state.steps_taken);
            return FadeStep::Completed {
                fade_out: state.fade_out,
                fade_in: state.fade_in,
                steps: state.steps_taken,
            };
        }

        self.state = Some(state);
        FadeStep::Stepped {
            steps_taken: state.steps_taken,
            level: state.level,
        }
    }

    fn write<P: AudioPlayer>(&self, slots: &mut SlotTable<P>, handle: SlotHandle, level: f32) {
        match slots.set_volume(handle, level, level) {
            Ok(()) => {}
            Err(CrossfadeError::StaleReference { role }) => self.logger.log_stale_slot(role),
            Err(e) => self.logger.log_volume_error(e.role(), &e.to_string()),
        }
    }
}

/// Periodic fade step timer. Disarmed timers never fire.
pub struct FadeTimer {
    period: Duration,
    interval: Option<Interval>,
}

impl FadeTimer {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            interval: None,
        }
    }

    /// First tick fires one period from now
    pub fn arm(&mut self) {
        let mut interval = interval_at(Instant::now() + self.period, self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.interval = Some(interval);
        debug!("Fade timer armed ({:?} period)", self.period);
    }

    pub fn disarm(&mut self) {
        if self.interval.take().is_some() {
            debug!("Fade timer disarmed");
        }
    }

    pub fn is_armed(&self) -> bool {
        self.interval.is_some()
    }

    /// Wait for the next tick; pends forever while disarmed
    pub async fn tick(&mut self) -> Instant {
        match self.interval.as_mut() {
            Some(interval) => interval.tick().await,
            None => std::future::pending().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::PlayerFactory;
    use crate::crossfade::tests::mock::{MockFactory, MockPlayer};
    use crate::models::{SlotRole, Track};

    const EPSILON: f32 = 1e-5;

    fn setup(factory: &MockFactory) -> (SlotTable<MockPlayer>, SlotHandle, SlotHandle) {
        factory.add_track("a.flac", Duration::from_secs(12));
        factory.add_track("b.flac", Duration::from_secs(20));

        let mut table = SlotTable::new();
        let mut handles = Vec::new();
        for (role, locator) in [(SlotRole::Primary, "a.flac"), (SlotRole::Secondary, "b.flac")] {
            let track = Track::parse(role, locator).unwrap();
            let mut player = factory.create(role).unwrap();
            player.load(&track).unwrap();
            handles.push(table.insert(role, track, player));
        }
        (table, handles[0], handles[1])
    }

    fn scheduler(duration_ms: u64, step_ms: u64) -> FadeScheduler {
        FadeScheduler::new(
            FadePlan::new(Duration::from_millis(duration_ms), Duration::from_millis(step_ms)),
            AudioLogger::new(),
        )
    }

    fn run_to_completion(
        scheduler: &mut FadeScheduler,
        table: &mut SlotTable<MockPlayer>,
    ) -> (u32, Vec<f32>) {
        let mut steps = 0;
        let mut levels = Vec::new();
        loop {
            match scheduler.step(table) {
                FadeStep::Stepped { level, .. } => {
                    steps += 1;
                    levels.push(level);
                }
                FadeStep::Completed { steps: total, .. } => return (total, levels),
                FadeStep::Idle => panic!("fade went idle without completing"),
            }
            assert!(steps < 10_000, "fade did not terminate");
        }
    }

    #[test]
    fn test_plan_step_count() {
        let plan = FadePlan::new(Duration::from_millis(10_000), Duration::from_millis(250));
        assert_eq!(plan.step_count(), 40);
        assert!((plan.delta() - 0.025).abs() < EPSILON);

        let plan = FadePlan::new(Duration::from_millis(1_000), Duration::from_millis(300));
        assert_eq!(plan.step_count(), 3);

        let plan = FadePlan::new(Duration::from_millis(100), Duration::from_millis(250));
        assert_eq!(plan.step_count(), 1);
    }

    #[test]
    fn test_exact_multiple_runs_exact_step_count() {
        for (duration_ms, step_ms) in [(10_000, 250), (1_000, 100), (3_000, 1_000), (500, 500)] {
            let factory = MockFactory::new();
            let (mut table, a, b) = setup(&factory);
            let mut fade = scheduler(duration_ms, step_ms);
            assert!(fade.begin(a, b));

            let (steps, _) = run_to_completion(&mut fade, &mut table);

            assert_eq!(steps as u64, duration_ms / step_ms);
            assert_eq!(factory.player(1).last_volume(), Some((1.0, 1.0)));
            assert_eq!(factory.player(0).last_volume(), Some((0.0, 0.0)));
            assert!(!fade.is_active());
        }
    }

    #[test]
    fn test_volumes_sum_to_max_at_every_write() {
        let factory = MockFactory::new();
        let (mut table, a, b) = setup(&factory);
        let mut fade = scheduler(1_000, 70);
        fade.begin(a, b);

        run_to_completion(&mut fade, &mut table);

        let out = factory.player(0).volumes();
        let fade_in = factory.player(1).volumes();
        assert_eq!(out.len(), fade_in.len());
        for (o, i) in out.iter().zip(fade_in.iter()) {
            assert!((o.0 + i.0 - 1.0).abs() < EPSILON, "{:?} + {:?}", o, i);
            assert_eq!(o.0, o.1);
            assert_eq!(i.0, i.1);
        }
    }

    #[test]
    fn test_level_is_monotonic_and_bounded() {
        let factory = MockFactory::new();
        let (mut table, a, b) = setup(&factory);
        let mut fade = scheduler(1_000, 30);
        fade.begin(a, b);
        let delta = fade.plan().delta();

        let (_, levels) = run_to_completion(&mut fade, &mut table);

        let written: Vec<f32> = factory.player(1).volumes().iter().map(|v| v.0).collect();
        for pair in written.windows(2) {
            assert!(pair[1] >= pair[0]);
        }
        for pair in levels.windows(2) {
            assert!(pair[1] >= pair[0]);
        }
        assert!(written.iter().all(|&l| l <= 1.0 + delta));
    }

    #[test]
    fn test_first_step_writes_start_levels() {
        let factory = MockFactory::new();
        let (mut table, a, b) = setup(&factory);
        let mut fade = scheduler(10_000, 250);
        fade.begin(a, b);

        let step = fade.step(&mut table);

        assert_eq!(
            step,
            FadeStep::Stepped {
                steps_taken: 1,
                level: 0.025
            }
        );
        assert_eq!(factory.player(0).volumes(), vec![(1.0, 1.0)]);
        assert_eq!(factory.player(1).volumes(), vec![(0.0, 0.0)]);
        let progress = fade.progress().unwrap();
        assert_eq!(progress.fade_in, SlotRole::Secondary);
        assert_eq!(progress.steps_taken, 1);
        assert_eq!(progress.step_count, 40);
    }

    #[test]
    fn test_begin_refused_while_active() {
        let factory = MockFactory::new();
        let (_table, a, b) = setup(&factory);
        let mut fade = scheduler(10_000, 250);

        assert!(fade.begin(a, b));
        assert!(!fade.begin(b, a));
        assert_eq!(fade.state().unwrap().fade_in, b);
    }

    #[test]
    fn test_step_when_idle_writes_nothing() {
        let factory = MockFactory::new();
        let (mut table, _a, _b) = setup(&factory);
        let mut fade = scheduler(10_000, 250);

        assert_eq!(fade.step(&mut table), FadeStep::Idle);
        assert!(factory.player(0).volumes().is_empty());
    }

    #[test]
    fn test_stale_slot_is_skipped_and_fade_finishes() {
        let factory = MockFactory::new();
        let (mut table, a, b) = setup(&factory);
        let logger = AudioLogger::new();
        let mut fade = FadeScheduler::new(
            FadePlan::new(Duration::from_millis(1_000), Duration::from_millis(250)),
            logger.clone(),
        );
        fade.begin(a, b);
        fade.step(&mut table);

        table.release(a).unwrap();
        let (steps, _) = run_to_completion(&mut fade, &mut table);

        assert_eq!(steps, 4);
        assert_eq!(factory.player(0).volumes().len(), 1);
        assert_eq!(factory.player(1).last_volume(), Some((1.0, 1.0)));
        assert_eq!(logger.get_event_statistics().stale_slot_skips, 4);
        assert_eq!(logger.get_event_statistics().completed_fades, 1);
    }

    #[test]
    fn test_volume_errors_are_swallowed() {
        let factory = MockFactory::new();
        let (mut table, a, b) = setup(&factory);
        let logger = AudioLogger::new();
        let mut fade = FadeScheduler::new(
            FadePlan::new(Duration::from_millis(500), Duration::from_millis(250)),
            logger.clone(),
        );
        factory.player(0).fail_volume(true);
        fade.begin(a, b);

        let (steps, _) = run_to_completion(&mut fade, &mut table);

        assert_eq!(steps, 2);
        assert_eq!(factory.player(1).last_volume(), Some((1.0, 1.0)));
        assert_eq!(logger.get_event_statistics().volume_errors, 3);
    }

    #[test]
    fn test_cancel_discards_state() {
        let factory = MockFactory::new();
        let (mut table, a, b) = setup(&factory);
        let mut fade = scheduler(10_000, 250);
        fade.begin(a, b);
        fade.step(&mut table);

        let cancelled = fade.cancel().unwrap();
        assert_eq!(cancelled.steps_taken, 1);
        assert!(!fade.is_active());
        assert!(fade.progress().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fade_timer_first_tick_after_one_period() {
        let mut timer = FadeTimer::new(Duration::from_millis(250));
        assert!(!timer.is_armed());

        let armed_at = Instant::now();
        timer.arm();
        let first = timer.tick().await;
        let second = timer.tick().await;

        assert_eq!(first - armed_at, Duration::from_millis(250));
        assert_eq!(second - armed_at, Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_disarmed_timer_never_fires() {
        let mut timer = FadeTimer::new(Duration::from_millis(250));
        timer.arm();
        timer.disarm();
        assert!(!timer.is_armed());

        let fired = tokio::time::timeout(Duration::from_secs(5), timer.tick()).await;
        assert!(fired.is_err());
    }
}
