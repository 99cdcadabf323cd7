use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream, StreamConfig};
use log::{debug, error, info};

use crate::audio::decode::decode_file;
use crate::audio::device::DeviceManager;
use crate::audio::{AudioPlayer, PlayerFactory};
use crate::error::AudioError;
use crate::models::{SlotRole, Track};

/// Commands sent to a player's output thread
#[derive(Debug)]
enum OutputCommand {
    Shutdown,
}

/// State shared between the player handle and the device callback
struct PlaybackShared {
    samples: Vec<f32>,
    channels: usize,
    sample_rate: u32,
    playing: AtomicBool,
    /// Next frame to be rendered
    cursor: AtomicUsize,
    left: AtomicU32,
    right: AtomicU32,
}

impl PlaybackShared {
    fn new(samples: Vec<f32>, channels: usize, sample_rate: u32, (left, right): (f32, f32)) -> Self {
        Self {
            samples,
            channels,
            sample_rate,
            playing: AtomicBool::new(false),
            cursor: AtomicUsize::new(0),
            left: AtomicU32::new(left.to_bits()),
            right: AtomicU32::new(right.to_bits()),
        }
    }

    fn frames(&self) -> usize {
        self.samples.len() / self.channels.max(1)
    }

    fn gains(&self) -> (f32, f32) {
        (
            f32::from_bits(self.left.load(Ordering::Relaxed)),
            f32::from_bits(self.right.load(Ordering::Relaxed)),
        )
    }

    fn set_gains(&self, left: f32, right: f32) {
        self.left.store(left.to_bits(), Ordering::Relaxed);
        self.right.store(right.to_bits(), Ordering::Relaxed);
    }

    /// Resume playback, rewinding first when the track already ran out
    fn play(&self) {
        if self.cursor.load(Ordering::Acquire) >= self.frames() {
            self.cursor.store(0, Ordering::Release);
        }
        self.playing.store(true, Ordering::Release);
    }

    fn position(&self) -> Duration {
        self.frames_to_duration(self.cursor.load(Ordering::Acquire))
    }

    fn duration(&self) -> Duration {
        self.frames_to_duration(self.frames())
    }

    fn frames_to_duration(&self, frames: usize) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(frames as f64 / self.sample_rate as f64)
    }

    /// Fill one device buffer, advancing the cursor
    fn render<T>(&self, data: &mut [T])
    where
        T: cpal::Sample + cpal::FromSample<f32>,
    {
        let silence = T::from_sample(0.0f32);
        if !self.playing.load(Ordering::Acquire) {
            data.iter_mut().for_each(|s| *s = silence);
            return;
        }

        let ch = self.channels;
        let total = self.frames();
        let (left, right) = self.gains();
        let mut cursor = self.cursor.load(Ordering::Acquire);

        for frame in data.chunks_mut(ch) {
            if cursor >= total {
                frame.iter_mut().for_each(|s| *s = silence);
                continue;
            }
            let base = cursor * ch;
            for (c, sample) in frame.iter_mut().enumerate() {
                let gain = match c {
                    0 => left,
                    1 => right,
                    _ => (left + right) * 0.5,
                };
                *sample = T::from_sample(self.samples[base + c] * gain);
            }
            cursor += 1;
        }

        self.cursor.store(cursor, Ordering::Release);
        if cursor >= total {
            self.playing.store(false, Ordering::Release);
        }
    }
}

/// Device-independent half of a `CpalPlayer`: the loaded track, the volume
/// to apply to it, and whether the player was released.
struct PlaybackControl {
    shared: Option<Arc<PlaybackShared>>,
    volume: (f32, f32),
    released: bool,
}

impl PlaybackControl {
    fn new() -> Self {
        Self {
            shared: None,
            volume: (1.0, 1.0),
            released: false,
        }
    }

    fn shared(&self) -> Result<&Arc<PlaybackShared>, AudioError> {
        if self.released {
            return Err(AudioError::Released);
        }
        self.shared.as_ref().ok_or(AudioError::NotLoaded)
    }

    fn ensure_live(&self) -> Result<(), AudioError> {
        if self.released {
            return Err(AudioError::Released);
        }
        Ok(())
    }

    /// Build playback state for freshly decoded samples at the current volume
    fn prepare(&self, samples: Vec<f32>, channels: usize, sample_rate: u32) -> Arc<PlaybackShared> {
        Arc::new(PlaybackShared::new(samples, channels, sample_rate, self.volume))
    }

    fn attach(&mut self, shared: Arc<PlaybackShared>) {
        self.shared = Some(shared);
    }

    fn start(&self) -> Result<(), AudioError> {
        self.shared()?.play();
        Ok(())
    }

    fn is_playing(&self) -> bool {
        self.shared()
            .map(|s| s.playing.load(Ordering::Acquire))
            .unwrap_or(false)
    }

    fn position(&self) -> Duration {
        self.shared().map(|s| s.position()).unwrap_or(Duration::ZERO)
    }

    fn duration(&self) -> Duration {
        self.shared().map(|s| s.duration()).unwrap_or(Duration::ZERO)
    }

    fn set_volume(&mut self, left: f32, right: f32) -> Result<(), AudioError> {
        self.ensure_live()?;
        let left = left.clamp(0.0, 1.0);
        let right = right.clamp(0.0, 1.0);
        self.volume = (left, right);
        if let Some(shared) = &self.shared {
            shared.set_gains(left, right);
        }
        Ok(())
    }

    /// Silence and drop the track. Returns false when already released.
    fn release(&mut self) -> bool {
        if self.released {
            return false;
        }
        if let Some(shared) = self.shared.take() {
            shared.playing.store(false, Ordering::Release);
        }
        self.released = true;
        true
    }
}

/// `AudioPlayer` that decodes a whole track with symphonia and plays it on a
/// cpal output stream owned by a dedicated thread.
pub struct CpalPlayer {
    role: SlotRole,
    device: Device,
    config: StreamConfig,
    sample_format: SampleFormat,
    control: PlaybackControl,
    command_sender: Option<Sender<OutputCommand>>,
    output_thread: Option<thread::JoinHandle<()>>,
}

impl CpalPlayer {
    pub fn new(role: SlotRole, device: Device) -> Result<Self, AudioError> {
        let supported = DeviceManager::output_config(&device)?;
        let sample_format = supported.sample_format();
        let config = supported.config();

        Ok(Self {
            role,
            device,
            config,
            sample_format,
            control: PlaybackControl::new(),
            command_sender: None,
            output_thread: None,
        })
    }

    fn spawn_output_thread(
        &mut self,
        shared: Arc<PlaybackShared>,
    ) -> Result<(), AudioError> {
        let (command_sender, command_receiver) = mpsc::channel();
        let (ready_sender, ready_receiver) = mpsc::channel::<Result<(), AudioError>>();

        let device = self.device.clone();
        let config = self.config.clone();
        let sample_format = self.sample_format;
        let thread_name = format!("output-{}", self.role);

        let handle = thread::Builder::new()
            .name(thread_name)
            .spawn(move || {
                let stream = match sample_format {
                    SampleFormat::F32 => create_stream::<f32>(&device, &config, &shared),
                    SampleFormat::I16 => create_stream::<i16>(&device, &config, &shared),
                    SampleFormat::U16 => create_stream::<u16>(&device, &config, &shared),
                    other => Err(AudioError::UnsupportedFormat {
                        format: format!("device sample format {:?}", other),
                    }),
                };

                let stream = match stream {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = ready_sender.send(Err(e));
                        return;
                    }
                };

                if let Err(e) = stream.play() {
                    let _ = ready_sender.send(Err(AudioError::StreamError(format!(
                        "Failed to start output stream: {}",
                        e
                    ))));
                    return;
                }
                let _ = ready_sender.send(Ok(()));

                run_output_loop(command_receiver);
                let _ = stream.pause();
            })
            .map_err(|e| AudioError::InitializationFailed(format!("Failed to create output thread: {}", e)))?;

        match ready_receiver.recv() {
            Ok(Ok(())) => {
                self.command_sender = Some(command_sender);
                self.output_thread = Some(handle);
                Ok(())
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                let _ = handle.join();
                Err(AudioError::InitializationFailed("Output thread exited during setup".to_string()))
            }
        }
    }

    fn shutdown_output_thread(&mut self) {
        if let Some(sender) = self.command_sender.take() {
            let _ = sender.send(OutputCommand::Shutdown);
        }
        if let Some(handle) = self.output_thread.take() {
            if handle.join().is_err() {
                error!("Output thread for {} slot panicked", self.role);
            }
        }
    }
}

fn run_output_loop(command_receiver: Receiver<OutputCommand>) {
    // The stream keeps running until the handle asks for shutdown or is dropped
    while let Ok(command) = command_receiver.recv() {
        match command {
            OutputCommand::Shutdown => break,
        }
    }
}

fn create_stream<T>(
    device: &Device,
    config: &StreamConfig,
    shared: &Arc<PlaybackShared>,
) -> Result<Stream, AudioError>
where
    T: cpal::Sample + cpal::SizedSample + cpal::FromSample<f32> + Send + 'static,
{
    let shared = Arc::clone(shared);
    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| shared.render(data),
            move |err| {
                error!("Audio stream error: {}", err);
            },
            None,
        )
        .map_err(|e| AudioError::StreamError(format!("Failed to build output stream: {}", e)))
}

impl AudioPlayer for CpalPlayer {
    fn load(&mut self, track: &Track) -> Result<(), AudioError> {
        self.control.ensure_live()?;
        self.shutdown_output_thread();

        let decoded = decode_file(&track.as_path())?
            .conform(self.config.channels, self.config.sample_rate.0);
        let shared = self
            .control
            .prepare(decoded.samples, decoded.channels as usize, decoded.sample_rate);

        self.spawn_output_thread(Arc::clone(&shared))?;
        info!(
            "Loaded {} into {} slot ({:.2}s)",
            track,
            self.role,
            shared.duration().as_secs_f64()
        );
        self.control.attach(shared);
        Ok(())
    }

    fn start(&mut self) -> Result<(), AudioError> {
        self.control.start()?;
        debug!("{} slot started", self.role);
        Ok(())
    }

    fn is_playing(&self) -> bool {
        self.control.is_playing()
    }

    fn current_position(&self) -> Duration {
        self.control.position()
    }

    fn total_duration(&self) -> Duration {
        self.control.duration()
    }

    fn set_volume(&mut self, left: f32, right: f32) -> Result<(), AudioError> {
        self.control.set_volume(left, right)
    }

    fn release(&mut self) {
        if !self.control.release() {
            return;
        }
        self.shutdown_output_thread();
        debug!("{} slot released", self.role);
    }
}

impl Drop for CpalPlayer {
    fn drop(&mut self) {
        self.release();
    }
}

/// Creates `CpalPlayer`s on the preferred output device, or the default one
#[derive(Debug, Clone, Default)]
pub struct CpalPlayerFactory {
    preferred_device: Option<String>,
}

impl CpalPlayerFactory {
    pub fn new(preferred_device: Option<String>) -> Self {
        Self { preferred_device }
    }
}

impl PlayerFactory for CpalPlayerFactory {
    type Player = CpalPlayer;

    fn create(&self, role: SlotRole) -> Result<CpalPlayer, AudioError> {
        let device = DeviceManager::new().select_device_with_fallback(self.preferred_device.as_deref())?;
        CpalPlayer::new(role, device)
    }
}
