use std::fs::File;
use std::path::Path;
use std::time::Duration;

use log::{debug, warn};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::audio::resampler::LinearResampler;
use crate::error::AudioError;

/// A fully decoded track held in memory as interleaved f32 PCM
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedTrack {
    pub samples: Vec<f32>,
    pub channels: u16,
    pub sample_rate: u32,
}

impl DecodedTrack {
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.samples.len() / self.channels as usize
        }
    }

    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64(self.frames() as f64 / self.sample_rate as f64)
        }
    }

    /// Convert to the given output layout. Extra channels are dropped, missing
    /// ones are filled by repeating the last source channel (mono -> stereo).
    pub fn conform(self, channels: u16, sample_rate: u32) -> DecodedTrack {
        let remapped = if channels == self.channels || self.channels == 0 {
            self
        } else {
            let ch_in = self.channels as usize;
            let ch_out = channels as usize;
            let mut samples = Vec::with_capacity(self.frames() * ch_out);
            for frame in self.samples.chunks_exact(ch_in) {
                for c in 0..ch_out {
                    samples.push(frame[c.min(ch_in - 1)]);
                }
            }
            DecodedTrack {
                samples,
                channels,
                sample_rate: self.sample_rate,
            }
        };

        if remapped.sample_rate == sample_rate || remapped.sample_rate == 0 {
            return remapped;
        }

        let mut resampler = LinearResampler::new(remapped.sample_rate, sample_rate, remapped.channels as usize);
        let samples = resampler.process_all(&remapped.samples);
        DecodedTrack {
            samples,
            channels: remapped.channels,
            sample_rate,
        }
    }
}

/// Decode a whole file with symphonia
pub fn decode_file(path: &Path) -> Result<DecodedTrack, AudioError> {
    let file = File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => AudioError::SourceNotFound {
            locator: path.display().to_string(),
        },
        _ => AudioError::Decode(format!("Failed to open {}: {}", path.display(), e)),
    })?;

    let media_source = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext_str) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext_str);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, media_source, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| AudioError::UnsupportedFormat {
            format: format!("{} ({})", path.display(), e),
        })?;

    let mut format_reader = probed.format;

    let track = format_reader
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| AudioError::UnsupportedFormat {
            format: "No audio track found".to_string(),
        })?;
    let track_id = track.id;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| AudioError::Decode(format!("Failed to create decoder: {}", e)))?;

    let mut samples = Vec::new();
    let mut channels = track.codec_params.channels.map(|c| c.count() as u16).unwrap_or(0);
    let mut sample_rate = track.codec_params.sample_rate.unwrap_or(0);

    loop {
        let packet = match format_reader.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(ref err)) if err.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(AudioError::Decode(format!("Failed to read packet: {}", e))),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(msg)) => {
                // Corrupt frames are skipped, the rest of the file still plays
                warn!("Skipping undecodable packet in {}: {}", path.display(), msg);
                continue;
            }
            Err(e) => return Err(AudioError::Decode(e.to_string())),
        };

        let spec = *decoded.spec();
        channels = spec.channels.count() as u16;
        sample_rate = spec.rate;

        let mut sample_buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);
        samples.extend_from_slice(sample_buf.samples());
    }

    if samples.is_empty() || channels == 0 || sample_rate == 0 {
        return Err(AudioError::Decode(format!("{} contains no decodable audio", path.display())));
    }

    let decoded = DecodedTrack {
        samples,
        channels,
        sample_rate,
    };
    debug!(
        "Decoded {}: {} frames, {} ch, {} Hz ({:.2}s)",
        path.display(),
        decoded.frames(),
        channels,
        sample_rate,
        decoded.duration().as_secs_f64()
    );

    Ok(decoded)
}
