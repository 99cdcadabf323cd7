/*!
Streaming linear resampler for interleaved f32 audio.

Tracks are decoded at their native rate and converted once, at load time, to
the rate of the output stream they will be played on:

```ignore
use crate::audio::resampler::LinearResampler;

let mut rs = LinearResampler::new(44_100, 48_000, 2);
let output = rs.process_all(&decoded_interleaved_f32);
```

`process()` keeps phase and the last source frame between calls so a track
can also be converted in chunks without clicks at chunk boundaries.
*/

#[derive(Debug, Clone)]
pub struct LinearResampler {
    src_rate: u32,
    dst_rate: u32,
    channels: usize,

    // Source frames advanced per output frame (src/dst)
    step: f64,

    // Position relative to `prev_frame`, which is prepended to the next input
    pos: f64,
    prev_frame: Vec<f32>,
}

impl LinearResampler {
    pub fn new(src_rate: u32, dst_rate: u32, channels: usize) -> Self {
        let step = if dst_rate == 0 { 0.0 } else { src_rate as f64 / dst_rate as f64 };
        Self {
            src_rate,
            dst_rate,
            channels,
            step,
            pos: 0.0,
            prev_frame: Vec::new(),
        }
    }

    /// Reset the streaming state (phase and history).
    pub fn reset(&mut self) {
        self.pos = 0.0;
        self.prev_frame.clear();
    }

    pub fn config(&self) -> (u32, u32, usize) {
        (self.src_rate, self.dst_rate, self.channels)
    }

    /// Resample one chunk of interleaved samples, preserving state across calls.
    pub fn process(&mut self, input: &[f32]) -> Vec<f32> {
        if self.channels == 0 || self.dst_rate == 0 || self.src_rate == 0 {
            return Vec::new();
        }

        let ch = self.channels;
        let in_frames = input.len() / ch;

        // [prev_frame, input_frames...] so interpolation spans chunk boundaries
        let mut work = Vec::with_capacity((in_frames + 1) * ch);
        if self.prev_frame.len() == ch {
            work.extend_from_slice(&self.prev_frame);
        } else if in_frames > 0 {
            work.extend(std::iter::repeat(0.0).take(ch));
        } else {
            return Vec::new();
        }
        work.extend_from_slice(&input[..in_frames * ch]);

        let total_frames = work.len() / ch;

        let expected_out_frames =
            ((in_frames as f64) * (self.dst_rate as f64 / self.src_rate as f64)).ceil() as usize + 4;
        let mut out = Vec::with_capacity(expected_out_frames * ch);

        while self.pos < total_frames as f64 - 1.0 {
            let i = self.pos.floor() as usize;
            let frac = (self.pos - i as f64) as f32;

            let base0 = i * ch;
            let base1 = (i + 1) * ch;

            out.extend((0..ch).map(|c| {
                let s0 = work[base0 + c];
                let s1 = work[base1 + c];
                s0 + (s1 - s0) * frac
            }));

            self.pos += self.step;
        }

        let last_base = (total_frames - 1) * ch;
        self.prev_frame.clear();
        self.prev_frame.extend_from_slice(&work[last_base..last_base + ch]);

        // The last frame becomes index 0 of the next call
        self.pos -= total_frames as f64 - 1.0;

        out
    }

    /// Resample a complete buffer in one go, flushing the held-back tail.
    pub fn process_all(&mut self, input: &[f32]) -> Vec<f32> {
        self.reset();
        let ch = self.channels;
        if ch == 0 || input.len() < ch {
            return Vec::new();
        }

        // Prime with the first frame so the output is not delayed by a silent frame
        self.prev_frame.extend_from_slice(&input[..ch]);
        let mut out = self.process(&input[ch..]);
        if self.prev_frame.len() == self.channels {
            let tail = self.prev_frame.clone();
            out.extend(self.process(&tail));
        }
        self.reset();
        out
    }
}
