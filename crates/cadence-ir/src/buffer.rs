//! Immutable multichannel sample buffers.
//!
//! Samples are stored planar (`data[ch * length + frame]`) behind an `Arc`,
//! so clones are cheap and every transformation returns a new buffer.

use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::FftPlanner;
use thiserror::Error;

/// Sample rate used when a caller has no better value.
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

/// Largest prefix of a channel turned into a periodic wave table.
pub const MAX_PERIODIC_WAVE_SIZE: usize = 4096;

/// Errors raised while constructing a buffer.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BufferError {
    #[error("failed to load {location}: {reason}")]
    Load { location: String, reason: String },
    #[error("sample rate must be greater than zero")]
    ZeroSampleRate,
    #[error("buffer needs at least one channel")]
    NoChannels,
    #[error("channel {channel} has {found} samples, expected {expected}")]
    RaggedChannels {
        channel: usize,
        found: usize,
        expected: usize,
    },
}

pub type Result<T> = std::result::Result<T, BufferError>;

/// Decoded audio as handed over by an asset loader.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DecodedAudio {
    pub sample_rate: u32,
    pub channels: Vec<Vec<f32>>,
}

/// External fetch-and-decode collaborator.
pub trait AssetLoader {
    fn load(
        &self,
        location: &str,
    ) -> std::result::Result<DecodedAudio, Box<dyn std::error::Error + Send + Sync>>;
}

/// Fourier coefficients of one channel, ready for a wave-table oscillator.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PeriodicWave {
    pub real: Vec<f32>,
    pub imag: Vec<f32>,
}

/// A multichannel sample buffer.
#[derive(Clone, Debug, PartialEq)]
pub struct Buffer {
    sample_rate: u32,
    channels: usize,
    length: usize,
    data: Arc<[f32]>,
}

impl Buffer {
    /// Create a silent buffer.
    pub fn new(channels: usize, length: usize, sample_rate: u32) -> Result<Self> {
        if sample_rate == 0 {
            return Err(BufferError::ZeroSampleRate);
        }
        if channels == 0 {
            return Err(BufferError::NoChannels);
        }
        Ok(Self::from_planar(
            sample_rate,
            channels,
            length,
            vec![0.0; channels * length],
        ))
    }

    /// Build a buffer from per-channel sample data.
    ///
    /// The length is that of the longest channel; shorter channels are
    /// padded with silence.
    pub fn from_channels(sample_rate: u32, channels: &[Vec<f32>]) -> Result<Self> {
        if sample_rate == 0 {
            return Err(BufferError::ZeroSampleRate);
        }
        if channels.is_empty() {
            return Err(BufferError::NoChannels);
        }
        let length = channels.iter().map(Vec::len).max().unwrap_or(0);
        let mut data = vec![0.0; channels.len() * length];
        for (ch, samples) in channels.iter().enumerate() {
            data[ch * length..ch * length + samples.len()].copy_from_slice(samples);
        }
        Ok(Self::from_planar(sample_rate, channels.len(), length, data))
    }

    /// Fetch and decode an asset through `loader`.
    ///
    /// The decoded data is validated before any buffer exists, so a failed
    /// load never yields a partially built buffer.
    pub fn load(loader: &dyn AssetLoader, location: &str) -> Result<Self> {
        let decoded = loader.load(location).map_err(|e| BufferError::Load {
            location: location.to_string(),
            reason: e.to_string(),
        })?;
        if decoded.sample_rate == 0 {
            return Err(BufferError::ZeroSampleRate);
        }
        let Some(first) = decoded.channels.first() else {
            return Err(BufferError::NoChannels);
        };
        let expected = first.len();
        if let Some((channel, samples)) = decoded
            .channels
            .iter()
            .enumerate()
            .find(|(_, c)| c.len() != expected)
        {
            return Err(BufferError::RaggedChannels {
                channel,
                found: samples.len(),
                expected,
            });
        }
        log::debug!(
            "loaded {location}: {} ch, {expected} frames @ {} Hz",
            decoded.channels.len(),
            decoded.sample_rate
        );
        Self::from_channels(decoded.sample_rate, &decoded.channels)
    }

    fn from_planar(sample_rate: u32, channels: usize, length: usize, data: Vec<f32>) -> Self {
        debug_assert_eq!(data.len(), channels * length);
        Self {
            sample_rate,
            channels,
            length,
            data: data.into(),
        }
    }

    /// Build a buffer of the same shape by mapping each channel.
    fn map_channels(&self, length: usize, f: impl Fn(&[f32], &mut [f32])) -> Self {
        let mut data = vec![0.0; self.channels * length];
        for ch in 0..self.channels {
            f(
                self.channel(ch),
                &mut data[ch * length..(ch + 1) * length],
            );
        }
        Self::from_planar(self.sample_rate, self.channels, length, data)
    }

    /// Frames per second.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of channels.
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Number of frames per channel.
    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Duration in seconds.
    pub fn duration(&self) -> f64 {
        self.length as f64 / self.sample_rate as f64
    }

    /// One channel's samples. Out-of-range indices clamp to the last channel.
    pub fn channel(&self, ch: usize) -> &[f32] {
        let ch = ch.min(self.channels - 1);
        &self.data[ch * self.length..(ch + 1) * self.length]
    }

    /// Append every buffer with a matching channel count.
    ///
    /// Buffers with a different channel count are dropped.
    pub fn concat(&self, others: &[&Buffer]) -> Buffer {
        let parts: Vec<&Buffer> = std::iter::once(self)
            .chain(others.iter().copied().filter(|b| {
                let keep = b.channels == self.channels;
                if !keep {
                    log::warn!(
                        "concat: dropping {}-channel buffer, expected {}",
                        b.channels,
                        self.channels
                    );
                }
                keep
            }))
            .collect();
        let length = parts.iter().map(|b| b.length).sum();
        let mut data = Vec::with_capacity(self.channels * length);
        for ch in 0..self.channels {
            for part in &parts {
                data.extend_from_slice(part.channel(ch));
            }
        }
        Self::from_planar(self.sample_rate, self.channels, length, data)
    }

    /// Reverse every channel.
    pub fn reverse(&self) -> Buffer {
        self.map_channels(self.length, |src, out| {
            out.copy_from_slice(src);
            out.reverse();
        })
    }

    /// Copy the frames in `[start, end)`.
    ///
    /// Negative bounds count from the end and both bounds clamp into
    /// `[0, len]`. An empty range yields a single silent frame.
    pub fn slice(&self, start: i64, end: Option<i64>) -> Buffer {
        let start = self.resolve_index(start);
        let end = end.map_or(self.length, |e| self.resolve_index(e));
        if end <= start {
            return self.map_channels(1, |_, _| {});
        }
        self.map_channels(end - start, |src, out| {
            out.copy_from_slice(&src[start..end]);
        })
    }

    fn resolve_index(&self, index: i64) -> usize {
        let len = self.length as i64;
        let index = if index < 0 { index + len } else { index };
        index.clamp(0, len) as usize
    }

    /// Split into `n` contiguous slices of near-equal length.
    ///
    /// Boundaries are `round(i * len / n)`, so the slice lengths add up to
    /// the original length. `n == 0` yields no slices.
    pub fn split(&self, n: usize) -> Vec<Buffer> {
        let len = self.length as f64;
        let bound = |i: usize| (i as f64 * len / n as f64).round() as i64;
        (0..n)
            .map(|i| {
                let (start, end) = (bound(i), bound(i + 1));
                if end > start {
                    self.slice(start, Some(end))
                } else {
                    self.map_channels(0, |_, _| {})
                }
            })
            .collect()
    }

    /// Scale each channel so its peak absolute sample is 1.
    ///
    /// Silent channels are left as they are.
    pub fn normalize(&self) -> Buffer {
        self.map_channels(self.length, |src, out| {
            let peak = src.iter().fold(0.0f32, |m, s| m.max(s.abs()));
            if peak == 0.0 {
                out.copy_from_slice(src);
            } else {
                for (o, s) in out.iter_mut().zip(src) {
                    *o = s / peak;
                }
            }
        })
    }

    /// Resample every channel to `size` frames.
    ///
    /// Equal size is a plain copy. Otherwise source position
    /// `i * (len - 1) / (size - 1)` is either rounded to the nearest frame
    /// or linearly interpolated.
    pub fn resample(&self, size: usize, interpolate: bool) -> Buffer {
        if size == self.length {
            return self.clone();
        }
        self.map_channels(size, |src, out| resample_into(src, out, interpolate))
    }

    /// Forward FFT of the first [`MAX_PERIODIC_WAVE_SIZE`] frames of `ch`.
    pub fn to_periodic_wave(&self, ch: usize) -> PeriodicWave {
        let src = self.channel(ch);
        let src = &src[..src.len().min(MAX_PERIODIC_WAVE_SIZE)];
        if src.is_empty() {
            return PeriodicWave::default();
        }
        let mut bins: Vec<Complex<f32>> = src.iter().map(|&s| Complex::new(s, 0.0)).collect();
        let fft = FftPlanner::new().plan_fft_forward(bins.len());
        fft.process(&mut bins);
        PeriodicWave {
            real: bins.iter().map(|c| c.re).collect(),
            imag: bins.iter().map(|c| c.im).collect(),
        }
    }
}

fn resample_into(src: &[f32], out: &mut [f32], interpolate: bool) {
    if src.is_empty() {
        out.fill(0.0);
        return;
    }
    let last = src.len() - 1;
    let factor = if out.len() > 1 {
        last as f64 / (out.len() - 1) as f64
    } else {
        0.0
    };
    for (i, o) in out.iter_mut().enumerate() {
        let x = i as f64 * factor;
        *o = if interpolate {
            let x0 = (x as usize).min(last);
            let x1 = (x0 + 1).min(last);
            let frac = (x - x0 as f64) as f32;
            src[x0] + frac * (src[x1] - src[x0])
        } else {
            src[(x.round() as usize).min(last)]
        };
    }
}
