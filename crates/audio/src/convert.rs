// SPDX-FileCopyrightText: © 2025 RoomScribe Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Raw frame normalization: s16le decoding, channel downmix, and resampling.
//!
//! The resampler is intentionally crude - a first-order exponential pre-filter
//! followed by linear interpolation. Windows are seconds long and the
//! downstream features are energy- and text-based, not spectral, so a proper
//! polyphase filter would buy nothing here.

use roomscribe_core::{AudioFrame, Result, ScribeError};

/// Decode an s16le byte payload into samples. A trailing odd byte is ignored.
pub fn decode_s16le(data: &[u8]) -> Vec<i16> {
    data.chunks_exact(2).map(|pair| i16::from_le_bytes([pair[0], pair[1]])).collect()
}

/// Downmix interleaved samples to mono.
///
/// Only identity (1 -> 1) and stereo downmix (2 -> 1, `round((L+R)/2)`) are
/// supported; anything else is an unsupported layout.
///
/// # Errors
///
/// Returns [`ScribeError::UnsupportedChannelLayout`] for any other channel
/// count.
pub fn downmix_to_mono(samples: &[i16], channels: u16) -> Result<Vec<i16>> {
    match channels {
        1 => Ok(samples.to_vec()),
        2 => Ok(samples
            .chunks_exact(2)
            .map(|pair| {
                let sum = i32::from(pair[0]) + i32::from(pair[1]);
                // Round half away from zero, matching f64::round.
                let half = if sum >= 0 { (sum + 1) / 2 } else { (sum - 1) / 2 };
                clamp_i16(half)
            })
            .collect()),
        other => Err(ScribeError::UnsupportedChannelLayout { from: other, to: 1 }),
    }
}

/// Resample a mono buffer from `from_rate` to `to_rate`.
///
/// Identity rates return the input bit-exact. Otherwise the input is
/// pre-filtered with a first-order exponential smoother
/// (`alpha = min(1, 1.5 * to/from)`) and linearly interpolated onto
/// `round(len * to/from)` output samples, clamped to the s16 range.
pub fn resample(samples: &[i16], from_rate: u32, to_rate: u32) -> Vec<i16> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = f64::from(to_rate) / f64::from(from_rate);
    let alpha = (1.5 * ratio).min(1.0);

    // Pre-filter to knock down energy above the target Nyquist.
    let mut filtered = Vec::with_capacity(samples.len());
    let mut acc = f64::from(samples[0]);
    for &sample in samples {
        acc += alpha * (f64::from(sample) - acc);
        filtered.push(acc);
    }

    #[allow(clippy::cast_precision_loss)]
    let out_len = ((samples.len() as f64) * ratio).round() as usize;
    if out_len == 0 {
        return Vec::new();
    }

    let mut out = Vec::with_capacity(out_len);
    #[allow(clippy::cast_precision_loss)]
    let step = samples.len() as f64 / out_len as f64;
    for i in 0..out_len {
        #[allow(clippy::cast_precision_loss)]
        let pos = i as f64 * step;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let idx = pos.floor() as usize;
        let frac = pos - pos.floor();
        let a = filtered[idx.min(filtered.len() - 1)];
        let b = filtered[(idx + 1).min(filtered.len() - 1)];
        let value = a + (b - a) * frac;
        #[allow(clippy::cast_possible_truncation)]
        out.push(clamp_i16(value.round() as i32));
    }
    out
}

const fn clamp_i16(value: i32) -> i16 {
    if value > i16::MAX as i32 {
        i16::MAX
    } else if value < i16::MIN as i32 {
        i16::MIN
    } else {
        #[allow(clippy::cast_possible_truncation)]
        {
            value as i16
        }
    }
}

/// Stateful frame normalizer for one subscribed track.
///
/// Converts each incoming [`AudioFrame`] into canonical mono s16le at the
/// configured rate, warning once per track on the first rate mismatch and
/// the first channel mismatch.
#[derive(Debug)]
pub struct FrameConverter {
    target_rate: u32,
    warned_rate: bool,
    warned_channels: bool,
}

impl FrameConverter {
    pub const fn new(target_rate: u32) -> Self {
        Self { target_rate, warned_rate: false, warned_channels: false }
    }

    /// Normalize one frame.
    ///
    /// # Errors
    ///
    /// Propagates [`ScribeError::UnsupportedChannelLayout`] from the downmix;
    /// the caller drops the frame.
    pub fn convert(&mut self, frame: &AudioFrame) -> Result<Vec<i16>> {
        if frame.channels != 1 && !self.warned_channels {
            self.warned_channels = true;
            tracing::warn!(
                channels = frame.channels,
                "Downmixing non-mono track to mono"
            );
        }
        let mono = downmix_to_mono(&decode_s16le(&frame.data), frame.channels)?;

        if frame.sample_rate != self.target_rate && !self.warned_rate {
            self.warned_rate = true;
            tracing::warn!(
                frame_rate = frame.sample_rate,
                target_rate = self.target_rate,
                "Resampling track to canonical rate"
            );
        }
        Ok(resample(&mono, frame.sample_rate, self.target_rate))
    }
}
