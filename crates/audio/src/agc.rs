// SPDX-FileCopyrightText: © 2025 RoomScribe Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Automatic gain control: a slow loop that scales samples toward a target
//! RMS. Both the measured RMS and the applied gain are exponentially
//! smoothed with the same coefficient, so the loop never chases silence.

/// Root-mean-square energy of a sample block.
pub fn rms(samples: &[i16]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f64 = samples.iter().map(|&s| f64::from(s) * f64::from(s)).sum();
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    {
        (sum / samples.len() as f64).sqrt() as f32
    }
}

/// Smoothed automatic gain control state for one track.
#[derive(Debug)]
pub struct Agc {
    target_rms: f32,
    min_gain: f32,
    max_gain: f32,
    smoothing: f32,
    smoothed_rms: f32,
    gain: f32,
}

impl Agc {
    pub const fn new(target_rms: f32, min_gain: f32, max_gain: f32, smoothing: f32) -> Self {
        Self { target_rms, min_gain, max_gain, smoothing, smoothed_rms: 0.0, gain: 1.0 }
    }

    /// Current smoothed gain, for logging and tests.
    pub const fn gain(&self) -> f32 {
        self.gain
    }

    /// Update the loop with one mono buffer and scale it in place.
    ///
    /// Within the unity dead-zone (`|g - 1| < 0.05`) samples pass through
    /// unmodified. The `max(rms, 1)` floor keeps the desired gain finite on
    /// near-silent buffers; the clamp keeps it from running away.
    pub fn process(&mut self, samples: &mut [i16]) {
        if samples.is_empty() {
            return;
        }

        let r = rms(samples);
        self.smoothed_rms = (1.0 - self.smoothing) * self.smoothed_rms + self.smoothing * r;

        let desired =
            (self.target_rms / self.smoothed_rms.max(1.0)).clamp(self.min_gain, self.max_gain);
        self.gain = (1.0 - self.smoothing) * self.gain + self.smoothing * desired;

        if (self.gain - 1.0).abs() < 0.05 {
            return;
        }

        for sample in samples.iter_mut() {
            let scaled = f32::from(*sample) * self.gain;
            #[allow(clippy::cast_possible_truncation)]
            {
                *sample = scaled.round().clamp(f32::from(i16::MIN), f32::from(i16::MAX)) as i16;
            }
        }
    }
}
