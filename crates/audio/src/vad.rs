// SPDX-FileCopyrightText: © 2025 RoomScribe Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Voice-activity gate for completed windows.
//!
//! Combines RMS energy against an adaptive noise floor with a rolling
//! zero-crossing-rate average. The gate runs on whole windows, not incoming
//! buffers, so its state advances once per window.

use crate::agc::rms;
use std::collections::VecDeque;

/// Outcome of assessing one window.
#[derive(Debug, Clone, Copy)]
pub struct VadDecision {
    pub is_speech: bool,
    pub score: f32,
    pub rms: f32,
    pub threshold: f32,
}

/// Zero-crossing rate of a sample block: sign changes divided by length.
pub fn zero_crossing_rate(samples: &[i16]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let crossings = samples.windows(2).filter(|pair| (pair[0] >= 0) != (pair[1] >= 0)).count();
    #[allow(clippy::cast_precision_loss)]
    {
        crossings as f32 / samples.len() as f32
    }
}

/// Energy + ZCR speech gate with an adaptive noise floor.
#[derive(Debug)]
pub struct VadGate {
    static_threshold: f32,
    sensitivity: f32,
    noise_floor: f32,
    zcr_window: VecDeque<f32>,
    zcr_capacity: usize,
}

impl VadGate {
    /// `zcr_capacity` is the rolling-window length in windows, already
    /// derived from the configured VAD and analysis window durations.
    pub fn new(static_rms_threshold: f32, sensitivity: f32, zcr_capacity: usize) -> Self {
        Self {
            static_threshold: static_rms_threshold,
            sensitivity,
            noise_floor: 0.0,
            zcr_window: VecDeque::with_capacity(zcr_capacity.max(1)),
            zcr_capacity: zcr_capacity.max(1),
        }
    }

    /// Assess one completed window and advance the adaptive state.
    pub fn assess(&mut self, samples: &[i16]) -> VadDecision {
        let r = rms(samples);
        self.noise_floor = 0.95 * self.noise_floor + 0.05 * r;
        let threshold = self.static_threshold.max(1.6 * self.noise_floor);

        let zcr = zero_crossing_rate(samples);
        if self.zcr_window.len() == self.zcr_capacity {
            self.zcr_window.pop_front();
        }
        self.zcr_window.push_back(zcr);
        #[allow(clippy::cast_precision_loss)]
        let zcr_mean = self.zcr_window.iter().sum::<f32>() / self.zcr_window.len() as f32;

        let score = 0.7 * (r / threshold) + 0.3 * zcr_mean;
        VadDecision { is_speech: score >= self.sensitivity, score, rms: r, threshold }
    }
}

/// Rolling ZCR window length for the gate.
///
/// The `* 4` factor is inherited tuning: it stretches the ZCR memory past
/// the raw duration ratio so brief fricatives keep the average up.
pub fn zcr_window_len(vad_window_ms: u64, window_ms: u64) -> usize {
    if window_ms == 0 {
        return 1;
    }
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let len = (vad_window_ms as f64 / window_ms as f64 * 4.0).round() as usize;
    len.max(1)
}
