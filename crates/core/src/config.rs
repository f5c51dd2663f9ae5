// SPDX-FileCopyrightText: © 2025 RoomScribe Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Process-global configuration and per-track option layering.
//!
//! All tunables are read once at startup into an immutable [`AgentConfig`];
//! per-participant values are layered on top when a track is subscribed,
//! producing the [`TrackOptions`] the pipeline carries.

use crate::error::{Result, ScribeError};
use crate::language::normalize_language;
use crate::types::ParticipantMetadata;
use serde::Deserialize;

/// Process-global configuration, deserialized once at startup.
///
/// Every field has the documented default, so a partial JSON object (or an
/// empty one) is a valid config.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentConfig {
    /// Canonical mono sample rate the pipeline normalizes to.
    pub sample_rate: u32,
    /// Canonical channel count; only mono is supported downstream.
    pub channels: u16,
    /// Analysis window length handed to the STT.
    pub window_ms: u64,
    /// Advance between consecutive windows. Overlap = window - stride.
    pub stride_ms: u64,

    /// STT endpoint accepting multipart WAV uploads.
    pub stt_url: String,
    pub stt_model: String,
    pub stt_temperature: f32,
    /// Static language hint; participants may override via their locale.
    pub stt_language: Option<String>,

    pub agc_target_rms: f32,
    pub agc_min: f32,
    pub agc_max: f32,
    pub agc_smoothing: f32,

    pub vad_window_ms: u64,
    pub vad_sensitivity: f32,
    pub silence_rms_threshold: f32,

    /// Minimum blended confidence before buffered sentences are released.
    pub confidence_threshold: f32,

    /// Correction service endpoint; correction is skipped when unset.
    pub correction_url: Option<String>,
    /// Data-channel topic the envelopes are published on.
    pub data_topic: String,

    pub default_domain_hint: Option<String>,
    pub default_terminology: Vec<String>,
    pub default_prompt: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            channels: 1,
            window_ms: 3_000,
            stride_ms: 1_000,
            stt_url: "http://127.0.0.1:8000/v1/audio/transcriptions".to_string(),
            stt_model: "whisper-1".to_string(),
            stt_temperature: 0.0,
            stt_language: None,
            agc_target_rms: 1_500.0,
            agc_min: 0.5,
            agc_max: 3.0,
            agc_smoothing: 0.2,
            vad_window_ms: 600,
            vad_sensitivity: 0.5,
            silence_rms_threshold: 600.0,
            confidence_threshold: 0.45,
            correction_url: None,
            data_topic: "transcription".to_string(),
            default_domain_hint: None,
            default_terminology: Vec::new(),
            default_prompt: None,
        }
    }
}

impl AgentConfig {
    /// Samples in one full analysis window at the canonical rate.
    pub const fn window_samples(&self) -> usize {
        (self.sample_rate as usize).saturating_mul(self.window_ms as usize) / 1000
    }

    /// Samples the ring advances by per emitted window.
    pub const fn stride_samples(&self) -> usize {
        (self.sample_rate as usize).saturating_mul(self.stride_ms as usize) / 1000
    }

    /// Validate the configuration. Fatal at startup.
    ///
    /// # Errors
    ///
    /// Returns [`ScribeError::InvalidConfig`] naming the offending field.
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(ScribeError::InvalidConfig("sampleRate must be non-zero".to_string()));
        }
        if self.channels != 1 {
            return Err(ScribeError::InvalidConfig(format!(
                "channels must be 1 (mono), got {}",
                self.channels
            )));
        }
        if self.window_samples() == 0 {
            return Err(ScribeError::InvalidConfig(format!(
                "windowMs {} at {} Hz yields an empty ring",
                self.window_ms, self.sample_rate
            )));
        }
        if self.stride_samples() == 0 {
            return Err(ScribeError::InvalidConfig(format!(
                "strideMs {} at {} Hz yields a zero stride",
                self.stride_ms, self.sample_rate
            )));
        }
        if !(self.agc_min.is_finite() && self.agc_max.is_finite()) || self.agc_min <= 0.0 {
            return Err(ScribeError::InvalidConfig("agc gain bounds must be finite and positive".to_string()));
        }
        if self.agc_min > self.agc_max {
            return Err(ScribeError::InvalidConfig(format!(
                "agcMin {} exceeds agcMax {}",
                self.agc_min, self.agc_max
            )));
        }
        if !(0.0..=1.0).contains(&self.agc_smoothing) {
            return Err(ScribeError::InvalidConfig(format!(
                "agcSmoothing must be in [0, 1], got {}",
                self.agc_smoothing
            )));
        }
        if !(0.0..=1.0).contains(&self.vad_sensitivity) {
            return Err(ScribeError::InvalidConfig(format!(
                "vadSensitivity must be in [0, 1], got {}",
                self.vad_sensitivity
            )));
        }
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(ScribeError::InvalidConfig(format!(
                "confidenceThreshold must be in [0, 1], got {}",
                self.confidence_threshold
            )));
        }
        if self.stt_url.is_empty() {
            return Err(ScribeError::InvalidConfig("sttUrl must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Per-participant options, layered over the process-global defaults when a
/// track is subscribed.
#[derive(Debug, Clone, Default)]
pub struct TrackOptions {
    /// Normalized language code, only ever a member of the supported set.
    pub language: Option<String>,
    pub domain_hint: Option<String>,
    pub terminology: Vec<String>,
    pub prompt: Option<String>,
}

impl TrackOptions {
    /// Merge participant metadata over the config defaults.
    ///
    /// The participant's locale wins over the static language hint; both are
    /// normalized and dropped if outside the supported set. Terminology lists
    /// are concatenated, defaults first, without duplicates.
    pub fn layer(config: &AgentConfig, metadata: &ParticipantMetadata) -> Self {
        let language = metadata
            .locale
            .as_deref()
            .and_then(normalize_language)
            .or_else(|| config.stt_language.as_deref().and_then(normalize_language));

        let mut terminology = config.default_terminology.clone();
        for term in &metadata.terminology {
            if !terminology.iter().any(|t| t == term) {
                terminology.push(term.clone());
            }
        }

        Self {
            language,
            domain_hint: metadata.domain_hint.clone().or_else(|| config.default_domain_hint.clone()),
            terminology,
            prompt: config.default_prompt.clone(),
        }
    }
}
