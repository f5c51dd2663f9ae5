// SPDX-FileCopyrightText: © 2025 RoomScribe Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Speech-to-text adapter.
//!
//! Wraps a completed window as a WAV upload, posts it to the external STT
//! service, and normalizes the verbose-JSON response. Failures surface as
//! [`ScribeError::TranscriptionFailure`]; the caller drops the window and
//! moves on - windows are never retried.

use crate::wav::encode_wav;
use async_trait::async_trait;
use roomscribe_core::{AudioChunk, Result, ScribeError, TrackOptions};
use serde::Deserialize;
use std::time::Duration;

/// One timed span of the STT response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SttSegment {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub confidence: Option<f32>,
    #[serde(default)]
    pub start: Option<f64>,
    #[serde(default)]
    pub end: Option<f64>,
}

/// Normalized STT response for one window.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SttResponse {
    pub text: String,
    #[serde(default)]
    pub segments: Vec<SttSegment>,
}

impl SttResponse {
    /// Highest per-segment confidence, if the service reported any.
    pub fn max_confidence(&self) -> Option<f32> {
        self.segments.iter().filter_map(|s| s.confidence).fold(None, |acc, c| {
            Some(acc.map_or(c, |a: f32| a.max(c)))
        })
    }

    /// Length-weighted average confidence of the segments that cover
    /// `new_text`, the tail of the window the extractor kept.
    ///
    /// Segments are put in temporal order when they carry timing, then
    /// walked from the end until their combined text spans the suffix; the
    /// leading segments cover speech the previous window already emitted and
    /// must not drag the score around. A segment straddling the boundary is
    /// weighted only by the part it contributes. Covered text without a
    /// score defaults to 1.
    pub fn coverage_confidence(&self, new_text: &str) -> f32 {
        let mut needed = new_text.trim().chars().count();
        if needed == 0 {
            return 1.0;
        }

        let mut ordered: Vec<&SttSegment> = self.segments.iter().collect();
        if ordered.iter().all(|s| s.start.is_some()) {
            ordered.sort_by(|a, b| {
                (a.start, a.end).partial_cmp(&(b.start, b.end)).unwrap_or(std::cmp::Ordering::Equal)
            });
        }

        let mut weighted = 0.0f64;
        let mut total = 0.0f64;
        for segment in ordered.iter().rev() {
            if needed == 0 {
                break;
            }
            let seg_len = segment.text.as_deref().map_or(0, |t| t.trim().chars().count());
            if seg_len == 0 {
                continue;
            }
            let covered = seg_len.min(needed);
            needed -= covered;
            if let Some(confidence) = segment.confidence {
                #[allow(clippy::cast_precision_loss)]
                let weight = covered as f64;
                weighted += f64::from(confidence) * weight;
                total += weight;
            }
        }
        if total == 0.0 {
            1.0
        } else {
            #[allow(clippy::cast_possible_truncation)]
            {
                (weighted / total) as f32
            }
        }
    }
}

/// The seam to the external STT service.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe one completed window.
    ///
    /// # Errors
    ///
    /// Returns [`ScribeError::TranscriptionFailure`] on any transport or
    /// service failure.
    async fn transcribe(&self, chunk: &AudioChunk, options: &TrackOptions) -> Result<SttResponse>;
}

/// HTTP transcriber posting multipart WAV uploads.
pub struct HttpTranscriber {
    client: reqwest::Client,
    url: String,
    model: String,
    temperature: f32,
}

impl HttpTranscriber {
    /// Build a transcriber for the given endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`ScribeError::InvalidConfig`] if the HTTP client cannot be
    /// constructed.
    pub fn new(url: &str, model: &str, temperature: f32) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| ScribeError::InvalidConfig(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            url: url.to_string(),
            model: model.to_string(),
            temperature,
        })
    }
}

#[async_trait]
impl Transcriber for HttpTranscriber {
    async fn transcribe(&self, chunk: &AudioChunk, options: &TrackOptions) -> Result<SttResponse> {
        let wav = encode_wav(&chunk.samples, chunk.sample_rate, chunk.channels);

        let file_part = reqwest::multipart::Part::bytes(wav.to_vec())
            .file_name(format!("{}.wav", chunk.id))
            .mime_str("audio/wav")
            .map_err(|e| ScribeError::TranscriptionFailure(format!("invalid mime: {e}")))?;

        let mut form = reqwest::multipart::Form::new()
            .part("file", file_part)
            .text("model", self.model.clone())
            .text("response_format", "verbose_json")
            .text("temperature", self.temperature.to_string());
        if let Some(language) = &options.language {
            form = form.text("language", language.clone());
        }
        if let Some(prompt) = &options.prompt {
            form = form.text("prompt", prompt.clone());
        }

        let response = self
            .client
            .post(&self.url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ScribeError::TranscriptionFailure(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ScribeError::TranscriptionFailure(format!(
                "STT returned {status}: {}",
                body.chars().take(200).collect::<String>()
            )));
        }

        response
            .json::<SttResponse>()
            .await
            .map_err(|e| ScribeError::TranscriptionFailure(format!("malformed response: {e}")))
    }
}
