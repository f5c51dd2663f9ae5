// SPDX-FileCopyrightText: © 2025 RoomScribe Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Core data types that flow through the transcription pipeline.
//!
//! This module defines the value types shared by the audio and STT crates:
//! - [`AudioFrame`]: a raw PCM block as delivered by the room transport
//! - [`AudioChunk`]: a completed analysis window with an owned sample copy
//! - [`TranscriptSegment`] / [`TranscriptBatch`]: emitted transcript units
//! - [`Envelope`]: the JSON envelopes written to the room's data channel

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Describes the specific format of raw audio data.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleFormat {
    /// 16-bit signed integer, little-endian.
    S16Le,
}

/// A single block of raw PCM audio as delivered by the transport.
///
/// The payload is interpreted as s16le interleaved samples. Frames live for
/// the length of one callback and are never retained past conversion.
#[derive(Debug, Clone)]
pub struct AudioFrame {
    pub sample_rate: u32,
    pub channels: u16,
    pub samples_per_channel: u32,
    /// Interleaved s16le payload (e.g., [L, R, L, R, ...] for stereo).
    pub data: Bytes,
}

/// A completed analysis window.
///
/// The sample vector is an owned copy: the ring it came from mutates
/// immediately after emission, so a chunk must never alias it.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    /// Monotonic per-track id, e.g. `mic-17`.
    pub id: String,
    pub start_ms: u64,
    pub end_ms: u64,
    pub sample_rate: u32,
    pub channels: u16,
    pub format: SampleFormat,
    /// Wall-clock time the first sample of this window was captured.
    pub captured_at_ms: u64,
    /// Wall-clock time the window closed.
    pub completed_at_ms: u64,
    pub samples: Vec<i16>,
}

/// Origin of a transcript segment.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentSource {
    Stt,
    Llm,
}

/// One piece of transcript text with timing.
///
/// Segments emitted by this pipeline always carry `is_final = true`,
/// `revision = 0`, and `source = stt`; the llm variant exists for the
/// correction service, which writes back on the same channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptSegment {
    pub id: String,
    pub text: String,
    pub start_ms: u64,
    pub end_ms: u64,
    pub is_final: bool,
    pub revision: u32,
    pub source: SegmentSource,
    /// Confidence score in [0, 1], if the STT reported one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    pub created_at_ms: u64,
}

/// A delivery envelope carrying one or more segments.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptBatch {
    pub id: String,
    pub segments: Vec<TranscriptSegment>,
    pub received_at_ms: u64,
}

/// Transcript payload discriminated by its producer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TranscriptPayload {
    Stt { batch: TranscriptBatch },
    Llm { batch: TranscriptBatch },
}

/// Severity of a status envelope.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusLevel {
    Info,
    Warn,
    Error,
}

/// A UTF-8 JSON envelope written to the room's data channel.
///
/// Transcript envelopes want reliable delivery; status and metrics are lossy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "lowercase")]
pub enum Envelope {
    Transcript(TranscriptPayload),
    #[serde(rename_all = "camelCase")]
    Status {
        level: StatusLevel,
        message: String,
        timestamp: u64,
    },
    #[serde(rename_all = "camelCase")]
    Metrics {
        chunk_id: String,
        latency_ms: u64,
        confidence: f32,
        wer_proxy: f32,
        timestamp: u64,
    },
}

/// Optional participant metadata attached by the application when joining.
///
/// Unknown fields are ignored; a malformed blob is logged and treated as
/// absent.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParticipantMetadata {
    pub locale: Option<String>,
    pub domain_hint: Option<String>,
    pub terminology: Vec<String>,
}

impl ParticipantMetadata {
    /// Parse a participant's raw metadata blob, tolerating absence and junk.
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw.filter(|s| !s.trim().is_empty()) else {
            return Self::default();
        };
        match serde_json::from_str(raw) {
            Ok(meta) => meta,
            Err(e) => {
                tracing::warn!("Ignoring malformed participant metadata: {}", e);
                Self::default()
            },
        }
    }
}

/// Milliseconds since the Unix epoch, the timestamp base for every envelope.
pub fn now_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map_or(0, |d| {
        u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_transcript_envelope_wire_shape() {
        let batch = TranscriptBatch {
            id: "b1".to_string(),
            segments: vec![TranscriptSegment {
                id: "seg-mic-0".to_string(),
                text: "hello there.".to_string(),
                start_ms: 0,
                end_ms: 3000,
                is_final: true,
                revision: 0,
                source: SegmentSource::Stt,
                confidence: Some(0.9),
                created_at_ms: 1234,
            }],
            received_at_ms: 1234,
        };
        let envelope = Envelope::Transcript(TranscriptPayload::Stt { batch });
        let json: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&envelope).unwrap()).unwrap();

        assert_eq!(json["type"], "transcript");
        assert_eq!(json["payload"]["type"], "stt");
        let seg = &json["payload"]["batch"]["segments"][0];
        assert_eq!(seg["startMs"], 0);
        assert_eq!(seg["endMs"], 3000);
        assert_eq!(seg["isFinal"], true);
        assert_eq!(seg["source"], "stt");
    }

    #[test]
    fn test_status_envelope_wire_shape() {
        let envelope = Envelope::Status {
            level: StatusLevel::Warn,
            message: "sample rate mismatch".to_string(),
            timestamp: 99,
        };
        let json: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&envelope).unwrap()).unwrap();
        assert_eq!(json["type"], "status");
        assert_eq!(json["payload"]["level"], "warn");
        assert_eq!(json["payload"]["timestamp"], 99);
    }

    #[test]
    fn test_participant_metadata_tolerates_junk() {
        let meta = ParticipantMetadata::parse(Some("not json"));
        assert!(meta.locale.is_none());
        assert!(meta.terminology.is_empty());

        let meta = ParticipantMetadata::parse(Some(
            r#"{"locale":"pt-BR","domainHint":"radiology","terminology":["nodule"],"extra":1}"#,
        ));
        assert_eq!(meta.locale.as_deref(), Some("pt-BR"));
        assert_eq!(meta.domain_hint.as_deref(), Some("radiology"));
        assert_eq!(meta.terminology, vec!["nodule".to_string()]);

        assert!(ParticipantMetadata::parse(None).locale.is_none());
        assert!(ParticipantMetadata::parse(Some("  ")).locale.is_none());
    }
}
