// SPDX-FileCopyrightText: © 2025 RoomScribe Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! RoomScribe Core - Shared data model for the live transcription pipeline.
//!
//! This crate defines the value types, errors, and configuration shared by
//! the audio windowing library and the STT worker:
//!
//! - [`types`]: frames, chunks, segments, batches, and data-channel envelopes
//! - [`error`]: error categories and the crate-wide `Result` alias
//! - [`config`]: process-global tunables and per-track option layering
//! - [`language`]: the supported STT language table and locale normalization

pub mod config;
pub mod error;
pub mod language;
pub mod types;

// Convenience re-exports for the types used in nearly every module.
pub use config::{AgentConfig, TrackOptions};
pub use error::{Result, ScribeError};
pub use language::normalize_language;
pub use types::{
    now_ms, AudioChunk, AudioFrame, Envelope, ParticipantMetadata, SampleFormat, SegmentSource,
    StatusLevel, TranscriptBatch, TranscriptPayload, TranscriptSegment,
};
