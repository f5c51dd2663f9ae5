// SPDX-FileCopyrightText: © 2025 RoomScribe Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! RoomScribe STT worker.
//!
//! Takes the windowed audio produced by `roomscribe-audio`, transcribes it
//! through an external STT service, and turns overlapping re-transcriptions
//! into a clean, non-repeating, sentence-aligned transcript stream on the
//! room's data channel:
//!
//! - [`wav`]: canonical WAV assembly for uploads
//! - [`transcribe`]: the [`Transcriber`] seam and its HTTP implementation
//! - [`extract`]: overlap-aware incremental text extraction
//! - [`sentence`]: sentence-boundary buffering with blended confidence
//! - [`cleanup`]: stutter and punctuation cleanup on released text
//! - [`metrics`]: the WER-proxy stream-quality metric
//! - [`session`]: single-owner session state and the emitter actor
//! - [`correction`]: forwarding emitted batches to the correction model
//! - [`channel`]: the [`DataChannel`] seam to the room transport
//! - [`pipeline`]: the per-track frame-to-transcript driver
//! - [`agent`]: track subscribe/unsubscribe lifecycle

pub mod agent;
pub mod channel;
pub mod cleanup;
pub mod correction;
pub mod extract;
pub mod metrics;
pub mod pipeline;
pub mod sentence;
pub mod session;
pub mod transcribe;
pub mod wav;

pub use agent::ScribeAgent;
pub use channel::DataChannel;
pub use correction::{CorrectionClient, CorrectionRequest};
pub use pipeline::TrackPipeline;
pub use session::{Session, SessionActor, SessionMessage};
pub use transcribe::{HttpTranscriber, SttResponse, SttSegment, Transcriber};
pub use wav::encode_wav;
