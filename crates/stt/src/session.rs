// SPDX-FileCopyrightText: © 2025 RoomScribe Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Session state and the emitter actor.
//!
//! Everything that used to be process-global - the emitted history, the
//! sentence buffer, the recent-segment ring, the counters - lives in a
//! [`Session`] owned by a single actor task. Pipelines send it messages over
//! a mailbox and never touch the state directly, so emissions are totally
//! ordered across tracks without a lock in sight.

use crate::channel::DataChannel;
use crate::cleanup::cleanup_text;
use crate::correction::CorrectionClient;
use crate::extract::{extract_new_text, normalize};
use crate::metrics::wer_proxy;
use crate::sentence::SentenceBuffer;
use crate::transcribe::SttResponse;
use roomscribe_core::{
    now_ms, AudioChunk, Envelope, SegmentSource, StatusLevel, TrackOptions, TranscriptBatch,
    TranscriptPayload, TranscriptSegment,
};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Characters of emitted history kept for overlap suppression.
const HISTORY_TAIL_CHARS: usize = 1000;
/// Emitted segments retained as correction context.
const RECENT_SEGMENTS_CAP: usize = 40;
/// Recent segments forwarded with each correction request.
const CORRECTION_CONTEXT_LEN: usize = 10;

/// Mail sent to the session actor by track pipelines.
#[derive(Debug)]
pub enum SessionMessage {
    /// A window was transcribed; run it through the incremental pipeline.
    WindowTranscribed {
        chunk: AudioChunk,
        response: SttResponse,
        options: TrackOptions,
    },
    /// The VAD gate discarded a window without transcribing it.
    WindowSkipped { chunk_id: String, score: f32 },
    /// Transcription failed; the window was dropped.
    WindowFailed { chunk_id: String, message: String },
    /// All tracks are gone; drop every piece of session state.
    Reset,
}

/// One released segment plus the numbers the emitter needs around it.
#[derive(Debug)]
pub struct Emission {
    pub segment: TranscriptSegment,
    /// Blended sentence-buffer confidence at release time.
    pub confidence: f32,
    /// Raw STT text of the window, for the WER proxy.
    pub raw_text: String,
}

/// Per-session transcript state. Pure logic, no I/O.
#[derive(Debug)]
pub struct Session {
    confidence_threshold: f32,
    emitted_history: String,
    sentence_buffer: SentenceBuffer,
    recent_segments: VecDeque<TranscriptSegment>,
    chunks_processed: u64,
    chunks_skipped: u64,
}

impl Session {
    pub fn new(confidence_threshold: f32) -> Self {
        Self {
            confidence_threshold,
            emitted_history: String::new(),
            sentence_buffer: SentenceBuffer::new(),
            recent_segments: VecDeque::with_capacity(RECENT_SEGMENTS_CAP),
            chunks_processed: 0,
            chunks_skipped: 0,
        }
    }

    pub fn emitted_history(&self) -> &str {
        &self.emitted_history
    }

    pub fn recent_segments(&self) -> &VecDeque<TranscriptSegment> {
        &self.recent_segments
    }

    pub const fn chunks_processed(&self) -> u64 {
        self.chunks_processed
    }

    pub const fn chunks_skipped(&self) -> u64 {
        self.chunks_skipped
    }

    pub const fn note_skipped(&mut self) {
        self.chunks_skipped += 1;
    }

    /// Run one transcribed window through extract -> buffer -> cleanup.
    ///
    /// Returns an [`Emission`] only when the sentence buffer released text
    /// that survived cleanup; otherwise all state mutations (buffer growth,
    /// counters) have still happened.
    pub fn ingest(&mut self, chunk: &AudioChunk, response: &SttResponse) -> Option<Emission> {
        self.chunks_processed += 1;

        let raw = response.text.trim();
        if raw.is_empty() {
            return None;
        }

        let prior = format!("{} {}", self.emitted_history, self.sentence_buffer.text());
        let fresh = extract_new_text(&prior, raw);
        if fresh.is_empty() {
            return None;
        }

        self.sentence_buffer.push(&fresh, response.coverage_confidence(&fresh));
        let blended = self.sentence_buffer.confidence();
        let complete = self.sentence_buffer.try_release(self.confidence_threshold)?;

        let cleaned = cleanup_text(&complete, blended);
        if cleaned.is_empty() {
            return None;
        }

        self.push_history(&cleaned);

        let segment = TranscriptSegment {
            id: format!("seg-{}", chunk.id),
            text: cleaned,
            start_ms: chunk.start_ms,
            end_ms: chunk.end_ms,
            is_final: true,
            revision: 0,
            source: SegmentSource::Stt,
            confidence: response.max_confidence(),
            created_at_ms: now_ms(),
        };
        if self.recent_segments.len() == RECENT_SEGMENTS_CAP {
            self.recent_segments.pop_front();
        }
        self.recent_segments.push_back(segment.clone());

        Some(Emission { segment, confidence: blended, raw_text: raw.to_string() })
    }

    /// History is stored normalized so extractor comparisons stay cheap,
    /// and truncated to a bounded tail.
    fn push_history(&mut self, text: &str) {
        if !self.emitted_history.is_empty() {
            self.emitted_history.push(' ');
        }
        self.emitted_history.push_str(&normalize(text));

        let excess = self.emitted_history.chars().count().saturating_sub(HISTORY_TAIL_CHARS);
        if excess > 0 {
            self.emitted_history = self.emitted_history.chars().skip(excess).collect();
        }
    }

    /// Clear everything; invoked when the last track disconnects.
    pub fn reset(&mut self) {
        self.emitted_history.clear();
        self.sentence_buffer.clear();
        self.recent_segments.clear();
        self.chunks_processed = 0;
        self.chunks_skipped = 0;
    }
}

/// The single-owner emitter task.
pub struct SessionActor {
    rx: mpsc::Receiver<SessionMessage>,
    session: Session,
    channel: Arc<dyn DataChannel>,
    correction: Option<CorrectionClient>,
}

impl SessionActor {
    /// Create the actor and its mailbox sender.
    pub fn new(
        confidence_threshold: f32,
        channel: Arc<dyn DataChannel>,
        correction: Option<CorrectionClient>,
    ) -> (mpsc::Sender<SessionMessage>, Self) {
        let (tx, rx) = mpsc::channel(64);
        (tx, Self { rx, session: Session::new(confidence_threshold), channel, correction })
    }

    /// Drive the mailbox until every sender is gone.
    pub async fn run(mut self) {
        tracing::info!("Session actor started");
        while let Some(message) = self.rx.recv().await {
            match message {
                SessionMessage::WindowTranscribed { chunk, response, options } => {
                    self.handle_window(&chunk, &response, &options).await;
                },
                SessionMessage::WindowSkipped { chunk_id, score } => {
                    self.session.note_skipped();
                    self.publish_status(
                        StatusLevel::Info,
                        format!("window {chunk_id} skipped: no speech (score {score:.2})"),
                    )
                    .await;
                },
                SessionMessage::WindowFailed { chunk_id, message } => {
                    self.publish_status(
                        StatusLevel::Error,
                        format!("window {chunk_id} dropped: {message}"),
                    )
                    .await;
                },
                SessionMessage::Reset => {
                    tracing::info!(
                        processed = self.session.chunks_processed(),
                        skipped = self.session.chunks_skipped(),
                        "Resetting session state"
                    );
                    self.session.reset();
                },
            }
        }
        tracing::info!("Session actor shutting down");
    }

    async fn handle_window(
        &mut self,
        chunk: &AudioChunk,
        response: &SttResponse,
        options: &TrackOptions,
    ) {
        let Some(emission) = self.session.ingest(chunk, response) else {
            return;
        };

        let batch = TranscriptBatch {
            id: uuid::Uuid::new_v4().to_string(),
            segments: vec![emission.segment.clone()],
            received_at_ms: now_ms(),
        };

        let envelope = Envelope::Transcript(TranscriptPayload::Stt { batch: batch.clone() });
        if let Err(e) = self.channel.publish(&envelope, true).await {
            tracing::warn!("Transcript broadcast failed: {}", e);
        }

        let metrics = Envelope::Metrics {
            chunk_id: chunk.id.clone(),
            latency_ms: now_ms().saturating_sub(chunk.completed_at_ms),
            confidence: emission.confidence,
            wer_proxy: wer_proxy(&emission.raw_text, &emission.segment.text),
            timestamp: now_ms(),
        };
        if let Err(e) = self.channel.publish(&metrics, false).await {
            tracing::debug!("Metrics broadcast failed: {}", e);
        }

        if let Some(correction) = &self.correction {
            let context: Vec<TranscriptSegment> = {
                let recent = self.session.recent_segments();
                let skip = recent.len().saturating_sub(CORRECTION_CONTEXT_LEN);
                recent.iter().skip(skip).cloned().collect()
            };
            if let Err(e) = correction.correct(&batch, &context, options).await {
                tracing::warn!("Correction forwarding failed: {}", e);
                self.publish_status(StatusLevel::Error, format!("correction failed: {e}")).await;
            }
        }
    }

    async fn publish_status(&self, level: StatusLevel, message: String) {
        let envelope = Envelope::Status { level, message, timestamp: now_ms() };
        if let Err(e) = self.channel.publish(&envelope, false).await {
            tracing::debug!("Status broadcast failed: {}", e);
        }
    }
}
