// SPDX-FileCopyrightText: © 2025 RoomScribe Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Per-track processing pipeline.
//!
//! Each subscribed audio track owns one pipeline task: frames are
//! normalized, gain-controlled, and windowed; completed windows pass the VAD
//! gate, get transcribed, and the result goes to the session mailbox.
//! Processing is strictly sequential per track - a new frame is not touched
//! while a window is in flight - and a pipeline yields once between windows
//! closed by the same frame so other tracks get scheduled.

use crate::session::SessionMessage;
use crate::transcribe::Transcriber;
use roomscribe_audio::{zcr_window_len, Agc, FrameConverter, SlidingWindow, VadGate, WindowedChunk};
use roomscribe_core::{
    now_ms, AgentConfig, AudioChunk, AudioFrame, Result, SampleFormat, TrackOptions,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Throughput counters for one pipeline, logged at shutdown.
#[derive(Debug, Default)]
struct PipelineCounters {
    frames: u64,
    frames_dropped: u64,
    windows: u64,
    windows_skipped: u64,
    windows_failed: u64,
}

/// Pipeline for one subscribed track.
pub struct TrackPipeline {
    track_id: String,
    config: Arc<AgentConfig>,
    options: TrackOptions,
    converter: FrameConverter,
    agc: Agc,
    vad: VadGate,
    window: SlidingWindow,
    transcriber: Arc<dyn Transcriber>,
    session_tx: mpsc::Sender<SessionMessage>,
    cancel: CancellationToken,
    chunk_seq: u64,
    counters: PipelineCounters,
}

impl TrackPipeline {
    /// Build a pipeline from the validated process config plus the track's
    /// layered options.
    ///
    /// # Errors
    ///
    /// Propagates [`roomscribe_core::ScribeError::InvalidConfig`] from the
    /// window construction.
    pub fn new(
        track_id: &str,
        config: Arc<AgentConfig>,
        options: TrackOptions,
        transcriber: Arc<dyn Transcriber>,
        session_tx: mpsc::Sender<SessionMessage>,
        cancel: CancellationToken,
    ) -> Result<Self> {
        let window = SlidingWindow::new(config.sample_rate, config.window_ms, config.stride_ms)?;
        Ok(Self {
            track_id: track_id.to_string(),
            converter: FrameConverter::new(config.sample_rate),
            agc: Agc::new(
                config.agc_target_rms,
                config.agc_min,
                config.agc_max,
                config.agc_smoothing,
            ),
            vad: VadGate::new(
                config.silence_rms_threshold,
                config.vad_sensitivity,
                zcr_window_len(config.vad_window_ms, config.window_ms),
            ),
            window,
            config,
            options,
            transcriber,
            session_tx,
            cancel,
            chunk_seq: 0,
            counters: PipelineCounters::default(),
        })
    }

    /// Drive the pipeline until the track unsubscribes (cancellation) or the
    /// frame source closes.
    pub async fn run(mut self, mut frames_rx: mpsc::Receiver<AudioFrame>) {
        tracing::info!(track = %self.track_id, "Track pipeline started");
        loop {
            tokio::select! {
                () = self.cancel.cancelled() => {
                    tracing::info!(track = %self.track_id, "Track pipeline cancelled");
                    break;
                },
                maybe_frame = frames_rx.recv() => {
                    let Some(frame) = maybe_frame else {
                        tracing::info!(track = %self.track_id, "Frame source closed");
                        break;
                    };
                    // The chunk-processing boundary: a poisoned frame or
                    // window never propagates past this point.
                    if let Err(e) = self.process_frame(frame).await {
                        self.counters.frames_dropped += 1;
                        tracing::warn!(track = %self.track_id, "Dropping frame: {}", e);
                    }
                },
            }
        }
        tracing::info!(
            track = %self.track_id,
            frames = self.counters.frames,
            frames_dropped = self.counters.frames_dropped,
            windows = self.counters.windows,
            windows_skipped = self.counters.windows_skipped,
            windows_failed = self.counters.windows_failed,
            "Track pipeline finished"
        );
    }

    /// Normalize one frame into the ring and handle every window it closes.
    async fn process_frame(&mut self, frame: AudioFrame) -> Result<()> {
        self.counters.frames += 1;
        if !self.window.epoch_set() {
            self.window.set_epoch_ms(now_ms());
        }

        let mut samples = self.converter.convert(&frame)?;
        self.agc.process(&mut samples);

        let completed = self.window.append(&samples)?;
        for (i, window) in completed.into_iter().enumerate() {
            if self.cancel.is_cancelled() {
                break;
            }
            if i > 0 {
                // Hand the scheduler to other tracks between windows closed
                // by one oversized frame batch.
                tokio::task::yield_now().await;
            }
            self.handle_window(window).await;
        }
        Ok(())
    }

    async fn handle_window(&mut self, window: WindowedChunk) {
        self.counters.windows += 1;
        let chunk_id = format!("{}-{}", self.track_id, self.chunk_seq);
        self.chunk_seq += 1;

        let decision = self.vad.assess(&window.samples);
        if !decision.is_speech {
            self.counters.windows_skipped += 1;
            tracing::debug!(
                track = %self.track_id,
                chunk = %chunk_id,
                score = decision.score,
                threshold = decision.threshold,
                "Window gated as non-speech"
            );
            let _ = self
                .session_tx
                .send(SessionMessage::WindowSkipped { chunk_id, score: decision.score })
                .await;
            return;
        }

        let completed_at_ms = now_ms();
        let chunk = AudioChunk {
            id: chunk_id,
            start_ms: window.start_ms,
            end_ms: window.end_ms,
            sample_rate: self.config.sample_rate,
            channels: self.config.channels,
            format: SampleFormat::S16Le,
            captured_at_ms: completed_at_ms.saturating_sub(self.config.window_ms),
            completed_at_ms,
            samples: window.samples,
        };

        match self.transcriber.transcribe(&chunk, &self.options).await {
            Ok(response) => {
                if self.cancel.is_cancelled() {
                    // Unsubscribed while the STT call was in flight; the
                    // result is discarded.
                    return;
                }
                let _ = self
                    .session_tx
                    .send(SessionMessage::WindowTranscribed {
                        chunk,
                        response,
                        options: self.options.clone(),
                    })
                    .await;
            },
            Err(e) => {
                self.counters.windows_failed += 1;
                tracing::error!(track = %self.track_id, chunk = %chunk.id, "Transcription failed: {}", e);
                let _ = self
                    .session_tx
                    .send(SessionMessage::WindowFailed {
                        chunk_id: chunk.id,
                        message: e.to_string(),
                    })
                    .await;
            },
        }
    }
}
