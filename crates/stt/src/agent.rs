// SPDX-FileCopyrightText: © 2025 RoomScribe Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Track lifecycle management.
//!
//! The agent owns the session actor and one pipeline per subscribed track.
//! Subscribing hands back a frame sender for the transport to feed;
//! unsubscribing cancels that pipeline at its next suspension point. When
//! the last track goes away - or the room disconnects - the session state
//! is reset.

use crate::channel::DataChannel;
use crate::correction::CorrectionClient;
use crate::pipeline::TrackPipeline;
use crate::session::{SessionActor, SessionMessage};
use crate::transcribe::Transcriber;
use roomscribe_core::{AgentConfig, AudioFrame, ParticipantMetadata, Result, TrackOptions};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Frame-channel depth per track. Deep enough to absorb STT latency spikes
/// without dropping audio at typical 10-100 ms frame cadence.
const FRAME_CHANNEL_CAPACITY: usize = 256;

struct TrackHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// The transcription agent for one room connection.
pub struct ScribeAgent {
    config: Arc<AgentConfig>,
    transcriber: Arc<dyn Transcriber>,
    session_tx: mpsc::Sender<SessionMessage>,
    session_task: JoinHandle<()>,
    tracks: HashMap<String, TrackHandle>,
}

impl ScribeAgent {
    /// Validate the config and spawn the session actor.
    ///
    /// Must be called within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`roomscribe_core::ScribeError::InvalidConfig`] if the
    /// configuration fails validation.
    pub fn new(
        config: AgentConfig,
        transcriber: Arc<dyn Transcriber>,
        channel: Arc<dyn DataChannel>,
        correction: Option<CorrectionClient>,
    ) -> Result<Self> {
        config.validate()?;
        let (session_tx, actor) =
            SessionActor::new(config.confidence_threshold, channel, correction);
        let session_task = tokio::spawn(actor.run());
        Ok(Self {
            config: Arc::new(config),
            transcriber,
            session_tx,
            session_task,
            tracks: HashMap::new(),
        })
    }

    /// Subscribe an audio track and return the sender its frames go to.
    ///
    /// Participant metadata is layered over the process defaults; a second
    /// subscribe for the same id replaces the first.
    ///
    /// # Errors
    ///
    /// Propagates window-construction failures from the pipeline.
    pub fn subscribe_track(
        &mut self,
        track_id: &str,
        metadata: Option<&str>,
    ) -> Result<mpsc::Sender<AudioFrame>> {
        if let Some(stale) = self.tracks.remove(track_id) {
            tracing::warn!(track = track_id, "Replacing already-subscribed track");
            stale.cancel.cancel();
        }

        let options = TrackOptions::layer(&self.config, &ParticipantMetadata::parse(metadata));
        tracing::info!(
            track = track_id,
            language = options.language.as_deref().unwrap_or("auto"),
            "Subscribing track"
        );

        let cancel = CancellationToken::new();
        let pipeline = TrackPipeline::new(
            track_id,
            Arc::clone(&self.config),
            options,
            Arc::clone(&self.transcriber),
            self.session_tx.clone(),
            cancel.clone(),
        )?;

        let (frames_tx, frames_rx) = mpsc::channel(FRAME_CHANNEL_CAPACITY);
        let task = tokio::spawn(pipeline.run(frames_rx));
        self.tracks.insert(track_id.to_string(), TrackHandle { cancel, task });
        Ok(frames_tx)
    }

    /// Cancel a track's pipeline and wait for it to wind down. Removing the
    /// last track resets the session state.
    pub async fn unsubscribe_track(&mut self, track_id: &str) {
        let Some(handle) = self.tracks.remove(track_id) else {
            tracing::debug!(track = track_id, "Unsubscribe for unknown track");
            return;
        };
        handle.cancel.cancel();
        if let Err(e) = handle.task.await {
            tracing::warn!(track = track_id, "Pipeline task ended abnormally: {}", e);
        }
        if self.tracks.is_empty() {
            let _ = self.session_tx.send(SessionMessage::Reset).await;
        }
    }

    /// Room disconnect: stop every pipeline, reset the session, and wait for
    /// the actor to drain its mailbox.
    pub async fn disconnect(mut self) {
        tracing::info!(tracks = self.tracks.len(), "Disconnecting agent");
        for (_, handle) in self.tracks.drain() {
            handle.cancel.cancel();
            let _ = handle.task.await;
        }
        let _ = self.session_tx.send(SessionMessage::Reset).await;
        drop(self.session_tx);
        let _ = self.session_task.await;
    }

    /// Ids of the currently subscribed tracks, for inspection.
    pub fn track_ids(&self) -> Vec<String> {
        self.tracks.keys().cloned().collect()
    }
}
