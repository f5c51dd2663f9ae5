// SPDX-FileCopyrightText: © 2025 RoomScribe Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! End-to-end pipeline tests: synthesized frames in, envelopes out.
//!
//! The STT service and the data channel are replaced by scripted mocks, so
//! every path from frame ingestion to envelope broadcast runs for real.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::cast_possible_truncation)]

use async_trait::async_trait;
use bytes::Bytes;
use roomscribe_core::{
    AgentConfig, AudioChunk, AudioFrame, Envelope, Result, ScribeError, StatusLevel, TrackOptions,
    TranscriptPayload,
};
use roomscribe_stt::{DataChannel, ScribeAgent, SttResponse, SttSegment, Transcriber};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::time::{sleep, Duration, Instant};

/// A transcriber that plays back a script, then repeats its last entry.
struct ScriptedTranscriber {
    script: Mutex<VecDeque<ScriptEntry>>,
    repeat: Mutex<Option<ScriptEntry>>,
    calls: AtomicUsize,
}

#[derive(Clone)]
enum ScriptEntry {
    Text(&'static str, f32),
    Fail(&'static str),
}

impl ScriptedTranscriber {
    fn new(entries: &[ScriptEntry]) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(entries.iter().cloned().collect()),
            repeat: Mutex::new(None),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transcriber for ScriptedTranscriber {
    async fn transcribe(&self, _chunk: &AudioChunk, _options: &TrackOptions) -> Result<SttResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let entry = {
            let mut script = self.script.lock().unwrap();
            let mut repeat = self.repeat.lock().unwrap();
            match script.pop_front() {
                Some(entry) => {
                    *repeat = Some(entry.clone());
                    entry
                },
                None => repeat.clone().expect("scripted transcriber called with empty script"),
            }
        };
        match entry {
            ScriptEntry::Text(text, confidence) => Ok(SttResponse {
                text: text.to_string(),
                segments: vec![SttSegment {
                    text: Some(text.to_string()),
                    confidence: Some(confidence),
                    ..SttSegment::default()
                }],
            }),
            ScriptEntry::Fail(message) => {
                Err(ScribeError::TranscriptionFailure(message.to_string()))
            },
        }
    }
}

/// A data channel that records every published envelope.
#[derive(Default)]
struct RecordingChannel {
    envelopes: Mutex<Vec<(Envelope, bool)>>,
}

impl RecordingChannel {
    fn transcript_texts(&self) -> Vec<String> {
        self.envelopes
            .lock()
            .unwrap()
            .iter()
            .filter_map(|(envelope, _)| match envelope {
                Envelope::Transcript(TranscriptPayload::Stt { batch }) => {
                    Some(batch.segments[0].text.clone())
                },
                _ => None,
            })
            .collect()
    }

    fn statuses(&self, level: StatusLevel) -> Vec<String> {
        self.envelopes
            .lock()
            .unwrap()
            .iter()
            .filter_map(|(envelope, _)| match envelope {
                Envelope::Status { level: l, message, .. } if *l == level => Some(message.clone()),
                _ => None,
            })
            .collect()
    }

    fn metrics_count(&self) -> usize {
        self.envelopes
            .lock()
            .unwrap()
            .iter()
            .filter(|(envelope, _)| matches!(envelope, Envelope::Metrics { .. }))
            .count()
    }

    fn segments(&self) -> Vec<roomscribe_core::TranscriptSegment> {
        self.envelopes
            .lock()
            .unwrap()
            .iter()
            .filter_map(|(envelope, _)| match envelope {
                Envelope::Transcript(TranscriptPayload::Stt { batch }) => {
                    Some(batch.segments.clone())
                },
                _ => None,
            })
            .flatten()
            .collect()
    }
}

#[async_trait]
impl DataChannel for RecordingChannel {
    async fn publish(&self, envelope: &Envelope, reliable: bool) -> Result<()> {
        self.envelopes.lock().unwrap().push((envelope.clone(), reliable));
        Ok(())
    }
}

/// One second of loud alternating-sign audio: high energy, high ZCR, so the
/// VAD gate stays open.
fn speech_frame(sample_rate: u32) -> AudioFrame {
    let samples: Vec<i16> =
        (0..sample_rate).map(|i| if i % 2 == 0 { 8000 } else { -8000 }).collect();
    frame_from_samples(sample_rate, 1, &samples)
}

fn silence_frame(sample_rate: u32) -> AudioFrame {
    frame_from_samples(sample_rate, 1, &vec![0i16; sample_rate as usize])
}

fn frame_from_samples(sample_rate: u32, channels: u16, samples: &[i16]) -> AudioFrame {
    let mut data = Vec::with_capacity(samples.len() * 2);
    for sample in samples {
        data.extend_from_slice(&sample.to_le_bytes());
    }
    AudioFrame {
        sample_rate,
        channels,
        samples_per_channel: (samples.len() / channels as usize) as u32,
        data: Bytes::from(data),
    }
}

fn test_config() -> AgentConfig {
    AgentConfig {
        // Keep AGC out of the way: the synthetic tone is already loud.
        agc_min: 1.0,
        agc_max: 1.0,
        ..AgentConfig::default()
    }
}

/// Poll until `predicate` returns true or two seconds pass.
async fn wait_until(mut predicate: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(2);
    while !predicate() {
        assert!(Instant::now() < deadline, "condition not reached within deadline");
        sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn test_speech_flows_to_transcript_envelope() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let transcriber = ScriptedTranscriber::new(&[ScriptEntry::Text("It rained today.", 0.9)]);
    let channel = Arc::new(RecordingChannel::default());
    let mut agent =
        ScribeAgent::new(test_config(), transcriber.clone(), channel.clone(), None).unwrap();

    let frames_tx = agent.subscribe_track("mic", None).unwrap();
    // Three seconds closes the first 3000 ms window.
    for _ in 0..3 {
        frames_tx.send(speech_frame(16_000)).await.unwrap();
    }

    wait_until(|| !channel.transcript_texts().is_empty()).await;

    let texts = channel.transcript_texts();
    assert_eq!(texts, vec!["It rained today.".to_string()]);
    assert!(transcriber.calls() >= 1);

    // Invariant: every emitted segment spans exactly one window.
    let config = test_config();
    for segment in channel.segments() {
        assert_eq!(segment.end_ms - segment.start_ms, config.window_ms);
        assert!(segment.is_final);
        assert_eq!(segment.revision, 0);
    }
    assert!(channel.metrics_count() >= 1);

    agent.disconnect().await;
}

#[tokio::test]
async fn test_silence_is_gated_without_stt_calls() {
    let transcriber = ScriptedTranscriber::new(&[ScriptEntry::Text("should never appear", 0.9)]);
    let channel = Arc::new(RecordingChannel::default());
    let mut agent =
        ScribeAgent::new(test_config(), transcriber.clone(), channel.clone(), None).unwrap();

    let frames_tx = agent.subscribe_track("mic", None).unwrap();
    for _ in 0..4 {
        frames_tx.send(silence_frame(16_000)).await.unwrap();
    }

    // Two windows close (at 3 s and 4 s); both are rejected as non-speech.
    wait_until(|| channel.statuses(StatusLevel::Info).len() >= 2).await;

    assert_eq!(transcriber.calls(), 0);
    assert!(channel.transcript_texts().is_empty());
    assert!(channel.statuses(StatusLevel::Info).iter().all(|m| m.contains("no speech")));

    agent.disconnect().await;
}

#[tokio::test]
async fn test_overlapping_windows_emit_only_new_text() {
    let transcriber = ScriptedTranscriber::new(&[
        ScriptEntry::Text("The quick brown fox jumps.", 0.9),
        ScriptEntry::Text("brown fox jumps. It rained today.", 0.9),
    ]);
    let channel = Arc::new(RecordingChannel::default());
    let mut agent =
        ScribeAgent::new(test_config(), transcriber.clone(), channel.clone(), None).unwrap();

    let frames_tx = agent.subscribe_track("mic", None).unwrap();
    // 3 s closes window one; one more second closes the overlapping window.
    for _ in 0..4 {
        frames_tx.send(speech_frame(16_000)).await.unwrap();
    }

    wait_until(|| channel.transcript_texts().len() >= 2).await;

    let texts = channel.transcript_texts();
    assert_eq!(
        texts,
        vec!["The quick brown fox jumps.".to_string(), "It rained today.".to_string()]
    );

    agent.disconnect().await;
}

#[tokio::test]
async fn test_feeding_identical_audio_twice_emits_once() {
    let transcriber = ScriptedTranscriber::new(&[ScriptEntry::Text("Hello there friend.", 0.9)]);
    let channel = Arc::new(RecordingChannel::default());
    let mut agent =
        ScribeAgent::new(test_config(), transcriber.clone(), channel.clone(), None).unwrap();

    let frames_tx = agent.subscribe_track("mic", None).unwrap();
    for _ in 0..6 {
        frames_tx.send(speech_frame(16_000)).await.unwrap();
    }

    // Four windows close; every re-transcription is absorbed by the
    // extractor, so exactly one segment is emitted.
    wait_until(|| transcriber.calls() >= 4).await;
    sleep(Duration::from_millis(50)).await;

    assert_eq!(channel.transcript_texts(), vec!["Hello there friend.".to_string()]);

    agent.disconnect().await;
}

#[tokio::test]
async fn test_transcription_failure_emits_error_status_and_recovers() {
    let transcriber = ScriptedTranscriber::new(&[
        ScriptEntry::Fail("STT returned 503"),
        ScriptEntry::Text("Back in business.", 0.9),
    ]);
    let channel = Arc::new(RecordingChannel::default());
    let mut agent =
        ScribeAgent::new(test_config(), transcriber.clone(), channel.clone(), None).unwrap();

    let frames_tx = agent.subscribe_track("mic", None).unwrap();
    for _ in 0..4 {
        frames_tx.send(speech_frame(16_000)).await.unwrap();
    }

    wait_until(|| !channel.transcript_texts().is_empty()).await;

    let errors = channel.statuses(StatusLevel::Error);
    assert!(!errors.is_empty());
    assert!(errors[0].contains("503"), "{errors:?}");
    assert_eq!(channel.transcript_texts(), vec!["Back in business.".to_string()]);

    agent.disconnect().await;
}

/// A channel whose reliable sends fail, as after a room disconnect.
#[derive(Default)]
struct FailingChannel {
    attempts: AtomicUsize,
}

#[async_trait]
impl DataChannel for FailingChannel {
    async fn publish(&self, _envelope: &Envelope, _reliable: bool) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(ScribeError::TransportDisconnected("room closed".to_string()))
    }
}

#[tokio::test]
async fn test_broadcast_failure_is_not_retried() {
    let transcriber = ScriptedTranscriber::new(&[ScriptEntry::Text("Nobody heard this.", 0.9)]);
    let channel = Arc::new(FailingChannel::default());
    let mut agent =
        ScribeAgent::new(test_config(), transcriber.clone(), channel.clone(), None).unwrap();

    let frames_tx = agent.subscribe_track("mic", None).unwrap();
    for _ in 0..3 {
        frames_tx.send(speech_frame(16_000)).await.unwrap();
    }

    // One transcript publish and one metrics publish, each failing once.
    wait_until(|| channel.attempts.load(Ordering::SeqCst) >= 2).await;
    sleep(Duration::from_millis(50)).await;
    assert_eq!(channel.attempts.load(Ordering::SeqCst), 2);

    agent.disconnect().await;
}

#[tokio::test]
async fn test_last_unsubscribe_resets_session_state() {
    let transcriber = ScriptedTranscriber::new(&[ScriptEntry::Text("Same sentence again.", 0.9)]);
    let channel = Arc::new(RecordingChannel::default());
    let mut agent =
        ScribeAgent::new(test_config(), transcriber.clone(), channel.clone(), None).unwrap();

    let frames_tx = agent.subscribe_track("mic", None).unwrap();
    for _ in 0..3 {
        frames_tx.send(speech_frame(16_000)).await.unwrap();
    }
    wait_until(|| channel.transcript_texts().len() == 1).await;

    // Dropping the last track resets emitted history.
    agent.unsubscribe_track("mic").await;
    assert!(agent.track_ids().is_empty());

    // The same sentence after resubscribe is new speech, not a repeat.
    let frames_tx = agent.subscribe_track("mic", None).unwrap();
    for _ in 0..3 {
        frames_tx.send(speech_frame(16_000)).await.unwrap();
    }
    wait_until(|| channel.transcript_texts().len() == 2).await;

    assert_eq!(channel.transcript_texts().len(), 2);

    agent.disconnect().await;
}
