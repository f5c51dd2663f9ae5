// SPDX-FileCopyrightText: © 2025 RoomScribe Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Correction-service client.
//!
//! Each emitted batch is forwarded to an external correction model together
//! with recent transcript context. The service streams its deltas back over
//! the data channel on its own; this client only has to deliver the request
//! and drain the event-stream body to completion so the connection is
//! released. Failures never block the transcript path.

use futures_util::StreamExt;
use roomscribe_core::{Result, ScribeError, TrackOptions, TranscriptBatch, TranscriptSegment};
use serde::Serialize;
use std::time::Duration;

/// Request envelope for the correction service.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrectionRequest<'a> {
    pub request_id: String,
    pub room_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_identities: Option<&'a [String]>,
    pub batch: &'a TranscriptBatch,
    pub context: &'a [TranscriptSegment],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain_hint: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub terminology: Vec<String>,
}

/// HTTP client for the correction endpoint.
pub struct CorrectionClient {
    client: reqwest::Client,
    url: String,
    room_name: String,
}

impl CorrectionClient {
    /// Build a client for the given endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`ScribeError::InvalidConfig`] if the HTTP client cannot be
    /// constructed.
    pub fn new(url: &str, room_name: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| ScribeError::InvalidConfig(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, url: url.to_string(), room_name: room_name.to_string() })
    }

    /// Forward one batch with context and consume the streamed response.
    ///
    /// The event-stream deltas are not interpreted here - the service
    /// broadcasts them to the room itself.
    ///
    /// # Errors
    ///
    /// Returns [`ScribeError::CorrectionFailure`] on a non-OK status or a
    /// transport failure; the caller logs it and moves on.
    pub async fn correct(
        &self,
        batch: &TranscriptBatch,
        context: &[TranscriptSegment],
        options: &TrackOptions,
    ) -> Result<()> {
        let request = CorrectionRequest {
            request_id: uuid::Uuid::new_v4().to_string(),
            room_name: &self.room_name,
            target_identities: None,
            batch,
            context,
            language: options.language.as_deref(),
            domain_hint: options.domain_hint.as_deref(),
            terminology: options.terminology.clone(),
        };

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ScribeError::CorrectionFailure(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScribeError::CorrectionFailure(format!("correction returned {status}")));
        }

        // Drain the SSE body fully so the connection can be reused.
        let mut stream = response.bytes_stream();
        let mut total_bytes = 0usize;
        while let Some(chunk) = stream.next().await {
            match chunk {
                Ok(bytes) => total_bytes += bytes.len(),
                Err(e) => {
                    return Err(ScribeError::CorrectionFailure(format!(
                        "stream ended early after {total_bytes} bytes: {e}"
                    )));
                },
            }
        }
        tracing::debug!(request_id = %request.request_id, total_bytes, "Correction stream drained");
        Ok(())
    }
}
