// SPDX-FileCopyrightText: © 2025 RoomScribe Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Structured error types for RoomScribe.
//!
//! Errors are categorized by the stage that raised them so callers can decide
//! between dropping a frame, dropping a window, or tearing the session down.

use thiserror::Error;

/// Main error type for RoomScribe operations.
#[derive(Debug, Error)]
pub enum ScribeError {
    /// A channel conversion other than identity or stereo-to-mono was requested.
    ///
    /// Fatal to the frame only: the frame is logged, dropped, and counted.
    #[error("unsupported channel layout: {from} -> {to} channels")]
    UnsupportedChannelLayout { from: u16, to: u16 },

    /// The speech-to-text service returned a non-OK status or the request
    /// failed at the network layer. The window is dropped, not retried.
    #[error("transcription failed: {0}")]
    TranscriptionFailure(String),

    /// The correction service rejected a request. Never blocks the
    /// transcript path.
    #[error("correction request failed: {0}")]
    CorrectionFailure(String),

    /// The media room disconnected or the participant is gone. All session
    /// state is reset and pipelines stop.
    #[error("transport disconnected: {0}")]
    TransportDisconnected(String),

    /// Configuration or parameter validation error. Fatal at startup.
    ///
    /// Examples:
    /// - window/stride producing a zero-sample ring
    /// - gain bounds out of order
    /// - thresholds outside their valid range
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// An append would exceed the ring's remaining room in one step.
    /// This is an internal invariant violation, not an input error.
    #[error("window overflow: {0}")]
    WindowOverflow(String),

    /// I/O error (WAV assembly, payload handling).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for Results using [`ScribeError`].
pub type Result<T> = std::result::Result<T, ScribeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ScribeError::UnsupportedChannelLayout { from: 6, to: 1 };
        assert_eq!(err.to_string(), "unsupported channel layout: 6 -> 1 channels");

        let err = ScribeError::TranscriptionFailure("status 503".to_string());
        assert_eq!(err.to_string(), "transcription failed: status 503");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: ScribeError = io_err.into();
        assert!(err.to_string().contains("I/O error"));
        assert!(err.to_string().contains("missing"));
    }
}
