// SPDX-FileCopyrightText: © 2025 RoomScribe Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! RoomScribe Audio - windowing utilities for the transcription pipeline.
//!
//! Everything here operates on canonical s16le mono samples:
//!
//! - [`convert`]: frame decoding, stereo downmix, and crude resampling
//! - [`agc`]: smoothed automatic gain control
//! - [`vad`]: energy + zero-crossing speech gate for completed windows
//! - [`window`]: the fixed-capacity sliding window with strict
//!   stride/capacity invariants

pub mod agc;
pub mod convert;
pub mod vad;
pub mod window;

pub use agc::{rms, Agc};
pub use convert::{decode_s16le, downmix_to_mono, resample, FrameConverter};
pub use vad::{zcr_window_len, zero_crossing_rate, VadDecision, VadGate};
pub use window::{SlidingWindow, WindowedChunk};
