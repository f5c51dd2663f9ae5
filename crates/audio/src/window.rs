// SPDX-FileCopyrightText: © 2025 RoomScribe Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Fixed-capacity sliding window over mono samples.
//!
//! The ring fills to capacity, emits an owned copy of its contents, then
//! slides left by the stride. Emitted windows therefore overlap by
//! `window - stride` samples. The ring mutates immediately after emission,
//! which is why every emission is a copy, never a view.

use roomscribe_core::{Result, ScribeError};

/// One completed window: an owned sample copy plus its timeline position.
#[derive(Debug, Clone)]
pub struct WindowedChunk {
    pub samples: Vec<i16>,
    pub start_ms: u64,
    pub end_ms: u64,
}

/// Sliding-window chunker for one track.
#[derive(Debug)]
pub struct SlidingWindow {
    capacity: usize,
    stride_samples: usize,
    window_ms: u64,
    stride_ms: u64,
    ring: Vec<i16>,
    cursor: usize,
    /// Start timestamp of the window currently being filled; seeded from
    /// wall clock on the first frame.
    next_start_ms: Option<u64>,
}

impl SlidingWindow {
    /// Build a window over `window_ms` of audio advancing by `stride_ms`.
    ///
    /// # Errors
    ///
    /// Returns [`ScribeError::InvalidConfig`] when either duration yields
    /// zero samples at this rate.
    pub fn new(sample_rate: u32, window_ms: u64, stride_ms: u64) -> Result<Self> {
        let capacity = (sample_rate as usize).saturating_mul(window_ms as usize) / 1000;
        let stride_samples = (sample_rate as usize).saturating_mul(stride_ms as usize) / 1000;
        if capacity == 0 {
            return Err(ScribeError::InvalidConfig(format!(
                "window of {window_ms} ms at {sample_rate} Hz holds no samples"
            )));
        }
        if stride_samples == 0 {
            return Err(ScribeError::InvalidConfig(format!(
                "stride of {stride_ms} ms at {sample_rate} Hz advances by no samples"
            )));
        }
        Ok(Self {
            capacity,
            stride_samples,
            window_ms,
            stride_ms,
            ring: vec![0; capacity],
            cursor: 0,
            next_start_ms: None,
        })
    }

    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    /// Whether a full window is pending emission.
    pub const fn has_window(&self) -> bool {
        self.cursor == self.capacity
    }

    /// Seed the timeline on the first frame; later calls are no-ops.
    pub fn set_epoch_ms(&mut self, epoch_ms: u64) {
        if self.next_start_ms.is_none() {
            self.next_start_ms = Some(epoch_ms);
        }
    }

    pub const fn epoch_set(&self) -> bool {
        self.next_start_ms.is_some()
    }

    /// Append mono samples, emitting every window that completes.
    ///
    /// A large input may close several windows; they are returned in capture
    /// order. After each emission the ring slides left by the stride
    /// (`cursor = capacity - stride`, or 0 when stride >= capacity) and the
    /// window start advances by `stride_ms`.
    ///
    /// # Errors
    ///
    /// Returns [`ScribeError::WindowOverflow`] if the cursor is found past
    /// capacity - an internal invariant violation, not an input condition.
    pub fn append(&mut self, samples: &[i16]) -> Result<Vec<WindowedChunk>> {
        if self.cursor > self.capacity {
            return Err(ScribeError::WindowOverflow(format!(
                "cursor {} past capacity {}",
                self.cursor, self.capacity
            )));
        }

        let mut emitted = Vec::new();
        let mut offset = 0;
        while offset < samples.len() {
            let room = self.capacity - self.cursor;
            let take = room.min(samples.len() - offset);
            self.ring[self.cursor..self.cursor + take]
                .copy_from_slice(&samples[offset..offset + take]);
            self.cursor += take;
            offset += take;

            if self.cursor == self.capacity {
                emitted.push(self.emit());
            }
        }
        Ok(emitted)
    }

    fn emit(&mut self) -> WindowedChunk {
        let start_ms = self.next_start_ms.unwrap_or(0);
        let chunk = WindowedChunk {
            samples: self.ring.clone(),
            start_ms,
            end_ms: start_ms + self.window_ms,
        };

        if self.stride_samples >= self.capacity {
            self.cursor = 0;
        } else {
            self.ring.copy_within(self.stride_samples.., 0);
            self.cursor = self.capacity - self.stride_samples;
        }
        self.next_start_ms = Some(start_ms + self.stride_ms);
        chunk
    }
}
