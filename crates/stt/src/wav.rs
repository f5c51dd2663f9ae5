// SPDX-FileCopyrightText: © 2025 RoomScribe Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Canonical WAV assembly for STT uploads.
//!
//! The STT service wants a plain RIFF/WAVE file: a 44-byte header (16-byte
//! fmt chunk, PCM format code 1, 16 bits per sample, little-endian) followed
//! by the raw s16le payload.

use bytes::{BufMut, Bytes, BytesMut};

const HEADER_LEN: usize = 44;
const PCM_FORMAT_CODE: u16 = 1;
const BITS_PER_SAMPLE: u16 = 16;

/// Encode mono/interleaved s16le samples as a complete WAV file.
pub fn encode_wav(samples: &[i16], sample_rate: u32, channels: u16) -> Bytes {
    let data_len = samples.len() * 2;
    let mut buf = BytesMut::with_capacity(HEADER_LEN + data_len);

    let byte_rate = sample_rate * u32::from(channels) * 2;
    let block_align = channels * 2;

    buf.put_slice(b"RIFF");
    #[allow(clippy::cast_possible_truncation)]
    buf.put_u32_le((HEADER_LEN - 8 + data_len) as u32);
    buf.put_slice(b"WAVE");

    buf.put_slice(b"fmt ");
    buf.put_u32_le(16);
    buf.put_u16_le(PCM_FORMAT_CODE);
    buf.put_u16_le(channels);
    buf.put_u32_le(sample_rate);
    buf.put_u32_le(byte_rate);
    buf.put_u16_le(block_align);
    buf.put_u16_le(BITS_PER_SAMPLE);

    buf.put_slice(b"data");
    #[allow(clippy::cast_possible_truncation)]
    buf.put_u32_le(data_len as u32);
    for &sample in samples {
        buf.put_i16_le(sample);
    }

    buf.freeze()
}
