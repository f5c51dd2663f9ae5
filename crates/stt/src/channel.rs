// SPDX-FileCopyrightText: © 2025 RoomScribe Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! The seam to the room's data channel.
//!
//! The transport itself (room membership, topics, acknowledgements) is
//! someone else's problem; the pipeline only needs "publish this envelope,
//! reliably or lossily". Broadcast failures are logged by the caller and
//! never retried.

use async_trait::async_trait;
use roomscribe_core::{Envelope, Result};

/// Publisher for UTF-8 JSON envelopes on the configured topic.
#[async_trait]
pub trait DataChannel: Send + Sync {
    /// Publish one envelope. `reliable` requests acknowledged delivery;
    /// status and metrics envelopes pass `false` and may be dropped.
    async fn publish(&self, envelope: &Envelope, reliable: bool) -> Result<()>;
}
