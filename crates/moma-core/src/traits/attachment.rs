// SPDX-FileCopyrightText: 2026 Moma Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Attachment adapter trait: turns user files into message content.

use async_trait::async_trait;

use crate::error::MomaError;
use crate::types::{CompleteAttachment, FileHandle, PendingAttachment};

/// Validates, encodes and packages user-selected files.
#[async_trait]
pub trait AttachmentAdapter: Send + Sync {
    /// Comma-separated list of accepted MIME types.
    fn accept(&self) -> &str;

    /// Validates a file and returns a pending record.
    async fn add(&self, file: FileHandle) -> Result<PendingAttachment, MomaError>;

    /// Reads and encodes a pending attachment into a complete record.
    async fn send(&self, attachment: PendingAttachment) -> Result<CompleteAttachment, MomaError>;

    /// Releases resources held for a pending attachment.
    async fn remove(&self, attachment: PendingAttachment) -> Result<(), MomaError>;
}
