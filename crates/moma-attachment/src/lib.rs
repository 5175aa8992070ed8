// SPDX-FileCopyrightText: 2026 Moma Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Document attachment adapter.
//!
//! [`DocumentAttachmentAdapter`] validates a user-selected file against the
//! configured size limit and MIME allow-list, then packages its bytes as a
//! base64 text part the agent can read.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use moma_config::model::AttachmentConfig;
use moma_core::MomaError;
use moma_core::traits::AttachmentAdapter;
use moma_core::types::{
    AttachmentKind, AttachmentStatus, CompleteAttachment, ContentPart, FileHandle, FileSource,
    PendingAttachment, RunningReason,
};
use tracing::debug;

/// Attachment adapter for documents (PDF by default).
#[derive(Debug, Clone)]
pub struct DocumentAttachmentAdapter {
    accept: String,
    accepted: Vec<String>,
    max_bytes: u64,
}

impl DocumentAttachmentAdapter {
    pub fn new(config: &AttachmentConfig) -> Self {
        Self::with_limits(&config.accept, config.max_bytes)
    }

    pub fn with_limits(accept: &str, max_bytes: u64) -> Self {
        let accepted = accept
            .split(',')
            .map(|t| t.trim().to_ascii_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        Self {
            accept: accept.to_string(),
            accepted,
            max_bytes,
        }
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Matches the MIME essence (parameters stripped) against the allow-list.
    /// Entries of the form `type/*` match any subtype.
    pub fn is_accepted(&self, content_type: &str) -> bool {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        self.accepted.iter().any(|pattern| match pattern.strip_suffix("/*") {
            Some(top) => essence
                .split_once('/')
                .is_some_and(|(ty, _)| ty == top),
            None => *pattern == essence,
        })
    }

    fn check_size(&self, size: u64) -> Result<(), MomaError> {
        if size > self.max_bytes {
            return Err(MomaError::SizeLimit {
                size,
                limit: self.max_bytes,
            });
        }
        Ok(())
    }
}

/// Text part carrying an encoded document.
pub fn document_text(name: &str, bytes: &[u8]) -> String {
    format!("[Document: {name}]\nBase64 data: {}", STANDARD.encode(bytes))
}

async fn read_source(source: FileSource) -> Result<Vec<u8>, MomaError> {
    match source {
        FileSource::Memory(bytes) => Ok(bytes),
        FileSource::Path(path) => tokio::fs::read(&path).await.map_err(|e| {
            MomaError::Internal(format!("failed to read attachment {}: {e}", path.display()))
        }),
    }
}

#[async_trait]
impl AttachmentAdapter for DocumentAttachmentAdapter {
    fn accept(&self) -> &str {
        &self.accept
    }

    async fn add(&self, file: FileHandle) -> Result<PendingAttachment, MomaError> {
        // Declared size first, so oversize files are never read.
        self.check_size(file.size)?;
        if !self.is_accepted(&file.content_type) {
            return Err(MomaError::Input(format!(
                "unsupported attachment type `{}` (accepted: {})",
                file.content_type, self.accept
            )));
        }

        let pending = PendingAttachment {
            id: uuid::Uuid::new_v4().to_string(),
            kind: AttachmentKind::Document,
            name: file.name.clone(),
            content_type: file.content_type.clone(),
            status: AttachmentStatus::Running {
                reason: RunningReason::Uploading,
                progress: 0,
            },
            file,
        };
        debug!(id = %pending.id, name = %pending.name, "attachment accepted");
        Ok(pending)
    }

    async fn send(&self, attachment: PendingAttachment) -> Result<CompleteAttachment, MomaError> {
        let PendingAttachment {
            id,
            kind,
            name,
            content_type,
            mut status,
            file,
        } = attachment;

        let bytes = read_source(file.source).await?;
        self.check_size(bytes.len() as u64)?;
        status.advance(AttachmentStatus::Complete)?;

        debug!(id = %id, bytes = bytes.len(), "attachment encoded");
        let text = document_text(&name, &bytes);
        Ok(CompleteAttachment {
            id,
            kind,
            name,
            content_type,
            status,
            content: vec![ContentPart::text(text)],
        })
    }

    async fn remove(&self, attachment: PendingAttachment) -> Result<(), MomaError> {
        debug!(id = %attachment.id, "attachment removed");
        Ok(())
    }
}
