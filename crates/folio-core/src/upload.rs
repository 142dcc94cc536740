//! Placeholder blocks for media that is still uploading.
//!
//! The transport lives outside this crate: callers start an upload with
//! [`EditorState::begin_upload`], run it however they like and report the
//! outcome through [`EditorState::finish_upload`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::block::{BlockKey, BlockType};
use crate::content::ContentState;
use crate::editor::{ChangeType, EditorState, inserted_block_key};
use crate::entity::{EntityData, EntityKey, EntityType, Mutability};
use crate::error::EditError;
use crate::modifier;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub fn entity_type(self) -> EntityType {
        match self {
            MediaKind::Image => EntityType::Image,
            MediaKind::Video => EntityType::Video,
        }
    }
}

/// What the upload service returns for a stored file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    pub file_url: String,
    pub file_name: String,
}

impl UploadedFile {
    pub fn new(file_url: impl Into<String>, file_name: impl Into<String>) -> Self {
        Self {
            file_url: file_url.into(),
            file_name: file_name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Completed(UploadedFile),
    Failed(String),
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadResolution {
    /// The placeholder now shows the uploaded file.
    Applied,
    /// The placeholder was removed after a failure or cancellation.
    Removed,
    /// The placeholder no longer exists; nothing changed.
    Stale,
}

/// Handle to a placeholder inserted by [`EditorState::begin_upload`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingUpload {
    pub kind: MediaKind,
    pub entity: EntityKey,
    pub block: BlockKey,
}

/// The atomic block currently bound to `entity`, wherever edits moved it.
fn placeholder_block(content: &ContentState, entity: EntityKey) -> Option<BlockKey> {
    content
        .blocks()
        .find(|block| block.block_type == BlockType::Atomic && block.entity_at(0) == Some(entity))
        .map(|block| block.key.clone())
}

impl EditorState {
    /// Inserts a loading placeholder for media that is being uploaded.
    pub fn begin_upload(&mut self, kind: MediaKind) -> Result<PendingUpload, EditError> {
        let mut content = self.content().clone();
        let data = EntityData::from([("loading".to_string(), Value::Bool(true))]);
        let entity = content.create_entity(kind.entity_type(), Mutability::Immutable, data);
        let next = modifier::insert_atomic_block(&content, self.selection(), entity, ' ')?;
        let block = inserted_block_key(&next).ok_or(EditError::UnknownEntity(entity))?;
        self.push(next, ChangeType::InsertFragment);
        tracing::debug!(%entity, %block, ?kind, "upload started");
        Ok(PendingUpload {
            kind,
            entity,
            block,
        })
    }

    /// Applies an upload outcome. The placeholder is looked up again first:
    /// if it is gone (removed by the user, or already resolved) this is a no-op.
    pub fn finish_upload(
        &mut self,
        pending: &PendingUpload,
        outcome: UploadOutcome,
    ) -> UploadResolution {
        let Some(block) = placeholder_block(self.content(), pending.entity) else {
            tracing::debug!(entity = %pending.entity, "upload finished for a removed placeholder");
            return UploadResolution::Stale;
        };

        match outcome {
            UploadOutcome::Completed(file) => {
                let data = EntityData::from([
                    ("src".to_string(), Value::from(file.file_url)),
                    ("name".to_string(), Value::from(file.file_name)),
                    ("loading".to_string(), Value::Bool(false)),
                ]);
                match modifier::merge_entity_data(self.content(), pending.entity, data) {
                    Ok(next) => {
                        self.push(next, ChangeType::ChangeEntityData);
                        UploadResolution::Applied
                    }
                    Err(err) => {
                        tracing::debug!(%err, "upload result could not be applied");
                        UploadResolution::Stale
                    }
                }
            }
            UploadOutcome::Failed(reason) => {
                tracing::warn!(entity = %pending.entity, %reason, "upload failed");
                self.remove_placeholder(&block)
            }
            UploadOutcome::Cancelled => {
                tracing::debug!(entity = %pending.entity, "upload cancelled");
                self.remove_placeholder(&block)
            }
        }
    }

    fn remove_placeholder(&mut self, block: &BlockKey) -> UploadResolution {
        let next = modifier::remove_block(self.content(), block);
        self.push(next, ChangeType::RemoveRange);
        UploadResolution::Removed
    }
}
