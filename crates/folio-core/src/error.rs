use thiserror::Error;

use crate::block::{BlockKey, BlockType};
use crate::entity::EntityKey;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    #[error("unknown block: {0}")]
    UnknownBlock(BlockKey),
    #[error("unknown entity: {0}")]
    UnknownEntity(EntityKey),
    #[error("block {0} has no editable text")]
    ReadOnlyBlock(BlockKey),
    #[error("block type {0} cannot be set directly")]
    InvalidBlockType(BlockType),
    #[error("block {0} is not a custom block")]
    NotCustomBlock(BlockKey),
    #[error("text length {length} reaches the limit of {max}")]
    TooLong { length: usize, max: usize },
    #[error(transparent)]
    Table(#[from] TableError),
    #[error(transparent)]
    Link(#[from] LinkError),
}

/// A structural rule of the content state that does not hold.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantError {
    #[error("content has no blocks")]
    Empty,
    #[error("duplicate block key: {0}")]
    DuplicateKey(BlockKey),
    #[error("block {key}: text has {text} characters but the character list has {characters}")]
    LengthMismatch {
        key: BlockKey,
        text: usize,
        characters: usize,
    },
    #[error("block {key} references missing entity {entity}")]
    MissingEntity { key: BlockKey, entity: EntityKey },
    #[error("atomic block {0} must hold one placeholder bound to an entity")]
    MalformedAtomic(BlockKey),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    #[error("block {0} is not a table")]
    NotATable(BlockKey),
    #[error("row {index} out of range ({len} rows)")]
    RowOutOfRange { index: usize, len: usize },
    #[error("unknown column: {0}")]
    UnknownColumn(String),
    #[error("malformed table data: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    #[error("invalid link url: {0:?}")]
    InvalidUrl(String),
    #[error("link title must not be empty")]
    EmptyTitle,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct CommandError {
    message: String,
}

impl CommandError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<EditError> for CommandError {
    fn from(err: EditError) -> Self {
        Self::new(err.to_string())
    }
}
