mod block;
mod character;
mod commands;
mod content;
mod editor;
mod entity;
mod error;
mod keys;
mod link;
pub mod modifier;
mod selection;
mod table;
mod upload;
mod value;

pub use crate::block::*;
pub use crate::character::*;
pub use crate::commands::*;
pub use crate::content::*;
pub use crate::editor::*;
pub use crate::entity::*;
pub use crate::error::*;
pub use crate::keys::*;
pub use crate::link::*;
pub use crate::selection::*;
pub use crate::table::*;
pub use crate::upload::*;
pub use crate::value::*;
