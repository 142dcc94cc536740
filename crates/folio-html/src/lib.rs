//! HTML import and export for folio documents.

pub mod css;
mod options;
mod parse;
pub mod presets;
mod serialize;

pub use crate::options::*;
pub use crate::parse::{parse, parse_with};
pub use crate::serialize::{encode_json_attribute, serialize, serialize_with};
