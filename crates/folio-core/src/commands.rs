//! Editor commands addressed by string id, with optional JSON arguments.
//!
//! Built-in commands are plain data: an id, a label and the [`CommandAction`]
//! they perform. Hosts can add their own behaviour with [`Command::custom`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::block::{BlockKey, BlockType};
use crate::character::{
    BOLD, CODE, COLOR_PREFIX, FONT_SIZE_PREFIX, HIGHLIGHT, ITALIC, STRIKETHROUGH, UNDERLINE,
};
use crate::editor::EditorState;
use crate::error::CommandError;
use crate::table::{ColumnPosition, RowPosition};
use crate::upload::UploadedFile;

pub type CommandHandler =
    Arc<dyn Fn(&mut EditorState, Option<&Value>) -> Result<(), CommandError> + Send + Sync>;

const ALIGNMENTS: &[&str] = &["left", "center", "right", "justify"];
const MAX_TABLE_SIZE: usize = 32;

/// What a command does to the editor.
#[derive(Clone)]
pub enum CommandAction {
    ToggleStyle(&'static str),
    /// Applies `prefix` + `args[arg]` as a composite style.
    SetStyleValue {
        prefix: &'static str,
        arg: &'static str,
    },
    ClearStyles,
    SetBlockType,
    SetBlockAlign,
    AdjustDepth(isize),
    Undo,
    Redo,
    InsertLink,
    InsertImage,
    InsertVideo,
    InsertDivider,
    InsertLinkCard,
    InsertTable,
    FocusTableCell,
    InsertTableRow(RowPosition),
    InsertTableColumn(ColumnPosition),
    DeleteTableRow,
    DeleteTableColumn,
    SetTableCell,
    Custom(CommandHandler),
}

impl fmt::Debug for CommandAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ToggleStyle(style) => f.debug_tuple("ToggleStyle").field(style).finish(),
            Self::SetStyleValue { prefix, arg } => f
                .debug_struct("SetStyleValue")
                .field("prefix", prefix)
                .field("arg", arg)
                .finish(),
            Self::AdjustDepth(delta) => f.debug_tuple("AdjustDepth").field(delta).finish(),
            Self::InsertTableRow(position) => {
                f.debug_tuple("InsertTableRow").field(position).finish()
            }
            Self::InsertTableColumn(position) => {
                f.debug_tuple("InsertTableColumn").field(position).finish()
            }
            Self::Custom(_) => f.write_str("Custom(..)"),
            other => f.write_str(other.name()),
        }
    }
}

impl CommandAction {
    fn name(&self) -> &'static str {
        match self {
            Self::ToggleStyle(_) => "ToggleStyle",
            Self::SetStyleValue { .. } => "SetStyleValue",
            Self::ClearStyles => "ClearStyles",
            Self::SetBlockType => "SetBlockType",
            Self::SetBlockAlign => "SetBlockAlign",
            Self::AdjustDepth(_) => "AdjustDepth",
            Self::Undo => "Undo",
            Self::Redo => "Redo",
            Self::InsertLink => "InsertLink",
            Self::InsertImage => "InsertImage",
            Self::InsertVideo => "InsertVideo",
            Self::InsertDivider => "InsertDivider",
            Self::InsertLinkCard => "InsertLinkCard",
            Self::InsertTable => "InsertTable",
            Self::FocusTableCell => "FocusTableCell",
            Self::InsertTableRow(_) => "InsertTableRow",
            Self::InsertTableColumn(_) => "InsertTableColumn",
            Self::DeleteTableRow => "DeleteTableRow",
            Self::DeleteTableColumn => "DeleteTableColumn",
            Self::SetTableCell => "SetTableCell",
            Self::Custom(_) => "Custom",
        }
    }

    pub fn run(&self, editor: &mut EditorState, args: Option<&Value>) -> Result<(), CommandError> {
        match self {
            Self::ToggleStyle(style) => editor.toggle_inline_style(style),
            Self::SetStyleValue { prefix, arg } => {
                let value = match args.and_then(|args| args.get(*arg)) {
                    Some(Value::String(value)) => value.clone(),
                    Some(Value::Number(value)) => value.to_string(),
                    _ => return Err(missing(arg)),
                };
                editor.apply_inline_style(&format!("{prefix}{value}"));
            }
            Self::ClearStyles => editor.clear_formatting(),
            Self::SetBlockType => {
                let block_type: BlockType =
                    arg_str(args, "type")?.parse().map_err(CommandError::new)?;
                if arg_bool(args, "toggle") {
                    editor.toggle_block_type(block_type)?;
                } else {
                    editor.set_block_type(block_type)?;
                }
            }
            Self::SetBlockAlign => {
                let align = arg_str(args, "align")?;
                if !ALIGNMENTS.contains(&align) {
                    return Err(CommandError::new(format!("Unsupported alignment: {align}")));
                }
                editor.set_block_align(align);
            }
            Self::AdjustDepth(delta) if *delta < 0 => editor.outdent(),
            Self::AdjustDepth(_) => editor.indent(),
            Self::Undo => {
                editor.undo();
            }
            Self::Redo => {
                editor.redo();
            }
            Self::InsertLink => {
                editor.add_link(arg_str(args, "url")?, arg_str(args, "title")?)?;
            }
            Self::InsertImage => {
                let args = args.cloned().ok_or_else(|| CommandError::new("Missing args"))?;
                let file: UploadedFile = serde_json::from_value(args)
                    .map_err(|err| CommandError::new(format!("Invalid image args: {err}")))?;
                editor.add_image(&file)?;
            }
            Self::InsertVideo => {
                editor.add_video(arg_str(args, "src")?)?;
            }
            Self::InsertDivider => {
                editor.insert_divider()?;
            }
            Self::InsertLinkCard => {
                let id = args.and_then(|args| args.get("id")).and_then(Value::as_str);
                editor.insert_link_card(arg_str(args, "url")?, arg_str(args, "title")?, id)?;
            }
            Self::InsertTable => {
                let rows = arg_usize(args, "rows").unwrap_or(2).clamp(1, MAX_TABLE_SIZE);
                let cols = arg_usize(args, "cols").unwrap_or(2).clamp(1, MAX_TABLE_SIZE);
                editor.insert_table(rows, cols)?;
            }
            Self::FocusTableCell => {
                let block = BlockKey::new(arg_str(args, "block")?);
                let row = arg_usize(args, "row").unwrap_or(0);
                let column = args
                    .and_then(|args| args.get("column"))
                    .and_then(Value::as_str)
                    .map(str::to_string);
                editor.focus_table_cell(block, row, column)?;
            }
            Self::InsertTableRow(position) => editor.table_insert_row(*position)?,
            Self::InsertTableColumn(position) => {
                editor.table_insert_column(*position)?;
            }
            Self::DeleteTableRow => editor.table_delete_row()?,
            Self::DeleteTableColumn => editor.table_delete_column()?,
            Self::SetTableCell => {
                let row = arg_usize(args, "row").ok_or_else(|| missing("row"))?;
                editor.table_set_cell(row, arg_str(args, "column")?, arg_str(args, "value")?)?;
            }
            Self::Custom(handler) => handler(editor, args)?,
        }
        Ok(())
    }
}

/// A named editor action. Hidden commands run but are not listed.
#[derive(Debug, Clone)]
pub struct Command {
    pub id: String,
    pub label: String,
    pub action: CommandAction,
    pub hidden: bool,
}

impl Command {
    pub fn new(id: impl Into<String>, label: impl Into<String>, action: CommandAction) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            action,
            hidden: false,
        }
    }

    pub fn custom(
        id: impl Into<String>,
        label: impl Into<String>,
        handler: impl Fn(&mut EditorState, Option<&Value>) -> Result<(), CommandError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self::new(id, label, CommandAction::Custom(Arc::new(handler)))
    }

    fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct CommandRegistry {
    commands: HashMap<String, Command>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every built-in command.
    pub fn standard() -> Self {
        let commands = standard_commands()
            .into_iter()
            .map(|command| (command.id.clone(), command))
            .collect();
        Self { commands }
    }

    pub fn register(&mut self, command: Command) -> Result<(), CommandError> {
        if self.commands.contains_key(&command.id) {
            return Err(CommandError::new(format!(
                "Duplicate command id: {}",
                command.id
            )));
        }
        self.commands.insert(command.id.clone(), command);
        Ok(())
    }

    pub fn command(&self, id: &str) -> Option<&Command> {
        self.commands.get(id)
    }

    /// Visible command ids, sorted.
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self
            .commands
            .values()
            .filter(|command| !command.hidden)
            .map(|command| command.id.as_str())
            .collect();
        ids.sort_unstable();
        ids
    }
}

fn standard_commands() -> Vec<Command> {
    use CommandAction::*;

    vec![
        Command::new("marks.toggle_bold", "Bold", ToggleStyle(BOLD)),
        Command::new("marks.toggle_italic", "Italic", ToggleStyle(ITALIC)),
        Command::new("marks.toggle_underline", "Underline", ToggleStyle(UNDERLINE)),
        Command::new(
            "marks.toggle_strikethrough",
            "Strikethrough",
            ToggleStyle(STRIKETHROUGH),
        ),
        Command::new("marks.toggle_code", "Inline code", ToggleStyle(CODE)),
        Command::new("marks.toggle_highlight", "Highlight", ToggleStyle(HIGHLIGHT)),
        Command::new(
            "marks.set_color",
            "Text color",
            SetStyleValue {
                prefix: COLOR_PREFIX,
                arg: "color",
            },
        ),
        Command::new(
            "marks.set_font_size",
            "Font size",
            SetStyleValue {
                prefix: FONT_SIZE_PREFIX,
                arg: "size",
            },
        ),
        Command::new("marks.clear", "Clear formatting", ClearStyles),
        Command::new("block.set_type", "Block type", SetBlockType),
        Command::new("block.set_align", "Alignment", SetBlockAlign),
        Command::new("block.indent", "Indent", AdjustDepth(1)),
        Command::new("block.outdent", "Outdent", AdjustDepth(-1)),
        Command::new("history.undo", "Undo", Undo),
        Command::new("history.redo", "Redo", Redo),
        Command::new("link.insert", "Link", InsertLink),
        Command::new("image.insert", "Image", InsertImage),
        Command::new("video.insert", "Video", InsertVideo),
        Command::new("divider.insert", "Divider", InsertDivider),
        Command::new("link_card.insert", "Link card", InsertLinkCard),
        Command::new("table.insert", "Table", InsertTable),
        Command::new("table.focus_cell", "Focus cell", FocusTableCell).hidden(),
        Command::new(
            "table.insert_row_above",
            "Insert row above",
            InsertTableRow(RowPosition::Above),
        ),
        Command::new(
            "table.insert_row_below",
            "Insert row below",
            InsertTableRow(RowPosition::Below),
        ),
        Command::new(
            "table.insert_col_left",
            "Insert column left",
            InsertTableColumn(ColumnPosition::Left),
        ),
        Command::new(
            "table.insert_col_right",
            "Insert column right",
            InsertTableColumn(ColumnPosition::Right),
        ),
        Command::new("table.delete_row", "Delete row", DeleteTableRow),
        Command::new("table.delete_col", "Delete column", DeleteTableColumn),
        Command::new("table.set_cell", "Set cell", SetTableCell).hidden(),
    ]
}

fn missing(key: &str) -> CommandError {
    CommandError::new(format!("Missing args.{key}"))
}

fn arg_str<'a>(args: Option<&'a Value>, key: &str) -> Result<&'a str, CommandError> {
    args.and_then(|args| args.get(key))
        .and_then(Value::as_str)
        .ok_or_else(|| missing(key))
}

fn arg_usize(args: Option<&Value>, key: &str) -> Option<usize> {
    args.and_then(|args| args.get(key))
        .and_then(Value::as_u64)
        .and_then(|n| usize::try_from(n).ok())
}

fn arg_bool(args: Option<&Value>, key: &str) -> bool {
    args.and_then(|args| args.get(key))
        .and_then(Value::as_bool)
        .unwrap_or(false)
}
