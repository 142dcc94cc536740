use std::mem;

use serde_json::Value;

use crate::block::{Block, BlockData, BlockKey, BlockType};
use crate::character::{CharacterMetadata, StyleSet};
use crate::commands::{Command, CommandRegistry};
use crate::content::ContentState;
use crate::entity::{EntityData, EntityKey, EntityType, Mutability};
use crate::error::{CommandError, EditError, TableError};
use crate::keys::KeyGenerator;
use crate::link;
use crate::modifier;
use crate::selection::SelectionState;
use crate::table::{self, ColumnPosition, RowPosition, TableData};
use crate::upload::UploadedFile;

/// The kind of edit that produced a revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeType {
    InsertCharacters,
    RemoveRange,
    SplitBlock,
    ChangeBlockType,
    ChangeBlockData,
    ChangeInlineStyle,
    AdjustDepth,
    ApplyEntity,
    ChangeEntityData,
    InsertFragment,
}

#[derive(Debug, Clone)]
pub struct EditorConfig {
    pub max_undo: usize,
    pub max_depth: usize,
    /// Spaces Tab inserts in code blocks and quotes; 0 leaves Tab unhandled.
    pub tab_indent: usize,
    /// Text length at which edits that add text are refused.
    pub max_length: Option<usize>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            max_undo: 200,
            max_depth: 4,
            tab_indent: 4,
            max_length: Some(6000),
        }
    }
}

impl EditorConfig {
    fn with_defaults(mut self) -> Self {
        if self.max_undo == 0 {
            self.max_undo = 200;
        }
        if self.max_depth == 0 {
            self.max_depth = 4;
        }
        self
    }
}

/// The table cell the user is editing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableCursor {
    pub block: BlockKey,
    pub row: usize,
    pub column: Option<String>,
}

/// A document session: the current revision, the selection and the undo
/// and redo stacks of whole content states.
pub struct EditorState {
    current: ContentState,
    preview: Option<ContentState>,
    selection: SelectionState,
    undo_stack: Vec<ContentState>,
    redo_stack: Vec<ContentState>,
    inline_style_override: Option<StyleSet>,
    last_change_type: Option<ChangeType>,
    table_cursor: Option<TableCursor>,
    commands: CommandRegistry,
    config: EditorConfig,
}

impl EditorState {
    pub fn new(content: ContentState) -> Self {
        Self::with_config(content, EditorConfig::default())
    }

    pub fn with_config(content: ContentState, config: EditorConfig) -> Self {
        let selection = content.normalize_selection(content.selection_after());
        Self {
            current: content,
            preview: None,
            selection,
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            inline_style_override: None,
            last_change_type: None,
            table_cursor: None,
            commands: CommandRegistry::standard(),
            config: config.with_defaults(),
        }
    }

    pub fn empty() -> Self {
        Self::new(ContentState::new())
    }

    /// The displayed content: the transient preview when one is active.
    pub fn content(&self) -> &ContentState {
        self.preview.as_ref().unwrap_or(&self.current)
    }

    /// The last undo-significant revision.
    pub fn committed_content(&self) -> &ContentState {
        &self.current
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn commands(&self) -> &CommandRegistry {
        &self.commands
    }

    /// Adds a command next to the built-in ones.
    pub fn register_command(&mut self, command: Command) -> Result<(), CommandError> {
        self.commands.register(command)
    }

    pub fn last_change_type(&self) -> Option<ChangeType> {
        self.last_change_type
    }

    /// Moves the selection; a pending inline style override is dropped.
    pub fn set_selection(&mut self, selection: SelectionState) {
        self.selection = self.content().normalize_selection(&selection);
        self.inline_style_override = None;
    }

    /// Moves the selection and keeps the inline style override.
    pub fn force_selection(&mut self, selection: SelectionState) {
        self.selection = self.content().normalize_selection(&selection);
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_stack(&self) -> &[ContentState] {
        &self.undo_stack
    }

    pub fn redo_stack(&self) -> &[ContentState] {
        &self.redo_stack
    }

    /// Makes `content` the current revision and records the previous one
    /// for undo. Any transient preview is dropped.
    pub fn push(&mut self, content: ContentState, change: ChangeType) {
        self.preview = None;
        let selection = content.normalize_selection(content.selection_after());
        let previous = mem::replace(&mut self.current, content);
        self.undo_stack.push(previous);
        self.redo_stack.clear();
        if self.undo_stack.len() > self.config.max_undo {
            self.undo_stack.remove(0);
        }
        self.selection = selection;
        self.last_change_type = Some(change);
        self.inline_style_override = None;
        self.clamp_table_cursor();
        tracing::trace!(?change, depth = self.undo_stack.len(), "pushed revision");
    }

    /// Like [`EditorState::push`], but refuses a revision that grows the text
    /// to `max_length` or beyond. Edits that shrink the text always pass.
    pub fn try_push(&mut self, content: ContentState, change: ChangeType) -> Result<(), EditError> {
        if let Some(max) = self.config.max_length {
            let length = content.text_length();
            if length >= max && length > self.content().text_length() {
                tracing::debug!(length, max, "edit rejected by length limit");
                return Err(EditError::TooLong { length, max });
            }
        }
        self.push(content, change);
        Ok(())
    }

    pub fn undo(&mut self) -> bool {
        let Some(previous) = self.undo_stack.pop() else {
            return false;
        };
        self.preview = None;
        let undone = mem::replace(&mut self.current, previous);
        self.selection = self
            .current
            .normalize_selection(undone.selection_before());
        self.redo_stack.push(undone);
        self.inline_style_override = None;
        self.clamp_table_cursor();
        tracing::debug!(undo = self.undo_stack.len(), redo = self.redo_stack.len(), "undo");
        true
    }

    pub fn redo(&mut self) -> bool {
        let Some(next) = self.redo_stack.pop() else {
            return false;
        };
        self.preview = None;
        let previous = mem::replace(&mut self.current, next);
        self.undo_stack.push(previous);
        self.selection = self
            .current
            .normalize_selection(self.current.selection_after());
        self.inline_style_override = None;
        self.clamp_table_cursor();
        tracing::debug!(undo = self.undo_stack.len(), redo = self.redo_stack.len(), "redo");
        true
    }

    /// Shows `content` without recording history (e.g. while dragging).
    pub fn preview(&mut self, content: ContentState) {
        self.preview = Some(content);
    }

    pub fn has_preview(&self) -> bool {
        self.preview.is_some()
    }

    /// Records the previewed content as one undo step.
    pub fn commit_preview(&mut self, change: ChangeType) -> bool {
        match self.preview.take() {
            Some(content) => {
                self.push(content, change);
                true
            }
            None => false,
        }
    }

    pub fn cancel_preview(&mut self) -> bool {
        self.preview.take().is_some()
    }

    pub fn inline_style_override(&self) -> Option<&StyleSet> {
        self.inline_style_override.as_ref()
    }

    /// Style for the next typed character: the override, or the style of the
    /// character before the caret (the first selected one for a range).
    pub fn current_inline_style(&self) -> StyleSet {
        if let Some(style) = &self.inline_style_override {
            return style.clone();
        }
        let content = self.content();
        let Some(block) = content.block_for_key(self.selection.start_key()) else {
            return StyleSet::new();
        };
        let offset = self.selection.start_offset();
        if self.selection.is_collapsed() {
            if offset > 0 {
                return block.style_at(offset - 1);
            }
            if !block.is_empty() {
                return block.style_at(0);
            }
            return content
                .block_before(&block.key)
                .filter(|prev| !prev.is_empty())
                .map(|prev| prev.style_at(prev.len() - 1))
                .unwrap_or_default();
        }
        block.style_at(offset)
    }

    fn focus_block(&self) -> Option<&Block> {
        self.content().block_for_key(self.selection.start_key())
    }

    pub fn current_block_type(&self) -> Option<BlockType> {
        self.focus_block().map(|block| block.block_type)
    }

    pub fn insert_text(&mut self, text: &str) -> Result<(), EditError> {
        let style = self.current_inline_style();
        let next = modifier::insert_text(self.content(), &self.selection, text, &style, None)?;
        self.try_push(next, ChangeType::InsertCharacters)
    }

    /// Soft line break inside the current block.
    pub fn insert_soft_newline(&mut self) -> Result<(), EditError> {
        self.insert_text("\n")
    }

    pub fn delete_selection(&mut self) -> Result<(), EditError> {
        if self.selection.is_collapsed() {
            return Ok(());
        }
        let next = modifier::remove_range(self.content(), &self.selection)?;
        self.push(next, ChangeType::RemoveRange);
        Ok(())
    }

    /// Splits the current block. Splitting at the end of a heading starts a
    /// plain paragraph; on an empty quote the quote is turned off instead.
    pub fn split_block(&mut self) -> Result<(), EditError> {
        let empty_quote = self.selection.is_collapsed()
            && self
                .focus_block()
                .is_some_and(|block| block.block_type == BlockType::Blockquote && block.is_empty());
        if empty_quote {
            return self.set_block_type(BlockType::Unstyled);
        }
        let type_override = self.focus_block().and_then(|block| {
            let at_end = self.selection.is_collapsed() && self.selection.start_offset() >= block.len();
            (block.block_type.is_heading() && at_end).then_some(BlockType::Unstyled)
        });
        let next = modifier::split_block(self.content(), &self.selection, type_override)?;
        self.push(next, ChangeType::SplitBlock);
        Ok(())
    }

    /// Toggles a style over the selection, or the override for the next
    /// typed character when the selection is collapsed.
    pub fn toggle_inline_style(&mut self, style: &str) {
        if self.selection.is_collapsed() {
            let mut current = self.current_inline_style();
            if current.contains(style) {
                current.remove(style);
            } else {
                let mut meta = CharacterMetadata::styled(current);
                meta.apply_style(style);
                current = meta.style;
            }
            self.inline_style_override = Some(current);
            return;
        }
        let next = modifier::toggle_inline_style(self.content(), &self.selection, style);
        self.push(next, ChangeType::ChangeInlineStyle);
    }

    pub fn apply_inline_style(&mut self, style: &str) {
        if self.selection.is_collapsed() {
            let mut meta = CharacterMetadata::styled(self.current_inline_style());
            meta.apply_style(style);
            self.inline_style_override = Some(meta.style);
            return;
        }
        let next = modifier::apply_inline_style(self.content(), &self.selection, style);
        self.push(next, ChangeType::ChangeInlineStyle);
    }

    /// Clears inline formatting in the selection.
    pub fn clear_formatting(&mut self) {
        if self.selection.is_collapsed() {
            self.inline_style_override = Some(StyleSet::new());
            return;
        }
        let next = modifier::clear_inline_styles(self.content(), &self.selection);
        self.push(next, ChangeType::ChangeInlineStyle);
    }

    pub fn set_block_type(&mut self, block_type: BlockType) -> Result<(), EditError> {
        let next = modifier::set_block_type(self.content(), &self.selection, block_type)?;
        self.push(next, ChangeType::ChangeBlockType);
        Ok(())
    }

    /// Sets `block_type`, or resets to `unstyled` when the focus block already has it.
    pub fn toggle_block_type(&mut self, block_type: BlockType) -> Result<(), EditError> {
        let target = if self.current_block_type() == Some(block_type) {
            BlockType::Unstyled
        } else {
            block_type
        };
        self.set_block_type(target)
    }

    pub fn set_block_align(&mut self, align: &str) {
        self.change_block_data(BlockData::from([(
            "textAlign".to_string(),
            Value::from(align),
        )]));
    }

    /// Merges `data` into every block in the selection.
    pub fn change_block_data(&mut self, data: BlockData) {
        let next = modifier::merge_block_data(self.content(), &self.selection, data);
        self.push(next, ChangeType::ChangeBlockData);
    }

    pub fn indent(&mut self) {
        self.adjust_depth(1);
    }

    pub fn outdent(&mut self) {
        self.adjust_depth(-1);
    }

    fn adjust_depth(&mut self, delta: isize) {
        let next = modifier::adjust_block_depth(
            self.content(),
            &self.selection,
            delta,
            self.config.max_depth,
        );
        if &next != self.content() {
            self.push(next, ChangeType::AdjustDepth);
        }
    }

    /// Tab changes the depth of list items and inserts `tab_indent` spaces
    /// in code blocks and quotes. Returns whether the key was handled.
    pub fn handle_tab(&mut self, shift: bool) -> bool {
        if self.config.tab_indent == 0 {
            return false;
        }
        match self.current_block_type() {
            Some(block_type) if block_type.is_list_item() => {
                if shift {
                    self.outdent();
                } else {
                    self.indent();
                }
                true
            }
            Some(BlockType::CodeBlock | BlockType::Blockquote) if !shift => {
                let indent = " ".repeat(self.config.tab_indent);
                self.insert_text(&indent).is_ok()
            }
            _ => false,
        }
    }

    /// Inserts `title` as a link to `url`. With a collapsed caret inside an
    /// existing link, that whole link is replaced.
    pub fn add_link(&mut self, url: &str, title: &str) -> Result<EntityKey, EditError> {
        link::validate_link(url, title)?;
        let mut selection = self.selection.clone();
        if selection.is_collapsed() {
            if let Some(block) = self.focus_block() {
                let offset = selection.start_offset();
                let link_at = |ix: usize| {
                    block
                        .entity_at(ix)
                        .and_then(|key| self.content().entity(key))
                        .is_some_and(|entity| entity.entity_type == EntityType::Link)
                        .then_some(ix)
                };
                let hit = link_at(offset).or_else(|| offset.checked_sub(1).and_then(link_at));
                if let Some((start, end)) = hit.and_then(|ix| block.entity_range_at(ix)) {
                    selection = SelectionState::within(block.key.clone(), start, end);
                }
            }
        }

        let style = self.current_inline_style();
        let mut content = self.content().clone();
        let entity = content.create_entity(
            EntityType::Link,
            Mutability::Mutable,
            link::link_entity_data(url, title),
        );
        let next = modifier::insert_text(&content, &selection, title, &style, Some(entity))?;
        self.try_push(next, ChangeType::InsertCharacters)?;
        Ok(entity)
    }

    fn insert_media(
        &mut self,
        entity_type: EntityType,
        data: EntityData,
    ) -> Result<EntityKey, EditError> {
        let mut content = self.content().clone();
        let entity = content.create_entity(entity_type, Mutability::Immutable, data);
        let next = modifier::insert_atomic_block(&content, &self.selection, entity, ' ')?;
        self.push(next, ChangeType::InsertFragment);
        Ok(entity)
    }

    pub fn add_image(&mut self, file: &UploadedFile) -> Result<EntityKey, EditError> {
        let data = EntityData::from([
            ("src".to_string(), Value::from(file.file_url.as_str())),
            ("width".to_string(), Value::from("auto")),
            ("height".to_string(), Value::from("auto")),
            ("name".to_string(), Value::from(file.file_name.as_str())),
        ]);
        self.insert_media(EntityType::Image, data)
    }

    /// Inserts a video block; does nothing when the caret is on an atomic block.
    pub fn add_video(&mut self, src: &str) -> Result<Option<EntityKey>, EditError> {
        if self.current_block_type() == Some(BlockType::Atomic) {
            return Ok(None);
        }
        let data = EntityData::from([("src".to_string(), Value::from(src))]);
        self.insert_media(EntityType::Video, data).map(Some)
    }

    fn insert_custom_block(&mut self, block: Block) -> Result<BlockKey, EditError> {
        let next = modifier::insert_void_block(self.content(), &self.selection, block)?;
        let key = inserted_block_key(&next)
            .ok_or_else(|| EditError::UnknownBlock(self.selection.start_key().clone()))?;
        self.push(next, ChangeType::InsertFragment);
        Ok(key)
    }

    pub fn insert_table(&mut self, rows: usize, cols: usize) -> Result<BlockKey, EditError> {
        let block = table::table_block(self.content(), rows.max(1), cols.max(1));
        let key = self.insert_custom_block(block)?;
        self.table_cursor = Some(TableCursor {
            block: key.clone(),
            row: 0,
            column: None,
        });
        Ok(key)
    }

    pub fn insert_divider(&mut self) -> Result<BlockKey, EditError> {
        let content = self.content();
        let block = Block::new(content.generate_key(), BlockType::Divider, "").with_data(
            BlockData::from([("type".to_string(), Value::from("divider"))]),
        );
        self.insert_custom_block(block)
    }

    pub fn insert_link_card(
        &mut self,
        url: &str,
        title: &str,
        id: Option<&str>,
    ) -> Result<BlockKey, EditError> {
        link::validate_link(url, title)?;
        let content = self.content();
        let id = id
            .map(str::to_string)
            .unwrap_or_else(|| content.generate_key().as_str().to_string());
        let data = BlockData::from([
            ("url".to_string(), Value::from(url.trim())),
            ("title".to_string(), Value::from(title)),
            ("id".to_string(), Value::from(id)),
        ]);
        let block = Block::new(content.generate_key(), BlockType::LinkCard, "").with_data(data);
        self.insert_custom_block(block)
    }

    pub fn remove_custom_block(&mut self, key: &BlockKey) -> Result<(), EditError> {
        if self.content().block_for_key(key).is_none() {
            return Ok(());
        }
        let next = modifier::remove_custom_block(self.content(), key)?;
        self.push(next, ChangeType::RemoveRange);
        Ok(())
    }

    /// Merges `data` into an entity as one undo step.
    pub fn merge_entity_data(&mut self, entity: EntityKey, data: EntityData) -> Result<(), EditError> {
        let next = modifier::merge_entity_data(&self.current, entity, data)?;
        self.push(next, ChangeType::ChangeEntityData);
        Ok(())
    }

    /// Drag feedback for an image resize; commit with
    /// [`EditorState::commit_preview`] when the drag ends.
    pub fn resize_image(&mut self, entity: EntityKey, width: &str) -> Result<(), EditError> {
        let mut data = EntityData::from([("width".to_string(), Value::from(width))]);
        if let Some(style) = self
            .current
            .entity(entity)
            .and_then(|entity| entity.data.get("style"))
            .and_then(Value::as_object)
        {
            let mut style = style.clone();
            style.insert("width".to_string(), Value::from(width));
            data.insert("style".to_string(), Value::Object(style));
        }
        let next = modifier::merge_entity_data(&self.current, entity, data)?;
        self.preview(next);
        Ok(())
    }

    pub fn table_cursor(&self) -> Option<&TableCursor> {
        self.table_cursor.as_ref()
    }

    pub fn focus_table_cell(
        &mut self,
        block: BlockKey,
        row: usize,
        column: Option<String>,
    ) -> Result<(), EditError> {
        let content = self.content();
        let found = content
            .block_for_key(&block)
            .ok_or_else(|| EditError::UnknownBlock(block.clone()))?;
        let table = TableData::from_block(found)?;
        let row = table.clamp_row(row).unwrap_or(0);
        self.table_cursor = Some(TableCursor { block, row, column });
        Ok(())
    }

    fn clamp_table_cursor(&mut self) {
        let Some(cursor) = &self.table_cursor else {
            return;
        };
        let table = self
            .current
            .block_for_key(&cursor.block)
            .and_then(|block| TableData::from_block(block).ok());
        self.table_cursor = match table {
            None => None,
            Some(table) => {
                let mut cursor = cursor.clone();
                cursor.row = table.clamp_row(cursor.row).unwrap_or(0);
                if cursor
                    .column
                    .as_deref()
                    .is_some_and(|column| table.column(column).is_none())
                {
                    cursor.column = table.columns.last().map(|column| column.key.clone());
                }
                Some(cursor)
            }
        };
    }

    fn active_table(&self) -> Result<TableCursor, EditError> {
        self.table_cursor.clone().ok_or_else(|| {
            EditError::Table(TableError::NotATable(self.selection.start_key().clone()))
        })
    }

    fn update_table<T>(
        &mut self,
        cursor: &TableCursor,
        update: impl FnOnce(&mut TableData, &dyn KeyGenerator) -> Result<T, TableError>,
    ) -> Result<T, EditError> {
        let (next, out) = table::update_table(self.content(), &cursor.block, update)?;
        self.push(next, ChangeType::ChangeBlockData);
        Ok(out)
    }

    pub fn table_insert_row(&mut self, position: RowPosition) -> Result<(), EditError> {
        let cursor = self.active_table()?;
        let row = self.update_table(&cursor, |table, keys| {
            Ok(table.insert_row(cursor.row, position, keys))
        })?;
        if let Some(active) = &mut self.table_cursor {
            // Inserting above pushes the focused row down by one.
            active.row = match position {
                RowPosition::Above => row + 1,
                RowPosition::Below => cursor.row,
            };
        }
        Ok(())
    }

    pub fn table_delete_row(&mut self) -> Result<(), EditError> {
        let cursor = self.active_table()?;
        self.update_table(&cursor, |table, _| table.delete_row(cursor.row))?;
        Ok(())
    }

    /// Inserts a column beside the focused one and focuses it.
    pub fn table_insert_column(&mut self, position: ColumnPosition) -> Result<String, EditError> {
        let cursor = self.active_table()?;
        let key = self.update_table(&cursor, |table, keys| {
            table.insert_column(cursor.column.as_deref(), position, keys)
        })?;
        if let Some(active) = &mut self.table_cursor {
            active.column = Some(key.clone());
        }
        Ok(key)
    }

    /// Deletes the focused column, or the last one when none is focused.
    pub fn table_delete_column(&mut self) -> Result<(), EditError> {
        let cursor = self.active_table()?;
        self.update_table(&cursor, |table, _| {
            let key = cursor
                .column
                .clone()
                .or_else(|| table.columns.last().map(|column| column.key.clone()))
                .ok_or_else(|| TableError::UnknownColumn(String::new()))?;
            table.delete_column(&key)
        })?;
        Ok(())
    }

    pub fn table_set_cell(
        &mut self,
        row: usize,
        column: &str,
        value: &str,
    ) -> Result<(), EditError> {
        let cursor = self.active_table()?;
        self.update_table(&cursor, |table, _| table.set_cell(row, column, value))
    }

    pub fn run_command(&mut self, id: &str, args: Option<Value>) -> Result<(), CommandError> {
        let Some(action) = self.commands.command(id).map(|command| command.action.clone()) else {
            return Err(CommandError::new(format!("Unknown command: {id}")));
        };
        action.run(self, args.as_ref())
    }
}

/// Key of the block placed by [`modifier::insert_void_block`]: the caret
/// lands on the block right after it.
pub(crate) fn inserted_block_key(content: &ContentState) -> Option<BlockKey> {
    content
        .block_before(&content.selection_after().anchor_key)
        .map(|block| block.key.clone())
}
