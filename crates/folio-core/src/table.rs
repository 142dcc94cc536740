use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::block::{Block, BlockData, BlockKey, BlockType};
use crate::content::ContentState;
use crate::error::{EditError, TableError};
use crate::keys::KeyGenerator;
use crate::modifier;

pub const DEFAULT_COLUMN_WIDTH: u32 = 200;

fn default_width() -> u32 {
    DEFAULT_COLUMN_WIDTH
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableColumn {
    pub key: String,
    pub data_index: String,
    #[serde(default)]
    pub title: String,
    #[serde(default = "default_width")]
    pub width: u32,
}

impl TableColumn {
    /// A column whose key, data index and title are all `key`.
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            data_index: key.clone(),
            title: key.clone(),
            key,
            width: DEFAULT_COLUMN_WIDTH,
        }
    }
}

/// One table row: a generated id plus one cell per column data index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    pub id: String,
    #[serde(flatten)]
    pub cells: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowPosition {
    Above,
    Below,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnPosition {
    Left,
    Right,
}

/// The `columns` / `dataSource` payload of a table block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableData {
    #[serde(default)]
    pub columns: Vec<TableColumn>,
    #[serde(default)]
    pub data_source: Vec<TableRow>,
}

impl TableData {
    /// A `rows` x `cols` table of empty cells.
    pub fn new(rows: usize, cols: usize, keys: &dyn KeyGenerator) -> Self {
        let columns: Vec<TableColumn> = (0..cols)
            .map(|_| TableColumn::new(keys.next_key().as_str()))
            .collect();
        let mut table = Self {
            columns,
            data_source: Vec::new(),
        };
        for _ in 0..rows {
            let row = table.empty_row(keys);
            table.data_source.push(row);
        }
        table
    }

    pub fn from_block(block: &Block) -> Result<Self, TableError> {
        if block.block_type != BlockType::Table {
            return Err(TableError::NotATable(block.key.clone()));
        }
        Self::from_block_data(&block.data)
    }

    pub fn from_block_data(data: &BlockData) -> Result<Self, TableError> {
        let decode = |field: &str| data.get(field).cloned().unwrap_or(Value::Array(Vec::new()));
        let columns = serde_json::from_value(decode("columns"))
            .map_err(|err| TableError::Malformed(err.to_string()))?;
        let data_source = serde_json::from_value(decode("dataSource"))
            .map_err(|err| TableError::Malformed(err.to_string()))?;
        Ok(Self {
            columns,
            data_source,
        })
    }

    /// Writes `columns` and `dataSource` into `data`, keeping other entries.
    pub fn write_into(&self, data: &mut BlockData) {
        data.insert(
            "columns".to_string(),
            serde_json::to_value(&self.columns).unwrap_or(Value::Array(Vec::new())),
        );
        data.insert(
            "dataSource".to_string(),
            serde_json::to_value(&self.data_source).unwrap_or(Value::Array(Vec::new())),
        );
    }

    pub fn row_count(&self) -> usize {
        self.data_source.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn cell(&self, row: usize, column_key: &str) -> Option<&str> {
        let column = self.column(column_key)?;
        self.data_source
            .get(row)?
            .cells
            .get(&column.data_index)
            .and_then(Value::as_str)
    }

    pub fn column(&self, key: &str) -> Option<&TableColumn> {
        self.columns.iter().find(|column| column.key == key)
    }

    /// The nearest existing row for a remembered row index.
    pub fn clamp_row(&self, index: usize) -> Option<usize> {
        self.data_source
            .len()
            .checked_sub(1)
            .map(|last| index.min(last))
    }

    fn empty_row(&self, keys: &dyn KeyGenerator) -> TableRow {
        TableRow {
            id: keys.next_key().as_str().to_string(),
            cells: self
                .columns
                .iter()
                .map(|column| (column.data_index.clone(), Value::from("")))
                .collect(),
        }
    }

    /// Inserts an empty row next to `index`; returns the new row's index.
    pub fn insert_row(
        &mut self,
        index: usize,
        position: RowPosition,
        keys: &dyn KeyGenerator,
    ) -> usize {
        let row = self.empty_row(keys);
        let at = match position {
            RowPosition::Above => index,
            RowPosition::Below => index + 1,
        }
        .min(self.data_source.len());
        self.data_source.insert(at, row);
        at
    }

    pub fn delete_row(&mut self, index: usize) -> Result<TableRow, TableError> {
        if index >= self.data_source.len() {
            return Err(TableError::RowOutOfRange {
                index,
                len: self.data_source.len(),
            });
        }
        Ok(self.data_source.remove(index))
    }

    /// Inserts a column beside `anchor` (or at the end without one) and
    /// backfills every row; returns the new column key.
    pub fn insert_column(
        &mut self,
        anchor: Option<&str>,
        position: ColumnPosition,
        keys: &dyn KeyGenerator,
    ) -> Result<String, TableError> {
        let at = match anchor {
            Some(anchor) => {
                let index = self
                    .columns
                    .iter()
                    .position(|column| column.key == anchor)
                    .ok_or_else(|| TableError::UnknownColumn(anchor.to_string()))?;
                match position {
                    ColumnPosition::Left => index,
                    ColumnPosition::Right => index + 1,
                }
            }
            None => self.columns.len(),
        };
        let column = TableColumn::new(keys.next_key().as_str());
        for row in &mut self.data_source {
            row.cells.insert(column.data_index.clone(), Value::from(""));
        }
        let key = column.key.clone();
        self.columns.insert(at, column);
        Ok(key)
    }

    /// Removes a column and its cell from every row.
    pub fn delete_column(&mut self, key: &str) -> Result<TableColumn, TableError> {
        let index = self
            .columns
            .iter()
            .position(|column| column.key == key)
            .ok_or_else(|| TableError::UnknownColumn(key.to_string()))?;
        let column = self.columns.remove(index);
        for row in &mut self.data_source {
            row.cells.remove(&column.data_index);
        }
        Ok(column)
    }

    pub fn set_cell(
        &mut self,
        row: usize,
        column_key: &str,
        value: impl Into<String>,
    ) -> Result<(), TableError> {
        let data_index = self
            .column(column_key)
            .map(|column| column.data_index.clone())
            .ok_or_else(|| TableError::UnknownColumn(column_key.to_string()))?;
        let len = self.data_source.len();
        let target = self
            .data_source
            .get_mut(row)
            .ok_or(TableError::RowOutOfRange { index: row, len })?;
        target.cells.insert(data_index, Value::from(value.into()));
        Ok(())
    }
}

/// Builds a table block with a generated `id` in its data.
pub fn table_block(content: &ContentState, rows: usize, cols: usize) -> Block {
    let keys = content.key_generator();
    let table = TableData::new(rows, cols, keys.as_ref());
    let mut data = BlockData::new();
    table.write_into(&mut data);
    data.insert(
        "id".to_string(),
        Value::from(keys.next_key().as_str().to_string()),
    );
    Block::new(content.generate_key(), BlockType::Table, "").with_data(data)
}

/// Applies `update` to the table stored in block `key` and writes it back.
pub fn update_table<T>(
    content: &ContentState,
    key: &BlockKey,
    update: impl FnOnce(&mut TableData, &dyn KeyGenerator) -> Result<T, TableError>,
) -> Result<(ContentState, T), EditError> {
    let block = content
        .block_for_key(key)
        .ok_or_else(|| EditError::UnknownBlock(key.clone()))?;
    let mut table = TableData::from_block(block)?;
    let keys = content.key_generator();
    let out = update(&mut table, keys.as_ref())?;
    let mut data = block.data.clone();
    table.write_into(&mut data);
    let next = modifier::replace_block_data(content, key, data)?;
    Ok((next, out))
}
